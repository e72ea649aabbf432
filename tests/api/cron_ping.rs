use chrono::{Duration, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{any, body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{row_expiring_in, slashed_row_expiring_in, TestApp, CRON_SECRET};

#[tokio::test]
async fn ping_without_cron_header_is_rejected_with_401() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.sheets_server)
        .await;

    let test_cases = vec![(None, "missing header"), (Some("wrong-secret"), "wrong header")];

    for (cron_header, description) in test_cases {
        let response = test_app.ping(cron_header).await;

        assert_eq!(
            401,
            response.status().as_u16(),
            "The API did not fail with 401 status when the request had a {}",
            description
        );
    }
}

#[tokio::test]
async fn ping_returns_500_when_spreadsheet_fetch_fails() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&test_app.sheets_server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.email_server)
        .await;

    let response = test_app.ping(Some(CRON_SECRET)).await;

    assert_eq!(500, response.status().as_u16());
}

#[tokio::test]
async fn ping_returns_500_when_spreadsheet_has_no_rows() {
    let test_app = TestApp::spawn_app().await;

    test_app.mount_rows(Vec::new()).await;

    let response = test_app.ping(Some(CRON_SECRET)).await;

    assert_eq!(500, response.status().as_u16());
}

#[tokio::test]
async fn reminders_are_sent_to_subscribers_on_threshold_days() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .mount_rows(vec![
            row_expiring_in(1, "One", "one@test.com"),
            slashed_row_expiring_in(3, "Three", "three@test.com"),
            row_expiring_in(7, "Seven", "seven@test.com"),
            row_expiring_in(5, "Five", "five@test.com"),
            row_expiring_in(20, "Twenty", "twenty@test.com"),
        ])
        .await;

    Mock::given(path("/mail/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&test_app.email_server)
        .await;

    let response = test_app.ping(Some(CRON_SECRET)).await;

    assert_eq!(200, response.status().as_u16());

    let mut recipients: Vec<String> = test_app
        .sent_emails()
        .await
        .iter()
        .map(|email| {
            email["personalizations"][0]["to"][0]["email"]
                .as_str()
                .unwrap()
                .to_owned()
        })
        .collect();
    recipients.sort();

    assert_eq!(
        recipients,
        vec!["one@test.com", "seven@test.com", "three@test.com"]
    );
}

#[tokio::test]
async fn reminder_email_mentions_the_days_left() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .mount_rows(vec![row_expiring_in(3, "Ada", "ada@test.com")])
        .await;

    Mock::given(path("/mail/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    test_app.ping(Some(CRON_SECRET)).await;

    let sent_emails = test_app.sent_emails().await;
    let email = &sent_emails[0];

    assert_eq!(email["subject"], "Co-working Space Subscription Expiry");
    assert_eq!(email["personalizations"][0]["to"][0]["name"], "Ada");
    assert!(email["content"][0]["value"]
        .as_str()
        .unwrap()
        .contains("will expire in 3 days"));
    assert!(email["content"][1]["value"]
        .as_str()
        .unwrap()
        .contains("Hello Ada,"));
    // Development configuration keeps SendGrid in sandbox mode
    assert_eq!(email["mail_settings"]["sandbox_mode"]["enable"], true);
}

#[tokio::test]
async fn invalid_rows_are_skipped_without_failing_the_round() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .mount_rows(vec![
            row_expiring_in(1, "Valid", "valid@test.com"),
            json!(["Empty", "Email", "", "", "2018-05-30"]),
            json!(["Bad", "Date", "", "bad@test.com", "18-05-30"]),
            json!(["Short", "Row"]),
            json!([42, "Number", "", "number@test.com", "2018-05-30"]),
        ])
        .await;

    Mock::given(path("/mail/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    let response = test_app.ping(Some(CRON_SECRET)).await;

    assert_eq!(200, response.status().as_u16());

    let report: Value = response.json().await.unwrap();

    assert_eq!(
        report,
        json!({
            "rows": 5,
            "notified": 1,
            "not_due": 0,
            "rejected": 4,
            "failed": 0
        })
    );
}

#[tokio::test]
async fn failed_deliveries_are_reported_but_the_ping_succeeds() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .mount_rows(vec![
            row_expiring_in(1, "One", "one@test.com"),
            row_expiring_in(3, "Three", "three@test.com"),
        ])
        .await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&test_app.email_server)
        .await;

    let response = test_app.ping(Some(CRON_SECRET)).await;

    assert_eq!(200, response.status().as_u16());

    let report: Value = response.json().await.unwrap();

    assert_eq!(report["failed"], 2);
    assert_eq!(report["notified"], 0);
}

#[tokio::test]
async fn expired_access_token_is_refreshed_before_reading_the_spreadsheet() {
    let test_app = TestApp::spawn_app_with_token(json!({
        "access_token": "expired-access-token",
        "token_type": "Bearer",
        "refresh_token": "test-refresh-token",
        "expiry": (Utc::now() - Duration::hours(1)).to_rfc3339()
    }))
    .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("refresh_token=test-refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access-token",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&test_app.oauth_server)
        .await;

    Mock::given(header("Authorization", "Bearer fresh-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [["Ada", "Obi", "", "ada@test.com", "2018-05-30"]]
        })))
        .expect(1)
        .mount(&test_app.sheets_server)
        .await;

    let response = test_app.ping(Some(CRON_SECRET)).await;

    assert_eq!(200, response.status().as_u16());
}
