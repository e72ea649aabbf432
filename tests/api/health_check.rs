use crate::helpers::TestApp;

#[tokio::test]
async fn health_check_works() {
    let test_app = TestApp::spawn_app().await;
    let client = reqwest::Client::new();
    let url = format!("{}/health_check", test_app.address);
    let response = client
        .get(url)
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length())
}

#[tokio::test]
async fn health_check_does_not_need_the_cron_header() {
    let test_app = TestApp::spawn_app().await;
    let response = reqwest::get(format!("{}/health_check", test_app.address))
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
}
