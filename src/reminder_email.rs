use crate::domain::subscriber_record::SubscriberRecord;

pub const REMINDER_SUBJECT: &str = "Co-working Space Subscription Expiry";

/// Reminder message for one subscriber, ready to hand to the email client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEmail {
    pub subject: &'static str,
    pub text: String,
    pub html: String,
}

impl ReminderEmail {
    pub fn compose(record: &SubscriberRecord, days_left: i64, sender_name: &str) -> ReminderEmail {
        let text = format!(
            "Your {} co-working space subscription will expire in {} days. You can contact us to renew your subscription.",
            sender_name, days_left
        );
        let html = format!(
            r#"
            <div>
                <p>Hello {first_name},</p>
                <p>Your {sender} co-working space subscription will expire in <strong>{time_left}</strong>.</p>
                <p>You can contact us to renew your subscription.</p>
            </div>
        "#,
            first_name = escape_html(&record.first_name),
            sender = escape_html(sender_name),
            time_left = time_left(days_left)
        );

        ReminderEmail {
            subject: REMINDER_SUBJECT,
            text,
            html,
        }
    }
}

fn time_left(days_left: i64) -> String {
    if days_left > 1 {
        format!("{} days", days_left)
    } else {
        format!("{} day", days_left)
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for char in value.chars() {
        match char {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(char),
        }
    }

    escaped
}
