use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::reminder_policy::ReminderPolicy;
use crate::domain::subscriber_record::{ColumnLayout, SubscriberRecord, SubscriberRowError};
use crate::email_client::EmailClient;
use crate::reminder_email::ReminderEmail;

/// What the decision logic concluded for one spreadsheet row.
#[derive(Debug, PartialEq)]
pub enum RowOutcome {
    Due {
        record: SubscriberRecord,
        days_left: i64,
    },
    NotDue {
        record: SubscriberRecord,
        days_left: i64,
    },
    Rejected(SubscriberRowError),
}

pub fn evaluate_row(
    row: &[Value],
    columns: &ColumnLayout,
    policy: &ReminderPolicy,
    now: DateTime<Utc>,
) -> RowOutcome {
    let record = match SubscriberRecord::from_row(row, columns) {
        Ok(record) => record,
        Err(err) => return RowOutcome::Rejected(err),
    };
    let days_left = record.days_left(now);

    if policy.should_notify(days_left) {
        RowOutcome::Due { record, days_left }
    } else {
        RowOutcome::NotDue { record, days_left }
    }
}

pub fn evaluate_batch(
    rows: &[Vec<Value>],
    columns: &ColumnLayout,
    policy: &ReminderPolicy,
    now: DateTime<Utc>,
) -> Vec<RowOutcome> {
    rows.iter()
        .map(|row| evaluate_row(row, columns, policy, now))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    NotDue,
    Rejected,
    Failed,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RoundReport {
    pub rows: usize,
    pub notified: usize,
    pub not_due: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl RoundReport {
    fn record(&mut self, delivery: Delivery) {
        self.rows += 1;
        match delivery {
            Delivery::Sent => self.notified += 1,
            Delivery::NotDue => self.not_due += 1,
            Delivery::Rejected => self.rejected += 1,
            Delivery::Failed => self.failed += 1,
        }
    }
}

/// Evaluates every row of a batch on its own task and sends the reminders that
/// are due. A bad row or a failed send never stops the other rows.
pub struct NotificationRound {
    columns: ColumnLayout,
    policy: Arc<ReminderPolicy>,
    email_client: Arc<EmailClient>,
}

impl NotificationRound {
    pub fn new(
        columns: ColumnLayout,
        policy: ReminderPolicy,
        email_client: EmailClient,
    ) -> NotificationRound {
        NotificationRound {
            columns,
            policy: Arc::new(policy),
            email_client: Arc::new(email_client),
        }
    }

    #[tracing::instrument(
        name = "Running a notification round",
        skip(self, rows, now),
        fields(round_id = %Uuid::new_v4(), rows = rows.len())
    )]
    pub async fn run(&self, rows: Vec<Vec<Value>>, now: DateTime<Utc>) -> RoundReport {
        let mut tasks = JoinSet::new();

        for (index, row) in rows.into_iter().enumerate() {
            let columns = self.columns;
            let policy = Arc::clone(&self.policy);
            let email_client = Arc::clone(&self.email_client);

            tasks.spawn(
                async move {
                    let outcome = evaluate_row(&row, &columns, &policy, now);
                    deliver(outcome, &email_client).await
                }
                .instrument(tracing::info_span!("Processing row", row = index)),
            );
        }

        let mut report = RoundReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(delivery) => report.record(delivery),
                Err(err) => {
                    tracing::error!("Row task did not complete: {:?}", err);
                    report.record(Delivery::Failed);
                }
            }
        }

        tracing::info!(
            notified = report.notified,
            not_due = report.not_due,
            rejected = report.rejected,
            failed = report.failed,
            "Notification round finished"
        );

        report
    }
}

async fn deliver(outcome: RowOutcome, email_client: &EmailClient) -> Delivery {
    match outcome {
        RowOutcome::Rejected(err) => {
            tracing::warn!("Failed to parse data from spreadsheet: {}", error_chain(&err));
            Delivery::Rejected
        }
        RowOutcome::NotDue { record, days_left } => {
            tracing::info!(
                "Not sending email to {}. Days left: {}",
                record.email.as_ref(),
                days_left
            );
            Delivery::NotDue
        }
        RowOutcome::Due { record, days_left } => {
            let email = ReminderEmail::compose(&record, days_left, email_client.sender_name());
            let sent = email_client
                .send_email(
                    &record.email,
                    &record.first_name,
                    email.subject,
                    &email.html,
                    &email.text,
                )
                .await;

            match sent {
                Ok(()) => {
                    tracing::info!(
                        "Sent email to {} at {}",
                        record.full_name(),
                        record.email.as_ref()
                    );
                    Delivery::Sent
                }
                Err(err) => {
                    tracing::error!(
                        "Failed to send an email to {}: {:?}",
                        record.email.as_ref(),
                        err
                    );
                    Delivery::Failed
                }
            }
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut current = err.source();

    while let Some(cause) = current {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        current = cause.source();
    }

    message
}
