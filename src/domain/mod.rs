pub mod expiry_date;
pub mod reminder_policy;
pub mod sender_email;
pub mod subscriber_email;
pub mod subscriber_record;
