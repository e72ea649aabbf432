mod cron_ping;
mod health_check;

pub use cron_ping::{handle_cron_ping, CronPingError, CronSecret, CRON_HEADER};
pub use health_check::health_check;
