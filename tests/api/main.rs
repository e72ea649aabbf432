mod cron_ping;
mod health_check;
mod helpers;
