/// Days before expiry on which a subscriber gets reminded.
pub const DEFAULT_THRESHOLDS: [i64; 3] = [1, 3, 7];

/// `true` only when `days_left` is exactly one of the default thresholds.
pub fn should_notify(days_left: i64) -> bool {
    DEFAULT_THRESHOLDS.contains(&days_left)
}

/// Thresholds are exact matches, not ranges: a subscriber with 5 days left is not
/// reminded, one with 3 days left is. Nothing records that a reminder went out,
/// so the job has to run at most once a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPolicy {
    thresholds: Vec<i64>,
}

impl ReminderPolicy {
    pub fn new(thresholds: Vec<i64>) -> ReminderPolicy {
        ReminderPolicy { thresholds }
    }

    pub fn should_notify(&self, days_left: i64) -> bool {
        self.thresholds.contains(&days_left)
    }

    pub fn thresholds(&self) -> &[i64] {
        &self.thresholds
    }
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        ReminderPolicy::new(DEFAULT_THRESHOLDS.to_vec())
    }
}
