use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("malformed date format: date should be in either YYYY-MM-DD or DD/MM/YY formats")]
pub struct MalformedDate;

/// Calendar date as written in the spreadsheet. Month and day are kept as read,
/// out-of-range values only get normalized when the expiry instant is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ParsedDate {
    pub year: i32,
    pub month: i32,
    pub day: i32,
}

impl ParsedDate {
    /// Accepts `YYYY-MM-DD` or `DD/MM/YY`.
    ///
    /// The dashed form needs its first dash at index 4 or later, so `18-05-30` is
    /// rejected. The slashed form is always read day first: `18/05/30` is the
    /// 18th of May 2030.
    pub fn parse(raw: &str) -> Result<ParsedDate, MalformedDate> {
        let date = raw.trim_matches(' ');

        if let Some(dash) = date.find('-') {
            if dash < 4 {
                return Err(MalformedDate);
            }
            let compact = date.replace('-', "");
            let mut scanner = NumberScanner::new(&compact);
            let year = scanner.next_number(4)?;
            let month = scanner.next_number(2)?;
            let day = scanner.next_number(2)?;

            return Ok(ParsedDate { year, month, day });
        }

        if let Some(slash) = date.find('/') {
            if slash < 1 {
                return Err(MalformedDate);
            }
            let compact = date.replace('/', "");
            let mut scanner = NumberScanner::new(&compact);
            let day = scanner.next_number(2)?;
            let month = scanner.next_number(2)?;
            let short_year = scanner.next_number(2)?;

            return Ok(ParsedDate {
                year: 2000 + short_year,
                month,
                day,
            });
        }

        Err(MalformedDate)
    }

    /// Midnight UTC of this date. Month 13 becomes January of the next year,
    /// day 0 the last day of the previous month, and so on.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let months = i64::from(self.year) * 12 + i64::from(self.month) - 1;
        let year = i32::try_from(months.div_euclid(12)).ok()?;
        let month = u32::try_from(months.rem_euclid(12) + 1).ok()?;
        let first_of_month = NaiveDate::from_ymd_opt(year, month, 1)?;
        let date = first_of_month.checked_add_signed(Duration::days(i64::from(self.day) - 1))?;

        Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
    }
}

/// Whole days between `now` and `expires_at`: hours truncated toward zero, then
/// divided by 24. Already expired subscriptions give negative values.
pub fn days_left(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires_at - now).num_hours() / 24
}

/// Reads fixed-width decimal fields one after the other, stopping a field early
/// at the first non digit. Anything left after the last field is ignored.
struct NumberScanner<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> NumberScanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    fn next_number(&mut self, width: usize) -> Result<i32, MalformedDate> {
        let bytes = self.input.as_bytes();

        while bytes.get(self.position) == Some(&b' ') {
            self.position += 1;
        }

        let start = self.position;
        while self.position - start < width
            && bytes
                .get(self.position)
                .map_or(false, |byte| byte.is_ascii_digit())
        {
            self.position += 1;
        }

        if self.position == start {
            return Err(MalformedDate);
        }

        self.input[start..self.position]
            .parse()
            .map_err(|_| MalformedDate)
    }
}
