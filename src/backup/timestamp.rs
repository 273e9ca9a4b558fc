use chrono::{DateTime, NaiveDateTime, SecondsFormat, Timelike, Utc};
use std::fmt::{Display, Formatter};

static TOKEN_FORMAT: &str = "%Y%m%d_%H%M%S";
pub static UTC_SUFFIX: &str = "_UTC";
/// Width of the `YYYYMMDD_HHMMSS` part shared by current and legacy tokens
pub const TOKEN_WIDTH: usize = 15;

/// Identity of one run, at second precision in UTC.
///
/// Rendered as `YYYYMMDD_HHMMSS_UTC`, which sorts lexicographically in time order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunTimestamp(DateTime<Utc>);

impl RunTimestamp {
    pub fn now() -> Self {
        Self::from_date_time(Utc::now())
    }

    pub fn from_date_time(dt: DateTime<Utc>) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    pub fn date_time(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn token(&self) -> String {
        format!("{}{}", self.0.format(TOKEN_FORMAT), UTC_SUFFIX)
    }

    pub fn rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Parses `YYYYMMDD_HHMMSS_UTC`, or the legacy suffix-less `YYYYMMDD_HHMMSS`
    pub fn parse_token(token: &str) -> Option<Self> {
        let digits = token.strip_suffix(UTC_SUFFIX).unwrap_or(token);
        NaiveDateTime::parse_from_str(digits, TOKEN_FORMAT)
            .ok()
            .map(|naive| Self(naive.and_utc()))
    }
}

impl Display for RunTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.token())
    }
}

/// Ordering key of a token: its date-time digits without the zone suffix
pub fn sort_key(token: &str) -> &str {
    token.get(..TOKEN_WIDTH).unwrap_or(token)
}
