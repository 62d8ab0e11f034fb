use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Seconds since the Unix epoch. May be negative: a freshly discovered user
/// is stamped "epoch minus TTL" so that it is stale from the start.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Unixtime(pub i64);

impl Unixtime {
    pub fn now() -> Unixtime {
        Unixtime(OffsetDateTime::now_utc().unix_timestamp())
    }
}

fn secs(d: Duration) -> i64 {
    i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}

impl Add<Duration> for Unixtime {
    type Output = Unixtime;

    fn add(self, rhs: Duration) -> Unixtime {
        Unixtime(self.0.saturating_add(secs(rhs)))
    }
}

impl Sub<Duration> for Unixtime {
    type Output = Unixtime;

    fn sub(self, rhs: Duration) -> Unixtime {
        Unixtime(self.0.saturating_sub(secs(rhs)))
    }
}

impl fmt::Display for Unixtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match OffsetDateTime::from_unix_timestamp(self.0)
            .ok()
            .and_then(|dt| dt.format(&Rfc3339).ok())
        {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "@{}", self.0),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unixtime_arithmetic() {
        let week = Duration::from_secs(7 * 86400);
        let blank = Unixtime(0) - week;
        assert_eq!(blank.0, -604800);
        assert_eq!(blank + week, Unixtime(0));
    }

    #[test]
    fn test_unixtime_huge_duration_saturates() {
        let forever = Duration::from_secs(u64::MAX);
        assert_eq!(Unixtime(1_700_000_000) + forever, Unixtime(i64::MAX));
        assert_eq!(Unixtime(0) - forever, Unixtime(-i64::MAX));
        assert_eq!(Unixtime(-10) - forever, Unixtime(i64::MIN));
    }

    #[test]
    fn test_unixtime_display() {
        assert_eq!(format!("{}", Unixtime(0)), "1970-01-01T00:00:00Z");
    }
}
