//! Resolves canonical timezone names to UTC offsets.

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

/// Look up the current UTC offset for a canonical timezone name such as
/// "Pacific/Auckland". Returns `None` if the name is not a known timezone.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// The current date in the given canonical timezone.
///
/// Used for validating transaction dates and picking the default budget
/// month. Returns `None` if the timezone name is not recognized.
pub fn local_date_today(canonical_timezone: &str) -> Option<time::Date> {
    get_local_offset(canonical_timezone)
        .map(|offset| OffsetDateTime::now_utc().to_offset(offset).date())
}

#[cfg(test)]
mod timezone_tests {
    use super::{get_local_offset, local_date_today};

    #[test]
    fn resolves_utc() {
        let offset = get_local_offset("Etc/UTC").expect("Etc/UTC should resolve");

        assert!(offset.is_utc());
    }

    #[test]
    fn rejects_unknown_timezone() {
        assert!(get_local_offset("Atlantis/Capital").is_none());
        assert!(local_date_today("Atlantis/Capital").is_none());
    }
}
