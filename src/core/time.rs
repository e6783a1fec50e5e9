use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Seconds left until `deadline`, clamped at zero once it has passed.
pub(crate) fn remaining_seconds(deadline: PrimitiveDateTime, now: PrimitiveDateTime) -> i64 {
    let remaining = deadline.assume_utc().unix_timestamp() - now.assume_utc().unix_timestamp();
    remaining.max(0)
}

/// Zero-padded `MM:SS` countdown display for the remaining time.
pub(crate) fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

    fn at(hour: u8, minute: u8, second: u8) -> PrimitiveDateTime {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        PrimitiveDateTime::new(date, Time::from_hms(hour, minute, second).unwrap())
    }

    #[test]
    fn format_primitive_outputs_utc_z() {
        assert_eq!(format_primitive(at(10, 20, 30)), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn remaining_seconds_counts_down() {
        assert_eq!(remaining_seconds(at(11, 0, 0), at(10, 0, 0)), 3600);
        assert_eq!(remaining_seconds(at(10, 0, 30), at(10, 0, 0)), 30);
    }

    #[test]
    fn remaining_seconds_clamps_at_zero() {
        assert_eq!(remaining_seconds(at(10, 0, 0), at(11, 0, 0)), 0);
    }

    #[test]
    fn format_clock_zero_pads() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(5), "00:05");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(3600), "60:00");
        assert_eq!(format_clock(-10), "00:00");
    }
}
