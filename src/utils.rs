use chrono::{DateTime, Local, TimeZone};

/// Get the current local time formatted as an alarm timestamp
///
/// The format is `YYYY-MM-DD HH:MM:SS`, matching the `date` field of alarm
/// entries.
///
/// # Examples
///
/// ```
/// use arx_ring::utils::current_datetime_string;
///
/// let stamp = current_datetime_string();
/// assert_eq!(stamp.len(), 19);
/// ```
#[must_use]
pub fn current_datetime_string() -> String {
    format_datetime(&Local::now())
}

/// Format any timestamp the way alarm entries store it
pub fn format_datetime<Tz: TimeZone>(moment: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    moment.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format_datetime_pads_fields() {
        let moment = Utc
            .with_ymd_and_hms(2024, 3, 7, 9, 5, 1)
            .single()
            .expect("Valid test timestamp");
        assert_eq!(format_datetime(&moment), "2024-03-07 09:05:01");
    }

    #[test]
    fn test_current_datetime_string_format() {
        let stamp = current_datetime_string();
        let (date, time) = stamp.split_once(' ').expect("Timestamp has a space");

        let date_parts: Vec<&str> = date.split('-').collect();
        assert_eq!(date_parts.len(), 3);
        assert_eq!(date_parts[0].len(), 4);

        let time_parts: Vec<&str> = time.split(':').collect();
        assert_eq!(time_parts.len(), 3);
        for part in date_parts.iter().skip(1).chain(time_parts.iter()) {
            assert_eq!(part.len(), 2);
            assert!(part.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
