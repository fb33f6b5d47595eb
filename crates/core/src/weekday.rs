//! Weekday name parsing and display.

use time::Weekday;

/// Parse an English weekday name or common abbreviation, ignoring case
/// and surrounding whitespace.
///
/// Accepts full names ("tuesday") and the usual short forms ("tue",
/// "tues", "thurs", ...). Returns `None` for anything else.
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    let name = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    let weekday = match name.as_str() {
        "monday" | "mon" => Weekday::Monday,
        "tuesday" | "tue" | "tues" => Weekday::Tuesday,
        "wednesday" | "wed" | "weds" => Weekday::Wednesday,
        "thursday" | "thu" | "thur" | "thurs" => Weekday::Thursday,
        "friday" | "fri" => Weekday::Friday,
        "saturday" | "sat" => Weekday::Saturday,
        "sunday" | "sun" => Weekday::Sunday,
        _ => return None,
    };
    Some(weekday)
}

/// Full English name of a weekday.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Monday => "Monday",
        Weekday::Tuesday => "Tuesday",
        Weekday::Wednesday => "Wednesday",
        Weekday::Thursday => "Thursday",
        Weekday::Friday => "Friday",
        Weekday::Saturday => "Saturday",
        Weekday::Sunday => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_names_case_insensitively() {
        assert_eq!(parse_weekday("Tuesday"), Some(Weekday::Tuesday));
        assert_eq!(parse_weekday("SUNDAY"), Some(Weekday::Sunday));
        assert_eq!(parse_weekday("  friday "), Some(Weekday::Friday));
    }

    #[test]
    fn parses_abbreviations() {
        assert_eq!(parse_weekday("Tue"), Some(Weekday::Tuesday));
        assert_eq!(parse_weekday("tues"), Some(Weekday::Tuesday));
        assert_eq!(parse_weekday("Thurs."), Some(Weekday::Thursday));
        assert_eq!(parse_weekday("weds"), Some(Weekday::Wednesday));
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(parse_weekday("tu"), None);
        assert_eq!(parse_weekday("someday"), None);
        assert_eq!(parse_weekday(""), None);
    }

    #[test]
    fn name_round_trips_through_parser() {
        for weekday in [
            Weekday::Monday,
            Weekday::Tuesday,
            Weekday::Wednesday,
            Weekday::Thursday,
            Weekday::Friday,
            Weekday::Saturday,
            Weekday::Sunday,
        ] {
            assert_eq!(parse_weekday(weekday_name(weekday)), Some(weekday));
        }
    }
}
