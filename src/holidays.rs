// Holiday calendar
// Fixed US calendar plus the household additions (Valentine's Day, Saint
// Patrick's Day, April Fool's Day, Earth Day, Cinco de Mayo, Halloween,
// Christmas Eve, New Year's Eve). Holidays are not shifted to observed dates.

use chrono::{Datelike, NaiveDate, Weekday};

/// The holiday falling on `date`, if any
pub fn holiday_for(date: NaiveDate) -> Option<&'static str> {
    let fixed = match (date.month(), date.day()) {
        (1, 1) => Some("New Year's Day"),
        (2, 14) => Some("Valentine's Day"),
        (3, 17) => Some("Saint Patrick's Day"),
        (4, 1) => Some("April Fool's Day"),
        (4, 22) => Some("Earth Day"),
        (5, 5) => Some("Cinco de Mayo"),
        (6, 19) => Some("Juneteenth National Independence Day"),
        (7, 4) => Some("Independence Day"),
        (10, 31) => Some("Halloween"),
        (11, 11) => Some("Veterans Day"),
        (12, 24) => Some("Christmas Eve"),
        (12, 25) => Some("Christmas Day"),
        (12, 31) => Some("New Year's Eve"),
        _ => None,
    };
    if fixed.is_some() {
        return fixed;
    }

    let year = date.year();
    let floating = [
        (nth_weekday(year, 1, Weekday::Mon, 3), "Martin Luther King Jr. Day"),
        (nth_weekday(year, 2, Weekday::Mon, 3), "Washington's Birthday"),
        (last_weekday(year, 5, Weekday::Mon), "Memorial Day"),
        (nth_weekday(year, 9, Weekday::Mon, 1), "Labor Day"),
        (nth_weekday(year, 10, Weekday::Mon, 2), "Columbus Day"),
        (nth_weekday(year, 11, Weekday::Thu, 4), "Thanksgiving"),
    ];
    floating
        .iter()
        .find(|(day, _)| *day == Some(date))
        .map(|(_, name)| *name)
}

/// Select the scene (by name) matching today's holiday, if both a calendar
/// entry and a matching scene exist in the zone
pub fn holiday_scene_name<'a>(date: NaiveDate, scene_names: &'a [String]) -> Option<&'a str> {
    let holiday = normalize_name(holiday_for(date)?);
    scene_names
        .iter()
        .find(|name| normalize_name(name) == holiday)
        .map(|name| name.as_str())
}

/// Normalize a holiday or scene name for matching: lowercase, strip spaces,
/// apostrophes and periods, and drop the word "day". The federal Juneteenth
/// name collapses to plain "juneteenth".
pub fn normalize_name(name: &str) -> String {
    let normalized: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\'' | '.'))
        .collect();
    let normalized = normalized.replace("day", "");
    if normalized == "juneteenthnationalindependence" {
        "juneteenth".to_string()
    } else {
        normalized
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, 5)
        .or_else(|| NaiveDate::from_weekday_of_month_opt(year, month, weekday, 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_fixed_holidays() {
        assert_eq!(holiday_for(date(2024, 10, 31)), Some("Halloween"));
        assert_eq!(holiday_for(date(2024, 2, 14)), Some("Valentine's Day"));
        assert_eq!(holiday_for(date(2024, 12, 24)), Some("Christmas Eve"));
        assert_eq!(holiday_for(date(2024, 12, 31)), Some("New Year's Eve"));
        assert_eq!(holiday_for(date(2024, 10, 30)), None);
    }

    #[test]
    fn test_floating_holidays() {
        // 2024: MLK Jan 15, Memorial May 27, Labor Sep 2, Thanksgiving Nov 28
        assert_eq!(holiday_for(date(2024, 1, 15)), Some("Martin Luther King Jr. Day"));
        assert_eq!(holiday_for(date(2024, 5, 27)), Some("Memorial Day"));
        assert_eq!(holiday_for(date(2024, 9, 2)), Some("Labor Day"));
        assert_eq!(holiday_for(date(2024, 11, 28)), Some("Thanksgiving"));
        assert_eq!(holiday_for(date(2024, 11, 21)), None);
    }

    #[test]
    fn test_memorial_day_last_monday() {
        // 2021 has a fifth Monday in May (May 31)
        assert_eq!(holiday_for(date(2021, 5, 31)), Some("Memorial Day"));
        assert_eq!(holiday_for(date(2021, 5, 24)), None);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Valentine's Day"), "valentines");
        assert_eq!(normalize_name("Saint Patrick's Day"), "saintpatricks");
        assert_eq!(normalize_name("Martin Luther King Jr. Day"), "martinlutherkingjr");
        assert_eq!(normalize_name("Halloween"), "halloween");
        assert_eq!(
            normalize_name("Juneteenth National Independence Day"),
            "juneteenth"
        );
    }

    #[test]
    fn test_holiday_scene_match() {
        let scenes = vec![
            "Halloween".to_string(),
            "Christmas".to_string(),
            "Relax".to_string(),
        ];
        assert_eq!(
            holiday_scene_name(date(2024, 10, 31), &scenes),
            Some("Halloween")
        );
        // Christmas Day normalizes to "christmas" and matches the scene
        assert_eq!(
            holiday_scene_name(date(2024, 12, 25), &scenes),
            Some("Christmas")
        );
        // holiday without a scene is not actionable
        assert_eq!(holiday_scene_name(date(2024, 2, 14), &scenes), None);
        // ordinary day
        assert_eq!(holiday_scene_name(date(2024, 3, 2), &scenes), None);
    }
}
