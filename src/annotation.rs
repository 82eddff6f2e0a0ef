// Scene time-annotation parser
// Scene names carry their activation time in a trailing parenthetical,
// e.g. "Relax (10:30pm)" or "Evening (Sunset-30m)"

use chrono::{Duration, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

/// A parsed scene time annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAnnotation {
    /// Absolute wall-clock time, normalized to a 24-hour clock
    Absolute { hour: u32, minute: u32 },
    /// Signed offset in minutes relative to today's sunset
    SunsetRelative { offset_minutes: i32 },
}

fn trailing_parenthetical() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^()]*)\)\s*$").unwrap())
}

fn absolute_grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(1[0-2]|0?[1-9])(?::([0-5][0-9]))?\s*(am|pm)\s*$").unwrap()
    })
}

fn sunset_grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*sunset\s*(?:([+-])\s*(\d{1,4})\s*(m|min|minutes|h|hr|hours))?\s*$")
            .unwrap()
    })
}

impl TimeAnnotation {
    /// Parse the time annotation out of a scene display name.
    ///
    /// Returns `None` both when no trailing parenthetical exists (the common
    /// case for scenes that are not time-based) and when the parenthetical
    /// text matches neither grammar. Callers treat either as "no time
    /// association", never as a fatal error.
    pub fn from_scene_name(name: &str) -> Option<Self> {
        let captures = trailing_parenthetical().captures(name)?;
        Self::parse(captures.get(1)?.as_str())
    }

    /// Parse annotation text (the content between the parentheses)
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(caps) = absolute_grammar().captures(text) {
            let hour12: u32 = caps.get(1)?.as_str().parse().ok()?;
            let minute: u32 = match caps.get(2) {
                Some(m) => m.as_str().parse().ok()?,
                None => 0,
            };
            let pm = caps.get(3)?.as_str().eq_ignore_ascii_case("pm");
            // 12am is midnight, 12pm is noon
            let hour = match (hour12, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            };
            return Some(TimeAnnotation::Absolute { hour, minute });
        }

        if let Some(caps) = sunset_grammar().captures(text) {
            let offset_minutes = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(sign), Some(magnitude), Some(unit)) => {
                    let magnitude: i32 = magnitude.as_str().parse().ok()?;
                    let minutes = if unit.as_str().to_ascii_lowercase().starts_with('h') {
                        magnitude.checked_mul(60)?
                    } else {
                        magnitude
                    };
                    if sign.as_str() == "-" {
                        -minutes
                    } else {
                        minutes
                    }
                }
                // bare "Sunset" means exactly sunset
                _ => 0,
            };
            return Some(TimeAnnotation::SunsetRelative { offset_minutes });
        }

        None
    }

    /// Resolve this annotation to a time-of-day for "today".
    ///
    /// Sunset-relative annotations resolve only when today's sunset is known;
    /// an unavailable sunset yields `None` so the scene is skipped rather than
    /// defaulted to a wrong instant.
    pub fn resolve(&self, sunset: Option<NaiveTime>) -> Option<NaiveTime> {
        match *self {
            TimeAnnotation::Absolute { hour, minute } => NaiveTime::from_hms_opt(hour, minute, 0),
            TimeAnnotation::SunsetRelative { offset_minutes } => {
                let sunset = sunset?;
                Some(sunset + Duration::minutes(offset_minutes as i64))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn abs(hour: u32, minute: u32) -> Option<TimeAnnotation> {
        Some(TimeAnnotation::Absolute { hour, minute })
    }

    fn rel(offset_minutes: i32) -> Option<TimeAnnotation> {
        Some(TimeAnnotation::SunsetRelative { offset_minutes })
    }

    #[test]
    fn test_absolute_annotations() {
        assert_eq!(TimeAnnotation::from_scene_name("Wake up (7am)"), abs(7, 0));
        assert_eq!(TimeAnnotation::from_scene_name("Relax (10:30pm)"), abs(22, 30));
        assert_eq!(TimeAnnotation::from_scene_name("Midnight (12am)"), abs(0, 0));
        assert_eq!(TimeAnnotation::from_scene_name("Lunch (12:30pm)"), abs(12, 30));
        assert_eq!(TimeAnnotation::from_scene_name("Late (11:45pm)"), abs(23, 45));
    }

    #[test]
    fn test_absolute_case_and_whitespace() {
        assert_eq!(TimeAnnotation::parse(" 9 AM "), abs(9, 0));
        assert_eq!(TimeAnnotation::parse("9:05Pm"), abs(21, 5));
        assert_eq!(TimeAnnotation::parse("09:05pm"), abs(21, 5));
    }

    #[test]
    fn test_sunset_annotations() {
        assert_eq!(TimeAnnotation::from_scene_name("Evening (Sunset)"), rel(0));
        assert_eq!(TimeAnnotation::from_scene_name("Dusk (Sunset-30m)"), rel(-30));
        assert_eq!(TimeAnnotation::from_scene_name("Night (Sunset+1h)"), rel(60));
        assert_eq!(TimeAnnotation::parse("sunset - 90 min"), rel(-90));
        assert_eq!(TimeAnnotation::parse("Sunset+2hours"), rel(120));
        assert_eq!(TimeAnnotation::parse("SUNSET + 15 minutes"), rel(15));
        assert_eq!(TimeAnnotation::parse("sunset-1hr"), rel(-60));
    }

    #[test]
    fn test_no_annotation() {
        assert_eq!(TimeAnnotation::from_scene_name("Tropical Twilight"), None);
        assert_eq!(TimeAnnotation::from_scene_name("Rainy"), None);
        // text present but matching neither grammar is "no annotation", not an error
        assert_eq!(TimeAnnotation::from_scene_name("Party (bright)"), None);
        assert_eq!(TimeAnnotation::from_scene_name("Oops (25pm)"), None);
        assert_eq!(TimeAnnotation::from_scene_name("Oops (7)"), None);
        assert_eq!(TimeAnnotation::from_scene_name("Oops (sunset+m)"), None);
    }

    #[test]
    fn test_last_parenthetical_wins() {
        assert_eq!(
            TimeAnnotation::from_scene_name("Movie (cozy) (8pm)"),
            abs(20, 0)
        );
        // annotation must be at the end of the name
        assert_eq!(TimeAnnotation::from_scene_name("(8pm) Movie"), None);
    }

    #[test]
    fn test_resolve_absolute() {
        let annotation = TimeAnnotation::Absolute { hour: 22, minute: 30 };
        assert_eq!(
            annotation.resolve(None),
            NaiveTime::from_hms_opt(22, 30, 0)
        );
    }

    #[test]
    fn test_resolve_sunset_relative() {
        let sunset = NaiveTime::from_hms_opt(19, 42, 0);
        assert_eq!(
            TimeAnnotation::SunsetRelative { offset_minutes: 60 }.resolve(sunset),
            NaiveTime::from_hms_opt(20, 42, 0)
        );
        assert_eq!(
            TimeAnnotation::SunsetRelative { offset_minutes: -90 }.resolve(sunset),
            NaiveTime::from_hms_opt(18, 12, 0)
        );
        assert_eq!(
            TimeAnnotation::SunsetRelative { offset_minutes: 0 }.resolve(sunset),
            sunset
        );
        // no sunset available: resolve to nothing, never to a default
        assert_eq!(
            TimeAnnotation::SunsetRelative { offset_minutes: 0 }.resolve(None),
            None
        );
    }

    proptest! {
        #[test]
        fn prop_absolute_roundtrip(hour12 in 1u32..=12, minute in 0u32..60, pm in any::<bool>()) {
            let meridiem = if pm { "pm" } else { "am" };
            let text = format!("{}:{:02}{}", hour12, minute, meridiem);
            let expected_hour = match (hour12, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            };
            prop_assert_eq!(
                TimeAnnotation::parse(&text),
                Some(TimeAnnotation::Absolute { hour: expected_hour, minute })
            );
        }

        #[test]
        fn prop_hour_only_defaults_to_zero_minutes(hour12 in 1u32..=12, pm in any::<bool>()) {
            let meridiem = if pm { "PM" } else { "AM" };
            let text = format!("{} {}", hour12, meridiem);
            let parsed = TimeAnnotation::parse(&text);
            let hour_only = matches!(parsed, Some(TimeAnnotation::Absolute { minute: 0, .. }));
            prop_assert!(hour_only, "parsed {:?} from {:?}", parsed, text);
        }

        #[test]
        fn prop_sunset_offsets(magnitude in 0i32..600, negative in any::<bool>(), hours in any::<bool>()) {
            let sign = if negative { "-" } else { "+" };
            let (unit, expected) = if hours {
                ("h", magnitude * 60)
            } else {
                ("m", magnitude)
            };
            let text = format!("Sunset{}{}{}", sign, magnitude, unit);
            let expected = if negative { -expected } else { expected };
            prop_assert_eq!(
                TimeAnnotation::parse(&text),
                Some(TimeAnnotation::SunsetRelative { offset_minutes: expected })
            );
        }
    }
}
