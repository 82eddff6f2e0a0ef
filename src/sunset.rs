// Sunset cache
// Sunset drifts daily, so a cached value is only valid for the calendar day
// it was fetched on. A stale day's value must never be served: resolving a
// sunset-relative scene against yesterday's sunset would silently shift its
// activation time.

use chrono::{NaiveDate, NaiveTime};

#[derive(Debug, Default)]
pub struct SunsetCache {
    cached: Option<(NaiveDate, NaiveTime)>,
}

impl SunsetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Today's sunset, if a value for `today` has been recorded
    pub fn get(&self, today: NaiveDate) -> Option<NaiveTime> {
        match self.cached {
            Some((date, sunset)) if date == today => Some(sunset),
            _ => None,
        }
    }

    /// Record today's sunset (called after a successful provider fetch)
    pub fn update(&mut self, today: NaiveDate, sunset: NaiveTime) {
        self.cached = Some((today, sunset));
    }

    /// Whether a fetch is needed for `today`
    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.get(today).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_empty_cache_has_no_sunset() {
        let cache = SunsetCache::new();
        assert_eq!(cache.get(date(2024, 6, 1)), None);
        assert!(cache.is_stale(date(2024, 6, 1)));
    }

    #[test]
    fn test_same_day_value_is_served() {
        let mut cache = SunsetCache::new();
        let sunset = NaiveTime::from_hms_opt(20, 15, 0).unwrap();
        cache.update(date(2024, 6, 1), sunset);

        assert_eq!(cache.get(date(2024, 6, 1)), Some(sunset));
        assert!(!cache.is_stale(date(2024, 6, 1)));
    }

    #[test]
    fn test_previous_day_value_is_never_reused() {
        let mut cache = SunsetCache::new();
        cache.update(date(2024, 6, 1), NaiveTime::from_hms_opt(20, 15, 0).unwrap());

        assert_eq!(cache.get(date(2024, 6, 2)), None);
        assert!(cache.is_stale(date(2024, 6, 2)));
    }

    #[test]
    fn test_update_replaces_old_day() {
        let mut cache = SunsetCache::new();
        cache.update(date(2024, 6, 1), NaiveTime::from_hms_opt(20, 15, 0).unwrap());
        let next = NaiveTime::from_hms_opt(20, 16, 0).unwrap();
        cache.update(date(2024, 6, 2), next);

        assert_eq!(cache.get(date(2024, 6, 2)), Some(next));
        assert_eq!(cache.get(date(2024, 6, 1)), None);
    }
}
