// Scene resolver
// Decides which time-annotated scene is "current": the most recently started
// scene wins, and scenes keep running past midnight until the next one starts

use chrono::{NaiveTime, Timelike};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Minutes elapsed since `instant` last occurred, measured backwards from
/// `now` on a wrapping 24-hour clock. An instant equal to `now` has distance
/// 0; an instant later in the clock than `now` counts as yesterday's
/// occurrence.
fn backward_distance(now: NaiveTime, instant: NaiveTime) -> i64 {
    let now = now.num_seconds_from_midnight() as i64 / 60;
    let instant = instant.num_seconds_from_midnight() as i64 / 60;
    (now - instant).rem_euclid(MINUTES_PER_DAY)
}

/// Select the scene that should currently be active.
///
/// Every candidate is eligible under the 24-hour wraparound ordering, so the
/// result is `None` only for an empty candidate list. Ties at the exact same
/// instant break to the lexically smallest scene name, which keeps the
/// selection deterministic across ticks.
pub fn current_scene<'a>(now: NaiveTime, candidates: &'a [(String, NaiveTime)]) -> Option<&'a str> {
    let mut best: Option<(&str, i64)> = None;

    for (name, instant) in candidates {
        let distance = backward_distance(now, *instant);
        let better = match best {
            None => true,
            Some((best_name, best_distance)) => {
                distance < best_distance
                    || (distance == best_distance && name.as_str() < best_name)
            }
        };
        if better {
            best = Some((name.as_str(), distance));
        }
    }

    best.map(|(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn candidates() -> Vec<(String, NaiveTime)> {
        vec![
            ("A".to_string(), time(8, 0)),
            ("B".to_string(), time(13, 0)),
            ("C".to_string(), time(20, 0)),
        ]
    }

    #[test]
    fn test_most_recent_scene_wins() {
        let scenes = candidates();
        assert_eq!(current_scene(time(15, 0), &scenes), Some("B"));
        assert_eq!(current_scene(time(21, 30), &scenes), Some("C"));
        assert_eq!(current_scene(time(9, 0), &scenes), Some("A"));
    }

    #[test]
    fn test_wraparound_after_midnight() {
        let scenes = candidates();
        // before any scene today: yesterday's 20:00 is still running
        assert_eq!(current_scene(time(2, 0), &scenes), Some("C"));
        assert_eq!(current_scene(time(7, 0), &scenes), Some("C"));
    }

    #[test]
    fn test_exact_instant_counts_as_started() {
        let scenes = candidates();
        assert_eq!(current_scene(time(13, 0), &scenes), Some("B"));
        assert_eq!(current_scene(time(12, 59), &scenes), Some("A"));
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(current_scene(time(12, 0), &[]), None);
    }

    #[test]
    fn test_single_candidate_always_current() {
        let scenes = vec![("Only".to_string(), time(22, 0))];
        assert_eq!(current_scene(time(3, 0), &scenes), Some("Only"));
        assert_eq!(current_scene(time(22, 0), &scenes), Some("Only"));
        assert_eq!(current_scene(time(21, 59), &scenes), Some("Only"));
    }

    #[test]
    fn test_tie_breaks_lexically() {
        let scenes = vec![
            ("Zebra".to_string(), time(10, 0)),
            ("Apple".to_string(), time(10, 0)),
        ];
        assert_eq!(current_scene(time(11, 0), &scenes), Some("Apple"));
        // same result regardless of candidate order
        let reversed: Vec<_> = scenes.into_iter().rev().collect();
        assert_eq!(current_scene(time(11, 0), &reversed), Some("Apple"));
    }
}
