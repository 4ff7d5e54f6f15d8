//! Picks the next question value.
//!
//! Values answered wrongly in recent sessions are drawn more often, and the
//! last few asked values are held back so the same question does not come up
//! twice in a row.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use rand::Rng;
use thiserror::Error;

use crate::model::{ErrorMap, QuestionValue};

/// Bounds of the random share of the error bonus.
const BONUS_MIN: f64 = 0.3;
const BONUS_MAX: f64 = 0.5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
    #[error("question pool is empty")]
    EmptyPool,
}

/// Anti-repeat window sizes allowed for a pool of `pool_len` values.
#[must_use]
pub fn window_range(pool_len: usize) -> RangeInclusive<usize> {
    match pool_len {
        0..=2 => 0..=0,
        3 | 4 => 0..=1,
        5 => 1..=2,
        6 => 2..=3,
        _ => 2..=4,
    }
}

/// The most recent `window` entries of `history`. A window of zero holds
/// nothing back.
#[must_use]
pub fn excluded<'a>(history: &'a [QuestionValue], window: usize) -> &'a [QuestionValue] {
    let take = window.min(history.len());
    &history[history.len() - take..]
}

//
// ─── WEIGHTS ───────────────────────────────────────────────────────────────────
//

/// Per-value draw weights derived from an error map.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorWeights {
    unit: f64,
    wrong_counts: BTreeMap<QuestionValue, usize>,
}

impl ErrorWeights {
    /// Every value weighs the same.
    #[must_use]
    pub fn uniform() -> Self {
        Self {
            unit: 0.0,
            wrong_counts: BTreeMap::new(),
        }
    }

    /// Draws the bonus share once; it stays fixed for the session.
    pub fn from_errors<R: Rng + ?Sized>(errors: &ErrorMap, rng: &mut R) -> Self {
        let wrong_counts: BTreeMap<QuestionValue, usize> = errors
            .iter()
            .filter(|(_, wrong)| !wrong.is_empty())
            .map(|(asked, wrong)| (asked.clone(), wrong.len()))
            .collect();
        let Some(&max_wrong) = wrong_counts.values().max() else {
            return Self::uniform();
        };
        #[allow(clippy::cast_precision_loss)]
        let unit = rng.random_range(BONUS_MIN..BONUS_MAX) / max_wrong as f64;
        Self { unit, wrong_counts }
    }

    #[must_use]
    pub fn wrong_count(&self, value: &QuestionValue) -> usize {
        self.wrong_counts.get(value).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn weight(&self, value: &QuestionValue) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let wrong = self.wrong_count(value) as f64;
        1.0 + self.unit * wrong
    }
}

//
// ─── SELECTOR ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
pub struct QuestionSelector {
    pool: Vec<QuestionValue>,
    weights: ErrorWeights,
}

impl QuestionSelector {
    /// # Errors
    ///
    /// Returns `SelectionError::EmptyPool` if `pool` is empty.
    pub fn new<R: Rng + ?Sized>(
        pool: Vec<QuestionValue>,
        errors: Option<&ErrorMap>,
        rng: &mut R,
    ) -> Result<Self, SelectionError> {
        if pool.is_empty() {
            return Err(SelectionError::EmptyPool);
        }
        let weights = match errors {
            Some(errors) => ErrorWeights::from_errors(errors, rng),
            None => ErrorWeights::uniform(),
        };
        Ok(Self { pool, weights })
    }

    #[must_use]
    pub fn pool(&self) -> &[QuestionValue] {
        &self.pool
    }

    #[must_use]
    pub fn weights(&self) -> &ErrorWeights {
        &self.weights
    }

    /// Draws a window size for the pool, then a value outside it.
    pub fn select_next<R: Rng + ?Sized>(
        &self,
        history: &[QuestionValue],
        rng: &mut R,
    ) -> QuestionValue {
        let window = rng.random_range(window_range(self.pool.len()));
        self.select_with_window(history, window, rng)
    }

    /// Weighted draw from the pool minus the last `window` asked values. When
    /// nothing is left the whole pool is drawn from uniformly.
    pub fn select_with_window<R: Rng + ?Sized>(
        &self,
        history: &[QuestionValue],
        window: usize,
        rng: &mut R,
    ) -> QuestionValue {
        let held_back = excluded(history, window);
        let candidates: Vec<(&QuestionValue, f64)> = self
            .pool
            .iter()
            .filter(|v| !held_back.contains(*v))
            .map(|v| (v, self.weights.weight(v)))
            .collect();

        let Some(&(last, _)) = candidates.last() else {
            return self.pool[rng.random_range(0..self.pool.len())].clone();
        };

        let total: f64 = candidates.iter().map(|(_, w)| w).sum();
        let target = rng.random_range(0.0..total);
        let mut cumulative = 0.0;
        for (value, weight) in &candidates {
            cumulative += weight;
            if target < cumulative {
                return (*value).clone();
            }
        }
        last.clone()
    }
}

/// Picks the inversion a chord question is voiced in: one of `allowed` that
/// the chord has, or root position when none fits. `None` when the value has
/// no distinct inversions.
pub fn choose_inversion<R: Rng + ?Sized>(
    allowed: &[u8],
    inversion_count: Option<usize>,
    rng: &mut R,
) -> Option<u8> {
    let count = inversion_count?;
    let fitting: Vec<u8> = allowed
        .iter()
        .copied()
        .filter(|k| usize::from(*k) < count)
        .collect();
    if fitting.is_empty() {
        return Some(0);
    }
    Some(fitting[rng.random_range(0..fitting.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn values(raw: &[&str]) -> Vec<QuestionValue> {
        raw.iter().copied().map(QuestionValue::from).collect()
    }

    fn errors(pairs: &[(&str, &str)]) -> ErrorMap {
        let mut map = ErrorMap::new();
        for (asked, answered) in pairs {
            map.entry(QuestionValue::from(*asked))
                .or_default()
                .push(QuestionValue::from(*answered));
        }
        map
    }

    #[test]
    fn window_grows_with_pool() {
        assert_eq!(window_range(1), 0..=0);
        assert_eq!(window_range(2), 0..=0);
        assert_eq!(window_range(3), 0..=1);
        assert_eq!(window_range(4), 0..=1);
        assert_eq!(window_range(5), 1..=2);
        assert_eq!(window_range(6), 2..=3);
        assert_eq!(window_range(7), 2..=4);
        assert_eq!(window_range(24), 2..=4);
    }

    #[test]
    fn zero_window_excludes_nothing() {
        let history = values(&["m2", "M2"]);
        assert!(excluded(&history, 0).is_empty());
        assert_eq!(excluded(&history, 1), &values(&["M2"])[..]);
        assert_eq!(excluded(&history, 5), &history[..]);
    }

    #[test]
    fn empty_pool_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = QuestionSelector::new(Vec::new(), None, &mut rng).unwrap_err();
        assert_eq!(err, SelectionError::EmptyPool);
    }

    #[test]
    fn never_repeats_within_the_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = values(&["m2", "M2", "m3", "M3", "P4", "A4", "P5", "m6"]);
        let selector =
            QuestionSelector::new(pool.clone(), Some(&errors(&[("P4", "P5")])), &mut rng)
                .unwrap();

        let mut history: Vec<QuestionValue> = Vec::new();
        for _ in 0..500 {
            let window = rng.random_range(window_range(pool.len()));
            let next = selector.select_with_window(&history, window, &mut rng);
            assert!(!excluded(&history, window).contains(&next));
            assert!(pool.contains(&next));
            history.push(next);
        }
    }

    #[test]
    fn select_next_honors_the_smallest_window() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = values(&[
            "ionian",
            "dorian",
            "phrygian",
            "lydian",
            "mixolydian",
            "aeolian",
            "locrian",
        ]);
        let selector = QuestionSelector::new(pool, None, &mut rng).unwrap();

        let mut history: Vec<QuestionValue> = Vec::new();
        for _ in 0..300 {
            let next = selector.select_next(&history, &mut rng);
            assert!(!excluded(&history, 2).contains(&next));
            history.push(next);
        }
    }

    #[test]
    fn falls_back_to_whole_pool_when_everything_is_held_back() {
        let mut rng = StdRng::seed_from_u64(5);
        let pool = values(&["maj", "min"]);
        let selector = QuestionSelector::new(pool.clone(), None, &mut rng).unwrap();
        let history = values(&["maj", "min"]);
        for _ in 0..20 {
            let next = selector.select_with_window(&history, 2, &mut rng);
            assert!(pool.contains(&next));
        }
    }

    #[test]
    fn more_mistakes_weigh_more() {
        let mut rng = StdRng::seed_from_u64(9);
        let weights = ErrorWeights::from_errors(
            &errors(&[("P4", "P5"), ("P4", "P5"), ("P4", "M2"), ("m3", "M3")]),
            &mut rng,
        );
        let p4 = weights.weight(&QuestionValue::from("P4"));
        let m3 = weights.weight(&QuestionValue::from("m3"));
        let m6 = weights.weight(&QuestionValue::from("M6"));
        assert!(p4 > m3 && m3 > m6);
        assert!((m6 - 1.0).abs() < f64::EPSILON);
        assert!((1.3..1.5).contains(&p4));
    }

    #[test]
    fn frequent_mistakes_are_asked_more_often() {
        let mut rng = StdRng::seed_from_u64(42);
        let pool = values(&["P4", "P5", "M2", "M6"]);
        let errors = errors(&[("P4", "P5"), ("P4", "P5"), ("P4", "M2")]);
        let selector = QuestionSelector::new(pool, Some(&errors), &mut rng).unwrap();

        let (mut p4, mut m6) = (0, 0);
        let mut history: Vec<QuestionValue> = Vec::new();
        for _ in 0..1000 {
            let next = selector.select_with_window(&history, 1, &mut rng);
            match next.as_str() {
                "P4" => p4 += 1,
                "M6" => m6 += 1,
                _ => {}
            }
            history.push(next);
        }
        assert!(p4 > m6, "P4 drawn {p4} times, M6 {m6} times");
    }

    #[test]
    fn inversions_fit_the_chord() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(choose_inversion(&[0, 1, 2, 3], None, &mut rng), None);
        for _ in 0..50 {
            let k = choose_inversion(&[0, 1, 2, 3], Some(3), &mut rng).unwrap();
            assert!(k < 3);
        }
        assert_eq!(choose_inversion(&[3], Some(3), &mut rng), Some(0));
        assert_eq!(choose_inversion(&[2], Some(4), &mut rng), Some(2));
    }
}
