use crate::detect::result::Detection;

/// Default minimum confidence. Kept low: the ball is small and fast, so true detections
/// often score poorly.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.3;

/// Picks the single best candidate per frame.
#[derive(Clone, Copy, Debug)]
pub struct DetectionSelector {
    min_confidence: f32,
}

impl Default for DetectionSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONFIDENCE)
    }
}

impl DetectionSelector {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    pub fn select<'a>(&self, candidates: &'a [Detection]) -> Option<&'a Detection> {
        select_best(candidates, self.min_confidence)
    }
}

/// Highest-confidence candidate at or above `min_confidence`.
///
/// Ties go to the earliest candidate in input order. Non-finite confidences never win.
pub fn select_best(candidates: &[Detection], min_confidence: f32) -> Option<&Detection> {
    let mut best: Option<&Detection> = None;
    for candidate in candidates {
        let conf = candidate.confidence;
        if !conf.is_finite() || conf < min_confidence {
            continue;
        }
        match best {
            Some(current) if current.confidence >= conf => {}
            _ => best = Some(candidate),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_selects_nothing() {
        assert!(select_best(&[], 0.3).is_none());
    }

    #[test]
    fn all_below_threshold_selects_nothing() {
        let candidates = [Detection::at(1.0, 1.0, 0.1), Detection::at(2.0, 2.0, 0.29)];
        assert!(DetectionSelector::default().select(&candidates).is_none());
    }

    #[test]
    fn picks_highest_confidence() {
        let candidates = [
            Detection::at(1.0, 1.0, 0.4),
            Detection::at(2.0, 2.0, 0.95),
            Detection::at(3.0, 3.0, 0.6),
        ];
        let best = select_best(&candidates, 0.3).unwrap();
        assert_eq!(best.x, 2.0);
        for c in &candidates {
            assert!(best.confidence >= c.confidence);
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let candidates = [Detection::at(1.0, 1.0, 0.3)];
        assert!(select_best(&candidates, 0.3).is_some());
    }

    #[test]
    fn ties_resolve_to_first_in_input_order() {
        let candidates = [
            Detection::at(5.0, 5.0, 0.8),
            Detection::at(9.0, 9.0, 0.8),
        ];
        assert_eq!(select_best(&candidates, 0.3).unwrap().x, 5.0);
    }

    #[test]
    fn nan_confidence_is_skipped() {
        let candidates = [Detection::at(1.0, 1.0, f32::NAN), Detection::at(2.0, 2.0, 0.5)];
        assert_eq!(select_best(&candidates, 0.3).unwrap().x, 2.0);
    }
}
