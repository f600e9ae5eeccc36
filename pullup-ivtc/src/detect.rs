//! Cadence position detectors.
//!
//! Two independent detectors run on every frame once the PCN stencil is
//! full. The statistical one ("scores") picks the candidate position whose
//! progressive field pairings show the least combing and judges its own
//! reliability from how much of an outlier the winner is. The propagation
//! one ("vektor") works only from hard field repeats, keeping a bitmask of
//! positions still possible and narrowing it as the cadence advances; it is
//! slower to lock on but in practice never wrong when it does. A finalizer
//! picks the winner for the frame.

use tracing::trace;

use crate::cadence::{
    predict_next_mask, unique_position, CadencePosition, FieldDominance, FieldPair,
    FieldPairScores, VEKTOR_ALL, VEKTOR_BFF, VEKTOR_TFF,
};
use crate::config::IvtcConfig;
use crate::history::Window3;
use crate::metrics::{estimate_motion, interlace_score, MotionEstimate};
use pullup_core::Frame;

/// Per-frame measurements and detector results over the last three frames.
#[derive(Debug, Clone)]
pub struct DetectorState {
    /// Interlace scores of the 7 field pairings of the current window.
    pub pair_scores: FieldPairScores,
    /// Whether the top field hard-repeated, per frame.
    pub top_repeat: Window3<bool>,
    /// Whether the bottom field hard-repeated, per frame.
    pub bottom_repeat: Window3<bool>,
    /// Blocks with motion between each frame and its predecessor.
    pub motion: Window3<u32>,
    /// Position picked by the statistical detector.
    pub scores_pos: Window3<Option<CadencePosition>>,
    /// Reliability flag of the statistical detector.
    pub scores_reliable: Window3<bool>,
    /// Raw possibility mask of the propagation detector.
    pub vektor_raw: Window3<u16>,
    /// Position pinned down by the propagation detector, if unique.
    pub vektor_pos: Window3<Option<CadencePosition>>,
    /// Reliability flag of the propagation detector.
    pub vektor_reliable: Window3<bool>,
    /// Finalized position per frame (best detector wins).
    pub final_pos: Window3<Option<CadencePosition>>,
    /// Whether the whole window looked progressive, per analyzed frame.
    pub all_progressive: Window3<bool>,
}

impl DetectorState {
    /// Fresh state with no detections.
    pub fn new() -> Self {
        Self {
            pair_scores: FieldPairScores::new(),
            top_repeat: Window3::filled(false),
            bottom_repeat: Window3::filled(false),
            motion: Window3::filled(0),
            scores_pos: Window3::filled(None),
            scores_reliable: Window3::filled(false),
            vektor_raw: Window3::filled(VEKTOR_ALL),
            vektor_pos: Window3::filled(None),
            vektor_reliable: Window3::filled(false),
            final_pos: Window3::filled(None),
            all_progressive: Window3::filled(false),
        }
    }

    /// Slide all histories one frame forward. The latest slots become
    /// "not yet detected" values that this frame's detectors fill in.
    pub fn slide(&mut self) {
        self.top_repeat.push(false);
        self.bottom_repeat.push(false);
        self.motion.push(0);
        self.scores_pos.push(None);
        self.scores_reliable.push(false);
        self.vektor_raw.push(VEKTOR_ALL);
        self.vektor_pos.push(None);
        self.vektor_reliable.push(false);
        self.final_pos.push(None);
        self.all_progressive.push(false);
        self.pair_scores.slide();
    }
}

impl Default for DetectorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Interlace score of a woven pair, treating a failed measurement as
/// "no combing seen".
pub fn score_or_zero(top_src: &Frame, bottom_src: &Frame, comb_threshold: i32) -> i32 {
    match interlace_score(top_src, bottom_src, comb_threshold) {
        Ok(score) => score as i32,
        Err(err) => {
            trace!("interlace score unavailable: {err}");
            0
        }
    }
}

/// Compute the raw per-frame measurements: the three interlace scores that
/// involve the new Next frame, the motion estimate against Current, and the
/// hard field-repeat flags.
pub fn low_level_detect(state: &mut DetectorState, curr: &Frame, next: &Frame, cfg: &IvtcConfig) {
    state.pair_scores[FieldPair::TnBn] = score_or_zero(next, next, cfg.comb_threshold);
    state.pair_scores[FieldPair::TnBc] = score_or_zero(next, curr, cfg.comb_threshold);
    state.pair_scores[FieldPair::TcBn] = score_or_zero(curr, next, cfg.comb_threshold);

    let est = match estimate_motion(curr, next, cfg.motion_threshold) {
        Ok(est) => est,
        Err(err) => {
            trace!("motion estimate unavailable: {err}");
            MotionEstimate::default()
        }
    };
    state.motion.set_latest(est.blocks_with_motion);

    // If one field changes clearly more than the other, the less changed
    // one is a likely duplicate. The 2/3 ratio comes from tuning; 1/2 was
    // too low for slow pans.
    let (top_repeat, bottom_repeat) = est.field_repeats();
    state.top_repeat.set_latest(top_repeat);
    state.bottom_repeat.set_latest(bottom_repeat);
}

/// The statistical detector: sum the interlace scores of the progressive
/// field pairings of each candidate position and pick the minimum.
///
/// Reliability requires motion (without it the candidate pictures are not
/// unique), the winner pulling the sample mean down by a minimum margin,
/// and either the winner inflating the sample variance or the position
/// being the successor of the previous frame's finalized position (be
/// optimistic when the cadence is advancing as expected).
pub fn detect_scores(state: &mut DetectorState, dominance: FieldDominance, cfg: &IvtcConfig) {
    let candidates = CadencePosition::candidates(dominance);
    let sums: [i64; 5] = candidates.map(|pos| {
        pos.best_pairs()
            .iter()
            .map(|&pair| state.pair_scores[pair] as i64)
            .sum()
    });

    // First candidate is Progressive; ties favor it.
    let mut min_index = 0;
    for i in 1..sums.len() {
        if sums[i] < sums[min_index] {
            min_index = i;
        }
    }
    let winner = candidates[min_index];

    let n = sums.len() as i64;
    let total: i64 = sums.iter().sum();
    let mean = total / n;
    let mean_except_min = (total - sums[min_index]) / (n - 1);

    let var: i64 = sums.iter().map(|&s| (s - mean) * (s - mean)).sum::<i64>() / n;
    let var_except_min: i64 = sums
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != min_index)
        .map(|(_, &s)| (s - mean_except_min) * (s - mean_except_min))
        .sum::<i64>()
        / (n - 1);

    let expected = state
        .final_pos
        .previous()
        .is_some_and(|prev| winner.step() == (prev.step() + 1) % 5);

    // The ratios are empirical constants; see IvtcConfig. With all scores
    // equal both ratios degenerate (0/0) and the comparisons stay false.
    let mean_ratio = mean_except_min as f64 / mean as f64;
    let reliable = state.motion.latest() > 0
        && mean_ratio > cfg.min_mean_ratio
        && (expected || (var as f64) > cfg.min_variance_ratio * var_except_min as f64);

    state.scores_pos.set_latest(Some(winner));
    state.scores_reliable.set_latest(reliable);
}

/// The propagation detector.
///
/// Conservative: field repeats that *are* seen add possible positions, but
/// absent repeats never remove any (full-frame repeats in the source film
/// would otherwise break an acquired lock-on). The accumulated possibility
/// mask is narrowed against the prediction from the previous frame; an
/// inconsistent sequence resets the mask to "anything".
pub fn detect_vektor(state: &mut DetectorState, dominance: FieldDominance) {
    // Progressive requires no repeats, so it is always possible.
    let mut detected = CadencePosition::Progressive.bitmask();

    if state.top_repeat.latest() {
        detected |= CadencePosition::TffEab.bitmask();
        detected |= CadencePosition::BffBcd.bitmask();
    }
    if state.top_repeat.previous() {
        detected |= CadencePosition::TffAbc.bitmask();
        detected |= CadencePosition::BffCde.bitmask();
    }
    if state.bottom_repeat.latest() {
        detected |= CadencePosition::TffBcd.bitmask();
        detected |= CadencePosition::BffEab.bitmask();
    }
    if state.bottom_repeat.previous() {
        detected |= CadencePosition::TffCde.bitmask();
        detected |= CadencePosition::BffAbc.bitmask();
    }

    // A TFF stream can only carry TFF telecine, and vice versa.
    detected &= match dominance {
        FieldDominance::TopFirst => VEKTOR_TFF,
        FieldDominance::BottomFirst => VEKTOR_BFF,
    };

    let predicted = predict_next_mask(state.vektor_raw.previous());
    detected = if detected & predicted != 0 {
        detected & predicted
    } else {
        VEKTOR_ALL
    };
    state.vektor_raw.set_latest(detected);

    let exact = unique_position(detected);
    state.vektor_pos.set_latest(exact);
    state.vektor_reliable.set_latest(exact.is_some());
}

/// Pick the finalized position for this frame. The propagation detector is
/// trusted first (when it is unique it is effectively never wrong), then the
/// statistical one, else the frame stays undetected.
pub fn finalize_position(state: &mut DetectorState) {
    let pos = if state.vektor_reliable.latest() {
        state.vektor_pos.latest()
    } else if state.scores_reliable.latest() {
        state.scores_pos.latest()
    } else {
        None
    };
    state.final_pos.set_latest(pos);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_scores(values: [(FieldPair, i32); 7]) -> DetectorState {
        let mut state = DetectorState::new();
        for (pair, value) in values {
            state.pair_scores[pair] = value;
        }
        state
    }

    #[test]
    fn test_scores_picks_clean_candidate() {
        use FieldPair::*;
        // Scores shaped like a TFF window at bcd: TcBp, TnBc, TnBn clean.
        let mut state = state_with_scores([
            (TpBp, 4000),
            (TpBc, 4000),
            (TcBp, 0),
            (TcBc, 4000),
            (TcBn, 4000),
            (TnBc, 0),
            (TnBn, 0),
        ]);
        state.motion.set_latest(10);

        detect_scores(&mut state, FieldDominance::TopFirst, &IvtcConfig::default());

        assert_eq!(state.scores_pos.latest(), Some(CadencePosition::TffBcd));
        assert!(state.scores_reliable.latest());
    }

    #[test]
    fn test_scores_unreliable_without_motion() {
        use FieldPair::*;
        let mut state = state_with_scores([
            (TpBp, 4000),
            (TpBc, 4000),
            (TcBp, 0),
            (TcBc, 4000),
            (TcBn, 4000),
            (TnBc, 0),
            (TnBn, 0),
        ]);
        state.motion.set_latest(0);

        detect_scores(&mut state, FieldDominance::TopFirst, &IvtcConfig::default());

        assert!(!state.scores_reliable.latest());
    }

    #[test]
    fn test_scores_all_zero_is_unreliable() {
        let mut state = DetectorState::new();
        state.motion.set_latest(10);

        detect_scores(&mut state, FieldDominance::TopFirst, &IvtcConfig::default());

        // Every candidate ties at zero; nothing is an outlier.
        assert_eq!(
            state.scores_pos.latest(),
            Some(CadencePosition::Progressive)
        );
        assert!(!state.scores_reliable.latest());
    }

    #[test]
    fn test_vektor_needs_history_to_lock() {
        let mut state = DetectorState::new();
        // A single top repeat is consistent with several positions.
        state.top_repeat.set_latest(true);
        detect_vektor(&mut state, FieldDominance::TopFirst);
        assert!(!state.vektor_reliable.latest());
    }

    #[test]
    fn test_vektor_locks_on_repeat_sequence() {
        // Walk the detector through TFF pulldown cycles: top repeats when
        // the window sits at eab, bottom repeats at bcd, nothing else.
        let repeats_by_step = |step: u8| -> (bool, bool) {
            match step {
                0 => (true, false),
                2 => (false, true),
                _ => (false, false),
            }
        };

        let mut state = DetectorState::new();
        let mut locked_at = None;
        for frame in 0..10u8 {
            let step = frame % 5;
            state.slide();
            let (top, bottom) = repeats_by_step(step);
            state.top_repeat.set_latest(top);
            state.bottom_repeat.set_latest(bottom);

            detect_vektor(&mut state, FieldDominance::TopFirst);
            finalize_position(&mut state);

            if state.vektor_reliable.latest() && locked_at.is_none() {
                locked_at = Some(frame);
            }
            if let (Some(pos), true) = (state.vektor_pos.latest(), state.vektor_reliable.latest())
            {
                assert_eq!(pos.step(), step);
            }
        }
        // One cycle of repeats is enough to pin the position down.
        assert!(locked_at.is_some_and(|frame| frame <= 5));
    }

    #[test]
    fn test_finalize_prefers_vektor() {
        let mut state = DetectorState::new();
        state.vektor_pos.set_latest(Some(CadencePosition::TffAbc));
        state.vektor_reliable.set_latest(true);
        state.scores_pos.set_latest(Some(CadencePosition::TffCde));
        state.scores_reliable.set_latest(true);

        finalize_position(&mut state);
        assert_eq!(state.final_pos.latest(), Some(CadencePosition::TffAbc));
    }

    #[test]
    fn test_finalize_falls_back_to_scores_then_none() {
        let mut state = DetectorState::new();
        state.scores_pos.set_latest(Some(CadencePosition::TffCde));
        state.scores_reliable.set_latest(true);

        finalize_position(&mut state);
        assert_eq!(state.final_pos.latest(), Some(CadencePosition::TffCde));

        state.scores_reliable.set_latest(false);
        finalize_position(&mut state);
        assert_eq!(state.final_pos.latest(), None);
    }
}
