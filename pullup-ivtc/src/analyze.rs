//! Filter mode state machine: soft telecine detection and cadence analysis.

use tracing::debug;

use crate::cadence::{CadencePosition, FieldDominance};
use crate::detect::DetectorState;
use pullup_core::Frame;

/// What the filter currently believes about the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IvtcMode {
    /// No film cadence seen; frames pass through.
    #[default]
    Detecting,
    /// Hard telecine: the pulldown was baked into the pixels and must be
    /// undone by reconstructing film frames.
    HardTelecine,
    /// Soft telecine: frames are progressive and the pulldown only lives in
    /// the repeat-field flags; only timestamps need evening out.
    SoftTelecine,
}

/// Mode and cadence lock-on state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IvtcState {
    pub mode: IvtcMode,
    /// Mode to return to when soft telecine ends.
    pub saved_mode: IvtcMode,
    /// Cadence step of the latest frame while locked on (0..=4).
    pub cadence_step: Option<u8>,
    /// Field dominance of the detected telecine.
    pub dominance: Option<FieldDominance>,
    /// Whether the last analyzed window showed a consecutive cadence.
    /// Cleared on every analysis; reconstruction falls back to an
    /// emergency strategy whenever this is false.
    pub sequence_valid: bool,
}

impl IvtcState {
    pub fn new() -> Self {
        Self {
            mode: IvtcMode::Detecting,
            saved_mode: IvtcMode::Detecting,
            cadence_step: None,
            dominance: None,
            sequence_valid: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for IvtcState {
    fn default() -> Self {
        Self::new()
    }
}

/// Detect soft telecine from the repeat-field flag pattern over the stencil.
///
/// Soft pulldown flags the field counts 3,2,3,2,... so three consecutive
/// counts are enough to decide: (2,3,2) entering or running, (3,2,3)
/// running, (3,2,2) exiting with Current as the last soft frame. This is
/// aggressive about both entering and leaving the mode, which keeps lone
/// field repeats harmless.
pub fn detect_soft_telecine(state: &mut IvtcState, prev: &Frame, curr: &Frame, next: &Frame) {
    let counts = (prev.nb_fields, curr.nb_fields, next.nb_fields);
    let pattern_seen = matches!(counts, (2, 3, 2) | (3, 2, 3) | (3, 2, 2));

    if pattern_seen {
        if state.mode != IvtcMode::SoftTelecine {
            debug!("soft telecine detected");
            state.saved_mode = state.mode;
        }
        state.mode = IvtcMode::SoftTelecine;
        // Only used while undoing hard telecine.
        state.cadence_step = None;
        state.dominance = None;
    } else if state.mode == IvtcMode::SoftTelecine {
        // Return to the earlier mode. Coming back to hard telecine this way
        // kickstarts reconstruction in emergency mode until the cadence
        // locks on again, instead of letting telecined frames slip through.
        debug!("soft telecine ended, returning to previous mode");
        state.mode = state.saved_mode;
        state.cadence_step = Some(0);
        state.dominance = Some(if next.top_field_first() {
            FieldDominance::TopFirst
        } else {
            FieldDominance::BottomFirst
        });
    }
}

/// Analyze the finalized position history and enter or exit hard telecine.
///
/// A frame qualifies for analysis when it cannot be part of a soft telecine
/// (two fields exactly) and either had motion against its predecessor or
/// its detected position was the expected successor. Analysis runs only
/// when all three stencil frames qualify and all three positions were
/// detected; otherwise `sequence_valid` just drops to false.
pub fn analyze_cadence(
    state: &mut IvtcState,
    det: &mut DetectorState,
    prev: &Frame,
    curr: &Frame,
    next: &Frame,
) {
    state.sequence_valid = false;

    let successor = |a: Option<CadencePosition>, b: Option<CadencePosition>| {
        matches!((a, b), (Some(a), Some(b)) if b.step() == (a.step() + 1) % 5)
    };
    let expected = successor(det.final_pos.previous(), det.final_pos.latest());
    let old_expected = successor(det.final_pos.oldest(), det.final_pos.previous());

    let prev_valid = prev.nb_fields == 2;
    let curr_valid = curr.nb_fields == 2 && (det.motion.previous() > 0 || old_expected);
    let next_valid = next.nb_fields == 2 && (det.motion.latest() > 0 || expected);
    if !(prev_valid && curr_valid && next_valid) {
        return;
    }

    let (Some(pos_old), Some(pos_mid), Some(pos_new)) = (
        det.final_pos.oldest(),
        det.final_pos.previous(),
        det.final_pos.latest(),
    ) else {
        return;
    };

    // The positions must be successive mod 5. Nothing can be said about
    // TFF/BFF yet because the progressive-looking position votes neither
    // way; that is settled below by voting.
    state.sequence_valid =
        successor(Some(pos_old), Some(pos_mid)) && successor(Some(pos_mid), Some(pos_new));

    let all_progressive = [pos_old, pos_mid, pos_new]
        .iter()
        .all(|&pos| pos == CadencePosition::Progressive);
    det.all_progressive.set_latest(all_progressive);

    if state.sequence_valid {
        let mut tff_votes = 0;
        let mut bff_votes = 0;
        for pos in [pos_old, pos_mid, pos_new] {
            match pos.dominance() {
                Some(FieldDominance::TopFirst) => tff_votes += 1,
                Some(FieldDominance::BottomFirst) => bff_votes += 1,
                None => {}
            }
        }

        // With three entries two votes decide conclusively. Anything else
        // means no NTSC telecine detected.
        let winner = if tff_votes >= 2 {
            Some(FieldDominance::TopFirst)
        } else if bff_votes >= 2 {
            Some(FieldDominance::BottomFirst)
        } else {
            None
        };

        if let Some(dominance) = winner {
            if state.mode != IvtcMode::HardTelecine {
                debug!(?dominance, "hard telecine cadence detected");
            }
            state.mode = IvtcMode::HardTelecine;
            state.cadence_step = Some(pos_new.step());
            state.dominance = Some(dominance);
        }
    } else if all_progressive
        && det.all_progressive.as_slice().iter().all(|&flag| flag)
    {
        // Three progressive-looking windows in a row can still be a fluke;
        // requiring the flag over three analyzed windows is not.
        if state.mode == IvtcMode::HardTelecine {
            debug!("progressive signal detected, leaving film mode");
        }
        state.mode = IvtcMode::Detecting;
        state.cadence_step = None;
        state.dominance = None;
    }
    // An invalid sequence that is not progressive leaves the mode alone:
    // acting on unreliable data would cause visible stutter. If the filter
    // was locked on, reconstruction now runs in emergency mode.
}

#[cfg(test)]
mod tests {
    use super::*;
    use pullup_core::{FrameFlags, PixelFormat, TimeBase};

    fn frame(nb_fields: u32, top_field_first: bool) -> Frame {
        let mut f = Frame::new(16, 16, PixelFormat::Gray8, TimeBase::MPEG);
        f.nb_fields = nb_fields;
        if top_field_first {
            f.flags |= FrameFlags::TOP_FIELD_FIRST;
        }
        f
    }

    fn qualified_detector(positions: [CadencePosition; 3]) -> DetectorState {
        let mut det = DetectorState::new();
        for (slot, pos) in positions.into_iter().enumerate() {
            det.final_pos.set(slot, Some(pos));
            det.motion.set(slot, 5);
        }
        det
    }

    #[test]
    fn test_soft_telecine_enter_and_exit() {
        let mut state = IvtcState::new();

        detect_soft_telecine(&mut state, &frame(2, true), &frame(3, true), &frame(2, true));
        assert_eq!(state.mode, IvtcMode::SoftTelecine);
        assert_eq!(state.cadence_step, None);

        // The exit pattern still counts as soft telecine for this frame.
        detect_soft_telecine(&mut state, &frame(3, true), &frame(2, true), &frame(2, true));
        assert_eq!(state.mode, IvtcMode::SoftTelecine);

        detect_soft_telecine(&mut state, &frame(2, true), &frame(2, true), &frame(2, true));
        assert_eq!(state.mode, IvtcMode::Detecting);
        assert_eq!(state.cadence_step, Some(0));
        assert_eq!(state.dominance, Some(FieldDominance::TopFirst));
    }

    #[test]
    fn test_soft_telecine_returns_to_hard() {
        let mut state = IvtcState::new();
        state.mode = IvtcMode::HardTelecine;
        state.cadence_step = Some(3);
        state.dominance = Some(FieldDominance::BottomFirst);

        detect_soft_telecine(&mut state, &frame(2, false), &frame(3, false), &frame(2, false));
        assert_eq!(state.mode, IvtcMode::SoftTelecine);

        detect_soft_telecine(&mut state, &frame(2, false), &frame(2, false), &frame(2, false));
        assert_eq!(state.mode, IvtcMode::HardTelecine);
        assert_eq!(state.cadence_step, Some(0));
        assert_eq!(state.dominance, Some(FieldDominance::BottomFirst));
    }

    #[test]
    fn test_cadence_locks_on_consecutive_positions() {
        let mut state = IvtcState::new();
        let mut det = qualified_detector([
            CadencePosition::TffAbc,
            CadencePosition::TffBcd,
            CadencePosition::TffCde,
        ]);

        let (p, c, n) = (frame(2, true), frame(2, true), frame(2, true));
        analyze_cadence(&mut state, &mut det, &p, &c, &n);

        assert!(state.sequence_valid);
        assert_eq!(state.mode, IvtcMode::HardTelecine);
        assert_eq!(state.cadence_step, Some(CadencePosition::TffCde.step()));
        assert_eq!(state.dominance, Some(FieldDominance::TopFirst));
    }

    #[test]
    fn test_progressive_vote_counts_as_neither() {
        // cde -> Progressive -> eab is a valid TFF sequence with only two
        // TFF votes, which still decides.
        let mut state = IvtcState::new();
        let mut det = qualified_detector([
            CadencePosition::TffCde,
            CadencePosition::Progressive,
            CadencePosition::TffEab,
        ]);

        let (p, c, n) = (frame(2, true), frame(2, true), frame(2, true));
        analyze_cadence(&mut state, &mut det, &p, &c, &n);

        assert!(state.sequence_valid);
        assert_eq!(state.mode, IvtcMode::HardTelecine);
        assert_eq!(state.dominance, Some(FieldDominance::TopFirst));
    }

    #[test]
    fn test_unqualified_window_clears_sequence_valid_only() {
        let mut state = IvtcState::new();
        state.mode = IvtcMode::HardTelecine;
        state.cadence_step = Some(2);
        state.sequence_valid = true;

        let mut det = qualified_detector([
            CadencePosition::TffAbc,
            CadencePosition::TffBcd,
            CadencePosition::TffCde,
        ]);
        // No motion and no expected successor for the latest frame.
        det.motion.set_latest(0);
        det.final_pos.set_latest(Some(CadencePosition::TffAbc));

        let (p, c, n) = (frame(2, true), frame(2, true), frame(2, true));
        analyze_cadence(&mut state, &mut det, &p, &c, &n);

        assert!(!state.sequence_valid);
        assert_eq!(state.mode, IvtcMode::HardTelecine);
        assert_eq!(state.cadence_step, Some(2));
    }

    #[test]
    fn test_progressive_exit_needs_three_windows() {
        let mut state = IvtcState::new();
        state.mode = IvtcMode::HardTelecine;
        state.cadence_step = Some(1);

        let (p, c, n) = (frame(2, true), frame(2, true), frame(2, true));
        let mut det = DetectorState::new();
        for round in 0..3 {
            det.slide();
            for slot in 0..3 {
                det.final_pos.set(slot, Some(CadencePosition::Progressive));
                det.motion.set(slot, 5);
            }
            analyze_cadence(&mut state, &mut det, &p, &c, &n);
            if round < 2 {
                assert_eq!(state.mode, IvtcMode::HardTelecine);
            }
        }
        assert_eq!(state.mode, IvtcMode::Detecting);
        assert_eq!(state.cadence_step, None);
    }
}
