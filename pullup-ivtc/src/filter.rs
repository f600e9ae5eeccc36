//! The inverse telecine filter driver.
//!
//! Frames go in at the stream rate; film frames come out. While a hard
//! telecine cadence is locked on, one input frame in five is dropped and
//! the rest are retimed to a steady 4/5 of the input rate. Soft telecine
//! keeps every frame and only evens out the timestamps. Anything else
//! passes through untouched.

use tracing::debug;

use crate::analyze::{analyze_cadence, detect_soft_telecine, IvtcMode, IvtcState};
use crate::cadence::{
    reconstruction_op, FieldDominance, FieldPair, FieldPairScores, ReconstructionOp, VEKTOR_ALL,
};
use crate::compose::{compose_frame, ChromaMode};
use crate::config::IvtcConfig;
use crate::detect::{
    detect_scores, detect_vektor, finalize_position, low_level_detect, score_or_zero,
    DetectorState,
};
use crate::error::{IvtcError, Result};
use crate::history::{FrameHistory, Window3};
use pullup_core::{Duration, Frame, Timestamp};

/// Stateful inverse telecine filter.
///
/// Feed frames in presentation order with [`IvtcFilter::process`]. The
/// filter delays its output by one frame: the frame emitted for input `n`
/// is built from frames `n-1` and `n`, which is what makes drop decisions
/// and soft telecine detection possible without a larger lookahead.
#[derive(Debug)]
pub struct IvtcFilter {
    config: IvtcConfig,
    history: FrameHistory,
    detector: DetectorState,
    state: IvtcState,
    /// Interlace scores of recently emitted frames, for the output sanity
    /// check.
    output_scores: Window3<i32>,
}

impl IvtcFilter {
    /// Filter with default thresholds.
    pub fn new() -> Self {
        Self::with_config(IvtcConfig::default())
    }

    pub fn with_config(config: IvtcConfig) -> Self {
        Self {
            config,
            history: FrameHistory::new(),
            detector: DetectorState::new(),
            state: IvtcState::new(),
            output_scores: Window3::filled(0),
        }
    }

    /// Forget all history and detection state. Call on seeks and stream
    /// discontinuities.
    pub fn reset(&mut self) {
        self.history.clear();
        self.detector = DetectorState::new();
        self.state.reset();
        self.output_scores = Window3::filled(0);
    }

    pub fn config(&self) -> &IvtcConfig {
        &self.config
    }

    /// Current filter mode.
    pub fn mode(&self) -> IvtcMode {
        self.state.mode
    }

    /// Whether a hard telecine cadence is currently locked on.
    pub fn is_locked(&self) -> bool {
        self.state.sequence_valid
    }

    /// Cadence step of the upcoming reconstruction while locked on.
    pub fn cadence_step(&self) -> Option<u8> {
        self.state.cadence_step
    }

    /// Push one input frame and get the output frame, if any.
    ///
    /// Returns `Ok(None)` when the input frame was dropped as part of
    /// normal locked-on operation.
    pub fn process(&mut self, frame: Frame) -> Result<Option<Frame>> {
        self.history.push(frame);
        self.detector.slide();

        // Until the stencil fills, pass frames through while warming up the
        // interlace scores. The scores computed here slide into the TPBP,
        // TPBC and TCBP slots by the time the full path first runs.
        match self.history.len() {
            1 => {
                let next = self
                    .history
                    .next()
                    .ok_or_else(|| IvtcError::internal("frame history underflow"))?;
                let score = score_or_zero(next, next, self.config.comb_threshold);
                self.detector.pair_scores[FieldPair::TnBn] = score;
                self.output_scores.set(0, score);
                return Ok(Some(next.clone()));
            }
            2 => {
                let (Some(curr), Some(next)) = (self.history.current(), self.history.next())
                else {
                    return Err(IvtcError::internal("frame history underflow"));
                };
                low_level_detect(&mut self.detector, curr, next, &self.config);
                self.output_scores
                    .set(1, self.detector.pair_scores[FieldPair::TnBn]);
                return Ok(Some(next.clone()));
            }
            _ => {}
        }

        let (Some(prev), Some(curr), Some(next)) = (
            self.history.previous(),
            self.history.current(),
            self.history.next(),
        ) else {
            return Err(IvtcError::internal("frame history underflow"));
        };

        low_level_detect(&mut self.detector, curr, next, &self.config);
        detect_soft_telecine(&mut self.state, prev, curr, next);

        // Telecine field dominance must match the video field dominance.
        let dominance = if next.top_field_first() {
            FieldDominance::TopFirst
        } else {
            FieldDominance::BottomFirst
        };
        detect_scores(&mut self.detector, dominance, &self.config);
        detect_vektor(&mut self.detector, dominance);
        finalize_position(&mut self.detector);

        analyze_cadence(&mut self.state, &mut self.detector, prev, curr, next);

        output_or_drop(
            &self.config,
            &mut self.state,
            &mut self.detector,
            &mut self.output_scores,
            curr,
            next,
        )
    }
}

impl Default for IvtcFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn op_score(scores: &FieldPairScores, op: ReconstructionOp) -> i32 {
    match op {
        ReconstructionOp::CopyNext => scores[FieldPair::TnBn],
        ReconstructionOp::CopyCurrent => scores[FieldPair::TcBc],
        ReconstructionOp::ComposeTopNextBottomCurrent => scores[FieldPair::TnBc],
        ReconstructionOp::ComposeTopCurrentBottomNext => scores[FieldPair::TcBn],
        ReconstructionOp::Drop => 0,
    }
}

/// Render or drop the frame for the current stencil, and retime it.
fn output_or_drop(
    config: &IvtcConfig,
    state: &mut IvtcState,
    detector: &mut DetectorState,
    output_scores: &mut Window3<i32>,
    curr: &Frame,
    next: &Frame,
) -> Result<Option<Frame>> {
    let mut final_ts = Timestamp::none();
    let op;
    let result_score;

    match state.mode {
        IvtcMode::HardTelecine => {
            let mut chosen = None;
            if state.sequence_valid {
                if let (Some(step), Some(dominance)) = (state.cadence_step, state.dominance) {
                    let table_op = reconstruction_op(dominance, step);
                    if table_op == ReconstructionOp::Drop {
                        state.cadence_step = Some((step + 1) % 5);
                        return Ok(None);
                    }
                    let score = op_score(&detector.pair_scores, table_op);

                    // The running mean of outgoing scores tells what a
                    // correctly reconstructed frame looks like right now.
                    // A sudden clear jump above it means the lock-on was
                    // wrong after all.
                    let avg = output_scores.as_slice().iter().sum::<i32>()
                        / output_scores.as_slice().len() as i32;
                    if score > config.veto_score && score > config.veto_average_factor * avg {
                        state.sequence_valid = false;
                        debug!(
                            score,
                            running_average = avg,
                            "rejected cadence-based frame construction"
                        );
                        // The propagation detector depends on a trustworthy
                        // previous position; start it over as well.
                        detector.vektor_raw.set_latest(VEKTOR_ALL);
                    } else {
                        chosen = Some((table_op, score));
                    }
                }
            }

            // Not an else: the sanity check above may have just revoked the
            // lock-on. Without cadence information emit the least interlaced
            // pairing that involves the new frame.
            let (final_op, score) = match chosen {
                Some(choice) => choice,
                None => {
                    let tnbn = detector.pair_scores[FieldPair::TnBn];
                    let tnbc = detector.pair_scores[FieldPair::TnBc];
                    let tcbn = detector.pair_scores[FieldPair::TcBn];
                    if next.top_field_first() {
                        if tnbn <= tnbc {
                            (ReconstructionOp::CopyNext, tnbn)
                        } else {
                            (ReconstructionOp::ComposeTopNextBottomCurrent, tnbc)
                        }
                    } else if tnbn <= tcbn {
                        (ReconstructionOp::CopyNext, tnbn)
                    } else {
                        (ReconstructionOp::ComposeTopCurrentBottomNext, tcbn)
                    }
                }
            };
            op = final_op;
            result_score = score;

            if state.sequence_valid {
                // 29.97 -> 23.976 fps: spread the four surviving frames of
                // each cycle evenly, anchored at Current. The unit of the
                // cadence step is 1/4 of an input frame duration.
                if let Some(step) = state.cadence_step {
                    let span = next.pts - curr.pts;
                    let delta = Duration::new(span.value * i64::from(step) / 4, span.time_base);
                    final_ts = curr.pts + delta;
                }
            } else {
                // Unlocked: keep the original timestamps and drop nothing.
                // One output frame in five duplicates a film frame, which is
                // less noticeable than a jump from a wrong lock-on.
                final_ts = curr.pts;
            }

            state.cadence_step = Some(state.cadence_step.map_or(0, |step| (step + 1) % 5));
        }
        IvtcMode::SoftTelecine => {
            // The frames are progressive already; pass Current through and
            // even the timestamps out to a steady 24fps.
            op = ReconstructionOp::CopyCurrent;
            result_score = detector.pair_scores[FieldPair::TcBc];

            if curr.nb_fields == 3 {
                // Bump the three-field frames forward by half a field. This
                // is more forgiving for the renderer than pulling the
                // two-field frames back.
                let span = next.pts - curr.pts;
                let half_field = Duration::new(span.value / 3 / 2, span.time_base);
                final_ts = curr.pts + half_field;
            } else {
                final_ts = curr.pts;
            }
        }
        IvtcMode::Detecting => {
            op = ReconstructionOp::CopyNext;
            result_score = detector.pair_scores[FieldPair::TnBn];
            final_ts = next.pts;
        }
    }

    let mut out = match op {
        ReconstructionOp::CopyNext => next.clone(),
        ReconstructionOp::CopyCurrent => curr.clone(),
        ReconstructionOp::ComposeTopNextBottomCurrent => {
            compose_frame(next, curr, ChromaMode::AltLine)?
        }
        ReconstructionOp::ComposeTopCurrentBottomNext => {
            compose_frame(curr, next, ChromaMode::AltLine)?
        }
        ReconstructionOp::Drop => return Ok(None),
    };

    // Slide the outgoing score history only when a frame is emitted.
    output_scores.push(result_score);

    if final_ts.is_valid() {
        out.pts = final_ts;
    }
    Ok(Some(out))
}
