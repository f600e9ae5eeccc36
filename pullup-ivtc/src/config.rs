//! Configuration for the inverse telecine filter.

/// Tunable thresholds for cadence detection and reconstruction.
///
/// The defaults were tuned against real telecined broadcast material and
/// should rarely need changing. Lowering the reliability ratios makes the
/// detectors lock on faster at the cost of false positives on noisy video.
#[derive(Debug, Clone)]
pub struct IvtcConfig {
    /// Comb detection threshold for the interlace score. A pixel is counted
    /// as combed when `(above - pixel) * (below - pixel)` exceeds this.
    pub comb_threshold: i32,
    /// Minimum absolute luma difference for a pixel to count as moving.
    pub motion_threshold: u8,
    /// Minimum ratio of the mean score of the rejected cadence candidates to
    /// the overall mean before the statistical detector trusts its pick.
    pub min_mean_ratio: f64,
    /// Minimum ratio of the full sample variance to the variance without the
    /// winning candidate; a clear winner inflates the full variance.
    pub min_variance_ratio: f64,
    /// Absolute interlace score above which an output frame is suspect.
    pub veto_score: i32,
    /// An output frame is vetoed when its score exceeds the running average
    /// of recently emitted frames by this factor (and exceeds `veto_score`).
    pub veto_average_factor: i32,
}

impl Default for IvtcConfig {
    fn default() -> Self {
        Self {
            comb_threshold: 100,
            motion_threshold: 10,
            min_mean_ratio: 1.005,
            min_variance_ratio: 1.17,
            veto_score: 1000,
            veto_average_factor: 2,
        }
    }
}
