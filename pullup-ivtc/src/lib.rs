//! # pullup-ivtc
//!
//! Inverse telecine (IVTC) filter for the pullup library.
//!
//! NTSC film content is usually broadcast after 3:2 pulldown, which
//! stretches 24 film frames per second into 29.97 video frames by repeating
//! fields. This crate detects that cadence and undoes it, recovering the
//! original progressive film frames.
//!
//! ## Overview
//!
//! The filter works on a three-frame sliding stencil (Previous, Current,
//! Next) and combines several mechanisms:
//!
//! | Mechanism | Module | Role |
//! |-----------|--------|------|
//! | Interlace and motion metrics | [`metrics`] | Raw per-frame measurements |
//! | Statistical detector ("scores") | [`detect`] | Fast cadence position guess from comb scores |
//! | Propagation detector ("vektor") | [`detect`] | Slow but reliable lock-on from hard field repeats |
//! | Cadence analysis | [`analyze`] | Mode state machine, soft telecine, TFF/BFF voting |
//! | Frame reconstruction | [`filter`] | Operation table, frame drops, timestamp retiming |
//!
//! Hard telecine (pulldown baked into the pixels) is undone by weaving the
//! right fields back together, dropping the redundant fifth frame of every
//! cycle, and spreading the surviving timestamps evenly. Soft telecine
//! (progressive frames with repeat-field flags) only needs its timestamps
//! evened out. Streams with neither pass through untouched, so the filter
//! is safe to leave enabled.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pullup_ivtc::IvtcFilter;
//! # use pullup_core::Frame;
//!
//! let mut ivtc = IvtcFilter::new();
//!
//! # let frames: Vec<Frame> = Vec::new();
//! for frame in frames {
//!     match ivtc.process(frame)? {
//!         Some(_film_frame) => {
//!             // 4 of every 5 input frames come out while locked on
//!         }
//!         None => {
//!             // dropped as part of normal 29.97 -> 23.976 conversion
//!         }
//!     }
//! }
//! # Ok::<(), pullup_ivtc::IvtcError>(())
//! ```
//!
//! The output frame rate is variable: 4/5 of the input rate while inverse
//! telecine is active, the input rate otherwise. Call
//! [`IvtcFilter::reset`] on seeks and stream discontinuities.

pub mod analyze;
pub mod cadence;
pub mod compose;
pub mod config;
pub mod detect;
pub mod error;
pub mod filter;
pub mod history;
pub mod metrics;

pub use analyze::{IvtcMode, IvtcState};
pub use cadence::{CadencePosition, FieldDominance, FieldPair, ReconstructionOp};
pub use compose::{compose_frame, ChromaMode};
pub use config::IvtcConfig;
pub use error::{IvtcError, Result};
pub use filter::IvtcFilter;
pub use metrics::{estimate_motion, interlace_score, MotionEstimate};
