//! Cadence vocabulary for 3:2 pulldown detection.
//!
//! NTSC telecine spreads 4 film frames (a, b, c, d) over 5 video frames by
//! repeating fields. With top field first the emitted field pattern is
//!
//! ```text
//! video frame:  1    2    3    4    5
//! top field:    a    b    c    d    d
//! bottom field: a    a    b    c    d
//! ```
//!
//! A three-frame window (Previous, Current, Next) slid over such a stream
//! lands on one of five positions, named after the film frames visible in
//! the window: abc, bcd, cde, dea, eab. A window of three untouched
//! progressive frames is the sixth possibility. Everything in this module is
//! a static property of those positions.

use std::ops::{Index, IndexMut};

/// Field order of the stream being analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDominance {
    /// Top field is displayed first.
    TopFirst,
    /// Bottom field is displayed first.
    BottomFirst,
}

/// One of the field pairings that can be woven from a PCN frame window.
///
/// The name gives the source of the top and bottom field: `TcBn` is the top
/// field of Current woven with the bottom field of Next. Only 7 of the 9
/// combinations are ever needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPair {
    /// Top Previous, bottom Previous.
    TpBp = 0,
    /// Top Previous, bottom Current.
    TpBc = 1,
    /// Top Current, bottom Previous.
    TcBp = 2,
    /// Top Current, bottom Current.
    TcBc = 3,
    /// Top Current, bottom Next.
    TcBn = 4,
    /// Top Next, bottom Current.
    TnBc = 5,
    /// Top Next, bottom Next.
    TnBn = 6,
}

/// Interlace scores for the 7 field pairings of the current window.
///
/// Three of the scores carry over when the window slides one frame forward,
/// so only the pairings involving the new Next frame need recomputing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldPairScores {
    scores: [i32; 7],
}

impl FieldPairScores {
    /// All-zero scores.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slide the scores one frame forward: pairings that still fall inside
    /// the new window shift roles, the three pairings that involve the new
    /// Next frame are cleared for recomputation.
    pub fn slide(&mut self) {
        self[FieldPair::TpBp] = self[FieldPair::TcBc];
        self[FieldPair::TpBc] = self[FieldPair::TcBn];
        self[FieldPair::TcBp] = self[FieldPair::TnBc];
        self[FieldPair::TcBc] = self[FieldPair::TnBn];
        self[FieldPair::TcBn] = 0;
        self[FieldPair::TnBc] = 0;
        self[FieldPair::TnBn] = 0;
    }

    /// Clear all scores.
    pub fn clear(&mut self) {
        self.scores = [0; 7];
    }
}

impl Index<FieldPair> for FieldPairScores {
    type Output = i32;

    fn index(&self, pair: FieldPair) -> &i32 {
        &self.scores[pair as usize]
    }
}

impl IndexMut<FieldPair> for FieldPairScores {
    fn index_mut(&mut self, pair: FieldPair) -> &mut i32 {
        &mut self.scores[pair as usize]
    }
}

/// Position of the sliding PCN window inside the pulldown cycle.
///
/// The telecined positions come in a top-field-first and a bottom-field-first
/// flavor; `Progressive` covers a window of three untouched frames (which in
/// a locked-on cadence is the dea position, the one whose Next frame
/// duplicates already-seen fields and gets dropped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadencePosition {
    /// Three progressive frames (dea when locked on).
    Progressive,
    /// TFF window over film frames a, b, c.
    TffAbc,
    /// TFF window over film frames b, c, d.
    TffBcd,
    /// TFF window over film frames c, d, e.
    TffCde,
    /// TFF window over film frames e, a, b.
    TffEab,
    /// BFF window over film frames a, b, c.
    BffAbc,
    /// BFF window over film frames b, c, d.
    BffBcd,
    /// BFF window over film frames c, d, e.
    BffCde,
    /// BFF window over film frames e, a, b.
    BffEab,
}

impl CadencePosition {
    /// The candidate positions for a stream of the given dominance:
    /// progressive plus the four matching telecined positions.
    pub fn candidates(dominance: FieldDominance) -> [CadencePosition; 5] {
        match dominance {
            FieldDominance::TopFirst => [
                Self::Progressive,
                Self::TffAbc,
                Self::TffBcd,
                Self::TffCde,
                Self::TffEab,
            ],
            FieldDominance::BottomFirst => [
                Self::Progressive,
                Self::BffAbc,
                Self::BffBcd,
                Self::BffCde,
                Self::BffEab,
            ],
        }
    }

    /// All nine positions.
    pub fn all() -> [CadencePosition; 9] {
        [
            Self::Progressive,
            Self::TffAbc,
            Self::TffBcd,
            Self::TffCde,
            Self::TffEab,
            Self::BffAbc,
            Self::BffBcd,
            Self::BffCde,
            Self::BffEab,
        ]
    }

    /// Step of this position in the 5-frame cycle, numbered so that the
    /// reconstruction timestamp delta equals the step and step 4 is the
    /// frame drop: eab = 0, abc = 1, bcd = 2, cde = 3, dea (progressive) = 4.
    pub fn step(self) -> u8 {
        match self {
            Self::TffEab | Self::BffEab => 0,
            Self::TffAbc | Self::BffAbc => 1,
            Self::TffBcd | Self::BffBcd => 2,
            Self::TffCde | Self::BffCde => 3,
            Self::Progressive => 4,
        }
    }

    /// Field dominance implied by this position, if any.
    pub fn dominance(self) -> Option<FieldDominance> {
        match self {
            Self::Progressive => None,
            Self::TffAbc | Self::TffBcd | Self::TffCde | Self::TffEab => {
                Some(FieldDominance::TopFirst)
            }
            Self::BffAbc | Self::BffBcd | Self::BffCde | Self::BffEab => {
                Some(FieldDominance::BottomFirst)
            }
        }
    }

    /// The three field pairings that are progressive (belong to one film
    /// frame) when the window sits at this position. Their interlace scores
    /// should be near zero while all other pairings show combing.
    pub fn best_pairs(self) -> [FieldPair; 3] {
        use FieldPair::*;
        match self {
            Self::Progressive => [TpBp, TcBc, TnBn],
            Self::TffAbc => [TpBp, TcBp, TnBc],
            Self::TffBcd => [TcBp, TnBc, TnBn],
            Self::TffCde => [TcBp, TcBc, TnBn],
            Self::TffEab => [TpBp, TcBc, TnBc],
            Self::BffAbc => [TpBp, TpBc, TcBn],
            Self::BffBcd => [TpBc, TcBn, TnBn],
            Self::BffCde => [TpBc, TcBc, TnBn],
            Self::BffEab => [TpBp, TcBc, TcBn],
        }
    }

    /// Bit assigned to this position in the propagation mask. TFF positions
    /// live in the low byte, BFF in the high byte; the progressive bit is
    /// set in both bytes since it fits either dominance.
    pub fn bitmask(self) -> u16 {
        match self {
            Self::Progressive => 0x0808,
            Self::TffAbc => 0x0001,
            Self::TffBcd => 0x0002,
            Self::TffCde => 0x0004,
            Self::TffEab => 0x0010,
            Self::BffAbc => 0x0100,
            Self::BffBcd => 0x0200,
            Self::BffCde => 0x0400,
            Self::BffEab => 0x1000,
        }
    }
}

/// All position bits a propagation mask can carry.
pub const VEKTOR_ALL: u16 = 0x1f1f;
/// The TFF half of the mask.
pub const VEKTOR_TFF: u16 = 0x00ff;
/// The BFF half of the mask.
pub const VEKTOR_BFF: u16 = 0xff00;

const VEKTOR_TFF_HIGH: u16 = 0x0010;
const VEKTOR_TFF_LOW: u16 = 0x0001;
const VEKTOR_BFF_HIGH: u16 = 0x1000;
const VEKTOR_BFF_LOW: u16 = 0x0100;

/// Advance a propagation mask one frame: each possible position moves to its
/// successor in the 5-step cycle, with the top bit of each byte wrapping back
/// to that byte's lowest bit.
pub fn predict_next_mask(mask: u16) -> u16 {
    let mut next = (mask << 1) & VEKTOR_ALL;
    if mask & VEKTOR_TFF_HIGH != 0 {
        next |= VEKTOR_TFF_LOW;
    }
    if mask & VEKTOR_BFF_HIGH != 0 {
        next |= VEKTOR_BFF_LOW;
    }
    next
}

/// If the mask pins down exactly one position, return it.
pub fn unique_position(mask: u16) -> Option<CadencePosition> {
    CadencePosition::all()
        .into_iter()
        .find(|&pos| mask == mask & pos.bitmask())
}

/// How to build the output frame for one input frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructionOp {
    /// Next is already a whole film frame; emit a copy.
    CopyNext,
    /// Current is already a whole film frame; emit a copy.
    CopyCurrent,
    /// Weave the top field of Next with the bottom field of Current.
    ComposeTopNextBottomCurrent,
    /// Weave the top field of Current with the bottom field of Next.
    ComposeTopCurrentBottomNext,
    /// Next only repeats fields that were already emitted; drop it.
    Drop,
}

/// Reconstruction operation for a locked-on cadence at the given step.
pub fn reconstruction_op(dominance: FieldDominance, step: u8) -> ReconstructionOp {
    match (dominance, step) {
        (FieldDominance::TopFirst, 0 | 1) => ReconstructionOp::ComposeTopNextBottomCurrent,
        (FieldDominance::BottomFirst, 0 | 1) => ReconstructionOp::ComposeTopCurrentBottomNext,
        (_, 2 | 3) => ReconstructionOp::CopyNext,
        _ => ReconstructionOp::Drop,
    }
}
