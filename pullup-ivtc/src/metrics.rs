//! Frame metrics for cadence detection.
//!
//! Two scalar measurements drive everything else in this crate: an interlace
//! (combing) score over a woven pair of fields, and a block-based motion
//! estimate between two frames. Both are plain pixel loops; they are the
//! obvious candidates for SIMD but stay scalar here.

use crate::error::{IvtcError, Result};
use pullup_core::Frame;

/// Result of block-based motion estimation between two frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionEstimate {
    /// 8x8 blocks in which at least 1/8 of the pixels moved.
    pub blocks_with_motion: u32,
    /// Blocks in which at least 8 top-field (even line) pixels moved.
    pub top_field_blocks: u32,
    /// Blocks in which at least 8 bottom-field (odd line) pixels moved.
    pub bottom_field_blocks: u32,
}

impl MotionEstimate {
    /// Hard field-repeat flags: a field counts as repeated when its moving
    /// block count is at most 2/3 of the other field's. Returns
    /// `(top_repeats, bottom_repeats)`; with no motion at all both hold.
    pub fn field_repeats(&self) -> (bool, bool) {
        let top = self.top_field_blocks;
        let bottom = self.bottom_field_blocks;
        (top <= 2 * bottom / 3, bottom <= 2 * top / 3)
    }
}

fn check_same_geometry(a: &Frame, b: &Frame) -> Result<()> {
    if a.width() != b.width() || a.height() != b.height() || a.format() != b.format() {
        return Err(IvtcError::frame_mismatch(
            a.width(),
            a.height(),
            b.width(),
            b.height(),
        ));
    }
    Ok(())
}

/// Interlace score of the virtual frame woven from the even lines of
/// `top_src` and the odd lines of `bottom_src`.
///
/// For every pixel of every plane, with C the pixel and P/N its vertical
/// neighbors (which come from the other field source), a location counts as
/// combed when `(P - C) * (N - C) > comb_threshold`. The first and last line
/// of each plane have no such neighbors and are skipped. Scoring a frame
/// against itself measures how combed the frame is as stored.
pub fn interlace_score(top_src: &Frame, bottom_src: &Frame, comb_threshold: i32) -> Result<u32> {
    check_same_geometry(top_src, bottom_src)?;

    let mut score = 0u32;
    for plane in 0..top_src.buffer().num_planes() {
        let width = top_src.plane_width(plane);
        let height = top_src.plane_height(plane);
        let top = top_src
            .plane(plane)
            .ok_or_else(|| IvtcError::buffer_error("missing plane in top source"))?;
        let bottom = bottom_src
            .plane(plane)
            .ok_or_else(|| IvtcError::buffer_error("missing plane in bottom source"))?;
        let top_stride = top_src.stride(plane);
        let bottom_stride = bottom_src.stride(plane);

        for y in 1..height.saturating_sub(1) {
            // Even lines of the woven frame come from top_src, odd from
            // bottom_src; the neighbor lines are always the other source.
            let (cur, cur_stride, other, other_stride) = if y % 2 == 0 {
                (top, top_stride, bottom, bottom_stride)
            } else {
                (bottom, bottom_stride, top, top_stride)
            };

            for x in 0..width {
                let c = cur[y * cur_stride + x] as i32;
                let above = other[(y - 1) * other_stride + x] as i32;
                let below = other[(y + 1) * other_stride + x] as i32;
                if (above - c) * (below - c) > comb_threshold {
                    score += 1;
                }
            }
        }
    }
    Ok(score)
}

/// Estimate motion between two frames over 8x8 blocks.
///
/// A pixel moves when its absolute difference exceeds `motion_threshold`.
/// A block has motion when at least 8 of its 64 pixels move; the per-field
/// counts are bumped when at least 8 of a field's 32 pixels in the block
/// move. Partial blocks at the right and bottom edges are skipped.
pub fn estimate_motion(prev: &Frame, curr: &Frame, motion_threshold: u8) -> Result<MotionEstimate> {
    check_same_geometry(prev, curr)?;

    let mut est = MotionEstimate::default();
    for plane in 0..prev.buffer().num_planes() {
        let width = prev.plane_width(plane);
        let height = prev.plane_height(plane);
        let prev_data = prev
            .plane(plane)
            .ok_or_else(|| IvtcError::buffer_error("missing plane in previous frame"))?;
        let curr_data = curr
            .plane(plane)
            .ok_or_else(|| IvtcError::buffer_error("missing plane in current frame"))?;
        let prev_stride = prev.stride(plane);
        let curr_stride = curr.stride(plane);

        for by in 0..height / 8 {
            for bx in 0..width / 8 {
                let mut moving = 0u32;
                let mut top_moving = 0u32;
                let mut bottom_moving = 0u32;

                for dy in 0..8 {
                    let y = by * 8 + dy;
                    for dx in 0..8 {
                        let x = bx * 8 + dx;
                        let p = prev_data[y * prev_stride + x];
                        let c = curr_data[y * curr_stride + x];
                        if p.abs_diff(c) > motion_threshold {
                            moving += 1;
                            if dy % 2 == 0 {
                                top_moving += 1;
                            } else {
                                bottom_moving += 1;
                            }
                        }
                    }
                }

                if moving >= 8 {
                    est.blocks_with_motion += 1;
                }
                if top_moving >= 8 {
                    est.top_field_blocks += 1;
                }
                if bottom_moving >= 8 {
                    est.bottom_field_blocks += 1;
                }
            }
        }
    }
    Ok(est)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pullup_core::{PixelFormat, TimeBase};

    fn gray_frame(width: u32, height: u32, value: u8) -> Frame {
        let mut frame = Frame::new(width, height, PixelFormat::Gray8, TimeBase::MPEG);
        frame.buffer_mut().fill(value);
        frame
    }

    /// Gray frame with separate top (even line) and bottom (odd line) values.
    fn field_frame(width: u32, height: u32, top: u8, bottom: u8) -> Frame {
        let mut frame = Frame::new(width, height, PixelFormat::Gray8, TimeBase::MPEG);
        let stride = frame.stride(0);
        let plane = frame.plane_mut(0).unwrap();
        for y in 0..height as usize {
            let value = if y % 2 == 0 { top } else { bottom };
            for x in 0..width as usize {
                plane[y * stride + x] = value;
            }
        }
        frame
    }

    #[test]
    fn test_uniform_frame_scores_zero() {
        let frame = gray_frame(32, 32, 128);
        assert_eq!(interlace_score(&frame, &frame, 100).unwrap(), 0);
    }

    #[test]
    fn test_combed_frame_scores_interior() {
        let frame = field_frame(32, 32, 0, 200);
        // Every interior pixel combs: (200-0)*(200-0) or (0-200)*(0-200).
        let score = interlace_score(&frame, &frame, 100).unwrap();
        assert_eq!(score, 32 * 30);
    }

    #[test]
    fn test_weave_of_matching_fields_scores_zero() {
        // Weaving the top field of one frame with the bottom field of a frame
        // whose bottom matches gives a clean result.
        let a = field_frame(32, 32, 50, 200);
        let b = field_frame(32, 32, 200, 50);
        // Virtual frame: even lines 50 (from a), odd lines 50 (from b).
        assert_eq!(interlace_score(&a, &b, 100).unwrap(), 0);
    }

    #[test]
    fn test_geometry_mismatch_errors() {
        let a = gray_frame(32, 32, 0);
        let b = gray_frame(16, 16, 0);
        assert!(matches!(
            interlace_score(&a, &b, 100),
            Err(IvtcError::FrameMismatch { .. })
        ));
        assert!(matches!(
            estimate_motion(&a, &b, 10),
            Err(IvtcError::FrameMismatch { .. })
        ));
    }

    #[test]
    fn test_no_motion_between_identical_frames() {
        let a = gray_frame(32, 32, 90);
        let est = estimate_motion(&a, &a, 10).unwrap();
        assert_eq!(est, MotionEstimate::default());
        // Without motion both fields count as repeated.
        assert_eq!(est.field_repeats(), (true, true));
    }

    #[test]
    fn test_full_frame_motion() {
        let a = gray_frame(16, 16, 0);
        let b = gray_frame(16, 16, 50);
        let est = estimate_motion(&a, &b, 10).unwrap();
        assert_eq!(est.blocks_with_motion, 4);
        assert_eq!(est.top_field_blocks, 4);
        assert_eq!(est.bottom_field_blocks, 4);
        assert_eq!(est.field_repeats(), (false, false));
    }

    #[test]
    fn test_single_field_motion_sets_repeat_flag() {
        // Only the bottom field changes: the top field is a hard repeat.
        let a = field_frame(16, 16, 30, 30);
        let b = field_frame(16, 16, 30, 100);
        let est = estimate_motion(&a, &b, 10).unwrap();
        assert_eq!(est.top_field_blocks, 0);
        assert_eq!(est.bottom_field_blocks, 4);
        assert_eq!(est.field_repeats(), (true, false));
    }

    #[test]
    fn test_partial_blocks_skipped() {
        let a = gray_frame(12, 12, 0);
        let b = gray_frame(12, 12, 50);
        let est = estimate_motion(&a, &b, 10).unwrap();
        // Only one full 8x8 block fits in 12x12.
        assert_eq!(est.blocks_with_motion, 1);
    }
}
