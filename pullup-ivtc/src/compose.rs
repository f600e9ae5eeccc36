//! Building output frames from fields of two sources.

use crate::error::{IvtcError, Result};
use pullup_core::{Frame, FrameFlags};

/// How to fill the chroma planes when weaving a frame from two sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChromaMode {
    /// Weave chroma line by line like luma. Correct for field-accurate
    /// chroma; the only mode cadence reconstruction uses.
    #[default]
    AltLine,
    /// Take every chroma plane whole from the top field source.
    SourceTop,
    /// Take every chroma plane whole from the bottom field source.
    SourceBottom,
}

/// Weave a new frame from the even lines of `top_src` and the odd lines of
/// `bottom_src`.
///
/// Frame metadata (timestamp, duration, field count) is taken from
/// `top_src`; the result is marked progressive since it reassembles a single
/// film frame. Callers that retime the output overwrite the timestamp.
pub fn compose_frame(top_src: &Frame, bottom_src: &Frame, chroma: ChromaMode) -> Result<Frame> {
    if top_src.width() != bottom_src.width()
        || top_src.height() != bottom_src.height()
        || top_src.format() != bottom_src.format()
    {
        return Err(IvtcError::frame_mismatch(
            top_src.width(),
            top_src.height(),
            bottom_src.width(),
            bottom_src.height(),
        ));
    }

    let mut out = top_src.clone();
    out.flags
        .remove(FrameFlags::INTERLACED | FrameFlags::TOP_FIELD_FIRST);
    out.nb_fields = 2;

    for plane in 0..out.buffer().num_planes() {
        let height = out.plane_height(plane);
        let width = out.plane_width(plane);
        let whole_plane_source = match chroma {
            ChromaMode::AltLine => None,
            ChromaMode::SourceTop => (plane > 0).then_some(top_src),
            ChromaMode::SourceBottom => (plane > 0).then_some(bottom_src),
        };

        let out_stride = out.stride(plane);
        let dst = out
            .plane_mut(plane)
            .ok_or_else(|| IvtcError::buffer_error("missing plane in output frame"))?;

        if let Some(src) = whole_plane_source {
            let src_stride = src.stride(plane);
            let src_data = src
                .plane(plane)
                .ok_or_else(|| IvtcError::buffer_error("missing chroma plane in source"))?;
            for y in 0..height {
                dst[y * out_stride..y * out_stride + width]
                    .copy_from_slice(&src_data[y * src_stride..y * src_stride + width]);
            }
            continue;
        }

        for y in 0..height {
            let src = if y % 2 == 0 { top_src } else { bottom_src };
            let src_stride = src.stride(plane);
            let src_data = src
                .plane(plane)
                .ok_or_else(|| IvtcError::buffer_error("missing plane in field source"))?;
            dst[y * out_stride..y * out_stride + width]
                .copy_from_slice(&src_data[y * src_stride..y * src_stride + width]);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pullup_core::{PixelFormat, TimeBase};

    fn filled_frame(value: u8) -> Frame {
        let mut frame = Frame::new(16, 16, PixelFormat::Yuv420p, TimeBase::MPEG);
        frame.buffer_mut().fill(value);
        frame
    }

    #[test]
    fn test_altline_weave() {
        let top = filled_frame(10);
        let bottom = filled_frame(200);
        let out = compose_frame(&top, &bottom, ChromaMode::AltLine).unwrap();

        for plane in 0..3 {
            let stride = out.stride(plane);
            let data = out.plane(plane).unwrap();
            for y in 0..out.plane_height(plane) {
                let expected = if y % 2 == 0 { 10 } else { 200 };
                for x in 0..out.plane_width(plane) {
                    assert_eq!(data[y * stride + x], expected);
                }
            }
        }
    }

    #[test]
    fn test_source_top_chroma() {
        let top = filled_frame(10);
        let bottom = filled_frame(200);
        let out = compose_frame(&top, &bottom, ChromaMode::SourceTop).unwrap();

        // Luma still weaves.
        let stride = out.stride(0);
        let luma = out.plane(0).unwrap();
        assert_eq!(luma[0], 10);
        assert_eq!(luma[stride], 200);

        // Chroma comes whole from the top source.
        let chroma = out.plane(1).unwrap();
        let cstride = out.stride(1);
        for y in 0..out.plane_height(1) {
            assert_eq!(chroma[y * cstride], 10);
        }
    }

    #[test]
    fn test_compose_clears_interlace_flags() {
        let mut top = filled_frame(10);
        top.flags = FrameFlags::INTERLACED | FrameFlags::TOP_FIELD_FIRST;
        top.nb_fields = 3;
        let bottom = filled_frame(200);

        let out = compose_frame(&top, &bottom, ChromaMode::AltLine).unwrap();
        assert!(!out.is_interlaced());
        assert!(!out.top_field_first());
        assert_eq!(out.nb_fields, 2);
    }

    #[test]
    fn test_compose_mismatch_errors() {
        let top = filled_frame(10);
        let bottom = Frame::new(8, 8, PixelFormat::Yuv420p, TimeBase::MPEG);
        assert!(matches!(
            compose_frame(&top, &bottom, ChromaMode::AltLine),
            Err(IvtcError::FrameMismatch { .. })
        ));
    }
}
