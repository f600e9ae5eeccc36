//! Video frame buffer abstractions.
//!
//! Provides types for representing decoded video frames in planar pixel formats.

use crate::timestamp::{Duration, TimeBase, Timestamp};
use bitflags::bitflags;
use std::fmt;

/// Pixel format for video frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 12bpp (1 Cr & Cb sample per 2x2 Y samples).
    Yuv420p,
    /// Planar YUV 4:2:2, 16bpp (1 Cr & Cb sample per 2x1 Y samples).
    Yuv422p,
    /// Planar YUV 4:4:4, 24bpp (no subsampling).
    Yuv444p,
    /// Grayscale, 8bpp.
    Gray8,
}

impl PixelFormat {
    /// Get the number of planes for this pixel format.
    pub fn num_planes(&self) -> usize {
        match self {
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p => 3,
            Self::Gray8 => 1,
        }
    }

    /// Get the bits per pixel.
    pub fn bits_per_pixel(&self) -> u32 {
        match self {
            Self::Yuv420p => 12,
            Self::Yuv422p => 16,
            Self::Yuv444p => 24,
            Self::Gray8 => 8,
        }
    }

    /// Get chroma subsampling factors (horizontal, vertical).
    pub fn chroma_subsampling(&self) -> (u32, u32) {
        match self {
            Self::Yuv420p => (2, 2),
            Self::Yuv422p => (2, 1),
            Self::Yuv444p | Self::Gray8 => (1, 1),
        }
    }

    /// Width in samples of the given plane for a frame of the given width.
    pub fn plane_width(&self, plane: usize, width: u32) -> usize {
        let (hsub, _) = self.chroma_subsampling();
        if plane == 0 {
            width as usize
        } else {
            width as usize / hsub as usize
        }
    }

    /// Height in lines of the given plane for a frame of the given height.
    pub fn plane_height(&self, plane: usize, height: u32) -> usize {
        let (_, vsub) = self.chroma_subsampling();
        if plane == 0 {
            height as usize
        } else {
            height as usize / vsub as usize
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yuv420p => write!(f, "yuv420p"),
            Self::Yuv422p => write!(f, "yuv422p"),
            Self::Yuv444p => write!(f, "yuv444p"),
            Self::Gray8 => write!(f, "gray8"),
        }
    }
}

bitflags! {
    /// Frame flags indicating frame properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FrameFlags: u32 {
        /// Interlaced frame.
        const INTERLACED = 0x0008;
        /// Top field first (for interlaced content).
        const TOP_FIELD_FIRST = 0x0010;
    }
}

impl Default for FrameFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// A decoded video frame.
#[derive(Clone)]
pub struct Frame {
    /// Frame data buffer.
    buffer: FrameBuffer,
    /// Presentation timestamp.
    pub pts: Timestamp,
    /// Frame duration.
    pub duration: Duration,
    /// Frame flags.
    pub flags: FrameFlags,
    /// Number of fields this frame displays for: 2 normally, 3 when the
    /// stream signals a soft field repeat (soft telecine).
    pub nb_fields: u32,
}

impl Frame {
    /// Create a new frame with the specified parameters.
    pub fn new(width: u32, height: u32, format: PixelFormat, time_base: TimeBase) -> Self {
        Self {
            buffer: FrameBuffer::new(width, height, format),
            pts: Timestamp::new(Timestamp::NONE, time_base),
            duration: Duration::new(0, time_base),
            flags: FrameFlags::empty(),
            nb_fields: 2,
        }
    }

    /// Create a frame from an existing buffer.
    pub fn from_buffer(buffer: FrameBuffer) -> Self {
        Self {
            buffer,
            pts: Timestamp::none(),
            duration: Duration::zero(),
            flags: FrameFlags::empty(),
            nb_fields: 2,
        }
    }

    /// Get the frame width.
    pub fn width(&self) -> u32 {
        self.buffer.width
    }

    /// Get the frame height.
    pub fn height(&self) -> u32 {
        self.buffer.height
    }

    /// Get the pixel format.
    pub fn format(&self) -> PixelFormat {
        self.buffer.format
    }

    /// Check whether the top field is meant to be displayed first.
    pub fn top_field_first(&self) -> bool {
        self.flags.contains(FrameFlags::TOP_FIELD_FIRST)
    }

    /// Check whether the frame is flagged as interlaced.
    pub fn is_interlaced(&self) -> bool {
        self.flags.contains(FrameFlags::INTERLACED)
    }

    /// Get the frame buffer.
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Get a mutable reference to the frame buffer.
    pub fn buffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.buffer
    }

    /// Get a plane's data.
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.buffer.plane(index)
    }

    /// Get a mutable reference to a plane's data.
    pub fn plane_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.buffer.plane_mut(index)
    }

    /// Get the stride (bytes per row) for a plane.
    pub fn stride(&self, plane: usize) -> usize {
        self.buffer.stride(plane)
    }

    /// Width in samples of the given plane.
    pub fn plane_width(&self, plane: usize) -> usize {
        self.format().plane_width(plane, self.width())
    }

    /// Height in lines of the given plane.
    pub fn plane_height(&self, plane: usize) -> usize {
        self.format().plane_height(plane, self.height())
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.format())
            .field("pts", &self.pts)
            .field("flags", &self.flags)
            .field("nb_fields", &self.nb_fields)
            .finish()
    }
}

/// A buffer for storing frame pixel data.
#[derive(Clone)]
pub struct FrameBuffer {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
    /// Plane data.
    planes: Vec<PlaneData>,
}

#[derive(Clone)]
struct PlaneData {
    data: Vec<u8>,
    stride: usize,
}

impl FrameBuffer {
    /// Create a new frame buffer.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let num_planes = format.num_planes();
        let mut planes = Vec::with_capacity(num_planes);

        for plane in 0..num_planes {
            let plane_width = format.plane_width(plane, width);
            let plane_height = format.plane_height(plane, height);

            // Align stride to 32 bytes for SIMD optimization
            let aligned_stride = (plane_width + 31) & !31;
            let size = aligned_stride * plane_height;

            planes.push(PlaneData {
                data: vec![0u8; size],
                stride: aligned_stride,
            });
        }

        Self {
            width,
            height,
            format,
            planes,
        }
    }

    /// Get the number of planes.
    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    /// Get a plane's data.
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.planes.get(index).map(|p| p.data.as_slice())
    }

    /// Get a mutable reference to a plane's data.
    pub fn plane_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.planes.get_mut(index).map(|p| p.data.as_mut_slice())
    }

    /// Get the stride for a plane.
    pub fn stride(&self, plane: usize) -> usize {
        self.planes.get(plane).map(|p| p.stride).unwrap_or(0)
    }

    /// Get the total size of all planes in bytes.
    pub fn total_size(&self) -> usize {
        self.planes.iter().map(|p| p.data.len()).sum()
    }

    /// Fill all planes with a value.
    pub fn fill(&mut self, value: u8) {
        for plane in &mut self.planes {
            plane.data.fill(value);
        }
    }

    /// Copy data from another frame buffer.
    pub fn copy_from(&mut self, other: &FrameBuffer) {
        assert_eq!(self.width, other.width);
        assert_eq!(self.height, other.height);
        assert_eq!(self.format, other.format);

        for (dst, src) in self.planes.iter_mut().zip(other.planes.iter()) {
            dst.data.copy_from_slice(&src.data);
        }
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("planes", &self.planes.len())
            .finish()
    }
}
