//! # Pullup Core
//!
//! Core types for the Pullup video filter library.
//!
//! This crate provides the fundamental building blocks used across all Pullup components:
//! - Frame buffer abstractions for planar video
//! - Timestamp and time base management
//! - Rational arithmetic for frame rates

pub mod frame;
pub mod rational;
pub mod timestamp;

pub use frame::{Frame, FrameBuffer, FrameFlags, PixelFormat};
pub use rational::Rational;
pub use timestamp::{Duration, TimeBase, Timestamp};
