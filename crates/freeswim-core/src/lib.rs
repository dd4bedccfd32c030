//! Core types for camera/projector calibration in a behavioral-tracking rig.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any camera backend, display toolkit, or concrete image
//! container crate.

mod image;
mod logger;
mod transform;

pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView};
pub use transform::{estimate_affine, CamProjTransform};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
