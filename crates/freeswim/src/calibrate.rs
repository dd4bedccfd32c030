//! End-to-end calibration helpers on `image::GrayImage` buffers.

use crate::{calib, core};

use calib::{CalibrateError, CalibrationReport, CircleCalibrator};

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum FacadeError {
    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error("invalid grayscale image dimensions (width={width}, height={height})")]
    InvalidGrayDimensions { width: u32, height: u32 },

    #[error(transparent)]
    Calibrate(#[from] CalibrateError),
}

/// Convert an `image::GrayImage` into the lightweight `freeswim-core` view
/// type.
pub fn gray_view(img: &::image::GrayImage) -> core::GrayImageView<'_> {
    core::GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Build an `image::GrayImage` from a raw grayscale buffer.
pub fn gray_image_from_slice(
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<::image::GrayImage, FacadeError> {
    let w = usize::try_from(width).ok();
    let h = usize::try_from(height).ok();
    let Some((w, h)) = w.zip(h) else {
        return Err(FacadeError::InvalidGrayDimensions { width, height });
    };
    let Some(expected) = w.checked_mul(h) else {
        return Err(FacadeError::InvalidGrayDimensions { width, height });
    };
    if pixels.len() != expected {
        return Err(FacadeError::InvalidGrayBuffer {
            expected,
            got: pixels.len(),
        });
    }
    ::image::GrayImage::from_raw(width, height, pixels.to_vec())
        .ok_or(FacadeError::InvalidGrayDimensions { width, height })
}

/// Run the "calibrate" action on a camera frame.
pub fn calibrate_image(
    calibrator: &mut CircleCalibrator,
    img: &::image::GrayImage,
) -> Result<CalibrationReport, FacadeError> {
    Ok(calibrator.calibrate(&gray_view(img))?)
}

/// Run the "calibrate" action on a raw grayscale buffer.
pub fn calibrate_from_gray_u8(
    calibrator: &mut CircleCalibrator,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<CalibrationReport, FacadeError> {
    let img = gray_image_from_slice(width, height, pixels)?;
    calibrate_image(calibrator, &img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_length_is_validated() {
        let err = gray_image_from_slice(4, 4, &[0u8; 15]).unwrap_err();
        assert!(matches!(
            err,
            FacadeError::InvalidGrayBuffer {
                expected: 16,
                got: 15
            }
        ));
        assert!(gray_image_from_slice(4, 4, &[0u8; 16]).is_ok());
    }

    #[test]
    fn calibrate_maps_library_errors_through() {
        let mut cal = CircleCalibrator::default();
        let blank = ::image::GrayImage::new(32, 32);
        let err = calibrate_image(&mut cal, &blank).unwrap_err();
        assert!(matches!(
            err,
            FacadeError::Calibrate(CalibrateError::PatternNotDisplayed)
        ));
    }

    #[test]
    fn raw_buffer_calibration_round_trip() {
        let mut cal = CircleCalibrator::default();
        cal.display_pattern(800, 600);

        // The rendered pattern is its own camera frame (identity rig).
        let pattern = cal.pattern_image().expect("pattern");
        let report = calibrate_from_gray_u8(
            &mut cal,
            pattern.width as u32,
            pattern.height as u32,
            &pattern.data,
        )
        .expect("calibrate");
        assert!(report.residual_px < 0.1);
    }
}
