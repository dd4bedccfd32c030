//! JSON persistence for calibrator configuration and calibration state.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibrator::{CalibrationState, CircleCalibrator};
use crate::dots::DotDetectParams;
use crate::pattern::CirclePattern;

#[derive(thiserror::Error, Debug)]
pub enum CalibIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// On-disk calibrator configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CalibratorConfig {
    #[serde(default)]
    pub pattern: CirclePattern,
    #[serde(default)]
    pub detect: DotDetectParams,
}

impl CalibratorConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CalibIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CalibIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn build_calibrator(&self) -> CircleCalibrator {
        CircleCalibrator::new(self.pattern, self.detect)
    }
}

impl CalibrationState {
    /// Restore the state written by a previous session.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CalibIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Persist this state as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CalibIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("calibrator.json");

        let cfg = CalibratorConfig {
            pattern: CirclePattern {
                arm_len_px: 64.0,
                dot_radius_px: 4.0,
            },
            detect: DotDetectParams {
                threshold: Some(90),
                ..DotDetectParams::default()
            },
        };
        cfg.write_json(&path).expect("write");

        let back = CalibratorConfig::load_json(&path).expect("load");
        assert_eq!(back.pattern.arm_len_px, 64.0);
        assert_eq!(back.detect.threshold, Some(90));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = CalibrationState::load_json("/nonexistent/calibration.json").unwrap_err();
        assert!(matches!(err, CalibIoError::Io(_)));
    }
}
