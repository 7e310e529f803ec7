pub mod calibration;

pub use calibration::{CalibrationListener, SampleRateCalibrator};
