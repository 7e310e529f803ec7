pub mod app_core;
pub mod app_events;
pub mod handlers;
pub mod state;

pub use app_core::StepApp;
pub use handlers::{CalibrationListener, SampleRateCalibrator};
pub use state::{AppState, DetectorStatus, StepTally};
