pub mod sample;
pub mod sensor_event;
pub mod step_event;

pub use sample::AccelerationSample;
pub use sensor_event::{SensorEvent, SensorKind};
pub use step_event::{StepEvent, StepSource};
