pub mod client;
pub mod payload;

pub use client::{run_mqtt_client, FeedError, FeedStats};
pub use payload::{parse_sensor_payload, AccelPayload, PayloadError, StepPayload, MAX_STEPS_PER_EVENT};
