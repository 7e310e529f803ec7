use serde::Deserialize;

use crate::types::{SensorEvent, SensorKind};
use crate::utils::millis_to_nanos;

/// 加速度计消息，`timestamp` 为毫秒，`timestamp_ns` 优先
#[derive(Deserialize, Clone, Debug)]
pub struct AccelPayload {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub timestamp_ns: Option<i64>,
}

/// 计步传感器消息
#[derive(Deserialize, Clone, Debug)]
pub struct StepPayload {
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub timestamp_ns: Option<i64>,
}

/// 单条计步消息允许的最大步数
pub const MAX_STEPS_PER_EVENT: u32 = 1000;

fn default_count() -> u32 {
    1
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing timestamp")]
    MissingTimestamp,
    #[error("Non-finite acceleration value")]
    NonFinite,
    #[error("Step count must be positive")]
    ZeroCount,
    #[error("Step count {0} exceeds the per-event limit")]
    CountTooLarge(u32),
}

fn resolve_timestamp(timestamp_ms: Option<i64>, timestamp_ns: Option<i64>) -> Result<i64, PayloadError> {
    match (timestamp_ns, timestamp_ms) {
        (Some(ns), _) => Ok(ns),
        (None, Some(ms)) => Ok(millis_to_nanos(ms)),
        (None, None) => Err(PayloadError::MissingTimestamp),
    }
}

impl AccelPayload {
    pub fn into_event(self) -> Result<SensorEvent, PayloadError> {
        let timestamp_ns = resolve_timestamp(self.timestamp, self.timestamp_ns)?;
        let (x, y, z) = (self.x as f32, self.y as f32, self.z as f32);
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(PayloadError::NonFinite);
        }
        Ok(SensorEvent::accelerometer(timestamp_ns, x, y, z))
    }
}

impl StepPayload {
    pub fn into_event(self) -> Result<SensorEvent, PayloadError> {
        let timestamp_ns = resolve_timestamp(self.timestamp, self.timestamp_ns)?;
        if self.count == 0 {
            return Err(PayloadError::ZeroCount);
        }
        if self.count > MAX_STEPS_PER_EVENT {
            return Err(PayloadError::CountTooLarge(self.count));
        }
        Ok(SensorEvent::step_detector(timestamp_ns, self.count))
    }
}

pub fn parse_sensor_payload(kind: SensorKind, payload: &[u8]) -> Result<SensorEvent, PayloadError> {
    let payload_str = std::str::from_utf8(payload)?;

    match kind {
        SensorKind::Accelerometer => serde_json::from_str::<AccelPayload>(payload_str)?.into_event(),
        SensorKind::StepDetector => serde_json::from_str::<StepPayload>(payload_str)?.into_event(),
    }
}
