use serde::{Deserialize, Serialize};

use super::AccelerationSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Accelerometer,
    StepDetector,
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorKind::Accelerometer => write!(f, "accelerometer"),
            SensorKind::StepDetector => write!(f, "step_detector"),
        }
    }
}

/// 传感器回调事件
/// 加速度计: values = [x, y, z]
/// 计步传感器: 每个值代表一步
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    pub kind: SensorKind,
    pub timestamp_ns: i64,
    pub values: Vec<f32>,
}

impl SensorEvent {
    pub fn accelerometer(timestamp_ns: i64, x: f32, y: f32, z: f32) -> Self {
        Self {
            kind: SensorKind::Accelerometer,
            timestamp_ns,
            values: vec![x, y, z],
        }
    }

    pub fn step_detector(timestamp_ns: i64, count: u32) -> Self {
        Self {
            kind: SensorKind::StepDetector,
            timestamp_ns,
            values: vec![1.0; count as usize],
        }
    }

    /// 前三个值不足时返回 None
    pub fn to_acceleration_sample(&self) -> Option<AccelerationSample> {
        match self.values.as_slice() {
            [x, y, z, ..] => Some(AccelerationSample::new(self.timestamp_ns, *x, *y, *z)),
            _ => None,
        }
    }
}
