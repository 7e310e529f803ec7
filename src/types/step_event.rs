use serde::{Deserialize, Serialize};

/// 产生步数事件的检测器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSource {
    /// 基于加速度计的步数检测算法
    Accelerometer,
    /// 硬件计步传感器直通
    StepSensor,
}

impl std::fmt::Display for StepSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepSource::Accelerometer => write!(f, "accelerometer"),
            StepSource::StepSensor => write!(f, "step_sensor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    /// 本次回调包含的步数，加速度计算法恒为 1
    pub count: u32,
    pub timestamp_ns: i64,
    pub source: StepSource,
}

impl StepEvent {
    pub fn single(timestamp_ns: i64, source: StepSource) -> Self {
        Self {
            count: 1,
            timestamp_ns,
            source,
        }
    }

    pub fn new(count: u32, timestamp_ns: i64, source: StepSource) -> Self {
        Self {
            count,
            timestamp_ns,
            source,
        }
    }
}
