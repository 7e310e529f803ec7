use crate::types::{StepEvent, StepSource};

/// 应用状态管理模块

/// 两个独立的累计步数，只由各自来源的事件更新
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepTally {
    pub accelerometer_steps: u64,
    pub step_sensor_steps: u64,
}

impl StepTally {
    pub fn add(&mut self, event: &StepEvent) {
        let count = u64::from(event.count);
        match event.source {
            StepSource::Accelerometer => self.accelerometer_steps += count,
            StepSource::StepSensor => self.step_sensor_steps += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.accelerometer_steps + self.step_sensor_steps
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 检测器注册结果，None 表示未尝试注册
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorStatus {
    pub accelerometer_available: Option<bool>,
    pub step_sensor_available: Option<bool>,
    pub listening: bool,
}

impl DetectorStatus {
    /// 面向用户的不可用提示，全部可用时为空
    pub fn error_message(&self) -> String {
        let mut errors = Vec::new();
        if self.accelerometer_available == Some(false) {
            errors.push("Accelerometer unavailable, cannot count steps from acceleration.");
        }
        if self.step_sensor_available == Some(false) {
            errors.push("Step detector sensor unavailable or activity recognition not granted.");
        }
        errors.join("\n\n")
    }
}

/// 统一的应用状态管理
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub tally: StepTally,
    pub detectors: DetectorStatus,
    pub last_step_time_ns: Option<i64>,
}

impl AppState {
    pub fn record_step(&mut self, event: &StepEvent) {
        self.tally.add(event);
        self.last_step_time_ns = Some(event.timestamp_ns);
    }

    /// 获取当前状态摘要
    pub fn get_status_summary(&self) -> String {
        if !self.detectors.listening {
            return "Stopped".to_string();
        }
        format!(
            "Steps: {} (accelerometer {}, step sensor {})",
            self.tally.total(),
            self.tally.accelerometer_steps,
            self.tally.step_sensor_steps
        )
    }

    /// 清零计数
    pub fn reset_steps(&mut self) {
        self.tally.reset();
        self.last_step_time_ns = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_keeps_sources_apart() {
        let mut tally = StepTally::default();
        tally.add(&StepEvent::single(1, StepSource::Accelerometer));
        tally.add(&StepEvent::new(3, 2, StepSource::StepSensor));
        tally.add(&StepEvent::single(3, StepSource::Accelerometer));

        assert_eq!(tally.accelerometer_steps, 2);
        assert_eq!(tally.step_sensor_steps, 3);
        assert_eq!(tally.total(), 5);

        tally.reset();
        assert_eq!(tally, StepTally::default());
    }

    #[test]
    fn test_error_message_lists_unavailable_detectors() {
        let status = DetectorStatus {
            accelerometer_available: Some(false),
            step_sensor_available: Some(false),
            listening: false,
        };
        let message = status.error_message();
        assert!(message.contains("Accelerometer"));
        assert!(message.contains("Step detector"));
        assert!(message.contains("\n\n"));

        let fine = DetectorStatus {
            accelerometer_available: Some(true),
            step_sensor_available: None,
            listening: true,
        };
        assert!(fine.error_message().is_empty());
    }

    #[test]
    fn test_status_summary_and_reset() {
        let mut state = AppState::default();
        assert_eq!(state.get_status_summary(), "Stopped");

        state.detectors.listening = true;
        state.record_step(&StepEvent::single(10, StepSource::Accelerometer));
        assert!(state.get_status_summary().starts_with("Steps: 1"));
        assert_eq!(state.last_step_time_ns, Some(10));

        state.reset_steps();
        assert_eq!(state.tally.total(), 0);
        assert_eq!(state.last_step_time_ns, None);
    }
}
