use std::sync::{Mutex, PoisonError};

use log::{info, warn};

use crate::config::{CalibrationConfig, DetectorConfig};
use crate::sensor::SensorEventListener;
use crate::types::SensorEvent;

/// 根据传感器时间戳估计采样率
#[derive(Debug, Clone)]
pub struct SampleRateCalibrator {
    duration_ns: i64,
    min_samples: usize,
    first_timestamp_ns: Option<i64>,
    last_timestamp_ns: i64,
    sample_count: usize,
    out_of_order: usize,
    sample_rate: Option<f64>,
    finished: bool,
}

impl SampleRateCalibrator {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            duration_ns: (config.duration_seconds * 1e9) as i64,
            min_samples: config.min_samples,
            first_timestamp_ns: None,
            last_timestamp_ns: 0,
            sample_count: 0,
            out_of_order: 0,
            sample_rate: None,
            finished: false,
        }
    }

    /// 校准完成的那一次返回采样率（Hz）
    pub fn observe(&mut self, timestamp_ns: i64) -> Option<f64> {
        if self.finished {
            return None;
        }

        // 第一个样本开始计时
        let Some(first) = self.first_timestamp_ns else {
            self.first_timestamp_ns = Some(timestamp_ns);
            self.last_timestamp_ns = timestamp_ns;
            self.sample_count = 1;
            return None;
        };

        if timestamp_ns <= self.last_timestamp_ns {
            self.out_of_order += 1;
            return None;
        }
        self.last_timestamp_ns = timestamp_ns;
        self.sample_count += 1;

        let Some(span_ns) = timestamp_ns.checked_sub(first) else {
            self.finished = true;
            warn!("Calibration failed: timestamp span overflows ({} -> {})", first, timestamp_ns);
            return None;
        };
        if span_ns < self.duration_ns {
            return None;
        }

        self.finished = true;
        if self.out_of_order > 0 {
            warn!("Calibration failed: {} non-increasing timestamps", self.out_of_order);
            return None;
        }
        if self.sample_count < self.min_samples {
            warn!("Calibration failed: only {} samples", self.sample_count);
            return None;
        }

        // 采样率：(样本数 - 1) / 时间跨度
        let rate = (self.sample_count - 1) as f64 / (span_ns as f64 / 1e9);
        self.sample_rate = Some(rate);
        Some(rate)
    }

    pub fn sample_rate(&self) -> Option<f64> {
        self.sample_rate
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// 挂在加速度计上的校准监听器，只记录日志不影响检测
pub struct CalibrationListener {
    calibrator: Mutex<SampleRateCalibrator>,
    long_window: usize,
    short_window: usize,
}

impl CalibrationListener {
    pub fn new(calibration: &CalibrationConfig, detector: &DetectorConfig) -> Self {
        Self {
            calibrator: Mutex::new(SampleRateCalibrator::new(calibration)),
            long_window: detector.long_window,
            short_window: detector.short_window,
        }
    }

    pub fn sample_rate(&self) -> Option<f64> {
        self.calibrator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sample_rate()
    }
}

impl SensorEventListener for CalibrationListener {
    fn on_sensor_changed(&self, event: &SensorEvent) {
        let rate = {
            let mut calibrator = self.calibrator.lock().unwrap_or_else(PoisonError::into_inner);
            calibrator.observe(event.timestamp_ns)
        };

        if let Some(rate) = rate {
            info!(
                "Calibration done: sample rate {:.1} Hz, gravity window {:.2}s, velocity window {:.2}s",
                rate,
                self.long_window as f64 / rate,
                self.short_window as f64 / rate
            );
        }
    }
}
