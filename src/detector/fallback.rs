use std::sync::Arc;

use log::{info, warn};

use super::{AccelSensorDetector, StepDetector, StepListener, StepSensorDetector};
use crate::config::DetectorConfig;
use crate::sensor::SensorSource;

/// 优先使用直通检测器，失败时退回加速度计检测器
///
/// 两个检测器各自持有状态，这里只决定监听器挂在哪里。
pub struct FallbackStepDetector {
    primary: Box<dyn StepDetector>,
    fallback: Box<dyn StepDetector>,
}

impl FallbackStepDetector {
    pub fn new(primary: Box<dyn StepDetector>, fallback: Box<dyn StepDetector>) -> Self {
        Self { primary, fallback }
    }
}

impl StepDetector for FallbackStepDetector {
    fn register_listener(&mut self, listener: Arc<dyn StepListener>) -> bool {
        if self.primary.register_listener(Arc::clone(&listener)) {
            info!("Counting steps with the hardware step sensor");
            return true;
        }

        if self.fallback.register_listener(listener) {
            info!("Hardware step sensor unavailable, counting steps with the accelerometer");
            return true;
        }

        warn!("No step detector available");
        false
    }

    fn unregister_listener(&mut self) {
        self.fallback.unregister_listener();
        self.primary.unregister_listener();
    }
}

pub struct StepDetectorFactory;

impl StepDetectorFactory {
    /// 硬件计步传感器优先，加速度计兜底
    pub fn create(
        source: Arc<dyn SensorSource>,
        config: &DetectorConfig,
        activity_recognition_granted: bool,
    ) -> Box<dyn StepDetector> {
        let primary = StepSensorDetector::new(Arc::clone(&source), activity_recognition_granted);
        let fallback = AccelSensorDetector::new(source, config);
        Box::new(FallbackStepDetector::new(Box::new(primary), Box::new(fallback)))
    }
}
