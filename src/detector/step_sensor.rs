use std::sync::Arc;

use log::{debug, info, warn};

use super::{ListenerSlot, StepDetector, StepListener};
use crate::sensor::{ListenerId, SensorEventListener, SensorSource};
use crate::types::{SensorEvent, SensorKind, StepEvent, StepSource};

struct StepSensorHandler {
    slot: ListenerSlot,
}

impl SensorEventListener for StepSensorHandler {
    fn on_sensor_changed(&self, event: &SensorEvent) {
        if event.kind != SensorKind::StepDetector || event.values.is_empty() {
            return;
        }
        let count = u32::try_from(event.values.len()).unwrap_or(u32::MAX);
        self.slot.emit(StepEvent::new(count, event.timestamp_ns, StepSource::StepSensor));
    }
}

/// 硬件计步传感器直通，没有算法
///
/// 需要活动识别授权并且设备提供计步传感器。
pub struct StepSensorDetector {
    source: Arc<dyn SensorSource>,
    authorized: bool,
    handler: Arc<StepSensorHandler>,
    registration: Option<ListenerId>,
}

impl StepSensorDetector {
    pub fn new(source: Arc<dyn SensorSource>, authorized: bool) -> Self {
        Self {
            source,
            authorized,
            handler: Arc::new(StepSensorHandler {
                slot: ListenerSlot::default(),
            }),
            registration: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some() && self.handler.slot.is_attached()
    }
}

impl StepDetector for StepSensorDetector {
    fn register_listener(&mut self, listener: Arc<dyn StepListener>) -> bool {
        if !self.authorized {
            warn!("Activity recognition not granted, step sensor unavailable");
            return false;
        }

        self.handler.slot.attach(listener);
        if self.registration.is_some() {
            return true;
        }

        let handler: Arc<dyn SensorEventListener> = self.handler.clone();
        match self.source.register_listener(SensorKind::StepDetector, handler) {
            Some(id) => {
                info!("Hardware step sensor registered");
                self.registration = Some(id);
                true
            }
            None => {
                warn!("Hardware step sensor not present");
                self.handler.slot.detach();
                false
            }
        }
    }

    fn unregister_listener(&mut self) {
        self.handler.slot.detach();
        if let Some(id) = self.registration.take() {
            self.source.unregister_listener(id);
            debug!("Hardware step sensor unregistered");
        }
    }
}

impl Drop for StepSensorDetector {
    fn drop(&mut self) {
        self.unregister_listener();
    }
}
