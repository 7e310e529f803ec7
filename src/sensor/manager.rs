use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, trace};

use super::{ListenerId, SensorEventListener, SensorSource};
use crate::config::SensorConfig;
use crate::types::{SensorEvent, SensorKind};

struct Registration {
    kind: SensorKind,
    listener: Arc<dyn SensorEventListener>,
}

/// 进程内传感器分发器
pub struct SensorManager {
    available: HashSet<SensorKind>,
    listeners: Mutex<HashMap<ListenerId, Registration>>,
    next_id: AtomicU64,
}

impl SensorManager {
    pub fn new<I>(available: I) -> Self
    where
        I: IntoIterator<Item = SensorKind>,
    {
        Self {
            available: available.into_iter().collect(),
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &SensorConfig) -> Self {
        let mut available = Vec::new();
        if config.accelerometer {
            available.push(SensorKind::Accelerometer);
        }
        if config.step_detector {
            available.push(SensorKind::StepDetector);
        }
        Self::new(available)
    }

    /// 同步分发给该类型的所有监听器，返回收到事件的监听器数量
    pub fn dispatch(&self, event: &SensorEvent) -> usize {
        // 先复制监听器列表再回调，回调内可以安全地注销
        let targets: Vec<Arc<dyn SensorEventListener>> = {
            let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            listeners
                .values()
                .filter(|registration| registration.kind == event.kind)
                .map(|registration| Arc::clone(&registration.listener))
                .collect()
        };

        trace!("Dispatching {} event to {} listeners", event.kind, targets.len());
        for listener in &targets {
            listener.on_sensor_changed(event);
        }
        targets.len()
    }

    pub fn listener_count(&self, kind: SensorKind) -> usize {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.values().filter(|registration| registration.kind == kind).count()
    }
}

impl SensorSource for SensorManager {
    fn has_sensor(&self, kind: SensorKind) -> bool {
        self.available.contains(&kind)
    }

    fn register_listener(
        &self,
        kind: SensorKind,
        listener: Arc<dyn SensorEventListener>,
    ) -> Option<ListenerId> {
        if !self.has_sensor(kind) {
            debug!("Sensor {} is not available", kind);
            return None;
        }

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.insert(id, Registration { kind, listener });
        debug!("Registered {} listener {:?}", kind, id);
        Some(id)
    }

    fn unregister_listener(&self, id: ListenerId) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(registration) = listeners.remove(&id) {
            debug!("Unregistered {} listener {:?}", registration.kind, id);
        }
    }
}
