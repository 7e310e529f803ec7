//! 传感器数据源抽象
//!
//! 检测器只依赖 [`SensorSource`]，不直接接触平台接口。
//! 实时数据由 MQTT 线程写入 [`SensorManager`]，离线回放与测试使用同一个分发器。

pub mod manager;

pub use manager::SensorManager;

use std::sync::Arc;

use crate::types::{SensorEvent, SensorKind};

/// 监听器注册句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// 传感器回调，在数据分发线程上同步执行
pub trait SensorEventListener: Send + Sync {
    fn on_sensor_changed(&self, event: &SensorEvent);
}

pub trait SensorSource: Send + Sync {
    fn has_sensor(&self, kind: SensorKind) -> bool;

    /// 传感器不存在时返回 None
    fn register_listener(
        &self,
        kind: SensorKind,
        listener: Arc<dyn SensorEventListener>,
    ) -> Option<ListenerId>;

    /// 重复注销无副作用
    fn unregister_listener(&self, id: ListenerId);
}
