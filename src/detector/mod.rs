//! 步数检测器
//!
//! 两种实现共享同一个注册接口 [`StepDetector`]：
//! - [`AccelSensorDetector`]: 基于加速度计的检测算法
//! - [`StepSensorDetector`]: 硬件计步传感器直通
//!
//! [`FallbackStepDetector`] 优先使用硬件计步传感器，不可用时退回加速度计算法。

pub mod accel;
pub mod fallback;
pub mod step_sensor;

pub use accel::{AccelSensorDetector, AccelStepCounter, GravityEstimate, StepTrigger};
pub use fallback::{FallbackStepDetector, StepDetectorFactory};
pub use step_sensor::StepSensorDetector;

use std::sync::{Arc, PoisonError, RwLock};

use crossbeam_channel::Sender;
use log::warn;

use crate::types::StepEvent;

/// 步数事件接收方
///
/// 在传感器数据分发路径上同步调用，实现必须快速返回，
/// 耗时的处理应转交给其他线程。
pub trait StepListener: Send + Sync {
    fn on_step(&self, event: StepEvent);
}

impl<F> StepListener for F
where
    F: Fn(StepEvent) + Send + Sync,
{
    fn on_step(&self, event: StepEvent) {
        self(event)
    }
}

/// 把步数事件转发到通道，通道满或断开时丢弃事件
pub struct ChannelListener {
    sender: Sender<StepEvent>,
}

impl ChannelListener {
    pub fn new(sender: Sender<StepEvent>) -> Self {
        Self { sender }
    }
}

impl StepListener for ChannelListener {
    fn on_step(&self, event: StepEvent) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("Dropping {} step event: {}", event.source, e);
        }
    }
}

pub trait StepDetector: Send {
    /// 返回 true 表示开始监听
    fn register_listener(&mut self, listener: Arc<dyn StepListener>) -> bool;

    /// 可随时调用，重复调用无副作用；返回后不会再有事件送达
    fn unregister_listener(&mut self);
}

/// 当前挂载的监听器
///
/// 发送事件时持有读锁，注销时取写锁，
/// 因此 `detach` 返回后旧监听器不会再收到事件。
#[derive(Default)]
pub(crate) struct ListenerSlot {
    listener: RwLock<Option<Arc<dyn StepListener>>>,
}

impl ListenerSlot {
    pub(crate) fn attach(&self, listener: Arc<dyn StepListener>) {
        let mut slot = self.listener.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(listener);
    }

    pub(crate) fn detach(&self) {
        let mut slot = self.listener.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// 没有监听器时返回 false
    pub(crate) fn emit(&self, event: StepEvent) -> bool {
        let slot = self.listener.read().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(listener) => {
                listener.on_step(event);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.listener.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}
