use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use log::{debug, info};

use super::app_core::StepApp;
use super::state::StepTally;
use crate::types::StepEvent;
use crate::utils::format_sensor_time;

impl StepApp {
    pub fn handle_step(&mut self, event: StepEvent) {
        self.state.record_step(&event);
        debug!(
            "{} step x{} at {}, total {}",
            event.source,
            event.count,
            format_sensor_time(event.timestamp_ns),
            self.state.tally.total()
        );
    }

    /// 处理已到达的事件，不阻塞
    pub fn drain(&mut self) -> StepTally {
        while let Ok(event) = self.event_receiver.try_recv() {
            self.handle_step(event);
        }
        self.state.tally
    }

    /// 汇总步数事件直到收到关闭信号
    pub fn run(&mut self, shutdown_signal: &AtomicBool) -> StepTally {
        let poll_interval = Duration::from_millis(self.config.app.poll_interval_ms);
        let status_interval = Duration::from_secs(self.config.app.status_interval_seconds);
        let mut last_status = Instant::now();

        while !shutdown_signal.load(Ordering::Relaxed) {
            match self.event_receiver.recv_timeout(poll_interval) {
                Ok(event) => self.handle_step(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Step event channel disconnected");
                    break;
                }
            }

            if !status_interval.is_zero() && last_status.elapsed() >= status_interval {
                info!("{}", self.state.get_status_summary());
                last_status = Instant::now();
            }
        }

        // 关闭前处理剩余事件
        self.drain()
    }
}
