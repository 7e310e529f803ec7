//! 加速度计步数检测算法
//!
//! 每个样本依次执行：
//! 1. 三个长窗口（默认 500 样本）的滑动平均估计重力方向
//! 2. 当前样本投影到重力方向并减去重力大小，得到竖直信号
//! 3. 竖直信号写入短窗口（默认 100 样本），窗口求和作为速度估计
//! 4. 速度估计由不高于阈值变为高于阈值、且距上一步超过不应期时记一步
//!
//! 阈值与不应期是标定常数，不是物理推导的值。

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, trace, warn};

use super::{ListenerSlot, StepDetector, StepListener};
use crate::config::DetectorConfig;
use crate::math::{self, Vec3};
use crate::ring_buffer::RingBuffer;
use crate::sensor::{ListenerId, SensorEventListener, SensorSource};
use crate::types::{AccelerationSample, SensorEvent, SensorKind, StepEvent, StepSource};

/// 由长窗口均值得到的重力估计，每次按需重新计算
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityEstimate {
    pub unit: Vec3,
    /// 归一化之前的模长
    pub magnitude: f32,
}

impl GravityEstimate {
    pub fn from_raw(raw: Vec3) -> Self {
        let magnitude = math::norm(&raw);
        Self {
            unit: math::scale_down(&raw, magnitude),
            magnitude,
        }
    }

    /// 模长为 0 时方向无定义，单位向量取零向量
    pub fn is_degenerate(&self) -> bool {
        self.magnitude == 0.0
    }

    /// 去除重力后的竖直分量；退化时为 0
    pub fn vertical_component(&self, sample: &AccelerationSample) -> f32 {
        if self.is_degenerate() {
            return 0.0;
        }
        math::dot(&self.unit, &sample.as_vec3()) - self.magnitude
    }
}

/// 上升沿触发器，带不应期
#[derive(Debug, Clone)]
pub struct StepTrigger {
    threshold: f32,
    refractory_ns: i64,
    previous_integrated: f32,
    last_step_time_ns: i64,
}

impl StepTrigger {
    pub fn new(threshold: f32, refractory_ns: i64) -> Self {
        Self {
            threshold,
            refractory_ns,
            previous_integrated: 0.0,
            last_step_time_ns: 0,
        }
    }

    /// 每个样本调用一次，返回是否记一步
    pub fn observe(&mut self, integrated: f32, timestamp_ns: i64) -> bool {
        let crossed = integrated > self.threshold && self.previous_integrated <= self.threshold;
        let rested = timestamp_ns.saturating_sub(self.last_step_time_ns) > self.refractory_ns;

        let accepted = crossed && rested;
        if accepted {
            self.last_step_time_ns = timestamp_ns;
        } else if crossed {
            trace!("Crossing at {}ns suppressed by refractory period", timestamp_ns);
        }

        self.previous_integrated = integrated;
        accepted
    }

    pub fn previous_integrated(&self) -> f32 {
        self.previous_integrated
    }

    pub fn last_step_time_ns(&self) -> i64 {
        self.last_step_time_ns
    }
}

/// 纯计算部分，不涉及注册与线程
#[derive(Debug, Clone)]
pub struct AccelStepCounter {
    accel_x: RingBuffer,
    accel_y: RingBuffer,
    accel_z: RingBuffer,
    velocity: RingBuffer,
    trigger: StepTrigger,
    steps_detected: u64,
}

impl AccelStepCounter {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            accel_x: RingBuffer::new(config.long_window),
            accel_y: RingBuffer::new(config.long_window),
            accel_z: RingBuffer::new(config.long_window),
            velocity: RingBuffer::new(config.short_window),
            trigger: StepTrigger::new(config.step_threshold, config.refractory_ns),
            steps_detected: 0,
        }
    }

    /// 处理一个样本，最多产生一个步数事件
    pub fn update(&mut self, sample: &AccelerationSample) -> Option<StepEvent> {
        // 更新重力方向估计
        self.accel_x.push(sample.x);
        self.accel_y.push(sample.y);
        self.accel_z.push(sample.z);

        let gravity = self.gravity_estimate();
        if gravity.is_degenerate() {
            trace!("Degenerate gravity estimate at {}ns, vertical signal set to 0", sample.timestamp_ns);
        }

        // 当前加速度在重力方向上的分量，减去重力本身
        let vertical = gravity.vertical_component(sample);
        self.velocity.push(vertical);

        let integrated = self.velocity.sum();
        if self.trigger.observe(integrated, sample.timestamp_ns) {
            self.steps_detected += 1;
            trace!("Step at {}ns, velocity estimate {:.2}", sample.timestamp_ns, integrated);
            return Some(StepEvent::single(sample.timestamp_ns, StepSource::Accelerometer));
        }

        None
    }

    pub fn process_batch(&mut self, samples: &[AccelerationSample]) -> Vec<StepEvent> {
        samples.iter().filter_map(|sample| self.update(sample)).collect()
    }

    pub fn gravity_estimate(&self) -> GravityEstimate {
        GravityEstimate::from_raw([self.accel_x.mean(), self.accel_y.mean(), self.accel_z.mean()])
    }

    pub fn integrated_velocity(&self) -> f32 {
        self.velocity.sum()
    }

    pub fn trigger(&self) -> &StepTrigger {
        &self.trigger
    }

    pub fn samples_seen(&self) -> u64 {
        self.accel_x.pushes_seen()
    }

    pub fn steps_detected(&self) -> u64 {
        self.steps_detected
    }
}

/// 注册到传感器源上的回调对象，由分发线程调用
struct AccelSampleHandler {
    counter: Mutex<AccelStepCounter>,
    slot: ListenerSlot,
}

impl SensorEventListener for AccelSampleHandler {
    fn on_sensor_changed(&self, event: &SensorEvent) {
        let Some(sample) = event.to_acceleration_sample() else {
            trace!("Ignoring accelerometer event with {} values", event.values.len());
            return;
        };

        let step = {
            let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
            counter.update(&sample)
        };

        if let Some(step) = step {
            self.slot.emit(step);
        }
    }
}

/// 基于加速度计的步数检测器
pub struct AccelSensorDetector {
    source: Arc<dyn SensorSource>,
    handler: Arc<AccelSampleHandler>,
    registration: Option<ListenerId>,
}

impl AccelSensorDetector {
    pub fn new(source: Arc<dyn SensorSource>, config: &DetectorConfig) -> Self {
        Self {
            source,
            handler: Arc::new(AccelSampleHandler {
                counter: Mutex::new(AccelStepCounter::new(config)),
                slot: ListenerSlot::default(),
            }),
            registration: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some() && self.handler.slot.is_attached()
    }

    pub fn steps_detected(&self) -> u64 {
        self.handler
            .counter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .steps_detected()
    }
}

impl StepDetector for AccelSensorDetector {
    fn register_listener(&mut self, listener: Arc<dyn StepListener>) -> bool {
        self.handler.slot.attach(listener);

        // 已经订阅时只替换监听器
        if self.registration.is_some() {
            return true;
        }

        let handler: Arc<dyn SensorEventListener> = self.handler.clone();
        match self.source.register_listener(SensorKind::Accelerometer, handler) {
            Some(id) => {
                info!("Accelerometer step detector registered");
                self.registration = Some(id);
                true
            }
            None => {
                warn!("Accelerometer unavailable, accelerometer step detector not started");
                self.handler.slot.detach();
                false
            }
        }
    }

    fn unregister_listener(&mut self) {
        self.handler.slot.detach();
        if let Some(id) = self.registration.take() {
            self.source.unregister_listener(id);
            debug!("Accelerometer step detector unregistered");
        }
    }
}

impl Drop for AccelSensorDetector {
    fn drop(&mut self) {
        self.unregister_listener();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SensorManager;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    // 200Hz
    const DT_NS: i64 = 5_000_000;
    const REFRACTORY_NS: i64 = 250_000_000;

    fn counter() -> AccelStepCounter {
        AccelStepCounter::new(&DetectorConfig::default())
    }

    fn rest(counter: &mut AccelStepCounter, from: i64, to: i64) -> Vec<StepEvent> {
        (from..to)
            .filter_map(|i| counter.update(&AccelerationSample::new(i * DT_NS, 0.0, 0.0, 9.8)))
            .collect()
    }

    /// 一次向上冲击紧跟一次向下冲击，占用两个样本
    fn burst(counter: &mut AccelStepCounter, at: i64) -> Vec<StepEvent> {
        let up = AccelerationSample::new(at * DT_NS, 0.0, 0.0, 59.8);
        let down = AccelerationSample::new((at + 1) * DT_NS, 0.0, 0.0, -40.2);
        [up, down].iter().filter_map(|sample| counter.update(sample)).collect()
    }

    /// 沿给定重力方向的正弦运动
    fn walking_samples(
        gravity_dir: Vec3,
        rate_hz: f32,
        cadence_hz: f32,
        amplitude: f32,
        warm_up: usize,
        count: usize,
    ) -> Vec<AccelerationSample> {
        let dt_ns = (1e9 / rate_hz) as i64;
        (0..warm_up + count)
            .map(|i| {
                let t = i as f32 / rate_hz;
                let motion = if i < warm_up {
                    0.0
                } else {
                    amplitude * (2.0 * std::f32::consts::PI * cadence_hz * t).sin()
                };
                let total = 9.8 + motion;
                AccelerationSample::new(
                    i as i64 * dt_ns,
                    gravity_dir[0] * total,
                    gravity_dir[1] * total,
                    gravity_dir[2] * total,
                )
            })
            .collect()
    }

    fn assert_refractory(steps: &[StepEvent]) {
        for pair in steps.windows(2) {
            let gap = pair[1].timestamp_ns - pair[0].timestamp_ns;
            assert!(gap > REFRACTORY_NS, "Steps only {}ns apart", gap);
        }
    }

    #[test]
    fn test_rest_produces_no_steps() {
        let mut counter = counter();
        let steps = rest(&mut counter, 0, 500);

        assert!(steps.is_empty());
        assert_eq!(counter.samples_seen(), 500);

        let gravity = counter.gravity_estimate();
        assert!((gravity.magnitude - 9.8).abs() < 1e-3, "magnitude {}", gravity.magnitude);
        assert!(gravity.unit[0].abs() < 1e-6);
        assert!(gravity.unit[1].abs() < 1e-6);
        assert!((gravity.unit[2] - 1.0).abs() < 1e-6);
        assert!(counter.integrated_velocity().abs() < 0.1);
    }

    #[test]
    fn test_gravity_during_warm_up_uses_pushed_count() {
        let mut counter = counter();
        counter.update(&AccelerationSample::new(0, 0.0, 0.0, 9.8));

        // 只有一个样本时均值就是它本身，不会被 499 个空槽拉低
        let gravity = counter.gravity_estimate();
        assert!((gravity.magnitude - 9.8).abs() < 1e-5);
        assert!(counter.integrated_velocity().abs() < 1e-5);
    }

    #[test]
    fn test_bursts_300ms_apart_yield_two_steps() {
        let mut counter = counter();
        let mut steps = rest(&mut counter, 0, 500);
        steps.extend(burst(&mut counter, 500));
        steps.extend(rest(&mut counter, 502, 560));
        steps.extend(burst(&mut counter, 560));
        steps.extend(rest(&mut counter, 562, 700));

        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|step| step.count == 1));
        assert!(steps.iter().all(|step| step.source == StepSource::Accelerometer));
        assert_eq!(steps[0].timestamp_ns, 500 * DT_NS);
        assert_eq!(steps[1].timestamp_ns - steps[0].timestamp_ns, 300_000_000);
        assert_eq!(counter.steps_detected(), 2);
    }

    #[test]
    fn test_bursts_100ms_apart_yield_one_step() {
        let mut counter = counter();
        let mut steps = rest(&mut counter, 0, 500);
        steps.extend(burst(&mut counter, 500));
        steps.extend(rest(&mut counter, 502, 520));
        steps.extend(burst(&mut counter, 520));
        steps.extend(rest(&mut counter, 522, 700));

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].timestamp_ns, 500 * DT_NS);
    }

    #[test]
    fn test_burst_velocity_estimate_exceeds_threshold() {
        let mut counter = counter();
        rest(&mut counter, 0, 500);
        counter.update(&AccelerationSample::new(500 * DT_NS, 0.0, 0.0, 59.8));

        let gravity = counter.gravity_estimate();
        assert!((gravity.magnitude - 9.9).abs() < 1e-3);
        assert!((counter.integrated_velocity() - 49.9).abs() < 0.05);
        assert!((counter.trigger().previous_integrated() - 49.9).abs() < 0.05);
        assert_eq!(counter.trigger().last_step_time_ns(), 500 * DT_NS);
    }

    #[test]
    fn test_trigger_touching_threshold_does_not_fire() {
        let mut trigger = StepTrigger::new(40.0, REFRACTORY_NS);

        assert!(!trigger.observe(40.0, 1_000_000_000));
        // 从等于阈值处越过，算一次上升沿
        assert!(trigger.observe(40.5, 2_000_000_000));
        // 保持在阈值之上不重复触发
        assert!(!trigger.observe(41.0, 3_000_000_000));
        assert!(!trigger.observe(39.0, 4_000_000_000));
        assert!(trigger.observe(45.0, 5_000_000_000));
    }

    #[test]
    fn test_trigger_refractory_is_strict() {
        let mut trigger = StepTrigger::new(40.0, REFRACTORY_NS);
        assert!(trigger.observe(50.0, 1_000_000_000));

        trigger.observe(0.0, 1_100_000_000);
        assert!(!trigger.observe(50.0, 1_000_000_000 + REFRACTORY_NS));

        trigger.observe(0.0, 1_300_000_000);
        assert!(trigger.observe(50.0, 1_000_000_000 + REFRACTORY_NS + 1));
        assert_eq!(trigger.last_step_time_ns(), 1_000_000_000 + REFRACTORY_NS + 1);
    }

    #[test]
    fn test_trigger_starts_from_zero_state() {
        let mut trigger = StepTrigger::new(40.0, REFRACTORY_NS);
        assert_eq!(trigger.previous_integrated(), 0.0);
        assert_eq!(trigger.last_step_time_ns(), 0);

        // 传感器时钟前 250ms 内的越过会被不应期抑制
        assert!(!trigger.observe(50.0, 100_000_000));
        assert_eq!(trigger.previous_integrated(), 50.0);
    }

    #[test]
    fn test_all_zero_input_is_degenerate_but_harmless() {
        let mut counter = counter();
        for i in 0..600 {
            assert!(counter.update(&AccelerationSample::new(i * DT_NS, 0.0, 0.0, 0.0)).is_none());
        }

        let gravity = counter.gravity_estimate();
        assert!(gravity.is_degenerate());
        assert_eq!(gravity.unit, [0.0, 0.0, 0.0]);
        assert_eq!(counter.integrated_velocity(), 0.0);
    }

    #[test]
    fn test_walking_is_counted_once_per_cycle() {
        let mut counter = counter();
        // 400Hz 采样，2Hz 步频，预热 500 个静止样本后行走 10 秒
        let samples = walking_samples([0.0, 0.0, 1.0], 400.0, 2.0, 2.0, 500, 4000);
        let steps = counter.process_batch(&samples);

        assert!((18..=21).contains(&steps.len()), "got {} steps", steps.len());
        assert_refractory(&steps);
    }

    #[test]
    fn test_tilted_device_counts_like_upright() {
        let tilt = 0.6f32;
        let dir = [0.0, tilt.sin(), tilt.cos()];

        let upright = counter().process_batch(&walking_samples([0.0, 0.0, 1.0], 400.0, 2.0, 2.0, 500, 4000));
        let tilted = counter().process_batch(&walking_samples(dir, 400.0, 2.0, 2.0, 500, 4000));

        assert!((upright.len() as i64 - tilted.len() as i64).abs() <= 1);
    }

    #[test]
    fn test_same_input_gives_same_steps() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples: Vec<AccelerationSample> = (0..3000)
            .map(|i| {
                let spike: f32 = if i % 90 == 0 { 45.0 } else { 0.0 };
                AccelerationSample::new(
                    i * DT_NS,
                    rng.random_range(-0.5f32..0.5),
                    rng.random_range(-0.5f32..0.5),
                    9.8 + spike + rng.random_range(-1.0f32..1.0),
                )
            })
            .collect();

        let first = counter().process_batch(&samples);
        let second = counter().process_batch(&samples);

        assert_eq!(first, second);
    }

    #[test]
    fn test_noisy_input_never_violates_refractory_period() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut counter = counter();
        let mut steps = Vec::new();
        let mut t = 0i64;

        for _ in 0..20_000 {
            // 不规则的采样间隔
            t += rng.random_range(1_000_000i64..8_000_000);
            let spike: f32 = if rng.random_bool(0.02) { rng.random_range(-60.0f32..60.0) } else { 0.0 };
            let sample = AccelerationSample::new(
                t,
                rng.random_range(-2.0f32..2.0),
                rng.random_range(-2.0f32..2.0),
                9.8 + spike + rng.random_range(-3.0f32..3.0),
            );
            if let Some(step) = counter.update(&sample) {
                assert_eq!(step.count, 1);
                steps.push(step);
            }
        }

        assert_refractory(&steps);
        assert_eq!(counter.steps_detected(), steps.len() as u64);
    }

    #[test]
    fn test_detector_forwards_steps_to_listener() {
        let manager = Arc::new(SensorManager::new([SensorKind::Accelerometer]));
        let mut detector = AccelSensorDetector::new(manager.clone(), &DetectorConfig::default());
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);

        assert!(detector.register_listener(Arc::new(move |event: StepEvent| {
            sink.lock().unwrap().push(event);
        })));
        assert!(detector.is_registered());

        for i in 0..500 {
            manager.dispatch(&SensorEvent::accelerometer(i * DT_NS, 0.0, 0.0, 9.8));
        }
        manager.dispatch(&SensorEvent::accelerometer(500 * DT_NS, 0.0, 0.0, 59.8));
        manager.dispatch(&SensorEvent::accelerometer(501 * DT_NS, 0.0, 0.0, -40.2));

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].source, StepSource::Accelerometer);
        assert_eq!(detector.steps_detected(), 1);
    }

    #[test]
    fn test_register_fails_without_accelerometer() {
        let manager = Arc::new(SensorManager::new([SensorKind::StepDetector]));
        let mut detector = AccelSensorDetector::new(manager, &DetectorConfig::default());

        assert!(!detector.register_listener(Arc::new(|_event: StepEvent| {})));
        assert!(!detector.is_registered());
    }

    #[test]
    fn test_short_events_are_ignored() {
        let manager = Arc::new(SensorManager::new([SensorKind::Accelerometer]));
        let mut detector = AccelSensorDetector::new(manager.clone(), &DetectorConfig::default());
        detector.register_listener(Arc::new(|_event: StepEvent| {}));

        manager.dispatch(&SensorEvent {
            kind: SensorKind::Accelerometer,
            timestamp_ns: 0,
            values: vec![1.0],
        });
        assert_eq!(detector.handler.counter.lock().unwrap().samples_seen(), 0);
    }

    #[test]
    fn test_unregister_twice_is_safe() {
        let manager = Arc::new(SensorManager::new([SensorKind::Accelerometer]));
        let mut detector = AccelSensorDetector::new(manager.clone(), &DetectorConfig::default());
        detector.register_listener(Arc::new(|_event: StepEvent| {}));

        detector.unregister_listener();
        detector.unregister_listener();

        assert!(!detector.is_registered());
        assert_eq!(manager.listener_count(SensorKind::Accelerometer), 0);
    }

    #[test]
    fn test_drop_releases_registration() {
        let manager = Arc::new(SensorManager::new([SensorKind::Accelerometer]));
        {
            let mut detector = AccelSensorDetector::new(manager.clone(), &DetectorConfig::default());
            detector.register_listener(Arc::new(|_event: StepEvent| {}));
            assert_eq!(manager.listener_count(SensorKind::Accelerometer), 1);
        }
        assert_eq!(manager.listener_count(SensorKind::Accelerometer), 0);
    }

    #[test]
    fn test_no_events_after_unregister_returns() {
        let manager = Arc::new(SensorManager::new([SensorKind::Accelerometer]));
        let mut detector = AccelSensorDetector::new(manager.clone(), &DetectorConfig::default());
        let delivered = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&delivered);
        detector.register_listener(Arc::new(move |_event: StepEvent| {
            sink.fetch_add(1, Ordering::SeqCst);
        }));

        // 另一个线程持续投递，每 60 个样本一次冲击
        let feeder_manager = Arc::clone(&manager);
        let feeder = thread::spawn(move || {
            for i in 0..40_000i64 {
                let z = match i % 60 {
                    0 if i >= 500 => 59.8,
                    1 if i >= 500 => -40.2,
                    _ => 9.8,
                };
                feeder_manager.dispatch(&SensorEvent::accelerometer(i * DT_NS, 0.0, 0.0, z));
            }
        });

        thread::sleep(Duration::from_millis(5));
        detector.unregister_listener();
        let after_unregister = delivered.load(Ordering::SeqCst);

        feeder.join().unwrap();
        assert_eq!(delivered.load(Ordering::SeqCst), after_unregister);
    }
}
