use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{error, info, warn};

use super::handlers::CalibrationListener;
use super::state::AppState;
use crate::config::{AppConfig, DetectorMode};
use crate::detector::{
    AccelSensorDetector, ChannelListener, StepDetector, StepDetectorFactory, StepListener, StepSensorDetector,
};
use crate::sensor::{ListenerId, SensorEventListener, SensorManager, SensorSource};
use crate::types::{SensorKind, StepEvent};

/// 步数统计应用，负责注册检测器并汇总步数事件
pub struct StepApp {
    // 统一的状态管理
    pub state: AppState,

    pub(crate) config: AppConfig,
    sensors: Arc<SensorManager>,
    detectors: Vec<Box<dyn StepDetector>>,
    calibration: Option<(Arc<CalibrationListener>, ListenerId)>,
    // 发送端只由已注册的监听器持有，全部注销后通道断开
    pub(crate) event_receiver: Receiver<StepEvent>,
}

impl StepApp {
    pub fn new(config: AppConfig, sensors: Arc<SensorManager>) -> Self {
        let (_, event_receiver) = bounded(config.channels.step_event_capacity);

        Self {
            state: AppState::default(),
            config,
            sensors,
            detectors: Vec::new(),
            calibration: None,
            event_receiver,
        }
    }

    fn step_listener(sender: &Sender<StepEvent>) -> Arc<dyn StepListener> {
        Arc::new(ChannelListener::new(sender.clone()))
    }

    /// 按配置注册检测器，返回是否至少有一个在监听
    pub fn start(&mut self) -> bool {
        self.stop();

        // 上一轮未处理的事件先计入，再换新通道
        self.drain();
        let (event_sender, event_receiver) = bounded(self.config.channels.step_event_capacity);
        self.event_receiver = event_receiver;

        let source: Arc<dyn SensorSource> = self.sensors.clone();
        let detector_config = self.config.detector.clone();
        let authorized = self.config.sensors.activity_recognition_granted;

        match detector_config.mode {
            DetectorMode::Fallback => {
                let mut detector = StepDetectorFactory::create(source, &detector_config, authorized);
                let listening = detector.register_listener(Self::step_listener(&event_sender));
                self.state.detectors.accelerometer_available = None;
                self.state.detectors.step_sensor_available = None;
                self.state.detectors.listening = listening;
                if listening {
                    self.detectors.push(detector);
                }
            }
            DetectorMode::Compare => {
                // 两个检测器各自计数，互不影响
                let mut accel = AccelSensorDetector::new(Arc::clone(&source), &detector_config);
                let accel_available = accel.register_listener(Self::step_listener(&event_sender));

                let mut step_sensor = StepSensorDetector::new(source, authorized);
                let step_sensor_available = step_sensor.register_listener(Self::step_listener(&event_sender));

                self.state.detectors.accelerometer_available = Some(accel_available);
                self.state.detectors.step_sensor_available = Some(step_sensor_available);
                self.state.detectors.listening = accel_available || step_sensor_available;

                if accel_available {
                    self.detectors.push(Box::new(accel));
                }
                if step_sensor_available {
                    self.detectors.push(Box::new(step_sensor));
                }

                let message = self.state.detectors.error_message();
                if !message.is_empty() {
                    warn!("{}", message);
                }
            }
        }

        if self.config.calibration.auto_start {
            self.start_calibration();
        }

        if self.state.detectors.listening {
            info!("Step counting started in {:?} mode", detector_config.mode);
        } else {
            error!("No step detector available");
        }
        self.state.detectors.listening
    }

    fn start_calibration(&mut self) {
        if !self.sensors.has_sensor(SensorKind::Accelerometer) {
            return;
        }

        let listener = Arc::new(CalibrationListener::new(&self.config.calibration, &self.config.detector));
        let handle: Arc<dyn SensorEventListener> = listener.clone();
        if let Some(id) = self.sensors.register_listener(SensorKind::Accelerometer, handle) {
            info!("等待数据到达开始校准...");
            self.calibration = Some((listener, id));
        }
    }

    /// 注销所有检测器，可重复调用
    pub fn stop(&mut self) {
        for detector in &mut self.detectors {
            detector.unregister_listener();
        }
        self.detectors.clear();

        if let Some((_, id)) = self.calibration.take() {
            self.sensors.unregister_listener(id);
        }
        self.state.detectors.listening = false;
    }

    /// 校准得到的采样率
    pub fn sample_rate(&self) -> Option<f64> {
        self.calibration.as_ref().and_then(|(listener, _)| listener.sample_rate())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl Drop for StepApp {
    fn drop(&mut self) {
        self.stop();
    }
}
