//! 基于加速度计的计步服务
//!
//! 用长窗口均值估计重力方向，把每个样本投影到竖直方向，
//! 短窗口求和近似竖直速度，速度上穿阈值且超过不应期时记一步。
//! 硬件计步传感器可用且已授权时优先使用。

pub mod app;
pub mod config;
pub mod detector;
pub mod logger;
pub mod math;
pub mod mqtt;
pub mod replay;
pub mod ring_buffer;
pub mod sensor;
pub mod types;
pub mod utils;

pub use app::StepApp;
pub use config::{AppConfig, ConfigError, ConfigManager, DetectorConfig, DetectorMode};
pub use detector::{
    AccelSensorDetector, AccelStepCounter, FallbackStepDetector, StepDetector, StepDetectorFactory, StepListener,
    StepSensorDetector,
};
pub use ring_buffer::RingBuffer;
pub use sensor::{SensorManager, SensorSource};
pub use types::{AccelerationSample, SensorEvent, SensorKind, StepEvent, StepSource};
