use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 应用配置管理模块
/// 集中管理所有配置项，提供默认值和配置验证

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    pub detector: DetectorConfig,
    pub sensors: SensorConfig,
    pub calibration: CalibrationConfig,
    pub channels: ChannelConfig,
    pub logging: LoggingConfig,
    pub app: RunConfig,
}

/// MQTT配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    pub topics: MqttTopics,
    pub qos: u8,
    pub keep_alive: u16,
    /// 客户端请求队列长度
    pub request_capacity: usize,
}

/// MQTT主题配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttTopics {
    pub accelerometer: String,
    pub step_detector: String,
}

/// 两种检测器的组合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorMode {
    /// 优先硬件计步传感器，不可用时退回加速度计算法
    Fallback,
    /// 两种检测器同时运行，分别计数
    Compare,
}

/// 步数检测参数
/// 默认值为标定常数，构造后不可修改
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub mode: DetectorMode,
    /// 重力估计窗口（样本数）
    pub long_window: usize,
    /// 速度积分窗口（样本数）
    pub short_window: usize,
    pub step_threshold: f32,
    /// 两步之间的最小间隔（纳秒）
    pub refractory_ns: i64,
}

/// 可用的传感器与授权状态
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub accelerometer: bool,
    pub step_detector: bool,
    pub activity_recognition_granted: bool,
}

/// 采样率校准配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub duration_seconds: f64,
    pub min_samples: usize,
    pub auto_start: bool,
}

/// 通道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub step_event_capacity: usize,
}

/// 日志配置，RUST_LOG 优先
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

/// 运行循环配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub status_interval_seconds: u64,
    pub poll_interval_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "localhost".to_string(),
            port: 1883,
            client_id: "stephub_client".to_string(),
            topics: MqttTopics::default(),
            qos: 1,
            keep_alive: 5,
            request_capacity: 10,
        }
    }
}

impl Default for MqttTopics {
    fn default() -> Self {
        Self {
            accelerometer: "sensor/accelerometer".to_string(),
            step_detector: "sensor/step_detector".to_string(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            mode: DetectorMode::Fallback,
            long_window: 500,
            short_window: 100,
            step_threshold: 40.0,
            refractory_ns: 250_000_000,
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            accelerometer: true,
            step_detector: false,
            activity_recognition_granted: false,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 5.0,
            min_samples: 2,
            auto_start: true,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            step_event_capacity: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            status_interval_seconds: 10,
            poll_interval_ms: 100,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.long_window == 0 || self.short_window == 0 {
            return Err(ConfigError::ValidationError("Detector windows must be positive".to_string()));
        }

        if !self.step_threshold.is_finite() {
            return Err(ConfigError::ValidationError("Step threshold must be finite".to_string()));
        }

        if self.refractory_ns < 0 {
            return Err(ConfigError::ValidationError("Refractory period must not be negative".to_string()));
        }

        Ok(())
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;

        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;

        if self.mqtt.qos > 2 {
            return Err(ConfigError::ValidationError("MQTT QoS must be 0, 1 or 2".to_string()));
        }

        if self.calibration.duration_seconds <= 0.0 {
            return Err(ConfigError::ValidationError("Calibration duration must be positive".to_string()));
        }

        if self.calibration.min_samples < 2 {
            return Err(ConfigError::ValidationError("Minimum samples must be at least 2".to_string()));
        }

        if self.channels.step_event_capacity == 0 {
            return Err(ConfigError::ValidationError("Step event channel capacity must be positive".to_string()));
        }

        if self.app.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError("Poll interval must be positive".to_string()));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Serialize error: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 配置管理器
pub struct ConfigManager {
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            config_path: None,
        }
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = AppConfig::load_from_file(&path)?;
        Ok(Self {
            config,
            config_path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// 获取当前配置
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// 获取可变配置
    pub fn get_config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
