use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use log::{debug, error, info, warn};
use rumqttc::{Client, Event, LastWill, MqttOptions, Packet, QoS};

use super::payload::parse_sensor_payload;
use crate::config::MqttConfig;
use crate::sensor::SensorManager;
use crate::types::SensorKind;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),
    #[error("MQTT connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),
    #[error("Invalid MQTT port: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// 收到的消息统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub accelerometer_events: u64,
    pub step_events: u64,
    pub invalid_payloads: u64,
}

fn qos_from_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

fn topic_kind(config: &MqttConfig, topic: &str) -> Option<SensorKind> {
    if topic == config.topics.accelerometer {
        Some(SensorKind::Accelerometer)
    } else if topic == config.topics.step_detector {
        Some(SensorKind::StepDetector)
    } else {
        None
    }
}

/// 订阅传感器主题并把事件分发给 SensorManager
/// 阻塞运行，直到收到关闭信号或连接出错
pub fn run_mqtt_client(
    config: &MqttConfig,
    sensors: Arc<SensorManager>,
    shutdown_signal: Arc<AtomicBool>,
) -> Result<FeedStats, FeedError> {
    dotenv().ok(); // 加载 .env 文件

    let mqtt_host = env::var("MQTT_HOST").unwrap_or_else(|_| config.broker.clone());
    let mqtt_port = match env::var("MQTT_PORT") {
        Ok(port) => port.parse::<u16>()?,
        Err(_) => config.port,
    };

    let mut mqtt_options = MqttOptions::new(config.client_id.clone(), mqtt_host.clone(), mqtt_port);

    if let (Ok(mqtt_user), Ok(mqtt_pass)) = (env::var("MQTT_USER"), env::var("MQTT_PASS")) {
        mqtt_options.set_credentials(mqtt_user, mqtt_pass);
    }

    mqtt_options
        .set_keep_alive(Duration::from_secs(u64::from(config.keep_alive.max(1))))
        .set_last_will(LastWill::new(
            format!("{}/status", config.client_id),
            "offline",
            QoS::AtLeastOnce,
            false,
        ));

    let qos = qos_from_level(config.qos);
    let (client, mut connection) = Client::new(mqtt_options, config.request_capacity.max(1));
    client.subscribe(config.topics.accelerometer.clone(), qos)?;
    client.subscribe(config.topics.step_detector.clone(), qos)?;
    info!("Subscribed to {}:{} topics [{}, {}]", mqtt_host, mqtt_port, config.topics.accelerometer, config.topics.step_detector);

    let mut stats = FeedStats::default();

    for event in connection.iter() {
        // 检查关闭信号
        if shutdown_signal.load(Ordering::Relaxed) {
            info!("MQTT thread received shutdown signal, exiting gracefully");
            if let Err(e) = client.disconnect() {
                debug!("MQTT disconnect failed: {}", e);
            }
            break;
        }

        match event {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let Some(kind) = topic_kind(config, &publish.topic) else {
                    debug!("Ignoring message on topic {}", publish.topic);
                    continue;
                };

                match parse_sensor_payload(kind, &publish.payload) {
                    Ok(sensor_event) => {
                        match kind {
                            SensorKind::Accelerometer => stats.accelerometer_events += 1,
                            SensorKind::StepDetector => stats.step_events += 1,
                        }
                        sensors.dispatch(&sensor_event);
                    }
                    Err(e) => {
                        stats.invalid_payloads += 1;
                        warn!("Invalid {} data: {}", kind, e);
                    }
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => info!("Connected to MQTT broker"),
            Ok(_) => {}
            Err(e) => {
                error!("MQTT connection error: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(stats)
}
