//! 离线回放
//!
//! 每行一条 JSON，格式与 MQTT 消息相同；带 `count` 字段的行是计步传感器消息。
//! 空行与 `#` 开头的行被跳过。

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{info, warn};

use crate::mqtt::{AccelPayload, PayloadError, StepPayload};
use crate::sensor::SensorManager;
use crate::types::{SensorEvent, SensorKind};

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub samples: u64,
    pub step_events: u64,
    pub skipped_lines: u64,
}

pub fn parse_recorded_line(line: &str) -> Result<SensorEvent, PayloadError> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    if value.get("count").is_some() {
        serde_json::from_value::<StepPayload>(value)?.into_event()
    } else {
        serde_json::from_value::<AccelPayload>(value)?.into_event()
    }
}

/// 按顺序把记录文件分发给已注册的检测器
pub fn replay_reader<R: BufRead>(reader: R, sensors: &SensorManager) -> Result<ReplaySummary, ReplayError> {
    let mut summary = ReplaySummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match parse_recorded_line(trimmed) {
            Ok(event) => {
                match event.kind {
                    SensorKind::Accelerometer => summary.samples += 1,
                    SensorKind::StepDetector => summary.step_events += 1,
                }
                sensors.dispatch(&event);
            }
            Err(e) => {
                summary.skipped_lines += 1;
                warn!("Skipping line {}: {}", index + 1, e);
            }
        }
    }

    Ok(summary)
}

pub fn replay_file<P: AsRef<Path>>(path: P, sensors: &SensorManager) -> Result<ReplaySummary, ReplayError> {
    let file = File::open(path.as_ref())?;
    info!("Replaying {}", path.as_ref().display());
    replay_reader(BufReader::new(file), sensors)
}
