use std::time::Duration;

/// 将传感器时钟纳秒格式化为 HH:MM:SS.mmm
/// 传感器时钟是单调时钟，只表示相对时间
pub fn format_sensor_time(timestamp_ns: i64) -> String {
    if timestamp_ns < 0 {
        return format!("Invalid timestamp: {}", timestamp_ns);
    }

    let duration = Duration::from_nanos(timestamp_ns as u64);
    let total_ms = duration.as_millis();
    let seconds = total_ms / 1000;
    let ms = total_ms % 1000;

    let hours = seconds / 3600;
    let minutes = (seconds / 60) % 60;
    let secs = seconds % 60;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
}

/// 毫秒转纳秒，溢出时饱和
pub fn millis_to_nanos(timestamp_ms: i64) -> i64 {
    timestamp_ms.saturating_mul(1_000_000)
}
