use crate::math::Vec3;

/// 一次加速度计采样（含重力），时间戳为传感器单调时钟纳秒
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelerationSample {
    pub timestamp_ns: i64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AccelerationSample {
    pub fn new(timestamp_ns: i64, x: f32, y: f32, z: f32) -> Self {
        Self { timestamp_ns, x, y, z }
    }

    pub fn as_vec3(&self) -> Vec3 {
        [self.x, self.y, self.z]
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}
