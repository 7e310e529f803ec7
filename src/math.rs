/// 三维向量运算工具
/// 纯函数，无状态

pub type Vec3 = [f32; 3];

/// 序列求和，空序列返回 0
pub fn sum(values: &[f32]) -> f32 {
    let mut total = 0.0f32;
    for value in values {
        total += *value;
    }
    total
}

/// 欧几里得范数 sqrt(x² + y² + z²)
pub fn norm(v: &Vec3) -> f32 {
    dot(v, v).sqrt()
}

pub fn dot(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// 按分量除以标量；除数为 0 时返回零向量
pub fn scale_down(v: &Vec3, divisor: f32) -> Vec3 {
    if divisor == 0.0 {
        return [0.0; 3];
    }
    [v[0] / divisor, v[1] / divisor, v[2] / divisor]
}
