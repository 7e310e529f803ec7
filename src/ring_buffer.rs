use crate::math;

/// 固定容量环形缓冲区
/// 新值覆盖最旧的值，未写入的槽位保持 0
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<f32>,
    pushes: u64,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        // 容量为 0 时退化为 1，避免取模除零
        let capacity = capacity.max(1);
        Self {
            slots: vec![0.0; capacity],
            pushes: 0,
        }
    }

    /// 先递增计数，再写入 `pushes % capacity` 号槽位
    pub fn push(&mut self, value: f32) {
        self.pushes += 1;
        let index = (self.pushes % self.slots.len() as u64) as usize;
        self.slots[index] = value;
    }

    /// 所有槽位之和（包括尚未写入的 0）
    pub fn sum(&self) -> f32 {
        math::sum(&self.slots)
    }

    /// 除以 min(pushes, capacity)，空缓冲区返回 0
    pub fn mean(&self) -> f32 {
        let held = self.len();
        if held == 0 {
            return 0.0;
        }
        self.sum() / held as f32
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// 当前持有的有效值数量
    pub fn len(&self) -> usize {
        self.pushes.min(self.slots.len() as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.pushes == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    pub fn pushes_seen(&self) -> u64 {
        self.pushes
    }
}
