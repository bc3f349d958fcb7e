use rand::Rng;

/// 在闭区间 [min, max] 内均匀抽取奖励金额
pub trait AmountDraw: Send + Sync {
    fn draw(&self, min: i64, max: i64) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UniformDraw;

impl AmountDraw for UniformDraw {
    fn draw(&self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        let mut rng = rand::thread_rng();
        rng.gen_range(min..=max)
    }
}

/// 固定金额（测试用），结果仍落在区间内
#[derive(Debug, Clone, Copy)]
pub struct FixedDraw(pub i64);

impl AmountDraw for FixedDraw {
    fn draw(&self, min: i64, max: i64) -> i64 {
        self.0.clamp(min, max.max(min))
    }
}
