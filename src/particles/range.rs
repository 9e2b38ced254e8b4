//! 数值范围采样
//!
//! 定义文件中的数值既可以是固定值，也可以是闭区间 `[lo, hi]`。
//! 实例化粒子时通过注入的随机数生成器解析为具体数值。

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// 标量范围
///
/// 在定义文件中写作数字（`2.5`）或二元数组（`[1, 3]`）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Range {
    /// 固定值
    Fixed(f32),
    /// 闭区间 `[lo, hi]`，允许 `lo > hi`
    Interval([f32; 2]),
}

impl Range {
    pub const fn fixed(value: f32) -> Self {
        Self::Fixed(value)
    }

    pub const fn interval(lo: f32, hi: f32) -> Self {
        Self::Interval([lo, hi])
    }

    /// 范围的下界和上界（固定值时两者相等，区间不做排序）
    pub fn bounds(&self) -> (f32, f32) {
        match *self {
            Self::Fixed(v) => (v, v),
            Self::Interval([lo, hi]) => (lo, hi),
        }
    }

    pub fn is_finite(&self) -> bool {
        let (lo, hi) = self.bounds();
        lo.is_finite() && hi.is_finite()
    }

    /// 采样一次，见 [`sample_range`]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, integer: bool) -> f32 {
        sample_range(rng, self, integer)
    }
}

impl From<f32> for Range {
    fn from(value: f32) -> Self {
        Self::Fixed(value)
    }
}

impl From<[f32; 2]> for Range {
    fn from(bounds: [f32; 2]) -> Self {
        Self::Interval(bounds)
    }
}

// 浮点字面量缺省推断为 f64，构造器参数 `impl Into<Range>` 需要接受它
impl From<f64> for Range {
    fn from(value: f64) -> Self {
        Self::Fixed(value as f32)
    }
}

impl From<[f64; 2]> for Range {
    fn from([lo, hi]: [f64; 2]) -> Self {
        Self::Interval([lo as f32, hi as f32])
    }
}

/// 三维向量范围
///
/// 单个 [`Range`] 只采样一次并广播到三个轴；三元数组则逐轴独立采样。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VectorRange {
    /// 单一范围，三个分量取同一个采样值
    Uniform(Range),
    /// 每个轴独立的范围
    PerAxis([Range; 3]),
}

impl VectorRange {
    pub const ZERO: Self = Self::Uniform(Range::Fixed(0.0));

    pub fn per_axis(x: impl Into<Range>, y: impl Into<Range>, z: impl Into<Range>) -> Self {
        Self::PerAxis([x.into(), y.into(), z.into()])
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Self::Uniform(r) => r.is_finite(),
            Self::PerAxis(axes) => axes.iter().all(Range::is_finite),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        sample_vector(rng, self)
    }
}

impl Default for VectorRange {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Range> for VectorRange {
    fn from(range: Range) -> Self {
        Self::Uniform(range)
    }
}

/// 解析标量范围
///
/// 固定值原样返回（忽略 `integer`）。区间按 `lo + (hi - lo) * u` 均匀采样，
/// `u ∈ [0, 1)`；`lo > hi` 时同一公式得到镜像区间内的值。
/// `integer` 为真时四舍五入（半数远离零，即 [`f32::round`]）。
pub fn sample_range<R: Rng + ?Sized>(rng: &mut R, range: &Range, integer: bool) -> f32 {
    match *range {
        Range::Fixed(value) => value,
        Range::Interval([lo, hi]) => {
            let value = lo + (hi - lo) * rng.gen::<f32>();
            if integer {
                value.round()
            } else {
                value
            }
        }
    }
}

/// 解析向量范围
pub fn sample_vector<R: Rng + ?Sized>(rng: &mut R, range: &VectorRange) -> Vec3 {
    match range {
        VectorRange::Uniform(r) => Vec3::splat(sample_range(rng, r, false)),
        VectorRange::PerAxis([x, y, z]) => Vec3::new(
            sample_range(rng, x, false),
            sample_range(rng, y, false),
            sample_range(rng, z, false),
        ),
    }
}

/// 单位球面上的均匀随机点
///
/// 方位角 θ ∈ [0, 2π)，z ∈ [-1, 1]，半径 √(1 − z²)。
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let theta = rng.gen::<f32>() * TAU;
    let z = rng.gen::<f32>() * 2.0 - 1.0;
    let radius = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(radius * theta.cos(), radius * theta.sin(), z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_fixed_ignores_integer_flag() {
        let mut rng = rng();
        assert_eq!(sample_range(&mut rng, &Range::fixed(2.75), true), 2.75);
        assert_eq!(sample_range(&mut rng, &Range::fixed(-0.5), false), -0.5);
    }

    #[test]
    fn test_degenerate_interval() {
        let mut rng = rng();
        for _ in 0..100 {
            assert_eq!(sample_range(&mut rng, &Range::interval(4.0, 4.0), false), 4.0);
        }
    }

    #[test]
    fn test_reversed_interval_mirrors() {
        let mut rng = rng();
        for _ in 0..1000 {
            let v = sample_range(&mut rng, &Range::interval(10.0, 5.0), false);
            assert!((5.0..=10.0).contains(&v), "value {} outside mirrored interval", v);
        }
    }

    #[test]
    fn test_integer_rounding() {
        let mut rng = rng();
        for _ in 0..1000 {
            let v = sample_range(&mut rng, &Range::interval(1.0, 3.0), true);
            assert_eq!(v, v.round());
            assert!((1.0..=3.0).contains(&v));
        }
    }

    #[test]
    fn test_interval_mean() {
        let mut rng = rng();
        let n = 20_000;
        let sum: f32 = (0..n)
            .map(|_| sample_range(&mut rng, &Range::interval(2.0, 6.0), false))
            .sum();
        let mean = sum / n as f32;
        assert!((mean - 4.0).abs() < 0.05, "mean was {}", mean);
    }

    #[test]
    fn test_uniform_vector_broadcasts_one_draw() {
        let mut rng = rng();
        for _ in 0..100 {
            let v = sample_vector(&mut rng, &VectorRange::Uniform(Range::interval(-5.0, 5.0)));
            assert_eq!(v.x, v.y);
            assert_eq!(v.y, v.z);
        }
    }

    #[test]
    fn test_per_axis_vector() {
        let mut rng = rng();
        let range = VectorRange::per_axis(0.0, [1.0, 2.0], 100.0);
        let v = sample_vector(&mut rng, &range);
        assert_eq!(v.x, 0.0);
        assert!((1.0..=2.0).contains(&v.y));
        assert_eq!(v.z, 100.0);
    }

    #[test]
    fn test_unit_vector_length() {
        let mut rng = rng();
        for _ in 0..500 {
            let v = random_unit_vector(&mut rng);
            assert!((v.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_deserialize_forms() {
        let fixed: Range = serde_json::from_str("3").unwrap();
        assert_eq!(fixed, Range::Fixed(3.0));
        let interval: Range = serde_json::from_str("[1, 2.5]").unwrap();
        assert_eq!(interval, Range::Interval([1.0, 2.5]));

        let uniform: VectorRange = serde_json::from_str("[0, 4]").unwrap();
        assert_eq!(uniform, VectorRange::Uniform(Range::Interval([0.0, 4.0])));
        let per_axis: VectorRange = serde_json::from_str("[0, [1, 2], 100]").unwrap();
        assert_eq!(per_axis, VectorRange::per_axis(0.0, [1.0, 2.0], 100.0));
    }

    fn bounds() -> impl Strategy<Value = (f32, f32)> {
        (-1000.0f32..1000.0, -1000.0f32..1000.0)
            .prop_map(|(a, b)| if a <= b { (a, b) } else { (b, a) })
    }

    proptest! {
        #[test]
        fn fixed_range_is_identity(v in -1.0e6f32..1.0e6, integer in any::<bool>(), seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            prop_assert_eq!(sample_range(&mut rng, &Range::Fixed(v), integer), v);
        }

        #[test]
        fn interval_sample_stays_inside((lo, hi) in bounds(), seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..32 {
                let v = sample_range(&mut rng, &Range::interval(lo, hi), false);
                prop_assert!(v >= lo - 1e-3 && v <= hi + 1e-3);
            }
        }

        #[test]
        fn uniform_vector_components_equal((lo, hi) in bounds(), seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let v = sample_vector(&mut rng, &VectorRange::Uniform(Range::interval(lo, hi)));
            prop_assert_eq!(v.x, v.y);
            prop_assert_eq!(v.y, v.z);
        }
    }
}
