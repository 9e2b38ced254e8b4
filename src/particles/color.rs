//! 颜色模型
//!
//! 定义中的颜色要么是 0–255 的 RGB，要么是 HSV（色相以圈数表示，
//! 饱和度和明度在 0–1 之间），实例化时统一转换为 RGB。

use rand::Rng;

use super::range::{sample_range, Range};

/// 8 位 RGB 颜色
pub type Rgb = [u8; 3];

/// HSV 转 RGB，色相以圈数表示（`0.5` 为青色，不是 180°）
///
/// 按 `floor(h * 6) mod 6` 分六个扇区计算，色相超出 `[0, 1)` 时取模回绕，
/// 饱和度和明度先夹到 `[0, 1]`。每个通道四舍五入到 0–255。
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb {
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);

    let scaled = h * 6.0;
    let sector = scaled.floor();
    let f = scaled - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    let (r, g, b) = match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    [to_channel(r), to_channel(g), to_channel(b)]
}

/// 将 `[0, 1]` 的分量映射到 0–255
fn to_channel(component: f32) -> u8 {
    (component * 255.0).round().clamp(0.0, 255.0) as u8
}

/// 采样 RGB 通道并夹到 0–255
fn rgb_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// 按定义采样颜色
///
/// `hsv` 为真时三个范围依次解释为 H/S/V，否则为取整后的 R/G/B。
pub fn sample_color<R: Rng + ?Sized>(rng: &mut R, channels: &[Range; 3], hsv: bool) -> Rgb {
    if hsv {
        let h = sample_range(rng, &channels[0], false);
        let s = sample_range(rng, &channels[1], false);
        let v = sample_range(rng, &channels[2], false);
        hsv_to_rgb(h, s, v)
    } else {
        [
            rgb_channel(sample_range(rng, &channels[0], true)),
            rgb_channel(sample_range(rng, &channels[1], true)),
            rgb_channel(sample_range(rng, &channels[2], true)),
        ]
    }
}
