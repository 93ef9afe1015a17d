use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

use glam::{Quat, Vec3};

use super::transform::nlerp;

/// 插值模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    /// 保持前一帧的值
    Constant,
    /// 线性插值（旋转为 nlerp）
    #[default]
    Linear,
    /// 三次 Hermite 插值，使用关键帧上存储的切线
    Cubic,
}

/// 可以放入关键帧轨道的值类型（标量、向量、四元数）
pub trait TrackValue:
    Copy + Debug + Default + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self>
{
    /// 切线的零值
    const ZERO: Self;

    /// 两帧之间的插值
    fn interpolate(a: Self, b: Self, t: f32) -> Self;

    /// 相对 `reference` 调整 `value` 的表示（四元数取同一半球）
    fn align(_reference: Self, value: Self) -> Self {
        value
    }

    /// 对插值结果做最终修正（四元数归一化）
    fn finalize(value: Self) -> Self {
        value
    }
}

impl TrackValue for f32 {
    const ZERO: Self = 0.0;

    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a + (b - a) * t
    }
}

impl TrackValue for Vec3 {
    const ZERO: Self = Vec3::ZERO;

    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }
}

impl TrackValue for Quat {
    const ZERO: Self = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);

    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        nlerp(a, b, t)
    }

    fn align(reference: Self, value: Self) -> Self {
        if reference.dot(value) < 0.0 {
            -value
        } else {
            value
        }
    }

    fn finalize(value: Self) -> Self {
        value.normalize()
    }
}

/// 关键帧
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    /// 时间 (秒)
    pub time: f32,
    /// 值
    pub value: T,
    /// 入切线（仅三次插值使用）
    pub in_tangent: T,
    /// 出切线（仅三次插值使用）
    pub out_tangent: T,
}

impl<T: TrackValue> Keyframe<T> {
    pub fn new(time: f32, value: T) -> Self {
        Self {
            time,
            value,
            in_tangent: T::ZERO,
            out_tangent: T::ZERO,
        }
    }

    pub fn with_tangents(time: f32, value: T, in_tangent: T, out_tangent: T) -> Self {
        Self {
            time,
            value,
            in_tangent,
            out_tangent,
        }
    }
}

/// 曲线采样接口
///
/// 朴素的 [`KeyframeTrack`] 每次采样都查找所在区间；
/// [`FastTrack`](super::fast_track::FastTrack) 使用预计算的查找表与系数。
pub trait Curve {
    type Value: TrackValue;

    /// 在 `time` 处采样；无效轨道返回 `Default`
    fn sample(&self, time: f32, looping: bool) -> Self::Value;

    fn keyframes(&self) -> &[Keyframe<Self::Value>];

    fn interpolation(&self) -> InterpolationMode;

    fn len(&self) -> usize {
        self.keyframes().len()
    }

    fn is_empty(&self) -> bool {
        self.keyframes().is_empty()
    }

    /// 至少两帧才视为有动画
    fn is_animated(&self) -> bool {
        self.len() > 1
    }

    fn start_time(&self) -> f32 {
        self.keyframes().first().map_or(0.0, |k| k.time)
    }

    fn end_time(&self) -> f32 {
        self.keyframes().last().map_or(0.0, |k| k.time)
    }
}

/// 关键帧轨道
///
/// 关键帧时间须单调递增。
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack<T> {
    /// 关键帧列表
    pub keyframes: Vec<Keyframe<T>>,
    /// 插值模式
    pub interpolation: InterpolationMode,
}

pub type ScalarTrack = KeyframeTrack<f32>;
pub type VectorTrack = KeyframeTrack<Vec3>;
pub type QuaternionTrack = KeyframeTrack<Quat>;

impl<T: TrackValue> Default for KeyframeTrack<T> {
    fn default() -> Self {
        Self::new(InterpolationMode::Linear)
    }
}

impl<T: TrackValue> KeyframeTrack<T> {
    pub fn new(interpolation: InterpolationMode) -> Self {
        Self {
            keyframes: Vec::new(),
            interpolation,
        }
    }

    pub fn with_keyframes(interpolation: InterpolationMode, keyframes: Vec<Keyframe<T>>) -> Self {
        debug_assert!(
            keyframes.windows(2).all(|w| w[0].time <= w[1].time),
            "keyframe times must be increasing"
        );
        Self {
            keyframes,
            interpolation,
        }
    }

    /// 以固定间隔 `step` 从 `start` 开始生成关键帧
    pub fn from_values(
        interpolation: InterpolationMode,
        start: f32,
        step: f32,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        let keyframes = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| Keyframe::new(start + step * i as f32, value))
            .collect();
        Self::with_keyframes(interpolation, keyframes)
    }

    /// 添加关键帧（按时间排序插入，切线为零）
    pub fn add_keyframe(&mut self, time: f32, value: T) {
        self.insert(Keyframe::new(time, value));
    }

    /// 按时间排序插入关键帧
    pub fn insert(&mut self, keyframe: Keyframe<T>) {
        let index = self.keyframes.partition_point(|k| k.time <= keyframe.time);
        self.keyframes.insert(index, keyframe);
    }

    /// 查找 `time` 所在区间的起始帧索引（结果不超过倒数第二帧）
    pub fn frame_index(&self, time: f32, looping: bool) -> Option<usize> {
        let time = adjust_time(self.start_time(), self.end_time(), time, looping)?;
        Some(segment_index(&self.keyframes, time))
    }
}

impl<T: TrackValue> Curve for KeyframeTrack<T> {
    type Value = T;

    fn sample(&self, time: f32, looping: bool) -> T {
        if self.keyframes.len() < 2 {
            return self.keyframes.first().map_or_else(T::default, |k| k.value);
        }
        let Some(time) = adjust_time(self.start_time(), self.end_time(), time, looping) else {
            return T::default();
        };
        let index = segment_index(&self.keyframes, time);
        sample_segment(&self.keyframes, index, time, self.interpolation)
    }

    fn keyframes(&self) -> &[Keyframe<T>] {
        &self.keyframes
    }

    fn interpolation(&self) -> InterpolationMode {
        self.interpolation
    }
}

/// 把时间映射到 `[start, end]`：循环时按欧几里得取模，否则截断
///
/// 区间长度不为正时返回 `None`。
pub(crate) fn adjust_time(start: f32, end: f32, time: f32, looping: bool) -> Option<f32> {
    let duration = end - start;
    if !(duration > 0.0) {
        return None;
    }
    if looping {
        Some((time - start).rem_euclid(duration) + start)
    } else {
        Some(time.clamp(start, end))
    }
}

/// 最后一个 `time <= t` 的关键帧索引，限制在 `[0, len - 2]`
pub(crate) fn segment_index<T>(keyframes: &[Keyframe<T>], time: f32) -> usize {
    let count = keyframes.partition_point(|k| k.time <= time);
    count.saturating_sub(1).min(keyframes.len() - 2)
}

/// 在 `index` 与 `index + 1` 两帧之间求值
pub(crate) fn sample_segment<T: TrackValue>(
    keyframes: &[Keyframe<T>],
    index: usize,
    time: f32,
    interpolation: InterpolationMode,
) -> T {
    let k0 = &keyframes[index];
    let k1 = &keyframes[index + 1];
    let delta = k1.time - k0.time;

    match interpolation {
        InterpolationMode::Constant => {
            if time >= k1.time {
                k1.value
            } else {
                k0.value
            }
        }
        _ if delta <= 0.0 => k0.value,
        InterpolationMode::Linear => {
            let t = (time - k0.time) / delta;
            T::interpolate(k0.value, k1.value, t)
        }
        InterpolationMode::Cubic => {
            let t = (time - k0.time) / delta;
            hermite(
                t,
                k0.value,
                k0.out_tangent * delta,
                k1.value,
                k1.in_tangent * delta,
            )
        }
    }
}

/// 三次 Hermite 样条
pub(crate) fn hermite<T: TrackValue>(t: f32, p1: T, s1: T, p2: T, s2: T) -> T {
    let p2 = T::align(p1, p2);
    let tt = t * t;
    let ttt = tt * t;

    let h1 = 2.0 * ttt - 3.0 * tt + 1.0;
    let h2 = -2.0 * ttt + 3.0 * tt;
    let h3 = ttt - 2.0 * tt + t;
    let h4 = ttt - tt;

    T::finalize(p1 * h1 + p2 * h2 + s1 * h3 + s2 * h4)
}
