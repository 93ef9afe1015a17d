//! 预计算轨道
//!
//! 按固定采样率预先建立 "时间 -> 区间" 查找表，并为三次插值缓存每个区间的多项式系数，
//! 采样时不再做二分查找。结果与 [`KeyframeTrack`] 一致（三次插值在浮点误差内一致）。

use glam::{Quat, Vec3};

use super::keyframe::{
    adjust_time, sample_segment, Curve, InterpolationMode, Keyframe, KeyframeTrack, TrackValue,
};

/// 默认查找表采样率 (Hz)
pub const DEFAULT_SAMPLE_RATE: f32 = 60.0;

/// 预计算关键帧轨道
#[derive(Debug, Clone, PartialEq)]
pub struct FastTrack<T> {
    keyframes: Vec<Keyframe<T>>,
    interpolation: InterpolationMode,
    sample_rate: f32,
    /// 第 i 项为均匀时间点 i 所在区间的起始帧
    lookup: Vec<usize>,
    /// 三次插值系数 `[a, b, c, d]`，`p(t) = ((a t + b) t + c) t + d`
    coefficients: Vec<[T; 4]>,
}

pub type FastScalarTrack = FastTrack<f32>;
pub type FastVectorTrack = FastTrack<Vec3>;
pub type FastQuaternionTrack = FastTrack<Quat>;

impl<T: TrackValue> Default for FastTrack<T> {
    fn default() -> Self {
        Self::from_track(&KeyframeTrack::default(), DEFAULT_SAMPLE_RATE)
    }
}

impl<T: TrackValue> FastTrack<T> {
    /// 由朴素轨道构建；`sample_rate` 非正时使用默认值
    pub fn from_track(track: &KeyframeTrack<T>, sample_rate: f32) -> Self {
        let sample_rate = if sample_rate > 0.0 {
            sample_rate
        } else {
            DEFAULT_SAMPLE_RATE
        };
        let mut fast = Self {
            keyframes: track.keyframes.clone(),
            interpolation: track.interpolation,
            sample_rate,
            lookup: Vec::new(),
            coefficients: Vec::new(),
        };
        fast.rebuild();
        fast
    }

    /// 还原为可编辑的朴素轨道
    pub fn to_track(&self) -> KeyframeTrack<T> {
        KeyframeTrack::with_keyframes(self.interpolation, self.keyframes.clone())
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn lookup_len(&self) -> usize {
        self.lookup.len()
    }

    fn rebuild(&mut self) {
        self.lookup.clear();
        self.coefficients.clear();

        let count = self.keyframes.len();
        if count < 2 {
            return;
        }

        let start = self.start_time();
        let duration = self.end_time() - start;
        if duration <= 0.0 {
            return;
        }

        let samples = ((duration * self.sample_rate).ceil() as usize).max(1) + 1;
        let mut segment = 0;
        for i in 0..samples {
            let time = start + duration * (i as f32 / (samples - 1) as f32);
            while segment < count - 2 && self.keyframes[segment + 1].time <= time {
                segment += 1;
            }
            self.lookup.push(segment);
        }

        if self.interpolation == InterpolationMode::Cubic {
            self.coefficients = self
                .keyframes
                .windows(2)
                .map(|pair| cubic_coefficients(&pair[0], &pair[1]))
                .collect();
        }
    }

    /// 查找表给出初始区间，再向相邻区间修正
    fn segment_for(&self, time: f32) -> usize {
        let last_segment = self.keyframes.len() - 2;
        let start = self.start_time();
        let duration = self.end_time() - start;
        let slots = self.lookup.len() - 1;

        let slot = (((time - start) / duration) * slots as f32) as usize;
        let mut segment = self.lookup[slot.min(slots)];

        while segment < last_segment && self.keyframes[segment + 1].time <= time {
            segment += 1;
        }
        while segment > 0 && self.keyframes[segment].time > time {
            segment -= 1;
        }
        segment
    }
}

impl<T: TrackValue> Curve for FastTrack<T> {
    type Value = T;

    fn sample(&self, time: f32, looping: bool) -> T {
        if self.keyframes.len() < 2 || self.lookup.is_empty() {
            return self.keyframes.first().map_or_else(T::default, |k| k.value);
        }
        let Some(time) = adjust_time(self.start_time(), self.end_time(), time, looping) else {
            return T::default();
        };
        let segment = self.segment_for(time);

        if self.interpolation != InterpolationMode::Cubic {
            return sample_segment(&self.keyframes, segment, time, self.interpolation);
        }

        let k0 = &self.keyframes[segment];
        let delta = self.keyframes[segment + 1].time - k0.time;
        if delta <= 0.0 {
            return k0.value;
        }
        let t = (time - k0.time) / delta;
        let [a, b, c, d] = self.coefficients[segment];
        T::finalize(((a * t + b) * t + c) * t + d)
    }

    fn keyframes(&self) -> &[Keyframe<T>] {
        &self.keyframes
    }

    fn interpolation(&self) -> InterpolationMode {
        self.interpolation
    }
}

/// Hermite 基函数展开为幂基
fn cubic_coefficients<T: TrackValue>(k0: &Keyframe<T>, k1: &Keyframe<T>) -> [T; 4] {
    let delta = k1.time - k0.time;
    let p1 = k0.value;
    let p2 = T::align(p1, k1.value);
    let s1 = k0.out_tangent * delta;
    let s2 = k1.in_tangent * delta;

    let a = p1 * 2.0 - p2 * 2.0 + s1 + s2;
    let b = p2 * 3.0 - p1 * 3.0 - s1 * 2.0 - s2;
    [a, b, s1, p1]
}
