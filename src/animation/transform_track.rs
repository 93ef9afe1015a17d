//! 单个关节的变换轨道（位置 / 旋转 / 缩放）

use glam::{Quat, Vec3};

use super::fast_track::{FastQuaternionTrack, FastTrack, FastVectorTrack};
use super::keyframe::{Curve, QuaternionTrack, VectorTrack};
use super::transform::Transform;

/// 关节变换轨道
///
/// 三个通道各自独立采样，少于两帧的通道保留参考变换中的值。
#[derive(Debug, Clone, PartialEq)]
pub struct TransformTrack<V = VectorTrack, Q = QuaternionTrack> {
    /// 目标关节索引
    pub joint: usize,
    pub position: V,
    pub rotation: Q,
    pub scale: V,
}

pub type FastTransformTrack = TransformTrack<FastVectorTrack, FastQuaternionTrack>;

impl<V: Default, Q: Default> TransformTrack<V, Q> {
    pub fn new(joint: usize) -> Self {
        Self {
            joint,
            position: V::default(),
            rotation: Q::default(),
            scale: V::default(),
        }
    }
}

impl<V, Q> TransformTrack<V, Q>
where
    V: Curve<Value = Vec3>,
    Q: Curve<Value = Quat>,
{
    /// 至少一个通道有动画
    pub fn is_valid(&self) -> bool {
        self.position.is_animated() || self.rotation.is_animated() || self.scale.is_animated()
    }

    /// 有动画通道中最早的起始时间；无动画时为 0
    pub fn start_time(&self) -> f32 {
        self.animated_times()
            .map(|(start, _)| start)
            .reduce(f32::min)
            .unwrap_or(0.0)
    }

    /// 有动画通道中最晚的结束时间；无动画时为 0
    pub fn end_time(&self) -> f32 {
        self.animated_times()
            .map(|(_, end)| end)
            .reduce(f32::max)
            .unwrap_or(0.0)
    }

    fn animated_times(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        let position = self
            .position
            .is_animated()
            .then(|| (self.position.start_time(), self.position.end_time()));
        let rotation = self
            .rotation
            .is_animated()
            .then(|| (self.rotation.start_time(), self.rotation.end_time()));
        let scale = self
            .scale
            .is_animated()
            .then(|| (self.scale.start_time(), self.scale.end_time()));
        position.into_iter().chain(rotation).chain(scale)
    }

    /// 以 `reference` 为基础采样
    pub fn sample(&self, reference: &Transform, time: f32, looping: bool) -> Transform {
        let mut result = *reference;
        if self.position.is_animated() {
            result.position = self.position.sample(time, looping);
        }
        if self.rotation.is_animated() {
            result.rotation = self.rotation.sample(time, looping);
        }
        if self.scale.is_animated() {
            result.scale = self.scale.sample(time, looping);
        }
        result
    }
}

impl TransformTrack {
    /// 构建预计算版本
    pub fn optimize(&self, sample_rate: f32) -> FastTransformTrack {
        TransformTrack {
            joint: self.joint,
            position: FastTrack::from_track(&self.position, sample_rate),
            rotation: FastTrack::from_track(&self.rotation, sample_rate),
            scale: FastTrack::from_track(&self.scale, sample_rate),
        }
    }
}
