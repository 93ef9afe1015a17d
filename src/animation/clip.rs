use glam::{Quat, Vec3};

use super::fast_track::{FastQuaternionTrack, FastVectorTrack};
use super::keyframe::{adjust_time, Curve, QuaternionTrack, VectorTrack};
use super::pose::Pose;
use super::transform_track::TransformTrack;

/// 可播放的动画剪辑
///
/// 交叉淡入淡出控制器只依赖该接口，因此朴素剪辑与预计算剪辑可以互换。
pub trait Playable {
    fn name(&self) -> &str;

    fn start_time(&self) -> f32;

    fn end_time(&self) -> f32;

    fn is_looping(&self) -> bool;

    /// 把 `time` 采样进 `pose`，返回调整后的时间
    ///
    /// 时长不为正时返回 0 且不修改姿态。
    fn sample(&self, pose: &mut Pose, time: f32) -> f32;

    fn duration(&self) -> f32 {
        self.end_time() - self.start_time()
    }
}

/// 动画剪辑 - 一组关节变换轨道
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip<V = VectorTrack, Q = QuaternionTrack> {
    /// 动画名称
    pub name: String,
    /// 是否循环
    pub looping: bool,
    tracks: Vec<TransformTrack<V, Q>>,
    start_time: f32,
    end_time: f32,
}

/// 朴素剪辑
pub type Clip = AnimationClip<VectorTrack, QuaternionTrack>;
/// 预计算剪辑
pub type FastClip = AnimationClip<FastVectorTrack, FastQuaternionTrack>;

impl<V, Q> AnimationClip<V, Q>
where
    V: Curve<Value = Vec3> + Default,
    Q: Curve<Value = Quat> + Default,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            looping: true,
            tracks: Vec::new(),
            start_time: 0.0,
            end_time: 0.0,
        }
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn tracks(&self) -> &[TransformTrack<V, Q>] {
        &self.tracks
    }

    pub fn track(&self, joint: usize) -> Option<&TransformTrack<V, Q>> {
        self.tracks.iter().find(|track| track.joint == joint)
    }

    /// 获取关节的轨道，不存在时创建
    ///
    /// 修改轨道后需要调用 [`recalculate_duration`](Self::recalculate_duration)。
    pub fn track_mut(&mut self, joint: usize) -> &mut TransformTrack<V, Q> {
        let index = match self.tracks.iter().position(|track| track.joint == joint) {
            Some(index) => index,
            None => {
                self.tracks.push(TransformTrack::new(joint));
                self.tracks.len() - 1
            }
        };
        &mut self.tracks[index]
    }

    /// 添加（或替换同关节的）轨道并重新计算时长
    pub fn set_track(&mut self, track: TransformTrack<V, Q>) {
        match self.tracks.iter_mut().find(|t| t.joint == track.joint) {
            Some(existing) => *existing = track,
            None => self.tracks.push(track),
        }
        self.recalculate_duration();
    }

    /// 按有效轨道重新计算起止时间
    pub fn recalculate_duration(&mut self) {
        let mut range: Option<(f32, f32)> = None;
        for track in self.tracks.iter().filter(|track| track.is_valid()) {
            let (start, end) = (track.start_time(), track.end_time());
            range = Some(match range {
                Some((s, e)) => (s.min(start), e.max(end)),
                None => (start, end),
            });
        }
        let (start, end) = range.unwrap_or((0.0, 0.0));
        self.start_time = start;
        self.end_time = end;
    }

    /// 按剪辑时间范围循环或截断
    pub fn adjust_time(&self, time: f32) -> Option<f32> {
        adjust_time(self.start_time, self.end_time, time, self.looping)
    }

    pub(crate) fn from_parts(
        name: String,
        looping: bool,
        tracks: Vec<TransformTrack<V, Q>>,
    ) -> Self {
        let mut clip = Self {
            name,
            looping,
            tracks,
            start_time: 0.0,
            end_time: 0.0,
        };
        clip.recalculate_duration();
        clip
    }
}

impl<V, Q> Playable for AnimationClip<V, Q>
where
    V: Curve<Value = Vec3> + Default,
    Q: Curve<Value = Quat> + Default,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn start_time(&self) -> f32 {
        self.start_time
    }

    fn end_time(&self) -> f32 {
        self.end_time
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn sample(&self, pose: &mut Pose, time: f32) -> f32 {
        let Some(time) = self.adjust_time(time) else {
            return 0.0;
        };
        for track in &self.tracks {
            let joint = track.joint;
            debug_assert!(joint < pose.len(), "track joint {joint} outside pose");
            if joint >= pose.len() {
                continue;
            }
            let local = track.sample(&pose.local_transform(joint), time, self.looping);
            pose.set_local_transform(joint, local);
        }
        time
    }
}

/// 把朴素剪辑转换为预计算剪辑
pub fn optimize_clip(clip: &Clip, sample_rate: f32) -> FastClip {
    let tracks = clip
        .tracks()
        .iter()
        .map(|track| track.optimize(sample_rate))
        .collect();
    FastClip::from_parts(clip.name.clone(), clip.looping, tracks)
}
