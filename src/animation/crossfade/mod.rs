//! 交叉淡入淡出控制器
//!
//! 所有控制器都持有一份静止姿态副本、当前剪辑句柄、播放时间与当前姿态，
//! 区别仅在于待淡入目标的组织方式：
//!
//! - [`CrossFadeController`]：单一目标，再次淡入时打断当前淡入
//! - [`CrossFadeQueue`]：队列，只推进队首目标
//! - [`CrossFadeArray`]：数组，所有目标同时推进，按索引顺序完成
//! - [`IkCrossFadeController`]：队列 + 脚钉权重与锁定
//!
//! 完成的目标在同一次 `update` 结束时提升为当前剪辑。

mod array;
mod controller;
mod ik;
mod queue;

pub use array::CrossFadeArray;
pub use controller::CrossFadeController;
pub use ik::IkCrossFadeController;
pub use queue::CrossFadeQueue;

use super::blending::blend_in_place;
use super::clip::Playable;
use super::library::{ClipId, ClipLibrary};
use super::pose::Pose;

/// 控制器的公共播放接口
pub trait CrossFade {
    /// 立即切换到 `clip`，清空所有待淡入目标
    fn play<C: Playable>(&mut self, library: &ClipLibrary<C>, clip: ClipId);

    /// 在 `fade_duration` 秒内淡入 `clip`；没有当前剪辑时等同于 [`play`](Self::play)
    fn fade_to<C: Playable>(&mut self, library: &ClipLibrary<C>, clip: ClipId, fade_duration: f32);

    /// 推进 `dt` 秒
    fn update<C: Playable>(&mut self, library: &ClipLibrary<C>, dt: f32);

    /// 放弃所有待淡入目标
    fn clear_targets(&mut self);

    fn current_pose(&self) -> &Pose;

    fn current_clip(&self) -> Option<ClipId>;

    fn playback_time(&self) -> f32;

    /// 待淡入目标数量
    fn pending_targets(&self) -> usize;
}

/// 正在淡入的目标
#[derive(Debug, Clone, PartialEq)]
pub struct CrossFadeTarget {
    pub clip: ClipId,
    pub pose: Pose,
    pub playback_time: f32,
    pub fade_duration: f32,
    pub fade_time: f32,
    /// 提升为当前剪辑时锁定控制器（仅 IK 控制器使用）
    pub lock: bool,
}

impl CrossFadeTarget {
    /// 当前混合权重，截断到 `[0, 1]`
    pub fn weight(&self) -> f32 {
        if self.fade_duration <= 0.0 {
            1.0
        } else {
            (self.fade_time / self.fade_duration).clamp(0.0, 1.0)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.fade_time >= self.fade_duration
    }
}

/// 控制器共享的播放状态
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Playback {
    rest: Pose,
    clip: Option<ClipId>,
    time: f32,
    pose: Pose,
    /// 被打断的淡入目标，权重冻结在打断时刻，按顺序叠加在当前剪辑之上
    folded: Vec<CrossFadeTarget>,
}

impl Playback {
    pub(crate) fn new(rest: Pose) -> Self {
        Self {
            pose: rest.clone(),
            rest,
            clip: None,
            time: 0.0,
            folded: Vec::new(),
        }
    }

    pub(crate) fn rest(&self) -> &Pose {
        &self.rest
    }

    /// 可见权重最大的剪辑：当前剪辑或某个被打断的目标
    pub(crate) fn clip(&self) -> Option<ClipId> {
        match self.dominant_fold() {
            Some(target) => Some(target.clip),
            None => self.clip,
        }
    }

    pub(crate) fn time(&self) -> f32 {
        match self.dominant_fold() {
            Some(target) => target.playback_time,
            None => self.time,
        }
    }

    /// 有效权重不低于当前剪辑的被打断目标
    fn dominant_fold(&self) -> Option<&CrossFadeTarget> {
        // 后叠加的层按 (1 - w) 衰减之前的所有层
        let mut remaining = 1.0;
        let mut best: Option<(&CrossFadeTarget, f32)> = None;
        for target in self.folded.iter().rev() {
            let effective = target.weight() * remaining;
            if best.map_or(true, |(_, weight)| effective > weight) {
                best = Some((target, effective));
            }
            remaining *= 1.0 - target.weight();
        }
        best.filter(|&(_, weight)| weight >= remaining)
            .map(|(target, _)| target)
    }

    pub(crate) fn pose(&self) -> &Pose {
        &self.pose
    }

    /// 硬切换；句柄无效时保持原状态并返回 `false`
    pub(crate) fn play<C: Playable>(&mut self, library: &ClipLibrary<C>, clip: ClipId) -> bool {
        let Some(playable) = library.get(clip) else {
            tracing::warn!(target: "animation", clip = clip.index(), "Cannot play unknown clip");
            return false;
        };
        tracing::debug!(target: "animation", clip = playable.name(), "Play");
        self.clip = Some(clip);
        self.time = playable.start_time();
        self.pose.clone_from(&self.rest);
        self.folded.clear();
        true
    }

    /// 新建目标：从剪辑起点开始，姿态为静止姿态
    pub(crate) fn make_target<C: Playable>(
        &self,
        library: &ClipLibrary<C>,
        clip: ClipId,
        fade_duration: f32,
        lock: bool,
    ) -> Option<CrossFadeTarget> {
        let Some(playable) = library.get(clip) else {
            tracing::warn!(target: "animation", clip = clip.index(), "Cannot fade to unknown clip");
            return None;
        };
        tracing::debug!(
            target: "animation",
            clip = playable.name(),
            fade_duration,
            lock,
            "Fade queued"
        );
        Some(CrossFadeTarget {
            clip,
            pose: self.rest.clone(),
            playback_time: playable.start_time(),
            fade_duration,
            fade_time: 0.0,
            lock,
        })
    }

    /// 姿态重置为静止姿态，采样当前剪辑并叠加被打断的目标
    pub(crate) fn sample_current<C: Playable>(&mut self, library: &ClipLibrary<C>, dt: f32) {
        self.pose.clone_from(&self.rest);
        if let Some(playable) = self.clip.and_then(|clip| library.get(clip)) {
            self.time = playable.sample(&mut self.pose, self.time + dt);
        }
        for target in &mut self.folded {
            sample_target(library, &self.rest, target, dt);
            blend_in_place(&mut self.pose, &target.pose, target.weight(), None);
        }
    }

    /// 推进目标的播放与淡入时间并混合进当前姿态
    pub(crate) fn advance_and_blend<C: Playable>(
        &mut self,
        library: &ClipLibrary<C>,
        target: &mut CrossFadeTarget,
        dt: f32,
    ) {
        sample_target(library, &self.rest, target, dt);
        target.fade_time += dt;
        blend_in_place(&mut self.pose, &target.pose, target.weight(), None);
    }

    /// 目标成为当前剪辑
    pub(crate) fn promote(&mut self, target: CrossFadeTarget) {
        tracing::debug!(target: "animation", clip = target.clip.index(), "Fade complete");
        self.clip = Some(target.clip);
        self.time = target.playback_time;
        self.pose = target.pose;
        self.folded.clear();
    }

    /// 冻结被打断目标的淡入进度，之后以固定权重继续叠加
    pub(crate) fn fold(&mut self, target: CrossFadeTarget) {
        tracing::debug!(
            target: "animation",
            clip = target.clip.index(),
            weight = target.weight(),
            "Fade interrupted, progress folded"
        );
        self.folded.push(target);
    }

    pub(crate) fn folded_targets(&self) -> usize {
        self.folded.len()
    }
}

/// 从静止姿态开始采样目标剪辑并推进其播放时间
fn sample_target<C: Playable>(
    library: &ClipLibrary<C>,
    rest: &Pose,
    target: &mut CrossFadeTarget,
    dt: f32,
) {
    target.pose.clone_from(rest);
    if let Some(playable) = library.get(target.clip) {
        target.playback_time = playable.sample(&mut target.pose, target.playback_time + dt);
    }
}

/// 剪辑的归一化播放进度 `[0, 1]`
pub(crate) fn normalized_time<C: Playable>(clip: &C, time: f32) -> f32 {
    let duration = clip.duration();
    if duration <= 0.0 {
        0.0
    } else {
        ((time - clip.start_time()) / duration).clamp(0.0, 1.0)
    }
}
