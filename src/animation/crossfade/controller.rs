use bevy_ecs::prelude::*;

use super::{CrossFade, CrossFadeTarget, Playback};
use crate::animation::clip::Playable;
use crate::animation::library::{ClipId, ClipLibrary};
use crate::animation::pose::Pose;

/// 单目标交叉淡入淡出控制器
///
/// 淡入过程中再次 `fade_to` 会打断当前淡入：被打断的目标以当时的权重冻结，
/// 继续叠加在当前剪辑之上播放，新目标从这一混合结果开始淡入，姿态不会跳变。
/// 新目标完成后冻结的目标一并移除。打断期间 `current_clip` 报告可见权重最大的剪辑。
#[derive(Component, Debug, Clone)]
pub struct CrossFadeController {
    playback: Playback,
    target: Option<CrossFadeTarget>,
}

impl CrossFadeController {
    pub fn new(rest_pose: Pose) -> Self {
        Self {
            playback: Playback::new(rest_pose),
            target: None,
        }
    }

    pub fn target(&self) -> Option<&CrossFadeTarget> {
        self.target.as_ref()
    }

    pub fn rest_pose(&self) -> &Pose {
        self.playback.rest()
    }

    /// 被打断后仍以冻结权重叠加的目标数量
    pub fn interrupted_targets(&self) -> usize {
        self.playback.folded_targets()
    }
}

impl CrossFade for CrossFadeController {
    fn play<C: Playable>(&mut self, library: &ClipLibrary<C>, clip: ClipId) {
        if self.playback.play(library, clip) {
            self.target = None;
        }
    }

    fn fade_to<C: Playable>(&mut self, library: &ClipLibrary<C>, clip: ClipId, fade_duration: f32) {
        if self.playback.clip().is_none() {
            self.play(library, clip);
            return;
        }

        let latest = self
            .target
            .as_ref()
            .map(|target| target.clip)
            .or(self.playback.clip());
        if latest == Some(clip) {
            return;
        }

        let Some(next) = self.playback.make_target(library, clip, fade_duration, false) else {
            return;
        };
        if let Some(interrupted) = self.target.take() {
            self.playback.fold(interrupted);
        }
        self.target = Some(next);
    }

    fn update<C: Playable>(&mut self, library: &ClipLibrary<C>, dt: f32) {
        if self.playback.clip().is_none() {
            return;
        }
        self.playback.sample_current(library, dt);

        if let Some(target) = self.target.as_mut() {
            self.playback.advance_and_blend(library, target, dt);
        }
        if self.target.as_ref().is_some_and(CrossFadeTarget::is_complete) {
            if let Some(target) = self.target.take() {
                self.playback.promote(target);
            }
        }
    }

    fn clear_targets(&mut self) {
        self.target = None;
    }

    fn current_pose(&self) -> &Pose {
        self.playback.pose()
    }

    fn current_clip(&self) -> Option<ClipId> {
        self.playback.clip()
    }

    fn playback_time(&self) -> f32 {
        self.playback.time()
    }

    fn pending_targets(&self) -> usize {
        usize::from(self.target.is_some())
    }
}
