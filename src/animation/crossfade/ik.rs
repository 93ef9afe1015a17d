use std::collections::VecDeque;

use bevy_ecs::prelude::*;

use super::{normalized_time, CrossFade, CrossFadeTarget, Playback};
use crate::animation::clip::Playable;
use crate::animation::library::{ClipId, ClipLibrary};
use crate::animation::pose::Pose;

/// 带脚钉权重的交叉淡入淡出控制器
///
/// 与 [`CrossFadeQueue`](super::CrossFadeQueue) 相同的队列行为，另外：
///
/// - 每帧按剪辑归一化时间采样左右脚钉曲线，并用与姿态相同的权重混合
/// - 以 `lock = true` 创建的目标提升为当前剪辑后锁定控制器。锁定期间 `fade_to` 被忽略，
///   已排队的目标保持冻结（不推进也不提升），直到调用 [`unlock`](Self::unlock)
#[derive(Component, Debug, Clone)]
pub struct IkCrossFadeController {
    playback: Playback,
    targets: VecDeque<CrossFadeTarget>,
    locked: bool,
    left_pin: f32,
    right_pin: f32,
}

impl IkCrossFadeController {
    pub fn new(rest_pose: Pose) -> Self {
        Self {
            playback: Playback::new(rest_pose),
            targets: VecDeque::new(),
            locked: false,
            left_pin: 0.0,
            right_pin: 0.0,
        }
    }

    /// 淡入后锁定控制器
    pub fn fade_to_locked<C: Playable>(
        &mut self,
        library: &ClipLibrary<C>,
        clip: ClipId,
        fade_duration: f32,
    ) {
        self.enqueue(library, clip, fade_duration, true);
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn unlock(&mut self) {
        if self.locked {
            tracing::debug!(target: "animation", "Controller unlocked");
        }
        self.locked = false;
    }

    /// 左脚钉权重（0 = 自由，1 = 着地）
    pub fn left_pin(&self) -> f32 {
        self.left_pin
    }

    /// 右脚钉权重
    pub fn right_pin(&self) -> f32 {
        self.right_pin
    }

    pub fn targets(&self) -> impl Iterator<Item = &CrossFadeTarget> {
        self.targets.iter()
    }

    fn enqueue<C: Playable>(
        &mut self,
        library: &ClipLibrary<C>,
        clip: ClipId,
        fade_duration: f32,
        lock: bool,
    ) {
        if self.locked {
            tracing::debug!(target: "animation", clip = clip.index(), "Fade ignored while locked");
            return;
        }
        if self.playback.clip().is_none() {
            self.play(library, clip);
            return;
        }
        let latest = self
            .targets
            .back()
            .map(|target| target.clip)
            .or(self.playback.clip());
        if latest == Some(clip) {
            return;
        }
        if let Some(target) = self.playback.make_target(library, clip, fade_duration, lock) {
            self.targets.push_back(target);
        }
    }

    fn promote(&mut self, target: CrossFadeTarget) {
        if target.lock {
            tracing::debug!(target: "animation", clip = target.clip.index(), "Controller locked");
            self.locked = true;
        }
        self.playback.promote(target);
    }
}

/// 剪辑在 `time` 处的脚钉权重；没有脚钉曲线时双脚自由
fn sample_pins<C: Playable>(library: &ClipLibrary<C>, clip: ClipId, time: f32) -> (f32, f32) {
    match (library.get(clip), library.foot_pins(clip)) {
        (Some(playable), Some(pins)) => pins.sample_normalized(normalized_time(playable, time)),
        _ => (0.0, 0.0),
    }
}

impl CrossFade for IkCrossFadeController {
    fn play<C: Playable>(&mut self, library: &ClipLibrary<C>, clip: ClipId) {
        if self.playback.play(library, clip) {
            self.targets.clear();
            (self.left_pin, self.right_pin) = sample_pins(library, clip, self.playback.time());
        }
    }

    fn fade_to<C: Playable>(&mut self, library: &ClipLibrary<C>, clip: ClipId, fade_duration: f32) {
        self.enqueue(library, clip, fade_duration, false);
    }

    fn update<C: Playable>(&mut self, library: &ClipLibrary<C>, dt: f32) {
        let Some(current) = self.playback.clip() else {
            return;
        };
        self.playback.sample_current(library, dt);
        let (mut left, mut right) = sample_pins(library, current, self.playback.time());

        if self.locked {
            self.left_pin = left;
            self.right_pin = right;
            return;
        }

        if let Some(front) = self.targets.front_mut() {
            self.playback.advance_and_blend(library, front, dt);
            let (target_left, target_right) = sample_pins(library, front.clip, front.playback_time);
            let t = front.weight();
            left += (target_left - left) * t;
            right += (target_right - right) * t;
        }
        self.left_pin = left;
        self.right_pin = right;

        if self.targets.front().is_some_and(CrossFadeTarget::is_complete) {
            if let Some(front) = self.targets.pop_front() {
                self.promote(front);
            }
        }
    }

    fn clear_targets(&mut self) {
        self.targets.clear();
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
        self.targets.len()
    }
}
