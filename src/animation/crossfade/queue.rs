use std::collections::VecDeque;

use bevy_ecs::prelude::*;

use super::{CrossFade, CrossFadeTarget, Playback};
use crate::animation::clip::Playable;
use crate::animation::library::{ClipId, ClipLibrary};
use crate::animation::pose::Pose;

/// 队列式交叉淡入淡出控制器
///
/// 目标按入队顺序逐个淡入，只有队首目标推进；队首完成后下一个目标在下一帧开始淡入。
#[derive(Component, Debug, Clone)]
pub struct CrossFadeQueue {
    playback: Playback,
    targets: VecDeque<CrossFadeTarget>,
}

impl CrossFadeQueue {
    pub fn new(rest_pose: Pose) -> Self {
        Self {
            playback: Playback::new(rest_pose),
            targets: VecDeque::new(),
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = &CrossFadeTarget> {
        self.targets.iter()
    }
}

impl CrossFade for CrossFadeQueue {
    fn play<C: Playable>(&mut self, library: &ClipLibrary<C>, clip: ClipId) {
        if self.playback.play(library, clip) {
            self.targets.clear();
        }
    }

    fn fade_to<C: Playable>(&mut self, library: &ClipLibrary<C>, clip: ClipId, fade_duration: f32) {
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
        if let Some(target) = self.playback.make_target(library, clip, fade_duration, false) {
            self.targets.push_back(target);
        }
    }

    fn update<C: Playable>(&mut self, library: &ClipLibrary<C>, dt: f32) {
        if self.playback.clip().is_none() {
            return;
        }
        self.playback.sample_current(library, dt);

        if let Some(front) = self.targets.front_mut() {
            self.playback.advance_and_blend(library, front, dt);
        }
        if self.targets.front().is_some_and(CrossFadeTarget::is_complete) {
            if let Some(front) = self.targets.pop_front() {
                self.playback.promote(front);
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
