use bevy_ecs::prelude::*;

use super::{CrossFade, CrossFadeTarget, Playback};
use crate::animation::clip::Playable;
use crate::animation::library::{ClipId, ClipLibrary};
use crate::animation::pose::Pose;

/// 数组式交叉淡入淡出控制器
///
/// 所有目标每帧同时推进并依次混合；每帧最多提升一个目标，按索引顺序取第一个完成的。
#[derive(Component, Debug, Clone)]
pub struct CrossFadeArray {
    playback: Playback,
    targets: Vec<CrossFadeTarget>,
}

impl CrossFadeArray {
    pub fn new(rest_pose: Pose) -> Self {
        Self {
            playback: Playback::new(rest_pose),
            targets: Vec::new(),
        }
    }

    pub fn targets(&self) -> &[CrossFadeTarget] {
        &self.targets
    }
}

impl CrossFade for CrossFadeArray {
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
            .last()
            .map(|target| target.clip)
            .or(self.playback.clip());
        if latest == Some(clip) {
            return;
        }
        if let Some(target) = self.playback.make_target(library, clip, fade_duration, false) {
            self.targets.push(target);
        }
    }

    fn update<C: Playable>(&mut self, library: &ClipLibrary<C>, dt: f32) {
        if self.playback.clip().is_none() {
            return;
        }
        self.playback.sample_current(library, dt);

        for target in &mut self.targets {
            self.playback.advance_and_blend(library, target, dt);
        }
        if let Some(index) = self.targets.iter().position(CrossFadeTarget::is_complete) {
            let target = self.targets.remove(index);
            self.playback.promote(target);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::crossfade::test_support::{library, rest_pose};

    #[test]
    fn test_array_advances_all_targets() {
        let (library, idle, walk, run) = library();
        let mut array = CrossFadeArray::new(rest_pose());
        array.play(&library, idle);
        array.fade_to(&library, walk, 1.0);
        array.fade_to(&library, run, 0.5);

        array.update(&library, 0.25);
        let fade_times: Vec<f32> = array.targets().iter().map(|t| t.fade_time).collect();
        assert_eq!(fade_times, vec![0.25, 0.25]);

        // run 先完成
        array.update(&library, 0.25);
        assert_eq!(array.current_clip(), Some(run));
        assert_eq!(array.pending_targets(), 1);
        assert_eq!(array.targets()[0].clip, walk);
    }

    #[test]
    fn test_array_first_completed_wins() {
        let (library, idle, walk, run) = library();
        let mut array = CrossFadeArray::new(rest_pose());
        array.play(&library, idle);
        array.fade_to(&library, walk, 0.25);
        array.fade_to(&library, run, 0.25);

        array.update(&library, 0.25);
        assert_eq!(array.current_clip(), Some(walk));
        assert_eq!(array.pending_targets(), 1);

        array.update(&library, 0.0);
        assert_eq!(array.current_clip(), Some(run));
        assert_eq!(array.pending_targets(), 0);
    }
}
