//! 剪辑库
//!
//! 剪辑由调用方统一持有，控制器只保存 [`ClipId`] 句柄。

use bevy_ecs::prelude::*;

use super::clip::Playable;
use super::keyframe::{Curve, ScalarTrack};
use crate::error::{AnimationError, AnimationResult};

/// 剪辑句柄（剪辑库中的索引）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId(pub(crate) usize);

impl ClipId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// 左右脚钉住曲线（0 = 自由，1 = 着地）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FootPins {
    pub left: ScalarTrack,
    pub right: ScalarTrack,
}

impl FootPins {
    pub fn new(left: ScalarTrack, right: ScalarTrack) -> Self {
        Self { left, right }
    }

    /// 按归一化时间 `[0, 1]` 采样 `(left, right)`
    ///
    /// 曲线按自身的时间范围映射，循环采样。
    pub fn sample_normalized(&self, normalized_time: f32) -> (f32, f32) {
        (
            sample_normalized(&self.left, normalized_time),
            sample_normalized(&self.right, normalized_time),
        )
    }
}

fn sample_normalized(track: &ScalarTrack, normalized_time: f32) -> f32 {
    let start = track.start_time();
    let time = start + (track.end_time() - start) * normalized_time;
    track.sample(time, true)
}

/// 剪辑库资源
#[derive(Debug, Clone)]
pub struct ClipLibrary<C> {
    clips: Vec<C>,
    pins: Vec<Option<FootPins>>,
}

impl<C: Send + Sync + 'static> Resource for ClipLibrary<C> {}

impl<C> Default for ClipLibrary<C> {
    fn default() -> Self {
        Self {
            clips: Vec::new(),
            pins: Vec::new(),
        }
    }
}

impl<C: Playable> ClipLibrary<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, clip: C) -> ClipId {
        self.insert(clip, None)
    }

    /// 添加剪辑及其脚钉曲线
    pub fn add_with_pins(&mut self, clip: C, pins: FootPins) -> ClipId {
        self.insert(clip, Some(pins))
    }

    fn insert(&mut self, clip: C, pins: Option<FootPins>) -> ClipId {
        tracing::debug!(target: "animation", clip = clip.name(), "Clip added to library");
        self.clips.push(clip);
        self.pins.push(pins);
        ClipId(self.clips.len() - 1)
    }

    pub fn get(&self, id: ClipId) -> Option<&C> {
        self.clips.get(id.0)
    }

    /// 查找剪辑，失败时返回 [`AnimationError::UnknownClip`]
    pub fn require(&self, id: ClipId) -> AnimationResult<&C> {
        self.get(id)
            .ok_or_else(|| AnimationError::UnknownClip(format!("#{}", id.0)))
    }

    /// 按名称查找
    pub fn find(&self, name: &str) -> Option<ClipId> {
        self.clips
            .iter()
            .position(|clip| clip.name() == name)
            .map(ClipId)
    }

    pub fn find_required(&self, name: &str) -> AnimationResult<ClipId> {
        self.find(name)
            .ok_or_else(|| AnimationError::UnknownClip(name.to_string()))
    }

    pub fn foot_pins(&self, id: ClipId) -> Option<&FootPins> {
        self.pins.get(id.0).and_then(Option::as_ref)
    }

    pub fn set_foot_pins(&mut self, id: ClipId, pins: FootPins) {
        if let Some(slot) = self.pins.get_mut(id.0) {
            *slot = Some(pins);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClipId, &C)> {
        self.clips
            .iter()
            .enumerate()
            .map(|(index, clip)| (ClipId(index), clip))
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// 转换库中每个剪辑，句柄与脚钉曲线保持不变
    pub fn map<D: Playable>(&self, f: impl FnMut(&C) -> D) -> ClipLibrary<D> {
        ClipLibrary {
            clips: self.clips.iter().map(f).collect(),
            pins: self.pins.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::clip::{optimize_clip, Clip};
    use crate::animation::keyframe::{InterpolationMode, Keyframe};
    use glam::Vec3;

    fn clip(name: &str) -> Clip {
        let mut clip = Clip::new(name);
        clip.track_mut(0).position.add_keyframe(0.0, Vec3::ZERO);
        clip.track_mut(0).position.add_keyframe(1.0, Vec3::X);
        clip.recalculate_duration();
        clip
    }

    #[test]
    fn test_add_and_find() {
        let mut library = ClipLibrary::new();
        let idle = library.add(clip("idle"));
        let walk = library.add(clip("walk"));
        assert_ne!(idle, walk);
        assert_eq!(library.len(), 2);
        assert_eq!(library.find("walk"), Some(walk));
        assert_eq!(library.find("run"), None);
        assert!(matches!(
            library.find_required("run"),
            Err(AnimationError::UnknownClip(name)) if name == "run"
        ));
        assert_eq!(library.require(idle).map(|c| c.name.clone()), Ok("idle".to_string()));
        assert!(library.require(ClipId(7)).is_err());
    }

    #[test]
    fn test_foot_pins() {
        let mut library = ClipLibrary::new();
        let pins = FootPins::new(
            ScalarTrack::with_keyframes(
                InterpolationMode::Linear,
                vec![Keyframe::new(0.0, 1.0), Keyframe::new(1.0, 0.0)],
            ),
            ScalarTrack::with_keyframes(
                InterpolationMode::Linear,
                vec![Keyframe::new(0.0, 0.0), Keyframe::new(2.0, 1.0)],
            ),
        );
        let walk = library.add_with_pins(clip("walk"), pins);
        let idle = library.add(clip("idle"));
        assert!(library.foot_pins(idle).is_none());

        let (left, right) = library.foot_pins(walk).map(|p| p.sample_normalized(0.5)).unwrap();
        assert!((left - 0.5).abs() < 1e-6);
        assert!((right - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_map_keeps_handles() {
        let mut library = ClipLibrary::new();
        library.add(clip("idle"));
        let walk = library.add_with_pins(clip("walk"), FootPins::default());
        let fast = library.map(|c| optimize_clip(c, 30.0));
        assert_eq!(fast.find("walk"), Some(walk));
        assert!(fast.foot_pins(walk).is_some());
        let names: Vec<&str> = fast.iter().map(|(_, c)| c.name()).collect();
        assert_eq!(names, vec!["idle", "walk"]);
    }
}
