//! 脚部贴地
//!
//! 每帧流程：
//!
//! 1. 读取左右脚钉权重（通常来自 [`IkCrossFadeController`]）
//! 2. 从踝关节上方向下探测地面
//! 3. 按脚钉权重在动画踝关节位置与地面位置之间插值得到目标
//! 4. 求解腿部 IK，把结果限制在髋关节子树内混合回姿态
//! 5. 旋转踝关节使脚尖贴地

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};

use super::ground::GroundQuery;
use super::leg::IkLeg;
use crate::animation::blending::blend_in_place;
use crate::animation::crossfade::IkCrossFadeController;
use crate::animation::pose::Pose;
use crate::animation::systems::AnimatedPose;
use crate::animation::transform::{rotation_between, Transform};
use crate::config::LegConfig;

/// 左右腿贴地组件
#[derive(Component, Debug, Clone)]
pub struct FootPlacement {
    pub left: IkLeg,
    pub right: IkLeg,
    /// 角色世界变换
    pub model: Transform,
    probe_height: f32,
}

impl FootPlacement {
    pub fn new(left: IkLeg, right: IkLeg, config: &LegConfig) -> Self {
        Self {
            left,
            right,
            model: Transform::IDENTITY,
            probe_height: config.ground_probe_height,
        }
    }

    pub fn probe_height(&self) -> f32 {
        self.probe_height
    }

    pub fn set_probe_height(&mut self, height: f32) {
        self.probe_height = height.max(0.0);
    }

    /// 对姿态施加贴地修正
    ///
    /// `pins` 为 `(左, 右)` 脚钉权重。返回每条腿是否经过 IK 调整并收敛；
    /// 权重为 0 或未探测到地面的腿保持原样。
    pub fn apply<G: GroundQuery + ?Sized>(
        &mut self,
        pose: &mut Pose,
        pins: (f32, f32),
        ground: &G,
    ) -> (bool, bool) {
        let model = self.model;
        let probe_height = self.probe_height;
        let left = place_leg(&mut self.left, &model, pose, pins.0, ground, probe_height);
        let right = place_leg(&mut self.right, &model, pose, pins.1, ground, probe_height);
        (left, right)
    }
}

fn place_leg<G: GroundQuery + ?Sized>(
    leg: &mut IkLeg,
    model: &Transform,
    pose: &mut Pose,
    pin: f32,
    ground: &G,
    probe_height: f32,
) -> bool {
    let pin = pin.clamp(0.0, 1.0);
    if pin <= 0.0 {
        return false;
    }

    let ankle_world = Transform::combine(model, &pose.global_transform(leg.ankle())).position;
    let Some(hit) = ground.probe_down(ankle_world + Vec3::Y * probe_height, probe_height * 2.0) else {
        return false;
    };

    let offset = leg.ankle_to_ground_offset();
    let animated = ankle_world - Vec3::Y * offset;
    let target = animated.lerp(hit.point, pin);

    let converged = leg.solve_for_leg(model, pose, target);
    blend_in_place(pose, leg.adjusted_pose(), 1.0, Some(leg.hip()));

    if let Some(toe) = leg.toe() {
        align_toe(pose, model, leg.ankle(), toe, pin, ground, probe_height, offset);
    }
    converged
}

/// 旋转踝关节，使脚尖落到其下方地面上方 `offset` 处
#[allow(clippy::too_many_arguments)]
fn align_toe<G: GroundQuery + ?Sized>(
    pose: &mut Pose,
    model: &Transform,
    ankle: usize,
    toe: usize,
    pin: f32,
    ground: &G,
    probe_height: f32,
    offset: f32,
) {
    let ankle_world = Transform::combine(model, &pose.global_transform(ankle)).position;
    let toe_world = Transform::combine(model, &pose.global_transform(toe)).position;
    let Some(hit) = ground.probe_down(toe_world + Vec3::Y * probe_height, probe_height * 2.0) else {
        return;
    };

    let toe_target = hit.point + Vec3::Y * offset;
    let delta = rotation_between(toe_world - ankle_world, toe_target - ankle_world);
    let rotation = Quat::IDENTITY.slerp(delta, pin);

    let parent = match pose.parent(ankle) {
        Some(parent) => model.rotation * pose.global_transform(parent).rotation,
        None => model.rotation,
    };
    let mut local = pose.local_transform(ankle);
    local.rotation = (parent.inverse() * rotation * parent * local.rotation).normalize();
    pose.set_local_transform(ankle, local);
}

/// 在交叉淡入淡出之后、蒙皮之前对 [`AnimatedPose`] 做贴地修正
pub fn foot_placement_system<G: GroundQuery + Resource>(
    ground: Res<G>,
    mut query: Query<(&IkCrossFadeController, &mut FootPlacement, &mut AnimatedPose)>,
) {
    for (controller, mut placement, mut pose) in &mut query {
        let pins = (controller.left_pin(), controller.right_pin());
        let (left, right) = placement.apply(&mut pose.0, pins, &*ground);
        tracing::trace!(target: "ik", left, right, "Foot placement applied");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::animation::skeleton::Skeleton;
    use crate::ik::ground::FlatGround;

    /// 骨盆高 2，左右各一条 髋 -> 膝 -> 踝 -> 脚尖 的腿，踝关节离地 0.1
    pub(crate) fn biped() -> Skeleton {
        let mut joints = vec![Transform::from_position(Vec3::new(0.0, 2.0, 0.0))];
        let mut parents = vec![None];
        let mut names = vec!["pelvis".to_string()];
        for (side, x) in [("left", -0.2), ("right", 0.2)] {
            let base = joints.len();
            joints.extend([
                Transform::from_position(Vec3::new(x, 0.0, 0.0)),
                Transform::from_position(Vec3::new(0.0, -1.0, 0.0)),
                Transform::from_position(Vec3::new(0.0, -0.9, 0.0)),
                Transform::from_position(Vec3::new(0.0, 0.0, 0.2)),
            ]);
            parents.extend([Some(0), Some(base), Some(base + 1), Some(base + 2)]);
            names.extend(["hip", "knee", "ankle", "toe"].map(|j| format!("{side}_{j}")));
        }
        Skeleton::from_rest_pose(Pose::from_parts(joints, parents), names).unwrap()
    }

    pub(crate) fn placement(skeleton: &Skeleton) -> FootPlacement {
        let config = LegConfig::default();
        let leg = |side: &str| {
            IkLeg::new(
                skeleton,
                &format!("{side}_hip"),
                &format!("{side}_knee"),
                &format!("{side}_ankle"),
                Some(format!("{side}_toe").as_str()),
                &config,
            )
            .unwrap()
        };
        FootPlacement::new(leg("left"), leg("right"), &config)
    }

    #[test]
    fn test_planted_foot_reaches_ground() {
        let skeleton = biped();
        let mut placement = placement(&skeleton);
        let mut pose = skeleton.rest_pose().clone();
        let right_ankle_before = pose.global_transform(placement.right.ankle());

        let ground = FlatGround::new(0.4);
        assert_eq!(placement.apply(&mut pose, (1.0, 0.0), &ground), (true, false));

        let left_ankle = pose.global_transform(placement.left.ankle()).position;
        assert!((left_ankle.y - 0.4).abs() < 1e-3, "left ankle at {left_ankle}");
        assert!((left_ankle.x + 0.2).abs() < 1e-3);

        let left_toe = pose.global_transform(placement.left.toe().unwrap()).position;
        assert!((left_toe.y - 0.4).abs() < 1e-3, "left toe at {left_toe}");

        let right_ankle = pose.global_transform(placement.right.ankle());
        assert!(right_ankle.abs_diff_eq(&right_ankle_before, 1e-6));
    }

    #[test]
    fn test_partial_pin_interpolates_target() {
        let skeleton = biped();
        let mut placement = placement(&skeleton);
        let mut pose = skeleton.rest_pose().clone();

        placement.apply(&mut pose, (0.5, 0.5), &FlatGround::new(0.4));
        for ankle in [placement.left.ankle(), placement.right.ankle()] {
            let y = pose.global_transform(ankle).position.y;
            assert!((y - 0.25).abs() < 1e-3, "ankle at {y}");
        }
    }

    #[test]
    fn test_free_feet_leave_pose_untouched() {
        let skeleton = biped();
        let mut placement = placement(&skeleton);
        let mut pose = skeleton.rest_pose().clone();

        assert_eq!(placement.apply(&mut pose, (0.0, 0.0), &FlatGround::new(0.4)), (false, false));
        assert_eq!(&pose, skeleton.rest_pose());

        // 地面超出探测范围
        placement.set_probe_height(0.1);
        assert_eq!(placement.apply(&mut pose, (1.0, 1.0), &FlatGround::new(1.5)), (false, false));
        assert_eq!(&pose, skeleton.rest_pose());
    }

    #[test]
    fn test_model_transform_moves_probe() {
        let skeleton = biped();
        let mut placement = placement(&skeleton);
        placement.model = Transform::from_position(Vec3::new(0.0, 1.0, 0.0));
        let mut pose = skeleton.rest_pose().clone();

        placement.apply(&mut pose, (1.0, 1.0), &FlatGround::new(1.3));
        let ankle_model = pose.global_transform(placement.left.ankle());
        let ankle_world = Transform::combine(&placement.model, &ankle_model).position;
        assert!((ankle_world.y - 1.3).abs() < 1e-3);
    }
}
