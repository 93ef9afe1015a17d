use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};

use stride_anim::animation::{
    crossfade_update_system, optimize_clip, skinning_system, AnimatedPose, Clip, ClipId,
    ClipLibrary, CrossFade, FootPins, IkCrossFadeController, InterpolationMode, Playable, Pose,
    ScalarTrack, SkinMatrices, SkinnedMesh, SkinnedVertex3D, SkinningMode, Skeleton, Time,
    Transform,
};
use stride_anim::config::AnimationConfig;
use stride_anim::error::AnimationError;
use stride_anim::ik::{
    foot_placement_system, CcdSolver, FabrikSolver, FlatGround, FootPlacement, IkLeg,
};

const PELVIS: usize = 0;
const LEFT_KNEE: usize = 2;

/// 骨盆高 2，左右各 髋 -> 膝 -> 踝 -> 脚尖
fn biped() -> Skeleton {
    let mut joints = vec![Transform::from_position(Vec3::new(0.0, 2.0, 0.0))];
    let mut parents = vec![None];
    let mut names = vec!["pelvis".to_string()];
    for (side, x) in [("left", -0.2), ("right", 0.2)] {
        let hip = joints.len();
        joints.extend([
            Transform::from_position(Vec3::new(x, 0.0, 0.0)),
            Transform::from_position(Vec3::new(0.0, -1.0, 0.0)),
            Transform::from_position(Vec3::new(0.0, -0.9, 0.0)),
            Transform::from_position(Vec3::new(0.0, 0.0, 0.2)),
        ]);
        parents.extend([Some(PELVIS), Some(hip), Some(hip + 1), Some(hip + 2)]);
        names.extend(["hip", "knee", "ankle", "toe"].map(|joint| format!("{side}_{joint}")));
    }
    Skeleton::from_rest_pose(Pose::from_parts(joints, parents), names).unwrap()
}

fn constant_pin(value: f32) -> ScalarTrack {
    ScalarTrack::from_values(InterpolationMode::Linear, 0.0, 1.0, [value, value])
}

fn library() -> (ClipLibrary<Clip>, ClipId, ClipId) {
    let mut library = ClipLibrary::new();

    let mut idle = Clip::new("idle");
    for (time, height) in [(0.0, 2.0), (1.0, 1.98), (2.0, 2.0)] {
        idle.track_mut(PELVIS)
            .position
            .add_keyframe(time, Vec3::new(0.0, height, 0.0));
    }
    idle.recalculate_duration();
    let idle = library.add_with_pins(idle, FootPins::new(constant_pin(1.0), constant_pin(1.0)));

    let mut walk = Clip::new("walk");
    for (time, height) in [(0.0, 2.0), (0.5, 1.9), (1.0, 2.0)] {
        walk.track_mut(PELVIS)
            .position
            .add_keyframe(time, Vec3::new(0.0, height, 0.0));
    }
    for (time, angle) in [(0.0, 0.2), (0.5, -0.2), (1.0, 0.2)] {
        walk.track_mut(LEFT_KNEE)
            .rotation
            .add_keyframe(time, Quat::from_rotation_x(angle));
    }
    walk.recalculate_duration();
    let walk = library.add_with_pins(walk, FootPins::new(constant_pin(1.0), constant_pin(0.0)));

    (library, idle, walk)
}

fn placement(skeleton: &Skeleton, config: &AnimationConfig) -> FootPlacement {
    let leg = |side: &str| {
        IkLeg::new(
            skeleton,
            &format!("{side}_hip"),
            &format!("{side}_knee"),
            &format!("{side}_ankle"),
            Some(format!("{side}_toe").as_str()),
            &config.ik.leg,
        )
        .unwrap()
    };
    FootPlacement::new(leg("left"), leg("right"), &config.ik.leg)
}

#[test]
fn test_full_pipeline() {
    let config = AnimationConfig::default();
    let skeleton = biped();
    let (library, idle, walk) = library();
    let mut placement = placement(&skeleton, &config);

    let mut controller = IkCrossFadeController::new(skeleton.rest_pose().clone());
    controller.play(&library, idle);
    controller.fade_to(&library, walk, 0.25);
    for _ in 0..4 {
        controller.update(&library, 0.125);
    }
    assert_eq!(controller.current_clip(), Some(walk));
    assert_eq!(controller.pending_targets(), 0);
    assert!((controller.left_pin() - 1.0).abs() < 1e-6);
    assert!(controller.right_pin().abs() < 1e-6);

    let mut pose = controller.current_pose().clone();
    let right_before = pose.global_transform(placement.right.ankle());
    let pins = (controller.left_pin(), controller.right_pin());
    assert_eq!(placement.apply(&mut pose, pins, &FlatGround::new(0.3)), (true, false));

    let left_ankle = pose.global_transform(placement.left.ankle()).position;
    assert!((left_ankle.y - 0.3).abs() < 1e-3, "left ankle at {left_ankle}");
    assert!(pose
        .global_transform(placement.right.ankle())
        .abs_diff_eq(&right_before, 1e-6));

    // 蒙皮矩阵把绑定姿态中的踝关节映射到当前姿态
    let mut skin = Vec::new();
    skeleton.skin_matrices(&pose, &mut skin);
    assert_eq!(skin.len(), skeleton.joint_count());
    let bind_ankle = skeleton
        .bind_pose()
        .global_transform(placement.left.ankle())
        .position;
    assert!(skin[placement.left.ankle()]
        .transform_point3(bind_ankle)
        .abs_diff_eq(left_ankle, 1e-4));
}

#[test]
fn test_ecs_schedule() {
    let config = AnimationConfig::default();
    let skeleton = biped();
    let (library, idle, _) = library();

    let mut controller = IkCrossFadeController::new(skeleton.rest_pose().clone());
    controller.play(&library, idle);

    let ankle = skeleton.joint_index("left_ankle").unwrap();
    let marker = skeleton.rest_pose().global_transform(ankle).position;
    let mesh = SkinnedMesh::new(
        vec![SkinnedVertex3D::rigid(marker, Vec3::Z, ankle as u32)],
        vec![0],
        SkinningMode::Cpu,
    );

    let mut world = World::new();
    world.insert_resource(Time::default());
    world.insert_resource(library);
    world.insert_resource(FlatGround::new(0.3));
    let character = world
        .spawn((
            controller,
            placement(&skeleton, &config),
            AnimatedPose::default(),
            SkinMatrices::default(),
            skeleton,
            mesh,
        ))
        .id();

    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            crossfade_update_system::<IkCrossFadeController, Clip>,
            foot_placement_system::<FlatGround>,
            skinning_system,
        )
            .chain(),
    );

    for _ in 0..3 {
        world.resource_mut::<Time>().advance(0.25);
        schedule.run(&mut world);
    }

    let pose = &world.get::<AnimatedPose>(character).unwrap().0;
    for name in ["left_ankle", "right_ankle"] {
        let skeleton = world.get::<Skeleton>(character).unwrap();
        let joint = skeleton.joint_index(name).unwrap();
        let y = pose.global_transform(joint).position.y;
        assert!((y - 0.3).abs() < 1e-3, "{name} at {y}");
    }

    let mesh = world.get::<SkinnedMesh>(character).unwrap();
    assert!((mesh.skinned_positions()[0].y - 0.3).abs() < 1e-3);
}

#[test]
fn test_optimized_library_matches_naive() {
    let skeleton = biped();
    let (library, _, walk) = library();
    let fast = library.map(|clip| optimize_clip(clip, 60.0));

    let naive_clip = library.get(walk).unwrap();
    let fast_clip = fast.get(walk).unwrap();
    assert_eq!(fast.foot_pins(walk), library.foot_pins(walk));

    let mut naive_pose = skeleton.rest_pose().clone();
    let mut fast_pose = skeleton.rest_pose().clone();
    for step in 0..40 {
        let time = step as f32 * 0.037;
        naive_clip.sample(&mut naive_pose, time);
        fast_clip.sample(&mut fast_pose, time);
        for joint in 0..skeleton.joint_count() {
            assert!(naive_pose
                .local_transform(joint)
                .abs_diff_eq(&fast_pose.local_transform(joint), 1e-4));
        }
    }
}

#[test]
fn test_solvers_reach_shared_goal() {
    let mut chain = vec![Transform::IDENTITY];
    chain.extend(std::iter::repeat(Transform::from_position(Vec3::Y)).take(3));
    let goal = Vec3::new(1.0, 2.0, 0.5);

    let mut ccd = CcdSolver::new(15, 1e-5).with_chain(chain.clone());
    assert!(ccd.solve(goal));
    assert!(ccd.global_transform(3).position.distance(goal) < 1e-4);

    let mut fabrik = FabrikSolver::new(15, 1e-5).with_chain(chain);
    assert!(fabrik.solve(goal));
    assert!(fabrik.global_transform(3).position.distance(goal) < 1e-4);
}

#[test]
fn test_leg_requires_known_joints() {
    let skeleton = biped();
    let config = AnimationConfig::default();
    let result = IkLeg::new(&skeleton, "left_hip", "left_knee", "left_heel", None, &config.ik.leg);
    assert!(matches!(result, Err(AnimationError::JointNotFound { name }) if name == "left_heel"));
}

#[test]
fn test_config_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let mut config = AnimationConfig::default();
    config.ik.leg.ankle_to_ground_offset = 0.08;
    config.skinning.mode = SkinningMode::Cpu;
    config.playback.default_fade_duration = 0.5;
    config.validate()?;

    let toml_path = dir.path().join("config.toml");
    config.save_toml(&toml_path)?;
    assert_eq!(AnimationConfig::from_toml_file(&toml_path)?, config);

    let json_path = dir.path().join("config.json");
    config.save_json(&json_path)?;
    assert_eq!(AnimationConfig::from_json_file(&json_path)?, config);

    assert!(AnimationConfig::from_toml_file(dir.path().join("missing.toml")).is_err());
    Ok(())
}
