//! 演示：程序生成的双足骨骼在起伏地形上从待机淡入行走，脚部 IK 贴地。

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};

use stride_anim::animation::{
    crossfade_update_system, optimize_clip, skinning_system, AnimatedPose, Clip, ClipId,
    ClipLibrary, CrossFade, FootPins, IkCrossFadeController, InterpolationMode, Playable, Pose,
    ScalarTrack, SkinMatrices, SkinnedMesh, SkinnedVertex3D, Skeleton, Time, Transform,
};
use stride_anim::config::AnimationConfig;
use stride_anim::error::AnimationResult;
use stride_anim::ik::{foot_placement_system, FootPlacement, GroundQuery, Heightfield, IkLeg};
use stride_anim::logging::init_logging;

const FRAMES: usize = 240;
const FRAME_TIME: f32 = 1.0 / 60.0;
const FADE_FRAME: usize = 60;

const PELVIS: usize = 0;
const SPINE: usize = 1;
const LEFT_HIP: usize = 2;
const RIGHT_HIP: usize = 6;

/// 角色沿 +Z 移动的速度 (米/秒)
#[derive(Component)]
struct Mover {
    speed: f32,
}

fn main() {
    let mut config = AnimationConfig::load_or_default();
    config.apply_env_overrides();
    init_logging(&config.logging);

    if let Err(e) = config.validate() {
        tracing::error!(target: "config", error = %e, "Invalid configuration");
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let result = build_skeleton().and_then(|skeleton| {
        let (library, idle, walk) = build_library();
        if config.playback.optimize_clips {
            let rate = config.playback.fast_track_sample_rate;
            run(&config, skeleton, library.map(|clip| optimize_clip(clip, rate)), idle, walk)
        } else {
            run(&config, skeleton, library, idle, walk)
        }
    });

    if let Err(e) = result {
        tracing::error!(target: "animation", error = %e, "Demo failed");
        eprintln!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run<C: Playable + Send + Sync + 'static>(
    config: &AnimationConfig,
    skeleton: Skeleton,
    library: ClipLibrary<C>,
    idle: ClipId,
    walk: ClipId,
) -> AnimationResult<()> {
    let leg = |side: &str| {
        IkLeg::new(
            &skeleton,
            &format!("{side}_hip"),
            &format!("{side}_knee"),
            &format!("{side}_ankle"),
            Some(format!("{side}_toe").as_str()),
            &config.ik.leg,
        )
    };
    let placement = FootPlacement::new(leg("left")?, leg("right")?, &config.ik.leg);

    let mut controller = IkCrossFadeController::new(skeleton.rest_pose().clone());
    controller.play(&library, idle);

    let mesh = SkinnedMesh::new(bone_markers(&skeleton), Vec::new(), config.skinning.mode)
        .with_max_palette_size(config.skinning.max_palette_size);

    let terrain = Heightfield::from_fn(Vec3::new(-10.0, 0.0, -10.0), 0.25, 81, 81, |x, z| {
        0.15 * (z * 0.8).sin() + 0.05 * x.cos()
    });

    let mut world = World::new();
    world.insert_resource(Time::default());
    world.insert_resource(library);
    world.insert_resource(terrain);
    let character = world
        .spawn((
            controller,
            placement,
            AnimatedPose::default(),
            SkinMatrices::default(),
            skeleton,
            mesh,
            Mover { speed: 0.0 },
        ))
        .id();

    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            move_character_system,
            crossfade_update_system::<IkCrossFadeController, C>,
            foot_placement_system::<Heightfield>,
            skinning_system,
        )
            .chain(),
    );

    let fade = config.playback.default_fade_duration;
    for frame in 0..FRAMES {
        if frame == FADE_FRAME {
            world.resource_scope(|world, library: Mut<ClipLibrary<C>>| {
                if let Some(mut controller) = world.get_mut::<IkCrossFadeController>(character) {
                    controller.fade_to(&*library, walk, fade);
                }
                if let Some(mut mover) = world.get_mut::<Mover>(character) {
                    mover.speed = 1.2;
                }
            });
            tracing::info!(target: "animation", fade, "Fading to walk");
        }

        world.resource_mut::<Time>().advance(FRAME_TIME);
        schedule.run(&mut world);

        if frame % 30 == 0 {
            report(&world, character, frame);
        }
    }

    Ok(())
}

/// 移动角色并让骨盆跟随地形高度
fn move_character_system(
    time: Res<Time>,
    terrain: Res<Heightfield>,
    mut query: Query<(&Mover, &mut FootPlacement)>,
) {
    for (mover, mut placement) in &mut query {
        let mut position = placement.model.position;
        position.z += mover.speed * time.delta_seconds;
        if let Some(height) = terrain.height_at(position.x, position.z) {
            position.y = height;
        }
        placement.model.position = position;
    }
}

fn report(world: &World, character: Entity, frame: usize) {
    let Some(placement) = world.get::<FootPlacement>(character) else {
        return;
    };
    let Some(pose) = world.get::<AnimatedPose>(character) else {
        return;
    };
    let Some(controller) = world.get::<IkCrossFadeController>(character) else {
        return;
    };
    let terrain = world.resource::<Heightfield>();
    let clip = controller.current_clip().map(ClipId::index);

    for (side, leg, pin) in [
        ("left", &placement.left, controller.left_pin()),
        ("right", &placement.right, controller.right_pin()),
    ] {
        let ankle = Transform::combine(&placement.model, &pose.0.global_transform(leg.ankle())).position;
        let ground = terrain
            .probe_down(ankle + Vec3::Y * placement.probe_height(), placement.probe_height() * 2.0)
            .map(|hit| hit.point.y);
        tracing::info!(
            target: "animation",
            frame,
            ?clip,
            side,
            pin,
            ankle_height = ankle.y,
            ?ground,
            "Foot state"
        );
    }

    if let Some(mesh) = world.get::<SkinnedMesh>(character) {
        tracing::debug!(
            target: "animation",
            palette_bytes = mesh.palette_bytes().len(),
            skinned_vertices = mesh.skinned_positions().len(),
            "Skinning output"
        );
    }
}

/// 骨盆高 2 米的双足骨骼：骨盆、脊柱，以及左右 髋 -> 膝 -> 踝 -> 脚尖
fn build_skeleton() -> AnimationResult<Skeleton> {
    let mut joints = vec![
        Transform::from_position(Vec3::new(0.0, 2.0, 0.0)),
        Transform::from_position(Vec3::new(0.0, 0.5, 0.0)),
    ];
    let mut parents = vec![None, Some(PELVIS)];
    let mut names = vec!["pelvis".to_string(), "spine".to_string()];

    for (side, x) in [("left", -0.2), ("right", 0.2)] {
        let hip = joints.len();
        joints.extend([
            Transform::from_position(Vec3::new(x, 0.0, 0.0)),
            Transform::from_position(Vec3::new(0.0, -1.0, 0.0)),
            Transform::from_position(Vec3::new(0.0, -0.9, 0.0)),
            Transform::from_position(Vec3::new(0.0, -0.1, 0.25)),
        ]);
        parents.extend([Some(PELVIS), Some(hip), Some(hip + 1), Some(hip + 2)]);
        names.extend(["hip", "knee", "ankle", "toe"].map(|joint| format!("{side}_{joint}")));
    }

    Skeleton::from_rest_pose(Pose::from_parts(joints, parents), names)
}

/// 待机与行走剪辑，附带脚钉曲线
fn build_library() -> (ClipLibrary<Clip>, ClipId, ClipId) {
    let mut library = ClipLibrary::new();

    let mut idle = Clip::new("idle");
    {
        let pelvis = idle.track_mut(PELVIS);
        for (time, height) in [(0.0, 2.0), (1.0, 1.97), (2.0, 2.0)] {
            pelvis.position.add_keyframe(time, Vec3::new(0.0, height, 0.0));
        }
        let spine = idle.track_mut(SPINE);
        for (time, angle) in [(0.0, 0.0), (1.0, 0.05), (2.0, 0.0)] {
            spine.rotation.add_keyframe(time, Quat::from_rotation_x(angle));
        }
    }
    idle.recalculate_duration();
    let pins = |values: [f32; 5]| ScalarTrack::from_values(InterpolationMode::Constant, 0.0, 0.25, values);
    let idle = library.add_with_pins(idle, FootPins::new(pins([1.0; 5]), pins([1.0; 5])));

    let mut walk = Clip::new("walk");
    let swing = [0.35, 0.0, -0.35, 0.0, 0.35];
    let bend = [0.0, 0.0, 0.6, 0.0, 0.0];
    for (hip, phase) in [(LEFT_HIP, 0), (RIGHT_HIP, 2)] {
        for key in 0..5 {
            let time = key as f32 * 0.25;
            let index = (key + phase) % 4;
            walk.track_mut(hip)
                .rotation
                .add_keyframe(time, Quat::from_rotation_x(swing[index]));
            walk.track_mut(hip + 1)
                .rotation
                .add_keyframe(time, Quat::from_rotation_x(bend[index]));
        }
    }
    for (time, height) in [(0.0, 2.0), (0.25, 1.95), (0.5, 2.0), (0.75, 1.95), (1.0, 2.0)] {
        walk.track_mut(PELVIS)
            .position
            .add_keyframe(time, Vec3::new(0.0, height, 0.0));
    }
    walk.recalculate_duration();
    let walk = library.add_with_pins(
        walk,
        FootPins::new(pins([1.0, 1.0, 0.0, 0.0, 1.0]), pins([0.0, 0.0, 1.0, 1.0, 0.0])),
    );

    (library, idle, walk)
}

/// 每个关节一个刚性顶点，用于观察蒙皮输出
fn bone_markers(skeleton: &Skeleton) -> Vec<SkinnedVertex3D> {
    (0..skeleton.joint_count())
        .map(|joint| {
            let position = skeleton.rest_pose().global_transform(joint).position;
            SkinnedVertex3D::rigid(position, Vec3::Z, joint as u32)
        })
        .collect()
}
