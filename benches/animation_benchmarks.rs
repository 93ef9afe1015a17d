/// 动画核心性能基准测试
///
/// 覆盖剪辑采样（朴素 / 预计算）、矩阵调色板、姿态混合、IK 求解与蒙皮
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Mat4, Quat, Vec3};

use stride_anim::animation::{
    blend, optimize_clip, Clip, InterpolationMode, Playable, Pose, SkinnedMesh, SkinnedVertex3D,
    SkinningMode, Skeleton, Transform,
};
use stride_anim::config::LegConfig;
use stride_anim::ik::{CcdSolver, FabrikSolver, FlatGround, FootPlacement, IkLeg};

/// 单链骨骼，每个关节沿 +Y 偏移 0.5
fn chain_pose(joints: usize) -> Pose {
    let transforms = (0..joints)
        .map(|i| match i {
            0 => Transform::IDENTITY,
            _ => Transform::from_position(Vec3::new(0.0, 0.5, 0.0)),
        })
        .collect();
    let parents = (0..joints).map(|i| i.checked_sub(1)).collect();
    Pose::from_parts(transforms, parents)
}

fn wave_clip(joints: usize, interpolation: InterpolationMode) -> Clip {
    let mut clip = Clip::new("wave");
    for joint in 0..joints {
        let track = clip.track_mut(joint);
        track.rotation.interpolation = interpolation;
        for key in 0..=30 {
            let time = key as f32 / 30.0;
            let angle = (time * std::f32::consts::TAU + joint as f32 * 0.3).sin() * 0.4;
            track.rotation.add_keyframe(time, Quat::from_rotation_z(angle));
        }
    }
    clip.recalculate_duration();
    clip
}

// ============================================================================
// 剪辑采样
// ============================================================================

fn bench_clip_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("clip_sampling");

    for joints in [16, 64] {
        let clip = wave_clip(joints, InterpolationMode::Cubic);
        let fast = optimize_clip(&clip, 60.0);
        let mut pose = chain_pose(joints);

        group.bench_with_input(BenchmarkId::new("naive", joints), &joints, |bencher, _| {
            let mut time = 0.0;
            bencher.iter(|| {
                time += 0.013;
                black_box(clip.sample(&mut pose, black_box(time)))
            });
        });

        let mut pose = chain_pose(joints);
        group.bench_with_input(BenchmarkId::new("fast", joints), &joints, |bencher, _| {
            let mut time = 0.0;
            bencher.iter(|| {
                time += 0.013;
                black_box(fast.sample(&mut pose, black_box(time)))
            });
        });
    }

    group.finish();
}

// ============================================================================
// 调色板与混合
// ============================================================================

fn bench_matrix_palette(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix_palette");
    let pose = chain_pose(64);
    let mut out: Vec<Mat4> = Vec::new();

    group.bench_function("sorted", |bencher| {
        bencher.iter(|| {
            pose.matrix_palette(&mut out);
            black_box(out.len())
        });
    });

    group.bench_function("unordered", |bencher| {
        bencher.iter(|| {
            pose.matrix_palette_unordered(&mut out);
            black_box(out.len())
        });
    });

    group.finish();
}

fn bench_blend(c: &mut Criterion) {
    let clip = wave_clip(64, InterpolationMode::Linear);
    let mut a = chain_pose(64);
    let mut b = chain_pose(64);
    clip.sample(&mut a, 0.1);
    clip.sample(&mut b, 0.6);
    let mut out = Pose::default();

    c.bench_function("blend_64_joints", |bencher| {
        bencher.iter(|| {
            blend(&a, &b, black_box(0.35), None, &mut out);
            black_box(out.len())
        });
    });
}

// ============================================================================
// IK
// ============================================================================

fn bench_ik_solvers(c: &mut Criterion) {
    let mut group = c.benchmark_group("ik_solve");
    let mut chain = vec![Transform::IDENTITY];
    chain.extend(std::iter::repeat(Transform::from_position(Vec3::Y)).take(3));
    let goal = Vec3::new(1.0, 1.5, 0.0);

    group.bench_function("ccd", |bencher| {
        bencher.iter(|| {
            let mut solver = CcdSolver::new(15, 1e-5).with_chain(chain.clone());
            black_box(solver.solve(black_box(goal)))
        });
    });

    group.bench_function("fabrik", |bencher| {
        bencher.iter(|| {
            let mut solver = FabrikSolver::new(15, 1e-5).with_chain(chain.clone());
            black_box(solver.solve(black_box(goal)))
        });
    });

    group.finish();
}

fn bench_foot_placement(c: &mut Criterion) {
    let rest = Pose::from_parts(
        vec![
            Transform::from_position(Vec3::new(0.0, 2.0, 0.0)),
            Transform::from_position(Vec3::new(-0.2, 0.0, 0.0)),
            Transform::from_position(Vec3::new(0.0, -1.0, 0.0)),
            Transform::from_position(Vec3::new(0.0, -0.9, 0.0)),
            Transform::from_position(Vec3::new(0.2, 0.0, 0.0)),
            Transform::from_position(Vec3::new(0.0, -1.0, 0.0)),
            Transform::from_position(Vec3::new(0.0, -0.9, 0.0)),
        ],
        vec![None, Some(0), Some(1), Some(2), Some(0), Some(4), Some(5)],
    );
    let names = ["pelvis", "l_hip", "l_knee", "l_ankle", "r_hip", "r_knee", "r_ankle"]
        .map(String::from)
        .to_vec();
    let Ok(skeleton) = Skeleton::from_rest_pose(rest, names) else {
        return;
    };
    let config = LegConfig::default();
    let (Ok(left), Ok(right)) = (
        IkLeg::new(&skeleton, "l_hip", "l_knee", "l_ankle", None, &config),
        IkLeg::new(&skeleton, "r_hip", "r_knee", "r_ankle", None, &config),
    ) else {
        return;
    };
    let mut placement = FootPlacement::new(left, right, &config);
    let ground = FlatGround::new(0.35);

    c.bench_function("foot_placement", |bencher| {
        bencher.iter(|| {
            let mut pose = skeleton.rest_pose().clone();
            black_box(placement.apply(&mut pose, (1.0, 0.6), &ground))
        });
    });
}

// ============================================================================
// 蒙皮
// ============================================================================

fn bench_skinning(c: &mut Criterion) {
    let pose = chain_pose(64);
    let Ok(skeleton) = Skeleton::from_rest_pose(pose, (0..64).map(|i| format!("j{i}")).collect())
    else {
        return;
    };
    let clip = wave_clip(64, InterpolationMode::Linear);
    let mut animated = skeleton.rest_pose().clone();
    clip.sample(&mut animated, 0.4);

    let mut skin = Vec::new();
    skeleton.skin_matrices(&animated, &mut skin);

    let vertices = (0..4096)
        .map(|i| {
            let bone = (i % 63) as u32;
            let mut vertex = SkinnedVertex3D::new(
                [0.1, bone as f32 * 0.5 + 0.25, 0.0],
                [0.0, 0.0, 1.0],
                [0.0, 0.0],
                [bone, bone + 1, 0, 0],
                [0.5, 0.5, 0.0, 0.0],
            );
            vertex.normalize_weights();
            vertex
        })
        .collect::<Vec<_>>();
    let mut mesh = SkinnedMesh::new(vertices, Vec::new(), SkinningMode::Cpu);

    let mut group = c.benchmark_group("skinning");
    group.bench_function("skin_matrices", |bencher| {
        bencher.iter(|| {
            skeleton.skin_matrices(&animated, &mut skin);
            black_box(skin.len())
        });
    });
    group.bench_function("cpu_4096_vertices", |bencher| {
        bencher.iter(|| {
            mesh.cpu_skin(black_box(&skin));
            black_box(mesh.skinned_positions().len())
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_clip_sampling,
    bench_matrix_palette,
    bench_blend,
    bench_ik_solvers,
    bench_foot_placement,
    bench_skinning
);
criterion_main!(benches);
