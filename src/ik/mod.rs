//! 逆向运动学模块
//!
//! 两种迭代求解器（CCD 与 FABRIK）、关节约束、腿部 IK 与地面贴合。
//! 求解器操作一条局部变换链：第 `i` 个关节的父关节为 `i - 1`。

pub mod ccd;
pub mod constraints;
pub mod fabrik;
pub mod foot_placement;
pub mod ground;
pub mod leg;

pub use ccd::CcdSolver;
pub use constraints::{
    apply_ball_socket, apply_constraints, apply_hinge, correct_backward_knee, rotate_joint_world,
    JointConstraint,
};
pub use fabrik::FabrikSolver;
pub use foot_placement::{foot_placement_system, FootPlacement};
pub use ground::{FlatGround, GroundHit, GroundQuery, Heightfield, TriangleGround};
pub use leg::IkLeg;

use crate::animation::transform::Transform;

/// 向量长度平方低于该值时视为零向量
pub const IK_EPSILON: f32 = 1e-5;

/// 链上第 `index` 个关节的世界变换
pub(crate) fn chain_global(chain: &[Transform], index: usize) -> Transform {
    chain[1..=index]
        .iter()
        .fold(chain[0], |world, local| Transform::combine(&world, local))
}
