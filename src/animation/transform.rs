//! 关节局部变换
//!
//! 位置、旋转、缩放三元组，提供组合、求逆与插值。

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// 判定向量/缩放为零的阈值
pub const TRANSFORM_EPSILON: f32 = 1e-6;

/// 关节变换（相对于父关节）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// 在父变换的坐标系中应用子变换
    ///
    /// `position = parent.position + parent.rotation * (parent.scale * child.position)`，
    /// 旋转相乘后重新归一化，缩放逐分量相乘。
    pub fn combine(parent: &Transform, child: &Transform) -> Transform {
        Transform {
            position: parent.position + parent.rotation * (parent.scale * child.position),
            rotation: (parent.rotation * child.rotation).normalize(),
            scale: parent.scale * child.scale,
        }
    }

    /// 逆变换，满足 `combine(t, t.inverse()) ≈ IDENTITY`
    ///
    /// 接近零的缩放分量求逆后置为 0。
    pub fn inverse(&self) -> Transform {
        let rotation = self.rotation.inverse();
        let scale = Vec3::new(
            inverse_component(self.scale.x),
            inverse_component(self.scale.y),
            inverse_component(self.scale.z),
        );
        let position = rotation * (scale * -self.position);
        Transform {
            position,
            rotation,
            scale,
        }
    }

    /// 位置与缩放线性插值，旋转做带邻域检查的 nlerp
    pub fn mix(a: &Transform, b: &Transform, t: f32) -> Transform {
        Transform {
            position: a.position.lerp(b.position, t),
            rotation: nlerp(a.rotation, b.rotation, t),
            scale: a.scale.lerp(b.scale, t),
        }
    }

    /// 转换为 4x4 矩阵
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// 从 4x4 矩阵分解（矩阵含切变时结果为近似值）
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            rotation: rotation.normalize(),
            scale,
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * point)
    }

    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * (self.scale * vector)
    }

    /// 逐分量近似比较；旋转按 `q` 与 `-q` 等价处理
    pub fn abs_diff_eq(&self, other: &Transform, max_abs_diff: f32) -> bool {
        self.position.abs_diff_eq(other.position, max_abs_diff)
            && self.scale.abs_diff_eq(other.scale, max_abs_diff)
            && (self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
                || self.rotation.abs_diff_eq(-other.rotation, max_abs_diff))
    }
}

fn inverse_component(value: f32) -> f32 {
    if value.abs() < TRANSFORM_EPSILON {
        0.0
    } else {
        1.0 / value
    }
}

/// 归一化线性插值；点积为负时先翻转 `b` 走最短路径
pub fn nlerp(a: Quat, b: Quat, t: f32) -> Quat {
    let b = if a.dot(b) < 0.0 { -b } else { b };
    (a + (b - a) * t).normalize()
}

/// 把 `from` 旋转到 `to` 的最小旋转；任一向量接近零时返回单位四元数
///
/// 不对小角度做截断。
pub fn rotation_between(from: Vec3, to: Vec3) -> Quat {
    let (Some(from), Some(to)) = (from.try_normalize(), to.try_normalize()) else {
        return Quat::IDENTITY;
    };
    let dot = from.dot(to);
    if dot < ANTIPARALLEL_DOT {
        // 反向：绕任一垂直轴转半圈
        return Quat::from_axis_angle(from.any_orthonormal_vector(), std::f32::consts::PI);
    }
    let axis = from.cross(to);
    Quat::from_xyzw(axis.x, axis.y, axis.z, 1.0 + dot).normalize()
}

/// 两个单位向量的点积低于该值时视为反向
const ANTIPARALLEL_DOT: f32 = -1.0 + 1e-6;
