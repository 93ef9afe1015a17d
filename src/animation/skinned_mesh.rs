//! 蒙皮网格组件
//!
//! 两条蒙皮路径共用同一个逐顶点函数 [`skin_vertex`]：
//! GPU 路径只准备可直接上传的矩阵调色板，CPU 路径直接输出蒙皮后的顶点。

use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// 默认调色板容量（与着色器中的骨骼数组长度一致）
pub const DEFAULT_MAX_PALETTE_SIZE: usize = 120;

// ============================================================================
// 蒙皮顶点数据
// ============================================================================

/// 蒙皮顶点（包含骨骼权重）
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkinnedVertex3D {
    /// 位置
    pub position: [f32; 3],
    /// 法线
    pub normal: [f32; 3],
    /// 纹理坐标
    pub uv: [f32; 2],
    /// 骨骼索引（最多 4 个）
    pub bone_indices: [u32; 4],
    /// 骨骼权重（最多 4 个，总和为 1.0）
    pub bone_weights: [f32; 4],
}

impl SkinnedVertex3D {
    /// 创建新的蒙皮顶点
    pub fn new(
        position: [f32; 3],
        normal: [f32; 3],
        uv: [f32; 2],
        bone_indices: [u32; 4],
        bone_weights: [f32; 4],
    ) -> Self {
        Self {
            position,
            normal,
            uv,
            bone_indices,
            bone_weights,
        }
    }

    /// 仅受单个骨骼影响的顶点
    pub fn rigid(position: Vec3, normal: Vec3, bone: u32) -> Self {
        Self::new(
            position.to_array(),
            normal.to_array(),
            [0.0, 0.0],
            [bone, 0, 0, 0],
            [1.0, 0.0, 0.0, 0.0],
        )
    }

    /// 归一化骨骼权重
    pub fn normalize_weights(&mut self) {
        let sum: f32 = self.bone_weights.iter().sum();
        if sum > 0.0001 {
            let inv_sum = 1.0 / sum;
            for w in &mut self.bone_weights {
                *w *= inv_sum;
            }
        }
    }
}

/// 线性混合蒙皮，返回 `(position, normal)`
///
/// 越界的骨骼索引被忽略；有效权重总和为零时返回原始顶点。
pub fn skin_vertex(vertex: &SkinnedVertex3D, skin_matrices: &[Mat4]) -> (Vec3, Vec3) {
    let position = Vec3::from_array(vertex.position);
    let normal = Vec3::from_array(vertex.normal);

    let mut skinned_position = Vec3::ZERO;
    let mut skinned_normal = Vec3::ZERO;
    let mut total_weight = 0.0;

    for (&bone, &weight) in vertex.bone_indices.iter().zip(&vertex.bone_weights) {
        if weight <= 0.0 {
            continue;
        }
        let Some(matrix) = skin_matrices.get(bone as usize) else {
            continue;
        };
        skinned_position += matrix.transform_point3(position) * weight;
        skinned_normal += matrix.transform_vector3(normal) * weight;
        total_weight += weight;
    }

    if total_weight <= 0.0 {
        return (position, normal);
    }
    (
        skinned_position,
        skinned_normal.try_normalize().unwrap_or(normal),
    )
}

// ============================================================================
// 蒙皮网格组件
// ============================================================================

/// 蒙皮方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkinningMode {
    /// 上传调色板，在顶点着色器中蒙皮
    #[default]
    Gpu,
    /// 在 CPU 上蒙皮后上传顶点
    Cpu,
}

/// 蒙皮网格组件
#[derive(Component, Debug, Clone)]
pub struct SkinnedMesh {
    /// 绑定姿态下的顶点
    pub vertices: Vec<SkinnedVertex3D>,
    pub indices: Vec<u32>,
    pub mode: SkinningMode,
    max_palette_size: usize,
    /// GPU 调色板（列主序）
    palette: Vec<[[f32; 4]; 4]>,
    skinned_positions: Vec<Vec3>,
    skinned_normals: Vec<Vec3>,
}

impl SkinnedMesh {
    /// 创建新的蒙皮网格
    pub fn new(vertices: Vec<SkinnedVertex3D>, indices: Vec<u32>, mode: SkinningMode) -> Self {
        Self {
            vertices,
            indices,
            mode,
            max_palette_size: DEFAULT_MAX_PALETTE_SIZE,
            palette: Vec::new(),
            skinned_positions: Vec::new(),
            skinned_normals: Vec::new(),
        }
    }

    pub fn with_max_palette_size(mut self, max_palette_size: usize) -> Self {
        self.max_palette_size = max_palette_size;
        self
    }

    pub fn max_palette_size(&self) -> usize {
        self.max_palette_size
    }

    /// 按当前模式应用蒙皮矩阵
    pub fn apply(&mut self, skin_matrices: &[Mat4]) {
        match self.mode {
            SkinningMode::Gpu => {
                if skin_matrices.len() > self.max_palette_size {
                    tracing::warn!(
                        target: "animation",
                        joints = skin_matrices.len(),
                        max = self.max_palette_size,
                        "Palette exceeds GPU capacity, extra joints are dropped"
                    );
                }
                let count = skin_matrices.len().min(self.max_palette_size);
                self.palette = gpu_palette(&skin_matrices[..count]);
            }
            SkinningMode::Cpu => self.cpu_skin(skin_matrices),
        }
    }

    /// CPU 蒙皮
    pub fn cpu_skin(&mut self, skin_matrices: &[Mat4]) {
        self.skinned_positions.clear();
        self.skinned_normals.clear();
        for vertex in &self.vertices {
            let (position, normal) = skin_vertex(vertex, skin_matrices);
            self.skinned_positions.push(position);
            self.skinned_normals.push(normal);
        }
    }

    /// 最近一次 GPU 路径准备的调色板
    pub fn palette(&self) -> &[[[f32; 4]; 4]] {
        &self.palette
    }

    /// 调色板的原始字节，可直接写入统一缓冲区
    pub fn palette_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.palette)
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn skinned_positions(&self) -> &[Vec3] {
        &self.skinned_positions
    }

    pub fn skinned_normals(&self) -> &[Vec3] {
        &self.skinned_normals
    }
}

/// 转换为可上传的列主序矩阵数组
pub fn gpu_palette(skin_matrices: &[Mat4]) -> Vec<[[f32; 4]; 4]> {
    skin_matrices.iter().map(Mat4::to_cols_array_2d).collect()
}
