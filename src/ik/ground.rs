//! 地面查询
//!
//! 脚部贴地时从踝关节上方向下探测地面。

use bevy_ecs::prelude::*;
use glam::Vec3;

/// 地面命中结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHit {
    /// 命中点（世界空间）
    pub point: Vec3,
    /// 朝上的单位法线
    pub normal: Vec3,
    /// 探测起点到命中点的距离
    pub distance: f32,
}

/// 向下探测地面
pub trait GroundQuery {
    /// 从 `origin` 沿 -Y 探测，超过 `max_distance` 视为未命中
    fn probe_down(&self, origin: Vec3, max_distance: f32) -> Option<GroundHit>;
}

impl<T: GroundQuery + ?Sized> GroundQuery for &T {
    fn probe_down(&self, origin: Vec3, max_distance: f32) -> Option<GroundHit> {
        (**self).probe_down(origin, max_distance)
    }
}

/// 水平地面
#[derive(Resource, Debug, Clone, Copy, PartialEq, Default)]
pub struct FlatGround {
    pub height: f32,
}

impl FlatGround {
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl GroundQuery for FlatGround {
    fn probe_down(&self, origin: Vec3, max_distance: f32) -> Option<GroundHit> {
        let distance = origin.y - self.height;
        if !(0.0..=max_distance).contains(&distance) {
            return None;
        }
        Some(GroundHit {
            point: Vec3::new(origin.x, self.height, origin.z),
            normal: Vec3::Y,
            distance,
        })
    }
}

// ============================================================================
// 高度图
// ============================================================================

/// 规则网格高度图
///
/// 采样点 `(i, j)` 位于 `origin + (i * cell_size, 0, j * cell_size)`，高度按行优先存储。
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct Heightfield {
    origin: Vec3,
    cell_size: f32,
    width: usize,
    depth: usize,
    heights: Vec<f32>,
}

impl Heightfield {
    /// 创建高度图；高度数量不足时补 0
    pub fn new(origin: Vec3, cell_size: f32, width: usize, depth: usize, mut heights: Vec<f32>) -> Self {
        heights.resize(width * depth, 0.0);
        Self {
            origin,
            cell_size: cell_size.max(f32::EPSILON),
            width,
            depth,
            heights,
        }
    }

    /// 由函数生成高度
    pub fn from_fn(
        origin: Vec3,
        cell_size: f32,
        width: usize,
        depth: usize,
        height: impl Fn(f32, f32) -> f32,
    ) -> Self {
        let heights = (0..depth)
            .flat_map(|j| (0..width).map(move |i| (i, j)))
            .map(|(i, j)| {
                let x = origin.x + i as f32 * cell_size;
                let z = origin.z + j as f32 * cell_size;
                origin.y + height(x, z)
            })
            .collect();
        Self::new(origin, cell_size, width, depth, heights)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// 采样点高度
    pub fn height(&self, i: usize, j: usize) -> Option<f32> {
        if i < self.width && j < self.depth {
            Some(self.heights[j * self.width + i])
        } else {
            None
        }
    }

    pub fn set_height(&mut self, i: usize, j: usize, height: f32) {
        if i < self.width && j < self.depth {
            self.heights[j * self.width + i] = height;
        }
    }

    /// 世界坐标 `(x, z)` 处的双线性插值高度；超出网格返回 `None`
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        let (gx, gz) = self.grid_coords(x, z)?;

        let i0 = gx.floor() as usize;
        let j0 = gz.floor() as usize;
        let i1 = (i0 + 1).min(self.width - 1);
        let j1 = (j0 + 1).min(self.depth - 1);
        let fx = gx - i0 as f32;
        let fz = gz - j0 as f32;

        let h00 = self.heights[j0 * self.width + i0];
        let h10 = self.heights[j0 * self.width + i1];
        let h01 = self.heights[j1 * self.width + i0];
        let h11 = self.heights[j1 * self.width + i1];

        let h0 = h00 * (1.0 - fx) + h10 * fx;
        let h1 = h01 * (1.0 - fx) + h11 * fx;
        Some(h0 * (1.0 - fz) + h1 * fz)
    }

    /// 中心差分法线
    pub fn normal_at(&self, x: f32, z: f32) -> Option<Vec3> {
        let center = self.height_at(x, z)?;
        let step = self.cell_size * 0.5;
        let sample = |dx: f32, dz: f32| self.height_at(x + dx, z + dz).unwrap_or(center);

        let slope_x = (sample(step, 0.0) - sample(-step, 0.0)) / (2.0 * step);
        let slope_z = (sample(0.0, step) - sample(0.0, -step)) / (2.0 * step);
        Some(Vec3::new(-slope_x, 1.0, -slope_z).normalize())
    }

    fn grid_coords(&self, x: f32, z: f32) -> Option<(f32, f32)> {
        if self.width == 0 || self.depth == 0 {
            return None;
        }
        let gx = (x - self.origin.x) / self.cell_size;
        let gz = (z - self.origin.z) / self.cell_size;
        let max_x = (self.width - 1) as f32;
        let max_z = (self.depth - 1) as f32;
        if gx < 0.0 || gz < 0.0 || gx > max_x || gz > max_z {
            return None;
        }
        Some((gx, gz))
    }
}

impl GroundQuery for Heightfield {
    fn probe_down(&self, origin: Vec3, max_distance: f32) -> Option<GroundHit> {
        let height = self.height_at(origin.x, origin.z)?;
        let distance = origin.y - height;
        if !(0.0..=max_distance).contains(&distance) {
            return None;
        }
        Some(GroundHit {
            point: Vec3::new(origin.x, height, origin.z),
            normal: self.normal_at(origin.x, origin.z).unwrap_or(Vec3::Y),
            distance,
        })
    }
}

// ============================================================================
// 三角形地面
// ============================================================================

/// 三角形集合构成的地面
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct TriangleGround {
    triangles: Vec<[Vec3; 3]>,
}

impl TriangleGround {
    pub fn new(triangles: Vec<[Vec3; 3]>) -> Self {
        Self { triangles }
    }

    /// 由顶点与三角形索引构建；越界索引的三角形被跳过
    pub fn from_indexed(vertices: &[Vec3], indices: &[u32]) -> Self {
        let triangles = indices
            .chunks_exact(3)
            .filter_map(|tri| {
                Some([
                    *vertices.get(tri[0] as usize)?,
                    *vertices.get(tri[1] as usize)?,
                    *vertices.get(tri[2] as usize)?,
                ])
            })
            .collect();
        Self { triangles }
    }

    pub fn triangles(&self) -> &[[Vec3; 3]] {
        &self.triangles
    }

    pub fn push(&mut self, triangle: [Vec3; 3]) {
        self.triangles.push(triangle);
    }
}

impl GroundQuery for TriangleGround {
    fn probe_down(&self, origin: Vec3, max_distance: f32) -> Option<GroundHit> {
        let direction = Vec3::NEG_Y;
        self.triangles
            .iter()
            .filter_map(|&[v0, v1, v2]| {
                let distance = ray_triangle(origin, direction, v0, v1, v2)?;
                (distance <= max_distance).then(|| {
                    let mut normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
                    if normal.y < 0.0 {
                        normal = -normal;
                    }
                    GroundHit {
                        point: origin + direction * distance,
                        normal,
                        distance,
                    }
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Möller–Trumbore 射线三角形相交（双面），返回沿射线的距离
fn ray_triangle(origin: Vec3, direction: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-7;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t >= 0.0).then_some(t)
}
