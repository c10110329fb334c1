//! 表面网格编辑.
//!
//! 只实现转换流程需要的操作: OBJ 读写, 法向一致化, 拉普拉斯平滑,
//! 平面切割与补面, 三角化. 网格在 [`Scene`] 中以作用域对象的形式被编辑.

use std::path::PathBuf;

use itertools::Itertools;
use thiserror::Error;

use crate::error::PathIoError;
use crate::Vec3;

mod bisect;
mod fill;
mod geom;
mod normals;
pub mod obj;
mod scene;
mod smooth;

pub use bisect::{bisect, BisectStats, Plane};
pub use normals::make_consistent;
pub use obj::ExportOptions;
pub use scene::{obj_to_scene, scene_to_obj, ObjectId, Scene, ScopedObject};
pub use smooth::smooth;

/// 单个网格处理错误. 只影响当前网格, 不影响其他网格.
#[derive(Debug, Error)]
pub enum MeshError {
    /// 解析 OBJ 文件失败.
    #[error("cannot load `{}`: {source}", .path.display())]
    Load {
        /// 文件路径.
        path: PathBuf,

        /// 解析错误.
        #[source]
        source: tobj::LoadError,
    },

    /// 底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] PathIoError),

    /// 文件中没有任何面.
    #[error("`{}` contains no faces", .0.display())]
    Empty(PathBuf),

    /// 面引用了不存在的顶点.
    #[error("face references vertex {index}, but the mesh has {len} vertices")]
    BadIndex {
        /// 越界索引.
        index: u32,

        /// 顶点个数.
        len: usize,
    },

    /// 面的顶点数少于 3.
    #[error("face {0} has fewer than three vertices")]
    DegenerateFace(usize),
}

/// 多边形表面网格. 面的顶点按逆时针排列时, 面法向朝外.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceMesh {
    positions: Vec<Vec3>,
    faces: Vec<Vec<u32>>,
}

impl SurfaceMesh {
    /// 创建网格. 面引用越界或顶点数少于 3 时返回 `Err`.
    pub fn new(positions: Vec<Vec3>, faces: Vec<Vec<u32>>) -> Result<Self, MeshError> {
        let len = positions.len();
        for (i, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(MeshError::DegenerateFace(i));
            }
            if let Some(&index) = face.iter().find(|&&v| v as usize >= len) {
                return Err(MeshError::BadIndex { index, len });
            }
        }
        Ok(Self { positions, faces })
    }

    /// 顶点坐标.
    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// 可变顶点坐标.
    #[inline]
    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        &mut self.positions
    }

    /// 面.
    #[inline]
    pub fn faces(&self) -> &[Vec<u32>] {
        &self.faces
    }

    #[inline]
    pub(crate) fn faces_mut(&mut self) -> &mut [Vec<u32>] {
        &mut self.faces
    }

    /// 顶点个数.
    #[inline]
    pub fn vertex_len(&self) -> usize {
        self.positions.len()
    }

    /// 面个数.
    #[inline]
    pub fn face_len(&self) -> usize {
        self.faces.len()
    }

    /// 是否不含任何面.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// 是否所有面都是三角形.
    #[inline]
    pub fn is_triangulated(&self) -> bool {
        self.faces.iter().all(|f| f.len() == 3)
    }

    /// 对每个顶点施加坐标变换.
    pub fn map_positions<F: FnMut(Vec3) -> Vec3>(&mut self, mut f: F) {
        for p in self.positions.iter_mut() {
            *p = f(*p);
        }
    }

    /// 以扇形方式把多边形拆成三角形. 保持原有的顶点顺序 (朝向).
    pub fn triangulate(&mut self) {
        if self.is_triangulated() {
            return;
        }
        let mut faces = Vec::with_capacity(self.faces.len() * 2);
        for face in self.faces.drain(..) {
            let first = face[0];
            faces.extend(
                face[1..]
                    .iter()
                    .tuple_windows()
                    .map(|(&b, &c)| vec![first, b, c]),
            );
        }
        self.faces = faces;
    }

    /// 面法向 (Newell 方法), 未归一化, 长度为面积的两倍.
    pub fn face_normal(&self, face: &[u32]) -> Vec3 {
        let mut n = [0.0; 3];
        for (a, b) in face.iter().circular_tuple_windows() {
            let (p, q) = (self.positions[*a as usize], self.positions[*b as usize]);
            n[0] += (p[1] - q[1]) * (p[2] + q[2]);
            n[1] += (p[2] - q[2]) * (p[0] + q[0]);
            n[2] += (p[0] - q[0]) * (p[1] + q[1]);
        }
        n
    }

    /// 面积加权的顶点法向, 已归一化. 不属于任何面的顶点法向为零向量.
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![[0.0; 3]; self.positions.len()];
        for face in self.faces.iter() {
            let n = self.face_normal(face);
            for &v in face {
                normals[v as usize] = geom::add(normals[v as usize], n);
            }
        }
        normals.into_iter().map(geom::normalize_or_zero).collect()
    }

    /// 以 `faces` 中各面所围成的有向体积. 面朝外的闭合网格体积为正.
    pub fn signed_volume_of(&self, faces: &[usize]) -> f64 {
        // 以所涉顶点的重心为参考点, 降低远离原点时的舍入误差.
        let used: Vec<u32> = faces
            .iter()
            .flat_map(|&f| self.faces[f].iter().copied())
            .unique()
            .collect();
        if used.is_empty() {
            return 0.0;
        }
        let c = geom::scale(
            used.iter()
                .fold([0.0; 3], |acc, &v| geom::add(acc, self.positions[v as usize])),
            1.0 / used.len() as f64,
        );

        let mut volume = 0.0;
        for &f in faces {
            let face = &self.faces[f];
            let p0 = geom::sub(self.positions[face[0] as usize], c);
            for (&b, &d) in face[1..].iter().tuple_windows() {
                let p1 = geom::sub(self.positions[b as usize], c);
                let p2 = geom::sub(self.positions[d as usize], c);
                volume += geom::dot(p0, geom::cross(p1, p2));
            }
        }
        volume / 6.0
    }

    /// 整个网格的有向体积.
    #[inline]
    pub fn signed_volume(&self) -> f64 {
        let all: Vec<usize> = (0..self.faces.len()).collect();
        self.signed_volume_of(&all)
    }

    /// 每个顶点通过边相连的邻居, 已去重.
    pub fn vertex_neighbours(&self) -> Vec<Vec<u32>> {
        let mut ans = vec![Vec::new(); self.positions.len()];
        for face in self.faces.iter() {
            for (&a, &b) in face.iter().circular_tuple_windows() {
                ans[a as usize].push(b);
                ans[b as usize].push(a);
            }
        }
        for nb in ans.iter_mut() {
            nb.sort_unstable();
            nb.dedup();
        }
        ans
    }

    /// 包围盒 `(min, max)`. 没有顶点时返回 `None`.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(lo, hi), p| {
            (
                [lo[0].min(p[0]), lo[1].min(p[1]), lo[2].min(p[2])],
                [hi[0].max(p[0]), hi[1].max(p[1]), hi[2].max(p[2])],
            )
        }))
    }

    /// 删除未被任何面引用的顶点, 其余顶点保持原有的相对顺序.
    pub(crate) fn compact(&mut self) {
        let mut used = vec![false; self.positions.len()];
        for &v in self.faces.iter().flatten() {
            used[v as usize] = true;
        }
        let mut remap = vec![u32::MAX; self.positions.len()];
        let mut positions = Vec::with_capacity(self.positions.len());
        for (i, p) in self.positions.iter().enumerate() {
            if used[i] {
                remap[i] = positions.len() as u32;
                positions.push(*p);
            }
        }
        for v in self.faces.iter_mut().flatten() {
            *v = remap[*v as usize];
        }
        self.positions = positions;
    }
}
