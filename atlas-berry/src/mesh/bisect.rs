//! 平面切割.

use std::collections::HashMap;

use itertools::Itertools;
use log::debug;

use super::{fill, geom, SurfaceMesh};
use crate::Vec3;

/// 切割平面. 法向所指的一侧为外侧, 切割后被删除.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    /// 平面上一点.
    pub origin: Vec3,

    /// 单位法向.
    pub normal: Vec3,
}

impl Plane {
    /// 创建平面, 法向会被单位化.
    #[inline]
    pub fn new(origin: Vec3, normal: Vec3) -> Self {
        Self {
            origin,
            normal: geom::normalize_or_zero(normal),
        }
    }

    /// 场景坐标下的正中矢状面. `ml_extent` 为内外侧方向的物理长度
    /// (`shape[2] * resolution[2]`).
    ///
    /// 场景的 y 轴是 OBJ 内外侧坐标取负, 平面位于 `y = -ml_extent / 2`,
    /// 法向 `-y`, 保留内外侧坐标小于一半的那一侧, 与左半球掩码一致.
    #[inline]
    pub fn midline(ml_extent: f64) -> Self {
        Self::new([0.0, -ml_extent / 2.0, 0.0], [0.0, -1.0, 0.0])
    }

    /// 有向距离. 正值位于外侧.
    #[inline]
    pub fn signed_distance(&self, p: Vec3) -> f64 {
        geom::dot(geom::sub(p, self.origin), self.normal)
    }
}

/// 切割的统计信息.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BisectStats {
    /// 完整保留的面.
    pub kept: usize,

    /// 被平面截断的面.
    pub cut: usize,

    /// 被删除的面.
    pub removed: usize,

    /// 补面新增的三角形.
    pub cap: usize,
}

/// 沿 `plane` 切割网格, 删除外侧部分. `fill` 为真时为切口补面.
///
/// 距平面小于包围盒对角线 `1e-9` 倍的顶点视为在平面上.
/// 切割后未被引用的顶点会被删除.
pub fn bisect(mesh: &mut SurfaceMesh, plane: &Plane, fill: bool) -> BisectStats {
    let mut stats = BisectStats::default();
    let Some((lo, hi)) = mesh.bounds() else {
        return stats;
    };
    let eps = geom::norm(geom::sub(hi, lo)) * 1e-9;

    let mut positions = mesh.positions().to_vec();
    let mut dist: Vec<f64> = positions
        .iter()
        .map(|&p| {
            let d = plane.signed_distance(p);
            if d.abs() <= eps {
                0.0
            } else {
                d
            }
        })
        .collect();

    // 无向边 -> 交点. 相邻面共享同一个交点.
    let mut cache: HashMap<(u32, u32), u32> = HashMap::new();
    let mut faces = Vec::with_capacity(mesh.face_len());
    for face in mesh.faces() {
        if face.iter().all(|&v| dist[v as usize] <= 0.0) {
            faces.push(face.clone());
            stats.kept += 1;
            continue;
        }
        if face.iter().all(|&v| dist[v as usize] >= 0.0) {
            stats.removed += 1;
            continue;
        }

        let mut clipped = Vec::with_capacity(face.len() + 1);
        for (&a, &b) in face.iter().circular_tuple_windows() {
            let (da, db) = (dist[a as usize], dist[b as usize]);
            if da <= 0.0 {
                clipped.push(a);
            }
            if (da < 0.0 && db > 0.0) || (da > 0.0 && db < 0.0) {
                let key = if a < b { (a, b) } else { (b, a) };
                let v = *cache.entry(key).or_insert_with(|| {
                    let (p, q) = key;
                    let (dp, dq) = (dist[p as usize], dist[q as usize]);
                    let t = dp / (dp - dq);
                    positions.push(geom::lerp(positions[p as usize], positions[q as usize], t));
                    dist.push(0.0);
                    (positions.len() - 1) as u32
                });
                clipped.push(v);
            }
        }
        clipped.dedup();
        if clipped.len() >= 3 {
            faces.push(clipped);
            stats.cut += 1;
        } else {
            stats.removed += 1;
        }
    }

    if fill {
        let on_plane: Vec<bool> = dist.iter().map(|d| *d == 0.0).collect();
        let cap = fill::cap_faces(&positions, &faces, &on_plane, plane.normal);
        stats.cap = cap.len();
        faces.extend(cap);
    }

    // 所有索引都来自 `positions`, 面的顶点数至少为 3.
    *mesh = SurfaceMesh { positions, faces };
    mesh.compact();
    debug!("bisect: {stats:?}");
    stats
}

#[cfg(test)]
mod tests {
    use super::{bisect, Plane};
    use crate::mesh::normals::make_consistent;
    use crate::mesh::shapes::cube;
    use itertools::Itertools;
    use std::collections::HashSet;

    fn is_closed(mesh: &crate::mesh::SurfaceMesh) -> bool {
        let edges: HashSet<(u32, u32)> = mesh
            .faces()
            .iter()
            .flat_map(|f| f.iter().copied().circular_tuple_windows())
            .collect();
        edges.iter().all(|&(a, b)| edges.contains(&(b, a)))
    }

    #[test]
    fn test_midline_plane() {
        let p = Plane::midline(10.0);
        assert_eq!(p.origin, [0.0, -5.0, 0.0]);
        assert_eq!(p.normal, [0.0, -1.0, 0.0]);
        // 内外侧坐标 2 (场景 y = -2) 在保留一侧.
        assert!(p.signed_distance([0.0, -2.0, 0.0]) < 0.0);
        assert!(p.signed_distance([0.0, -8.0, 0.0]) > 0.0);
    }

    #[test]
    fn test_cut_cube_in_half() {
        // 场景 y 范围 [-10, 0], 切在 y = -5, 删除 y < -5 的部分.
        let mut m = cube([0.0, -10.0, 0.0], 10.0);
        let stats = bisect(&mut m, &Plane::midline(10.0), true);
        assert_eq!(stats.kept, 1);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.cut, 4);
        assert_eq!(stats.cap, 2);

        let (lo, hi) = m.bounds().unwrap();
        assert_eq!(lo, [0.0, -5.0, 0.0]);
        assert_eq!(hi, [10.0, 0.0, 10.0]);
        assert_eq!(m.vertex_len(), 8);
        assert!(is_closed(&m));
        assert!((m.signed_volume() - 500.0).abs() < 1e-6);

        // 切口补面的朝向已经与其余面一致.
        assert_eq!(make_consistent(&mut m), 0);
    }

    #[test]
    fn test_without_fill_leaves_opening() {
        let mut m = cube([0.0, -10.0, 0.0], 10.0);
        let stats = bisect(&mut m, &Plane::midline(10.0), false);
        assert_eq!(stats.cap, 0);
        assert!(!is_closed(&m));
    }

    #[test]
    fn test_entirely_on_one_side() {
        let mut kept = cube([0.0, -4.0, 0.0], 4.0);
        let before = kept.clone();
        let stats = bisect(&mut kept, &Plane::midline(10.0), true);
        assert_eq!(stats.kept, 6);
        assert_eq!(stats.cap, 0);
        assert_eq!(kept, before);

        let mut gone = cube([0.0, -20.0, 0.0], 4.0);
        let stats = bisect(&mut gone, &Plane::midline(10.0), true);
        assert_eq!(stats.removed, 6);
        assert!(gone.is_empty());
        assert_eq!(gone.vertex_len(), 0);
    }

    #[test]
    fn test_triangulated_cut_shares_vertices() {
        let mut m = cube([0.0, -10.0, 0.0], 10.0);
        m.triangulate();
        bisect(&mut m, &Plane::midline(10.0), true);
        m.triangulate();
        assert!(m.is_triangulated());
        assert!(is_closed(&m));
        assert!((m.signed_volume() - 500.0).abs() < 1e-6);
    }
}
