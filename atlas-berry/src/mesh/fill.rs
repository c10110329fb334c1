//! 切口补面.
//!
//! 切割后, 两端都落在切割平面上且没有反向配对的有向边构成切口边界.
//! 把这些边反向后首尾相连得到若干闭合环, 投影到平面上:
//! 面积为正的是外环, 为负的是洞. 洞通过桥接并入所属外环,
//! 最后用耳切法三角化. 新面的法向与平面法向一致.

use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use log::warn;

use super::geom;
use crate::Vec3;

type Point = [f64; 2];
type Ring = Vec<(u32, Point)>;

/// 平面内的一组正交基 `(u, v)`, 满足 `u × v = normal`.
fn basis(normal: Vec3) -> (Vec3, Vec3) {
    let n = geom::normalize_or_zero(normal);
    let helper = if n[0].abs() <= n[1].abs() && n[0].abs() <= n[2].abs() {
        [1.0, 0.0, 0.0]
    } else if n[1].abs() <= n[2].abs() {
        [0.0, 1.0, 0.0]
    } else {
        [0.0, 0.0, 1.0]
    };
    let u = geom::normalize_or_zero(geom::cross(helper, n));
    let v = geom::cross(n, u);
    (u, v)
}

#[inline]
fn orient(a: Point, b: Point, c: Point) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn area(ring: &[(u32, Point)]) -> f64 {
    ring.iter()
        .circular_tuple_windows()
        .map(|((_, p), (_, q))| p[0] * q[1] - q[0] * p[1])
        .sum::<f64>()
        / 2.0
}

fn contains(ring: &[(u32, Point)], p: Point) -> bool {
    let mut inside = false;
    for ((_, a), (_, b)) in ring.iter().circular_tuple_windows() {
        if (a[1] > p[1]) != (b[1] > p[1]) {
            let x = a[0] + (p[1] - a[1]) / (b[1] - a[1]) * (b[0] - a[0]);
            if p[0] < x {
                inside = !inside;
            }
        }
    }
    inside
}

/// 线段 `pq` 与 `rs` 是否在内部相交 (不含端点接触).
fn crosses(p: Point, q: Point, r: Point, s: Point) -> bool {
    let d1 = orient(p, q, r);
    let d2 = orient(p, q, s);
    let d3 = orient(r, s, p);
    let d4 = orient(r, s, q);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// 为开口补面. `on_plane[v]` 标记顶点 `v` 是否在切割平面上.
///
/// 返回新增的三角形, 顶点顺序使其法向与 `normal` 同向.
pub(crate) fn cap_faces(
    positions: &[Vec3],
    faces: &[Vec<u32>],
    on_plane: &[bool],
    normal: Vec3,
) -> Vec<Vec<u32>> {
    let directed: HashSet<(u32, u32)> = faces
        .iter()
        .flat_map(|f| f.iter().copied().circular_tuple_windows())
        .collect();

    // 反向后的边界边: next[b] 含 a.
    let mut next: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    let mut n_edges = 0;
    for &(a, b) in directed.iter() {
        if on_plane[a as usize] && on_plane[b as usize] && !directed.contains(&(b, a)) {
            next.entry(b).or_default().push(a);
            n_edges += 1;
        }
    }
    if n_edges == 0 {
        return Vec::new();
    }
    for targets in next.values_mut() {
        targets.sort_unstable();
    }

    let (u, v) = basis(normal);
    let project = |i: u32| -> (u32, Point) {
        let p = positions[i as usize];
        (i, [geom::dot(p, u), geom::dot(p, v)])
    };

    let (mut outers, mut holes): (Vec<Ring>, Vec<Ring>) = (Vec::new(), Vec::new());
    let mut broken = 0;
    while let Some(start) = next.first_key_value().map(|(&k, _)| k) {
        let mut ring = vec![start];
        let mut cur = start;
        let closed = loop {
            let Some(to) = next.get_mut(&cur).and_then(|t| t.pop()) else {
                break false;
            };
            if next.get(&cur).is_some_and(|t| t.is_empty()) {
                next.remove(&cur);
            }
            if to == start {
                break true;
            }
            ring.push(to);
            cur = to;
            if ring.len() > n_edges {
                break false;
            }
        };
        if !closed || ring.len() < 3 {
            broken += 1;
            continue;
        }

        let ring: Ring = ring.into_iter().map(project).collect();
        let a = area(&ring);
        if a > 0.0 {
            outers.push(ring);
        } else if a < 0.0 {
            holes.push(ring);
        }
    }
    if broken > 0 {
        warn!("cap: {broken} open boundary chain(s) on the cut plane left unfilled");
    }

    // 洞归属于包含它的面积最小的外环.
    let mut assigned: Vec<Vec<Ring>> = vec![Vec::new(); outers.len()];
    for hole in holes {
        let inner = hole[0].1;
        let owner = outers
            .iter()
            .enumerate()
            .filter(|(_, o)| contains(o, inner))
            .min_by(|(_, a), (_, b)| area(a).total_cmp(&area(b)))
            .map(|(i, _)| i);
        match owner {
            Some(i) => assigned[i].push(hole),
            None => warn!("cap: hole with {} vertices lies outside every outline", hole.len()),
        }
    }

    let mut triangles = Vec::new();
    for (outer, holes) in outers.into_iter().zip(assigned) {
        let ring = bridge_holes(outer, holes);
        triangles.extend(ear_clip(&ring).into_iter().map(|t| t.to_vec()));
    }
    triangles
}

/// 按最右顶点从右到左, 依次把洞通过一条可见的桥接边并入外环.
fn bridge_holes(mut outer: Ring, mut holes: Vec<Ring>) -> Ring {
    let rightmost = |ring: &Ring| -> (usize, f64) {
        ring.iter()
            .enumerate()
            .map(|(i, (_, p))| (i, p[0]))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((0, f64::NEG_INFINITY))
    };
    holes.sort_by(|a, b| rightmost(b).1.total_cmp(&rightmost(a).1));

    for hole in holes.iter() {
        let (m, _) = rightmost(hole);
        let pm = hole[m].1;

        let visible = |p: Point| -> bool {
            let blocked = |ring: &Ring| {
                ring.iter().circular_tuple_windows().any(|((_, r), (_, s))| {
                    *r != p && *s != p && *r != pm && *s != pm && crosses(pm, p, *r, *s)
                })
            };
            !blocked(&outer) && !holes.iter().any(|h| blocked(h))
        };
        let dist = |p: Point| (p[0] - pm[0]).powi(2) + (p[1] - pm[1]).powi(2);
        let mut candidates: Vec<usize> = (0..outer.len()).collect();
        candidates.sort_by(|&a, &b| dist(outer[a].1).total_cmp(&dist(outer[b].1)));
        let i = candidates
            .iter()
            .copied()
            .find(|&i| visible(outer[i].1))
            .unwrap_or(candidates[0]);

        let mut merged = Vec::with_capacity(outer.len() + hole.len() + 2);
        merged.extend_from_slice(&outer[..=i]);
        merged.extend_from_slice(&hole[m..]);
        merged.extend_from_slice(&hole[..=m]);
        merged.push(outer[i]);
        merged.extend_from_slice(&outer[i + 1..]);
        outer = merged;
    }
    outer
}

/// 耳切法三角化逆时针的简单多边形. 找不到耳时退化为扇形.
fn ear_clip(ring: &[(u32, Point)]) -> Vec<[u32; 3]> {
    let extent = ring
        .iter()
        .flat_map(|(_, p)| p.iter().map(|c| c.abs()))
        .fold(0.0, f64::max)
        .max(1.0);
    let eps = extent * extent * 1e-12;

    let mut idx: Vec<usize> = (0..ring.len()).collect();
    let mut triangles = Vec::with_capacity(ring.len().saturating_sub(2));
    let mut i = 0;
    let mut misses = 0;
    while idx.len() > 3 {
        let m = idx.len();
        let (a, b, c) = (idx[(i + m - 1) % m], idx[i], idx[(i + 1) % m]);
        let (pa, pb, pc) = (ring[a].1, ring[b].1, ring[c].1);

        let convex = orient(pa, pb, pc) > eps;
        let is_ear = convex
            && idx.iter().all(|&k| {
                let p = ring[k].1;
                if p == pa || p == pb || p == pc {
                    return true;
                }
                !(orient(pa, pb, p) >= 0.0 && orient(pb, pc, p) >= 0.0 && orient(pc, pa, p) >= 0.0)
            });

        if is_ear {
            triangles.push([ring[a].0, ring[b].0, ring[c].0]);
            idx.remove(i);
            i %= idx.len();
            misses = 0;
        } else {
            i = (i + 1) % m;
            misses += 1;
            if misses >= m {
                warn!("cap: no ear among {m} vertices, falling back to a fan");
                let first = ring[idx[0]].0;
                triangles.extend(
                    idx[1..]
                        .iter()
                        .tuple_windows()
                        .map(|(&b, &c)| [first, ring[b].0, ring[c].0]),
                );
                return triangles;
            }
        }
    }
    if idx.len() == 3 {
        triangles.push([ring[idx[0]].0, ring[idx[1]].0, ring[idx[2]].0]);
    }
    triangles
}
