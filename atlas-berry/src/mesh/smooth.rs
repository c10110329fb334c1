use log::debug;

use super::{geom, SurfaceMesh};

/// 拉普拉斯平滑. 每轮将每个顶点向其边邻居的平均位置移动 `factor` 倍的距离.
///
/// 各轮内所有顶点同时更新. 孤立顶点保持不动.
pub fn smooth(mesh: &mut SurfaceMesh, factor: f64, iterations: usize) {
    let neighbours = mesh.vertex_neighbours();
    for _ in 0..iterations {
        let old = mesh.positions().to_vec();
        for (i, p) in mesh.positions_mut().iter_mut().enumerate() {
            let nb = &neighbours[i];
            if nb.is_empty() {
                continue;
            }
            let sum = nb
                .iter()
                .fold([0.0; 3], |acc, &j| geom::add(acc, old[j as usize]));
            let mean = geom::scale(sum, 1.0 / nb.len() as f64);
            *p = geom::lerp(old[i], mean, factor);
        }
    }
    debug!(
        "smoothed {} vertices, factor {factor}, {iterations} iteration(s)",
        mesh.vertex_len()
    );
}

#[cfg(test)]
mod tests {
    use super::smooth;
    use crate::mesh::shapes::cube;

    fn close(a: [f64; 3], b: [f64; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-12)
    }

    #[test]
    fn test_one_iteration() {
        let mut m = cube([0.0; 3], 1.0);
        smooth(&mut m, 1.0, 1);
        // 顶点 0 的邻居为 (1,0,0), (0,1,0), (0,0,1).
        let t = 1.0 / 3.0;
        assert!(close(m.positions()[0], [t, t, t]));
        assert!(close(m.positions()[7], [1.0 - t, 1.0 - t, 1.0 - t]));
    }

    #[test]
    fn test_shrinks_about_center() {
        let mut m = cube([-1.0; 3], 2.0);
        let before = m.bounds().unwrap();
        smooth(&mut m, 1.0, 5);
        let (lo, hi) = m.bounds().unwrap();
        assert!(lo[0] > before.0[0] && hi[0] < before.1[0]);

        let n = m.vertex_len() as f64;
        let center = m
            .positions()
            .iter()
            .fold([0.0; 3], |acc, p| [acc[0] + p[0], acc[1] + p[1], acc[2] + p[2]]);
        assert!(close(center.map(|c| c / n), [0.0; 3]));
    }

    #[test]
    fn test_zero_factor_is_identity() {
        let mut m = cube([0.0; 3], 1.0);
        let before = m.clone();
        smooth(&mut m, 0.0, 3);
        assert_eq!(m, before);
    }
}
