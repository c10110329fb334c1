//! 法向一致化.
//!
//! 先在每个连通分量内沿公共边传播, 使相邻面以相反方向经过公共边;
//! 再按分量的有向体积决定整体是否翻转, 使法向朝外.

use std::collections::{HashMap, VecDeque};

use itertools::Itertools;
use log::debug;

use super::SurfaceMesh;

#[inline]
fn undirected(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// 统一面的朝向并使其朝外. 返回被翻转的面数.
///
/// 非流形边 (被多于两个面共享) 上的传播以先到者为准.
pub fn make_consistent(mesh: &mut SurfaceMesh) -> usize {
    let (flip, components) = {
        let faces = mesh.faces();
        let mut edges: HashMap<(u32, u32), Vec<(usize, (u32, u32))>> = HashMap::new();
        for (f, face) in faces.iter().enumerate() {
            for (&a, &b) in face.iter().circular_tuple_windows() {
                edges.entry(undirected(a, b)).or_default().push((f, (a, b)));
            }
        }

        let mut flip = vec![false; faces.len()];
        let mut visited = vec![false; faces.len()];
        let mut components = Vec::new();
        for seed in 0..faces.len() {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;
            let mut component = Vec::new();
            let mut queue = VecDeque::from([seed]);
            while let Some(f) = queue.pop_front() {
                component.push(f);
                for (&a, &b) in faces[f].iter().circular_tuple_windows() {
                    // f 翻转后实际经过公共边的方向.
                    let along = if flip[f] { (b, a) } else { (a, b) };
                    for &(g, dir) in edges[&undirected(a, b)].iter() {
                        if visited[g] {
                            continue;
                        }
                        visited[g] = true;
                        flip[g] = dir == along;
                        queue.push_back(g);
                    }
                }
            }
            components.push(component);
        }
        (flip, components)
    };

    let mut flipped = 0;
    let n_components = components.len();
    for component in components {
        for &f in component.iter() {
            if flip[f] {
                mesh.faces_mut()[f].reverse();
            }
        }
        let outward = mesh.signed_volume_of(&component) >= 0.0;
        flipped += component
            .iter()
            .filter(|&&f| flip[f] == outward)
            .count();
        if !outward {
            for &f in component.iter() {
                mesh.faces_mut()[f].reverse();
            }
        }
    }
    debug!("normals: {n_components} component(s), {flipped} face(s) flipped");
    flipped
}

#[cfg(test)]
mod tests {
    use super::make_consistent;
    use crate::mesh::shapes::cube;
    use crate::mesh::SurfaceMesh;
    use itertools::Itertools;
    use std::collections::HashSet;

    /// 每条有向边恰好出现一次, 说明相邻面朝向一致.
    fn is_consistent(mesh: &SurfaceMesh) -> bool {
        let mut seen = HashSet::new();
        mesh.faces()
            .iter()
            .flat_map(|f| f.iter().copied().circular_tuple_windows())
            .all(|e: (u32, u32)| seen.insert(e))
    }

    #[test]
    fn test_already_consistent() {
        let mut m = cube([0.0; 3], 1.0);
        let before = m.clone();
        assert_eq!(make_consistent(&mut m), 0);
        assert_eq!(m, before);
    }

    #[test]
    fn test_mixed_orientation() {
        let mut m = cube([0.0; 3], 1.0);
        m.triangulate();
        m.faces_mut()[1].reverse();
        m.faces_mut()[6].reverse();
        m.faces_mut()[11].reverse();
        assert!(!is_consistent(&m));

        assert_eq!(make_consistent(&mut m), 3);
        assert!(is_consistent(&m));
        assert!((m.signed_volume() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_inward_component_flipped() {
        let mut inward = cube([0.0; 3], 1.0);
        for f in inward.faces_mut() {
            f.reverse();
        }
        assert!(inward.signed_volume() < 0.0);

        // 两个互不相连的立方体: 一个朝内, 一个朝外.
        let outward = cube([5.0, 0.0, 0.0], 2.0);
        let offset = inward.vertex_len() as u32;
        let mut positions = inward.positions().to_vec();
        positions.extend_from_slice(outward.positions());
        let mut faces = inward.faces().to_vec();
        faces.extend(
            outward
                .faces()
                .iter()
                .map(|f| f.iter().map(|v| v + offset).collect()),
        );
        let mut m = SurfaceMesh::new(positions, faces).unwrap();

        assert_eq!(make_consistent(&mut m), 6);
        assert!(is_consistent(&m));
        assert!((m.signed_volume_of(&[0, 1, 2, 3, 4, 5]) - 1.0).abs() < 1e-9);
        assert!((m.signed_volume() - 9.0).abs() < 1e-9);
    }
}
