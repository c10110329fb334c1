//! Wavefront OBJ 读写.
//!
//! 读取由 `tobj` 完成, 文件中的所有对象合并为一个网格.
//! 写出只包含顶点, (可选) 顶点法向与面; 材质只写一个占位材质.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;

use super::{MeshError, SurfaceMesh};
use crate::consts::MATERIAL_EXT;
use crate::error::WithPath;
use crate::export::write_atomic;

/// 写出 OBJ 的选项.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ExportOptions {
    /// 是否写出顶点法向.
    pub normals: bool,

    /// 是否写出材质库 (同名 `.mtl` 文件).
    pub materials: bool,
}

/// 占位材质名.
const MATERIAL_NAME: &str = "default";

/// 读取 OBJ 文件, 合并其中的全部对象. 点与线元素被忽略, 多边形面保持原样.
pub fn load<P: AsRef<Path>>(path: P) -> Result<SurfaceMesh, MeshError> {
    let path = path.as_ref();
    let options = tobj::LoadOptions {
        single_index: false,
        triangulate: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    };
    // 材质文件缺失或损坏不影响几何, 忽略第二个结果.
    let (models, _) = tobj::load_obj(path, &options).map_err(|source| MeshError::Load {
        path: path.to_owned(),
        source,
    })?;

    let mut positions = Vec::new();
    let mut faces = Vec::new();
    for model in models.iter() {
        let mesh = &model.mesh;
        let offset = positions.len() as u32;
        positions.extend(
            mesh.positions
                .chunks_exact(3)
                .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64]),
        );

        if mesh.face_arities.is_empty() {
            faces.extend(
                mesh.indices
                    .chunks_exact(3)
                    .map(|f| f.iter().map(|i| i + offset).collect::<Vec<_>>()),
            );
        } else {
            let mut next = 0;
            for &arity in mesh.face_arities.iter() {
                let end = next + arity as usize;
                faces.push(mesh.indices[next..end].iter().map(|i| i + offset).collect());
                next = end;
            }
        }
    }

    if faces.is_empty() {
        return Err(MeshError::Empty(path.to_owned()));
    }
    let mesh = SurfaceMesh::new(positions, faces)?;
    debug!(
        "loaded {}: {} vertices, {} faces from {} object(s)",
        path.display(),
        mesh.vertex_len(),
        mesh.face_len(),
        models.len()
    );
    Ok(mesh)
}

/// 以 OBJ 文本格式写出网格. `name` 为对象名.
///
/// 启用材质时, 引用与 `obj_name` 同名的 `.mtl` 文件.
pub fn write_obj<W: Write>(
    mesh: &SurfaceMesh,
    name: &str,
    obj_name: &str,
    options: &ExportOptions,
    mut w: W,
) -> io::Result<()> {
    writeln!(w, "# atlas-berry")?;
    if options.materials {
        let stem = Path::new(obj_name)
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        writeln!(w, "mtllib {stem}.{MATERIAL_EXT}")?;
    }
    writeln!(w, "o {name}")?;
    for p in mesh.positions() {
        writeln!(w, "v {:.6} {:.6} {:.6}", p[0], p[1], p[2])?;
    }
    if options.normals {
        for n in mesh.vertex_normals() {
            writeln!(w, "vn {:.4} {:.4} {:.4}", n[0], n[1], n[2])?;
        }
    }
    if options.materials {
        writeln!(w, "usemtl {MATERIAL_NAME}")?;
    }
    for face in mesh.faces() {
        write!(w, "f")?;
        for &v in face {
            // OBJ 索引从 1 开始.
            let i = v + 1;
            if options.normals {
                write!(w, " {i}//{i}")?;
            } else {
                write!(w, " {i}")?;
            }
        }
        writeln!(w)?;
    }
    w.flush()
}

/// 写出占位材质库.
pub fn write_mtl<W: Write>(mut w: W) -> io::Result<()> {
    writeln!(w, "# atlas-berry")?;
    writeln!(w, "newmtl {MATERIAL_NAME}")?;
    writeln!(w, "Ka 1.000000 1.000000 1.000000")?;
    writeln!(w, "Kd 0.800000 0.800000 0.800000")?;
    writeln!(w, "Ks 0.000000 0.000000 0.000000")?;
    writeln!(w, "d 1.000000")?;
    writeln!(w, "illum 1")?;
    w.flush()
}

/// 材质库路径: 与 `obj` 同目录同名, 扩展名为 `mtl`.
#[inline]
pub fn material_path<P: AsRef<Path>>(obj: P) -> PathBuf {
    obj.as_ref().with_extension(MATERIAL_EXT)
}

/// 将网格写到 `path`, 必要时一并写出材质库. 两个文件都原子地替换.
pub fn save<P: AsRef<Path>>(
    mesh: &SurfaceMesh,
    name: &str,
    path: P,
    options: &ExportOptions,
) -> Result<(), MeshError> {
    let path = path.as_ref();
    let obj_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut buf = Vec::with_capacity(48 * (mesh.vertex_len() + mesh.face_len()));
    write_obj(mesh, name, &obj_name, options, &mut buf).with_path(path)?;
    write_atomic(path, &buf)?;

    if options.materials {
        let mtl = material_path(path);
        let mut buf = Vec::with_capacity(128);
        write_mtl(&mut buf).with_path(&mtl)?;
        write_atomic(&mtl, &buf)?;
    }
    debug!("saved {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes::cube;
    use std::fs;

    const QUAD_AND_TRIANGLE: &str = "\
# two objects
o first
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
o second
v 0 0 1
v 1 0 1
v 0 1 1
p 5
l 5 6
f 5 6 7
";

    #[test]
    fn test_load_merges_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.obj");
        fs::write(&path, QUAD_AND_TRIANGLE).unwrap();

        let mesh = load(&path).unwrap();
        assert_eq!(mesh.vertex_len(), 7);
        assert_eq!(mesh.face_len(), 2);
        assert_eq!(mesh.faces()[0].len(), 4);
        assert_eq!(mesh.faces()[1].len(), 3);
        // 第二个对象的索引已加上偏移.
        assert_eq!(mesh.positions()[mesh.faces()[1][0] as usize], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(dir.path().join("missing.obj")),
            Err(MeshError::Load { .. })
        ));

        let path = dir.path().join("points.obj");
        fs::write(&path, "v 0 0 0\nv 1 0 0\np 1 2\n").unwrap();
        assert!(matches!(load(&path), Err(MeshError::Empty(_))));
    }

    #[test]
    fn test_write_obj_format() {
        let mesh = cube([0.0; 3], 1.0);
        let mut buf = Vec::new();
        let options = ExportOptions {
            normals: true,
            materials: true,
        };
        write_obj(&mesh, "cube", "cube.obj", &options, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("mtllib cube.mtl\n"));
        assert!(text.contains("o cube\n"));
        assert!(text.contains("v 1.000000 0.000000 0.000000\n"));
        assert_eq!(text.lines().filter(|l| l.starts_with("vn ")).count(), 8);
        assert!(text.contains("vn -0.5774 -0.5774 -0.5774\n"));
        assert!(text.contains("usemtl default\n"));
        assert!(text.contains("f 1//1 3//3 4//4 2//2\n"));

        let mut plain = Vec::new();
        write_obj(&mesh, "cube", "cube.obj", &ExportOptions::default(), &mut plain).unwrap();
        let plain = String::from_utf8(plain).unwrap();
        assert!(!plain.contains("vn "));
        assert!(!plain.contains("mtllib"));
        assert!(plain.contains("f 1 3 4 2\n"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("500.obj");
        let mesh = cube([-1.0, 2.0, 0.5], 2.0);
        let options = ExportOptions {
            normals: true,
            materials: true,
        };
        save(&mesh, "500", &path, &options).unwrap();
        assert!(material_path(&path).is_file());

        // 读取时顶点可能按首次出现的顺序重新编号, 逐面比较坐标.
        let back = load(&path).unwrap();
        assert_eq!(back.face_len(), mesh.face_len());
        for (a, b) in back.faces().iter().zip(mesh.faces()) {
            let pa: Vec<_> = a.iter().map(|&v| back.positions()[v as usize]).collect();
            let pb: Vec<_> = b.iter().map(|&v| mesh.positions()[v as usize]).collect();
            assert_eq!(pa, pb);
        }
    }
}
