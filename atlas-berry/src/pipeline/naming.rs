//! 网格文件命名约定.
//!
//! 判断全部基于文件名字符串的前后缀, 不看文件内容.

use std::path::{Path, PathBuf};

use crate::consts::{HEMISPHERE_SUFFIX, MATERIAL_EXT, MESH_EXT};

fn ends_with_ext(name: &str, suffix: &str, ext: &str) -> bool {
    name.strip_suffix(ext)
        .and_then(|s| s.strip_suffix('.'))
        .is_some_and(|s| s.ends_with(suffix))
}

/// 以 `.obj` 结尾.
#[inline]
pub fn is_mesh_file(name: &str) -> bool {
    ends_with_ext(name, "", MESH_EXT)
}

/// 以 `L.obj` 或 `LL.obj` 结尾, 即流程生成的单半球文件.
#[inline]
pub fn is_hemisphere_artifact(name: &str) -> bool {
    // `LL.obj` 同样以 `L.obj` 结尾, 这里保留两项以对应命名约定.
    ends_with_ext(name, HEMISPHERE_SUFFIX, MESH_EXT)
        || ends_with_ext(name, &HEMISPHERE_SUFFIX.repeat(2), MESH_EXT)
}

/// 原始 (双侧) 网格: 是网格文件, 且不是单半球文件.
#[inline]
pub fn is_source_mesh(name: &str) -> bool {
    is_mesh_file(name) && !is_hemisphere_artifact(name)
}

/// 清理时保留的文件: 网格文件, 以 ASCII 数字开头, 且不是单半球文件.
#[inline]
pub fn is_desired_filename(name: &str) -> bool {
    is_mesh_file(name) && name.starts_with(|c: char| c.is_ascii_digit()) && !is_hemisphere_artifact(name)
}

/// 文件名去掉 `.obj` 后的部分, 即结构标识. 其他文件返回整个文件名.
#[inline]
pub fn structure_of(name: &str) -> &str {
    name.strip_suffix(MESH_EXT)
        .and_then(|s| s.strip_suffix('.'))
        .unwrap_or(name)
}

/// `500.obj` -> `500L.obj`, 与原文件同目录.
pub fn hemisphere_path(path: &Path) -> PathBuf {
    with_suffix(path, MESH_EXT)
}

/// `500.obj` -> `500L.mtl`, 导出单半球网格时可能附带的材质文件.
pub fn hemisphere_material_path(path: &Path) -> PathBuf {
    with_suffix(path, MATERIAL_EXT)
}

fn with_suffix(path: &Path, ext: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{HEMISPHERE_SUFFIX}.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(is_mesh_file("500.obj"));
        assert!(!is_mesh_file("500.mtl"));
        assert!(!is_mesh_file("obj"));

        assert!(is_hemisphere_artifact("500L.obj"));
        assert!(is_hemisphere_artifact("500LL.obj"));
        assert!(!is_hemisphere_artifact("500.obj"));
        assert!(!is_hemisphere_artifact("500L.mtl"));

        assert!(is_source_mesh("500.obj"));
        assert!(is_source_mesh("root.obj"));
        assert!(!is_source_mesh("500L.obj"));
    }

    #[test]
    fn test_desired_filename_literal_filter() {
        assert!(is_desired_filename("500.obj"));
        assert!(is_desired_filename("8.obj"));
        assert!(!is_desired_filename("500L.obj"));
        assert!(!is_desired_filename("500LL.obj"));
        assert!(!is_desired_filename("root.obj"));
        assert!(!is_desired_filename("500.mtl"));
        assert!(!is_desired_filename("500L.mtl"));
        assert!(!is_desired_filename(".obj"));
    }

    #[test]
    fn test_paths() {
        let p = Path::new("/data/meshes/500.obj");
        assert_eq!(hemisphere_path(p), Path::new("/data/meshes/500L.obj"));
        assert_eq!(
            hemisphere_material_path(p),
            Path::new("/data/meshes/500L.mtl")
        );
        assert_eq!(structure_of("500.obj"), "500");
        assert_eq!(structure_of("notes.txt"), "notes.txt");
    }
}
