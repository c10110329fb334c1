//! 资源导出: 体数据, 元信息, 结构质心.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PathIoError, WithPath};

mod centroid;
mod meta;
mod volume;

pub use centroid::{
    centroid_of, compute_centroids, write_centroid_table, write_centroids, Centroid,
    CentroidRecord, Position, CENTROID_HEADER,
};
pub use meta::{copy_structures, write_meta};
pub use volume::{annotation_bytes, reference_bytes, write_annotation, write_reference};

/// 单个步骤 (或单个资源) 的执行结果.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// 已执行, 并写出了输出.
    Done,

    /// 输出已存在 (或无需执行), 未做任何计算.
    Skipped,
}

impl Outcome {
    /// 是否被跳过.
    #[inline]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

/// 先写到同目录下的 `*.part` 临时文件, 再重命名到 `path`.
///
/// 中途失败不会在 `path` 留下残缺文件, 因此 "文件存在" 可以作为完成标记.
pub(crate) fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), PathIoError> {
    let path = path.as_ref();
    let part = part_path(path);
    fs::write(&part, bytes).with_path(&part)?;
    fs::rename(&part, path).with_path(path)
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_owned();
    name.push(".part");
    path.with_file_name(name)
}
