//! 对 `atlas-berry::atlas` 的更一层封装. 提供更直接的图谱与输出路径定位.

use atlas_berry::error::AtlasError;
use atlas_berry::BrainAtlas;
use std::env;
use std::path::{Path, PathBuf};

/// 输出根目录的环境变量.
pub const DATA_PATH_ENV: &str = "ATLAS_DATA_PATH";

/// `$HOME/dataset/atlas`. 无法确定用户主目录时返回 `None`.
pub fn home_data_path() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.push("atlas");
    Some(ans)
}

/// 获取输出根目录.
///
/// 1. 若环境变量 `$ATLAS_DATA_PATH` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/atlas`.
pub fn data_path_from_env_or_home() -> Option<PathBuf> {
    match env::var_os(DATA_PATH_ENV) {
        Some(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_data_path(),
    }
}

/// 打开图谱. 给定 `root` 时直接读取该目录, 否则在 `~/.brainglobe` 下查找最新版本.
pub fn open_atlas(name: &str, root: Option<&Path>) -> Result<BrainAtlas, AtlasError> {
    match root {
        Some(root) => BrainAtlas::open(name, root),
        None => BrainAtlas::locate(name),
    }
}
