//! 网格阶段台账.
//!
//! 以 JSON 记录每个网格已经完成的阶段, 使中断后的重新运行可以跳过
//! 已完成的工作. 切割阶段不记入台账, 以输出文件是否存在为准.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, WithPath};
use crate::export::write_atomic;

/// 记入台账的网格阶段.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshStage {
    /// 已拷贝到工作目录.
    Copy,

    /// 已按给定选项修复. 选项不同视为未修复.
    Repair {
        /// 是否统一了法向.
        normals: bool,

        /// 是否做了平滑.
        smoothing: bool,
    },
}

impl MeshStage {
    #[inline]
    fn is_repair(&self) -> bool {
        matches!(self, MeshStage::Repair { .. })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    assets: BTreeMap<String, BTreeSet<MeshStage>>,
}

/// 每个网格已完成的阶段.
#[derive(Debug)]
pub struct StageLedger {
    path: PathBuf,
    assets: BTreeMap<String, BTreeSet<MeshStage>>,
}

impl StageLedger {
    /// 读取台账. 文件不存在时为空台账; 文件损坏时警告并视为空台账,
    /// 此时所有阶段都会重新执行.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ExportError> {
        let path = path.as_ref().to_owned();
        if !path.exists() {
            return Ok(Self {
                path,
                assets: BTreeMap::new(),
            });
        }
        let text = fs::read_to_string(&path).with_path(&path)?;
        let assets = match serde_json::from_str::<LedgerFile>(&text) {
            Ok(file) => file.assets,
            Err(e) => {
                warn!("ignoring corrupt stage ledger {}: {e}", path.display());
                BTreeMap::new()
            }
        };
        debug!("stage ledger: {} asset(s)", assets.len());
        Ok(Self { path, assets })
    }

    /// 台账文件路径.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `asset` 是否已完成 `stage`.
    pub fn is_complete(&self, asset: &str, stage: MeshStage) -> bool {
        self.assets.get(asset).is_some_and(|s| s.contains(&stage))
    }

    /// `asset` 记录在案的修复阶段 (含当时的选项).
    pub fn repair_of(&self, asset: &str) -> Option<MeshStage> {
        self.assets
            .get(asset)?
            .iter()
            .copied()
            .find(MeshStage::is_repair)
    }

    /// 记录 `asset` 完成了 `stage`. 修复阶段只保留最近一次的选项.
    pub fn mark(&mut self, asset: &str, stage: MeshStage) {
        let stages = self.assets.entry(asset.to_owned()).or_default();
        if stage.is_repair() {
            stages.retain(|s| !s.is_repair());
        }
        stages.insert(stage);
    }

    /// 清除 `asset` 的修复记录.
    pub fn unmark_repair(&mut self, asset: &str) {
        if let Some(stages) = self.assets.get_mut(asset) {
            stages.retain(|s| !s.is_repair());
        }
    }

    /// 清除 `asset` 的全部记录.
    pub fn reset(&mut self, asset: &str) {
        self.assets.remove(asset);
    }

    /// 原子地写回台账.
    pub fn save(&self) -> Result<(), ExportError> {
        let file = LedgerFile {
            assets: self.assets.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file).map_err(|source| ExportError::Json {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MeshStage, StageLedger};
    use std::fs;

    const NORMALS: MeshStage = MeshStage::Repair {
        normals: true,
        smoothing: false,
    };
    const BOTH: MeshStage = MeshStage::Repair {
        normals: true,
        smoothing: true,
    };

    #[test]
    fn test_mark_save_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stages.json");

        let mut ledger = StageLedger::open(&path).unwrap();
        assert!(!ledger.is_complete("500", MeshStage::Copy));
        ledger.mark("500", MeshStage::Copy);
        ledger.mark("500", NORMALS);
        ledger.mark("8", MeshStage::Copy);
        ledger.save().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"repair\""));
        assert!(text.contains("\"smoothing\": false"));

        let mut ledger = StageLedger::open(&path).unwrap();
        assert!(ledger.is_complete("500", NORMALS));
        assert!(!ledger.is_complete("500", BOTH));
        assert_eq!(ledger.repair_of("500"), Some(NORMALS));
        assert_eq!(ledger.repair_of("8"), None);

        ledger.reset("500");
        assert!(!ledger.is_complete("500", MeshStage::Copy));
        assert!(ledger.is_complete("8", MeshStage::Copy));
    }

    #[test]
    fn test_repair_keeps_latest_options() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = StageLedger::open(dir.path().join("stages.json")).unwrap();
        ledger.mark("500", MeshStage::Copy);
        ledger.mark("500", NORMALS);
        ledger.mark("500", BOTH);
        assert!(ledger.is_complete("500", BOTH));
        assert!(!ledger.is_complete("500", NORMALS));

        ledger.unmark_repair("500");
        assert_eq!(ledger.repair_of("500"), None);
        assert!(ledger.is_complete("500", MeshStage::Copy));
    }

    #[test]
    fn test_corrupt_ledger_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stages.json");
        fs::write(&path, "{ not json").unwrap();
        let ledger = StageLedger::open(&path).unwrap();
        assert!(!ledger.is_complete("500", MeshStage::Copy));
    }
}
