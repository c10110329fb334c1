//! 图谱源适配.
//!
//! [`AtlasSource`] 描述转换流程对图谱源的全部需求;
//! [`BrainAtlas`] 是读取 BrainGlobe 本地目录布局的具体实现.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::consts::source;
use crate::data::{StructureMask, Volume};
use crate::error::{AtlasError, WithPath};

mod meta;
mod structures;

pub use meta::AtlasMeta;
pub use structures::{Structure, StructureTree};

/// 图谱源. 对转换流程只读.
pub trait AtlasSource {
    /// 图谱名, 同时也是输出子目录名.
    fn name(&self) -> &str;

    /// 图谱源根目录, 包含 `meshes/` 子目录与 `structures.json`.
    fn root_dir(&self) -> &Path;

    /// 元信息.
    fn metadata(&self) -> &AtlasMeta;

    /// 参考图像.
    fn reference(&self) -> &Volume;

    /// 标注体.
    fn annotation(&self) -> &Volume;

    /// 结构层级.
    fn structures(&self) -> &StructureTree;

    /// 体素分辨率 (ap, dv, ml).
    #[inline]
    fn resolution(&self) -> [f64; 3] {
        self.metadata().resolution()
    }

    /// 源网格目录.
    #[inline]
    fn meshes_dir(&self) -> PathBuf {
        self.root_dir().join(source::MESH_DIR)
    }

    /// 源结构层级文件.
    #[inline]
    fn structures_file(&self) -> PathBuf {
        self.root_dir().join(source::STRUCTURES)
    }

    /// 结构 `id` 的掩码, 包含其所有后代结构.
    ///
    /// 层级中存在但标注体中不存在的结构会得到全空掩码, 这不是错误.
    fn structure_mask(&self, id: u32) -> Result<StructureMask, AtlasError> {
        let tree = self.structures();
        let structure = tree.by_id(id).ok_or(AtlasError::UnknownStructureId(id))?;
        let mut labels: HashSet<u64> = tree
            .descendants(&structure.acronym)?
            .into_iter()
            .map(|s| s.id as u64)
            .collect();
        labels.insert(id as u64);
        Ok(StructureMask::new(self.annotation().mask_of(&labels)))
    }
}

/// 本地目录中的 BrainGlobe 图谱.
#[derive(Debug, Clone)]
pub struct BrainAtlas {
    name: String,
    root: PathBuf,
    meta: AtlasMeta,
    reference: Volume,
    annotation: Volume,
    structures: StructureTree,
}

impl BrainAtlas {
    /// 打开 `root` 目录下的图谱, 并以 `name` 命名.
    ///
    /// 参考图像, 标注体与元信息中的 `shape` 必须一致, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(name: &str, root: P) -> Result<Self, AtlasError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(AtlasError::MissingRoot(root.to_owned()));
        }
        info!("opening atlas `{name}` at {}", root.display());

        let meta = AtlasMeta::open(root.join(source::METADATA))?;
        let structures = StructureTree::open(root.join(source::STRUCTURES))?;
        let reference = Volume::open(find_volume(root, source::REFERENCE_STEM)?)?;
        let annotation = Volume::open(find_volume(root, source::ANNOTATION_STEM)?)?;
        debug!(
            "reference {:?} ({}), annotation {:?} ({}), {} structures",
            reference.shape(),
            reference.voxel_type(),
            annotation.shape(),
            annotation.voxel_type(),
            structures.len()
        );

        let expected = meta.shape();
        for (what, volume) in [("reference", &reference), ("annotation", &annotation)] {
            if volume.shape() != expected {
                return Err(AtlasError::ShapeMismatch {
                    what,
                    found: volume.shape(),
                    expected,
                });
            }
        }

        Ok(Self {
            name: name.to_owned(),
            root: root.to_owned(),
            meta,
            reference,
            annotation,
            structures,
        })
    }

    /// 在 BrainGlobe 缓存目录中查找并打开名为 `name` 的图谱.
    #[inline]
    pub fn locate(name: &str) -> Result<Self, AtlasError> {
        Self::open(name, locate_atlas(name)?)
    }
}

impl AtlasSource for BrainAtlas {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn root_dir(&self) -> &Path {
        &self.root
    }

    #[inline]
    fn metadata(&self) -> &AtlasMeta {
        &self.meta
    }

    #[inline]
    fn reference(&self) -> &Volume {
        &self.reference
    }

    #[inline]
    fn annotation(&self) -> &Volume {
        &self.annotation
    }

    #[inline]
    fn structures(&self) -> &StructureTree {
        &self.structures
    }
}

/// 在 `dir` 下按 [`source::VOLUME_EXTENSIONS`] 的优先级查找 `{stem}.{ext}`.
fn find_volume(dir: &Path, stem: &'static str) -> Result<PathBuf, AtlasError> {
    source::VOLUME_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
        .ok_or_else(|| AtlasError::MissingVolume {
            stem,
            dir: dir.to_owned(),
        })
}

/// 获取 `{用户主目录}/.brainglobe` 目录.
pub fn brainglobe_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push(source::BRAINGLOBE_DIR);
    Some(ans)
}

/// 在 `{用户主目录}/.brainglobe` 下查找 `{name}_v*` 目录.
///
/// 存在多个版本时, 选择版本号最大的那个.
pub fn locate_atlas(name: &str) -> Result<PathBuf, AtlasError> {
    let base = brainglobe_dir().ok_or_else(|| AtlasError::NotFound(name.to_owned()))?;
    locate_atlas_in(&base, name)
}

/// 与 [`locate_atlas`] 相同, 但在 `base` 目录下查找.
pub fn locate_atlas_in(base: &Path, name: &str) -> Result<PathBuf, AtlasError> {
    if !base.is_dir() {
        return Err(AtlasError::NotFound(name.to_owned()));
    }
    let prefix = format!("{name}_v");
    let mut best: Option<(Vec<u32>, PathBuf)> = None;
    for entry in fs::read_dir(base).with_path(base)? {
        let entry = entry.with_path(base)?;
        let file_name = entry.file_name();
        let Some(version) = file_name.to_str().and_then(|s| s.strip_prefix(&prefix)) else {
            continue;
        };
        if !entry.path().is_dir() {
            continue;
        }
        // "1.2" -> [1, 2]. 无法解析的部分记为 0.
        let version: Vec<u32> = version.split('.').map(|p| p.parse().unwrap_or(0)).collect();
        if best.as_ref().map_or(true, |(v, _)| version > *v) {
            best = Some((version, entry.path()));
        }
    }
    best.map(|(_, p)| p)
        .ok_or_else(|| AtlasError::NotFound(name.to_owned()))
}
