//! 转换驱动.
//!
//! 把一个图谱的全部资源写到 `<data_path>/<atlas_name>/`. 体数据, 元信息,
//! 质心三类步骤彼此独立, 任一失败都被记录后继续; 网格流水线最后执行.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info};

use crate::atlas::AtlasSource;
use crate::consts::output;
use crate::error::{ExportError, WithPath};
use crate::export::{
    copy_structures, write_annotation, write_centroids, write_meta, write_reference, Outcome,
};
use crate::pipeline::{MeshPipeline, PipelineReport};

/// 选择要执行的步骤.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConvertOptions {
    /// 写出 `reference.bytes` 与 `annotation.bytes`.
    pub volumes: bool,

    /// 写出 `mesh_centers.csv`.
    pub centroids: bool,

    /// 写出 `meta.json` 并拷贝 `structures.json`.
    pub meta: bool,

    /// 执行网格流水线.
    pub meshes: bool,

    /// 修复阶段统一法向.
    pub normals: bool,

    /// 修复阶段做拉普拉斯平滑.
    pub smoothing: bool,

    /// 网格流水线最后清理工作目录.
    pub cleanup: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            volumes: true,
            centroids: true,
            meta: true,
            meshes: true,
            normals: true,
            smoothing: false,
            cleanup: true,
        }
    }
}

/// 输出目录 `<data_path>/<atlas_name>/` 的布局.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// 以 `data_path` 与图谱名确定输出目录.
    #[inline]
    pub fn new<P: AsRef<Path>>(data_path: P, atlas_name: &str) -> Self {
        Self {
            root: data_path.as_ref().join(atlas_name),
        }
    }

    /// 输出目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `meta.json`.
    #[inline]
    pub fn meta(&self) -> PathBuf {
        self.root.join(output::META)
    }

    /// `reference.bytes`.
    #[inline]
    pub fn reference(&self) -> PathBuf {
        self.root.join(output::REFERENCE)
    }

    /// `annotation.bytes`.
    #[inline]
    pub fn annotation(&self) -> PathBuf {
        self.root.join(output::ANNOTATION)
    }

    /// `mesh_centers.csv`.
    #[inline]
    pub fn mesh_centers(&self) -> PathBuf {
        self.root.join(output::MESH_CENTERS)
    }

    /// `structures.json`.
    #[inline]
    pub fn structures(&self) -> PathBuf {
        self.root.join(output::STRUCTURES)
    }

    /// 网格工作目录.
    #[inline]
    pub fn meshes(&self) -> PathBuf {
        self.root.join(output::MESH_DIR)
    }

    /// `mesh_path.txt`.
    #[inline]
    pub fn mesh_path(&self) -> PathBuf {
        self.root.join(output::MESH_PATH)
    }

    /// 网格阶段台账.
    #[inline]
    pub fn stages(&self) -> PathBuf {
        self.root.join(output::STAGES)
    }

    /// 创建输出目录 (含父目录).
    pub fn create(&self) -> Result<(), ExportError> {
        fs::create_dir_all(&self.root).with_path(&self.root)?;
        Ok(())
    }
}

/// 转换步骤.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Step {
    /// `meta.json`.
    Meta,

    /// `reference.bytes`.
    Reference,

    /// `annotation.bytes`.
    Annotation,

    /// `mesh_centers.csv`.
    Centroids,

    /// `structures.json`.
    Structures,

    /// 网格流水线.
    Meshes,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Meta => "meta",
            Self::Reference => "reference",
            Self::Annotation => "annotation",
            Self::Centroids => "centroids",
            Self::Structures => "structures",
            Self::Meshes => "meshes",
        };
        f.write_str(s)
    }
}

/// 一次转换的结果.
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// 已执行的步骤.
    pub done: Vec<Step>,

    /// 输出已存在而跳过的步骤.
    pub skipped: Vec<Step>,

    /// 失败的步骤.
    pub failed: Vec<(Step, ExportError)>,

    /// 网格流水线的逐网格结果. 未执行网格流水线时为 `None`.
    pub meshes: Option<PipelineReport>,
}

impl ConversionReport {
    /// 没有任何步骤或网格失败.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.meshes.as_ref().map_or(true, |m| !m.has_failures())
    }

    fn record(&mut self, step: Step, result: Result<Outcome, ExportError>) {
        match result {
            Ok(Outcome::Done) => self.done.push(step),
            Ok(Outcome::Skipped) => self.skipped.push(step),
            Err(e) => {
                error!("step `{step}` failed: {e}");
                self.failed.push((step, e));
            }
        }
    }
}

/// 一次转换.
pub struct Conversion<'a, A: AtlasSource + ?Sized> {
    atlas: &'a A,
    layout: OutputLayout,
    options: ConvertOptions,
}

impl<'a, A: AtlasSource + ?Sized> Conversion<'a, A> {
    /// 输出到 `<data_path>/<atlas.name()>/`.
    pub fn new<P: AsRef<Path>>(atlas: &'a A, data_path: P, options: ConvertOptions) -> Self {
        Self {
            atlas,
            layout: OutputLayout::new(data_path, atlas.name()),
            options,
        }
    }

    /// 输出布局.
    #[inline]
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// 执行选中的步骤. 只有无法创建输出目录时返回 `Err`.
    pub fn run(&self) -> Result<ConversionReport, ExportError> {
        let (atlas, layout, options) = (self.atlas, &self.layout, &self.options);
        layout.create()?;
        info!(
            "converting `{}` from {} into {}",
            atlas.name(),
            atlas.root_dir().display(),
            layout.root().display()
        );

        let mut report = ConversionReport::default();
        if options.meta {
            let r = write_meta(atlas.metadata(), layout.meta()).map(|_| Outcome::Done);
            report.record(Step::Meta, r);
        }
        if options.volumes {
            report.record(
                Step::Reference,
                write_reference(atlas.reference(), layout.reference()),
            );
            report.record(
                Step::Annotation,
                write_annotation(atlas.annotation(), layout.annotation()),
            );
        }
        if options.centroids {
            report.record(Step::Centroids, write_centroids(atlas, layout.mesh_centers()));
        }
        if options.meta {
            let r = copy_structures(atlas.structures_file(), layout.structures())
                .map(|_| Outcome::Done);
            report.record(Step::Structures, r);
        }
        if options.meshes {
            let r = MeshPipeline::for_atlas(atlas, layout.root()).and_then(|mut pipeline| {
                pipeline.run(options.normals, options.smoothing, options.cleanup)
            });
            match r {
                Ok(meshes) => {
                    report.done.push(Step::Meshes);
                    report.meshes = Some(meshes);
                }
                Err(e) => report.record(Step::Meshes, Err(e)),
            }
        }

        info!(
            "`{}`: {} step(s) done, {} skipped, {} failed",
            atlas.name(),
            report.done.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }
}
