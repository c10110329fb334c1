//! 网格流水线: 拷贝 -> 修复 -> 切割 -> 清理.
//!
//! 四个阶段严格按顺序执行, 后一阶段依赖前一阶段写到磁盘上的结果.
//! 单个网格的失败只影响该网格, 记录在报告中后继续处理其他网格;
//! 网格目录缺失则对整个流水线是致命的.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::atlas::AtlasSource;
use crate::consts::{output, SMOOTH_FACTOR, SMOOTH_ITERATIONS};
use crate::error::{ExportError, PathIoError, WithPath};
use crate::mesh::{bisect, make_consistent, smooth, ExportOptions, MeshError, Plane, Scene};

pub mod naming;
mod stage;

pub use naming::{
    hemisphere_material_path, hemisphere_path, is_desired_filename, is_hemisphere_artifact,
    is_mesh_file, is_source_mesh, structure_of,
};
pub use stage::{MeshStage, StageLedger};

/// 修复与切割后写出网格时使用的选项: 带法向, 不带材质.
const EXPORT_OPTIONS: ExportOptions = ExportOptions {
    normals: true,
    materials: false,
};

/// 单个网格的失败.
#[derive(Debug)]
pub struct AssetFailure {
    /// 结构标识 (网格文件名去掉扩展名).
    pub structure: String,

    /// 错误.
    pub error: MeshError,
}

/// 一个阶段的处理结果, 元素为结构标识 (清理阶段为文件名).
#[derive(Debug, Default)]
pub struct StageReport {
    /// 已处理.
    pub done: Vec<String>,

    /// 已完成过, 跳过.
    pub skipped: Vec<String>,

    /// 失败.
    pub failed: Vec<AssetFailure>,
}

impl StageReport {
    fn fail(&mut self, structure: &str, error: MeshError) {
        error!("`{structure}`: {error}");
        self.failed.push(AssetFailure {
            structure: structure.to_owned(),
            error,
        });
    }

    fn log(&self, stage: &str) {
        info!(
            "{stage}: {} done, {} skipped, {} failed",
            self.done.len(),
            self.skipped.len(),
            self.failed.len()
        );
    }
}

/// 整个流水线的结果.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// 拷贝.
    pub copy: StageReport,

    /// 修复.
    pub repair: StageReport,

    /// 切割.
    pub bisect: StageReport,

    /// 清理, `done` 为被删除的文件名.
    pub cleanup: StageReport,
}

impl PipelineReport {
    /// 所有失败, 附带阶段名.
    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &AssetFailure)> {
        [
            ("copy", &self.copy),
            ("repair", &self.repair),
            ("bisect", &self.bisect),
            ("cleanup", &self.cleanup),
        ]
        .into_iter()
        .flat_map(|(stage, r)| r.failed.iter().map(move |f| (stage, f)))
    }

    /// 是否有任何失败.
    #[inline]
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// 网格流水线.
///
/// 持有唯一的编辑场景; 每个网格在自己的作用域内导入, 处理完 (或失败) 后即被移除.
#[derive(Debug)]
pub struct MeshPipeline {
    source_dir: PathBuf,
    work_dir: PathBuf,
    pointer: PathBuf,
    ledger: StageLedger,
    plane: Plane,
    scene: Scene,
}

impl MeshPipeline {
    /// 从 `source_dir` 拷贝网格到 `<out_dir>/meshes`, 在内外侧宽度 `ml_extent` 的中线处切割.
    pub fn new<P: Into<PathBuf>>(
        source_dir: P,
        out_dir: &Path,
        ml_extent: f64,
    ) -> Result<Self, ExportError> {
        Ok(Self {
            source_dir: source_dir.into(),
            work_dir: out_dir.join(output::MESH_DIR),
            pointer: out_dir.join(output::MESH_PATH),
            ledger: StageLedger::open(out_dir.join(output::STAGES))?,
            plane: Plane::midline(ml_extent),
            scene: Scene::new(),
        })
    }

    /// 以图谱的网格目录和内外侧宽度创建流水线.
    pub fn for_atlas<A: AtlasSource + ?Sized>(atlas: &A, out_dir: &Path) -> Result<Self, ExportError> {
        Self::new(atlas.meshes_dir(), out_dir, atlas.metadata().ml_extent())
    }

    /// 网格工作目录.
    #[inline]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// 切割平面.
    #[inline]
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// 依次执行四个阶段. `cleanup` 为假时跳过清理.
    pub fn run(
        &mut self,
        normals: bool,
        smoothing: bool,
        cleanup: bool,
    ) -> Result<PipelineReport, ExportError> {
        let mut report = PipelineReport {
            copy: self.copy()?,
            repair: self.repair(normals, smoothing)?,
            bisect: self.bisect()?,
            ..Default::default()
        };
        if cleanup {
            report.cleanup = self.cleanup()?;
        }
        Ok(report)
    }

    /// 拷贝原始网格 (不含单半球文件) 到工作目录, 并写出 `mesh_path.txt`.
    ///
    /// 台账中已记录拷贝且工作文件存在的网格被跳过. 重新拷贝的网格清除其后续阶段记录.
    pub fn copy(&mut self) -> Result<StageReport, ExportError> {
        if !self.source_dir.is_dir() {
            return Err(ExportError::MissingPath(self.source_dir.clone()));
        }
        fs::create_dir_all(&self.work_dir).with_path(&self.work_dir)?;

        let mut report = StageReport::default();
        for (name, from) in list_files(&self.source_dir)? {
            if !is_source_mesh(&name) {
                continue;
            }
            let structure = structure_of(&name);
            let to = self.work_dir.join(&name);
            if self.ledger.is_complete(structure, MeshStage::Copy) && to.is_file() {
                report.skipped.push(structure.to_owned());
                continue;
            }
            match fs::copy(&from, &to).with_path(&to) {
                Ok(_) => {
                    debug!("copied {}", name);
                    self.ledger.reset(structure);
                    self.ledger.mark(structure, MeshStage::Copy);
                    report.done.push(structure.to_owned());
                }
                Err(e) => report.fail(structure, e.into()),
            }
        }
        self.ledger.save()?;

        let absolute = self.work_dir.canonicalize().with_path(&self.work_dir)?;
        fs::write(&self.pointer, absolute.to_string_lossy().as_bytes()).with_path(&self.pointer)?;
        report.log("copy");
        Ok(report)
    }

    /// 修复每个原始网格: 可选的拉普拉斯平滑, 然后可选的法向一致化, 写回原路径.
    ///
    /// 两个选项都为假时什么也不做, 不打开任何文件.
    ///
    /// 以相同选项修复过的网格被跳过. 以其他选项修复过的网格先从图谱源重新拷贝,
    /// 并删除由旧网格切割出的 `<stem>L.obj`, 再重新修复.
    pub fn repair(&mut self, normals: bool, smoothing: bool) -> Result<StageReport, ExportError> {
        let mut report = StageReport::default();
        if !normals && !smoothing {
            info!("repair: nothing to do");
            return Ok(report);
        }
        let wanted = MeshStage::Repair { normals, smoothing };
        for (name, path) in self.source_meshes()? {
            let structure = structure_of(&name);
            if self.ledger.is_complete(structure, wanted) {
                report.skipped.push(structure.to_owned());
                continue;
            }
            if let Some(previous) = self.ledger.repair_of(structure) {
                info!("`{structure}`: repaired as {previous:?} before, starting over from the source");
                if let Err(e) = self.restore(&name, &path) {
                    report.fail(structure, e.into());
                    continue;
                }
                self.ledger.unmark_repair(structure);
            }
            match repair_one(&mut self.scene, &path, normals, smoothing) {
                Ok(()) => {
                    self.ledger.mark(structure, wanted);
                    report.done.push(structure.to_owned());
                }
                Err(e) => report.fail(structure, e),
            }
            self.ledger.save()?;
        }
        self.scene.clear();
        report.log("repair");
        Ok(report)
    }

    /// 用图谱源中的原始网格覆盖工作文件, 并删除其过时的单半球网格.
    fn restore(&self, name: &str, path: &Path) -> Result<(), PathIoError> {
        let from = self.source_dir.join(name);
        fs::copy(&from, path).with_path(&from)?;
        let stale = hemisphere_path(path);
        if stale.exists() {
            fs::remove_file(&stale).with_path(&stale)?;
        }
        Ok(())
    }

    /// 沿中线切割每个尚无 `<stem>L.obj` 的原始网格, 只保留一侧并补面, 然后三角化.
    pub fn bisect(&mut self) -> Result<StageReport, ExportError> {
        let mut report = StageReport::default();
        for (name, path) in self.source_meshes()? {
            let structure = structure_of(&name);
            let out = hemisphere_path(&path);
            if out.exists() {
                report.skipped.push(structure.to_owned());
                continue;
            }
            match bisect_one(&mut self.scene, &path, &out, &self.plane) {
                Ok(()) => report.done.push(structure.to_owned()),
                Err(e) => report.fail(structure, e),
            }
        }
        self.scene.clear();
        report.log("bisect");
        Ok(report)
    }

    /// 删除工作目录中除 [`is_desired_filename`] 以外的所有普通文件.
    pub fn cleanup(&self) -> Result<StageReport, ExportError> {
        if !self.work_dir.is_dir() {
            return Err(ExportError::MissingPath(self.work_dir.clone()));
        }
        let mut report = StageReport::default();
        for (name, path) in list_files(&self.work_dir)? {
            if is_desired_filename(&name) {
                report.skipped.push(name);
                continue;
            }
            match fs::remove_file(&path).with_path(&path) {
                Ok(()) => {
                    debug!("removed {name}");
                    report.done.push(name);
                }
                Err(e) => report.fail(&name, e.into()),
            }
        }
        report.log("cleanup");
        Ok(report)
    }

    fn source_meshes(&self) -> Result<Vec<(String, PathBuf)>, ExportError> {
        if !self.work_dir.is_dir() {
            return Err(ExportError::MissingPath(self.work_dir.clone()));
        }
        let mut files = list_files(&self.work_dir)?;
        files.retain(|(name, _)| is_source_mesh(name));
        Ok(files)
    }
}

fn repair_one(scene: &mut Scene, path: &Path, normals: bool, smoothing: bool) -> Result<(), MeshError> {
    let mut obj = scene.import(path)?;
    if smoothing {
        smooth(obj.mesh_mut(), SMOOTH_FACTOR, SMOOTH_ITERATIONS);
    }
    if normals {
        make_consistent(obj.mesh_mut());
    }
    obj.export(path, &EXPORT_OPTIONS)
}

fn bisect_one(scene: &mut Scene, path: &Path, out: &Path, plane: &Plane) -> Result<(), MeshError> {
    let mut obj = scene.import(path)?;
    let stats = bisect(obj.mesh_mut(), plane, true);
    if obj.mesh().is_empty() {
        warn!("`{}` lies entirely beyond the midline", obj.name());
    }
    debug!("#{} `{}`: {stats:?}", obj.id(), obj.name());
    obj.mesh_mut().triangulate();
    obj.export(out, &EXPORT_OPTIONS)?;
    drop(obj);

    let mtl = hemisphere_material_path(path);
    if mtl.exists() {
        fs::remove_file(&mtl).with_path(&mtl)?;
    }
    Ok(())
}

/// 目录中的普通文件 `(文件名, 路径)`, 按文件名排序. 非 UTF-8 文件名被跳过.
fn list_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, ExportError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_path(dir)? {
        let path = entry.with_path(dir)?.path();
        if !path.is_file() {
            continue;
        }
        match path.file_name().and_then(|s| s.to_str()) {
            Some(name) => files.push((name.to_owned(), path.clone())),
            None => warn!("skipping non UTF-8 file name {}", path.display()),
        }
    }
    files.sort();
    Ok(files)
}
