//! 运行时错误.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 带路径信息的底层 I/O 错误.
#[derive(Debug, Error)]
#[error("{}: {source}", .path.display())]
pub struct PathIoError {
    /// 出错的文件或目录.
    pub path: PathBuf,

    /// 底层错误.
    #[source]
    pub source: io::Error,
}

/// 为 `io::Result` 附加路径信息.
pub(crate) trait WithPath<T> {
    fn with_path<P: AsRef<Path>>(self, path: P) -> Result<T, PathIoError>;
}

impl<T> WithPath<T> for io::Result<T> {
    #[inline]
    fn with_path<P: AsRef<Path>>(self, path: P) -> Result<T, PathIoError> {
        self.map_err(|source| PathIoError {
            path: path.as_ref().to_owned(),
            source,
        })
    }
}

/// 打开或查询图谱源错误.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// 图谱目录不存在.
    #[error("atlas directory `{}` does not exist", .0.display())]
    MissingRoot(PathBuf),

    /// 在 BrainGlobe 缓存目录下找不到该图谱.
    #[error("cannot find atlas `{0}` in the BrainGlobe cache")]
    NotFound(String),

    /// 缺少体数据文件.
    #[error("no `{stem}` volume (npy, tiff, tif, nii, nii.gz) in `{}`", .dir.display())]
    MissingVolume {
        /// 文件名 (不含扩展名).
        stem: &'static str,

        /// 查找的目录.
        dir: PathBuf,
    },

    /// 底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] PathIoError),

    /// JSON 格式错误.
    #[error("invalid JSON in `{}`: {source}", .path.display())]
    Json {
        /// 文件路径.
        path: PathBuf,

        /// 解析错误.
        #[source]
        source: serde_json::Error,
    },

    /// 元信息字段缺失或格式错误.
    #[error("metadata field `{0}` is missing or malformed")]
    BadMetadata(&'static str),

    /// 读取 npy 文件错误.
    #[error("cannot read npy volume: {0}")]
    Npy(#[from] ndarray_npy::ReadNpyError),

    /// 读取 nifti 文件错误.
    #[error("cannot read nifti volume: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 读取 tiff 文件错误.
    #[error("cannot read tiff volume: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// tiff 图像栈无法组成三维体数据.
    #[error("malformed tiff stack: {0}")]
    MalformedStack(&'static str),

    /// 体数据不是三维的.
    #[error("volume is not three-dimensional (shape {0:?})")]
    NotThreeDimensional(Vec<usize>),

    /// 不支持的体素类型.
    #[error("unsupported voxel type {0}")]
    UnsupportedType(String),

    /// 体数据形状与预期不一致.
    #[error("{what} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        /// 出错的数据.
        what: &'static str,

        /// 实际形状.
        found: [usize; 3],

        /// 预期形状.
        expected: [usize; 3],
    },

    /// 结构层级中存在重复的缩写或 id.
    #[error("structure `{0}` is defined twice")]
    DuplicateStructure(String),

    /// `structure_id_path` 给出的父子关系成环.
    #[error("structure `{0}` is its own ancestor")]
    CyclicHierarchy(String),

    /// 未知结构缩写.
    #[error("unknown structure `{0}`")]
    UnknownStructure(String),

    /// 未知结构 id.
    #[error("unknown structure id {0}")]
    UnknownStructureId(u32),
}

/// 写出资源错误. 对整个步骤是致命的.
#[derive(Debug, Error)]
pub enum ExportError {
    /// 底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] PathIoError),

    /// 必需的文件或目录不存在.
    #[error("required path `{}` does not exist", .0.display())]
    MissingPath(PathBuf),

    /// JSON 序列化错误.
    #[error("cannot serialize `{}`: {source}", .path.display())]
    Json {
        /// 文件路径.
        path: PathBuf,

        /// 序列化错误.
        #[source]
        source: serde_json::Error,
    },

    /// 计算过程中查询图谱失败.
    #[error(transparent)]
    Atlas(#[from] AtlasError),
}
