#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 将 BrainGlobe 风格的脑图谱 (参考图像, 标注体, 结构层级, 各结构表面网格)
//! 转换为实时 3D 可视化前端可以直接加载的资源包.
//!
//! 整个转换是单进程、单线程、一次性的批处理. 所有步骤都以 "输出文件是否已存在"
//! (或阶段台账) 作为完成标记, 因此失败后重新运行即可从断点继续.
//!
//! # 注意
//!
//! 1. 该 crate 只读取图谱, 从不修改图谱源目录.
//! 2. 体数据统一按照 (ap, dv, ml) 轴顺序, 行优先展开.
//!
//! # 开发计划
//!
//! ### 图谱源适配 ✅
//!
//! 读取 `metadata.json`, `structures.json`, 以及 npy / tiff / nifti 格式的参考图像和标注体.
//! 根据 `structure_id_path` 重建结构层级, 并按需生成结构掩码.
//!
//! 实现位于 `atlas-berry/src/atlas`.
//!
//! ### 体数据导出 ✅
//!
//! 参考图像按自身最大值归一化为 `f32`, 标注体原样转换为 `u32`.
//! 二者均以小端字节序写为裸二进制文件.
//!
//! 实现位于 `atlas-berry/src/export/volume.rs`.
//!
//! ### 结构质心 ✅
//!
//! 对每个结构计算双侧与左半球质心, 以物理单位输出为表格.
//!
//! 实现位于 `atlas-berry/src/export/centroid.rs`.
//!
//! ### 网格修复与半球切割 ✅
//!
//! 1. 法向一致化 (统一朝外) 与拉普拉斯平滑 ✅
//! 2. 沿中线平面切割, 补面并三角化 ✅
//! 3. 每个网格在独立作用域内导入场景, 离开作用域自动移除 ✅
//!
//! 实现位于 `atlas-berry/src/mesh` 与 `atlas-berry/src/pipeline`.
//!
//! ### 完善代码文档 ⌛️
//!
//! 给每个 public API 提供文档, 并视情况给 private API 提供文档.

/// 三维索引, 按照 (ap, dv, ml) 顺序.
pub type Idx3d = (usize, usize, usize);

/// 三维实数向量.
pub type Vec3 = [f64; 3];

pub mod atlas;
pub mod consts;
pub mod convert;
pub mod data;
pub mod error;
pub mod export;
pub mod mesh;
pub mod pipeline;
pub mod prelude;

pub use atlas::{AtlasMeta, AtlasSource, BrainAtlas, Structure, StructureTree};
pub use convert::{Conversion, ConversionReport, ConvertOptions, OutputLayout};
pub use data::{StructureMask, Volume, VoxelType};
pub use error::{AtlasError, ExportError, PathIoError};
pub use export::{CentroidRecord, Outcome};
pub use mesh::{MeshError, Scene, SurfaceMesh};
pub use pipeline::{MeshPipeline, PipelineReport};
