//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, Vec3};

pub use crate::atlas::{locate_atlas, AtlasMeta, AtlasSource, BrainAtlas, Structure, StructureTree};
pub use crate::data::{StructureMask, Volume, VoxelType};

pub use crate::convert::{Conversion, ConversionReport, ConvertOptions, OutputLayout, Step};
pub use crate::error::{AtlasError, ExportError};
pub use crate::export::{compute_centroids, Centroid, CentroidRecord, Outcome, Position};

pub use crate::mesh::{ExportOptions, MeshError, Plane, Scene, SurfaceMesh};
pub use crate::pipeline::{MeshPipeline, MeshStage, PipelineReport, StageLedger};
