//! 体数据导出.
//!
//! 两个缓冲区都按 (ap, dv, ml) 行优先展开, 以小端字节序写出.

use std::path::Path;

use log::{info, warn};

use super::{write_atomic, Outcome};
use crate::data::{Volume, VoxelType};
use crate::error::ExportError;

/// 参考图像 -> `f32` 缓冲区, 并按自身最大值归一化到 `[0, 1]`.
///
/// 全零 (或最大值非正) 的参考图像不做缩放, 按原值写出.
pub fn reference_bytes(volume: &Volume) -> Vec<u8> {
    if volume.voxel_type() != VoxelType::F32 {
        warn!(
            "reference image is stored as {}, casting to float32",
            volume.voxel_type()
        );
    }
    let (data, lossy) = volume.to_f32();
    if lossy > 0 {
        warn!("{lossy} reference voxels are not representable as float32, written as 0");
    }

    let max = data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let scale = if max > 0.0 && max.is_finite() {
        max
    } else {
        warn!("reference image has no positive maximum ({max}), skipping normalization");
        1.0
    };
    if data.iter().any(|v| *v < 0.0) {
        warn!("reference image contains negative intensities");
    }

    let mut buf = Vec::with_capacity(data.len() * 4);
    // 逻辑顺序迭代, 与内存布局无关.
    for v in data.iter() {
        buf.extend_from_slice(&(v / scale).to_le_bytes());
    }
    buf
}

/// 标注体 -> `u32` 缓冲区. 标签值不做任何缩放.
pub fn annotation_bytes(volume: &Volume) -> Vec<u8> {
    if volume.voxel_type() != VoxelType::U32 {
        warn!(
            "annotation volume is stored as {}, casting to uint32",
            volume.voxel_type()
        );
    }
    let (data, lossy) = volume.to_u32();
    if lossy > 0 {
        warn!("{lossy} annotation voxels are not representable as uint32, written as 0");
    }

    let mut buf = Vec::with_capacity(data.len() * 4);
    for v in data.iter() {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

/// 写出 `reference.bytes`. 文件已存在时跳过.
pub fn write_reference<P: AsRef<Path>>(volume: &Volume, path: P) -> Result<Outcome, ExportError> {
    write_once(path.as_ref(), || reference_bytes(volume))
}

/// 写出 `annotation.bytes`. 文件已存在时跳过.
pub fn write_annotation<P: AsRef<Path>>(volume: &Volume, path: P) -> Result<Outcome, ExportError> {
    write_once(path.as_ref(), || annotation_bytes(volume))
}

fn write_once<F: FnOnce() -> Vec<u8>>(path: &Path, make: F) -> Result<Outcome, ExportError> {
    if path.exists() {
        info!("{} exists, skipping", path.display());
        return Ok(Outcome::Skipped);
    }
    write_atomic(path, &make())?;
    info!("wrote {}", path.display());
    Ok(Outcome::Done)
}
