//! 3D 体数据基础结构.
//!
//! 所有格式读入后都按 (ap, dv, ml) 轴顺序索引:
//!
//! - npy: 数组的第 0, 1, 2 维.
//! - nifti: 体素坐标 (i, j, k), 即按原样保存 (ap, dv, ml) 数组所得的文件.
//!   nifti 的 Fortran 存储顺序由解析器处理, 这里不再交换坐标轴.
//! - tiff: 多页灰度图像栈, 页 -> ap, 行 -> dv, 列 -> ml.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::{Array3, ArrayD, Ix3};
use ndarray_npy::{read_npy, ReadNpyError};
use nifti::{IntoNdArray, NiftiObject, NiftiType, ReaderOptions};
use num::ToPrimitive;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::ColorType;

use crate::error::{AtlasError, WithPath};
use crate::Idx3d;

mod mask;

pub use mask::StructureMask;

/// 体素在源文件中的存储类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VoxelType {
    /// `u8`.
    U8,
    /// `u16`.
    U16,
    /// `u32`.
    U32,
    /// `u64`.
    U64,
    /// `i8`.
    I8,
    /// `i16`.
    I16,
    /// `i32`.
    I32,
    /// `i64`.
    I64,
    /// `f32`.
    F32,
    /// `f64`.
    F64,
}

impl fmt::Display for VoxelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VoxelType::U8 => "uint8",
            VoxelType::U16 => "uint16",
            VoxelType::U32 => "uint32",
            VoxelType::U64 => "uint64",
            VoxelType::I8 => "int8",
            VoxelType::I16 => "int16",
            VoxelType::I32 => "int32",
            VoxelType::I64 => "int64",
            VoxelType::F32 => "float32",
            VoxelType::F64 => "float64",
        };
        f.write_str(name)
    }
}

/// 以源文件原始类型保存的 3D 体数据, 轴顺序为 (ap, dv, ml).
///
/// 保留原始类型是为了在导出时判断类型转换是否安全.
#[derive(Debug, Clone)]
pub enum Volume {
    /// `u8` 体素.
    U8(Array3<u8>),
    /// `u16` 体素.
    U16(Array3<u16>),
    /// `u32` 体素.
    U32(Array3<u32>),
    /// `u64` 体素.
    U64(Array3<u64>),
    /// `i8` 体素.
    I8(Array3<i8>),
    /// `i16` 体素.
    I16(Array3<i16>),
    /// `i32` 体素.
    I32(Array3<i32>),
    /// `i64` 体素.
    I64(Array3<i64>),
    /// `f32` 体素.
    F32(Array3<f32>),
    /// `f64` 体素.
    F64(Array3<f64>),
}

/// 对 `Volume` 的每种变体执行同一段代码.
macro_rules! for_each_variant {
    ($vol: expr, $arr: ident => $body: expr) => {
        match $vol {
            Volume::U8($arr) => $body,
            Volume::U16($arr) => $body,
            Volume::U32($arr) => $body,
            Volume::U64($arr) => $body,
            Volume::I8($arr) => $body,
            Volume::I16($arr) => $body,
            Volume::I32($arr) => $body,
            Volume::I64($arr) => $body,
            Volume::F32($arr) => $body,
            Volume::F64($arr) => $body,
        }
    };
}

macro_rules! impl_from_array {
    ($($variant: ident => $t: ty),+) => {
        $(
            impl From<Array3<$t>> for Volume {
                #[inline]
                fn from(data: Array3<$t>) -> Self {
                    Volume::$variant(data)
                }
            }
        )+
    };
}

impl_from_array!(
    U8 => u8, U16 => u16, U32 => u32, U64 => u64,
    I8 => i8, I16 => i16, I32 => i32, I64 => i64,
    F32 => f32, F64 => f64
);

impl Volume {
    /// 打开体数据文件. 根据扩展名选择 npy, tiff (`.tiff`, `.tif`)
    /// 或 nifti (`.nii`, `.nii.gz`) 解析器.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AtlasError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "npy" => Self::open_npy(path),
            "tiff" | "tif" => Self::open_tiff(path),
            _ => Self::open_nifti(path),
        }
    }

    /// npy 文件头中记录了类型描述符, 但 `ndarray-npy` 只能按给定类型读取,
    /// 因此依次尝试每种类型, 直到描述符匹配.
    fn open_npy(path: &Path) -> Result<Self, AtlasError> {
        macro_rules! try_read {
            ($($t: ty),+) => {
                $(
                    match read_npy::<_, Array3<$t>>(path) {
                        Ok(data) => return Ok(Volume::from(data)),
                        Err(ReadNpyError::WrongDescriptor(_)) => {}
                        Err(e) => return Err(e.into()),
                    }
                )+
            };
        }
        try_read!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);
        Err(AtlasError::UnsupportedType(format!(
            "in `{}`",
            path.display()
        )))
    }

    fn open_nifti(path: &Path) -> Result<Self, AtlasError> {
        let obj = ReaderOptions::new().read_file(path)?;
        let dtype = obj.header().data_type()?;
        let volume = obj.into_volume();

        macro_rules! read_as {
            ($t: ty) => {
                Volume::from(into_3d(volume.into_ndarray::<$t>()?)?)
            };
        }

        Ok(match dtype {
            NiftiType::Uint8 => read_as!(u8),
            NiftiType::Uint16 => read_as!(u16),
            NiftiType::Uint32 => read_as!(u32),
            NiftiType::Uint64 => read_as!(u64),
            NiftiType::Int8 => read_as!(i8),
            NiftiType::Int16 => read_as!(i16),
            NiftiType::Int32 => read_as!(i32),
            NiftiType::Int64 => read_as!(i64),
            NiftiType::Float32 => read_as!(f32),
            NiftiType::Float64 => read_as!(f64),
            other => return Err(AtlasError::UnsupportedType(format!("{other:?}"))),
        })
    }

    /// 读取多页 tiff. 每页必须是尺寸相同, 样本类型相同的单通道灰度图.
    fn open_tiff(path: &Path) -> Result<Self, AtlasError> {
        let file = File::open(path).with_path(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());
        let (width, height) = decoder.dimensions()?;

        let mut pages = Vec::new();
        loop {
            let (w, h) = decoder.dimensions()?;
            if (w, h) != (width, height) {
                return Err(AtlasError::ShapeMismatch {
                    what: "tiff page",
                    found: [1, h as usize, w as usize],
                    expected: [1, height as usize, width as usize],
                });
            }
            match decoder.colortype()? {
                ColorType::Gray(_) => {}
                other => return Err(AtlasError::UnsupportedType(format!("tiff {other:?}"))),
            }
            pages.push(decoder.read_image()?);
            if !decoder.more_images() {
                break;
            }
            decoder.next_image()?;
        }
        stack_pages(pages, height as usize, width as usize)
    }

    /// 源文件中的体素类型.
    pub fn voxel_type(&self) -> VoxelType {
        match self {
            Volume::U8(_) => VoxelType::U8,
            Volume::U16(_) => VoxelType::U16,
            Volume::U32(_) => VoxelType::U32,
            Volume::U64(_) => VoxelType::U64,
            Volume::I8(_) => VoxelType::I8,
            Volume::I16(_) => VoxelType::I16,
            Volume::I32(_) => VoxelType::I32,
            Volume::I64(_) => VoxelType::I64,
            Volume::F32(_) => VoxelType::F32,
            Volume::F64(_) => VoxelType::F64,
        }
    }

    /// 数据形状 (ap, dv, ml).
    #[inline]
    pub fn dim(&self) -> Idx3d {
        for_each_variant!(self, a => a.dim())
    }

    /// 数据形状, 以数组形式给出.
    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        let (ap, dv, ml) = self.dim();
        [ap, dv, ml]
    }

    /// 体素个数.
    #[inline]
    pub fn len(&self) -> usize {
        for_each_variant!(self, a => a.len())
    }

    /// 是否不含任何体素.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 转换为 `f32`. 同时返回无法表示的体素个数, 这些体素被置为 0.
    pub fn to_f32(&self) -> (Array3<f32>, usize) {
        let mut lossy = 0usize;
        let data = for_each_variant!(self, a => a.mapv(|v| {
            v.to_f32().unwrap_or_else(|| {
                lossy += 1;
                0.0
            })
        }));
        (data, lossy)
    }

    /// 转换为 `u32`. 同时返回无法表示的体素个数 (负数, 越界, 非有限值),
    /// 这些体素被置为 0. 浮点数向零取整.
    pub fn to_u32(&self) -> (Array3<u32>, usize) {
        let mut lossy = 0usize;
        let data = for_each_variant!(self, a => a.mapv(|v| {
            v.to_u32().unwrap_or_else(|| {
                lossy += 1;
                0
            })
        }));
        (data, lossy)
    }

    /// 生成体素值属于 `labels` 的掩码.
    pub fn mask_of(&self, labels: &HashSet<u64>) -> Array3<bool> {
        for_each_variant!(self, a => a.mapv(|v| {
            v.to_u64().is_some_and(|label| labels.contains(&label))
        }))
    }
}

/// 将 tiff 各页依次叠放为 (页, 行, 列) 三维数组.
fn stack_pages(pages: Vec<DecodingResult>, h: usize, w: usize) -> Result<Volume, AtlasError> {
    let depth = pages.len();
    let page_len = h * w;
    let mut pages = pages.into_iter();

    macro_rules! stack {
        ($($variant: ident),+) => {
            match pages.next() {
                $(
                    Some(DecodingResult::$variant(mut data)) => {
                        data.reserve(page_len * depth.saturating_sub(1));
                        for page in pages {
                            match page {
                                DecodingResult::$variant(p) => data.extend(p),
                                _ => return Err(AtlasError::MalformedStack("mixed sample types")),
                            }
                        }
                        if data.len() != page_len * depth {
                            return Err(AtlasError::MalformedStack("packed or multi-sample pages"));
                        }
                        Array3::from_shape_vec((depth, h, w), data)
                            .map(Volume::from)
                            .map_err(|_| AtlasError::MalformedStack("page size"))
                    }
                )+
                _ => Err(AtlasError::MalformedStack("no pages")),
            }
        };
    }
    stack!(U8, U16, U32, U64, I8, I16, I32, I64, F32, F64)
}

/// 动态维度 -> 三维.
fn into_3d<T>(data: ArrayD<T>) -> Result<Array3<T>, AtlasError> {
    let shape = data.shape().to_vec();
    data.into_dimensionality::<Ix3>()
        .map_err(|_| AtlasError::NotThreeDimensional(shape))
}
