use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::consts::ML_AXIS;
use crate::error::{AtlasError, WithPath};

/// 图谱元信息.
///
/// 原始字典完整保留, 以便原样导出; `shape` 与 `resolution` 额外解析为强类型字段.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasMeta {
    raw: Map<String, Value>,
    shape: [usize; 3],
    resolution: [f64; 3],
}

impl AtlasMeta {
    /// 从 `metadata.json` 读取.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AtlasError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_path(path)?;
        let value = serde_json::from_str(&text).map_err(|source| AtlasError::Json {
            path: path.to_owned(),
            source,
        })?;
        Self::from_value(value)
    }

    /// 从 JSON 值解析. 值必须是对象, 且包含长度为 3 的 `shape` 与 `resolution`.
    pub fn from_value(value: Value) -> Result<Self, AtlasError> {
        let Value::Object(raw) = value else {
            return Err(AtlasError::BadMetadata("<root>"));
        };

        let shape = triple(&raw, "shape", Value::as_u64)?.map(|v| v as usize);
        let resolution = triple(&raw, "resolution", Value::as_f64)?;
        Ok(Self {
            raw,
            shape,
            resolution,
        })
    }

    /// 原始字典.
    #[inline]
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// 体数据形状 (ap, dv, ml).
    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// 单个体素在三个轴上的物理尺寸 (ap, dv, ml), 通常以微米为单位.
    #[inline]
    pub fn resolution(&self) -> [f64; 3] {
        self.resolution
    }

    /// 图谱在内外侧方向上的物理总宽度, 即 `shape[2] * resolution[2]`.
    #[inline]
    pub fn ml_extent(&self) -> f64 {
        self.shape[ML_AXIS] as f64 * self.resolution[ML_AXIS]
    }

    /// 元信息中的 `name` 字段.
    pub fn name(&self) -> Option<&str> {
        self.raw.get("name").and_then(Value::as_str)
    }
}

/// 读取长度为 3 的数值数组字段.
fn triple<T: Copy + Default>(
    raw: &Map<String, Value>,
    key: &'static str,
    conv: fn(&Value) -> Option<T>,
) -> Result<[T; 3], AtlasError> {
    let items = raw
        .get(key)
        .and_then(Value::as_array)
        .filter(|a| a.len() == 3)
        .ok_or(AtlasError::BadMetadata(key))?;
    let mut ans = [T::default(); 3];
    for (slot, item) in ans.iter_mut().zip(items) {
        *slot = conv(item).ok_or(AtlasError::BadMetadata(key))?;
    }
    Ok(ans)
}
