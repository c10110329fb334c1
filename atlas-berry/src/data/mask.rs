use ndarray::{s, Array3, ArrayView3, Axis};

use crate::consts::ML_AXIS;
use crate::Idx3d;

/// 结构掩码. 体素属于该结构 (或其任一后代结构) 时为 `true`.
#[derive(Debug, Clone)]
pub struct StructureMask {
    data: Array3<bool>,
}

impl StructureMask {
    /// 从布尔体数据直接创建.
    #[inline]
    pub fn new(data: Array3<bool>) -> Self {
        Self { data }
    }

    /// 数据形状 (ap, dv, ml).
    #[inline]
    pub fn dim(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, bool> {
        self.data.view()
    }

    /// 前景体素个数.
    #[inline]
    pub fn count(&self) -> usize {
        count(self.data.view())
    }

    /// 是否不含前景体素.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|m| *m)
    }

    /// 左半球视图: ml 轴索引限制在 `[0, ml / 2)` (向下取整).
    #[inline]
    pub fn left(&self) -> ArrayView3<'_, bool> {
        let half = self.data.len_of(Axis(ML_AXIS)) / 2;
        self.data.slice(s![.., .., ..half])
    }

    /// 所有前景体素索引的算术平均, 按 (axis 0, axis 1, axis 2) 顺序.
    /// 不存在前景时返回 `None`.
    #[inline]
    pub fn mean_index(&self) -> Option<[f64; 3]> {
        mean_index(self.data.view())
    }

    /// 左半球前景体素索引的算术平均. 不存在前景时返回 `None`.
    #[inline]
    pub fn left_mean_index(&self) -> Option<[f64; 3]> {
        mean_index(self.left())
    }
}

/// 视图中的前景体素个数.
#[inline]
pub fn count(view: ArrayView3<'_, bool>) -> usize {
    view.iter().filter(|m| **m).count()
}

/// 视图中前景体素索引的算术平均. 不存在前景时返回 `None`.
pub fn mean_index(view: ArrayView3<'_, bool>) -> Option<[f64; 3]> {
    // 索引和用整数累加, 避免大体积下浮点累加误差.
    let mut sum = [0u128; 3];
    let mut n = 0u128;
    for ((a, b, c), _) in view.indexed_iter().filter(|(_, m)| **m) {
        sum[0] += a as u128;
        sum[1] += b as u128;
        sum[2] += c as u128;
        n += 1;
    }
    (n > 0).then(|| sum.map(|s| s as f64 / n as f64))
}
