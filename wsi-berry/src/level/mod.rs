//! 多分辨率 (金字塔层级) 坐标映射.
//!
//! 全切片图像的 level 0 是原始分辨率, 层级每加一, 线性分辨率除以一次倍率
//! (`factor`, 通常为 2 或 4). 同一个 [`Pyramid`] 的所有换算都使用同一个倍率.
//!
//! 层级之间的换算默认使用截断 (向下取整) 的整数除法. 这种截断决定了图块的对齐方式,
//! 改变它会改变输出, 因此 [`Rounding::Floor`] 是默认值.

mod window;

pub use window::Window;

use crate::{Idx2d, Pos0, Pt2d};

/// 由细层级换算到粗层级时的舍入方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rounding {
    /// 截断, 即向下取整.
    #[default]
    Floor,

    /// 四舍五入 (`.5` 向上).
    Nearest,
}

/// 层级倍率与舍入方式. 纯计算, 无内部状态.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pyramid {
    factor: u32,
    rounding: Rounding,
}

impl Pyramid {
    /// 以倍率 `factor` 构建. `factor` 必须至少为 2, 否则返回 `None`.
    pub fn new(factor: u32) -> Option<Self> {
        (factor >= 2).then_some(Self {
            factor,
            rounding: Rounding::Floor,
        })
    }

    /// 相邻层级线性分辨率相差 2 倍的金字塔. 热力图生成器使用该倍率.
    #[inline]
    pub const fn binary() -> Self {
        Self {
            factor: crate::consts::HEATMAP_LEVEL_FACTOR,
            rounding: Rounding::Floor,
        }
    }

    /// 替换舍入方式.
    #[inline]
    pub fn with_rounding(self, rounding: Rounding) -> Self {
        Self { rounding, ..self }
    }

    /// 层级倍率.
    #[inline]
    pub fn factor(&self) -> u32 {
        self.factor
    }

    /// 舍入方式.
    #[inline]
    pub fn rounding(&self) -> Rounding {
        self.rounding
    }

    /// `level` 层的一个像素在 level 0 上的边长, 即 `factor ^ level`.
    ///
    /// 结果超出 `usize` 表示范围时程序 panic.
    pub fn scale(&self, level: u32) -> usize {
        num::checked_pow(self.factor as usize, level as usize)
            .unwrap_or_else(|| panic!("层级 {level} 超出倍率 {} 的可表示范围", self.factor))
    }

    /// 将长度 `x` 缩小 `d` 倍.
    #[inline]
    fn shrink(&self, x: usize, d: usize) -> usize {
        match self.rounding {
            Rounding::Floor => x / d,
            Rounding::Nearest => (x + d / 2) / d,
        }
    }

    /// 将 `from` 层的长度 `size` 换算到 `to` 层, 即乘以 `factor ^ (from - to)`.
    ///
    /// 当 `from < to` 时是 (默认截断的) 整数除法.
    pub fn convert_size(&self, from: u32, to: u32, size: usize) -> usize {
        if from >= to {
            size * self.scale(from - to)
        } else {
            self.shrink(size, self.scale(to - from))
        }
    }

    /// 将 `from` 层的坐标 `(row, col)` 换算到 `to` 层. 规则同 [`Self::convert_size`].
    #[inline]
    pub fn convert_coordinate(&self, from: u32, to: u32, (row, col): Idx2d) -> Idx2d {
        (
            self.convert_size(from, to, row),
            self.convert_size(from, to, col),
        )
    }

    /// 由 level 0 的图像尺寸 `(h, w)` 推算 `level` 层的尺寸.
    #[inline]
    pub fn level_dimensions(&self, dims0: Idx2d, level: u32) -> Idx2d {
        self.convert_coordinate(0, level, dims0)
    }

    /// `level` 层的坐标 `(row, col)` 覆盖的全部 level 0 坐标.
    ///
    /// 返回 `factor^level × factor^level` 个坐标, 按行优先排列.
    pub fn to_level0_range(&self, level: u32, (row, col): Idx2d) -> Vec<Idx2d> {
        let v = self.scale(level);
        let mut ans = Vec::with_capacity(v * v);
        for dh in 0..v {
            ans.extend((0..v).map(|dw| (row * v + dh, col * v + dw)));
        }
        ans
    }

    /// [`Self::to_level0_range`] 结果中位于正中 (下标 `len / 2`) 的那个坐标,
    /// 作为 `level` 层坐标在 level 0 上的代表点. 不分配内存.
    pub fn middle_level0(&self, level: u32, (row, col): Idx2d) -> Idx2d {
        let v = self.scale(level);
        let mid = v * v / 2;
        (row * v + mid / v, col * v + mid % v)
    }

    /// 给定 level 0 上的中心点 `(row0, col0)`, 求以其为中心、在 `output_level`
    /// 层边长为 `window_size` 的窗口在 level 0 上的左上角.
    ///
    /// 窗口在 level 0 上的边长为 `window_size * factor^output_level`.
    /// 半边长为小数时向零截断. 结果可能为负.
    pub fn top_left_at_level0(&self, output_level: u32, (row0, col0): Idx2d, window_size: usize) -> Pos0 {
        let full = (window_size * self.scale(output_level)) as i64;
        // (2r - full) / 2 与 trunc(r - full / 2) 相同.
        let shift = |x: usize| (2 * x as i64 - full) / 2;
        (shift(row0), shift(col0))
    }

    /// [`Self::middle_level0`] 的浮点版本, 用于亚像素坐标 (例如连通域质心).
    ///
    /// 块的起点 `(row * v, col * v)` 不取整, 再加上代表点在块内的整数偏移.
    pub fn middle_level0_f64(&self, level: u32, (row, col): Pt2d) -> Pt2d {
        let v = self.scale(level);
        let mid = v * v / 2;
        let vf = v as f64;
        (row * vf + (mid / v) as f64, col * vf + (mid % v) as f64)
    }

    /// [`Self::top_left_at_level0`] 的浮点版本. 减去半边长之后才向零截断, 全程只截断一次.
    pub fn top_left_at_level0_f64(&self, output_level: u32, (row0, col0): Pt2d, window_size: usize) -> Pos0 {
        let half = (window_size * self.scale(output_level)) as f64 / 2.0;
        ((row0 - half).trunc() as i64, (col0 - half).trunc() as i64)
    }

    /// 将 `level` 层的左上角 `(row, col)` 换算为 level 0 坐标, 即读取区域时所需的坐标.
    #[inline]
    pub fn origin_at_level0(&self, level: u32, pos: Idx2d) -> Pos0 {
        let (r, c) = self.convert_coordinate(level, 0, pos);
        (r as i64, c as i64)
    }
}

impl Default for Pyramid {
    #[inline]
    fn default() -> Self {
        Self::binary()
    }
}
