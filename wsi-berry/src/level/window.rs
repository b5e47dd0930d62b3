use super::Pyramid;
use crate::Idx2d;
use std::ops::Range;

/// 某一层级上的正方形窗口. 创建后不可变.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Window {
    top_left: Idx2d,
    size: usize,
    level: u32,
}

impl Window {
    /// 直接初始化.
    #[inline]
    pub const fn new(level: u32, top_left: Idx2d, size: usize) -> Self {
        Self {
            top_left,
            size,
            level,
        }
    }

    /// 左上角 `(行, 列)`.
    #[inline]
    pub fn top_left(&self) -> Idx2d {
        self.top_left
    }

    /// 边长.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// 窗口所在层级.
    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// 行范围 `[row, row + size)`.
    #[inline]
    pub fn rows(&self) -> Range<usize> {
        self.top_left.0..self.top_left.0 + self.size
    }

    /// 列范围 `[col, col + size)`.
    #[inline]
    pub fn cols(&self) -> Range<usize> {
        self.top_left.1..self.top_left.1 + self.size
    }

    /// 将左上角和边长分别换算到 `level` 层.
    pub fn at_level(&self, pyramid: &Pyramid, level: u32) -> Window {
        Window {
            top_left: pyramid.convert_coordinate(self.level, level, self.top_left),
            size: pyramid.convert_size(self.level, level, self.size),
            level,
        }
    }

    /// 将窗口裁剪到 `(h, w)` 的图像范围内, 返回 (行范围, 列范围).
    /// 完全越界时返回空范围.
    pub fn clip(&self, (h, w): Idx2d) -> (Range<usize>, Range<usize>) {
        let clamp = |r: Range<usize>, len: usize| r.start.min(len)..r.end.min(len);
        (clamp(self.rows(), h), clamp(self.cols(), w))
    }
}
