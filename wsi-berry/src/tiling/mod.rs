//! 图块枚举.
//!
//! 在模型层级上按固定步长行优先地遍历候选窗口左上角. 当窗口会越过图像边界时,
//! 将其贴着远端边界截断, 因此最后一行/列总会被完整覆盖 (可能与前一个窗口重叠).
//! 给定组织掩膜时, 只保留在掩膜层级上与组织有交集的窗口.

mod iter;

pub use iter::{TileIter, Tiles};

use crate::consts::label::is_tissue;
use crate::slide::{SlideError, SlideReader};
use crate::{Idx2d, Pyramid, Window};
use ndarray::{s, ArrayView2};

/// 图块枚举参数错误.
#[derive(Debug, thiserror::Error)]
pub enum TilingError {
    /// 窗口边长为 0.
    #[error("window size must be positive")]
    ZeroWindow,

    /// 步长为 0.
    #[error("step size must be positive")]
    ZeroStep,

    /// 读取层级尺寸失败.
    #[error(transparent)]
    Slide(#[from] SlideError),
}

/// 模型层级上的候选窗口网格. 可以被反复迭代.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TileGrid {
    level: u32,
    dims: Idx2d,
    window: usize,
    step: usize,
}

impl TileGrid {
    /// 在 `level` 层尺寸为 `dims` (高, 宽) 的图像上构建网格.
    pub fn new(level: u32, dims: Idx2d, window: usize, step: usize) -> Result<Self, TilingError> {
        if window == 0 {
            return Err(TilingError::ZeroWindow);
        }
        if step == 0 {
            return Err(TilingError::ZeroStep);
        }
        Ok(Self {
            level,
            dims,
            window,
            step,
        })
    }

    /// 网格所在层级.
    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// 图像尺寸 (高, 宽).
    #[inline]
    pub fn dims(&self) -> Idx2d {
        self.dims
    }

    /// 窗口边长.
    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    /// 步长.
    #[inline]
    pub fn step(&self) -> usize {
        self.step
    }

    /// 行优先地迭代所有 (截断后的) 候选窗口.
    #[inline]
    pub fn iter(&self) -> TileIter {
        TileIter::new(*self)
    }

    /// 将候选坐标 `pos` 截断, 使长度为 `self.window` 的窗口不越过 `extent`.
    /// 窗口比图像还大时贴在 0 处.
    #[inline]
    pub(crate) fn clamp(&self, pos: usize, extent: usize) -> usize {
        if pos + self.window > extent {
            extent.saturating_sub(self.window)
        } else {
            pos
        }
    }
}

impl IntoIterator for &TileGrid {
    type Item = Window;
    type IntoIter = TileIter;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// 按组织掩膜过滤窗口.
#[derive(Copy, Clone, Debug)]
pub struct TissueFilter<'a> {
    mask: ArrayView2<'a, u8>,
    mask_level: u32,
    pyramid: Pyramid,
}

impl<'a> TissueFilter<'a> {
    /// 以 `mask_level` 层的掩膜 `mask` 构建过滤器.
    #[inline]
    pub fn new(mask: ArrayView2<'a, u8>, mask_level: u32, pyramid: Pyramid) -> Self {
        Self {
            mask,
            mask_level,
            pyramid,
        }
    }

    /// 判断窗口在掩膜层级上对应的区域是否含有至少一个组织像素.
    ///
    /// 换算后的边长至少取 1 个掩膜像素, 避免小窗口被截断为空区域.
    /// 越界部分被裁掉.
    pub fn overlaps(&self, window: &Window) -> bool {
        let at = window.at_level(&self.pyramid, self.mask_level);
        let at = Window::new(at.level(), at.top_left(), at.size().max(1));
        let (rows, cols) = at.clip(self.mask.dim());
        self.mask
            .slice(s![rows, cols])
            .iter()
            .copied()
            .any(is_tissue)
    }
}

/// 枚举 `slide` 在 `model_level` 层上需要处理的全部窗口.
///
/// `mask` 为 `None` 时保留所有窗口. 返回的序列是惰性的、有限的,
/// 并且可以通过 `clone` 重新开始.
pub fn enumerate<'a, S: SlideReader + ?Sized>(
    slide: &S,
    mask: Option<TissueFilter<'a>>,
    model_level: u32,
    window_size: usize,
    step_size: usize,
) -> Result<Tiles<'a>, TilingError> {
    let dims = slide.dimensions_or_err(model_level)?;
    let grid = TileGrid::new(model_level, dims, window_size, step_size)?;
    Ok(Tiles::new(grid, mask))
}
