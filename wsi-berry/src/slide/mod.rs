//! 全切片图像的读取接口.
//!
//! 真正的切片格式 (svs, ndpi, ...) 解码由外部库负责, 本模块只规定读取边界:
//! 每一层级的尺寸, 以及按 level 0 左上角、层级和边长读取 RGB 区域.

mod mask;
mod pyramid;

pub use mask::{load_mask, mask_from_gray};
pub use pyramid::PyramidSlide;

use crate::{Idx2d, Pos0};
use image::RgbImage;
use std::path::PathBuf;

/// 切片或掩膜读取错误.
#[derive(Debug, thiserror::Error)]
pub enum SlideError {
    /// 文件不存在.
    #[error("file `{0}` does not exist")]
    NotFound(PathBuf),

    /// 请求的层级不存在.
    ///
    /// 第一个参数代表请求的层级, 第二个参数代表切片实际的层级个数.
    #[error("level {0} is out of range (the slide has {1} levels)")]
    LevelOutOfRange(u32, u32),

    /// 图像解码或编码错误.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// 已打开的全切片图像句柄.
///
/// 句柄由调用者持有, 只在处理一张切片的期间存活, 不跨调用缓存.
pub trait SlideReader {
    /// 层级个数. 合法层级为 `0..self.level_count()`.
    fn level_count(&self) -> u32;

    /// `level` 层图像尺寸 (高, 宽). 层级不存在时返回 `None`.
    fn dimensions(&self, level: u32) -> Option<Idx2d>;

    /// 读取 `level` 层上边长为 `size` 的正方形 RGB 区域.
    ///
    /// 区域左上角以 **level 0** 坐标 `top_left0` 给出, 可以为负或越界;
    /// 越界部分以黑色填充.
    fn read_region(&self, top_left0: Pos0, level: u32, size: usize) -> Result<RgbImage, SlideError>;

    /// 与 [`Self::dimensions`] 相同, 但层级不存在时返回错误.
    fn dimensions_or_err(&self, level: u32) -> Result<Idx2d, SlideError> {
        self.dimensions(level)
            .ok_or(SlideError::LevelOutOfRange(level, self.level_count()))
    }
}
