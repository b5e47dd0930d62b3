//! 热力图生成.
//!
//! 每张切片独立处理: 枚举模型层级的窗口, 分组分类, 把 `(窗口, 分数)`
//! 合并到热力图层级的累加器, 终结化后重采样到掩膜层级, 写出 8-bit 灰度图.

mod accumulator;
mod generate;
mod render;

pub use accumulator::HeatmapAccumulator;
pub use generate::{HeatmapGenerator, HeatmapOutcome, HeatmapParams};
pub use render::{area_resize, to_gray_image};

use crate::classify::ClassifyError;
use crate::slide::SlideError;
use crate::tiling::TilingError;

/// 热力图生成错误.
#[derive(Debug, thiserror::Error)]
pub enum HeatmapError {
    /// 参数非法. 携带参数名.
    #[error("`{0}` must be positive")]
    InvalidParams(&'static str),

    /// 打开切片或掩膜失败.
    #[error(transparent)]
    Slide(#[from] SlideError),

    /// 图块枚举失败.
    #[error(transparent)]
    Tiling(#[from] TilingError),

    /// 分类失败. 该切片被放弃, 不会写出任何结果.
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// 写出热力图失败.
    #[error("cannot write heatmap: {0}")]
    Image(#[from] image::ImageError),
}
