#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 为增殖检测流程提供全切片病理图像 (WSI) 的多分辨率坐标映射,
//! 热力图生成与训练图块挖掘的基础算法.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 切片格式解码不在本 crate 的职责内. 读取切片通过 [`slide::SlideReader`]
//!   trait 完成; 内置的 [`slide::PyramidSlide`] 只负责从普通栅格图像构造金字塔.
//! 2. 分类模型同样是外部协作者, 通过 [`classify::Classifier`] trait 接入.
//! 3. 全库统一使用 `(行, 列)` 即 `(h, w)` 的索引顺序, 包括图像尺寸.
//!
//! # 开发计划
//!
//! ### 多分辨率坐标映射 ✅
//!
//! 模型层级, 掩膜层级, 热力图层级与 level 0 之间的点/长度换算.
//! 换算一律使用截断 (向下取整) 的整数除法.
//!
//! 实现位于 `wsi-berry/src/level`.
//!
//! ### 图块枚举 ✅
//!
//! 按步长行优先遍历模型层级图像, 边界窗口贴边截断, 可选地用组织掩膜过滤.
//!
//! 实现位于 `wsi-berry/src/tiling`.
//!
//! ### 批量分类适配 ✅
//!
//! 数据增广 (1 或 6 个变体), 定长批次推理, 噪声分数抑制, 变体平均.
//!
//! 实现位于 `wsi-berry/src/classify`.
//!
//! ### 热力图累加 ✅
//!
//! 重叠窗口的逐像素滑动加权平均, 终结化, 面积重采样与 8-bit 输出.
//!
//! 实现位于 `wsi-berry/src/heatmap`.
//!
//! ### 图块挖掘 ✅
//!
//! 清除边缘连通域, 8-邻接标记, 按面积分配配额, 采样并截取 level 0 图块.
//!
//! 实现位于 `wsi-berry/src/mining`.
//!
//! ### 可选的舍入模式 ✅
//!
//! 层级换算默认截断, 也可改为四舍五入, 见 [`level::Rounding`].

/// 二维索引 `(行, 列)`, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// level 0 上的有符号坐标 `(行, 列)`. 以中心点反推左上角时可能为负.
pub type Pos0 = (i64, i64);

/// 二维浮点坐标 `(行, 列)`, 用于质心等亚像素位置.
pub type Pt2d = (f64, f64);

type Area2d = Vec<Idx2d>;
type Areas2d = Vec<Area2d>;

pub mod consts;

pub mod level;

pub mod slide;

pub mod tiling;

pub mod classify;

pub mod heatmap;

pub mod mining;

pub mod dataset;

pub mod persist;

pub mod prelude;

pub use level::{Pyramid, Window};
pub use slide::{PyramidSlide, SlideReader};
