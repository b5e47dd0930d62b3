//! 批量分类适配.
//!
//! 分类模型本身是外部协作者, 只通过 [`Classifier`] 这一个能力接入:
//! 给定一批图像和特征名, 返回每个特征组的分数矩阵. 具体实现在构造时按名字从
//! [`ClassifierRegistry`] 中选取.

mod augment;
mod batch;
mod builtin;
mod registry;

pub use augment::Augmentation;
pub use batch::{average_variants, suppress_noise, BatchClassifier};
pub use builtin::{ConstantExtractor, HematoxylinExtractor};
pub use registry::{ClassifierRegistry, DeviceOptions, Factory};

use crate::slide::SlideError;
use image::RgbImage;
use ndarray::Array2;
use std::path::PathBuf;

/// 分类阶段的运行时错误.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// 不支持的增广变体数. 只支持 1 或 6.
    #[error("unsupported augmentation count {0} (expected 1 or 6)")]
    UnsupportedAugmentation(u32),

    /// 注册表中没有该名字的分类器.
    #[error("unknown extractor `{0}`")]
    UnknownExtractor(String),

    /// 读取或解析分类器配置文件失败.
    #[error("cannot load extractor config `{path}`: {reason}")]
    Config {
        /// 配置文件路径.
        path: PathBuf,
        /// 失败原因.
        reason: String,
    },

    /// 分类器没有返回任何特征组.
    #[error("classifier returned no feature group")]
    MissingFeatureGroup,

    /// 分类器输出形状不符.
    ///
    /// 第一个参数代表期望行数 (即图像数), 后两个参数代表实际的 (行, 列).
    #[error("classifier output has shape {1}x{2}, expected {0} rows with at least 2 columns")]
    MalformedOutput(usize, usize, usize),

    /// 分类器内部错误.
    #[error("classifier failed: {0}")]
    Backend(String),

    /// 读取切片区域失败.
    #[error(transparent)]
    Slide(#[from] SlideError),
}

/// 外部分类模型.
pub trait Classifier {
    /// 对 `images` 做一次批量推理.
    ///
    /// 返回值中每个元素对应 `feature_names` 中的一个特征组, 形状为
    /// `(images.len(), 类别数)`. 第 1 列 (从 0 开始) 是阳性类概率.
    fn batch_extract(
        &mut self,
        images: &[RgbImage],
        feature_names: &[&str],
    ) -> Result<Vec<Array2<f32>>, ClassifyError>;
}

impl<C: Classifier + ?Sized> Classifier for &mut C {
    #[inline]
    fn batch_extract(
        &mut self,
        images: &[RgbImage],
        feature_names: &[&str],
    ) -> Result<Vec<Array2<f32>>, ClassifyError> {
        (**self).batch_extract(images, feature_names)
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    #[inline]
    fn batch_extract(
        &mut self,
        images: &[RgbImage],
        feature_names: &[&str],
    ) -> Result<Vec<Array2<f32>>, ClassifyError> {
        (**self).batch_extract(images, feature_names)
    }
}
