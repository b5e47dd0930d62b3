//! 内置分类器. 不依赖外部模型, 用于流程验证和无模型环境下的粗筛.

use super::{Classifier, ClassifyError, DeviceOptions};
use image::RgbImage;
use ndarray::Array2;
use serde_json::{Map, Value};
use std::path::Path;

fn config_err(path: &Path, reason: impl Into<String>) -> ClassifyError {
    ClassifyError::Config {
        path: path.to_owned(),
        reason: reason.into(),
    }
}

/// 读取 JSON 配置文件. 顶层必须是对象.
fn load_config(path: &Path) -> Result<Map<String, Value>, ClassifyError> {
    let text = std::fs::read_to_string(path).map_err(|e| config_err(path, e.to_string()))?;
    match serde_json::from_str::<Value>(&text).map_err(|e| config_err(path, e.to_string()))? {
        Value::Object(m) => Ok(m),
        _ => Err(config_err(path, "top level must be an object")),
    }
}

/// 取出数值字段. 字段缺失时为 `None`, 类型不符时报错.
fn number(cfg: &Map<String, Value>, key: &str, path: &Path) -> Result<Option<f64>, ClassifyError> {
    match cfg.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| config_err(path, format!("`{key}` must be a number"))),
    }
}

#[inline]
fn warn_cpu_only(name: &str, device: &DeviceOptions) {
    if device.use_accelerator {
        log::warn!(
            "Extractor `{name}` runs on CPU only, ignoring accelerator {}",
            device.device_id
        );
    }
}

/// 由阳性概率构造两列 `[1 - p, p]` 的输出矩阵.
fn two_class<I: IntoIterator<Item = f32>>(probs: I) -> Array2<f32> {
    let p: Vec<f32> = probs.into_iter().collect();
    Array2::from_shape_fn((p.len(), 2), |(r, c)| if c == 1 { p[r] } else { 1.0 - p[r] })
}

/// 对任何图像都给出固定阳性概率的分类器.
///
/// 配置文件形如 `{"probability": 0.8}`.
#[derive(Copy, Clone, Debug)]
pub struct ConstantExtractor {
    probability: f32,
}

impl ConstantExtractor {
    /// 以固定概率 `probability` 构建, 概率会被截断到 `[0, 1]`.
    #[inline]
    pub fn new(probability: f32) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
        }
    }

    /// 注册表工厂.
    pub fn factory(config: &Path, device: &DeviceOptions) -> Result<Box<dyn Classifier>, ClassifyError> {
        warn_cpu_only("constant", device);
        let cfg = load_config(config)?;
        let probability =
            number(&cfg, "probability", config)?.ok_or_else(|| config_err(config, "missing `probability`"))?;
        Ok(Box::new(Self::new(probability as f32)))
    }
}

impl Classifier for ConstantExtractor {
    fn batch_extract(
        &mut self,
        images: &[RgbImage],
        feature_names: &[&str],
    ) -> Result<Vec<Array2<f32>>, ClassifyError> {
        let one = two_class(images.iter().map(|_| self.probability));
        Ok(vec![one; feature_names.len().max(1)])
    }
}

/// 以暗染色像素比例估计阳性概率的启发式分类器.
///
/// 苏木精染色的细胞核在 RGB 图像上表现为偏蓝的暗像素. 像素三通道均值低于
/// `dark_threshold` 且蓝色通道不低于红色通道时记为核像素; 概率为核像素比例除以
/// `saturation` 后截断到 `[0, 1]`.
///
/// 配置文件形如 `{"dark_threshold": 100, "saturation": 0.25}`, 两个字段均可省略.
#[derive(Copy, Clone, Debug)]
pub struct HematoxylinExtractor {
    dark_threshold: u8,
    saturation: f32,
}

impl Default for HematoxylinExtractor {
    fn default() -> Self {
        Self {
            dark_threshold: 100,
            saturation: 0.25,
        }
    }
}

impl HematoxylinExtractor {
    /// 注册表工厂.
    pub fn factory(config: &Path, device: &DeviceOptions) -> Result<Box<dyn Classifier>, ClassifyError> {
        warn_cpu_only("hematoxylin", device);
        let cfg = load_config(config)?;
        let mut ext = Self::default();
        if let Some(t) = number(&cfg, "dark_threshold", config)? {
            if !(0.0..=255.0).contains(&t) {
                return Err(config_err(config, format!("dark_threshold must be in [0, 255], got {t}")));
            }
            ext.dark_threshold = t as u8;
        }
        if let Some(s) = number(&cfg, "saturation", config)? {
            if s.is_nan() || s <= 0.0 {
                return Err(config_err(config, format!("saturation must be positive, got {s}")));
            }
            ext.saturation = s as f32;
        }
        Ok(Box::new(ext))
    }

    /// 单张图像的阳性概率.
    pub fn probability(&self, img: &RgbImage) -> f32 {
        let total = img.pixels().len();
        if total == 0 {
            return 0.0;
        }
        let nuclei = img
            .pixels()
            .filter(|p| {
                let [r, g, b] = p.0;
                let mean = (r as u32 + g as u32 + b as u32) / 3;
                mean < self.dark_threshold as u32 && b >= r
            })
            .count();
        (nuclei as f32 / total as f32 / self.saturation).clamp(0.0, 1.0)
    }
}

impl Classifier for HematoxylinExtractor {
    fn batch_extract(
        &mut self,
        images: &[RgbImage],
        feature_names: &[&str],
    ) -> Result<Vec<Array2<f32>>, ClassifyError> {
        let one = two_class(images.iter().map(|img| self.probability(img)));
        Ok(vec![one; feature_names.len().max(1)])
    }
}
