use super::{to_gray_image, HeatmapAccumulator, HeatmapError};
use crate::classify::{Augmentation, BatchClassifier, Classifier};
use crate::dataset::SlideEntry;
use crate::persist::ImgWriteAtomic;
use crate::slide::SlideReader;
use crate::tiling::{self, TissueFilter};
use crate::{Pyramid, Window};
use image::GrayImage;
use itertools::Itertools;
use ndarray::ArrayView2;
use std::path::{Path, PathBuf};

/// 热力图生成参数. 默认值与命令行默认值一致.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeatmapParams {
    /// 模型读取图块的层级.
    pub model_level: u32,

    /// 期望的热力图层级. 实际使用 `max(model_level, heatmap_level)`.
    pub heatmap_level: u32,

    /// 组织掩膜所在层级, 也是输出热力图的层级.
    pub mask_level: u32,

    /// 模型层级上的窗口边长.
    pub window_size: usize,

    /// 模型层级上的步长.
    pub step_size: usize,

    /// 单次推理的最大图像数.
    pub batch_size: usize,

    /// 每组同时驻留内存的窗口数.
    pub group_size: usize,

    /// 测试时增广.
    pub augmentation: Augmentation,
}

impl Default for HeatmapParams {
    fn default() -> Self {
        Self {
            model_level: 0,
            heatmap_level: 2,
            mask_level: 5,
            window_size: 256,
            step_size: 100,
            batch_size: 100,
            group_size: 100,
            augmentation: Augmentation::Identity,
        }
    }
}

impl HeatmapParams {
    /// 检查所有尺寸参数为正.
    pub fn validate(&self) -> Result<(), HeatmapError> {
        let positive = [
            ("window_size", self.window_size),
            ("step_size", self.step_size),
            ("batch_size", self.batch_size),
            ("group_size", self.group_size),
        ];
        match positive.into_iter().find(|p| p.1 == 0) {
            Some((name, _)) => Err(HeatmapError::InvalidParams(name)),
            None => Ok(()),
        }
    }

    /// 实际使用的热力图层级.
    #[inline]
    pub fn effective_heatmap_level(&self) -> u32 {
        self.model_level.max(self.heatmap_level)
    }
}

/// 单张切片的处理结果.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HeatmapOutcome {
    /// 已生成并写入该路径.
    Written(PathBuf),

    /// 该路径已存在, 跳过.
    Skipped(PathBuf),
}

/// 逐切片的热力图生成器.
#[derive(Copy, Clone, Debug)]
pub struct HeatmapGenerator {
    params: HeatmapParams,
    pyramid: Pyramid,
}

impl HeatmapGenerator {
    /// 以 `params` 和层级倍率 `pyramid` 初始化, 参数非法时报错.
    pub fn new(params: HeatmapParams, pyramid: Pyramid) -> Result<Self, HeatmapError> {
        params.validate()?;
        Ok(Self { params, pyramid })
    }

    /// 生成参数.
    #[inline]
    pub fn params(&self) -> &HeatmapParams {
        &self.params
    }

    /// 用本生成器的增广、批大小和金字塔包装 `classifier`.
    pub fn batch_classifier<C: Classifier>(&self, classifier: C, feature_name: &str) -> BatchClassifier<C> {
        BatchClassifier::new(
            classifier,
            feature_name,
            self.params.augmentation,
            self.params.batch_size,
            self.pyramid,
        )
    }

    /// 切片 `entry` 对应的输出文件 `<out_dir>/<切片名>.png`.
    pub fn output_path(&self, out_dir: &Path, entry: &SlideEntry) -> PathBuf {
        out_dir.join(format!("{}.png", entry.label()))
    }

    /// 枚举窗口, 分组分类, 并合并到热力图层级的累加器中.
    ///
    /// `label` 只用于日志. 分类失败时立即返回错误.
    pub fn accumulate<C: Classifier, S: SlideReader + ?Sized>(
        &self,
        classifier: &mut BatchClassifier<C>,
        slide: &S,
        mask: Option<ArrayView2<u8>>,
        label: &str,
    ) -> Result<HeatmapAccumulator, HeatmapError> {
        let p = &self.params;
        let heatmap_level = p.effective_heatmap_level();
        let filter = mask.map(|m| TissueFilter::new(m, p.mask_level, self.pyramid));
        let tiles = tiling::enumerate(slide, filter, p.model_level, p.window_size, p.step_size)?;
        let mut acc = HeatmapAccumulator::new(slide.dimensions_or_err(heatmap_level)?);

        let variants = classifier.augmentation().variants();
        let mut total = 0;
        let groups = tiles.chunks(p.group_size);
        for (i, group) in (&groups).into_iter().enumerate() {
            let windows: Vec<Window> = group.collect();
            log::info!(
                "\t\t {label}: group {i}: {} windows ({} variants)",
                windows.len(),
                windows.len() * variants
            );
            let scores = classifier.classify(&windows, slide)?;
            for (w, s) in windows.iter().zip(scores) {
                acc.merge(w, s, heatmap_level, &self.pyramid);
            }
            total += windows.len();
        }
        log::info!("\t {label}: {total} windows in total");
        Ok(acc)
    }

    /// 终结化并重采样到掩膜层级, 得到 8-bit 热力图.
    pub fn render(&self, acc: &HeatmapAccumulator) -> GrayImage {
        let (h, w) = self.pyramid.convert_coordinate(
            self.params.effective_heatmap_level(),
            self.params.mask_level,
            acc.dims(),
        );
        to_gray_image(acc.finalize().view(), (h.max(1), w.max(1)))
    }

    /// 处理清单中的一张切片, 输出已存在时跳过.
    ///
    /// 只有在整张切片处理完成后才会 (原子地) 写出结果.
    pub fn process<C: Classifier>(
        &self,
        classifier: &mut BatchClassifier<C>,
        entry: &SlideEntry,
        out_dir: &Path,
    ) -> Result<HeatmapOutcome, HeatmapError> {
        let out = self.output_path(out_dir, entry);
        let label = entry.label();
        if out.exists() {
            log::info!("\t {label}: `{}` exists, skipping", out.display());
            return Ok(HeatmapOutcome::Skipped(out));
        }
        log::info!("Processing {label}");

        let loaded = entry.load(self.pyramid)?;
        let mask = loaded.mask.as_ref().map(|m| m.view());
        let acc = self.accumulate(classifier, &loaded.slide, mask, &label)?;
        self.render(&acc).save_atomic(&out)?;
        log::info!("\t {label}: heatmap saved to `{}`", out.display());
        Ok(HeatmapOutcome::Written(out))
    }
}

#[cfg(test)]
mod tests {
    use super::{HeatmapGenerator, HeatmapOutcome, HeatmapParams};
    use crate::classify::{Augmentation, Classifier, ClassifyError, ConstantExtractor};
    use crate::dataset::SlideEntry;
    use crate::heatmap::HeatmapError;
    use crate::{Pyramid, PyramidSlide};
    use image::{GrayImage, Luma, RgbImage};
    use ndarray::Array2;

    /// 记录调用次数的常数分类器.
    struct Counting {
        inner: ConstantExtractor,
        calls: usize,
    }

    impl Classifier for Counting {
        fn batch_extract(
            &mut self,
            images: &[RgbImage],
            feature_names: &[&str],
        ) -> Result<Vec<Array2<f32>>, ClassifyError> {
            self.calls += 1;
            self.inner.batch_extract(images, feature_names)
        }
    }

    fn params(heatmap_level: u32, mask_level: u32) -> HeatmapParams {
        HeatmapParams {
            model_level: 0,
            heatmap_level,
            mask_level,
            window_size: 4,
            step_size: 4,
            batch_size: 5,
            group_size: 3,
            augmentation: Augmentation::Identity,
        }
    }

    #[test]
    fn test_validate() {
        let mut p = params(0, 0);
        assert!(p.validate().is_ok());
        p.group_size = 0;
        assert!(matches!(p.validate(), Err(HeatmapError::InvalidParams("group_size"))));
        assert!(HeatmapGenerator::new(p, Pyramid::binary()).is_err());
        assert_eq!(HeatmapParams::default().effective_heatmap_level(), 2);
        let p = HeatmapParams {
            model_level: 3,
            ..HeatmapParams::default()
        };
        assert_eq!(p.effective_heatmap_level(), 3);
    }

    #[test]
    fn test_constant_classifier_fills_heatmap() {
        let slide = PyramidSlide::from_image(RgbImage::new(16, 16), Pyramid::binary());
        let gen = HeatmapGenerator::new(params(0, 0), Pyramid::binary()).unwrap();
        let mut bc = gen.batch_classifier(ConstantExtractor::new(0.8), "prob");
        let acc = gen.accumulate(&mut bc, &slide, None, "synthetic").unwrap();
        let h = acc.finalize();
        assert_eq!(h.dim(), (16, 16));
        assert!(h.iter().all(|&v| (v - 0.8).abs() < 1e-6));
        assert!(acc.weights().iter().all(|&w| w == 1.0));
        // 0.8 * 255 = 204
        let img = gen.render(&acc);
        assert_eq!(img.dimensions(), (16, 16));
        assert!(img.pixels().all(|p| p[0] == 204));
    }

    #[test]
    fn test_mask_limits_coverage() {
        let slide = PyramidSlide::from_image(RgbImage::new(16, 16), Pyramid::binary());
        // level 2 的 4x4 掩膜, 只有右下角是组织 -> level 0 的 (12..16, 12..16).
        let mut mask = Array2::<u8>::zeros((4, 4));
        mask[(3, 3)] = 1;
        let gen = HeatmapGenerator::new(params(0, 2), Pyramid::binary()).unwrap();
        let mut bc = gen.batch_classifier(ConstantExtractor::new(1.0), "prob");
        let acc = gen.accumulate(&mut bc, &slide, Some(mask.view()), "masked").unwrap();
        // 只剩一个窗口, 在热力图层级上占 1 个像素.
        assert_eq!(acc.weights().sum(), 1.0);
        let img = gen.render(&acc);
        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(img.get_pixel(3, 3)[0], 255);
        assert_eq!(img.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_skip_on_exists() {
        let dir = tempfile::tempdir().unwrap();
        let slide = dir.path().join("s1.png");
        let mask = dir.path().join("s1_mask.png");
        RgbImage::new(16, 16).save(&slide).unwrap();
        GrayImage::from_pixel(8, 8, Luma([255])).save(&mask).unwrap();
        let entry = SlideEntry {
            slide,
            mask: Some(mask),
        };
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();

        let gen = HeatmapGenerator::new(params(1, 1), Pyramid::binary()).unwrap();
        let counting = Counting {
            inner: ConstantExtractor::new(0.5),
            calls: 0,
        };
        let mut bc = gen.batch_classifier(counting, "prob");

        let first = gen.process(&mut bc, &entry, &out_dir).unwrap();
        let expected = out_dir.join("s1.png");
        assert_eq!(first, HeatmapOutcome::Written(expected.clone()));
        let img = image::open(&expected).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (8, 8));
        assert_eq!(img.get_pixel(4, 4)[0], 127);

        let second = gen.process(&mut bc, &entry, &out_dir).unwrap();
        assert_eq!(second, HeatmapOutcome::Skipped(expected));
        // 16 个窗口, 每组 3 个, 每组一次推理 -> 6 次; 第二次运行没有新的推理.
        assert_eq!(bc.into_inner().calls, 6);
    }

    #[test]
    fn test_failure_writes_nothing() {
        struct Broken;
        impl Classifier for Broken {
            fn batch_extract(
                &mut self,
                _: &[RgbImage],
                _: &[&str],
            ) -> Result<Vec<Array2<f32>>, ClassifyError> {
                Err(ClassifyError::Backend("out of memory".into()))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let slide = dir.path().join("s2.png");
        RgbImage::new(8, 8).save(&slide).unwrap();
        let entry = SlideEntry { slide, mask: None };

        let gen = HeatmapGenerator::new(params(0, 0), Pyramid::binary()).unwrap();
        let mut bc = gen.batch_classifier(Broken, "prob");
        let err = gen.process(&mut bc, &entry, dir.path()).unwrap_err();
        assert!(matches!(err, HeatmapError::Classify(ClassifyError::Backend(_))));
        assert!(!gen.output_path(dir.path(), &entry).exists());
    }
}
