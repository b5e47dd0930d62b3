use super::{Augmentation, Classifier, ClassifyError};
use crate::consts::{POSITIVE_COLUMN, SCORE_NOISE_FLOOR};
use crate::slide::SlideReader;
use crate::{Pyramid, Window};
use image::RgbImage;

/// 将低于 [`SCORE_NOISE_FLOOR`] 的分数记为精确的 `0.0`.
#[inline]
pub fn suppress_noise(score: f32) -> f32 {
    if score < SCORE_NOISE_FLOOR {
        0.0
    } else {
        score
    }
}

/// 将按窗口连续排列的变体分数每 `variants` 个一组取算术平均.
///
/// `scores.len()` 必须是 `variants` 的整数倍, 否则程序 panic.
pub fn average_variants(scores: &[f32], variants: usize) -> Vec<f64> {
    assert!(variants > 0 && scores.len() % variants == 0, "变体分数个数不符");
    scores
        .chunks_exact(variants)
        .map(|g| g.iter().map(|&s| s as f64).sum::<f64>() / variants as f64)
        .collect()
}

/// 把窗口序列转换为分数序列的批量分类器.
///
/// 每个窗口先在模型层级读取, 再增广为若干变体; 所有变体按 (窗口, 变体)
/// 顺序排成一列, 以不超过 `batch_size` 的批次送入分类器.
pub struct BatchClassifier<C> {
    classifier: C,
    feature_name: String,
    augmentation: Augmentation,
    batch_size: usize,
    pyramid: Pyramid,
}

impl<C: Classifier> BatchClassifier<C> {
    /// 初始化. `batch_size` 必须为正, 否则程序 panic.
    pub fn new(
        classifier: C,
        feature_name: impl Into<String>,
        augmentation: Augmentation,
        batch_size: usize,
        pyramid: Pyramid,
    ) -> Self {
        assert!(batch_size > 0, "batch_size 必须为正");
        Self {
            classifier,
            feature_name: feature_name.into(),
            augmentation,
            batch_size,
            pyramid,
        }
    }

    /// 增广策略.
    #[inline]
    pub fn augmentation(&self) -> Augmentation {
        self.augmentation
    }

    /// 消费自我, 获得底层分类器.
    #[inline]
    pub fn into_inner(self) -> C {
        self.classifier
    }

    /// 读取 `window` 并返回它的全部增广变体.
    pub fn read_variants<S: SlideReader + ?Sized>(
        &self,
        slide: &S,
        window: &Window,
    ) -> Result<Vec<RgbImage>, ClassifyError> {
        let origin = self.pyramid.origin_at_level0(window.level(), window.top_left());
        let img = slide.read_region(origin, window.level(), window.size())?;
        Ok(self.augmentation.apply(img))
    }

    /// 为 `windows` 中的每个窗口计算一个分数, 顺序与输入一致.
    pub fn classify<S: SlideReader + ?Sized>(
        &mut self,
        windows: &[Window],
        slide: &S,
    ) -> Result<Vec<f64>, ClassifyError> {
        let mut images = Vec::with_capacity(windows.len() * self.augmentation.variants());
        for w in windows {
            images.extend(self.read_variants(slide, w)?);
        }
        let scores = self.extract(&images)?;
        Ok(average_variants(&scores, self.augmentation.variants()))
    }

    /// 分批推理, 返回每张图像 (已抑制噪声) 的阳性类概率.
    pub fn extract(&mut self, images: &[RgbImage]) -> Result<Vec<f32>, ClassifyError> {
        let mut ans = Vec::with_capacity(images.len());
        let feature = [self.feature_name.as_str()];
        for (i, batch) in images.chunks(self.batch_size).enumerate() {
            log::debug!("\t\t\t sub-group {i} ({})", batch.len());
            let groups = self.classifier.batch_extract(batch, &feature)?;
            let scores = groups
                .into_iter()
                .next()
                .ok_or(ClassifyError::MissingFeatureGroup)?;
            let (rows, cols) = scores.dim();
            if rows != batch.len() || cols <= POSITIVE_COLUMN {
                return Err(ClassifyError::MalformedOutput(batch.len(), rows, cols));
            }
            ans.extend(scores.column(POSITIVE_COLUMN).iter().copied().map(suppress_noise));
        }
        Ok(ans)
    }
}

#[cfg(test)]
mod tests {
    use super::{average_variants, suppress_noise, BatchClassifier};
    use crate::classify::{Augmentation, Classifier, ClassifyError};
    use crate::{Pyramid, PyramidSlide, Window};
    use image::{Rgb, RgbImage};
    use ndarray::Array2;

    /// 按调用顺序依次吐出预设分数, 并记录每次的批大小.
    struct Scripted {
        scores: Vec<f32>,
        batches: Vec<usize>,
    }

    impl Classifier for Scripted {
        fn batch_extract(
            &mut self,
            images: &[RgbImage],
            _: &[&str],
        ) -> Result<Vec<Array2<f32>>, ClassifyError> {
            self.batches.push(images.len());
            let taken: Vec<f32> = self.scores.drain(..images.len()).collect();
            let out = Array2::from_shape_fn((images.len(), 2), |(r, c)| {
                if c == 1 {
                    taken[r]
                } else {
                    1.0 - taken[r]
                }
            });
            Ok(vec![out])
        }
    }

    /// 分数等于图像左上角像素的红色通道 / 255.
    struct RedProbe;

    impl Classifier for RedProbe {
        fn batch_extract(
            &mut self,
            images: &[RgbImage],
            _: &[&str],
        ) -> Result<Vec<Array2<f32>>, ClassifyError> {
            let out = Array2::from_shape_fn((images.len(), 2), |(r, c)| {
                let p = images[r].get_pixel(0, 0)[0] as f32 / 255.0;
                if c == 1 {
                    p
                } else {
                    1.0 - p
                }
            });
            Ok(vec![out])
        }
    }

    struct Broken;

    impl Classifier for Broken {
        fn batch_extract(
            &mut self,
            _: &[RgbImage],
            _: &[&str],
        ) -> Result<Vec<Array2<f32>>, ClassifyError> {
            Err(ClassifyError::Backend("device lost".into()))
        }
    }

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_suppress_noise() {
        assert_eq!(suppress_noise(0.0), 0.0);
        assert_eq!(suppress_noise(9.9e-5), 0.0);
        assert_eq!(suppress_noise(1e-4), 1e-4);
        assert_eq!(suppress_noise(0.5), 0.5);
    }

    #[test]
    fn test_average_variants() {
        let v = average_variants(&[0.0, 1.0, 0.5, 0.5, 0.2, 0.4], 2);
        assert_eq!(v.len(), 3);
        assert!(float_eq(v[0], 0.5));
        assert!(float_eq(v[1], 0.5));
        assert!(float_eq(v[2], 0.3));
    }

    #[test]
    fn test_batching_and_suppression_before_averaging() {
        let slide = PyramidSlide::from_image(RgbImage::new(8, 8), Pyramid::binary());
        let windows: Vec<_> = [(0, 0), (0, 4), (4, 0)]
            .into_iter()
            .map(|p| Window::new(0, p, 4))
            .collect();
        // 3 个窗口 x 6 个变体 = 18 张图, 批大小 5 -> 5, 5, 5, 3.
        let mut scores = vec![0.6f32; 18];
        // 第一个窗口的一个变体是噪声, 应先被置 0 再平均.
        scores[0] = 5e-5;
        let fake = Scripted {
            scores,
            batches: vec![],
        };
        let mut bc = BatchClassifier::new(fake, "prob", Augmentation::Dihedral, 5, Pyramid::binary());
        let out = bc.classify(&windows, &slide).unwrap();
        assert_eq!(out.len(), 3);
        assert!(float_eq(out[0], 0.6 * 5.0 / 6.0));
        assert!(float_eq(out[1], 0.6));
        assert!(float_eq(out[2], 0.6));
        assert_eq!(bc.into_inner().batches, vec![5, 5, 5, 3]);
    }

    #[test]
    fn test_reads_at_model_level() {
        // level 0 上 (8..16, 8..16) 为红色, 对应 level 1 的 (4..8, 4..8).
        let img = RgbImage::from_fn(16, 16, |x, y| {
            if x >= 8 && y >= 8 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let slide = PyramidSlide::from_image(img, Pyramid::binary());
        let windows = [Window::new(1, (4, 4), 4), Window::new(1, (0, 4), 4)];
        let mut bc = BatchClassifier::new(RedProbe, "prob", Augmentation::Identity, 100, Pyramid::binary());
        let out = bc.classify(&windows, &slide).unwrap();
        assert!(float_eq(out[0], 1.0));
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn test_failure_propagates() {
        let slide = PyramidSlide::from_image(RgbImage::new(8, 8), Pyramid::binary());
        let mut bc = BatchClassifier::new(Broken, "prob", Augmentation::Identity, 4, Pyramid::binary());
        let err = bc.classify(&[Window::new(0, (0, 0), 4)], &slide).unwrap_err();
        assert!(matches!(err, ClassifyError::Backend(_)));
    }

    #[test]
    fn test_malformed_output() {
        struct OneColumn;
        impl Classifier for OneColumn {
            fn batch_extract(
                &mut self,
                images: &[RgbImage],
                _: &[&str],
            ) -> Result<Vec<Array2<f32>>, ClassifyError> {
                Ok(vec![Array2::zeros((images.len(), 1))])
            }
        }
        let mut bc = BatchClassifier::new(OneColumn, "prob", Augmentation::Identity, 4, Pyramid::binary());
        let err = bc.extract(&[RgbImage::new(2, 2)]).unwrap_err();
        assert!(matches!(err, ClassifyError::MalformedOutput(1, 1, 1)));
    }
}
