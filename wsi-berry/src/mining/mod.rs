//! 训练图块挖掘.
//!
//! 对每张切片的组织掩膜:
//!
//! 1. 清除接触边缘的连通域, 对剩余组织做 8-邻接标记;
//! 2. 丢弃小连通域, 按面积比例分配图块配额;
//! 3. 在每个连通域内采样中心点, 映射回 level 0, 截取 `output_level` 层的图块并保存.

mod quota;
mod regions;

pub use quota::allocate_quotas;
pub use regions::{label_regions, select_regions, Region};

use crate::dataset::{LoadedSlide, SlideEntry};
use crate::persist::ImgWriteAtomic;
use crate::slide::{SlideError, SlideReader};
use crate::{Pos0, Pt2d, Pyramid};
use ndarray::ArrayView2;
use rand::Rng;
use std::path::{Path, PathBuf};

/// 图块挖掘错误.
#[derive(Debug, thiserror::Error)]
pub enum MiningError {
    /// 参数非法. 携带参数名.
    #[error("`{0}` must be positive")]
    InvalidParams(&'static str),

    /// 清单没有为该切片给出掩膜.
    #[error("no tissue mask listed for `{0}`")]
    MissingMask(PathBuf),

    /// 打开切片或掩膜失败.
    #[error(transparent)]
    Slide(#[from] SlideError),

    /// 写出图块失败.
    #[error("cannot write patch: {0}")]
    Image(#[from] image::ImageError),
}

/// 图块挖掘参数. 默认值与命令行默认值一致.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MiningParams {
    /// 每张切片的图块总数.
    pub n_patches: usize,

    /// 连通域的最小面积 (掩膜像素数).
    pub area_threshold: usize,

    /// 图块在 `output_level` 层的边长.
    pub patch_size: usize,

    /// 掩膜所在层级.
    pub input_level: u32,

    /// 图块截取层级.
    pub output_level: u32,
}

impl Default for MiningParams {
    fn default() -> Self {
        Self {
            n_patches: 10,
            area_threshold: 1500,
            patch_size: 1000,
            input_level: 2,
            output_level: 0,
        }
    }
}

impl MiningParams {
    /// 检查图块边长为正.
    pub fn validate(&self) -> Result<(), MiningError> {
        if self.patch_size == 0 {
            return Err(MiningError::InvalidParams("patch_size"));
        }
        Ok(())
    }
}

/// 在连通域内取 `quota` 个掩膜层级的中心点.
///
/// 配额为 1 时取 (不取整的) 质心; 大于 1 时从连通域像素中无放回地均匀抽取,
/// 个数不超过连通域面积.
pub fn sample_points<R: Rng + ?Sized>(region: &Region, quota: usize, rng: &mut R) -> Vec<Pt2d> {
    match quota {
        0 => vec![],
        1 => vec![region.centroid],
        n => rand::seq::index::sample(rng, region.coords.len(), n.min(region.coords.len()))
            .into_iter()
            .map(|i| {
                let (r, c) = region.coords[i];
                (r as f64, c as f64)
            })
            .collect(),
    }
}

/// 图块挖掘器.
#[derive(Copy, Clone, Debug)]
pub struct PatchMiner {
    params: MiningParams,
    pyramid: Pyramid,
}

impl PatchMiner {
    /// 以 `params` 和层级倍率 `pyramid` 初始化, 参数非法时报错.
    pub fn new(params: MiningParams, pyramid: Pyramid) -> Result<Self, MiningError> {
        params.validate()?;
        Ok(Self { params, pyramid })
    }

    /// 挖掘参数.
    #[inline]
    pub fn params(&self) -> &MiningParams {
        &self.params
    }

    /// 层级倍率.
    #[inline]
    pub fn pyramid(&self) -> Pyramid {
        self.pyramid
    }

    /// 在掩膜上选出所有图块中心 (掩膜层级坐标).
    pub fn sample<R: Rng + ?Sized>(&self, mask: ArrayView2<u8>, rng: &mut R, label: &str) -> Vec<Pt2d> {
        let labels = label_regions(mask);
        let regions = select_regions(Region::collect(labels.view()), self.params.area_threshold);
        let areas: Vec<usize> = regions.iter().map(|r| r.area).collect();
        let quotas = allocate_quotas(&areas, self.params.n_patches);
        log::info!("\t {label}: {} regions above the area threshold", regions.len());

        let mut ans = vec![];
        for (region, &quota) in regions.iter().zip(quotas.iter()) {
            log::debug!(
                "\t\t {label}: region {} area {} bbox {:?} -> {quota} patches",
                region.label,
                region.area,
                region.bbox
            );
            ans.extend(sample_points(region, quota, rng));
        }
        ans
    }

    /// 掩膜层级的中心点 `point` 对应的图块在 level 0 上的左上角.
    ///
    /// `point` 可以是亚像素坐标, 只在减去半边长后截断一次.
    pub fn patch_origin(&self, point: Pt2d) -> Pos0 {
        let p = &self.params;
        let mid = self.pyramid.middle_level0_f64(p.input_level, point);
        self.pyramid.top_left_at_level0_f64(p.output_level, mid, p.patch_size)
    }

    /// 采样并截取 `slide` 的图块, 保存为 `<out_dir>/<label>-(<row0>,<col0>).png`.
    ///
    /// 返回所有写出的文件路径.
    pub fn extract<S: SlideReader + ?Sized, R: Rng + ?Sized>(
        &self,
        slide: &S,
        mask: ArrayView2<u8>,
        rng: &mut R,
        out_dir: &Path,
        label: &str,
    ) -> Result<Vec<PathBuf>, MiningError> {
        let p = &self.params;
        let mut ans = vec![];
        for point in self.sample(mask, rng, label) {
            let (row0, col0) = self.patch_origin(point);
            let patch = slide.read_region((row0, col0), p.output_level, p.patch_size)?;
            let path = out_dir.join(format!("{label}-({row0},{col0}).png"));
            patch.save_atomic(&path)?;
            ans.push(path);
        }
        log::info!("\t {label}: {} patches written", ans.len());
        Ok(ans)
    }

    /// 处理加载器给出的一张切片. 清单中必须为它给出掩膜.
    pub fn process<R: Rng + ?Sized>(
        &self,
        entry: &SlideEntry,
        loaded: LoadedSlide,
        out_dir: &Path,
        rng: &mut R,
    ) -> Result<Vec<PathBuf>, MiningError> {
        let mask = loaded
            .mask
            .as_ref()
            .ok_or_else(|| MiningError::MissingMask(entry.slide.clone()))?;
        self.extract(&loaded.slide, mask.view(), rng, out_dir, &entry.label())
    }
}

#[cfg(test)]
mod tests {
    use super::{sample_points, MiningError, MiningParams, PatchMiner, Region};
    use crate::dataset::{LoadedSlide, SlideEntry};
    use crate::mining::label_regions;
    use crate::{Pyramid, PyramidSlide};
    use image::{Rgb, RgbImage};
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn params() -> MiningParams {
        MiningParams {
            n_patches: 3,
            area_threshold: 2,
            patch_size: 4,
            input_level: 1,
            output_level: 0,
        }
    }

    /// level 1 上 16x16 的掩膜: 一个 3x3 块, 一个 2x2 块, 一个贴边块, 一个孤立像素.
    fn mask() -> Array2<u8> {
        let mut m = Array2::zeros((16, 16));
        for r in 3..6 {
            for c in 3..6 {
                m[(r, c)] = 255;
            }
        }
        for r in 10..12 {
            for c in 10..12 {
                m[(r, c)] = 255;
            }
        }
        for c in 0..3 {
            m[(0, c)] = 255;
        }
        m[(8, 14)] = 255;
        m
    }

    fn slide() -> PyramidSlide {
        let img = RgbImage::from_fn(64, 64, |x, y| Rgb([x as u8, y as u8, 0]));
        PyramidSlide::from_image(img, Pyramid::new(4).unwrap())
    }

    #[test]
    fn test_sample_points() {
        let labels = label_regions(mask().view());
        let regions = Region::collect(labels.view());
        let block = regions.iter().find(|r| r.area == 9).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        assert!(sample_points(block, 0, &mut rng).is_empty());
        assert_eq!(sample_points(block, 1, &mut rng), vec![(4.0, 4.0)]);

        let pts: Vec<_> = sample_points(block, 5, &mut rng)
            .into_iter()
            .map(|(r, c)| (r as usize, c as usize))
            .collect();
        assert_eq!(pts.len(), 5);
        assert_eq!(pts.iter().collect::<HashSet<_>>().len(), 5);
        assert!(pts.iter().all(|p| block.coords.contains(p)));

        // 配额超过面积时截断.
        assert_eq!(sample_points(block, 20, &mut rng).len(), 9);
    }

    #[test]
    fn test_patch_origin() {
        let miner = PatchMiner::new(params(), Pyramid::new(4).unwrap()).unwrap();
        // 格点 (10, 10) -> level 0 中间点 (42, 40) -> 边长 4 的左上角 (40, 38).
        assert_eq!(miner.patch_origin((10.0, 10.0)), (40, 38));
        // 2x2 块 (10..12, 10..12) 的质心 (10.5, 10.5) -> (44, 42) -> (42, 40).
        assert_eq!(miner.patch_origin((10.5, 10.5)), (42, 40));
        // 靠近原点时可能为负.
        let p = MiningParams {
            patch_size: 100,
            ..params()
        };
        let miner = PatchMiner::new(p, Pyramid::new(4).unwrap()).unwrap();
        assert_eq!(miner.patch_origin((0.0, 0.0)), (-48, -50));
    }

    #[test]
    fn test_extract() {
        let dir = tempfile::tempdir().unwrap();
        let miner = PatchMiner::new(params(), Pyramid::new(4).unwrap()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let written = miner
            .extract(&slide(), mask().view(), &mut rng, dir.path(), "s")
            .unwrap();
        assert_eq!(written.len(), 3);
        // 2x2 块配额为 1, 取质心 (10.5, 10.5).
        let centroid = dir.path().join("s-(42,40).png");
        assert_eq!(written[0], centroid);
        let patch = image::open(&centroid).unwrap().to_rgb8();
        assert_eq!(patch.dimensions(), (4, 4));
        assert_eq!(patch.get_pixel(0, 0), &Rgb([40, 42, 0]));
        assert!(written.iter().all(|p| p.is_file()));

        // 同一种子得到相同的图块.
        let again = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let names = |v: &[PathBuf]| v.iter().map(|p| p.file_name().unwrap().to_owned()).collect::<Vec<_>>();
        let rerun = miner
            .extract(&slide(), mask().view(), &mut rng, again.path(), "s")
            .unwrap();
        assert_eq!(names(&written), names(&rerun));
    }

    #[test]
    fn test_missing_mask() {
        let dir = tempfile::tempdir().unwrap();
        let miner = PatchMiner::new(params(), Pyramid::new(4).unwrap()).unwrap();
        let entry = SlideEntry {
            slide: PathBuf::from("t.png"),
            mask: None,
        };
        let loaded = LoadedSlide {
            slide: slide(),
            mask: None,
        };
        let err = miner
            .process(&entry, loaded, dir.path(), &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, MiningError::MissingMask(_)));
        assert!(matches!(
            PatchMiner::new(
                MiningParams {
                    patch_size: 0,
                    ..params()
                },
                Pyramid::new(4).unwrap()
            ),
            Err(MiningError::InvalidParams("patch_size"))
        ));
    }
}
