use super::{SlideError, SlideReader};
use crate::{Idx2d, Pos0, Pyramid};
use image::{Rgb, RgbImage};
use std::path::Path;

/// 最多构造的层级个数.
const MAX_LEVELS: usize = 12;

/// 由单张栅格图像构造的内存金字塔切片.
///
/// level 0 即原图; 第 `k` 层由第 `k - 1` 层按 `factor × factor`
/// 方块取平均得到, 尺寸向下取整. 任一边长降为 0 时停止构造.
#[derive(Clone, Debug)]
pub struct PyramidSlide {
    levels: Vec<RgbImage>,
    pyramid: Pyramid,
}

impl PyramidSlide {
    /// 以 `level0` 为原始分辨率构造金字塔.
    pub fn from_image(level0: RgbImage, pyramid: Pyramid) -> Self {
        let f = pyramid.factor();
        let mut levels = vec![level0];
        while levels.len() < MAX_LEVELS {
            let last = &levels[levels.len() - 1];
            let (w, h) = (last.width() / f, last.height() / f);
            if w == 0 || h == 0 {
                break;
            }
            let next = box_downsample(last, f, (h, w));
            levels.push(next);
        }
        Self { levels, pyramid }
    }

    /// 打开 `path` 处 `image` crate 能够解码的栅格图像, 并构造金字塔.
    pub fn open<P: AsRef<Path>>(path: P, pyramid: Pyramid) -> Result<Self, SlideError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SlideError::NotFound(path.to_owned()));
        }
        let level0 = image::open(path)?.to_rgb8();
        Ok(Self::from_image(level0, pyramid))
    }

    /// 层级倍率.
    #[inline]
    pub fn pyramid(&self) -> &Pyramid {
        &self.pyramid
    }
}

/// 每 `f × f` 个像素取一次平均. 输出尺寸 `(h, w)` 由调用者保证不越界.
fn box_downsample(src: &RgbImage, f: u32, (h, w): (u32, u32)) -> RgbImage {
    let n = f * f;
    RgbImage::from_fn(w, h, |x, y| {
        let mut acc = [0u32; 3];
        for dy in 0..f {
            for dx in 0..f {
                let Rgb(p) = src.get_pixel(x * f + dx, y * f + dy);
                for (a, c) in acc.iter_mut().zip(p) {
                    *a += *c as u32;
                }
            }
        }
        Rgb(acc.map(|a| (a / n) as u8))
    })
}

impl SlideReader for PyramidSlide {
    #[inline]
    fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    fn dimensions(&self, level: u32) -> Option<Idx2d> {
        let img = self.levels.get(level as usize)?;
        Some((img.height() as usize, img.width() as usize))
    }

    fn read_region(&self, (row0, col0): Pos0, level: u32, size: usize) -> Result<RgbImage, SlideError> {
        let img = self
            .levels
            .get(level as usize)
            .ok_or(SlideError::LevelOutOfRange(level, self.level_count()))?;
        let scale = self.pyramid.scale(level) as i64;
        let (top, left) = (row0.div_euclid(scale), col0.div_euclid(scale));
        let (h, w) = (img.height() as i64, img.width() as i64);

        let side = size as u32;
        Ok(RgbImage::from_fn(side, side, |x, y| {
            let (r, c) = (top + y as i64, left + x as i64);
            if (0..h).contains(&r) && (0..w).contains(&c) {
                *img.get_pixel(c as u32, r as u32)
            } else {
                Rgb([0, 0, 0])
            }
        }))
    }
}
