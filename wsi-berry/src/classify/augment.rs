use super::ClassifyError;
use image::imageops;
use image::RgbImage;

/// 测试时数据增广策略.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Augmentation {
    /// 原图, 1 个变体.
    #[default]
    Identity,

    /// 0°, 90°, 180°, 270° 旋转, 以及原图的水平、垂直镜像, 共 6 个变体.
    Dihedral,
}

impl Augmentation {
    /// 每个窗口产生的变体个数.
    #[inline]
    pub const fn variants(&self) -> usize {
        match self {
            Self::Identity => 1,
            Self::Dihedral => 6,
        }
    }

    /// 对 `img` 做增广, 按固定顺序返回所有变体. 第一个变体总是原图.
    pub fn apply(&self, img: RgbImage) -> Vec<RgbImage> {
        match self {
            Self::Identity => vec![img],
            Self::Dihedral => {
                let r090 = imageops::rotate90(&img);
                let r180 = imageops::rotate180(&img);
                let r270 = imageops::rotate270(&img);
                let fph = imageops::flip_horizontal(&img);
                let fpv = imageops::flip_vertical(&img);
                vec![img, r090, r180, r270, fph, fpv]
            }
        }
    }
}

impl TryFrom<u32> for Augmentation {
    type Error = ClassifyError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Identity),
            6 => Ok(Self::Dihedral),
            other => Err(ClassifyError::UnsupportedAugmentation(other)),
        }
    }
}
