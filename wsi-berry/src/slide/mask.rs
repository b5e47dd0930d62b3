//! 组织掩膜读取.

use super::SlideError;
use image::GrayImage;
use ndarray::Array2;
use std::path::Path;

/// 将单通道图像转换为 `(高, 宽)` 排布的掩膜数组. 非零像素即组织.
pub fn mask_from_gray(img: &GrayImage) -> Array2<u8> {
    let (w, h) = img.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(r, c)| img.get_pixel(c as u32, r as u32)[0])
}

/// 以灰度模式读取 `path` 处的掩膜图像.
pub fn load_mask<P: AsRef<Path>>(path: P) -> Result<Array2<u8>, SlideError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(SlideError::NotFound(path.to_owned()));
    }
    Ok(mask_from_gray(&image::open(path)?.to_luma8()))
}
