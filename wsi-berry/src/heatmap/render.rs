use crate::Idx2d;
use image::{GrayImage, Luma};
use ndarray::{Array2, ArrayView2};

/// 一维面积重采样的权重表: 第 `i` 项是输出第 `i` 个像素覆盖的
/// `(输入下标, 权重)`, 权重之和为 1.
fn area_weights(src: usize, dst: usize) -> Vec<Vec<(usize, f64)>> {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|i| {
            let (lo, hi) = (i as f64 * scale, (i + 1) as f64 * scale);
            let mut ws = vec![];
            let mut k = lo.floor() as usize;
            while k < src && (k as f64) < hi {
                let overlap = hi.min((k + 1) as f64) - lo.max(k as f64);
                if overlap > 0.0 {
                    ws.push((k, overlap / scale));
                }
                k += 1;
            }
            ws
        })
        .collect()
}

/// 面积 (box) 重采样: 每个输出像素取它在输入上覆盖区域的面积加权平均.
///
/// 缩小和放大均适用. 任一尺寸为 0 时返回全零数组.
pub fn area_resize(src: ArrayView2<f64>, dims: Idx2d) -> Array2<f64> {
    let (sh, sw) = src.dim();
    let (h, w) = dims;
    if sh == 0 || sw == 0 || h == 0 || w == 0 {
        return Array2::zeros(dims);
    }
    let (wr, wc) = (area_weights(sh, h), area_weights(sw, w));
    Array2::from_shape_fn(dims, |(r, c)| {
        let mut acc = 0.0;
        for &(i, a) in wr[r].iter() {
            for &(j, b) in wc[c].iter() {
                acc += a * b * src[(i, j)];
            }
        }
        acc
    })
}

/// 将 `[0, 1]` 上的热力图重采样到 `dims` (通常是掩膜层级的尺寸),
/// 再按 `v * 255` 截断映射为 8-bit 灰度图.
pub fn to_gray_image(heatmap: ArrayView2<f64>, dims: Idx2d) -> GrayImage {
    let resized = area_resize(heatmap, dims);
    let (h, w) = dims;
    GrayImage::from_fn(w as u32, h as u32, |x, y| {
        // `as` 对浮点数向零截断, 并把越界值饱和到 [0, 255].
        Luma([(resized[(y as usize, x as usize)] * 255.0) as u8])
    })
}
