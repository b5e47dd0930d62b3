use crate::consts::HEATMAP_RESIDUAL_FLOOR;
use crate::{Idx2d, Pyramid, Window};
use ndarray::{s, Array2, ArrayView2, Zip};

/// 热力图层级上的累加状态. 每个像素保存 `(值, 权重)`.
///
/// 值始终是所有覆盖过该像素的窗口分数的滑动平均: 每合并一个窗口,
/// 权重加一, 值按 `(旧值 * 旧权重 + 分数) / 新权重` 更新.
/// 一个实例只服务于一张切片.
#[derive(Clone, Debug)]
pub struct HeatmapAccumulator {
    value: Array2<f64>,
    weight: Array2<f64>,
}

impl HeatmapAccumulator {
    /// 全零初始化, `dims` 为热力图层级的 (高, 宽).
    pub fn new(dims: Idx2d) -> Self {
        Self {
            value: Array2::zeros(dims),
            weight: Array2::zeros(dims),
        }
    }

    /// 热力图尺寸 (高, 宽).
    #[inline]
    pub fn dims(&self) -> Idx2d {
        self.value.dim()
    }

    /// 当前的值.
    #[inline]
    pub fn values(&self) -> ArrayView2<f64> {
        self.value.view()
    }

    /// 当前的权重, 即覆盖过每个像素的窗口个数.
    #[inline]
    pub fn weights(&self) -> ArrayView2<f64> {
        self.weight.view()
    }

    /// 将窗口 `window` 及其分数 `score` 合并进来.
    ///
    /// 窗口的左上角与边长先换算到 `heatmap_level`, 越界部分被裁掉.
    pub fn merge(&mut self, window: &Window, score: f64, heatmap_level: u32, pyramid: &Pyramid) {
        let at = window.at_level(pyramid, heatmap_level);
        let (rows, cols) = at.clip(self.dims());
        Zip::from(self.value.slice_mut(s![rows.clone(), cols.clone()]))
            .and(self.weight.slice_mut(s![rows, cols]))
            .for_each(|v, w| {
                let nw = *w + 1.0;
                *v = (*v * *w + score) / nw;
                *w = nw;
            });
    }

    /// 终结化, 返回新的热力图, 不修改累加状态.
    ///
    /// 值本身已经是滑动平均, 因此权重为正的像素直接取值, 未被覆盖的像素为 0;
    /// 小于 [`HEATMAP_RESIDUAL_FLOOR`] 的残差记为 0.
    pub fn finalize(&self) -> Array2<f64> {
        let mut out = Array2::zeros(self.dims());
        let zip = Zip::from(&mut out).and(&self.value).and(&self.weight);
        let pick = |o: &mut f64, &v: &f64, &w: &f64| {
            *o = if w > 0.0 && v >= HEATMAP_RESIDUAL_FLOOR {
                v
            } else {
                0.0
            };
        };
        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                zip.par_for_each(pick);
            } else {
                zip.for_each(pick);
            }
        }
        out
    }
}
