//! 掩膜预处理与连通域.

use crate::consts::label::{is_tissue, BACKGROUND, BORDER, FIRST_REGION};
use crate::{Area2d, Areas2d, Idx2d, Pt2d};
use ndarray::{Array2, ArrayView2};
use std::collections::VecDeque;

/// 8-邻接偏移.
const NEIGHBORS_8: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// `pos` 在尺寸为 `(h, w)` 的图像内的 8-邻居.
fn neighbors((h, w): Idx2d, (r, c): Idx2d) -> impl Iterator<Item = Idx2d> {
    NEIGHBORS_8.into_iter().filter_map(move |(dr, dc)| {
        let nr = r.checked_add_signed(dr)?;
        let nc = c.checked_add_signed(dc)?;
        (nr < h && nc < w).then_some((nr, nc))
    })
}

/// 找出掩膜中所有 8-邻接的组织连通域.
///
/// 连通域按首个像素的行优先顺序排列, 每个连通域内部按 bfs 访问顺序排列.
fn components(mask: ArrayView2<u8>) -> Areas2d {
    let dim = mask.dim();
    let mut ans = Areas2d::new();
    let mut seen = Array2::from_elem(dim, false);
    let mut bfs_q = VecDeque::with_capacity(8);

    for (pos, &p) in mask.indexed_iter() {
        if seen[pos] || !is_tissue(p) {
            continue;
        }
        seen[pos] = true;
        bfs_q.push_back(pos);
        let mut this_area = Area2d::with_capacity(1);
        while let Some(cur) = bfs_q.pop_front() {
            this_area.push(cur);
            for nb in neighbors(dim, cur) {
                if !seen[nb] && is_tissue(mask[nb]) {
                    seen[nb] = true;
                    bfs_q.push_back(nb);
                }
            }
        }
        ans.push(this_area);
    }
    ans
}

/// 连通域是否接触图像边缘?
fn touches_border(area: &Area2d, (h, w): Idx2d) -> bool {
    area.iter()
        .any(|&(r, c)| r == 0 || c == 0 || r + 1 == h || c + 1 == w)
}

/// 掩膜预处理: 清除接触边缘的连通域, 再对剩余组织做 8-邻接标记.
///
/// 返回的标记图中, 背景为 [`BACKGROUND`], 被清除的像素为 [`BORDER`],
/// 其余连通域从 [`FIRST_REGION`] 开始按行优先顺序编号.
pub fn label_regions(mask: ArrayView2<u8>) -> Array2<i32> {
    let dim = mask.dim();
    let mut labels = Array2::from_elem(dim, BACKGROUND);
    let mut next = FIRST_REGION;
    for area in components(mask) {
        let label = if touches_border(&area, dim) {
            BORDER
        } else {
            let l = next;
            next += 1;
            l
        };
        for pos in area {
            labels[pos] = label;
        }
    }
    labels
}

/// 一个有效连通域及其属性.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// 标签, 至少为 [`FIRST_REGION`].
    pub label: i32,

    /// 像素个数.
    pub area: usize,

    /// 质心, 即全部像素坐标的算术平均. 不取整.
    pub centroid: Pt2d,

    /// 全部像素坐标, 行优先排列.
    pub coords: Vec<Idx2d>,

    /// 外接框 `(左上角, 右下角)`, 右下角不含.
    pub bbox: (Idx2d, Idx2d),
}

impl Region {
    fn from_coords(label: i32, coords: Vec<Idx2d>) -> Self {
        let area = coords.len();
        let (mut sr, mut sc) = (0, 0);
        let (mut min, mut max) = ((usize::MAX, usize::MAX), (0, 0));
        for &(r, c) in coords.iter() {
            sr += r;
            sc += c;
            min = (min.0.min(r), min.1.min(c));
            max = (max.0.max(r + 1), max.1.max(c + 1));
        }
        Self {
            label,
            area,
            centroid: (sr as f64 / area as f64, sc as f64 / area as f64),
            coords,
            bbox: (min, max),
        }
    }

    /// 从标记图中收集所有有效连通域 (标签 >= [`FIRST_REGION`]), 按标签升序.
    pub fn collect(labels: ArrayView2<i32>) -> Vec<Region> {
        let count = labels.iter().copied().max().unwrap_or(BACKGROUND);
        if count < FIRST_REGION {
            return vec![];
        }
        let mut coords = vec![vec![]; (count - FIRST_REGION + 1) as usize];
        for (pos, &l) in labels.indexed_iter() {
            if l >= FIRST_REGION {
                coords[(l - FIRST_REGION) as usize].push(pos);
            }
        }
        coords
            .into_iter()
            .zip(FIRST_REGION..)
            .filter(|(c, _)| !c.is_empty())
            .map(|(c, l)| Region::from_coords(l, c))
            .collect()
    }
}

/// 丢弃面积小于 `area_threshold` 的连通域, 并按面积升序稳定排序.
pub fn select_regions(mut regions: Vec<Region>, area_threshold: usize) -> Vec<Region> {
    regions.retain(|r| r.area >= area_threshold);
    regions.sort_by_key(|r| r.area);
    regions
}

#[cfg(test)]
mod tests {
    use super::{label_regions, select_regions, Region};
    use crate::consts::label::{BACKGROUND, BORDER};
    use ndarray::{arr2, Array2};

    #[test]
    fn test_label_regions() {
        let mask = arr2(&[
            [1, 1, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 1, 0, 0, 0],
            [0, 0, 0, 1, 0, 9],
            [0, 1, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
        ]);
        let labels = label_regions(mask.view());
        assert_eq!(
            labels,
            arr2(&[
                [-1, -1, 0, 0, 0, 0],
                [0, 0, 0, 0, 0, 0],
                [0, 0, 1, 0, 0, 0],
                [0, 0, 0, 1, 0, -1],
                [0, 2, 0, 0, 0, 0],
                [0, 0, 0, 0, 0, 0],
            ])
        );
        assert_eq!(labels[(0, 0)], BORDER);
        assert_eq!(labels[(5, 5)], BACKGROUND);
    }

    #[test]
    fn test_diagonal_is_connected() {
        let mut mask = Array2::<u8>::zeros((5, 5));
        for i in 1..4 {
            mask[(i, i)] = 255;
        }
        mask[(1, 3)] = 255;
        let labels = label_regions(mask.view());
        assert_eq!(labels.iter().filter(|&&l| l == 1).count(), 4);
        assert!(labels.iter().all(|&l| l == 0 || l == 1));
    }

    #[test]
    fn test_region_props() {
        let mut labels = Array2::<i32>::zeros((6, 6));
        labels[(1, 1)] = 2;
        for r in 2..4 {
            for c in 2..5 {
                labels[(r, c)] = 1;
            }
        }
        labels[(0, 0)] = -1;
        let regions = Region::collect(labels.view());
        assert_eq!(regions.len(), 2);

        let big = &regions[0];
        assert_eq!(big.label, 1);
        assert_eq!(big.area, 6);
        assert_eq!(big.centroid, (2.5, 3.0));
        assert_eq!(big.bbox, ((2, 2), (4, 5)));
        assert_eq!(big.coords[0], (2, 2));
        assert_eq!(big.coords[5], (3, 4));

        assert_eq!(regions[1].label, 2);
        assert_eq!(regions[1].centroid, (1.0, 1.0));
        assert!(Region::collect(Array2::<i32>::zeros((3, 3)).view()).is_empty());
    }

    #[test]
    fn test_select_regions() {
        let make = |label: i32, n: usize| Region::from_coords(label, (0..n).map(|i| (1, i + 1)).collect());
        let regions = vec![make(1, 5), make(2, 2), make(3, 3), make(4, 3), make(5, 1)];
        let kept = select_regions(regions, 2);
        let order: Vec<_> = kept.iter().map(|r| (r.label, r.area)).collect();
        assert_eq!(order, vec![(2, 2), (3, 3), (4, 3), (1, 5)]);
    }
}
