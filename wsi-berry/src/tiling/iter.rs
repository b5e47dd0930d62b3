use super::{TileGrid, TissueFilter};
use crate::Window;

/// 行优先的候选窗口迭代器.
///
/// 候选坐标为 `0, step, 2 * step, ...` (小于图像边长), 越界窗口被截断到远端边界.
#[derive(Clone, Debug)]
pub struct TileIter {
    grid: TileGrid,
    cur_h: usize,
    cur_w: usize,
}

impl TileIter {
    #[inline]
    pub(crate) fn new(grid: TileGrid) -> Self {
        Self {
            grid,
            cur_h: 0,
            cur_w: 0,
        }
    }
}

impl Iterator for TileIter {
    type Item = Window;

    fn next(&mut self) -> Option<Self::Item> {
        let (h, w) = self.grid.dims();
        if h == 0 || w == 0 || self.cur_h >= h {
            return None;
        }
        let top_left = (
            self.grid.clamp(self.cur_h, h),
            self.grid.clamp(self.cur_w, w),
        );
        self.cur_w += self.grid.step();
        if self.cur_w >= w {
            self.cur_w = 0;
            self.cur_h += self.grid.step();
        }
        Some(Window::new(self.grid.level(), top_left, self.grid.window()))
    }
}

/// 经过 (可选) 组织掩膜过滤的窗口序列. `clone` 即可从头重新开始.
#[derive(Clone, Debug)]
pub struct Tiles<'a> {
    it: TileIter,
    filter: Option<TissueFilter<'a>>,
}

impl<'a> Tiles<'a> {
    #[inline]
    pub(crate) fn new(grid: TileGrid, filter: Option<TissueFilter<'a>>) -> Self {
        Self {
            it: grid.iter(),
            filter,
        }
    }
}

impl Iterator for Tiles<'_> {
    type Item = Window;

    fn next(&mut self) -> Option<Self::Item> {
        match &self.filter {
            None => self.it.next(),
            Some(f) => self.it.by_ref().find(|t| f.overlaps(t)),
        }
    }
}

#[cfg(test)]
mod completeness_tests {
    use crate::tiling::TileGrid;

    fn tiles_builtin(h: usize, w: usize, win: usize, step: usize) -> Vec<(usize, usize)> {
        let clamp = |p: usize, e: usize| if p + win > e { e.saturating_sub(win) } else { p };
        (0..h)
            .step_by(step)
            .flat_map(move |r| (0..w).step_by(step).map(move |c| (clamp(r, h), clamp(c, w))))
            .collect()
    }

    #[test]
    fn test_tile_iter() {
        for h in 0..=9 {
            for w in 0..=9 {
                for (win, step) in [(1, 1), (3, 2), (4, 4), (2, 5)] {
                    let grid = TileGrid::new(0, (h, w), win, step).unwrap();
                    let ours: Vec<_> = grid.iter().map(|t| t.top_left()).collect();
                    assert_eq!(ours, tiles_builtin(h, w, win, step));
                }
            }
        }
    }
}
