//! 按面积分配图块配额.

/// 按面积比例为各连通域分配配额, 总数为 `n_patches`.
///
/// `areas` 应已按面积升序排列. 除最后一个连通域外, 每个连通域得到
/// `max(1, floor(n_patches * area / total))`, 最后一个得到剩余部分.
/// 小连通域过多时 (例如连通域数多于 `n_patches`) 剩余部分可能为负,
/// 此时记为 0 并给出警告, 于是总数会超过 `n_patches`.
pub fn allocate_quotas(areas: &[usize], n_patches: usize) -> Vec<usize> {
    let Some((_, init)) = areas.split_last() else {
        return vec![];
    };
    let total: u128 = areas.iter().map(|&a| a as u128).sum();
    let mut remaining = n_patches as i128;
    let mut ans = Vec::with_capacity(areas.len());
    for &area in init {
        let q = if total == 0 {
            1
        } else {
            ((n_patches as u128 * area as u128 / total) as usize).max(1)
        };
        remaining -= q as i128;
        ans.push(q);
    }
    if remaining < 0 {
        log::warn!(
            "{} regions exceed the budget of {n_patches} patches by {}, the largest region gets none",
            areas.len(),
            -remaining
        );
    }
    ans.push(remaining.max(0) as usize);
    ans
}
