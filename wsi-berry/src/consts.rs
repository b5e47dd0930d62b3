//! 通用常量.

/// 掩膜与标记图像中的像素/标签值.
pub mod label {
    /// 背景标签.
    pub const BACKGROUND: i32 = 0;

    /// 被清除的边缘连通域像素的标签. 与背景和有效区域 (>= 1) 都不同.
    pub const BORDER: i32 = -1;

    /// 第一个有效区域的标签.
    pub const FIRST_REGION: i32 = 1;

    /// 掩膜像素是否是组织?
    #[inline]
    pub const fn is_tissue(p: u8) -> bool {
        p != 0
    }
}

/// 热力图生成器默认的层级倍率. 相邻层级线性分辨率相差 2 倍.
pub const HEATMAP_LEVEL_FACTOR: u32 = 2;

/// 图块挖掘默认的层级倍率 (`levelpow`).
pub const MINING_LEVEL_FACTOR: u32 = 4;

/// 低于该值的分类分数视为数值噪声, 记为 `0.0`.
pub const SCORE_NOISE_FLOOR: f32 = 1e-4;

/// 终结化时低于该值的热力图残差记为 `0.0`.
pub const HEATMAP_RESIDUAL_FLOOR: f64 = 1e-5;

/// 分类器输出中, "阳性类概率" 所在的列.
pub const POSITIVE_COLUMN: usize = 1;
