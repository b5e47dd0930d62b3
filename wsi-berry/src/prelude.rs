//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Pos0};

pub use crate::level::{Pyramid, Rounding, Window};
pub use crate::slide::{load_mask, PyramidSlide, SlideError, SlideReader};

pub use crate::tiling::{enumerate, TileGrid, TissueFilter};

pub use crate::classify::{
    Augmentation, BatchClassifier, Classifier, ClassifierRegistry, ClassifyError, DeviceOptions,
};

pub use crate::heatmap::{HeatmapAccumulator, HeatmapError, HeatmapGenerator, HeatmapOutcome, HeatmapParams};
pub use crate::mining::{MiningError, MiningParams, PatchMiner, Region};

pub use crate::dataset::{read_wsi_list, slide_loader, ListError, LoadedSlide, SlideEntry};
pub use crate::persist::ImgWriteAtomic;

pub use crate::consts::{HEATMAP_LEVEL_FACTOR, MINING_LEVEL_FACTOR};
