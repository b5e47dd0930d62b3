//! 程序运行函数.

use crate::result::HeatmapReport;
use crate::CliResult;
use clap::Parser;
use std::path::PathBuf;
use utils::{loader, RoundingArg};
use wsi_berry::classify::{Augmentation, ClassifierRegistry, DeviceOptions};
use wsi_berry::heatmap::{HeatmapGenerator, HeatmapOutcome, HeatmapParams};
use wsi_berry::Pyramid;

/// 命令行参数.
#[derive(Debug, Parser)]
#[command(name = "wsi-heatmap")]
#[command(about = "Generate tumor proliferation heatmaps for whole-slide images")]
#[command(version)]
pub struct HeatmapArgs {
    /// Registered extractor name (`constant`, `hematoxylin`, ...).
    pub extractor: String,

    /// Extractor configuration file.
    pub config: PathBuf,

    /// Feature group whose second column is the positive probability.
    pub feature: String,

    /// Folder the slide list is relative to.
    pub input_folder: PathBuf,

    /// Slide list: `<slide> [mask]` per line.
    pub wsi_list: PathBuf,

    /// Pyramid level the model reads tiles at.
    pub model_level: u32,

    /// Folder the heatmaps are written to.
    pub output_folder: PathBuf,

    /// Heatmap level; the effective level is max(model_level, heatmap_level).
    #[arg(long, default_value_t = 2)]
    pub heatmap_level: u32,

    /// Level of the tissue masks and of the written heatmaps.
    #[arg(long, default_value_t = 5)]
    pub mask_image_level: u32,

    /// Number of test-time augmentation variants (1 or 6).
    #[arg(long, default_value_t = 1)]
    pub augmentation: u32,

    /// Window side at the model level.
    #[arg(long, default_value_t = 256)]
    pub window_size: usize,

    /// Maximum images per classifier call.
    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// Windows resident in memory at once.
    #[arg(long, default_value_t = 100)]
    pub group_size: usize,

    /// Stride between windows at the model level.
    #[arg(long, default_value_t = 100)]
    pub step_size: usize,

    /// Accelerator ids; only the first one is used.
    #[arg(long, num_args = 1.., default_values_t = [0])]
    pub device_ids: Vec<u32>,

    /// Run the extractor on the accelerator.
    #[arg(long)]
    pub gpu: bool,

    /// Rounding when converting sizes and coordinates to a coarser level.
    #[arg(long, value_enum, default_value_t = RoundingArg::Floor)]
    pub rounding: RoundingArg,

    /// Log level (OFF, ERROR, WARN, INFO, DEBUG, TRACE).
    #[arg(long, default_value = "INFO")]
    pub log: String,
}

impl HeatmapArgs {
    /// 生成参数. 增广个数非法时报错.
    pub fn params(&self) -> CliResult<HeatmapParams> {
        Ok(HeatmapParams {
            model_level: self.model_level,
            heatmap_level: self.heatmap_level,
            mask_level: self.mask_image_level,
            window_size: self.window_size,
            step_size: self.step_size,
            batch_size: self.batch_size,
            group_size: self.group_size,
            augmentation: Augmentation::try_from(self.augmentation)?,
        })
    }

    /// 热力图使用的金字塔.
    pub fn pyramid(&self) -> Pyramid {
        Pyramid::binary().with_rounding(self.rounding.into())
    }

    /// 推理设备.
    pub fn device(&self) -> DeviceOptions {
        if self.device_ids.len() > 1 {
            log::warn!("Only the first device id of {:?} is used", self.device_ids);
        }
        DeviceOptions {
            use_accelerator: self.gpu,
            device_id: self.device_ids.first().copied().unwrap_or_default(),
        }
    }
}

/// 实际运行. 配置错误立即返回; 单张切片的失败被记录后继续.
pub fn run(args: &HeatmapArgs) -> CliResult<HeatmapReport> {
    let gen = HeatmapGenerator::new(args.params()?, args.pyramid())?;
    let registry = ClassifierRegistry::with_builtins();
    let classifier = registry.create(&args.extractor, &args.config, &args.device())?;
    let mut bc = gen.batch_classifier(classifier, &args.feature);

    let entries = loader::entries(&args.wsi_list, &args.input_folder)?;
    loader::prepare_output_dir(&args.output_folder)?;

    log::info!("Generating heatmaps with extractor `{}`...", args.extractor);
    let mut report = HeatmapReport::default();
    for entry in entries.iter() {
        match gen.process(&mut bc, entry, &args.output_folder) {
            Ok(HeatmapOutcome::Written(p)) => report.written.push(p),
            Ok(HeatmapOutcome::Skipped(p)) => report.skipped.push(p),
            Err(e) => {
                log::error!("{}: {e}", entry.label());
                report.failed.push((entry.slide.clone(), e.to_string()));
            }
        }
    }
    Ok(report)
}
