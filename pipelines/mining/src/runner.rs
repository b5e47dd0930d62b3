//! 程序运行函数.

use crate::result::MiningReport;
use crate::CliResult;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use utils::{loader, RoundingArg};
use wsi_berry::consts::MINING_LEVEL_FACTOR;
use wsi_berry::dataset::slide_loader;
use wsi_berry::mining::{MiningError, MiningParams, PatchMiner};
use wsi_berry::Pyramid;

/// 命令行参数.
#[derive(Debug, Parser)]
#[command(name = "wsi-mining")]
#[command(about = "Mine training patches from the tissue regions of whole-slide images")]
#[command(version)]
pub struct MiningArgs {
    /// Folder the slide list is relative to.
    pub input_folder: PathBuf,

    /// Slide list: `<slide> <mask>` per line.
    pub wsi_list: PathBuf,

    /// Folder the patches are written to.
    pub output_folder: PathBuf,

    /// Patches per slide.
    #[arg(long, default_value_t = 10)]
    pub n_patches: usize,

    /// Minimum region area in mask pixels.
    #[arg(long, default_value_t = 1500)]
    pub area_threshold: usize,

    /// Patch side at the output level.
    #[arg(long, default_value_t = 1000)]
    pub patch_size: usize,

    /// Level of the tissue masks.
    #[arg(long, default_value_t = 2)]
    pub input_level: u32,

    /// Level the patches are cut at.
    #[arg(long, default_value_t = 0)]
    pub output_level: u32,

    /// Downsampling factor between adjacent levels.
    #[arg(long, default_value_t = MINING_LEVEL_FACTOR)]
    pub levelpow: u32,

    /// Rounding when converting sizes and coordinates to a coarser level.
    #[arg(long, value_enum, default_value_t = RoundingArg::Floor)]
    pub rounding: RoundingArg,

    /// Seed for reproducible sampling; drawn from the OS when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (OFF, ERROR, WARN, INFO, DEBUG, TRACE).
    #[arg(long, default_value = "INFO")]
    pub log: String,
}

impl MiningArgs {
    /// 挖掘参数.
    pub fn params(&self) -> MiningParams {
        MiningParams {
            n_patches: self.n_patches,
            area_threshold: self.area_threshold,
            patch_size: self.patch_size,
            input_level: self.input_level,
            output_level: self.output_level,
        }
    }

    /// 挖掘使用的金字塔. 倍率小于 2 时报错.
    pub fn pyramid(&self) -> CliResult<Pyramid> {
        let pyramid = Pyramid::new(self.levelpow)
            .ok_or_else(|| format!("levelpow must be at least 2, got {}", self.levelpow))?;
        Ok(pyramid.with_rounding(self.rounding.into()))
    }

    /// 随机数生成器.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        }
    }
}

/// 实际运行. 配置错误立即返回; 单张切片的失败被记录后继续.
pub fn run(args: &MiningArgs) -> CliResult<MiningReport> {
    let miner = PatchMiner::new(args.params(), args.pyramid()?)?;
    let entries = loader::entries(&args.wsi_list, &args.input_folder)?;
    loader::prepare_output_dir(&args.output_folder)?;
    let mut rng = args.rng();

    log::info!("Mining patches...");
    let mut report = MiningReport::default();
    for (entry, loaded) in slide_loader(entries, miner.pyramid()) {
        let label = entry.label();
        log::info!("Processing {label}");
        let mined = loaded
            .map_err(MiningError::from)
            .and_then(|l| miner.process(&entry, l, &args.output_folder, &mut rng));
        match mined {
            Ok(patches) => report.succeed(patches.len()),
            Err(e) => {
                log::error!("{label}: {e}");
                report.fail(label, e.to_string());
            }
        }
    }
    Ok(report)
}
