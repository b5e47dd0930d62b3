//! 为清单中的每张切片生成肿瘤增殖热力图.

mod result;
mod runner;

use clap::Parser;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> CliResult<()> {
    let args = runner::HeatmapArgs::parse();
    utils::init_logger(&args.log)?;

    let report = runner::run(&args)?;
    report.analyze();
    if report.failures() > 0 {
        return Err(format!("{} slides failed", report.failures()).into());
    }
    Ok(())
}
