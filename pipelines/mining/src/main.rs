//! 从清单中每张切片的组织掩膜里挖掘训练图块.

mod result;
mod runner;

use clap::Parser;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> CliResult<()> {
    let args = runner::MiningArgs::parse();
    utils::init_logger(&args.log)?;

    let report = runner::run(&args)?;
    report.analyze();
    Ok(())
}
