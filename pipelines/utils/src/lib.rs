//! 流水线工具依赖的通用组件.

use clap::ValueEnum;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::str::FromStr;
use wsi_berry::level::Rounding;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 日志初始化错误.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// 无法识别的日志级别.
    #[error("invalid log level `{0}` (expected one of OFF, ERROR, WARN, INFO, DEBUG, TRACE)")]
    InvalidLevel(String),

    /// 全局日志器已被设置.
    #[error(transparent)]
    Install(#[from] log::SetLoggerError),
}

/// 解析日志级别字符串, 大小写不敏感. 额外接受 Python 风格的 `WARNING` 和 `CRITICAL`.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggerError> {
    match level.to_ascii_uppercase().as_str() {
        "WARNING" => Ok(LevelFilter::Warn),
        "CRITICAL" => Ok(LevelFilter::Error),
        s => LevelFilter::from_str(s).map_err(|_| LoggerError::InvalidLevel(level.to_owned())),
    }
}

/// 以 `level` 级别安装全局日志器. 级别非法时报错, 调用方应在做任何工作前退出.
pub fn init_logger(level: &str) -> Result<(), LoggerError> {
    let level = parse_level(level)?;
    SimpleLogger::new().with_level(level).init()?;
    Ok(())
}

/// 命令行上的层级换算舍入方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum RoundingArg {
    /// 截断.
    #[default]
    Floor,

    /// 四舍五入.
    Nearest,
}

impl From<RoundingArg> for Rounding {
    fn from(value: RoundingArg) -> Self {
        match value {
            RoundingArg::Floor => Rounding::Floor,
            RoundingArg::Nearest => Rounding::Nearest,
        }
    }
}
