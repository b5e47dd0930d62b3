//! 运行结果.

use std::io::{self, Write};
use std::path::PathBuf;

/// 全部切片的处理结果.
#[derive(Debug, Default)]
pub struct HeatmapReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl HeatmapReport {
    /// 失败的切片数.
    #[inline]
    pub fn failures(&self) -> usize {
        self.failed.len()
    }

    /// 将结果写进 `w` 中.
    fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        const S4: &str = "    ";

        writeln!(w, "Heatmaps written: {}", self.written.len())?;
        writeln!(w, "Skipped (already exist): {}", self.skipped.len())?;
        write!(w, "Failed: {}", self.failed.len())?;
        for (slide, reason) in self.failed.iter() {
            write!(w, "\n{S4}{}: {reason}", slide.display())?;
        }
        Ok(())
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        utils::sep();
        let mut buf = Vec::with_capacity(512);
        match self.describe_into(&mut buf) {
            Ok(()) => println!("{}", String::from_utf8_lossy(&buf)),
            Err(e) => log::error!("cannot describe result: {e}"),
        }
        utils::sep();
    }
}
