//! 运行结果.

use std::io::{self, Write};

/// 全部切片的挖掘结果.
#[derive(Debug, Default)]
pub struct MiningReport {
    processed: usize,
    patches: usize,
    failed: Vec<(String, String)>,
}

impl MiningReport {
    /// 记录一张成功处理的切片.
    pub fn succeed(&mut self, patches: usize) {
        self.processed += 1;
        self.patches += patches;
    }

    /// 记录一张失败的切片.
    pub fn fail(&mut self, label: String, reason: String) {
        self.failed.push((label, reason));
    }

    /// 成功处理的切片数.
    #[inline]
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// 写出的图块总数.
    #[inline]
    pub fn patches(&self) -> usize {
        self.patches
    }

    /// 失败的切片及原因.
    #[inline]
    pub fn failed(&self) -> &[(String, String)] {
        &self.failed
    }

    /// 将结果写进 `w` 中.
    fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        const S4: &str = "    ";

        writeln!(w, "Processed {} images", self.processed)?;
        writeln!(w, "Patches written: {}", self.patches)?;
        write!(w, "Failed: {}", self.failed.len())?;
        for (label, reason) in self.failed.iter() {
            write!(w, "\n{S4}{label}: {reason}")?;
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
