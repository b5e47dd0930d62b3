//! 迭代器风格的切片加载器.

use super::{LoadedSlide, SlideEntry};
use crate::slide::SlideError;
use crate::Pyramid;

/// 按清单顺序依次打开切片 (及掩膜) 的加载器.
///
/// 打开失败不会中断迭代, 而是以 `Result::Err` 的形式交给调用者.
pub fn slide_loader<I: IntoIterator<Item = SlideEntry>>(entries: I, pyramid: Pyramid) -> SlideLoader {
    let mut entries: Vec<SlideEntry> = entries.into_iter().collect();
    entries.reverse();
    SlideLoader {
        entries_rev: entries,
        pyramid,
    }
}

/// 切片加载器. 每次迭代才真正读取文件.
#[derive(Debug)]
pub struct SlideLoader {
    entries_rev: Vec<SlideEntry>,
    pyramid: Pyramid,
}

impl Iterator for SlideLoader {
    type Item = (SlideEntry, Result<LoadedSlide, SlideError>);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries_rev.pop()?;
        let data = entry.load(self.pyramid);
        Some((entry, data))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len(), Some(self.len()))
    }
}

impl ExactSizeIterator for SlideLoader {
    #[inline]
    fn len(&self) -> usize {
        self.entries_rev.len()
    }
}
