//! 数据集操作.
//!
//! 切片清单文件每行描述一张切片: `<切片>` 或 `<切片> <掩膜>`, 以空白分隔,
//! 两者都相对于输入目录解析. 空行和以 `#` 开头的行被忽略.

mod loader;

pub use loader::{slide_loader, SlideLoader};

use crate::slide::{load_mask, SlideError};
use crate::{Pyramid, PyramidSlide};
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// 读取切片清单的错误.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// 无法读取清单文件.
    #[error("cannot read slide list `{path}`: {source}")]
    Io {
        /// 清单文件路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// 某一行的字段个数不是 1 或 2.
    #[error("line {line}: expected `<slide> [mask]`, got {fields} fields in `{content}`")]
    Malformed {
        /// 行号, 从 1 开始.
        line: usize,
        /// 该行原文.
        content: String,
        /// 实际字段个数.
        fields: usize,
    },
}

/// 清单中的一项.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SlideEntry {
    /// 切片文件的完整路径.
    pub slide: PathBuf,

    /// 组织掩膜文件的完整路径 (可选).
    pub mask: Option<PathBuf>,
}

/// 已打开的切片及其掩膜.
#[derive(Debug)]
pub struct LoadedSlide {
    /// 切片.
    pub slide: PyramidSlide,

    /// 掩膜层级的组织掩膜. 清单中未给出时为 `None`.
    pub mask: Option<Array2<u8>>,
}

impl SlideEntry {
    /// 不带扩展名的切片文件名, 用于命名输出文件.
    pub fn label(&self) -> String {
        self.slide
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// 打开切片, 并在给出掩膜时一并加载.
    pub fn load(&self, pyramid: Pyramid) -> Result<LoadedSlide, SlideError> {
        let slide = PyramidSlide::open(&self.slide, pyramid)?;
        let mask = self.mask.as_deref().map(load_mask).transpose()?;
        Ok(LoadedSlide { slide, mask })
    }
}

/// 解析清单文本, 路径相对于 `input_folder`.
pub fn parse_wsi_list(text: &str, input_folder: &Path) -> Result<Vec<SlideEntry>, ListError> {
    let mut ans = vec![];
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let entry = match fields[..] {
            [slide] => SlideEntry {
                slide: input_folder.join(slide),
                mask: None,
            },
            [slide, mask] => SlideEntry {
                slide: input_folder.join(slide),
                mask: Some(input_folder.join(mask)),
            },
            _ => {
                return Err(ListError::Malformed {
                    line: i + 1,
                    content: raw.to_owned(),
                    fields: fields.len(),
                })
            }
        };
        ans.push(entry);
    }
    Ok(ans)
}

/// 读取并解析清单文件 `list`.
pub fn read_wsi_list<P: AsRef<Path>, Q: AsRef<Path>>(
    list: P,
    input_folder: Q,
) -> Result<Vec<SlideEntry>, ListError> {
    let list = list.as_ref();
    let text = std::fs::read_to_string(list).map_err(|source| ListError::Io {
        path: list.to_owned(),
        source,
    })?;
    parse_wsi_list(&text, input_folder.as_ref())
}
