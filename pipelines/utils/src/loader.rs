//! 对 `wsi-berry::dataset` 的更一层封装. 提供流水线直接使用的清单加载.

use std::io;
use std::path::{Path, PathBuf};
use wsi_berry::dataset::{self, ListError, SlideEntry};

/// 加载清单时的错误.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// 输入目录不存在或不是目录.
    #[error("input folder `{0}` is not a directory")]
    NotADirectory(PathBuf),

    /// 清单无法读取或格式错误.
    #[error(transparent)]
    List(#[from] ListError),

    /// 无法创建输出目录.
    #[error("cannot create output folder: {0}")]
    Io(#[from] io::Error),
}

/// 读取清单 `wsi_list`, 其中的路径相对于 `input_folder`.
pub fn entries<P: AsRef<Path>, Q: AsRef<Path>>(wsi_list: P, input_folder: Q) -> Result<Vec<SlideEntry>, LoadError> {
    let input_folder = input_folder.as_ref();
    if !input_folder.is_dir() {
        return Err(LoadError::NotADirectory(input_folder.to_owned()));
    }
    let ans = dataset::read_wsi_list(wsi_list, input_folder)?;
    log::info!("{} slides listed in `{}`", ans.len(), input_folder.display());
    Ok(ans)
}

/// 确保输出目录存在.
pub fn prepare_output_dir<P: AsRef<Path>>(path: P) -> Result<(), LoadError> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{entries, prepare_output_dir, LoadError};

    #[test]
    fn test_entries() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.txt");
        std::fs::write(&list, "# header\na.svs a_mask.png\nb.svs\n").unwrap();

        let got = entries(&list, dir.path()).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].mask.as_deref(), Some(dir.path().join("a_mask.png").as_path()));

        let missing = dir.path().join("nope");
        assert!(matches!(entries(&list, &missing), Err(LoadError::NotADirectory(_))));

        let out = dir.path().join("out/nested");
        prepare_output_dir(&out).unwrap();
        assert!(out.is_dir());
    }
}
