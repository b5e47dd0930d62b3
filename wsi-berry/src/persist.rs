//! 图像的持久化存储.

use image::{GrayImage, ImageError, ImageFormat, ImageResult, RgbImage};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// 表明一个可以 **原子地** 以 PNG 格式持久化存储的图像对象.
///
/// 图像先写入同目录下的临时文件, 写完后再重命名为 `path`.
/// 因此 `path` 要么不存在, 要么是完整的图像, 不会出现写了一半的文件.
/// 写入或重命名失败时删除临时文件.
pub trait ImgWriteAtomic {
    /// 原子地将图片保存到 `path` 路径.
    fn save_atomic<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// `dir/name.png` -> `dir/.name.png.partial`
fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".partial");
    path.with_file_name(name)
}

macro_rules! impl_write_atomic {
    ($($img: ty),+) => {
        $(
            impl ImgWriteAtomic for $img {
                fn save_atomic<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
                    let path = path.as_ref();
                    let tmp = partial_path(path);
                    let written = self
                        .save_with_format(&tmp, ImageFormat::Png)
                        .and_then(|()| std::fs::rename(&tmp, path).map_err(ImageError::from));
                    if written.is_err() {
                        let _ = std::fs::remove_file(&tmp);
                    }
                    written
                }
            }
        )+
    };
}

impl_write_atomic!(GrayImage, RgbImage);
