//! 文档落盘 - 业务能力层
//!
//! 负责文件命名、冲突处理、写入和写入后的 PDF 校验。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::error::DownloadError;

/// 文件名最大长度（不含扩展名和冲突后缀）
pub const MAX_FILENAME_LEN: usize = 50;
/// 合法 PDF 的最小字节数
pub const MIN_PDF_SIZE: u64 = 1024;
/// PDF 文件头
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";
/// 文档扩展名
pub const DOCUMENT_EXTENSION: &str = "pdf";

fn disallowed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.\-]").expect("valid regex"))
}

/// 把显示名转换为安全的文件名
///
/// 先删除 `[A-Za-z0-9-_.]` 以外的字符（空格随之删除），再把剩余空格替换为下划线、去掉首尾分隔符并截断到 50。
/// 输出不为空；对自身输出再次调用结果不变。
pub fn sanitize_filename(name: &str) -> String {
    let filtered = disallowed().replace_all(name, "").replace(' ', "_");
    let trimmed: String = filtered
        .trim_matches(|c| c == '_' || c == '.')
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect();
    let safe = trimmed.trim_matches(|c| c == '_' || c == '.');

    if safe.is_empty() {
        let digest = format!("{:x}", md5::compute(name.as_bytes()));
        format!("candidate_{}", &digest[..8])
    } else {
        safe.to_string()
    }
}

/// 第 `n` 个候选路径：`base.pdf`、`base_1.pdf`……
fn numbered_path(dir: &Path, base: &str, n: usize) -> PathBuf {
    if n == 0 {
        dir.join(format!("{}.{}", base, DOCUMENT_EXTENSION))
    } else {
        dir.join(format!("{}_{}.{}", base, n, DOCUMENT_EXTENSION))
    }
}

/// 把文档写入 `dir`，遇到同名文件时追加序号
///
/// 用 `create_new` 占位，并发写同名文件时也不会互相覆盖。
pub async fn write_document(
    dir: &Path,
    base: &str,
    bytes: &[u8],
) -> Result<PathBuf, DownloadError> {
    let mut counter = 0usize;
    loop {
        let path = numbered_path(dir, base, counter);

        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(mut file) => {
                file.write_all(bytes)
                    .await
                    .map_err(|source| DownloadError::Io {
                        path: path.clone(),
                        source,
                    })?;
                file.flush().await.map_err(|source| DownloadError::Io {
                    path: path.clone(),
                    source,
                })?;
                debug!("已写入 {} ({} 字节)", path.display(), bytes.len());
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
            Err(source) => return Err(DownloadError::Io { path, source }),
        }
    }
}

/// 文件存在、不小于 1KB、且以 `%PDF-` 开头
pub async fn validate_pdf(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path).await else {
        return false;
    };
    if !metadata.is_file() || metadata.len() < MIN_PDF_SIZE {
        return false;
    }

    let Ok(mut file) = fs::File::open(path).await else {
        return false;
    };
    let mut header = [0u8; 8];
    match file.read_exact(&mut header).await {
        Ok(_) => header.starts_with(PDF_SIGNATURE),
        Err(_) => false,
    }
}
