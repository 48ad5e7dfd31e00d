//! ダウンロードしたファイルの保存

use crate::error::Result;
use std::path::{Path, PathBuf};

/// `dir` に保存する。同名ファイルがあれば `name (1).ext` のように連番を付ける
pub fn save_download(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = unique_path(dir, file_name);
    std::fs::write(&path, bytes)?;
    Ok(path)
}

fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let ext = name.extension().and_then(|s| s.to_str());

    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
            None => dir.join(format!("{} ({})", stem, n)),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
