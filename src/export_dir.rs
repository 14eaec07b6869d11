//! 导出目录扫描
//!
//! 导出目录中必须恰好有一个头文件（`.sql`），以及零个或多个 unload 数据文件
//! （`.unl`，扩展名大小写不敏感）。其他普通文件视为错误，子目录被忽略。

use crate::error::{ImportError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// 扫描后的导出目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDirectory {
    root: PathBuf,
    header: PathBuf,
    unload_files: Vec<PathBuf>,
}

impl ExportDirectory {
    /// 扫描导出目录
    ///
    /// # Errors
    /// 目录不可读、头文件缺失或重复、存在无法识别的文件时返回错误
    pub fn scan<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let root = dir.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ImportError::consistency(format!(
                "导出目录不存在: {}",
                root.display()
            )));
        }

        let mut headers = Vec::new();
        let mut unload_files = Vec::new();
        let mut unexpected = Vec::new();

        for entry in fs::read_dir(&root)? {
            let path = entry?.path();
            // 跳过非文件项（例如目录）
            if !path.is_file() {
                continue;
            }
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase);
            match ext.as_deref() {
                Some("sql") => headers.push(path),
                Some("unl") => unload_files.push(path),
                _ => unexpected.push(path),
            }
        }

        if !unexpected.is_empty() {
            let names: Vec<String> =
                unexpected.iter().map(|p| file_name(p)).collect();
            return Err(ImportError::consistency(format!(
                "导出目录 {} 中存在无法识别的文件: {}",
                root.display(),
                names.join(", ")
            )));
        }

        headers.sort();
        let header = match headers.len() {
            0 => {
                return Err(ImportError::consistency(format!(
                    "导出目录 {} 中没有找到 .sql 头文件",
                    root.display()
                )));
            }
            1 => headers.remove(0),
            _ => {
                let names: Vec<String> =
                    headers.iter().map(|p| file_name(p)).collect();
                return Err(ImportError::consistency(format!(
                    "导出目录 {} 中存在多个头文件: {}",
                    root.display(),
                    names.join(", ")
                )));
            }
        };

        unload_files.sort();
        tracing::debug!(
            header = %header.display(),
            unload_files = unload_files.len(),
            "导出目录扫描完成: {}",
            root.display()
        );
        Ok(Self { root, header, unload_files })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 头文件路径
    #[must_use]
    pub fn header(&self) -> &Path {
        &self.header
    }

    /// 目录中存在但不在 `referenced` 中的 unload 文件名
    #[must_use]
    pub fn unreferenced<'a, I>(&self, referenced: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let referenced: Vec<&str> = referenced.into_iter().collect();
        self.unload_files
            .iter()
            .map(|p| file_name(p))
            .filter(|name| !referenced.contains(&name.as_str()))
            .collect()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}
