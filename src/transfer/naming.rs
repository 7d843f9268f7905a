//! 对象键命名
//!
//! 保留原名模式：键 = 前缀 + 原始文件名。
//! 顺序编号模式：键 = 前缀 + 序号 + "." + 扩展名，序号为文件在列举结果中从 1 开始的位置，
//! 不补零。

use crate::drive::SourceFile;
use crate::error::TransferError;
use crate::utils::path::split_extension;
use std::collections::HashSet;

/// 命名模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingMode {
    #[default]
    Retain,
    Sequential,
}

/// 计算对象键。
///
/// # 参数
///
/// * `mode` - 命名模式。
/// * `prefix` - 键前缀，原样拼接。
/// * `original_name` - 原始文件名。
/// * `counter` - 从 1 开始的位置，顺序编号模式必需。
///
/// # 返回值
///
/// 对象键；顺序编号模式缺少序号时返回 `TransferError::Argument`。
///
/// # 示例
///
/// ```
/// use drive_pictures_to_s3::transfer::naming::{NamingMode, object_key};
///
/// assert_eq!(object_key(NamingMode::Sequential, "p/", "b.png", Some(2)).unwrap(), "p/2.png");
/// assert_eq!(object_key(NamingMode::Retain, "p/", "b.png", None).unwrap(), "p/b.png");
/// ```
pub fn object_key(
    mode: NamingMode,
    prefix: &str,
    original_name: &str,
    counter: Option<usize>,
) -> Result<String, TransferError> {
    match mode {
        NamingMode::Retain => Ok(format!("{prefix}{original_name}")),
        NamingMode::Sequential => {
            let counter = counter.ok_or_else(|| {
                TransferError::Argument(
                    "counter must be provided when filenames are not retained".to_string(),
                )
            })?;
            // 没有扩展名时整个文件名作为扩展名
            let extension = split_extension(original_name).1.unwrap_or(original_name);
            Ok(format!("{prefix}{counter}.{extension}"))
        }
    }
}

/// 为重名文件生成区分后的名称，`occurrence` 为第几次出现（从 1 开始）
///
/// 第一次出现保持原名，之后在扩展名前追加 `-n`。
pub fn disambiguate(name: &str, occurrence: usize) -> String {
    if occurrence <= 1 {
        return name.to_string();
    }
    match split_extension(name) {
        (stem, Some(ext)) if !stem.is_empty() => format!("{stem}-{occurrence}.{ext}"),
        _ => format!("{name}-{occurrence}"),
    }
}

/// 按列举顺序为保留原名模式分配互不相同的名称
///
/// 每个名称第一次出现时保持原样，之后的重名文件依次尝试 `-2`、`-3` …，
/// 跳过列举中已存在的原始名称以及已分配过的名称。
///
/// # 参数
///
/// * `files` - 列举结果，顺序决定分配结果。
///
/// # 返回值
///
/// 与 `files` 一一对应的名称列表。
pub fn retained_names(files: &[SourceFile]) -> Vec<String> {
    let mut taken: HashSet<String> = files.iter().map(|file| file.name.clone()).collect();
    let mut assigned: HashSet<String> = HashSet::with_capacity(files.len());

    files
        .iter()
        .map(|file| {
            if assigned.insert(file.name.clone()) {
                return file.name.clone();
            }
            let mut occurrence = 2;
            let mut candidate = disambiguate(&file.name, occurrence);
            while taken.contains(&candidate) {
                occurrence += 1;
                candidate = disambiguate(&file.name, occurrence);
            }
            taken.insert(candidate.clone());
            assigned.insert(candidate.clone());
            candidate
        })
        .collect()
}

/// 绑定了模式和前缀的命名器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNamer {
    mode: NamingMode,
    prefix: String,
}

impl ObjectNamer {
    pub fn new(mode: NamingMode, prefix: impl Into<String>) -> Self {
        Self {
            mode,
            prefix: prefix.into(),
        }
    }

    pub fn mode(&self) -> NamingMode {
        self.mode
    }

    pub fn key_for(&self, original_name: &str, counter: Option<usize>) -> Result<String, TransferError> {
        object_key(self.mode, &self.prefix, original_name, counter)
    }
}
