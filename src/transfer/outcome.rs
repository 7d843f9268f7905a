use crate::error::TransferError;
use std::fmt;
use tracing::{info, warn};

/// 单个文件流水线失败时所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Naming,
    Uploading,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Naming => "naming",
            Stage::Uploading => "uploading",
        };
        f.write_str(name)
    }
}

/// 单个文件的失败信息
#[derive(Debug)]
pub struct FileFailure {
    pub stage: Stage,
    pub error: TransferError,
}

impl FileFailure {
    pub fn new(stage: Stage, error: TransferError) -> Self {
        Self { stage, error }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

/// 单个文件的传输结果
#[derive(Debug)]
pub struct TransferOutcome {
    pub source_id: String,
    pub display_name: String,
    /// 在列举结果中从 1 开始的位置
    pub position: usize,
    /// 成功时为写入的对象键
    pub result: Result<String, FileFailure>,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn key(&self) -> Option<&str> {
        self.result.as_ref().ok().map(String::as_str)
    }
}

/// 一次运行的全部结果，按列举顺序排列
#[derive(Debug, Default)]
pub struct TransferReport {
    pub outcomes: Vec<TransferOutcome>,
}

impl TransferReport {
    pub fn new(outcomes: Vec<TransferOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn uploaded_keys(&self) -> Vec<&str> {
        self.outcomes.iter().filter_map(TransferOutcome::key).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&TransferOutcome, &FileFailure)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|failure| (outcome, failure)))
    }

    /// 输出汇总日志，每个失败文件一行
    pub fn log_summary(&self) {
        for (outcome, failure) in self.failures() {
            warn!(
                file_id = %outcome.source_id,
                stage = %failure.stage,
                "Not transferred: {}: {}",
                outcome.display_name,
                failure.error
            );
        }
        info!(
            total = self.total(),
            succeeded = self.succeeded(),
            failed = self.failed(),
            "File transfer process completed"
        );
    }
}
