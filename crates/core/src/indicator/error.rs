use crate::market::error::FrameError;
use thiserror::Error;

/// # Summary
/// 指标计算错误，仅影响当前一次计算调用。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndicatorError {
    // 缺少必需的输入列，按字母序列出
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    // 写入派生列时表结构异常
    #[error(transparent)]
    Frame(#[from] FrameError),
}
