use chrono::NaiveDate;
use thiserror::Error;

/// # Summary
/// 行情数据域错误枚举，处理网络、解析及数据缺失等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 编排层只把它当作单个代码的“无数据”信号，不向批次外传播。
#[derive(Error, Debug)]
pub enum MarketError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 数据解析错误，如 JSON 格式不匹配
    #[error("Parse error: {0}")]
    Parse(String),
    // 请求的数据未找到 (404 或内容为空)
    #[error("Data not found")]
    NotFound,
    // 未知或未分类的错误
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// # Summary
/// 列式序列表 (`SeriesFrame`) 的结构性错误。
///
/// # Invariants
/// - 任何列的长度必须与日期索引一致，违反时返回此错误而不是截断数据。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    // 列长度与索引长度不一致
    #[error("column '{column}' has {actual} cells, index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    // 数据行的单元格数量与列数不一致
    #[error("row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    // 日期索引未严格递增（乱序或重复）
    #[error("index is not strictly increasing at row {row} ({date})")]
    UnorderedIndex { row: usize, date: NaiveDate },
    // 列名重复
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
    // 请求的列不存在
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
}
