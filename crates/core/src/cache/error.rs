use thiserror::Error;

/// # Summary
/// 序列缓存错误枚举，处理序列化失败及底层存储故障。
///
/// # Invariants
/// - 编排层遇到此错误时降级为“未命中”或仅记录日志，不影响批次结果。
#[derive(Error, Debug)]
pub enum CacheError {
    // 载荷序列化失败
    #[error("Serialize error: {0}")]
    Serialize(String),
    // 载荷反序列化失败（通常意味着条目损坏）
    #[error("Deserialize error: {0}")]
    Deserialize(String),
    // 文件系统读写失败
    #[error("IO error: {0}")]
    Io(String),
    // 底层存储引擎故障
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        CacheError::Io(e.to_string())
    }
}
