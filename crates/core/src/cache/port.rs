use crate::cache::error::CacheError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

/// # Summary
/// 序列缓存后端 (Port)，内存与文件两种实现共用。
///
/// # Invariants
/// - 接口只处理字节，保持 `dyn Cache` 可用；类型化读写见 `CacheExt`。
/// - 已过期或已被淘汰的键读取时返回 `None`。
/// - 同一键的写入整体替换旧值并刷新写入时间，并发写入以最后完成者为准。
#[async_trait]
pub trait Cache: Send + Sync {
    /// # Summary
    /// 写入一个键，覆盖旧值。
    ///
    /// # Arguments
    /// * `key`: 缓存键。
    /// * `value`: 序列化后的载荷。
    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// 读取一个键，缺失或过期时为 `None`
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// 删除一个键，幂等
    async fn del(&self, key: &str) -> Result<(), CacheError>;

    /// 当前条目数，可能含尚未惰性清理的过期条目
    async fn len(&self) -> Result<usize, CacheError>;
}

/// JSON 载荷的类型化读写，所有 `Cache` 自动获得。
#[async_trait]
pub trait CacheExt: Cache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        let payload =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialize(e.to_string()))?;
        self.set_raw(key, payload).await
    }

    /// # Summary
    /// 读取并解码 JSON 载荷。
    ///
    /// # Returns
    /// 未命中为 `Ok(None)`；载荷无法解码为 `T` 时返回 `CacheError::Deserialize`。
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.get_raw(key)
            .await?
            .map(|payload| {
                serde_json::from_slice(&payload).map_err(|e| CacheError::Deserialize(e.to_string()))
            })
            .transpose()
    }
}

impl<T: Cache + ?Sized> CacheExt for T {}
