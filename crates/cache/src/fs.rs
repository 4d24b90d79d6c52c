use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use stocker_core::cache::error::CacheError;
use stocker_core::cache::policy::CachePolicy;
use stocker_core::cache::port::Cache;
use stocker_core::common::time::{RealTimeProvider, TimeProvider};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

const EXTENSION: &str = "cache";
const HEADER_LEN: usize = 8;

/// # Summary
/// 基于文件系统的缓存实现，进程重启后条目仍然有效。
///
/// # Invariants
/// - 每个键对应目录下的一个文件，文件名为键的 SHA-256 十六进制摘要。
/// - 文件内容 = 8 字节大端写入时刻（毫秒时间戳）+ 原始载荷。
/// - 写入先落临时文件再重命名，单键替换是原子的。
/// - 超出条目上限时先删除过期文件，再按写入时间删除最旧的文件。
pub struct FileCache {
    dir: PathBuf,
    policy: CachePolicy,
    ttl: TimeDelta,
    clock: Arc<dyn TimeProvider>,
    // 临时文件序号，避免并发写入同一键时互相覆盖临时文件
    tmp_seq: AtomicU64,
}

impl FileCache {
    /// # Summary
    /// 创建文件缓存并确保目录存在。
    ///
    /// # Arguments
    /// * `dir`: 缓存目录。
    /// * `policy`: 过期与淘汰策略。
    ///
    /// # Returns
    /// 目录无法创建时返回 `CacheError::Io`。
    pub fn new(dir: impl Into<PathBuf>, policy: CachePolicy) -> Result<Self, CacheError> {
        Self::with_clock(dir, policy, Arc::new(RealTimeProvider))
    }

    /// 使用指定时钟创建文件缓存
    pub fn with_clock(
        dir: impl Into<PathBuf>,
        policy: CachePolicy,
        clock: Arc<dyn TimeProvider>,
    ) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            ttl: TimeDelta::from_std(policy.ttl).unwrap_or(TimeDelta::MAX),
            policy,
            clock,
            tmp_seq: AtomicU64::new(0),
        })
    }

    /// 缓存目录
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{}.{}", digest, EXTENSION))
    }

    fn is_expired(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(stored_at) >= self.ttl
    }

    /// 从文件头解析写入时刻，损坏的头部返回 None
    fn decode_header(bytes: &[u8]) -> Option<DateTime<Utc>> {
        let header: [u8; HEADER_LEN] = bytes.get(..HEADER_LEN)?.try_into().ok()?;
        DateTime::from_timestamp_millis(i64::from_be_bytes(header))
    }

    async fn read_header(path: &Path) -> Option<DateTime<Utc>> {
        let mut file = tokio::fs::File::open(path).await.ok()?;
        let mut header = [0u8; HEADER_LEN];
        file.read_exact(&mut header).await.ok()?;
        Self::decode_header(&header)
    }

    async fn remove_quietly(path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await
            && e.kind() != ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %e, "Failed to remove cache file");
        }
    }

    /// # Summary
    /// 删除读取时判定为过期或损坏的文件。
    ///
    /// # Logic
    /// 1. 删除前重新读取头部：读取之后若有并发写入已将新文件重命名到位，则保留新文件。
    /// 2. 仍为过期、损坏或已不存在时删除。
    async fn discard_stale(&self, path: &Path) {
        match Self::read_header(path).await {
            Some(stored_at) if !self.is_expired(stored_at, self.clock.now()) => {
                debug!(path = %path.display(), "Cache file replaced by a concurrent write, keeping");
            }
            _ => Self::remove_quietly(path).await,
        }
    }

    async fn entry_paths(&self) -> Result<Vec<PathBuf>, CacheError> {
        let mut paths = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// # Summary
    /// 超出条目上限时清理目录。
    ///
    /// # Logic
    /// 1. 读取每个文件的写入时刻，删除过期或头部损坏的文件。
    /// 2. 仍超出上限时按写入时刻从旧到新删除。
    async fn prune(&self) -> Result<(), CacheError> {
        let Some(max_entries) = self.policy.max_entries() else {
            return Ok(());
        };
        let paths = self.entry_paths().await?;
        if paths.len() <= max_entries {
            return Ok(());
        }

        let now = self.clock.now();
        let mut live = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::read_header(&path).await {
                Some(stored_at) if !self.is_expired(stored_at, now) => live.push((stored_at, path)),
                _ => Self::remove_quietly(&path).await,
            }
        }

        let overflow = live.len().saturating_sub(max_entries);
        live.sort_unstable_by_key(|(stored_at, _)| *stored_at);
        for (_, path) in live.into_iter().take(overflow) {
            debug!(path = %path.display(), "Evicting oldest cache file");
            Self::remove_quietly(&path).await;
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for FileCache {
    /// # Summary
    /// 写入键对应的缓存文件。
    ///
    /// # Logic
    /// 1. 拼接写入时刻头部与载荷。
    /// 2. 写入同目录下的临时文件，再重命名覆盖目标文件。
    /// 3. 按策略检查容量。
    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let target = self.path_for(key);
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = target.with_extension(format!("{}.{}.tmp", std::process::id(), seq));

        let mut bytes = Vec::with_capacity(HEADER_LEN + value.len());
        bytes.extend_from_slice(&self.clock.now().timestamp_millis().to_be_bytes());
        bytes.extend_from_slice(&value);

        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            Self::remove_quietly(&tmp).await;
            return Err(e.into());
        }

        self.prune().await
    }

    /// # Summary
    /// 读取键对应的缓存文件。
    ///
    /// # Logic
    /// 1. 文件不存在返回 None。
    /// 2. 头部损坏或已过期时返回 None，并在确认文件未被并发替换后删除。
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.path_for(key);
        let mut bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match Self::decode_header(&bytes) {
            Some(stored_at) if !self.is_expired(stored_at, self.clock.now()) => {
                bytes.drain(..HEADER_LEN);
                Ok(Some(bytes))
            }
            Some(_) => {
                debug!(key, "Cache file expired");
                self.discard_stale(&path).await;
                Ok(None)
            }
            None => {
                warn!(key, "Corrupt cache file header, discarding");
                self.discard_stale(&path).await;
                Ok(None)
            }
        }
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn len(&self) -> Result<usize, CacheError> {
        Ok(self.entry_paths().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;
    use stocker_core::common::time::FakeClockProvider;

    #[tokio::test]
    async fn test_discard_keeps_concurrently_replaced_file() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(FakeClockProvider::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap(),
        ));
        let policy = CachePolicy::lru(Duration::from_secs(3600), 10);
        let cache = FileCache::with_clock(dir.path(), policy, clock.clone()).unwrap();
        let path = cache.path_for("k");

        cache.set_raw("k", vec![1]).await.unwrap();
        clock.advance(TimeDelta::hours(2));
        let stale = tokio::fs::read(&path).await.unwrap();
        assert!(cache.is_expired(FileCache::decode_header(&stale).unwrap(), clock.now()));

        // 过期判定之后、删除之前有新值写入
        cache.set_raw("k", vec![2]).await.unwrap();
        cache.discard_stale(&path).await;
        assert_eq!(cache.get_raw("k").await.unwrap(), Some(vec![2]));

        clock.advance(TimeDelta::hours(2));
        cache.discard_stale(&path).await;
        assert!(!path.exists());
    }
}
