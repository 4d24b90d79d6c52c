use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
    pub log: LogConfig,
    pub warmup: WarmupConfig,
}

/// 缓存后端类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    // 文件缓存目录
    pub dir: String,
    // 条目生存时间（秒）
    pub ttl_secs: u64,
    // 条目上限，0 表示只按生存时间过期
    pub threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::File,
            dir: "cache-directory".to_string(),
            ttl_secs: 60 * 60,
            threshold: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    // 是否把每次解析成功的序列写入归档库
    pub archive: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://stocker.db".to_string(),
            archive: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    // RUST_LOG 未设置时使用的过滤级别
    pub level: String,
    // 滚动日志目录，为空时只输出到终端
    pub dir: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

/// 启动预热：提前抓取并缓存常用代码
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    pub tickers: Vec<String>,
    pub lookback_days: u32,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            tickers: ["AAPL", "MSFT", "GOOGL", "AMZN", "META", "TSLA", "BRK-B", "NVDA", "JPM", "V"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            lookback_days: 365,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache.backend, CacheBackend::File);
        assert_eq!(config.cache.dir, "cache-directory");
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.cache.threshold, 5000);
        assert_eq!(config.database.url, "sqlite://stocker.db");
        assert_eq!(config.warmup.lookback_days, 365);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{"cache": {"backend": "memory", "ttl_secs": 60}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.threshold, 5000);
        assert_eq!(config.feed.timeout_secs, 10);
    }
}
