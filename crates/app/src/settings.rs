use anyhow::Context;
use config::{Config, Environment, File};
use std::path::Path;
use stocker_core::config::AppConfig;

/// 默认配置文件名（不含扩展名），不存在时忽略
const DEFAULT_FILE: &str = "stocker";

/// 环境变量前缀，例如 `STOCKER__CACHE__TTL_SECS=600`
const ENV_PREFIX: &str = "STOCKER";

/// # Summary
/// 按优先级合并配置来源。
///
/// # Logic
/// 1. 以 `AppConfig::default()` 为基线。
/// 2. 叠加当前目录下可选的 `stocker.toml`，或命令行指定的配置文件（必须存在）。
/// 3. 叠加 `STOCKER__SECTION__KEY` 形式的环境变量。
/// 4. `DATABASE_URL` 存在时覆盖数据库连接串。
///
/// # Arguments
/// * `file`: 命令行指定的配置文件。
///
/// # Returns
/// 合并后的应用配置。
pub fn load(file: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut builder = Config::builder()
        .add_source(Config::try_from(&AppConfig::default()).context("serialize default config")?);

    builder = match file {
        Some(path) => builder.add_source(File::from(path).required(true)),
        None => builder.add_source(File::with_name(DEFAULT_FILE).required(false)),
    };

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("warmup.tickers"),
    );

    if let Ok(url) = std::env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", url)?;
    }

    builder
        .build()
        .context("load configuration")?
        .try_deserialize()
        .context("invalid configuration")
}
