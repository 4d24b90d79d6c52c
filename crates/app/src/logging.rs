use stocker_core::config::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// # Summary
/// 初始化全局日志。
///
/// # Logic
/// 1. 过滤级别优先取 `RUST_LOG`，否则取配置中的 `log.level`。
/// 2. 终端输出写到 stderr，stdout 留给命令结果。
/// 3. 配置了日志目录时追加按天滚动的文件输出（非阻塞写入）。
///
/// # Returns
/// 文件输出的后台写入守卫，必须持有到进程结束，否则尾部日志会丢失。
pub fn init(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "stocker.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            registry.try_init()?;
            Ok(None)
        }
    }
}
