//! 日志初始化

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// 安装全局 `tracing` 订阅者
///
/// `RUST_LOG` 存在时优先使用，否则使用配置中的级别。
/// 重复调用时保留已有的订阅者；`log_to_console` 为 `false` 时不安装。
pub fn init_logging(config: &LoggingConfig) {
    if !config.log_to_console {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LoggingConfig {
            level: LogLevel::Debug,
            log_to_console: true,
        };
        init_logging(&config);
        init_logging(&config);
        tracing::debug!(target: "animation", "logging initialized twice");
    }
}
