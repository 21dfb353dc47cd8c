/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use crate::config::Config;
use crate::orchestrator::batch_processor::BatchReport;
use crate::error::FailureKind;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 设置了 `RUST_LOG` 时以其为准，否则默认 `info`，详细模式为 `debug`
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息（不输出凭证）
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 商品文案批量生成");
    info!("🤖 模型: {} ({})", config.llm_model_name, config.llm_api_base_url);
    info!("📊 最大并发数: {}", config.max_concurrent_records);
    info!(
        "⏱️ 单次请求超时: {}s, 最多尝试 {} 次",
        config.request_timeout_secs, config.max_attempts
    );
    if let Some(secs) = config.batch_deadline_secs {
        info!("⏰ 批次时限: {}s", secs);
    }
    info!("{}", "=".repeat(60));
}

/// 记录输入表加载信息
pub fn log_table_loaded(path: &str, records: usize, columns: &[String]) {
    info!("✓ 从 {} 读取到 {} 条记录", path, records);
    info!("📋 列: {}", columns.join(", "));
}

/// 打印最终统计信息
///
/// # 参数
/// - `report`: 批次报告
/// - `output_path`: 输出文件路径
pub fn print_final_stats(report: &BatchReport, output_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批次处理统计 ({})", report.state.as_str());
    info!(
        "开始时间: {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    info!(
        "完成时间: {}",
        report.finished_at.format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", report.success_count(), report.total());
    info!("❌ 失败: {}", report.failure_count());
    for kind in [
        FailureKind::Timeout,
        FailureKind::RateLimit,
        FailureKind::Auth,
        FailureKind::Provider,
        FailureKind::Parse,
    ] {
        let count = report
            .results
            .iter()
            .filter(|r| r.failure().is_some_and(|f| f.kind() == kind))
            .count();
        if count > 0 {
            info!("   - {}: {}", kind, count);
        }
    }
    if report.not_attempted_count() > 0 {
        warn!("⏭️ 未处理: {}", report.not_attempted_count());
    }
    if let Some(reason) = &report.abort_reason {
        warn!("🛑 中止原因: {}", reason);
    }
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", output_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
