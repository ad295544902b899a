//! agent-mongo 命令行入口
//!
//! 面向 AI agent 的只读 MongoDB 命令行工具：
//! - 结果以 JSON 输出到 stdout
//! - 错误以 `{"error": "..."}` 输出到 stderr，退出码为 1
//! - 日志只写 stderr

mod args;
mod commands;
mod state;
mod usage;

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use args::Cli;
use common::errors::AppError;
use common::response::error_envelope;
use state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help / --version / 无参数
        Err(err) if !err.use_stderr() || err.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            let rendered = err.to_string();
            let message = rendered.lines().next().unwrap_or_default();
            let message = message.trim_start_matches("error: ").to_string();
            eprintln!("{}", error_envelope(&AppError::Validation(message)));
            return ExitCode::FAILURE;
        }
    };

    // 初始化日志追踪
    init_tracing(cli.globals.verbose);

    let state = AppState::new(&cli.globals);
    let result = commands::dispatch(&state, cli.command).await;

    // 无论成功与否都释放本次打开的会话
    state.sessions.close_all().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(code = err.code(), kind = ?err.kind(), "命令执行失败");
            eprintln!("{}", error_envelope(&err));
            ExitCode::FAILURE
        }
    }
}

/// stderr 日志；默认 warn，`-v` 为 debug，`RUST_LOG` 优先
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
