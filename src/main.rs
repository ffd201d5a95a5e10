//! webpilot 命令行入口
//!
//! 用法：`webpilot [--config <file>] [--instructions <text>] <目标...>`
//! 初始化日志、加载配置、构建 Orchestrator 并运行目标，Ctrl-C 在当前轮结束后取消。

use anyhow::Context;
use clap::Parser;
use webpilot::cli::Args;
use webpilot::config::load_config;
use webpilot::core::AgentBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    webpilot::observability::init();

    let objective = args.objective();
    let cfg = load_config(args.config).context("Failed to load config")?;

    let mut builder = AgentBuilder::new(cfg);
    if let Some(text) = args.instructions {
        builder = builder.with_task_instructions(text);
    }
    let mut orchestrator = builder.build().context("Failed to create agent")?;

    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current round");
            cancel.cancel();
        }
    });

    let result = orchestrator.invoke(&objective).await;
    if let Err(e) = orchestrator.shutdown().await {
        tracing::warn!(error = %e, "browser shutdown failed");
    }

    let answer = result.context("Run failed")?;
    println!("{}", answer);
    Ok(())
}
