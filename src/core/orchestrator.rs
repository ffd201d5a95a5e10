//! 控制循环
//!
//! 每轮：读取当前 URL 与 DOM 快照 → 组装 AgentInput → Planner 取得 ModelOutput →
//! 完成则记录最终回复并停止，否则按顺序执行动作、把结果写入 next_task 并追加到已完成任务。
//! 循环只在模型声明完成、出现不可恢复错误、达到配置的轮数上限或被取消时结束。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::{AgentError, AgentState};
use crate::memory::Memory;
use crate::react::{AgentInput, Decision, Planner};
use crate::tools::{ActionExecutor, BrowserSession, DomMode};

/// 一次运行的主控：持有 Planner、执行器与本次运行的浏览器会话
pub struct Orchestrator {
    planner: Planner,
    executor: ActionExecutor,
    session: Arc<dyn BrowserSession>,
    max_rounds: Option<usize>,
    cancel_token: CancellationToken,
}

impl Orchestrator {
    pub fn new(planner: Planner, executor: ActionExecutor, session: Arc<dyn BrowserSession>) -> Self {
        Self {
            planner,
            executor,
            session,
            max_rounds: None,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: Option<usize>) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// 取消令牌；取消后循环在下一轮开始前以 Cancelled 结束
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    /// 为目标运行一次完整循环，返回模型给出的最终回复
    pub async fn invoke(&mut self, objective: &str) -> Result<String, AgentError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", run_id = %run_id);
        async {
            tracing::info!(objective, "run started");
            let mut memory = Memory::new(objective);
            match self.run(&mut memory).await {
                Ok(()) => {
                    let Some(response) = memory.final_response().map(String::from) else {
                        return Err(AgentError::Protocol(
                            "run completed without a final response".to_string(),
                        ));
                    };
                    let (prompt, completion, total) = self.planner.token_usage();
                    tracing::info!(
                        rounds = memory.completed_tasks().len() + 1,
                        prompt_tokens = prompt,
                        completion_tokens = completion,
                        total_tokens = total,
                        "run completed"
                    );
                    tracing::info!("final response: {}", response);
                    Ok(response)
                }
                Err(e) => {
                    tracing::error!(objective, error = %e, "run failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// 在给定 Memory 上循环直到进入 COMPLETED
    pub async fn run(&mut self, memory: &mut Memory) -> Result<(), AgentError> {
        let mut round = 0usize;
        while memory.state() == AgentState::Running {
            if self.cancel_token.is_cancelled() {
                tracing::warn!(round, "run cancelled");
                return Err(AgentError::Cancelled);
            }
            if let Some(max) = self.max_rounds {
                if round >= max {
                    return Err(AgentError::RoundLimitExceeded(max));
                }
            }
            round += 1;
            self.step(memory, round).await?;
            log_memory(memory, round);
        }
        Ok(())
    }

    async fn step(&mut self, memory: &mut Memory, round: usize) -> Result<(), AgentError> {
        let current_page_url = self.session.current_url().await?;
        let current_page_dom = self.session.dom_snapshot(DomMode::AllFields).await?;
        tracing::debug!(round, url = %current_page_url, dom_chars = current_page_dom.len(), "observed page");

        let input = AgentInput {
            objective: memory.objective().to_string(),
            completed_tasks: memory.completed_tasks().to_vec(),
            current_page_url,
            current_page_dom,
        };
        let output = self.planner.plan(&input).await?;

        match output.into_decision().map_err(AgentError::Protocol)? {
            Decision::Complete { final_response } => {
                memory.complete(final_response);
            }
            Decision::Continue {
                thought,
                plan,
                mut next_task,
                actions,
            } => {
                tracing::info!(round, task = %next_task.description, actions = actions.len(), "next task");
                if !actions.is_empty() {
                    let results: Vec<String> = self
                        .executor
                        .execute_all(&actions)
                        .await
                        .into_iter()
                        .map(|outcome| outcome.message)
                        .collect();
                    next_task.result = Some(results.join("; "));
                }
                memory.record_round(next_task, plan, thought);
            }
        }
        Ok(())
    }

    /// 取消循环并关闭浏览器会话
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        self.cancel_token.cancel();
        self.session.close().await?;
        tracing::info!("browser session closed");
        Ok(())
    }
}

/// 每轮结束输出记忆视图
fn log_memory(memory: &Memory, round: usize) {
    let plan: Vec<String> = memory
        .plan()
        .iter()
        .map(|t| format!("{}. {}", t.id, t.description))
        .collect();
    let completed: Vec<String> = memory
        .completed_tasks()
        .iter()
        .map(|t| {
            let mark = if t.result.is_some() { "✓" } else { " " };
            format!("{} {}. {}", mark, t.id, t.description)
        })
        .collect();
    tracing::info!(
        round,
        state = %memory.state(),
        thought = memory.thought(),
        plan = ?plan,
        completed = ?completed,
        "memory"
    );
}
