//! Agent 错误类型
//!
//! 协议错误、模型调用耗尽重试、观察页面状态失败都会终止本次运行；
//! 单个浏览器动作的失败不会出现在这里，而是作为结果字符串交给模型重新规划。

use thiserror::Error;

use crate::llm::LlmError;
use crate::tools::BrowserError;

/// 运行过程中的致命错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 模型输出违反 ModelOutput 约定（如既未完成也没有 next_task）
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Round limit reached ({0})")]
    RoundLimitExceeded(usize),

    #[error("Cancelled")]
    Cancelled,
}

impl From<LlmError> for AgentError {
    /// 重试耗尽且最后一次是校验失败时归为协议错误，其余归为模型调用错误
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Validation(msg) => AgentError::Protocol(msg),
            LlmError::Exhausted { attempts, last } => match *last {
                LlmError::Validation(msg) => AgentError::Protocol(format!(
                    "model output still invalid after {} attempts: {}",
                    attempts, msg
                )),
                other => AgentError::Llm(LlmError::Exhausted {
                    attempts,
                    last: Box::new(other),
                }),
            },
            other => AgentError::Llm(other),
        }
    }
}
