//! Planner：把当前轮的 AgentInput 组织成对话并取得校验通过的 ModelOutput
//!
//! 每轮消息布局：system（说明 + Schema）→ [可选历史] → user（objective / completed_tasks 的 JSON）
//! → assistant 确认 → user（当前 URL 与 DOM，单独一条放在最后）。
//! 默认每轮无状态；开启 keep_history 后把每轮对话追加到 ConversationMemory 并按轮数裁剪。

use crate::core::AgentError;
use crate::llm::{LlmClient, StructuredClient};
use crate::memory::{ConversationMemory, Message};
use crate::react::{AgentInput, ModelOutput};

const INPUT_ACK: &str = "Understood. I will follow the instructions. Please provide the current page URL and DOM.";

/// 末尾的页面消息
pub fn page_message(input: &AgentInput) -> Message {
    Message::user(format!(
        "Current page URL:\n{}\n\n Current page DOM:\n{}",
        input.current_page_url, input.current_page_dom
    ))
}

pub struct Planner {
    structured: StructuredClient,
    system_prompt: String,
    keep_history: bool,
    history: ConversationMemory,
}

impl Planner {
    pub fn new(structured: StructuredClient, system_prompt: impl Into<String>) -> Self {
        Self {
            structured,
            system_prompt: system_prompt.into(),
            keep_history: false,
            history: ConversationMemory::new(0),
        }
    }

    /// 保留跨轮对话，最多 max_turns 轮
    pub fn with_history(mut self, max_turns: usize) -> Self {
        self.keep_history = true;
        self.history = ConversationMemory::new(max_turns);
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn history(&self) -> &ConversationMemory {
        &self.history
    }

    pub fn llm(&self) -> &std::sync::Arc<dyn LlmClient> {
        self.structured.llm()
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.structured.llm().token_usage()
    }

    /// 本轮要发送的完整消息
    pub fn build_messages(&self, input: &AgentInput) -> Result<Vec<Message>, AgentError> {
        let payload = serde_json::to_string(input)
            .map_err(|e| AgentError::Protocol(format!("failed to encode agent input: {}", e)))?;

        let mut messages = vec![Message::system(self.system_prompt.clone())];
        if self.keep_history {
            messages.extend(self.history.messages().iter().cloned());
        }
        messages.push(Message::user(payload));
        messages.push(Message::assistant(INPUT_ACK));
        messages.push(page_message(input));
        Ok(messages)
    }

    /// 调用模型规划下一步
    pub async fn plan(&mut self, input: &AgentInput) -> Result<ModelOutput, AgentError> {
        let messages = self.build_messages(input)?;
        let completion = self.structured.complete::<ModelOutput>(&messages).await?;

        if self.keep_history {
            let round_start = messages.len() - 3;
            let mut turn: Vec<Message> = messages[round_start..].to_vec();
            turn.push(Message::assistant(completion.raw));
            self.history.extend(turn);
        }
        Ok(completion.value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::llm::{LlmError, MockLlmClient, RetryConfig};
    use crate::memory::Role;
    use crate::react::Task;

    const CONTINUE: &str = r#"{"thought":"open it","plan":[{"id":1,"description":"open"}],
        "next_task":{"id":1,"description":"open"},"next_task_actions":[{"type":"NAVIGATE","url":"example.com"}],
        "is_complete":false}"#;

    fn input() -> AgentInput {
        AgentInput {
            objective: "find the docs".into(),
            completed_tasks: vec![Task::new(1, "open site")],
            current_page_url: "https://example.com".into(),
            current_page_dom: "[1] a \"Docs\"".into(),
        }
    }

    fn planner(mock: Arc<MockLlmClient>) -> Planner {
        let structured =
            StructuredClient::new(mock, RetryConfig::new(3, Duration::ZERO), Duration::from_secs(5));
        Planner::new(structured, "SYSTEM")
    }

    #[tokio::test]
    async fn test_layout_puts_page_last() {
        let mock = Arc::new(MockLlmClient::new(vec![Ok(CONTINUE.to_string())]));
        let mut planner = planner(mock.clone());
        let output = planner.plan(&input()).await.unwrap();
        assert_eq!(output.next_task.unwrap().description, "open");

        let sent = &mock.calls()[0];
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent[1].role, Role::User);
        assert!(sent[1].content.contains("\"objective\":\"find the docs\""));
        assert!(!sent[1].content.contains("current_page_dom"));
        assert_eq!(sent[2].role, Role::Assistant);
        assert_eq!(
            sent[3].content,
            "Current page URL:\nhttps://example.com\n\n Current page DOM:\n[1] a \"Docs\""
        );
    }

    #[tokio::test]
    async fn test_stateless_by_default() {
        let mock = Arc::new(MockLlmClient::new(vec![
            Ok(CONTINUE.to_string()),
            Ok(CONTINUE.to_string()),
        ]));
        let mut planner = planner(mock.clone());
        planner.plan(&input()).await.unwrap();
        planner.plan(&input()).await.unwrap();
        assert_eq!(mock.calls()[1].len(), 4);
        assert!(planner.history().is_empty());
    }

    #[tokio::test]
    async fn test_history_accumulates() {
        let mock = Arc::new(MockLlmClient::new(vec![
            Ok(CONTINUE.to_string()),
            Ok(CONTINUE.to_string()),
        ]));
        let mut planner = planner(mock.clone()).with_history(10);
        planner.plan(&input()).await.unwrap();
        planner.plan(&input()).await.unwrap();

        let second = &mock.calls()[1];
        assert_eq!(second.len(), 8);
        assert_eq!(second[4].role, Role::Assistant);
        assert!(second[4].content.contains("\"open it\""));
        assert!(second[7].content.starts_with("Current page URL:"));
    }

    #[tokio::test]
    async fn test_invalid_output_becomes_protocol_error() {
        let mock = Arc::new(MockLlmClient::new(vec![
            Ok(r#"{"thought":"x","is_complete":false}"#.to_string()),
            Ok(r#"{"thought":"x","is_complete":false}"#.to_string()),
            Ok(r#"{"thought":"x","is_complete":false}"#.to_string()),
        ]));
        let mut planner = planner(mock.clone());
        let err = planner.plan(&input()).await.unwrap_err();
        assert!(matches!(err, AgentError::Protocol(_)));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_transport_error_becomes_llm_error() {
        let mock = Arc::new(MockLlmClient::new(vec![
            Err(LlmError::Request("down".into())),
            Err(LlmError::Request("down".into())),
            Err(LlmError::Request("down".into())),
        ]));
        let err = planner(mock).plan(&input()).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
    }
}
