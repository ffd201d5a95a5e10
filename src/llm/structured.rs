//! 结构化输出客户端
//!
//! 调用 LLM 后从回复中提取 JSON、反序列化并校验不变式；失败时把无效回复与纠正提示追加到对话中
//! 再次请求，最多 max_attempts 次，耗尽后返回 LlmError::Exhausted。

use std::sync::Arc;
use std::time::Duration;

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

use crate::llm::{LlmClient, LlmError, RetryConfig};
use crate::memory::Message;
use crate::react::protocol::ModelOutput;

/// 可由模型生成并校验的结构化输出
pub trait StructuredOutput: DeserializeOwned + JsonSchema {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl StructuredOutput for ModelOutput {
    fn validate(&self) -> Result<(), String> {
        ModelOutput::validate(self)
    }
}

/// 返回类型 T 的 JSON Schema 字符串，可拼入 system prompt
pub fn schema_json<T: JsonSchema>() -> String {
    let schema = schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// 从模型回复中取出 JSON 对象（兼容 ```json 代码块与前后多余文字）
pub fn extract_json(output: &str) -> &str {
    let trimmed = output.trim();
    // 只有围栏位于第一个 `{` 之前时才剥离，JSON 字符串里的 ``` 保持原样
    let fence = trimmed
        .find("```")
        .filter(|&start| trimmed.find('{').map_or(true, |brace| start < brace));
    let body = if let Some(start) = fence {
        let rest = &trimmed[start + 3..];
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        rest.find("```").map(|end| &rest[..end]).unwrap_or(rest).trim()
    } else {
        trimmed
    };
    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    }
}

/// 带校验与有界重试的结构化调用
pub struct StructuredClient {
    llm: Arc<dyn LlmClient>,
    retry: RetryConfig,
    request_timeout: Duration,
}

/// 成功结果：解析后的值与模型原始回复
#[derive(Debug, Clone)]
pub struct Completion<T> {
    pub value: T,
    pub raw: String,
}

impl StructuredClient {
    pub fn new(llm: Arc<dyn LlmClient>, retry: RetryConfig, request_timeout: Duration) -> Self {
        Self {
            llm,
            retry,
            request_timeout,
        }
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    fn parse<T: StructuredOutput>(raw: &str) -> Result<T, LlmError> {
        let json = extract_json(raw);
        let value: T = serde_json::from_str(json)
            .map_err(|e| LlmError::Validation(format!("{}: {}", e, json)))?;
        value.validate().map_err(LlmError::Validation)?;
        Ok(value)
    }

    async fn request(&self, conversation: &[Message]) -> Result<String, LlmError> {
        match tokio::time::timeout(self.request_timeout, self.llm.complete(conversation)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.request_timeout.as_secs())),
        }
    }

    /// 调用模型并返回校验通过的 T
    pub async fn complete<T: StructuredOutput>(
        &self,
        messages: &[Message],
    ) -> Result<Completion<T>, LlmError> {
        let mut conversation = messages.to_vec();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.request(&conversation).await {
                Ok(raw) => match Self::parse::<T>(&raw) {
                    Ok(value) => return Ok(Completion { value, raw }),
                    Err(err) => {
                        conversation.push(Message::assistant(raw));
                        conversation.push(Message::user(format!(
                            "Your previous reply was rejected: {}. Respond with a single JSON object that \
                             matches the required schema and nothing else.",
                            err
                        )));
                        err
                    }
                },
                Err(err) => err,
            };

            tracing::warn!(
                llm = self.llm.name(),
                attempt,
                max_attempts = self.retry.max_attempts,
                error = %err,
                "structured completion failed"
            );

            if attempt >= self.retry.max_attempts {
                return Err(LlmError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            tokio::time::sleep(self.retry.delay_for(&err)).await;
        }
    }
}
