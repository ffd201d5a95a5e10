//! LLM 层：客户端抽象、后端选择、结构化输出与 Mock

pub mod mock;
pub mod openai;
pub mod providers;
pub mod structured;
pub mod traits;

pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use providers::{create_llm, get_provider, ClientConfig, LlmProvider};
pub use structured::{Completion, StructuredClient, StructuredOutput};
pub use traits::{LlmClient, LlmError, RetryConfig};
