//! 核心编排层：控制循环、状态、错误、构建器

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod state;

pub use builder::AgentBuilder;
pub use error::AgentError;
pub use orchestrator::Orchestrator;
pub use state::AgentState;
