//! 规划层：模型输入输出协议、system prompt、Planner

pub mod planner;
pub mod prompts;
pub mod protocol;

pub use planner::Planner;
pub use protocol::{locator, Action, AgentInput, Decision, ModelOutput, Task, LOCATOR_ATTRIBUTE};
