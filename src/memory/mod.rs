//! 记忆层：任务记忆（单次运行状态）、对话历史、任务说明存储

pub mod conversation;
pub mod instructions;
pub mod task_memory;

pub use conversation::{ConversationMemory, Message, Role};
pub use instructions::TaskInstructions;
pub use task_memory::Memory;
