//! webpilot - LLM 驱动的网页自动化智能体
//!
//! 给定一个自然语言目标，控制循环反复读取当前页面（URL + DOM 快照），请模型规划下一步任务与浏览器动作，
//! 按顺序执行动作并把结果反馈给模型，直到模型声明目标完成。
//!
//! 模块划分：
//! - **cli**: 命令行参数
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 控制循环（Orchestrator）、状态、错误、构建器
//! - **llm**: LLM 客户端抽象、后端表、带 Schema 校验与有界重试的结构化调用
//! - **memory**: 任务记忆、对话历史、任务说明存储
//! - **react**: 模型输入输出协议、system prompt、Planner
//! - **tools**: 浏览器会话抽象、注入脚本、动作执行器
//! - **observability**: 日志初始化

pub mod cli;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;

pub use crate::core::{AgentBuilder, AgentError, Orchestrator};
