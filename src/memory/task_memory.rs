//! 任务记忆：一次 invoke 的全部可变状态
//!
//! 只由控制循环持有和修改；completed_tasks 只追加、不重排。

use crate::core::AgentState;
use crate::react::protocol::Task;

/// 单次运行的任务记忆（目标、计划、已完成任务、当前任务、最终回复）
#[derive(Debug, Clone)]
pub struct Memory {
    objective: String,
    state: AgentState,
    plan: Vec<Task>,
    thought: String,
    completed_tasks: Vec<Task>,
    current_task: Option<Task>,
    final_response: Option<String>,
}

impl Memory {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            state: AgentState::Running,
            plan: Vec::new(),
            thought: String::new(),
            completed_tasks: Vec::new(),
            current_task: None,
            final_response: None,
        }
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn plan(&self) -> &[Task] {
        &self.plan
    }

    pub fn thought(&self) -> &str {
        &self.thought
    }

    pub fn completed_tasks(&self) -> &[Task] {
        &self.completed_tasks
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.current_task.as_ref()
    }

    pub fn final_response(&self) -> Option<&str> {
        self.final_response.as_deref()
    }

    /// 进入终态 COMPLETED 并记录最终回复
    pub(crate) fn complete(&mut self, final_response: String) {
        self.state = AgentState::Completed;
        self.final_response = Some(final_response);
    }

    /// 记录一轮非终止输出：追加已完成任务、采纳计划与思路，并生成占位的 current_task
    pub(crate) fn record_round(&mut self, task: Task, plan: Vec<Task>, thought: String) {
        let description = task.description.clone();
        self.completed_tasks.push(task);
        self.plan = plan;
        self.thought = thought;
        self.current_task = Some(Task::new(
            self.completed_tasks.len() as u64 + 1,
            description,
        ));
    }
}
