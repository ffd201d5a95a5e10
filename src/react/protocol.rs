//! 模型输入输出协议：Task、Action、ModelOutput
//!
//! 模型每轮必须返回一个合法的 ModelOutput JSON；Action 以 `type` 字段区分变体，
//! 未知 type 在反序列化阶段即被拒绝（视为协议错误，而不是静默忽略）。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// DOM 快照为可交互元素打上的定位属性名
pub const LOCATOR_ATTRIBUTE: &str = "mmid";

/// 由数字定位 ID 生成 CSS 选择器，如 `[mmid='114']`
pub fn locator(target_id: u64) -> String {
    format!("[{}='{}']", LOCATOR_ATTRIBUTE, target_id)
}

/// 规划中的一步任务；写入 completed_tasks 后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Task {
    pub id: u64,
    pub description: String,
    /// 任务所在页面 URL（可选）
    #[serde(default)]
    pub url: Option<String>,
    /// 动作执行结果，由控制循环回填
    #[serde(default)]
    pub result: Option<String>,
}

impl Task {
    pub fn new(id: u64, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            url: None,
            result: None,
        }
    }
}

/// 浏览器动作（按 `type` 标签区分）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// 点击 mmid 对应元素；wait_before_secs 缺省为 1 秒
    Click {
        #[serde(alias = "mmid")]
        target_id: u64,
        #[serde(default, alias = "wait_before_execution")]
        wait_before_secs: Option<f64>,
    },
    /// 清空并输入文本，不会按回车
    Type {
        #[serde(alias = "mmid")]
        target_id: u64,
        #[serde(alias = "content")]
        text: String,
    },
    /// 打开 URL；无协议时默认补 https://
    #[serde(alias = "GOTO_URL")]
    Navigate {
        #[serde(alias = "website")]
        url: String,
        #[serde(default, alias = "timeout")]
        timeout_secs: Option<f64>,
    },
    /// 先输入再点击另一个元素；wait_before_click_secs 缺省为 1.5 秒
    #[serde(alias = "ENTER_TEXT_AND_CLICK")]
    TypeAndClick {
        #[serde(alias = "text_element_mmid")]
        text_target_id: u64,
        #[serde(alias = "text_to_enter")]
        text: String,
        #[serde(alias = "click_element_mmid")]
        click_target_id: u64,
        #[serde(default, alias = "wait_before_click_execution")]
        wait_before_click_secs: Option<f64>,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Click { .. } => "click",
            Action::Type { .. } => "type",
            Action::Navigate { .. } => "navigate",
            Action::TypeAndClick { .. } => "type_and_click",
        }
    }
}

/// 每轮发给模型的结构化输入（URL 与 DOM 单独作为末尾消息发送）
#[derive(Debug, Clone, Serialize)]
pub struct AgentInput {
    pub objective: String,
    pub completed_tasks: Vec<Task>,
    #[serde(skip)]
    pub current_page_url: String,
    #[serde(skip)]
    pub current_page_dom: String,
}

/// 模型每轮的结构化输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModelOutput {
    /// 规划思路
    pub thought: String,
    /// 完整计划
    #[serde(default)]
    pub plan: Vec<Task>,
    /// 下一步任务；未完成时必填
    #[serde(default)]
    pub next_task: Option<Task>,
    /// 下一步任务需要依次执行的动作
    #[serde(default)]
    pub next_task_actions: Option<Vec<Action>>,
    pub is_complete: bool,
    /// 完成时的最终回复；is_complete 为 true 时必填
    #[serde(default)]
    pub final_response: Option<String>,
}

/// ModelOutput 经校验后的去向
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Complete {
        final_response: String,
    },
    Continue {
        thought: String,
        plan: Vec<Task>,
        next_task: Task,
        actions: Vec<Action>,
    },
}

impl ModelOutput {
    /// 校验不变式：完成时必须有 final_response，否则必须有 next_task
    pub fn validate(&self) -> Result<(), String> {
        if self.is_complete {
            if self.final_response.is_none() {
                return Err("is_complete is true but final_response is missing".to_string());
            }
        } else if self.next_task.is_none() {
            return Err("is_complete is false but next_task is missing".to_string());
        }
        Ok(())
    }

    pub fn into_decision(self) -> Result<Decision, String> {
        self.validate()?;
        match (self.is_complete, self.final_response, self.next_task) {
            (true, Some(final_response), _) => Ok(Decision::Complete { final_response }),
            (false, _, Some(next_task)) => Ok(Decision::Continue {
                thought: self.thought,
                plan: self.plan,
                next_task,
                actions: self.next_task_actions.unwrap_or_default(),
            }),
            _ => Err("model output signals neither completion nor a next task".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_format() {
        assert_eq!(locator(114), "[mmid='114']");
    }

    #[test]
    fn test_parse_actions_by_tag() {
        let raw = r#"[
            {"type": "CLICK", "target_id": 3},
            {"type": "TYPE", "target_id": 4, "text": "rust"},
            {"type": "NAVIGATE", "url": "example.com", "timeout_secs": 2},
            {"type": "TYPE_AND_CLICK", "text_target_id": 5, "text": "q", "click_target_id": 6}
        ]"#;
        let actions: Vec<Action> = serde_json::from_str(raw).unwrap();
        assert_eq!(
            actions[0],
            Action::Click { target_id: 3, wait_before_secs: None }
        );
        assert_eq!(actions[2].kind(), "navigate");
        match &actions[3] {
            Action::TypeAndClick { wait_before_click_secs, .. } => {
                assert!(wait_before_click_secs.is_none())
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_parse_legacy_field_names() {
        let raw = r#"{"type": "ENTER_TEXT_AND_CLICK", "text_element_mmid": 1,
            "text_to_enter": "shape of you", "click_element_mmid": 2,
            "wait_before_click_execution": 0.5}"#;
        let action: Action = serde_json::from_str(raw).unwrap();
        assert_eq!(
            action,
            Action::TypeAndClick {
                text_target_id: 1,
                text: "shape of you".into(),
                click_target_id: 2,
                wait_before_click_secs: Some(0.5),
            }
        );

        let goto: Action =
            serde_json::from_str(r#"{"type": "GOTO_URL", "website": "https://a.b"}"#).unwrap();
        assert!(matches!(goto, Action::Navigate { ref url, timeout_secs: None } if url == "https://a.b"));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let raw = r#"{"type": "ENTER_DATE", "target_id": 1}"#;
        assert!(serde_json::from_str::<Action>(raw).is_err());
    }

    #[test]
    fn test_complete_without_final_response_is_invalid() {
        let output = ModelOutput {
            thought: "done".into(),
            plan: vec![],
            next_task: None,
            next_task_actions: None,
            is_complete: true,
            final_response: None,
        };
        assert!(output.validate().is_err());
        assert!(output.into_decision().is_err());
    }

    #[test]
    fn test_incomplete_without_next_task_is_invalid() {
        let output = ModelOutput {
            thought: "hmm".into(),
            plan: vec![Task::new(1, "a")],
            next_task: None,
            next_task_actions: None,
            is_complete: false,
            final_response: None,
        };
        let err = output.validate().unwrap_err();
        assert!(err.contains("next_task"));
    }

    #[test]
    fn test_into_decision_continue_defaults_actions() {
        let output: ModelOutput = serde_json::from_str(
            r#"{"thought": "t", "plan": [{"id": 1, "description": "open"}],
                "next_task": {"id": 1, "description": "open"}, "is_complete": false}"#,
        )
        .unwrap();
        match output.into_decision().unwrap() {
            Decision::Continue { next_task, actions, plan, .. } => {
                assert_eq!(next_task.id, 1);
                assert!(actions.is_empty());
                assert_eq!(plan.len(), 1);
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_agent_input_excludes_page_state() {
        let input = AgentInput {
            objective: "find x".into(),
            completed_tasks: vec![],
            current_page_url: "https://a.b".into(),
            current_page_dom: "<dom>".into(),
        };
        let json = serde_json::to_string(&input).unwrap();
        assert!(json.contains("find x"));
        assert!(!json.contains("https://a.b"));
        assert!(!json.contains("<dom>"));
    }
}
