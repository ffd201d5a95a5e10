//! System prompt 拼装：基础说明 + 输出 JSON Schema + 任务说明（可选）+ 当前日期

use chrono::{DateTime, Local, TimeZone};

use crate::llm::structured::schema_json;
use crate::react::ModelOutput;

const BASE_PROMPT: &str = "\
You are a web automation planner. You receive an objective and the tasks completed so far, \
together with the URL and a DOM representation of the current page. Decide the next task and \
the browser actions that complete it; a separate executor performs the actions and reports \
their results back to you as the `result` of each completed task.

Rules:
- Look at every completed task and its result first. Failed results mean the plan must change.
- Keep each task small: one page to open or one element to interact with.
- Elements are addressed by the numeric mmid shown in square brackets in the DOM.
- Available actions (the `type` field): NAVIGATE {url, timeout_secs?}, CLICK {target_id, \
wait_before_secs?}, TYPE {target_id, text}, TYPE_AND_CLICK {text_target_id, text, \
click_target_id, wait_before_click_secs?}. Prefer TYPE_AND_CLICK for search boxes.
- If a result says new elements appeared, the interaction is not finished: plan a follow-up.
- Verify on the page that the objective is met before finishing.
- When the objective is achieved, or cannot be achieved, set is_complete to true and put the \
answer for the user in final_response. Otherwise next_task is mandatory.

Reply with exactly one JSON object and no other text.";

/// 拼装完整 system prompt
pub fn build_system_prompt<Tz: TimeZone>(instructions: Option<&str>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut prompt = String::from(BASE_PROMPT);
    prompt.push_str("\n\nOutput JSON schema:\n");
    prompt.push_str(&schema_json::<ModelOutput>());

    if let Some(instructions) = instructions.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n\nAdditional task instructions from the user:\n");
        prompt.push_str(instructions);
    }

    prompt.push_str(&format!("\n\nToday's date is: {}", now.format("%d/%m/%Y")));
    prompt.push_str(&format!("\nCurrent weekday is: {}", now.format("%A")));
    prompt
}

/// 以本地时间拼装
pub fn system_prompt_now(instructions: Option<&str>) -> String {
    build_system_prompt(instructions, &Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Utc};

    #[test]
    fn test_prompt_contains_schema_instructions_and_date() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let prompt = build_system_prompt(Some("Always log in first."), &now);
        assert!(prompt.contains("\"next_task_actions\""));
        assert!(prompt.contains("Always log in first."));
        assert!(prompt.contains("Today's date is: 15/03/2024"));
        assert!(prompt.ends_with("Current weekday is: Friday"));
        assert_eq!(now.weekday(), chrono::Weekday::Fri);
    }

    #[test]
    fn test_blank_instructions_are_skipped() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let prompt = build_system_prompt(Some("   "), &now);
        assert!(!prompt.contains("Additional task instructions"));
    }
}
