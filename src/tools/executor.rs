//! 动作执行器
//!
//! 把模型声明的 Action 翻译为 BrowserSession 调用，每个动作返回一条人类可读的结果描述。
//! 浏览器层面的失败（元素不存在、点击/输入异常、导航超时）不会向上抛出，而是作为失败描述返回，
//! 由控制循环写入任务结果，供模型下一轮重新规划。动作严格按给定顺序逐个执行。

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::react::{locator, Action};
use crate::tools::{BrowserError, BrowserSession};

/// 等待参数上限（秒），超出按上限处理
const MAX_WAIT_SECS: f64 = 600.0;

/// 执行器参数，对应配置文件 `[executor]` 段
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Click 未指定等待时的前置等待
    pub click_wait_secs: f64,
    /// TypeAndClick 未指定等待时的点击前等待
    pub type_and_click_wait_secs: f64,
    /// Navigate 超时下限
    pub navigate_floor_secs: u64,
    pub navigate_retries: u32,
    pub navigate_backoff_ms: u64,
    /// 点击后等待整页跳转的时长
    pub click_navigation_timeout_secs: u64,
    pub selector_timeout_ms: u64,
    /// 动作结束后等待 DOM 变更被记录的时长
    pub settle_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            click_wait_secs: 1.0,
            type_and_click_wait_secs: 1.5,
            navigate_floor_secs: 30,
            navigate_retries: 3,
            navigate_backoff_ms: 2000,
            click_navigation_timeout_secs: 10,
            selector_timeout_ms: 2000,
            settle_ms: 100,
        }
    }
}

/// 单个动作的执行结果
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub kind: &'static str,
    pub success: bool,
    /// 最终写入任务结果的描述
    pub message: String,
    /// 动作引起的新出现元素
    pub new_elements: Vec<String>,
}

impl ActionOutcome {
    /// 动作是否使页面出现了新内容（可能需要再取一次 DOM 才算真正完成）
    pub fn dom_changed(&self) -> bool {
        !self.new_elements.is_empty()
    }
}

/// 内部步骤结果：简述 + 详述
struct StepReport {
    success: bool,
    summary: String,
    detail: String,
}

impl StepReport {
    fn ok(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            success: true,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    fn failed(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            success: false,
            summary: detail.clone(),
            detail,
        }
    }
}

/// 触发 DOM 变化、尚需后续交互的动作
enum PendingAction<'a> {
    Click(String),
    EnterText(&'a str),
}

impl PendingAction<'_> {
    fn dom_changed_message(&self, report: &StepReport, new_elements: &[String]) -> String {
        let appeared = new_elements.join(", ");
        match self {
            Self::Click(selector) => format!(
                "Success: {}.\n As a consequence of this action, new elements have appeared in view: {}. This means that the action to click {} is not yet executed and needs further interaction. Get all_fields DOM to complete the interaction.",
                report.summary, appeared, selector
            ),
            Self::EnterText(text) => format!(
                "{}.\n As a consequence of this action, new elements have appeared in view: {}. This means that the action of entering text {} is not yet executed and needs further interaction. Get all_fields DOM to complete the interaction.",
                report.detail.trim_end_matches('.'),
                appeared,
                text
            ),
        }
    }
}

/// 无协议前缀时补 https://
pub fn ensure_protocol(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        tracing::info!(url, "added https:// to url without protocol");
        format!("https://{}", url)
    }
}

/// 把模型给出的秒数规整为 Duration：缺省用 default，非法值视为 0
fn seconds(value: Option<f64>, default: f64) -> Duration {
    let secs = value.unwrap_or(default);
    let secs = if secs.is_finite() { secs } else { 0.0 };
    Duration::from_secs_f64(secs.clamp(0.0, MAX_WAIT_SECS))
}

/// 动作执行器：持有本次运行的浏览器会话
pub struct ActionExecutor {
    session: Arc<dyn BrowserSession>,
    config: ExecutorConfig,
    screenshots_dir: Option<PathBuf>,
    screenshot_seq: AtomicU64,
}

impl ActionExecutor {
    pub fn new(session: Arc<dyn BrowserSession>, config: ExecutorConfig) -> Self {
        Self {
            session,
            config,
            screenshots_dir: None,
            screenshot_seq: AtomicU64::new(0),
        }
    }

    /// 每个动作前后截图保存到 dir
    pub fn with_screenshots(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshots_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// 依次执行全部动作；结果顺序与动作顺序一致，单个动作失败不影响后续动作
    pub async fn execute_all(&self, actions: &[Action]) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            outcomes.push(self.execute(action).await);
        }
        outcomes
    }

    /// 执行单个动作，输出 JSON 审计日志
    pub async fn execute(&self, action: &Action) -> ActionOutcome {
        let start = Instant::now();
        let kind = action.kind();
        self.screenshot(kind, "start").await;

        let watches_dom = !matches!(action, Action::Navigate { .. });
        if watches_dom {
            if let Err(e) = self.session.watch_mutations().await {
                tracing::debug!(error = %e, "mutation observer unavailable");
            }
        }

        let (report, pending) = match action {
            Action::Navigate { url, timeout_secs } => {
                (self.navigate(url, *timeout_secs).await, None)
            }
            Action::Type { target_id, text } => (
                self.type_text(&locator(*target_id), text).await,
                Some(PendingAction::EnterText(text.as_str())),
            ),
            Action::Click {
                target_id,
                wait_before_secs,
            } => {
                let selector = locator(*target_id);
                let wait = seconds(*wait_before_secs, self.config.click_wait_secs);
                let report = self.click(&selector, wait).await;
                (report, Some(PendingAction::Click(selector)))
            }
            Action::TypeAndClick {
                text_target_id,
                text,
                click_target_id,
                wait_before_click_secs,
            } => {
                let wait = seconds(*wait_before_click_secs, self.config.type_and_click_wait_secs);
                let click_selector = locator(*click_target_id);
                let report = self
                    .type_and_click(&locator(*text_target_id), text, &click_selector, wait)
                    .await;
                (report, Some(PendingAction::Click(click_selector)))
            }
        };

        let new_elements = if watches_dom && report.success {
            tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
            self.session.take_mutations().await.unwrap_or_else(|e| {
                tracing::debug!(error = %e, "failed to read DOM mutations");
                Vec::new()
            })
        } else {
            Vec::new()
        };
        self.screenshot(kind, "end").await;

        let message = match pending {
            Some(pending) if !new_elements.is_empty() => {
                pending.dom_changed_message(&report, &new_elements)
            }
            _ => report.detail.clone(),
        };

        let audit = serde_json::json!({
            "event": "action_audit",
            "action": kind,
            "ok": report.success,
            "dom_changed": !new_elements.is_empty(),
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit.to_string(), "action");

        ActionOutcome {
            kind,
            success: report.success,
            message,
            new_elements,
        }
    }

    async fn navigate(&self, url: &str, timeout_secs: Option<f64>) -> StepReport {
        let url = ensure_protocol(url);
        let floor = Duration::from_secs(self.config.navigate_floor_secs);
        let timeout = seconds(timeout_secs, 0.0).max(floor);
        let retries = self.config.navigate_retries.max(1);

        for attempt in 1..=retries {
            let loaded = match self.session.navigate(&url, timeout).await {
                Ok(()) => self.session.wait_for_network_idle(timeout).await,
                Err(e) => Err(e),
            };
            match loaded {
                Ok(()) => {
                    let final_url = self.session.current_url().await.unwrap_or_else(|_| url.clone());
                    let title = self.session.title().await.unwrap_or_default();
                    tracing::info!(url = %final_url, "page loaded");
                    let msg = format!("Page loaded: {}, Title: {}", final_url.trim(), title);
                    return StepReport::ok(msg.clone(), msg);
                }
                Err(e) if e.is_timeout() => {
                    tracing::warn!(url = %url, attempt, error = %e, "navigation timed out");
                    if attempt < retries {
                        tokio::time::sleep(Duration::from_millis(self.config.navigate_backoff_ms)).await;
                    }
                }
                Err(e) => {
                    tracing::error!(url = %url, error = %e, "navigation failed");
                    return StepReport::failed(format!("Failed to load page: {}. Error: {}", url, e));
                }
            }
        }
        tracing::error!(url = %url, retries, "navigation retries exhausted");
        StepReport::failed(format!(
            "Failed to load page: {}. Error: Timeout after {} attempts",
            url, retries
        ))
    }

    async fn type_text(&self, selector: &str, text: &str) -> StepReport {
        let timeout = Duration::from_millis(self.config.selector_timeout_ms);
        let element = match self.session.wait_for_selector(selector, timeout).await {
            Ok(element) => element,
            Err(BrowserError::NotFound(_)) | Err(BrowserError::Timeout(_)) => {
                return StepReport::failed(format!(
                    "Error: Selector {} not found. Unable to continue.",
                    selector
                ));
            }
            Err(e) => {
                return StepReport::failed(format!(
                    "Error entering text in selector {}. Error: {}",
                    selector, e
                ));
            }
        };
        let typed = match self.session.clear_value(selector).await {
            Ok(()) => self.session.set_value(selector, text).await,
            Err(e) => Err(e),
        };
        match typed {
            Ok(()) => {
                tracing::info!(selector, "text entered");
                let msg = format!(
                    "Success. Text \"{}\" set successfully in the element with selector {}",
                    text, selector
                );
                StepReport::ok(
                    msg.clone(),
                    format!("{} and outer HTML: {}.", msg, element.outer_html),
                )
            }
            Err(e) => StepReport::failed(format!(
                "Error entering text in selector {}. Error: {}",
                selector, e
            )),
        }
    }

    async fn click(&self, selector: &str, wait: Duration) -> StepReport {
        tokio::time::sleep(wait).await;
        let invalid = |e: &dyn std::fmt::Display| {
            StepReport::failed(format!(
                "Unable to click element with selector: \"{}\" since the selector is invalid. Error: {}",
                selector, e
            ))
        };

        let timeout = Duration::from_millis(self.config.selector_timeout_ms);
        let element = match self.session.wait_for_selector(selector, timeout).await {
            Ok(element) => element,
            Err(e) => return invalid(&e),
        };
        if let Err(e) = self.session.scroll_into_view(selector).await {
            tracing::debug!(selector, error = %e, "scroll into view failed");
        }

        if element.tag == "option" {
            return match self.session.select_option(selector).await {
                Ok(value) => {
                    let msg = format!("Select menu option \"{}\" selected", value);
                    StepReport::ok(msg.clone(), format!("{}.", msg))
                }
                Err(e) => invalid(&e),
            };
        }

        let from_url = self.session.current_url().await.unwrap_or_default();
        let report = match self.session.click(selector).await {
            Ok(report) => report,
            Err(e) => return invalid(&e),
        };
        let mut summary = report.message;
        if report.expanded_menu {
            summary.push_str(". Very important: As a consequence a menu has appeared where you may need to make further selection. Very important: Get all_fields DOM to complete the action");
        }

        let nav_timeout = Duration::from_secs(self.config.click_navigation_timeout_secs);
        let navigated = self
            .session
            .wait_for_navigation(&from_url, nav_timeout)
            .await
            .unwrap_or_else(|e| {
                tracing::debug!(selector, error = %e, "navigation check failed");
                false
            });
        let detail = if navigated {
            let url = self.session.current_url().await.unwrap_or_default();
            format!("{}. Click action completed, page navigated to {}.", summary, url)
        } else {
            format!(
                "{}. Click action completed, no full page navigation detected.",
                summary
            )
        };
        tracing::info!(selector, navigated, "element clicked");
        StepReport::ok(summary, detail)
    }

    async fn type_and_click(
        &self,
        text_selector: &str,
        text: &str,
        click_selector: &str,
        wait: Duration,
    ) -> StepReport {
        let typed = self.type_text(text_selector, text).await;
        if !typed.success {
            return StepReport::failed(format!(
                "Failed to enter text '{}' into element with selector '{}'. Check that the selector is valid.",
                text, text_selector
            ));
        }

        if text_selector == click_selector {
            let detail = match self.session.press_key("Enter").await {
                Ok(()) => format!(
                    "{} Instead of click, pressed the Enter key successfully on element: \"{}\".",
                    typed.detail, click_selector
                ),
                Err(e) => {
                    tracing::warn!(selector = click_selector, error = %e, "press Enter failed");
                    format!(
                        "{} Clicking the same element after entering text in it, is of no value. Tried pressing the Enter key on element \"{}\" instead of click and failed.",
                        typed.detail, click_selector
                    )
                }
            };
            return StepReport::ok(typed.summary, detail);
        }

        let clicked = self.click(click_selector, wait).await;
        StepReport {
            success: clicked.success,
            summary: format!("{} {}", typed.summary, clicked.summary),
            detail: format!("{} {}", typed.detail, clicked.detail),
        }
    }

    /// 截图失败只记录日志
    async fn screenshot(&self, kind: &str, stage: &str) {
        let Some(dir) = self.screenshots_dir.as_ref() else {
            return;
        };
        let png = match self.session.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                tracing::warn!(error = %e, "screenshot failed");
                return;
            }
        };
        let seq = self.screenshot_seq.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("{:04}_{}_{}.png", seq, kind, stage));
        let written = match tokio::fs::create_dir_all(dir).await {
            Ok(()) => tokio::fs::write(&path, png).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::warn!(path = %path.display(), error = %e, "failed to save screenshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::MockBrowser;

    fn executor(browser: &Arc<MockBrowser>) -> ActionExecutor {
        ActionExecutor::new(browser.clone(), ExecutorConfig::default())
    }

    #[test]
    fn test_ensure_protocol() {
        assert_eq!(ensure_protocol("example.com"), "https://example.com");
        assert_eq!(ensure_protocol("http://example.com"), "http://example.com");
        assert_eq!(ensure_protocol("https://a.b/c"), "https://a.b/c");
    }

    #[test]
    fn test_seconds_sanitizes() {
        assert_eq!(seconds(None, 1.5), Duration::from_millis(1500));
        assert_eq!(seconds(Some(-3.0), 1.0), Duration::ZERO);
        assert_eq!(seconds(Some(f64::NAN), 1.0), Duration::ZERO);
        assert_eq!(seconds(Some(1e12), 1.0), Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_applies_floor_and_protocol() {
        let browser = Arc::new(
            MockBrowser::default().with_page("https://example.com", "Example Domain", ""),
        );
        let outcome = executor(&browser)
            .execute(&Action::Navigate {
                url: "example.com".into(),
                timeout_secs: Some(2.0),
            })
            .await;
        assert!(outcome.success);
        assert_eq!(
            outcome.message,
            "Page loaded: https://example.com, Title: Example Domain"
        );
        assert_eq!(browser.op_names(), vec!["navigate https://example.com 30s"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_to_current_url_succeeds() {
        let browser = Arc::new(MockBrowser::new("https://example.com"));
        let outcome = executor(&browser)
            .execute(&Action::Navigate {
                url: "example.com".into(),
                timeout_secs: None,
            })
            .await;
        assert!(outcome.success);
        assert!(outcome.message.starts_with("Page loaded: https://example.com"));
        assert_eq!(browser.op_names(), vec!["navigate https://example.com 30s"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_retries_with_backoff() {
        let browser = Arc::new(MockBrowser::default().fail_navigations(2));
        let start = tokio::time::Instant::now();
        let outcome = executor(&browser)
            .execute(&Action::Navigate {
                url: "https://slow.example".into(),
                timeout_secs: Some(45.0),
            })
            .await;
        assert!(outcome.success);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
        let ops = browser.op_names();
        assert_eq!(ops.len(), 3);
        assert!(ops.iter().all(|op| op == "navigate https://slow.example 45s"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_gives_up_after_retries() {
        let browser = Arc::new(MockBrowser::default().fail_navigations(5));
        let outcome = executor(&browser)
            .execute(&Action::Navigate {
                url: "down.example".into(),
                timeout_secs: None,
            })
            .await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.message,
            "Failed to load page: https://down.example. Error: Timeout after 3 attempts"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_other_error_is_not_retried() {
        let browser = Arc::new(
            MockBrowser::default().navigation_error(BrowserError::Driver("net::ERR_NAME".into())),
        );
        let outcome = executor(&browser)
            .execute(&Action::Navigate {
                url: "bad.example".into(),
                timeout_secs: None,
            })
            .await;
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Failed to load page: https://bad.example. Error: "));
        assert_eq!(browser.op_names().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_sets_value() {
        let browser = Arc::new(MockBrowser::default().with_element(
            "[mmid='7']",
            "input",
            "<input name=\"q\">",
        ));
        let outcome = executor(&browser)
            .execute(&Action::Type {
                target_id: 7,
                text: "rust".into(),
            })
            .await;
        assert!(outcome.success);
        assert_eq!(
            outcome.message,
            "Success. Text \"rust\" set successfully in the element with selector [mmid='7'] and outer HTML: <input name=\"q\">."
        );
        assert_eq!(browser.value_of("[mmid='7']").as_deref(), Some("rust"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_reports_new_elements() {
        let browser = Arc::new(
            MockBrowser::default()
                .with_element("[mmid='7']", "input", "<input name=\"q\">")
                .mutate_on_type("[mmid='7']", &["li: rust book", "li: rust lang"]),
        );
        let outcome = executor(&browser)
            .execute(&Action::Type {
                target_id: 7,
                text: "rust".into(),
            })
            .await;
        assert!(outcome.success);
        assert!(outcome.dom_changed());
        assert_eq!(
            outcome.message,
            "Success. Text \"rust\" set successfully in the element with selector [mmid='7'] and outer HTML: <input name=\"q\">.\n As a consequence of this action, new elements have appeared in view: li: rust book, li: rust lang. This means that the action of entering text rust is not yet executed and needs further interaction. Get all_fields DOM to complete the interaction."
        );
        assert!(!outcome.message.contains("action to click"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_missing_selector() {
        let browser = Arc::new(MockBrowser::default());
        let outcome = executor(&browser)
            .execute(&Action::Type {
                target_id: 3,
                text: "x".into(),
            })
            .await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.message,
            "Error: Selector [mmid='3'] not found. Unable to continue."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_waits_default_delay() {
        let browser = Arc::new(MockBrowser::default().with_element("[mmid='1']", "button", "<button>Go</button>"));
        let start = tokio::time::Instant::now();
        let outcome = executor(&browser)
            .execute(&Action::Click {
                target_id: 1,
                wait_before_secs: None,
            })
            .await;
        assert!(outcome.success);
        assert!(outcome.message.contains("no full page navigation detected"));
        let click = browser
            .ops()
            .into_iter()
            .find(|op| op.op == "click [mmid='1']")
            .unwrap();
        assert_eq!(click.at - start, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_missing_element_reports_failure() {
        let browser = Arc::new(MockBrowser::default());
        let outcome = executor(&browser)
            .execute(&Action::Click {
                target_id: 99,
                wait_before_secs: Some(0.0),
            })
            .await;
        assert!(!outcome.success);
        assert!(outcome.message.starts_with(
            "Unable to click element with selector: \"[mmid='99']\" since the selector is invalid."
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_option_selects_value() {
        let browser = Arc::new(MockBrowser::default().with_option("[mmid='4']", "EUR"));
        let outcome = executor(&browser)
            .execute(&Action::Click {
                target_id: 4,
                wait_before_secs: Some(0.0),
            })
            .await;
        assert_eq!(outcome.message, "Select menu option \"EUR\" selected.");
        assert!(!browser.op_names().iter().any(|op| op.starts_with("click")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_navigation_and_menu() {
        let browser = Arc::new(
            MockBrowser::default()
                .with_element("[mmid='2']", "a", "<a href=\"/next\">Next</a>")
                .navigate_on_click("[mmid='2']", "https://example.com/next")
                .with_element("[mmid='5']", "button", "<button aria-expanded=\"false\">Menu</button>")
                .expands_on_click("[mmid='5']"),
        );
        let exec = executor(&browser);
        let nav = exec
            .execute(&Action::Click {
                target_id: 2,
                wait_before_secs: Some(0.0),
            })
            .await;
        assert!(nav.message.contains("page navigated to https://example.com/next"));

        let menu = exec
            .execute(&Action::Click {
                target_id: 5,
                wait_before_secs: Some(0.0),
            })
            .await;
        assert!(menu.message.contains("a menu has appeared"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_reports_new_elements() {
        let browser = Arc::new(
            MockBrowser::default()
                .with_element("[mmid='8']", "button", "<button>More</button>")
                .mutate_on_click("[mmid='8']", &["li: Option A", "li: Option B"]),
        );
        let outcome = executor(&browser)
            .execute(&Action::Click {
                target_id: 8,
                wait_before_secs: Some(0.0),
            })
            .await;
        assert!(outcome.dom_changed());
        assert!(outcome.message.starts_with("Success: Executed JavaScript Click"));
        assert!(outcome
            .message
            .contains("new elements have appeared in view: li: Option A, li: Option B"));
        assert!(outcome.message.ends_with("Get all_fields DOM to complete the interaction."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_and_click_waits_before_click() {
        let browser = Arc::new(
            MockBrowser::default()
                .with_element("[mmid='1']", "input", "<input>")
                .with_element("[mmid='2']", "button", "<button>Search</button>"),
        );
        let start = tokio::time::Instant::now();
        let outcome = executor(&browser)
            .execute(&Action::TypeAndClick {
                text_target_id: 1,
                text: "weather".into(),
                click_target_id: 2,
                wait_before_click_secs: None,
            })
            .await;
        assert!(outcome.success);
        assert!(outcome.message.contains("Text \"weather\" set successfully"));
        assert!(outcome.message.contains("Executed JavaScript Click"));
        let ops = browser.ops();
        let typed = ops.iter().find(|op| op.op.starts_with("type ")).unwrap();
        let clicked = ops.iter().find(|op| op.op.starts_with("click ")).unwrap();
        assert_eq!(typed.at, start);
        assert_eq!(clicked.at - start, Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_and_click_same_target_presses_enter() {
        let browser = Arc::new(MockBrowser::default().with_element("[mmid='1']", "input", "<input>"));
        let outcome = executor(&browser)
            .execute(&Action::TypeAndClick {
                text_target_id: 1,
                text: "q".into(),
                click_target_id: 1,
                wait_before_click_secs: None,
            })
            .await;
        assert!(outcome.message.contains("pressed the Enter key successfully"));
        let ops = browser.op_names();
        assert!(ops.contains(&"press Enter".to_string()));
        assert!(!ops.iter().any(|op| op.starts_with("click")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_and_click_typing_failure() {
        let browser = Arc::new(MockBrowser::default());
        let outcome = executor(&browser)
            .execute(&Action::TypeAndClick {
                text_target_id: 1,
                text: "q".into(),
                click_target_id: 2,
                wait_before_click_secs: None,
            })
            .await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.message,
            "Failed to enter text 'q' into element with selector '[mmid='1']'. Check that the selector is valid."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_all_preserves_order() {
        let browser = Arc::new(
            MockBrowser::default()
                .with_element("[mmid='1']", "input", "<input>")
                .with_element("[mmid='2']", "button", "<button>Go</button>"),
        );
        let actions = vec![
            Action::Navigate {
                url: "example.com".into(),
                timeout_secs: None,
            },
            Action::Type {
                target_id: 1,
                text: "a".into(),
            },
            Action::Click {
                target_id: 2,
                wait_before_secs: Some(0.0),
            },
        ];
        let outcomes = executor(&browser).execute_all(&actions).await;
        let kinds: Vec<_> = outcomes.iter().map(|o| o.kind).collect();
        assert_eq!(kinds, vec!["navigate", "type", "click"]);
        let ops: Vec<String> = browser
            .op_names()
            .into_iter()
            .filter(|op| !op.starts_with("wait_for_selector") && !op.starts_with("clear"))
            .collect();
        assert_eq!(
            ops,
            vec![
                "navigate https://example.com 30s",
                "type [mmid='1'] a",
                "click [mmid='2']",
            ]
        );
    }

    #[tokio::test]
    async fn test_screenshots_written() {
        let dir = tempfile::tempdir().unwrap();
        let browser = Arc::new(MockBrowser::default().with_element("[mmid='1']", "input", "<input>"));
        let exec = executor(&browser).with_screenshots(dir.path().join("shots"));
        exec.execute(&Action::Type {
            target_id: 1,
            text: "x".into(),
        })
        .await;
        let mut names: Vec<String> = std::fs::read_dir(dir.path().join("shots"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["0000_type_start.png", "0001_type_end.png"]);
    }
}
