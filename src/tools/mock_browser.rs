//! 内存中的 BrowserSession，用于测试与无浏览器环境演示
//!
//! 预置元素（选择器 -> ElementInfo）、页面（URL -> 标题/DOM）以及脚本化行为：
//! 导航超时若干次、点击触发跳转、点击后出现新元素。所有调用按顺序记入操作日志（带 tokio 时间戳）。

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::tools::{BrowserError, BrowserSession, ClickReport, DomMode, ElementInfo};

/// 操作日志中的一条记录
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserOp {
    pub at: Instant,
    pub op: String,
}

#[derive(Debug, Clone)]
struct Page {
    title: String,
    dom: String,
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    pages: HashMap<String, Page>,
    elements: HashMap<String, ElementInfo>,
    navigate_timeouts: u32,
    navigate_error: Option<BrowserError>,
    click_targets: HashMap<String, String>,
    expanding: HashSet<String>,
    mutations_on_click: HashMap<String, Vec<String>>,
    mutations_on_type: HashMap<String, Vec<String>>,
    pending_mutations: Vec<String>,
    ops: Vec<BrowserOp>,
    closed: bool,
}

impl MockState {
    fn log(&mut self, op: String) {
        self.ops.push(BrowserOp {
            at: Instant::now(),
            op,
        });
    }

    fn check_open(&self) -> Result<(), BrowserError> {
        if self.closed {
            Err(BrowserError::Closed)
        } else {
            Ok(())
        }
    }

    fn element(&self, selector: &str) -> Result<ElementInfo, BrowserError> {
        self.elements
            .get(selector)
            .cloned()
            .ok_or_else(|| BrowserError::NotFound(selector.to_string()))
    }
}

pub struct MockBrowser {
    state: Mutex<MockState>,
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

impl MockBrowser {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let mut state = MockState::default();
        state.pages.insert(
            url.clone(),
            Page {
                title: String::new(),
                dom: String::new(),
            },
        );
        state.url = url;
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        // 测试辅助：锁中毒说明前一个断言已 panic
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// 注册页面（导航到该 URL 后返回对应标题与 DOM）
    pub fn with_page(self, url: &str, title: &str, dom: &str) -> Self {
        self.state().pages.insert(
            url.to_string(),
            Page {
                title: title.to_string(),
                dom: dom.to_string(),
            },
        );
        self
    }

    /// 注册元素，tag 为小写标签名
    pub fn with_element(self, selector: &str, tag: &str, outer_html: &str) -> Self {
        self.state().elements.insert(
            selector.to_string(),
            ElementInfo {
                tag: tag.to_string(),
                outer_html: outer_html.to_string(),
                value: None,
            },
        );
        self
    }

    /// 注册 option 元素及其 value
    pub fn with_option(self, selector: &str, value: &str) -> Self {
        self.state().elements.insert(
            selector.to_string(),
            ElementInfo {
                tag: "option".to_string(),
                outer_html: format!("<option value=\"{}\">{}</option>", value, value),
                value: Some(value.to_string()),
            },
        );
        self
    }

    /// 接下来 n 次导航均超时
    pub fn fail_navigations(self, n: u32) -> Self {
        self.state().navigate_timeouts = n;
        self
    }

    /// 导航返回非超时错误
    pub fn navigation_error(self, error: BrowserError) -> Self {
        self.state().navigate_error = Some(error);
        self
    }

    /// 点击 selector 后页面跳转到 url
    pub fn navigate_on_click(self, selector: &str, url: &str) -> Self {
        self.state()
            .click_targets
            .insert(selector.to_string(), url.to_string());
        self
    }

    /// 点击 selector 会展开菜单（aria-expanded false -> true）
    pub fn expands_on_click(self, selector: &str) -> Self {
        self.state().expanding.insert(selector.to_string());
        self
    }

    /// 点击 selector 后出现新元素
    pub fn mutate_on_click(self, selector: &str, added: &[&str]) -> Self {
        self.state().mutations_on_click.insert(
            selector.to_string(),
            added.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// 向 selector 输入文本后出现新元素（如自动补全列表）
    pub fn mutate_on_type(self, selector: &str, added: &[&str]) -> Self {
        self.state().mutations_on_type.insert(
            selector.to_string(),
            added.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// 操作日志副本
    pub fn ops(&self) -> Vec<BrowserOp> {
        self.state().ops.clone()
    }

    /// 仅操作名（不含时间）
    pub fn op_names(&self) -> Vec<String> {
        self.state().ops.iter().map(|o| o.op.clone()).collect()
    }

    /// 元素当前的输入值
    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.state().elements.get(selector).and_then(|e| e.value.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

#[async_trait]
impl BrowserSession for MockBrowser {
    async fn current_url(&self) -> Result<String, BrowserError> {
        let state = self.state();
        state.check_open()?;
        Ok(state.url.clone())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        let state = self.state();
        state.check_open()?;
        Ok(state
            .pages
            .get(&state.url)
            .map(|p| p.title.clone())
            .unwrap_or_default())
    }

    async fn dom_snapshot(&self, mode: DomMode) -> Result<String, BrowserError> {
        let mut state = self.state();
        state.check_open()?;
        state.log(format!("dom {}", mode.as_str()));
        Ok(state
            .pages
            .get(&state.url)
            .map(|p| p.dom.clone())
            .unwrap_or_default())
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let mut state = self.state();
        state.check_open()?;
        state.log(format!("navigate {} {}s", url, timeout.as_secs()));
        if state.navigate_timeouts > 0 {
            state.navigate_timeouts -= 1;
            return Err(BrowserError::Timeout(format!("navigation to {}", url)));
        }
        if let Some(e) = state.navigate_error.clone() {
            return Err(e);
        }
        state.url = url.to_string();
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<(), BrowserError> {
        self.state().check_open()
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<ElementInfo, BrowserError> {
        let mut state = self.state();
        state.check_open()?;
        state.log(format!("wait_for_selector {}", selector));
        state.element(selector)
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<(), BrowserError> {
        let state = self.state();
        state.check_open()?;
        state.element(selector).map(|_| ())
    }

    async fn clear_value(&self, selector: &str) -> Result<(), BrowserError> {
        let mut state = self.state();
        state.check_open()?;
        state.log(format!("clear {}", selector));
        let el = state
            .elements
            .get_mut(selector)
            .ok_or_else(|| BrowserError::NotFound(selector.to_string()))?;
        el.value = Some(String::new());
        Ok(())
    }

    async fn set_value(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let mut state = self.state();
        state.check_open()?;
        state.log(format!("type {} {}", selector, text));
        let el = state
            .elements
            .get_mut(selector)
            .ok_or_else(|| BrowserError::NotFound(selector.to_string()))?;
        el.value = Some(text.to_string());
        if let Some(added) = state.mutations_on_type.get(selector).cloned() {
            state.pending_mutations.extend(added);
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<ClickReport, BrowserError> {
        let mut state = self.state();
        state.check_open()?;
        state.log(format!("click {}", selector));
        state.element(selector)?;
        if let Some(url) = state.click_targets.get(selector).cloned() {
            state.url = url;
        }
        if let Some(added) = state.mutations_on_click.get(selector).cloned() {
            state.pending_mutations.extend(added);
        }
        Ok(ClickReport {
            message: format!("Executed JavaScript Click on element with selector: {}", selector),
            expanded_menu: state.expanding.contains(selector),
        })
    }

    async fn select_option(&self, option_selector: &str) -> Result<String, BrowserError> {
        let mut state = self.state();
        state.check_open()?;
        state.log(format!("select {}", option_selector));
        state
            .element(option_selector)?
            .value
            .ok_or_else(|| BrowserError::NotFound(option_selector.to_string()))
    }

    async fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        let mut state = self.state();
        state.check_open()?;
        state.log(format!("press {}", key));
        Ok(())
    }

    async fn wait_for_navigation(
        &self,
        from_url: &str,
        _timeout: Duration,
    ) -> Result<bool, BrowserError> {
        let state = self.state();
        state.check_open()?;
        Ok(state.url != from_url)
    }

    async fn watch_mutations(&self) -> Result<(), BrowserError> {
        let mut state = self.state();
        state.check_open()?;
        state.pending_mutations.clear();
        Ok(())
    }

    async fn take_mutations(&self) -> Result<Vec<String>, BrowserError> {
        let mut state = self.state();
        state.check_open()?;
        Ok(std::mem::take(&mut state.pending_mutations))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        let mut state = self.state();
        state.check_open()?;
        state.log("screenshot".to_string());
        Ok(b"\x89PNG".to_vec())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let mut state = self.state();
        state.log("close".to_string());
        state.closed = true;
        Ok(())
    }
}
