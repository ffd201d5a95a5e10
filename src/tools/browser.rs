//! 浏览器会话抽象
//!
//! 控制循环与动作执行器只通过 BrowserSession 操作浏览器：读 URL / DOM 快照、打开页面、
//! 按选择器定位元素、点击、输入、选择下拉项、截图。一次运行只使用一个会话（一个活动标签页），
//! 调用方不得并发操作同一会话。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 浏览器操作错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrowserError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("element not found: {0}")]
    NotFound(String),

    #[error("script failed: {0}")]
    Script(String),

    #[error("browser driver error: {0}")]
    Driver(String),

    #[error("browser session closed")]
    Closed,
}

impl BrowserError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BrowserError::Timeout(_))
    }
}

/// DOM 快照内容模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomMode {
    /// 全部可交互元素（带 mmid）及文本叶子节点
    AllFields,
    /// 仅输入框、下拉框与按钮
    InputFields,
    /// 仅页面文本
    TextOnly,
}

impl DomMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomMode::AllFields => "all_fields",
            DomMode::InputFields => "input_fields",
            DomMode::TextOnly => "text_only",
        }
    }
}

/// 定位到的元素概要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// 小写标签名
    pub tag: String,
    pub outer_html: String,
    pub value: Option<String>,
}

/// 点击结果：脚本返回的描述，以及是否展开了菜单（aria-expanded false -> true）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickReport {
    pub message: String,
    pub expanded_menu: bool,
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn current_url(&self) -> Result<String, BrowserError>;

    async fn title(&self) -> Result<String, BrowserError>;

    async fn dom_snapshot(&self, mode: DomMode) -> Result<String, BrowserError>;

    /// 打开 URL 并等待 DOMContentLoaded；超时返回 BrowserError::Timeout
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// 等待页面加载稳定后再读取 URL 与标题
    ///
    /// 近似实现：实现方可只轮询 `document.readyState == "complete"`，
    /// 不保证页面之后没有异步请求。
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), BrowserError>;

    /// 等待选择器对应元素出现在 DOM 中
    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementInfo, BrowserError>;

    async fn scroll_into_view(&self, selector: &str) -> Result<(), BrowserError>;

    async fn clear_value(&self, selector: &str) -> Result<(), BrowserError>;

    /// 聚焦元素并键入文本
    async fn set_value(&self, selector: &str, text: &str) -> Result<(), BrowserError>;

    async fn click(&self, selector: &str) -> Result<ClickReport, BrowserError>;

    /// 选中 option 元素（设置其父 select 的值），返回选中的 value
    async fn select_option(&self, option_selector: &str) -> Result<String, BrowserError>;

    async fn press_key(&self, key: &str) -> Result<(), BrowserError>;

    /// 等待页面离开 from_url；超时内未发生导航返回 Ok(false)
    async fn wait_for_navigation(
        &self,
        from_url: &str,
        timeout: Duration,
    ) -> Result<bool, BrowserError>;

    /// 开始记录 DOM 新增元素（清空已记录内容）
    async fn watch_mutations(&self) -> Result<(), BrowserError>;

    /// 取出自 watch_mutations 以来新出现的元素描述
    async fn take_mutations(&self) -> Result<Vec<String>, BrowserError>;

    /// PNG 截图
    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}
