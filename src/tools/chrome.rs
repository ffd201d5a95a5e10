//! Headless Chrome 浏览器会话
//!
//! 需启用 feature "browser" 且系统已安装 Chrome/Chromium。浏览器在第一次使用时才启动并打开主页，
//! 之后整个运行复用同一个标签页；headless_chrome 是同步 API，所有操作放到 spawn_blocking 中执行。

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;

use crate::config::BrowserSection;
use crate::tools::dom;
use crate::tools::{BrowserError, BrowserSession, ClickReport, DomMode, ElementInfo};

/// 标签页默认等待超时
const DEFAULT_TAB_TIMEOUT: Duration = Duration::from_secs(20);
/// 轮询间隔（页面状态、导航）
const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct ChromeInner {
    // 持有 Browser 才能保证 Chrome 进程存活
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeInner {
    fn launch(options: &BrowserSection) -> Result<Self, BrowserError> {
        let launch = LaunchOptions {
            headless: options.headless,
            user_data_dir: options.user_data_dir.clone(),
            idle_browser_timeout: Duration::from_secs(options.idle_timeout_secs),
            window_size: Some((1280, 900)),
            ..Default::default()
        };
        tracing::info!(headless = options.headless, "launching Chrome");
        let browser = Browser::new(launch).map_err(|e| driver(format!("Chrome launch failed: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| driver(format!("Browser tab failed: {}", e)))?;
        tab.set_default_timeout(DEFAULT_TAB_TIMEOUT);
        if let Some(homepage) = options.homepage.as_deref() {
            if let Err(e) = tab.navigate_to(homepage).and_then(|t| t.wait_until_navigated()) {
                tracing::warn!(homepage, error = %e, "failed to open homepage");
            }
        }
        tracing::info!("Chrome ready");
        Ok(Self {
            _browser: browser,
            tab,
        })
    }
}

fn driver(msg: impl Into<String>) -> BrowserError {
    BrowserError::Driver(msg.into())
}

/// 将 headless_chrome 的错误映射为 BrowserError（区分超时）
fn map_err(context: &str, e: impl std::fmt::Display) -> BrowserError {
    let msg = format!("{}: {}", context, e);
    let lower = msg.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        BrowserError::Timeout(msg)
    } else {
        BrowserError::Driver(msg)
    }
}

fn eval(tab: &Tab, js: &str) -> Result<Value, BrowserError> {
    let result = tab
        .evaluate(js, false)
        .map_err(|e| BrowserError::Script(e.to_string()))?;
    Ok(result.value.unwrap_or(Value::Null))
}

fn eval_string(tab: &Tab, js: &str) -> Result<Option<String>, BrowserError> {
    Ok(eval(tab, js)?.as_str().map(String::from))
}

fn require_true(value: Value, selector: &str) -> Result<(), BrowserError> {
    if value.as_bool() == Some(true) {
        Ok(())
    } else {
        Err(BrowserError::NotFound(selector.to_string()))
    }
}

/// 基于 headless_chrome 的 BrowserSession，首次调用时懒启动
pub struct ChromeSession {
    options: BrowserSection,
    inner: Arc<Mutex<Option<ChromeInner>>>,
}

impl ChromeSession {
    pub fn new(options: BrowserSection) -> Self {
        Self {
            options,
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// 在阻塞线程中对活动标签页执行 f；必要时先启动浏览器
    async fn with_tab<T, F>(&self, f: F) -> Result<T, BrowserError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T, BrowserError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || {
            let tab = {
                let mut guard = inner.lock().map_err(|e| driver(e.to_string()))?;
                if guard.is_none() {
                    *guard = Some(ChromeInner::launch(&options)?);
                }
                guard
                    .as_ref()
                    .map(|i| Arc::clone(&i.tab))
                    .ok_or(BrowserError::Closed)?
            };
            f(&tab)
        })
        .await
        .map_err(|e| driver(format!("Task join: {}", e)))?
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn current_url(&self) -> Result<String, BrowserError> {
        self.with_tab(|tab| Ok(tab.get_url())).await
    }

    async fn title(&self) -> Result<String, BrowserError> {
        self.with_tab(|tab| tab.get_title().map_err(|e| map_err("Get title failed", e)))
            .await
    }

    async fn dom_snapshot(&self, mode: DomMode) -> Result<String, BrowserError> {
        let max_chars = self.options.dom_max_chars;
        self.with_tab(move |tab| {
            let text = match mode {
                DomMode::TextOnly => {
                    let html = tab
                        .get_content()
                        .map_err(|e| map_err("Get content failed", e))?;
                    html2text::from_read(html.as_bytes(), 120).unwrap_or(html)
                }
                _ => eval_string(tab, &dom::snapshot_script(mode))?.unwrap_or_default(),
            };
            Ok(dom::truncate(text, max_chars))
        })
        .await
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let url = url.to_string();
        self.with_tab(move |tab| {
            tab.set_default_timeout(timeout);
            let result = tab
                .navigate_to(&url)
                .and_then(|t| t.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| map_err("Navigate failed", e));
            tab.set_default_timeout(DEFAULT_TAB_TIMEOUT);
            result
        })
        .await
    }

    // headless_chrome 没有 networkidle 事件，这里只等 readyState 变为 complete
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), BrowserError> {
        self.with_tab(move |tab| {
            let start = Instant::now();
            loop {
                if eval_string(tab, dom::READY_STATE_JS)?.as_deref() == Some("complete") {
                    return Ok(());
                }
                if start.elapsed() >= timeout {
                    return Err(BrowserError::Timeout(format!(
                        "page not idle after {}ms",
                        timeout.as_millis()
                    )));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        })
        .await
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementInfo, BrowserError> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)
                .map_err(|e| BrowserError::NotFound(format!("{} ({})", selector, e)))?;
            let raw = eval_string(tab, &dom::element_info_script(&selector))?
                .ok_or_else(|| BrowserError::NotFound(selector.clone()))?;
            serde_json::from_str(&raw).map_err(|e| BrowserError::Script(e.to_string()))
        })
        .await
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<(), BrowserError> {
        let selector = selector.to_string();
        self.with_tab(move |tab| require_true(eval(tab, &dom::scroll_into_view_script(&selector))?, &selector))
            .await
    }

    async fn clear_value(&self, selector: &str) -> Result<(), BrowserError> {
        let selector = selector.to_string();
        self.with_tab(move |tab| require_true(eval(tab, &dom::clear_value_script(&selector))?, &selector))
            .await
    }

    async fn set_value(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let selector = selector.to_string();
        let text = text.to_string();
        self.with_tab(move |tab| {
            require_true(eval(tab, &dom::focus_script(&selector))?, &selector)?;
            tab.type_str(&text)
                .map_err(|e| map_err("Type failed", e))?;
            eval(tab, &dom::dispatch_change_script(&selector))?;
            Ok(())
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<ClickReport, BrowserError> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            let raw = eval_string(tab, &dom::click_script(&selector))?
                .ok_or_else(|| BrowserError::Script("click script returned nothing".to_string()))?;
            let value: Value =
                serde_json::from_str(&raw).map_err(|e| BrowserError::Script(e.to_string()))?;
            if value.get("missing").is_some() {
                return Err(BrowserError::NotFound(selector));
            }
            Ok(ClickReport {
                message: value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("Clicked")
                    .to_string(),
                expanded_menu: value.get("expanded").and_then(|e| e.as_bool()).unwrap_or(false),
            })
        })
        .await
    }

    async fn select_option(&self, option_selector: &str) -> Result<String, BrowserError> {
        let selector = option_selector.to_string();
        self.with_tab(move |tab| {
            eval_string(tab, &dom::select_option_script(&selector))?
                .ok_or(BrowserError::NotFound(selector))
        })
        .await
    }

    async fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        let key = key.to_string();
        self.with_tab(move |tab| {
            tab.press_key(&key)
                .map(|_| ())
                .map_err(|e| map_err("Press key failed", e))
        })
        .await
    }

    async fn wait_for_navigation(
        &self,
        from_url: &str,
        timeout: Duration,
    ) -> Result<bool, BrowserError> {
        let from_url = from_url.to_string();
        self.with_tab(move |tab| {
            let start = Instant::now();
            while start.elapsed() < timeout {
                if tab.get_url() != from_url {
                    if let Err(e) = tab.wait_until_navigated() {
                        tracing::debug!(error = %e, "navigation did not settle");
                    }
                    return Ok(true);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Ok(false)
        })
        .await
    }

    async fn watch_mutations(&self) -> Result<(), BrowserError> {
        self.with_tab(|tab| eval(tab, dom::WATCH_MUTATIONS_JS).map(|_| ()))
            .await
    }

    async fn take_mutations(&self) -> Result<Vec<String>, BrowserError> {
        self.with_tab(|tab| {
            let raw = eval_string(tab, dom::TAKE_MUTATIONS_JS)?.unwrap_or_else(|| "[]".to_string());
            serde_json::from_str(&raw).map_err(|e| BrowserError::Script(e.to_string()))
        })
        .await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        self.with_tab(|tab| {
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
                .map_err(|e| map_err("Screenshot failed", e))
        })
        .await
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let taken = inner.lock().map_err(|e| driver(e.to_string()))?.take();
            if let Some(chrome) = taken {
                if let Err(e) = chrome.tab.close(true) {
                    tracing::debug!(error = %e, "tab close failed");
                }
                tracing::info!("Chrome closed");
            }
            Ok(())
        })
        .await
        .map_err(|e| driver(format!("Task join: {}", e)))?
    }
}
