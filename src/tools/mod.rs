//! 浏览器工具层：会话抽象、注入脚本、动作执行器
//!
//! 启用 feature "browser" 时提供基于 headless_chrome 的 ChromeSession；
//! MockBrowser 始终可用，供测试与离线演示。

pub mod browser;
pub mod dom;
pub mod executor;
pub mod mock_browser;

#[cfg(feature = "browser")]
pub mod chrome;

pub use browser::{BrowserError, BrowserSession, ClickReport, DomMode, ElementInfo};
pub use executor::{ensure_protocol, ActionExecutor, ActionOutcome, ExecutorConfig};
pub use mock_browser::{BrowserOp, MockBrowser};

#[cfg(feature = "browser")]
pub use chrome::ChromeSession;
