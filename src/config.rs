//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `WEBPILOT__*` 覆盖（双下划线表示嵌套，如 `WEBPILOT__LLM__PROVIDER=groq`）。

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::tools::ExecutorConfig;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub browser: BrowserSection,
    pub executor: ExecutorConfig,
}

/// [app] 段：任务说明文件、轮数上限、对话历史策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    pub task_instructions_path: PathBuf,
    /// 最大轮数；未设置时不限
    pub max_rounds: Option<usize>,
    /// 是否跨轮保留对话（默认每轮只发送 system + 本轮输入）
    pub keep_message_history: bool,
    /// 保留对话时的轮数上限
    pub max_context_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            task_instructions_path: PathBuf::from("config/task_instructions.txt"),
            max_rounds: None,
            keep_message_history: false,
            max_context_turns: 20,
        }
    }
}

/// [llm] 段：后端、模型、重试与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// openai / together / openrouter / groq / anthropic / deepseek / ollama / custom
    pub provider: String,
    pub model: String,
    /// custom 后端必填
    pub base_url: Option<String>,
    /// 单次规划最多调用模型的次数（含校验失败重试）
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub request_timeout_secs: u64,
    /// 请求 JSON 对象输出；后端不支持 response_format 时设为 false
    pub json_mode: bool,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: crate::llm::providers::DEFAULT_PROVIDER.to_string(),
            model: "gpt-4o-2024-08-06".to_string(),
            base_url: None,
            max_retries: 3,
            retry_backoff_ms: 500,
            request_timeout_secs: 60,
            json_mode: true,
        }
    }
}

/// [browser] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    pub headless: bool,
    /// 浏览器启动后打开的页面
    pub homepage: Option<String>,
    pub user_data_dir: Option<PathBuf>,
    /// DOM 快照最大字符数
    pub dom_max_chars: usize,
    /// 设置后每个动作前后各保存一张截图
    pub screenshots_dir: Option<PathBuf>,
    /// 浏览器空闲多久后由驱动关闭
    pub idle_timeout_secs: u64,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            headless: false,
            homepage: Some("https://google.com".to_string()),
            user_data_dir: None,
            dom_max_chars: 20_000,
            screenshots_dir: None,
            idle_timeout_secs: 600,
        }
    }
}

/// 从 config 目录加载配置，环境变量 WEBPILOT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 WEBPILOT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!(path = %path.display(), "config file not found, ignoring");
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("WEBPILOT")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
