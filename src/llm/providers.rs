//! 模型后端选择
//!
//! 每个后端是一个 LlmProvider（名称 + 客户端配置）；托管后端由静态表描述，
//! custom 后端额外携带调用方给出的 OpenAI 兼容端点。

use std::sync::Arc;

use crate::llm::{LlmClient, OpenAiClient};

/// 构造 OpenAI 兼容客户端所需的端点与密钥
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
}

/// 后端能力接口
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    fn client_config(&self) -> ClientConfig;
}

/// 密钥来源：环境变量或固定值（本地服务）
#[derive(Debug, Clone, Copy)]
pub enum ApiKey {
    Env(&'static str),
    Fixed(&'static str),
}

/// 托管或本地的固定端点后端
#[derive(Debug, Clone, Copy)]
pub struct HostedProvider {
    pub name: &'static str,
    pub base_url: &'static str,
    pub api_key: ApiKey,
}

impl LlmProvider for HostedProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn client_config(&self) -> ClientConfig {
        let api_key = match self.api_key {
            ApiKey::Env(var) => std::env::var(var).unwrap_or_else(|_| {
                tracing::warn!(provider = self.name, env = var, "API key not set");
                String::new()
            }),
            ApiKey::Fixed(key) => key.to_string(),
        };
        ClientConfig {
            base_url: self.base_url.to_string(),
            api_key,
        }
    }
}

/// 调用方提供端点的 OpenAI 兼容后端
#[derive(Debug, Clone)]
pub struct CustomProvider {
    pub base_url: String,
}

/// custom 后端读取的密钥环境变量
pub const CUSTOM_API_KEY_ENV: &str = "CUSTOM_API_KEY";

impl LlmProvider for CustomProvider {
    fn name(&self) -> &str {
        "custom"
    }

    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            api_key: std::env::var(CUSTOM_API_KEY_ENV).unwrap_or_else(|_| "custom".to_string()),
        }
    }
}

/// 默认后端
pub const DEFAULT_PROVIDER: &str = "openai";

/// 托管后端查找表（名称小写）
pub const HOSTED_PROVIDERS: &[HostedProvider] = &[
    HostedProvider {
        name: "openai",
        base_url: "https://api.openai.com/v1",
        api_key: ApiKey::Env("OPENAI_API_KEY"),
    },
    HostedProvider {
        name: "together",
        base_url: "https://api.together.xyz/v1",
        api_key: ApiKey::Env("TOGETHER_API_KEY"),
    },
    HostedProvider {
        name: "openrouter",
        base_url: "https://openrouter.ai/api/v1",
        api_key: ApiKey::Env("OPENROUTER_API_KEY"),
    },
    HostedProvider {
        name: "groq",
        base_url: "https://api.groq.com/openai/v1",
        api_key: ApiKey::Env("GROQ_API_KEY"),
    },
    HostedProvider {
        name: "anthropic",
        base_url: "https://api.anthropic.com/v1",
        api_key: ApiKey::Env("ANTHROPIC_API_KEY"),
    },
    HostedProvider {
        name: "deepseek",
        base_url: "https://api.deepseek.com",
        api_key: ApiKey::Env("DEEPSEEK_API_KEY"),
    },
    HostedProvider {
        name: "ollama",
        base_url: "http://localhost:11434/v1/",
        api_key: ApiKey::Fixed("ollama"),
    },
];

/// 支持的后端名称（含 custom）
pub fn supported_providers() -> Vec<&'static str> {
    HOSTED_PROVIDERS
        .iter()
        .map(|p| p.name)
        .chain(std::iter::once("custom"))
        .collect()
}

/// 按名称查找后端；custom 必须提供 base_url
pub fn get_provider(name: &str, custom_base_url: Option<&str>) -> Result<Box<dyn LlmProvider>, String> {
    let key = name.trim().to_lowercase();
    if key == "custom" {
        let base_url = custom_base_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "custom provider requires a base_url".to_string())?;
        return Ok(Box::new(CustomProvider {
            base_url: base_url.to_string(),
        }));
    }
    HOSTED_PROVIDERS
        .iter()
        .find(|p| p.name == key)
        .map(|p| Box::new(*p) as Box<dyn LlmProvider>)
        .ok_or_else(|| {
            format!(
                "Unsupported provider: {}. Choose one of the supported providers: {}",
                name,
                supported_providers().join(", ")
            )
        })
}

/// 由后端与模型名创建 LLM 客户端
///
/// `json_mode` 为 true 时请求 JSON 对象输出（后端需支持 `response_format`）
pub fn create_llm(provider: &dyn LlmProvider, model: &str, json_mode: bool) -> Arc<dyn LlmClient> {
    let config = provider.client_config();
    tracing::info!(provider = provider.name(), model, json_mode, base_url = %config.base_url, "using LLM backend");
    Arc::new(OpenAiClient::new(provider.name(), &config, model).with_json_mode(json_mode))
}
