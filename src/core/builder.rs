//! Agent 构建器：由配置组装 LLM、浏览器会话、任务说明与 Orchestrator
//!
//! 未显式注入时，LLM 按 `[llm].provider` 从后端表中选择；浏览器会话在启用 feature "browser" 时
//! 使用 ChromeSession（首次使用时才启动），否则必须通过 with_session 注入。

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::core::{AgentError, Orchestrator};
use crate::llm::{create_llm, get_provider, LlmClient, RetryConfig, StructuredClient};
use crate::memory::TaskInstructions;
use crate::react::{prompts, Planner};
use crate::tools::{ActionExecutor, BrowserSession};

/// Agent 构建器
pub struct AgentBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    session: Option<Arc<dyn BrowserSession>>,
    instructions: Option<String>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            session: None,
            instructions: None,
        }
    }

    /// 使用给定 LLM（测试或自定义后端）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_session(mut self, session: Arc<dyn BrowserSession>) -> Self {
        self.session = Some(session);
        self
    }

    /// 构建前写入任务说明文件（覆盖原内容）
    pub fn with_task_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn resolve_llm(&self) -> Result<Arc<dyn LlmClient>, AgentError> {
        if let Some(llm) = &self.llm {
            return Ok(llm.clone());
        }
        let llm_cfg = &self.config.llm;
        let provider =
            get_provider(&llm_cfg.provider, llm_cfg.base_url.as_deref()).map_err(AgentError::Config)?;
        Ok(create_llm(provider.as_ref(), &llm_cfg.model, llm_cfg.json_mode))
    }

    #[cfg(feature = "browser")]
    fn resolve_session(&self) -> Result<Arc<dyn BrowserSession>, AgentError> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }
        Ok(Arc::new(crate::tools::ChromeSession::new(self.config.browser.clone())))
    }

    #[cfg(not(feature = "browser"))]
    fn resolve_session(&self) -> Result<Arc<dyn BrowserSession>, AgentError> {
        self.session.clone().ok_or_else(|| {
            AgentError::Config(
                "no browser session: enable the `browser` feature or supply one with with_session"
                    .to_string(),
            )
        })
    }

    /// 组装 Orchestrator
    pub fn build(self) -> Result<Orchestrator, AgentError> {
        let store = TaskInstructions::new(&self.config.app.task_instructions_path);
        if let Some(text) = &self.instructions {
            store
                .store(text)
                .map_err(|e| AgentError::Config(format!("failed to store task instructions: {}", e)))?;
        }
        let instructions = store.load();

        let llm = self.resolve_llm()?;
        let session = self.resolve_session()?;

        let llm_cfg = &self.config.llm;
        let structured = StructuredClient::new(
            llm,
            RetryConfig::new(llm_cfg.max_retries, Duration::from_millis(llm_cfg.retry_backoff_ms)),
            Duration::from_secs(llm_cfg.request_timeout_secs),
        );
        let system_prompt = prompts::system_prompt_now(instructions.as_deref());
        let mut planner = Planner::new(structured, system_prompt);
        if self.config.app.keep_message_history {
            planner = planner.with_history(self.config.app.max_context_turns);
        }

        let mut executor = ActionExecutor::new(session.clone(), self.config.executor.clone());
        if let Some(dir) = &self.config.browser.screenshots_dir {
            executor = executor.with_screenshots(dir);
        }

        Ok(Orchestrator::new(planner, executor, session).with_max_rounds(self.config.app.max_rounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::tools::MockBrowser;

    fn config(dir: &std::path::Path) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.app.task_instructions_path = dir.join("ltm").join("task_instructions.txt");
        cfg
    }

    #[test]
    fn test_instructions_stored_and_loaded_into_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let path = cfg.app.task_instructions_path.clone();
        let orch = AgentBuilder::new(cfg)
            .with_llm(Arc::new(MockLlmClient::new(vec![])))
            .with_session(Arc::new(MockBrowser::default()))
            .with_task_instructions("Prefer the mobile site.")
            .build()
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Prefer the mobile site.");
        assert!(orch.planner().system_prompt().contains("Prefer the mobile site."));
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.llm.provider = "nope".into();
        let result = AgentBuilder::new(cfg)
            .with_session(Arc::new(MockBrowser::default()))
            .build();
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[cfg(not(feature = "browser"))]
    #[test]
    fn test_session_required_without_browser_feature() {
        let dir = tempfile::tempdir().unwrap();
        let result = AgentBuilder::new(config(dir.path()))
            .with_llm(Arc::new(MockLlmClient::new(vec![])))
            .build();
        assert!(matches!(result, Err(AgentError::Config(_))));
    }
}
