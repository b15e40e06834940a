use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::agent::AgentProfile;

/// 店员人设提示词
pub const CONSULTANT_PROMPT: &str =
    "You are a sales consultant in a tobacco store, answer only in Russian";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("环境变量 {key} 的值无效：{value}")]
    InvalidValue { key: String, value: String },
}

/// Agent 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub model: String,
    pub base_url: String,
    /// 一般通过 OPENAI_KEY 注入，不写进配置文件
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    pub temperature: f32,
    pub max_iterations: usize,
    pub enable_memory: bool,
    /// 为空表示不使用系统提示
    pub system_prompt: String,
    pub cache_responses: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            model: "gpt-3.5-turbo".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            temperature: 0.7,
            max_iterations: 15,
            enable_memory: true,
            system_prompt: CONSULTANT_PROMPT.to_string(),
            cache_responses: true,
        }
    }
}

impl AgentConfig {
    pub fn profile(&self) -> AgentProfile {
        AgentProfile {
            enable_memory: self.enable_memory,
            system_prompt: Some(self.system_prompt.trim())
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        }
    }
}

/// 后端 API 配置（地址 + Basic Auth）
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub api_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    pub assortment_limit: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            api_url: String::new(),
            username: String::new(),
            password: String::new(),
            assortment_limit: 10,
        }
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("assortment_limit", &self.assortment_limit)
            .finish()
    }
}

/// 商品分类，用于拼接 assortment 工具的描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub name: String,
    pub topic: String,
}

impl ProductCategory {
    pub fn new(name: &str, topic: &str) -> Self {
        ProductCategory {
            name: name.to_string(),
            topic: topic.to_string(),
        }
    }
}

/// 工具配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub categories: Vec<ProductCategory>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        ToolsConfig {
            categories: vec![
                ProductCategory::new("POD", "for questions about POD systems"),
                ProductCategory::new("Щелочные", "for inquiries regarding e-liquids"),
                ProductCategory::new("Одноразовые", "for addressing disposable vapes"),
            ],
        }
    }
}

/// HTTP 聊天服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// 统一配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent: AgentConfig,
    pub backend: BackendConfig,
    pub tools: ToolsConfig,
    pub server: ServerConfig,
}

impl Config {
    /// 从文件加载配置
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("解析配置文件失败：{}", path.display()))?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 默认配置文件位置
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".brk")
            .join("config.toml")
    }

    /// 从默认位置加载配置，再叠加环境变量（进程环境优先，其次 .env）
    pub fn load_default() -> Result<Self> {
        let mut config = Self::load(&Self::default_path())?;

        let dotenv = fs::read_to_string(".env")
            .map(|content| parse_dotenv(&content))
            .unwrap_or_default();

        config.apply_env(|key| std::env::var(key).ok().or_else(|| dotenv.get(key).cloned()))?;
        Ok(config)
    }

    /// 用环境变量覆盖配置
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("API_URL") {
            self.backend.api_url = v;
        }
        if let Some(v) = lookup("AUTH_USERNAME") {
            self.backend.username = v;
        }
        if let Some(v) = lookup("AUTH_PASSWORD") {
            self.backend.password = v;
        }
        if let Some(v) = lookup("OPENAI_KEY") {
            self.agent.api_key = v;
        }
        if let Some(v) = lookup("OPENAI_MODEL") {
            self.agent.model = v;
        }
        if let Some(v) = lookup("OPENAI_URL") {
            self.agent.base_url = v;
        }
        if let Some(v) = lookup("BRK_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("BRK_PORT") {
            self.server.port = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "BRK_PORT".to_string(),
                value: v.clone(),
            })?;
        }
        Ok(())
    }
}

/// 解析 .env 内容（KEY=VALUE，忽略空行和注释）
pub fn parse_dotenv(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            vars.insert(key.trim().to_string(), value.to_string());
        }
    }

    vars
}
