use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::types::{ChatRequest, ChatResponse, Message, Tool};

/// 语言模型接口
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<Message>;
}

/// OpenAI 兼容的 chat completions 客户端
pub struct OpenAiClient {
    client: Client,
    config: AgentConfig,
}

impl OpenAiClient {
    pub fn new(config: AgentConfig) -> Self {
        OpenAiClient {
            client: Client::new(),
            config,
        }
    }

    fn request(&self, messages: &[Message], tools: &[Tool]) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
            tools: (!tools.is_empty()).then(|| tools.to_vec()),
            temperature: self.config.temperature,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<Message> {
        let request = self.request(messages, tools);
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("调用 OpenAI API 失败")?;

        let status = response.status();
        let text = response.text().await.context("读取响应失败")?;

        if !status.is_success() {
            return Err(anyhow!("OpenAI API 错误：{} - {}", status, text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .with_context(|| format!("解析 OpenAI 响应失败，原始内容：{}", text))?;

        if let Some(err) = parsed.error {
            return Err(anyhow!("OpenAI 错误：{}", err.message));
        }

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("OpenAI 响应中没有 choices"))?;

        tracing::debug!(finish_reason = ?choice.finish_reason, "模型返回");
        Ok(choice.message)
    }
}

/// 进程内响应缓存，相同请求直接复用上次结果
pub struct CachedModel {
    inner: Arc<dyn ChatModel>,
    cache: DashMap<String, Message>,
}

impl CachedModel {
    pub fn new(inner: Arc<dyn ChatModel>) -> Self {
        CachedModel {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn key(messages: &[Message], tools: &[Tool]) -> Result<String> {
        Ok(serde_json::to_string(&(messages, tools))?)
    }
}

#[async_trait]
impl ChatModel for CachedModel {
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<Message> {
        let key = Self::key(messages, tools)?;

        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!("命中模型响应缓存");
            return Ok(hit.value().clone());
        }

        let reply = self.inner.complete(messages, tools).await?;
        self.cache.insert(key, reply.clone());
        Ok(reply)
    }
}

/// 按配置创建模型客户端
pub fn build_model(config: &AgentConfig) -> Arc<dyn ChatModel> {
    let client: Arc<dyn ChatModel> = Arc::new(OpenAiClient::new(config.clone()));
    if config.cache_responses {
        Arc::new(CachedModel::new(client))
    } else {
        client
    }
}
