use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::agent::{build_agent, build_model, Agent, AgentObserver, AgentProfile, ChatModel};
use crate::backend::BackendClient;
use crate::config::Config;
use crate::tools::ToolRegistry;
use crate::types::Message;

pub type SessionId = String;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("会话不存在：{0}")]
    SessionNotFound(SessionId),

    #[error(transparent)]
    Agent(#[from] anyhow::Error),
}

/// 会话元数据
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub turns: usize,
}

/// 单个会话：agent 独占，同一会话内的消息按顺序处理
struct SessionSlot {
    agent: Mutex<Agent>,
    created_at: DateTime<Utc>,
    turns: AtomicUsize,
}

/// 会话管理 + 消息处理
pub struct ChatService {
    profile: AgentProfile,
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
    sessions: DashMap<SessionId, Arc<SessionSlot>>,
}

impl ChatService {
    pub fn new(
        profile: AgentProfile,
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
        max_iterations: usize,
    ) -> Self {
        ChatService {
            profile,
            model,
            tools,
            max_iterations,
            sessions: DashMap::new(),
        }
    }

    /// 按配置接好后端、工具和模型
    pub fn from_config(config: &Config) -> Self {
        let backend = Arc::new(BackendClient::new(Arc::new(config.backend.clone())));
        let tools = Arc::new(ToolRegistry::with_catalog(backend, &config.tools));
        let model = build_model(&config.agent);

        Self::new(config.agent.profile(), model, tools, config.agent.max_iterations)
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// 新会话：创建一个 agent 并保存
    pub fn on_session_start(&self) -> SessionId {
        let id = uuid::Uuid::new_v4().to_string();
        let agent = build_agent(
            self.profile.clone(),
            self.model.clone(),
            self.tools.clone(),
            self.max_iterations,
        );

        self.sessions.insert(
            id.clone(),
            Arc::new(SessionSlot {
                agent: Mutex::new(agent),
                created_at: Utc::now(),
                turns: AtomicUsize::new(0),
            }),
        );

        tracing::info!(session = %id, "会话开始");
        id
    }

    /// 收到消息：交给该会话的 agent，返回最终回复
    pub async fn on_message(
        &self,
        session_id: &str,
        content: &str,
        observer: &dyn AgentObserver,
    ) -> Result<String, ChatError> {
        let slot = self.slot(session_id)?;
        let mut agent = slot.agent.lock().await;

        tracing::debug!(session = %session_id, "处理消息");
        let result = agent.chat(content, observer).await?;
        slot.turns.fetch_add(1, Ordering::Relaxed);

        Ok(result.output)
    }

    /// 结束会话
    pub fn end_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            tracing::info!(session = %session_id, "会话结束");
        }
        removed
    }

    /// 清空会话记忆，轮数归零
    pub async fn clear_history(&self, session_id: &str) -> Result<(), ChatError> {
        let slot = self.slot(session_id)?;
        let mut agent = slot.agent.lock().await;
        agent.clear_history();
        slot.turns.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// 会话记忆内容，未开启记忆时为空
    pub async fn history(&self, session_id: &str) -> Result<Vec<Message>, ChatError> {
        let slot = self.slot(session_id)?;
        let agent = slot.agent.lock().await;
        Ok(agent
            .memory()
            .map(|m| m.messages().to_vec())
            .unwrap_or_default())
    }

    /// 列出所有会话
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut list: Vec<SessionInfo> = self
            .sessions
            .iter()
            .map(|entry| SessionInfo {
                id: entry.key().clone(),
                created_at: entry.value().created_at,
                turns: entry.value().turns.load(Ordering::Relaxed),
            })
            .collect();
        list.sort_by_key(|s| s.created_at);
        list
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    // 先克隆出 Arc，避免跨 await 持有 DashMap 的锁
    fn slot(&self, session_id: &str) -> Result<Arc<SessionSlot>, ChatError> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))
    }
}
