//! HTTP 聊天接口
//!
//! - `POST   /sessions`                创建会话
//! - `GET    /sessions`                会话列表
//! - `POST   /sessions/:id/messages`   发送消息，返回 agent 回复
//! - `GET    /sessions/:id/history`    会话记忆
//! - `DELETE /sessions/:id`            结束会话

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::agent::NoopObserver;
use crate::chat::{ChatError, ChatService, SessionInfo};
use crate::config::ServerConfig;
use crate::types::Message;

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub output: String,
}

type ApiError = (StatusCode, String);

fn chat_error(err: ChatError) -> ApiError {
    match err {
        ChatError::SessionNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        ChatError::Agent(e) => {
            let message = format!("{:#}", e);
            tracing::error!(error = %message, "agent 处理失败");
            (StatusCode::BAD_GATEWAY, message)
        }
    }
}

pub fn router(service: Arc<ChatService>) -> Router {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/:id", delete(end_session))
        .route("/sessions/:id/messages", post(post_message))
        .route("/sessions/:id/history", get(get_history))
        .with_state(service)
}

/// 监听并处理请求，直到进程退出
pub async fn serve(service: Arc<ChatService>, config: &ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("监听 {} 失败", addr))?;

    tracing::info!(%addr, "HTTP 聊天服务已启动");
    axum::serve(listener, router(service))
        .await
        .context("HTTP 服务异常退出")
}

async fn create_session(State(service): State<Arc<ChatService>>) -> Json<SessionCreated> {
    Json(SessionCreated {
        session_id: service.on_session_start(),
    })
}

async fn list_sessions(State(service): State<Arc<ChatService>>) -> Json<Vec<SessionInfo>> {
    Json(service.sessions())
}

async fn post_message(
    State(service): State<Arc<ChatService>>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let output = service
        .on_message(&id, &req.content, &NoopObserver)
        .await
        .map_err(chat_error)?;

    Ok(Json(MessageResponse { output }))
}

async fn get_history(
    State(service): State<Arc<ChatService>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    service.history(&id).await.map(Json).map_err(chat_error)
}

async fn end_session(State(service): State<Arc<ChatService>>, Path(id): Path<String>) -> StatusCode {
    if service.end_session(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
