#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use brk::agent::ChatModel;
use brk::config::BackendConfig;
use brk::types::{FunctionCall, Message, Tool, ToolCall};

/// 后端收到的请求
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct MockState {
    assortment: (u16, Value),
    stores: (u16, Value),
    requests: Arc<Mutex<Vec<Recorded>>>,
}

pub struct MockBackend {
    pub url: String,
    pub requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockBackend {
    pub fn config(&self) -> BackendConfig {
        BackendConfig {
            api_url: self.url.clone(),
            username: "user".to_string(),
            password: "pass".to_string(),
            ..BackendConfig::default()
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

fn record(state: &MockState, path: &str, query: HashMap<String, String>, headers: &HeaderMap) {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(Recorded {
        path: path.to_string(),
        query,
        authorization,
    });
}

fn reply((status, body): &(u16, Value)) -> (StatusCode, Json<Value>) {
    (StatusCode::from_u16(*status).unwrap(), Json(body.clone()))
}

async fn assortment(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    record(&state, "/assortment", query, &headers);
    reply(&state.assortment)
}

async fn stores(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    record(&state, "/store", query, &headers);
    reply(&state.stores)
}

/// 在随机端口启动假后端
pub async fn spawn_backend(assortment_reply: (u16, Value), stores_reply: (u16, Value)) -> MockBackend {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        assortment: assortment_reply,
        stores: stores_reply,
        requests: requests.clone(),
    };

    let app = Router::new()
        .route("/assortment", get(assortment))
        .route("/store", get(stores))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        url: format!("http://{}", addr),
        requests,
    }
}

/// 按脚本依次返回回复的模型，并记录每次收到的消息
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Message>>,
    pub prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Message>) -> Arc<Self> {
        Arc::new(ScriptedModel {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, reply: Message) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: &[Message], _tools: &[Tool]) -> Result<Message> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Message::assistant("done")))
    }
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> Message {
    Message::assistant_tool_calls(
        None,
        vec![ToolCall {
            id: id.to_string(),
            tool_type: Some("function".to_string()),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }],
    )
}

pub fn contents(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.text_content().to_string()).collect()
}
