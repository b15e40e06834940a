mod common;

use serde_json::json;
use std::sync::Arc;

use brk::agent::{AgentProfile, NoopObserver};
use brk::backend::BackendClient;
use brk::chat::{ChatError, ChatService};
use brk::config::ToolsConfig;
use brk::tools::ToolRegistry;
use brk::types::Message;
use common::{contents, spawn_backend, ScriptedModel};

async fn service(model: Arc<ScriptedModel>, profile: AgentProfile) -> ChatService {
    let backend = spawn_backend((200, json!({ "rows": [] })), (200, json!({ "rows": [] }))).await;
    let client = Arc::new(BackendClient::new(Arc::new(backend.config())));
    let tools = Arc::new(ToolRegistry::with_catalog(client, &ToolsConfig::default()));
    ChatService::new(profile, model, tools, 15)
}

#[tokio::test]
async fn each_session_gets_its_own_agent() {
    let model = ScriptedModel::new(vec![
        Message::assistant("reply A1"),
        Message::assistant("reply B1"),
        Message::assistant("reply A2"),
    ]);
    let service = service(model.clone(), AgentProfile::consultant()).await;

    let a = service.on_session_start();
    let b = service.on_session_start();
    assert_ne!(a, b);

    assert_eq!(service.on_message(&a, "hello from A", &NoopObserver).await.unwrap(), "reply A1");
    assert_eq!(service.on_message(&b, "hello from B", &NoopObserver).await.unwrap(), "reply B1");
    assert_eq!(service.on_message(&a, "again A", &NoopObserver).await.unwrap(), "reply A2");

    let history_a = contents(&service.history(&a).await.unwrap());
    let history_b = contents(&service.history(&b).await.unwrap());
    assert_eq!(history_a, vec!["hello from A", "reply A1", "again A", "reply A2"]);
    assert_eq!(history_b, vec!["hello from B", "reply B1"]);

    // B 的第一轮提示中不应出现 A 的内容
    let prompts = model.prompts();
    assert!(!contents(&prompts[1]).iter().any(|c| c.contains("from A")));

    let sessions = service.sessions();
    assert_eq!(sessions.len(), 2);
    let turns_a = sessions.iter().find(|s| s.id == a).unwrap().turns;
    assert_eq!(turns_a, 2);
}

#[tokio::test]
async fn concurrent_sessions_do_not_share_memory() {
    let model = ScriptedModel::new(Vec::new());
    let service = Arc::new(service(model, AgentProfile::consultant()).await);

    let ids: Vec<String> = (0..8).map(|_| service.on_session_start()).collect();
    let handles: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let service = service.clone();
            tokio::spawn(async move {
                let text = format!("message for {}", id);
                service.on_message(&id, &text, &NoopObserver).await.unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    for id in &ids {
        let history = contents(&service.history(id).await.unwrap());
        assert_eq!(history, vec![format!("message for {}", id), "done".to_string()]);
    }
}

#[tokio::test]
async fn unknown_session_is_an_error() {
    let service = service(ScriptedModel::new(Vec::new()), AgentProfile::minimal()).await;

    let err = service.on_message("missing", "hi", &NoopObserver).await.unwrap_err();
    assert!(matches!(err, ChatError::SessionNotFound(ref id) if id == "missing"));
}

#[tokio::test]
async fn ended_session_cannot_receive_messages() {
    let service = service(ScriptedModel::new(Vec::new()), AgentProfile::minimal()).await;

    let id = service.on_session_start();
    assert!(service.contains(&id));
    assert!(service.end_session(&id));
    assert!(!service.end_session(&id));

    let err = service.on_message(&id, "hi", &NoopObserver).await.unwrap_err();
    assert!(matches!(err, ChatError::SessionNotFound(_)));
}

#[tokio::test]
async fn clear_history_only_touches_one_session() {
    let service = service(ScriptedModel::new(Vec::new()), AgentProfile::consultant()).await;
    let a = service.on_session_start();
    let b = service.on_session_start();

    service.on_message(&a, "one", &NoopObserver).await.unwrap();
    service.on_message(&b, "two", &NoopObserver).await.unwrap();
    service.clear_history(&a).await.unwrap();

    assert!(service.history(&a).await.unwrap().is_empty());
    assert_eq!(service.history(&b).await.unwrap().len(), 2);

    let turns = |id: &str| {
        service
            .sessions()
            .into_iter()
            .find(|s| s.id == id)
            .map(|s| s.turns)
    };
    assert_eq!(turns(&a), Some(0));
    assert_eq!(turns(&b), Some(1));
}
