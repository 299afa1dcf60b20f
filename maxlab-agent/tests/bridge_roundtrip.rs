use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use maxlab_agent::{AgentOptions, BridgeReply, ChatBridge, NotebookChatAgent};
use maxlab_core::history::{HistoryStore, JsonHistoryFile, MemoryHistory, Role, Turn};
use maxlab_providers::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};

/// Replies with a numbered answer and records what each request carried
#[derive(Default)]
struct Numbered {
    requests: Mutex<Vec<Vec<Message>>>,
    fail: bool,
}

#[async_trait]
impl LLMProvider for Numbered {
    async fn chat(
        &self,
        messages: Vec<Message>,
        _tools: Option<Vec<Value>>,
        _model: Option<String>,
        _max_tokens: i32,
        _temperature: f64,
    ) -> ProviderResult<LLMResponse> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(messages);
        if self.fail {
            return Err(ProviderError::ApiError("HTTP 401: invalid api key".into()));
        }
        Ok(LLMResponse {
            content: Some(format!("**answer {}**", requests.len())),
            tool_calls: Vec::new(),
            finish_reason: "stop".to_string(),
            usage: HashMap::new(),
        })
    }

    fn get_default_model(&self) -> String {
        "numbered".to_string()
    }
}

fn agent(provider: Arc<Numbered>) -> Arc<NotebookChatAgent> {
    Arc::new(NotebookChatAgent::new(provider, AgentOptions::default()))
}

async fn serve_lines(bridge: &mut ChatBridge<impl HistoryStore>, input: &str) -> Vec<Value> {
    let mut output = Vec::new();
    bridge.serve(input.as_bytes(), &mut output).await.unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_chat_persists_and_reloads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chat_history.json");
    let provider = Arc::new(Numbered::default());

    let mut bridge = ChatBridge::open(agent(provider.clone()), &path).await;
    let replies = serve_lines(
        &mut bridge,
        "{\"type\":\"chat\",\"content\":\"  hello  \"}\n\n{\"type\":\"load_history\"}\n",
    )
    .await;

    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0], json!({"type": "initialized"}));
    assert_eq!(replies[1]["type"], "response");
    assert_eq!(replies[1]["content"], "**answer 1**");
    assert!(replies[1]["timestamp"].as_str().unwrap().contains('T'));

    let history = replies[2]["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[0]["content"], "hello");
    assert_eq!(history[1]["role"], "assistant");

    let stored = JsonHistoryFile::open(&path).unwrap().load().unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].content, "**answer 1**");
}

#[tokio::test]
async fn test_response_timestamp_matches_stored_turn() {
    let provider = Arc::new(Numbered::default());
    let mut bridge = ChatBridge::new(agent(provider), MemoryHistory::new()).await;
    let reply = bridge
        .handle_message(&json!({"type": "chat", "content": "when?"}))
        .await;

    let BridgeReply::Response { timestamp, .. } = reply else {
        panic!("unexpected reply: {:?}", reply);
    };
    let stored = bridge.history().load().unwrap();
    assert_eq!(timestamp, stored[1].timestamp.to_rfc3339());
}

#[tokio::test]
async fn test_stored_history_seeds_the_session() {
    let mut history = MemoryHistory::new();
    history.append(Turn::user("my budget is 2000")).unwrap();
    history.append(Turn::assistant("noted")).unwrap();

    let provider = Arc::new(Numbered::default());
    let mut bridge = ChatBridge::new(agent(provider.clone()), history).await;
    let reply = bridge
        .handle_message(&json!({"type": "chat", "content": "and now?"}))
        .await;
    assert!(matches!(reply, BridgeReply::Response { .. }));

    let requests = provider.requests.lock().unwrap();
    let contents: Vec<&str> = requests[0].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(&contents[1..], &["my budget is 2000", "noted", "and now?"]);
}

#[tokio::test]
async fn test_clear_empties_history_and_session() {
    let provider = Arc::new(Numbered::default());
    let mut bridge = ChatBridge::new(agent(provider.clone()), MemoryHistory::new()).await;
    bridge
        .handle_message(&json!({"type": "chat", "content": "first"}))
        .await;

    let reply = bridge
        .handle_message(&json!({"type": "clear_history"}))
        .await;
    assert_eq!(reply, BridgeReply::Cleared);
    assert!(bridge.history().load().unwrap().is_empty());

    bridge
        .handle_message(&json!({"type": "chat", "content": "second"}))
        .await;
    let requests = provider.requests.lock().unwrap();
    // system prompt plus the new message only
    assert_eq!(requests[1].len(), 2);
    assert_eq!(requests[1][1].content, "second");
}

#[tokio::test]
async fn test_error_replies() {
    let mut bridge = ChatBridge::new(agent(Arc::new(Numbered::default())), MemoryHistory::new()).await;
    let replies = serve_lines(
        &mut bridge,
        "{\"type\":\"chat\",\"content\":\"   \"}\n{\"type\":\"ping\"}\nnot json\n",
    )
    .await;

    assert_eq!(replies[1], json!({"type": "error", "status": "empty_message"}));
    assert_eq!(
        replies[2],
        json!({"type": "error", "status": "unknown_message_type", "content": "ping"})
    );
    assert_eq!(replies[3]["status"], "internal_error");
    assert!(bridge.history().load().unwrap().is_empty());
}

#[tokio::test]
async fn test_upstream_failure_is_rendered_and_recorded() {
    let provider = Arc::new(Numbered {
        fail: true,
        ..Default::default()
    });
    let mut bridge = ChatBridge::new(agent(provider), MemoryHistory::new()).await;
    let reply = bridge
        .handle_message(&json!({"type": "chat", "content": "hi"}))
        .await;

    match reply {
        BridgeReply::Response { content, .. } => {
            assert!(content.starts_with("❌ **Invalid API Key or Authentication Failed**"));
        }
        other => panic!("unexpected reply: {:?}", other),
    }
    let stored = bridge.history().load().unwrap();
    assert_eq!(stored[0].role, Role::User);
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_corrupt_history_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chat_history.json");
    std::fs::write(&path, "{not a list").unwrap();

    let provider = Arc::new(Numbered::default());
    let mut bridge = ChatBridge::open(agent(provider.clone()), &path).await;
    let reply = bridge.handle_message(&json!({"type": "load_history"})).await;
    assert_eq!(reply, BridgeReply::History { history: Vec::new() });

    bridge
        .handle_message(&json!({"type": "chat", "content": "fresh"}))
        .await;
    assert_eq!(JsonHistoryFile::open(&path).unwrap().len(), 2);
}
