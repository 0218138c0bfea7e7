mod common;

use common::{answer, call_tools, executor, roles, ScriptedModel, Step};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use threadgraph_core::prelude::*;

fn multiply(id: &str, a: i64, b: i64) -> (&str, &str, Value) {
    (
        id,
        "calculator",
        json!({ "first_num": a, "second_num": b, "operation": "multiply" }),
    )
}

#[tokio::test]
async fn test_multi_step_tool_use() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let model = ScriptedModel::new(vec![
        call_tools(vec![multiply("call_1", 6, 7)]),
        answer("6 times 7 is 42."),
    ]);
    let executor = executor(store.clone(), model.clone());

    let state = executor
        .invoke(&Context::for_thread("math"), "What is 6 times 7?")
        .await
        .unwrap();

    assert_eq!(
        roles(&state.messages),
        vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    assert_eq!(state.final_answer(), Some("6 times 7 is 42."));

    let tool_message = &state.messages[2];
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
    let result: Value = serde_json::from_str(&tool_message.content).unwrap();
    assert_eq!(result["result"], 42.0);

    // The second inference sees the tool result
    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.len(), 3);
    assert_eq!(requests[1].messages.len(), 3);
    assert_eq!(requests[1].messages[2].role, Role::Tool);

    assert_eq!(store.read("math").await.unwrap(), state.messages);
    assert_eq!(store.get_state("math").await.unwrap().next, Phase::End);
}

#[tokio::test]
async fn test_parallel_tool_calls_answered_in_order() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let model = ScriptedModel::new(vec![
        call_tools(vec![
            multiply("call_a", 2, 3),
            ("call_b", "get_weather", json!({ "city": "Ann Arbor" })),
            multiply("call_c", 4, 5),
        ]),
        answer("6 and 20; no weather tool."),
    ]);
    let executor = executor(store.clone(), model);

    let state = executor
        .invoke(&Context::for_thread("t"), "compute")
        .await
        .unwrap();

    let answered: Vec<_> = state.messages[2..5]
        .iter()
        .map(|m| (m.tool_call_id.clone().unwrap(), m.status.unwrap()))
        .collect();
    assert_eq!(
        answered,
        vec![
            ("call_a".to_string(), ToolStatus::Success),
            ("call_b".to_string(), ToolStatus::Error),
            ("call_c".to_string(), ToolStatus::Success),
        ]
    );
    let error: Value = serde_json::from_str(&state.messages[3].content).unwrap();
    assert!(error["error"].as_str().unwrap().contains("get_weather"));
    assert_eq!(state.messages.len(), 6);
}

#[tokio::test]
async fn test_threads_are_isolated() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let model = ScriptedModel::new(vec![answer("Hi A"), answer("Hi B"), answer("Again A")]);
    let executor = executor(store.clone(), model.clone());

    executor
        .invoke(&Context::for_thread("a"), "hello from a")
        .await
        .unwrap();
    executor
        .invoke(&Context::for_thread("b"), "hello from b")
        .await
        .unwrap();
    let a = executor
        .invoke(&Context::for_thread("a"), "again")
        .await
        .unwrap();

    let contents: Vec<_> = a.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hello from a", "Hi A", "again", "Again A"]);
    assert_eq!(store.read("b").await.unwrap().len(), 2);
    // The third inference only saw thread a
    assert_eq!(model.requests()[2].messages.len(), 3);
    assert_eq!(store.list_threads().await.unwrap(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_stream_ends_with_final_answer() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let model = ScriptedModel::new(vec![
        call_tools(vec![multiply("call_1", 3, 3)]),
        answer("The answer is 9."),
    ]);
    let executor = executor(store.clone(), model);

    let mut stream = executor.stream(Context::for_thread("s"), "3 squared?");
    let mut text = String::new();
    let mut committed = Vec::new();
    while let Some(event) = stream.next().await {
        match event.unwrap() {
            TurnEvent::Delta { content, .. } => text.push_str(&content),
            TurnEvent::Message(message) => committed.push(message),
        }
    }

    assert_eq!(text, "The answer is 9.");
    assert_eq!(
        roles(&committed),
        vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    assert_eq!(committed[1].tool_calls[0].args["operation"], "multiply");
    assert_eq!(committed.last().unwrap().content, "The answer is 9.");
    assert!(stream.is_finished());
    assert_eq!(store.read("s").await.unwrap(), committed);
}

#[tokio::test]
async fn test_provider_error_leaves_resumable_history() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let failing = ScriptedModel::new(vec![
        call_tools(vec![multiply("call_1", 2, 2)]),
        Step::Fail(ModelError::Provider("rate limited".into())),
    ]);

    let err = executor(store.clone(), failing)
        .invoke(&Context::for_thread("t"), "2 times 2?")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TurnError::Node(NodeError::Model(ModelError::Provider(_)))
    ));

    let stored = store.read("t").await.unwrap();
    assert_eq!(roles(&stored), vec![Role::User, Role::Assistant, Role::Tool]);
    assert_eq!(store.get_state("t").await.unwrap().next, Phase::ModelInference);

    let model = ScriptedModel::new(vec![answer("4")]);
    let state = executor(store.clone(), model.clone())
        .resume(&Context::for_thread("t"))
        .await
        .unwrap();
    assert_eq!(state.final_answer(), Some("4"));
    assert_eq!(state.messages.len(), 4);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_stream_reports_turn_error() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let model = ScriptedModel::new(vec![Step::Fail(ModelError::Provider("down".into()))]);
    let executor = executor(store, model);

    let events: Vec<_> = executor
        .stream(Context::for_thread("t"), "hello")
        .collect()
        .await;
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Ok(TurnEvent::Message(_))));
    assert!(matches!(
        events[1],
        Err(TurnError::Node(NodeError::Model(ModelError::Provider(_))))
    ));
}

#[tokio::test]
async fn test_cancel_then_resume_without_duplicates() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let model = ScriptedModel::new(vec![
        call_tools(vec![multiply("call_1", 5, 5)]),
        Step::Hang("The answer".into()),
    ]);
    let mut stream = executor(store.clone(), model).stream(Context::for_thread("c"), "5 times 5?");
    while let Some(event) = stream.next().await {
        if let TurnEvent::Delta { content, .. } = event.unwrap() {
            assert_eq!(content, "The answer");
            break;
        }
    }
    stream.cancel();
    while stream.next().await.is_some() {}

    let stored = store.read("c").await.unwrap();
    assert_eq!(roles(&stored), vec![Role::User, Role::Assistant, Role::Tool]);

    let model = ScriptedModel::new(vec![answer("25")]);
    let state = executor(store.clone(), model)
        .resume(&Context::for_thread("c"))
        .await
        .unwrap();
    assert_eq!(
        roles(&state.messages),
        vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    assert_eq!(store.read("c").await.unwrap(), state.messages);
}

#[tokio::test]
async fn test_interrupted_tool_calls_are_completed_first() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let calling = Message::assistant("").with_tool_calls(vec![ToolCall::new(
        "call_1",
        "calculator",
        json!({ "first_num": 9, "second_num": 3, "operation": "divide" }),
    )]);
    store
        .append("t", &[Message::user("9 / 3?"), calling])
        .await
        .unwrap();
    assert_eq!(store.get_state("t").await.unwrap().next, Phase::ToolExecution);

    let model = ScriptedModel::new(vec![answer("3"), answer("Hello!")]);
    let state = executor(store.clone(), model)
        .invoke(&Context::for_thread("t"), "and hi")
        .await
        .unwrap();

    let contents: Vec<_> = state
        .messages
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(contents[2].0, Role::Tool);
    assert_eq!(contents[3], (Role::User, "and hi"));
    assert_eq!(contents[4], (Role::Assistant, "3"));
    assert_eq!(state.messages.len(), 5);
}

#[tokio::test]
async fn test_resume_of_finished_thread_is_a_no_op() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    store
        .append("t", &[Message::user("hi"), Message::assistant("hello")])
        .await
        .unwrap();

    let model = ScriptedModel::new(vec![]);
    let state = executor(store.clone(), model.clone())
        .resume(&Context::for_thread("t"))
        .await
        .unwrap();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(model.calls(), 0);

    let empty = executor(store, model.clone())
        .resume(&Context::for_thread("never-written"))
        .await
        .unwrap();
    assert!(empty.messages.is_empty());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_recursion_limit() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let model = ScriptedModel::new(vec![
        call_tools(vec![multiply("c1", 1, 1)]),
        call_tools(vec![multiply("c2", 1, 1)]),
        call_tools(vec![multiply("c3", 1, 1)]),
    ]);
    let executor = executor(store.clone(), model.clone())
        .with_config(ExecutorConfig { recursion_limit: 2 });

    let err = executor
        .invoke(&Context::for_thread("loop"), "loop forever")
        .await
        .unwrap_err();
    assert!(matches!(err, TurnError::RecursionLimit(2)));
    assert_eq!(model.calls(), 2);

    let stored = store.read("loop").await.unwrap();
    assert_eq!(
        roles(&stored),
        vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant, Role::Tool]
    );
}

#[tokio::test]
async fn test_disabled_tools_and_system_prompt() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let model = ScriptedModel::new(vec![answer("Plain answer")]);
    let chat = ChatNode::new(model.clone()).with_system_prompt("Answer briefly.");
    let executor = TurnExecutor::new(
        store.clone(),
        chat,
        ToolNode::new(Arc::new(ToolRegistry::new())),
    );

    executor
        .invoke(&Context::for_thread("t"), "hi")
        .await
        .unwrap();

    let request = &model.requests()[0];
    assert!(request.tools.is_empty());
    assert_eq!(request.system_prompt.as_deref(), Some("Answer briefly."));
    let stored = store.read("t").await.unwrap();
    assert_eq!(roles(&stored), vec![Role::User, Role::Assistant]);
}

#[tokio::test]
async fn test_tool_call_ids_reused_across_turns() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let model = ScriptedModel::new(vec![
        call_tools(vec![multiply("call_0", 2, 3)]),
        answer("6"),
        call_tools(vec![multiply("call_0", 4, 5)]),
        answer("20"),
    ]);
    let executor = executor(store.clone(), model.clone());
    let ctx = Context::for_thread("reuse");

    let first = executor.invoke(&ctx, "2 times 3?").await.unwrap();
    assert_eq!(first.final_answer(), Some("6"));

    let second = executor.invoke(&ctx, "4 times 5?").await.unwrap();
    assert_eq!(second.final_answer(), Some("20"));
    assert_eq!(second.messages.len(), 8);
    assert_eq!(model.calls(), 4);

    let answers: Vec<Value> = second
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| {
            assert_eq!(m.tool_call_id.as_deref(), Some("call_0"));
            serde_json::from_str(&m.content).unwrap()
        })
        .collect();
    assert_eq!(answers[0]["result"], 6.0);
    assert_eq!(answers[1]["result"], 20.0);

    assert_eq!(store.read("reuse").await.unwrap(), second.messages);
    assert_eq!(store.get_state("reuse").await.unwrap().next, Phase::End);
}

#[tokio::test]
async fn test_streaming_plain_answer_matches_blocking() {
    let reply = "Plain text with no tools at all.";

    let blocking_model = ScriptedModel::new(vec![answer(reply)]);
    let blocking_store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let state = executor(blocking_store, blocking_model.clone())
        .invoke(&Context::for_thread("b"), "hi")
        .await
        .unwrap();
    assert_eq!(blocking_model.calls(), 1);

    let streaming_model = ScriptedModel::new(vec![answer(reply)]);
    let streaming_store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let executor = executor(streaming_store.clone(), streaming_model.clone());
    let mut stream = executor.stream(Context::for_thread("s"), "hi");
    let mut text = String::new();
    let mut deltas = 0;
    while let Some(event) = stream.next().await {
        if let TurnEvent::Delta { content, .. } = event.unwrap() {
            text.push_str(&content);
            deltas += 1;
        }
    }

    assert_eq!(streaming_model.calls(), 1);
    assert!(deltas > 1);
    assert_eq!(Some(text.as_str()), state.final_answer());
    assert_eq!(
        roles(&streaming_store.read("s").await.unwrap()),
        vec![Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn test_empty_call_ids_get_generated() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
    let model = ScriptedModel::new(vec![
        call_tools(vec![multiply("", 2, 3), multiply("", 4, 5)]),
        answer("6 and 20"),
    ]);
    let executor = executor(store.clone(), model);

    let state = executor
        .invoke(&Context::for_thread("t"), "two products")
        .await
        .unwrap();

    assert_eq!(state.final_answer(), Some("6 and 20"));
    let calls = &state.messages[1].tool_calls;
    assert!(calls.iter().all(|c| c.id.starts_with("call_")));
    assert_ne!(calls[0].id, calls[1].id);
    assert_eq!(state.messages[2].tool_call_id.as_ref(), Some(&calls[0].id));
    assert_eq!(state.messages[3].tool_call_id.as_ref(), Some(&calls[1].id));
}
