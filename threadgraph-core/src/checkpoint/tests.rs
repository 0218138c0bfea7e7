#[cfg(test)]
mod tests {
    use crate::checkpoint::*;
    use crate::graph::Phase;
    use crate::types::{Message, StoreError, ToolCall, ToolStatus};
    use serde_json::json;

    fn tool_call_turn(call_id: &str) -> Vec<Message> {
        vec![
            Message::user("what is 2 * 3?"),
            Message::assistant("").with_tool_calls(vec![ToolCall::new(
                call_id,
                "calculator",
                json!({"first_num": 2, "second_num": 3, "operation": "multiply"}),
            )]),
            Message::tool(call_id, "{\"result\":6.0}", ToolStatus::Success),
            Message::assistant("2 * 3 = 6"),
        ]
    }

    async fn check_isolation_and_order(store: &dyn CheckpointStore) {
        let a = tool_call_turn("call_a");
        let b = vec![Message::user("hello"), Message::assistant("hi")];

        for message in &a {
            store.append("thread-a", std::slice::from_ref(message)).await.unwrap();
        }
        store.append("thread-b", &b).await.unwrap();

        assert_eq!(store.read("thread-a").await.unwrap(), a);
        assert_eq!(store.read("thread-b").await.unwrap(), b);
        assert!(store.read("missing").await.unwrap().is_empty());

        let history = store.history("thread-a").await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(
            history.iter().map(|c| c.step).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(
            history.iter().map(|c| c.next).collect::<Vec<_>>(),
            vec![
                Phase::ModelInference,
                Phase::ToolExecution,
                Phase::ModelInference,
                Phase::End
            ]
        );
    }

    async fn check_enumeration(store: &dyn CheckpointStore) {
        store.append("t1", &[Message::user("one")]).await.unwrap();
        store.append("t2", &[Message::user("two")]).await.unwrap();
        store.append("t1", &[Message::assistant("uno")]).await.unwrap();

        let first = store.list_threads().await.unwrap();
        let second = store.list_threads().await.unwrap();
        assert_eq!(first, vec!["t1".to_string(), "t2".to_string()]);
        assert_eq!(first, second);
    }

    async fn check_integrity(store: &dyn CheckpointStore) {
        store.append("t", &[Message::user("q")]).await.unwrap();
        let orphan = Message::tool("nope", "1", ToolStatus::Success);
        let err = store.append("t", &[orphan]).await.unwrap_err();
        assert!(matches!(err, StoreError::Integrity { .. }));
        assert_eq!(store.read("t").await.unwrap().len(), 1);
    }

    async fn check_idempotent_append(store: &dyn CheckpointStore) {
        let user = Message::user("q");
        let answer = Message::assistant("a");
        assert!(store.append("t", &[user.clone()]).await.unwrap().is_some());
        assert!(store.append("t", &[user.clone()]).await.unwrap().is_none());

        let checkpoint = store
            .append("t", &[user.clone(), answer.clone()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.messages, vec![answer.clone()]);
        assert_eq!(store.read("t").await.unwrap(), vec![user, answer]);

        let state = store.get_state("t").await.unwrap();
        assert_eq!(state.next, Phase::End);
        assert_eq!(state.checkpoint_count, 2);
    }

    #[tokio::test]
    async fn test_memory_store() {
        check_isolation_and_order(&MemoryCheckpointStore::new()).await;
        check_enumeration(&MemoryCheckpointStore::new()).await;
        check_integrity(&MemoryCheckpointStore::new()).await;
        check_idempotent_append(&MemoryCheckpointStore::new()).await;
    }

    #[tokio::test]
    async fn test_sqlite_store() {
        check_isolation_and_order(&SqliteCheckpointStore::open_in_memory().await.unwrap()).await;
        check_enumeration(&SqliteCheckpointStore::open_in_memory().await.unwrap()).await;
        check_integrity(&SqliteCheckpointStore::open_in_memory().await.unwrap()).await;
        check_idempotent_append(&SqliteCheckpointStore::open_in_memory().await.unwrap()).await;
    }

    #[tokio::test]
    async fn test_unknown_thread_state() {
        let store = MemoryCheckpointStore::new();
        let state = store.get_state("fresh").await.unwrap();
        assert!(state.messages.is_empty());
        assert_eq!(state.next, Phase::Start);
        assert_eq!(state.checkpoint_count, 0);
    }
}
