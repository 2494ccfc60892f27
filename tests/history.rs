//! History store contracts: limit-most-recent retrieval oldest-first and
//! atomic turn appends, for both shipped implementations.

use cropflow::message::Message;
use cropflow::providers::HistoryStore;
use cropflow::providers::history::InMemoryHistoryStore;

#[tokio::test]
async fn limit_two_against_five_turns_returns_two_most_recent_oldest_first() {
    let store = InMemoryHistoryStore::new();
    for i in 1..=5 {
        store
            .save_turn("u1", "s1", &format!("question {i}"), &format!("answer {i}"))
            .await
            .expect("save");
    }

    let recent = store.recent("u1", "s1", 2).await.expect("recent");
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].role, Message::USER);
    assert_eq!(recent[0].content, "question 5");
    assert_eq!(recent[1].role, Message::ASSISTANT);
    assert_eq!(recent[1].content, "answer 5");
}

#[tokio::test]
async fn limit_larger_than_log_returns_everything() {
    let store = InMemoryHistoryStore::new();
    store.save_turn("u1", "s1", "q", "a").await.expect("save");

    let recent = store.recent("u1", "s1", 50).await.expect("recent");
    assert_eq!(recent.len(), 2);
}

#[tokio::test]
async fn concurrent_turns_never_interleave_a_partial_turn() {
    let store = InMemoryHistoryStore::new();

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .save_turn("u1", "s1", &format!("q{i}"), &format!("a{i}"))
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("save");
    }

    let all = store.recent("u1", "s1", 64).await.expect("recent");
    assert_eq!(all.len(), 32);
    // Every user message is immediately followed by its assistant reply.
    for pair in all.chunks(2) {
        assert_eq!(pair[0].role, Message::USER);
        assert_eq!(pair[1].role, Message::ASSISTANT);
        let question = pair[0].content.trim_start_matches('q');
        let answer = pair[1].content.trim_start_matches('a');
        assert_eq!(question, answer);
    }
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use cropflow::message::Message;
    use cropflow::providers::HistoryStore;
    use cropflow::providers::history_sqlite::SqliteHistoryStore;

    #[tokio::test]
    async fn round_trips_turns_with_limit_and_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteHistoryStore::open(dir.path().join("history.db"))
            .await
            .expect("open");

        for i in 1..=5 {
            store
                .save_turn("u1", "s1", &format!("question {i}"), &format!("answer {i}"))
                .await
                .expect("save");
        }

        let recent = store.recent("u1", "s1", 2).await.expect("recent");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "question 5");
        assert_eq!(recent[1].content, "answer 5");
        assert_eq!(recent[1].role, Message::ASSISTANT);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteHistoryStore::open(dir.path().join("history.db"))
            .await
            .expect("open");

        store.save_turn("u1", "s1", "one", "1").await.expect("save");
        store.save_turn("u1", "s2", "two", "2").await.expect("save");
        store.save_turn("u2", "s1", "three", "3").await.expect("save");

        let recent = store.recent("u1", "s1", 10).await.expect("recent");
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|m| m.user_id == "u1" && m.session_id == "s1"));
        assert_eq!(recent[0].content, "one");
    }
}
