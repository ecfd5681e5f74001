mod common;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_test::{assert_err, assert_ok};

use common::{Level, RecordingSink, ScriptedStore};
use replay_store::{
    ChunkedArrayWriter, CompletedPart, MultipartUploadSession, SessionState, StoreError, UploadId,
};

fn session(store: &Arc<ScriptedStore>, sink: &Arc<RecordingSink>) -> MultipartUploadSession {
    MultipartUploadSession::new(store.clone(), sink.clone())
}

#[tokio::test]
async fn test_parts_are_numbered_in_order() {
    let store = Arc::new(ScriptedStore::new());
    let sink = Arc::new(RecordingSink::default());
    let mut session = session(&store, &sink);

    session.initiate("stats", "games.ndjson", "application/json").await.unwrap();
    for chunk in ["a", "b", "c"] {
        session.upload_part(chunk).await.unwrap();
    }

    let expected = vec![
        CompletedPart::new(1, "etag-1"),
        CompletedPart::new(2, "etag-2"),
        CompletedPart::new(3, "etag-3"),
    ];
    assert_eq!(session.acknowledged_parts(), expected.as_slice());
    assert_eq!(session.next_part_number(), 4);
    assert_eq!(session.state(), SessionState::PartsAccumulated);

    session.complete().await.unwrap();
    assert_eq!(store.completed(), vec![expected]);
    assert_eq!(session.state(), SessionState::Completed);
    assert!(!session.processing());
}

#[tokio::test]
async fn test_second_complete_is_a_protocol_error() {
    let store = Arc::new(ScriptedStore::new());
    let sink = Arc::new(RecordingSink::default());
    let mut session = session(&store, &sink);

    session.initiate("stats", "games.ndjson", "application/json").await.unwrap();
    session.upload_part("a").await.unwrap();
    session.complete().await.unwrap();

    let err = session.complete().await.unwrap_err();
    assert!(matches!(err, StoreError::SessionProtocol { .. }));
    assert!(!err.is_retryable());
    assert_eq!(store.completed().len(), 1);
    assert_eq!(sink.count(Level::Error), 1);

    let err = session.upload_part("late").await.unwrap_err();
    assert!(matches!(err, StoreError::SessionProtocol { .. }));
}

#[tokio::test]
async fn test_failed_part_is_not_retried() {
    let store = Arc::new(ScriptedStore::new());
    let sink = Arc::new(RecordingSink::default());
    let mut session = session(&store, &sink);
    store.fail_part_once(2);

    session.initiate("stats", "games.ndjson", "application/json").await.unwrap();
    session.upload_part("a").await.unwrap();
    assert_err!(session.upload_part("b").await);

    assert_eq!(store.uploaded_parts().len(), 1);
    assert_eq!(session.next_part_number(), 2);
    assert_eq!(session.acknowledged_parts().len(), 1);
    assert_eq!(session.state(), SessionState::PartsAccumulated);
    assert_eq!(sink.count(Level::Warn), 1);

    // The caller may resend the same content under the same number
    assert_ok!(session.upload_part("b").await);
    let numbers: Vec<u32> = store.uploaded_parts().iter().map(|(n, _)| *n).collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[tokio::test]
async fn test_processing_flag_tracks_in_flight_part() {
    let store = Arc::new(ScriptedStore::new());
    let sink = Arc::new(RecordingSink::default());
    let mut session = session(&store, &sink);
    let flag = session.processing_flag();

    assert!(!flag.is_set());
    session.initiate("stats", "games.ndjson", "application/json").await.unwrap();
    assert!(!flag.is_set());

    let gate = store.hold_parts();
    let upload = tokio::spawn(async move {
        let result = session.upload_part("a").await;
        (session, result)
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while !flag.is_set() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("part upload never reached the store");
    tokio::task::yield_now().await;
    assert!(flag.is_set());
    assert!(store.uploaded_parts().is_empty());

    gate.notify_one();
    let (session, result) = upload.await.unwrap();
    assert_ok!(result);
    assert!(!flag.is_set());
    assert_eq!(session.state(), SessionState::PartsAccumulated);
    assert_eq!(session.upload_id().map(|id| id.as_str()), Some("upload-1"));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_part_blocks_session_until_aborted() {
    let store = Arc::new(ScriptedStore::new());
    let sink = Arc::new(RecordingSink::default());
    let mut session = session(&store, &sink);
    let flag = session.processing_flag();
    session.initiate("stats", "games.ndjson", "application/json").await.unwrap();

    let _gate = store.hold_parts();
    let cancelled = tokio::time::timeout(Duration::from_millis(50), session.upload_part("a")).await;
    assert!(cancelled.is_err());

    assert!(!flag.is_set());
    assert_eq!(session.state(), SessionState::PartInFlight);
    assert_eq!(session.next_part_number(), 1);
    assert!(session.acknowledged_parts().is_empty());

    let err = session.upload_part("b").await.unwrap_err();
    assert!(matches!(err, StoreError::SessionProtocol { .. }));
    let err = session.complete().await.unwrap_err();
    assert!(matches!(err, StoreError::SessionProtocol { .. }));

    assert_ok!(session.abort().await);
    assert_eq!(session.state(), SessionState::Aborted);
    assert_eq!(store.aborted().len(), 1);
    assert!(store.completed().is_empty());
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Game {
    id: u32,
    winner: String,
}

#[tokio::test]
async fn test_array_is_split_into_ndjson_parts() {
    let store = Arc::new(ScriptedStore::new());
    let sink = Arc::new(RecordingSink::default());
    let games: Vec<Game> = (0..250)
        .map(|id| Game {
            id,
            winner: format!("player-{}", id % 7),
        })
        .collect();
    let before = games.clone();

    ChunkedArrayWriter::new(store.clone(), sink.clone())
        .write_array(&games, "stats", "games.ndjson", "application/json", 100)
        .await
        .unwrap();

    assert_eq!(games, before);

    let parts = store.uploaded_parts();
    let numbers: Vec<u32> = parts.iter().map(|(n, _)| *n).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let mut decoded = Vec::new();
    for (index, (_, body)) in parts.iter().enumerate() {
        let text = std::str::from_utf8(body).unwrap();
        assert!(!text.ends_with('\n'));
        let lines: Vec<Game> = text
            .split('\n')
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), [100, 100, 50][index]);
        decoded.extend(lines);
    }
    assert_eq!(decoded, games);
    assert_eq!(store.completed().len(), 1);
    assert_eq!(store.completed()[0].len(), 3);
    assert!(store.aborted().is_empty());
}

#[tokio::test]
async fn test_zero_chunk_size_is_rejected_before_any_request() {
    let store = Arc::new(ScriptedStore::new());
    let sink = Arc::new(RecordingSink::default());

    let err = ChunkedArrayWriter::new(store.clone(), sink.clone())
        .write_array(&[1, 2, 3], "stats", "numbers.ndjson", "application/json", 0)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Invalid { .. }));
    assert!(store.uploaded_parts().is_empty());
    assert!(store.completed().is_empty());
    assert!(store.aborted().is_empty());
}

#[tokio::test]
async fn test_part_failure_aborts_the_array_write() {
    let store = Arc::new(ScriptedStore::new());
    let sink = Arc::new(RecordingSink::default());
    store.fail_part_once(2);

    let result = ChunkedArrayWriter::new(store.clone(), sink.clone())
        .write_array(&[1, 2, 3, 4, 5], "stats", "numbers.ndjson", "application/json", 2)
        .await;

    assert!(result.is_err());
    assert_eq!(store.uploaded_parts().len(), 1);
    assert!(store.completed().is_empty());
    assert_eq!(store.aborted(), vec![UploadId::from_string("upload-1".to_string())]);
}
