use tracing::{info, info_span, warn};
use tracing_subscriber::layer::SubscriberExt;

use crate::capture::{CapturedEvents, EventCaptureLayer};

fn with_capture(f: impl FnOnce()) -> CapturedEvents {
    let storage = CapturedEvents::new();
    let subscriber =
        tracing_subscriber::registry().with(EventCaptureLayer::new(storage.clone()));
    tracing::subscriber::with_default(subscriber, f);
    storage
}

#[test]
fn events_are_captured_with_fields() {
    let events = with_capture(|| {
        info!(segment_count = 2, dimensions = 64, "built index");
    });

    let captured = events.all();
    assert_eq!(captured.len(), 1);
    let event = &captured[0];
    assert_eq!(event.level, "INFO");
    assert_eq!(event.message, "built index");
    assert_eq!(event.field("segment_count"), Some(&serde_json::json!(2)));
    assert!(event.timestamp > 0);
}

#[test]
fn session_id_is_inherited_from_enclosing_spans() {
    let events = with_capture(|| {
        let outer = info_span!("document.ask", session_id = "sess-1");
        let _outer = outer.enter();
        let inner = info_span!("retrieve", stage = "retrieve");
        let _inner = inner.enter();
        warn!("context exceeds inference input limit");
    });

    let for_session = events.for_session("sess-1");
    assert_eq!(for_session.len(), 1);
    assert_eq!(for_session[0].field_str("stage"), Some("retrieve"));
    assert!(events.for_session("sess-2").is_empty());
}

#[test]
fn messages_can_be_searched_and_cleared() {
    let events = with_capture(|| {
        info!("summarized document");
        info!("answered question");
    });

    assert_eq!(events.with_message("answered").len(), 1);
    events.clear();
    assert!(events.is_empty());
}

#[tokio::test]
async fn global_init_only_succeeds_once() {
    let storage = CapturedEvents::new();
    let _ = crate::init_with_capture("docqa-test", storage.clone());
    let second = crate::init_with_capture("docqa-test", CapturedEvents::new());
    assert!(second.is_err());
}
