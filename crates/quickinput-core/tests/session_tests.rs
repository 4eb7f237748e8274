//! Quick input session tests
//!
//! Tests for the create-or-update / dispose protocol:
//! - Registry insert-if-absent and unconditional dispose
//! - Selection reporting per session
//! - Optional update-in-place behavior

mod common;

use std::sync::Arc;

use common::{next_event, FakeService, RecordingRequester, RequesterEvent};
use quickinput_core::{
    Config, PickItem, PickOutcome, QuickOpen, SessionDescriptor, TransferQuickInput,
};

fn text_params(id: i64, value: &str) -> TransferQuickInput {
    let mut params = TransferQuickInput::input_box(id);
    params.value = Some(value.to_string());
    params
}

#[tokio::test]
async fn test_repeat_create_keeps_first_value() {
    let service = Arc::new(FakeService::new());
    let (requester, _events) = RecordingRequester::new();
    let proxy = QuickOpen::new(service.clone(), requester);

    proxy.create_or_update(text_params(5, "x")).await.unwrap();
    proxy.create_or_update(text_params(5, "y")).await.unwrap();

    let stored = proxy.sessions().get(5).unwrap();
    assert_eq!(stored.value(), Some("x"));

    // Both calls showed the session, each with the stored descriptor
    let shown = service.shown.lock();
    assert_eq!(shown.len(), 2);
    assert!(shown.iter().all(|s| s.value() == Some("x")));
}

#[tokio::test]
async fn test_update_in_place_applies_new_value() {
    let service = Arc::new(FakeService::new());
    let (requester, _events) = RecordingRequester::new();
    let mut config = Config::default();
    config.sessions.update_in_place = true;
    let proxy = QuickOpen::new(service.clone(), requester).with_config(&config);

    proxy.create_or_update(text_params(5, "x")).await.unwrap();
    proxy.create_or_update(text_params(5, "y")).await.unwrap();

    let stored = proxy.sessions().get(5).unwrap();
    assert_eq!(stored.value(), Some("y"));
    assert_eq!(stored.kind_name(), "textInput");
    assert_eq!(service.shown.lock()[1].value(), Some("y"));
}

#[tokio::test]
async fn test_update_in_place_ignores_type_change() {
    let service = Arc::new(FakeService::new());
    let (requester, _events) = RecordingRequester::new();
    let mut config = Config::default();
    config.sessions.update_in_place = true;
    let proxy = QuickOpen::new(service, requester).with_config(&config);

    proxy.create_or_update(text_params(1, "x")).await.unwrap();
    proxy
        .create_or_update(TransferQuickInput::quick_pick(1, vec![PickItem::new(1, "a")]))
        .await
        .unwrap();

    let stored = proxy.sessions().get(1).unwrap();
    assert_eq!(stored.kind_name(), "textInput");
    assert_eq!(stored.value(), Some("x"));
}

#[tokio::test]
async fn test_dispose_then_recreate() {
    let service = Arc::new(FakeService::new());
    let (requester, _events) = RecordingRequester::new();
    let proxy = QuickOpen::new(service, requester);

    // Disposing an unknown id is fine
    proxy.dispose(9);

    proxy.create_or_update(text_params(9, "old")).await.unwrap();
    assert!(proxy.sessions().contains(9));

    proxy.dispose(9);
    assert!(!proxy.sessions().contains(9));

    proxy.create_or_update(text_params(9, "new")).await.unwrap();
    assert_eq!(proxy.sessions().get(9).unwrap().value(), Some("new"));
}

#[tokio::test]
async fn test_pick_reports_selected_handle() {
    let service = Arc::new(
        FakeService::new().with_show_result(Some(PickOutcome::One(PickItem::new(2, "two")))),
    );
    let (requester, mut events) = RecordingRequester::new();
    let proxy = QuickOpen::new(service, requester);

    let items = vec![PickItem::new(1, "one"), PickItem::new(2, "two")];
    proxy
        .create_or_update(TransferQuickInput::quick_pick(3, items))
        .await
        .unwrap();

    assert_eq!(
        next_event(&mut events).await,
        RequesterEvent::ItemsSelected(3, vec![2])
    );
}

#[tokio::test]
async fn test_pick_many_reports_every_handle() {
    let outcome = PickOutcome::Many(vec![PickItem::new(1, "one"), PickItem::new(4, "four")]);
    let service = Arc::new(FakeService::new().with_show_result(Some(outcome)));
    let (requester, mut events) = RecordingRequester::new();
    let proxy = QuickOpen::new(service.clone(), requester);

    let mut params = TransferQuickInput::quick_pick(8, vec![PickItem::new(1, "one")]);
    params.can_select_many = Some(true);
    proxy.create_or_update(params).await.unwrap();

    assert_eq!(
        next_event(&mut events).await,
        RequesterEvent::ItemsSelected(8, vec![1, 4])
    );
    assert!(matches!(
        service.shown.lock()[0],
        SessionDescriptor::PickMany(_)
    ));
}

#[tokio::test]
async fn test_dismissed_session_reports_nothing() {
    let service = Arc::new(FakeService::new());
    let (requester, _events) = RecordingRequester::new();
    let proxy = QuickOpen::new(service, requester.clone());

    proxy
        .create_or_update(TransferQuickInput::quick_pick(1, vec![PickItem::new(1, "a")]))
        .await
        .unwrap();

    assert!(requester.log.lock().is_empty());
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let service = Arc::new(FakeService::new());
    let (requester, _events) = RecordingRequester::new();
    let proxy = QuickOpen::new(service, requester);

    proxy.create_or_update(text_params(1, "a")).await.unwrap();
    proxy
        .create_or_update(TransferQuickInput::quick_pick(2, vec![]))
        .await
        .unwrap();
    proxy.dispose(1);

    assert!(!proxy.sessions().contains(1));
    assert_eq!(proxy.sessions().get(2).unwrap().kind_name(), "pickOne");
}

#[tokio::test]
async fn test_shutdown_clears_sessions() {
    let service = Arc::new(FakeService::new());
    let (requester, _events) = RecordingRequester::new();
    let proxy = QuickOpen::new(service, requester);

    proxy.create_or_update(text_params(1, "a")).await.unwrap();
    proxy.create_or_update(text_params(2, "b")).await.unwrap();
    assert_eq!(proxy.sessions().len(), 2);

    proxy.shutdown();
    assert!(proxy.sessions().is_empty());
}
