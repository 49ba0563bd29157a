//! End-to-end scenarios through the standard pipeline.
//!
//! Each test drives a [`Store`] built with `InAppPipeline::standard` and
//! checks the published state plus what the collaborators observed.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use gist_proto::{Message, MessagePosition, PageRule};
use gist_store::{
    Action, Collaborators, EngineAction, GistEnvironment, InAppEventListener, InAppPipeline,
    InlineMessageState, MessageRenderer, MetricsError, MetricsLogger, ModalMessageState, Store,
};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl InAppEventListener for Recorder {
    fn message_shown(&self, message: &Message) {
        self.record(format!("shown:{}", message.id()));
    }

    fn message_dismissed(&self, message: &Message) {
        self.record(format!("dismissed:{}", message.id()));
    }

    fn embed_message(&self, message: &Message, element_id: &str) {
        self.record(format!("embed:{}:{element_id}", message.id()));
    }

    fn message_error(&self, message: &Message) {
        self.record(format!("error:{}", message.id()));
    }
}

impl MetricsLogger for Recorder {
    fn log_view(&self, message: &Message, user_token: &str) -> Result<(), MetricsError> {
        self.record(format!("view:{}:{user_token}", message.id()));
        Ok(())
    }
}

impl MessageRenderer for Recorder {
    fn show_modal(&self, message: &Message, _position: MessagePosition) {
        self.record(format!("render:{}", message.id()));
    }
}

fn store() -> (Store, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let collaborators = Collaborators {
        listener: recorder.clone(),
        metrics: recorder.clone(),
        renderer: recorder.clone(),
    };
    (Store::new(InAppPipeline::standard(collaborators)), recorder)
}

fn queued(id: &str, queue_id: &str, priority: i64) -> Message {
    Message::new(id).with_queue_id(queue_id).with_priority(priority)
}

async fn identify(store: &Store) {
    store
        .dispatch(Action::Initialize {
            site_id: "abc".into(),
            data_center: "us".into(),
            environment: GistEnvironment::Production,
        })
        .await
        .unwrap();
    store.dispatch(Action::SetUserIdentifier("u1".into())).await.unwrap();
}

#[tokio::test]
async fn initialize_identify_process_display() {
    let (store, recorder) = store();

    store
        .dispatch(Action::Initialize {
            site_id: "abc".into(),
            data_center: "us".into(),
            environment: GistEnvironment::Production,
        })
        .await
        .unwrap();
    let state = store.state();
    assert_eq!((state.site_id.as_str(), state.data_center.as_str()), ("abc", "us"));
    assert_eq!(state.user_id, None);

    store.dispatch(Action::SetUserIdentifier("u1".into())).await.unwrap();
    assert_eq!(store.state().user_id.as_deref(), Some("u1"));

    let m1 = queued("m1", "q1", 1);
    let m2 = queued("m2", "q2", 2);
    store.dispatch(Action::ProcessMessageQueue(vec![m1.clone(), m2.clone()])).await.unwrap();

    let state = store.state();
    assert_eq!(state.current_message_state, ModalMessageState::Loading(m1.clone()));
    assert_eq!(state.messages_in_queue.len(), 2);
    assert!(state.messages_in_queue.contains(&m1) && state.messages_in_queue.contains(&m2));
    assert_eq!(recorder.events(), ["render:m1"]);

    store.dispatch(Action::DisplayMessage(m1.clone())).await.unwrap();

    let state = store.state();
    assert_eq!(state.current_message_state, ModalMessageState::Displayed(m1));
    assert_eq!(state.shown_message_queue_ids.iter().collect::<Vec<_>>(), [&"q1".to_string()]);
    assert_eq!(state.messages_in_queue.iter().collect::<Vec<_>>(), [&m2]);
    assert_eq!(recorder.events(), ["render:m1", "view:m1:u1", "shown:m1"]);
}

#[tokio::test]
async fn anonymous_queue_processing_is_refused() {
    let (store, recorder) = store();

    store.dispatch(Action::ProcessMessageQueue(vec![queued("m1", "q1", 1)])).await.unwrap();

    let state = store.state();
    assert!(state.messages_in_queue.is_empty());
    assert_eq!(state.current_message_state, ModalMessageState::Initial);
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn route_change_dismisses_and_promotes_next_message() {
    let (store, recorder) = store();
    identify(&store).await;
    store.dispatch(Action::SetPageRoute("A".into())).await.unwrap();

    let on_a = queued("m1", "q1", 1).with_page_rule(PageRule::new("A"));
    let on_b = queued("m2", "q2", 2).with_page_rule(PageRule::new("B"));
    store.dispatch(Action::ProcessMessageQueue(vec![on_a.clone(), on_b.clone()])).await.unwrap();
    store.dispatch(Action::DisplayMessage(on_a.clone())).await.unwrap();

    store.dispatch(Action::SetPageRoute("B".into())).await.unwrap();

    let state = store.state();
    assert_eq!(state.current_message_state, ModalMessageState::Loading(on_b));
    // Dismissed without a view metric, then the B message was rendered.
    let events = recorder.events();
    assert_eq!(events[events.len() - 2..], ["dismissed:m1".to_string(), "render:m2".to_string()]);
    assert_eq!(events.iter().filter(|e| e.starts_with("view:")).count(), 1);
}

#[tokio::test]
async fn route_mismatch_leaves_dismissed_state() {
    let (store, _) = store();
    identify(&store).await;
    store.dispatch(Action::SetPageRoute("A".into())).await.unwrap();

    let only_a = queued("m1", "q1", 1).with_page_rule(PageRule::new("A"));
    store.dispatch(Action::ProcessMessageQueue(vec![only_a.clone()])).await.unwrap();
    store.dispatch(Action::DisplayMessage(only_a.clone())).await.unwrap();
    store.dispatch(Action::SetPageRoute("B".into())).await.unwrap();

    assert_eq!(store.state().current_message_state, ModalMessageState::Dismissed(only_a));
}

#[tokio::test]
async fn second_load_while_displayed_is_refused() {
    let (store, recorder) = store();
    identify(&store).await;

    let m1 = queued("m1", "q1", 1);
    store.dispatch(Action::ProcessMessageQueue(vec![m1.clone()])).await.unwrap();
    store.dispatch(Action::DisplayMessage(m1.clone())).await.unwrap();

    let other = queued("m9", "q9", 0);
    store.dispatch(Action::LoadMessage { message: other, position: None }).await.unwrap();

    assert_eq!(store.state().current_message_state, ModalMessageState::Displayed(m1));
    assert!(!recorder.events().contains(&"render:m9".to_string()));
}

#[tokio::test]
async fn close_then_next_message_loads_on_requeue() {
    let (store, _) = store();
    identify(&store).await;

    let m1 = queued("m1", "q1", 1);
    let m2 = queued("m2", "q2", 2);
    store.dispatch(Action::ProcessMessageQueue(vec![m1.clone(), m2.clone()])).await.unwrap();
    store.dispatch(Action::DisplayMessage(m1.clone())).await.unwrap();
    store
        .dispatch(Action::DismissMessage { message: m1.clone(), should_log: true, via_close_action: true })
        .await
        .unwrap();

    // The server re-sends the full queue, including the shown message.
    store.dispatch(Action::ProcessMessageQueue(vec![m1, m2.clone()])).await.unwrap();

    let state = store.state();
    assert_eq!(state.current_message_state, ModalMessageState::Loading(m2.clone()));
    assert_eq!(state.messages_in_queue.iter().collect::<Vec<_>>(), [&m2]);
}

#[tokio::test]
async fn inline_message_is_embedded() {
    let (store, recorder) = store();
    identify(&store).await;

    let banner = queued("m1", "q1", 1).with_element_id("banner");
    store.dispatch(Action::ProcessMessageQueue(vec![banner.clone()])).await.unwrap();

    assert!(matches!(
        store.state().embedded_messages_state.get("banner"),
        Some(InlineMessageState::ReadyToEmbed { .. })
    ));
    assert_eq!(recorder.events(), ["embed:m1:banner"]);

    // Repeated deliveries do not re-embed.
    store.dispatch(Action::ProcessMessageQueue(vec![banner])).await.unwrap();
    assert_eq!(recorder.events().len(), 1);
}

#[tokio::test]
async fn loading_failure_frees_the_modal_slot() {
    let (store, recorder) = store();
    identify(&store).await;

    let m1 = queued("m1", "q1", 1);
    store.dispatch(Action::ProcessMessageQueue(vec![m1.clone()])).await.unwrap();
    store.dispatch(Action::EngineAction(EngineAction::MessageLoadingFailed(m1.clone()))).await.unwrap();

    assert_eq!(store.state().current_message_state, ModalMessageState::Dismissed(m1));
    assert!(recorder.events().contains(&"error:m1".to_string()));
}
