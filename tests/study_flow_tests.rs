mod common;

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use common::{spawn_backend, PASSWORD, USER_ID};
use study_companion::config::BackendConfig;
use study_companion::study::NO_MORE_FLASHCARDS;
use study_companion::{
    guard_route, ClientError, Dashboard, FeatureFlags, HttpBackend, LoginForm, NextQuestion, Route,
    SessionContext, SessionPhase, StudyMode, StudySessionController,
};

#[tokio::test]
async fn test_login_to_graded_answer() {
    let (url, mock) = spawn_backend().await;
    let backend = Arc::new(
        HttpBackend::new(&BackendConfig {
            base_url: url,
            request_timeout: None,
        })
        .unwrap(),
    );

    let mut session = SessionContext::new();
    assert_eq!(guard_route(Route::Dashboard, &session), Route::Login);
    LoginForm::new("learner@example.com", PASSWORD)
        .submit(backend.as_ref(), &mut session)
        .await
        .unwrap();
    assert_eq!(guard_route(Route::Root, &session), Route::Dashboard);

    let mut dashboard = Dashboard::new();
    dashboard.refresh(backend.as_ref()).await.unwrap();
    let route = dashboard.open_class(&session, "c1").unwrap();
    let Route::Class(class_id) = route else {
        panic!("expected class route");
    };

    let mut controller =
        StudySessionController::new(backend.clone(), &session, FeatureFlags::default()).unwrap();
    let progress = controller.load_class(&class_id).await.unwrap();
    assert_eq!(progress.class.name, "CSC111");
    assert_eq!(progress.understanding, 78);

    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("graphs.pdf");
    std::fs::File::create(&notes)
        .unwrap()
        .write_all(b"%PDF-1.4")
        .unwrap();

    let outcome = controller.upload_material("graphs", &notes).await.unwrap();
    assert_eq!(outcome.queued, 2);
    assert_eq!(controller.struggling_topic(), Some("Graphs"));
    assert_eq!(mock.last_form().fields["user_id"], USER_ID);

    let NextQuestion::FromQueue(card) = controller.request_next_question() else {
        panic!("expected a queued flashcard");
    };
    assert_eq!(card.id, "f2");

    controller.set_answer_draft("vertices and edges");
    let verdict = controller.submit_answer("vertices and edges").await.unwrap();
    assert!(verdict.correct);
    assert_eq!(controller.display_text(), "Correct!");
    assert_eq!(controller.phase(), SessionPhase::AwaitingQuestion);

    let form = mock.last_form();
    assert_eq!(form.fields["chat_id"], "c1");
    assert_eq!(form.fields["flashcard_id"], "f2");

    controller.request_next_question();
    controller.submit_answer("a cycle").await.unwrap();
    assert_eq!(
        controller.display_text(),
        "Incorrect. The correct answer is: vertices and edges"
    );

    assert!(matches!(controller.request_next_question(), NextQuestion::Recommended(_)));
    assert_eq!(controller.request_next_question(), NextQuestion::Exhausted);
    assert_eq!(controller.display_text(), NO_MORE_FLASHCARDS);

    controller.toggle_mode().unwrap();
    controller.upload_material("graphs", &notes).await.unwrap();
    assert_eq!(controller.mode(), StudyMode::Review);
    assert_eq!(mock.last_form().path, "/question/review");
    assert!(controller.struggling_topic().is_none());
    assert_eq!(controller.uploaded_files().len(), 2);

    session.end();
    assert_eq!(guard_route(Route::Class(class_id), &session), Route::Login);
}

#[tokio::test]
async fn test_load_error_is_shown_inline() {
    let (url, _mock) = spawn_backend().await;
    let backend = Arc::new(
        HttpBackend::new(&BackendConfig {
            base_url: url,
            request_timeout: None,
        })
        .unwrap(),
    );
    let mut session = SessionContext::new();
    session.begin(USER_ID, "learner@example.com");

    let mut controller =
        StudySessionController::new(backend, &session, FeatureFlags::default()).unwrap();
    assert!(controller.load_class("c404").await.is_err());
    assert_eq!(controller.phase(), SessionPhase::Error);
    assert_eq!(
        controller.load_error(),
        Some("Error: Resource not found: Class not found")
    );
}

/// Counts this crate's events that carry an `error` field
struct ErrorEventCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for ErrorEventCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let ours = event.metadata().target().starts_with("study_companion");
        if ours && event.fields().any(|field| field.name() == "error") {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[tokio::test]
async fn test_backend_failure_is_logged_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(ErrorEventCounter(count.clone()));
    let _guard = tracing::subscriber::set_default(subscriber);

    let (url, _mock) = spawn_backend().await;
    let backend = HttpBackend::new(&BackendConfig {
        base_url: url,
        request_timeout: None,
    })
    .unwrap();

    let mut dashboard = Dashboard::new();
    let err = dashboard.delete_class(&backend, "missing").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
    assert_eq!(count.load(Ordering::SeqCst), 1);

    let mut session = SessionContext::new();
    session.begin(USER_ID, "learner@example.com");
    let mut controller =
        StudySessionController::new(Arc::new(backend), &session, FeatureFlags::default()).unwrap();
    assert!(controller.load_class("c404").await.is_err());
    assert_eq!(count.load(Ordering::SeqCst), 2);
}
