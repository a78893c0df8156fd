use std::path::Path;
use std::sync::Arc;

use crate::backend::StudyBackend;
use crate::config::FeatureFlags;
use crate::errors::{ClientError, ErrorContext};
use crate::models::*;
use crate::session::SessionContext;

// Import logging macros
use crate::{log_session_event, log_validation};

pub const DEFAULT_DISPLAY_TEXT: &str = "AI response will appear here...";
pub const NO_MORE_FLASHCARDS: &str = "No more flashcards.";
pub const CORRECT_FEEDBACK: &str = "Correct!";
/// Understanding shown before the backend reports one
pub const DEFAULT_UNDERSTANDING: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loaded,
    AwaitingQuestion,
    QuestionDisplayed,
    AnswerEntered,
    Submitting,
    Error,
}

/// Where the next question came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextQuestion {
    FromQueue(Flashcard),
    Recommended(Flashcard),
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub queued: usize,
    pub has_recommendation: bool,
    pub struggling_topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoadState {
    Idle,
    Loaded,
    Failed(String),
}

/// Drives one class page: the flashcard queue, the answer draft, the
/// study/review mode and the calls to the grading backend.
///
/// State lives only as long as the controller. Every operation takes
/// `&mut self`, so a single controller never has two requests in flight.
pub struct StudySessionController {
    backend: Arc<dyn StudyBackend>,
    user_id: String,
    features: FeatureFlags,

    load_state: LoadState,
    class: Option<ClassSummary>,
    understanding: u8,

    queue: Vec<Flashcard>,
    recommended: Option<Flashcard>,
    current: Option<Flashcard>,
    has_material: bool,

    answer_draft: String,
    answer_error: bool,
    display_text: String,
    in_flight: Option<String>,

    mode: StudyMode,
    struggling_topic: Option<String>,
    uploaded_files: Vec<UploadedFileRef>,
    last_error: Option<String>,
}

impl StudySessionController {
    /// The user id is resolved once from the session context
    pub fn new(
        backend: Arc<dyn StudyBackend>,
        session: &SessionContext,
        features: FeatureFlags,
    ) -> Result<Self, ClientError> {
        let user_id = session.user_id()?.to_string();

        Ok(Self {
            backend,
            user_id,
            features,
            load_state: LoadState::Idle,
            class: None,
            understanding: DEFAULT_UNDERSTANDING,
            queue: Vec::new(),
            recommended: None,
            current: None,
            has_material: false,
            answer_draft: String::new(),
            answer_error: false,
            display_text: DEFAULT_DISPLAY_TEXT.to_string(),
            in_flight: None,
            mode: StudyMode::default(),
            struggling_topic: None,
            uploaded_files: Vec::new(),
            last_error: None,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        match &self.load_state {
            LoadState::Failed(_) => return SessionPhase::Error,
            LoadState::Idle => return SessionPhase::Idle,
            LoadState::Loaded => {}
        }

        if self.in_flight.is_some() {
            return SessionPhase::Submitting;
        }

        match &self.current {
            Some(_) if self.answer_draft.trim().is_empty() => SessionPhase::QuestionDisplayed,
            Some(_) => SessionPhase::AnswerEntered,
            None if self.has_material => SessionPhase::AwaitingQuestion,
            None => SessionPhase::Loaded,
        }
    }

    /// Fetch class metadata and the understanding score. A failure is
    /// terminal for this load and is shown as `Error: <message>`.
    pub async fn load_class(&mut self, class_id: &str) -> Result<ClassProgress, ClientError> {
        self.reset_for_class();

        let loaded = async {
            let class = self.backend.get_class(class_id).await?;
            let understanding = self.backend.understanding(class_id).await?;
            Ok::<_, ClientError>(ClassProgress {
                class,
                understanding: understanding.min(100),
            })
        }
        .await;

        match loaded {
            Ok(progress) => {
                self.class = Some(progress.class.clone());
                self.understanding = progress.understanding;
                self.load_state = LoadState::Loaded;
                self.log_transition("load_class");
                Ok(progress)
            }
            Err(e) => {
                let e = e.logged(ErrorContext::new("load_class", "class").with_id(class_id));
                let message = format!("Error: {}", e);
                self.display_text = message.clone();
                self.load_state = LoadState::Failed(message);
                self.log_transition("load_class_failed");
                Err(e)
            }
        }
    }

    /// Serve the next question: queue first (last in, first out), then the
    /// recommended flashcard, then the terminal message. Never touches the
    /// network. Without a loaded class nothing changes, so an inline load
    /// error stays on screen.
    pub fn request_next_question(&mut self) -> NextQuestion {
        if self.load_state != LoadState::Loaded {
            return NextQuestion::Exhausted;
        }

        let next = if let Some(card) = self.queue.pop() {
            NextQuestion::FromQueue(card)
        } else if let Some(card) = self.recommended.take() {
            NextQuestion::Recommended(card)
        } else {
            NextQuestion::Exhausted
        };

        match &next {
            NextQuestion::FromQueue(card) | NextQuestion::Recommended(card) => {
                self.display_text = card.question.clone();
                self.current = Some(card.clone());
            }
            NextQuestion::Exhausted => {
                self.display_text = NO_MORE_FLASHCARDS.to_string();
                self.current = None;
            }
        }
        self.answer_draft.clear();
        self.answer_error = false;

        self.log_transition("next_question");
        next
    }

    pub fn set_answer_draft(&mut self, text: impl Into<String>) {
        self.answer_draft = text.into();
        if !self.answer_draft.trim().is_empty() {
            self.answer_error = false;
        }
    }

    /// Append recognized speech to the draft
    pub fn append_transcript(&mut self, transcript: &str) -> Result<&str, ClientError> {
        if !self.features.speech_input {
            return Err(ClientError::FeatureDisabled("speech input")
                .logged(ErrorContext::new("append_transcript", "answer")));
        }

        let transcript = transcript.trim();
        if !transcript.is_empty() {
            if !self.answer_draft.is_empty() && !self.answer_draft.ends_with(char::is_whitespace) {
                self.answer_draft.push(' ');
            }
            self.answer_draft.push_str(transcript);
            self.answer_error = false;
        }
        Ok(&self.answer_draft)
    }

    /// Grade `draft` against the current flashcard. Blank drafts are
    /// rejected locally and raise the validation flag.
    pub async fn submit_answer(&mut self, draft: &str) -> Result<AnswerVerdict, ClientError> {
        self.answer_draft = draft.to_string();

        if draft.trim().is_empty() {
            self.answer_error = true;
            log_validation!(failure, "answer", error = "answer is empty");
            return Err(ClientError::Validation("Please enter an answer".to_string()));
        }
        self.answer_error = false;

        let submission = {
            let class_id = self.class_id()?;
            let Some(card) = &self.current else {
                return Err(ClientError::Validation("There is no flashcard to answer".to_string())
                    .logged(ErrorContext::new("submit_answer", "flashcard")));
            };
            AnswerSubmission {
                chat_id: class_id.to_string(),
                user_id: self.user_id.clone(),
                flashcard_id: card.id.clone(),
                question: card.question.clone(),
                answer: draft.to_string(),
            }
        };

        self.in_flight = Some(submission.flashcard_id.clone());
        self.log_transition("submit_answer");
        let result = self.backend.submit_answer(&submission).await;
        self.in_flight = None;

        match result {
            Ok(verdict) => {
                self.display_text = feedback_text(&verdict);
                self.current = None;
                self.answer_draft.clear();
                self.last_error = None;
                self.log_transition("answer_graded");
                Ok(verdict)
            }
            Err(e) => {
                let context = ErrorContext::new("submit_answer", "flashcard")
                    .with_id(&submission.flashcard_id);
                let e = e.logged(context);
                self.last_error = Some(format!("Could not submit answer: {}", e));
                Err(e)
            }
        }
    }

    /// Send material to the backend in the current mode and take the
    /// returned queue and recommendation.
    pub async fn upload_material(
        &mut self,
        topic: &str,
        file: impl AsRef<Path>,
    ) -> Result<UploadOutcome, ClientError> {
        let topic = topic.trim();
        if topic.is_empty() {
            log_validation!(failure, "upload", error = "topic is empty");
            let message = "Please enter a topic";
            self.last_error = Some(message.to_string());
            return Err(ClientError::Validation(message.to_string()));
        }

        let upload = MaterialUpload {
            chat_id: self.class_id()?.to_string(),
            user_id: self.user_id.clone(),
            topic: topic.to_string(),
            file: file.as_ref().to_path_buf(),
            mode: self.mode,
        };

        let batch = match self.backend.request_questions(&upload).await {
            Ok(batch) => batch,
            Err(e) => {
                let context = ErrorContext::new("upload_material", "material")
                    .with_id(&upload.chat_id);
                let e = e.logged(context);
                self.last_error = Some(format!("Upload failed: {}", e));
                return Err(e);
            }
        };

        self.queue = batch.flashcards;
        self.recommended = batch.recommended;
        self.has_material = true;
        self.uploaded_files.push(UploadedFileRef::new(upload.file));
        self.struggling_topic = match self.mode {
            StudyMode::Study => batch.struggling_topic.filter(|topic| !topic.trim().is_empty()),
            StudyMode::Review => None,
        };
        self.last_error = None;

        if let Some(topic) = &self.struggling_topic {
            log_session_event!("struggling_topic", format!("backend flagged '{}'", topic));
        }
        self.log_transition("upload_material");

        Ok(UploadOutcome {
            queued: self.queue.len(),
            has_recommendation: self.recommended.is_some(),
            struggling_topic: self.struggling_topic.clone(),
        })
    }

    /// Flip study/review. Only changes where later uploads go.
    pub fn toggle_mode(&mut self) -> Result<StudyMode, ClientError> {
        if !self.features.review_mode {
            return Err(ClientError::FeatureDisabled("review mode")
                .logged(ErrorContext::new("toggle_mode", "session")));
        }
        self.mode = self.mode.toggled();
        log_session_event!("toggle_mode", format!("switched to {}", self.mode));
        Ok(self.mode)
    }

    pub fn remove_uploaded_file(&mut self, index: usize) -> Option<UploadedFileRef> {
        if index < self.uploaded_files.len() {
            Some(self.uploaded_files.remove(index))
        } else {
            None
        }
    }

    pub fn dismiss_struggling_topic(&mut self) -> Option<String> {
        self.struggling_topic.take()
    }

    pub fn class(&self) -> Option<&ClassSummary> {
        self.class.as_ref()
    }

    pub fn understanding(&self) -> u8 {
        self.understanding
    }

    pub fn load_error(&self) -> Option<&str> {
        match &self.load_state {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn current_flashcard(&self) -> Option<&Flashcard> {
        self.current.as_ref()
    }

    pub fn recommended_flashcard(&self) -> Option<&Flashcard> {
        self.recommended.as_ref()
    }

    pub fn queue(&self) -> &[Flashcard] {
        &self.queue
    }

    pub fn answer_draft(&self) -> &str {
        &self.answer_draft
    }

    pub fn answer_error(&self) -> bool {
        self.answer_error
    }

    /// Whether the answer button should be enabled
    pub fn can_submit(&self) -> bool {
        !self.answer_draft.trim().is_empty()
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    pub fn struggling_topic(&self) -> Option<&str> {
        self.struggling_topic.as_deref()
    }

    pub fn uploaded_files(&self) -> &[UploadedFileRef] {
        &self.uploaded_files
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn class_id(&self) -> Result<&str, ClientError> {
        self.class
            .as_ref()
            .map(|class| class.id.as_str())
            .ok_or_else(|| ClientError::Validation("No class is loaded".to_string()))
    }

    fn reset_for_class(&mut self) {
        self.load_state = LoadState::Idle;
        self.class = None;
        self.understanding = DEFAULT_UNDERSTANDING;
        self.queue.clear();
        self.recommended = None;
        self.current = None;
        self.has_material = false;
        self.answer_draft.clear();
        self.answer_error = false;
        self.display_text = DEFAULT_DISPLAY_TEXT.to_string();
        self.in_flight = None;
        self.struggling_topic = None;
        self.uploaded_files.clear();
        self.last_error = None;
    }

    fn log_transition(&self, event: &str) {
        let class_id = self.class.as_ref().map(|class| class.id.as_str());
        log_session_event!(event, class_id = class_id, phase = self.phase());
    }
}

/// Text shown on the card face after grading
pub fn feedback_text(verdict: &AnswerVerdict) -> String {
    if verdict.correct {
        return CORRECT_FEEDBACK.to_string();
    }
    match verdict.correct_answer.as_deref().map(str::trim) {
        Some(answer) if !answer.is_empty() => {
            format!("Incorrect. The correct answer is: {}", answer)
        }
        _ => "Incorrect.".to_string(),
    }
}
