use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "className")]
    pub name: String,
}

/// A generated question. The correct answer stays on the server and only
/// comes back as part of a grading response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub question: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    #[default]
    Study,
    Review,
}

impl StudyMode {
    pub fn toggled(self) -> Self {
        match self {
            StudyMode::Study => StudyMode::Review,
            StudyMode::Review => StudyMode::Study,
        }
    }

    /// Path segment of the upload endpoint for this mode
    pub fn as_str(self) -> &'static str {
        match self {
            StudyMode::Study => "study",
            StudyMode::Review => "review",
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file the learner uploaded during this session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFileRef {
    pub id: Uuid,
    pub path: PathBuf,
    pub display_name: String,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadedFileRef {
    pub fn new(path: PathBuf) -> Self {
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            id: Uuid::new_v4(),
            path,
            display_name,
            uploaded_at: Utc::now(),
        }
    }
}

// Request/response bodies exchanged with the backend

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClassRequest {
    #[serde(rename = "className")]
    pub class_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClassResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub class_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderstandingResponse {
    pub understanding: f64,
}

/// Everything the controller needs to render a class page
#[derive(Debug, Clone, PartialEq)]
pub struct ClassProgress {
    pub class: ClassSummary,
    /// Percentage in 0..=100
    pub understanding: u8,
}

/// Result of uploading material in either mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBatch {
    #[serde(default)]
    pub flashcards: Vec<Flashcard>,
    #[serde(default)]
    pub recommended: Option<Flashcard>,
    #[serde(default)]
    pub struggling_topic: Option<String>,
}

/// Upload of study material, sent as multipart form data
#[derive(Debug, Clone)]
pub struct MaterialUpload {
    pub chat_id: String,
    pub user_id: String,
    pub topic: String,
    pub file: PathBuf,
    pub mode: StudyMode,
}

/// Answer to a flashcard, sent as multipart form data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub chat_id: String,
    pub user_id: String,
    pub flashcard_id: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerVerdict {
    pub correct: bool,
    #[serde(default)]
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendErrorBody {
    pub error: String,
}
