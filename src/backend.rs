use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::config::BackendConfig;
use crate::errors::{classify_status, ClientError};
use crate::models::*;

// Import logging macros
use crate::{log_backend_start, log_backend_success};

const UPLOAD_MIME: &str = "application/pdf";

/// Every remote call the client makes. Implemented over HTTP by
/// [`HttpBackend`]; tests substitute an in-memory fake.
#[async_trait]
pub trait StudyBackend: Send + Sync {
    async fn list_classes(&self) -> Result<Vec<ClassSummary>, ClientError>;
    async fn create_class(&self, class_name: &str) -> Result<String, ClientError>;
    async fn get_class(&self, class_id: &str) -> Result<ClassSummary, ClientError>;
    async fn delete_class(&self, class_id: &str) -> Result<(), ClientError>;
    async fn understanding(&self, class_id: &str) -> Result<u8, ClientError>;
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ClientError>;
    async fn register(&self, request: &RegisterRequest) -> Result<(), ClientError>;
    async fn request_questions(&self, upload: &MaterialUpload) -> Result<QuestionBatch, ClientError>;
    async fn submit_answer(&self, submission: &AnswerSubmission) -> Result<AnswerVerdict, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .map_err(|e| ClientError::Validation(format!("Invalid backend URL '{}': {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::Validation(format!(
                "Invalid backend URL '{}': cannot hold a path",
                base_url
            )));
        }

        Ok(Self {
            client,
            base,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join path segments onto the base URL. Each segment is percent-encoded,
    /// so an id cannot escape into another path or the query string.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Check the status and decode a JSON body. Callers log the error with
    /// their own context.
    async fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        serde_json::from_str::<T>(&body).map_err(|e| ClientError::Decode(format!("{}: {}", operation, e)))
    }

    async fn file_part(upload: &MaterialUpload) -> Result<Part, ClientError> {
        let bytes = tokio::fs::read(&upload.file).await?;
        let file_name = upload
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());

        Ok(Part::bytes(bytes).file_name(file_name).mime_str(UPLOAD_MIME)?)
    }
}

#[async_trait]
impl StudyBackend for HttpBackend {
    async fn list_classes(&self) -> Result<Vec<ClassSummary>, ClientError> {
        log_backend_start!("list_classes");
        let response = self.client.get(self.url(&["classes"])).send().await?;
        let classes: Vec<ClassSummary> = Self::decode("list_classes", response).await?;
        log_backend_success!("list_classes", count = classes.len(), "classes fetched");
        Ok(classes)
    }

    async fn create_class(&self, class_name: &str) -> Result<String, ClientError> {
        log_backend_start!("create_class");
        let body = CreateClassRequest {
            class_name: class_name.to_string(),
        };
        let response = self.client.post(self.url(&["classes"])).json(&body).send().await?;
        let created: CreateClassResponse = Self::decode("create_class", response).await?;
        log_backend_success!("create_class", class_id = created.class_id, "class created");
        Ok(created.class_id)
    }

    async fn get_class(&self, class_id: &str) -> Result<ClassSummary, ClientError> {
        log_backend_start!("get_class", class_id = class_id);
        let response = self
            .client
            .get(self.url(&["classes", class_id]))
            .send()
            .await?;
        Self::decode("get_class", response).await
    }

    async fn delete_class(&self, class_id: &str) -> Result<(), ClientError> {
        log_backend_start!("delete_class", class_id = class_id);
        let response = self
            .client
            .delete(self.url(&["classes", class_id]))
            .send()
            .await?;
        let _: MessageResponse = Self::decode("delete_class", response).await?;
        log_backend_success!("delete_class", class_id = class_id, "class deleted");
        Ok(())
    }

    async fn understanding(&self, class_id: &str) -> Result<u8, ClientError> {
        log_backend_start!("understanding", class_id = class_id);
        let response = self
            .client
            .get(self.url(&["classes", class_id, "understanding"]))
            .send()
            .await?;
        let parsed: UnderstandingResponse = Self::decode("understanding", response).await?;
        if !parsed.understanding.is_finite() {
            return Err(ClientError::Decode("understanding is not a number".to_string()));
        }
        Ok(parsed.understanding.round().clamp(0.0, 100.0) as u8)
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ClientError> {
        log_backend_start!("login");
        let response = self
            .client
            .post(self.url(&["users", "login"]))
            .json(request)
            .send()
            .await?;
        let login: LoginResponse = Self::decode("login", response).await?;
        log_backend_success!("login", "credentials accepted");
        Ok(login)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), ClientError> {
        log_backend_start!("register");
        let response = self
            .client
            .post(self.url(&["users", "register"]))
            .json(request)
            .send()
            .await?;
        let _: MessageResponse = Self::decode("register", response).await?;
        log_backend_success!("register", "account created");
        Ok(())
    }

    async fn request_questions(&self, upload: &MaterialUpload) -> Result<QuestionBatch, ClientError> {
        log_backend_start!("request_questions", class_id = upload.chat_id);
        let form = Form::new()
            .text("chat_id", upload.chat_id.clone())
            .text("user_id", upload.user_id.clone())
            .text("user_request", upload.topic.clone())
            .part("pdfs", Self::file_part(upload).await?);

        let response = self
            .client
            .post(self.url(&["question", upload.mode.as_str()]))
            .multipart(form)
            .send()
            .await?;
        let batch: QuestionBatch = Self::decode("request_questions", response).await?;
        log_backend_success!("request_questions", count = batch.flashcards.len(), "flashcards generated");
        Ok(batch)
    }

    async fn submit_answer(&self, submission: &AnswerSubmission) -> Result<AnswerVerdict, ClientError> {
        log_backend_start!("submit_answer", flashcard_id = submission.flashcard_id);
        let form = Form::new()
            .text("chat_id", submission.chat_id.clone())
            .text("user_id", submission.user_id.clone())
            .text("flashcard_id", submission.flashcard_id.clone())
            .text("question", submission.question.clone())
            .text("answer", submission.answer.clone());

        let response = self
            .client
            .post(self.url(&["answer"]))
            .multipart(form)
            .send()
            .await?;
        let verdict: AnswerVerdict = Self::decode("submit_answer", response).await?;
        log_backend_success!("submit_answer", "answer graded");
        Ok(verdict)
    }
}
