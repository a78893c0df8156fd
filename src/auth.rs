use crate::backend::StudyBackend;
use crate::errors::{ClientError, ErrorContext};
use crate::models::LoginRequest;
use crate::session::SessionContext;

// Import logging macros
use crate::log_validation;

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let problem = if self.email.trim().is_empty() {
            Some("Email is required")
        } else if self.password.is_empty() {
            Some("Password is required")
        } else {
            None
        };

        match problem {
            Some(message) => {
                log_validation!(failure, "login", error = message);
                Err(ClientError::Validation(message.to_string()))
            }
            None => Ok(()),
        }
    }

    /// Authenticate and populate the session context with the returned user id
    pub async fn submit<B: StudyBackend + ?Sized>(
        &self,
        backend: &B,
        session: &mut SessionContext,
    ) -> Result<(), ClientError> {
        self.validate()?;

        let email = self.email.trim().to_string();
        let request = LoginRequest {
            email: email.clone(),
            password: self.password.clone(),
        };

        let response = backend
            .login(&request)
            .await
            .map_err(|e| e.logged(ErrorContext::new("login", "user").with_id(&email)))?;

        session.begin(response.user_id, email);
        Ok(())
    }
}
