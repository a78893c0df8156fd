use regex::Regex;
use std::sync::OnceLock;

use crate::backend::StudyBackend;
use crate::errors::{ClientError, ErrorContext};
use crate::models::RegisterRequest;

// Import logging macros
use crate::log_validation;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RegistrationStep {
    Email,
    Username,
    Password,
    Confirm,
}

impl RegistrationStep {
    fn next(self) -> Option<Self> {
        match self {
            RegistrationStep::Email => Some(RegistrationStep::Username),
            RegistrationStep::Username => Some(RegistrationStep::Password),
            RegistrationStep::Password => Some(RegistrationStep::Confirm),
            RegistrationStep::Confirm => None,
        }
    }

    fn previous(self) -> Option<Self> {
        match self {
            RegistrationStep::Email => None,
            RegistrationStep::Username => Some(RegistrationStep::Email),
            RegistrationStep::Password => Some(RegistrationStep::Username),
            RegistrationStep::Confirm => Some(RegistrationStep::Password),
        }
    }

    pub fn error_message(self) -> &'static str {
        match self {
            RegistrationStep::Email => "Please enter a valid email.",
            RegistrationStep::Username => "Please enter a valid username.",
            RegistrationStep::Password => {
                "Please enter a strong password (at least 8 characters, including letters and numbers)."
            }
            RegistrationStep::Confirm => "Passwords do not match.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationField {
    Email,
    Username,
    Password,
    ConfirmPassword,
}

/// What happened after pressing OK on a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Advanced(RegistrationStep),
    Invalid(&'static str),
    Ready(RegisterRequest),
}

/// Four-step registration form: email, username, password, confirmation
#[derive(Debug, Clone)]
pub struct RegistrationWizard {
    step: RegistrationStep,
    email: String,
    username: String,
    password: String,
    confirm_password: String,
    error_message: Option<&'static str>,
}

impl Default for RegistrationWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationWizard {
    pub fn new() -> Self {
        Self {
            step: RegistrationStep::Email,
            email: String::new(),
            username: String::new(),
            password: String::new(),
            confirm_password: String::new(),
            error_message: None,
        }
    }

    pub fn step(&self) -> RegistrationStep {
        self.step
    }

    pub fn error_message(&self) -> Option<&'static str> {
        self.error_message
    }

    /// Editing any field dismisses the current error
    pub fn set_field(&mut self, field: RegistrationField, value: impl Into<String>) {
        let value = value.into();
        match field {
            RegistrationField::Email => self.email = value,
            RegistrationField::Username => self.username = value,
            RegistrationField::Password => self.password = value,
            RegistrationField::ConfirmPassword => self.confirm_password = value,
        }
        self.error_message = None;
    }

    /// Set the field belonging to the current step
    pub fn set_current(&mut self, value: impl Into<String>) {
        let field = match self.step {
            RegistrationStep::Email => RegistrationField::Email,
            RegistrationStep::Username => RegistrationField::Username,
            RegistrationStep::Password => RegistrationField::Password,
            RegistrationStep::Confirm => RegistrationField::ConfirmPassword,
        };
        self.set_field(field, value);
    }

    pub fn is_current_step_valid(&self) -> bool {
        match self.step {
            RegistrationStep::Email => !self.email.trim().is_empty(),
            RegistrationStep::Username => !self.username.trim().is_empty(),
            RegistrationStep::Password => is_strong_password(&self.password),
            RegistrationStep::Confirm => {
                !self.confirm_password.trim().is_empty() && self.confirm_password == self.password
            }
        }
    }

    pub fn advance(&mut self) -> StepOutcome {
        if !self.is_current_step_valid() {
            let message = self.step.error_message();
            log_validation!(failure, "registration", error = message);
            self.error_message = Some(message);
            return StepOutcome::Invalid(message);
        }

        self.error_message = None;
        match self.step.next() {
            Some(next) => {
                log_validation!(success, "registration", format!("{:?} accepted", self.step));
                self.step = next;
                StepOutcome::Advanced(next)
            }
            None => StepOutcome::Ready(RegisterRequest {
                email: self.email.trim().to_string(),
                username: self.username.trim().to_string(),
                password: self.password.clone(),
            }),
        }
    }

    pub fn back(&mut self) -> RegistrationStep {
        self.error_message = None;
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Validate the final step and post the account to the backend
    pub async fn submit<B: StudyBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<RegisterRequest, ClientError> {
        let request = match self.advance() {
            StepOutcome::Ready(request) => request,
            StepOutcome::Invalid(message) => {
                return Err(ClientError::Validation(message.to_string()));
            }
            StepOutcome::Advanced(step) => {
                return Err(ClientError::Validation(format!(
                    "Registration is not complete, continue with {:?}",
                    step
                )));
            }
        };

        backend
            .register(&request)
            .await
            .map_err(|e| e.logged(ErrorContext::new("register", "user").with_id(&request.email)))?;
        Ok(request)
    }
}

fn password_charset() -> &'static Regex {
    static CHARSET: OnceLock<Regex> = OnceLock::new();
    CHARSET.get_or_init(|| Regex::new(r"^[A-Za-z\d]+$").expect("password pattern is valid"))
}

/// At least eight ASCII letters or digits, with one of each
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
        && password_charset().is_match(password)
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wizard_at_password() -> RegistrationWizard {
        let mut wizard = RegistrationWizard::new();
        wizard.set_current("learner@example.com");
        assert_eq!(wizard.advance(), StepOutcome::Advanced(RegistrationStep::Username));
        wizard.set_current("learner");
        assert_eq!(wizard.advance(), StepOutcome::Advanced(RegistrationStep::Password));
        wizard
    }

    #[test]
    fn test_password_strength() {
        assert!(is_strong_password("abcdefg1"));
        assert!(is_strong_password("12345abc"));
        assert!(!is_strong_password("abc123"));
        assert!(!is_strong_password("abcdefgh"));
        assert!(!is_strong_password("12345678"));
        assert!(!is_strong_password("abcd 1234"));
    }

    #[test]
    fn test_empty_email_is_rejected() {
        let mut wizard = RegistrationWizard::new();
        wizard.set_current("   ");
        assert_eq!(
            wizard.advance(),
            StepOutcome::Invalid("Please enter a valid email.")
        );
        assert_eq!(wizard.step(), RegistrationStep::Email);
        assert!(wizard.error_message().is_some());

        wizard.set_current("a@b.c");
        assert!(wizard.error_message().is_none());
    }

    #[test]
    fn test_weak_password_blocks_step() {
        let mut wizard = wizard_at_password();
        for weak in ["short1", "onlyletters", "0123456789"] {
            wizard.set_current(weak);
            assert!(matches!(wizard.advance(), StepOutcome::Invalid(_)), "{} accepted", weak);
            assert_eq!(wizard.step(), RegistrationStep::Password);
        }
    }

    #[test]
    fn test_confirmation_must_match() {
        let mut wizard = wizard_at_password();
        wizard.set_current("secret123");
        assert_eq!(wizard.advance(), StepOutcome::Advanced(RegistrationStep::Confirm));

        wizard.set_current("secret124");
        assert_eq!(wizard.advance(), StepOutcome::Invalid("Passwords do not match."));

        wizard.set_current("secret123");
        match wizard.advance() {
            StepOutcome::Ready(request) => {
                assert_eq!(request.email, "learner@example.com");
                assert_eq!(request.username, "learner");
                assert_eq!(request.password, "secret123");
            }
            other => panic!("expected ready, got {:?}", other),
        }
    }

    #[test]
    fn test_back_clears_error_and_stops_at_first_step() {
        let mut wizard = wizard_at_password();
        wizard.set_current("weak");
        wizard.advance();
        assert!(wizard.error_message().is_some());

        assert_eq!(wizard.back(), RegistrationStep::Username);
        assert!(wizard.error_message().is_none());
        assert_eq!(wizard.back(), RegistrationStep::Email);
        assert_eq!(wizard.back(), RegistrationStep::Email);
    }
}
