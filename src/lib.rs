pub mod auth;
pub mod backend;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod logging;
pub mod models;
pub mod registration;
pub mod session;
pub mod study;


pub use auth::LoginForm;
pub use backend::{HttpBackend, StudyBackend};
pub use config::{Config, FeatureFlags};
pub use dashboard::Dashboard;
pub use errors::*;
pub use models::*;
pub use registration::{RegistrationStep, RegistrationWizard, StepOutcome};
pub use session::{guard_route, Route, SessionContext};
pub use study::{NextQuestion, SessionPhase, StudySessionController};
