use crate::backend::StudyBackend;
use crate::errors::{ClientError, ErrorContext};
use crate::models::ClassSummary;
use crate::session::{Route, SessionContext};

// Import logging macros
use crate::log_validation;

/// Classes the learner has joined, as last fetched from the backend
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    classes: Vec<ClassSummary>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classes(&self) -> &[ClassSummary] {
        &self.classes
    }

    pub async fn refresh<B: StudyBackend + ?Sized>(&mut self, backend: &B) -> Result<&[ClassSummary], ClientError> {
        self.classes = backend
            .list_classes()
            .await
            .map_err(|e| e.logged(ErrorContext::new("list_classes", "class")))?;
        Ok(self.classes.as_slice())
    }

    /// Create (or join) a class and add it to the local list
    pub async fn create_class<B: StudyBackend + ?Sized>(
        &mut self,
        backend: &B,
        name: &str,
    ) -> Result<ClassSummary, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            log_validation!(failure, "create_class", error = "class name is empty");
            return Err(ClientError::Validation("Class name is required".to_string()));
        }

        let id = backend
            .create_class(name)
            .await
            .map_err(|e| e.logged(ErrorContext::new("create_class", "class")))?;

        let class = ClassSummary {
            id,
            name: name.to_string(),
        };
        self.classes.push(class.clone());
        Ok(class)
    }

    pub async fn delete_class<B: StudyBackend + ?Sized>(
        &mut self,
        backend: &B,
        class_id: &str,
    ) -> Result<(), ClientError> {
        backend
            .delete_class(class_id)
            .await
            .map_err(|e| e.logged(ErrorContext::new("delete_class", "class").with_id(class_id)))?;
        self.classes.retain(|class| class.id != class_id);
        Ok(())
    }

    /// Route to a class page; requires a session and a class from the list
    pub fn open_class(&self, session: &SessionContext, class_id: &str) -> Result<Route, ClientError> {
        session.user_id()?;
        self.classes
            .iter()
            .find(|class| class.id == class_id)
            .map(|class| Route::Class(class.id.clone()))
            .ok_or_else(|| ClientError::NotFound(format!("class '{}' is not on the dashboard", class_id)))
    }
}
