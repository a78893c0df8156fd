use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use study_companion::config::LoggingConfig;
use study_companion::registration::{RegistrationStep, StepOutcome};
use study_companion::{
    guard_route, log_system_event, ClientError, Config, Dashboard, FeatureFlags, HttpBackend,
    LoginForm, NextQuestion, RegistrationWizard, Route, SessionContext, StudySessionController,
};

const HELP: &str = "\
Commands:
  login <email> <password>   log in
  register                   create an account (type :back or :cancel while registering)
  logout                     end the session
  classes                    list your classes
  create <name>              create or join a class
  delete <class id>          remove a class
  open <class id>            open a class study page
  upload <file> <topic>      upload material for the open class
  next                       show the next flashcard
  answer <text>              answer the current flashcard
  say <text>                 dictate text into the answer draft
  mode                       switch between study and review
  dismiss                    hide the struggling-topic notice
  files                      list uploaded files
  remove <index>             remove an uploaded file from the list
  status                     show the study page
  help                       show this help
  quit                       exit";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logging first so configuration loading is captured
    let _guard = setup_logging(&LoggingConfig::from_env())?;
    let config = Config::from_env()?;
    config.validate()?;

    log_system_event!(startup, component = "cli", "Starting study companion");

    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    info!(backend_url = %backend.base_url(), "Backend client ready");

    let mut app = App::new(backend, config.features);
    println!("Study companion connected to {}. Type `help` for commands.", app.backend.base_url());
    app.navigate(Route::Root);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(app.prompt().as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if !app.handle(line.trim()).await {
            break;
        }
    }

    log_system_event!(shutdown, component = "cli", "Study companion exiting");
    Ok(())
}

fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt;

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Console output goes to stderr so it does not interleave with the prompt
    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
    });

    let (file_layer, guard) = if config.file_enabled {
        std::fs::create_dir_all(&config.log_directory).unwrap_or_else(|e| {
            eprintln!("Warning: Could not create logs directory: {}", e);
        });
        let file_appender = tracing_appender::rolling::daily(&config.log_directory, "study-companion.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking_file);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!(
        log_directory = %config.log_directory,
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(guard)
}

struct App {
    backend: Arc<HttpBackend>,
    features: FeatureFlags,
    session: SessionContext,
    dashboard: Dashboard,
    study: Option<StudySessionController>,
    registration: Option<RegistrationWizard>,
    route: Route,
}

impl App {
    fn new(backend: Arc<HttpBackend>, features: FeatureFlags) -> Self {
        Self {
            backend,
            features,
            session: SessionContext::new(),
            dashboard: Dashboard::new(),
            study: None,
            registration: None,
            route: Route::Root,
        }
    }

    fn prompt(&self) -> String {
        match &self.registration {
            Some(wizard) => format!("{}> ", step_label(wizard.step())),
            None => format!("{}> ", self.route),
        }
    }

    fn navigate(&mut self, requested: Route) {
        let route = guard_route(requested, &self.session);
        if !matches!(route, Route::Class(_)) {
            self.study = None;
        }
        if route == Route::Login {
            println!("Please log in (or `register`).");
        }
        self.route = route;
    }

    /// Returns false when the user asked to quit
    async fn handle(&mut self, line: &str) -> bool {
        if self.registration.is_some() {
            self.handle_registration(line).await;
            return true;
        }
        if line.is_empty() {
            return true;
        }

        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let result = match command {
            "quit" | "exit" => return false,
            "help" => {
                println!("{}", HELP);
                Ok(())
            }
            "login" => self.login(rest).await,
            "register" => {
                self.registration = Some(RegistrationWizard::new());
                self.route = Route::Register;
                Ok(())
            }
            "logout" => {
                self.session.end();
                self.dashboard = Dashboard::new();
                self.navigate(Route::Root);
                Ok(())
            }
            "classes" => self.list_classes().await,
            "create" => self.create_class(rest).await,
            "delete" => self.delete_class(rest).await,
            "open" => self.open_class(rest).await,
            "upload" => self.upload(rest).await,
            "next" => self.next_question(),
            "answer" => self.answer(rest).await,
            "say" => self.say(rest),
            "mode" => self.toggle_mode(),
            "dismiss" => self.dismiss_notice(),
            "files" => self.list_files(),
            "remove" => self.remove_file(rest),
            "status" => self.status(),
            other => {
                println!("Unknown command '{}'. Type `help` for commands.", other);
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("{}", describe(&e));
        }
        true
    }

    async fn handle_registration(&mut self, line: &str) {
        let Some(wizard) = self.registration.as_mut() else {
            return;
        };

        match line {
            ":cancel" => {
                self.registration = None;
                self.navigate(Route::Login);
                return;
            }
            ":back" => {
                wizard.back();
                return;
            }
            value => wizard.set_current(value),
        }

        if wizard.step() == RegistrationStep::Confirm && wizard.is_current_step_valid() {
            let submitted = wizard.submit(self.backend.as_ref()).await;
            match submitted {
                Ok(request) => {
                    println!("Account created for {}. You can log in now.", request.email);
                    self.registration = None;
                    self.navigate(Route::Login);
                }
                Err(e) => println!("{}", describe(&e)),
            }
            return;
        }

        match wizard.advance() {
            StepOutcome::Advanced(_) | StepOutcome::Ready(_) => {}
            StepOutcome::Invalid(message) => println!("{}", message),
        }
    }

    async fn login(&mut self, args: &str) -> Result<(), ClientError> {
        let (email, password) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
        LoginForm::new(email, password.trim())
            .submit(self.backend.as_ref(), &mut self.session)
            .await?;
        println!("Welcome back.");
        self.navigate(Route::Root);
        self.list_classes().await
    }

    async fn list_classes(&mut self) -> Result<(), ClientError> {
        self.session.user_id()?;
        let classes = self.dashboard.refresh(self.backend.as_ref()).await?;
        if classes.is_empty() {
            println!("You have not joined any classes yet.");
        }
        for class in classes {
            println!("  {}  {}", class.id, class.name);
        }
        Ok(())
    }

    async fn create_class(&mut self, name: &str) -> Result<(), ClientError> {
        self.session.user_id()?;
        let class = self.dashboard.create_class(self.backend.as_ref(), name).await?;
        println!("Created {} ({})", class.name, class.id);
        Ok(())
    }

    async fn delete_class(&mut self, class_id: &str) -> Result<(), ClientError> {
        self.session.user_id()?;
        self.dashboard.delete_class(self.backend.as_ref(), class_id).await?;
        if self.route == Route::Class(class_id.to_string()) {
            self.navigate(Route::Dashboard);
        }
        println!("Deleted class {}", class_id);
        Ok(())
    }

    async fn open_class(&mut self, class_id: &str) -> Result<(), ClientError> {
        if self.dashboard.classes().is_empty() {
            self.dashboard.refresh(self.backend.as_ref()).await?;
        }
        let route = self.dashboard.open_class(&self.session, class_id)?;
        self.navigate(route);

        let mut controller =
            StudySessionController::new(self.backend.clone(), &self.session, self.features)?;
        let result = controller.load_class(class_id).await;
        self.study = Some(controller);
        result?;
        self.status()
    }

    fn study(&mut self) -> Result<&mut StudySessionController, ClientError> {
        self.study
            .as_mut()
            .ok_or_else(|| ClientError::Validation("Open a class first".to_string()))
    }

    async fn upload(&mut self, args: &str) -> Result<(), ClientError> {
        let (file, topic) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
        if file.is_empty() {
            return Err(ClientError::Validation("Usage: upload <file> <topic>".to_string()));
        }
        let study = self.study()?;
        let outcome = study.upload_material(topic, file).await?;
        println!(
            "Uploaded in {} mode: {} flashcards queued{}",
            study.mode(),
            outcome.queued,
            if outcome.has_recommendation { ", plus a recommendation" } else { "" }
        );
        if let Some(topic) = outcome.struggling_topic {
            println!("Heads up: you seem to be struggling with {}.", topic);
        }
        Ok(())
    }

    fn next_question(&mut self) -> Result<(), ClientError> {
        let study = self.study()?;
        match study.request_next_question() {
            NextQuestion::FromQueue(card) => println!("Q: {}", card.question),
            NextQuestion::Recommended(card) => println!("Recommended Q: {}", card.question),
            NextQuestion::Exhausted => println!("{}", study.display_text()),
        }
        Ok(())
    }

    async fn answer(&mut self, text: &str) -> Result<(), ClientError> {
        let study = self.study()?;
        let draft = if text.is_empty() {
            study.answer_draft().to_string()
        } else {
            text.to_string()
        };
        study.submit_answer(&draft).await?;
        println!("{}", study.display_text());
        Ok(())
    }

    fn say(&mut self, transcript: &str) -> Result<(), ClientError> {
        let draft = self.study()?.append_transcript(transcript)?;
        println!("Draft: {}", draft);
        Ok(())
    }

    fn toggle_mode(&mut self) -> Result<(), ClientError> {
        let mode = self.study()?.toggle_mode()?;
        println!("Now in {} mode", mode);
        Ok(())
    }

    fn dismiss_notice(&mut self) -> Result<(), ClientError> {
        match self.study()?.dismiss_struggling_topic() {
            Some(topic) => println!("Dismissed notice about {}", topic),
            None => println!("No notice to dismiss."),
        }
        Ok(())
    }

    fn list_files(&mut self) -> Result<(), ClientError> {
        let study = self.study()?;
        if study.uploaded_files().is_empty() {
            println!("No files uploaded yet.");
        }
        for (index, file) in study.uploaded_files().iter().enumerate() {
            println!("  [{}] {} ({})", index, file.display_name, file.uploaded_at.format("%H:%M:%S"));
        }
        Ok(())
    }

    fn remove_file(&mut self, index: &str) -> Result<(), ClientError> {
        let index: usize = index
            .parse()
            .map_err(|_| ClientError::Validation("Usage: remove <index>".to_string()))?;
        match self.study()?.remove_uploaded_file(index) {
            Some(file) => println!("Removed {}", file.display_name),
            None => println!("No file at index {}", index),
        }
        Ok(())
    }

    fn status(&mut self) -> Result<(), ClientError> {
        let study = self.study()?;
        if let Some(message) = study.load_error() {
            println!("{}", message);
            return Ok(());
        }
        if let Some(class) = study.class() {
            println!("{}  |  understanding {}%  |  {} mode", class.name, study.understanding(), study.mode());
        }
        println!("[{}]", study.display_text());
        if let Some(card) = study.current_flashcard() {
            println!("Current flashcard: {}", card.id);
        }
        if !study.answer_draft().is_empty() {
            println!("Draft: {}", study.answer_draft());
        }
        if let Some(topic) = study.struggling_topic() {
            println!("Struggling topic: {}", topic);
        }
        if let Some(error) = study.last_error() {
            println!("Last error: {}", error);
        }
        println!("{} queued, phase {:?}", study.queue().len(), study.phase());
        Ok(())
    }
}

fn step_label(step: RegistrationStep) -> &'static str {
    match step {
        RegistrationStep::Email => "email",
        RegistrationStep::Username => "username",
        RegistrationStep::Password => "password",
        RegistrationStep::Confirm => "confirm password",
    }
}

/// One line for the terminal; backend failures are already in the log
fn describe(error: &ClientError) -> String {
    match error {
        ClientError::Validation(message) => message.clone(),
        ClientError::NoSession => "Please log in first.".to_string(),
        other => format!("Error: {}", other),
    }
}
