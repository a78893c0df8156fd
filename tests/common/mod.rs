use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const USER_ID: &str = "67b0e038fede027c6a136c03";
pub const PASSWORD: &str = "secret123";

/// One multipart request as the mock backend saw it
#[derive(Debug, Clone, Default)]
pub struct RecordedForm {
    pub path: String,
    pub fields: HashMap<String, String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub file_len: usize,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    pub forms: Arc<Mutex<Vec<RecordedForm>>>,
    pub classes: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockBackend {
    pub fn last_form(&self) -> RecordedForm {
        self.forms.lock().unwrap().last().cloned().expect("no multipart request recorded")
    }
}

/// Start the mock on an ephemeral port and return its base URL
pub async fn spawn_backend() -> (String, MockBackend) {
    let state = MockBackend::default();
    state.classes.lock().unwrap().extend([
        ("c1".to_string(), "CSC111".to_string()),
        ("c2".to_string(), "CSC110".to_string()),
    ]);

    let app = Router::new()
        .route("/classes", get(list_classes).post(create_class))
        .route("/classes/:id", get(get_class).delete(delete_class))
        .route("/classes/:id/understanding", get(understanding))
        .route("/users/login", post(login))
        .route("/users/register", post(register))
        .route("/question/:mode", post(question))
        .route("/answer", post(answer))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Class not found"})))
}

async fn list_classes(State(state): State<MockBackend>) -> Json<Value> {
    let classes: Vec<Value> = state
        .classes
        .lock()
        .unwrap()
        .iter()
        .map(|(id, name)| json!({"_id": id, "className": name}))
        .collect();
    Json(Value::Array(classes))
}

async fn create_class(
    State(state): State<MockBackend>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let name = body["className"].as_str().unwrap_or_default().to_string();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "className is required"})));
    }
    let mut classes = state.classes.lock().unwrap();
    let id = format!("c{}", classes.len() + 1);
    classes.push((id.clone(), name));
    (
        StatusCode::CREATED,
        Json(json!({"message": "Class added successfully", "class_id": id})),
    )
}

async fn get_class(State(state): State<MockBackend>, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    let classes = state.classes.lock().unwrap();
    match classes.iter().find(|(class_id, _)| *class_id == id) {
        Some((class_id, name)) => (StatusCode::OK, Json(json!({"_id": class_id, "className": name}))),
        None => not_found(),
    }
}

async fn delete_class(State(state): State<MockBackend>, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    let mut classes = state.classes.lock().unwrap();
    let before = classes.len();
    classes.retain(|(class_id, _)| *class_id != id);
    if classes.len() == before {
        return not_found();
    }
    (StatusCode::OK, Json(json!({"message": "Class deleted successfully"})))
}

async fn understanding(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "garbled" => "definitely not json".into_response(),
        "overflow" => Json(json!({"understanding": 140})).into_response(),
        "c1" | "c2" => Json(json!({"understanding": 77.6})).into_response(),
        _ => not_found().into_response(),
    }
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == PASSWORD {
        (
            StatusCode::OK,
            Json(json!({"message": "Login successful", "user_id": USER_ID})),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid email or password"})),
        )
    }
}

async fn register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["email"].as_str().unwrap_or_default().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "email is required"})));
    }
    (
        StatusCode::CREATED,
        Json(json!({"message": "User registered successfully"})),
    )
}

async fn record_form(path: String, mut multipart: Multipart) -> RecordedForm {
    let mut form = RecordedForm {
        path,
        ..Default::default()
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        if file_name.is_some() {
            form.file_name = file_name;
            form.content_type = content_type;
            form.file_len = field.bytes().await.unwrap().len();
        } else {
            form.fields.insert(name, field.text().await.unwrap());
        }
    }
    form
}

async fn question(
    State(state): State<MockBackend>,
    Path(mode): Path<String>,
    multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let form = record_form(format!("/question/{}", mode), multipart).await;
    let topic = form.fields.get("user_request").cloned().unwrap_or_default();
    state.forms.lock().unwrap().push(form);

    let mut body = json!({
        "flashcards": [
            {"id": "f1", "question": format!("What is {}?", topic)},
            {"id": "f2", "question": "Name a traversal order"}
        ],
        "recommended": {"id": "r1", "question": "Define a spanning tree"}
    });
    if mode == "study" {
        body["struggling_topic"] = json!("Graphs");
    }
    (StatusCode::OK, Json(body))
}

async fn answer(State(state): State<MockBackend>, multipart: Multipart) -> (StatusCode, Json<Value>) {
    let form = record_form("/answer".to_string(), multipart).await;
    let correct = form.fields.get("answer").map(String::as_str) == Some("vertices and edges");
    state.forms.lock().unwrap().push(form);

    (
        StatusCode::OK,
        Json(json!({"correct": correct, "correct_answer": "vertices and edges"})),
    )
}
