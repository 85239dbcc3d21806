use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "sid";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub id: i64,
    pub title: String,
    pub course_id: Option<i64>,
    pub duration_minutes: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTest {
    #[serde(default)]
    pub title: String,
    pub course_id: Option<i64>,
    pub duration_minutes: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i64,
    pub course_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnrollment {
    pub course_id: i64,
}

#[derive(Default)]
pub struct Store {
    pub courses: HashMap<i64, Course>,
    pub tests: HashMap<i64, Test>,
    pub enrollments: Vec<Enrollment>,
    pub sessions: HashSet<String>,
    next_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn seeded() -> Self {
        let mut store = Store {
            next_id: 100,
            ..Store::default()
        };
        for (id, title) in [(1, "Algebra"), (2, "Organic Chemistry")] {
            store.courses.insert(
                id,
                Course {
                    id,
                    title: title.to_string(),
                    description: None,
                },
            );
        }
        store
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::seeded()));
    Router::new()
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/courses", get(list_courses))
        .route("/api/courses/{id}", get(get_course))
        .route("/api/tests", post(create_test))
        .route("/api/tests/{id}", get(get_test))
        .route("/api/enrollments", post(create_enrollment))
        .route("/api/maintenance", get(maintenance))
        .fallback(not_found_page)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

async fn authenticated(db: &Db, headers: &HeaderMap) -> Option<String> {
    let sid = session_id(headers)?;
    db.read().await.sessions.contains(&sid).then_some(sid)
}

fn unauthenticated() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Not authenticated" })),
    )
        .into_response()
}

async fn login(State(db): State<Db>) -> Response {
    let sid = Uuid::new_v4().to_string();
    db.write().await.sessions.insert(sid.clone());
    tracing::info!("session opened");
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}={sid}; Path=/; HttpOnly"))],
        Json(json!({ "user": { "id": 1, "role": "student" } })),
    )
        .into_response()
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Response {
    let Some(sid) = authenticated(&db, &headers).await else {
        return unauthenticated();
    };
    db.write().await.sessions.remove(&sid);
    tracing::info!("session closed");
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}=; Path=/; Max-Age=0"))],
        Json(json!({ "ok": true })),
    )
        .into_response()
}

async fn list_courses(State(db): State<Db>) -> Json<Vec<Course>> {
    let store = db.read().await;
    let mut courses: Vec<Course> = store.courses.values().cloned().collect();
    courses.sort_by_key(|c| c.id);
    Json(courses)
}

async fn get_course(State(db): State<Db>, Path(id): Path<i64>) -> Response {
    match db.read().await.courses.get(&id) {
        Some(course) => Json(course.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Course not found" })),
        )
            .into_response(),
    }
}

async fn create_test(State(db): State<Db>, Json(input): Json<CreateTest>) -> Response {
    if input.title.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": [{
                    "code": "too_small",
                    "minimum": 1,
                    "message": "String must contain at least 1 character(s)",
                    "path": ["title"]
                }]
            })),
        )
            .into_response();
    }
    let mut store = db.write().await;
    let test = Test {
        id: store.next_id(),
        title: input.title,
        course_id: input.course_id,
        duration_minutes: input.duration_minutes,
    };
    store.tests.insert(test.id, test.clone());
    (StatusCode::CREATED, Json(test)).into_response()
}

async fn get_test(State(db): State<Db>, Path(id): Path<i64>) -> Response {
    match db.read().await.tests.get(&id) {
        Some(test) => Json(test.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Test not found" })),
        )
            .into_response(),
    }
}

async fn create_enrollment(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateEnrollment>,
) -> Response {
    if authenticated(&db, &headers).await.is_none() {
        return unauthenticated();
    }
    let mut store = db.write().await;
    if !store.courses.contains_key(&input.course_id) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Course not found" })),
        )
            .into_response();
    }
    if store.enrollments.iter().any(|e| e.course_id == input.course_id) {
        return StatusCode::CONFLICT.into_response();
    }
    let enrollment = Enrollment {
        id: store.next_id(),
        course_id: input.course_id,
    };
    store.enrollments.push(enrollment.clone());
    (StatusCode::CREATED, Json(enrollment)).into_response()
}

async fn maintenance() -> Response {
    tracing::warn!("serving maintenance page");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html("<!DOCTYPE html><html><head><title>500</title></head><body>Internal Server Error</body></html>"),
    )
        .into_response()
}

async fn not_found_page() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html("<!DOCTYPE html><html><body><h1>Cannot GET this page</h1></body></html>"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_serializes_in_camel_case() {
        let test = Test {
            id: 1,
            title: "Quiz".to_string(),
            course_id: Some(2),
            duration_minutes: Some(30),
        };
        let json = serde_json::to_value(&test).unwrap();
        assert_eq!(json["courseId"], 2);
        assert_eq!(json["durationMinutes"], 30);
    }

    #[test]
    fn create_test_defaults_missing_title_to_empty() {
        let input: CreateTest = serde_json::from_str(r#"{"courseId":1}"#).unwrap();
        assert!(input.title.is_empty());
        assert_eq!(input.course_id, Some(1));
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sid=abc123; lang=en"),
        );
        assert_eq!(session_id(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_cookie_has_no_session() {
        assert!(session_id(&HeaderMap::new()).is_none());
    }

    #[test]
    fn seeded_store_has_courses() {
        let store = Store::seeded();
        assert_eq!(store.courses.len(), 2);
        assert_eq!(store.courses[&1].title, "Algebra");
    }
}
