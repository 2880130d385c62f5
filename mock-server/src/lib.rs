//! In-memory note service speaking the `{statusCode, responseData}` envelope.
//!
//! Every route answers HTTP 200 and reports failures inside the envelope,
//! the way the real service does. Each response also bumps a `visits`
//! cookie so clients can observe cookie overwrites.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const REPORT_CSV: &str = "month,total\n2024-01,120\n2024-02,95\n";
pub const REPORT_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x00, 0xff, 0x10];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct NoteInput {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NoteFilter {
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Default)]
pub struct Store {
    notes: BTreeMap<u64, Note>,
    next_id: u64,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/login", post(login))
        .route("/whoami", get(whoami))
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/{id}", get(get_note).put(update_note).delete(delete_note))
        .route("/reports", post(report))
        .route("/broken", get(broken))
        .route("/untagged", get(untagged))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn ok(data: Value, headers: &HeaderMap) -> Response {
    with_visits(Json(json!({ "statusCode": "OK", "responseData": data })).into_response(), headers)
}

fn fail(code: &str, desc: &str, headers: &HeaderMap) -> Response {
    with_visits(
        Json(json!({
            "statusCode": "ERROR",
            "responseData": { "errCode": code, "errDesc": desc },
        }))
        .into_response(),
        headers,
    )
}

/// Value of the named cookie in the request's `Cookie` header.
pub fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

fn with_visits(mut response: Response, headers: &HeaderMap) -> Response {
    let visits = cookie(headers, "visits").and_then(|v| v.parse::<u64>().ok()).unwrap_or(0) + 1;
    if let Ok(value) = HeaderValue::from_str(&format!("visits={visits}; Path=/")) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

async fn login(headers: HeaderMap) -> Response {
    let sid = Uuid::new_v4();
    tracing::info!(%sid, "login: session issued");
    let mut response = ok(json!({ "session": sid }), &headers);
    if let Ok(value) = HeaderValue::from_str(&format!("session={sid}; Path=/; HttpOnly")) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

async fn whoami(headers: HeaderMap) -> Response {
    match cookie(&headers, "session") {
        Some(sid) => ok(json!({ "session": sid }), &headers),
        None => fail("E401", "not logged in", &headers),
    }
}

async fn list_notes(
    State(db): State<Db>,
    Query(filter): Query<NoteFilter>,
    headers: HeaderMap,
) -> Response {
    let store = db.read().await;
    let notes: Vec<&Note> = store
        .notes
        .values()
        .filter(|n| filter.tag.as_ref().map_or(true, |t| n.tags.contains(t)))
        .take(filter.limit.unwrap_or(usize::MAX))
        .collect();
    ok(json!(notes), &headers)
}

async fn create_note(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<NoteInput>,
) -> Response {
    if input.title.trim().is_empty() {
        tracing::debug!("notes: rejected note without title");
        return fail("E400", "title required", &headers);
    }
    let mut store = db.write().await;
    store.next_id += 1;
    let note = Note {
        id: store.next_id,
        title: input.title,
        tags: input.tags,
    };
    store.notes.insert(note.id, note.clone());
    ok(json!(note), &headers)
}

async fn get_note(State(db): State<Db>, Path(id): Path<u64>, headers: HeaderMap) -> Response {
    match db.read().await.notes.get(&id) {
        Some(note) => ok(json!(note), &headers),
        None => fail("E404", "note not found", &headers),
    }
}

async fn update_note(
    State(db): State<Db>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(input): Json<NoteInput>,
) -> Response {
    let mut store = db.write().await;
    let Some(note) = store.notes.get_mut(&id) else {
        return fail("E404", "note not found", &headers);
    };
    note.title = input.title;
    note.tags = input.tags;
    ok(json!(note), &headers)
}

async fn delete_note(State(db): State<Db>, Path(id): Path<u64>, headers: HeaderMap) -> Response {
    match db.write().await.notes.remove(&id) {
        Some(_) => ok(Value::Null, &headers),
        None => fail("E404", "note not found", &headers),
    }
}

/// Content negotiation on `Accept`: CSV with a filename, raw bytes
/// without one, otherwise a JSON error envelope.
async fn report(headers: HeaderMap, Json(_request): Json<HashMap<String, Value>>) -> Response {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if accept.contains("text/csv") {
        let response = (
            [
                (header::CONTENT_TYPE, "text/csv"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"report.csv\""),
            ],
            REPORT_CSV,
        )
            .into_response();
        with_visits(response, &headers)
    } else if accept.contains("application/octet-stream") {
        let response =
            ([(header::CONTENT_TYPE, "application/octet-stream")], REPORT_BYTES).into_response();
        with_visits(response, &headers)
    } else {
        fail("E415", "no report format acceptable", &headers)
    }
}

async fn broken(headers: HeaderMap) -> Response {
    with_visits("<html>502 Bad Gateway</html>".into_response(), &headers)
}

async fn untagged(headers: HeaderMap) -> Response {
    with_visits(Json(json!({ "responseData": { "id": 1 } })).into_response(), &headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_serializes_to_json() {
        let note = Note {
            id: 3,
            title: "Test".to_string(),
            tags: vec!["work".to_string()],
        };
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["title"], "Test");
        assert_eq!(json["tags"][0], "work");
    }

    #[test]
    fn note_input_defaults_tags_to_empty() {
        let input: NoteInput = serde_json::from_str(r#"{"title":"No tags"}"#).unwrap();
        assert_eq!(input.title, "No tags");
        assert!(input.tags.is_empty());
    }

    #[test]
    fn note_input_rejects_missing_title() {
        let result: Result<NoteInput, _> = serde_json::from_str(r#"{"tags":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn cookie_finds_named_pair() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1; session=xyz; visits=4"));
        assert_eq!(cookie(&headers, "session"), Some("xyz"));
        assert_eq!(cookie(&headers, "visits"), Some("4"));
        assert_eq!(cookie(&headers, "missing"), None);
    }

    #[test]
    fn visits_cookie_increments() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("visits=4"));
        let response = with_visits(().into_response(), &headers);
        let set = response.headers().get(header::SET_COOKIE).unwrap();
        assert_eq!(set, "visits=5; Path=/");
    }
}
