use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Path of the single API endpoint.
pub const ENDPOINT: &str = "/api.php";

#[derive(Clone, Debug)]
pub struct UserRow {
    pub idx: String,
    pub email: String,
    pub password: String,
    pub session_id: String,
    pub profile: Map<String, Value>,
}

impl UserRow {
    fn public(&self) -> Value {
        let mut out = self.profile.clone();
        out.insert("idx".to_string(), json!(self.idx));
        out.insert("email".to_string(), json!(self.email));
        out.insert("session_id".to_string(), json!(self.session_id));
        Value::Object(out)
    }
}

#[derive(Debug, Default)]
pub struct Backend {
    users: HashMap<String, UserRow>,
    posts: Vec<Value>,
    files: Vec<Value>,
    next_idx: u64,
}

impl Backend {
    fn next_idx(&mut self) -> String {
        self.next_idx += 1;
        self.next_idx.to_string()
    }

    fn by_session(&mut self, body: &Value) -> Option<&mut UserRow> {
        let session_id = body.get("session_id")?.as_str()?;
        self.users
            .values_mut()
            .find(|u| !u.session_id.is_empty() && u.session_id == session_id)
    }
}

pub type Db = Arc<RwLock<Backend>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Backend::default()));
    Router::new()
        .route(ENDPOINT, get(html).post(api))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub fn error(code: &str, message: &str) -> Value {
    json!({"error_code": code, "error_message": message})
}

fn text(body: &Value, field: &str) -> Option<String> {
    body.get(field)?.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

async fn api(State(db): State<Db>, request: Request) -> Response {
    let multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));
    if multipart {
        return match Multipart::from_request(request, &()).await {
            Ok(form) => upload(db, form).await,
            Err(rejection) => rejection.into_response(),
        };
    }
    match Json::<Value>::from_request(request, &()).await {
        Ok(Json(body)) => dispatch(db, body).await,
        Err(rejection) => rejection.into_response(),
    }
}

async fn dispatch(db: Db, body: Value) -> Response {
    let run = body.get("run").and_then(Value::as_str).unwrap_or_default().to_string();
    tracing::debug!(%run, "api call");
    let mut backend = db.write().await;

    let reply = match run.as_str() {
        "user.register" => {
            let (Some(email), Some(password)) = (text(&body, "email"), text(&body, "password")) else {
                return Json(error("email-password-required", "Input email and password")).into_response();
            };
            if backend.users.contains_key(&email) {
                return Json(error("email-exists", "Email is already registered")).into_response();
            }
            let mut profile = body.as_object().cloned().unwrap_or_default();
            for key in ["run", "email", "password", "session_id", "idx"] {
                profile.remove(key);
            }
            let row = UserRow {
                idx: backend.next_idx(),
                email: email.clone(),
                password,
                session_id: Uuid::new_v4().to_string(),
                profile,
            };
            let public = row.public();
            backend.users.insert(email, row);
            public
        }
        "user.login" => {
            let email = text(&body, "email").unwrap_or_default();
            let password = text(&body, "password").unwrap_or_default();
            match backend.users.get(&email) {
                None => error("user-not-found", "No user by that email"),
                Some(row) if row.password != password => error("wrong-password", "Password does not match"),
                Some(row) => row.public(),
            }
        }
        "user.profile" => match backend.by_session(&body) {
            Some(row) => row.public(),
            None => error("invalid-session", "Login first"),
        },
        "user.update" => match backend.by_session(&body) {
            Some(row) => {
                if let Some(fields) = body.as_object() {
                    for (key, value) in fields {
                        if !["run", "email", "password", "session_id", "idx"].contains(&key.as_str()) {
                            row.profile.insert(key.clone(), value.clone());
                        }
                    }
                }
                row.public()
            }
            None => error("invalid-session", "Login first"),
        },
        "user.password-change" => {
            let old = text(&body, "old_password").unwrap_or_default();
            let new = text(&body, "new_password").unwrap_or_default();
            match backend.by_session(&body) {
                None => error("invalid-session", "Login first"),
                Some(row) if row.password != old => error("wrong-password", "Password does not match"),
                Some(row) => {
                    row.password = new;
                    row.session_id = Uuid::new_v4().to_string();
                    row.public()
                }
            }
        }
        "user.forgot-password" => {
            let email = text(&body, "email").unwrap_or_default();
            let new = text(&body, "new_password").unwrap_or_default();
            match backend.users.get_mut(&email) {
                None => error("user-not-found", "No user by that email"),
                Some(row) => {
                    row.password = new;
                    row.session_id = Uuid::new_v4().to_string();
                    row.public()
                }
            }
        }
        "post.create" => {
            let Some(idx_user) = backend.by_session(&body).map(|row| row.idx.clone()) else {
                return Json(error("invalid-session", "Login first")).into_response();
            };
            let idx = backend.next_idx();
            let post = json!({
                "idx": idx,
                "idx_user": idx_user,
                "title": body.get("title").cloned().unwrap_or(Value::Null),
                "content": body.get("content").cloned().unwrap_or(Value::Null),
            });
            backend.posts.push(post.clone());
            post
        }
        "post.list" => json!({"posts": backend.posts}),
        "post.get" => {
            let idx = body.get("idx").map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            backend
                .posts
                .iter()
                .find(|p| p["idx"].as_str() == idx.as_deref())
                .cloned()
                .unwrap_or_else(|| error("post-not-found", "No post by that idx"))
        }
        "site.get" => json!({
            "idx": "1",
            "domain": body.get("idx_site_or_domain").cloned().unwrap_or(Value::Null),
            "name": "Simplest",
        }),
        "test.echo" => body.clone(),
        "test.number" => json!(42),
        "test.server-error" => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "<b>Fatal error</b>: out of memory").into_response();
        }
        _ => error("unknown-run", &format!("No handler for run: {run}")),
    };
    Json(reply).into_response()
}

async fn upload(db: Db, mut form: Multipart) -> Response {
    let mut fields: Map<String, Value> = Map::new();
    let mut file: Option<(String, String, usize)> = None;
    loop {
        let field = match form.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(rejection) => return rejection.into_response(),
        };
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("file").to_string();
            let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
            match field.bytes().await {
                Ok(bytes) => file = Some((file_name, content_type, bytes.len())),
                Err(rejection) => return rejection.into_response(),
            }
        } else {
            match field.text().await {
                Ok(value) => {
                    fields.insert(name, Value::String(value));
                }
                Err(rejection) => return rejection.into_response(),
            }
        }
    }

    let body = Value::Object(fields);
    if body["run"] != "file.upload" {
        return Json(error("unknown-run", "Uploads must use run=file.upload")).into_response();
    }
    let Some((name, content_type, size)) = file else {
        return Json(error("no-file", "No file was uploaded")).into_response();
    };

    let mut backend = db.write().await;
    let idx_user = backend.by_session(&body).map(|row| row.idx.clone()).unwrap_or_default();
    let idx = backend.next_idx();
    let record = json!({
        "idx": idx,
        "idx_user": idx_user,
        "name": name,
        "type": content_type,
        "size": size.to_string(),
        "taxonomy": body.get("taxonomy").cloned().unwrap_or(Value::Null),
        "relation": body.get("relation").cloned().unwrap_or(Value::Null),
        "code": body.get("code").cloned().unwrap_or(Value::Null),
        "url": format!("http://localhost/files/{idx}/{name}"),
    });
    backend.files.push(record.clone());
    tracing::debug!(%idx, size, "file stored");
    Json(record).into_response()
}

#[derive(Debug, Deserialize)]
pub struct HtmlQuery {
    #[serde(default)]
    pub run: String,
    #[serde(default)]
    pub idx_site: String,
}

async fn html(Query(query): Query<HtmlQuery>) -> Response {
    let Some(name) = query.run.strip_prefix("html.") else {
        return (StatusCode::BAD_REQUEST, "unknown html").into_response();
    };
    let idx_site = &query.idx_site;
    format!("<div class=\"{name}\" data-site=\"{idx_site}\"></div>").into_response()
}
