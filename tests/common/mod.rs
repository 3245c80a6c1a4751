#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use flecto::config::Config;
use flecto::server::{AppState, create_router};
use flecto::service::NewUserRequest;
use flecto::store::{Ctx, SqliteStore};
use flecto::types::{AdminPermission, ResourcePermission, Scope, SubjectPermissions};

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct-horse";

/// A fully wired application over a throwaway database.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub state: Arc<AppState>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let mut config = Config::default();
        config.db.path = temp_dir.path().join("flecto.db");
        config.jwt.secret = "integration-test-secret".to_string();

        let store = SqliteStore::open(&config.db).expect("open store");
        store.initialize().expect("initialize schema");
        let store = Arc::new(store);

        let state = Arc::new(AppState::new(store.clone(), config).expect("build state"));
        let router = create_router(state.clone());
        Self {
            temp_dir,
            store,
            state,
            router,
        }
    }

    /// Creates an administrator holding every permission.
    pub fn with_admin() -> Self {
        let app = Self::new();
        let ctx = Ctx::new();
        let services = &app.state.services;
        services
            .roles
            .create(
                &ctx,
                "admin",
                &SubjectPermissions::new(
                    vec![ResourcePermission::all()],
                    vec![AdminPermission::new(Scope::Any, Scope::Any)],
                ),
            )
            .expect("create admin role");
        let user = services
            .users
            .create(
                &ctx,
                &NewUserRequest {
                    username: ADMIN_USER.to_string(),
                    password: Some(ADMIN_PASSWORD.to_string()),
                    active: true,
                    ..NewUserRequest::default()
                },
            )
            .expect("create admin user");
        services
            .users
            .update_roles(&ctx, user.id, &["admin".to_string()])
            .expect("assign admin role");
        app
    }

    pub fn seed_project(&self, ns: &str, code: &str) {
        let ctx = Ctx::new();
        let services = &self.state.services;
        services
            .namespaces
            .create(&ctx, ns, &format!("{ns} namespace"))
            .expect("create namespace");
        services
            .projects
            .create(&ctx, ns, code, &format!("{code} project"))
            .expect("create project");
    }

    pub fn admin_access_token(&self) -> String {
        let (_, tokens) = self
            .state
            .services
            .auth
            .login(&Ctx::new(), ADMIN_USER, ADMIN_PASSWORD)
            .expect("admin login");
        tokens.access_token
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).expect("build request")).await
    }

    pub async fn send_json(
        &self,
        method: &str,
        uri: &str,
        bearer: Option<&str>,
        body: &Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder
            .body(Body::from(serde_json::to_vec(body).expect("encode body")))
            .expect("build request");
        self.send(request).await
    }

    /// Posts `content` as the `file` field of a multipart form.
    pub async fn upload(
        &self,
        uri: &str,
        bearer: &str,
        file_name: &str,
        content: &str,
    ) -> (StatusCode, Value) {
        let boundary = "flecto-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/tab-separated-values\r\n\r\n\
             {content}\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("build request");
        self.send(request).await
    }
}
