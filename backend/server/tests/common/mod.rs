#![allow(dead_code)]

use chrono::{Duration, Utc};
use reqwest::Method;
use serde_json::{Value, json};
use server::{build_router, state::State};
use tokio::net::TcpListener;

pub enum Auth<'a> {
    Anonymous,
    User(&'a str),
    Ide(&'a str),
}

pub struct TestServer {
    base: String,
    http: reqwest::Client,
}

pub async fn spawn() -> TestServer {
    let app = build_router(State::for_tests());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    TestServer {
        base: format!("http://{address}"),
        http: reqwest::Client::new(),
    }
}

pub fn has_program(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .output()
        .is_ok()
}

impl TestServer {
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        auth: Auth<'_>,
        body: Option<Value>,
    ) -> (u16, Value) {
        let mut request = self.http.request(method, format!("{}{path}", self.base));

        request = match auth {
            Auth::Anonymous => request,
            Auth::User(user_id) => request.header("x-user-id", user_id),
            Auth::Ide(token) => request.bearer_auth(token),
        };

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.expect("request");
        let status = response.status().as_u16();
        let text = response.text().await.expect("body");
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        (status, body)
    }

    pub async fn get(&self, path: &str, auth: Auth<'_>) -> (u16, Value) {
        self.send(Method::GET, path, auth, None).await
    }

    pub async fn post(&self, path: &str, auth: Auth<'_>, body: Value) -> (u16, Value) {
        self.send(Method::POST, path, auth, Some(body)).await
    }

    pub async fn put(&self, path: &str, auth: Auth<'_>, body: Value) -> (u16, Value) {
        self.send(Method::PUT, path, auth, Some(body)).await
    }

    pub async fn delete(&self, path: &str, auth: Auth<'_>) -> (u16, Value) {
        self.send(Method::DELETE, path, auth, None).await
    }

    pub async fn user(&self, name: &str, skills: &[&str]) -> String {
        let (status, body) = self
            .post(
                "/users",
                Auth::Anonymous,
                json!({
                    "name": name,
                    "email": format!("{}@example.com", name.to_lowercase()),
                    "skills": skills,
                }),
            )
            .await;
        assert_eq!(status, 201, "{body}");

        body["id"].as_str().expect("user id").to_string()
    }

    /// Organization owned by `owner` with one draft hackathon in it.
    pub async fn draft_hackathon(&self, owner: &str, title: &str) -> String {
        let (status, organization) = self
            .post(
                "/organizations",
                Auth::User(owner),
                json!({ "name": format!("{title} Org") }),
            )
            .await;
        assert_eq!(status, 201, "{organization}");

        let now = Utc::now();
        let (status, hackathon) = self
            .post(
                "/hackathons",
                Auth::User(owner),
                json!({
                    "organization_id": organization["id"],
                    "title": title,
                    "description": "A weekend of building",
                    "tags": ["AI", "climate"],
                    "registration_deadline": (now + Duration::days(1)).to_rfc3339(),
                    "starts_at": (now + Duration::days(2)).to_rfc3339(),
                    "ends_at": (now + Duration::days(3)).to_rfc3339(),
                    "max_team_size": 3,
                    "allowed_languages": ["python", "bash"],
                }),
            )
            .await;
        assert_eq!(status, 201, "{hackathon}");
        assert_eq!(hackathon["status"], "draft");

        hackathon["id"].as_str().expect("hackathon id").to_string()
    }

    pub async fn advance(&self, owner: &str, hackathon_id: &str, to: &str) {
        let (status, body) = self
            .post(
                &format!("/hackathons/{hackathon_id}/advance"),
                Auth::User(owner),
                json!({ "to": to }),
            )
            .await;
        assert_eq!(status, 200, "{body}");
        assert_eq!(body["status"], to);
    }
}
