use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, bail};
use chrono::{Duration, Utc};
use clap::Parser;
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server to drive, e.g. http://127.0.0.1:1111
    base_url: String,
}

async fn step(name: &str, request: RequestBuilder) -> anyhow::Result<Value> {
    let response = request
        .send()
        .await
        .with_context(|| format!("{name}: request failed"))?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        bail!("{name}: {status} {text}");
    }

    println!("OK   {name} ({status})");
    Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
}

fn field(value: &Value, key: &str) -> anyhow::Result<String> {
    value[key]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("missing {key} in {value}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let base = args.base_url.trim_end_matches('/');
    let client = Client::new();
    let run = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
    let now = Utc::now();

    step("health", client.get(format!("{base}/health"))).await?;

    let user = step(
        "create user",
        client.post(format!("{base}/users")).json(&json!({
            "name": "Smoke Tester",
            "email": format!("smoke-{run}@example.com"),
            "skills": ["python"],
        })),
    )
    .await?;
    let user_id = field(&user, "id")?;
    let as_user = |request: RequestBuilder| request.header("x-user-id", &user_id);

    let organization = step(
        "create organization",
        as_user(client.post(format!("{base}/organizations")))
            .json(&json!({ "name": format!("Smoke Org {run}") })),
    )
    .await?;

    let hackathon = step(
        "create hackathon",
        as_user(client.post(format!("{base}/hackathons"))).json(&json!({
            "organization_id": field(&organization, "id")?,
            "title": format!("Smoke Hack {run}"),
            "registration_deadline": (now + Duration::days(1)).to_rfc3339(),
            "starts_at": (now + Duration::days(2)).to_rfc3339(),
            "ends_at": (now + Duration::days(3)).to_rfc3339(),
        })),
    )
    .await?;
    let hackathon_id = field(&hackathon, "id")?;

    step(
        "publish",
        as_user(client.post(format!("{base}/hackathons/{hackathon_id}/advance")))
            .json(&json!({ "to": "published" })),
    )
    .await?;

    step(
        "register",
        as_user(client.post(format!("{base}/hackathons/{hackathon_id}/registration")))
            .json(&json!({ "looking_for_team": false })),
    )
    .await?;

    let team = step(
        "create team",
        as_user(client.post(format!("{base}/hackathons/{hackathon_id}/teams")))
            .json(&json!({ "name": "Smoke Team" })),
    )
    .await?;
    let team_id = field(&team, "id")?;

    let credentials = step(
        "issue team credentials",
        as_user(client.post(format!("{base}/teams/{team_id}/credentials"))),
    )
    .await?;

    step(
        "start event",
        as_user(client.post(format!("{base}/hackathons/{hackathon_id}/advance")))
            .json(&json!({ "to": "active" })),
    )
    .await?;

    let session = step(
        "IDE login",
        client.post(format!("{base}/ide/login")).json(&json!({
            "login_id": field(&credentials, "login_id")?,
            "password": field(&credentials, "password")?,
            "user_id": user_id,
        })),
    )
    .await?;
    let token = field(&session, "token")?;

    let result = step(
        "execute python",
        client
            .post(format!("{base}/ide/execute"))
            .bearer_auth(&token)
            .json(&json!({ "language": "python", "code": "print(sum(range(10)))" })),
    )
    .await?;

    let stdout = field(&result, "stdout")?;
    if stdout.trim() != "45" {
        bail!("execute python: unexpected output {result}");
    }

    println!("\nSmoke test passed");
    println!("Hackathon: {hackathon_id}");
    println!("Run Time: {}ms", result["duration_ms"]);

    Ok(())
}
