mod common;

use common::{Auth, spawn};
use reqwest::Method;
use serde_json::json;

#[tokio::test]
async fn health_is_public() {
    let server = spawn().await;

    let (status, body) = server.get("/health", Auth::Anonymous).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn acting_user_must_exist() {
    let server = spawn().await;

    let (status, body) = server
        .post("/organizations", Auth::Anonymous, json!({ "name": "Acme" }))
        .await;
    assert_eq!(status, 401);
    assert!(body["error"].as_str().unwrap().contains("x-user-id"));

    let (status, _) = server
        .post("/organizations", Auth::User("ghost"), json!({ "name": "Acme" }))
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn malformed_payloads_are_bad_requests() {
    let server = spawn().await;

    let (status, body) = server
        .post("/users", Auth::Anonymous, json!({ "name": "No Email" }))
        .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().starts_with("Malformed payload"));

    let (status, _) = server
        .post(
            "/users",
            Auth::Anonymous,
            json!({ "name": "Bad", "email": "not-an-email" }),
        )
        .await;
    assert_eq!(status, 422);
}

#[tokio::test]
async fn duplicate_emails_conflict() {
    let server = spawn().await;
    server.user("Dana", &[]).await;

    let (status, _) = server
        .post(
            "/users",
            Auth::Anonymous,
            json!({ "name": "Dana Again", "email": "DANA@example.com" }),
        )
        .await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn profiles_are_edited_by_their_owner() {
    let server = spawn().await;
    let erin = server.user("Erin", &[]).await;
    let finn = server.user("Finn", &[]).await;

    let (status, _) = server
        .put(
            &format!("/users/{erin}/profile"),
            Auth::User(&finn),
            json!({ "name": "Mallory" }),
        )
        .await;
    assert_eq!(status, 403);

    let (status, body) = server
        .put(
            &format!("/users/{erin}/profile"),
            Auth::User(&erin),
            json!({ "skills": ["Machine_Learning", "SQL"] }),
        )
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["skills"], json!(["machine learning", "sql"]));
}

#[tokio::test]
async fn drafts_are_hidden_from_outsiders() {
    let server = spawn().await;
    let owner = server.user("Gwen", &[]).await;
    let outsider = server.user("Hank", &[]).await;
    let hackathon = server.draft_hackathon(&owner, "Secret Hack").await;
    let path = format!("/hackathons/{hackathon}");

    let (status, _) = server.get(&path, Auth::Anonymous).await;
    assert_eq!(status, 404);

    let (status, _) = server.get(&path, Auth::User(&outsider)).await;
    assert_eq!(status, 404);

    let (status, body) = server.get(&path, Auth::User(&owner)).await;
    assert_eq!(status, 200);
    assert_eq!(body["participant_count"], 0);
}

#[tokio::test]
async fn lifecycle_only_moves_one_step_forward() {
    let server = spawn().await;
    let owner = server.user("Ivy", &[]).await;
    let hackathon = server.draft_hackathon(&owner, "Step Hack").await;
    let path = format!("/hackathons/{hackathon}/advance");

    let (status, _) = server
        .post(&path, Auth::User(&owner), json!({ "to": "active" }))
        .await;
    assert_eq!(status, 409);

    let (status, _) = server
        .post(&path, Auth::User(&owner), json!({ "to": "sideways" }))
        .await;
    assert_eq!(status, 400);

    server.advance(&owner, &hackathon, "published").await;

    let (status, _) = server
        .send(
            Method::PUT,
            &format!("/hackathons/{hackathon}"),
            Auth::User(&owner),
            Some(json!({ "title": "Renamed Hack" })),
        )
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn registration_and_withdrawal() {
    let server = spawn().await;
    let owner = server.user("Jade", &[]).await;
    let kai = server.user("Kai", &["go"]).await;
    let hackathon = server.draft_hackathon(&owner, "Reg Hack").await;
    let registration = format!("/hackathons/{hackathon}/registration");

    let (status, _) = server
        .post(&registration, Auth::User(&kai), json!({}))
        .await;
    assert_eq!(status, 409, "drafts are closed for registration");

    server.advance(&owner, &hackathon, "published").await;

    let (status, body) = server
        .post(
            &registration,
            Auth::User(&kai),
            json!({ "looking_for_team": false }),
        )
        .await;
    assert_eq!(status, 201, "{body}");
    assert_eq!(body["has_credentials"], false);

    let (status, _) = server
        .post(&registration, Auth::User(&kai), json!({}))
        .await;
    assert_eq!(status, 409);

    let (status, _) = server
        .post(
            &format!("/hackathons/{hackathon}/credentials"),
            Auth::User(&kai),
            json!({}),
        )
        .await;
    assert_eq!(status, 201);

    let (_, participants) = server
        .get(
            &format!("/hackathons/{hackathon}/participants"),
            Auth::Anonymous,
        )
        .await;
    assert_eq!(participants[0]["has_credentials"], true);
    assert!(participants[0].get("credentials").is_none());

    let (status, _) = server.delete(&registration, Auth::User(&kai)).await;
    assert_eq!(status, 204);

    let (_, participants) = server
        .get(
            &format!("/hackathons/{hackathon}/participants"),
            Auth::Anonymous,
        )
        .await;
    assert_eq!(participants.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn workspaces_belong_to_their_team() {
    let server = spawn().await;
    let owner = server.user("Liam", &[]).await;
    let mia = server.user("Mia", &[]).await;
    let noah = server.user("Noah", &[]).await;
    let hackathon = server.draft_hackathon(&owner, "Team Hack").await;
    server.advance(&owner, &hackathon, "published").await;

    for user in [&mia, &noah] {
        server
            .post(
                &format!("/hackathons/{hackathon}/registration"),
                Auth::User(user),
                json!({}),
            )
            .await;
    }

    let (_, team) = server
        .post(
            &format!("/hackathons/{hackathon}/teams"),
            Auth::User(&mia),
            json!({ "name": "Solo Act" }),
        )
        .await;
    let team_id = team["id"].as_str().unwrap();

    let (status, listing) = server
        .get(&format!("/hackathons/{hackathon}/teams"), Auth::User(&noah))
        .await;
    assert_eq!(status, 200);
    assert!(listing[0]["invite_code"].is_null());

    let (status, _) = server
        .get(&format!("/teams/{team_id}/branches"), Auth::User(&noah))
        .await;
    assert_eq!(status, 403);

    let (status, branches) = server
        .get(&format!("/teams/{team_id}/branches"), Auth::User(&mia))
        .await;
    assert_eq!(status, 200);
    assert_eq!(branches[0]["name"], "main");

    let (status, _) = server
        .put(
            &format!("/teams/{team_id}/branches/main/files"),
            Auth::User(&mia),
            json!({ "path": "app.py", "content": "" }),
        )
        .await;
    assert_eq!(status, 409, "workspace opens when the event starts");

    let (status, _) = server
        .post(&format!("/teams/{team_id}/leave"), Auth::User(&mia), json!({}))
        .await;
    assert_eq!(status, 204, "last member leaving disbands the team");

    let (status, _) = server
        .get(&format!("/teams/{team_id}"), Auth::Anonymous)
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn ide_requires_a_session() {
    let server = spawn().await;

    let (status, _) = server
        .post(
            "/ide/execute",
            Auth::Anonymous,
            json!({ "language": "python", "code": "print(1)" }),
        )
        .await;
    assert_eq!(status, 401);

    let (status, _) = server
        .post(
            "/ide/execute",
            Auth::Ide("not-a-token"),
            json!({ "language": "python", "code": "print(1)" }),
        )
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn oversized_search_pages_are_unprocessable() {
    let server = spawn().await;

    let (status, _) = server
        .get(&format!("/hackathons?page={}", usize::MAX), Auth::Anonymous)
        .await;
    assert_eq!(status, 422);

    let (status, page) = server.get("/hackathons?page=3", Auth::Anonymous).await;
    assert_eq!(status, 200);
    assert_eq!(page["page"], 3);
}

#[tokio::test]
async fn removed_members_lose_ide_access() {
    let server = spawn().await;
    let owner = server.user("Ivy", &[]).await;
    let lead = server.user("Leo", &[]).await;
    let kai = server.user("Kai", &[]).await;
    let hackathon = server.draft_hackathon(&owner, "Kick Hack").await;
    server.advance(&owner, &hackathon, "published").await;

    for user in [&lead, &kai] {
        server
            .post(
                &format!("/hackathons/{hackathon}/registration"),
                Auth::User(user),
                json!({}),
            )
            .await;
    }

    let (_, team) = server
        .post(
            &format!("/hackathons/{hackathon}/teams"),
            Auth::User(&lead),
            json!({ "name": "Kickers" }),
        )
        .await;
    let team_id = team["id"].as_str().unwrap().to_string();
    server
        .post(
            &format!("/hackathons/{hackathon}/teams/join"),
            Auth::User(&kai),
            json!({ "code": team["invite_code"] }),
        )
        .await;
    let (_, credentials) = server
        .post(
            &format!("/teams/{team_id}/credentials"),
            Auth::User(&lead),
            json!({}),
        )
        .await;
    server.advance(&owner, &hackathon, "active").await;

    let (status, session) = server
        .post(
            "/ide/login",
            Auth::Anonymous,
            json!({
                "login_id": credentials["login_id"],
                "password": credentials["password"],
                "user_id": kai,
            }),
        )
        .await;
    assert_eq!(status, 201, "{session}");
    let token = session["token"].as_str().unwrap().to_string();

    let (status, _) = server
        .delete(&format!("/teams/{team_id}/members/{kai}"), Auth::User(&lead))
        .await;
    assert!(status < 300, "{status}");

    let (status, _) = server
        .post("/ide/terminal", Auth::Ide(&token), json!({ "command": "ls" }))
        .await;
    assert_eq!(status, 401);
}
