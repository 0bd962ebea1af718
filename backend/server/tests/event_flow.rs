mod common;

use common::{Auth, has_program, spawn};
use serde_json::json;

#[tokio::test]
async fn hackathon_runs_from_draft_to_leaderboard() {
    let server = spawn().await;

    let owner = server.user("Olive", &["management"]).await;
    let alice = server.user("Alice", &["python", "react"]).await;
    let bob = server.user("Bob", &["rust"]).await;
    let hackathon = server.draft_hackathon(&owner, "Spring Hack").await;

    let (status, page) = server.get("/hackathons", Auth::Anonymous).await;
    assert_eq!(status, 200);
    assert_eq!(page["hackathons"].as_array().unwrap().len(), 0);

    server.advance(&owner, &hackathon, "published").await;

    let (_, page) = server.get("/hackathons?q=spring", Auth::Anonymous).await;
    assert_eq!(page["hackathons"][0]["id"], hackathon.as_str());

    for user in [&alice, &bob] {
        let (status, body) = server
            .post(
                &format!("/hackathons/{hackathon}/registration"),
                Auth::User(user),
                json!({}),
            )
            .await;
        assert_eq!(status, 201, "{body}");
        assert_eq!(body["looking_for_team"], true);
    }

    let (status, team) = server
        .post(
            &format!("/hackathons/{hackathon}/teams"),
            Auth::User(&alice),
            json!({ "name": "Byte Club", "looking_for": ["Rust"] }),
        )
        .await;
    assert_eq!(status, 201, "{team}");
    let team_id = team["id"].as_str().unwrap().to_string();
    let invite_code = team["invite_code"].as_str().unwrap().to_string();

    let (status, matches) = server
        .get(
            &format!("/hackathons/{hackathon}/matches/teams"),
            Auth::User(&bob),
        )
        .await;
    assert_eq!(status, 200, "{matches}");
    assert_eq!(matches[0]["team_id"], team_id.as_str());
    assert_eq!(matches[0]["covers"], json!(["rust"]));

    let (status, joined) = server
        .post(
            &format!("/hackathons/{hackathon}/teams/join"),
            Auth::User(&bob),
            json!({ "code": invite_code.to_lowercase() }),
        )
        .await;
    assert_eq!(status, 200, "{joined}");
    assert_eq!(joined["members"].as_array().unwrap().len(), 2);

    let (status, body) = server
        .post(
            &format!("/teams/{team_id}/credentials"),
            Auth::User(&bob),
            json!({}),
        )
        .await;
    assert_eq!(status, 403, "{body}");

    let (status, credentials) = server
        .post(
            &format!("/teams/{team_id}/credentials"),
            Auth::User(&alice),
            json!({}),
        )
        .await;
    assert_eq!(status, 201, "{credentials}");
    assert!(credentials["login_id"].as_str().unwrap().starts_with("ide-"));
    assert_eq!(credentials["password"].as_str().unwrap().len(), 16);

    let login = json!({
        "login_id": credentials["login_id"],
        "password": credentials["password"],
        "user_id": bob,
    });

    let (status, _) = server.post("/ide/login", Auth::Anonymous, login.clone()).await;
    assert_eq!(status, 409, "IDE stays closed before the event starts");

    server.advance(&owner, &hackathon, "active").await;

    let (status, _) = server
        .post(
            "/ide/login",
            Auth::Anonymous,
            json!({ "login_id": credentials["login_id"], "password": "wrong", "user_id": bob }),
        )
        .await;
    assert_eq!(status, 401);

    let (status, session) = server.post("/ide/login", Auth::Anonymous, login).await;
    assert_eq!(status, 201, "{session}");
    let token = session["token"].as_str().unwrap().to_string();
    assert_eq!(session["team_id"], team_id.as_str());

    let (status, body) = server
        .post(
            "/ide/execute",
            Auth::Ide(&token),
            json!({ "language": "ruby", "code": "puts 1" }),
        )
        .await;
    assert_eq!(status, 422, "{body}");

    if has_program("bash") {
        let (status, result) = server
            .post(
                "/ide/execute",
                Auth::Ide(&token),
                json!({ "language": "bash", "code": "read x; echo \"got $x\"", "stdin": "42\n" }),
            )
            .await;
        assert_eq!(status, 200, "{result}");
        assert_eq!(result["stdout"], "got 42\n");
        assert_eq!(result["exit_code"], 0);
        assert_eq!(result["timed_out"], false);
    }

    let files = format!("/teams/{team_id}/branches/main/files");
    let (status, written) = server
        .put(
            &files,
            Auth::User(&alice),
            json!({ "path": "/src/app.py", "content": "print('hi')" }),
        )
        .await;
    assert_eq!(status, 200, "{written}");
    assert_eq!(written["path"], "src/app.py");

    let (status, _) = server
        .post(
            &format!("/teams/{team_id}/branches/main/commits"),
            Auth::User(&alice),
            json!({ "message": "initial" }),
        )
        .await;
    assert_eq!(status, 201);

    let (status, branch) = server
        .post(
            &format!("/teams/{team_id}/branches"),
            Auth::User(&bob),
            json!({ "name": "docs" }),
        )
        .await;
    assert_eq!(status, 201, "{branch}");
    assert_eq!(branch["created_from"], "main");

    let (status, _) = server
        .put(
            &format!("/teams/{team_id}/branches/docs/files"),
            Auth::User(&bob),
            json!({ "path": "README.md", "content": "# Byte Club" }),
        )
        .await;
    assert_eq!(status, 200);

    let (status, _) = server
        .post(
            &format!("/teams/{team_id}/branches/docs/commits"),
            Auth::User(&bob),
            json!({ "message": "add readme" }),
        )
        .await;
    assert_eq!(status, 201);

    let (status, pull) = server
        .post(
            &format!("/teams/{team_id}/pulls"),
            Auth::User(&bob),
            json!({ "title": "Docs", "source": "docs" }),
        )
        .await;
    assert_eq!(status, 201, "{pull}");
    assert_eq!(pull["status"], "open");

    let (status, merged) = server
        .post(
            &format!("/teams/{team_id}/pulls/{}/merge", pull["number"]),
            Auth::User(&alice),
            json!({}),
        )
        .await;
    assert_eq!(status, 200, "{merged}");
    assert_eq!(merged["status"], "merged");

    let (_, main) = server
        .get(&format!("/teams/{team_id}/branches/main"), Auth::User(&bob))
        .await;
    let paths: Vec<&str> = main["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|file| file["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["README.md", "src/app.py"]);

    if has_program("ls") {
        let (status, listing) = server
            .post(
                "/ide/terminal",
                Auth::Ide(&token),
                json!({ "command": "ls src" }),
            )
            .await;
        assert_eq!(status, 200, "{listing}");
        assert_eq!(listing["stdout"], "app.py\n");
    }

    let (status, _) = server
        .post(
            "/ide/terminal",
            Auth::Ide(&token),
            json!({ "command": "ls; rm -rf ." }),
        )
        .await;
    assert_eq!(status, 422);

    let mut receipt = json!(null);
    for _ in 0..6 {
        let (status, body) = server
            .post(
                "/ide/activity",
                Auth::Ide(&token),
                json!({ "kind": "tab_switch" }),
            )
            .await;
        assert_eq!(status, 200, "{body}");
        receipt = body;
    }
    assert_eq!(receipt["tab_switches"], 6);
    assert_eq!(receipt["flagged"], true);

    let dashboard = format!("/hackathons/{hackathon}/activity");
    let (status, _) = server.get(&dashboard, Auth::User(&alice)).await;
    assert_eq!(status, 403);

    let (status, summaries) = server.get(&dashboard, Auth::User(&owner)).await;
    assert_eq!(status, 200, "{summaries}");
    assert_eq!(summaries[0]["user_id"], bob.as_str());
    assert_eq!(summaries[0]["flagged"], true);

    let (status, cleared) = server
        .post(
            &format!("{dashboard}/{bob}/clear"),
            Auth::User(&owner),
            json!({}),
        )
        .await;
    assert_eq!(status, 200, "{cleared}");
    assert_eq!(cleared["flagged"], false);
    assert_eq!(cleared["tab_switches"], 6);

    let (status, submission) = server
        .put(
            &format!("/teams/{team_id}/submission"),
            Auth::User(&alice),
            json!({ "repository_url": "https://github.com/byte-club/app" }),
        )
        .await;
    assert_eq!(status, 200, "{submission}");

    server.advance(&owner, &hackathon, "judging").await;

    let (status, _) = server
        .post(
            "/ide/activity",
            Auth::Ide(&token),
            json!({ "kind": "heartbeat" }),
        )
        .await;
    assert_eq!(status, 409, "IDE closes when judging starts");

    let (status, _) = server
        .put(&files, Auth::User(&alice), json!({ "path": "late.py", "content": "" }))
        .await;
    assert_eq!(status, 409, "workspace is read-only after the event");

    let (status, score) = server
        .post(
            &format!("/teams/{team_id}/scores"),
            Auth::User(&owner),
            json!({ "criteria": { "impact": 8, "polish": 6 }, "comment": "nice" }),
        )
        .await;
    assert_eq!(status, 200, "{score}");

    let (status, _) = server
        .post(
            &format!("/teams/{team_id}/scores"),
            Auth::User(&alice),
            json!({ "criteria": { "impact": 10 } }),
        )
        .await;
    assert_eq!(status, 403);

    let (status, board) = server
        .get(
            &format!("/hackathons/{hackathon}/leaderboard"),
            Auth::Anonymous,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(board[0]["team_id"], team_id.as_str());
    assert_eq!(board[0]["average"], 7.0);
    assert_eq!(board[0]["judges"], 1);
}
