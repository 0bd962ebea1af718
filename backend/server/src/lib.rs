//! Backend of a hackathon management portal.
//!
//!
//!
//! # General Infrastructure
//! - Organizations create hackathons, participants register and form teams
//! - During the event participants work in a browser IDE backed by this server
//! - Every handler follows the same shape: parse the request, check the rules, read or
//!   write a document, answer with JSON
//! - Documents live in Redis hashes, one hash per collection, see `records::store`
//! - Meilisearch indexes published hackathons for discovery, see [`search`]
//!
//!
//!
//! # Identity
//! - Portal users are identified by the `x-user-id` header, unknown ids get a 401
//! - IDE calls carry `Authorization: Bearer <token>` from an IDE login
//! - IDE logins use generated credentials, the plaintext password is only shown once
//!
//!
//!
//! # Code Execution
//! - One subprocess per run, fresh temp directory, wall clock timeout, capped output
//! - The terminal only accepts a whitelist of programs and no shell syntax
//! - These are filters, not a sandbox. Deploy the container without secrets or network.
//!
//!
//!
//! # Notes
//!
//! ## Concurrent Writes
//! Hackathon documents embed every participant record, so registrations, team changes, and
//! IDE heartbeats all write the same document. Updates are compare-and-swap with retries
//! instead of read-then-save, so concurrent writers never lose each other's changes.
//!
//! ## Lifecycle
//! Status changes are either made by organizers or by the `lifecycle` binary, which is
//! meant to run from cron and moves hackathons along their schedule.
//!
//!
//!
//! # Setup
//!
//! Run against a local Redis.
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379 cargo run -p hackathon
//! ```
//!
//! Run without any services, data is lost on exit.
//! ```sh
//! REDIS_URL=memory cargo run -p hackathon
//! ```
//!
//! Smoke test a running server.
//! ```sh
//! cargo run -p tester -- http://127.0.0.1:1111
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Router,
    http::{
        HeaderName, HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post, put},
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod routes;
pub mod runner;
pub mod search;
pub mod state;
pub mod utils;

use config::Config;
use routes::*;
use state::State;
use utils::USER_HEADER;

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let origin = match allowed_origin {
        "*" => AllowOrigin::any(),
        origin => match HeaderValue::from_str(origin) {
            Ok(origin) => AllowOrigin::exact(origin),
            Err(e) => {
                warn!("Invalid ALLOWED_ORIGIN {origin}: {e}, allowing any origin");
                AllowOrigin::any()
            }
        },
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(USER_HEADER),
        ])
        .max_age(Duration::from_secs(60 * 60))
}

pub fn build_router(state: Arc<State>) -> Router {
    let cors = cors_layer(&state.config.allowed_origin);

    Router::new()
        .route("/health", get(health_handler))
        .route("/users", post(create_user_handler))
        .route("/users/{id}", get(get_user_handler))
        .route("/users/{id}/profile", put(update_profile_handler))
        .route("/organizations", post(create_organization_handler))
        .route("/organizations/{id}", get(get_organization_handler))
        .route(
            "/organizations/{id}/members",
            post(add_organization_member_handler),
        )
        .route(
            "/hackathons",
            post(create_hackathon_handler).get(search_handler),
        )
        .route(
            "/hackathons/{id}",
            get(get_hackathon_handler).put(update_hackathon_handler),
        )
        .route("/hackathons/{id}/advance", post(advance_handler))
        .route(
            "/hackathons/{id}/registration",
            post(register_handler).delete(withdraw_handler),
        )
        .route("/hackathons/{id}/participants", get(participants_handler))
        .route("/hackathons/{id}/judges", post(add_judge_handler))
        .route(
            "/hackathons/{id}/teams",
            post(create_team_handler).get(list_teams_handler),
        )
        .route("/hackathons/{id}/teams/join", post(join_team_handler))
        .route("/hackathons/{id}/matches/teams", get(team_matches_handler))
        .route(
            "/hackathons/{id}/credentials",
            post(participant_credentials_handler),
        )
        .route(
            "/hackathons/{id}/activity",
            get(activity_dashboard_handler),
        )
        .route(
            "/hackathons/{id}/activity/{user}/clear",
            post(clear_flag_handler),
        )
        .route("/hackathons/{id}/leaderboard", get(leaderboard_handler))
        .route("/teams/{id}", get(get_team_handler))
        .route("/teams/{id}/leave", post(leave_team_handler))
        .route("/teams/{id}/members/{user}", delete(remove_member_handler))
        .route(
            "/teams/{id}/matches/participants",
            get(teammate_matches_handler),
        )
        .route("/teams/{id}/credentials", post(team_credentials_handler))
        .route(
            "/teams/{id}/branches",
            get(list_branches_handler).post(create_branch_handler),
        )
        .route(
            "/teams/{id}/branches/{branch}",
            get(get_branch_handler).delete(delete_branch_handler),
        )
        .route(
            "/teams/{id}/branches/{branch}/files",
            put(write_file_handler).delete(delete_file_handler),
        )
        .route(
            "/teams/{id}/branches/{branch}/commits",
            post(commit_handler).get(commit_log_handler),
        )
        .route(
            "/teams/{id}/pulls",
            get(list_pulls_handler).post(open_pull_handler),
        )
        .route("/teams/{id}/pulls/{number}/merge", post(merge_pull_handler))
        .route("/teams/{id}/pulls/{number}/close", post(close_pull_handler))
        .route("/teams/{id}/submission", put(submission_handler))
        .route("/teams/{id}/scores", post(score_handler))
        .route("/ide/login", post(login_handler))
        .route("/ide/logout", post(logout_handler))
        .route("/ide/execute", post(execute_handler))
        .route("/ide/terminal", post(terminal_handler))
        .route("/ide/activity", post(activity_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new(Config::load()?).await?;

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
