use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use records::{
    activity::{ActivityEvent, ActivityKind},
    credentials::{self, IdeSession, LoginRequest},
    hackathon::{Hackathon, Status},
    language::Language,
    team::Team,
    workspace::{FileEntry, MAIN_BRANCH},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::AppError,
    state::State,
    utils::{ide_session, now, parse},
};

#[derive(Deserialize)]
pub struct ExecuteRequest {
    language: String,
    code: String,
    #[serde(default)]
    stdin: String,
}

#[derive(Deserialize)]
pub struct TerminalRequest {
    command: String,
    #[serde(default)]
    branch: Option<String>,
}

#[derive(Deserialize)]
pub struct ActivityRequest {
    kind: ActivityKind,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Serialize)]
pub struct ActivityReceipt {
    tab_switches: u32,
    flagged: bool,
}

/// Session plus its hackathon, refused once the event is no longer running.
async fn active_session(
    state: &State,
    headers: &HeaderMap,
) -> Result<(IdeSession, Hackathon), AppError> {
    let session = ide_session(state, headers).await?;
    let hackathon = state
        .docs
        .require::<Hackathon>(&session.hackathon_id)
        .await?;

    if hackathon.status != Status::Active {
        return Err(AppError::Conflict(format!(
            "the IDE is closed while the hackathon is {}",
            hackathon.status.as_str()
        )));
    }

    Ok((session, hackathon))
}

pub async fn login_handler(
    AxumState(state): AxumState<Arc<State>>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: LoginRequest = parse(&body)?;

    let session =
        credentials::login(&state.docs, request, &state.config.credential_pepper, now()).await?;

    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn logout_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let session = ide_session(&state, &headers).await?;
    credentials::logout(&state.docs, &session).await?;

    info!("IDE session closed for {}", session.user_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn execute_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let (session, hackathon) = active_session(&state, &headers).await?;
    let request: ExecuteRequest = parse(&body)?;

    let language: Language = request.language.parse()?;
    if !hackathon.allows_language(language) {
        return Err(AppError::Unprocessable(format!(
            "{language} is not allowed in this hackathon"
        )));
    }

    let result = state
        .runner
        .execute(language, &request.code, &request.stdin)
        .await?;

    info!(
        "Ran {language} for {} in {}ms (exit {:?})",
        session.user_id, result.duration_ms, result.exit_code
    );
    Ok(Json(result))
}

pub async fn terminal_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let (session, _) = active_session(&state, &headers).await?;
    let request: TerminalRequest = parse(&body)?;

    let files: Vec<FileEntry> = match session.team_id.as_deref() {
        Some(team_id) => {
            let team = state.docs.require::<Team>(team_id).await?;
            if !team.is_member(&session.user_id) {
                return Err(AppError::Forbidden(format!(
                    "{} is no longer on team {team_id}",
                    session.user_id
                )));
            }
            let branch = request.branch.as_deref().unwrap_or(MAIN_BRANCH);

            team.workspace.branch(branch)?.files.clone()
        }
        None => Vec::new(),
    };

    Ok(Json(
        state.runner.run_terminal(&request.command, &files).await?,
    ))
}

pub async fn activity_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let (session, _) = active_session(&state, &headers).await?;
    let request: ActivityRequest = parse(&body)?;

    let event = ActivityEvent {
        kind: request.kind,
        at: now(),
        detail: request.detail,
    };
    let limit = state.config.tab_switch_limit;

    let (_, (receipt, newly_flagged)) = state
        .docs
        .update::<Hackathon, _, _>(&session.hackathon_id, |hackathon| {
            let participant = hackathon.participant_mut(&session.user_id)?;
            let newly_flagged = participant.activity.record(event.clone(), limit);

            Ok((
                ActivityReceipt {
                    tab_switches: participant.activity.tab_switches,
                    flagged: participant.activity.flagged,
                },
                newly_flagged,
            ))
        })
        .await?;

    if newly_flagged {
        warn!(
            "Participant {} in {} flagged after {} tab switches",
            session.user_id, session.hackathon_id, receipt.tab_switches
        );
    }

    Ok(Json(receipt))
}
