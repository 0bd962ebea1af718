//! Team workspace endpoints. Reads are open to team members at any time, writes only
//! while the hackathon is active.
use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State as AxumState},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use records::{
    RecordError, RecordResult,
    hackathon::{Hackathon, Status},
    team::Team,
    workspace::{MAIN_BRANCH, Workspace},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    error::AppError,
    state::State,
    utils::{actor, now, parse},
};

#[derive(Deserialize)]
pub struct NewBranch {
    name: String,
    #[serde(default)]
    from: Option<String>,
}

#[derive(Deserialize)]
pub struct FileWrite {
    path: String,
    content: String,
}

#[derive(Deserialize)]
pub struct FileDelete {
    path: String,
}

#[derive(Deserialize)]
pub struct NewCommit {
    message: String,
}

#[derive(Deserialize)]
pub struct NewPullRequest {
    title: String,
    source: String,
    #[serde(default)]
    target: Option<String>,
}

async fn member_team(state: &State, headers: &HeaderMap, team_id: &str) -> Result<Team, AppError> {
    let actor = actor(state, headers).await?;
    let team = state.docs.require::<Team>(team_id).await?;

    if !team.is_member(&actor.id) {
        return Err(AppError::Forbidden(
            "only team members can see the workspace".into(),
        ));
    }

    Ok(team)
}

/// Runs `apply` against the team's workspace as `actor_id` and stores the result.
async fn edit_workspace<R, F>(
    state: &State,
    headers: &HeaderMap,
    team_id: &str,
    mut apply: F,
) -> Result<R, AppError>
where
    R: Send,
    F: FnMut(&mut Workspace, &str) -> RecordResult<R> + Send,
{
    let actor = actor(state, headers).await?;
    let team = state.docs.require::<Team>(team_id).await?;
    let hackathon = state.docs.require::<Hackathon>(&team.hackathon_id).await?;

    if hackathon.status != Status::Active {
        return Err(AppError::Conflict(format!(
            "the workspace is read-only while the hackathon is {}",
            hackathon.status.as_str()
        )));
    }

    let (_, outcome) = state
        .docs
        .update::<Team, _, _>(team_id, |team| {
            if !team.is_member(&actor.id) {
                return Err(RecordError::Forbidden(
                    "only team members can change the workspace".into(),
                ));
            }

            apply(&mut team.workspace, &actor.id)
        })
        .await?;

    Ok(outcome)
}

pub async fn list_branches_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let team = member_team(&state, &headers, &team_id).await?;

    Ok(Json(team.workspace.summaries()))
}

pub async fn create_branch_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: NewBranch = parse(&body)?;
    let from = request.from.as_deref().unwrap_or(MAIN_BRANCH);

    let branch = edit_workspace(&state, &headers, &team_id, |workspace, _| {
        workspace.create_branch(&request.name, from).cloned()
    })
    .await?;

    info!("Team {team_id} branched {} from {from}", branch.name);
    Ok((StatusCode::CREATED, Json(branch)))
}

pub async fn get_branch_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path((team_id, branch)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let team = member_team(&state, &headers, &team_id).await?;

    Ok(Json(team.workspace.branch(&branch)?.clone()))
}

pub async fn delete_branch_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path((team_id, branch)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    edit_workspace(&state, &headers, &team_id, |workspace, _| {
        workspace.delete_branch(&branch)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn write_file_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path((team_id, branch)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: FileWrite = parse(&body)?;

    let path = edit_workspace(&state, &headers, &team_id, |workspace, _| {
        workspace.write_file(&branch, &request.path, request.content.clone())
    })
    .await?;

    Ok(Json(json!({ "branch": branch, "path": path })))
}

pub async fn delete_file_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path((team_id, branch)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: FileDelete = parse(&body)?;

    edit_workspace(&state, &headers, &team_id, |workspace, _| {
        workspace.delete_file(&branch, &request.path)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn commit_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path((team_id, branch)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: NewCommit = parse(&body)?;
    let now = now();

    let commit = edit_workspace(&state, &headers, &team_id, |workspace, author| {
        workspace.commit(&branch, &request.message, author, now)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(commit)))
}

pub async fn commit_log_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path((team_id, branch)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let team = member_team(&state, &headers, &team_id).await?;
    let mut commits = team.workspace.branch(&branch)?.commits.clone();
    commits.reverse();

    Ok(Json(commits))
}

pub async fn list_pulls_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let team = member_team(&state, &headers, &team_id).await?;

    Ok(Json(team.workspace.pull_requests))
}

pub async fn open_pull_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: NewPullRequest = parse(&body)?;
    let target = request.target.as_deref().unwrap_or(MAIN_BRANCH);
    let now = now();

    let pull = edit_workspace(&state, &headers, &team_id, |workspace, author| {
        workspace.open_pull_request(&request.title, &request.source, target, author, now)
    })
    .await?;

    info!("Team {team_id} opened pull request #{}", pull.number);
    Ok((StatusCode::CREATED, Json(pull)))
}

pub async fn merge_pull_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path((team_id, number)): Path<(String, u32)>,
) -> Result<impl IntoResponse, AppError> {
    let now = now();

    let pull = edit_workspace(&state, &headers, &team_id, |workspace, actor| {
        workspace.merge_pull_request(number, actor, now)
    })
    .await?;

    info!("Team {team_id} merged pull request #{number}");
    Ok(Json(pull))
}

pub async fn close_pull_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path((team_id, number)): Path<(String, u32)>,
) -> Result<impl IntoResponse, AppError> {
    let now = now();

    let pull = edit_workspace(&state, &headers, &team_id, |workspace, _| {
        workspace.close_pull_request(number, now)
    })
    .await?;

    Ok(Json(pull))
}
