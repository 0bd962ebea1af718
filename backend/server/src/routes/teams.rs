use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State as AxumState},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use records::{
    credentials::issue_team_credentials,
    judging::{NewScore, NewSubmission, score_team, submit},
    matching::recommend_teammates,
    team::{self, NewTeam, Team, TeamView},
};
use serde::Deserialize;

use crate::{
    error::AppError,
    state::State,
    utils::{LimitQuery, actor, match_limit, now, parse},
};

#[derive(Deserialize)]
pub struct JoinRequest {
    code: String,
}

fn membership_response(team: Option<Team>, viewer_id: &str) -> Response {
    match team {
        Some(team) => Json(TeamView::for_viewer(&team, Some(viewer_id))).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub async fn create_team_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(hackathon_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    let input: NewTeam = parse(&body)?;

    let team = team::create_team(&state.docs, &actor.id, &hackathon_id, input, now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(TeamView::for_viewer(&team, Some(&actor.id))),
    ))
}

pub async fn list_teams_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(hackathon_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = actor(&state, &headers).await.ok();
    let viewer_id = viewer.as_ref().map(|user| user.id.as_str());

    let teams: Vec<TeamView> = team::teams_for(&state.docs, &hackathon_id)
        .await?
        .iter()
        .map(|team| TeamView::for_viewer(team, viewer_id))
        .collect();

    Ok(Json(teams))
}

pub async fn join_team_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(hackathon_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    let request: JoinRequest = parse(&body)?;

    let team = team::join_team(&state.docs, &actor.id, &hackathon_id, &request.code).await?;

    Ok(Json(TeamView::for_viewer(&team, Some(&actor.id))))
}

pub async fn get_team_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = actor(&state, &headers).await.ok();
    let team = state.docs.require::<Team>(&team_id).await?;

    Ok(Json(TeamView::for_viewer(
        &team,
        viewer.as_ref().map(|user| user.id.as_str()),
    )))
}

pub async fn leave_team_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
) -> Result<Response, AppError> {
    let actor = actor(&state, &headers).await?;
    let team = team::leave_team(&state.docs, &actor.id, &team_id).await?;

    Ok(membership_response(team, &actor.id))
}

pub async fn remove_member_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path((team_id, user_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let actor = actor(&state, &headers).await?;
    let team = team::remove_member(&state.docs, &actor.id, &team_id, &user_id).await?;

    Ok(membership_response(team, &actor.id))
}

pub async fn teammate_matches_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;

    Ok(Json(
        recommend_teammates(&state.docs, &team_id, &actor.id, match_limit(query.limit)).await?,
    ))
}

pub async fn team_credentials_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;

    let issued = issue_team_credentials(
        &state.docs,
        &actor.id,
        &team_id,
        &state.config.credential_pepper,
        now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(issued)))
}

pub async fn submission_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    let input: NewSubmission = parse(&body)?;

    Ok(Json(
        submit(&state.docs, &actor.id, &team_id, input, now()).await?,
    ))
}

pub async fn score_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    let input: NewScore = parse(&body)?;

    let team = score_team(&state.docs, &actor.id, &team_id, input, now()).await?;
    let score = team
        .scores
        .into_iter()
        .find(|score| score.judge_id == actor.id)
        .ok_or_else(|| AppError::NotFound(format!("score by {} not found", actor.id)))?;

    Ok(Json(score))
}
