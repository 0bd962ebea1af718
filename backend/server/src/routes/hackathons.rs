use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State as AxumState},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use records::{
    RecordError,
    activity::{ActivitySummary, sort_dashboard},
    credentials::issue_participant_credentials,
    hackathon::{
        self, Hackathon, HackathonUpdate, HackathonView, NewHackathon, Status, require_organizer,
    },
    judging::leaderboard,
    matching::recommend_teams,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::AppError,
    search::SearchQuery,
    state::State,
    utils::{LimitQuery, actor, match_limit, now, parse, parse_or_default},
};

#[derive(Deserialize)]
pub struct AdvanceRequest {
    to: Status,
}

#[derive(Deserialize)]
pub struct RegistrationRequest {
    #[serde(default = "looking_by_default")]
    looking_for_team: bool,
}

impl Default for RegistrationRequest {
    fn default() -> Self {
        Self {
            looking_for_team: looking_by_default(),
        }
    }
}

fn looking_by_default() -> bool {
    true
}

#[derive(Deserialize)]
pub struct JudgeRequest {
    user_id: String,
}

fn heartbeat_window(state: &State) -> chrono::Duration {
    chrono::Duration::seconds(state.config.heartbeat_window.as_secs() as i64)
}

pub async fn create_hackathon_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    let input: NewHackathon = parse(&body)?;

    let hackathon = hackathon::create_hackathon(&state.docs, &actor.id, input, now()).await?;
    state.search.upsert(&hackathon).await;

    Ok((StatusCode::CREATED, Json(HackathonView::from(&hackathon))))
}

pub async fn search_handler(
    AxumState(state): AxumState<Arc<State>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.search.search(query).await?))
}

/// Drafts are only visible to the people organizing them.
pub async fn get_hackathon_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(hackathon_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let hackathon = state.docs.require::<Hackathon>(&hackathon_id).await?;

    if hackathon.status == Status::Draft {
        let actor = actor(&state, &headers)
            .await
            .map_err(|_| AppError::NotFound(format!("hackathon {hackathon_id} not found")))?;

        require_organizer(&state.docs, &actor.id, &hackathon_id)
            .await
            .map_err(|e| match e {
                RecordError::Forbidden(_) => {
                    AppError::NotFound(format!("hackathon {hackathon_id} not found"))
                }
                e => e.into(),
            })?;
    }

    Ok(Json(HackathonView::from(&hackathon)))
}

pub async fn update_hackathon_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(hackathon_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    let update: HackathonUpdate = parse(&body)?;

    let hackathon =
        hackathon::update_hackathon(&state.docs, &actor.id, &hackathon_id, update, now()).await?;
    state.search.upsert(&hackathon).await;

    Ok(Json(HackathonView::from(&hackathon)))
}

pub async fn advance_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(hackathon_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    let request: AdvanceRequest = parse(&body)?;

    let hackathon =
        hackathon::advance_hackathon(&state.docs, &actor.id, &hackathon_id, request.to, now())
            .await?;
    state.search.upsert(&hackathon).await;

    Ok(Json(HackathonView::from(&hackathon)))
}

pub async fn register_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(hackathon_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    let request: RegistrationRequest = parse_or_default(&body)?;

    let participant = hackathon::register(
        &state.docs,
        &actor.id,
        &hackathon_id,
        request.looking_for_team,
        now(),
    )
    .await?;

    info!("User {} registered for {hackathon_id}", actor.id);
    Ok((StatusCode::CREATED, Json(participant)))
}

pub async fn withdraw_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(hackathon_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    hackathon::withdraw(&state.docs, &actor.id, &hackathon_id).await?;

    info!("User {} withdrew from {hackathon_id}", actor.id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn participants_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(hackathon_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        hackathon::list_participants(&state.docs, &hackathon_id).await?,
    ))
}

pub async fn add_judge_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(hackathon_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    let request: JudgeRequest = parse(&body)?;

    let hackathon =
        hackathon::add_judge(&state.docs, &actor.id, &hackathon_id, &request.user_id).await?;

    Ok(Json(HackathonView::from(&hackathon)))
}

pub async fn participant_credentials_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(hackathon_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;

    let issued = issue_participant_credentials(
        &state.docs,
        &actor.id,
        &hackathon_id,
        &state.config.credential_pepper,
        now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(issued)))
}

pub async fn team_matches_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(hackathon_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;

    Ok(Json(
        recommend_teams(
            &state.docs,
            &hackathon_id,
            &actor.id,
            match_limit(query.limit),
        )
        .await?,
    ))
}

pub async fn activity_dashboard_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(hackathon_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    let hackathon = require_organizer(&state.docs, &actor.id, &hackathon_id).await?;

    let now = now();
    let window = heartbeat_window(&state);
    let mut summaries: Vec<ActivitySummary> = hackathon
        .participants
        .iter()
        .map(|participant| {
            ActivitySummary::new(
                &participant.user_id,
                participant.team_id.as_deref(),
                &participant.activity,
                now,
                window,
            )
        })
        .collect();
    sort_dashboard(&mut summaries);

    Ok(Json(summaries))
}

pub async fn clear_flag_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path((hackathon_id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    require_organizer(&state.docs, &actor.id, &hackathon_id).await?;

    let (_, summary) = state
        .docs
        .update::<Hackathon, _, _>(&hackathon_id, |hackathon| {
            let participant = hackathon.participant_mut(&user_id)?;
            participant.activity.clear_flag();

            Ok(ActivitySummary::new(
                &participant.user_id,
                participant.team_id.as_deref(),
                &participant.activity,
                now(),
                heartbeat_window(&state),
            ))
        })
        .await?;

    info!("Flag on {user_id} in {hackathon_id} cleared by {}", actor.id);
    Ok(Json(summary))
}

pub async fn leaderboard_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(hackathon_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(leaderboard(&state.docs, &hackathon_id).await?))
}
