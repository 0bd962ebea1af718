use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State as AxumState},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use records::user::{self, NewUser, Organization, ProfileUpdate, User};
use serde::Deserialize;

use crate::{
    error::AppError,
    state::State,
    utils::{actor, now, parse},
};

#[derive(Deserialize)]
pub struct NewOrganization {
    name: String,
}

#[derive(Deserialize)]
pub struct MemberRequest {
    user_id: String,
}

pub async fn create_user_handler(
    AxumState(state): AxumState<Arc<State>>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let input: NewUser = parse(&body)?;
    let user = user::create_user(&state.docs, input, now()).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.docs.require::<User>(&user_id).await?))
}

pub async fn update_profile_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    let update: ProfileUpdate = parse(&body)?;

    Ok(Json(
        user::update_profile(&state.docs, &actor.id, &user_id, update).await?,
    ))
}

pub async fn create_organization_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    let input: NewOrganization = parse(&body)?;

    let organization =
        user::create_organization(&state.docs, &actor.id, &input.name, now()).await?;

    Ok((StatusCode::CREATED, Json(organization)))
}

pub async fn get_organization_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(organization_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        state.docs.require::<Organization>(&organization_id).await?,
    ))
}

pub async fn add_organization_member_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
    Path(organization_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(&state, &headers).await?;
    let input: MemberRequest = parse(&body)?;

    let organization = user::add_organization_member(
        &state.docs,
        &actor.id,
        &organization_id,
        &input.user_id,
    )
    .await?;

    Ok(Json(organization))
}
