//! Team and Athlete Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    api::{
        handlers::{respond, ApiResponse, AppState},
        middleware::AuthUser,
    },
    models::{
        access::Action,
        requests::PageQuery,
        team::{
            AddTeamAdminRequest, Athlete, AthleteFilter, CreateAthleteRequest, CreateTeamRequest,
            Team, TeamAdmin, UpdateAthleteRequest, UpdateTeamRequest,
        },
    },
    utils::error::AppResult,
};

pub async fn list_teams(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<Team>>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(
        state.team_service.list(org_id, query.pagination()).await?,
    ))
}

pub async fn get_team(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, team_id)): Path<(Uuid, Uuid)>,
) -> AppResult<ApiResponse<Team>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(state.team_service.get(org_id, team_id).await?))
}

pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<CreateTeamRequest>,
) -> AppResult<(StatusCode, ApiResponse<Team>)> {
    state.authorize(&auth_user, org_id, Action::CreateTeam).await?;
    let team = state.team_service.create(org_id, request).await?;
    Ok((StatusCode::CREATED, respond(team)))
}

/// Team admins may rename their own team
pub async fn update_team(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, team_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateTeamRequest>,
) -> AppResult<ApiResponse<Team>> {
    state
        .authorize(&auth_user, org_id, Action::UpdateTeam(team_id))
        .await?;
    Ok(respond(
        state.team_service.update(org_id, team_id, request).await?,
    ))
}

pub async fn delete_team(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, team_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state.authorize(&auth_user, org_id, Action::DeleteTeam).await?;
    state.team_service.delete(org_id, team_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_team_admins(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, team_id)): Path<(Uuid, Uuid)>,
) -> AppResult<ApiResponse<Vec<TeamAdmin>>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(
        state.team_service.list_admins(org_id, team_id).await?,
    ))
}

pub async fn add_team_admin(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, team_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<AddTeamAdminRequest>,
) -> AppResult<(StatusCode, ApiResponse<TeamAdmin>)> {
    state
        .authorize(&auth_user, org_id, Action::ManageTeamAdmins)
        .await?;
    let admin = state
        .team_service
        .add_admin(org_id, team_id, request)
        .await?;
    Ok((StatusCode::CREATED, respond(admin)))
}

pub async fn remove_team_admin(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, team_id, user_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .authorize(&auth_user, org_id, Action::ManageTeamAdmins)
        .await?;
    state
        .team_service
        .remove_admin(org_id, team_id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Athletes of an organization, filtered by `team_id` and a name `search`
pub async fn list_athletes(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    Query(filter): Query<AthleteFilter>,
) -> AppResult<ApiResponse<Vec<Athlete>>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(state.athlete_service.list(org_id, &filter).await?))
}

pub async fn get_athlete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, athlete_id)): Path<(Uuid, Uuid)>,
) -> AppResult<ApiResponse<Athlete>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(state.athlete_service.get(org_id, athlete_id).await?))
}

pub async fn create_athlete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<CreateAthleteRequest>,
) -> AppResult<(StatusCode, ApiResponse<Athlete>)> {
    state
        .authorize(&auth_user, org_id, Action::WriteAthlete)
        .await?;
    let athlete = state.athlete_service.create(org_id, request).await?;
    Ok((StatusCode::CREATED, respond(athlete)))
}

pub async fn update_athlete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, athlete_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateAthleteRequest>,
) -> AppResult<ApiResponse<Athlete>> {
    state
        .authorize(&auth_user, org_id, Action::WriteAthlete)
        .await?;
    Ok(respond(
        state
            .athlete_service
            .update(org_id, athlete_id, request)
            .await?,
    ))
}

pub async fn delete_athlete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, athlete_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .authorize(&auth_user, org_id, Action::DeleteAthlete)
        .await?;
    state.athlete_service.delete(org_id, athlete_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
