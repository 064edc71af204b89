//! Competition Handlers
//!
//! Locations, seasons, competitions, their events and team rosters.
//!
//! Schedule data (locations, seasons, competitions, events) is maintained by
//! organization admins. Roster entries are managed per team, so a team admin
//! can enter and withdraw athletes for their own team only.

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
        competition::{
            Competition, CompetitionEvent, CompetitionFilter, CompetitionRequest, EventRequest,
            Location, LocationRequest, RosterEntry, RosterEntryRequest, RosterFilter, Season,
            SeasonRequest, UpdateLocationRequest,
        },
        requests::PageQuery,
    },
    utils::error::AppResult,
};

// Locations

pub async fn list_locations(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<Location>>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(
        state
            .location_service
            .list(org_id, query.pagination())
            .await?,
    ))
}

pub async fn get_location(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, location_id)): Path<(Uuid, Uuid)>,
) -> AppResult<ApiResponse<Location>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(
        state.location_service.get(org_id, location_id).await?,
    ))
}

pub async fn create_location(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<LocationRequest>,
) -> AppResult<(StatusCode, ApiResponse<Location>)> {
    state
        .authorize(&auth_user, org_id, Action::ManageSchedule)
        .await?;
    let location = state.location_service.create(org_id, request).await?;
    Ok((StatusCode::CREATED, respond(location)))
}

pub async fn update_location(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, location_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateLocationRequest>,
) -> AppResult<ApiResponse<Location>> {
    state
        .authorize(&auth_user, org_id, Action::ManageSchedule)
        .await?;
    Ok(respond(
        state
            .location_service
            .update(org_id, location_id, request)
            .await?,
    ))
}

pub async fn delete_location(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, location_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .authorize(&auth_user, org_id, Action::ManageSchedule)
        .await?;
    state.location_service.delete(org_id, location_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Seasons

pub async fn list_seasons(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
) -> AppResult<ApiResponse<Vec<Season>>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(state.competition_service.list_seasons(org_id).await?))
}

pub async fn get_season(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, season_id)): Path<(Uuid, Uuid)>,
) -> AppResult<ApiResponse<Season>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(
        state
            .competition_service
            .get_season(org_id, season_id)
            .await?,
    ))
}

pub async fn create_season(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<SeasonRequest>,
) -> AppResult<(StatusCode, ApiResponse<Season>)> {
    state
        .authorize(&auth_user, org_id, Action::ManageSchedule)
        .await?;
    let season = state
        .competition_service
        .create_season(org_id, request)
        .await?;
    Ok((StatusCode::CREATED, respond(season)))
}

pub async fn update_season(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, season_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<SeasonRequest>,
) -> AppResult<ApiResponse<Season>> {
    state
        .authorize(&auth_user, org_id, Action::ManageSchedule)
        .await?;
    Ok(respond(
        state
            .competition_service
            .update_season(org_id, season_id, request)
            .await?,
    ))
}

pub async fn delete_season(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, season_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .authorize(&auth_user, org_id, Action::ManageSchedule)
        .await?;
    state
        .competition_service
        .delete_season(org_id, season_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// Competitions

/// Competitions filtered by `season_id` and a `from`/`to` date window
pub async fn list_competitions(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    Query(filter): Query<CompetitionFilter>,
) -> AppResult<ApiResponse<Vec<Competition>>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(
        state
            .competition_service
            .list_competitions(org_id, &filter)
            .await?,
    ))
}

pub async fn get_competition(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, competition_id)): Path<(Uuid, Uuid)>,
) -> AppResult<ApiResponse<Competition>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(
        state
            .competition_service
            .get_competition(org_id, competition_id)
            .await?,
    ))
}

pub async fn create_competition(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<CompetitionRequest>,
) -> AppResult<(StatusCode, ApiResponse<Competition>)> {
    state
        .authorize(&auth_user, org_id, Action::ManageSchedule)
        .await?;
    let competition = state
        .competition_service
        .create_competition(org_id, request)
        .await?;
    Ok((StatusCode::CREATED, respond(competition)))
}

pub async fn update_competition(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, competition_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<CompetitionRequest>,
) -> AppResult<ApiResponse<Competition>> {
    state
        .authorize(&auth_user, org_id, Action::ManageSchedule)
        .await?;
    Ok(respond(
        state
            .competition_service
            .update_competition(org_id, competition_id, request)
            .await?,
    ))
}

pub async fn delete_competition(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, competition_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .authorize(&auth_user, org_id, Action::ManageSchedule)
        .await?;
    state
        .competition_service
        .delete_competition(org_id, competition_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// Events

pub async fn list_events(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, competition_id)): Path<(Uuid, Uuid)>,
) -> AppResult<ApiResponse<Vec<CompetitionEvent>>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(
        state
            .competition_service
            .list_events(org_id, competition_id)
            .await?,
    ))
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, competition_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<EventRequest>,
) -> AppResult<(StatusCode, ApiResponse<CompetitionEvent>)> {
    state
        .authorize(&auth_user, org_id, Action::ManageSchedule)
        .await?;
    let event = state
        .competition_service
        .create_event(org_id, competition_id, request)
        .await?;
    Ok((StatusCode::CREATED, respond(event)))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, competition_id, event_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .authorize(&auth_user, org_id, Action::ManageSchedule)
        .await?;
    state
        .competition_service
        .delete_event(org_id, competition_id, event_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// Rosters

pub async fn list_roster(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, competition_id)): Path<(Uuid, Uuid)>,
    Query(filter): Query<RosterFilter>,
) -> AppResult<ApiResponse<Vec<RosterEntry>>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(
        state
            .roster_service
            .list(org_id, competition_id, &filter)
            .await?,
    ))
}

pub async fn add_roster_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, competition_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<RosterEntryRequest>,
) -> AppResult<(StatusCode, ApiResponse<RosterEntry>)> {
    state
        .authorize(&auth_user, org_id, Action::ManageRoster(request.team_id))
        .await?;
    let entry = state
        .roster_service
        .add(org_id, competition_id, request)
        .await?;
    Ok((StatusCode::CREATED, respond(entry)))
}

/// The entry is loaded first; permission depends on the team it belongs to
pub async fn remove_roster_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, competition_id, entry_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let principal = state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    let entry = state
        .roster_service
        .get(org_id, competition_id, entry_id)
        .await?;
    principal.authorize(Action::ManageRoster(entry.team_id))?;

    state
        .roster_service
        .remove(org_id, competition_id, entry.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
