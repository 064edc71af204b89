//! Organization Handlers
//!
//! Organizations and their membership. Creating and deleting organizations is
//! reserved to platform admins; everything else is authorized per organization.

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
        organization::{
            AddMemberRequest, CreateOrganizationRequest, Organization, OrganizationMember,
            UpdateOrganizationRequest,
        },
        requests::PageQuery,
    },
    utils::error::AppResult,
};

/// Organizations visible to the caller
pub async fn list_organizations(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<Organization>>> {
    let user_id = auth_user.0.user_id;
    let platform_admin = state.access_service.is_platform_admin(user_id).await?;

    let organizations = state
        .organization_service
        .list_for_user(user_id, platform_admin, query.pagination())
        .await?;
    Ok(respond(organizations))
}

pub async fn create_organization(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<CreateOrganizationRequest>,
) -> AppResult<(StatusCode, ApiResponse<Organization>)> {
    state
        .access_service
        .require_platform_admin(auth_user.0.user_id)
        .await?;

    let organization = state.organization_service.create(request).await?;
    log::info!(
        "Organization {} ({}) created by {}",
        organization.id,
        organization.slug,
        auth_user.0.user_id
    );
    Ok((StatusCode::CREATED, respond(organization)))
}

pub async fn get_organization(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
) -> AppResult<ApiResponse<Organization>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(state.organization_service.get(org_id).await?))
}

pub async fn update_organization(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<UpdateOrganizationRequest>,
) -> AppResult<ApiResponse<Organization>> {
    state
        .authorize(&auth_user, org_id, Action::UpdateOrganization)
        .await?;
    Ok(respond(
        state.organization_service.update(org_id, request).await?,
    ))
}

pub async fn delete_organization(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state
        .authorize(&auth_user, org_id, Action::DeleteOrganization)
        .await?;
    state.organization_service.delete(org_id).await?;

    log::info!("Organization {} deleted by {}", org_id, auth_user.0.user_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
) -> AppResult<ApiResponse<Vec<OrganizationMember>>> {
    state
        .authorize(&auth_user, org_id, Action::ViewOrganization)
        .await?;
    Ok(respond(state.organization_service.list_members(org_id).await?))
}

/// Adds a member by email, or changes the role of an existing one
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<AddMemberRequest>,
) -> AppResult<(StatusCode, ApiResponse<OrganizationMember>)> {
    state
        .authorize(&auth_user, org_id, Action::ManageMembers)
        .await?;
    let member = state.organization_service.add_member(org_id, request).await?;
    Ok((StatusCode::CREATED, respond(member)))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .authorize(&auth_user, org_id, Action::ManageMembers)
        .await?;
    state
        .organization_service
        .remove_member(org_id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
