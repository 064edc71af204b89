//! API Route Definitions
//!
//! This module defines all HTTP routes and their corresponding handlers using a flexible
//! builder pattern. The RouterBuilder enables route groups selectively, so the same
//! library can back a full admin API, a read-only schedule viewer or a bare health probe.
//!
//! Organization resources are nested under `/organizations/{org_id}`. Everything except
//! health, the credential endpoints and the import callback sits behind the bearer-token
//! middleware, which is attached with [`RouterBuilder::with_auth`].

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};

use super::{
    auth_handlers::*, competition_handlers::*, handlers::*, import_handlers::*,
    middleware::auth_middleware, organization_handlers::*, team_handlers::*,
};
use crate::service::JwtService;

/// Builder for creating API routes with configurable route groups
#[derive(Default)]
pub struct RouterBuilder {
    /// GET /health
    health_check: bool,
    /// /auth/signup, /auth/login, /auth/refresh, /auth/logout, /auth/me
    auth: bool,
    /// /organizations and their members
    organizations: bool,
    /// Teams and team admins
    teams: bool,
    athletes: bool,
    locations: bool,
    seasons: bool,
    /// Competitions and their events
    competitions: bool,
    rosters: bool,
    /// Upload endpoints, job queries and the webhook callback
    imports: bool,
    /// Whether create/update/delete routes are registered for resource groups
    writes: bool,
    jwt_service: Option<Arc<JwtService>>,
}

impl RouterBuilder {
    /// Creates a new router builder with all routes disabled by default
    pub fn new() -> Self {
        Self::default()
    }

    /// Every route group, read and write
    pub fn with_all_routes() -> Self {
        Self {
            health_check: true,
            auth: true,
            organizations: true,
            teams: true,
            athletes: true,
            locations: true,
            seasons: true,
            competitions: true,
            rosters: true,
            imports: true,
            writes: true,
            jwt_service: None,
        }
    }

    /// Sign-in plus GET routes for every resource; no imports
    pub fn with_readonly_routes() -> Self {
        Self {
            imports: false,
            writes: false,
            ..Self::with_all_routes()
        }
    }

    /// Health check only, for monitoring probes
    pub fn with_minimal_routes() -> Self {
        Self {
            health_check: true,
            ..Self::default()
        }
    }

    /// Protects authenticated routes with bearer-token validation
    ///
    /// Without it, authenticated route groups are not registered.
    pub fn with_auth(mut self, jwt_service: Arc<JwtService>) -> Self {
        self.jwt_service = Some(jwt_service);
        self
    }

    pub fn health_check(mut self, enabled: bool) -> Self {
        self.health_check = enabled;
        self
    }

    pub fn auth(mut self, enabled: bool) -> Self {
        self.auth = enabled;
        self
    }

    pub fn organizations(mut self, enabled: bool) -> Self {
        self.organizations = enabled;
        self
    }

    pub fn teams(mut self, enabled: bool) -> Self {
        self.teams = enabled;
        self
    }

    pub fn athletes(mut self, enabled: bool) -> Self {
        self.athletes = enabled;
        self
    }

    pub fn locations(mut self, enabled: bool) -> Self {
        self.locations = enabled;
        self
    }

    pub fn seasons(mut self, enabled: bool) -> Self {
        self.seasons = enabled;
        self
    }

    pub fn competitions(mut self, enabled: bool) -> Self {
        self.competitions = enabled;
        self
    }

    pub fn rosters(mut self, enabled: bool) -> Self {
        self.rosters = enabled;
        self
    }

    pub fn imports(mut self, enabled: bool) -> Self {
        self.imports = enabled;
        self
    }

    pub fn writes(mut self, enabled: bool) -> Self {
        self.writes = enabled;
        self
    }

    /// Builds the Axum router with the configured routes
    pub fn build(self) -> Router<AppState> {
        let public = self.public_routes();

        if !self.has_protected_routes() {
            return public;
        }

        match &self.jwt_service {
            Some(jwt_service) => {
                let protected = self
                    .protected_routes()
                    .route_layer(from_fn_with_state(jwt_service.clone(), auth_middleware));
                public.merge(protected)
            }
            None => {
                log::warn!("RouterBuilder has no JWT service; authenticated routes are disabled");
                public
            }
        }
    }

    fn has_protected_routes(&self) -> bool {
        self.auth
            || self.organizations
            || self.teams
            || self.athletes
            || self.locations
            || self.seasons
            || self.competitions
            || self.rosters
            || self.imports
    }

    fn public_routes(&self) -> Router<AppState> {
        let mut router = Router::new();

        if self.health_check {
            router = router.route("/health", get(health_check));
        }

        if self.auth {
            router = router
                .route("/auth/signup", post(signup))
                .route("/auth/login", post(login))
                .route("/auth/refresh", post(refresh_token))
                .route("/auth/logout", post(logout));
        }

        if self.imports {
            router = router.route("/imports/callback", post(import_callback));
        }

        router
    }

    fn protected_routes(&self) -> Router<AppState> {
        let mut router = Router::new();
        let writes = self.writes;

        if self.auth {
            router = router.route("/auth/me", get(me));
        }

        if self.organizations {
            router = router
                .route("/organizations", get(list_organizations))
                .route("/organizations/{org_id}", get(get_organization))
                .route("/organizations/{org_id}/members", get(list_members));
            if writes {
                router = router
                    .route("/organizations", post(create_organization))
                    .route(
                        "/organizations/{org_id}",
                        put(update_organization).delete(delete_organization),
                    )
                    .route("/organizations/{org_id}/members", post(add_member))
                    .route(
                        "/organizations/{org_id}/members/{user_id}",
                        delete(remove_member),
                    );
            }
        }

        if self.teams {
            router = router
                .route("/organizations/{org_id}/teams", get(list_teams))
                .route("/organizations/{org_id}/teams/{team_id}", get(get_team))
                .route(
                    "/organizations/{org_id}/teams/{team_id}/admins",
                    get(list_team_admins),
                );
            if writes {
                router = router
                    .route("/organizations/{org_id}/teams", post(create_team))
                    .route(
                        "/organizations/{org_id}/teams/{team_id}",
                        put(update_team).delete(delete_team),
                    )
                    .route(
                        "/organizations/{org_id}/teams/{team_id}/admins",
                        post(add_team_admin),
                    )
                    .route(
                        "/organizations/{org_id}/teams/{team_id}/admins/{user_id}",
                        delete(remove_team_admin),
                    );
            }
        }

        if self.athletes {
            router = router
                .route("/organizations/{org_id}/athletes", get(list_athletes))
                .route(
                    "/organizations/{org_id}/athletes/{athlete_id}",
                    get(get_athlete),
                );
            if writes {
                router = router
                    .route("/organizations/{org_id}/athletes", post(create_athlete))
                    .route(
                        "/organizations/{org_id}/athletes/{athlete_id}",
                        put(update_athlete).delete(delete_athlete),
                    );
            }
        }

        if self.locations {
            router = router
                .route("/organizations/{org_id}/locations", get(list_locations))
                .route(
                    "/organizations/{org_id}/locations/{location_id}",
                    get(get_location),
                );
            if writes {
                router = router
                    .route("/organizations/{org_id}/locations", post(create_location))
                    .route(
                        "/organizations/{org_id}/locations/{location_id}",
                        put(update_location).delete(delete_location),
                    );
            }
        }

        if self.seasons {
            router = router
                .route("/organizations/{org_id}/seasons", get(list_seasons))
                .route(
                    "/organizations/{org_id}/seasons/{season_id}",
                    get(get_season),
                );
            if writes {
                router = router
                    .route("/organizations/{org_id}/seasons", post(create_season))
                    .route(
                        "/organizations/{org_id}/seasons/{season_id}",
                        put(update_season).delete(delete_season),
                    );
            }
        }

        if self.competitions {
            router = router
                .route(
                    "/organizations/{org_id}/competitions",
                    get(list_competitions),
                )
                .route(
                    "/organizations/{org_id}/competitions/{competition_id}",
                    get(get_competition),
                )
                .route(
                    "/organizations/{org_id}/competitions/{competition_id}/events",
                    get(list_events),
                );
            if writes {
                router = router
                    .route(
                        "/organizations/{org_id}/competitions",
                        post(create_competition),
                    )
                    .route(
                        "/organizations/{org_id}/competitions/{competition_id}",
                        put(update_competition).delete(delete_competition),
                    )
                    .route(
                        "/organizations/{org_id}/competitions/{competition_id}/events",
                        post(create_event),
                    )
                    .route(
                        "/organizations/{org_id}/competitions/{competition_id}/events/{event_id}",
                        delete(delete_event),
                    );
            }
        }

        if self.rosters {
            router = router.route(
                "/organizations/{org_id}/competitions/{competition_id}/roster",
                get(list_roster),
            );
            if writes {
                router = router
                    .route(
                        "/organizations/{org_id}/competitions/{competition_id}/roster",
                        post(add_roster_entry),
                    )
                    .route(
                        "/organizations/{org_id}/competitions/{competition_id}/roster/{entry_id}",
                        delete(remove_roster_entry),
                    );
            }
        }

        if self.imports {
            router = router
                .route(
                    "/organizations/{org_id}/imports",
                    get(list_imports).post(start_import),
                )
                .route(
                    "/organizations/{org_id}/imports/direct",
                    post(run_direct_import),
                )
                .route("/organizations/{org_id}/imports/{job_id}", get(get_import));
        }

        router
    }
}

/// Creates all API routes behind the given JWT service
pub fn create_routes(jwt_service: Arc<JwtService>) -> Router<AppState> {
    RouterBuilder::with_all_routes()
        .with_auth(jwt_service)
        .build()
}

/// Creates router with read-only functionality
pub fn create_readonly_routes(jwt_service: Arc<JwtService>) -> Router<AppState> {
    RouterBuilder::with_readonly_routes()
        .with_auth(jwt_service)
        .build()
}

/// Creates router with minimal functionality (health check only)
pub fn create_minimal_routes() -> Router<AppState> {
    RouterBuilder::with_minimal_routes().build()
}
