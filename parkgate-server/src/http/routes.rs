//! Resource mounts and the not-found fallback

use axum::http::StatusCode;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub const AUTH_PREFIX: &str = "/api/auth";
pub const SLOT_PREFIX: &str = "/api/slot";
pub const VEHICLE_PREFIX: &str = "/api/vehicle";
pub const BOOKING_PREFIX: &str = "/api/booking";

pub const ENDPOINT_NOT_FOUND: &str = "ENDPOINT_NOT_FOUND";
pub const ENDPOINT_NOT_FOUND_MESSAGE: &str = "Endpoint not found";

/// The four resource sub-routers. Handlers live with the embedding
/// application; anything left unset stays empty and falls through to 404.
///
/// Routers are stateless here: call `.with_state(..)` before handing them
/// over.
#[derive(Default)]
pub struct ResourceRoutes {
    pub auth: Router,
    pub slot: Router,
    pub vehicle: Router,
    pub booking: Router,
}

impl ResourceRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth(mut self, router: Router) -> Self {
        self.auth = router;
        self
    }

    pub fn slot(mut self, router: Router) -> Self {
        self.slot = router;
        self
    }

    pub fn vehicle(mut self, router: Router) -> Self {
        self.vehicle = router;
        self
    }

    pub fn booking(mut self, router: Router) -> Self {
        self.booking = router;
        self
    }

    /// Nest every router under its prefix. A known path hit with the wrong
    /// method answers like an unknown path.
    pub(crate) fn mount(self) -> Router {
        Router::new()
            .nest(AUTH_PREFIX, unmatched_method_is_not_found(self.auth))
            .nest(SLOT_PREFIX, unmatched_method_is_not_found(self.slot))
            .nest(VEHICLE_PREFIX, unmatched_method_is_not_found(self.vehicle))
            .nest(BOOKING_PREFIX, unmatched_method_is_not_found(self.booking))
            .method_not_allowed_fallback(not_found)
    }
}

fn unmatched_method_is_not_found(router: Router) -> Router {
    router.method_not_allowed_fallback(not_found)
}

/// Not-found response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundBody {
    pub message: String,
    pub code: String,
}

/// Fallback for anything no mount claimed
pub async fn not_found() -> (StatusCode, Json<NotFoundBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundBody {
            message: ENDPOINT_NOT_FOUND_MESSAGE.to_string(),
            code: ENDPOINT_NOT_FOUND.to_string(),
        }),
    )
}
