pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::http::server::AppState;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// The administrative read surface, bearer-token protected.
pub fn security_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/security/stats", get(get_stats))
        .route("/security/check-ip/{ip}", get(check_ip))
        .route("/security/log-event", post(log_event))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
