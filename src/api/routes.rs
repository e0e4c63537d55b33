use axum::http::{header, HeaderName, Method};
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::{authenticate, verify_session, USER_ID_HEADER, X_ACCESS_TOKEN, X_REFRESH_TOKEN};
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes -- signup/login and liveness
    let public_routes = Router::new()
        .route("/users", post(handlers::signup))
        .route("/users/login", post(handlers::login))
        .route("/health", get(handlers::health));

    // Session-gated routes -- the only consumers of the refresh token
    let session_routes = Router::new()
        .route("/users/me/access-token", get(handlers::refresh_access_token))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            verify_session,
        ));

    // Access-gated resource routes -- cheap stateless verification
    let resource_routes = Router::new()
        .route("/lists", get(handlers::get_lists).post(handlers::create_list))
        .route(
            "/lists/:id",
            patch(handlers::update_list).delete(handlers::delete_list),
        )
        .route(
            "/lists/:list_id/tasks",
            get(handlers::get_tasks).post(handlers::create_task),
        )
        .route(
            "/lists/:list_id/tasks/:task_id",
            patch(handlers::update_task).delete(handlers::delete_task),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            authenticate,
        ));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(resource_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// CORS policy: browser clients read the token headers, so both must be on
/// the expose list explicitly.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::HEAD,
            Method::OPTIONS,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(X_ACCESS_TOKEN),
            HeaderName::from_static(X_REFRESH_TOKEN),
            HeaderName::from_static(USER_ID_HEADER),
        ])
        .expose_headers([
            HeaderName::from_static(X_ACCESS_TOKEN),
            HeaderName::from_static(X_REFRESH_TOKEN),
        ])
}
