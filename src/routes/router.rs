use crate::core::error;
use crate::core::state::AppState;
use crate::routes::{auth, user};
use crate::utils;
use axum::error_handling::HandleErrorLayer;
use axum::{
    Router,
    extract::{MatchedPath, Request},
    http::{Method, header},
    middleware,
    routing::{get, post},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{self, CorsLayer},
    trace::TraceLayer,
};
use tracing::info_span;

pub(crate) fn routes(state: AppState, request_timeout: Duration) -> Router {
    // /users/...
    let user_router = Router::new()
        .route("/", get(user::list))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            utils::auth::authorize,
        ));

    Router::new()
        .route("/", get(|| async { "Hello, World!" }))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify-token", post(auth::verify_token))
        .nest("/users", user_router)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                        let matched_path = request
                            .extensions()
                            .get::<MatchedPath>()
                            .map(MatchedPath::as_str);

                        info_span!(
                            "request",
                            method = ?request.method(),
                            matched_path,
                        )
                    }),
                )
                .layer(HandleErrorLayer::new(error::handle_middleware_errors))
                .timeout(request_timeout)
                .layer(
                    CorsLayer::new()
                        .allow_methods([Method::GET, Method::POST])
                        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                        .allow_origin(cors::Any),
                ),
        )
}
