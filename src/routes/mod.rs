use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::auth::auth_middleware;
use crate::websocket;
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        // WebSocket route (auth handled inside the handler via query token)
        .route("/ws", routing::get(websocket::notification::ws_handler))
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let auth = auth_routes(&rate_limit_config);
    let protected =
        protected_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));

    auth.merge(protected)
}

fn auth_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/auth/register", routing::post(handlers::register))
        .route("/auth/login", routing::post(handlers::login));

    with_optional_rate_limit(router, config.enabled, config.auth)
}

fn protected_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/auth/me", routing::get(handlers::get_current_user))
        .route(
            "/notifications",
            routing::get(handlers::notification::list_notifications)
                .post(handlers::notification::create_notification),
        )
        .route(
            "/notifications/unread",
            routing::get(handlers::notification::unread_notifications),
        )
        .route(
            "/notifications/unread/count",
            routing::get(handlers::notification::unread_count),
        )
        .route(
            "/notifications/badge",
            routing::get(handlers::notification::badge),
        )
        .route(
            "/notifications/badge-correct",
            routing::get(handlers::notification::badge_correct),
        )
        .route(
            "/notifications/latest",
            routing::get(handlers::notification::latest_notification),
        )
        .route(
            "/notifications/panel-viewed",
            routing::patch(handlers::notification::mark_panel_viewed),
        )
        .route(
            "/notifications/mark-all-read",
            routing::patch(handlers::notification::mark_all_read),
        )
        .route(
            "/notifications/mark-multiple-read",
            routing::patch(handlers::notification::mark_many_read),
        )
        .route(
            "/notifications/{id}",
            routing::get(handlers::notification::get_notification),
        )
        .route(
            "/notifications/{id}/read",
            routing::patch(handlers::notification::mark_read),
        );

    with_optional_rate_limit(router, config.enabled, config.api)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
        .expect("Invalid rate limit configuration");

    router.layer(GovernorLayer::new(governor_conf))
}
