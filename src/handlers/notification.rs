use crate::error::{AppError, AppResult};
use crate::middleware::auth::{parse_user_id, require_admin};
use crate::middleware::AuthUser;
use crate::models::{NotificationKind, NotificationModel};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::notification::NotificationService;
use crate::store::NotificationStore;
use crate::utils::time_ago;
use crate::websocket::hub::NotificationHub;
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationResponse {
    pub id: i32,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
    pub is_read: bool,
    pub created_at: String,
    /// Derived at read time, never stored.
    pub time_ago: String,
}

impl From<NotificationModel> for NotificationResponse {
    fn from(n: NotificationModel) -> Self {
        Self {
            id: n.id,
            kind: n.kind,
            title: n.title,
            message: n.message,
            metadata: n.metadata,
            is_read: n.is_read,
            created_at: n.created_at.to_string(),
            time_ago: time_ago(n.created_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BadgeResponse {
    pub count: u64,
    pub has_unread: bool,
    pub last_updated: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BadgeCorrectResponse {
    pub show_badge: bool,
    pub new_since_last_view: u64,
    pub total_unread: u64,
    pub last_viewed_at: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkedCountResponse {
    pub marked_count: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateNotificationRequest {
    /// Target user. Defaults to the caller; targeting anyone else needs
    /// the admin role.
    pub user_id: Option<i32>,
    /// One of the closed kind set, e.g. "scan-completed".
    pub kind: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub message: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkManyReadRequest {
    pub ids: Vec<i32>,
}

fn service(db: DatabaseConnection, hub: NotificationHub) -> NotificationService {
    NotificationService::new(NotificationStore::new(db), hub)
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    security(("jwt_token" = [])),
    params(
        ("limit" = Option<i64>, Query, description = "Page size (max 100, default 20)"),
        ("offset" = Option<i64>, Query, description = "Rows to skip (default 0)"),
    ),
    responses(
        (status = 200, description = "Paginated notification history, newest first", body = PaginatedResponse<NotificationResponse>),
        (status = 400, description = "Invalid pagination", body = crate::error::AppError),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    auth_user: AuthUser,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&auth_user)?;

    let (items, total, limit, offset) = service(db, hub)
        .list(user_id, params.limit, params.offset)
        .await?;
    let items = items.into_iter().map(NotificationResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, limit, offset,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/unread",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "All unread notifications, newest first", body = Vec<NotificationResponse>),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn unread_notifications(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&auth_user)?;
    let items: Vec<NotificationResponse> = service(db, hub)
        .unread(user_id)
        .await
        .into_iter()
        .map(NotificationResponse::from)
        .collect();
    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/unread/count",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Unread notification count", body = UnreadCountResponse),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn unread_count(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&auth_user)?;
    let count = service(db, hub).unread_count(user_id).await?;
    Ok(ApiResponse::ok(UnreadCountResponse { count }))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/badge",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Legacy badge: total unread drives the bell", body = BadgeResponse),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn badge(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&auth_user)?;
    let count = service(db, hub).badge(user_id).await?;
    Ok(ApiResponse::ok(BadgeResponse {
        count,
        has_unread: count > 0,
        last_updated: chrono::Utc::now().naive_utc().to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/badge-correct",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Corrected badge: new-since-last-view drives the bell", body = BadgeCorrectResponse),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn badge_correct(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&auth_user)?;
    let state = service(db, hub).badge_correct(user_id).await?;
    Ok(ApiResponse::ok(BadgeCorrectResponse {
        show_badge: state.show_badge(),
        new_since_last_view: state.new_since_last_view,
        total_unread: state.total_unread,
        last_viewed_at: state.last_viewed_at.map(|t| t.to_string()),
    }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/notifications/panel-viewed",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Panel view marker updated; read state untouched", body = String),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn mark_panel_viewed(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&auth_user)?;
    service(db, hub).mark_panel_viewed(user_id).await?;
    Ok(ApiResponse::ok("Panel marked as viewed"))
}

#[utoipa::path(
    patch,
    path = "/api/v1/notifications/mark-all-read",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "All unread notifications marked read", body = MarkedCountResponse),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn mark_all_read(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&auth_user)?;
    let marked_count = service(db, hub).mark_all_read(user_id).await?;
    Ok(ApiResponse::ok(MarkedCountResponse { marked_count }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/notifications/mark-multiple-read",
    security(("jwt_token" = [])),
    request_body = MarkManyReadRequest,
    responses(
        (status = 200, description = "Listed notifications marked read; foreign or unknown ids are skipped", body = MarkedCountResponse),
        (status = 400, description = "Empty id list", body = crate::error::AppError),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn mark_many_read(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    auth_user: AuthUser,
    Json(payload): Json<MarkManyReadRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&auth_user)?;
    let marked_count = service(db, hub).mark_many_read(user_id, &payload.ids).await?;
    Ok(ApiResponse::ok(MarkedCountResponse { marked_count }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/notifications/{id}/read",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read (idempotent)", body = String),
        (status = 403, description = "Not the owner", body = crate::error::AppError),
        (status = 404, description = "No such notification", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn mark_read(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&auth_user)?;
    service(db, hub).mark_read(id, user_id).await?;
    Ok(ApiResponse::ok("Notification marked as read"))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/latest",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Most recent notification, or null", body = Option<NotificationResponse>),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn latest_notification(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&auth_user)?;
    let latest = service(db, hub)
        .latest(user_id)
        .await
        .map(NotificationResponse::from);
    Ok(ApiResponse::ok(latest))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Single notification", body = NotificationResponse),
        (status = 403, description = "Not the owner", body = crate::error::AppError),
        (status = 404, description = "No such notification", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn get_notification(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&auth_user)?;
    let item = service(db, hub).get(id, user_id).await?;
    Ok(ApiResponse::ok(NotificationResponse::from(item)))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications",
    security(("jwt_token" = [])),
    request_body = CreateNotificationRequest,
    responses(
        (status = 200, description = "Created and pushed to live connections", body = NotificationResponse),
        (status = 400, description = "Unknown kind or invalid fields", body = crate::error::AppError),
        (status = 403, description = "Cross-user create without admin role", body = crate::error::AppError),
        (status = 404, description = "Target user does not exist", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn create_notification(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    auth_user: AuthUser,
    Json(payload): Json<CreateNotificationRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {e}")))?;

    let caller_id = parse_user_id(&auth_user)?;
    let target_id = payload.user_id.unwrap_or(caller_id);
    if target_id != caller_id {
        require_admin(&db, &auth_user).await?;
    }

    let kind: NotificationKind = payload.kind.parse().map_err(AppError::Validation)?;

    let saved = service(db, hub)
        .dispatch(
            target_id,
            kind,
            &payload.title,
            &payload.message,
            payload.metadata,
        )
        .await?;

    Ok(ApiResponse::ok(NotificationResponse::from(saved)))
}
