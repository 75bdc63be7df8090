use crate::{
    error::{AppError, AppResult},
    models::{NotificationKind, NotificationModel, PanelViewModel},
    store::NotificationStore,
    utils::time_ago,
    websocket::hub::NotificationHub,
};
use chrono::NaiveDateTime;

/// Input for the corrected badge: the legacy badge conflates "unread" with
/// "new", so a bell that was clicked but whose items were never individually
/// read stays lit forever. The corrected variant is driven purely by
/// notifications created after the last panel view.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeState {
    pub total_unread: u64,
    pub new_since_last_view: u64,
    pub last_viewed_at: Option<NaiveDateTime>,
}

impl BadgeState {
    pub fn show_badge(&self) -> bool {
        self.new_since_last_view > 0
    }
}

const MAX_PAGE_SIZE: u64 = 100;

/// Business rules for the notification subsystem. Holds no durable state of
/// its own: the store owns persistence, the hub owns live connections, and
/// both are injected at construction.
pub struct NotificationService {
    store: NotificationStore,
    hub: NotificationHub,
}

impl NotificationService {
    pub fn new(store: NotificationStore, hub: NotificationHub) -> Self {
        Self { store, hub }
    }

    /// The single path by which notifications enter the system. Fails with
    /// NotFound if the owner does not exist; never creates orphans.
    pub async fn create(
        &self,
        user_id: i32,
        kind: NotificationKind,
        title: &str,
        message: &str,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<NotificationModel> {
        if !self.store.user_exists(user_id).await? {
            return Err(AppError::NotFound);
        }

        let metadata = metadata.unwrap_or_else(|| serde_json::json!({}));
        self.store
            .insert(user_id, kind.as_str(), title, message, metadata)
            .await
    }

    /// Create, then fan out to the user's live connections. The store write
    /// completes before any push, so a client can never see an id the store
    /// does not hold. A user with zero connections simply misses the push;
    /// the stored copy is recovered on the next poll or socket open.
    pub async fn dispatch(
        &self,
        user_id: i32,
        kind: NotificationKind,
        title: &str,
        message: &str,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<NotificationModel> {
        let saved = self.create(user_id, kind, title, message, metadata).await?;
        self.hub.send_to_user(user_id, &live_payload(&saved));
        Ok(saved)
    }

    /// Paginated history, newest first. Pagination is validated before any
    /// store access; a store failure degrades to an empty page since a blank
    /// panel beats a hard error for a non-critical surface.
    pub async fn list(
        &self,
        user_id: i32,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> AppResult<(Vec<NotificationModel>, u64, u64, u64)> {
        let (limit, offset) = validate_pagination(limit, offset)?;

        match self.store.page_for_user(user_id, limit, offset).await {
            Ok((items, total)) => Ok((items, total, limit, offset)),
            Err(AppError::Database(e)) => {
                tracing::warn!("Notification page read failed for user {}: {}", user_id, e);
                Ok((Vec::new(), 0, limit, offset))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn unread(&self, user_id: i32) -> Vec<NotificationModel> {
        match self.store.unread_for_user(user_id).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Unread read failed for user {}: {}", user_id, e);
                Vec::new()
            }
        }
    }

    pub async fn unread_count(&self, user_id: i32) -> AppResult<u64> {
        self.store.unread_count(user_id).await
    }

    pub async fn latest(&self, user_id: i32) -> Option<NotificationModel> {
        match self.store.latest_for_user(user_id).await {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!("Latest read failed for user {}: {}", user_id, e);
                None
            }
        }
    }

    pub async fn get(&self, id: i32, user_id: i32) -> AppResult<NotificationModel> {
        let existing = self.store.find_by_id(id).await?.ok_or(AppError::NotFound)?;
        if existing.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        Ok(existing)
    }

    /// Legacy badge: total unread only. Kept deliberately alongside the
    /// corrected variant; product code is migrating off it.
    pub async fn badge(&self, user_id: i32) -> AppResult<u64> {
        self.store.unread_count(user_id).await
    }

    /// Corrected badge. With no panel marker everything counts as new,
    /// since nothing has ever been seen.
    pub async fn badge_correct(&self, user_id: i32) -> AppResult<BadgeState> {
        let total_unread = self.store.unread_count(user_id).await?;

        let (new_since_last_view, last_viewed_at) = match self.store.panel_view(user_id).await? {
            Some(marker) => {
                let count = self
                    .store
                    .unread_count_since(user_id, marker.last_viewed_at)
                    .await?;
                (count, Some(marker.last_viewed_at))
            }
            None => (total_unread, None),
        };

        Ok(BadgeState {
            total_unread,
            new_since_last_view,
            last_viewed_at,
        })
    }

    /// Viewing is not reading: this touches only the panel marker and must
    /// never flip read state.
    pub async fn mark_panel_viewed(&self, user_id: i32) -> AppResult<PanelViewModel> {
        self.store.upsert_panel_view(user_id).await
    }

    /// Ownership is enforced here, not just at the route layer, so the
    /// service stays safe under any future transport. Marking an already-read
    /// notification is an idempotent success.
    pub async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<()> {
        let existing = self.store.find_by_id(id).await?.ok_or(AppError::NotFound)?;
        if existing.user_id != user_id {
            return Err(AppError::Forbidden);
        }

        self.store.mark_read(id).await?;
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: i32) -> AppResult<u64> {
        self.store.mark_all_read(user_id).await
    }

    pub async fn mark_many_read(&self, user_id: i32, ids: &[i32]) -> AppResult<u64> {
        if ids.is_empty() {
            return Err(AppError::Validation("ids must not be empty".to_string()));
        }
        self.store.mark_many_read(user_id, ids).await
    }
}

fn validate_pagination(limit: Option<i64>, offset: Option<i64>) -> AppResult<(u64, u64)> {
    let limit = limit.unwrap_or(20);
    let offset = offset.unwrap_or(0);

    if limit < 0 || offset < 0 {
        return Err(AppError::Validation(
            "limit and offset must be non-negative".to_string(),
        ));
    }

    Ok(((limit as u64).min(MAX_PAGE_SIZE), offset as u64))
}

/// Wire frame for a live push, type-tagged apart from the initial snapshot.
fn live_payload(n: &NotificationModel) -> String {
    serde_json::json!({
        "type": "notification",
        "data": {
            "id": n.id,
            "kind": &n.kind,
            "title": &n.title,
            "message": &n.message,
            "metadata": &n.metadata,
            "is_read": n.is_read,
            "created_at": n.created_at.to_string(),
            "time_ago": time_ago(n.created_at),
        }
    })
    .to_string()
}
