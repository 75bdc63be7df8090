use crate::{
    error::AppResult,
    models::{notification, panel_view, Notification, NotificationModel, PanelView, PanelViewModel, User},
};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

/// All notification persistence goes through this type. The service layer
/// owns the business rules; this layer owns the queries.
#[derive(Clone)]
pub struct NotificationStore {
    db: DatabaseConnection,
}

impl NotificationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn user_exists(&self, user_id: i32) -> AppResult<bool> {
        let user = User::find_by_id(user_id).one(&self.db).await?;
        Ok(user.is_some())
    }

    pub async fn insert(
        &self,
        user_id: i32,
        kind: &str,
        title: &str,
        message: &str,
        metadata: serde_json::Value,
    ) -> AppResult<NotificationModel> {
        let model = notification::ActiveModel {
            user_id: Set(user_id),
            kind: Set(kind.to_string()),
            title: Set(title.to_string()),
            message: Set(message.to_string()),
            metadata: Set(metadata),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<NotificationModel>> {
        Ok(Notification::find_by_id(id).one(&self.db).await?)
    }

    /// Page of a user's history, newest first, plus the total row count.
    pub async fn page_for_user(
        &self,
        user_id: i32,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<NotificationModel>, u64)> {
        let base = Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt);

        let total = base.clone().count(&self.db).await?;
        let items = base.limit(limit).offset(offset).all(&self.db).await?;
        Ok((items, total))
    }

    pub async fn unread_for_user(&self, user_id: i32) -> AppResult<Vec<NotificationModel>> {
        let items = Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .order_by_desc(notification::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(items)
    }

    pub async fn unread_count(&self, user_id: i32) -> AppResult<u64> {
        let count = Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    pub async fn latest_for_user(&self, user_id: i32) -> AppResult<Option<NotificationModel>> {
        let item = Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .one(&self.db)
            .await?;
        Ok(item)
    }

    /// Idempotent: a second call on the same id flips nothing and reports 0.
    pub async fn mark_read(&self, id: i32) -> AppResult<u64> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn mark_all_read(&self, user_id: i32) -> AppResult<u64> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// The owner filter means foreign ids in the list silently flip nothing,
    /// same as unknown or already-read ids.
    pub async fn mark_many_read(&self, user_id: i32, ids: &[i32]) -> AppResult<u64> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::Id.is_in(ids.iter().copied()))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn panel_view(&self, user_id: i32) -> AppResult<Option<PanelViewModel>> {
        Ok(PanelView::find_by_id(user_id).one(&self.db).await?)
    }

    /// Stamp `last_viewed_at = now`, creating the marker on first view.
    pub async fn upsert_panel_view(&self, user_id: i32) -> AppResult<PanelViewModel> {
        let now = chrono::Utc::now().naive_utc();

        match PanelView::find_by_id(user_id).one(&self.db).await? {
            Some(existing) => {
                let mut active: panel_view::ActiveModel = existing.into();
                active.last_viewed_at = Set(now);
                Ok(active.update(&self.db).await?)
            }
            None => {
                let active = panel_view::ActiveModel {
                    user_id: Set(user_id),
                    last_viewed_at: Set(now),
                };
                Ok(active.insert(&self.db).await?)
            }
        }
    }

    pub async fn unread_count_since(
        &self,
        user_id: i32,
        since: chrono::NaiveDateTime,
    ) -> AppResult<u64> {
        let count = Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .filter(notification::Column::CreatedAt.gt(since))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}
