use crate::{
    error::{AppError, AppResult},
    models::{user, User, UserModel},
    utils::{encode_access_token, hash_password, verify_password},
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter,
};

pub struct AuthService {
    db: DatabaseConnection,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Register a new user. Returns the user and an access token.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        farm_name: Option<String>,
    ) -> AppResult<(UserModel, String)> {
        let existing = User::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(username))
                    .add(user::Column::Email.eq(email)),
            )
            .one(&self.db)
            .await?;

        if existing.is_some() {
            return Err(AppError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(password)?;
        let new_user = user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            farm_name: Set(farm_name),
            role: Set("user".to_string()),
            created_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };

        let saved = new_user.insert(&self.db).await?;
        let token = encode_access_token(&saved.id.to_string())?;
        Ok((saved, token))
    }

    /// Login by username or email. Unauthorized on any mismatch; the error
    /// never says which half was wrong.
    pub async fn login(&self, identifier: &str, password: &str) -> AppResult<(UserModel, String)> {
        let found = User::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(identifier))
                    .add(user::Column::Email.eq(identifier)),
            )
            .one(&self.db)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &found.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        let token = encode_access_token(&found.id.to_string())?;
        Ok((found, token))
    }

    pub async fn get_user_by_id(&self, user_id: i32) -> AppResult<UserModel> {
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }
}
