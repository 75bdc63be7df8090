use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    #[sea_orm(column_type = "String(StringLen::N(50))")]
    pub kind: String,
    #[sea_orm(column_type = "String(StringLen::N(200))")]
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,
    pub is_read: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}

/// Closed set of notification kinds. The server stores the kind verbatim;
/// clients branch on it for rendering. Unknown kinds are rejected at the
/// API boundary so the set stays closed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    AnalysisSaved,
    ScanCompleted,
    AssetMinted,
    FarmUpdate,
    SystemAlert,
    Recommendation,
    Reward,
    TokenTransfer,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::AnalysisSaved => "analysis-saved",
            NotificationKind::ScanCompleted => "scan-completed",
            NotificationKind::AssetMinted => "asset-minted",
            NotificationKind::FarmUpdate => "farm-update",
            NotificationKind::SystemAlert => "system-alert",
            NotificationKind::Recommendation => "recommendation",
            NotificationKind::Reward => "reward",
            NotificationKind::TokenTransfer => "token-transfer",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analysis-saved" => Ok(NotificationKind::AnalysisSaved),
            "scan-completed" => Ok(NotificationKind::ScanCompleted),
            "asset-minted" => Ok(NotificationKind::AssetMinted),
            "farm-update" => Ok(NotificationKind::FarmUpdate),
            "system-alert" => Ok(NotificationKind::SystemAlert),
            "recommendation" => Ok(NotificationKind::Recommendation),
            "reward" => Ok(NotificationKind::Reward),
            "token-transfer" => Ok(NotificationKind::TokenTransfer),
            other => Err(format!("unknown notification kind '{}'", other)),
        }
    }
}
