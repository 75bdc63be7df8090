pub mod notification;
pub mod panel_view;
pub mod user;

pub use notification::{Entity as Notification, Model as NotificationModel, NotificationKind};
pub use panel_view::{Entity as PanelView, Model as PanelViewModel};
pub use user::{Entity as User, Model as UserModel};
