pub mod notification;

pub use notification::NotificationStore;
