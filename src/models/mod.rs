pub mod application;
pub mod notification;
pub mod provider;
