pub mod admin;
pub mod api;
pub mod favorites;
pub mod feed;
pub mod notifications;
pub mod pwas;
