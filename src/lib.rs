pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod favorites;
pub mod fetch;
pub mod identity;
pub mod lighthouse;
pub mod notifications;
pub mod pwa;
pub mod search;
pub mod server;
pub mod tasks;
pub mod utils;

pub use error::DirectoryError;
