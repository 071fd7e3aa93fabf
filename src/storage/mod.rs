mod blobs;
pub mod db;
pub mod engine;
mod files;
pub mod models;
pub mod password;
mod subjects;
mod tables;
mod users;

pub use db::{PurgeStats, Store, StoreError, StoreOptions};
pub use engine::Record;
pub use tables::*;
