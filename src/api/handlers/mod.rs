mod admin;
mod auth;
mod content;
mod events;
mod files;
mod subjects;

pub use admin::{admin_purge, health};
pub use auth::{login, signup};
pub use content::serve_content;
pub use events::{file_events, subject_events};
pub use files::{
    delete_file, favorite_files, list_files, recent_files, toggle_star, update_file, upload_file,
};
pub use subjects::{create_subject, delete_subject, list_subjects, stats};
