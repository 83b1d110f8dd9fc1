//! Persistence for finrec.
//!
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Record storage on SQLite
//! - [`photos`] - Photo attachments in the public file area

pub mod photos;
pub mod schema;
pub mod sqlite;

pub use photos::{basename, store_new_photo, LocalPhotoStore, PhotoStore, PHOTO_DIR};
pub use sqlite::{has_duplicate, insert_record, SqliteStorage, Totals};
