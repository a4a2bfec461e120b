//! Carousel Storage — where the stock images live.
//!
//! [`ObjectStorage`] lists a folder and mints time-limited signed URLs.
//! `LocalStorage` keeps files on disk and signs URLs that this server
//! verifies; `SupabaseStorage` talks to a hosted bucket.

pub mod local;
pub mod storage;
pub mod supabase;

pub use local::LocalStorage;
pub use storage::{is_image_file, list_images, object_path, ObjectStorage, StoredObject};
pub use supabase::SupabaseStorage;
