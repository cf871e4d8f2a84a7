//! Folder domain entities.

pub mod model;
pub mod name;

pub use model::{Folder, ROOT_FOLDER_NAME};
pub use name::normalize_name;
