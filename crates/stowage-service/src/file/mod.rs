//! File services: upload validation, file operations, bulk archives.

pub mod archive;
pub mod service;
pub mod upload;

pub use archive::{EntryNamer, write_zip};
pub use service::FileService;
pub use upload::{DEFAULT_CONTENT_TYPE, IncomingFile, UploadValidator};
