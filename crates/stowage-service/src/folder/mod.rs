//! Folder tree services.

pub mod service;
pub mod tree;

pub use service::{
    CascadeReport, CollectedFile, FolderListing, FolderService, SearchHit, validated_name,
};
