use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::account::Username;
use crate::model::file_metadata::FileType;

/// The decrypted view of a file handed to callers of the facade.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct File {
    pub id: Uuid,
    pub parent: Uuid,
    pub name: String,
    pub file_type: FileType,
    pub owner: Username,
    pub metadata_version: u64,
    pub content_version: u64,
    pub deleted: bool,
}

impl File {
    pub fn is_root(&self) -> bool {
        self.id == self.parent
    }

    pub fn is_folder(&self) -> bool {
        self.file_type == FileType::Folder
    }

    pub fn is_document(&self) -> bool {
        self.file_type == FileType::Document
    }
}
