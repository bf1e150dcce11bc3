use db_rs::{LookupTable, Single};
use db_rs_derive::Schema;

use uuid::Uuid;

use crate::model::account::Account;
use crate::model::file_metadata::FileMetadata;

pub mod document_repo;

/// `base_metadata` is the state as of the last successful exchange with the
/// server; `local_metadata` is the working copy. A file is dirty when the two
/// disagree (or when it only exists locally).
#[derive(Schema)]
pub struct CoreV1 {
    pub account: Single<Account>,
    pub last_synced: Single<i64>,
    pub root: Single<Uuid>,
    pub local_metadata: LookupTable<Uuid, FileMetadata>,
    pub base_metadata: LookupTable<Uuid, FileMetadata>,
}

pub type CoreDb = CoreV1;
