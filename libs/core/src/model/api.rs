use libsecp256k1::PublicKey;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

use crate::model::account::{Account, Username};
use crate::model::crypto::*;
use crate::model::errors::{CoreError, LbResult};
use crate::model::file_metadata::{FileMetadata, FileMetadataDiff};
use crate::model::secret_filename::SecretFileName;

pub trait Request: Serialize + Clone + Debug + 'static {
    type Response: Debug + Serialize + DeserializeOwned + Clone + 'static;
    type Error: Debug + Serialize + DeserializeOwned + Clone + 'static;
    const METHOD: Method;
    const ROUTE: &'static str;
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct RequestWrapper<T: Request> {
    pub signed_request: ECSigned<T>,
    pub client_version: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub enum ErrorWrapper<E> {
    Endpoint(E),
    ClientUpdateRequired,
    InvalidAuth,
    ExpiredAuth,
    InternalError,
    BadRequest,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct NewAccountRequest {
    pub username: Username,
    pub public_key: PublicKey,
    pub folder_id: Uuid,
    pub folder_name: SecretFileName,
    pub parent_access_key: EncryptedFolderAccessKey,
    pub user_access_key: EncryptedUserAccessKey,
}

impl NewAccountRequest {
    pub fn new(account: &Account, root_metadata: &FileMetadata) -> LbResult<Self> {
        Ok(NewAccountRequest {
            username: account.username.clone(),
            public_key: account.public_key(),
            folder_id: root_metadata.id,
            folder_name: root_metadata.name.clone(),
            parent_access_key: root_metadata.folder_access_keys.clone(),
            user_access_key: root_metadata
                .user_access_keys
                .get(&account.username)
                .ok_or_else(|| {
                    CoreError::Unexpected(
                        "metadata for a new account must have a user access key".to_string(),
                    )
                })?
                .access_key
                .clone(),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct NewAccountResponse {
    pub folder_metadata_version: u64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub enum NewAccountError {
    UsernameTaken,
    PublicKeyTaken,
    InvalidUsername,
    FileIdTaken,
}

impl Request for NewAccountRequest {
    type Response = NewAccountResponse;
    type Error = NewAccountError;
    const METHOD: Method = Method::POST;
    const ROUTE: &'static str = "/new-account";
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct GetPublicKeyRequest {
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct GetPublicKeyResponse {
    pub key: PublicKey,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub enum GetPublicKeyError {
    InvalidUsername,
    UserNotFound,
}

impl Request for GetPublicKeyRequest {
    type Response = GetPublicKeyResponse;
    type Error = GetPublicKeyError;
    const METHOD: Method = Method::GET;
    const ROUTE: &'static str = "/get-public-key";
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct GetUpdatesRequest {
    pub since_metadata_version: u64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct GetUpdatesResponse {
    pub file_metadata: Vec<FileMetadata>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub enum GetUpdatesError {
    UserNotFound,
}

impl Request for GetUpdatesRequest {
    type Response = GetUpdatesResponse;
    type Error = GetUpdatesError;
    const METHOD: Method = Method::GET;
    const ROUTE: &'static str = "/get-updates";
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct FileMetadataUpsertsRequest {
    pub updates: Vec<FileMetadataDiff>,
}

impl FileMetadataUpsertsRequest {
    pub fn new(metadata: &FileMetadata) -> Self {
        FileMetadataUpsertsRequest { updates: vec![FileMetadataDiff::new(metadata)] }
    }

    pub fn new_diff(
        old_parent: Uuid, old_name: &SecretFileName, new_metadata: &FileMetadata,
    ) -> Self {
        FileMetadataUpsertsRequest {
            updates: vec![FileMetadataDiff::new_diff(old_parent, old_name, new_metadata)],
        }
    }
}

/// The server responds with the authoritative version stamp it assigned to
/// each upserted file; clients adopt these in place of their provisional
/// versions.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct FileMetadataUpsertsResponse {
    pub new_metadata_versions: Vec<(Uuid, u64)>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub enum FileMetadataUpsertsError {
    GetUpdatesRequired,
    UserNotFound,
}

impl Request for FileMetadataUpsertsRequest {
    type Response = FileMetadataUpsertsResponse;
    type Error = FileMetadataUpsertsError;
    const METHOD: Method = Method::POST;
    const ROUTE: &'static str = "/upsert-file-metadata";
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ChangeDocumentContentRequest {
    pub id: Uuid,
    pub old_metadata_version: u64,
    pub new_content: EncryptedDocument,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ChangeDocumentContentResponse {
    pub new_metadata_and_content_version: u64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub enum ChangeDocumentContentError {
    DocumentNotFound,
    DocumentDeleted,
    EditConflict,
}

impl Request for ChangeDocumentContentRequest {
    type Response = ChangeDocumentContentResponse;
    type Error = ChangeDocumentContentError;
    const METHOD: Method = Method::PUT;
    const ROUTE: &'static str = "/change-document-content";
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct GetDocumentRequest {
    pub id: Uuid,
    pub content_version: u64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct GetDocumentResponse {
    pub content: EncryptedDocument,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub enum GetDocumentError {
    DocumentNotFound,
}

impl Request for GetDocumentRequest {
    type Response = GetDocumentResponse;
    type Error = GetDocumentError;
    const METHOD: Method = Method::GET;
    const ROUTE: &'static str = "/get-document";
}
