use reqwest::blocking::Client as RequestClient;

use crate::get_code_version;
use crate::model::account::Account;
use crate::model::api::*;
use crate::model::clock::{get_time, Timestamp};
use crate::model::errors::LbError;
use crate::model::pubkey;

impl<E> From<ErrorWrapper<E>> for ApiError<E> {
    fn from(err: ErrorWrapper<E>) -> Self {
        match err {
            ErrorWrapper::Endpoint(e) => ApiError::Endpoint(e),
            ErrorWrapper::ClientUpdateRequired => ApiError::ClientUpdateRequired,
            ErrorWrapper::InvalidAuth => ApiError::InvalidAuth,
            ErrorWrapper::ExpiredAuth => ApiError::ExpiredAuth,
            ErrorWrapper::InternalError => ApiError::InternalError,
            ErrorWrapper::BadRequest => ApiError::BadRequest,
        }
    }
}

#[derive(Debug)]
pub enum ApiError<E> {
    Endpoint(E),
    ClientUpdateRequired,
    InvalidAuth,
    ExpiredAuth,
    InternalError,
    BadRequest,
    Sign(LbError),
    Serialize(String),
    SendFailed(String),
    ReceiveFailed(String),
    Deserialize(String),
}

pub trait Requester {
    fn request<T: Request>(
        &self, account: &Account, request: T,
    ) -> Result<T::Response, ApiError<T::Error>>;
}

#[derive(Debug, Clone)]
pub struct Network {
    pub client: RequestClient,
    pub get_code_version: fn() -> &'static str,
    pub get_time: fn() -> Timestamp,
}

impl Default for Network {
    fn default() -> Self {
        Self { client: Default::default(), get_code_version, get_time }
    }
}

impl Requester for Network {
    fn request<T: Request>(
        &self, account: &Account, request: T,
    ) -> Result<T::Response, ApiError<T::Error>> {
        let signed_request =
            pubkey::sign(&account.private_key, request, self.get_time).map_err(ApiError::Sign)?;

        let client_version = String::from((self.get_code_version)());

        let serialized_request = serde_json::to_vec(&RequestWrapper {
            signed_request,
            client_version: client_version.clone(),
        })
        .map_err(|err| ApiError::Serialize(err.to_string()))?;
        let serialized_response = self
            .client
            .request(T::METHOD, format!("{}{}", account.api_url, T::ROUTE).as_str())
            .body(serialized_request)
            .header("Accept-Version", client_version)
            .send()
            .map_err(|err| {
                warn!("Send failed: {:#?}", err);
                ApiError::SendFailed(err.to_string())
            })?
            .bytes()
            .map_err(|err| ApiError::ReceiveFailed(err.to_string()))?;
        let response: Result<T::Response, ErrorWrapper<T::Error>> =
            serde_json::from_slice(&serialized_response)
                .map_err(|err| ApiError::Deserialize(err.to_string()))?;
        response.map_err(ApiError::from)
    }
}

#[cfg(feature = "no-network")]
pub mod no_network {
    use std::any::Any;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    use libsecp256k1::PublicKey;
    use uuid::Uuid;

    use crate::model::account::{Account, Username};
    use crate::model::api::*;
    use crate::model::clock::get_time;
    use crate::model::crypto::{EncryptedDocument, UserAccessInfo};
    use crate::model::file_metadata::{FileMetadata, FileType};
    use crate::model::pubkey;
    use crate::service::api_service::{ApiError, Requester};

    /// An in-memory stand-in for the server, shared between any number of
    /// cores to simulate multiple devices syncing against one account.
    #[derive(Clone, Default)]
    pub struct InProcess {
        pub internals: Arc<Mutex<ServerData>>,
    }

    #[derive(Default)]
    pub struct ServerData {
        pub usernames: HashMap<Username, PublicKey>,
        pub metadata: HashMap<Uuid, FileMetadata>,
        pub documents: HashMap<Uuid, EncryptedDocument>,
        pub version: u64,
    }

    impl InProcess {
        pub fn init() -> Self {
            Self::default()
        }
    }

    impl ServerData {
        fn next_version(&mut self) -> u64 {
            self.version += 1;
            self.version
        }

        fn authenticate(&self, account: &Account) -> Result<(), ()> {
            match self.usernames.get(&account.username) {
                Some(registered) if *registered == account.public_key() => Ok(()),
                _ => Err(()),
            }
        }

        fn new_account(
            &mut self, request: NewAccountRequest,
        ) -> Result<NewAccountResponse, ErrorWrapper<NewAccountError>> {
            if self.usernames.contains_key(&request.username) {
                return Err(ErrorWrapper::Endpoint(NewAccountError::UsernameTaken));
            }
            if self.usernames.values().any(|pk| *pk == request.public_key) {
                return Err(ErrorWrapper::Endpoint(NewAccountError::PublicKeyTaken));
            }
            if self.metadata.contains_key(&request.folder_id) {
                return Err(ErrorWrapper::Endpoint(NewAccountError::FileIdTaken));
            }

            let version = self.next_version();
            let mut user_access_keys = HashMap::new();
            user_access_keys.insert(
                request.username.clone(),
                UserAccessInfo {
                    username: request.username.clone(),
                    encrypted_by: request.public_key,
                    access_key: request.user_access_key,
                },
            );
            self.metadata.insert(
                request.folder_id,
                FileMetadata {
                    id: request.folder_id,
                    file_type: FileType::Folder,
                    parent: request.folder_id,
                    name: request.folder_name,
                    owner: request.username.clone(),
                    metadata_version: version,
                    content_version: version,
                    deleted: false,
                    user_access_keys,
                    folder_access_keys: request.parent_access_key,
                },
            );
            self.usernames.insert(request.username, request.public_key);

            Ok(NewAccountResponse { folder_metadata_version: version })
        }

        fn get_public_key(
            &mut self, request: GetPublicKeyRequest,
        ) -> Result<GetPublicKeyResponse, ErrorWrapper<GetPublicKeyError>> {
            match self.usernames.get(&request.username) {
                Some(key) => Ok(GetPublicKeyResponse { key: *key }),
                None => Err(ErrorWrapper::Endpoint(GetPublicKeyError::UserNotFound)),
            }
        }

        fn get_updates(
            &mut self, account: &Account, request: GetUpdatesRequest,
        ) -> Result<GetUpdatesResponse, ErrorWrapper<GetUpdatesError>> {
            self.authenticate(account)
                .map_err(|_| ErrorWrapper::Endpoint(GetUpdatesError::UserNotFound))?;
            let file_metadata = self
                .metadata
                .values()
                .filter(|meta| meta.metadata_version > request.since_metadata_version)
                .cloned()
                .collect();
            Ok(GetUpdatesResponse { file_metadata })
        }

        fn upsert_file_metadata(
            &mut self, account: &Account, request: FileMetadataUpsertsRequest,
        ) -> Result<FileMetadataUpsertsResponse, ErrorWrapper<FileMetadataUpsertsError>> {
            self.authenticate(account)
                .map_err(|_| ErrorWrapper::InvalidAuth)?;

            let mut new_metadata_versions = Vec::new();
            for diff in request.updates {
                match &diff.old_parent_and_name {
                    None => {
                        if self.metadata.contains_key(&diff.id) {
                            return Err(ErrorWrapper::Endpoint(
                                FileMetadataUpsertsError::GetUpdatesRequired,
                            ));
                        }
                        let version = self.next_version();
                        self.metadata.insert(
                            diff.id,
                            FileMetadata {
                                id: diff.id,
                                file_type: diff.file_type,
                                parent: diff.new_parent,
                                name: diff.new_name.clone(),
                                owner: account.username.clone(),
                                metadata_version: version,
                                content_version: 0,
                                deleted: diff.new_deleted,
                                user_access_keys: HashMap::new(),
                                folder_access_keys: diff.new_folder_access_keys.clone(),
                            },
                        );
                        new_metadata_versions.push((diff.id, version));
                    }
                    Some((old_parent, old_name)) => {
                        let version = {
                            let current = self.metadata.get(&diff.id).ok_or(
                                ErrorWrapper::Endpoint(FileMetadataUpsertsError::GetUpdatesRequired),
                            )?;
                            if current.deleted
                                || current.parent != *old_parent
                                || current.name != *old_name
                            {
                                return Err(ErrorWrapper::Endpoint(
                                    FileMetadataUpsertsError::GetUpdatesRequired,
                                ));
                            }
                            // two devices can race reciprocal moves past the
                            // old-parent check; reject the one that would turn
                            // the tree into a loop
                            let mut ancestor = diff.new_parent;
                            let mut seen = HashSet::new();
                            loop {
                                if ancestor == diff.id {
                                    return Err(ErrorWrapper::Endpoint(
                                        FileMetadataUpsertsError::GetUpdatesRequired,
                                    ));
                                }
                                if !seen.insert(ancestor) {
                                    break;
                                }
                                match self.metadata.get(&ancestor) {
                                    Some(meta) if meta.parent != ancestor => {
                                        ancestor = meta.parent
                                    }
                                    _ => break,
                                }
                            }
                            self.next_version()
                        };
                        let current = self.metadata.get_mut(&diff.id).ok_or(
                            ErrorWrapper::Endpoint(FileMetadataUpsertsError::GetUpdatesRequired),
                        )?;
                        current.parent = diff.new_parent;
                        current.name = diff.new_name.clone();
                        current.deleted = diff.new_deleted;
                        current.folder_access_keys = diff.new_folder_access_keys.clone();
                        current.metadata_version = version;
                        let remove_content =
                            current.deleted && current.file_type == FileType::Document;
                        if remove_content {
                            self.documents.remove(&diff.id);
                        }
                        new_metadata_versions.push((diff.id, version));
                    }
                }
            }

            Ok(FileMetadataUpsertsResponse { new_metadata_versions })
        }

        fn change_document_content(
            &mut self, account: &Account, request: ChangeDocumentContentRequest,
        ) -> Result<ChangeDocumentContentResponse, ErrorWrapper<ChangeDocumentContentError>>
        {
            self.authenticate(account)
                .map_err(|_| ErrorWrapper::InvalidAuth)?;

            let version = {
                let current = self.metadata.get(&request.id).ok_or(ErrorWrapper::Endpoint(
                    ChangeDocumentContentError::DocumentNotFound,
                ))?;
                if current.deleted {
                    return Err(ErrorWrapper::Endpoint(
                        ChangeDocumentContentError::DocumentDeleted,
                    ));
                }
                if current.metadata_version != request.old_metadata_version {
                    return Err(ErrorWrapper::Endpoint(ChangeDocumentContentError::EditConflict));
                }
                self.next_version()
            };
            let current = self
                .metadata
                .get_mut(&request.id)
                .ok_or(ErrorWrapper::Endpoint(ChangeDocumentContentError::DocumentNotFound))?;
            current.metadata_version = version;
            current.content_version = version;
            self.documents.insert(request.id, request.new_content);

            Ok(ChangeDocumentContentResponse { new_metadata_and_content_version: version })
        }

        fn get_document(
            &mut self, request: GetDocumentRequest,
        ) -> Result<GetDocumentResponse, ErrorWrapper<GetDocumentError>> {
            match self.documents.get(&request.id) {
                Some(content) => Ok(GetDocumentResponse { content: content.clone() }),
                None => Err(ErrorWrapper::Endpoint(GetDocumentError::DocumentNotFound)),
            }
        }
    }

    fn type_request<T: Request, R: Request>(untyped: &T) -> R {
        let request: &R = (untyped as &dyn Any).downcast_ref().unwrap();
        request.clone()
    }

    impl Requester for InProcess {
        fn request<T: Request>(
            &self, account: &Account, request: T,
        ) -> Result<T::Response, ApiError<T::Error>> {
            // exercise the same signing path the real transport uses
            let signed = pubkey::sign(&account.private_key, request.clone(), get_time)
                .map_err(ApiError::Sign)?;
            pubkey::verify(&account.public_key(), &signed, 3_000, 3_000, get_time)
                .map_err(|_| ApiError::InvalidAuth)?;

            let mut server = self
                .internals
                .lock()
                .map_err(|err| ApiError::SendFailed(format!("{:#?}", err)))?;

            let resp: Box<dyn Any> = match T::ROUTE {
                NewAccountRequest::ROUTE => Box::new(server.new_account(type_request(&request))),
                GetPublicKeyRequest::ROUTE => {
                    Box::new(server.get_public_key(type_request(&request)))
                }
                GetUpdatesRequest::ROUTE => {
                    Box::new(server.get_updates(account, type_request(&request)))
                }
                FileMetadataUpsertsRequest::ROUTE => {
                    Box::new(server.upsert_file_metadata(account, type_request(&request)))
                }
                ChangeDocumentContentRequest::ROUTE => {
                    Box::new(server.change_document_content(account, type_request(&request)))
                }
                GetDocumentRequest::ROUTE => Box::new(server.get_document(type_request(&request))),
                unknown => panic!("unhandled InProcess route: {}", unknown),
            };

            let resp: Result<T::Response, ErrorWrapper<T::Error>> = *resp.downcast().unwrap();
            resp.map_err(ApiError::from)
        }
    }
}
