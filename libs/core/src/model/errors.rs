use std::backtrace::Backtrace;
use std::fmt;
use std::io;
use std::sync::PoisonError;

use hmac::crypto_mac::{InvalidKeyLength, MacError};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::model::api;
use crate::service::api_service::ApiError;

pub type LbResult<T> = Result<T, LbError>;

#[derive(Debug)]
pub struct LbError {
    pub kind: CoreError,
    pub backtrace: Option<Backtrace>,
}

impl From<CoreError> for LbError {
    fn from(kind: CoreError) -> Self {
        Self { kind, backtrace: Some(Backtrace::capture()) }
    }
}

impl fmt::Display for LbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)
    }
}

impl From<LbError> for UnexpectedError {
    fn from(err: LbError) -> Self {
        Self { msg: format!("{:?}", err.kind), backtrace: err.backtrace }
    }
}

#[derive(Debug)]
pub struct UnexpectedError {
    pub msg: String,
    pub backtrace: Option<Backtrace>,
}

impl UnexpectedError {
    pub fn new(s: impl ToString) -> Self {
        Self { msg: s.to_string(), backtrace: Some(Backtrace::capture()) }
    }
}

impl fmt::Display for UnexpectedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unexpected error: {}", self.msg)
    }
}

impl From<CoreError> for UnexpectedError {
    fn from(e: CoreError) -> Self {
        Self::new(format!("{:?}", e))
    }
}

impl<T> From<PoisonError<T>> for UnexpectedError {
    fn from(err: PoisonError<T>) -> Self {
        Self::new(format!("{:#?}", err))
    }
}

impl Serialize for UnexpectedError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("UnexpectedError", 2)?;
        state.serialize_field("tag", "Unexpected")?;
        state.serialize_field("content", &self.msg)?;
        state.end()
    }
}

impl From<UnexpectedError> for String {
    fn from(v: UnexpectedError) -> Self {
        v.msg
    }
}

#[macro_export]
macro_rules! unexpected_only {
    ($base:literal $(, $args:tt )*) => {{
        debug!($base $(, $args )*);
        $crate::model::errors::UnexpectedError::new(format!($base $(, $args )*))
    }};
}

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    AccountExists,
    AccountNonexistent,
    AccountStringCorrupted,
    ClientUpdateRequired,
    Db(String),
    Decryption(aead::Error),
    Encryption(aead::Error),
    FileNameContainsSlash,
    FileNameEmpty,
    FileNonexistent,
    FileNotDocument,
    FileNotFolder,
    FileParentNonexistent,
    FolderMovedIntoSelf,
    HmacCreation(InvalidKeyLength),
    HmacValidation(MacError),
    InvalidAuthDetails,
    Io(String),
    KeyPhraseInvalid,
    OldVersionIncorrect,
    ParseError(libsecp256k1::Error),
    RootModificationInvalid,
    RootNonexistent,
    Serialization(String),
    ServerUnreachable,
    SharedSecret(libsecp256k1::Error),
    SharedSecretUnexpectedSize,
    SignatureExpired(u64),
    SignatureInTheFuture(u64),
    SignatureInvalid,
    UsernameInvalid,
    UsernameNotFound,
    UsernamePublicKeyMismatch,
    UsernameTaken,
    WorkExecutionFailed(Vec<(Uuid, String)>),
    Unexpected(String),
}

pub fn core_err_unexpected<T: fmt::Debug>(err: T) -> CoreError {
    CoreError::Unexpected(format!("{:#?}", err))
}

impl From<db_rs::DbError> for LbError {
    fn from(err: db_rs::DbError) -> Self {
        CoreError::Db(format!("db error: {:?}", err)).into()
    }
}

impl From<bincode::Error> for LbError {
    fn from(err: bincode::Error) -> Self {
        CoreError::Serialization(err.to_string()).into()
    }
}

impl From<io::Error> for LbError {
    fn from(err: io::Error) -> Self {
        CoreError::Io(err.to_string()).into()
    }
}

impl<G> From<PoisonError<G>> for LbError {
    fn from(err: PoisonError<G>) -> Self {
        core_err_unexpected(err).into()
    }
}

impl From<ApiError<api::NewAccountError>> for LbError {
    fn from(err: ApiError<api::NewAccountError>) -> Self {
        match err {
            ApiError::SendFailed(_) => CoreError::ServerUnreachable,
            ApiError::ClientUpdateRequired => CoreError::ClientUpdateRequired,
            ApiError::InvalidAuth | ApiError::ExpiredAuth => CoreError::InvalidAuthDetails,
            ApiError::Endpoint(api::NewAccountError::UsernameTaken) => CoreError::UsernameTaken,
            ApiError::Endpoint(api::NewAccountError::InvalidUsername) => CoreError::UsernameInvalid,
            e => core_err_unexpected(e),
        }
        .into()
    }
}

impl From<ApiError<api::GetPublicKeyError>> for LbError {
    fn from(err: ApiError<api::GetPublicKeyError>) -> Self {
        match err {
            ApiError::SendFailed(_) => CoreError::ServerUnreachable,
            ApiError::ClientUpdateRequired => CoreError::ClientUpdateRequired,
            ApiError::InvalidAuth | ApiError::ExpiredAuth => CoreError::InvalidAuthDetails,
            ApiError::Endpoint(api::GetPublicKeyError::UserNotFound) => CoreError::UsernameNotFound,
            ApiError::Endpoint(api::GetPublicKeyError::InvalidUsername) => {
                CoreError::UsernameInvalid
            }
            e => core_err_unexpected(e),
        }
        .into()
    }
}

impl From<ApiError<api::GetUpdatesError>> for LbError {
    fn from(err: ApiError<api::GetUpdatesError>) -> Self {
        match err {
            ApiError::SendFailed(_) => CoreError::ServerUnreachable,
            ApiError::ClientUpdateRequired => CoreError::ClientUpdateRequired,
            ApiError::InvalidAuth | ApiError::ExpiredAuth => CoreError::InvalidAuthDetails,
            e => core_err_unexpected(e),
        }
        .into()
    }
}

impl From<ApiError<api::FileMetadataUpsertsError>> for LbError {
    fn from(err: ApiError<api::FileMetadataUpsertsError>) -> Self {
        match err {
            ApiError::SendFailed(_) => CoreError::ServerUnreachable,
            ApiError::ClientUpdateRequired => CoreError::ClientUpdateRequired,
            ApiError::InvalidAuth | ApiError::ExpiredAuth => CoreError::InvalidAuthDetails,
            e => core_err_unexpected(e),
        }
        .into()
    }
}

impl From<ApiError<api::ChangeDocumentContentError>> for LbError {
    fn from(err: ApiError<api::ChangeDocumentContentError>) -> Self {
        match err {
            ApiError::SendFailed(_) => CoreError::ServerUnreachable,
            ApiError::ClientUpdateRequired => CoreError::ClientUpdateRequired,
            ApiError::InvalidAuth | ApiError::ExpiredAuth => CoreError::InvalidAuthDetails,
            e => core_err_unexpected(e),
        }
        .into()
    }
}

impl From<ApiError<api::GetDocumentError>> for LbError {
    fn from(err: ApiError<api::GetDocumentError>) -> Self {
        match err {
            ApiError::SendFailed(_) => CoreError::ServerUnreachable,
            ApiError::ClientUpdateRequired => CoreError::ClientUpdateRequired,
            ApiError::InvalidAuth | ApiError::ExpiredAuth => CoreError::InvalidAuthDetails,
            ApiError::Endpoint(api::GetDocumentError::DocumentNotFound) => {
                CoreError::FileNonexistent
            }
            e => core_err_unexpected(e),
        }
        .into()
    }
}
