#[macro_use]
extern crate tracing;

pub mod model;
pub mod repo;
pub mod service;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use db_rs::Db;
use libsecp256k1::PublicKey;
use uuid::Uuid;

use crate::model::account::Account;
use crate::model::core_config::Config;
use crate::model::crypto::{AESKey, DecryptedDocument};
use crate::model::errors::CoreError;
use crate::model::file::File;
use crate::model::file_metadata::{FileMetadata, FileType};
use crate::model::work_unit::WorkUnit;
use crate::repo::CoreDb;
use crate::service::api_service::{Network, Requester};
use crate::service::log_service;
use crate::service::sync_service::{SyncProgress, WorkCalculated};

pub use crate::model::errors::{LbError, LbResult, UnexpectedError};

pub static DEFAULT_API_LOCATION: &str = "https://api.inkpot.app";
pub static CODE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn get_code_version() -> &'static str {
    CODE_VERSION
}

pub type Core = CoreLib<Network>;

#[derive(Clone)]
pub struct CoreLib<Client: Requester> {
    inner: Arc<Mutex<CoreState<Client>>>,
}

pub struct CoreState<Client: Requester> {
    pub config: Config,
    pub public_key: Option<PublicKey>,
    pub key_cache: HashMap<Uuid, AESKey>,
    pub db: CoreDb,
    pub client: Client,
}

impl Core {
    #[instrument(level = "info", skip_all, err(Debug))]
    pub fn init(config: &Config) -> LbResult<Self> {
        log_service::init(config)?;
        let db = CoreDb::init(db_rs::Config::in_folder(&config.writeable_path))
            .map_err(|err| CoreError::Db(err.to_string()))?;
        let config = config.clone();
        let client = Network::default();
        let state = CoreState { config, public_key: None, key_cache: HashMap::new(), db, client };
        let inner = Arc::new(Mutex::new(state));

        Ok(Self { inner })
    }
}

impl<Client: Requester> CoreLib<Client> {
    pub fn in_tx<F, Out>(&self, f: F) -> LbResult<Out>
    where
        F: FnOnce(&mut CoreState<Client>) -> LbResult<Out>,
    {
        let mut inner = self.inner.lock()?;
        let tx = inner.db.begin_transaction()?;
        let val = f(&mut inner);
        tx.drop_safely()?;
        val
    }

    #[instrument(level = "debug", skip(self), err(Debug))]
    pub fn create_account(&self, username: &str, api_url: &str) -> LbResult<Account> {
        self.in_tx(|s| s.create_account(username, api_url))
    }

    #[instrument(level = "debug", skip_all, err(Debug))]
    pub fn import_account(&self, account_string: &str) -> LbResult<Account> {
        self.in_tx(|s| s.import_account(account_string))
    }

    #[instrument(level = "debug", skip_all, err(Debug))]
    pub fn export_account(&self) -> LbResult<String> {
        self.in_tx(|s| s.export_account())
    }

    #[instrument(level = "debug", skip_all, err(Debug))]
    pub fn export_account_phrase(&self) -> LbResult<String> {
        self.in_tx(|s| s.export_account_phrase())
    }

    #[instrument(level = "debug", skip_all, err(Debug))]
    pub fn export_account_qr(&self) -> LbResult<Vec<u8>> {
        self.in_tx(|s| s.export_account_qr())
    }

    #[instrument(level = "debug", skip_all, err(Debug))]
    pub fn get_account(&self) -> LbResult<Account> {
        self.in_tx(|s| s.get_account().cloned())
    }

    #[instrument(level = "debug", skip_all, err(Debug))]
    pub fn get_public_key(&self) -> LbResult<PublicKey> {
        self.in_tx(|s| s.get_public_key())
    }

    #[instrument(level = "debug", skip(self, name), err(Debug))]
    pub fn create_file(
        &self, name: &str, parent: &Uuid, file_type: FileType,
    ) -> LbResult<File> {
        self.in_tx(|s| s.create_file(name, parent, file_type))
    }

    #[instrument(level = "debug", skip(self, new_name), err(Debug))]
    pub fn rename_file(&self, id: &Uuid, new_name: &str) -> LbResult<()> {
        self.in_tx(|s| s.rename_file(id, new_name))
    }

    #[instrument(level = "debug", skip(self), err(Debug))]
    pub fn move_file(&self, id: &Uuid, new_parent: &Uuid) -> LbResult<()> {
        self.in_tx(|s| s.move_file(id, new_parent))
    }

    #[instrument(level = "debug", skip(self), err(Debug))]
    pub fn delete_file(&self, id: &Uuid) -> LbResult<()> {
        self.in_tx(|s| s.delete(id))
    }

    #[instrument(level = "debug", skip(self, meta), err(Debug))]
    pub fn insert_file(&self, meta: FileMetadata) -> LbResult<()> {
        self.in_tx(|s| s.insert_file(meta))
    }

    #[instrument(level = "debug", skip_all, err(Debug))]
    pub fn get_root(&self) -> LbResult<File> {
        self.in_tx(|s| s.get_root())
    }

    #[instrument(level = "debug", skip(self), err(Debug))]
    pub fn get_children(&self, id: &Uuid) -> LbResult<Vec<File>> {
        self.in_tx(|s| s.get_children(id))
    }

    #[instrument(level = "debug", skip(self), err(Debug))]
    pub fn get_file_by_id(&self, id: Uuid) -> LbResult<File> {
        self.in_tx(|s| s.get_file_by_id(&id))
    }

    #[instrument(level = "debug", skip_all, err(Debug))]
    pub fn list_metadatas(&self) -> LbResult<Vec<File>> {
        self.in_tx(|s| s.list_metadatas())
    }

    #[instrument(level = "debug", skip(self), err(Debug))]
    pub fn read_document(&self, id: Uuid) -> LbResult<DecryptedDocument> {
        self.in_tx(|s| s.read_document(id))
    }

    #[instrument(level = "debug", skip(self, content), err(Debug))]
    pub fn write_document(&self, id: Uuid, content: &[u8]) -> LbResult<()> {
        self.in_tx(|s| s.write_document(id, content))
    }

    #[instrument(level = "debug", skip_all, err(Debug))]
    pub fn calculate_work(&self) -> LbResult<WorkCalculated> {
        self.in_tx(|s| s.calculate_work())
    }

    #[instrument(level = "debug", skip_all, err(Debug))]
    pub fn execute_work(&self, work: WorkUnit) -> LbResult<()> {
        self.in_tx(|s| {
            let account = s.get_account()?.clone();
            s.execute_work(&account, work)
        })
    }

    #[instrument(level = "debug", skip_all, err(Debug))]
    pub fn sync(&self, f: Option<Box<dyn Fn(SyncProgress)>>) -> LbResult<()> {
        self.in_tx(|s| s.sync(f))
    }

    #[instrument(level = "debug", skip_all, err(Debug))]
    pub fn get_last_synced(&self) -> LbResult<i64> {
        self.in_tx(|s| Ok(s.db.last_synced.get().copied().unwrap_or_default()))
    }

    #[instrument(level = "debug", skip(self), err(Debug))]
    pub fn set_last_synced(&self, last_synced: i64) -> LbResult<()> {
        self.in_tx(|s| {
            s.db.last_synced.insert(last_synced)?;
            Ok(())
        })
    }

    #[instrument(level = "debug", skip_all, err(Debug))]
    pub fn get_local_changes(&self) -> LbResult<Vec<Uuid>> {
        self.in_tx(|s| Ok(s.get_local_changes()))
    }
}

#[cfg(feature = "no-network")]
impl CoreLib<crate::service::api_service::no_network::InProcess> {
    pub fn init_in_process(
        config: &Config, client: crate::service::api_service::no_network::InProcess,
    ) -> LbResult<Self> {
        log_service::init(config)?;
        let db = CoreDb::init(db_rs::Config::in_folder(&config.writeable_path))
            .map_err(|err| CoreError::Db(err.to_string()))?;
        let config = config.clone();
        let state = CoreState { config, public_key: None, key_cache: HashMap::new(), db, client };
        let inner = Arc::new(Mutex::new(state));

        Ok(Self { inner })
    }
}
