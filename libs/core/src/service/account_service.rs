use libsecp256k1::PublicKey;
use qrcode_generator::QrCodeEcc;

use crate::model::account::{Account, MAX_USERNAME_LENGTH};
use crate::model::api::{GetPublicKeyRequest, NewAccountRequest};
use crate::model::errors::{core_err_unexpected, CoreError, LbResult};
use crate::service::api_service::Requester;
use crate::service::file_encryption_service;
use crate::CoreState;

impl<Client: Requester> CoreState<Client> {
    pub(crate) fn create_account(&mut self, username: &str, api_url: &str) -> LbResult<Account> {
        let username = String::from(username).to_lowercase();

        if username.is_empty()
            || username.len() > MAX_USERNAME_LENGTH
            || !username
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(CoreError::UsernameInvalid.into());
        }

        if self.db.account.get().is_some() {
            return Err(CoreError::AccountExists.into());
        }

        let account = Account::new(username, api_url.to_string());
        let (mut root, root_key) = file_encryption_service::create_root(&account)?;

        let version = self
            .client
            .request(&account, NewAccountRequest::new(&account, &root)?)?
            .folder_metadata_version;
        root.metadata_version = version;
        root.content_version = version;

        self.db.account.insert(account.clone())?;
        self.public_key = Some(account.public_key());
        self.key_cache.insert(root.id, root_key);
        self.db.root.insert(root.id)?;
        self.db.base_metadata.insert(root.id, root.clone())?;
        self.db.local_metadata.insert(root.id, root)?;
        self.db.last_synced.insert(version as i64)?;

        Ok(account)
    }

    pub(crate) fn import_account(&mut self, account_string: &str) -> LbResult<Account> {
        if self.db.account.get().is_some() {
            warn!("tried to import an account, but account exists already");
            return Err(CoreError::AccountExists.into());
        }

        let decoded = base64::decode(account_string)
            .map_err(|_| CoreError::AccountStringCorrupted)?;
        let account: Account =
            bincode::deserialize(&decoded).map_err(|_| CoreError::AccountStringCorrupted)?;

        let server_public_key = self
            .client
            .request(&account, GetPublicKeyRequest { username: account.username.clone() })?
            .key;
        if account.public_key() != server_public_key {
            return Err(CoreError::UsernamePublicKeyMismatch.into());
        }

        self.db.account.insert(account.clone())?;
        self.public_key = Some(account.public_key());

        Ok(account)
    }

    pub(crate) fn export_account(&self) -> LbResult<String> {
        let account = self.get_account()?;
        let encoded: Vec<u8> = bincode::serialize(account).map_err(core_err_unexpected)?;
        Ok(base64::encode(encoded))
    }

    pub(crate) fn export_account_qr(&self) -> LbResult<Vec<u8>> {
        let acct_secret = self.export_account()?;
        qrcode_generator::to_png_to_vec(acct_secret, QrCodeEcc::Low, 1024)
            .map_err(|err| core_err_unexpected(err).into())
    }

    pub(crate) fn export_account_phrase(&self) -> LbResult<String> {
        Ok(self.get_account()?.get_phrase()?.join(" "))
    }

    pub(crate) fn get_account(&self) -> LbResult<&Account> {
        self.db
            .account
            .get()
            .ok_or_else(|| CoreError::AccountNonexistent.into())
    }

    pub(crate) fn get_public_key(&mut self) -> LbResult<PublicKey> {
        match self.public_key {
            Some(pk) => Ok(pk),
            None => {
                let pk = self.get_account()?.public_key();
                self.public_key = Some(pk);
                Ok(pk)
            }
        }
    }
}
