use std::collections::HashMap;

use uuid::Uuid;

use crate::model::account::Account;
use crate::model::crypto::{AESKey, UserAccessInfo};
use crate::model::errors::{CoreError, LbResult};
use crate::model::file::File;
use crate::model::file_metadata::{FileMetadata, FileType};
use crate::model::secret_filename::SecretFileName;
use crate::model::{pubkey, symkey};
use crate::service::api_service::Requester;
use crate::CoreState;

/// Every file is encrypted with its own key. A file's key is wrapped with its
/// parent folder's key, and the root folder's key is wrapped for the user via
/// ECDH with their own public key. Decrypting any file's key is therefore a
/// walk from that file up to the nearest ancestor whose key we already hold.
pub fn create_root(account: &Account) -> LbResult<(FileMetadata, AESKey)> {
    let key = symkey::generate_key();
    let id = Uuid::new_v4();
    let public_key = account.public_key();
    let user_key = pubkey::get_aes_key(&account.private_key, &public_key)?;

    let mut user_access_keys = HashMap::new();
    user_access_keys.insert(
        account.username.clone(),
        UserAccessInfo {
            username: account.username.clone(),
            encrypted_by: public_key,
            access_key: symkey::encrypt(&user_key, &key)?,
        },
    );

    let metadata = FileMetadata {
        id,
        file_type: FileType::Folder,
        parent: id,
        name: SecretFileName::from_str(&account.username, &key)?,
        owner: account.username.clone(),
        metadata_version: 0,
        content_version: 0,
        deleted: false,
        user_access_keys,
        folder_access_keys: symkey::encrypt(&key, &key)?,
    };

    Ok((metadata, key))
}

impl<Client: Requester> CoreState<Client> {
    pub(crate) fn decrypt_key(&mut self, id: Uuid) -> LbResult<AESKey> {
        if let Some(key) = self.key_cache.get(&id) {
            return Ok(*key);
        }

        let account = self.get_account()?.clone();

        // climb until we reach a cached key or a key shared directly with us
        let mut to_decrypt: Vec<Uuid> = Vec::new();
        let mut current = id;
        let ancestor_key = loop {
            if let Some(key) = self.key_cache.get(&current) {
                break *key;
            }
            let meta = self.find(&current)?.clone();
            if let Some(user_access) = meta.user_access_keys.get(&account.username) {
                let shared_key =
                    pubkey::get_aes_key(&account.private_key, &user_access.encrypted_by)?;
                let key = symkey::decrypt(&shared_key, &user_access.access_key)?;
                self.key_cache.insert(current, key);
                break key;
            }
            if meta.parent == current {
                return Err(CoreError::Unexpected(format!(
                    "self-parented file {} has no user access key",
                    current
                ))
                .into());
            }
            to_decrypt.push(current);
            current = meta.parent;
        };

        // unwrap folder access keys back down the chain
        let mut parent_key = ancestor_key;
        for &file_id in to_decrypt.iter().rev() {
            let folder_access_keys = self.find(&file_id)?.folder_access_keys.clone();
            let file_key = symkey::decrypt(&parent_key, &folder_access_keys)?;
            self.key_cache.insert(file_id, file_key);
            parent_key = file_key;
        }

        Ok(parent_key)
    }

    /// A file's name is encrypted under its parent's key.
    pub(crate) fn decrypt_name(&mut self, meta: &FileMetadata) -> LbResult<String> {
        let parent_key = self.decrypt_key(meta.parent)?;
        meta.name.to_string(&parent_key)
    }

    pub(crate) fn encrypt_name(&mut self, parent: Uuid, name: &str) -> LbResult<SecretFileName> {
        let parent_key = self.decrypt_key(parent)?;
        SecretFileName::from_str(name, &parent_key)
    }

    pub(crate) fn finalize(&mut self, meta: &FileMetadata) -> LbResult<File> {
        let name = self.decrypt_name(meta)?;
        Ok(File {
            id: meta.id,
            parent: meta.parent,
            name,
            file_type: meta.file_type,
            owner: meta.owner.clone(),
            metadata_version: meta.metadata_version,
            content_version: meta.content_version,
            deleted: meta.deleted,
        })
    }

    /// Generates metadata for a new file: a fresh id and key, the key wrapped
    /// with the parent's key, the name encrypted under the parent's key.
    pub(crate) fn create_meta(
        &mut self, parent: Uuid, name: &str, file_type: FileType,
    ) -> LbResult<FileMetadata> {
        let account = self.get_account()?.clone();
        let parent_key = self.decrypt_key(parent)?;
        let file_key = symkey::generate_key();
        let id = Uuid::new_v4();

        let meta = FileMetadata {
            id,
            file_type,
            parent,
            name: SecretFileName::from_str(name, &parent_key)?,
            owner: account.username,
            metadata_version: 0,
            content_version: 0,
            deleted: false,
            user_access_keys: HashMap::new(),
            folder_access_keys: symkey::encrypt(&parent_key, &file_key)?,
        };
        self.key_cache.insert(id, file_key);

        Ok(meta)
    }
}
