use uuid::Uuid;

use crate::model::crypto::DecryptedDocument;
use crate::model::errors::{CoreError, LbResult};
use crate::model::file_metadata::FileType;
use crate::model::symkey;
use crate::repo::document_repo;
use crate::service::api_service::Requester;
use crate::CoreState;

impl<Client: Requester> CoreState<Client> {
    pub(crate) fn read_document(&mut self, id: Uuid) -> LbResult<DecryptedDocument> {
        let meta = self.find(&id)?.clone();
        if meta.file_type != FileType::Document {
            return Err(CoreError::FileNotDocument.into());
        }
        if self.is_unreachable(&id)? {
            return Err(CoreError::FileNonexistent.into());
        }

        let key = self.decrypt_key(id)?;
        let encrypted = document_repo::get(&self.config, &id)?;
        symkey::decrypt(&key, &encrypted)
    }

    pub(crate) fn write_document(&mut self, id: Uuid, content: &[u8]) -> LbResult<()> {
        let mut meta = self.find(&id)?.clone();
        if meta.file_type != FileType::Document {
            return Err(CoreError::FileNotDocument.into());
        }
        if self.is_unreachable(&id)? {
            return Err(CoreError::FileNonexistent.into());
        }

        let key = self.decrypt_key(id)?;
        let encrypted = symkey::encrypt(&key, &content.to_vec())?;
        document_repo::insert(&self.config, &id, &encrypted)?;

        meta.content_version += 1;
        self.db.local_metadata.insert(id, meta)?;
        Ok(())
    }
}
