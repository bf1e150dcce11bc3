use std::collections::HashSet;

use uuid::Uuid;

use crate::model::errors::{CoreError, LbResult};
use crate::model::file::File;
use crate::model::file_metadata::{FileMetadata, FileType};
use crate::model::symkey;
use crate::repo::document_repo;
use crate::service::api_service::Requester;
use crate::CoreState;

impl<Client: Requester> CoreState<Client> {
    pub(crate) fn root_id(&self) -> LbResult<Uuid> {
        self.db
            .root
            .get()
            .copied()
            .ok_or_else(|| CoreError::RootNonexistent.into())
    }

    pub(crate) fn find(&self, id: &Uuid) -> LbResult<&FileMetadata> {
        self.db
            .local_metadata
            .get()
            .get(id)
            .ok_or_else(|| CoreError::FileNonexistent.into())
    }

    pub(crate) fn maybe_find(&self, id: &Uuid) -> Option<&FileMetadata> {
        self.db.local_metadata.get().get(id)
    }

    /// A file is unreachable if it or any of its ancestors carries the deleted
    /// flag. Deleting a folder only flags the folder itself.
    pub(crate) fn is_unreachable(&self, id: &Uuid) -> LbResult<bool> {
        let mut current = *id;
        let mut seen = HashSet::new();
        loop {
            if !seen.insert(current) {
                return Err(CoreError::Unexpected(format!(
                    "parent cycle through file {}",
                    current
                ))
                .into());
            }
            let meta = self.find(&current)?;
            if meta.deleted {
                return Ok(true);
            }
            if meta.parent == current {
                return Ok(false);
            }
            current = meta.parent;
        }
    }

    pub(crate) fn create_file(
        &mut self, name: &str, parent: &Uuid, file_type: FileType,
    ) -> LbResult<File> {
        validate_name(name)?;

        let parent_meta = self
            .maybe_find(parent)
            .ok_or(CoreError::FileParentNonexistent)?
            .clone();
        if parent_meta.file_type != FileType::Folder {
            return Err(CoreError::FileNotFolder.into());
        }
        if self.is_unreachable(parent)? {
            return Err(CoreError::FileParentNonexistent.into());
        }

        let meta = self.create_meta(*parent, name, file_type)?;
        self.db.local_metadata.insert(meta.id, meta.clone())?;

        info!("created {:?} with id {}", file_type, meta.id);
        self.finalize(&meta)
    }

    pub(crate) fn rename_file(&mut self, id: &Uuid, new_name: &str) -> LbResult<()> {
        validate_name(new_name)?;

        if *id == self.root_id()? {
            return Err(CoreError::RootModificationInvalid.into());
        }
        if self.is_unreachable(id)? {
            return Err(CoreError::FileNonexistent.into());
        }

        let mut meta = self.find(id)?.clone();
        meta.name = self.encrypt_name(meta.parent, new_name)?;
        meta.metadata_version += 1;
        self.db.local_metadata.insert(*id, meta)?;
        Ok(())
    }

    pub(crate) fn move_file(&mut self, id: &Uuid, new_parent: &Uuid) -> LbResult<()> {
        if *id == self.root_id()? {
            return Err(CoreError::RootModificationInvalid.into());
        }
        if self.is_unreachable(id)? {
            return Err(CoreError::FileNonexistent.into());
        }

        let target = self
            .maybe_find(new_parent)
            .ok_or(CoreError::FileParentNonexistent)?
            .clone();
        if target.file_type != FileType::Folder {
            return Err(CoreError::FileNotFolder.into());
        }
        if self.is_unreachable(new_parent)? {
            return Err(CoreError::FileParentNonexistent.into());
        }

        // a folder cannot become a descendant of itself
        let mut ancestor = *new_parent;
        let mut seen = HashSet::new();
        loop {
            if ancestor == *id {
                return Err(CoreError::FolderMovedIntoSelf.into());
            }
            let meta = self.find(&ancestor)?;
            if meta.parent == ancestor || !seen.insert(ancestor) {
                break;
            }
            ancestor = meta.parent;
        }

        let mut meta = self.find(id)?.clone();
        let name = self.decrypt_name(&meta)?;
        let file_key = self.decrypt_key(*id)?;
        let new_parent_key = self.decrypt_key(*new_parent)?;

        meta.parent = *new_parent;
        meta.name = self.encrypt_name(*new_parent, &name)?;
        meta.folder_access_keys = symkey::encrypt(&new_parent_key, &file_key)?;
        meta.metadata_version += 1;
        self.db.local_metadata.insert(*id, meta)?;
        Ok(())
    }

    pub(crate) fn delete(&mut self, id: &Uuid) -> LbResult<()> {
        if *id == self.root_id()? {
            return Err(CoreError::RootModificationInvalid.into());
        }
        if self.is_unreachable(id)? {
            return Err(CoreError::FileNonexistent.into());
        }

        let mut meta = self.find(id)?.clone();
        meta.deleted = true;
        meta.metadata_version += 1;
        let is_document = meta.file_type == FileType::Document;
        self.db.local_metadata.insert(*id, meta)?;

        if is_document {
            document_repo::delete(&self.config, id)?;
        }
        Ok(())
    }

    pub(crate) fn get_root(&mut self) -> LbResult<File> {
        let root_id = self.root_id()?;
        let meta = self.find(&root_id)?.clone();
        self.finalize(&meta)
    }

    pub(crate) fn get_children(&mut self, id: &Uuid) -> LbResult<Vec<File>> {
        let parent = self.find(id)?;
        if parent.file_type != FileType::Folder {
            return Err(CoreError::FileNotFolder.into());
        }
        if self.is_unreachable(id)? {
            return Err(CoreError::FileNonexistent.into());
        }

        let children: Vec<FileMetadata> = self
            .db
            .local_metadata
            .get()
            .values()
            .filter(|meta| meta.parent == *id && meta.id != *id && !meta.deleted)
            .cloned()
            .collect();

        let mut files = Vec::with_capacity(children.len());
        for child in children {
            files.push(self.finalize(&child)?);
        }
        Ok(files)
    }

    pub(crate) fn get_file_by_id(&mut self, id: &Uuid) -> LbResult<File> {
        let meta = self.find(id)?.clone();
        if self.is_unreachable(id)? {
            return Err(CoreError::FileNonexistent.into());
        }
        self.finalize(&meta)
    }

    pub(crate) fn list_metadatas(&mut self) -> LbResult<Vec<File>> {
        let metas: Vec<FileMetadata> = self.db.local_metadata.get().values().cloned().collect();

        let mut files = Vec::new();
        for meta in metas {
            if !self.is_unreachable(&meta.id)? {
                files.push(self.finalize(&meta)?);
            }
        }
        Ok(files)
    }

    /// Direct metadata upsert. Versions must not move backwards.
    pub(crate) fn insert_file(&mut self, meta: FileMetadata) -> LbResult<()> {
        if let Some(existing) = self.maybe_find(&meta.id) {
            if existing.metadata_version > meta.metadata_version {
                return Err(CoreError::OldVersionIncorrect.into());
            }
        }
        if !meta.is_root() && self.maybe_find(&meta.parent).is_none() {
            return Err(CoreError::FileParentNonexistent.into());
        }
        self.db.local_metadata.insert(meta.id, meta)?;
        Ok(())
    }

    /// Ids of files whose local copy disagrees with base, or which the server
    /// has never seen.
    pub(crate) fn get_local_changes(&self) -> Vec<Uuid> {
        let base = self.db.base_metadata.get();
        self.db
            .local_metadata
            .get()
            .values()
            .filter(|local| match base.get(&local.id) {
                None => true,
                Some(base) => *base != **local,
            })
            .map(|local| local.id)
            .collect()
    }
}

fn validate_name(name: &str) -> LbResult<()> {
    if name.is_empty() {
        return Err(CoreError::FileNameEmpty.into());
    }
    if name.contains('/') {
        return Err(CoreError::FileNameContainsSlash.into());
    }
    Ok(())
}
