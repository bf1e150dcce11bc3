use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::account::Account;
use crate::model::api::{
    ChangeDocumentContentRequest, FileMetadataUpsertsRequest, GetDocumentRequest,
    GetUpdatesRequest,
};
use crate::model::errors::{CoreError, LbResult};
use crate::model::file_metadata::{FileMetadata, FileType};
use crate::model::filename::NameComponents;
use crate::model::symkey;
use crate::model::work_unit::{ClientWorkUnit, WorkUnit};
use crate::repo::document_repo;
use crate::service::api_service::Requester;
use crate::CoreState;

/// Sync converges in a couple of passes under normal contention; the cap
/// guards against a peer that mutates the account faster than we can pull.
const SYNC_ITERATION_LIMIT: u8 = 10;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkCalculated {
    pub work_units: Vec<WorkUnit>,
    pub most_recent_update_from_server: u64,
}

pub struct SyncProgress {
    pub total: usize,
    pub progress: usize,
    pub current_work_unit: ClientWorkUnit,
}

impl<Client: Requester> CoreState<Client> {
    /// Recomputes pending work from scratch: one ServerChange per file the
    /// server has moved past our base, one LocalChange per dirty file. Pulls
    /// are ordered by server version, pushes parents-first with folders ahead
    /// of documents.
    pub(crate) fn calculate_work(&mut self) -> LbResult<WorkCalculated> {
        let account = self.get_account()?.clone();
        let last_synced = self.db.last_synced.get().copied().unwrap_or_default() as u64;

        let updates = self
            .client
            .request(&account, GetUpdatesRequest { since_metadata_version: last_synced })?;

        let mut most_recent_update_from_server = last_synced;
        let mut server_changes: Vec<FileMetadata> = Vec::new();
        for remote in updates.file_metadata {
            if remote.metadata_version > most_recent_update_from_server {
                most_recent_update_from_server = remote.metadata_version;
            }
            let already_synced = self
                .db
                .base_metadata
                .get()
                .get(&remote.id)
                .map(|base| base.metadata_version == remote.metadata_version)
                .unwrap_or(false);
            if !already_synced {
                server_changes.push(remote);
            }
        }
        server_changes.sort_by_key(|meta| meta.metadata_version);

        let mut local_changes: Vec<FileMetadata> = self
            .get_local_changes()
            .iter()
            .filter_map(|id| self.maybe_find(id).cloned())
            .collect();
        local_changes
            .sort_by_key(|meta| (meta.file_type == FileType::Document, self.depth(&meta.id)));

        let work_units = server_changes
            .into_iter()
            .map(|metadata| WorkUnit::ServerChange { metadata })
            .chain(
                local_changes
                    .into_iter()
                    .map(|metadata| WorkUnit::LocalChange { metadata }),
            )
            .collect();

        Ok(WorkCalculated { work_units, most_recent_update_from_server })
    }

    fn depth(&self, id: &Uuid) -> usize {
        let mut depth = 0;
        let mut current = *id;
        let mut seen = HashSet::new();
        while let Some(meta) = self.maybe_find(&current) {
            if meta.parent == current || !seen.insert(current) {
                break;
            }
            depth += 1;
            current = meta.parent;
        }
        depth
    }

    pub(crate) fn execute_work(&mut self, account: &Account, work: WorkUnit) -> LbResult<()> {
        match work {
            WorkUnit::ServerChange { metadata } => self.pull_server_change(account, metadata),
            WorkUnit::LocalChange { metadata } => self.push_local_change(account, metadata),
        }
    }

    /// Applies one server-side change to base and local state.
    ///
    /// Merge rules:
    /// * a remote delete always wins;
    /// * a clean local copy simply adopts the remote;
    /// * concurrent content edits keep the remote bytes under the original id
    ///   and duplicate the local bytes into a new sibling document, so neither
    ///   side's work is lost;
    /// * a remote move that would close a parent loop against an unpushed
    ///   local move undoes the local move;
    /// * concurrent edits to the same metadata field resolve in favor of the
    ///   server, which makes every device converge on whichever change reached
    ///   the server first; a local rename or move the remote record left
    ///   untouched is kept and pushed on the next pass.
    fn pull_server_change(&mut self, account: &Account, remote: FileMetadata) -> LbResult<()> {
        if remote.is_root() && self.db.root.get().is_none() {
            // an imported account learns its root from the first pull
            self.db.root.insert(remote.id)?;
        }
        self.revert_cycle_making_local_move(&remote)?;

        let base = self.db.base_metadata.get().get(&remote.id).cloned();
        let local = self.db.local_metadata.get().get(&remote.id).cloned();

        let remote_content_new = remote.file_type == FileType::Document
            && !remote.deleted
            && remote.content_version > 0
            && base.as_ref().map(|b| b.content_version) != Some(remote.content_version);

        if remote.deleted {
            if remote.file_type == FileType::Document {
                document_repo::delete(&self.config, &remote.id)?;
            }
            self.db.base_metadata.insert(remote.id, remote.clone())?;
            self.db.local_metadata.insert(remote.id, remote)?;
            return Ok(());
        }

        let locally_dirty = match (&base, &local) {
            (Some(base), Some(local)) => base != local,
            (None, Some(_)) => true,
            _ => false,
        };

        if !locally_dirty {
            if remote_content_new {
                self.pull_document(account, &remote)?;
            }
            self.db.base_metadata.insert(remote.id, remote.clone())?;
            self.db.local_metadata.insert(remote.id, remote)?;
            return Ok(());
        }

        // conflict: base exists here, because a purely-local file can't have
        // been assigned this id by the server
        let local = local.ok_or_else(|| {
            CoreError::Unexpected(format!("dirty file {} with no local copy", remote.id))
        })?;

        if local.deleted {
            // keep the local delete intent, rebased onto the remote version
            let mut rebased = remote.clone();
            rebased.deleted = true;
            rebased.metadata_version += 1;
            self.db.base_metadata.insert(remote.id, remote)?;
            self.db.local_metadata.insert(rebased.id, rebased)?;
            return Ok(());
        }

        let local_content_dirty = local.file_type == FileType::Document
            && base
                .as_ref()
                .map(|b| b.content_version != local.content_version)
                .unwrap_or(true);

        if remote_content_new && local_content_dirty {
            // both sides edited the bytes: duplicate ours as a sibling before
            // the remote copy overwrites the blob
            let local_key = self.decrypt_key(local.id)?;
            let encrypted_local = document_repo::get(&self.config, &local.id)?;
            let local_bytes = symkey::decrypt(&local_key, &encrypted_local)?;
            let local_name = self.decrypt_name(&local)?;
            let sibling_name = NameComponents::from(&local_name).generate_next().to_name();

            let mut sibling =
                self.create_meta(remote.parent, &sibling_name, FileType::Document)?;
            let sibling_key = self.decrypt_key(sibling.id)?;
            let encrypted = symkey::encrypt(&sibling_key, &local_bytes)?;
            document_repo::insert(&self.config, &sibling.id, &encrypted)?;
            sibling.content_version += 1;
            self.db.local_metadata.insert(sibling.id, sibling.clone())?;

            info!("content conflict on {}, local bytes duplicated into {}", local.id, sibling.id);
        }

        if remote_content_new {
            self.pull_document(account, &remote)?;
        }

        // adopt the server copy, but keep local changes to fields the remote
        // record left alone so the next pass can push them
        let mut merged = remote.clone();
        if let Some(base) = &base {
            let remote_moved = remote.parent != base.parent;
            let remote_renamed = remote.name != base.name;
            let local_metadata_dirty = local.parent != base.parent || local.name != base.name;

            if local_metadata_dirty && !remote_moved && !remote_renamed {
                merged.parent = local.parent;
                merged.name = local.name.clone();
                merged.folder_access_keys = local.folder_access_keys.clone();
                merged.metadata_version = remote.metadata_version + 1;
            }
            if local_content_dirty && !remote_content_new {
                merged.content_version = local.content_version.max(remote.content_version);
            }
        }

        self.db.base_metadata.insert(remote.id, remote)?;
        self.db.local_metadata.insert(merged.id, merged)?;
        Ok(())
    }

    /// Two devices can move two folders into each other; the server accepts
    /// whichever push arrives first, and the pull of that record would close a
    /// parent loop against the unpushed local move. The local move loses and
    /// is reverted to its base copy before the remote record is applied.
    fn revert_cycle_making_local_move(&mut self, remote: &FileMetadata) -> LbResult<()> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(remote.id);
        let mut current = remote.parent;
        let cycles = loop {
            if current == remote.id || !seen.insert(current) {
                break true;
            }
            match self.maybe_find(&current) {
                Some(meta) if meta.parent != current => {
                    chain.push(current);
                    current = meta.parent;
                }
                _ => break false,
            }
        };
        if !cycles {
            return Ok(());
        }

        for id in chain {
            let base = self.db.base_metadata.get().get(&id).cloned();
            let local = self.db.local_metadata.get().get(&id).cloned();
            if let (Some(base), Some(local)) = (base, local) {
                if local.parent != base.parent {
                    warn!("move of {} lost to a concurrent remote move, reverting", id);
                    self.db.local_metadata.insert(id, base)?;
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn pull_document(&mut self, account: &Account, remote: &FileMetadata) -> LbResult<()> {
        let content = self
            .client
            .request(
                account,
                GetDocumentRequest { id: remote.id, content_version: remote.content_version },
            )?
            .content;
        document_repo::insert(&self.config, &remote.id, &content)
    }

    /// Pushes one dirty file. On success the server's version stamps are
    /// adopted and the file is promoted into base, making it clean.
    fn push_local_change(&mut self, account: &Account, stale: FileMetadata) -> LbResult<()> {
        let id = stale.id;
        // re-read: an earlier pull in this pass may have merged this file away
        let local = match self.maybe_find(&id) {
            Some(local) => local.clone(),
            None => return Ok(()),
        };
        let base = self.db.base_metadata.get().get(&id).cloned();
        if base.as_ref() == Some(&local) {
            return Ok(());
        }

        let mut promoted = local.clone();

        match base {
            None => {
                // the server has never seen this file
                let new_version = self
                    .client
                    .request(account, FileMetadataUpsertsRequest::new(&local))?
                    .new_metadata_versions
                    .into_iter()
                    .find(|(vid, _)| *vid == id)
                    .map(|(_, version)| version)
                    .ok_or_else(|| {
                        CoreError::Unexpected("server did not stamp upserted file".to_string())
                    })?;
                promoted.metadata_version = new_version;
                promoted.content_version = 0;

                if local.file_type == FileType::Document && !local.deleted {
                    if let Some(content) = document_repo::maybe_get(&self.config, &id)? {
                        let stamp = self
                            .client
                            .request(
                                account,
                                ChangeDocumentContentRequest {
                                    id,
                                    old_metadata_version: new_version,
                                    new_content: content,
                                },
                            )?
                            .new_metadata_and_content_version;
                        promoted.metadata_version = stamp;
                        promoted.content_version = stamp;
                    }
                }
            }
            Some(base) => {
                let metadata_dirty = local.parent != base.parent
                    || local.name != base.name
                    || local.deleted != base.deleted
                    || local.folder_access_keys != base.folder_access_keys;
                let content_dirty = local.file_type == FileType::Document
                    && local.content_version != base.content_version;

                let mut server_version = base.metadata_version;
                promoted.content_version = base.content_version;

                if metadata_dirty {
                    server_version = self
                        .client
                        .request(
                            account,
                            FileMetadataUpsertsRequest::new_diff(base.parent, &base.name, &local),
                        )?
                        .new_metadata_versions
                        .into_iter()
                        .find(|(vid, _)| *vid == id)
                        .map(|(_, version)| version)
                        .ok_or_else(|| {
                            CoreError::Unexpected("server did not stamp upserted file".to_string())
                        })?;
                }

                if content_dirty && !local.deleted {
                    let content = document_repo::get(&self.config, &id)?;
                    let stamp = self
                        .client
                        .request(
                            account,
                            ChangeDocumentContentRequest {
                                id,
                                old_metadata_version: server_version,
                                new_content: content,
                            },
                        )?
                        .new_metadata_and_content_version;
                    server_version = stamp;
                    promoted.content_version = stamp;
                }

                promoted.metadata_version = server_version;
            }
        }

        self.db.base_metadata.insert(id, promoted.clone())?;
        self.db.local_metadata.insert(id, promoted)?;
        Ok(())
    }

    /// Pulls then pushes until no work remains. Individual failures don't
    /// abort the pass; conflict rejections from the server resolve on the
    /// next pull. last_synced only advances after a pass with no failed
    /// pulls, so nothing the server sent is ever skipped.
    pub(crate) fn sync(
        &mut self, maybe_update: Option<Box<dyn Fn(SyncProgress)>>,
    ) -> LbResult<()> {
        let account = self.get_account()?.clone();
        let mut last_failures: Vec<(Uuid, String)> = Vec::new();

        for _ in 0..SYNC_ITERATION_LIMIT {
            let work = self.calculate_work()?;
            if work.work_units.is_empty() {
                self.db
                    .last_synced
                    .insert(work.most_recent_update_from_server as i64)?;
                self.cleanup_local_blobs()?;
                return Ok(());
            }

            let total = work.work_units.len();
            let mut failures: Vec<(Uuid, String)> = Vec::new();
            let mut pull_failed = false;

            for (progress, unit) in work.work_units.into_iter().enumerate() {
                if let Some(update) = &maybe_update {
                    update(SyncProgress {
                        total,
                        progress,
                        current_work_unit: self.describe(&unit),
                    });
                }
                let is_pull = matches!(unit, WorkUnit::ServerChange { .. });
                let id = unit.get_metadata().id;
                if let Err(err) = self.execute_work(&account, unit) {
                    warn!("sync of {} failed: {:?}", id, err.kind);
                    pull_failed |= is_pull;
                    failures.push((id, format!("{:?}", err.kind)));
                }
            }

            if !pull_failed {
                self.db
                    .last_synced
                    .insert(work.most_recent_update_from_server as i64)?;
            }
            last_failures = failures;
        }

        if last_failures.is_empty() {
            Ok(())
        } else {
            Err(CoreError::WorkExecutionFailed(last_failures).into())
        }
    }

    /// Drops blobs for documents that no longer exist, along with partial
    /// writes left behind by a crash.
    fn cleanup_local_blobs(&mut self) -> LbResult<()> {
        let live_ids: Vec<Uuid> = self
            .db
            .local_metadata
            .get()
            .values()
            .filter(|meta| meta.file_type == FileType::Document && !meta.deleted)
            .map(|meta| meta.id)
            .collect();
        document_repo::retain(&self.config, &live_ids)
    }

    fn describe(&mut self, unit: &WorkUnit) -> ClientWorkUnit {
        let meta = unit.get_metadata();
        let name = self.decrypt_name(&meta).unwrap_or_default();
        match (unit, meta.file_type) {
            (WorkUnit::ServerChange { .. }, FileType::Document) => {
                ClientWorkUnit::PullDocument(name)
            }
            (WorkUnit::ServerChange { .. }, FileType::Folder) => ClientWorkUnit::PullMetadata,
            (WorkUnit::LocalChange { .. }, FileType::Document) => {
                ClientWorkUnit::PushDocument(name)
            }
            (WorkUnit::LocalChange { .. }, FileType::Folder) => ClientWorkUnit::PushMetadata,
        }
    }
}
