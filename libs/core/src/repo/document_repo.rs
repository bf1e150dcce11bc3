use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::model::core_config::Config;
use crate::model::crypto::EncryptedDocument;
use crate::model::errors::{CoreError, LbResult};

/// On-disk store of encrypted document contents, one file per document id.
/// The store only ever sees ciphertext.

pub fn namespace_path(writeable_path: &str) -> String {
    format!("{}/documents", writeable_path)
}

fn key_path(writeable_path: &str, key: &Uuid) -> String {
    format!("{}/{}", namespace_path(writeable_path), key)
}

#[instrument(level = "debug", skip(config, document), err(Debug))]
pub fn insert(config: &Config, id: &Uuid, document: &EncryptedDocument) -> LbResult<()> {
    let value = &bincode::serialize(document)?;
    let path_str = key_path(&config.writeable_path, id) + ".pending";
    let path = Path::new(&path_str);
    trace!("write\t{} {:?} bytes", &path_str, value.len());
    fs::create_dir_all(path.parent().ok_or_else(|| {
        CoreError::Unexpected("could not get parent of document path".to_string())
    })?)?;
    let mut f = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    f.write_all(value)?;
    Ok(fs::rename(path, key_path(&config.writeable_path, id))?)
}

pub fn get(config: &Config, id: &Uuid) -> LbResult<EncryptedDocument> {
    maybe_get(config, id)?.ok_or_else(|| CoreError::FileNonexistent.into())
}

#[instrument(level = "debug", skip(config), err(Debug))]
pub fn maybe_get(config: &Config, id: &Uuid) -> LbResult<Option<EncryptedDocument>> {
    let path_str = key_path(&config.writeable_path, id);
    let path = Path::new(&path_str);
    trace!("read\t{}", &path_str);
    let mut f = match File::open(path) {
        Ok(f) => f,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut buffer: Vec<u8> = Vec::new();
    f.read_to_end(&mut buffer)?;
    Ok(Some(bincode::deserialize(&buffer)?))
}

#[instrument(level = "debug", skip(config), err(Debug))]
pub fn delete(config: &Config, id: &Uuid) -> LbResult<()> {
    let path_str = key_path(&config.writeable_path, id);
    let path = Path::new(&path_str);
    trace!("delete\t{}", &path_str);
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Deletes stored blobs for documents that are no longer referenced.
pub fn retain(config: &Config, file_ids: &[Uuid]) -> LbResult<()> {
    let dir_path = namespace_path(&config.writeable_path);
    fs::create_dir_all(&dir_path)?;
    let entries = fs::read_dir(&dir_path)?;
    for entry in entries {
        let path = entry?.path();
        let id_str = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        if let Ok(id) = Uuid::parse_str(&id_str) {
            if !file_ids.contains(&id) {
                delete(config, &id)?;
            }
        } else {
            // stray .pending file from an interrupted write
            fs::remove_file(PathBuf::from(&path))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod unit_tests {
    use uuid::Uuid;

    use crate::model::core_config::Config;
    use crate::model::errors::CoreError;
    use crate::model::symkey;
    use crate::repo::document_repo;

    fn test_config() -> Config {
        Config {
            logs: false,
            colored_logs: false,
            writeable_path: format!("/tmp/{}", Uuid::new_v4()),
        }
    }

    #[test]
    fn insert_get_delete() {
        let config = test_config();
        let id = Uuid::new_v4();
        let key = symkey::generate_key();
        let document = symkey::encrypt(&key, &b"content".to_vec()).unwrap();

        document_repo::insert(&config, &id, &document).unwrap();
        assert_eq!(document_repo::get(&config, &id).unwrap(), document);

        document_repo::delete(&config, &id).unwrap();
        let result = document_repo::get(&config, &id);
        assert!(matches!(result.unwrap_err().kind, CoreError::FileNonexistent));
    }

    #[test]
    fn maybe_get_missing() {
        let config = test_config();
        assert_eq!(document_repo::maybe_get(&config, &Uuid::new_v4()).unwrap(), None);
    }
}
