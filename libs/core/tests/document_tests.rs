use inkpot_core::model::errors::CoreError;
use inkpot_core::model::file_metadata::FileType;
use inkpot_core::service::api_service::no_network::InProcess;
use test_utils::*;

#[test]
fn write_read_roundtrip() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);
    let root = core.get_root().unwrap();
    let doc = core.create_file("doc.md", &root.id, FileType::Document).unwrap();

    core.write_document(doc.id, b"hello inkpot").unwrap();
    assert_eq!(core.read_document(doc.id).unwrap(), b"hello inkpot");

    core.write_document(doc.id, b"rewritten").unwrap();
    assert_eq!(core.read_document(doc.id).unwrap(), b"rewritten");
}

#[test]
fn write_empty_document() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);
    let root = core.get_root().unwrap();
    let doc = core.create_file("doc.md", &root.id, FileType::Document).unwrap();

    core.write_document(doc.id, b"").unwrap();
    assert_eq!(core.read_document(doc.id).unwrap(), b"");
}

#[test]
fn read_before_any_write() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);
    let root = core.get_root().unwrap();
    let doc = core.create_file("doc.md", &root.id, FileType::Document).unwrap();

    let result = core.read_document(doc.id);
    assert!(matches!(result.unwrap_err().kind, CoreError::FileNonexistent));
}

#[test]
fn folder_content_operations_rejected() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);
    let root = core.get_root().unwrap();
    let folder = core.create_file("notes", &root.id, FileType::Folder).unwrap();

    let result = core.write_document(folder.id, b"nope");
    assert!(matches!(result.unwrap_err().kind, CoreError::FileNotDocument));

    let result = core.read_document(folder.id);
    assert!(matches!(result.unwrap_err().kind, CoreError::FileNotDocument));
}

#[test]
fn write_bumps_content_version() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);
    let root = core.get_root().unwrap();
    let doc = core.create_file("doc.md", &root.id, FileType::Document).unwrap();
    let before = core.get_file_by_id(doc.id).unwrap().content_version;

    core.write_document(doc.id, b"content").unwrap();

    let after = core.get_file_by_id(doc.id).unwrap().content_version;
    assert!(after > before);
}

#[test]
fn read_after_delete() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);
    let root = core.get_root().unwrap();
    let doc = core.create_file("doc.md", &root.id, FileType::Document).unwrap();
    core.write_document(doc.id, b"short lived").unwrap();

    core.delete_file(&doc.id).unwrap();

    let result = core.read_document(doc.id);
    assert!(matches!(result.unwrap_err().kind, CoreError::FileNonexistent));
}
