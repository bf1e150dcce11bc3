use std::sync::{Arc, Mutex};

use inkpot_core::model::errors::CoreError;
use inkpot_core::model::file_metadata::FileType;
use inkpot_core::model::work_unit::WorkUnit;
use inkpot_core::service::api_service::no_network::InProcess;
use test_utils::*;

#[test]
fn fresh_account_has_no_work() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);

    let work = core.calculate_work().unwrap();
    assert!(work.work_units.is_empty());

    core.sync(None).unwrap();
    assert!(core.calculate_work().unwrap().work_units.is_empty());
    assert!(core.get_last_synced().unwrap() > 0);
}

#[test]
fn calculate_work_reports_local_changes() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);
    let root = core.get_root().unwrap();

    core.create_file("a.md", &root.id, FileType::Document).unwrap();
    core.create_file("b.md", &root.id, FileType::Document).unwrap();

    let work = core.calculate_work().unwrap();
    assert_eq!(work.work_units.len(), 2);
    assert!(work
        .work_units
        .iter()
        .all(|unit| matches!(unit, WorkUnit::LocalChange { .. })));

    core.sync(None).unwrap();
    assert!(core.calculate_work().unwrap().work_units.is_empty());
}

#[test]
fn calculate_work_reports_server_changes() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let core2 = test_core_from(&core1);

    let root = core1.get_root().unwrap();
    core1.create_file("a.md", &root.id, FileType::Document).unwrap();
    core1.sync(None).unwrap();

    let work = core2.calculate_work().unwrap();
    assert_eq!(work.work_units.len(), 1);
    assert!(matches!(work.work_units[0], WorkUnit::ServerChange { .. }));
}

#[test]
fn new_files_sync_to_second_device() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let root = core1.get_root().unwrap();

    let folder = core1.create_file("notes", &root.id, FileType::Folder).unwrap();
    let doc = core1.create_file("todo.md", &folder.id, FileType::Document).unwrap();
    core1.write_document(doc.id, b"buy milk").unwrap();
    core1.sync(None).unwrap();

    let core2 = test_core_from(&core1);
    assert_eq!(core2.get_file_by_id(doc.id).unwrap().name, "todo.md");
    assert_eq!(core2.get_file_by_id(doc.id).unwrap().parent, folder.id);
    assert_eq!(core2.read_document(doc.id).unwrap(), b"buy milk");
    assert_dbs_eq(&core1, &core2);
}

#[test]
fn document_edit_syncs() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let root = core1.get_root().unwrap();
    let doc = core1.create_file("doc.md", &root.id, FileType::Document).unwrap();
    core1.write_document(doc.id, b"v1").unwrap();
    core1.sync(None).unwrap();

    let core2 = test_core_from(&core1);
    assert_eq!(core2.read_document(doc.id).unwrap(), b"v1");

    core2.write_document(doc.id, b"v2").unwrap();
    core2.sync(None).unwrap();
    core1.sync(None).unwrap();
    assert_eq!(core1.read_document(doc.id).unwrap(), b"v2");
}

#[test]
fn move_and_rename_sync() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let root = core1.get_root().unwrap();
    let folder = core1.create_file("notes", &root.id, FileType::Folder).unwrap();
    let doc = core1.create_file("doc.md", &root.id, FileType::Document).unwrap();
    core1.sync(None).unwrap();
    let core2 = test_core_from(&core1);

    core1.move_file(&doc.id, &folder.id).unwrap();
    core1.rename_file(&doc.id, "moved.md").unwrap();
    core1.sync(None).unwrap();
    core2.sync(None).unwrap();

    let synced = core2.get_file_by_id(doc.id).unwrap();
    assert_eq!(synced.parent, folder.id);
    assert_eq!(synced.name, "moved.md");
}

#[test]
fn concurrent_rename_first_writer_wins() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let root = core1.get_root().unwrap();
    let doc = core1.create_file("doc.md", &root.id, FileType::Document).unwrap();
    core1.sync(None).unwrap();
    let core2 = test_core_from(&core1);

    core1.rename_file(&doc.id, "first.md").unwrap();
    core1.sync(None).unwrap();

    core2.rename_file(&doc.id, "second.md").unwrap();
    core2.sync(None).unwrap();
    core1.sync(None).unwrap();

    // whichever rename reached the server first wins, on every device
    assert_eq!(core1.get_file_by_id(doc.id).unwrap().name, "first.md");
    assert_eq!(core2.get_file_by_id(doc.id).unwrap().name, "first.md");
    assert_dbs_eq(&core1, &core2);
}

#[test]
fn concurrent_edit_duplicates_both_versions() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let root = core1.get_root().unwrap();
    let doc = core1.create_file("doc.md", &root.id, FileType::Document).unwrap();
    core1.write_document(doc.id, b"base").unwrap();
    core1.sync(None).unwrap();
    let core2 = test_core_from(&core1);

    core1.write_document(doc.id, b"first edit").unwrap();
    core1.sync(None).unwrap();

    core2.write_document(doc.id, b"second edit").unwrap();
    core2.sync(None).unwrap();
    core1.sync(None).unwrap();

    for core in [&core1, &core2] {
        let mut names: Vec<String> = core
            .get_children(&root.id)
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["doc-1.md", "doc.md"]);

        // the id that was contended keeps the bytes that reached the server
        // first; the later edit survives in the duplicate
        assert_eq!(core.read_document(doc.id).unwrap(), b"first edit");
        let sibling = core
            .get_children(&root.id)
            .unwrap()
            .into_iter()
            .find(|f| f.name == "doc-1.md")
            .unwrap();
        assert_eq!(core.read_document(sibling.id).unwrap(), b"second edit");
    }
    assert_dbs_eq(&core1, &core2);
}

#[test]
fn remote_delete_wins_over_local_edit() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let root = core1.get_root().unwrap();
    let doc = core1.create_file("doc.md", &root.id, FileType::Document).unwrap();
    core1.write_document(doc.id, b"short lived").unwrap();
    core1.sync(None).unwrap();
    let core2 = test_core_from(&core1);

    core1.delete_file(&doc.id).unwrap();
    core1.sync(None).unwrap();

    core2.write_document(doc.id, b"doomed edit").unwrap();
    core2.sync(None).unwrap();

    let result = core2.get_file_by_id(doc.id);
    assert!(matches!(result.unwrap_err().kind, CoreError::FileNonexistent));
    assert!(core2.get_children(&root.id).unwrap().is_empty());
}

#[test]
fn local_delete_pushes_to_server() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let root = core1.get_root().unwrap();
    let doc = core1.create_file("doc.md", &root.id, FileType::Document).unwrap();
    core1.sync(None).unwrap();
    let core2 = test_core_from(&core1);

    core2.delete_file(&doc.id).unwrap();
    core2.sync(None).unwrap();
    core1.sync(None).unwrap();

    let result = core1.get_file_by_id(doc.id);
    assert!(matches!(result.unwrap_err().kind, CoreError::FileNonexistent));
}

#[test]
fn folder_delete_syncs_transitively() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let root = core1.get_root().unwrap();
    let folder = core1.create_file("notes", &root.id, FileType::Folder).unwrap();
    let doc = core1.create_file("todo.md", &folder.id, FileType::Document).unwrap();
    core1.write_document(doc.id, b"buy milk").unwrap();
    core1.sync(None).unwrap();
    let core2 = test_core_from(&core1);

    core1.delete_file(&folder.id).unwrap();
    core1.sync(None).unwrap();
    core2.sync(None).unwrap();

    for core in [&core1, &core2] {
        assert!(core.get_children(&root.id).unwrap().is_empty());
        let result = core.get_file_by_id(doc.id);
        assert!(matches!(result.unwrap_err().kind, CoreError::FileNonexistent));
    }
}

#[test]
fn versions_never_decrease() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);
    let root = core.get_root().unwrap();
    let doc = core.create_file("doc.md", &root.id, FileType::Document).unwrap();

    let mut observed = vec![core.get_file_by_id(doc.id).unwrap().metadata_version];

    core.sync(None).unwrap();
    observed.push(core.get_file_by_id(doc.id).unwrap().metadata_version);

    core.rename_file(&doc.id, "renamed.md").unwrap();
    observed.push(core.get_file_by_id(doc.id).unwrap().metadata_version);

    core.sync(None).unwrap();
    observed.push(core.get_file_by_id(doc.id).unwrap().metadata_version);

    core.write_document(doc.id, b"content").unwrap();
    core.sync(None).unwrap();
    observed.push(core.get_file_by_id(doc.id).unwrap().metadata_version);

    for pair in observed.windows(2) {
        assert!(pair[0] <= pair[1], "versions went backwards: {:?}", observed);
    }
}

#[test]
fn sync_reports_progress() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);
    let root = core.get_root().unwrap();
    let doc = core.create_file("doc.md", &root.id, FileType::Document).unwrap();
    core.write_document(doc.id, b"content").unwrap();

    let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_by_closure = seen.clone();
    core.sync(Some(Box::new(move |progress| {
        seen_by_closure.lock().unwrap().push(progress.progress);
    })))
    .unwrap();

    assert!(!seen.lock().unwrap().is_empty());
}

#[test]
fn imported_account_gets_root_pointer() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let root = core1.get_root().unwrap();
    let core2 = test_core_from(&core1);

    assert_eq!(core2.get_root().unwrap().id, root.id);

    // the second device can mutate the tree right away
    let doc = core2.create_file("doc.md", &root.id, FileType::Document).unwrap();
    core2.rename_file(&doc.id, "renamed.md").unwrap();
    core2.delete_file(&doc.id).unwrap();
    core2.sync(None).unwrap();
}

#[test]
fn concurrent_reciprocal_moves_resolve() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let root = core1.get_root().unwrap();
    let alpha = core1.create_file("alpha", &root.id, FileType::Folder).unwrap();
    let beta = core1.create_file("beta", &root.id, FileType::Folder).unwrap();
    core1.sync(None).unwrap();
    let core2 = test_core_from(&core1);

    core1.move_file(&alpha.id, &beta.id).unwrap();
    core1.sync(None).unwrap();

    core2.move_file(&beta.id, &alpha.id).unwrap();
    core2.sync(None).unwrap();
    core1.sync(None).unwrap();

    // the move that reached the server first stands, the other is undone
    for core in [&core1, &core2] {
        assert_eq!(core.get_file_by_id(alpha.id).unwrap().parent, beta.id);
        assert_eq!(core.get_file_by_id(beta.id).unwrap().parent, root.id);
        core.get_children(&beta.id).unwrap();
        core.list_metadatas().unwrap();
    }
    assert_dbs_eq(&core1, &core2);
}

#[test]
fn push_of_cycle_making_move_is_rejected() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let root = core1.get_root().unwrap();
    let alpha = core1.create_file("alpha", &root.id, FileType::Folder).unwrap();
    let beta = core1.create_file("beta", &root.id, FileType::Folder).unwrap();
    core1.sync(None).unwrap();
    let core2 = test_core_from(&core1);

    core1.move_file(&alpha.id, &beta.id).unwrap();
    core1.sync(None).unwrap();

    // push the reciprocal move without pulling the other device's first
    core2.move_file(&beta.id, &alpha.id).unwrap();
    let unit = core2
        .calculate_work()
        .unwrap()
        .work_units
        .into_iter()
        .find(|unit| matches!(unit, WorkUnit::LocalChange { .. }))
        .unwrap();
    assert!(core2.execute_work(unit).is_err());

    // the server tree stayed a tree and both devices converge
    core2.sync(None).unwrap();
    core1.sync(None).unwrap();
    for core in [&core1, &core2] {
        assert_eq!(core.get_file_by_id(alpha.id).unwrap().parent, beta.id);
        assert_eq!(core.get_file_by_id(beta.id).unwrap().parent, root.id);
    }
    assert_dbs_eq(&core1, &core2);
}

#[test]
fn local_rename_survives_concurrent_remote_edit() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let root = core1.get_root().unwrap();
    let doc = core1.create_file("doc.md", &root.id, FileType::Document).unwrap();
    core1.write_document(doc.id, b"v1").unwrap();
    core1.sync(None).unwrap();
    let core2 = test_core_from(&core1);

    core1.write_document(doc.id, b"v2").unwrap();
    core1.sync(None).unwrap();

    core2.rename_file(&doc.id, "renamed.md").unwrap();
    core2.sync(None).unwrap();
    core1.sync(None).unwrap();

    // the rename and the edit touched different fields, both survive
    for core in [&core1, &core2] {
        assert_eq!(core.get_file_by_id(doc.id).unwrap().name, "renamed.md");
        assert_eq!(core.read_document(doc.id).unwrap(), b"v2");
    }
    assert_dbs_eq(&core1, &core2);
}

#[test]
fn failed_pull_surfaces_and_preserves_last_synced() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let root = core1.get_root().unwrap();
    let doc = core1.create_file("doc.md", &root.id, FileType::Document).unwrap();
    core1.write_document(doc.id, b"content").unwrap();
    core1.sync(None).unwrap();
    let core2 = test_core_from(&core1);
    let before = core2.get_last_synced().unwrap();

    core1.write_document(doc.id, b"newer").unwrap();
    core1.sync(None).unwrap();
    // the server loses the blob for the new version, so the pull cannot finish
    server.internals.lock().unwrap().documents.remove(&doc.id);

    match core2.sync(None).unwrap_err().kind {
        CoreError::WorkExecutionFailed(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, doc.id);
        }
        other => panic!("expected WorkExecutionFailed, got {:?}", other),
    }
    assert_eq!(core2.get_last_synced().unwrap(), before);
}

#[test]
fn set_last_synced_forces_repull() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);
    let root = core.get_root().unwrap();
    core.create_file("doc.md", &root.id, FileType::Document).unwrap();
    core.sync(None).unwrap();

    core.set_last_synced(0).unwrap();
    // everything the server knows shows up again, but none of it is new work
    assert!(core.calculate_work().unwrap().work_units.is_empty());
    assert!(core.get_last_synced().unwrap() == 0);

    core.sync(None).unwrap();
    assert!(core.get_last_synced().unwrap() > 0);
}
