use inkpot_core::model::errors::CoreError;
use inkpot_core::service::api_service::no_network::InProcess;
use test_utils::*;

#[test]
fn create_account_simple() {
    let server = InProcess::init();
    let (core, account) = test_core_with_account(&server);

    assert_eq!(core.get_account().unwrap(), account);
    assert_eq!(core.get_public_key().unwrap(), account.public_key());
}

#[test]
fn create_account_has_root() {
    let server = InProcess::init();
    let (core, account) = test_core_with_account(&server);

    let root = core.get_root().unwrap();
    assert_eq!(root.name, account.username);
    assert!(root.is_root());
    assert!(root.metadata_version > 0);
}

#[test]
fn create_account_username_taken() {
    let server = InProcess::init();
    let (core1, account) = test_core_with_account(&server);
    let core2 = test_core(&server);

    let result = core2.create_account(&account.username, "http://in-process");
    assert!(matches!(result.unwrap_err().kind, CoreError::UsernameTaken));
    assert_eq!(core1.get_account().unwrap().username, account.username);
}

#[test]
fn create_account_username_invalid() {
    let server = InProcess::init();
    let core = test_core(&server);

    let result = core.create_account("not alphanumeric!", "http://in-process");
    assert!(matches!(result.unwrap_err().kind, CoreError::UsernameInvalid));

    let result = core.create_account("", "http://in-process");
    assert!(matches!(result.unwrap_err().kind, CoreError::UsernameInvalid));
}

#[test]
fn create_account_twice() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);

    let result = core.create_account(&random_name(), "http://in-process");
    assert!(matches!(result.unwrap_err().kind, CoreError::AccountExists));
}

#[test]
fn get_account_before_create() {
    let server = InProcess::init();
    let core = test_core(&server);

    let result = core.get_account();
    assert!(matches!(result.unwrap_err().kind, CoreError::AccountNonexistent));
}

#[test]
fn import_account_roundtrip() {
    let server = InProcess::init();
    let (core1, account) = test_core_with_account(&server);

    let core2 = test_core(&server);
    let imported = core2.import_account(&core1.export_account().unwrap()).unwrap();

    assert_eq!(imported, account);
    assert_eq!(core2.get_account().unwrap(), account);
}

#[test]
fn import_account_corrupted() {
    let server = InProcess::init();
    let core = test_core(&server);

    let result = core.import_account("definitely not base64 bincode");
    assert!(matches!(result.unwrap_err().kind, CoreError::AccountStringCorrupted));
}

#[test]
fn import_account_unknown_username() {
    let server1 = InProcess::init();
    let (core1, _) = test_core_with_account(&server1);

    // same account string presented to a server that has never seen the user
    let server2 = InProcess::init();
    let core2 = test_core(&server2);
    let result = core2.import_account(&core1.export_account().unwrap());
    assert!(matches!(result.unwrap_err().kind, CoreError::UsernameNotFound));
}

#[test]
fn import_account_public_key_mismatch() {
    let server1 = InProcess::init();
    let (core1, account) = test_core_with_account(&server1);

    // a different keypair registered the same username on another server
    let server2 = InProcess::init();
    let imposter = test_core(&server2);
    imposter
        .create_account(&account.username, "http://in-process")
        .unwrap();

    let core3 = test_core(&server1);
    let result = core3.import_account(&imposter.export_account().unwrap());
    assert!(matches!(result.unwrap_err().kind, CoreError::UsernamePublicKeyMismatch));

    drop(core1);
}

#[test]
fn import_account_when_account_exists() {
    let server = InProcess::init();
    let (core1, _) = test_core_with_account(&server);
    let (core2, _) = test_core_with_account(&server);

    let result = core2.import_account(&core1.export_account().unwrap());
    assert!(matches!(result.unwrap_err().kind, CoreError::AccountExists));
}

#[test]
fn export_account_qr_is_png() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);

    let png = core.export_account_qr().unwrap();
    assert_eq!(&png[1..4], b"PNG");
}

#[test]
fn export_account_phrase_word_count() {
    let server = InProcess::init();
    let (core, _) = test_core_with_account(&server);

    let phrase = core.export_account_phrase().unwrap();
    assert_eq!(phrase.split(' ').count(), 24);
}
