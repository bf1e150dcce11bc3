use itertools::Itertools;
use uuid::Uuid;

use inkpot_core::model::account::Account;
use inkpot_core::model::core_config::Config;
use inkpot_core::model::file::File;
use inkpot_core::service::api_service::no_network::InProcess;
use inkpot_core::CoreLib;

pub type TestCore = CoreLib<InProcess>;

pub fn test_config() -> Config {
    Config { logs: false, colored_logs: false, writeable_path: format!("/tmp/{}", Uuid::new_v4()) }
}

/// A core wired to an in-memory server. Pass the same `InProcess` to several
/// cores to simulate several devices.
pub fn test_core(server: &InProcess) -> TestCore {
    CoreLib::init_in_process(&test_config(), server.clone()).unwrap()
}

pub fn test_core_with_account(server: &InProcess) -> (TestCore, Account) {
    let core = test_core(server);
    let account = core.create_account(&random_name(), "http://in-process").unwrap();
    (core, account)
}

/// A second device for the same account: fresh local state, same server.
pub fn test_core_from(core: &TestCore) -> TestCore {
    let server = core.in_tx(|s| Ok(s.client.clone())).unwrap();
    let account_string = core.export_account().unwrap();
    let new_core = test_core(&server);
    new_core.import_account(&account_string).unwrap();
    new_core.sync(None).unwrap();
    new_core
}

pub fn random_name() -> String {
    Uuid::new_v4().to_string().replace('-', "")
}

/// File listings for comparison across devices, ignoring ordering.
pub fn describe_files(core: &TestCore) -> Vec<(Uuid, String)> {
    core.list_metadatas()
        .unwrap()
        .into_iter()
        .map(|f: File| (f.id, f.name))
        .sorted()
        .collect()
}

pub fn assert_dbs_eq(left: &TestCore, right: &TestCore) {
    assert_eq!(describe_files(left), describe_files(right));
}
