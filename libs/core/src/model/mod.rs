pub mod account;
pub mod api;
pub mod clock;
pub mod core_config;
pub mod crypto;
pub mod errors;
pub mod file;
pub mod file_metadata;
pub mod filename;
pub mod pubkey;
pub mod secret_filename;
pub mod symkey;
pub mod work_unit;
