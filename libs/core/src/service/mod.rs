pub mod account_service;
pub mod api_service;
pub mod document_service;
pub mod file_encryption_service;
pub mod file_service;
pub mod log_service;
pub mod sync_service;
