//! Service layer for business logic.

pub mod ask_service;
pub mod ingest_service;

pub use ask_service::AskService;
pub use ingest_service::IngestService;
