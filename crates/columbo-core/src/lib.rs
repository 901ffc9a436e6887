pub mod config;
pub mod logging;

pub mod classify;
pub mod connection;
pub mod discover;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod ledger;
pub mod record;
pub mod report;
pub mod resolver;
pub mod storage;
pub mod url_model;

pub use engine::{Attribution, Engine, EngineOptions, PageReport, SkippedResource};
pub use error::VerifyError;
pub use record::VerificationRecord;
