// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # genlog Store
//!
//! The usage log and everything around it.
//!
//! - **sync**: appends one row to the usage-log table (read-modify-write
//!   guarded by revisions)
//! - **retry**: re-runs appends that failed without writing
//! - **memory**: in-memory [`genlog_core::RemoteLogStore`] with call recording
//! - **workflow**: decorate → generate → archive → log, with independent outcomes
//! - **SettingsStore**: user preferences with persistence
//! - **CredentialVault**: service-account key and passphrase in the keychain
//!
//! ## Usage
//!
//! ```ignore
//! use genlog_core::{LogEntry, LogTable};
//! use genlog_store::{MemoryLogStore, append_with_retry};
//!
//! let store = MemoryLogStore::new();
//! let table = LogTable::in_container("folder-id");
//! append_with_retry(&entry, &table, &store, &RetryStrategy::default()).await?;
//! ```

pub mod error;
pub mod keychain;
pub mod memory;
pub mod persistence;
pub mod retry;
pub mod settings_store;
pub mod sync;
pub mod workflow;

pub use error::{LogError, SettingsError};
pub use keychain::{CredentialStatus, CredentialVault};
pub use memory::{CallCounts, FailurePoint, MemoryLogStore};
pub use persistence::{
    default_config_dir, default_output_dir, default_settings_path, load_json, save_json,
    write_new_file, write_numbered_file,
};
pub use retry::append_with_retry;
pub use settings_store::{SETTING_KEYS, Settings, SettingsStore};
pub use sync::{append, read_entries};
pub use workflow::{
    ArchiveStatus, GenerationOutcome, GenerationRequest, GenerationWorkflow, LogStatus,
};
