//! Host APIs used by fetchers.
//!
//! - [`process`] - Shell execution for data-source programs
//! - [`secrets`] - Short-lived secrets files, optionally from the keychain

pub mod process;
pub mod secrets;

pub use process::{ProcessOutput, ProcessRunner};
pub use secrets::{
    AdHocSecrets, KeychainLookup, KeychainSecrets, NoSecrets, SecretFile, SecretRef,
    SecretsProvider, SystemKeychain,
};
