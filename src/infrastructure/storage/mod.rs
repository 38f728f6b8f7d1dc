//! Remember-me secret store. Without the `keyring` feature the stub stands
//! in under the same name.

#[cfg_attr(not(feature = "keyring"), path = "keyring_storage_stub.rs")]
mod keyring_storage;

pub use keyring_storage::KeyringTokenStorage;
