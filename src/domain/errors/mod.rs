//! Error types shared across layers.

mod auth_error;
mod core_error;
mod secret_error;

pub use auth_error::AuthError;
pub use core_error::{HandlerError, MediaError, NotifyError, StoreError};
pub use secret_error::SecretError;
