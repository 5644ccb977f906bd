//! Credential discovery and redaction
//!
//! Payloads on the bus are loosely typed JSON produced by many services.
//! [`envelope`] decodes the shapes credentials are known to travel in,
//! [`redactor`] replaces every discovered literal with a fixed marker and
//! [`directory`] caches the literals known to the directory service.

pub mod directory;
pub mod envelope;
pub mod error;
pub mod redactor;

pub use directory::{BusSecretSource, SecretDirectory, SecretSource, StaticSecretSource};
pub use envelope::{Category, CredentialHolder};
pub use error::{DirectoryError, Result};
pub use redactor::{OBFUSCATION, Redactor, UNREDACTABLE, preprocess};
