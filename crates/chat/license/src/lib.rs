//! License key gate for NothingAI.
//!
//! [`LicenseGate`] validates and activates keys of the form
//! `NOTHING-XXXX-XXXX-XXXX` against a pluggable [`LicenseBackend`]:
//!
//! - [`LocalBackend`] keeps records in the local store
//! - [`RemoteBackend`] talks to a REST document store
//! - [`HybridBackend`] prefers the remote store and falls back to the local copy
//!
//! # Not a security boundary
//!
//! Every rule runs on the client and the activation is only obfuscated, not
//! signed or encrypted. Anyone with the binary can bypass the gate. It exists
//! to keep honest users honest.
//!
//! ```no_run
//! use std::sync::Arc;
//! use nothing_license::{LicenseGate, LocalBackend};
//! use nothing_store::Store;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::open("/tmp/nothingai")?;
//! let gate = LicenseGate::new(Arc::new(LocalBackend::new(store.clone())), store)?;
//! let outcome = gate.activate("NOTHING-AB12-CD34-EF56").await?;
//! println!("{}", outcome.message);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod gate;
pub mod obfuscate;
pub mod record;

pub use backend::{HybridBackend, LicenseBackend, LocalBackend, MemoryBackend, RemoteBackend};
pub use error::LicenseError;
pub use gate::{ActivationOutcome, LicenseGate, LicenseStatus, ValidationOutcome};
pub use record::LicenseRecord;
