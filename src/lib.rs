//! Measurs - Measurement Package Codec with Encrypted History
//!
//! Decodes compact letter-encoded measurement strings into package totals and
//! keeps an encrypted record of every conversion in two independent sinks.
//!
//! ## Flow
//!
//! ```text
//! convert: Input → Decode → Encrypt(input, output) → Primary sink
//!                                                  → Secondary sink
//! history: Primary sink → Decrypt → Entries (undecryptable records skipped)
//! ```
//!
//! - **Decode**: `_` = 0, `a`..`z` = 1..26, `z` chains into the next character
//! - **Encrypt**: AES-256-GCM, fresh nonce per field
//! - **Primary sink**: queryable collection, authoritative for reads
//! - **Secondary sink**: local JSON array, rewritten under a lock
//!
//! ## Example
//!
//! ```no_run
//! use measurs::config::Config;
//! use measurs::observe::TracingObserver;
//! use std::sync::Arc;
//!
//! let service = Config::in_dir("data")
//!     .open_service(Arc::new(TracingObserver))
//!     .unwrap();
//!
//! assert_eq!(service.convert("abbcc").unwrap(), vec![2, 6]);
//! for entry in service.history().unwrap() {
//!     println!("{} -> {:?}", entry.input, entry.output);
//! }
//! ```

pub mod alphabet;
pub mod cipher;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod keystore;
pub mod ledger;
pub mod observe;
pub mod record;
pub mod service;
pub mod sink;
pub mod telemetry;

pub use codec::{decode, Grammar};
pub use error::{MeasursError, Result};
pub use record::{HistoryEntry, HistoryRecord};
pub use service::Service;
