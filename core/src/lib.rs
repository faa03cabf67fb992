//! `pgisam-core`: the translation engine behind the ISAM-on-SQL bridge.
//! Components A-D, F (record codec, schema registry, connection/result
//! wrapper, context/cursor machine, error mapping) plus the `Engine` that
//! wires them together; `pgisam-bridge` is a thin `extern "C"` shim over
//! [`engine::Engine`]'s methods.

pub mod codec;
pub mod conn;
pub mod context;
pub mod datatype;
pub mod decimal;
pub mod engine;
pub mod err;
pub mod schema;
pub mod value;

pub use engine::Engine;
pub use err::{IsamError, Result};
