//! tccloud core
//!
//! Provider contract shared by the Tencent Cloud provider and the CLI:
//! attribute values, resource state, schemas, and the waiter used for
//! long-running cloud operations.

pub mod provider;
pub mod resource;
pub mod schema;
pub mod waiter;
