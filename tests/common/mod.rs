//! Common test utilities for snapshot-bootstrap integration tests


#[allow(unused_imports)]
pub use fixtures::*;
