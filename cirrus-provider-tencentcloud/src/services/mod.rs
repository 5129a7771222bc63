//! Per-product facades over [`TencentCloudClient`](crate::client::TencentCloudClient)
//!
//! Each facade owns the typed request and response shapes of its product
//! area; field names follow the API's PascalCase convention through serde.

pub mod dts;
pub mod tse;
pub mod tsf;

pub use dts::DtsClient;
pub use tse::TseClient;
pub use tsf::TsfClient;
