//! Client for the operator admin resource: paged listing, detail, create,
//! update, delete, password reset, status toggle and export.

mod client;
mod types;

pub use client::{ClientConfig, OperatorClient};
pub use types::{OperatorForm, OperatorInfo, OperatorPage, OperatorQuery, OperatorStatus};
