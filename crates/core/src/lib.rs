//! dbstudio_core: maps dialect-agnostic requests (raw SQL, schema
//! introspection) onto one database handle and returns uniform shapes.
//! - `dialect`: introspection SQL per backend family
//! - `normalize`: introspection rows to table and column descriptors
//! - `raw`: arbitrary SQL execution with parameter normalization
//! - `actions`: the named introspection operations

pub mod actions;
pub mod dialect;
pub mod error;
pub mod handle;
pub mod normalize;
pub mod raw;

pub use actions::{Action, ActionGateway, ActionRequest, ActionResponse};
pub use dialect::{Dialect, ParseDialectError, QueryTable};
pub use error::{BackendError, Error, Result};
pub use handle::{DatabaseHandle, Param, Row, RunOutcome, Statement};
pub use normalize::ColumnDescriptor;
pub use raw::{ParamsInput, RawGateway, RawQuery, RowsResponse, SuccessResponse};
