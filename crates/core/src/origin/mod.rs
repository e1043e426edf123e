//! Remote image origin access.
//!
//! Two capabilities are exposed as traits so the discovery engine and the
//! ZIP/renaming workflows can be tested without network access:
//! [`Prober`] answers "does this URL exist?", [`Fetcher`] downloads bytes.
//! [`HttpOrigin`] implements both over reqwest.

mod http;
mod types;

pub use http::HttpOrigin;
pub use types::*;
