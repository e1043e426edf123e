//! Photo renaming from a code → name spreadsheet.
//!
//! The mapping spreadsheet is fetched from a configured URL and cached in
//! SQLite ([`SqliteMappingStore`]); [`MappingRefresher`] reloads it only when
//! its md5 changes. [`Renamer`] renames uploads against the table and parks
//! the results in a [`RenameSessionStore`] until the client downloads them.

mod refresher;
mod service;
mod session;
mod store;
mod types;

pub use refresher::MappingRefresher;
pub use service::Renamer;
pub use session::RenameSessionStore;
pub use store::{MappingStore, SqliteMappingStore, META_FILE_HASH, META_LAST_UPDATED};
pub use types::*;
