pub mod activity;
pub mod record;
pub mod remote;
pub mod session;
mod util;

pub use activity::Activity;
pub use record::Record;
pub use remote::{Page, RemoteError, RemoteSource};
pub use session::{CachedSession, SessionIndexEntry, SessionState, SessionSummary};
pub use util::*;
