pub mod config;
pub mod logging;

pub mod coordinator;
pub mod error;
pub mod fetch;
pub mod fetch_head;
pub mod ledger;
pub mod progress;
pub mod record;
pub mod retry;
pub mod session;
pub mod storage;
pub mod url_model;
pub mod worker;

pub use coordinator::{Coordinator, DownloadOptions, DownloadReport};
pub use error::{DownloadFailed, SetupError};
pub use session::{download, DownloadRequest};
