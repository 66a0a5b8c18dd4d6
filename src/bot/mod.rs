/// Command, link and button handlers
pub mod handlers;
/// A single download-and-deliver job
pub mod job;
/// Retrying wrappers for message edits and deletes
pub mod resilient;
/// Download worker pool and session access
pub mod service;
/// Pending link storage
pub mod session;
/// Chat operations used by jobs
pub mod transport;
/// Texts and keyboards
pub mod views;

pub use service::{DownloadService, Selection};
pub use session::SessionStore;
pub use transport::{ChatTransport, TelegramTransport};
