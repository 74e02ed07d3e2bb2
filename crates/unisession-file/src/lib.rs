//! unisession-file - File-backed session store.
//!
//! Every process pointed at the same directory shares one session, the way
//! browser tabs share local storage. Changes written by one process are
//! announced to the others through a filesystem watcher.

mod store;
mod watch;

pub use store::FileSessionStore;
