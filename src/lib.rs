//! godev - hot reload for a single program
//!
//! godev watches a source tree, rebuilds the target whenever a relevant file
//! changes, and keeps exactly one instance of the built program running,
//! replacing it after every successful build.

pub mod artifact;
pub mod builder;
pub mod config;
pub mod debounce;
pub mod error;
pub mod event;
pub mod filter;
pub mod lifecycle;
pub mod session;
pub mod supervisor;
pub mod watch;

// Re-exports for convenience
pub use artifact::Artifact;
pub use builder::{Builder, CommandBuilder};
pub use config::{Config, ConfigWarning};
pub use debounce::Debouncer;
pub use error::{DevError, DevResult, Phase};
pub use event::{DevEvent, EventSink, ExitReason};
pub use filter::ChangeFilter;
pub use lifecycle::{run, DevOptions};
pub use session::DevSession;
pub use supervisor::{ProcessSupervisor, SupervisorOptions, Termination};
pub use watch::{ChangeKind, WatchEvent, WatchLoop};
