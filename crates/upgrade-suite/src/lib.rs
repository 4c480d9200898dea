//! Upgrade Suite - staged upgrade test execution
//!
//! A [`Suite`] groups operations into eight numbered phases:
//! 1. base installations
//! 2. pre-upgrade tests
//! 3. start of continual (background) tests
//! 4. upgrade
//! 5. post-upgrade tests
//! 6. downgrade
//! 7. post-downgrade tests
//! 8. verification of continual tests
//!
//! Phases run in order and stop at the first failure. Continual tests keep
//! running in their own tasks during phases 4 to 7 and are stopped and
//! verified one by one in phase 8.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use upgrade_suite::prelude::*;
//!
//! let suite = Suite {
//!     installations: Installations {
//!         base: vec![Operation::new("Serving v1", |ctx| async move { install_v1(ctx).await })],
//!         upgrade_with: vec![Operation::new("Serving HEAD", |ctx| async move { install_head(ctx).await })],
//!         ..Default::default()
//!     },
//!     tests: Tests {
//!         continual: vec![BackgroundOperation::verification(
//!             "ProbeTest",
//!             |ctx| async move { start_prober(ctx).await },
//!             |ctx| async move { verify_prober(ctx).await },
//!         )],
//!         ..Default::default()
//!     },
//! };
//!
//! let t = TestHandle::new("TestUpgrade");
//! suite.execute(Configuration::new(t.clone())).await;
//! assert!(!t.failed(), "{}", t.report().render());
//! ```

pub mod context;
pub mod error;
mod execution;
pub mod logging;
pub mod messages;
pub mod operation;
pub mod settings;
pub mod suite;

pub use context::{wait_for_stop_event, BackgroundContext, Context, StopEvent, DEFAULT_WAIT_TIME};
pub use error::SuiteError;
pub use execution::ExecutionState;
pub use messages::Phase;
pub use operation::{BackgroundOperation, Operation, SuiteOperation};
pub use suite::{Configuration, Installations, Suite, Terminal, Tests};
pub use upgrade_testing::{Abort, TestHandle, TestResult};

/// Common imports for writing suites
pub mod prelude {
    pub use crate::{
        Abort, BackgroundContext, BackgroundOperation, Configuration, Context, Installations,
        Operation, StopEvent, Suite, Terminal, TestHandle, TestResult, Tests,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
