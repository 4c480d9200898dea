//! Upgrade Testing - nested test handles
//!
//! The upgrade suite reports through a test handle in the manner of Go's
//! `testing.T`: every operation runs inside a named sub-test, failures and
//! skips are recorded on the handle, and the resulting tree can be rendered
//! as `--- PASS/FAIL/SKIP:` lines or serialized.
//!
//! # Example
//!
//! ```rust,ignore
//! use upgrade_testing::TestHandle;
//!
//! let t = TestHandle::new("Upgrade");
//! let passed = t
//!     .run("smoke", |t| async move {
//!         t.log("checking");
//!         Ok(())
//!     })
//!     .await;
//! assert!(passed);
//! print!("{}", t.report().render());
//! ```

pub mod handle;
pub mod report;

pub use handle::{panic_message, Abort, TestHandle, TestResult};
pub use report::{Outcome, TestReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
