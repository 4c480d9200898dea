//! Progress lines
//!
//! The suite reports progress as numbered log lines. Tooling scrapes these
//! lines, so their text is part of the public contract.

use std::fmt;

/// Logged when the suite starts
pub const SUITE_RUNNING: &str = "🏃 Running upgrade test suite...";
/// Logged when every phase passed
pub const SUITE_SUCCESS: &str = "🥳🎉 Success! Upgrade suite completed without errors.";
/// Logged when any phase failed
pub const SUITE_FAILURE: &str = "💣🤬💔️ Upgrade suite have failed!";

/// Debug line for an operation skipped after an earlier failure
#[must_use]
pub fn skipping_operation(name: &str) -> String {
    format!("Skipping \"{name}\" as previous operation have failed")
}

/// The eight phases of a suite, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Base installations
    InstallingBase,
    /// Tests before the upgrade
    PreUpgradeTests,
    /// Setup and launch of background operations
    StartContinualTests,
    /// Upgrade operations
    UpgradeWith,
    /// Tests after the upgrade
    PostUpgradeTests,
    /// Downgrade operations
    DowngradeWith,
    /// Tests after the downgrade
    PostDowngradeTests,
    /// Stop and verification of background operations
    VerifyContinualTests,
}

impl Phase {
    /// All phases in execution order
    pub const ALL: [Phase; 8] = [
        Phase::InstallingBase,
        Phase::PreUpgradeTests,
        Phase::StartContinualTests,
        Phase::UpgradeWith,
        Phase::PostUpgradeTests,
        Phase::DowngradeWith,
        Phase::PostDowngradeTests,
        Phase::VerifyContinualTests,
    ];

    /// One-based phase number used in progress lines
    #[must_use]
    pub const fn number(self) -> usize {
        match self {
            Phase::InstallingBase => 1,
            Phase::PreUpgradeTests => 2,
            Phase::StartContinualTests => 3,
            Phase::UpgradeWith => 4,
            Phase::PostUpgradeTests => 5,
            Phase::DowngradeWith => 6,
            Phase::PostDowngradeTests => 7,
            Phase::VerifyContinualTests => 8,
        }
    }

    /// Name of the sub-test grouping the phase's operations
    #[must_use]
    pub const fn group_name(self) -> &'static str {
        match self {
            Phase::InstallingBase => "InstallingBase",
            Phase::PreUpgradeTests => "PreUpgradeTests",
            Phase::StartContinualTests => "ContinualTests",
            Phase::UpgradeWith => "UpgradeWith",
            Phase::PostUpgradeTests => "PostUpgradeTests",
            Phase::DowngradeWith => "DowngradeWith",
            Phase::PostDowngradeTests => "PostDowngradeTests",
            Phase::VerifyContinualTests => "VerifyContinualTests",
        }
    }

    /// Parse a phase from its group name, case-insensitively
    #[must_use]
    pub fn from_group_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.group_name().eq_ignore_ascii_case(name))
    }

    /// Header line for a phase with `count` registered operations
    #[must_use]
    pub fn starting(self, count: usize) -> String {
        let n = self.number();
        match self {
            Phase::InstallingBase => {
                format!("{n}) 💿 Installing base installations. {count} are registered.")
            }
            Phase::PreUpgradeTests => format!(
                "{n}) ✅️️ Testing functionality before upgrade is performed. {count} tests are registered."
            ),
            Phase::StartContinualTests => {
                format!("{n}) 🔄 Starting continual tests. {count} tests are registered.")
            }
            Phase::UpgradeWith => format!("{n}) 📀 Upgrading with {count} registered operations."),
            Phase::PostUpgradeTests => format!(
                "{n}) ✅️️ Testing functionality after upgrade is performed. {count} tests are registered."
            ),
            Phase::DowngradeWith => {
                format!("{n}) 💿 Downgrading with {count} registered operations.")
            }
            Phase::PostDowngradeTests => format!(
                "{n}) ✅️️ Testing functionality after downgrade is performed. {count} tests are registered."
            ),
            Phase::VerifyContinualTests => {
                format!("{n}) ✋ Verifying {count} running continual tests.")
            }
        }
    }

    /// Line for the `index`-th (one-based) operation of a phase
    #[must_use]
    pub fn element(self, index: usize, name: &str) -> String {
        let n = self.number();
        match self {
            Phase::InstallingBase => format!("{n}.{index}) Installing base install of \"{name}\"."),
            Phase::PreUpgradeTests | Phase::PostUpgradeTests | Phase::PostDowngradeTests => {
                format!("{n}.{index}) Testing with \"{name}\".")
            }
            Phase::StartContinualTests => {
                format!("{n}.{index}) Starting continual tests of \"{name}\".")
            }
            Phase::UpgradeWith => format!("{n}.{index}) Upgrading with \"{name}\"."),
            Phase::DowngradeWith => format!("{n}.{index}) Downgrading with \"{name}\"."),
            Phase::VerifyContinualTests => format!("{n}.{index}) Verifying \"{name}\"."),
        }
    }

    /// Line for a phase without registered operations
    #[must_use]
    pub fn skipped(self) -> String {
        let n = self.number();
        match self {
            Phase::InstallingBase => format!("{n}) 💿 No base installation registered. Skipping."),
            Phase::PreUpgradeTests => {
                format!("{n}) ✅️️ No pre upgrade tests registered. Skipping.")
            }
            Phase::StartContinualTests | Phase::VerifyContinualTests => {
                format!("{n}) {} No continual tests registered. Skipping.", self.emoji())
            }
            Phase::UpgradeWith => format!("{n}) 📀 No upgrade operations registered. Skipping."),
            Phase::PostUpgradeTests => {
                format!("{n}) ✅️️ No post upgrade tests registered. Skipping.")
            }
            Phase::DowngradeWith => {
                format!("{n}) 💿 No downgrade operations registered. Skipping.")
            }
            Phase::PostDowngradeTests => {
                format!("{n}) ✅️️ No post downgrade tests registered. Skipping.")
            }
        }
    }

    const fn emoji(self) -> &'static str {
        match self {
            Phase::InstallingBase | Phase::DowngradeWith => "💿",
            Phase::PreUpgradeTests | Phase::PostUpgradeTests | Phase::PostDowngradeTests => "✅️️",
            Phase::StartContinualTests => "🔄",
            Phase::UpgradeWith => "📀",
            Phase::VerifyContinualTests => "✋",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.group_name())
    }
}
