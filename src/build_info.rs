//! Version and build stamp shown by `kwsession --version` and `--help`.

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short commit hash, or "unknown" outside a checkout.
pub const GIT_COMMIT: &str = env!("KWSESSION_BUILD_GIT_HASH");

/// UTC build time.
pub const BUILD_TIMESTAMP: &str = env!("KWSESSION_BUILD_TIMESTAMP");

/// Appended below the subcommand list in `--help`.
pub const HELP_BUILD_METADATA: &str = concat!(
    "Build:\n  commit ",
    env!("KWSESSION_BUILD_GIT_HASH"),
    "\n  built  ",
    env!("KWSESSION_BUILD_TIMESTAMP")
);

/// `--version` body after the binary name: version, commit and build time.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("KWSESSION_BUILD_GIT_HASH"),
    "\nbuilt: ",
    env!("KWSESSION_BUILD_TIMESTAMP")
);
