//! Process exit codes used by the `project-kit` binary.
//!
//! - `0`: success
//! - `1`: general error
//! - `2`: invalid command-line usage (produced by clap)
//! - `3`: the requested change could not be resolved; nothing was modified
//! - `4`: a planned file operation failed validation; nothing was modified
//! - `5`: update found conflicts; the manifest revision did not advance

pub const SUCCESS: i32 = 0;
pub const ERROR: i32 = 1;
pub const USAGE: i32 = 2;
pub const RESOLUTION_FAILED: i32 = 3;
pub const VALIDATION_FAILED: i32 = 4;
pub const CONFLICTS: i32 = 5;
