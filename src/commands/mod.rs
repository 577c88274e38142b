//! # CLI Command Implementations
//!
//! One module per subcommand. Each defines an `Args` struct derived with
//! `clap` and an `execute` function that loads what it needs and calls into
//! the `repo_mirror` library.

pub mod completions;
pub mod list;
pub mod sync;
