//! Shared test utilities for integration and E2E tests.
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config();
//!     fixture.command().arg("list").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::git;
    #[allow(unused_imports)]
    pub use super::Upstream;
    pub use super::TestFixture;
}

/// A temporary directory holding a `repo-mirror.ini` and a `mirrors/`
/// repository directory.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write a config pointing `repo_dir` at `mirrors/` inside the fixture.
    pub fn with_config(self) -> Self {
        let content = format!(
            "[auth]\nusername = alice\ntoken = test-token\n\n[options]\nrepo_dir = {}\n",
            self.mirror_dir().display()
        );
        self.with_raw_config(&content)
    }

    pub fn with_raw_config(self, content: &str) -> Self {
        self.temp_dir
            .child("repo-mirror.ini")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Create an empty directory that looks like a bare mirror.
    pub fn with_mirror(self, owner: &str, name: &str) -> Self {
        self.temp_dir
            .child(format!("mirrors/{}/{}.git", owner, name))
            .create_dir_all()
            .expect("Failed to create mirror directory");
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.temp_dir
            .child(path)
            .create_dir_all()
            .expect("Failed to create directory");
        self
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("repo-mirror.ini")
    }

    pub fn mirror_dir(&self) -> PathBuf {
        self.temp_dir.path().join("mirrors")
    }

    /// The binary, run inside the fixture with no config from the
    /// environment.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("repo-mirror");
        cmd.current_dir(self.path()).env_remove("REPO_MIRROR_CONFIG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Run git in `dir` and return trimmed stdout, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A working repository acting as the remote side of a mirror.
pub struct Upstream {
    path: PathBuf,
}

impl Upstream {
    /// Create a repository at `path` with one commit on `main`.
    pub fn create(path: &Path) -> Self {
        std::fs::create_dir_all(path).expect("Failed to create upstream dir");
        git(path, &["init", "--quiet"]);
        let upstream = Self {
            path: path.to_path_buf(),
        };
        upstream.commit("README.md", "# upstream\n");
        git(path, &["branch", "-M", "main"]);
        upstream
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn url(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn commit(&self, file: &str, content: &str) {
        std::fs::write(self.path.join(file), content).expect("Failed to write file");
        git(&self.path, &["add", file]);
        git(&self.path, &["commit", "--quiet", "-m", &format!("update {}", file)]);
    }

    pub fn rev(&self, branch: &str) -> String {
        git(&self.path, &["rev-parse", &format!("refs/heads/{}", branch)])
    }
}
