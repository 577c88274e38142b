//! Thin wrappers around the system `git` binary.
//!
//! Using the system git means clones and fetches pick up whatever the user
//! has configured:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Personal access tokens
//! - Any authentication configured in ~/.gitconfig
//!
//! Every command runs with `GIT_TERMINAL_PROMPT=0` so an unattended run fails
//! instead of blocking on a credential prompt.

use std::fmt;
use std::path::Path;
use std::process::Command;

/// Refspec used for the single-call fetch of every branch on a remote.
pub const ALL_HEADS_REFSPEC: &str = "refs/heads/*:refs/heads/*";

/// Fragment of git's diagnostic when a requested ref no longer exists upstream.
const DEAD_REF_MARKER: &str = "find remote ref";

/// A local branch name as read from the ref store.
///
/// Ref names are bytes on disk; names that are not valid UTF-8 come back as
/// `Err` with the raw bytes.
pub type BranchName = std::result::Result<String, Vec<u8>>;

/// Classification of a failed git command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitErrorKind {
    /// The ref was deleted upstream.
    DeadRef,
    /// Anything else, including network and authentication failures.
    Other,
}

/// A failed git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitError {
    pub kind: GitErrorKind,
    pub command: String,
    pub message: String,
}

impl GitError {
    /// Builds an error from a command's stderr, classifying it on the way.
    ///
    /// git has no machine-readable failure codes, so the dead-ref case is
    /// recognised from the wording of its diagnostic.
    pub fn from_stderr(command: &str, stderr: &str) -> Self {
        let kind = if stderr.contains(DEAD_REF_MARKER) {
            GitErrorKind::DeadRef
        } else {
            GitErrorKind::Other
        };
        Self {
            kind,
            command: command.to_string(),
            message: stderr.trim().to_string(),
        }
    }

    pub fn is_dead_ref(&self) -> bool {
        self.kind == GitErrorKind::DeadRef
    }
}

impl fmt::Display for GitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git {}: {}", self.command, self.message)
    }
}

impl std::error::Error for GitError {}

/// A command for `program` that does not receive terminal signals.
///
/// On unix the child gets its own process group, so Ctrl-C reaches only
/// repo-mirror and a running clone or fetch is left to finish.
fn detached(program: &str) -> Command {
    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut cmd = Command::new(program);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    cmd
}

/// Runs git with `args`, optionally inside `dir`, and returns its stdout.
fn run(dir: Option<&Path>, args: &[&str]) -> Result<Vec<u8>, GitError> {
    let command = args.first().copied().unwrap_or_default();

    let mut cmd = detached("git");
    if let Some(dir) = dir {
        cmd.arg("-C").arg(dir);
    }
    let output = cmd
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(|e| GitError {
            kind: GitErrorKind::Other,
            command: command.to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::from_stderr(command, &stderr));
    }

    Ok(output.stdout)
}

/// Rewrites the anonymous `git://` scheme to `https://` so stored
/// credentials apply to the clone.
pub fn normalize_clone_url(url: &str) -> String {
    match url.strip_prefix("git://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

/// Clone `url` as a bare repository at `target_dir`.
pub fn clone_bare(url: &str, target_dir: &Path) -> Result<(), GitError> {
    let target = target_dir.to_string_lossy();
    run(None, &["clone", "--bare", "--quiet", "--", url, &target])?;
    Ok(())
}

/// List the local branches of the repository at `repo_dir`.
pub fn list_local_branches(repo_dir: &Path) -> Result<Vec<BranchName>, GitError> {
    let stdout = run(
        Some(repo_dir),
        &["for-each-ref", "--format=%(refname)", "refs/heads/"],
    )?;
    Ok(parse_branch_list(&stdout))
}

/// Parse `for-each-ref --format=%(refname)` output into branch names.
pub fn parse_branch_list(stdout: &[u8]) -> Vec<BranchName> {
    stdout
        .split(|b| *b == b'\n')
        .filter(|line| !line.is_empty())
        .map(|line| {
            let name = line.strip_prefix(b"refs/heads/").unwrap_or(line);
            String::from_utf8(name.to_vec()).map_err(|e| e.into_bytes())
        })
        .collect()
}

/// List the names of the remotes configured on the repository at `repo_dir`.
pub fn list_remotes(repo_dir: &Path) -> Result<Vec<String>, GitError> {
    let stdout = run(Some(repo_dir), &["remote"])?;
    Ok(String::from_utf8_lossy(&stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Fetch `refspec` from `remote` into the repository at `repo_dir`.
pub fn fetch(repo_dir: &Path, remote: &str, refspec: &str) -> Result<(), GitError> {
    run(Some(repo_dir), &["fetch", "--quiet", remote, refspec])?;
    Ok(())
}

/// Regenerate the auxiliary files used to serve the repository over dumb HTTP.
pub fn update_server_info(repo_dir: &Path) -> Result<(), GitError> {
    run(Some(repo_dir), &["update-server-info"])?;
    Ok(())
}

/// Set `key` (e.g. `gitweb.owner`) to `value` in the repository's config.
pub fn set_config(repo_dir: &Path, key: &str, value: &str) -> Result<(), GitError> {
    run(Some(repo_dir), &["config", key, value])?;
    Ok(())
}
