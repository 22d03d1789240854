//! Promoter source-control adapter.
//!
//! Implements [`promotion::SourceControl`] by running the `git` executable with
//! `tokio::process`. Every invocation disables interactive prompts so a
//! missing credential fails instead of hanging.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Command lines and output parsing live here. Remote URLs
//! may embed an access token, so they are never logged or copied into errors;
//! commands are described by their subcommand and non-secret arguments only.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use promotion::{BranchName, CommitSha, PushOutcome, SourceControl, SourceControlError};
use tokio::process::Command;

/// [`SourceControl`] backed by the `git` command-line tool.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

/// Captured result of one git invocation.
struct Captured {
    exit_code: Option<i32>,
    success: bool,
    stdout: String,
    stderr: String,
}

impl Captured {
    fn combined(&self) -> String {
        let mut output = self.stdout.trim_end().to_string();
        let stderr = self.stderr.trim_end();
        if !output.is_empty() && !stderr.is_empty() {
            output.push('\n');
        }
        output.push_str(stderr);
        output
    }
}

impl GitCli {
    /// Uses `program` as the git executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs git in `dir` (or the current directory) and captures its output.
    ///
    /// `description` names the command in errors instead of the real arguments.
    async fn run<I, S>(
        &self,
        dir: Option<&Path>,
        args: I,
        description: &str,
    ) -> Result<Captured, SourceControlError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        tracing::debug!(command = description, "running git");
        let output = command.output().await.map_err(|e| SourceControlError::Spawn {
            program: self.program.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(Captured {
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Like [`Self::run`], but a non-zero exit is an error.
    async fn run_checked<I, S>(
        &self,
        dir: Option<&Path>,
        args: I,
        description: &str,
    ) -> Result<Captured, SourceControlError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let captured = self.run(dir, args, description).await?;
        if captured.success {
            Ok(captured)
        } else {
            Err(SourceControlError::Failed {
                command: description.to_string(),
                exit_code: captured.exit_code,
                output: captured.combined(),
            })
        }
    }
}

#[async_trait]
impl SourceControl for GitCli {
    async fn clone_branch(
        &self,
        url: &str,
        branch: &BranchName,
        dest: &Path,
    ) -> Result<(), SourceControlError> {
        let description = format!("git clone --branch {branch}");
        let args: [&OsStr; 7] = [
            "clone".as_ref(),
            "--branch".as_ref(),
            branch.as_str().as_ref(),
            "--recurse-submodules".as_ref(),
            "--".as_ref(),
            url.as_ref(),
            dest.as_os_str(),
        ];
        self.run_checked(None, args, &description).await?;

        self.run_checked(
            Some(dest),
            ["submodule", "update", "--init", "--recursive"],
            "git submodule update --init --recursive",
        )
        .await?;
        tracing::info!(%branch, "cloned branch with submodules");
        Ok(())
    }

    async fn head_sha(&self, repo_dir: &Path) -> Result<CommitSha, SourceControlError> {
        const DESCRIPTION: &str = "git rev-parse HEAD";
        let captured = self.run_checked(Some(repo_dir), ["rev-parse", "HEAD"], DESCRIPTION).await?;
        let raw = captured.stdout.trim();
        CommitSha::parse(raw).ok_or_else(|| SourceControlError::UnexpectedOutput {
            command: DESCRIPTION.to_string(),
            output: raw.to_string(),
        })
    }

    async fn add_remote(
        &self,
        repo_dir: &Path,
        name: &str,
        url: &str,
    ) -> Result<(), SourceControlError> {
        self.run_checked(
            Some(repo_dir),
            ["remote", "add", name, url],
            &format!("git remote add {name}"),
        )
        .await?;
        tracing::info!(remote = name, "added remote");
        Ok(())
    }

    async fn push(
        &self,
        repo_dir: &Path,
        remote: &str,
        local_branch: &BranchName,
        remote_branch: &BranchName,
    ) -> Result<PushOutcome, SourceControlError> {
        let refspec = format!("{local_branch}:{remote_branch}");
        let captured = self
            .run(
                Some(repo_dir),
                ["push", remote, refspec.as_str()],
                &format!("git push {remote} {refspec}"),
            )
            .await?;
        Ok(PushOutcome {
            exit_code: captured.exit_code,
            output: captured.combined(),
        })
    }
}
