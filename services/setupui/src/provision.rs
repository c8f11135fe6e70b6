//! Supervised execution of the provisioning shell scripts.
//!
//! The scripts are interactive (`read` prompts); answers are fed as newline
//! separated stdin lines in the order the script asks for them, with stdin
//! closed afterwards so the final `read` sees EOF. stdout and stderr are
//! collected in full and returned to the caller; nothing is streamed.
//!
//! Initial setup may build container images, so its limit is generous; adding
//! a mailbox touches far less and gets a shorter one. A script that outlives
//! its limit is killed and reported as timed out.

use anyhow::{Context, Result};
use std::{path::PathBuf, process::Stdio, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::Command,
    time::timeout,
};
use tracing::{debug, warn};

pub const SETUP_SCRIPT: &str = "init.sh";
pub const ADD_USER_SCRIPT: &str = "add_user.sh";

const SETUP_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const ADD_USER_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Result of a finished (non-timed-out) script run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    Completed(ScriptOutput),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct Provisioner {
    scripts_dir: PathBuf,
    setup_timeout: Duration,
    add_user_timeout: Duration,
}

impl Provisioner {
    #[must_use]
    pub fn new(scripts_dir: PathBuf) -> Self {
        Self {
            scripts_dir,
            setup_timeout: SETUP_TIMEOUT,
            add_user_timeout: ADD_USER_TIMEOUT,
        }
    }

    /// Override both limits; tests use sub-second values.
    #[must_use]
    pub fn with_timeouts(mut self, setup: Duration, add_user: Duration) -> Self {
        self.setup_timeout = setup;
        self.add_user_timeout = add_user;
        self
    }

    /// Run the initial provisioning script.
    ///
    /// # Errors
    /// Returns an error if the script cannot be spawned or supervised.
    pub async fn run_setup(&self, answers: &[String]) -> Result<ScriptOutcome> {
        self.run(SETUP_SCRIPT, answers, self.setup_timeout).await
    }

    /// Run the add-user script.
    ///
    /// # Errors
    /// Returns an error if the script cannot be spawned or supervised.
    pub async fn run_add_user(&self, answers: &[String]) -> Result<ScriptOutcome> {
        self.run(ADD_USER_SCRIPT, answers, self.add_user_timeout)
            .await
    }

    async fn run(&self, script: &str, answers: &[String], limit: Duration) -> Result<ScriptOutcome> {
        let script_path = self.scripts_dir.join(script);

        debug!("Running {} with a {:?} limit", script_path.display(), limit);

        let mut child = Command::new("bash")
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", script_path.display()))?;

        // Drain the pipes from the start so a chatty script never blocks on a
        // full pipe buffer while we are still waiting on it.
        let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        let mut input = answers.join("\n");
        input.push('\n');
        if let Some(mut stdin) = child.stdin.take() {
            // A script may exit before reading any input; a broken pipe here
            // is not a failure of the run itself.
            if let Err(err) = stdin.write_all(input.as_bytes()).await {
                debug!("script stdin closed early: {err}");
            }
            // Dropping stdin closes the pipe; the script's reads see EOF.
        }

        match timeout(limit, child.wait()).await {
            Ok(status) => {
                let status = status.context("Failed to wait for script")?;
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();

                if !status.success() {
                    warn!("{script} exited with {status}");
                }

                Ok(ScriptOutcome::Completed(ScriptOutput {
                    code: status.code(),
                    stdout,
                    stderr,
                }))
            }
            Err(_) => {
                warn!("{script} exceeded its {limit:?} limit, killing it");
                let _ = child.kill().await;
                let _ = child.wait().await;
                Ok(ScriptOutcome::TimedOut)
            }
        }
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let Some(mut stream) = stream else {
        return String::new();
    };

    let mut buffer = Vec::new();
    let _ = stream.read_to_end(&mut buffer).await;
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn provisioner_with_script(body: &str) -> (tempfile::TempDir, Provisioner) {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join(SETUP_SCRIPT), body).expect("write script");
        fs::write(dir.path().join(ADD_USER_SCRIPT), body).expect("write script");
        let provisioner = Provisioner::new(dir.path().to_path_buf());
        (dir, provisioner)
    }

    #[tokio::test]
    async fn answers_arrive_in_order_on_stdin() {
        let (_dir, provisioner) = provisioner_with_script(
            "read domain\nread user\necho \"domain=$domain user=$user\"\n",
        );

        let outcome = provisioner
            .run_setup(&["example.com".to_string(), "alice".to_string()])
            .await
            .expect("run");

        let ScriptOutcome::Completed(output) = outcome else {
            panic!("expected completion");
        };
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "domain=example.com user=alice");
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_with_streams() {
        let (_dir, provisioner) =
            provisioner_with_script("echo partial progress\necho broken >&2\nexit 3\n");

        let outcome = provisioner.run_add_user(&[]).await.expect("run");

        let ScriptOutcome::Completed(output) = outcome else {
            panic!("expected completion");
        };
        assert!(!output.success());
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout.trim(), "partial progress");
        assert_eq!(output.stderr.trim(), "broken");
    }

    #[tokio::test]
    async fn overlong_script_times_out() {
        let (_dir, provisioner) = provisioner_with_script("sleep 30\n");
        let provisioner = provisioner
            .with_timeouts(Duration::from_millis(200), Duration::from_millis(200));

        let outcome = provisioner.run_setup(&[]).await.expect("run");

        assert_eq!(outcome, ScriptOutcome::TimedOut);
    }

    #[tokio::test]
    async fn missing_script_is_a_script_failure() {
        // bash itself starts fine and exits 127 when the file is absent.
        let dir = tempfile::tempdir().expect("temp dir");
        let provisioner = Provisioner::new(dir.path().to_path_buf());

        let outcome = provisioner.run_setup(&[]).await.expect("run");

        let ScriptOutcome::Completed(output) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(output.code, Some(127));
    }
}
