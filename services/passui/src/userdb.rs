//! Shell-invoked access to the mail server's user store.
//!
//! The SQLite database lives inside the SMTP server container and is reached
//! only with `docker exec <container> sqlite3 <db> "<SQL>"`. This module owns
//! the two statements the password workflow needs: reading a mailbox's
//! `password_initialized` flag and setting it after a successful credential
//! update.

use anyhow::{Result, anyhow, bail};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

const DEFAULT_CONTAINER: &str = "smtp-server-container";
const DEFAULT_DATABASE: &str = "/app/data/databases/shared.db";

/// A mailbox address split into its local part and domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxAddress {
    username: String,
    domain: String,
}

impl MailboxAddress {
    /// Parse `user@domain`, rejecting empty parts and control characters.
    #[must_use]
    pub fn parse(email: &str) -> Option<Self> {
        let (username, domain) = email.split_once('@')?;
        if username.is_empty() || domain.is_empty() {
            return None;
        }
        if email.chars().any(|c| c.is_control()) || domain.contains('@') {
            return None;
        }

        Some(Self {
            username: username.to_string(),
            domain: domain.to_string(),
        })
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

#[derive(Debug, Clone)]
pub struct UserStore {
    container: String,
    database: String,
}

impl Default for UserStore {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl UserStore {
    #[must_use]
    pub fn new(container: String, database: String) -> Self {
        Self {
            container,
            database,
        }
    }

    /// Whether the mailbox has completed its first password change.
    ///
    /// # Errors
    /// Returns an error if the query cannot be executed.
    pub async fn password_initialized(&self, mailbox: &MailboxAddress) -> Result<bool> {
        let sql = status_sql(mailbox);
        let stdout = self.run_sqlite(&sql).await?;

        Ok(stdout.trim() == "1")
    }

    /// Record that the mailbox has rotated its admin-assigned password.
    ///
    /// # Errors
    /// Returns an error if the update cannot be executed.
    pub async fn mark_password_initialized(&self, mailbox: &MailboxAddress) -> Result<()> {
        let sql = mark_sql(mailbox);
        self.run_sqlite(&sql).await?;

        Ok(())
    }

    async fn run_sqlite(&self, sql: &str) -> Result<String> {
        debug!("user store query: {sql}");

        let output = Command::new("docker")
            .args(["exec", &self.container, "sqlite3", &self.database, sql])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|err| anyhow!("Failed to run sqlite3 in {}: {err}", self.container))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            bail!(
                "sqlite3 in {} exited with {}: {stderr}",
                self.container,
                output.status
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn status_sql(mailbox: &MailboxAddress) -> String {
    format!(
        "SELECT password_initialized FROM users u \
         INNER JOIN domains d ON u.domain_id = d.id \
         WHERE u.username='{}' AND d.domain='{}' AND u.enabled=1;",
        escape_sql(mailbox.username()),
        escape_sql(mailbox.domain())
    )
}

fn mark_sql(mailbox: &MailboxAddress) -> String {
    format!(
        "UPDATE users SET password_initialized = 1 WHERE id IN \
         (SELECT u.id FROM users u \
          INNER JOIN domains d ON u.domain_id = d.id \
          WHERE u.username='{}' AND d.domain='{}');",
        escape_sql(mailbox.username()),
        escape_sql(mailbox.domain())
    )
}

// SQL string literals escape a single quote by doubling it.
fn escape_sql(value: &str) -> String {
    value.replace('\'', "''")
}
