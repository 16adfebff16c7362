//! Database dumper collaborator.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use backuper_core::config::DatabaseConfig;

use crate::error::DumpError;

/// Writes a full dump of `database` into `out`.
pub trait Dumper {
    fn dump(&self, database: &str, out: File) -> Result<(), DumpError>;
}

/// `pg_dump` subprocess. The password travels in `PGPASSWORD`.
#[derive(Debug, Clone)]
pub struct PgDumper {
    program: PathBuf,
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
}

impl PgDumper {
    pub fn from_config(cfg: &DatabaseConfig) -> Self {
        Self {
            program: cfg.program.clone(),
            host: cfg.host.clone(),
            port: cfg.port,
            user: cfg.user.clone(),
            password: cfg.password.clone(),
        }
    }

    pub(crate) fn args(&self, database: &str) -> Vec<String> {
        let mut args = vec!["--no-password".to_string()];
        if let Some(host) = &self.host {
            args.push(format!("--host={host}"));
        }
        if let Some(port) = self.port {
            args.push(format!("--port={port}"));
        }
        if let Some(user) = &self.user {
            args.push(format!("--username={user}"));
        }
        args.push(format!("--dbname={database}"));
        args
    }
}

impl Dumper for PgDumper {
    fn dump(&self, database: &str, out: File) -> Result<(), DumpError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args(database))
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::piped());
        if let Some(password) = &self.password {
            cmd.env("PGPASSWORD", password);
        }

        tracing::debug!(program = %self.program.display(), database, "spawning dumper");
        let mut child = cmd.spawn().map_err(|e| DumpError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;

        // Diagnostics only: the exit status alone decides success.
        let mut stderr = Vec::new();
        let read = match child.stderr.take() {
            Some(mut pipe) => pipe.read_to_end(&mut stderr).map(|_| ()),
            None => Ok(()),
        };
        let status = child.wait().map_err(|e| DumpError::Io {
            path: self.program.clone(),
            source: e,
        })?;
        if let Err(err) = read {
            tracing::warn!(program = %self.program.display(), error = %err, "dumper stderr not captured");
        }

        let stderr = String::from_utf8_lossy(&stderr);
        if !status.success() {
            return Err(DumpError::Failed {
                database: database.to_string(),
                status,
                stderr: stderr.trim().to_string(),
            });
        }
        if !stderr.trim().is_empty() {
            tracing::warn!(database, stderr = %stderr.trim(), "dumper reported warnings");
        }
        Ok(())
    }
}
