// src/exec/backend.rs

//! Pluggable PCH builder abstraction.
//!
//! Workers talk to a `PchBuilder` instead of spawning the compiler
//! themselves. Production uses [`ProcessPchBuilder`]; tests provide a
//! builder that records jobs and writes nothing.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{PchError, Result};
use crate::fs::FileSystem;
use crate::model::TaskKey;
use crate::types::Scope;

/// Everything needed to produce one PCH file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PchJob {
    pub key: TaskKey,
    pub scope: Scope,
    /// Generated header that `#include`s every entry of `includes`.
    pub header_path: PathBuf,
    pub output_path: PathBuf,
    pub includes: Vec<PathBuf>,
    /// Compiler arguments for the header, without input or output.
    pub arguments: Vec<String>,
    /// System PCH the project PCH is layered on.
    pub system_pch: Option<PathBuf>,
}

impl PchJob {
    /// Contents of the generated header.
    pub fn header_contents(&self) -> String {
        self.includes
            .iter()
            .map(|include| format!("#include \"{}\"\n", include.display()))
            .collect()
    }

    /// Full compiler argument list: settings, the optional base PCH, then
    /// the PCH output and the generated header.
    pub fn command_line(&self) -> Vec<String> {
        let mut args = self.arguments.clone();
        if let Some(system_pch) = &self.system_pch {
            args.extend([
                "-Xclang".to_string(),
                "-include-pch".to_string(),
                "-Xclang".to_string(),
                system_pch.display().to_string(),
            ]);
        }
        args.extend([
            "-Xclang".to_string(),
            "-emit-pch".to_string(),
            "-o".to_string(),
            self.output_path.display().to_string(),
            self.header_path.display().to_string(),
        ]);
        args
    }
}

/// A successfully built PCH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PchArtifact {
    pub path: PathBuf,
}

/// Trait abstracting how PCH files are produced.
pub trait PchBuilder: Send + Sync {
    fn build(&self, job: PchJob) -> Pin<Box<dyn Future<Output = Result<PchArtifact>> + Send + '_>>;
}

/// Builder that runs the configured compiler once per job.
#[derive(Debug, Clone)]
pub struct ProcessPchBuilder {
    compiler: String,
    fs: Arc<dyn FileSystem>,
}

impl ProcessPchBuilder {
    pub fn new(compiler: impl Into<String>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            compiler: compiler.into(),
            fs,
        }
    }
}

impl PchBuilder for ProcessPchBuilder {
    fn build(&self, job: PchJob) -> Pin<Box<dyn Future<Output = Result<PchArtifact>> + Send + '_>> {
        Box::pin(async move {
            self.fs
                .write(&job.header_path, job.header_contents().as_bytes())?;

            let args = job.command_line();
            info!(
                key = %job.key,
                scope = %job.scope,
                compiler = %self.compiler,
                includes = job.includes.len(),
                "starting pch build"
            );
            debug!(key = %job.key, ?args, "pch compiler arguments");

            let mut child = Command::new(&self.compiler)
                .args(&args)
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .with_context(|| format!("spawning pch compiler '{}'", self.compiler))?;

            // Always consume stderr so the pipe cannot fill; keep it for the
            // failure report.
            let stderr_task = child.stderr.take().map(|stderr| {
                let key = job.key.clone();
                tokio::spawn(async move {
                    let mut collected = String::new();
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        debug!(key = %key, "compiler stderr: {}", line);
                        collected.push_str(&line);
                        collected.push('\n');
                    }
                    collected
                })
            });

            let status = child
                .wait()
                .await
                .with_context(|| format!("waiting for pch compiler of task {}", job.key))?;

            let stderr = match stderr_task {
                Some(handle) => handle.await.unwrap_or_default(),
                None => String::new(),
            };

            let code = status.code().unwrap_or(-1);
            info!(
                key = %job.key,
                exit_code = code,
                success = status.success(),
                "pch compiler exited"
            );

            if !status.success() {
                return Err(PchError::BuildFailed {
                    key: job.key.to_string(),
                    code,
                    stderr,
                });
            }

            Ok(PchArtifact {
                path: job.output_path,
            })
        })
    }
}
