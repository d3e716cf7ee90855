// src/deps/scanner.rs

//! Pluggable front-end that reports what compiling a translation unit touches.
//!
//! The collector talks to a `DependencyScanner` instead of spawning a
//! process itself, so tests can substitute canned reports.
//!
//! `ProcessScanner` speaks a small JSON protocol with an external tool: the
//! request is written to the tool's stdin, the report is read from its
//! stdout.
//!
//! Request:
//!
//! ```json
//! { "project_part": "app",
//!   "arguments": ["-x", "c++", "-std=c++17", "-DNDEBUG=1"],
//!   "sources": ["/src/main.cpp"],
//!   "unsaved_files": [{ "path": "/src/config.h", "content": "..." }] }
//! ```
//!
//! Report:
//!
//! ```json
//! { "includes": [{ "path": "/usr/include/vector",
//!                  "source_type": "top_system_include",
//!                  "usage_order": 4 }],
//!   "used_macros": [{ "name": "NDEBUG", "usage_order": 4 }] }
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{PchError, Result};
use crate::model::{SourceType, UsedMacro};

/// In-memory contents of a file being edited, used in place of the disk
/// contents while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsavedFile {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanRequest {
    pub project_part: String,
    pub arguments: Vec<String>,
    pub sources: Vec<PathBuf>,
    pub unsaved_files: Vec<UnsavedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedInclude {
    pub path: PathBuf,
    pub source_type: SourceType,
    pub usage_order: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    #[serde(default)]
    pub includes: Vec<ScannedInclude>,
    #[serde(default)]
    pub used_macros: Vec<UsedMacro>,
}

/// Trait abstracting how dependency data is obtained.
pub trait DependencyScanner: Send + Sync {
    fn scan(
        &self,
        request: ScanRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ScanReport>> + Send + '_>>;
}

/// Scanner that runs an external tool once per request.
#[derive(Debug, Clone)]
pub struct ProcessScanner {
    command: String,
    args: Vec<String>,
}

impl ProcessScanner {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl DependencyScanner for ProcessScanner {
    fn scan(
        &self,
        request: ScanRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ScanReport>> + Send + '_>> {
        Box::pin(async move {
            let project_part = request.project_part.clone();
            run_scanner(&self.command, &self.args, request)
                .await
                .map_err(|err| PchError::Collection {
                    project_part,
                    reason: format!("{err:#}"),
                })
        })
    }
}

async fn run_scanner(command: &str, args: &[String], request: ScanRequest) -> anyhow::Result<ScanReport> {
    info!(
        project_part = %request.project_part,
        tool = %command,
        sources = request.sources.len(),
        "starting dependency scanner"
    );

    let payload = serde_json::to_vec(&request).context("encoding scan request")?;

    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning dependency scanner '{command}'"))?;

    // Feed stdin from its own task so a tool that writes a lot before it
    // finishes reading cannot block on a full stdout/stderr pipe.
    let writer = child.stdin.take().map(|mut stdin| {
        tokio::spawn(async move {
            let written = stdin.write_all(&payload).await;
            // Dropping stdin closes the pipe so the tool sees EOF.
            drop(stdin);
            written
        })
    });

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for dependency scanner '{command}'"))?;

    if let Some(writer) = writer {
        match writer.await.context("joining scanner stdin writer")? {
            Ok(()) => {}
            // The tool may exit without reading everything; its status decides.
            Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!(project_part = %request.project_part, "scanner closed stdin early");
            }
            Err(err) => {
                return Err(err).context("writing scan request to scanner stdin");
            }
        }
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!(project_part = %request.project_part, "scanner stderr: {}", line);
    }

    if !output.status.success() {
        anyhow::bail!(
            "scanner exited with code {}",
            output.status.code().unwrap_or(-1)
        );
    }

    let report: ScanReport =
        serde_json::from_slice(&output.stdout).context("decoding scanner report")?;

    debug!(
        project_part = %request.project_part,
        includes = report.includes.len(),
        used_macros = report.used_macros.len(),
        "scanner finished"
    );

    Ok(report)
}
