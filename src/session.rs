//! Per-batch session context.
//!
//! A [`Session`] owns the directory results are written to and the
//! [`CancelToken`] the orchestrator polls between images. Callers create one
//! per submission and pass it explicitly; nothing here is global.
//!
//! ```text
//! Session::temporary()      → /tmp/pixbatch-XXXXXX/   (removed on drop)
//! Session::in_dir("out")    → out/                    (kept)
//! ```
//!
//! [`Session::write_results`] writes the images plus a `report.json` naming
//! every file it wrote. Creating a session over a directory deletes exactly
//! the files such a report lists, then the report itself. A directory with no
//! report is taken as-is, so pointing the output at a folder of originals
//! never deletes them.

use crate::process::{BatchResult, ProcessError};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

pub const REPORT_FILE: &str = "report.json";

/// Best-effort cancellation flag, shared by clones.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
enum Workspace {
    Temporary(TempDir),
    Fixed(PathBuf),
}

#[derive(Debug)]
pub struct Session {
    workspace: Workspace,
    cancel: CancelToken,
}

fn unavailable(path: &Path) -> impl FnOnce(std::io::Error) -> ProcessError + '_ {
    move |source| ProcessError::OutputUnavailable {
        path: path.to_path_buf(),
        source,
    }
}

/// The part of a previous report row needed to find what it wrote.
#[derive(Deserialize)]
struct PreviousEntry {
    #[serde(default)]
    entry_name: Option<String>,
}

/// A bare file name, so a report can never point outside its directory.
fn is_plain_file_name(name: &str) -> bool {
    let path = Path::new(name);
    path.file_name().is_some_and(|n| n == path.as_os_str())
}

/// File names listed in `dir/report.json`, or `None` without a readable report.
fn previous_outputs(dir: &Path) -> Result<Option<Vec<String>>, ProcessError> {
    let report = dir.join(REPORT_FILE);
    let text = match fs::read_to_string(&report) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(unavailable(&report)(e)),
    };
    match serde_json::from_str::<Vec<PreviousEntry>>(&text) {
        Ok(entries) => Ok(Some(
            entries
                .into_iter()
                .filter_map(|e| e.entry_name)
                .filter(|name| is_plain_file_name(name))
                .collect(),
        )),
        Err(e) => {
            log::warn!("Not a pixbatch report, leaving {} alone: {e}", report.display());
            Ok(None)
        }
    }
}

/// Remove the files an earlier run recorded in its report, then the report.
fn clear_previous_results(dir: &Path) -> Result<usize, ProcessError> {
    let Some(names) = previous_outputs(dir)? else {
        return Ok(0);
    };
    let mut removed = 0;
    for name in &names {
        let path = dir.join(name);
        if path.is_file() {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    fs::remove_file(dir.join(REPORT_FILE))?;
    Ok(removed)
}

impl Session {
    /// Session backed by a fresh temporary directory, deleted on drop.
    pub fn temporary() -> Result<Self, ProcessError> {
        let dir = tempfile::Builder::new()
            .prefix("pixbatch-")
            .tempdir()
            .map_err(unavailable(&std::env::temp_dir()))?;
        log::debug!("Session directory {}", dir.path().display());
        Ok(Self {
            workspace: Workspace::Temporary(dir),
            cancel: CancelToken::new(),
        })
    }

    /// Session writing into `dir`, created if missing.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self, ProcessError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(unavailable(&dir))?;
        let removed = clear_previous_results(&dir)?;
        if removed > 0 {
            log::info!("Cleared {removed} previous results from {}", dir.display());
        }
        Ok(Self {
            workspace: Workspace::Fixed(dir),
            cancel: CancelToken::new(),
        })
    }

    pub fn path(&self) -> &Path {
        match &self.workspace {
            Workspace::Temporary(dir) => dir.path(),
            Workspace::Fixed(dir) => dir,
        }
    }

    /// A handle to this session's cancellation flag.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Fail with [`ProcessError::OutputUnavailable`] unless the directory is usable.
    pub fn ensure_writable(&self) -> Result<(), ProcessError> {
        let path = self.path();
        let meta = fs::metadata(path).map_err(unavailable(path))?;
        if !meta.is_dir() {
            return Err(ProcessError::OutputUnavailable {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
            });
        }
        if meta.permissions().readonly() {
            return Err(ProcessError::OutputUnavailable {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "directory is read-only",
                ),
            });
        }
        Ok(())
    }

    /// Write every successful image as `<stem>.<ext>`, then `report.json`.
    ///
    /// Two inputs that map to the same entry name (`a.png`, `a.tiff` → `a.jpg`)
    /// get `a.jpg` and `a-2.jpg`, so neither result is lost. The report
    /// records the name each image was actually written under. Returns the
    /// image paths.
    pub fn write_results(&self, result: &BatchResult) -> Result<Vec<PathBuf>, ProcessError> {
        self.ensure_writable()?;
        let mut report = result.report();
        let mut used = HashSet::new();
        let mut written = Vec::new();
        for (row, entry) in report.iter_mut().zip(result.entries()) {
            let Ok(image) = &entry.outcome else {
                continue;
            };
            let name = unique_name(&image.entry_name, &mut used);
            let path = self.path().join(&name);
            fs::write(&path, &image.encoded.bytes)?;
            log::debug!("Wrote {}", path.display());
            row.entry_name = Some(name);
            written.push(path);
        }
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(self.path().join(REPORT_FILE), json)?;
        Ok(written)
    }
}

fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }
    let (stem, ext) = name.rsplit_once('.').unwrap_or((name, ""));
    let mut n = 2;
    loop {
        let candidate = if ext.is_empty() {
            format!("{stem}-{n}")
        } else {
            format!("{stem}-{n}.{ext}")
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Archive entry name for an input: the text before the first `.` of the
/// file name, plus `extension`.
///
/// `"summer.beach.png"` becomes `"summer.jpg"`. Directory components are
/// dropped; a name with no stem falls back to `"image"`.
pub fn entry_name(filename: &str, extension: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    let stem = base.split('.').next().unwrap_or_default();
    let stem = if stem.is_empty() { "image" } else { stem };
    format!("{stem}.{extension}")
}
