use crate::domain::{AzrError, AzrResult};
use crate::modules::levels::{Level, write_levels};
use crate::parser::ConfigDocument;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const MAX_ALLOCATION_ATTEMPTS: usize = 16;

static NEXT_WORKSPACE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceOptions {
    /// Directory under which workspaces are created; the system temp
    /// directory when unset.
    pub root_directory: Option<PathBuf>,
}

/// Hands out isolated workspaces under one root directory.
///
/// Names combine the process id, a process-wide counter and the clock, and
/// are claimed with exclusive creation, so two allocations never share a
/// path even across processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceAllocator {
    root: PathBuf,
}

impl WorkspaceAllocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_options(options: &WorkspaceOptions) -> Self {
        Self::new(
            options
                .root_directory
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn allocate(&self) -> AzrResult<Workspace> {
        fs::create_dir_all(&self.root).map_err(|source| {
            AzrError::io_path(
                "IO.WORKSPACE_ROOT",
                "create workspace root",
                &self.root,
                source,
            )
        })?;

        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let token = next_token()?;
            let workspace = Workspace::at(&self.root, token);

            match fs::create_dir(&workspace.output_dir) {
                Ok(()) => {}
                Err(source) if source.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => {
                    return Err(AzrError::io_path(
                        "IO.WORKSPACE_CREATE",
                        "create output directory",
                        &workspace.output_dir,
                        source,
                    ));
                }
            }

            // From here on Drop cleans up whatever was claimed.
            let mut workspace = workspace;
            workspace.live = true;
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&workspace.config_file)
            {
                Ok(_) => {
                    debug!(
                        token = %workspace.token,
                        config_file = %workspace.config_file.display(),
                        "allocated workspace"
                    );
                    return Ok(workspace);
                }
                Err(source) if source.kind() == ErrorKind::AlreadyExists => {
                    // Only the output directory is ours; the file belongs to someone else.
                    workspace.live = false;
                    let _ = fs::remove_dir_all(&workspace.output_dir);
                    continue;
                }
                Err(source) => {
                    return Err(AzrError::io_path(
                        "IO.WORKSPACE_CREATE",
                        "create config file",
                        &workspace.config_file,
                        source,
                    ));
                }
            }
        }

        Err(AzrError::io_system(
            "IO.WORKSPACE_EXHAUSTED",
            format!(
                "could not claim a unique workspace under '{}' after {} attempts",
                self.root.display(),
                MAX_ALLOCATION_ATTEMPTS
            ),
        ))
    }
}

impl Default for WorkspaceAllocator {
    fn default() -> Self {
        Self::from_options(&WorkspaceOptions::default())
    }
}

fn next_token() -> AzrResult<String> {
    let unix_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|source| {
            AzrError::internal(
                "SYS.WORKSPACE_TIME",
                format!("failed to read system time for workspace naming: {}", source),
            )
        })?
        .as_nanos();
    Ok(format!(
        "{}-{}-{:x}",
        std::process::id(),
        NEXT_WORKSPACE.fetch_add(1, Ordering::Relaxed),
        unix_nanos
    ))
}

/// The config file, output directory and optional data directory of one
/// evaluation. Dropping a workspace that was not released removes it.
#[derive(Debug)]
pub struct Workspace {
    token: String,
    config_file: PathBuf,
    output_dir: PathBuf,
    data_dir: PathBuf,
    live: bool,
}

impl Workspace {
    fn at(root: &Path, token: String) -> Self {
        Self {
            config_file: root.join(format!("azr-{}.azr", token)),
            output_dir: root.join(format!("output_azr-{}", token)),
            data_dir: root.join(format!("data_azr-{}", token)),
            token,
            live: false,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn create_data_dir(&self) -> AzrResult<&Path> {
        fs::create_dir(&self.data_dir).map_err(|source| {
            AzrError::io_path(
                "IO.WORKSPACE_CREATE",
                "create data directory",
                &self.data_dir,
                source,
            )
        })?;
        Ok(&self.data_dir)
    }

    pub fn output_path(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }

    /// Writes `document` with `levels` in its level rows and its output
    /// directory pointed at this workspace.
    pub fn materialize(&self, document: &ConfigDocument, levels: &[Level]) -> AzrResult<()> {
        let mut document = document.clone();
        document.set_output_directory(&self.output_dir)?;
        write_levels(&mut document, levels)?;
        document.write(&self.config_file)?;
        debug!(
            config_file = %self.config_file.display(),
            levels = levels.len(),
            "materialized workspace document"
        );
        Ok(())
    }

    /// Context line naming every path, for errors raised inside an evaluation.
    pub fn describe(&self) -> String {
        format!(
            "workspace config '{}', output '{}', data '{}'",
            self.config_file.display(),
            self.output_dir.display(),
            self.data_dir.display()
        )
    }

    /// Removes the config file and both directories. Paths that are already
    /// gone are not errors.
    pub fn release(mut self) -> AzrResult<()> {
        self.live = false;
        self.remove_all()
    }

    fn remove_all(&self) -> AzrResult<()> {
        let results = [
            remove_path(&self.config_file, |path| fs::remove_file(path), "remove config file"),
            remove_path(&self.output_dir, |path| fs::remove_dir_all(path), "remove output directory"),
            remove_path(&self.data_dir, |path| fs::remove_dir_all(path), "remove data directory"),
        ];
        debug!(token = %self.token, "released workspace");
        results.into_iter().collect()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.live {
            return;
        }
        if let Err(error) = self.remove_all() {
            warn!(token = %self.token, error = %error, "workspace cleanup failed");
        }
    }
}

fn remove_path(
    path: &Path,
    remove: fn(&Path) -> std::io::Result<()>,
    action: &str,
) -> AzrResult<()> {
    match remove(path) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(AzrError::io_path("IO.WORKSPACE_RELEASE", action, path, source)),
    }
}
