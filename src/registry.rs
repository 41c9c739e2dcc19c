//! Registered projects, persisted as `projects.json`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use beads_view::BeadsPaths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AbacusError, Result};

/// A project the dashboard knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default = "first_id")]
    next_id: u64,
}

const fn first_id() -> u64 {
    1
}

impl Default for RegistryFile {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            next_id: first_id(),
        }
    }
}

#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    data: RegistryFile,
}

impl Registry {
    /// Load the registry at `path`.
    ///
    /// A missing or unreadable file yields an empty registry; it is
    /// replaced on the next successful `add` or `remove`.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let data = match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<RegistryFile>(&content) {
                Ok(mut data) => {
                    let max_id = data.projects.iter().map(|p| p.id).max().unwrap_or(0);
                    data.next_id = data.next_id.max(max_id + 1);
                    debug!(path = %path.display(), projects = data.projects.len(), "Loaded registry");
                    data
                }
                Err(e) => {
                    warn!(path = %path.display(), "Ignoring unparseable registry: {e}");
                    RegistryFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RegistryFile::default(),
            Err(e) => {
                warn!(path = %path.display(), "Failed to read registry: {e}");
                RegistryFile::default()
            }
        };
        Self {
            path: path.to_path_buf(),
            data,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All projects, sorted by name.
    #[must_use]
    pub fn all(&self) -> Vec<&Project> {
        let mut projects: Vec<&Project> = self.data.projects.iter().collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        projects
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Project> {
        self.data.projects.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn get_by_path(&self, path: &Path) -> Option<&Project> {
        self.data.projects.iter().find(|p| p.path == path)
    }

    /// Register the project at `path`.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if `path` does not exist, `NotBeadsProject`
    /// if it has no beads store, `AlreadyRegistered` if it is already
    /// present, or `Io`/`Json` if the registry cannot be saved.
    pub fn add(&mut self, path: &Path) -> Result<Project> {
        let canonical = dunce::canonicalize(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AbacusError::PathNotFound(path.to_path_buf())
            } else {
                AbacusError::Io(e)
            }
        })?;
        if !BeadsPaths::new(&canonical).is_beads_project() {
            return Err(AbacusError::NotBeadsProject(canonical));
        }
        if self.get_by_path(&canonical).is_some() {
            return Err(AbacusError::AlreadyRegistered(canonical));
        }

        let name = canonical.file_name().map_or_else(
            || canonical.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        );
        let project = Project {
            id: self.data.next_id,
            name,
            path: canonical,
            created_at: Utc::now(),
        };
        self.data.next_id += 1;
        self.data.projects.push(project.clone());
        self.save()?;

        info!(id = project.id, path = %project.path.display(), "Registered project");
        Ok(project)
    }

    /// Remove a project. Returns `false` if `id` was not registered.
    ///
    /// # Errors
    ///
    /// Returns `Io`/`Json` if the registry cannot be saved.
    pub fn remove(&mut self, id: u64) -> Result<bool> {
        let before = self.data.projects.len();
        self.data.projects.retain(|p| p.id != id);
        if self.data.projects.len() == before {
            return Ok(false);
        }
        self.save()?;
        info!(id, "Removed project");
        Ok(true)
    }

    /// Write to a temp file, then rename over the registry.
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        serde_json::to_writer_pretty(&mut file, &self.data)?;
        writeln!(file)?;
        file.flush()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
