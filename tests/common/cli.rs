//! Harness for running the `abacus` binary against throwaway projects.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use assert_cmd::Command;
use tempfile::TempDir;

/// A temp root holding beads projects plus an isolated config directory.
pub struct AbacusWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub config_dir: PathBuf,
}

impl AbacusWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let root = temp_dir.path().to_path_buf();
        let config_dir = root.join("config");
        Self {
            temp_dir,
            root,
            config_dir,
        }
    }

    /// Project whose `.beads/issues.jsonl` holds `lines`.
    pub fn jsonl_project(&self, name: &str, lines: &[&str]) -> PathBuf {
        let dir = self.root.join(name);
        fs::create_dir_all(dir.join(".beads")).expect("create .beads");
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(dir.join(".beads/issues.jsonl"), content).expect("write jsonl");
        dir
    }

    /// Plain directory without a beads store.
    pub fn plain_dir(&self, name: &str) -> PathBuf {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir).expect("create dir");
        dir
    }
}

pub struct RunOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

pub fn run_abacus<I, S>(workspace: &AbacusWorkspace, args: I) -> RunOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::cargo_bin("abacus").expect("abacus binary");
    cmd.current_dir(&workspace.root)
        .env("ABACUS_CONFIG_DIR", &workspace.config_dir)
        .env_remove("PORT")
        .env_remove("ABACUS_HOST")
        .env("RUST_LOG", "warn")
        .args(args);
    let output = cmd.output().expect("run abacus");
    RunOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
