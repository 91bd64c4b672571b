//! Where askdb reads database files from and writes saved artifacts to.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Files `--save` writes under the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFile {
    Preview,
    Chart,
    Narrative,
}

impl ArtifactFile {
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Preview => "preview.json",
            Self::Chart => "chart.json",
            Self::Narrative => "narrative.txt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub home_dir: PathBuf,
    pub cwd: PathBuf,
    pub out_dir: PathBuf,
}

impl RuntimePaths {
    /// `home_dir` and `cwd` must be absolute. Without an override the output
    /// directory is `~/.askdb/output`.
    pub fn resolve(home_dir: &Path, cwd: &Path, out_dir: Option<&Path>) -> Result<Self> {
        let home_dir = absolute_base("home_dir", home_dir)?;
        let cwd = absolute_base("cwd", cwd)?;
        let mut paths = Self {
            out_dir: home_dir.join(".askdb").join("output"),
            home_dir,
            cwd,
        };
        if let Some(out_dir) = out_dir {
            paths.out_dir = paths.user_path(out_dir)?;
        }
        Ok(paths)
    }

    /// `~` and `~/...` start at the home dir, other relative paths at the
    /// cwd. `.` and `..` are folded without touching the filesystem.
    pub fn user_path(&self, path: &Path) -> Result<PathBuf> {
        let mut components = path.components().peekable();
        let base = match components.peek().copied() {
            Some(Component::Normal(first)) if first == "~" => {
                components.next();
                self.home_dir.clone()
            }
            Some(Component::Normal(first)) if first.to_string_lossy().starts_with('~') => bail!(
                "unsupported home expansion syntax (only `~` and `~/...` are supported): {}",
                path.display()
            ),
            Some(Component::RootDir | Component::Prefix(_)) => PathBuf::new(),
            _ => self.cwd.clone(),
        };
        Ok(components.fold(base, push_lexical))
    }

    /// SQLite file arguments resolve exactly like `--out-dir`.
    pub fn resolve_database_path(&self, database: &str) -> Result<PathBuf> {
        if database.trim().is_empty() {
            bail!("database path must not be empty");
        }
        self.user_path(Path::new(database))
    }

    #[must_use]
    pub fn artifact_path(&self, file: ArtifactFile) -> PathBuf {
        self.out_dir.join(file.file_name())
    }

    /// Creates the output directory when needed and replaces the file.
    pub fn write_artifact(&self, file: ArtifactFile, contents: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.out_dir).with_context(|| {
            format!("failed to create output directory: {}", self.out_dir.display())
        })?;
        let path = self.artifact_path(file);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write artifact: {}", path.display()))?;
        Ok(path)
    }
}

fn absolute_base(label: &str, path: &Path) -> Result<PathBuf> {
    if !path.is_absolute() {
        bail!("{label} must be absolute: {}", path.display());
    }
    Ok(path.components().fold(PathBuf::new(), push_lexical))
}

fn push_lexical(mut path: PathBuf, component: Component<'_>) -> PathBuf {
    match component {
        Component::CurDir => {}
        Component::ParentDir => {
            if !path.pop() {
                path.push("..");
            }
        }
        other => path.push(other.as_os_str()),
    }
    path
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{ArtifactFile, RuntimePaths};

    fn paths(out_dir: Option<&str>) -> anyhow::Result<RuntimePaths> {
        RuntimePaths::resolve(
            Path::new("/home/tester"),
            Path::new("/work/./repo"),
            out_dir.map(Path::new),
        )
    }

    #[test]
    fn output_defaults_under_the_home_dir() {
        let paths = paths(None).expect("paths should resolve");

        assert_eq!(paths.cwd, Path::new("/work/repo"));
        assert_eq!(paths.out_dir, Path::new("/home/tester/.askdb/output"));
        assert_eq!(
            paths.artifact_path(ArtifactFile::Narrative),
            Path::new("/home/tester/.askdb/output/narrative.txt")
        );
    }

    #[test]
    fn overrides_follow_tilde_and_cwd_rules() {
        let from_home = paths(Some("~/custom/output")).expect("tilde override should resolve");
        assert_eq!(from_home.out_dir, Path::new("/home/tester/custom/output"));

        let relative = paths(Some("./runs/../runs/latest")).expect("relative override resolves");
        assert_eq!(relative.out_dir, Path::new("/work/repo/runs/latest"));

        let absolute = paths(Some("/tmp/askdb/../out")).expect("absolute override resolves");
        assert_eq!(absolute.out_dir, Path::new("/tmp/out"));
    }

    #[test]
    fn database_files_resolve_like_the_output_dir() {
        let paths = paths(None).expect("paths should resolve");

        assert_eq!(
            paths
                .resolve_database_path("data/../shop.db")
                .expect("relative db should resolve"),
            Path::new("/work/repo/shop.db")
        );
        assert_eq!(
            paths
                .resolve_database_path("~/dbs/shop.db")
                .expect("tilde db should resolve"),
            Path::new("/home/tester/dbs/shop.db")
        );
        assert!(paths.resolve_database_path("  ").is_err());
    }

    #[test]
    fn bases_must_be_absolute() {
        let err = RuntimePaths::resolve(Path::new("home/tester"), Path::new("/work"), None)
            .expect_err("relative home dir must fail");
        assert!(err.to_string().contains("home_dir must be absolute"), "{err}");

        let err = RuntimePaths::resolve(Path::new("/home/tester"), Path::new("work"), None)
            .expect_err("relative cwd must fail");
        assert!(err.to_string().contains("cwd must be absolute"), "{err}");
    }

    #[test]
    fn other_users_homes_are_refused() {
        let err = paths(Some("~someone/out")).expect_err("~user syntax must fail");
        assert!(err.to_string().contains("unsupported home expansion syntax"), "{err}");
    }

    #[test]
    fn artifacts_are_written_under_a_fresh_output_dir() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time should be after unix epoch")
            .as_nanos();
        let temp = std::env::temp_dir().join(format!("askdb-config-write-{nanos}"));
        let paths = RuntimePaths::resolve(&temp, &temp, Some(Path::new("nested/out")))
            .expect("paths should resolve");

        let written = paths
            .write_artifact(ArtifactFile::Preview, "{}\n")
            .expect("artifact should be written");
        assert_eq!(written, temp.join("nested/out/preview.json"));
        assert_eq!(
            std::fs::read_to_string(&written).expect("artifact should be readable"),
            "{}\n"
        );
    }
}
