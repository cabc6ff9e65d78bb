//! Template resolution and the compiled-artifact cache.
//!
//! Artifacts are keyed by template name plus a digest of the template's
//! directory and the settings checksum, so changing any setting that affects
//! compilation sends lookups to a fresh file.

use std::fs;
use std::io::Write as _;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use mythtpl_conf::ConfigError;
use mythtpl_conf::Settings;
use mythtpl_templates::Artifact;
use mythtpl_templates::CompileOptions;
use mythtpl_templates::Compiler;
use mythtpl_templates::Emitter;
use mythtpl_templates::Origin;
use mythtpl_templates::TagRegistry;
use mythtpl_templates::TemplateError;
use sha2::Digest;
use sha2::Sha256;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Artifacts untouched for this long are removed by [`Host::clean`].
pub const DEFAULT_EXPIRE: Duration = Duration::from_secs(2_592_000);

const ARTIFACT_MARKER: &str = ".mtpl.";

#[derive(Debug, Error)]
pub enum HostError {
    #[error("template not found: {path}")]
    NotFound { path: Utf8PathBuf },
    #[error("failed to write artifact {path}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A template name resolved against the configured template directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLocation {
    /// Directory of the template as written in settings, with a trailing
    /// slash (e.g. `templates/blog/`).
    pub directory: String,
    /// Template path relative to the project root, or absolute.
    pub path: String,
}

#[derive(Debug)]
pub struct Host {
    root: Utf8PathBuf,
    settings: Settings,
    checksum: String,
    compiler: Compiler,
}

impl Host {
    pub fn new(
        root: Utf8PathBuf,
        settings: Settings,
        registry: Arc<TagRegistry>,
    ) -> Result<Self, HostError> {
        let checksum = settings.checksum()?;
        let compiler = Compiler::new(CompileOptions::from(&settings), registry);
        Ok(Self {
            root,
            settings,
            checksum,
            compiler,
        })
    }

    #[must_use]
    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    #[must_use]
    pub fn cache_dir(&self) -> Utf8PathBuf {
        self.root.join(&self.settings.cache_dir)
    }

    /// Resolve `name` to `<template_dir><name>.<extension>`. Names starting
    /// with `/` are absolute and skip the template directory.
    #[must_use]
    pub fn locate(&self, name: &str) -> TemplateLocation {
        let (dirname, basename) = match name.rfind('/') {
            Some(idx) => (&name[..=idx], &name[idx + 1..]),
            None => ("", name),
        };
        let directory = if name.starts_with('/') {
            dirname.to_string()
        } else {
            format!("{}{dirname}", self.settings.template_dir)
        };
        let path = format!("{directory}{basename}.{}", self.settings.extension);
        TemplateLocation { directory, path }
    }

    /// Cache file for a named template.
    #[must_use]
    pub fn artifact_path(
        &self,
        name: &str,
        location: &TemplateLocation,
        emitter: &dyn Emitter,
    ) -> Utf8PathBuf {
        let digest = sha256_hex(&[location.directory.as_bytes(), self.checksum.as_bytes()]);
        let key = name.trim_start_matches('/').replace('/', ".");
        self.cache_dir()
            .join(format!("{key}.{}.{}", &digest[..8], emitter.extension()))
    }

    /// Cache file for an in-memory template.
    #[must_use]
    pub fn string_artifact_path(&self, source: &str, emitter: &dyn Emitter) -> Utf8PathBuf {
        let digest = sha256_hex(&[source.as_bytes(), self.checksum.as_bytes()]);
        self.cache_dir()
            .join(format!("{digest}.s.{}", emitter.extension()))
    }

    /// Compile a named template unless a fresh artifact already exists.
    /// Returns the artifact path.
    pub fn compile_template(
        &self,
        name: &str,
        emitter: &dyn Emitter,
        force: bool,
    ) -> Result<Utf8PathBuf, HostError> {
        let location = self.locate(name);
        let template = self.root.join(&location.path);
        if !template.is_file() {
            return Err(HostError::NotFound { path: template });
        }

        let artifact_path = self.artifact_path(name, &location, emitter);
        if !force && !self.is_stale(&template, &artifact_path)? {
            tracing::debug!("artifact for {} is fresh: {}", name, artifact_path);
            return Ok(artifact_path);
        }

        let source = fs::read_to_string(&template)?;
        let origin = Origin::file(location.directory, location.path);
        let artifact = Artifact::build(&self.compiler, emitter, &source, &origin)?;
        self.persist(&artifact_path, artifact.contents())?;

        tracing::info!(
            "compiled {} ({} instructions) to {}",
            name,
            artifact.instruction_count(),
            artifact_path
        );
        Ok(artifact_path)
    }

    /// Compile an in-memory template. Syntax errors name the caller's file
    /// and line.
    #[track_caller]
    pub fn compile_string(
        &self,
        source: &str,
        emitter: &dyn Emitter,
    ) -> Result<Utf8PathBuf, HostError> {
        let origin = Origin::caller();
        let artifact_path = self.string_artifact_path(source, emitter);
        if !self.settings.debug && artifact_path.is_file() {
            return Ok(artifact_path);
        }

        let artifact = Artifact::build(&self.compiler, emitter, source, &origin)?;
        self.persist(&artifact_path, artifact.contents())?;
        tracing::info!("compiled string from {} to {}", Location::caller(), artifact_path);
        Ok(artifact_path)
    }

    fn is_stale(&self, template: &Utf8Path, artifact: &Utf8Path) -> Result<bool, HostError> {
        if self.settings.debug || !artifact.is_file() {
            return Ok(true);
        }
        let template_modified = fs::metadata(template)?.modified()?;
        let artifact_modified = fs::metadata(artifact)?.modified()?;
        Ok(artifact_modified < template_modified)
    }

    /// Write through a temp file in the cache directory and rename into
    /// place, so readers never observe a partial artifact.
    fn persist(&self, path: &Utf8Path, contents: &str) -> Result<(), HostError> {
        let write_error = |source| HostError::Write {
            path: path.to_path_buf(),
            source,
        };

        let cache_dir = self.cache_dir();
        fs::create_dir_all(&cache_dir).map_err(write_error)?;

        let mut file = NamedTempFile::new_in(&cache_dir).map_err(write_error)?;
        file.write_all(contents.as_bytes()).map_err(write_error)?;
        file.persist(path).map_err(|err| write_error(err.error))?;
        Ok(())
    }

    /// Delete artifacts older than `expire`. Returns how many were removed.
    pub fn clean(&self, expire: Duration) -> Result<usize, HostError> {
        let cache_dir = self.cache_dir();
        if !cache_dir.is_dir() {
            return Ok(0);
        }

        let cutoff = SystemTime::now()
            .checked_sub(expire)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut removed = 0;

        for entry in fs::read_dir(&cache_dir)? {
            let entry = entry?;
            let Ok(path) = Utf8PathBuf::try_from(entry.path()) else {
                continue;
            };
            let is_artifact = path
                .file_name()
                .is_some_and(|name| name.contains(ARTIFACT_MARKER));
            if !is_artifact || !path.is_file() {
                continue;
            }
            if entry.metadata()?.modified()? < cutoff {
                fs::remove_file(&path)?;
                tracing::debug!("removed {}", path);
                removed += 1;
            }
        }

        tracing::info!("cleaned {} artifacts from {}", removed, cache_dir);
        Ok(removed)
    }
}

fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    format!("{:x}", hasher.finalize())
}
