//! Access to a dbt project's compiled artifacts

use crate::manifest::{Manifest, ManifestError, ManifestModel};
use std::path::{Path, PathBuf};

/// Anything that can list a project's models
pub trait ManifestSource {
    fn models(&self) -> Result<Vec<ManifestModel>, ManifestError>;
}

impl ManifestSource for Manifest {
    fn models(&self) -> Result<Vec<ManifestModel>, ManifestError> {
        Ok(Manifest::models(self))
    }
}

/// A dbt project on disk
#[derive(Debug, Clone)]
pub struct DbtProject {
    project_dir: PathBuf,
}

impl DbtProject {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// `<project>/target/manifest.json`
    pub fn manifest_path(&self) -> PathBuf {
        self.project_dir.join("target").join("manifest.json")
    }

    pub fn load_manifest(&self) -> Result<Manifest, ManifestError> {
        let path = self.manifest_path();
        tracing::info!(path = %path.display(), "loading dbt manifest");

        let manifest = Manifest::from_file(&path).map_err(|e| {
            tracing::error!(error = %e, "could not load dbt manifest");
            e
        })?;

        tracing::debug!(nodes = manifest.nodes.len(), "manifest loaded");
        Ok(manifest)
    }
}

impl ManifestSource for DbtProject {
    fn models(&self) -> Result<Vec<ManifestModel>, ManifestError> {
        let models = self.load_manifest()?.models();
        tracing::info!(count = models.len(), "parsed dbt models");
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_manifest_points_at_dbt_compile() {
        let dir = tempfile::tempdir().unwrap();
        let project = DbtProject::new(dir.path());

        let err = project.models().unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
        assert!(err.to_string().contains("dbt compile"));
    }

    #[test]
    fn loads_manifest_from_target_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("target")).unwrap();
        std::fs::write(
            dir.path().join("target/manifest.json"),
            r#"{"nodes": {"model.p.orders": {"name": "orders", "resource_type": "model",
                "original_file_path": "models/orders.sql"}}}"#,
        )
        .unwrap();

        let models = DbtProject::new(dir.path()).models().unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "orders");
    }

    #[test]
    fn in_memory_manifest_is_a_source() {
        let manifest = Manifest::from_str(r#"{"nodes": {}}"#).unwrap();
        let source: &dyn ManifestSource = &manifest;
        assert!(source.models().unwrap().is_empty());
    }
}
