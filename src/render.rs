// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Manifest template rendering into a staging directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::NAMESPACE_PLACEHOLDER;
use crate::error::{MusterError, Result};

/// A concrete manifest produced from a template. Immutable after rendering;
/// a re-render supersedes the staged file rather than merging into it.
#[derive(Debug, Clone)]
pub struct RenderedManifest {
    /// Template file stem, e.g. "postgres"
    pub name: String,
    /// Location of the staged copy
    pub path: PathBuf,
    /// Rendered document content
    pub content: String,
}

/// The full set of manifests rendered for one invocation.
#[derive(Debug, Clone)]
pub struct RenderedSet {
    manifests: Vec<RenderedManifest>,
}

impl RenderedSet {
    pub fn get(&self, name: &str) -> Option<&RenderedManifest> {
        self.manifests.iter().find(|m| m.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderedManifest> {
        self.manifests.iter()
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}

/// Substitute the namespace placeholder in a single template document.
pub fn render(template: &str, namespace: &str) -> String {
    template.replace(NAMESPACE_PLACEHOLDER, namespace)
}

/// Render every `*.yaml` template under `template_dir` into `staging_dir`.
///
/// Templates are processed in sorted filename order so the output is
/// deterministic. Fails if no templates are found or the staging directory
/// cannot be created.
pub fn render_templates(
    template_dir: &Path,
    staging_dir: &Path,
    namespace: &str,
) -> Result<RenderedSet> {
    let mut template_paths: Vec<PathBuf> = fs::read_dir(template_dir)
        .map_err(|e| {
            MusterError::RenderError(format!(
                "cannot read template directory {}: {}",
                template_dir.display(),
                e
            ))
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "yaml"))
        .collect();
    template_paths.sort();

    if template_paths.is_empty() {
        return Err(MusterError::RenderError(format!(
            "no templates found in {}",
            template_dir.display()
        )));
    }

    fs::create_dir_all(staging_dir).map_err(|e| {
        MusterError::RenderError(format!(
            "cannot create staging directory {}: {}",
            staging_dir.display(),
            e
        ))
    })?;

    let mut manifests = Vec::with_capacity(template_paths.len());
    for template_path in template_paths {
        let name = template_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let template = fs::read_to_string(&template_path).map_err(|e| {
            MusterError::RenderError(format!(
                "cannot read template {}: {}",
                template_path.display(),
                e
            ))
        })?;

        let content = render(&template, namespace);
        let staged_path = staging_dir.join(template_path.file_name().unwrap_or_default());
        fs::write(&staged_path, &content).map_err(|e| {
            MusterError::RenderError(format!(
                "cannot write staged manifest {}: {}",
                staged_path.display(),
                e
            ))
        })?;

        debug!("Rendered {} -> {}", template_path.display(), staged_path.display());
        manifests.push(RenderedManifest {
            name,
            path: staged_path,
            content,
        });
    }

    Ok(RenderedSet { manifests })
}

/// Remove the staging directory. Already-absent is not an error.
pub fn remove_staging(staging_dir: &Path) -> Result<()> {
    match fs::remove_dir_all(staging_dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MusterError::RenderError(format!(
            "cannot remove staging directory {}: {}",
            staging_dir.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_template(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        let rendered = render(
            "metadata:\n  namespace: ${NAMESPACE}\ndata:\n  url: postgres.${NAMESPACE}.svc\n",
            "feast",
        );
        assert_eq!(
            rendered,
            "metadata:\n  namespace: feast\ndata:\n  url: postgres.feast.svc\n"
        );
        assert!(!rendered.contains(NAMESPACE_PLACEHOLDER));
    }

    #[test]
    fn test_render_templates_is_deterministic() {
        let templates = tempfile::tempdir().unwrap();
        write_template(templates.path(), "a.yaml", "namespace: ${NAMESPACE}\n");
        write_template(templates.path(), "b.yaml", "name: fixed\n");

        let staging1 = tempfile::tempdir().unwrap();
        let staging2 = tempfile::tempdir().unwrap();
        let first = render_templates(templates.path(), staging1.path(), "feast").unwrap();
        let second = render_templates(templates.path(), staging2.path(), "feast").unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.content, b.content);
        }
    }

    #[test]
    fn test_render_templates_sorted_order() {
        let templates = tempfile::tempdir().unwrap();
        write_template(templates.path(), "redis.yaml", "x: 1\n");
        write_template(templates.path(), "feast.yaml", "x: 2\n");
        write_template(templates.path(), "postgres.yaml", "x: 3\n");

        let staging = tempfile::tempdir().unwrap();
        let set = render_templates(templates.path(), staging.path(), "ns").unwrap();
        let names: Vec<&str> = set.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["feast", "postgres", "redis"]);
    }

    #[test]
    fn test_render_templates_writes_staged_files() {
        let templates = tempfile::tempdir().unwrap();
        write_template(templates.path(), "feast.yaml", "namespace: ${NAMESPACE}\n");

        let staging = tempfile::tempdir().unwrap();
        let set = render_templates(templates.path(), staging.path(), "demo").unwrap();

        let staged = set.get("feast").unwrap();
        let on_disk = fs::read_to_string(&staged.path).unwrap();
        assert_eq!(on_disk, "namespace: demo\n");
    }

    #[test]
    fn test_empty_template_dir_is_an_error() {
        let templates = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let result = render_templates(templates.path(), staging.path(), "ns");
        assert!(matches!(result, Err(MusterError::RenderError(_))));
    }

    #[test]
    fn test_non_yaml_files_are_ignored() {
        let templates = tempfile::tempdir().unwrap();
        write_template(templates.path(), "feast.yaml", "a: 1\n");
        write_template(templates.path(), "README.md", "not a template\n");

        let staging = tempfile::tempdir().unwrap();
        let set = render_templates(templates.path(), staging.path(), "ns").unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_staging_tolerates_absent_dir() {
        let staging = tempfile::tempdir().unwrap();
        let path = staging.path().join("never-created");
        assert!(remove_staging(&path).is_ok());
    }
}
