//! Download extraction from response paths.

use std::sync::Arc;

use serde::Serialize;

use crate::analytics::sink::DownloadSink;
use crate::observability::metrics;

/// Which registry view served the download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Jsr,
    Npm,
}

impl RegistryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryKind::Jsr => "jsr",
            RegistryKind::Npm => "npm",
        }
    }
}

/// One package-version download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadEvent {
    pub registry_kind: RegistryKind,
    pub scope: String,
    pub package: String,
    pub version: String,
}

impl DownloadEvent {
    /// Aggregation key, `scope/package`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.scope, self.package)
    }
}

/// Extract a download from a response path.
///
/// - jsr: `/@{scope}/{package}/{version}_meta.json`
/// - npm: `/~/{n}/@jsr/{scope}__{package}/{version}.tgz`
pub fn parse_download_path(path: &str, kind: RegistryKind) -> Option<DownloadEvent> {
    let (scope, package, version) = match kind {
        RegistryKind::Jsr => parse_jsr(path)?,
        RegistryKind::Npm => parse_npm(path)?,
    };
    Some(DownloadEvent {
        registry_kind: kind,
        scope: scope.to_string(),
        package: package.to_string(),
        version: version.to_string(),
    })
}

fn parse_jsr(path: &str) -> Option<(&str, &str, &str)> {
    let rest = path.strip_prefix("/@")?;
    // A doubled scope marker (`/@@scope`) names the same scope.
    let rest = rest.strip_prefix('@').unwrap_or(rest);

    let mut parts = rest.split('/');
    let scope = parts.next()?;
    let package = parts.next()?;
    let file = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let version = file.strip_suffix("_meta.json")?;
    non_empty(scope, package, version)
}

fn parse_npm(path: &str) -> Option<(&str, &str, &str)> {
    let rest = path.strip_prefix("/~/")?;

    let mut parts = rest.split('/');
    let revision = parts.next()?;
    let namespace = parts.next()?;
    let name = parts.next()?;
    let file = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    if revision.is_empty() || !revision.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if namespace != "@jsr" {
        return None;
    }
    let (scope, package) = name.split_once("__")?;
    let version = file.strip_suffix(".tgz")?;
    non_empty(scope, package, version)
}

fn non_empty<'a>(scope: &'a str, package: &'a str, version: &'a str) -> Option<(&'a str, &'a str, &'a str)> {
    if scope.is_empty() || package.is_empty() || version.is_empty() {
        None
    } else {
        Some((scope, package, version))
    }
}

/// Counts downloads and hands them to the analytics sink.
#[derive(Clone)]
pub struct DownloadTracker {
    sink: Arc<dyn DownloadSink>,
}

impl DownloadTracker {
    pub fn new(sink: Arc<dyn DownloadSink>) -> Self {
        Self { sink }
    }

    /// Record a download if `path` names one. Never blocks, never fails.
    pub fn track_download(&self, path: &str, kind: RegistryKind) {
        let Some(event) = parse_download_path(path, kind) else {
            return;
        };
        tracing::debug!(
            registry = kind.as_str(),
            package = %event.key(),
            version = %event.version,
            "Download tracked"
        );
        metrics::record_download(kind.as_str());
        self.sink.submit(event);
    }
}

impl std::fmt::Debug for DownloadTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadTracker").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::sink::MemorySink;

    #[test]
    fn test_jsr_meta_path() {
        let event = parse_download_path("/@@foo/bar/1.2.3_meta.json", RegistryKind::Jsr).unwrap();
        assert_eq!(
            event,
            DownloadEvent {
                registry_kind: RegistryKind::Jsr,
                scope: "foo".to_string(),
                package: "bar".to_string(),
                version: "1.2.3".to_string(),
            }
        );
        assert_eq!(event.key(), "foo/bar");

        let event = parse_download_path("/@std/fs/1.0.0-rc.1_meta.json", RegistryKind::Jsr).unwrap();
        assert_eq!(event.scope, "std");
        assert_eq!(event.version, "1.0.0-rc.1");
    }

    #[test]
    fn test_npm_tarball_path() {
        let event = parse_download_path("/~/11/@jsr/std__fs/1.0.0.tgz", RegistryKind::Npm).unwrap();
        assert_eq!(event.registry_kind, RegistryKind::Npm);
        assert_eq!(event.scope, "std");
        assert_eq!(event.package, "fs");
        assert_eq!(event.version, "1.0.0");
    }

    #[test]
    fn test_non_download_paths_ignored() {
        for path in [
            "/@std/fs/1.0.0/mod.ts",
            "/@std/fs/meta.json",
            "/@std/fs/_meta.json",
            "/@std/fs/1.0.0/extra_meta.json",
            "/std/fs/1.0.0_meta.json",
        ] {
            assert_eq!(parse_download_path(path, RegistryKind::Jsr), None, "{path}");
        }
        for path in [
            "/@jsr/std__fs",
            "/~/x/@jsr/std__fs/1.0.0.tgz",
            "/~/11/@npm/std__fs/1.0.0.tgz",
            "/~/11/@jsr/stdfs/1.0.0.tgz",
            "/~/11/@jsr/std__fs/1.0.0.tar",
        ] {
            assert_eq!(parse_download_path(path, RegistryKind::Npm), None, "{path}");
        }
        // Patterns do not cross registries
        assert_eq!(
            parse_download_path("/@std/fs/1.0.0_meta.json", RegistryKind::Npm),
            None
        );
    }

    #[test]
    fn test_tracker_submits_matches_only() {
        let sink = Arc::new(MemorySink::default());
        let tracker = DownloadTracker::new(sink.clone());

        tracker.track_download("/@std/fs/1.0.0_meta.json", RegistryKind::Jsr);
        tracker.track_download("/@std/fs/1.0.0/mod.ts", RegistryKind::Jsr);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key(), "std/fs");
    }
}
