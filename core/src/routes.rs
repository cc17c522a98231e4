#![deny(missing_docs)]

//! # Route Layout
//!
//! Maps endpoint files to URL patterns following the file-system routing convention:
//! `src/routes/users/[id]/server.rs` serves `/users/[id]`.
//!
//! Directory names in parentheses are layout groups and do not appear in the URL,
//! so `src/routes/(admin)/stats/server.rs` serves `/stats`.

use crate::config::GeneratorConfig;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// File-system routing convention for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteLayout {
    root: PathBuf,
    routes_dir: PathBuf,
    endpoint_file: String,
    types_dir: PathBuf,
    types_file: String,
}

impl RouteLayout {
    /// Builds the layout described by `config`.
    ///
    /// A relative root is anchored at the current directory, so absolute paths
    /// reported by file watchers line up with it.
    pub fn new(config: &GeneratorConfig) -> Self {
        let root = std::path::absolute(&config.root).unwrap_or_else(|_| config.root.clone());
        let config = GeneratorConfig {
            root,
            ..config.clone()
        };
        Self {
            routes_dir: config.routes_path(),
            endpoint_file: config.endpoint_file.clone(),
            types_dir: config.resolve(&config.types_dir),
            types_file: config.types_file.clone(),
            root: config.root,
        }
    }

    /// The directory endpoint files are discovered under.
    pub fn routes_dir(&self) -> &Path {
        &self.routes_dir
    }

    /// Whether `path` names an endpoint file under the routes directory.
    pub fn is_endpoint(&self, path: &Path) -> bool {
        self.route_id(path).is_some()
    }

    /// `path` made absolute against the project root.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// The URL pattern served by the endpoint file at `path`.
    ///
    /// Relative paths are taken relative to the project root. Returns `None` for paths
    /// outside the routes directory or with a different file name.
    pub fn route_id(&self, path: &Path) -> Option<String> {
        if path.file_name()? != self.endpoint_file.as_str() {
            return None;
        }
        let relative = self.within_routes(path)?.parent()?.to_path_buf();

        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().replace('\\', "/")),
                _ => None,
            })
            .filter(|s| !is_group(s))
            .collect();

        Some(format!("/{}", segments.join("/")))
    }

    /// `path` relative to the routes directory. Falls back to resolved symlinks when
    /// the paths don't line up lexically.
    fn within_routes(&self, path: &Path) -> Option<PathBuf> {
        let absolute = normalize(&self.absolute(path));
        let routes_dir = normalize(&self.routes_dir);
        if let Ok(relative) = absolute.strip_prefix(&routes_dir) {
            return Some(relative.to_path_buf());
        }

        let routes_dir = fs::canonicalize(&routes_dir).ok()?;
        // A deleted file can't be canonicalized, but its directory may still exist.
        let absolute = fs::canonicalize(&absolute).or_else(|_| {
            let parent = fs::canonicalize(absolute.parent().unwrap_or(Path::new("/")))?;
            Ok::<_, std::io::Error>(parent.join(absolute.file_name().unwrap_or_default()))
        });
        absolute
            .ok()?
            .strip_prefix(&routes_dir)
            .ok()
            .map(Path::to_path_buf)
    }

    /// Every endpoint file under the routes directory, sorted.
    pub fn discover(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.routes_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.file_name().is_some_and(|n| n == self.endpoint_file.as_str()))
            .collect();
        files.sort();
        files
    }

    /// Where the host framework writes the companion type file for `endpoint`.
    ///
    /// The endpoint's directory is mirrored, relative to the project root, under the
    /// types directory.
    pub fn companion_types_path(&self, endpoint: &Path) -> Option<PathBuf> {
        let absolute = self.absolute(endpoint);
        let dir = normalize(absolute.parent()?);
        if let Ok(relative) = dir.strip_prefix(normalize(&self.root)) {
            return Some(self.types_dir.join(relative).join(&self.types_file));
        }

        let routes_dir = normalize(&self.routes_dir);
        let routes_relative = routes_dir.strip_prefix(normalize(&self.root)).ok()?;
        let within = self.within_routes(endpoint)?;
        Some(
            self.types_dir
                .join(routes_relative)
                .join(within.parent()?)
                .join(&self.types_file),
        )
    }
}

fn is_group(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('(') && segment.ends_with(')')
}

/// Lexically removes `.` components so prefixes compare reliably.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn layout() -> RouteLayout {
        RouteLayout::new(&GeneratorConfig::for_root("/app"))
    }

    #[test]
    fn test_route_ids() {
        let layout = layout();
        assert_eq!(
            layout.route_id(Path::new("/app/src/routes/server.rs")).as_deref(),
            Some("/")
        );
        assert_eq!(
            layout
                .route_id(Path::new("/app/src/routes/users/[id]/server.rs"))
                .as_deref(),
            Some("/users/[id]")
        );
        assert_eq!(
            layout
                .route_id(Path::new("src/routes/files/[...rest]/server.rs"))
                .as_deref(),
            Some("/files/[...rest]")
        );
    }

    #[test]
    fn test_groups_are_not_part_of_the_url() {
        assert_eq!(
            layout()
                .route_id(Path::new("/app/src/routes/(admin)/stats/server.rs"))
                .as_deref(),
            Some("/stats")
        );
    }

    #[test]
    fn test_non_endpoints() {
        let layout = layout();
        assert!(!layout.is_endpoint(Path::new("/app/src/routes/users/helpers.rs")));
        assert!(!layout.is_endpoint(Path::new("/app/src/lib/server.rs")));
        assert!(!layout.is_endpoint(Path::new("/other/src/routes/server.rs")));
    }

    #[test]
    fn test_companion_types_path() {
        assert_eq!(
            layout().companion_types_path(Path::new("/app/src/routes/users/[id]/server.rs")),
            Some(PathBuf::from(
                "/app/.routegen/types/src/routes/users/[id]/types.rs"
            ))
        );
    }

    #[test]
    fn test_relative_root_accepts_absolute_paths() {
        let layout = RouteLayout::new(&GeneratorConfig::default());
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            layout
                .route_id(&cwd.join("src/routes/posts/server.rs"))
                .as_deref(),
            Some("/posts")
        );
        assert_eq!(
            layout.route_id(Path::new("src/routes/posts/server.rs")).as_deref(),
            Some("/posts")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_root() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir_all(real.join("src/routes/posts")).unwrap();
        std::os::unix::fs::symlink(&real, dir.path().join("link")).unwrap();

        let layout = RouteLayout::new(&GeneratorConfig::for_root(dir.path().join("link")));
        assert_eq!(
            layout
                .route_id(&real.join("src/routes/posts/server.rs"))
                .as_deref(),
            Some("/posts")
        );
    }

    #[test]
    fn test_discover_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let routes = dir.path().join("src/routes");
        for sub in ["b", "a/[id]", "a"] {
            std::fs::create_dir_all(routes.join(sub)).unwrap();
            std::fs::write(routes.join(sub).join("server.rs"), "").unwrap();
        }
        std::fs::write(routes.join("a/notes.rs"), "").unwrap();

        let layout = RouteLayout::new(&GeneratorConfig::for_root(dir.path()));
        let found: Vec<_> = layout
            .discover()
            .into_iter()
            .map(|p| layout.route_id(&p).unwrap())
            .collect();
        // Paths sort component-wise, and `[` sorts before letters.
        assert_eq!(found, vec!["/a/[id]", "/a", "/b"]);
    }
}
