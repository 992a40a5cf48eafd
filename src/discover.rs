//! Directory walking for the command-line driver.
//!
//! Produces the engine's input list from a directory, honouring
//! `.gitignore`/`.ignore` plus a set of default and configured excludes.
//! Files are not filtered by extension here; the detector records why a file
//! is skipped.

use crate::engine::InputFile;
use crate::Result;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use std::path::Path;

/// Directories that never hold first-party source
const DEFAULT_EXCLUDES: &[&str] = &[
    ".git/", "target/", "node_modules/", "venv/", ".venv/", "vendor/",
    "dist/", "build/", "__pycache__/", ".idea/", ".vscode/", "*.egg-info/",
];

pub struct ExcludeFilter {
    inner: Gitignore,
}

impl ExcludeFilter {
    pub fn new(root: &Path, extra_excludes: &[String]) -> Self {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in DEFAULT_EXCLUDES {
            builder.add_line(None, pattern).ok();
        }
        for pattern in extra_excludes {
            if let Err(e) = builder.add_line(None, pattern) {
                tracing::warn!("Ignoring invalid exclude pattern {:?}: {}", pattern, e);
            }
        }

        Self {
            inner: builder.build().unwrap_or_else(|_| Gitignore::empty()),
        }
    }

    pub fn is_excluded(&self, path: &Path, is_dir: bool) -> bool {
        self.inner.matched_path_or_any_parents(path, is_dir).is_ignore()
    }
}

/// Collect every non-excluded file under `root` with its path relative to
/// `root`, sorted by path
pub fn discover(root: &Path, extra_excludes: &[String]) -> Result<Vec<InputFile>> {
    let filter = ExcludeFilter::new(root, extra_excludes);
    let mut files = Vec::new();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .require_git(false)
        .ignore(true)
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if filter.is_excluded(relative, false) {
            continue;
        }

        let content = std::fs::read(path)?;
        let relative = relative.to_string_lossy().replace('\\', "/");
        files.push(InputFile::new(relative, content));
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!("Discovered {} files under {}", files.len(), root.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discovers_relative_sorted_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::create_dir_all(root.join("node_modules/left-pad")).unwrap();
        fs::write(root.join("pkg/util.py"), "def f():\n    pass\n").unwrap();
        fs::write(root.join("main.py"), "import pkg.util\n").unwrap();
        fs::write(root.join("README.md"), "# demo\n").unwrap();
        fs::write(root.join("node_modules/left-pad/index.js"), "module.exports = 1;\n").unwrap();

        let files = discover(root, &[]).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "main.py", "pkg/util.py"]);
        assert_eq!(files[1].content, b"import pkg.util\n");
    }

    #[test]
    fn test_gitignore_and_configured_excludes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("generated")).unwrap();
        fs::write(root.join(".gitignore"), "secret.py\n").unwrap();
        fs::write(root.join("secret.py"), "x = 1\n").unwrap();
        fs::write(root.join("app.py"), "x = 2\n").unwrap();
        fs::write(root.join("generated/schema.py"), "x = 3\n").unwrap();

        let files = discover(root, &["generated/".to_string()]).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec![".gitignore", "app.py"]);
    }
}
