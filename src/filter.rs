//! Change filter: decides which paths are worth a rebuild.

use std::path::Path;

/// Extensions watched when nothing else is configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".go", ".html", ".css", ".js"];

/// Extension allow-list over file paths.
///
/// Matching is exact and case-sensitive on the extension including its
/// leading dot, so `main.go` is relevant while `main.GO` and `Makefile` are not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    extensions: Vec<String>,
}

impl Default for ChangeFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS.iter().copied())
    }
}

impl ChangeFilter {
    /// Build a filter from extensions; a missing leading dot is added.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.as_ref().trim();
                if ext.starts_with('.') {
                    ext.to_string()
                } else {
                    format!(".{ext}")
                }
            })
            .filter(|ext| ext.len() > 1)
            .collect();
        Self { extensions }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn is_relevant(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|allowed| allowed.strip_prefix('.') == Some(ext))
    }
}
