//! Structural id → template path mapping.
//!
//! Templates live in three tier directories under a common root. Each file
//! name encodes an optional numeric ordering prefix and a display name:
//!
//! ```text
//! templates/
//! ├── small/
//! │   ├── 01-header.tmpl      → small-header
//! │   └── icons/
//! │       └── 02_star.tmpl    → small-star
//! ├── medium/
//! │   └── 10-card.tmpl        → medium-card
//! └── large/
//!     └── page.tmpl           → large-page
//! ```
//!
//! The mapping is built once per run by walking the three tier directories
//! concurrently, and is read-only afterwards.
//!
//! # Scan order
//!
//! Within a directory, entries are visited in file-name order; a
//! subdirectory's results are spliced in at the subdirectory's position.
//! When two files map to the same id within a tier the later one in this
//! order wins.
//!
//! Symlinks to template files are followed. Symlinks to directories are not,
//! and dangling links are ignored.

use futures::future::{BoxFuture, FutureExt, try_join_all};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::config::TierDirectories;
use crate::constants::{HIDDEN_PREFIX, ID_SEPARATOR};
use crate::core::TierGraphError;

/// Leading numeric ordering prefix, e.g. `01-`, `2_`, `10.`, `3`.
static ORDERING_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[-_.]?").expect("ordering prefix regex is valid"));

/// One of the three naming categories of templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Small,
    Medium,
    Large,
}

impl Tier {
    /// All tiers, smallest first.
    pub const ALL: [Tier; 3] = [Tier::Small, Tier::Medium, Tier::Large];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    /// Structural id of a template named `name` in this tier.
    #[must_use]
    pub fn structural_id(self, name: &str) -> String {
        format!("{}{ID_SEPARATOR}{name}", self.as_str())
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = TierGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            other => Err(TierGraphError::ConfigurationError {
                message: format!("unknown tier '{other}' (expected small, medium, or large)"),
            }),
        }
    }
}

/// Extract the display name from a template file name.
///
/// Returns `None` for hidden files, files with another extension, and names
/// that are empty once the ordering prefix and extension are stripped.
///
/// ```rust
/// use tiergraph::resolver::path_resolver::template_name;
///
/// assert_eq!(template_name("01-header.tmpl", "tmpl").as_deref(), Some("header"));
/// assert_eq!(template_name("footer.tmpl", "tmpl").as_deref(), Some("footer"));
/// assert_eq!(template_name("01-header.html", "tmpl"), None);
/// assert_eq!(template_name(".01-draft.tmpl", "tmpl"), None);
/// ```
#[must_use]
pub fn template_name(file_name: &str, extension: &str) -> Option<String> {
    if file_name.starts_with(HIDDEN_PREFIX) {
        return None;
    }
    let stem = file_name.strip_suffix(extension)?.strip_suffix('.')?;
    let name = ORDERING_PREFIX.replace(stem, "");
    if name.is_empty() {
        return None;
    }
    Some(name.into_owned())
}

/// Normalise a configured extension (`.tmpl` and `tmpl` are equivalent).
#[must_use]
pub fn normalize_extension(extension: &str) -> &str {
    extension.trim_start_matches('.')
}

/// Id → path mappings for all three tiers.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    tiers: BTreeMap<Tier, BTreeMap<String, PathBuf>>,
    by_path: HashMap<PathBuf, String>,
}

impl PathResolver {
    /// Walk the three tier directories under `root` concurrently.
    ///
    /// # Errors
    ///
    /// [`TierGraphError::ScanError`] if the root or any tier directory cannot
    /// be listed or stat'd. A single failing tier fails the whole scan.
    pub async fn scan(
        root: &Path,
        directories: &TierDirectories,
        extension: &str,
    ) -> Result<Self, TierGraphError> {
        let root = tokio::fs::canonicalize(root).await.map_err(|e| TierGraphError::ScanError {
            tier: "root".to_string(),
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;
        let extension = normalize_extension(extension).to_string();

        let scans = Tier::ALL.map(|tier| {
            let dir = root.join(directories.dir(tier));
            let extension = extension.clone();
            async move {
                let files = walk_tier(dir.clone(), extension).await.map_err(|e| {
                    TierGraphError::ScanError {
                        tier: tier.to_string(),
                        path: dir.display().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok::<_, TierGraphError>((tier, files))
            }
        });

        let mut resolver = Self::default();
        for (tier, files) in try_join_all(scans).await? {
            tracing::debug!("Scanned tier '{}': {} template(s)", tier, files.len());
            for (name, path) in files {
                resolver.insert(tier, &name, path);
            }
        }

        Ok(resolver)
    }

    /// Record one mapping; a later insert for the same id replaces the earlier one.
    pub fn insert(&mut self, tier: Tier, name: &str, path: PathBuf) {
        let id = tier.structural_id(name);
        let mapping = self.tiers.entry(tier).or_default();
        if let Some(previous) = mapping.insert(id.clone(), path.clone()) {
            tracing::warn!(
                "Template '{}' shadows '{}' for id '{}'",
                path.display(),
                previous.display(),
                id
            );
            self.by_path.remove(&previous);
        }
        self.by_path.insert(path, id);
    }

    /// Path of the template for a structural id.
    #[must_use]
    pub fn resolve(&self, id: &str) -> Option<&Path> {
        let (tier, _) = id.split_once(ID_SEPARATOR)?;
        let tier = Tier::from_str(tier).ok()?;
        self.tiers.get(&tier)?.get(id).map(PathBuf::as_path)
    }

    /// Structural id of an already-canonical template path.
    #[must_use]
    pub fn identify(&self, canonical_path: &Path) -> Option<&str> {
        self.by_path.get(canonical_path).map(String::as_str)
    }

    /// Ids known for one tier, in id order.
    pub fn ids(&self, tier: Tier) -> impl Iterator<Item = &str> {
        self.tiers.get(&tier).into_iter().flat_map(|m| m.keys().map(String::as_str))
    }

    /// Total number of mapped templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Directory entry in scan order.
enum Entry {
    File(String, PathBuf),
    Dir(usize),
}

/// Recursively collect `(name, path)` pairs for one tier, in scan order.
fn walk_tier(dir: PathBuf, extension: String) -> BoxFuture<'static, std::io::Result<Vec<(String, PathBuf)>>> {
    async move {
        let mut reader = tokio::fs::read_dir(&dir).await?;
        let mut listed = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            listed.push(entry);
        }
        listed.sort_by_key(tokio::fs::DirEntry::file_name);

        let mut order = Vec::new();
        let mut subdirs = Vec::new();
        for entry in listed {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                tracing::debug!("Skipping non UTF-8 entry in {}", dir.display());
                continue;
            };
            if file_name.starts_with(HIDDEN_PREFIX) {
                continue;
            }

            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                order.push(Entry::Dir(subdirs.len()));
                subdirs.push(walk_tier(path, extension.clone()));
                continue;
            }

            // Linked templates are followed, linked directories are not
            let is_file = if file_type.is_symlink() {
                match tokio::fs::metadata(&path).await {
                    Ok(target) if target.is_dir() => {
                        tracing::debug!("Not following directory link {}", path.display());
                        false
                    }
                    Ok(target) => target.is_file(),
                    Err(e) => {
                        tracing::debug!("Skipping dangling link {}: {}", path.display(), e);
                        false
                    }
                }
            } else {
                file_type.is_file()
            };
            if is_file && let Some(name) = template_name(file_name, &extension) {
                order.push(Entry::File(name, path));
            }
        }

        let mut nested = try_join_all(subdirs).await?.into_iter().map(Some).collect::<Vec<_>>();
        let mut files = Vec::new();
        for entry in order {
            match entry {
                Entry::File(name, path) => files.push((name, path)),
                Entry::Dir(index) => files.extend(nested[index].take().unwrap_or_default()),
            }
        }
        Ok(files)
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let temp = tempfile::tempdir().unwrap();
        for tier in Tier::ALL {
            fs::create_dir_all(temp.path().join(tier.as_str())).unwrap();
        }
        temp
    }

    #[test]
    fn test_template_name_strips_prefix_and_extension() {
        assert_eq!(template_name("01-header.tmpl", "tmpl").as_deref(), Some("header"));
        assert_eq!(template_name("2_footer.tmpl", "tmpl").as_deref(), Some("footer"));
        assert_eq!(template_name("10.nav-bar.tmpl", "tmpl").as_deref(), Some("nav-bar"));
        assert_eq!(template_name("hero.tmpl", "tmpl").as_deref(), Some("hero"));
        assert_eq!(template_name("01-.tmpl", "tmpl"), None);
        assert_eq!(template_name("header.tmpl.bak", "tmpl"), None);
        assert_eq!(template_name("headertmpl", "tmpl"), None);
    }

    #[test]
    fn test_tier_round_trip_and_ids() {
        for tier in Tier::ALL {
            assert_eq!(tier.as_str().parse::<Tier>().unwrap(), tier);
        }
        assert_eq!(Tier::Medium.structural_id("card"), "medium-card");
        assert!("huge".parse::<Tier>().is_err());
    }

    #[tokio::test]
    async fn test_scan_maps_all_tiers() {
        let temp = tree();
        let root = temp.path();
        fs::write(root.join("small/01-header.tmpl"), "").unwrap();
        fs::create_dir_all(root.join("small/icons")).unwrap();
        fs::write(root.join("small/icons/02_star.tmpl"), "").unwrap();
        fs::write(root.join("medium/10-card.tmpl"), "").unwrap();
        fs::write(root.join("large/page.tmpl"), "").unwrap();
        fs::write(root.join("large/notes.md"), "").unwrap();

        let resolver = PathResolver::scan(root, &TierDirectories::default(), ".tmpl").await.unwrap();

        assert_eq!(resolver.len(), 4);
        assert!(resolver.resolve("small-header").unwrap().ends_with("small/01-header.tmpl"));
        assert!(resolver.resolve("small-star").unwrap().ends_with("small/icons/02_star.tmpl"));
        assert!(resolver.resolve("medium-card").is_some());
        assert!(resolver.resolve("large-page").is_some());
        assert!(resolver.resolve("large-notes").is_none());
        assert!(resolver.resolve("medium-header").is_none());
        assert!(resolver.resolve("header").is_none());
    }

    #[tokio::test]
    async fn test_scan_skips_hidden_entries() {
        let temp = tree();
        let root = temp.path();
        fs::write(root.join("small/.01-draft.tmpl"), "").unwrap();
        fs::create_dir_all(root.join("small/.cache")).unwrap();
        fs::write(root.join("small/.cache/01-cached.tmpl"), "").unwrap();
        fs::write(root.join("small/01-visible.tmpl"), "").unwrap();

        let resolver = PathResolver::scan(root, &TierDirectories::default(), "tmpl").await.unwrap();
        let ids: Vec<_> = resolver.ids(Tier::Small).collect();
        assert_eq!(ids, vec!["small-visible"]);
    }

    #[tokio::test]
    async fn test_scan_collisions_last_write_wins_in_scan_order() {
        let temp = tree();
        let root = temp.path();
        // "01-button" sorts before "02-button" and before the "extra" directory
        fs::write(root.join("small/01-button.tmpl"), "first").unwrap();
        fs::write(root.join("small/02-button.tmpl"), "second").unwrap();
        fs::create_dir_all(root.join("small/extra")).unwrap();
        fs::write(root.join("small/extra/button.tmpl"), "third").unwrap();

        let resolver = PathResolver::scan(root, &TierDirectories::default(), "tmpl").await.unwrap();
        let path = resolver.resolve("small-button").unwrap();
        assert!(path.ends_with("small/extra/button.tmpl"));
        assert_eq!(resolver.len(), 1);

        // Shadowed paths are no longer identifiable
        let shadowed = fs::canonicalize(root.join("small/01-button.tmpl")).unwrap();
        assert!(resolver.identify(&shadowed).is_none());
    }

    #[tokio::test]
    async fn test_same_name_in_different_tiers_does_not_collide() {
        let temp = tree();
        let root = temp.path();
        fs::write(root.join("small/01-card.tmpl"), "").unwrap();
        fs::write(root.join("large/01-card.tmpl"), "").unwrap();

        let resolver = PathResolver::scan(root, &TierDirectories::default(), "tmpl").await.unwrap();
        assert_ne!(resolver.resolve("small-card"), resolver.resolve("large-card"));
        assert_eq!(resolver.len(), 2);
    }

    #[tokio::test]
    async fn test_scan_custom_directories() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        for dir in ["atoms", "molecules", "organisms"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::write(root.join("atoms/01-label.tmpl"), "").unwrap();

        let directories = TierDirectories {
            small: "atoms".to_string(),
            medium: "molecules".to_string(),
            large: "organisms".to_string(),
        };
        let resolver = PathResolver::scan(root, &directories, "tmpl").await.unwrap();
        assert!(resolver.resolve("small-label").is_some());
    }

    #[tokio::test]
    async fn test_scan_missing_tier_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("small")).unwrap();
        fs::create_dir_all(root.join("large")).unwrap();

        let err = PathResolver::scan(root, &TierDirectories::default(), "tmpl").await.unwrap_err();
        assert!(matches!(err, TierGraphError::ScanError { ref tier, .. } if tier == "medium"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_does_not_follow_directory_links() {
        use std::os::unix::fs::symlink;

        let temp = tree();
        let root = temp.path();
        fs::write(root.join("small/01-header.tmpl"), "").unwrap();
        fs::create_dir_all(root.join("small/nested")).unwrap();
        symlink(root.join("small"), root.join("small/loop")).unwrap();
        symlink("..", root.join("small/nested/up")).unwrap();
        symlink(root.join("medium"), root.join("small/medium-link")).unwrap();
        fs::write(root.join("medium/10-card.tmpl"), "").unwrap();

        let resolver = PathResolver::scan(root, &TierDirectories::default(), "tmpl").await.unwrap();
        assert_eq!(resolver.ids(Tier::Small).collect::<Vec<_>>(), vec!["small-header"]);
        assert!(resolver.resolve("small-card").is_none());
        assert!(resolver.resolve("medium-card").is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_follows_file_links_and_ignores_dangling_ones() {
        use std::os::unix::fs::symlink;

        let temp = tree();
        let root = temp.path();
        fs::write(root.join("large/page.tmpl"), "").unwrap();
        symlink(root.join("large/page.tmpl"), root.join("small/02-page.tmpl")).unwrap();
        symlink(root.join("small/gone.tmpl"), root.join("small/03-broken.tmpl")).unwrap();

        let resolver = PathResolver::scan(root, &TierDirectories::default(), "tmpl").await.unwrap();
        assert!(resolver.resolve("small-page").is_some());
        assert!(resolver.resolve("small-broken").is_none());
    }

    #[tokio::test]
    async fn test_scan_missing_root_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = PathResolver::scan(&temp.path().join("nope"), &TierDirectories::default(), "tmpl")
            .await
            .unwrap_err();
        assert!(matches!(err, TierGraphError::ScanError { ref tier, .. } if tier == "root"));
    }

    #[tokio::test]
    async fn test_identify_canonical_paths() {
        let temp = tree();
        let root = temp.path();
        fs::write(root.join("medium/03-list.tmpl"), "").unwrap();

        let resolver = PathResolver::scan(root, &TierDirectories::default(), "tmpl").await.unwrap();
        let canonical = fs::canonicalize(root.join("medium/03-list.tmpl")).unwrap();
        assert_eq!(resolver.identify(&canonical), Some("medium-list"));
    }
}
