//! Tree key encoding.
//!
//! Keys are cleaned, lower-cased slash paths with a leading slash. Two
//! separators that never occur in real paths encode ownership:
//!
//! - section: `/blog/` (root section is `/`)
//! - page: `/blog/__hb_post__hl_`
//! - page resource: `/blog/__hb_post__hl_cover.jpg`
//! - section resource: `/blog/__hl_banner.png`

/// Separator between a section key and a page's local path.
pub const BRANCH_SEP: &str = "__hb_";
/// Separator closing a page's local path.
pub const LEAF_SEP: &str = "__hl_";

/// Tree a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeKind {
    Sections,
    Pages,
    Resources,
}

/// Normalize a slash path: resolve `.` and `..`, drop empty segments.
fn clean_path(p: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in p.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

/// Canonical tree key for a path: leading slash, lower case, no trailing slash.
#[must_use]
pub fn clean_tree_key(k: &str) -> String {
    let cleaned = clean_path(&k.replace('\\', "/"));
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '/');
    format!("/{}", trimmed.to_lowercase())
}

/// Canonical section key: like [`clean_tree_key`] plus a trailing slash.
#[must_use]
pub fn clean_section_tree_key(k: &str) -> String {
    let k = clean_tree_key(k);
    if k == "/" { k } else { format!("{k}/") }
}

/// Directory part of a cleaned key, with a trailing slash.
///
/// `"/blog/post"` gives `"/blog/"`, `"/blog/"` gives `"/"`.
#[must_use]
pub fn parent_dir_key(k: &str) -> String {
    let trimmed = k.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => trimmed[..=i].to_owned(),
        None => "/".to_owned(),
    }
}

/// Number of path segments in a section key (`/` is 0, `/blog/` is 1).
#[must_use]
pub fn section_depth(section_key: &str) -> usize {
    section_key.matches('/').count().saturating_sub(1)
}

/// Name of the first segment of a key, empty for the root.
#[must_use]
pub fn first_segment(k: &str) -> &str {
    k.trim_start_matches('/').split('/').next().unwrap_or("")
}

/// Owning section key and local path of a page key.
///
/// Returns `None` if the key has no page markers.
#[must_use]
pub fn split_page_key(k: &str) -> Option<(&str, &str)> {
    let (section, rest) = k.split_once(BRANCH_SEP)?;
    let local = rest.strip_suffix(LEAF_SEP).unwrap_or(rest);
    Some((section, local))
}

/// Derives the key of a section, a page or a resource.
///
/// A builder starts at a section and can be narrowed to a page. Resource keys
/// are derived from either without consuming the builder, so one builder
/// serves every resource of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    tree: TreeKind,
    base_key: String,
    key: String,
}

impl KeyBuilder {
    /// Start at the section for the given directory path.
    #[must_use]
    pub fn for_section(section_path: &str) -> Self {
        let key = clean_section_tree_key(section_path);
        Self {
            tree: TreeKind::Sections,
            base_key: key.clone(),
            key,
        }
    }

    /// Narrow to the page whose bundle path is given.
    ///
    /// The section part of the path is not repeated in the key. A bundle path
    /// equal to the section's own path yields an empty local part.
    ///
    /// # Panics
    ///
    /// Panics if the builder is not positioned at a section.
    #[must_use]
    pub fn for_page(self, bundle_path: &str) -> Self {
        assert!(
            self.tree == TreeKind::Sections,
            "BUG: page key derived from {:?} builder",
            self.tree
        );
        let bundle_path = clean_tree_key(bundle_path);
        let section = self.key;
        let mut local = bundle_path.as_str();
        if section != "/" {
            local = local
                .strip_prefix(section.as_str())
                .or_else(|| local.strip_prefix(section.trim_end_matches('/')))
                .unwrap_or(local);
        }
        let local = local.trim_start_matches('/');
        let key = format!("{section}{BRANCH_SEP}{local}{LEAF_SEP}");
        Self {
            tree: TreeKind::Pages,
            base_key: bundle_path,
            key,
        }
    }

    /// Key of a resource owned by the current section or page.
    ///
    /// # Panics
    ///
    /// Panics if the builder is already positioned at a resource.
    #[must_use]
    pub fn for_resource(&self, resource_path: &str) -> Self {
        let resource_path = clean_tree_key(resource_path);
        let base = if self.base_key.ends_with('/') {
            self.base_key.clone()
        } else {
            format!("{}/", self.base_key)
        };
        let local = resource_path
            .strip_prefix(base.as_str())
            .unwrap_or(resource_path.trim_start_matches('/'));
        let key = match self.tree {
            TreeKind::Pages => format!("{}{local}", self.key),
            TreeKind::Sections => format!("{}{LEAF_SEP}{local}", self.key),
            TreeKind::Resources => panic!("BUG: resource key derived from resource builder"),
        };
        Self {
            tree: TreeKind::Resources,
            base_key: self.base_key.clone(),
            key,
        }
    }

    /// The derived key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Cleaned path the key was derived from.
    #[must_use]
    pub fn base_key(&self) -> &str {
        &self.base_key
    }

    /// Tree the key belongs to.
    #[must_use]
    pub fn tree(&self) -> TreeKind {
        self.tree
    }

    /// Consume the builder, returning the key.
    #[must_use]
    pub fn into_key(self) -> String {
        self.key
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_clean_tree_key() {
        assert_eq!(clean_tree_key(""), "/");
        assert_eq!(clean_tree_key("."), "/");
        assert_eq!(clean_tree_key("/"), "/");
        assert_eq!(clean_tree_key("Blog/Post"), "/blog/post");
        assert_eq!(clean_tree_key("blog//a/../post/"), "/blog/post");
        assert_eq!(clean_tree_key("./docs"), "/docs");
    }

    #[test]
    fn test_clean_section_tree_key() {
        assert_eq!(clean_section_tree_key(""), "/");
        assert_eq!(clean_section_tree_key("/blog"), "/blog/");
        assert_eq!(clean_section_tree_key("blog/2024/"), "/blog/2024/");
    }

    #[test]
    fn test_parent_dir_key() {
        assert_eq!(parent_dir_key("/blog/post"), "/blog/");
        assert_eq!(parent_dir_key("/blog/"), "/");
        assert_eq!(parent_dir_key("/about"), "/");
        assert_eq!(parent_dir_key("/"), "/");
    }

    #[test]
    fn test_section_depth() {
        assert_eq!(section_depth("/"), 0);
        assert_eq!(section_depth("/blog/"), 1);
        assert_eq!(section_depth("/blog/2024/"), 2);
    }

    #[test]
    fn test_page_key() {
        let b = KeyBuilder::for_section("/blog").for_page("/blog/post-a");

        assert_eq!(b.key(), "/blog/__hb_post-a__hl_");
        assert_eq!(b.tree(), TreeKind::Pages);
    }

    #[test]
    fn test_page_key_in_root() {
        let b = KeyBuilder::for_section("").for_page("/about");

        assert_eq!(b.key(), "/__hb_about__hl_");
    }

    #[test]
    fn test_page_key_nested_below_section() {
        let b = KeyBuilder::for_section("/blog").for_page("/blog/2024/post");

        assert_eq!(b.key(), "/blog/__hb_2024/post__hl_");
    }

    #[test]
    fn test_page_key_for_section_own_path() {
        let b = KeyBuilder::for_section("/blog").for_page("/blog");

        assert_eq!(b.key(), "/blog/__hb___hl_");
    }

    #[test]
    fn test_page_resource_key() {
        let page = KeyBuilder::for_section("/essays").for_page("/essays/my-essay");

        let r = page.for_resource("essays/my-essay/Cover.jpg");
        let nested = page.for_resource("essays/my-essay/img/a.png");

        assert_eq!(r.key(), "/essays/__hb_my-essay__hl_cover.jpg");
        assert_eq!(nested.key(), "/essays/__hb_my-essay__hl_img/a.png");
        assert_eq!(r.tree(), TreeKind::Resources);
    }

    #[test]
    fn test_section_resource_key() {
        let section = KeyBuilder::for_section("blog");

        assert_eq!(
            section.for_resource("blog/banner.png").key(),
            "/blog/__hl_banner.png"
        );
        assert_eq!(
            KeyBuilder::for_section("").for_resource("logo.svg").key(),
            "/__hl_logo.svg"
        );
    }

    #[test]
    fn test_split_page_key() {
        assert_eq!(
            split_page_key("/blog/__hb_2024/post__hl_"),
            Some(("/blog/", "2024/post"))
        );
        assert_eq!(split_page_key("/blog/"), None);
    }

    #[test]
    #[should_panic(expected = "BUG")]
    fn test_page_from_page_builder_panics() {
        let _ = KeyBuilder::for_section("/blog")
            .for_page("/blog/a")
            .for_page("/blog/b");
    }
}
