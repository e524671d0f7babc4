//! Per-node cache of child listings.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::map::ContentMap;
use crate::meta::Params;
use crate::page::{Page, Renderable};
use crate::sort::sort_by_default;

/// Lazily computed child listings of a home, section, taxonomy or term page.
///
/// Each listing is computed once on first access, so concurrent first
/// readers after assembly see the same result. The map passed in must be the
/// one the owner page was assembled in.
pub struct PagesBucket {
    owner_key: String,
    cascade: Params,
    pages: OnceLock<Vec<Arc<Page>>>,
    sections: OnceLock<Vec<Arc<Page>>>,
    pages_and_sections: OnceLock<Vec<Arc<Page>>>,
}

impl PagesBucket {
    /// Bucket for the node with the given section key.
    ///
    /// The effective cascade is the parent's cascade overridden by `own`.
    #[must_use]
    pub fn new(owner_key: String, parent: Option<&PagesBucket>, own: &Params) -> Self {
        let mut cascade = parent.map(|p| p.cascade.clone()).unwrap_or_default();
        for (key, value) in own {
            cascade.insert(key.clone(), value.clone());
        }
        Self {
            owner_key,
            cascade,
            pages: OnceLock::new(),
            sections: OnceLock::new(),
            pages_and_sections: OnceLock::new(),
        }
    }

    /// Root bucket of a site, parent of the home page's bucket.
    #[must_use]
    pub fn site(cascade: Params) -> Self {
        Self::new(String::new(), None, &cascade)
    }

    /// Section key of the owner.
    #[must_use]
    pub fn owner_key(&self) -> &str {
        &self.owner_key
    }

    /// Effective cascade passed down to children.
    #[must_use]
    pub fn cascade(&self) -> &Params {
        &self.cascade
    }

    /// Direct regular pages.
    pub fn pages(&self, map: &ContentMap) -> &[Arc<Page>] {
        self.pages.get_or_init(|| {
            let mut pages: Vec<_> = map
                .direct_pages(&self.owner_key)
                .into_iter()
                .filter(|p| p.should_list(false))
                .collect();
            sort_by_default(&mut pages);
            pages
        })
    }

    /// Direct child sections.
    pub fn sections(&self, map: &ContentMap) -> &[Arc<Page>] {
        self.sections.get_or_init(|| {
            let mut sections: Vec<_> = map
                .child_sections(&self.owner_key)
                .into_iter()
                .filter(|p| p.should_list(false))
                .collect();
            sort_by_default(&mut sections);
            sections
        })
    }

    /// Direct pages and sections.
    pub fn pages_and_sections(&self, map: &ContentMap) -> &[Arc<Page>] {
        self.pages_and_sections.get_or_init(|| {
            let mut all = self.pages(map).to_vec();
            all.extend(self.sections(map).iter().cloned());
            sort_by_default(&mut all);
            all
        })
    }
}

impl fmt::Debug for PagesBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagesBucket")
            .field("owner_key", &self.owner_key)
            .field("cascade", &self.cascade)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_cascade_child_overrides_parent() {
        let site = PagesBucket::site(params(&[("author", "Site"), ("layout", "base")]));
        let blog = PagesBucket::new(
            "/blog/".to_owned(),
            Some(&site),
            &params(&[("author", "Blog")]),
        );

        assert_eq!(
            blog.cascade(),
            &params(&[("author", "Blog"), ("layout", "base")])
        );
        assert_eq!(blog.owner_key(), "/blog/");
    }
}
