//! Default page order.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::page::{Content, Dated, Metadata, Page, TreeNavigation};

/// Compare two pages in default order.
///
/// Taxonomy ordinal, then weight (zero sorts last), then date (newest
/// first), then link title, then source filename (pages without a file
/// first). Remaining ties fall back to the tree key so the order is total.
#[must_use]
pub fn default_cmp(a: &Page, b: &Page) -> Ordering {
    let ordinal = |p: &Page| p.view_info().map(|v| v.ordinal);
    if let (Some(oa), Some(ob)) = (ordinal(a), ordinal(b))
        && oa != ob
    {
        return oa.cmp(&ob);
    }

    weight_cmp(a.weight(), b.weight())
        .then_with(|| {
            let ts = |p: &Page| p.date().map(|d| d.timestamp());
            ts(b).cmp(&ts(a))
        })
        .then_with(|| compare_titles(a.link_title(), b.link_title()))
        .then_with(|| match (a.file(), b.file()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(fa), Some(fb)) => fa.filename().cmp(fb.filename()),
        })
        .then_with(|| a.key().cmp(b.key()))
}

fn weight_cmp(a: i32, b: i32) -> Ordering {
    match (a, b) {
        _ if a == b => Ordering::Equal,
        (_, 0) => Ordering::Less,
        (0, _) => Ordering::Greater,
        _ => a.cmp(&b),
    }
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Stable sort in default order.
pub fn sort_by_default(pages: &mut [Arc<Page>]) {
    pages.sort_by(|a, b| default_cmp(a, b));
}
