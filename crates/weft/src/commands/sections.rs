//! `weft sections` command implementation.

use weft_content::{Metadata, Site};

use crate::error::CliError;
use crate::output::Output;
use crate::site::SiteArgs;

pub(crate) fn execute(args: &SiteArgs, output: &Output) -> Result<(), CliError> {
    let (_, sites) = args.build(output)?;
    for site in &sites {
        output.heading(&format!("[{}]", site.lang()))?;
        for (key, count, title) in section_rows(site) {
            output.line_with_detail(&format!("{key:<40} {count:>6}"), &title)?;
        }
        let main = match site.map().main_section() {
            Some(main) => format!("{} ({} pages)", main.name, main.page_count),
            None => "none".to_owned(),
        };
        output.line(&format!("main section: {main}"))?;
    }
    Ok(())
}

/// Section key, subtree page count and title, in key order.
fn section_rows(site: &Site) -> Vec<(String, usize, String)> {
    let map = site.map();
    map.sections()
        .iter()
        .map(|(key, node)| {
            let count = map.section_stats(key).map_or(0, |s| s.page_count);
            let title = node
                .page()
                .map(|p| p.title().to_owned())
                .unwrap_or_default();
            (key.clone(), count, title)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use weft_content::{SiteOptions, Sites};
    use weft_source::MockSource;

    use super::*;

    #[test]
    fn test_section_rows_count_subtree_pages() {
        let source = MockSource::new()
            .with_file("blog/a.md", "")
            .with_file("blog/b.md", "")
            .with_file("docs/_index.md", "---\ntitle: Manual\n---\n")
            .with_file("docs/intro.md", "");
        let sites = Sites::build(&source, &SiteOptions::default()).unwrap();
        let site = sites.default_site().unwrap();

        assert_eq!(
            section_rows(site),
            vec![
                ("/".to_owned(), 3, String::new()),
                ("/blog/".to_owned(), 2, "Blog".to_owned()),
                ("/docs/".to_owned(), 1, "Manual".to_owned()),
            ]
        );
        assert_eq!(site.map().main_section().unwrap().name, "blog");
    }
}
