//! `weft tree` command implementation.

use std::ops::ControlFlow;

use weft_content::{Metadata, Site, TreeNavigation};

use crate::error::CliError;
use crate::output::Output;
use crate::site::SiteArgs;

pub(crate) fn execute(args: &SiteArgs, output: &Output) -> Result<(), CliError> {
    let (_, sites) = args.build(output)?;
    for site in &sites {
        output.heading(&format!("[{}]", site.lang()))?;
        for line in render(site) {
            output.line(&line)?;
        }
    }
    Ok(())
}

/// One line per rendered node, indented by nesting depth.
fn render(site: &Site) -> Vec<String> {
    let map = site.map();
    let mut lines = Vec::new();
    map.walk_renderable(|_, page| {
        let depth = std::iter::successors(page.parent(map), |p| p.parent(map)).count();
        lines.push(format!(
            "{}{} {} \"{}\"",
            "  ".repeat(depth),
            page.kind(),
            page.key(),
            page.title()
        ));
        ControlFlow::Continue(())
    });
    lines
}
