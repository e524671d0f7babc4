//! `weft check` command implementation.

use crate::error::CliError;
use crate::output::Output;
use crate::site::SiteArgs;

pub(crate) fn execute(args: &SiteArgs, output: &Output) -> Result<(), CliError> {
    let (config, sites) = args.build(output)?;
    if let Some(path) = &config.config_path {
        output.info(&format!("Config: {}", path.display()));
    }

    for site in &sites {
        let report = site.report();
        output.info(&format!(
            "[{}] {} sections, {} pages, {} resources, {} excluded",
            site.lang(),
            report.sections,
            report.pages,
            report.resources,
            report.excluded
        ));
    }
    output.success(&format!("All {} sites assembled", sites.len()));
    Ok(())
}
