//! `kiln inspect`: print the resolved configuration as JSON on stdout.

use crate::cli::InspectArgs;
use crate::commands::utils::Project;
use crate::config::Overrides;
use crate::error::Result;

pub async fn execute(args: InspectArgs) -> Result<()> {
    let project = Project::load(&args.common, &Overrides::default())?;
    let config = project.resolve()?;
    println!("{}", config.to_json()?);
    Ok(())
}
