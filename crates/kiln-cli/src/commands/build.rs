//! `kiln build`: resolve, compile, write.

use std::time::Instant;

use crate::cli::BuildArgs;
use crate::commands::utils::{self, Project};
use crate::config::Overrides;
use crate::error::Result;
use crate::ui;

/// Execute the build command.
///
/// 1. Load settings (CLI > Env > File > Defaults) and resolve the build
///    configuration for the selected mode
/// 2. Clean the output directory if requested
/// 3. Compile, then write every output file as one set
/// 4. Print a per-file summary
pub async fn execute(args: BuildArgs) -> Result<()> {
    let start = Instant::now();

    let project = Project::load(&args.common, &Overrides::default())?;
    let config = project.resolve()?;
    ui::info(&format!(
        "Building {} in {} mode",
        project.root.display(),
        config.mode
    ));

    let out_dir = config.output.path.clone();
    if args.clean {
        ui::info(&format!("Cleaning output directory: {}", out_dir.display()));
        utils::clean_output_dir(&out_dir, &config.context)?;
    }

    let output = utils::compile_and_write(config).await?;

    ui::print_build_summary(&utils::summary_rows(&output), start.elapsed());
    ui::success(&format!(
        "Build completed in {}",
        ui::format_duration(start.elapsed())
    ));
    Ok(())
}
