//! `kiln dev`: build, serve, watch, reload.

use std::sync::Arc;
use std::time::{Duration, Instant};

use kiln_config::WatchOptions;
use tokio::signal;

use crate::cli::DevArgs;
use crate::commands::utils::{self, Project};
use crate::config::Overrides;
use crate::dev::{self, DevEvent, DevServerState, FileChange, FileWatcher, SharedState, WatchFilter};
use crate::error::Result;
use crate::ui;

/// Everything under `src/` triggers a rebuild.
const SOURCE_PATTERN: &str = "src/**/*";

const DEBOUNCE: Duration = Duration::from_millis(100);

/// Execute the dev command.
///
/// 1. Load settings and run an initial build; a failure here is fatal
/// 2. Serve the output directory on localhost
/// 3. Open the browser if the `open` setting is on
/// 4. Loop until Ctrl+C:
///    - watched markup: rebuild, then send `content-changed`
///    - other sources: rebuild, then send `ok` or `errors`
pub async fn execute(args: DevArgs) -> Result<()> {
    ui::info("Starting development server...");

    let project = Project::load(&args.common, &Overrides::dev(args.port, args.no_open))?;
    let config = project.resolve()?;
    let descriptor = config.dev_server.clone();
    let state: SharedState = Arc::new(DevServerState::from_descriptor(&descriptor));

    ui::info(&format!("Performing initial {} build...", config.mode));
    let duration_ms = rebuild(&project, &state).await?;
    ui::success(&format!("Initial build completed in {}ms", duration_ms));

    let markup = WatchFilter::new(
        &config.context,
        &descriptor.watch.patterns,
        descriptor.watch.options,
    )?;
    let sources = WatchFilter::new(
        &config.context,
        &[SOURCE_PATTERN.to_string()],
        WatchOptions::default(),
    )?;
    let (_markup_watcher, mut markup_rx) = FileWatcher::new(markup.clone(), DEBOUNCE)?;
    let (source_watcher, mut source_rx) = FileWatcher::new(sources, DEBOUNCE)?;
    ui::info(&format!(
        "Watching {} for changes",
        source_watcher.root().display()
    ));

    let listener = dev::bind(descriptor.port).await?;
    let url = format!("http://localhost:{}", descriptor.port);
    let mut server_handle = tokio::spawn(dev::serve(listener, state.clone()));
    ui::success(&format!(
        "Serving {} at {}",
        descriptor.content_base.display(),
        url
    ));

    if descriptor.open {
        open_browser(&url);
    }

    ui::info("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            Some(change) = markup_rx.recv() => {
                announce(&change);
                if let Err(e) = rebuild(&project, &state).await {
                    report_failure(&state, e.to_string());
                }
                state.broadcast(&DevEvent::ContentChanged);
            }

            Some(change) = source_rx.recv() => {
                // Markup changes are handled by the markup watcher.
                if markup.matches(change.path()) {
                    continue;
                }
                announce(&change);
                match rebuild(&project, &state).await {
                    Ok(duration_ms) => {
                        ui::success(&format!("Rebuild completed in {}ms", duration_ms));
                        state.broadcast(&DevEvent::Ok);
                    }
                    Err(e) => report_failure(&state, e.to_string()),
                }
            }

            _ = signal::ctrl_c() => {
                ui::info("Shutting down development server...");
                break;
            }

            result = &mut server_handle => {
                match result {
                    Ok(Err(e)) => ui::error(&format!("Server error: {}", e)),
                    Err(e) => ui::error(&format!("Server task failed: {}", e)),
                    Ok(Ok(())) => ui::warning("Server stopped unexpectedly"),
                }
                break;
            }
        }
    }

    ui::success("Development server stopped");
    Ok(())
}

/// Resolve, compile and write one build. Templates are rescanned, so added
/// and removed pages take effect.
async fn rebuild(project: &Project, state: &SharedState) -> Result<u64> {
    let start = Instant::now();
    state.start_build();

    let result = async {
        let config = project.resolve()?;
        let output = utils::compile_and_write(config).await?;
        Ok::<_, crate::error::CliError>(output.len())
    }
    .await;

    match result {
        Ok(files) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            state.complete_build(duration_ms);
            tracing::debug!(files, duration_ms, "rebuilt");
            Ok(duration_ms)
        }
        Err(e) => {
            state.fail_build(e.to_string());
            Err(e)
        }
    }
}

fn report_failure(state: &SharedState, message: String) {
    ui::error(&format!("Rebuild failed: {}", message));
    state.broadcast(&DevEvent::Errors(vec![message]));
}

fn announce(change: &FileChange) {
    ui::info(&format!("File {}: {}", change.verb(), change.path().display()));
}

/// Open `url` in the default browser.
fn open_browser(url: &str) {
    use std::process::Command;

    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    match result {
        Ok(_) => ui::info(&format!("Opened browser at {}", url)),
        Err(e) => ui::warning(&format!("Failed to open browser: {}", e)),
    }
}
