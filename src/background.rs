use std::path::Path;

use crate::context::Context;
use crate::error::ArtwallResult;
use crate::template;

/// Apply `path` as the wallpaper via the configured set command.
///
/// The command is templated with `{0}`/`{out}`/`{output}` bound to the file
/// path on top of the live variables. A failing command is logged and not
/// retried; the cycle still counts as complete.
pub fn set_background(path: &Path, ctx: &Context) -> ArtwallResult<()> {
    tracing::debug!(path = %path.display(), "setting background");

    let mut vars = ctx.variables.clone();
    let rendered = path.display().to_string();
    for key in ["0", "out", "output"] {
        vars.insert(key.to_string(), serde_json::Value::String(rendered.clone()));
    }

    let command = template::substitute(&ctx.config.set_command, &vars)?;
    run_shell(&command);
    Ok(())
}

/// Restore the default wallpaper via the configured reset command.
pub fn reset_background(ctx: &Context) {
    tracing::debug!("resetting background");
    run_shell(&ctx.config.reset_command);
}

fn run_shell(command: &str) {
    match std::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .status()
    {
        Ok(status) if status.success() => {}
        Ok(status) => {
            tracing::warn!(%command, %status, "wallpaper command failed");
        }
        Err(err) => {
            tracing::warn!(%command, error = %err, "wallpaper command could not be spawned");
        }
    }
}
