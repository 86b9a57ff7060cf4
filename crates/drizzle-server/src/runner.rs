//! drizzle-kit subprocess invocation.
//!
//! The migration tools are a thin layer over `npx drizzle-kit <verb>`. The
//! subprocess runs in the config file's directory so drizzle-kit resolves
//! the project's `node_modules` and relative schema/out paths. Output is
//! returned verbatim, never parsed. No timeout is imposed.

use crate::error::ServerError;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Run `npx drizzle-kit <verb> --config <config_path>` and return combined
/// stdout+stderr. Non-zero exit propagates as [`ServerError::Subprocess`].
pub async fn run_drizzle_kit(
    verb: &'static str,
    config_path: &Path,
    cwd: &Path,
    extra_args: &[&str],
) -> Result<String, ServerError> {
    debug!(verb, config = %config_path.display(), "spawning drizzle-kit");

    let output = Command::new("npx")
        .arg("drizzle-kit")
        .arg(verb)
        .arg("--config")
        .arg(config_path)
        .args(extra_args)
        .current_dir(cwd)
        .output()
        .await?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        return Err(ServerError::Subprocess {
            verb,
            status: output.status.to_string(),
            stderr: stderr.into_owned(),
        });
    }

    Ok(format!("{stdout}{stderr}"))
}
