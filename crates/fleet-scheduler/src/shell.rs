//! Build unit that runs each package's build command in a shell.

use std::time::Duration;

use fleet_util::process::CommandBuilder;

use crate::unit::{BuildOutcome, BuildRequest, BuildUnit};

/// Stdout marker a build command can print to report its own version.
pub const VERSION_MARKER: &str = "fleet:version=";

/// Number of trailing stderr lines kept in a failure reason.
const STDERR_TAIL: usize = 20;

/// Runs `sh -c <command>` in the package directory, which must exist.
///
/// The command may use `{name}`, `{path}` and `{version}` placeholders and
/// sees `FLEET_PACKAGE`, `FLEET_PACKAGE_PATH`, `FLEET_PACKAGE_TYPE`,
/// `FLEET_VERSION` and `FLEET_DEPENDENCIES` (a JSON array of
/// `{package, version}`) in its environment.
#[derive(Debug, Clone, Default)]
pub struct ShellBuildUnit {
    default_command: Option<String>,
    timeout: Option<Duration>,
    build_number: u64,
}

impl ShellBuildUnit {
    pub fn new(default_command: Option<String>, timeout: Option<Duration>, build_number: u64) -> Self {
        Self {
            default_command,
            timeout,
            build_number,
        }
    }

    fn command_for(&self, request: &BuildRequest, version: &str) -> Option<String> {
        let template = request
            .command
            .as_deref()
            .or(self.default_command.as_deref())?;
        Some(
            template
                .replace("{name}", &request.package)
                .replace("{path}", &request.path.display().to_string())
                .replace("{version}", version),
        )
    }

    async fn run(&self, request: BuildRequest) -> BuildOutcome {
        let version = request.version.resolve(self.build_number);
        let Some(script) = self.command_for(&request, &version) else {
            return BuildOutcome::failure(format!(
                "no build command configured for '{}'",
                request.package
            ));
        };

        let dependencies = match serde_json::to_string(&request.dependencies) {
            Ok(json) => json,
            Err(e) => return BuildOutcome::failure(format!("cannot encode dependencies: {e}")),
        };

        let is_dir = tokio::fs::metadata(&request.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return BuildOutcome::failure(format!(
                "package directory {} does not exist",
                request.path.display()
            ));
        }

        let cmd = CommandBuilder::shell(script)
            .env("FLEET_PACKAGE", request.package.as_str())
            .env("FLEET_PACKAGE_PATH", request.path.display().to_string())
            .env("FLEET_PACKAGE_TYPE", request.kind.as_str())
            .env("FLEET_VERSION", version.as_str())
            .env("FLEET_DEPENDENCIES", dependencies)
            .timeout(self.timeout)
            .cwd(&request.path);

        match cmd.exec().await {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                BuildOutcome::success(reported_version(&stdout).unwrap_or(version))
            }
            Ok(output) => {
                let status = match output.status.code() {
                    Some(code) => format!("exit status {code}"),
                    None => "terminated by signal".to_string(),
                };
                let stderr = String::from_utf8_lossy(&output.stderr);
                let tail = tail_lines(&stderr, STDERR_TAIL);
                if tail.is_empty() {
                    BuildOutcome::failure(format!("build command failed ({status})"))
                } else {
                    BuildOutcome::failure(format!("build command failed ({status}):\n{tail}"))
                }
            }
            Err(e) => BuildOutcome::failure(e.to_string()),
        }
    }
}

impl BuildUnit for ShellBuildUnit {
    async fn build(&self, request: BuildRequest) -> BuildOutcome {
        self.run(request).await
    }
}

/// The last `fleet:version=` value printed on stdout, if any.
fn reported_version(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .rev()
        .filter_map(|l| l.trim().strip_prefix(VERSION_MARKER))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
