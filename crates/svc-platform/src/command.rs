//! Native service-manager invocation.
//!
//! Every call to `launchctl`, `systemctl` or `sc.exe` goes through a
//! [`CommandRunner`], so controllers can be exercised without touching the
//! real service manager.

use std::io;
use std::process::{Command, Output};

use tracing::debug;

use crate::error::StageError;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited with status 0.
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    fn failure_detail(&self) -> String {
        let code = match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            code
        } else {
            format!("{}: {}", code, stderr)
        }
    }
}

/// Runs an external program to completion and captures its output.
///
/// An `Err` means the program could not be spawned at all; a non-zero exit is
/// reported through [`CommandOutput::success`].
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput>;
}

/// Spawns real processes with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        debug!(program = %program, args = ?args, "executing service manager command");
        let output = Command::new(program).args(args).output()?;
        let result = CommandOutput::from_output(output);
        debug!(
            program = %program,
            exit_code = ?result.exit_code,
            "service manager command finished"
        );
        Ok(result)
    }
}

pub(crate) fn display_command(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Run a command and require a zero exit status.
pub fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<CommandOutput, StageError> {
    let command = display_command(program, args);
    let output = runner
        .run(program, args)
        .map_err(|e| StageError::NativeCommandFailed {
            command: command.clone(),
            detail: e.to_string(),
        })?;

    if !output.success {
        return Err(StageError::NativeCommandFailed {
            command,
            detail: output.failure_detail(),
        });
    }
    Ok(output)
}

/// Run a command whose failure does not matter to the caller.
pub fn run_ignored(runner: &dyn CommandRunner, program: &str, args: &[&str]) {
    if let Err(e) = run_checked(runner, program, args) {
        debug!("ignoring failure: {}", e);
    }
}

/// Run a query command, mapping spawn failures and non-zero exits to `None`.
pub fn run_query(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Option<CommandOutput> {
    match runner.run(program, args) {
        Ok(output) if output.success => Some(output),
        Ok(output) => {
            debug!(
                "`{}` reported {}",
                display_command(program, args),
                output.failure_detail()
            );
            None
        }
        Err(e) => {
            debug!("`{}` could not run: {}", display_command(program, args), e);
            None
        }
    }
}
