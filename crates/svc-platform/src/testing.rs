//! Scripted [`CommandRunner`] for tests.

use std::io;
use std::sync::Mutex;

use crate::command::{CommandOutput, CommandRunner};

#[derive(Debug, Clone)]
enum Response {
    Output(CommandOutput),
    SpawnError,
}

/// Records every invocation and answers from a table of scripted responses.
///
/// Commands without a scripted response succeed with empty output.
#[derive(Debug, Default)]
pub struct FakeRunner {
    responses: Mutex<Vec<(Vec<String>, Response)>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the output for an exact argv (program first), replacing any
    /// earlier script for the same argv.
    pub fn respond(&self, argv: &[&str], output: CommandOutput) {
        self.script(argv, Response::Output(output));
    }

    /// Make an exact argv fail to spawn, as if the program were missing.
    pub fn fail_spawn(&self, argv: &[&str]) {
        self.script(argv, Response::SpawnError);
    }

    fn script(&self, argv: &[&str], response: Response) {
        let key: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        responses.retain(|(k, _)| *k != key);
        responses.push((key, response));
    }

    /// Every invocation so far as argv vectors.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Every invocation so far, each joined with single spaces.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().into_iter().map(|argv| argv.join(" ")).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let mut argv = vec![program.to_string()];
        argv.extend(args.iter().map(|s| s.to_string()));
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(argv.clone());

        let responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        match responses.iter().find(|(k, _)| *k == argv) {
            Some((_, Response::Output(output))) => Ok(output.clone()),
            Some((_, Response::SpawnError)) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: command not found", program),
            )),
            None => Ok(ok("")),
        }
    }
}

/// Successful exit with the given stdout.
pub fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        success: true,
        exit_code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

/// Exit with a code; `0` counts as success.
pub fn exit(code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        success: code == 0,
        exit_code: Some(code),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}
