use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use serde::Serialize;
use tracing::debug;

use super::GenerationError;

/// One request to the text-generation service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub max_tokens: u32,
}

/// The generation service. Transport and auth live behind this.
pub trait TextGenerator: Send + Sync {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, GenerationError>;
}

/// Runs an external command per request: the request goes to its stdin as one JSON
/// object, its stdout is the completion.
#[derive(Clone, Debug)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl TextGenerator for CommandGenerator {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, GenerationError> {
        let payload = serde_json::to_vec(request)?;
        debug!(command = %self.program, max_tokens = request.max_tokens, "sending completion request");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GenerationError::Launch {
                command: self.program.clone(),
                source,
            })?;
        // stdin is fed from its own thread while stdout drains, so a command that
        // answers as it reads cannot fill both pipes and stall
        let stdin = child.stdin.take();
        let (output, written) = thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(&payload), // dropped here, the command sees EOF
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            (output, written)
        });
        let output = output?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GenerationError::Service(if stderr.is_empty() {
                format!("`{}` exited with {}", self.program, output.status)
            } else {
                stderr
            }));
        }
        match written {
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e.into()),
            _ => {} // a command may answer without reading everything
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
