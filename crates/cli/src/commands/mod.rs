pub mod config;
pub mod doctor;
pub mod gate;

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct FailureEnvelope<'a> {
    command: &'a str,
    status: &'a str,
    error_class: &'a str,
    message: String,
}

impl CommandResult {
    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let envelope = FailureEnvelope {
            command,
            status: "error",
            error_class,
            message: message.into(),
        };
        let output = serde_json::to_string(&envelope).unwrap_or_else(|error| {
            format!("command `{command}` failed and the failure could not be serialized: {error}")
        });
        Self { exit_code, output }
    }
}
