//! File-writer start and stop commands.
//!
//! The structure produced by [`super::NexusJsonWriter`] is wrapped in a
//! `FileWriter_new` command carrying the broker, job id and output file
//! name. The matching `FileWriter_stop` command shares the job id.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const DEFAULT_BROKER: &str = "localhost:9092";
pub const START_COMMAND: &str = "FileWriter_new";
pub const STOP_COMMAND: &str = "FileWriter_stop";

/// Options for [`create_writer_commands`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOptions {
    pub broker: String,
    /// Job id shared by both commands. Empty means generate one.
    pub job_id: String,
    /// Milliseconds since the Unix epoch.
    pub start_time: Option<i64>,
    /// Milliseconds since the Unix epoch.
    pub stop_time: Option<i64>,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            broker: DEFAULT_BROKER.to_string(),
            job_id: String::new(),
            start_time: None,
            stop_time: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileAttributes {
    pub file_name: String,
}

/// The `FileWriter_new` command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WriteCommand {
    pub cmd: String,
    pub broker: String,
    pub job_id: String,
    pub file_attributes: FileAttributes,
    pub nexus_structure: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
}

/// The `FileWriter_stop` command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopCommand {
    pub cmd: String,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<i64>,
}

/// Wraps a nexus structure in a start command and builds its stop command.
pub fn create_writer_commands(
    nexus_structure: Value,
    file_name: &str,
    opts: &CommandOptions,
) -> (WriteCommand, StopCommand) {
    let job_id = if opts.job_id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        opts.job_id.clone()
    };

    let write = WriteCommand {
        cmd: START_COMMAND.to_string(),
        broker: opts.broker.clone(),
        job_id: job_id.clone(),
        file_attributes: FileAttributes {
            file_name: file_name.to_string(),
        },
        nexus_structure,
        start_time: opts.start_time,
    };
    let stop = StopCommand {
        cmd: STOP_COMMAND.to_string(),
        job_id,
        stop_time: opts.stop_time,
    };
    (write, stop)
}
