//! NeXus JSON: reading instruments from, and writing them to, the
//! file-writer's JSON description of a NeXus file.
//!
//! # Reading
//!
//! [`read_instrument`] walks `nexus_structure.children[0].children`, creating
//! a component for each group with a component `NX_class`. Transformations
//! and shapes are read by [`transformation_reader`] and [`shape_reader`].
//! Problems are collected in a [`crate::validation::ValidationReport`]
//! rather than aborting the load.
//!
//! # Writing
//!
//! [`instrument_to_tree`] turns an instrument into a generic [`Group`] tree,
//! [`NexusJsonWriter`] renders that tree (with optional stream and link
//! substitution and truncation), and [`create_writer_commands`] wraps it in
//! the file-writer's start/stop commands.

pub mod commands;
pub mod config;
pub mod encode;
pub mod node;
pub mod reader;
pub mod shape_reader;
pub mod transformation_reader;
pub mod writer;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::NexusError;
use crate::model::Instrument;

pub use commands::{create_writer_commands, CommandOptions, StopCommand, WriteCommand};
pub use config::{load_writer_config, WriterConfig};
pub use encode::{instrument_to_tree, transformation_path};
pub use reader::{read_instrument, resolve_depends_on_path, ReadOptions, ReadOutcome};
pub use writer::{Attribute, Dataset, Group, NexusJsonWriter, Node, DEFAULT_TRUNCATION};

/// Reads an instrument from a JSON string.
///
/// # Errors
/// Returns an error if the text is not JSON or not an instrument document.
pub fn from_json_str(json: &str, opts: &ReadOptions) -> Result<ReadOutcome, NexusError> {
    let document: Value = serde_json::from_str(json).map_err(|source| NexusError::JsonParse {
        path: "<string>".into(),
        source,
    })?;
    read_instrument(&document, opts)
}

/// Reads an instrument from JSON bytes.
pub fn from_json_slice(bytes: &[u8], opts: &ReadOptions) -> Result<ReadOutcome, NexusError> {
    let document: Value = serde_json::from_slice(bytes).map_err(|source| NexusError::JsonParse {
        path: "<bytes>".into(),
        source,
    })?;
    read_instrument(&document, opts)
}

/// Reads an instrument from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read, is not JSON, or is not an
/// instrument document.
pub fn read_json_file(path: &Path, opts: &ReadOptions) -> Result<ReadOutcome, NexusError> {
    let bytes = fs::read(path)?;
    let document: Value =
        serde_json::from_slice(&bytes).map_err(|source| NexusError::JsonParse {
            path: path.to_path_buf(),
            source,
        })?;
    read_instrument(&document, opts)
}

/// The full `{"nexus_structure": ...}` document for an instrument.
pub fn instrument_document(instrument: &Instrument, writer: &NexusJsonWriter) -> Value {
    serde_json::json!({ "nexus_structure": writer.structure(&instrument_to_tree(instrument)) })
}

/// Writes an instrument to a pretty-printed JSON string.
pub fn to_json_string(
    instrument: &Instrument,
    writer: &NexusJsonWriter,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&instrument_document(instrument, writer))
}

/// Writes an instrument to a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_json_file(
    path: &Path,
    instrument: &Instrument,
    writer: &NexusJsonWriter,
) -> Result<(), NexusError> {
    write_pretty(path, &instrument_document(instrument, writer))
}

/// Writes the start and stop commands as a two-element JSON array.
pub fn write_commands_file(
    path: &Path,
    write: &WriteCommand,
    stop: &StopCommand,
) -> Result<(), NexusError> {
    write_pretty(path, &(write, stop))
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), NexusError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value).map_err(|source| NexusError::JsonWrite {
        path: path.to_path_buf(),
        source,
    })
}
