//! Asset identifier command handlers

use crate::cli::UuidCommand;
use anyhow::Result;
use ccrev::uuid_codec::{self, UuidForm};

/// Handle a uuid subcommand, printing the converted identifier
pub fn handle(command: UuidCommand) -> Result<()> {
    let (input, output) = convert(&command);
    if output == input {
        tracing::warn!(
            "{} was returned unchanged ({})",
            input,
            UuidForm::classify(input).map_or("unrecognized form", |f| f.name())
        );
    }
    println!("{}", output);
    Ok(())
}

fn convert(command: &UuidCommand) -> (&str, String) {
    match command {
        UuidCommand::Decode { id } => (id.as_str(), uuid_codec::decode(id)),
        UuidCommand::Compress { id } => (id.as_str(), uuid_codec::compress(id)),
        UuidCommand::Decompress { id } => (id.as_str(), uuid_codec::decompress(id)),
        UuidCommand::Shorten { id } => (id.as_str(), uuid_codec::shorten_from_compressed(id)),
    }
}
