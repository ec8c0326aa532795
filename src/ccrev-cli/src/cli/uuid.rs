//! Uuid command CLI definitions

use clap::Subcommand;

#[derive(Subcommand)]
pub enum UuidCommand {
    /// Expand a 22-character short id to the canonical 36-character form
    Decode {
        /// Short id (e.g. fcmR3XADNLgJ1ByKhqcC5Z)
        id: String,
    },

    /// Compress a canonical uuid to the 23-character form
    Compress {
        /// Canonical uuid (e.g. fc991dd7-0033-4b80-9d41-c8a86a702e59)
        id: String,
    },

    /// Expand a compressed id to its intermediate hex form
    Decompress {
        /// Compressed id
        id: String,
    },

    /// Turn a 23-character compressed id into a 22-character short id
    Shorten {
        /// Compressed id (e.g. fc991AAECAwQFBgcICQoLDA0ODw)
        id: String,
    },
}
