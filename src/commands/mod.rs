//! CLI commands implementation

pub mod docs;
pub mod init;
pub mod ingest;
pub mod plan;
pub mod profile;
pub mod query;
pub mod regions;
pub mod status;

pub use docs::*;
pub use init::*;
pub use ingest::*;
pub use plan::*;
pub use profile::*;
pub use query::*;
pub use regions::*;
pub use status::*;
