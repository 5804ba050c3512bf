mod extract;
mod header;
mod names;
mod parse;
pub mod path;
mod reader;
mod record;
mod tree;

pub use extract::{ExtractError, ExtractOptions, ExtractProgress, ExtractStats};
pub use header::SfpHeader;
pub use names::NameTable;
pub use parse::{DecodeError, EntryFault};
pub use path::PathError;
pub use reader::{OpenError, SfpReader};
pub use record::{EntryKind, EntryRecord};
pub use tree::{EntrySet, TreeFault};
