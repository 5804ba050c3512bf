#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Entry chain is broken at offset {offset:#x}: no {missing} at {target:#x}.")]
    BrokenEntryChain {
        offset: u64,
        missing: Missing,
        target: u64,
    },

    #[error("Parent chain of entry {0:#x} never reaches the root.")]
    CycleDetected(u64),

    #[error("Entry {offset:#x} has an unusable name {name:?}.")]
    UnsafeName { offset: u64, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Entry,
    Name,
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Missing::Entry => "entry",
            Missing::Name => "name",
        })
    }
}
