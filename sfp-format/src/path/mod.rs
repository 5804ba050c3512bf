//! Rebuilding entry paths from parent links.
//!
//! Entries only know their parent's offset and their own name offset. A path is
//! recovered by walking parents up to the root, which is the entry that is its own
//! parent. The root contributes no name, so its path is empty and it maps onto the
//! extraction directory itself.

use relative_path::RelativePathBuf;

use crate::names::NameTable;
use crate::tree::EntrySet;

mod error;

pub use self::error::{Missing, PathError};

/// The archive-relative path of the entry at `offset`.
///
/// The walk is bounded by the number of entries, so a parent chain without a root
/// fails with [`PathError::CycleDetected`] instead of looping.
pub fn entry_path(
    entries: &EntrySet,
    names: &NameTable,
    offset: u64,
) -> Result<RelativePathBuf, PathError> {
    let mut current = entries.get(offset).ok_or(PathError::BrokenEntryChain {
        offset,
        missing: Missing::Entry,
        target: offset,
    })?;
    let mut parts = Vec::new();
    let mut steps = 0usize;

    while !current.is_root() {
        if steps == entries.len() {
            return Err(PathError::CycleDetected(offset));
        }
        steps += 1;

        if current.name_offset != 0 {
            let name = names
                .get(current.name_offset)
                .ok_or(PathError::BrokenEntryChain {
                    offset: current.offset,
                    missing: Missing::Name,
                    target: current.name_offset,
                })?;
            check_component(current.offset, name)?;
            parts.push(name);
        }

        let parent = current.parent_offset;
        current = entries.get(parent).ok_or(PathError::BrokenEntryChain {
            offset: current.offset,
            missing: Missing::Entry,
            target: parent,
        })?;
    }

    let mut path = RelativePathBuf::new();
    for part in parts.iter().rev() {
        path.push(part);
    }
    Ok(path)
}

/// Reject names that would not stay a single component under the extraction directory.
fn check_component(offset: u64, name: &str) -> Result<(), PathError> {
    use unic_ucd::GeneralCategory;

    let unsafe_char = name.chars().any(|c| {
        let cat = GeneralCategory::of(c);
        c == '/'
            || c == '\\'
            || (cfg!(windows) && c == ':')
            || cat == GeneralCategory::Control
            || (cat.is_separator() && c != ' ')
    });

    if name.is_empty() || name == "." || name == ".." || unsafe_char {
        return Err(PathError::UnsafeName {
            offset,
            name: name.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{EntryKind, EntryRecord};
    use std::path::Path;

    const NAMES: &[u8] = b"data\0a.txt\0..\0bad\x07\0";
    const BASE: u64 = 0x1000;
    const DATA: u64 = BASE;
    const A_TXT: u64 = BASE + 5;
    const DOTDOT: u64 = BASE + 11;
    const BELL: u64 = BASE + 14;

    fn dir(offset: u64, name: u64, parent: u64) -> EntryRecord {
        EntryRecord::test_entry(offset, EntryKind::Directory, name, parent, 0, 0)
    }

    fn file(offset: u64, name: u64, parent: u64) -> EntryRecord {
        EntryRecord::test_entry(offset, EntryKind::File, name, parent, 0, 0)
    }

    fn names() -> NameTable {
        NameTable::parse(BASE, NAMES)
    }

    #[test]
    fn root_maps_to_destination() {
        let entries = EntrySet::from_records(vec![dir(64, 0, 64)]);
        let path = entry_path(&entries, &names(), 64).unwrap();
        assert_eq!(path.as_str(), "");
        assert_eq!(path.to_path("/out"), Path::new("/out"));
    }

    #[test]
    fn root_name_is_not_part_of_paths() {
        let entries = EntrySet::from_records(vec![dir(64, DATA, 64), file(144, A_TXT, 64)]);
        assert_eq!(entry_path(&entries, &names(), 64).unwrap().as_str(), "");
        assert_eq!(entry_path(&entries, &names(), 144).unwrap().as_str(), "a.txt");
    }

    #[test]
    fn nested_path_is_root_to_leaf() {
        let entries = EntrySet::from_records(vec![
            dir(64, 0, 64),
            dir(144, DATA, 64),
            file(224, A_TXT, 144),
        ]);
        let path = entry_path(&entries, &names(), 224).unwrap();
        assert_eq!(path.as_str(), "data/a.txt");
        assert_eq!(
            path.to_path("/out"),
            Path::new("/out").join("data").join("a.txt")
        );
    }

    #[test]
    fn unnamed_entries_add_no_component() {
        let entries = EntrySet::from_records(vec![
            dir(64, 0, 64),
            dir(144, 0, 64),
            file(224, A_TXT, 144),
        ]);
        let path = entry_path(&entries, &names(), 224).unwrap();
        assert_eq!(path.as_str(), "a.txt");
    }

    #[test]
    fn dangling_parent_is_broken_chain() {
        let entries = EntrySet::from_records(vec![dir(64, 0, 64), file(144, A_TXT, 999)]);
        assert_eq!(
            entry_path(&entries, &names(), 144),
            Err(PathError::BrokenEntryChain {
                offset: 144,
                missing: Missing::Entry,
                target: 999
            })
        );
    }

    #[test]
    fn dangling_name_is_broken_chain() {
        let entries = EntrySet::from_records(vec![dir(64, 0, 64), file(144, 0x42, 64)]);
        assert_eq!(
            entry_path(&entries, &names(), 144),
            Err(PathError::BrokenEntryChain {
                offset: 144,
                missing: Missing::Name,
                target: 0x42
            })
        );
    }

    #[test]
    fn parent_cycle_is_detected() {
        let entries = EntrySet::from_records(vec![
            dir(64, 0, 64),
            dir(144, DATA, 224),
            dir(224, DATA, 144),
            file(304, A_TXT, 144),
        ]);
        assert_eq!(
            entry_path(&entries, &names(), 304),
            Err(PathError::CycleDetected(304))
        );
    }

    #[test]
    fn escaping_names_are_rejected() {
        let entries = EntrySet::from_records(vec![
            dir(64, 0, 64),
            dir(144, DOTDOT, 64),
            file(224, BELL, 64),
        ]);
        assert!(matches!(
            entry_path(&entries, &names(), 144),
            Err(PathError::UnsafeName { offset: 144, .. })
        ));
        assert!(matches!(
            entry_path(&entries, &names(), 224),
            Err(PathError::UnsafeName { offset: 224, .. })
        ));
    }

    #[test]
    fn separators_in_names_are_rejected() {
        for name in &["a/b", "a\\b", "line\u{2028}break", "", ".", ".."] {
            assert!(check_component(1, name).is_err(), "{:?}", name);
        }
        assert!(check_component(1, "my file.txt").is_ok());
    }

    #[test]
    fn colon_is_only_rejected_on_windows() {
        assert_eq!(check_component(1, "foo:bar.txt").is_err(), cfg!(windows));
    }
}
