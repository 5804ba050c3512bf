use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Read, Seek};

use crate::parse::{DecodeError, EntryFault};
use crate::record::EntryRecord;

/// An offset whose record could not be decoded. Its subtree is not part of the set.
#[derive(Debug)]
pub struct TreeFault {
    pub offset: u64,
    pub error: DecodeError,
}

/// Every entry reachable from the root, keyed by the offset it was decoded from.
///
/// Iteration follows discovery order, which puts every directory before its children.
#[derive(Debug, Default)]
pub struct EntrySet {
    entries: HashMap<u64, EntryRecord>,
    order: Vec<u64>,
    faults: Vec<TreeFault>,
}

/// Pending record offsets plus every offset ever queued.
///
/// Queued offsets are kept as merged half-open ranges, one map per alignment class
/// (`offset % 80`), so a child range shared by many directories is walked once.
#[derive(Debug, Default)]
struct Queue {
    stack: Vec<u64>,
    claimed: HashMap<u64, BTreeMap<u64, u64>>,
    past_end: HashSet<u64>,
}

impl Queue {
    /// Mark the record offsets in `[start, end)` as queued and return the ones that were
    /// not queued before, in ascending order. `end - start` must be a multiple of 80.
    fn claim(&mut self, start: u64, end: u64) -> Vec<u64> {
        let size = EntryRecord::SIZE as u64;
        let mut fresh = Vec::new();
        if start >= end {
            return fresh;
        }

        let ranges = self.claimed.entry(start % size).or_default();
        let (mut merged_start, mut merged_end) = (start, end);
        let mut cursor = start;

        if let Some((&a, &b)) = ranges.range(..start).next_back() {
            if b >= start {
                ranges.remove(&a);
                merged_start = a;
                merged_end = merged_end.max(b);
                cursor = cursor.max(b);
            }
        }

        let overlapping: Vec<(u64, u64)> = ranges
            .range(start..=end)
            .map(|(&a, &b)| (a, b))
            .collect();
        for (a, b) in overlapping {
            ranges.remove(&a);
            if a > cursor {
                fresh.extend((cursor..a).step_by(EntryRecord::SIZE));
            }
            cursor = cursor.max(b);
            merged_end = merged_end.max(b);
        }
        if end > cursor {
            fresh.extend((cursor..end).step_by(EntryRecord::SIZE));
        }

        ranges.insert(merged_start, merged_end);
        fresh
    }
}

impl EntrySet {
    /// Walk the tree starting at `root`.
    ///
    /// A root that does not decode is an error. Any other record that does not decode is
    /// kept as a [`TreeFault`] and traversal carries on with its siblings.
    pub(crate) fn build<R: Read + Seek>(
        reader: &mut R,
        root: u64,
        archive_len: u64,
    ) -> Result<EntrySet, DecodeError> {
        let mut set = EntrySet::default();
        let mut queue = Queue::default();

        let root_record = EntryRecord::read_at(reader, root)?;
        queue.claim(root, root + EntryRecord::SIZE as u64);
        set.push_children(&root_record, archive_len, &mut queue);
        set.insert(root_record);

        while let Some(offset) = queue.stack.pop() {
            match EntryRecord::read_at(reader, offset) {
                Ok(record) => {
                    set.push_children(&record, archive_len, &mut queue);
                    set.insert(record);
                }
                Err(error) => {
                    tracing::warn!(offset = format_args!("{:#x}", offset), %error, "skipping entry");
                    set.faults.push(TreeFault { offset, error });
                }
            }
        }

        tracing::debug!(
            root = format_args!("{:#x}", root),
            entries = set.entries.len(),
            faults = set.faults.len(),
            "built entry tree"
        );

        Ok(set)
    }

    fn insert(&mut self, record: EntryRecord) {
        self.order.push(record.offset);
        self.entries.insert(record.offset, record);
    }

    // Only offsets never queued before are pushed, in reverse so they pop in archive order.
    fn push_children(&mut self, record: &EntryRecord, archive_len: u64, queue: &mut Queue) {
        if !record.is_dir() {
            return;
        }

        let size = EntryRecord::SIZE as u64;
        let start = record.start_offset;
        let wanted = (u64::from(record.data_length) + size - 1) / size;
        let fits = match start.checked_add(size) {
            Some(end) if end <= archive_len => (archive_len - end) / size + 1,
            _ => 0,
        };
        let count = wanted.min(fits);

        let fresh = queue.claim(start, start + count * size);
        queue.stack.extend(fresh.into_iter().rev());

        if count == wanted {
            return;
        }

        // Everything from here on lies past the end of the archive.
        let child = start + count * size;
        if !queue.past_end.insert(child) {
            return;
        }
        self.faults.push(TreeFault {
            offset: child,
            error: DecodeError::MalformedEntry {
                offset: child,
                fault: EntryFault::Truncated {
                    available: archive_len.saturating_sub(child) as usize,
                    expected: EntryRecord::SIZE,
                },
            },
        });
        tracing::warn!(
            parent = format_args!("{:#x}", record.offset),
            offset = format_args!("{:#x}", child),
            "child records run past the end of the archive"
        );
    }

    #[inline(always)]
    pub fn get(&self, offset: u64) -> Option<&EntryRecord> {
        self.entries.get(&offset)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &EntryRecord> {
        self.order.iter().filter_map(move |offset| self.entries.get(offset))
    }

    pub fn faults(&self) -> &[TreeFault] {
        &self.faults
    }

    #[cfg(test)]
    pub(crate) fn from_records(records: Vec<EntryRecord>) -> EntrySet {
        let mut set = EntrySet::default();
        for record in records {
            set.insert(record);
        }
        set
    }
}
