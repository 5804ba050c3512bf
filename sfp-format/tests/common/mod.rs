//! Builds small SFP archives in memory for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

pub const HEADER_SIZE: u64 = 64;
pub const RECORD_SIZE: u64 = 80;
pub const ROOT: usize = 0;

// Byte positions inside an entry record.
pub const PARENT_FIELD: u64 = 16;
pub const IS_DIR_FIELD: u64 = 24;
pub const START_FIELD: u64 = 68;

enum Kind {
    Dir(Vec<usize>),
    File(Vec<u8>),
}

struct Node {
    name: Option<String>,
    parent: usize,
    kind: Kind,
}

pub struct Built {
    pub bytes: Vec<u8>,
    /// Record offset of every node, indexed by the id returned from the builder.
    pub offsets: Vec<u64>,
}

impl Built {
    pub fn patch_u32(&mut self, node: usize, field: u64, value: u32) {
        let at = (self.offsets[node] + field) as usize;
        self.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn patch_u64(&mut self, node: usize, field: u64, value: u64) {
        let at = (self.offsets[node] + field) as usize;
        self.bytes[at..at + 8].copy_from_slice(&value.to_le_bytes());
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, &self.bytes).unwrap();
        path
    }
}

/// Lays out the root at offset 64, then every directory's children as one contiguous
/// block in breadth-first order, then the name table, then the payloads.
pub struct ArchiveBuilder {
    nodes: Vec<Node>,
}

impl ArchiveBuilder {
    pub fn new() -> ArchiveBuilder {
        ArchiveBuilder {
            nodes: vec![Node {
                name: None,
                parent: ROOT,
                kind: Kind::Dir(Vec::new()),
            }],
        }
    }

    pub fn dir(&mut self, parent: usize, name: &str) -> usize {
        self.add(parent, name, Kind::Dir(Vec::new()))
    }

    pub fn file(&mut self, parent: usize, name: &str, data: &[u8]) -> usize {
        self.add(parent, name, Kind::File(data.to_vec()))
    }

    fn add(&mut self, parent: usize, name: &str, kind: Kind) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            name: Some(name.to_string()),
            parent,
            kind,
        });
        match &mut self.nodes[parent].kind {
            Kind::Dir(children) => children.push(id),
            Kind::File(_) => panic!("parent {} is a file", parent),
        }
        id
    }

    pub fn build(&self) -> Built {
        let n = self.nodes.len();
        let mut offsets = vec![0u64; n];
        let mut next = HEADER_SIZE;
        offsets[ROOT] = next;
        next += RECORD_SIZE;

        let mut queue = VecDeque::from(vec![ROOT]);
        while let Some(id) = queue.pop_front() {
            if let Kind::Dir(children) = &self.nodes[id].kind {
                for &child in children {
                    offsets[child] = next;
                    next += RECORD_SIZE;
                    queue.push_back(child);
                }
            }
        }

        let name_table = next;
        let mut names = Vec::new();
        let mut name_offsets = vec![0u64; n];
        for (id, node) in self.nodes.iter().enumerate() {
            if let Some(name) = &node.name {
                name_offsets[id] = name_table + names.len() as u64;
                names.extend_from_slice(name.as_bytes());
                names.push(0);
            }
        }

        let data_offset = name_table + names.len() as u64;
        let mut data = Vec::new();
        let mut starts = vec![0u64; n];
        for (id, node) in self.nodes.iter().enumerate() {
            if let Kind::File(payload) = &node.kind {
                starts[id] = data_offset + data.len() as u64;
                data.extend_from_slice(payload);
            }
        }

        let total = data_offset + data.len() as u64;
        let mut bytes = Vec::with_capacity(total as usize);
        bytes.extend_from_slice(&header(HEADER_SIZE, name_table, data_offset, total));
        bytes.resize(next as usize, 0);

        for (id, node) in self.nodes.iter().enumerate() {
            let parent = offsets[node.parent];
            let (is_dir, start, length) = match &node.kind {
                Kind::Dir(children) => {
                    let start = children.first().map(|c| offsets[*c]).unwrap_or(0);
                    (1, start, children.len() as u32 * RECORD_SIZE as u32)
                }
                Kind::File(payload) => (0, starts[id], payload.len() as u32),
            };
            let at = offsets[id] as usize;
            bytes[at..at + RECORD_SIZE as usize].copy_from_slice(&record(
                name_offsets[id],
                parent,
                is_dir,
                start,
                length,
            ));
        }

        bytes.extend_from_slice(&names);
        bytes.extend_from_slice(&data);
        assert_eq!(bytes.len() as u64, total);

        Built { bytes, offsets }
    }
}

fn header(first_entry: u64, name_table: u64, data: u64, size: u64) -> [u8; 64] {
    let mut buf = [0u8; 64];
    buf[0..4].copy_from_slice(b"SFP\0");
    buf[4..8].copy_from_slice(&1u32.to_le_bytes());
    buf[16..24].copy_from_slice(&first_entry.to_le_bytes());
    buf[24..32].copy_from_slice(&name_table.to_le_bytes());
    buf[32..40].copy_from_slice(&data.to_le_bytes());
    buf[40..48].copy_from_slice(&size.to_le_bytes());
    buf
}

fn record(name: u64, parent: u64, is_dir: u32, start: u64, length: u32) -> [u8; 80] {
    let mut buf = [0u8; 80];
    buf[0..4].copy_from_slice(b"ENT\0");
    buf[4..12].copy_from_slice(&name.to_le_bytes());
    buf[16..24].copy_from_slice(&parent.to_le_bytes());
    buf[24..28].copy_from_slice(&is_dir.to_le_bytes());
    buf[28..36].copy_from_slice(&u64::from(length).to_le_bytes());
    buf[68..76].copy_from_slice(&start.to_le_bytes());
    buf[76..80].copy_from_slice(&length.to_le_bytes());
    buf
}

/// Every file below `root` with its contents, as sorted `/`-separated relative paths.
pub fn read_tree(root: &Path) -> Vec<(String, Vec<u8>)> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<(String, Vec<u8>)>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            let rel = path
                .strip_prefix(base)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            if path.is_dir() {
                out.push((format!("{}/", rel), Vec::new()));
                walk(base, &path, out);
            } else {
                out.push((rel, std::fs::read(&path).unwrap()));
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
