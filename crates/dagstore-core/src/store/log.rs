//! Durable graph storage backed by an append-only write-ahead log.
//!
//! Every mutation is appended to `dag.wal` before it is applied to the
//! in-memory [`MemoryGraph`] index. Opening a store replays the log.
//!
//! # WAL Record Format
//!
//! ```text
//! [marker=0xDA: 1B] [len: 4B LE] [body crc32: 4B LE] [header crc32: 4B LE] [body: len bytes]
//! ```
//!
//! The body is a JSON-encoded operation (`put_vertex`, `delete_vertex`,
//! `put_edge`, `delete_edge`). The header crc covers the marker, length and
//! body crc, so a damaged length is caught before it is trusted.
//!
//! # Recovery
//!
//! A record cut short by a crash (torn tail) ends replay; the partial bytes
//! are truncated away on open. Only a suffix shorter than a header, or a
//! valid header whose body runs past the end of the file, counts as torn.
//! A bad marker, header checksum or body checksum is corruption and fails
//! the open without touching the file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::graph::{EdgeId, Vertex, VertexKey};

use super::memory::{key_cursor, MemoryGraph};
use super::{EdgeStore, KeyCursor, StoreError, StoreResult, VertexStore};

/// WAL file name inside the store directory.
pub const WAL_FILE: &str = "dag.wal";

const RECORD_MARKER: u8 = 0xDA;
pub(super) const HEADER_LEN: usize = 13;
/// Bytes of the header covered by the header checksum.
const CHECKED_HEADER_LEN: usize = 9;

/// Tuning knobs for [`LogStore`].
#[derive(Debug, Clone, Copy)]
pub struct LogStoreOptions {
    /// fsync the log after every appended record.
    pub sync_on_write: bool,
}

impl Default for LogStoreOptions {
    fn default() -> Self {
        Self {
            sync_on_write: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LogRecord {
    PutVertex { vertex: Vertex },
    DeleteVertex { key: VertexKey },
    PutEdge { from: VertexKey, to: VertexKey },
    DeleteEdge { from: VertexKey, to: VertexKey },
}

struct WalWriter {
    file: File,
    /// Length of the log up to the last complete record.
    len: u64,
}

struct Replay {
    graph: MemoryGraph,
    records: u64,
    valid_len: u64,
    file_len: u64,
}

/// Durable store: an in-memory index rebuilt from a write-ahead log.
///
/// Writers hold the index lock while appending, so the log order always
/// matches the order in which mutations became visible.
pub struct LogStore {
    path: PathBuf,
    graph: RwLock<MemoryGraph>,
    wal: Mutex<WalWriter>,
    options: LogStoreOptions,
    records: AtomicU64,
}

impl LogStore {
    /// Opens the store in `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be accessed or the log is corrupted.
    pub fn open<P: AsRef<Path>>(dir: P) -> StoreResult<Self> {
        Self::open_with_options(dir, LogStoreOptions::default())
    }

    /// Opens the store in `dir` with explicit options.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be accessed or the log is corrupted.
    pub fn open_with_options<P: AsRef<Path>>(dir: P, options: LogStoreOptions) -> StoreResult<Self> {
        let path = dir.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        let wal_path = path.join(WAL_FILE);

        let replay = Self::replay(&wal_path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&wal_path)?;
        if replay.valid_len < replay.file_len {
            warn!(
                path = %wal_path.display(),
                discarded_bytes = replay.file_len - replay.valid_len,
                "Truncating torn record at end of WAL"
            );
            file.set_len(replay.valid_len)?;
        }

        info!(
            path = %path.display(),
            records = replay.records,
            vertices = replay.graph.vertex_count(),
            edges = replay.graph.edge_count(),
            "Opened log store"
        );

        Ok(Self {
            path,
            graph: RwLock::new(replay.graph),
            wal: Mutex::new(WalWriter {
                file,
                len: replay.valid_len,
            }),
            options,
            records: AtomicU64::new(replay.records),
        })
    }

    /// Directory holding the store files.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records in the log.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.records.load(Ordering::Acquire)
    }

    fn replay(wal_path: &Path) -> StoreResult<Replay> {
        let bytes = match fs::read(wal_path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        let mut graph = MemoryGraph::new();
        let mut pos = 0usize;
        let mut records = 0u64;

        while pos < bytes.len() {
            let Some(header) = bytes.get(pos..pos + HEADER_LEN) else {
                break;
            };
            if header[0] != RECORD_MARKER {
                return Err(StoreError::Corrupted(format!(
                    "invalid record marker at offset {pos}"
                )));
            }
            if crc32fast::hash(&header[..CHECKED_HEADER_LEN]) != read_u32(&header[9..13]) {
                return Err(StoreError::Corrupted(format!(
                    "header checksum mismatch in record at offset {pos}"
                )));
            }
            let len = read_u32(&header[1..5]) as usize;
            let crc = read_u32(&header[5..9]);

            let body_start = pos + HEADER_LEN;
            let Some(body) = bytes.get(body_start..body_start + len) else {
                // Header intact, body cut short: the last append was torn
                break;
            };
            if crc32fast::hash(body) != crc {
                return Err(StoreError::Corrupted(format!(
                    "checksum mismatch in record at offset {pos}"
                )));
            }

            let record: LogRecord = serde_json::from_slice(body)?;
            apply(&mut graph, record).map_err(|err| {
                StoreError::Corrupted(format!("record at offset {pos} cannot be applied: {err}"))
            })?;

            pos = body_start + len;
            records += 1;
        }

        Ok(Replay {
            graph,
            records,
            valid_len: pos as u64,
            file_len: bytes.len() as u64,
        })
    }

    fn append(&self, record: &LogRecord) -> StoreResult<()> {
        let body = serde_json::to_vec(record)?;
        let frame = encode_frame(&body)?;

        let mut wal = self.wal.lock();
        if let Err(err) = Self::write_frame(&mut wal.file, &frame, self.options.sync_on_write) {
            // Drop any partial frame so later appends stay aligned.
            if let Err(trunc_err) = wal.file.set_len(wal.len) {
                warn!(error = %trunc_err, "Failed to roll back partial WAL record");
            }
            return Err(err.into());
        }
        wal.len += frame.len() as u64;
        self.records.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn write_frame(file: &mut File, frame: &[u8], sync: bool) -> io::Result<()> {
        file.write_all(frame)?;
        if sync {
            file.sync_data()?;
        }
        Ok(())
    }

    fn commit(&self, record: LogRecord) -> StoreResult<Option<EdgeId>> {
        let mut graph = self.graph.write();
        validate(&graph, &record)?;
        self.append(&record)?;
        apply(&mut graph, record)
    }
}

/// Frames `body` as one WAL record.
pub(super) fn encode_frame(body: &[u8]) -> StoreResult<Vec<u8>> {
    let len = u32::try_from(body.len())
        .map_err(|_| StoreError::Corrupted("WAL record larger than 4 GiB".to_string()))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.push(RECORD_MARKER);
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(body).to_le_bytes());
    let header_crc = crc32fast::hash(&frame[..CHECKED_HEADER_LEN]);
    frame.extend_from_slice(&header_crc.to_le_bytes());
    frame.extend_from_slice(body);
    Ok(frame)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    u32::from_le_bytes(word)
}

fn validate(graph: &MemoryGraph, record: &LogRecord) -> StoreResult<()> {
    match record {
        LogRecord::PutVertex { vertex } => {
            if graph.has_vertex(vertex.key().as_str()) {
                return Err(StoreError::AlreadyExists);
            }
        }
        LogRecord::DeleteVertex { key } => {
            if !graph.has_vertex(key.as_str()) {
                return Err(StoreError::NotFound);
            }
        }
        LogRecord::PutEdge { from, to } => graph.check_insert_edge(from.as_str(), to.as_str())?,
        LogRecord::DeleteEdge { from, to } => {
            if graph.edge(from.as_str(), to.as_str()).is_none() {
                return Err(StoreError::NotFound);
            }
        }
    }
    Ok(())
}

fn apply(graph: &mut MemoryGraph, record: LogRecord) -> StoreResult<Option<EdgeId>> {
    match record {
        LogRecord::PutVertex { vertex } => graph.insert_vertex(vertex).map(|()| None),
        LogRecord::DeleteVertex { key } => graph.remove_vertex(key.as_str()).map(|_| None),
        LogRecord::PutEdge { from, to } => graph.insert_edge(&from, &to).map(Some),
        LogRecord::DeleteEdge { from, to } => graph
            .remove_edge(from.as_str(), to.as_str())
            .map(|_| None),
    }
}

impl VertexStore for LogStore {
    fn create_vertex(&self, vertex: Vertex) -> StoreResult<()> {
        self.commit(LogRecord::PutVertex { vertex }).map(|_| ())
    }

    fn read_vertex(&self, key: &VertexKey) -> StoreResult<Vertex> {
        self.graph
            .read()
            .vertex(key.as_str())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn delete_vertex(&self, key: &VertexKey) -> StoreResult<()> {
        self.commit(LogRecord::DeleteVertex { key: key.clone() })
            .map(|_| ())
    }

    fn count_vertices(&self) -> StoreResult<u64> {
        Ok(self.graph.read().vertex_count() as u64)
    }

    fn vertex_keys(&self) -> StoreResult<KeyCursor> {
        Ok(key_cursor(self.graph.read().vertex_keys()))
    }

    fn contains_vertex(&self, key: &VertexKey) -> StoreResult<bool> {
        Ok(self.graph.read().has_vertex(key.as_str()))
    }
}

impl EdgeStore for LogStore {
    fn create_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<EdgeId> {
        let id = self.commit(LogRecord::PutEdge {
            from: from.clone(),
            to: to.clone(),
        })?;
        id.ok_or_else(|| StoreError::Corrupted("edge insert produced no identifier".to_string()))
    }

    fn find_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<Option<EdgeId>> {
        Ok(self.graph.read().edge(from.as_str(), to.as_str()))
    }

    fn delete_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<()> {
        self.commit(LogRecord::DeleteEdge {
            from: from.clone(),
            to: to.clone(),
        })
        .map(|_| ())
    }

    fn count_edges(&self) -> StoreResult<u64> {
        Ok(self.graph.read().edge_count() as u64)
    }

    fn outbound_neighbors(&self, vertex: &VertexKey) -> StoreResult<Vec<VertexKey>> {
        Ok(self.graph.read().outbound(vertex.as_str()))
    }

    fn inbound_neighbors(&self, vertex: &VertexKey) -> StoreResult<Vec<VertexKey>> {
        Ok(self.graph.read().inbound(vertex.as_str()))
    }

    fn zero_out_degree(&self) -> StoreResult<KeyCursor> {
        Ok(key_cursor(self.graph.read().sinks()))
    }

    fn zero_in_degree(&self) -> StoreResult<KeyCursor> {
        Ok(key_cursor(self.graph.read().sources()))
    }
}
