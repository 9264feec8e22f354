use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use proton_nest::Transcript;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SyncMode;
use crate::error::{JournalError, JournalResult};

/// WAL entry: one recorded transcript with length and CRC framing.
///
/// On-disk format:
/// ```text
/// [4 bytes: entry length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized WalEntry)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Identity of the in-flight record.
    pub id: Uuid,
    pub transcript: Transcript,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Internal mutable state for the WAL writer.
struct WalWriter {
    writer: BufWriter<File>,
    /// Current write offset in the segment file.
    offset: u64,
}

/// Crash-recoverable log of unprocessed transcripts.
///
/// Entries are appended in record order and removed from the front once
/// processed, so the file always holds exactly the in-flight records. On
/// recovery the file is read front-to-back; entries that fail the CRC check
/// are skipped (they represent torn writes from a crash).
pub struct WriteAheadLog {
    /// Path to the WAL segment file.
    path: PathBuf,
    /// Writer state behind a mutex for thread safety.
    writer: Mutex<WalWriter>,
    sync_mode: SyncMode,
}

impl WriteAheadLog {
    /// Open (or create) a WAL segment file at the given path.
    pub fn open(path: &Path, sync_mode: SyncMode) -> JournalResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let offset = file.metadata()?.len();
        let writer = BufWriter::new(file);

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(WalWriter { writer, offset }),
            sync_mode,
        })
    }

    /// Append a single entry. Returns the number of bytes written, framing
    /// included.
    pub fn append(&self, entry: &WalEntry) -> JournalResult<u64> {
        let framed = frame(entry)?;

        let mut w = self.writer.lock().expect("WAL mutex poisoned");
        let entry_offset = w.offset;

        w.writer.write_all(&framed)?;
        w.writer.flush()?;
        if self.sync_mode == SyncMode::EveryWrite {
            w.writer.get_ref().sync_all()?;
        }

        let written = framed.len() as u64;
        w.offset += written;

        debug!(offset = entry_offset, len = written, id = %entry.id, "WAL append");
        Ok(written)
    }

    /// Recover all valid entries.
    ///
    /// Entries that fail CRC validation or deserialization are logged and
    /// skipped; a truncated tail ends recovery.
    pub fn recover(&self) -> JournalResult<Vec<WalEntry>> {
        let mut file = BufReader::new(File::open(&self.path)?);
        let file_len = file.get_ref().metadata()?.len();
        let mut entries = Vec::new();
        let mut offset: u64 = 0;

        while offset + HEADER_SIZE as u64 <= file_len {
            file.seek(SeekFrom::Start(offset))?;

            let mut header_buf = [0u8; HEADER_SIZE];
            match file.read_exact(&mut header_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let length = u32::from_le_bytes([header_buf[0], header_buf[1], header_buf[2], header_buf[3]]);
            let expected_crc = u32::from_le_bytes([header_buf[4], header_buf[5], header_buf[6], header_buf[7]]);

            if length == 0 || (offset + HEADER_SIZE as u64 + length as u64) > file_len {
                warn!(offset, length, file_len, "invalid WAL entry length; stopping recovery");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            match file.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(offset, "truncated WAL entry; stopping recovery");
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(offset, expected = expected_crc, actual = actual_crc, "CRC mismatch; skipping entry");
                offset += HEADER_SIZE as u64 + length as u64;
                continue;
            }

            match bincode::deserialize::<WalEntry>(&payload) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(offset, error = %e, "failed to deserialize WAL entry; skipping"),
            }

            offset += HEADER_SIZE as u64 + length as u64;
        }

        debug!(recovered = entries.len(), "WAL recovery complete");
        Ok(entries)
    }

    /// Drop the first `length` bytes of the log: the entries that have been
    /// processed.
    pub fn checkpoint(&self, length: u64) -> JournalResult<()> {
        let mut w = self.writer.lock().expect("WAL mutex poisoned");
        if length > w.offset {
            return Err(JournalError::InvalidCheckpoint {
                requested: length,
                current: w.offset,
            });
        }
        w.writer.flush()?;

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(length))?;
        let mut remaining = Vec::new();
        file.read_to_end(&mut remaining)?;
        drop(file);

        self.replace(&mut w, &remaining)?;
        debug!(length, remaining = w.offset, "WAL checkpoint");
        Ok(())
    }

    /// Rewrite the log to hold exactly `entries`. Returns each entry's framed
    /// length, in order.
    pub fn rewrite(&self, entries: &[WalEntry]) -> JournalResult<Vec<u64>> {
        let mut contents = Vec::new();
        let mut lengths = Vec::with_capacity(entries.len());
        for entry in entries {
            let framed = frame(entry)?;
            lengths.push(framed.len() as u64);
            contents.extend_from_slice(&framed);
        }

        let mut w = self.writer.lock().expect("WAL mutex poisoned");
        w.writer.flush()?;
        self.replace(&mut w, &contents)?;
        debug!(entries = entries.len(), bytes = w.offset, "WAL rewritten");
        Ok(lengths)
    }

    /// Swap the log for `contents`: written and synced to a temporary file
    /// in the same directory, then renamed over the log. The old log stays
    /// intact until the rename.
    fn replace(&self, w: &mut WalWriter, contents: &[u8]) -> JournalResult<()> {
        let mut tmp = NamedTempFile::new_in(self.directory())?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        let file = OpenOptions::new().append(true).open(&self.path)?;
        w.writer = BufWriter::new(file);
        w.offset = contents.len() as u64;
        Ok(())
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// Current write offset.
    pub fn offset(&self) -> u64 {
        self.writer.lock().expect("WAL mutex poisoned").offset
    }

    /// Path to the WAL segment file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Length and CRC header followed by the bincode payload.
fn frame(entry: &WalEntry) -> JournalResult<Vec<u8>> {
    let payload =
        bincode::serialize(entry).map_err(|e| JournalError::Serialization(e.to_string()))?;
    let mut framed = Vec::with_capacity(HEADER_SIZE + payload.len());
    framed.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    framed.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    framed.extend_from_slice(&payload);
    Ok(framed)
}
