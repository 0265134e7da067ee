use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard};

use chrono::{DateTime, Utc};
use idr_types::{ContactId, ContactRecord, NewContact};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::table::ContactTable;
use crate::traits::ContactStore;

/// A single journaled change to the contact table.
///
/// Every entry is framed as `len: u32 LE | crc32(payload): u32 LE | payload`,
/// where the payload is the bincode encoding of the event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalEvent {
    Inserted(ContactRecord),
    SoftDeleted { id: ContactId, at: DateTime<Utc> },
    /// Ids up to `through` may have been handed out by an entry that was
    /// later discarded; they are never allocated again.
    IdsReserved { through: ContactId },
}

/// Flush/sync strategy for the journal.
#[derive(Clone, Debug, Default)]
pub enum SyncMode {
    /// `fsync` after every append.
    EveryWrite,
    /// Write to the OS after every append and let it decide when to persist.
    #[default]
    OsDefault,
}

/// Configuration for a [`JournalContactStore`].
#[derive(Clone, Debug, Default)]
pub struct JournalConfig {
    pub sync_mode: SyncMode,
}

const FRAME_HEADER: u64 = 8;

struct JournalWriter {
    file: File,
    /// Length of the committed journal. Everything past it is garbage.
    committed: u64,
    /// Set when a failed append could not be rolled back.
    wedged: Option<u64>,
}

impl JournalWriter {
    /// Append one frame, or leave the file exactly as it was.
    fn commit(&mut self, frame: &[u8], sync_mode: &SyncMode) -> StoreResult<u64> {
        if let Some(offset) = self.wedged {
            return Err(StoreError::Wedged { offset });
        }
        let at = self.committed;
        if let Err(e) = self.write_frame(frame, sync_mode) {
            if let Err(rollback) = self.file.set_len(at) {
                error!(offset = at, error = %rollback, "cannot roll back failed journal append");
                self.wedged = Some(at);
            }
            return Err(e.into());
        }
        self.committed += frame.len() as u64;
        Ok(at)
    }

    fn write_frame(&mut self, frame: &[u8], sync_mode: &SyncMode) -> io::Result<()> {
        self.file.write_all(frame)?;
        if matches!(sync_mode, SyncMode::EveryWrite) {
            self.file.sync_data()?;
        }
        Ok(())
    }
}

/// Durable contact store backed by an append-only journal.
///
/// The journal is replayed into memory on [`open`](Self::open) and every
/// lookup is served from that replica. A change is written to the journal
/// before it becomes visible; a failed write is rolled back on disk and
/// leaves the table untouched.
///
/// Recovery on open:
/// - An incomplete or unreadable final entry is a torn write. It is cut off,
///   and the next id is reserved in case that entry had handed it out.
/// - A damaged entry followed by further entries fails the open with
///   [`StoreError::Corrupt`] and leaves the file as it was.
pub struct JournalContactStore {
    path: PathBuf,
    writer: Mutex<JournalWriter>,
    table: RwLock<ContactTable>,
    config: JournalConfig,
}

impl JournalContactStore {
    /// Open (or create) the journal at `path` and replay it.
    pub fn open(path: &Path, config: JournalConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let recovered = Recovered::scan(path)?;
        let mut table = ContactTable::default();
        for (offset, event) in recovered.events {
            apply(&mut table, event).map_err(|e| StoreError::Corrupt {
                offset,
                reason: e.to_string(),
            })?;
        }

        let mut writer = JournalWriter {
            file,
            committed: recovered.valid_len,
            wedged: None,
        };

        if let Some(torn_at) = recovered.torn_at {
            warn!(
                path = %path.display(),
                offset = torn_at,
                discarded = recovered.file_len - torn_at,
                "discarding torn journal tail"
            );
            writer.file.set_len(torn_at)?;
            let through = table.reserve_next_id();
            writer.commit(
                &encode_frame(&JournalEvent::IdsReserved { through })?,
                &SyncMode::EveryWrite,
            )?;
        }

        info!(path = %path.display(), records = table.len(), "contact journal opened");

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(writer),
            table: RwLock::new(table),
            config,
        })
    }

    /// Path to the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current journal length in bytes.
    pub fn offset(&self) -> StoreResult<u64> {
        Ok(self.lock_writer()?.committed)
    }

    /// Mark a record as soft-deleted at `at` and journal the change.
    pub fn soft_delete(&self, id: ContactId, at: DateTime<Utc>) -> StoreResult<ContactRecord> {
        let mut table = self
            .table
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        if table.get(id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        self.append(&JournalEvent::SoftDeleted { id, at })?;
        table.apply_soft_delete(id, at)
    }

    /// Fsync the journal. Called on shutdown.
    pub fn close(&self) -> StoreResult<()> {
        self.lock_writer()?.file.sync_all()?;
        debug!(path = %self.path.display(), "contact journal closed");
        Ok(())
    }

    fn append(&self, event: &JournalEvent) -> StoreResult<u64> {
        let frame = encode_frame(event)?;
        let offset = self.lock_writer()?.commit(&frame, &self.config.sync_mode)?;
        debug!(offset, len = frame.len(), "journal append");
        Ok(offset)
    }

    fn lock_writer(&self) -> StoreResult<MutexGuard<'_, JournalWriter>> {
        self.writer
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, ContactTable>> {
        self.table
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl ContactStore for JournalContactStore {
    fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Vec<ContactRecord>> {
        Ok(self.read()?.find_by_email_or_phone(email, phone_number))
    }

    fn find_by_ids_or_linked_ids(
        &self,
        roots: &BTreeSet<ContactId>,
    ) -> StoreResult<Vec<ContactRecord>> {
        Ok(self.read()?.find_by_ids_or_linked_ids(roots))
    }

    fn insert(&self, contact: NewContact) -> StoreResult<ContactRecord> {
        let mut table = self
            .table
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        let record = table.prepare(contact, Utc::now())?;
        self.append(&JournalEvent::Inserted(record.clone()))?;
        table.apply_insert(record.clone());
        Ok(record)
    }

    fn get(&self, id: ContactId) -> StoreResult<Option<ContactRecord>> {
        Ok(self.read()?.get(id))
    }

    fn all(&self) -> StoreResult<Vec<ContactRecord>> {
        Ok(self.read()?.all())
    }
}

impl std::fmt::Debug for JournalContactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalContactStore")
            .field("path", &self.path)
            .finish()
    }
}

fn apply(table: &mut ContactTable, event: JournalEvent) -> StoreResult<()> {
    match event {
        JournalEvent::Inserted(record) => table.apply_insert(record),
        JournalEvent::SoftDeleted { id, at } => {
            table.apply_soft_delete(id, at)?;
        }
        JournalEvent::IdsReserved { through } => table.reserve_through(through),
    }
    Ok(())
}

fn encode_frame(event: &JournalEvent) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(event).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| StoreError::Serialization("journal entry too large".into()))?;
    let mut frame = Vec::with_capacity(FRAME_HEADER as usize + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// What a scan of the journal file found.
struct Recovered {
    events: Vec<(u64, JournalEvent)>,
    /// End of the last intact entry.
    valid_len: u64,
    /// Start of a damaged final entry, if there is one.
    torn_at: Option<u64>,
    file_len: u64,
}

impl Recovered {
    fn scan(path: &Path) -> StoreResult<Self> {
        let file = File::open(path)?;
        let limit = file.metadata()?.len();
        let mut bytes = Vec::new();
        file.take(limit).read_to_end(&mut bytes)?;
        let file_len = bytes.len() as u64;
        let mut events = Vec::new();
        let mut rest = bytes.as_slice();
        let mut offset = 0u64;

        while !rest.is_empty() {
            let frame = match split_frame(rest) {
                Some(frame) => frame,
                None => {
                    return Ok(Self {
                        events,
                        valid_len: offset,
                        torn_at: Some(offset),
                        file_len,
                    })
                }
            };
            let next = offset + FRAME_HEADER + frame.payload.len() as u64;
            let is_last = next == file_len;

            let decoded = if crc32fast::hash(frame.payload) == frame.crc {
                bincode::deserialize::<JournalEvent>(frame.payload)
                    .map_err(|e| format!("undecodable entry: {e}"))
            } else {
                Err("checksum mismatch".to_string())
            };

            match decoded {
                Ok(event) => events.push((offset, event)),
                Err(reason) if is_last => {
                    warn!(offset, %reason, "damaged final journal entry");
                    return Ok(Self {
                        events,
                        valid_len: offset,
                        torn_at: Some(offset),
                        file_len,
                    });
                }
                Err(reason) => return Err(StoreError::Corrupt { offset, reason }),
            }

            rest = frame.rest;
            offset = next;
        }

        debug!(recovered = events.len(), "journal replay complete");
        Ok(Self {
            events,
            valid_len: offset,
            torn_at: None,
            file_len,
        })
    }
}

struct Frame<'a> {
    crc: u32,
    payload: &'a [u8],
    rest: &'a [u8],
}

/// Split one whole frame off the front of `bytes`, or `None` if it is cut short.
fn split_frame(bytes: &[u8]) -> Option<Frame<'_>> {
    let (header, body) = bytes.split_at_checked(FRAME_HEADER as usize)?;
    let len = u32::from_le_bytes(header[..4].try_into().ok()?) as usize;
    let crc = u32::from_le_bytes(header[4..].try_into().ok()?);
    if len == 0 {
        return None;
    }
    let (payload, rest) = body.split_at_checked(len)?;
    Some(Frame { crc, payload, rest })
}
