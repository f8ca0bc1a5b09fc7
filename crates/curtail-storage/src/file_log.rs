use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use curtail_core::StoreError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

type Result<T> = std::result::Result<T, StoreError>;

/// One log record: a key/value pair as a self-delimiting JSON line.
#[derive(Debug, Serialize)]
struct Record<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct OwnedRecord {
    key: String,
    value: String,
}

/// An in-memory map fronted by a durable append-only record log.
///
/// On open, an existing log is copied aside, replayed (last write per
/// key wins), and rewritten compacted, so a clean startup leaves at
/// most one record per changed key on disk. The original file is only
/// truncated after the replay copy is established, which keeps the
/// open path atomic with respect to a concurrent crash.
///
/// Reads take only the map's read lock. Mutations are serialized by
/// the writer mutex, so no two records can interleave on disk.
#[derive(Debug)]
pub struct FileLog {
    map: RwLock<HashMap<String, String>>,
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl FileLog {
    /// Opens (and compacts) the log at `path`, creating parent
    /// directories and the file as needed. Any I/O or replay error is
    /// fatal: the caller aborts startup rather than run with a
    /// partially recovered map.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut map = HashMap::new();
        let mut replay_copy = None;

        if path.exists() {
            let copy = copy_to_replay_file(&path)?;
            if let Err(e) = replay(&copy, &mut map) {
                let _ = fs::remove_file(&copy);
                return Err(e);
            }
            replay_copy = Some(copy);
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        let mut writer = BufWriter::new(file);

        // Compaction: re-append every surviving record to the fresh log.
        for (key, value) in &map {
            append_record(&mut writer, key, value)?;
        }
        writer.flush()?;

        if let Some(copy) = replay_copy {
            let _ = fs::remove_file(copy);
        }

        info!(path = %path.display(), records = map.len(), "file log opened");

        Ok(Self {
            map: RwLock::new(map),
            writer: Mutex::new(writer),
            path,
        })
    }

    /// O(1) in-memory lookup.
    pub fn find(&self, key: &str) -> Result<String> {
        let map = self.map.read().expect("file log map lock poisoned");
        map.get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    /// Saves a key/value pair. An unchanged value updates memory only;
    /// a new or changed value appends one record to the log. I/O
    /// errors propagate to the caller and are not retried here.
    pub fn save(&self, key: &str, value: &str) -> Result<()> {
        // The writer mutex serializes all mutations, so the on-disk
        // record order always matches the in-memory update order.
        let mut writer = self.writer.lock().expect("file log writer lock poisoned");

        let changed = {
            let map = self.map.read().expect("file log map lock poisoned");
            map.get(key).map(String::as_str) != Some(value)
        };
        if !changed {
            return Ok(());
        }

        {
            let mut map = self.map.write().expect("file log map lock poisoned");
            map.insert(key.to_string(), value.to_string());
        }

        append_record(&mut writer, key, value)?;
        writer.flush()?;
        Ok(())
    }

    /// Number of records currently held in memory.
    pub fn len(&self) -> usize {
        self.map.read().expect("file log map lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of the backing log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn append_record(writer: &mut BufWriter<File>, key: &str, value: &str) -> Result<()> {
    let line = serde_json::to_string(&Record { key, value })
        .map_err(|e| StoreError::InvalidData(e.to_string()))?;
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

fn copy_to_replay_file(path: &Path) -> Result<PathBuf> {
    let mut copy = path.as_os_str().to_owned();
    copy.push(".replay");
    let copy = PathBuf::from(copy);
    fs::copy(path, &copy)?;
    Ok(copy)
}

/// Replays a log file into `map`, last write per key winning.
///
/// A record that fails to parse ends replay if it is the final line
/// (a crash can truncate the tail mid-append); anywhere else it is a
/// hard error, since the rest of the log cannot be trusted.
fn replay(path: &Path, map: &mut HashMap<String, String>) -> Result<()> {
    let content = fs::read_to_string(path)?;
    let lines: Vec<&str> = content.lines().collect();

    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<OwnedRecord>(line) {
            Ok(record) => {
                map.insert(record.key, record.value);
            }
            Err(e) => {
                let truncated_tail = index == lines.len() - 1;
                if truncated_tail {
                    warn!(line = index + 1, "discarding truncated final log record");
                    break;
                }
                return Err(StoreError::InvalidData(format!(
                    "corrupt log record at line {}: {}",
                    index + 1,
                    e
                )));
            }
        }
    }
    Ok(())
}
