use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::index::{rank_by_similarity, IndexError, IndexFilter, IndexedDecision, SearchHit, SemanticIndex};

/// Embedded index: an append-only JSON-lines collection file, or purely in
/// memory when no path is given.
///
/// Each insert is one complete line written with a single append, and
/// queries re-read the file, so records written by other processes become
/// visible on the next read. A trailing line that does not parse is a write
/// still in flight and is skipped.
///
/// Every insert and query re-reads the whole file with blocking I/O, so
/// each call costs O(records in the collection).
pub struct LocalIndex {
    path: Option<PathBuf>,
    entries: RwLock<Vec<IndexedDecision>>,
    write_lock: Mutex<()>,
}

impl LocalIndex {

    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: RwLock::new(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Opens (creating if needed) the collection file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)?;

        let entries = read_collection(&path)?;
        info!("LocalIndex opened at {} ({} records)", path.display(), entries.len());

        Ok(Self {
            path: Some(path),
            entries: RwLock::new(entries),
            write_lock: Mutex::new(()),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn refresh(&self) -> Result<(), IndexError> {
        if let Some(path) = &self.path {
            let fresh = read_collection(path)?;
            *self.entries.write() = fresh;
        }
        Ok(())
    }
}

#[async_trait]
impl SemanticIndex for LocalIndex {
    async fn insert(&self, entry: IndexedDecision) -> Result<(), IndexError> {
        let _guard = self.write_lock.lock();
        self.refresh()?;

        if self.entries.read().iter().any(|e| e.id == entry.id) {
            return Err(IndexError::DuplicateId(entry.id));
        }

        if let Some(path) = &self.path {
            let mut line = Vec::new();
            if ends_mid_line(path)? {
                line.push(b'\n');
            }
            serde_json::to_writer(&mut line, &entry)?;
            line.push(b'\n');
            let mut file = OpenOptions::new().append(true).open(path)?;
            file.write_all(&line)?;
            file.sync_data()?;
        }

        debug!("LocalIndex inserted {}", entry.id);
        self.entries.write().push(entry);
        Ok(())
    }

    async fn search(&self, query: &[f32], filter: &IndexFilter, k: usize) -> Result<Vec<SearchHit>, IndexError> {
        self.refresh()?;
        let entries = self.entries.read();
        Ok(rank_by_similarity(query, entries.iter(), filter, k))
    }

    async fn scan(&self, filter: &IndexFilter) -> Result<Vec<IndexedDecision>, IndexError> {
        self.refresh()?;
        let entries = self.entries.read();
        Ok(entries.iter().filter(|e| filter.matches(&e.metadata)).cloned().collect())
    }

    fn name(&self) -> &str {
        if self.path.is_some() { "local" } else { "memory" }
    }
}

/// True when the file's last byte is not a newline (a torn write), so the
/// next record must start on a fresh line.
fn ends_mid_line(path: &Path) -> Result<bool, IndexError> {
    let mut file = fs::File::open(path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn read_collection(path: &Path) -> Result<Vec<IndexedDecision>, IndexError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    // Lines are decoded one at a time so a record cut mid-character only
    // loses that record.
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for (line_no, line) in raw.split(|b| *b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<IndexedDecision>(line) {
            Ok(entry) => {
                if seen.insert(entry.id.clone()) {
                    entries.push(entry);
                } else {
                    warn!("Ignoring repeated record id {} at line {}", entry.id, line_no + 1);
                }
            }
            Err(e) => warn!("Skipping unreadable record at line {}: {}", line_no + 1, e),
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::models::{DecisionMetadata, Recommendation};

    fn entry(id: &str, user_id: &str, vector: Vec<f32>) -> IndexedDecision {
        IndexedDecision {
            id: id.to_string(),
            document: format!("User {} decided YES", user_id),
            metadata: DecisionMetadata {
                user_id: user_id.to_string(),
                decision: Recommendation::Yes,
                reason: "rain".to_string(),
                location: "London".to_string(),
                weather_description: "light rain".to_string(),
                rain_probability: Some(75.0),
                temperature: Some(12.0),
                timestamp: "2026-10-14T08:00:00+00:00".to_string(),
            },
            vector,
        }
    }

    #[tokio::test]
    async fn test_in_memory_insert_and_search() {
        let index = LocalIndex::in_memory();
        index.insert(entry("a1", "alice", vec![1.0, 0.0])).await.unwrap();
        index.insert(entry("b1", "bob", vec![1.0, 0.0])).await.unwrap();

        let hits = index.search(&[1.0, 0.0], &IndexFilter::user("alice"), 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a1");
        assert_eq!(index.name(), "memory");
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let index = LocalIndex::in_memory();
        index.insert(entry("a1", "alice", vec![1.0])).await.unwrap();

        let err = index.insert(entry("a1", "alice", vec![0.5])).await.unwrap_err();
        assert!(matches!(err, IndexError::DuplicateId(id) if id == "a1"));

        let stored = index.scan(&IndexFilter::user("alice")).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].vector, vec![1.0]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("umbrella_decisions.jsonl");

        {
            let index = LocalIndex::open(&path).unwrap();
            index.insert(entry("a1", "alice", vec![1.0, 0.0])).await.unwrap();
            index.insert(entry("a2", "alice", vec![0.0, 1.0])).await.unwrap();
        }

        let reopened = LocalIndex::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        let stored = reopened.scan(&IndexFilter::user("alice")).await.unwrap();
        assert_eq!(stored[0], entry("a1", "alice", vec![1.0, 0.0]));
    }

    #[tokio::test]
    async fn test_writes_from_another_handle_become_visible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("umbrella_decisions.jsonl");

        let reader = LocalIndex::open(&path).unwrap();
        let writer = LocalIndex::open(&path).unwrap();
        writer.insert(entry("a1", "alice", vec![1.0])).await.unwrap();

        let hits = reader.search(&[1.0], &IndexFilter::user("alice"), 5).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_torn_trailing_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("umbrella_decisions.jsonl");

        let index = LocalIndex::open(&path).unwrap();
        index.insert(entry("a1", "alice", vec![1.0])).await.unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"id": "a2", "document": "User alice dec"#).unwrap();

        let stored = index.scan(&IndexFilter::user("alice")).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "a1");

        index.insert(entry("a3", "alice", vec![0.5])).await.unwrap();
        let reopened = LocalIndex::open(&path).unwrap();
        let ids: Vec<_> = reopened
            .scan(&IndexFilter::user("alice"))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["a1", "a3"]);
    }

    #[tokio::test]
    async fn test_line_cut_inside_multibyte_char_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("umbrella_decisions.jsonl");

        let mut first = entry("a1", "alice", vec![1.0]);
        first.document = "User alice decided YES at 14°C".to_string();
        let index = LocalIndex::open(&path).unwrap();
        index.insert(first).await.unwrap();

        let line = std::fs::read(&path).unwrap();
        let degree = line.windows(2).position(|w| w == "°".as_bytes()).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&line[..degree + 1]).unwrap();

        let stored = index.scan(&IndexFilter::user("alice")).await.unwrap();
        assert_eq!(stored.len(), 1);

        index.insert(entry("a2", "alice", vec![0.5])).await.unwrap();
        let reopened = LocalIndex::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
    }
}
