//! Conversation threads and their storage.
//!
//! A thread records the URL that was analysed and every exchange about it. Threads are
//! append-only: messages are never edited or removed, and are always returned in the order
//! they were appended.
//!
//! Two stores implement [`ConversationStore`]:
//! - [`FileConversationStore`] keeps one sharded directory per thread on disk.
//! - [`InMemoryConversationStore`] keeps threads in a map, for tests and ephemeral use.

use crate::config::CoreConfig;
use crate::constants::{THREAD_MESSAGES_FILENAME, THREAD_META_FILENAME};
use crate::markdown::ThreadMarkdown;
use crate::{CritiqueError, CritiqueResult};
use chrono::{DateTime, Utc};
use critique_uuid::{ConversationId, TimestampId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

/// One request/response exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: TimestampId,
    pub request: String,
    pub response: String,
}

impl Message {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.id.timestamp()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationThread {
    pub id: ConversationId,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThreadSummary {
    pub id: ConversationId,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

impl ConversationThread {
    pub fn summary(&self) -> ThreadSummary {
        ThreadSummary {
            id: self.id.clone(),
            source_url: self.source_url.clone(),
            created_at: self.created_at,
            message_count: self.messages.len(),
        }
    }
}

/// Persistent record of analysis conversations.
pub trait ConversationStore: Send + Sync {
    /// Creates an empty thread for `source_url` and returns its id.
    fn start_thread(&self, source_url: &str) -> CritiqueResult<ConversationId>;

    /// Appends one exchange to an existing thread.
    ///
    /// Returns [`CritiqueError::NotFound`] if the thread does not exist.
    fn append_message(
        &self,
        id: &ConversationId,
        request: &str,
        response: &str,
    ) -> CritiqueResult<()>;

    /// Returns the thread with its messages in append order.
    ///
    /// Returns [`CritiqueError::NotFound`] if the thread does not exist.
    fn get_thread(&self, id: &ConversationId) -> CritiqueResult<ConversationThread>;

    /// Summaries of every thread, most recently created first.
    fn list_threads(&self) -> CritiqueResult<Vec<ThreadSummary>>;
}

fn sort_most_recent_first(summaries: &mut [ThreadSummary]) {
    summaries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Contents of `thread.yaml`.
#[derive(Debug, Serialize, Deserialize)]
struct ThreadMeta {
    id: ConversationId,
    source_url: String,
    created_at: DateTime<Utc>,
}

/// Last message id per thread, guarded so appends to one thread are serialised.
///
/// `None` until the thread's first append in this process, when it is read from disk.
type AppendLock = Arc<Mutex<Option<TimestampId>>>;

const DEFAULT_APPEND_LOCK_CAPACITY: usize = 1024;

/// Stores each thread under `<conversations_dir>/<s1>/<s2>/<id>/`.
pub struct FileConversationStore {
    conversations_dir: PathBuf,
    markdown: ThreadMarkdown,
    append_locks: Mutex<HashMap<ConversationId, AppendLock>>,
    append_lock_capacity: usize,
}

impl FileConversationStore {
    pub fn new(conversations_dir: impl Into<PathBuf>) -> Self {
        Self {
            conversations_dir: conversations_dir.into(),
            markdown: ThreadMarkdown::new(),
            append_locks: Mutex::new(HashMap::new()),
            append_lock_capacity: DEFAULT_APPEND_LOCK_CAPACITY,
        }
    }

    /// Caps how many per-thread append locks are kept. Once the cap is reached, idle locks
    /// are dropped before a new one is added.
    pub fn with_append_lock_capacity(mut self, capacity: usize) -> Self {
        self.append_lock_capacity = capacity.max(1);
        self
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(cfg.conversations_dir())
    }

    pub fn conversations_dir(&self) -> &Path {
        &self.conversations_dir
    }

    fn thread_dir(&self, id: &ConversationId) -> PathBuf {
        id.sharded_dir(&self.conversations_dir)
    }

    fn append_lock(&self, id: &ConversationId) -> AppendLock {
        let mut locks = self
            .append_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks.len() >= self.append_lock_capacity && !locks.contains_key(id) {
            // Clones are only taken under this mutex, so a count of one means nobody holds it.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks.entry(id.clone()).or_default().clone()
    }

    fn last_message_id(&self, thread_dir: &Path) -> CritiqueResult<Option<TimestampId>> {
        let content = fs::read_to_string(thread_dir.join(THREAD_MESSAGES_FILENAME))
            .map_err(CritiqueError::FileRead)?;
        Ok(self
            .markdown
            .thread_parse(&content)?
            .pop()
            .map(|message| message.id))
    }

    fn read_meta(&self, thread_dir: &Path, id: &ConversationId) -> CritiqueResult<ThreadMeta> {
        let meta_path = thread_dir.join(THREAD_META_FILENAME);
        if !meta_path.exists() {
            return Err(CritiqueError::NotFound(id.to_string()));
        }
        let content = fs::read_to_string(&meta_path).map_err(CritiqueError::FileRead)?;
        serde_yaml::from_str(&content).map_err(CritiqueError::YamlDeserialization)
    }

    /// Every `<s1>/<s2>/<id>` directory whose name is a canonical id.
    fn thread_ids(&self) -> CritiqueResult<Vec<ConversationId>> {
        let mut ids = Vec::new();
        if !self.conversations_dir.exists() {
            return Ok(ids);
        }

        for s1 in read_subdirs(&self.conversations_dir)? {
            for s2 in read_subdirs(&s1)? {
                for thread_dir in read_subdirs(&s2)? {
                    let name = thread_dir
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or_default();
                    match ConversationId::parse(name) {
                        Ok(id) => ids.push(id),
                        Err(_) => tracing::warn!(
                            "skipping unexpected directory {}",
                            thread_dir.display()
                        ),
                    }
                }
            }
        }
        Ok(ids)
    }
}

fn read_subdirs(dir: &Path) -> CritiqueResult<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(CritiqueError::FileRead)? {
        let path = entry.map_err(CritiqueError::FileRead)?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

impl ConversationStore for FileConversationStore {
    fn start_thread(&self, source_url: &str) -> CritiqueResult<ConversationId> {
        let id = ConversationId::new();
        let thread_dir = self.thread_dir(&id);
        fs::create_dir_all(&thread_dir).map_err(CritiqueError::StorageDirCreation)?;

        let meta = ThreadMeta {
            id: id.clone(),
            source_url: source_url.to_string(),
            created_at: Utc::now(),
        };
        let meta_yaml = serde_yaml::to_string(&meta).map_err(CritiqueError::YamlSerialization)?;

        fs::write(thread_dir.join(THREAD_MESSAGES_FILENAME), self.markdown.thread_header())
            .map_err(CritiqueError::FileWrite)?;
        // thread.yaml last: its presence marks the thread as existing.
        fs::write(thread_dir.join(THREAD_META_FILENAME), meta_yaml)
            .map_err(CritiqueError::FileWrite)?;

        tracing::info!("started conversation {} for {}", id, source_url);
        Ok(id)
    }

    fn append_message(
        &self,
        id: &ConversationId,
        request: &str,
        response: &str,
    ) -> CritiqueResult<()> {
        let thread_dir = self.thread_dir(id);
        if !thread_dir.join(THREAD_META_FILENAME).exists() {
            return Err(CritiqueError::NotFound(id.to_string()));
        }

        let lock = self.append_lock(id);
        let mut last_id = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if last_id.is_none() {
            *last_id = self.last_message_id(&thread_dir)?;
        }

        let message = Message {
            id: TimestampId::generate(last_id.as_ref()),
            request: request.to_string(),
            response: response.to_string(),
        };
        let rendered = self.markdown.message_render(&message);

        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(thread_dir.join(THREAD_MESSAGES_FILENAME))
            .map_err(CritiqueError::FileWrite)?;
        file.write_all(rendered.as_bytes())
            .map_err(CritiqueError::FileWrite)?;

        tracing::debug!("appended message {} to conversation {}", message.id, id);
        *last_id = Some(message.id);
        Ok(())
    }

    fn get_thread(&self, id: &ConversationId) -> CritiqueResult<ConversationThread> {
        let thread_dir = self.thread_dir(id);
        let meta = self.read_meta(&thread_dir, id)?;

        let content = fs::read_to_string(thread_dir.join(THREAD_MESSAGES_FILENAME))
            .map_err(CritiqueError::FileRead)?;
        let messages = self.markdown.thread_parse(&content)?;

        Ok(ConversationThread {
            id: meta.id,
            source_url: meta.source_url,
            created_at: meta.created_at,
            messages,
        })
    }

    fn list_threads(&self) -> CritiqueResult<Vec<ThreadSummary>> {
        let mut summaries = self
            .thread_ids()?
            .iter()
            .map(|id| self.get_thread(id).map(|thread| thread.summary()))
            .collect::<CritiqueResult<Vec<_>>>()?;

        sort_most_recent_first(&mut summaries);
        Ok(summaries)
    }
}

/// Keeps threads in memory for the life of the process.
#[derive(Default)]
pub struct InMemoryConversationStore {
    threads: RwLock<HashMap<ConversationId, ConversationThread>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn start_thread(&self, source_url: &str) -> CritiqueResult<ConversationId> {
        let id = ConversationId::new();
        let thread = ConversationThread {
            id: id.clone(),
            source_url: source_url.to_string(),
            created_at: Utc::now(),
            messages: Vec::new(),
        };
        self.threads
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.clone(), thread);
        Ok(id)
    }

    fn append_message(
        &self,
        id: &ConversationId,
        request: &str,
        response: &str,
    ) -> CritiqueResult<()> {
        let mut threads = self
            .threads
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let thread = threads
            .get_mut(id)
            .ok_or_else(|| CritiqueError::NotFound(id.to_string()))?;

        let message_id = TimestampId::generate(thread.messages.last().map(|m| &m.id));
        thread.messages.push(Message {
            id: message_id,
            request: request.to_string(),
            response: response.to_string(),
        });
        Ok(())
    }

    fn get_thread(&self, id: &ConversationId) -> CritiqueResult<ConversationThread> {
        self.threads
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| CritiqueError::NotFound(id.to_string()))
    }

    fn list_threads(&self) -> CritiqueResult<Vec<ThreadSummary>> {
        let mut summaries: Vec<ThreadSummary> = self
            .threads
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .map(ConversationThread::summary)
            .collect();
        sort_most_recent_first(&mut summaries);
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const URL: &str = "https://github.com/u/r/blob/main/app.py";

    fn file_store() -> (TempDir, FileConversationStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileConversationStore::new(temp_dir.path().join("conversations"));
        (temp_dir, store)
    }

    fn exercise_append_order(store: &dyn ConversationStore) {
        let id = store.start_thread(URL).unwrap();
        store
            .append_message(&id, "Analyze the code", "# Code Analysis Report")
            .unwrap();
        store.append_message(&id, "Why?", "Because.").unwrap();
        store.append_message(&id, "And?", "---\n# done").unwrap();

        let thread = store.get_thread(&id).unwrap();
        assert_eq!(thread.id, id);
        assert_eq!(thread.source_url, URL);
        let requests: Vec<&str> = thread.messages.iter().map(|m| m.request.as_str()).collect();
        assert_eq!(requests, vec!["Analyze the code", "Why?", "And?"]);
        assert_eq!(thread.messages[2].response, "---\n# done");
        assert!(thread
            .messages
            .windows(2)
            .all(|w| w[0].id.to_string() < w[1].id.to_string()));
    }

    fn exercise_unknown_thread(store: &dyn ConversationStore) {
        let unknown = ConversationId::new();
        assert!(matches!(
            store.get_thread(&unknown),
            Err(CritiqueError::NotFound(_))
        ));
        assert!(matches!(
            store.append_message(&unknown, "q", "a"),
            Err(CritiqueError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_store_keeps_append_order() {
        let (_temp, store) = file_store();
        exercise_append_order(&store);
    }

    #[test]
    fn test_memory_store_keeps_append_order() {
        exercise_append_order(&InMemoryConversationStore::new());
    }

    #[test]
    fn test_unknown_thread_is_not_found() {
        let (_temp, store) = file_store();
        exercise_unknown_thread(&store);
        exercise_unknown_thread(&InMemoryConversationStore::new());
    }

    #[test]
    fn test_file_store_layout_is_sharded() {
        let (_temp, store) = file_store();
        let id = store.start_thread(URL).unwrap();

        let canonical = id.to_string();
        let thread_dir = store
            .conversations_dir()
            .join(&canonical[0..2])
            .join(&canonical[2..4])
            .join(&canonical);
        assert!(thread_dir.join(THREAD_META_FILENAME).is_file());
        assert!(thread_dir.join(THREAD_MESSAGES_FILENAME).is_file());

        let meta = fs::read_to_string(thread_dir.join(THREAD_META_FILENAME)).unwrap();
        assert!(meta.contains(URL));
        assert!(store.get_thread(&id).unwrap().messages.is_empty());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let (temp, store) = file_store();
        let id = store.start_thread(URL).unwrap();
        store.append_message(&id, "Analyze the code", "report").unwrap();
        drop(store);

        let reopened = FileConversationStore::new(temp.path().join("conversations"));
        reopened.append_message(&id, "Follow-up", "answer").unwrap();
        let thread = reopened.get_thread(&id).unwrap();
        assert_eq!(thread.messages.len(), 2);
        assert_eq!(thread.messages[1].response, "answer");
    }

    #[test]
    fn test_list_threads_most_recent_first() {
        let (_temp, store) = file_store();
        assert!(store.list_threads().unwrap().is_empty());

        let first = store.start_thread("https://github.com/u/r/blob/main/a.py").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = store.start_thread("https://github.com/u/r/blob/main/b.py").unwrap();
        store.append_message(&first, "q", "a").unwrap();

        let summaries = store.list_threads().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, second);
        assert_eq!(summaries[0].message_count, 0);
        assert_eq!(summaries[1].id, first);
        assert_eq!(summaries[1].message_count, 1);
    }

    #[test]
    fn test_idle_append_locks_are_evicted() {
        let (_temp, store) = file_store();
        let store = store.with_append_lock_capacity(2);

        let ids: Vec<ConversationId> = (0..5).map(|_| store.start_thread(URL).unwrap()).collect();
        for id in &ids {
            store.append_message(id, "q", "a").unwrap();
            assert!(store.append_locks.lock().unwrap().len() <= 2);
        }

        store.append_message(&ids[0], "again", "b").unwrap();
        let thread = store.get_thread(&ids[0]).unwrap();
        assert_eq!(thread.messages.len(), 2);
        assert!(thread.messages[0].id.to_string() < thread.messages[1].id.to_string());
    }

    #[test]
    fn test_first_append_continues_after_stored_ids() {
        let (_temp, store) = file_store();
        let id = store.start_thread(URL).unwrap();

        // A stored id ahead of the clock, as left by an earlier process.
        let ahead: TimestampId = format!("20991231T235959.000Z-{}", ConversationId::new())
            .parse()
            .unwrap();
        let stored = Message {
            id: ahead.clone(),
            request: "Analyze the code".into(),
            response: "report".into(),
        };
        let messages_path = id
            .sharded_dir(store.conversations_dir())
            .join(THREAD_MESSAGES_FILENAME);
        let mut file = fs::OpenOptions::new().append(true).open(messages_path).unwrap();
        file.write_all(ThreadMarkdown::new().message_render(&stored).as_bytes())
            .unwrap();

        store.append_message(&id, "Follow-up", "answer").unwrap();
        let thread = store.get_thread(&id).unwrap();
        assert_eq!(thread.messages.len(), 2);
        assert!(thread.messages[1].timestamp() > ahead.timestamp());
        assert!(thread.messages[1].id.to_string() > ahead.to_string());
    }

    #[test]
    fn test_concurrent_appends_are_all_recorded() {
        let (_temp, store) = file_store();
        let store = Arc::new(store);
        let id = store.start_thread(URL).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let id = id.clone();
                std::thread::spawn(move || {
                    store
                        .append_message(&id, &format!("question {i}"), "answer")
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let thread = store.get_thread(&id).unwrap();
        assert_eq!(thread.messages.len(), 8);
    }
}
