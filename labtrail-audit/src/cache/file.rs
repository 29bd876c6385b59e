//! File-backed log cache
//!
//! Stores each job's pending entries as a JSON array in
//! `{dir}/job_{id}.json`. Files are read in full the first time a job is
//! touched and rewritten in full after every change, so pending entries
//! survive process restarts.
//!
//! A job file that cannot be read is moved aside to
//! `job_{id}.json.corrupt-{timestamp}` before the job starts over, so its
//! contents are never overwritten. If it cannot be moved, the job is kept in
//! memory only.

use chrono::Utc;
use labtrail_core::domain::log::{JobId, LogEntry};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{LogCache, restore_front};
use crate::error::CacheError;

const FILE_PREFIX: &str = "job_";
const FILE_SUFFIX: &str = ".json";
const CORRUPT_MARKER: &str = "corrupt";

#[derive(Debug, Default)]
struct Jobs {
    /// Jobs loaded from disk so far
    entries: HashMap<JobId, Vec<LogEntry>>,
    /// Jobs whose unreadable file is still in place; never written back
    memory_only: HashSet<JobId>,
}

/// Durable cache with one file per job
#[derive(Debug)]
pub struct FileLogCache {
    dir: PathBuf,
    jobs: Mutex<Jobs>,
}

impl FileLogCache {
    /// Opens a cache rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        Ok(Self {
            dir,
            jobs: Mutex::new(Jobs::default()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding a job's entries
    pub fn path_for(&self, job_id: JobId) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", FILE_PREFIX, job_id, FILE_SUFFIX))
    }

    /// Reads a job's entries from disk
    ///
    /// Returns an empty sequence if the job has no file.
    pub fn load(&self, job_id: JobId) -> Result<Vec<LogEntry>, CacheError> {
        let path = self.path_for(job_id);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&path, e)),
        };

        serde_json::from_str(&contents).map_err(|source| CacheError::Corrupt { path, source })
    }

    /// Overwrites a job's file with `entries`
    ///
    /// Writes to a temp file and renames it over the old one.
    pub fn persist(&self, job_id: JobId, entries: &[LogEntry]) -> Result<(), CacheError> {
        let path = self.path_for(job_id);
        let temp_path = path.with_extension("json.tmp");

        let json = serde_json::to_vec_pretty(entries)?;
        fs::write(&temp_path, json).map_err(|e| CacheError::io(&temp_path, e))?;
        fs::rename(&temp_path, &path).map_err(|e| CacheError::io(&path, e))?;

        Ok(())
    }

    /// Moves a job's file aside, returning where it went
    pub fn quarantine(&self, job_id: JobId) -> Result<PathBuf, CacheError> {
        let path = self.path_for(job_id);
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6f");
        let target = path.with_extension(format!("json.{}-{}", CORRUPT_MARKER, stamp));

        fs::rename(&path, &target).map_err(|e| CacheError::io(&path, e))?;
        Ok(target)
    }

    fn lock(&self) -> MutexGuard<'_, Jobs> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads a job for first use, setting an unreadable file aside
    fn load_or_quarantine(&self, job_id: JobId, memory_only: &mut HashSet<JobId>) -> Vec<LogEntry> {
        let e = match self.load(job_id) {
            Ok(entries) => return entries,
            Err(e) => e,
        };

        match self.quarantine(job_id) {
            Ok(target) => {
                tracing::warn!(
                    "Unreadable log cache for job {} moved to {}: {}",
                    job_id,
                    target.display(),
                    e
                );
            }
            Err(move_err) => {
                tracing::error!(
                    "Unreadable log cache for job {} left in place, keeping job in memory: {} ({})",
                    job_id,
                    e,
                    move_err
                );
                memory_only.insert(job_id);
            }
        }

        Vec::new()
    }

    /// Runs `f` on the job's sequence, loading it from disk on first use
    ///
    /// When `write_back` is set the sequence is persisted afterwards.
    fn with_job<R>(
        &self,
        job_id: JobId,
        write_back: bool,
        f: impl FnOnce(&mut Vec<LogEntry>) -> R,
    ) -> R {
        let mut guard = self.lock();
        let Jobs {
            entries,
            memory_only,
        } = &mut *guard;

        let job = match entries.entry(job_id) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                slot.insert(self.load_or_quarantine(job_id, memory_only))
            }
        };

        let result = f(job);

        if write_back && !memory_only.contains(&job_id) {
            if let Err(e) = self.persist(job_id, job) {
                tracing::warn!("Failed to persist log cache for job {}: {}", job_id, e);
            }
        }

        result
    }

    /// Job ids that have a cache file on disk
    fn jobs_on_disk(&self) -> Vec<JobId> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) => {
                tracing::warn!("Failed to list log cache {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        read_dir
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| job_id_from_file_name(&entry.file_name().to_string_lossy()))
            .collect()
    }
}

fn job_id_from_file_name(name: &str) -> Option<JobId> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse::<u64>()
        .ok()
        .and_then(JobId::new)
}

impl LogCache for FileLogCache {
    fn append(&self, job_id: JobId, entry: LogEntry) {
        self.with_job(job_id, true, |entries| entries.push(entry));
    }

    fn drain(&self, job_id: JobId) -> Vec<LogEntry> {
        self.with_job(job_id, true, std::mem::take)
    }

    fn peek(&self, job_id: JobId) -> Vec<LogEntry> {
        self.with_job(job_id, false, |entries| entries.clone())
    }

    fn requeue(&self, job_id: JobId, restored: Vec<LogEntry>) {
        if restored.is_empty() {
            return;
        }
        self.with_job(job_id, true, |entries| restore_front(entries, restored));
    }

    fn pending_jobs(&self) -> Vec<JobId> {
        let mut jobs = self.jobs_on_disk();
        jobs.extend(self.lock().entries.keys().copied());
        jobs.sort();
        jobs.dedup();
        jobs.retain(|job_id| !self.peek(*job_id).is_empty());
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn job(id: u64) -> JobId {
        JobId::new(id).unwrap()
    }

    #[test]
    fn test_persist_and_reload_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let entries = vec![
            LogEntry::new("alice", "read", "m1"),
            LogEntry::new("alice", "save", "m2"),
            LogEntry::new("bob", "read", "m3"),
        ];

        let cache = FileLogCache::open(temp_dir.path()).unwrap();
        cache.persist(job(42), &entries).unwrap();

        let reopened = FileLogCache::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.load(job(42)).unwrap(), entries);
        assert_eq!(reopened.peek(job(42)), entries);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileLogCache::open(temp_dir.path()).unwrap();

        assert!(cache.load(job(7)).unwrap().is_empty());
        assert!(!cache.path_for(job(7)).exists());
    }

    #[test]
    fn test_appends_survive_restart() {
        let temp_dir = TempDir::new().unwrap();

        {
            let cache = FileLogCache::open(temp_dir.path()).unwrap();
            cache.append(job(5), LogEntry::new("alice", "read", "before restart"));
        }

        let cache = FileLogCache::open(temp_dir.path()).unwrap();
        cache.append(job(5), LogEntry::new("alice", "save", "after restart"));

        let messages: Vec<String> = cache
            .peek(job(5))
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["before restart", "after restart"]);
    }

    #[test]
    fn test_drain_persists_empty_state() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileLogCache::open(temp_dir.path()).unwrap();
        cache.append(job(9), LogEntry::new("alice", "read", "m1"));

        let drained = cache.drain(job(9));

        assert_eq!(drained.len(), 1);
        let on_disk = fs::read_to_string(cache.path_for(job(9))).unwrap();
        assert_eq!(on_disk.trim(), "[]");
        assert!(FileLogCache::open(temp_dir.path()).unwrap().load(job(9)).unwrap().is_empty());
    }

    fn corrupt_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.to_string_lossy().contains(".json.corrupt-"))
            .collect()
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileLogCache::open(temp_dir.path()).unwrap();
        fs::write(cache.path_for(job(3)), "not json").unwrap();

        assert!(matches!(cache.load(job(3)), Err(CacheError::Corrupt { .. })));
        // Still usable, starting from empty
        assert!(cache.peek(job(3)).is_empty());
        assert_eq!(corrupt_files(temp_dir.path()).len(), 1);
    }

    #[test]
    fn test_corrupt_file_survives_append() {
        let temp_dir = TempDir::new().unwrap();
        let cache = FileLogCache::open(temp_dir.path()).unwrap();

        let original = serde_json::to_string(&vec![LogEntry::new("alice", "save", "precious")])
            .unwrap()
            + "x";
        fs::write(cache.path_for(job(3)), &original).unwrap();

        cache.append(job(3), LogEntry::new("alice", "read", "new"));

        let moved = corrupt_files(temp_dir.path());
        assert_eq!(moved.len(), 1);
        assert_eq!(fs::read_to_string(&moved[0]).unwrap(), original);

        let reloaded = FileLogCache::open(temp_dir.path()).unwrap().load(job(3)).unwrap();
        let messages: Vec<String> = reloaded.into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["new"]);

        // Set-aside files are not mistaken for jobs
        assert_eq!(cache.pending_jobs(), vec![job(3)]);
    }

    #[test]
    fn test_pending_jobs_lists_files_with_entries() {
        let temp_dir = TempDir::new().unwrap();
        {
            let cache = FileLogCache::open(temp_dir.path()).unwrap();
            cache.append(job(12), LogEntry::new("alice", "read", "a"));
            cache.append(job(4), LogEntry::new("alice", "read", "b"));
            cache.append(job(6), LogEntry::new("alice", "read", "c"));
            cache.drain(job(6));
        }
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let cache = FileLogCache::open(temp_dir.path()).unwrap();
        assert_eq!(cache.pending_jobs(), vec![job(4), job(12)]);
    }

    #[test]
    fn test_file_name_parsing() {
        assert_eq!(job_id_from_file_name("job_17.json"), Some(job(17)));
        assert_eq!(job_id_from_file_name("job_0.json"), None);
        assert_eq!(job_id_from_file_name("job_17.json.tmp"), None);
        assert_eq!(job_id_from_file_name("sample_17.json"), None);
    }
}
