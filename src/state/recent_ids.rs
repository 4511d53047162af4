//! The recent-id set: the last 50 `client_msg_id`s that were emitted.
//!
//! Slack delivers the same user message more than once (push plus history,
//! or `message` plus `app_mention` for a mention), always with the same
//! `client_msg_id`. Remembering the last few ids is enough to collapse
//! those duplicates, because re-deliveries cluster near the present.
//!
//! On disk: newline-separated ids, oldest first, most recent last, no
//! trailing newline.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::types::ClientMsgId;

use super::{fsync, StateError};

/// How many ids are retained. Old ids fall off as new ones arrive.
pub const MAX_RECENT_IDS: usize = 50;

/// Durable bounded set of recently emitted message ids.
#[derive(Debug)]
pub struct RecentIdSet {
    path: PathBuf,
    ids: Mutex<VecDeque<ClientMsgId>>,
}

impl RecentIdSet {
    /// Opens the store, reading any persisted ids.
    ///
    /// A missing file is an empty set. Blank lines are ignored. A file
    /// longer than the cap is kept whole in memory until the next record
    /// trims it, so nothing is forgotten just by restarting.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let raw = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        let ids = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ClientMsgId::from)
            .collect();
        Ok(RecentIdSet {
            path,
            ids: Mutex::new(ids),
        })
    }

    /// Checks whether `id` was seen recently, recording it if not.
    ///
    /// Returns `Ok(true)` for a duplicate. An empty id is never a
    /// duplicate and is never recorded; id-less events (bot and system
    /// messages) would otherwise all collapse into one.
    ///
    /// On a persistence error the id is already recorded in memory, so
    /// dedupe keeps working for the rest of the run; the caller decides
    /// whether the error is worth more than a warning.
    pub fn check_and_record(&self, id: &ClientMsgId) -> Result<bool, StateError> {
        if id.is_empty() {
            return Ok(false);
        }
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if ids.contains(id) {
            return Ok(true);
        }
        ids.push_back(id.clone());
        while ids.len() > MAX_RECENT_IDS {
            ids.pop_front();
        }
        let joined = ids
            .iter()
            .map(ClientMsgId::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        fsync::write_atomic(&self.path, joined.as_bytes())?;
        Ok(false)
    }

    pub fn len(&self) -> usize {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn set_at(dir: &tempfile::TempDir) -> RecentIdSet {
        RecentIdSet::load(dir.path().join("seen-ids")).unwrap()
    }

    fn id(n: usize) -> ClientMsgId {
        ClientMsgId::new(format!("msg-{n:04}"))
    }

    #[test]
    fn first_sighting_is_fresh_second_is_duplicate() {
        let dir = tempdir().unwrap();
        let set = set_at(&dir);

        assert!(!set.check_and_record(&id(1)).unwrap());
        assert!(set.check_and_record(&id(1)).unwrap());
    }

    #[test]
    fn empty_id_is_never_a_duplicate_and_never_stored() {
        let dir = tempdir().unwrap();
        let set = set_at(&dir);
        let empty = ClientMsgId::new("");

        assert!(!set.check_and_record(&empty).unwrap());
        assert!(!set.check_and_record(&empty).unwrap());
        assert!(set.is_empty());
        assert!(!dir.path().join("seen-ids").exists());
    }

    #[test]
    fn oldest_id_is_evicted_at_capacity() {
        let dir = tempdir().unwrap();
        let set = set_at(&dir);

        for n in 0..MAX_RECENT_IDS {
            set.check_and_record(&id(n)).unwrap();
        }
        assert_eq!(set.len(), MAX_RECENT_IDS);

        set.check_and_record(&id(MAX_RECENT_IDS)).unwrap();
        assert_eq!(set.len(), MAX_RECENT_IDS);

        // id(0) fell off, so it reads as fresh again.
        assert!(!set.check_and_record(&id(0)).unwrap());
    }

    #[test]
    fn ids_survive_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seen-ids");

        let set = RecentIdSet::load(&path).unwrap();
        set.check_and_record(&id(1)).unwrap();
        set.check_and_record(&id(2)).unwrap();
        drop(set);

        let reloaded = RecentIdSet::load(&path).unwrap();
        assert!(reloaded.check_and_record(&id(2)).unwrap());
        assert!(!reloaded.check_and_record(&id(3)).unwrap());
    }

    #[test]
    fn file_is_oldest_first_with_no_trailing_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seen-ids");
        let set = RecentIdSet::load(&path).unwrap();

        set.check_and_record(&ClientMsgId::new("a")).unwrap();
        set.check_and_record(&ClientMsgId::new("b")).unwrap();
        set.check_and_record(&ClientMsgId::new("c")).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\nc");
    }

    #[test]
    fn oversized_file_is_honored_then_trimmed_on_next_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seen-ids");
        let lines: Vec<String> = (0..60).map(|n| format!("old-{n:02}")).collect();
        std::fs::write(&path, lines.join("\n")).unwrap();

        let set = RecentIdSet::load(&path).unwrap();
        // Everything in the file still counts as seen.
        assert!(set
            .check_and_record(&ClientMsgId::new("old-05"))
            .unwrap());

        set.check_and_record(&ClientMsgId::new("fresh")).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let saved: Vec<&str> = contents.lines().collect();
        assert_eq!(saved.len(), MAX_RECENT_IDS);
        assert_eq!(saved.first(), Some(&"old-11"));
        assert_eq!(saved.last(), Some(&"fresh"));
    }

    proptest! {
        #[test]
        fn never_grows_past_the_cap(
            ids in proptest::collection::vec("[a-e][0-9]{2}", 0..150)
        ) {
            let dir = tempdir().unwrap();
            let set = set_at(&dir);
            for raw in ids {
                set.check_and_record(&ClientMsgId::new(raw)).unwrap();
            }
            prop_assert!(set.len() <= MAX_RECENT_IDS);
        }
    }
}
