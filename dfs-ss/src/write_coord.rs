//! The interactive per-sentence WRITE protocol:
//!
//! ```text
//! IDLE ── WRITE filename n, authorized, n valid ──▶ LOCKED
//! LOCKED ── "<wi> <text>" ──▶ LOCKED (edit buffer updated, ack)
//! LOCKED ── "ETIRW" ──▶ COMMITTING ──▶ IDLE (lock released, "Write Successful")
//! LOCKED ── peer close / error ──▶ IDLE (lock released, file unchanged)
//! ```
//!
//! [`WriteSession`] owns the file's undo snapshot, the lock marker and
//! the working sentence array for exactly one session, and is consumed
//! by [`WriteSession::commit`] or [`WriteSession::abort`] -- whichever
//! happens, the session object stops existing and its resources are
//! released.

use crate::acl_store::AclStore;
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::locks::{self, LockTable};
use crate::sentence::{self, join_sentences, non_empty_or_dot};
use crate::undo::UndoEngine;

pub struct WriteSession<'a> {
    layout: &'a Layout,
    locks: &'a LockTable,
    name: String,
    sentence_index: usize,
    sentences: Vec<String>,
    /// true once the sentence array held `sentence_index` sentences on
    /// disk at session start; false means this session is appending a
    /// brand-new tail sentence.
    had_index: bool,
    user: String,
    snapshotted: bool,
}

/// Outcome of trying to open a session.
pub enum StartOutcome<'a> {
    Locked { session: WriteSession<'a>, ack: String },
    AlreadyLocked,
}

impl<'a> WriteSession<'a> {
    pub async fn start(
        layout: &'a Layout,
        locks: &'a LockTable,
        name: &str,
        sentence_index: usize,
        user: &str,
    ) -> Result<StartOutcome<'a>> {
        let guard = locks.lock_file(name).await;

        let store = AclStore::new(layout);
        // Auto-create an empty file (with its ACL sidecar) the first
        // time it's written to.
        if tokio::fs::metadata(layout.file_path(name)).await.is_err() {
            tokio::fs::create_dir_all(layout.files_dir()).await?;
            tokio::fs::File::create(layout.file_path(name)).await?;
            store.create(name, user).await?;
        }
        store.check_write(name, user).await?;

        let text = tokio::fs::read_to_string(layout.file_path(name)).await?;
        if text.is_empty() && sentence_index != 0 {
            return Err(Error::Range("File is empty. Only sentence 0 can be edited.".to_string()));
        }
        let range = sentence::valid_range(&text);
        if !range.contains(&sentence_index) {
            let suffix = if text.ends_with(sentence::is_delim) {
                " (file ends with punctuation)."
            } else {
                "."
            };
            return Err(Error::Range(format!(
                "Invalid sentence number. Valid range is {} to {}{suffix}",
                range.start(),
                range.end()
            )));
        }

        drop(guard);

        if !locks::try_create_lock(layout, name, sentence_index).await? {
            return Ok(StartOutcome::AlreadyLocked);
        }

        let sentences = sentence::split_sentences(&text);
        let had_index = sentence_index < sentences.len();

        let ack = format!("Sentence {sentence_index} locked. You may begin writing.\n");
        Ok(StartOutcome::Locked {
            session: WriteSession {
                layout,
                locks,
                name: name.to_string(),
                sentence_index,
                sentences,
                had_index,
                user: user.to_string(),
                snapshotted: false,
            },
            ack,
        })
    }

    fn working(&self) -> &str {
        if self.had_index {
            &self.sentences[self.sentence_index]
        } else {
            ""
        }
    }

    /// Applies one `"<word_index> <content>"` edit line.
    pub async fn apply_edit(&mut self, word_index: usize, content: &str) -> Result<String> {
        if !self.snapshotted {
            let undo = UndoEngine::new(self.layout);
            undo.snapshot(&self.name).await?;
            self.snapshotted = true;
        }

        let new_sentence = sentence::insert_word(self.working(), word_index, content)
            .ok_or_else(|| Error::Range("Word index out of range.".to_string()))?;

        let split = sentence::split_sentences(&new_sentence);
        if split.len() > 1 {
            // Splicing in new delimiters shifts the following sentences
            // right to make room, and the session keeps editing the
            // first of the newly split sentences.
            let tail = if self.had_index { self.sentences.split_off(self.sentence_index + 1) } else { Vec::new() };
            self.sentences.truncate(self.sentence_index);
            self.sentences.extend(split.clone());
            self.sentences.extend(tail);
            self.had_index = true;
        } else if self.had_index {
            self.sentences[self.sentence_index] = new_sentence;
        } else {
            self.sentences.push(new_sentence);
            self.had_index = true;
        }

        Ok("Update applied successfully.\n".to_string())
    }

    /// `ETIRW`: writes the sentence back into the array (extending it if
    /// this was a new tail sentence), rewrites the whole file, releases
    /// the lock and returns the "Write Successful!" message.
    pub async fn commit(self) -> Result<String> {
        let _guard = self.locks.lock_file(&self.name).await;

        let working = non_empty_or_dot(self.working());
        let mut sentences = self.sentences.clone();
        if self.had_index {
            sentences[self.sentence_index] = working;
        } else {
            sentences.push(working);
        }

        let body = join_sentences(&sentences);
        tokio::fs::write(self.layout.file_path(&self.name), body).await?;

        let store = AclStore::new(self.layout);
        store.touch_modified(&self.name).await?;

        locks::release_lock(self.layout, &self.name, self.sentence_index).await;
        Ok("Write Successful!\n".to_string())
    }

    /// Peer closed or errored mid-session: discard the working buffer
    /// and release the lock, leaving the file untouched.
    pub async fn abort(self) {
        locks::release_lock(self.layout, &self.name, self.sentence_index).await;
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}
