use std::path::{Path, PathBuf};

use hf_errors::StorageError;
use hf_types::Note;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

/// Durable, flat-array store of [`Note`]s grouped by `file_id` at query time
/// (spec §3, §6: `metadata/notes.json`).
pub struct NotesIndex {
    path: PathBuf,
    notes: RwLock<Vec<Note>>,
}

impl NotesIndex {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let notes = hf_fs::read_json::<Vec<Note>>(&path).await?.unwrap_or_default();
        Ok(Self {
            path,
            notes: RwLock::new(notes),
        })
    }

    #[instrument(skip(self))]
    pub async fn add_note(&self, note: Note) -> Result<(), StorageError> {
        let snapshot = {
            let mut notes = self.notes.write().await;
            notes.push(note);
            notes.clone()
        };
        self.persist(&snapshot).await
    }

    #[instrument(skip(self))]
    pub async fn update_note(&self, id: Uuid, text: String) -> Result<Note, StorageError> {
        let (updated, snapshot) = {
            let mut notes = self.notes.write().await;
            let note = notes
                .iter_mut()
                .find(|n| n.id == id)
                .ok_or_else(|| StorageError::HashNotFound(id.to_string()))?;
            note.text = text;
            note.updated_at = chrono::Utc::now();
            (note.clone(), notes.clone())
        };
        self.persist(&snapshot).await?;
        Ok(updated)
    }

    pub async fn notes_for_file(&self, file_id: Uuid) -> Vec<Note> {
        self.notes
            .read()
            .await
            .iter()
            .filter(|n| n.file_id == file_id)
            .cloned()
            .collect()
    }

    /// Deletes all notes for `file_id` in one pass, returning the count
    /// removed (spec §3: "explicit operation").
    #[instrument(skip(self))]
    pub async fn delete_notes_for_file(&self, file_id: Uuid) -> Result<usize, StorageError> {
        let (removed, snapshot) = {
            let mut notes = self.notes.write().await;
            let before = notes.len();
            notes.retain(|n| n.file_id != file_id);
            (before - notes.len(), notes.clone())
        };
        self.persist(&snapshot).await?;
        Ok(removed)
    }

    async fn persist(&self, entries: &[Note]) -> Result<(), StorageError> {
        hf_fs::write_json_atomic(&self.path, &entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn index_in_tempdir() -> (NotesIndex, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let index = NotesIndex::load(dir.path().join("notes.json"))
            .await
            .expect("loads");
        (index, dir)
    }

    #[tokio::test]
    async fn notes_for_file_returns_only_matching_notes() {
        let (index, _dir) = index_in_tempdir().await;
        let file_a = Uuid::new_v4();
        let file_b = Uuid::new_v4();

        index
            .add_note(Note::new(file_a, "first".to_string(), "alice".to_string()))
            .await
            .unwrap();
        index
            .add_note(Note::new(file_a, "second".to_string(), "alice".to_string()))
            .await
            .unwrap();
        index
            .add_note(Note::new(file_b, "other file".to_string(), "bob".to_string()))
            .await
            .unwrap();

        let notes = index.notes_for_file(file_a).await;
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.file_id == file_a));
    }

    #[tokio::test]
    async fn update_note_changes_text_and_bumps_updated_at() {
        let (index, _dir) = index_in_tempdir().await;
        let note = Note::new(Uuid::new_v4(), "draft".to_string(), "alice".to_string());
        let created_at = note.created_at;
        index.add_note(note.clone()).await.unwrap();

        let updated = index
            .update_note(note.id, "final".to_string())
            .await
            .unwrap();

        assert_eq!(updated.text, "final");
        assert_eq!(updated.created_at, created_at);
        assert!(updated.updated_at >= created_at);
    }

    #[tokio::test]
    async fn update_note_fails_for_unknown_id() {
        let (index, _dir) = index_in_tempdir().await;
        let err = index
            .update_note(Uuid::new_v4(), "text".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::HashNotFound(_)));
    }

    #[tokio::test]
    async fn delete_notes_for_file_removes_only_that_files_notes() {
        let (index, _dir) = index_in_tempdir().await;
        let file_a = Uuid::new_v4();
        let file_b = Uuid::new_v4();
        index
            .add_note(Note::new(file_a, "a".to_string(), "alice".to_string()))
            .await
            .unwrap();
        index
            .add_note(Note::new(file_a, "b".to_string(), "alice".to_string()))
            .await
            .unwrap();
        index
            .add_note(Note::new(file_b, "c".to_string(), "bob".to_string()))
            .await
            .unwrap();

        let removed = index.delete_notes_for_file(file_a).await.unwrap();
        assert_eq!(removed, 2);
        assert!(index.notes_for_file(file_a).await.is_empty());
        assert_eq!(index.notes_for_file(file_b).await.len(), 1);
    }
}
