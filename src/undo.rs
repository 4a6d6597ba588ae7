//! Undo/Redo history for geometry-affecting mutations.
//!
//! Each undoable action is a [`Command`] that knows how to reverse itself on
//! the [`AnnotationStore`]. Selection, tool mode and lock state are never
//! recorded. Applying a command returns [`Replay`] items describing what
//! changed locally so the caller can re-submit them to the backend.

use crate::model::{Annotation, AnnotationId, Geometry};
use crate::state::AnnotationStore;

// ============================================================================
// Command Types
// ============================================================================

/// A command that can be undone and redone.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// An annotation was created
    AddAnnotation { annotation: Annotation },
    /// An annotation was deleted from draw position `index`
    RemoveAnnotation { index: usize, annotation: Annotation },
    /// An annotation's geometry changed
    ModifyGeometry {
        id: AnnotationId,
        old: Geometry,
        new: Geometry,
    },
    /// Several commands undone and redone as one step
    Batch {
        description: String,
        commands: Vec<Command>,
    },
}

impl Command {
    /// Get a human-readable description of this command
    pub fn description(&self) -> String {
        match self {
            Command::AddAnnotation { annotation } => {
                format!("Add {}", annotation.kind().name())
            }
            Command::RemoveAnnotation { annotation, .. } => {
                format!("Delete {}", annotation.kind().name())
            }
            Command::ModifyGeometry { new, .. } => format!("Edit {}", new.kind().name()),
            Command::Batch { description, .. } => description.clone(),
        }
    }
}

/// A local change made by undo/redo that must be re-submitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Replay {
    /// The annotation exists locally again and has no remote counterpart.
    Created(AnnotationId),
    /// The annotation's geometry changed.
    Updated(AnnotationId),
    /// The annotation was removed locally; carries its last remote identity.
    Deleted(Annotation),
}

// ============================================================================
// History Manager
// ============================================================================

/// Configuration for the history
#[derive(Debug, Clone)]
pub struct UndoConfig {
    /// Maximum number of commands to keep in history
    pub max_history: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_history: crate::constants::UNDO_HISTORY_SIZE,
        }
    }
}

/// Bounded linear undo/redo history.
///
/// A new command discards the redo branch. Once `max_history` is exceeded
/// the oldest command is dropped.
#[derive(Debug, Clone, Default)]
pub struct HistoryManager {
    /// Commands that can be undone (most recent at the end)
    undo_stack: Vec<Command>,
    /// Commands that can be redone (most recent at the end)
    redo_stack: Vec<Command>,
    config: UndoConfig,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: UndoConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Record a command that has already been applied.
    pub fn push(&mut self, command: Command) {
        log::debug!("Undo: recorded '{}'", command.description());
        self.undo_stack.push(command);
        self.redo_stack.clear();

        if self.undo_stack.len() > self.config.max_history {
            let excess = self.undo_stack.len() - self.config.max_history;
            self.undo_stack.drain(..excess);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Undo the most recent command on `store`.
    ///
    /// Returns `None` when there is nothing to undo.
    pub fn undo(&mut self, store: &mut AnnotationStore) -> Option<Vec<Replay>> {
        let cmd = self.undo_stack.pop()?;
        log::debug!("Undo: '{}'", cmd.description());
        let mut replay = Vec::new();
        apply_undo(&cmd, store, &mut replay);
        self.redo_stack.push(cmd);
        Some(replay)
    }

    /// Redo the most recently undone command on `store`.
    pub fn redo(&mut self, store: &mut AnnotationStore) -> Option<Vec<Replay>> {
        let cmd = self.redo_stack.pop()?;
        log::debug!("Redo: '{}'", cmd.description());
        let mut replay = Vec::new();
        apply_redo(&cmd, store, &mut replay);
        self.undo_stack.push(cmd);
        Some(replay)
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(|c| c.description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|c| c.description())
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("Undo history cleared");
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

// ============================================================================
// Undo/Redo Execution
// ============================================================================

fn apply_undo(cmd: &Command, store: &mut AnnotationStore, replay: &mut Vec<Replay>) {
    match cmd {
        Command::AddAnnotation { annotation } => {
            if let Some((_, removed)) = store.remove(annotation.id) {
                replay.push(Replay::Deleted(removed));
            }
        }
        Command::RemoveAnnotation { index, annotation } => {
            store.restore(*index, detached(annotation));
            replay.push(Replay::Created(annotation.id));
        }
        Command::ModifyGeometry { id, old, .. } => {
            if store.set_geometry(*id, old.clone()).is_some() {
                replay.push(Replay::Updated(*id));
            }
        }
        Command::Batch { commands, .. } => {
            for cmd in commands.iter().rev() {
                apply_undo(cmd, store, replay);
            }
        }
    }
}

fn apply_redo(cmd: &Command, store: &mut AnnotationStore, replay: &mut Vec<Replay>) {
    match cmd {
        Command::AddAnnotation { annotation } => {
            store.restore(usize::MAX, detached(annotation));
            replay.push(Replay::Created(annotation.id));
        }
        Command::RemoveAnnotation { annotation, .. } => {
            if let Some((_, removed)) = store.remove(annotation.id) {
                replay.push(Replay::Deleted(removed));
            }
        }
        Command::ModifyGeometry { id, new, .. } => {
            if store.set_geometry(*id, new.clone()).is_some() {
                replay.push(Replay::Updated(*id));
            }
        }
        Command::Batch { commands, .. } => {
            for cmd in commands {
                apply_redo(cmd, store, replay);
            }
        }
    }
}

/// A restored annotation no longer exists remotely and must be created again.
fn detached(annotation: &Annotation) -> Annotation {
    Annotation {
        remote_id: None,
        version: 0,
        ..annotation.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
