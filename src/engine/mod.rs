//! Top-level coordinator.
//!
//! [`AnnotationEngine`] owns every subsystem and passes each one the state it
//! needs explicitly: the interaction machine gets an edit context, the render
//! pipeline a scene, the outbox the store. Input handlers run to completion;
//! remote work happens only in the async methods the host drives
//! ([`AnnotationEngine::flush`], [`AnnotationEngine::tick`], image switches and
//! conflict resolution).

use std::collections::HashMap;

use thiserror::Error;
use web_time::Instant;

use crate::config::EngineConfig;
use crate::interaction::{EditContext, Effect, Gesture, InteractionMachine, Key, Modifiers, MouseButton};
use crate::keybindings::{KeyAction, KeyBindings};
use crate::model::{
    Annotation, AnnotationId, ClassDef, Geometry, GeometryKind, ImageInfo, ImageSize, Point,
};
use crate::persistence::{
    AnnotationApi, ApiError, ConflictInfo, ConflictResolution, LockApi, LockEvent, LockManager,
    LockState, LockStatus, Mutation, SubmitOutcome, SyncQueue, submit,
};
use crate::render::{DrawSurface, RenderPipeline, Scene};
use crate::state::{AnnotationStore, ImageStatus, Selection};
use crate::tools::{AnnotationTool, GeometryError, ToolRegistry};
use crate::undo::{Command, HistoryManager, Replay, UndoConfig};
use crate::zoom_math::ViewTransform;

// ============================================================================
// Host Interface
// ============================================================================

/// Something the host should show the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Warning(String),
    Error(String),
    /// A finished shape waits for a class; the host shows its picker.
    ChooseClass(GeometryKind),
    /// A save hit a newer server version; the user must reload or overwrite.
    Conflict { local: AnnotationId, info: ConflictInfo },
    /// Editing is refused because the image lock is not held.
    LockBlocked { holder: Option<String> },
    /// The lock heartbeat failed; editing is disabled.
    LockLost,
}

/// Notification primitives the host UI provides.
pub trait HostUi {
    fn notify(&mut self, notice: Notice);
}

/// Collects notices, for tests and headless runs.
impl HostUi for Vec<Notice> {
    fn notify(&mut self, notice: Notice) {
        self.push(notice);
    }
}

/// Host that only logs notices.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHost;

impl HostUi for LogHost {
    fn notify(&mut self, notice: Notice) {
        match notice {
            Notice::Error(message) => log::error!("{}", message),
            Notice::Warning(message) => log::warn!("{}", message),
            other => log::info!("Notice: {:?}", other),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors from engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No image is open")]
    NoImage,

    #[error("The image lock is not held by this session")]
    LockNotHeld,

    #[error("The active task defines no classes")]
    NoClasses,

    #[error("Unknown class {0}")]
    UnknownClass(u32),

    #[error("No shape is waiting for a class")]
    NoPendingShape,

    #[error("Unknown annotation {0}")]
    UnknownAnnotation(AnnotationId),

    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Remote call failed: {0}")]
    Api(#[from] ApiError),
}

/// Counts from one [`AnnotationEngine::flush`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub saved: usize,
    pub conflicts: usize,
    pub failed: usize,
}

// ============================================================================
// Engine
// ============================================================================

/// The interactive annotation engine for one viewport.
pub struct AnnotationEngine<H: HostUi> {
    host: H,
    config: EngineConfig,
    keybindings: KeyBindings,
    registry: ToolRegistry,
    store: AnnotationStore,
    machine: InteractionMachine,
    history: HistoryManager,
    outbox: SyncQueue,
    lock: LockManager,
    renderer: RenderPipeline,
    transform: ViewTransform,
    viewport: ImageSize,
    image: Option<ImageInfo>,
    classes: Vec<ClassDef>,
    /// Conflicts waiting for a user decision, by local id
    conflicts: HashMap<AnnotationId, ConflictInfo>,
}

impl<H: HostUi> AnnotationEngine<H> {
    pub fn new(host: H, config: EngineConfig, viewport: ImageSize) -> Self {
        let prefs = &config.preferences;
        let history = HistoryManager::with_config(UndoConfig {
            max_history: prefs.history_size,
        });
        let lock = LockManager::new(prefs.heartbeat_interval());
        Self {
            host,
            keybindings: config.keybindings.to_keybindings(),
            registry: ToolRegistry::new(),
            store: AnnotationStore::new(),
            machine: InteractionMachine::new(),
            history,
            outbox: SyncQueue::new(),
            lock,
            renderer: RenderPipeline::new(),
            transform: ViewTransform::centered(viewport, viewport),
            viewport,
            image: None,
            classes: Vec::new(),
            conflicts: HashMap::new(),
            config,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    pub fn image(&self) -> Option<&ImageInfo> {
        self.image.as_ref()
    }

    pub fn tool(&self) -> AnnotationTool {
        self.machine.tool()
    }

    pub fn gesture(&self) -> &Gesture {
        self.machine.gesture()
    }

    pub fn pending_geometry(&self) -> Option<&Geometry> {
        self.machine.pending().map(|p| &p.geometry)
    }

    pub fn lock_state(&self) -> &LockState {
        self.lock.state()
    }

    /// Mutations queued but not yet sent.
    pub fn queued_mutations(&self) -> usize {
        self.outbox.len()
    }

    /// Unresolved conflict for an annotation.
    pub fn conflict(&self, local: AnnotationId) -> Option<&ConflictInfo> {
        self.conflicts.get(&local)
    }

    /// Pointer position in image space, for the host's magnifier.
    pub fn cursor_image_position(&self) -> Option<Point> {
        self.machine.cursor()
    }

    pub fn keybindings_mut(&mut self) -> &mut KeyBindings {
        &mut self.keybindings
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    /// Classes of the active task.
    pub fn set_classes(&mut self, classes: Vec<ClassDef>) {
        log::debug!("🏷️ {} classes", classes.len());
        self.classes = classes;
    }

    pub fn set_viewport(&mut self, viewport: ImageSize) {
        self.viewport = viewport;
        self.transform.viewport = viewport;
        self.store.mark_dirty();
    }

    pub fn set_tool(&mut self, tool: AnnotationTool) {
        self.machine.set_tool(tool);
        self.store.mark_dirty();
    }

    /// Open an image: settle the old one, load annotations and take the new lock.
    ///
    /// Queued edits of the old image are sent while its lock is still held
    /// and its history is cleared. In-progress gestures and pending shapes are
    /// discarded. Failing to load annotations is an error; failing to take
    /// the lock only leaves the image read-only.
    pub async fn switch_image<A: AnnotationApi, L: LockApi>(
        &mut self,
        api: &A,
        lock_api: &L,
        image: ImageInfo,
        now: Instant,
    ) -> Result<(), EngineError> {
        self.abort_gesture();
        self.machine.reset();
        self.store.select(None);
        if self.image.is_some() {
            self.settle_before_release(api).await;
            self.lock.release(lock_api).await;
            self.image = None;
        }

        log::info!("🖼️ Opening image {}/{}", image.project_id, image.image_id);
        self.transform = ViewTransform::centered(self.viewport, image.size);
        let loaded = api.list(&image.project_id, &image.image_id).await?;
        let ids = self.store.replace_image(&image.image_id, loaded);
        log::info!("Loaded {} annotations", ids.len());

        match self
            .lock
            .acquire(lock_api, &image.project_id, &image.image_id, now)
            .await
        {
            Ok(LockState::HeldByOther { holder }) => {
                let holder = holder.clone();
                self.host.notify(Notice::LockBlocked {
                    holder: Some(holder),
                });
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("Could not acquire lock: {}", e);
                self.host
                    .notify(Notice::Warning(format!("Image is read-only: {}", e)));
            }
        }

        self.image = Some(image);
        self.store.mark_dirty();
        Ok(())
    }

    /// Send what is queued and release the lock at session end. The release
    /// is best-effort.
    pub async fn close<A: AnnotationApi, L: LockApi>(&mut self, api: &A, lock_api: &L) {
        self.abort_gesture();
        self.machine.reset();
        self.settle_before_release(api).await;
        self.lock.release(lock_api).await;
        self.image = None;
    }

    /// Flush the open image's queue while its lock is held, then drop what
    /// could not be sent. Nothing of this image may reach the server once
    /// the lock is gone.
    async fn settle_before_release<A: AnnotationApi>(&mut self, api: &A) {
        let report = self.flush(api).await;
        if report != FlushReport::default() {
            log::info!("💾 Settled queue before release: {:?}", report);
        }
        let dropped = self.outbox.clear();
        if dropped > 0 {
            log::warn!("⚠️ Dropping {} unsent mutations: image lock not held", dropped);
            self.host.notify(Notice::Warning(format!(
                "{} unsaved changes discarded: the image lock was not held",
                dropped
            )));
        }
        if !self.conflicts.is_empty() {
            log::warn!("⚠️ Leaving {} unresolved conflicts behind", self.conflicts.len());
            self.host.notify(Notice::Warning(format!(
                "{} conflicting changes left unresolved",
                self.conflicts.len()
            )));
            self.conflicts.clear();
        }
        self.history.clear();
    }

    /// Send a heartbeat when one is due. Returns true if the lock was lost.
    pub async fn tick<L: LockApi>(&mut self, lock_api: &L, now: Instant) -> bool {
        match self.lock.tick(lock_api, now).await {
            Some(LockEvent::Lost(e)) => {
                self.abort_gesture();
                self.host.notify(Notice::LockLost);
                self.host
                    .notify(Notice::Error(format!("Lost the image lock: {}", e)));
                self.store.mark_dirty();
                true
            }
            _ => false,
        }
    }

    /// Cancel the active gesture and put back any shape it was dragging.
    fn abort_gesture(&mut self) {
        if let Gesture::PotentialDrag(drag) | Gesture::Dragging(drag) = self.machine.gesture() {
            let (id, before) = (drag.id, drag.before.clone());
            self.store.set_geometry(id, before);
        }
        self.machine.cancel();
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    fn with_context(
        &mut self,
        f: impl FnOnce(&mut InteractionMachine, &mut EditContext<'_>) -> Vec<Effect>,
    ) -> Vec<Effect> {
        let Some(image) = self.image.as_ref() else {
            return Vec::new();
        };
        let mut ctx = EditContext {
            store: &mut self.store,
            registry: &self.registry,
            transform: &mut self.transform,
            image,
            class_count: self.classes.len(),
            can_edit: self.lock.is_held(),
            prefs: &self.config.preferences,
        };
        f(&mut self.machine, &mut ctx)
    }

    pub fn pointer_down(&mut self, view: Point, button: MouseButton) {
        let effects = self.with_context(|m, ctx| m.pointer_down(ctx, view, button));
        self.apply_effects(effects);
    }

    pub fn pointer_move(&mut self, view: Point) {
        let effects = self.with_context(|m, ctx| m.pointer_move(ctx, view));
        self.apply_effects(effects);
    }

    pub fn pointer_up(&mut self, view: Point) {
        let effects = self.with_context(|m, ctx| m.pointer_up(ctx, view));
        self.apply_effects(effects);
    }

    /// Handle a key press: bound actions first, then editing keys.
    pub fn key(&mut self, key: Key, modifiers: Modifiers) {
        if let Some(action) = self.keybindings.action_for(key, modifiers) {
            match action {
                KeyAction::Tool(tool) => self.set_tool(tool),
                KeyAction::Class(index) => {
                    if self.machine.pending().is_some()
                        && let Some(class_id) = self.classes.get(index).map(|c| c.id)
                        && let Err(e) = self.choose_class(class_id)
                    {
                        self.host.notify(Notice::Warning(e.to_string()));
                    }
                }
                KeyAction::Undo => {
                    self.undo();
                }
                KeyAction::Redo => {
                    self.redo();
                }
                KeyAction::ZoomIn => self.zoom_at(self.viewport_center(), true),
                KeyAction::ZoomOut => self.zoom_at(self.viewport_center(), false),
                KeyAction::ZoomReset => {
                    self.transform = self.transform.reset();
                    self.store.mark_dirty();
                }
            }
            return;
        }
        let effects = self.with_context(|m, ctx| m.key(ctx, key, modifiers));
        self.apply_effects(effects);
    }

    fn viewport_center(&self) -> Point {
        Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0)
    }

    /// Zoom one step around a view-space point, within the configured limits.
    pub fn zoom_at(&mut self, view: Point, zoom_in: bool) {
        let prefs = &self.config.preferences;
        let target = if zoom_in {
            self.transform.zoom * prefs.zoom_factor
        } else {
            self.transform.zoom / prefs.zoom_factor
        };
        let target = target.clamp(prefs.zoom_min, prefs.zoom_max);
        self.transform = self.transform.zoom_to_cursor(target, view);
        log::trace!("Zoom {:.2}", target);
        self.store.mark_dirty();
    }

    /// Turn machine effects into queued mutations and notices.
    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Modified { id, before } => {
                    let Some(after) = self.store.get(id).map(|a| a.geometry.clone()) else {
                        continue;
                    };
                    self.history.push(Command::ModifyGeometry {
                        id,
                        old: before,
                        new: after,
                    });
                    self.outbox.push(Mutation::Update { local: id });
                    self.mark_in_progress();
                }
                Effect::Staged(GeometryKind::NoObject) => {
                    if let Err(e) = self.commit_pending(None) {
                        self.host.notify(Notice::Warning(e.to_string()));
                    }
                }
                Effect::Staged(kind) => self.host.notify(Notice::ChooseClass(kind)),
                Effect::Deleted { index, annotation } => {
                    self.queue_delete(index, annotation);
                    self.mark_in_progress();
                }
                Effect::Rejected(e) => self.host.notify(Notice::Warning(e.to_string())),
                Effect::LockBlocked => {
                    let holder = self.lock.holder().map(str::to_string);
                    self.host.notify(Notice::LockBlocked { holder });
                }
                Effect::NoClasses => self.host.notify(Notice::Warning(
                    EngineError::NoClasses.to_string(),
                )),
            }
        }
    }

    fn queue_delete(&mut self, index: usize, annotation: Annotation) {
        self.queue_removal(&annotation);
        self.history.push(Command::RemoveAnnotation { index, annotation });
    }

    /// Queue the remote side of a local removal.
    fn queue_removal(&mut self, annotation: &Annotation) {
        let local = annotation.id;
        match annotation.remote_id.clone() {
            Some(remote) => self.outbox.push(Mutation::Delete { local, remote }),
            None => {
                // Never reached the server; its queued create goes with it
                let dropped = self.outbox.discard(local);
                log::debug!("Annotation {} removed before sync ({} queued dropped)", local, dropped);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------------

    /// Create the pending shape with the chosen class.
    pub fn choose_class(&mut self, class_id: u32) -> Result<AnnotationId, EngineError> {
        let class = self
            .classes
            .iter()
            .find(|c| c.id == class_id)
            .cloned()
            .ok_or(EngineError::UnknownClass(class_id))?;
        let kind = self
            .machine
            .pending()
            .map(|p| p.geometry.kind())
            .ok_or(EngineError::NoPendingShape)?;
        if kind == GeometryKind::NoObject {
            self.commit_pending(None)
        } else {
            self.commit_pending(Some(&class))
        }
    }

    /// Discard the pending shape without creating it.
    pub fn abandon_pending(&mut self) -> bool {
        let had = self.machine.abandon_pending();
        self.store.mark_dirty();
        had
    }

    fn commit_pending(&mut self, class: Option<&ClassDef>) -> Result<AnnotationId, EngineError> {
        let image = self.image.clone().ok_or(EngineError::NoImage)?;
        if !self.lock.is_held() {
            return Err(EngineError::LockNotHeld);
        }
        let pending = self
            .machine
            .take_pending()
            .ok_or(EngineError::NoPendingShape)?;
        let kind = pending.geometry.kind();

        let mut commands = self.clear_for_singleton(&image, kind);

        let mut annotation = Annotation::new(0, &image.project_id, &image.image_id, pending.geometry);
        if let Some(class) = class {
            annotation = annotation.with_class(class.id, &class.name);
        }
        let id = self.store.insert(annotation);
        if !kind.is_whole_image() {
            self.store.select(Some(Selection::annotation(id)));
        }
        self.mark_in_progress();

        let added = self
            .store
            .get(id)
            .cloned()
            .ok_or(EngineError::UnknownAnnotation(id))?;
        let history = if commands.is_empty() {
            Command::AddAnnotation { annotation: added }
        } else {
            commands.push(Command::AddAnnotation { annotation: added });
            Command::Batch {
                description: format!("Add {}", kind.name()),
                commands,
            }
        };
        self.history.push(history);
        self.outbox.push(Mutation::Create { local: id });
        log::info!(
            "✅ Created {} annotation {} (class={:?})",
            kind.name(),
            id,
            class.map(|c| c.id)
        );
        Ok(id)
    }

    /// Remove what a new whole-image annotation replaces: prior whole-image
    /// labels for a classification, everything for a no-object marker.
    fn clear_for_singleton(&mut self, image: &ImageInfo, kind: GeometryKind) -> Vec<Command> {
        if !kind.is_whole_image() {
            return Vec::new();
        }
        let clear_all = kind == GeometryKind::NoObject;
        let doomed: Vec<AnnotationId> = self
            .store
            .for_image(&image.image_id)
            .filter(|a| clear_all || a.kind().is_whole_image())
            .map(|a| a.id)
            .collect();

        let mut commands = Vec::new();
        for id in doomed {
            let Some((index, annotation)) = self.store.remove(id) else {
                continue;
            };
            self.queue_removal(&annotation);
            commands.push(Command::RemoveAnnotation { index, annotation });
        }
        if !commands.is_empty() {
            log::info!("Replacing {} annotations with {}", commands.len(), kind.name());
        }
        commands
    }

    /// Mark images as containing nothing to annotate.
    ///
    /// The open image is cleared locally through the usual outbox. Other
    /// images are locked, cleared and marked directly against the backend;
    /// images locked by someone else are skipped. Returns how many images
    /// were marked.
    pub async fn mark_no_object<A: AnnotationApi, L: LockApi>(
        &mut self,
        api: &A,
        lock_api: &L,
        images: &[ImageInfo],
    ) -> Result<usize, EngineError> {
        let mut marked = 0;
        for target in images {
            let is_current = self
                .image
                .as_ref()
                .is_some_and(|i| i.project_id == target.project_id && i.image_id == target.image_id);
            if is_current {
                let previous = self.machine.tool();
                self.abort_gesture();
                self.machine.set_tool(AnnotationTool::NoObject);
                let staged = self.stage_no_object(target);
                self.machine.set_tool(previous);
                staged?;
                self.commit_pending(None)?;
                marked += 1;
                continue;
            }
            match Self::mark_remote_no_object(api, lock_api, target).await {
                Ok(true) => {
                    self.store.set_status(&target.image_id, ImageStatus::InProgress);
                    marked += 1;
                }
                Ok(false) => self.host.notify(Notice::Warning(format!(
                    "Skipped {}: locked by another user",
                    target.image_id
                ))),
                Err(e) => {
                    log::error!("Failed to mark {} as no-object: {}", target.image_id, e);
                    self.host.notify(Notice::Error(format!(
                        "Could not mark {}: {}",
                        target.image_id, e
                    )));
                }
            }
        }
        Ok(marked)
    }

    fn stage_no_object(&mut self, image: &ImageInfo) -> Result<(), EngineError> {
        let effects = self.with_context(|m, ctx| {
            let center = ctx.transform.image_to_view(Point::new(
                image.size.width / 2.0,
                image.size.height / 2.0,
            ));
            m.pointer_down(ctx, center, MouseButton::Left)
        });
        if effects.contains(&Effect::Staged(GeometryKind::NoObject)) {
            Ok(())
        } else if effects.contains(&Effect::LockBlocked) {
            Err(EngineError::LockNotHeld)
        } else {
            Err(EngineError::NoPendingShape)
        }
    }

    async fn mark_remote_no_object<A: AnnotationApi, L: LockApi>(
        api: &A,
        lock_api: &L,
        image: &ImageInfo,
    ) -> Result<bool, ApiError> {
        let acquired = lock_api.acquire(&image.project_id, &image.image_id).await?;
        if acquired.status == LockStatus::AlreadyLocked {
            return Ok(false);
        }

        let result = Self::replace_with_marker(api, image).await;

        if let Err(e) = lock_api.release(&image.project_id, &image.image_id).await {
            log::warn!("Failed to release lock on {}: {}", image.image_id, e);
        }
        result.map(|()| {
            log::info!("Marked {} as no-object", image.image_id);
            true
        })
    }

    /// Delete everything the server has for `image` and create a no-object marker.
    async fn replace_with_marker<A: AnnotationApi>(api: &A, image: &ImageInfo) -> Result<(), ApiError> {
        for existing in api.list(&image.project_id, &image.image_id).await? {
            if let Some(remote) = existing.remote_id.as_deref() {
                match api.delete(remote).await {
                    Ok(()) | Err(ApiError::NotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        let marker = Annotation::new(0, &image.project_id, &image.image_id, Geometry::NoObject);
        api.create(&marker).await.map(|_| ())
    }

    /// Mark the open image as reviewed.
    pub fn confirm_image(&mut self) -> Result<(), EngineError> {
        let image = self.image.as_ref().ok_or(EngineError::NoImage)?;
        self.store.set_status(&image.image_id, ImageStatus::Confirmed);
        log::info!("Image {} confirmed", image.image_id);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------------

    /// Undo the last local mutation and queue its reversal. Returns false
    /// when nothing was undone.
    pub fn undo(&mut self) -> bool {
        if !self.can_mutate() {
            return false;
        }
        self.abort_gesture();
        match self.history.undo(&mut self.store) {
            Some(replays) => {
                self.replay(replays);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if !self.can_mutate() {
            return false;
        }
        self.abort_gesture();
        match self.history.redo(&mut self.store) {
            Some(replays) => {
                self.replay(replays);
                true
            }
            None => false,
        }
    }

    fn can_mutate(&mut self) -> bool {
        if self.lock.is_held() {
            return true;
        }
        let holder = self.lock.holder().map(str::to_string);
        self.host.notify(Notice::LockBlocked { holder });
        false
    }

    /// Queue re-submissions for local changes made by undo or redo.
    fn replay(&mut self, replays: Vec<Replay>) {
        for replay in replays {
            match replay {
                Replay::Created(local) => self.outbox.push(Mutation::Create { local }),
                Replay::Updated(local) => self.outbox.push(Mutation::Update { local }),
                Replay::Deleted(annotation) => self.queue_removal(&annotation),
            }
        }
        self.mark_in_progress();
    }

    /// Any local edit leaves the open image unconfirmed.
    fn mark_in_progress(&mut self) {
        if let Some(image) = &self.image {
            self.store.set_status(&image.image_id, ImageStatus::InProgress);
        }
    }

    // ------------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------------

    /// Send every queued mutation in order.
    ///
    /// Nothing is sent while the image lock is not held; the queue waits.
    pub async fn flush<A: AnnotationApi>(&mut self, api: &A) -> FlushReport {
        let mut report = FlushReport::default();
        if !self.lock.is_held() {
            if !self.outbox.is_empty() {
                log::warn!("Holding {} queued mutations: image lock not held", self.outbox.len());
            }
            return report;
        }
        while let Some(mutation) = self.outbox.pop() {
            let Some(outcome) = submit(api, &self.store, &mutation).await else {
                log::debug!("Skipped {} of annotation {}: gone locally", mutation.name(), mutation.local());
                continue;
            };
            match &outcome {
                SubmitOutcome::Saved { .. } => report.saved += 1,
                SubmitOutcome::Conflict(_) => report.conflicts += 1,
                SubmitOutcome::Failed(_) => report.failed += 1,
            }
            self.apply_outcome(&mutation, outcome);
        }
        report
    }

    /// The single place submission outcomes are handled.
    fn apply_outcome(&mut self, mutation: &Mutation, outcome: SubmitOutcome) {
        let local = mutation.local();
        match outcome {
            SubmitOutcome::Saved { version, remote_id } => {
                if !matches!(mutation, Mutation::Delete { .. })
                    && let Some(annotation) = self.store.get_mut(local)
                {
                    annotation.version = version;
                    if let Some(remote) = remote_id {
                        annotation.remote_id = Some(remote);
                    }
                }
                self.conflicts.remove(&local);
                log::info!("💾 Saved {} of annotation {} (version {})", mutation.name(), local, version);
            }
            SubmitOutcome::Conflict(info) => {
                log::warn!(
                    "⚠️ Version conflict on annotation {}: server has {}, local is {} (last edit by {})",
                    local,
                    info.current_version,
                    info.your_version,
                    info.last_updated_by.as_deref().unwrap_or("unknown")
                );
                self.conflicts.insert(local, info.clone());
                self.host.notify(Notice::Conflict { local, info });
            }
            SubmitOutcome::Failed(e) => {
                // Local state stays as it is; nothing is retried automatically
                log::error!("Failed to {} annotation {}: {}", mutation.name(), local, e);
                self.host.notify(Notice::Error(format!(
                    "Could not save annotation {}: {}",
                    local, e
                )));
            }
        }
    }

    /// Settle a conflict by the user's choice.
    ///
    /// `Reload` replaces the open image's annotations with the server's and
    /// clears history. `Overwrite` resubmits the local geometry on top of the
    /// server's current version, discarding the other edit.
    pub async fn resolve_conflict<A: AnnotationApi>(
        &mut self,
        api: &A,
        local: AnnotationId,
        resolution: ConflictResolution,
    ) -> Result<(), EngineError> {
        let info = self
            .conflicts
            .get(&local)
            .cloned()
            .ok_or(EngineError::UnknownAnnotation(local))?;
        let image = self.image.clone().ok_or(EngineError::NoImage)?;

        match resolution {
            ConflictResolution::Reload => {
                let fresh = api.list(&image.project_id, &image.image_id).await?;
                let stale: Vec<AnnotationId> = self
                    .store
                    .for_image(&image.image_id)
                    .map(|a| a.id)
                    .collect();
                for id in &stale {
                    self.outbox.discard(*id);
                    self.conflicts.remove(id);
                }
                self.machine.cancel();
                let ids = self.store.replace_image(&image.image_id, fresh);
                self.history.clear();
                log::info!("🔄 Reloaded {} annotations for {}", ids.len(), image.image_id);
            }
            ConflictResolution::Overwrite => {
                let annotation = self
                    .store
                    .get_mut(local)
                    .ok_or(EngineError::UnknownAnnotation(local))?;
                log::warn!(
                    "Overwriting annotation {}: discarding version {} by {}",
                    local,
                    info.current_version,
                    info.last_updated_by.as_deref().unwrap_or("unknown")
                );
                annotation.version = info.current_version;
                self.conflicts.remove(&local);
                self.outbox.push(Mutation::Update { local });
                self.flush(api).await;
            }
        }
        self.store.mark_dirty();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Whether anything changed since the last [`Self::render`].
    pub fn needs_redraw(&self) -> bool {
        self.store.is_dirty()
    }

    /// Redraw the whole frame.
    pub fn render(&mut self, surface: &mut dyn DrawSurface) {
        let scene = Scene {
            store: &self.store,
            registry: &self.registry,
            image: self.image.as_ref(),
            classes: &self.classes,
            draft: self.machine.gesture().draft(),
            cursor: self.machine.cursor(),
            pending: self.machine.pending().map(|p| &p.geometry),
            lock_holder: self.lock.holder(),
        };
        self.renderer.render(surface, &self.transform, &scene);
        self.store.clear_dirty();
    }
}

#[cfg(test)]
mod tests;
