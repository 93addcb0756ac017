//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-timetable workspaces.

use crate::config::Config;
use crate::web::protocol::ServerMessage;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use timetable_core::{
    EditorSession, PortError, PortResult, ResolutionState, ReviewReport, SlotEditor, TimetableDocument,
    TimetableGrid, TimetableRepository,
};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub repo: Arc<dyn TimetableRepository>,
    pub config: Arc<Config>,
    pub events: broadcast::Sender<ServerMessage>,
    /// Loaded timetables. Each one sits behind its own lock so a clash check
    /// and the mutation that follows it can never interleave with another writer.
    workspaces: Mutex<HashMap<Uuid, Arc<Mutex<Workspace>>>>,
    pub reviews: Mutex<HashMap<Uuid, ReviewTracker>>,
}

impl AppState {
    pub fn new(repo: Arc<dyn TimetableRepository>, config: Arc<Config>) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            repo,
            config,
            events,
            workspaces: Mutex::new(HashMap::new()),
            reviews: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the workspace of `timetable_id`, loading it from the repository
    /// on first use.
    pub async fn workspace(&self, timetable_id: Uuid) -> PortResult<Arc<Mutex<Workspace>>> {
        let mut workspaces = self.workspaces.lock().await;
        if let Some(workspace) = workspaces.get(&timetable_id) {
            return Ok(workspace.clone());
        }

        let document = self.repo.load_timetable(timetable_id).await?;
        let workspace = Workspace::open(document).map_err(|e| {
            error!("Stored timetable {} is not valid: {}", timetable_id, e);
            PortError::Unexpected(format!("Stored timetable {} is not valid", timetable_id))
        })?;
        info!("Timetable {} loaded into a workspace.", timetable_id);
        let workspace = Arc::new(Mutex::new(workspace));
        workspaces.insert(timetable_id, workspace.clone());
        Ok(workspace)
    }

    /// Deletes the timetable from the repository. Writers still holding its
    /// workspace can no longer commit.
    pub async fn delete_timetable(&self, timetable_id: Uuid) -> PortResult<()> {
        self.while_closed(timetable_id, self.repo.delete_timetable(timetable_id))
            .await?;
        self.stop_review(timetable_id).await;
        Ok(())
    }

    /// Stores `document` in place of any timetable with the same id. The next
    /// request loads it into a fresh workspace.
    pub async fn replace_timetable(&self, document: &TimetableDocument) -> PortResult<()> {
        self.while_closed(document.id, self.repo.save_timetable(document))
            .await?;
        self.stop_review(document.id).await;
        Ok(())
    }

    /// Runs `change` with the cached workspace of `timetable_id` evicted, locked
    /// and closed. The map lock is held throughout so no fresh workspace can be
    /// loaded from the old document. The workspace is restored if `change` fails.
    async fn while_closed(
        &self,
        timetable_id: Uuid,
        change: impl Future<Output = PortResult<()>>,
    ) -> PortResult<()> {
        let mut workspaces = self.workspaces.lock().await;
        let cached = workspaces.remove(&timetable_id);
        let mut guard = match &cached {
            Some(workspace) => Some(workspace.lock().await),
            None => None,
        };
        if let Some(workspace) = guard.as_mut() {
            workspace.closed = true;
        }

        if let Err(e) = change.await {
            if let (Some(workspace), Some(cached)) = (guard.as_mut(), &cached) {
                workspace.closed = false;
                workspaces.insert(timetable_id, cached.clone());
            }
            return Err(e);
        }
        Ok(())
    }

    async fn stop_review(&self, timetable_id: Uuid) {
        if let Some(tracker) = self.reviews.lock().await.remove(&timetable_id) {
            tracker.token.cancel();
        }
    }

    /// Persists the workspace's pending grid events and broadcasts them.
    /// Must be called while the workspace lock is held.
    ///
    /// Events are drained only once the document is saved. On a failed save
    /// the in-memory grid stays ahead of the repository and its events go out
    /// with the next successful commit.
    pub async fn commit(&self, workspace: &mut Workspace) -> PortResult<()> {
        if workspace.closed {
            return Err(PortError::NotFound(format!(
                "Timetable {} was deleted or replaced",
                workspace.document.id
            )));
        }
        if !workspace.grid.has_events() {
            return Ok(());
        }
        workspace.document.sync_from(&workspace.grid);
        self.repo.save_timetable(&workspace.document).await?;

        let timetable_id = workspace.document.id;
        for event in workspace.grid.take_events() {
            self.publish(ServerMessage::from_grid_event(timetable_id, event));
        }
        Ok(())
    }

    /// Sends `message` to every WebSocket subscriber. Having none is fine.
    pub fn publish(&self, message: ServerMessage) {
        let _ = self.events.send(message);
    }
}

//=========================================================================================
// Workspace (One Loaded Timetable)
//=========================================================================================

/// A loaded timetable: its grid plus the resolution state of each editor.
pub struct Workspace {
    pub document: TimetableDocument,
    pub grid: TimetableGrid,
    editors: HashMap<Uuid, SlotEditor>,
    /// Set once the timetable is deleted or replaced; commits then fail.
    closed: bool,
}

impl Workspace {
    pub fn open(document: TimetableDocument) -> Result<Self, timetable_core::GridError> {
        let grid = document.to_grid()?;
        Ok(Self {
            document,
            grid,
            editors: HashMap::new(),
            closed: false,
        })
    }

    /// The grid together with the editor of `session`, borrowed side by side.
    pub fn editing(&mut self, session: &EditorSession) -> (&mut TimetableGrid, &mut SlotEditor) {
        (&mut self.grid, self.editors.entry(session.user_id).or_default())
    }

    pub fn resolution_state(&self, session: &EditorSession) -> ResolutionState {
        self.editors
            .get(&session.user_id)
            .map(|editor| editor.state().clone())
            .unwrap_or_default()
    }
}

//=========================================================================================
// Review Tracking
//=========================================================================================

/// The latest review request of one timetable.
#[derive(Default)]
pub struct ReviewTracker {
    /// Cancels the running review. Replaced for every new request.
    pub token: CancellationToken,
    pub last_report: Option<ReviewReport>,
}
