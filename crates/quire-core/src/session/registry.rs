use super::model::{RegisterMode, Session, SessionRef, SessionSummary};
use super::report::{ExecutionReport, ItemPreview, OperationReport};
use crate::address::{
    Address, AddressResolver, IdentifierResolver, ItemAddress, PositionalResolver,
};
use crate::command::Operation;
use crate::config::RegistryConfig;
use crate::engine::{EngineFactory, ExecutionEngine, ExecutionOutcome};
use crate::error::{QuireError, Result};
use crate::history::{HistorySnapshot, HistoryStep};
use crate::item::{Item, ItemId, ItemKind, ItemList, ItemOutput, ItemPatch};
use crate::store::ItemStore;
use chrono::Local;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::RwLock;

/// Registry of notebook sessions (cells addressed by index).
pub type NotebookRegistry = SessionRegistry<PositionalResolver>;

/// Registry of dialog sessions (messages addressed by identifier).
pub type DialogRegistry = SessionRegistry<IdentifierResolver>;

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<String, Session>,
    active: Option<String>,
}

impl RegistryState {
    fn target_name<R: AddressResolver>(&self, target: &SessionRef) -> Result<String> {
        match target {
            SessionRef::Active => self.active.clone().ok_or(QuireError::NoActiveSession),
            SessionRef::Named(name) if self.sessions.contains_key(name) => Ok(name.clone()),
            SessionRef::Named(name) => Err(QuireError::not_found(R::SESSION_NOUN, name)),
        }
    }

    fn session<R: AddressResolver>(&self, target: &SessionRef) -> Result<&Session> {
        let name = self.target_name::<R>(target)?;
        self.sessions
            .get(&name)
            .ok_or_else(|| QuireError::not_found(R::SESSION_NOUN, name))
    }

    fn session_mut<R: AddressResolver>(&mut self, target: &SessionRef) -> Result<&mut Session> {
        let name = self.target_name::<R>(target)?;
        self.sessions
            .get_mut(&name)
            .ok_or_else(|| QuireError::not_found(R::SESSION_NOUN, name))
    }
}

/// Names and backing paths claimed by an in-flight `register` or `release`.
#[derive(Default)]
struct Reservations {
    names: HashSet<String>,
    paths: HashSet<PathBuf>,
}

/// Claim held for the duration of one lifecycle call; released on drop.
struct Reservation<'a> {
    reservations: &'a Mutex<Reservations>,
    name: String,
    path: Option<PathBuf>,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        let mut reservations = self
            .reservations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        reservations.names.remove(&self.name);
        if let Some(path) = &self.path {
            reservations.paths.remove(path);
        }
    }
}

/// Filter for [`SessionRegistry::list_items`].
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub start: usize,
    pub limit: Option<usize>,
    pub kind: Option<ItemKind>,
}

/// Manages named sessions of one kind and their undo/redo history.
///
/// `SessionRegistry` is responsible for:
/// - Registering sessions (fresh or loaded from a backing file)
/// - Tracking the active session
/// - Turning operations into commands and recording them per session
/// - Undo/redo and history introspection
/// - Running items through each session's execution engine
///
/// All session state sits behind one registry-wide lock. Every
/// read-modify-write operation holds it from session lookup to history
/// recording; it is never held across store IO or engine calls.
///
/// `register` and `release` do their store IO outside the lock. They claim
/// the session name (and backing path) in a reservation set first, so two
/// lifecycle calls on the same name or file never overlap.
pub struct SessionRegistry<R: AddressResolver> {
    state: RwLock<RegistryState>,
    /// Locked only while `state` is held or on reservation drop
    reservations: Mutex<Reservations>,
    resolver: R,
    store: Arc<dyn ItemStore>,
    engines: Arc<dyn EngineFactory>,
    config: RegistryConfig,
}

impl<R: AddressResolver> SessionRegistry<R> {
    /// Creates an empty registry.
    ///
    /// # Arguments
    ///
    /// * `resolver` - Addressing strategy and kind rules for this session kind
    /// * `store` - Backend used to load and save backing files
    /// * `engines` - Factory producing one execution engine per session
    /// * `config` - History capacity, timeouts and path settings
    pub fn new(
        resolver: R,
        store: Arc<dyn ItemStore>,
        engines: Arc<dyn EngineFactory>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            reservations: Mutex::new(Reservations::default()),
            resolver,
            store,
            engines,
            config,
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.config.root_dir {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn reservations(&self) -> MutexGuard<'_, Reservations> {
        self.reservations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims a free name and, if given, a backing path no session owns.
    fn reserve(
        &self,
        state: &RegistryState,
        name: &str,
        path: Option<&Path>,
    ) -> Result<Reservation<'_>> {
        let mut reservations = self.reservations();
        if state.sessions.contains_key(name) || reservations.names.contains(name) {
            return Err(QuireError::already_exists(R::SESSION_NOUN, name));
        }
        if let Some(path) = path {
            let owned = reservations.paths.contains(path)
                || state
                    .sessions
                    .values()
                    .any(|session| session.backing_path.as_deref() == Some(path));
            if owned {
                return Err(QuireError::already_exists("file", path.display().to_string()));
            }
            reservations.paths.insert(path.to_path_buf());
        }
        reservations.names.insert(name.to_string());
        Ok(Reservation {
            reservations: &self.reservations,
            name: name.to_string(),
            path: path.map(Path::to_path_buf),
        })
    }

    /// Creates or loads the backing document; returns the items and how many
    /// identifiers had to be re-issued.
    async fn open_backing(&self, mode: RegisterMode, path: &Path) -> Result<(ItemList, usize)> {
        match mode {
            RegisterMode::Create => {
                if self.store.exists(path).await {
                    return Err(QuireError::already_exists("file", path.display().to_string()));
                }
                self.store.save(&[], path).await?;
                Ok((ItemList::new(), 0))
            }
            RegisterMode::Connect => {
                let loaded = self.store.load(path).await.map_err(|err| match err {
                    QuireError::LoadFailed { .. } => err,
                    other => QuireError::load_failed(path.display().to_string(), other.to_string()),
                })?;
                Ok(ItemList::from_items(loaded))
            }
        }
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Registers a session and makes it active.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the name is taken or being released, or if the
    ///   backing file belongs to another session; in create mode also if the
    ///   backing file already exists
    /// - `InvalidArgument` for an empty name or connect mode without a path
    /// - `LoadFailed` if the backing file cannot be read or parsed
    pub async fn register(
        &self,
        name: &str,
        mode: RegisterMode,
        backing_path: Option<&Path>,
    ) -> Result<SessionSummary> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QuireError::InvalidArgument(format!(
                "{} name must not be empty",
                R::SESSION_NOUN
            )));
        }
        if mode == RegisterMode::Connect && backing_path.is_none() {
            return Err(QuireError::InvalidArgument(
                "connect mode needs a backing path".to_string(),
            ));
        }

        let backing_path = backing_path.map(|path| self.resolve_path(path));
        let _reservation = {
            let state = self.state.write().await;
            self.reserve(&state, name, backing_path.as_deref())?
        };

        let (items, reissued) = match &backing_path {
            Some(path) => self.open_backing(mode, path).await?,
            None => (ItemList::new(), 0),
        };
        if reissued > 0 {
            tracing::warn!(
                session = name,
                reissued,
                "Re-issued malformed or duplicate {} identifiers",
                R::ITEM_NOUN
            );
        }

        let mut session = Session::new(
            name.to_string(),
            backing_path,
            items,
            self.config.history_capacity,
            self.engines.create(name),
        );
        if reissued > 0 {
            // The new identifiers exist only in memory until saved.
            session.mark_changed();
        }
        let summary = session.summary(true);

        let mut state = self.state.write().await;
        state.sessions.insert(name.to_string(), session);
        state.active = Some(name.to_string());
        tracing::info!(
            session = name,
            mode = %mode,
            items = summary.item_count,
            "Registered {}",
            R::SESSION_NOUN
        );
        Ok(summary)
    }

    /// Releases a session: saves it if it has a backing file and unsaved
    /// changes, shuts its engine down and discards its history.
    ///
    /// The session stays registered (and usable) until its last changes are
    /// on disk; edits made while a save is in flight are saved before it is
    /// removed. If saving fails the session is left untouched and the error
    /// returned. A name being released cannot be registered again.
    pub async fn release(&self, name: &str) -> Result<()> {
        let _reservation = {
            let state = self.state.write().await;
            if !state.sessions.contains_key(name) {
                return Err(QuireError::not_found(R::SESSION_NOUN, name));
            }
            let mut reservations = self.reservations();
            if !reservations.names.insert(name.to_string()) {
                return Err(QuireError::InvalidArgument(format!(
                    "{} '{}' is already being released",
                    R::SESSION_NOUN,
                    name
                )));
            }
            Reservation {
                reservations: &self.reservations,
                name: name.to_string(),
                path: None,
            }
        };

        let session = loop {
            let (path, items, revision) = {
                let mut state = self.state.write().await;
                let Some(session) = state.sessions.get(name) else {
                    return Err(QuireError::internal("session vanished while releasing"));
                };
                match session.backing_path.clone().filter(|_| session.is_dirty()) {
                    Some(path) => (path, session.items.as_slice().to_vec(), session.revision()),
                    None => {
                        if state.active.as_deref() == Some(name) {
                            state.active = None;
                        }
                        match state.sessions.remove(name) {
                            Some(session) => break session,
                            None => {
                                return Err(QuireError::internal(
                                    "session vanished while releasing",
                                ));
                            }
                        }
                    }
                }
            };

            if let Err(err) = self.store.save(&items, &path).await {
                tracing::warn!(session = name, error = %err, "Save on release failed");
                return Err(err);
            }
            if let Some(session) = self.state.write().await.sessions.get_mut(name) {
                session.mark_saved(revision);
            }
        };

        if let Err(err) = session.engine.shutdown().await {
            tracing::warn!(session = name, error = %err, "Engine shutdown failed");
        }
        tracing::info!(session = name, "Released {}", R::SESSION_NOUN);
        Ok(())
    }

    pub async fn set_active(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.sessions.contains_key(name) {
            return Err(QuireError::not_found(R::SESSION_NOUN, name));
        }
        state.active = Some(name.to_string());
        tracing::debug!(session = name, "Activated {}", R::SESSION_NOUN);
        Ok(())
    }

    pub async fn get_active(&self) -> Option<String> {
        self.state.read().await.active.clone()
    }

    /// Summaries of every registered session, sorted by name.
    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        let state = self.state.read().await;
        let mut summaries: Vec<_> = state
            .sessions
            .values()
            .map(|session| {
                let is_active = state.active.as_deref() == Some(session.name.as_str());
                session.summary(is_active)
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    pub async fn session_summary(&self, target: &SessionRef) -> Result<SessionSummary> {
        let state = self.state.read().await;
        let session = state.session::<R>(target)?;
        Ok(session.summary(state.active.as_deref() == Some(session.name.as_str())))
    }

    // ========================================================================
    // Structural operations
    // ========================================================================

    /// Builds, applies and records one operation on the target session.
    pub async fn apply(
        &self,
        target: &SessionRef,
        operation: Operation,
    ) -> Result<OperationReport> {
        let mut state = self.state.write().await;
        let session = state.session_mut::<R>(target)?;
        let mut command = operation.build(&self.resolver, &session.items)?;
        if let Err(err) = session.commit(&mut command) {
            tracing::error!(
                session = %session.name,
                command = %command.description(),
                error = %err,
                "Command failed after validation"
            );
            return Err(err);
        }
        let mut report = OperationReport::from_command(
            &session.name,
            &command,
            &session.items,
            self.config.context_radius,
        );
        report.evicted = session.history.record(command);
        tracing::debug!(
            session = %session.name,
            command = %report.description,
            evicted = report.evicted,
            "Applied {}",
            report.kind
        );
        Ok(report)
    }

    /// Inserts a new item and returns where it landed.
    pub async fn insert(
        &self,
        target: &SessionRef,
        at: Address,
        kind: Option<ItemKind>,
        content: impl Into<String>,
    ) -> Result<ItemAddress> {
        let operation = Operation::Insert {
            at,
            kind,
            content: content.into(),
            flags: Default::default(),
        };
        let report = self.apply(target, operation).await?;
        report
            .address
            .ok_or_else(|| QuireError::internal("insert produced no address"))
    }

    /// Deletes a batch atomically and returns the removed items.
    pub async fn delete(&self, target: &SessionRef, targets: Vec<Address>) -> Result<Vec<Item>> {
        let report = self.apply(target, Operation::Delete { targets }).await?;
        Ok(report.removed)
    }

    pub async fn update(
        &self,
        target: &SessionRef,
        address: Address,
        patch: ItemPatch,
    ) -> Result<OperationReport> {
        self.apply(
            target,
            Operation::Update {
                target: address,
                patch,
            },
        )
        .await
    }

    pub async fn move_item(
        &self,
        target: &SessionRef,
        from: Address,
        to: Address,
    ) -> Result<OperationReport> {
        self.apply(target, Operation::Move { from, to }).await
    }

    pub async fn swap(
        &self,
        target: &SessionRef,
        first: Address,
        second: Address,
    ) -> Result<OperationReport> {
        self.apply(target, Operation::Swap { first, second }).await
    }

    pub async fn reorder(&self, target: &SessionRef, order: Vec<usize>) -> Result<OperationReport> {
        self.apply(target, Operation::Reorder { order }).await
    }

    // ========================================================================
    // History
    // ========================================================================

    pub async fn undo(&self, target: &SessionRef, steps: usize) -> Result<HistoryStep> {
        let mut state = self.state.write().await;
        let session = state.session_mut::<R>(target)?;
        let step = session.undo(steps);
        log_history_step(&session.name, "undo", &step);
        step
    }

    pub async fn redo(&self, target: &SessionRef, steps: usize) -> Result<HistoryStep> {
        let mut state = self.state.write().await;
        let session = state.session_mut::<R>(target)?;
        let step = session.redo(steps);
        log_history_step(&session.name, "redo", &step);
        step
    }

    pub async fn history(&self, target: &SessionRef) -> Result<HistorySnapshot> {
        let state = self.state.read().await;
        Ok(state.session::<R>(target)?.history.snapshot())
    }

    pub async fn clear_history(&self, target: &SessionRef) -> Result<()> {
        let mut state = self.state.write().await;
        let session = state.session_mut::<R>(target)?;
        session.history.clear();
        tracing::debug!(session = %session.name, "Cleared history");
        Ok(())
    }

    // ========================================================================
    // Reads and untracked writes
    // ========================================================================

    pub async fn read_item(
        &self,
        target: &SessionRef,
        address: &Address,
    ) -> Result<(ItemAddress, Item)> {
        let state = self.state.read().await;
        let session = state.session::<R>(target)?;
        let index = self.resolver.resolve(&session.items, address)?;
        let item = session
            .items
            .get(index)
            .cloned()
            .ok_or_else(|| QuireError::out_of_range(index as i64, session.items.len()))?;
        Ok((
            ItemAddress {
                index,
                id: item.id().clone(),
            },
            item,
        ))
    }

    pub async fn list_items(
        &self,
        target: &SessionRef,
        query: &ItemQuery,
    ) -> Result<Vec<ItemPreview>> {
        let state = self.state.read().await;
        let session = state.session::<R>(target)?;
        let previews = session
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| query.kind.is_none_or(|kind| item.kind == kind))
            .skip(query.start)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(index, item)| ItemPreview::new(index, item))
            .collect();
        Ok(previews)
    }

    /// Snapshot of all items in order.
    pub async fn items(&self, target: &SessionRef) -> Result<Vec<Item>> {
        let state = self.state.read().await;
        Ok(state.session::<R>(target)?.items.as_slice().to_vec())
    }

    /// Writes an item's output slot. Not recorded in history.
    pub async fn set_output(
        &self,
        target: &SessionRef,
        address: &Address,
        output: ItemOutput,
    ) -> Result<ItemAddress> {
        let mut state = self.state.write().await;
        let session = state.session_mut::<R>(target)?;
        let index = self.resolver.resolve(&session.items, address)?;
        let item = session
            .items
            .get_mut(index)
            .ok_or_else(|| QuireError::internal("resolved slot vanished"))?;
        item.output = output;
        let id = item.id().clone();
        session.mark_changed();
        Ok(ItemAddress { index, id })
    }

    /// Persists the session to its backing file.
    pub async fn save(&self, target: &SessionRef) -> Result<PathBuf> {
        let (name, path, items, revision) = {
            let state = self.state.read().await;
            let session = state.session::<R>(target)?;
            let path = session.backing_path.clone().ok_or_else(|| {
                QuireError::InvalidArgument(format!(
                    "{} '{}' has no backing file",
                    R::SESSION_NOUN,
                    session.name
                ))
            })?;
            (
                session.name.clone(),
                path,
                session.items.as_slice().to_vec(),
                session.revision(),
            )
        };

        self.store.save(&items, &path).await?;

        if let Some(session) = self.state.write().await.sessions.get_mut(&name) {
            session.mark_saved(revision);
        }
        tracing::info!(session = %name, path = %path.display(), "Saved {}", R::SESSION_NOUN);
        Ok(path)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    fn engine_for(
        &self,
        state: &RegistryState,
        target: &SessionRef,
    ) -> Result<(String, Arc<dyn ExecutionEngine>)> {
        let session = state.session::<R>(target)?;
        Ok((session.name.clone(), Arc::clone(&session.engine)))
    }

    async fn run_engine(
        &self,
        session: &str,
        engine: &Arc<dyn ExecutionEngine>,
        source: &str,
        timeout: Option<f64>,
    ) -> Result<ExecutionOutcome> {
        let budget = self.config.effective_timeout(timeout);
        match tokio::time::timeout(budget, engine.execute(source, budget)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    session,
                    seconds = budget.as_secs_f64(),
                    "Execution timed out, stopping engine"
                );
                if let Err(err) = engine.stop().await {
                    tracing::warn!(session, error = %err, "Stop after timeout failed");
                }
                Err(QuireError::Timeout {
                    seconds: budget.as_secs_f64(),
                })
            }
        }
    }

    /// Executes a code item and stores its outputs.
    ///
    /// The lock is released while the engine runs. Afterwards the item is
    /// looked up again by identifier; if it was deleted in the meantime the
    /// outputs are only returned.
    pub async fn execute_item(
        &self,
        target: &SessionRef,
        address: &Address,
        timeout: Option<f64>,
    ) -> Result<ExecutionReport> {
        let (name, id) = {
            let state = self.state.read().await;
            let session = state.session::<R>(target)?;
            let index = self.resolver.resolve(&session.items, address)?;
            let item = session
                .items
                .get(index)
                .ok_or_else(|| QuireError::out_of_range(index as i64, session.items.len()))?;
            (session.name.clone(), item.id().clone())
        };
        self.execute_by_id(name, id, timeout).await
    }

    /// Inserts a code item and executes it right away.
    ///
    /// The insert is recorded in history even if the execution then fails.
    pub async fn insert_and_execute(
        &self,
        target: &SessionRef,
        at: Address,
        content: impl Into<String>,
        timeout: Option<f64>,
    ) -> Result<ExecutionReport> {
        let name = self.state.read().await.target_name::<R>(target)?;
        let address = self
            .insert(&SessionRef::Named(name.clone()), at, Some(ItemKind::Code), content)
            .await?;
        self.execute_by_id(name, address.id, timeout).await
    }

    async fn execute_by_id(
        &self,
        name: String,
        id: ItemId,
        timeout: Option<f64>,
    ) -> Result<ExecutionReport> {
        let (engine, source) = {
            let state = self.state.read().await;
            let session = state
                .sessions
                .get(&name)
                .ok_or_else(|| QuireError::not_found(R::SESSION_NOUN, name.as_str()))?;
            let item = session
                .items
                .position_of(&id)
                .and_then(|index| session.items.get(index))
                .ok_or_else(|| QuireError::not_found(R::ITEM_NOUN, id.as_str()))?;
            if !item.kind.is_executable() {
                return Err(QuireError::InvalidKind {
                    kind: item.kind.to_string(),
                    allowed: ItemKind::Code.to_string(),
                });
            }
            (Arc::clone(&session.engine), item.content.clone())
        };

        let outcome = self.run_engine(&name, &engine, &source, timeout).await?;
        let address = self.store_outcome(&name, &id, &outcome).await;
        if address.is_none() {
            tracing::debug!(session = %name, item = %id, "Executed item no longer present");
        }
        Ok(ExecutionReport {
            session: name,
            address,
            outcome,
        })
    }

    async fn store_outcome(
        &self,
        name: &str,
        id: &ItemId,
        outcome: &ExecutionOutcome,
    ) -> Option<ItemAddress> {
        let mut state = self.state.write().await;
        let session = state.sessions.get_mut(name)?;
        let index = session.items.position_of(id)?;
        let item = session.items.get_mut(index)?;
        item.output = ItemOutput::Records(outcome.records.clone());
        item.execution_count = Some(outcome.execution_count);
        item.time_run = Some(Local::now().format("%I:%M:%S%P").to_string());
        session.mark_changed();
        Some(ItemAddress {
            index,
            id: id.clone(),
        })
    }

    /// Executes ad-hoc source in the session's engine.
    pub async fn execute_code(
        &self,
        target: &SessionRef,
        source: &str,
        timeout: Option<f64>,
    ) -> Result<ExecutionOutcome> {
        let (name, engine) = {
            let state = self.state.read().await;
            self.engine_for(&state, target)?
        };
        self.run_engine(&name, &engine, source, timeout).await
    }

    /// Interrupts the session's running execution, if any.
    pub async fn stop(&self, target: &SessionRef) -> Result<()> {
        let (name, engine) = {
            let state = self.state.read().await;
            self.engine_for(&state, target)?
        };
        tracing::warn!(session = %name, "Stopping execution");
        engine.stop().await
    }

    /// Restarts the session's engine; items and history are kept.
    pub async fn restart(&self, target: &SessionRef) -> Result<()> {
        let (name, engine) = {
            let state = self.state.read().await;
            self.engine_for(&state, target)?
        };
        tracing::info!(session = %name, "Restarting engine");
        engine.restart().await
    }
}

fn log_history_step(session: &str, action: &str, step: &Result<HistoryStep>) {
    match step {
        Ok(step) => tracing::debug!(
            session,
            action,
            requested = step.requested,
            performed = step.performed,
            "History step"
        ),
        Err(err) if err.is_fatal() => {
            tracing::error!(session, action, error = %err, "History is inconsistent")
        }
        Err(err) => tracing::warn!(session, action, error = %err, "History step failed"),
    }
}
