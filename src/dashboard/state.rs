use std::sync::Arc;
use tokio::sync::RwLock;
use crate::config::ViewConfig;
use crate::data::types::{
    ForecastDetail, HistoryPoint, Region, SessionState, SessionStatus, Snapshot, Symbol,
    SystemMetrics,
};
use crate::market::filter::{filter, SignalFilter};

pub type SharedState = Arc<RwLock<DashboardState>>;

/// What a registry replace means for the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryTransition {
    BecameNonEmpty,
    BecameEmpty,
    Replaced,
    StillEmpty,
}

/// Stamp handed out when a poll request is issued. A response is applied
/// only if its registry generation is still current and no later-issued
/// response for the same slot has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket {
    pub registry_generation: u64,
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct PollSlot {
    issued: u64,
    applied: u64,
}

impl PollSlot {
    fn issue(&mut self, registry_generation: u64) -> PollTicket {
        self.issued += 1;
        PollTicket {
            registry_generation,
            sequence: self.issued,
        }
    }

    fn accept(&mut self, ticket: PollTicket, registry_generation: u64) -> bool {
        if ticket.registry_generation != registry_generation || ticket.sequence <= self.applied {
            return false;
        }
        self.applied = ticket.sequence;
        true
    }
}

/// Detail view for the one selected symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub symbol: Symbol,
    pub generation: u64,
    pub history: Vec<HistoryPoint>,
    pub forecast: Option<ForecastDetail>,
    pub loading: bool,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    registry: Vec<Symbol>,
    registry_generation: u64,
    loading: bool,
    snapshot: Snapshot,
    metrics: Option<SystemMetrics>,
    states_slot: PollSlot,
    metrics_slot: PollSlot,
    region: Region,
    search: String,
    signal_filter: SignalFilter,
    session: SessionStatus,
    selection: Option<Selection>,
    selection_generation: u64,
}

impl DashboardState {
    pub fn new(view: &ViewConfig) -> Self {
        Self {
            registry: Vec::new(),
            registry_generation: 0,
            loading: true,
            snapshot: Snapshot::new(),
            metrics: None,
            states_slot: PollSlot::default(),
            metrics_slot: PollSlot::default(),
            region: view.region,
            search: view.search.clone(),
            signal_filter: view.signal_filter,
            session: SessionStatus::closed(SessionState::Unknown),
            selection: None,
            selection_generation: 0,
        }
    }

    pub fn shared(view: &ViewConfig) -> SharedState {
        Arc::new(RwLock::new(Self::new(view)))
    }

    pub fn registry(&self) -> &[Symbol] {
        &self.registry
    }

    pub fn registry_generation(&self) -> u64 {
        self.registry_generation
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn metrics(&self) -> Option<&SystemMetrics> {
        self.metrics.as_ref()
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn signal_filter(&self) -> SignalFilter {
        self.signal_filter
    }

    pub fn session(&self) -> SessionStatus {
        self.session
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn replace_registry(&mut self, symbols: Vec<Symbol>) -> RegistryTransition {
        let was_empty = self.registry.is_empty();
        self.registry = symbols;
        self.registry_generation += 1;

        match (was_empty, self.registry.is_empty()) {
            (true, false) => RegistryTransition::BecameNonEmpty,
            (false, true) => RegistryTransition::BecameEmpty,
            (false, false) => RegistryTransition::Replaced,
            (true, true) => RegistryTransition::StillEmpty,
        }
    }

    pub fn issue_states_ticket(&mut self) -> PollTicket {
        self.states_slot.issue(self.registry_generation)
    }

    pub fn issue_metrics_ticket(&mut self) -> PollTicket {
        self.metrics_slot.issue(self.registry_generation)
    }

    /// Replaces the whole snapshot. Returns false when the ticket is stale.
    pub fn apply_states(&mut self, ticket: PollTicket, snapshot: Snapshot) -> bool {
        if !self.states_slot.accept(ticket, self.registry_generation) {
            return false;
        }
        self.snapshot = snapshot;
        true
    }

    pub fn apply_metrics(&mut self, ticket: PollTicket, metrics: SystemMetrics) -> bool {
        if !self.metrics_slot.accept(ticket, self.registry_generation) {
            return false;
        }
        self.metrics = Some(metrics);
        true
    }

    pub fn set_region(&mut self, region: Region) -> bool {
        let changed = self.region != region;
        self.region = region;
        changed
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    pub fn set_signal_filter(&mut self, signal_filter: SignalFilter) -> bool {
        let changed = self.signal_filter != signal_filter;
        self.signal_filter = signal_filter;
        changed
    }

    /// Returns true when the status changed.
    pub fn set_session(&mut self, session: SessionStatus) -> bool {
        let changed = self.session != session;
        self.session = session;
        changed
    }

    pub fn visible_symbols(&self) -> Vec<Symbol> {
        filter(
            &self.registry,
            &self.snapshot,
            self.region,
            &self.search,
            self.signal_filter,
        )
    }

    /// Starts a fresh detail view; any previous forecast is dropped.
    pub fn select(&mut self, symbol: impl Into<Symbol>) -> u64 {
        self.selection_generation += 1;
        self.selection = Some(Selection {
            symbol: symbol.into(),
            generation: self.selection_generation,
            history: Vec::new(),
            forecast: None,
            loading: true,
        });
        self.selection_generation
    }

    pub fn deselect(&mut self) {
        self.selection_generation += 1;
        self.selection = None;
    }

    fn current_selection(&mut self, generation: u64) -> Option<&mut Selection> {
        self.selection
            .as_mut()
            .filter(|selection| selection.generation == generation)
    }

    pub fn apply_history(&mut self, generation: u64, history: Vec<HistoryPoint>) -> bool {
        match self.current_selection(generation) {
            Some(selection) => {
                selection.history = history;
                true
            }
            None => false,
        }
    }

    /// Sets the forecast (or its absence) and ends loading for this generation.
    pub fn finish_detail(&mut self, generation: u64, forecast: Option<ForecastDetail>) -> bool {
        match self.current_selection(generation) {
            Some(selection) => {
                selection.forecast = forecast;
                selection.loading = false;
                true
            }
            None => false,
        }
    }

    /// Makes every outstanding ticket and selection generation stale.
    pub fn invalidate_in_flight(&mut self) {
        self.registry_generation += 1;
        self.selection_generation += 1;
        self.selection = None;
    }
}
