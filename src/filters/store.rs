// Filter store: owns the state and keeps the listing location in sync with it

use serde::{Deserialize, Serialize};

use super::options::OptionItem;
use super::query::QueryParams;
use super::state::{Dimension, FilterState, MakeModelFilter, PowerUnit};

/// A user interaction against the filter sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterChange {
    Set(Dimension),
    ToggleFuel { fuel: OptionItem },
    ToggleBodyType { id: String },
    ToggleColour { id: String },
    ToggleFeature { id: String },
    ChangePowerUnit { unit: PowerUnit },
    AddMakeModels { filters: Vec<MakeModelFilter> },
    RemoveMakeModel { id: String },
    Reset,
}

/// Remembers the last location pushed and only reports a new one when the
/// serialized state actually moved.
#[derive(Debug, Clone)]
pub struct UrlSynchronizer {
    base_path: String,
    current: String,
}

impl UrlSynchronizer {
    pub fn new(base_path: &str, current: &str) -> Self {
        Self {
            base_path: base_path.to_string(),
            current: current.to_string(),
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn location_for(&self, state: &FilterState) -> String {
        state.to_query().to_location(&self.base_path)
    }

    /// Location to push, or `None` when it equals the current one.
    pub fn sync(&mut self, state: &FilterState) -> Option<String> {
        let next = self.location_for(state);
        if next == self.current {
            return None;
        }
        tracing::debug!(from = %self.current, to = %next, "Filter location changed");
        self.current = next.clone();
        Some(next)
    }
}

#[derive(Debug, Clone)]
pub struct FilterStore {
    state: FilterState,
    sync: UrlSynchronizer,
}

impl FilterStore {
    /// Initializes the state once from the location being viewed.
    pub fn from_location(base_path: &str, location: &str) -> Self {
        let state = FilterState::from_query(&QueryParams::from_location(location));
        Self {
            state,
            sync: UrlSynchronizer::new(base_path, location),
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn location(&self) -> &str {
        self.sync.current()
    }

    /// Canonical location of the current state, whether or not it was pushed.
    pub fn canonical_location(&self) -> String {
        self.sync.location_for(&self.state)
    }

    pub fn has_filters(&self) -> bool {
        self.state.has_filters()
    }

    pub fn set(&mut self, dimension: Dimension) -> Option<String> {
        self.apply(FilterChange::Set(dimension))
    }

    /// Applies one change and resynchronizes the location.
    pub fn apply(&mut self, change: FilterChange) -> Option<String> {
        match change {
            FilterChange::Set(dimension) => self.state.set(dimension),
            FilterChange::ToggleFuel { fuel } => self.state.toggle_fuel(fuel),
            FilterChange::ToggleBodyType { id } => self.state.toggle_body_type(&id),
            FilterChange::ToggleColour { id } => self.state.toggle_colour(&id),
            FilterChange::ToggleFeature { id } => self.state.toggle_feature(&id),
            FilterChange::ChangePowerUnit { unit } => self.state.change_power_unit(unit),
            FilterChange::AddMakeModels { filters } => self.state.add_make_models(filters),
            FilterChange::RemoveMakeModel { id } => self.state.remove_make_model(&id),
            FilterChange::Reset => self.state.reset(),
        }
        self.sync.sync(&self.state)
    }

    /// Applies a batch, returning the final location if any change moved it.
    pub fn apply_all(&mut self, changes: impl IntoIterator<Item = FilterChange>) -> Option<String> {
        let start = self.location().to_string();
        for change in changes {
            self.apply(change);
        }
        (self.location() != start).then(|| self.location().to_string())
    }
}
