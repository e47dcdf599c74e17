// Make/model picker.
//
// A two-state machine: the picker starts out listing makes, selecting one
// switches to that make's models, `Back` returns to the makes. Selections
// accumulate across makes until `Apply` hands them to the filter state.
// Opening the picker always starts from a clean slate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::options::OptionItem;
use super::state::{ALL_MODELS, MakeModelFilter};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PickerError {
    #[error("no make selected, pick a make before toggling models")]
    NoMakeSelected,
    #[error("make name must not be empty")]
    EmptyMake,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum PickerView {
    #[default]
    BrowsingMakes,
    BrowsingModels { make: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum PickerEvent {
    Open,
    SelectMake(String),
    Back,
    Close,
    Search(String),
    ToggleModel(String),
    Apply,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeModelPicker {
    pub open: bool,
    #[serde(flatten)]
    pub view: PickerView,
    pub search: String,
    pub selected: Vec<MakeModelFilter>,
}

/// Option row with its selection mark, as the picker grid shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickerOption {
    #[serde(flatten)]
    pub item: OptionItem,
    pub selected: bool,
}

impl MakeModelPicker {
    /// Feeds one event through the machine. `Apply` yields the selection when
    /// there is one; every other event yields `None`.
    pub fn handle(&mut self, event: PickerEvent) -> Result<Option<Vec<MakeModelFilter>>, PickerError> {
        match event {
            PickerEvent::Open => {
                *self = Self {
                    open: true,
                    ..Self::default()
                };
            }
            PickerEvent::SelectMake(make) => {
                let make = make.trim();
                if make.is_empty() {
                    return Err(PickerError::EmptyMake);
                }
                self.view = PickerView::BrowsingModels {
                    make: make.to_string(),
                };
                self.search.clear();
            }
            PickerEvent::Back => match self.view {
                PickerView::BrowsingModels { .. } => {
                    self.view = PickerView::BrowsingMakes;
                    self.search.clear();
                }
                // Back on the first screen cancels
                PickerView::BrowsingMakes => self.open = false,
            },
            PickerEvent::Close => self.open = false,
            PickerEvent::Search(term) => self.search = term,
            PickerEvent::ToggleModel(model) => self.toggle_model(&model)?,
            PickerEvent::Apply => {
                if self.selected.is_empty() {
                    return Ok(None);
                }
                self.open = false;
                return Ok(Some(self.selected.clone()));
            }
        }
        Ok(None)
    }

    pub fn current_make(&self) -> Option<&str> {
        match &self.view {
            PickerView::BrowsingModels { make } => Some(make),
            PickerView::BrowsingMakes => None,
        }
    }

    fn toggle_model(&mut self, model: &str) -> Result<(), PickerError> {
        let make = self
            .current_make()
            .ok_or(PickerError::NoMakeSelected)?
            .to_string();
        let toggled = MakeModelFilter::new(&make, Some(model));
        let was_selected = self.selected.iter().any(|f| f.id == toggled.id);

        if toggled.is_all_models() {
            // "All Models" replaces every other pick for this make
            self.selected.retain(|f| f.brand != make);
        } else {
            let all_id = MakeModelFilter::all_models(&make).id;
            self.selected.retain(|f| f.id != all_id && f.id != toggled.id);
        }
        if !was_selected {
            self.selected.push(toggled);
        }
        Ok(())
    }

    /// Makes matching the search term.
    pub fn visible_makes(&self, brands: &[String]) -> Vec<PickerOption> {
        brands
            .iter()
            .filter(|brand| matches_search(brand, &self.search))
            .map(|brand| PickerOption {
                item: OptionItem::new(brand, brand, brand),
                selected: self.selected.iter().any(|f| &f.brand == brand),
            })
            .collect()
    }

    /// "All Models" followed by the make's models matching the search term.
    pub fn visible_models(&self, models: &[String]) -> Vec<PickerOption> {
        let Some(make) = self.current_make() else {
            return Vec::new();
        };
        let all = OptionItem::new(ALL_MODELS, ALL_MODELS, "All Models");
        std::iter::once(all)
            .chain(models.iter().map(|m| OptionItem::new(m, m, m)))
            .filter(|item| matches_search(&item.label, &self.search))
            .map(|item| {
                let id = MakeModelFilter::new(make, Some(&item.id)).id;
                PickerOption {
                    selected: self.selected.iter().any(|f| f.id == id),
                    item,
                }
            })
            .collect()
    }
}

fn matches_search(candidate: &str, term: &str) -> bool {
    candidate.to_lowercase().contains(&term.trim().to_lowercase())
}
