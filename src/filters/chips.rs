// Active-filter chips derived from the listing URL

use serde::{Deserialize, Serialize};

use super::options::{Lookups, capitalize, format_euros, group_thousands};
use super::query::QueryParams;
use super::state::{FilterState, MakeModelFilter, keys, make_model_pairs, make_models, normalize_list};

/// Identifies the dimension (or list item) a chip stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChipId {
    MakeModel { brand: String, model: Option<String> },
    Price,
    Registration,
    Mileage,
    Transmission,
    Discounted,
    Vat,
    Fuel { value: String },
    Electric,
    Hybrid,
    Power,
    BodyType { id: String },
    Colour { id: String },
    Feature { id: String },
    #[serde(rename = "4x4")]
    FourByFour,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chip {
    pub id: ChipId,
    pub label: String,
}

impl Chip {
    fn new(id: ChipId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// Chips for every active dimension, in display order.
///
/// List values the lookups don't know are left out of the chip bar, they stay
/// in the URL untouched.
pub fn derive_chips(params: &QueryParams, lookups: &Lookups) -> Vec<Chip> {
    let state = FilterState::from_query(params);
    let mut chips = Vec::new();

    for filter in &state.make_models {
        let label = match &filter.model {
            Some(model) => format!("{} {}", filter.brand, model),
            None => format!("{} (All Models)", filter.brand),
        };
        chips.push(Chip::new(
            ChipId::MakeModel {
                brand: filter.brand.clone(),
                model: filter.model.clone(),
            },
            label,
        ));
    }

    if let Some(label) = range_label(state.price_from, state.price_to, |v| format_euros(v as u64), "From", "Up to") {
        chips.push(Chip::new(ChipId::Price, label));
    }

    match (state.year_from, state.year_to) {
        (Some(from), Some(to)) if from == to => {
            chips.push(Chip::new(ChipId::Registration, format!("Registration: {}", from)))
        }
        (from, to) => {
            if let Some(range) = range_label(from, to, |v| v.to_string(), "from", "until") {
                chips.push(Chip::new(ChipId::Registration, format!("Registration: {}", range)));
            }
        }
    }

    if let Some(range) = range_label(state.mileage_from, state.mileage_to, |v| group_thousands(v as u64), "from", "up to") {
        chips.push(Chip::new(ChipId::Mileage, format!("{} km", range)));
    }

    if let Some(transmission) = &state.transmission {
        let label = lookups
            .transmissions
            .iter()
            .find(|t| t.value.eq_ignore_ascii_case(transmission) || t.id.eq_ignore_ascii_case(transmission))
            .map(|t| t.label.clone())
            .unwrap_or_else(|| transmission.clone());
        chips.push(Chip::new(ChipId::Transmission, label));
    }

    if state.discounted {
        chips.push(Chip::new(ChipId::Discounted, "Discounted cars"));
    }
    if state.vat_deduction {
        chips.push(Chip::new(ChipId::Vat, "VAT deduction"));
    }

    for fuel in &state.fuels {
        if let Some(known) = lookups.fuel(&fuel.value) {
            chips.push(Chip::new(
                ChipId::Fuel {
                    value: fuel.value.clone(),
                },
                known.label.clone(),
            ));
        }
    }

    if state.electric {
        chips.push(Chip::new(ChipId::Electric, "Electric Vehicle"));
    }
    if let Some(hybrid_type) = &state.hybrid_type {
        chips.push(Chip::new(ChipId::Hybrid, format!("{} hybrid", capitalize(hybrid_type))));
    }

    let power_unit = state.power_unit.as_str().to_uppercase();
    if let Some(range) = range_label(state.power_from, state.power_to, |v| v.to_string(), "from", "up to") {
        chips.push(Chip::new(ChipId::Power, format!("{} {}", range, power_unit)));
    }

    for id in &state.body_types {
        if let Some(known) = lookups.body_type(id) {
            chips.push(Chip::new(ChipId::BodyType { id: id.clone() }, known.label.clone()));
        }
    }
    for id in &state.colours {
        if let Some(known) = lookups.colour(id) {
            chips.push(Chip::new(ChipId::Colour { id: id.clone() }, known.label.clone()));
        }
    }
    for id in &state.features {
        if let Some(known) = lookups.feature(id) {
            chips.push(Chip::new(ChipId::Feature { id: id.clone() }, known.label.clone()));
        }
    }

    if state.is_4x4 {
        chips.push(Chip::new(ChipId::FourByFour, "Drive type 4x4"));
    }

    chips
}

// "A - B", "<from> A", "<to> B", or nothing
fn range_label(
    from: Option<u32>,
    to: Option<u32>,
    fmt: impl Fn(u32) -> String,
    from_word: &str,
    to_word: &str,
) -> Option<String> {
    match (from, to) {
        (Some(from), Some(to)) => Some(format!("{} - {}", fmt(from), fmt(to))),
        (Some(from), None) => Some(format!("{} {}", from_word, fmt(from))),
        (None, Some(to)) => Some(format!("{} {}", to_word, fmt(to))),
        (None, None) => None,
    }
}

/// Drops the parameters behind `chip`, leaving every other pair as it was.
pub fn remove_chip(params: &mut QueryParams, chip: &ChipId) {
    match chip {
        ChipId::Price => {
            params.delete_all(keys::MIN_PRICE);
            params.delete_all(keys::MAX_PRICE);
            params.delete(keys::PRICE_TYPE);
        }
        ChipId::Registration => {
            params.delete_all(keys::MIN_YEAR);
            params.delete_all(keys::MAX_YEAR);
        }
        ChipId::Mileage => {
            params.delete_all(keys::MIN_MILEAGE);
            params.delete_all(keys::MAX_MILEAGE);
        }
        ChipId::Transmission => params.delete_all(keys::TRANSMISSION),
        ChipId::Discounted => params.delete(keys::DISCOUNTED),
        ChipId::Vat => params.delete(keys::VAT),
        ChipId::Electric => params.delete(keys::ELECTRIC),
        ChipId::Hybrid => params.delete(keys::HYBRID_TYPE),
        ChipId::Power => {
            params.delete(keys::POWER_FROM);
            params.delete(keys::POWER_TO);
            params.delete(keys::POWER_UNIT);
        }
        ChipId::FourByFour => params.delete(keys::IS_4X4),
        ChipId::Fuel { value } => remove_list_item(params, keys::FUEL, value),
        ChipId::BodyType { id } => remove_list_item(params, keys::BODY_TYPE, id),
        ChipId::Colour { id } => remove_list_item(params, keys::COLOUR, id),
        ChipId::Feature { id } => remove_list_item(params, keys::FEATURES, id),
        ChipId::MakeModel { brand, model } => {
            let removed = MakeModelFilter::new(brand, model.as_deref());
            let remaining: Vec<MakeModelFilter> = make_models(params)
                .into_iter()
                .filter(|f| f.id != removed.id)
                .collect();
            params.replace_keys(
                &[keys::BRAND, keys::MODEL, keys::MAKE_MODEL],
                make_model_pairs(&remaining),
            );
        }
    }
}

// Rewrites one list dimension under its canonical key, in place
fn remove_list_item(params: &mut QueryParams, dimension_keys: &[&str], item: &str) {
    let items: Vec<String> = dimension_keys
        .iter()
        .flat_map(|key| params.get_all(key))
        .map(str::to_string)
        .collect();
    let remaining: Vec<String> = normalize_list(items)
        .into_iter()
        .filter(|i| i != item)
        .collect();
    let replacement = if remaining.is_empty() {
        Vec::new()
    } else {
        vec![(dimension_keys[0].to_string(), remaining.join(","))]
    };
    params.replace_keys(dimension_keys, replacement);
}
