// Option tables for the filter controls and the label lookups used by chips

use chrono::Datelike;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::state::PowerUnit;

/// One selectable value of a filter control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    pub id: String,
    pub value: String,
    pub label: String,
}

impl OptionItem {
    pub fn new(id: &str, value: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            value: value.to_string(),
            label: label.to_string(),
        }
    }

    /// Builds an option from a raw backend string (id slugified, value and label kept).
    pub fn from_raw(raw: &str) -> Self {
        let raw = raw.trim();
        Self::new(&slugify(raw), raw, raw)
    }
}

/// Lowercases and collapses whitespace runs into `-`.
pub fn slugify(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

// --- Static tables ---

pub static FUEL_TYPES: Lazy<Vec<OptionItem>> = Lazy::new(|| {
    [
        ("diesel", "Diesel"),
        ("petrol", "Petrol"),
        ("electric", "Electric"),
        ("hybrid", "Hybrid"),
        ("cng", "CNG"),
        ("lpg", "LPG"),
        ("hydrogen", "Hydrogen"),
        ("ethanol", "Ethanol"),
    ]
    .iter()
    .map(|(id, label)| OptionItem::new(id, id, label))
    .collect()
});

pub static BODY_TYPES: Lazy<Vec<OptionItem>> = Lazy::new(|| {
    [
        ("cabriolet", "Cabriolet"),
        ("compact", "Compact"),
        ("coupe", "Coupe"),
        ("estate", "Estate car"),
        ("hatchback", "Hatchback"),
        ("light", "Light truck"),
    ]
    .iter()
    .map(|(id, label)| OptionItem::new(id, id, label))
    .collect()
});

// value carries the swatch colour
pub static COLOURS: Lazy<Vec<OptionItem>> = Lazy::new(|| {
    [
        ("black", "#000000", "Black"),
        ("white", "#FFFFFF", "White"),
        ("blue-gray", "#64748B", "Gray Blue"),
        ("red", "#EF4444", "Red"),
        ("blue", "#3B82F6", "Blue"),
        ("silver", "#E2E8F0", "Silver"),
        ("green", "#22C55E", "Green"),
        ("beige", "#E3D3C3", "Beige"),
        ("yellow", "#FBBF24", "Yellow"),
        ("orange", "#F97316", "Orange"),
        ("brown", "#92400E", "Brown"),
        ("gold", "#EAB308", "Gold"),
        ("purple", "#7C3AED", "Purple"),
    ]
    .iter()
    .map(|(id, value, label)| OptionItem::new(id, value, label))
    .collect()
});

pub static FEATURES: Lazy<Vec<OptionItem>> = Lazy::new(|| {
    [
        ("air-conditioning", "Air conditioning"),
        ("cruise-control", "Cruise control"),
        ("heated-seats", "Heated front seats"),
        ("steering-wheel", "Multifunctional steering wheel"),
        ("navigation", "Navigation system"),
        ("trailer", "Trailer coupling"),
        ("led-lights", "LED headlights"),
        ("xenon-lights", "Xenon headlights"),
    ]
    .iter()
    .map(|(id, label)| OptionItem::new(id, id, label))
    .collect()
});

const HP_STEPS: [u32; 20] = [
    75, 100, 125, 150, 175, 200, 225, 250, 275, 300, 325, 350, 375, 400, 450, 500, 550, 600, 650, 700,
];
const KW_STEPS: [u32; 20] = [
    55, 74, 92, 110, 129, 147, 165, 184, 202, 221, 239, 257, 276, 294, 331, 368, 405, 441, 478, 515,
];

// Fallback when the backend has no year range
const FIRST_REGISTRATION_YEAR: i32 = 2000;

// --- Lookups ---

/// Label tables consulted when turning ids from the URL back into chips.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lookups {
    pub fuels: Vec<OptionItem>,
    pub transmissions: Vec<OptionItem>,
    pub body_types: Vec<OptionItem>,
    pub colours: Vec<OptionItem>,
    pub features: Vec<OptionItem>,
}

impl Default for Lookups {
    fn default() -> Self {
        Self {
            fuels: FUEL_TYPES.clone(),
            transmissions: Vec::new(),
            body_types: BODY_TYPES.clone(),
            colours: COLOURS.clone(),
            features: FEATURES.clone(),
        }
    }
}

impl Lookups {
    /// Static tables extended with whatever the backend reported.
    pub fn merged(
        fuels: &[String],
        transmissions: &[String],
        body_types: &[String],
        colours: &[String],
        features: &[String],
    ) -> Self {
        let defaults = Self::default();
        Self {
            fuels: merge_raw(defaults.fuels, fuels),
            transmissions: merge_raw(defaults.transmissions, transmissions),
            body_types: merge_raw(defaults.body_types, body_types),
            colours: merge_raw(defaults.colours, colours),
            features: merge_raw(defaults.features, features),
        }
    }

    pub fn fuel(&self, value: &str) -> Option<&OptionItem> {
        find(&self.fuels, value)
    }

    pub fn body_type(&self, id: &str) -> Option<&OptionItem> {
        find(&self.body_types, id)
    }

    pub fn colour(&self, id: &str) -> Option<&OptionItem> {
        find(&self.colours, id)
    }

    pub fn feature(&self, id: &str) -> Option<&OptionItem> {
        find(&self.features, id)
    }
}

// Matches on id or value, ignoring case
fn find<'a>(items: &'a [OptionItem], key: &str) -> Option<&'a OptionItem> {
    items
        .iter()
        .find(|item| item.id.eq_ignore_ascii_case(key) || item.value.eq_ignore_ascii_case(key))
}

fn merge_raw(mut items: Vec<OptionItem>, raw: &[String]) -> Vec<OptionItem> {
    for value in raw.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        let item = OptionItem::from_raw(value);
        if find(&items, &item.id).is_none() && find(&items, value).is_none() {
            items.push(item);
        }
    }
    items
}

// --- Select options ---

/// `{value, label}` pair for a select box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Twenty equal steps across a backend range (21 options, both ends included).
/// Ranges that do not fit in `u64` yield no options.
fn stepped(min: f64, max: f64, unit: &str) -> Vec<SelectOption> {
    if !min.is_finite() || !max.is_finite() || max < min {
        return Vec::new();
    }
    let min = min.floor() as u64;
    let step = ((max - min as f64) / 20.0).ceil() as u64;
    (0..=20u64)
        .map(|i| {
            let value = i.checked_mul(step).and_then(|offset| min.checked_add(offset))?;
            Some(SelectOption {
                value: value.to_string(),
                label: format!("{} {}", group_thousands(value), unit),
            })
        })
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

pub fn price_options(min_price: f64, max_price: f64) -> Vec<SelectOption> {
    stepped(min_price, max_price, "€")
}

pub fn mileage_options(min_mileage: f64, max_mileage: f64) -> Vec<SelectOption> {
    stepped(min_mileage, max_mileage, "km")
}

/// Registration years, newest first.
pub fn year_options(min_year: i32, max_year: i32) -> Vec<SelectOption> {
    (min_year..=max_year)
        .rev()
        .map(|year| SelectOption {
            value: year.to_string(),
            label: year.to_string(),
        })
        .collect()
}

/// Year options used when the backend range is unavailable.
pub fn fallback_year_options() -> Vec<SelectOption> {
    year_options(FIRST_REGISTRATION_YEAR, chrono::Local::now().year())
}

pub fn power_options(unit: PowerUnit) -> Vec<SelectOption> {
    let (steps, suffix) = match unit {
        PowerUnit::Hp => (&HP_STEPS, "hp"),
        PowerUnit::Kw => (&KW_STEPS, "kW"),
    };
    steps
        .iter()
        .map(|value| SelectOption {
            value: value.to_string(),
            label: format!("{} {}", value, suffix),
        })
        .collect()
}

// --- Formatting ---

/// `12500` -> `12,500`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Whole-euro currency display, `€12,500`.
pub fn format_euros(value: u64) -> String {
    format!("€{}", group_thousands(value))
}

/// `plug-in` -> `Plug-in`
pub fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
