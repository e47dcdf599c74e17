// The filter-state record and its query-string codec.
//
// Every dimension has a default; serialization omits dimensions at their
// default and parsing treats malformed values as absent. Lists are
// normalized on the way in so that whatever the state holds survives a
// trip through the URL.

use serde::{Deserialize, Serialize};

use super::options::{FUEL_TYPES, OptionItem, slugify};
use super::query::QueryParams;

pub const DEFAULT_TAB: &str = "all";
pub const DEFAULT_PRICE_TYPE: &str = "cash";
/// Model id meaning "every model of the brand".
pub const ALL_MODELS: &str = "all";
/// kW per hp.
pub const KW_PER_HP: f64 = 0.7457;

// --- Query keys ---

pub mod keys {
    pub const TAB: &str = "tab";
    pub const PRICE_TYPE: &str = "priceType";
    pub const MIN_PRICE: &[&str] = &["min_price", "priceFrom"];
    pub const MAX_PRICE: &[&str] = &["max_price", "priceTo"];
    pub const MIN_YEAR: &[&str] = &["min_year", "regFrom"];
    pub const MAX_YEAR: &[&str] = &["max_year", "regTo"];
    pub const MIN_MILEAGE: &[&str] = &["min_mileage", "mileageFrom"];
    pub const MAX_MILEAGE: &[&str] = &["max_mileage", "mileageTo"];
    pub const TRANSMISSION: &[&str] = &["transmission", "gear"];
    pub const VAT: &str = "vat";
    pub const DISCOUNTED: &str = "discounted";
    pub const FUEL: &[&str] = &["fuel"];
    pub const ELECTRIC: &str = "electric";
    pub const HYBRID_TYPE: &str = "hybridType";
    pub const POWER_UNIT: &str = "powerUnit";
    pub const POWER_FROM: &str = "powerFrom";
    pub const POWER_TO: &str = "powerTo";
    pub const BODY_TYPE: &[&str] = &["body_type", "vehicleTypes"];
    pub const COLOUR: &[&str] = &["colour", "colors"];
    pub const FEATURES: &[&str] = &["features"];
    pub const IS_4X4: &str = "is4x4";
    pub const BRAND: &str = "brand";
    pub const MODEL: &str = "model";
    pub const MAKE_MODEL: &str = "makeModel";
    /// Pagination of the listing, reset by any filter change.
    pub const PAGE: &str = "page";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerUnit {
    #[default]
    Hp,
    Kw,
}

impl PowerUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerUnit::Hp => "hp",
            PowerUnit::Kw => "kw",
        }
    }

    // Anything but "kw" falls back to the default
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("kw") {
            PowerUnit::Kw
        } else {
            PowerUnit::Hp
        }
    }

    /// Converts a power figure expressed in `self` into `target`, rounded.
    pub fn convert(self, value: u32, target: PowerUnit) -> u32 {
        match (self, target) {
            (PowerUnit::Hp, PowerUnit::Kw) => (value as f64 * KW_PER_HP).round() as u32,
            (PowerUnit::Kw, PowerUnit::Hp) => (value as f64 / KW_PER_HP).round() as u32,
            _ => value,
        }
    }
}

/// One brand, optionally narrowed to one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeModelFilter {
    pub id: String,
    pub brand: String,
    /// `None` selects every model of the brand.
    pub model: Option<String>,
}

impl MakeModelFilter {
    pub fn new(brand: &str, model: Option<&str>) -> Self {
        let brand = brand.trim().to_string();
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty() && *m != ALL_MODELS)
            .map(str::to_string);
        let id = format!("{}-{}", brand, model.as_deref().unwrap_or(ALL_MODELS));
        Self { id, brand, model }
    }

    pub fn all_models(brand: &str) -> Self {
        Self::new(brand, None)
    }

    pub fn is_all_models(&self) -> bool {
        self.model.is_none()
    }

    fn model_param(&self) -> &str {
        self.model.as_deref().unwrap_or(ALL_MODELS)
    }
}

/// A single dimension with its new value, for `FilterState::set`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dimension", content = "value", rename_all = "camelCase")]
pub enum Dimension {
    Tab(String),
    PriceType(String),
    PriceFrom(Option<u32>),
    PriceTo(Option<u32>),
    YearFrom(Option<u32>),
    YearTo(Option<u32>),
    MileageFrom(Option<u32>),
    MileageTo(Option<u32>),
    Transmission(Option<String>),
    Fuels(Vec<OptionItem>),
    VatDeduction(bool),
    Discounted(bool),
    Electric(bool),
    HybridType(Option<String>),
    PowerFrom(Option<u32>),
    PowerTo(Option<u32>),
    PowerUnit(PowerUnit),
    BodyTypes(Vec<String>),
    Colours(Vec<String>),
    Features(Vec<String>),
    Is4x4(bool),
    MakeModels(Vec<MakeModelFilter>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub tab: String,
    pub price_type: String,
    pub price_from: Option<u32>,
    pub price_to: Option<u32>,
    pub year_from: Option<u32>,
    pub year_to: Option<u32>,
    pub mileage_from: Option<u32>,
    pub mileage_to: Option<u32>,
    pub transmission: Option<String>,
    pub fuels: Vec<OptionItem>,
    pub vat_deduction: bool,
    pub discounted: bool,
    pub electric: bool,
    pub hybrid_type: Option<String>,
    pub power_from: Option<u32>,
    pub power_to: Option<u32>,
    pub power_unit: PowerUnit,
    pub body_types: Vec<String>,
    pub colours: Vec<String>,
    pub features: Vec<String>,
    pub is_4x4: bool,
    pub make_models: Vec<MakeModelFilter>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            tab: DEFAULT_TAB.to_string(),
            price_type: DEFAULT_PRICE_TYPE.to_string(),
            price_from: None,
            price_to: None,
            year_from: None,
            year_to: None,
            mileage_from: None,
            mileage_to: None,
            transmission: None,
            fuels: Vec::new(),
            vat_deduction: false,
            discounted: false,
            electric: false,
            hybrid_type: None,
            power_from: None,
            power_to: None,
            power_unit: PowerUnit::Hp,
            body_types: Vec::new(),
            colours: Vec::new(),
            features: Vec::new(),
            is_4x4: false,
            make_models: Vec::new(),
        }
    }
}

impl FilterState {
    // --- Mutation ---

    pub fn set(&mut self, dimension: Dimension) {
        match dimension {
            Dimension::Tab(tab) => self.tab = text_or(tab, DEFAULT_TAB),
            Dimension::PriceType(price_type) => {
                self.price_type = text_or(price_type, DEFAULT_PRICE_TYPE)
            }
            Dimension::PriceFrom(v) => self.price_from = v,
            Dimension::PriceTo(v) => self.price_to = v,
            Dimension::YearFrom(v) => self.year_from = v,
            Dimension::YearTo(v) => self.year_to = v,
            Dimension::MileageFrom(v) => self.mileage_from = v,
            Dimension::MileageTo(v) => self.mileage_to = v,
            Dimension::Transmission(v) => self.transmission = non_blank(v),
            Dimension::Fuels(fuels) => self.fuels = normalize_fuels(fuels),
            Dimension::VatDeduction(v) => self.vat_deduction = v,
            Dimension::Discounted(v) => self.discounted = v,
            Dimension::Electric(v) => self.electric = v,
            Dimension::HybridType(v) => self.hybrid_type = non_blank(v),
            Dimension::PowerFrom(v) => self.power_from = v,
            Dimension::PowerTo(v) => self.power_to = v,
            Dimension::PowerUnit(unit) => self.power_unit = unit,
            Dimension::BodyTypes(ids) => self.body_types = normalize_list(ids),
            Dimension::Colours(ids) => self.colours = normalize_list(ids),
            Dimension::Features(ids) => self.features = normalize_list(ids),
            Dimension::Is4x4(v) => self.is_4x4 = v,
            Dimension::MakeModels(filters) => {
                self.make_models.clear();
                self.add_make_models(filters);
            }
        }
    }

    /// Switches the power unit, converting bounds that are already set.
    pub fn change_power_unit(&mut self, unit: PowerUnit) {
        if unit == self.power_unit {
            return;
        }
        let from = self.power_unit;
        self.power_from = self.power_from.map(|v| from.convert(v, unit));
        self.power_to = self.power_to.map(|v| from.convert(v, unit));
        self.power_unit = unit;
    }

    pub fn toggle_fuel(&mut self, fuel: OptionItem) {
        if let Some(pos) = self.fuels.iter().position(|f| f.value == fuel.value) {
            self.fuels.remove(pos);
        } else {
            let mut fuels = std::mem::take(&mut self.fuels);
            fuels.push(fuel);
            self.fuels = normalize_fuels(fuels);
        }
    }

    pub fn toggle_body_type(&mut self, id: &str) {
        toggle(&mut self.body_types, id);
    }

    pub fn toggle_colour(&mut self, id: &str) {
        toggle(&mut self.colours, id);
    }

    pub fn toggle_feature(&mut self, id: &str) {
        toggle(&mut self.features, id);
    }

    /// Appends picker results, skipping ids that are already selected.
    pub fn add_make_models(&mut self, filters: impl IntoIterator<Item = MakeModelFilter>) {
        for filter in filters {
            let filter = MakeModelFilter::new(&filter.brand, filter.model.as_deref());
            if filter.brand.is_empty() || self.make_models.iter().any(|f| f.id == filter.id) {
                continue;
            }
            self.make_models.push(filter);
        }
    }

    pub fn remove_make_model(&mut self, id: &str) {
        self.make_models.retain(|f| f.id != id);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // --- Inspection ---

    /// True when any dimension other than the tab differs from its default.
    pub fn has_filters(&self) -> bool {
        let defaults = Self {
            tab: self.tab.clone(),
            ..Self::default()
        };
        *self != defaults
    }

    // --- Query codec ---

    pub fn from_query(params: &QueryParams) -> Self {
        Self {
            tab: params
                .get_any(&[keys::TAB])
                .map(str::to_string)
                .unwrap_or_else(|| DEFAULT_TAB.to_string()),
            price_type: params
                .get_any(&[keys::PRICE_TYPE])
                .map(str::to_string)
                .unwrap_or_else(|| DEFAULT_PRICE_TYPE.to_string()),
            price_from: number(params, keys::MIN_PRICE),
            price_to: number(params, keys::MAX_PRICE),
            year_from: number(params, keys::MIN_YEAR),
            year_to: number(params, keys::MAX_YEAR),
            mileage_from: number(params, keys::MIN_MILEAGE),
            mileage_to: number(params, keys::MAX_MILEAGE),
            transmission: params.get_any(keys::TRANSMISSION).map(str::to_string),
            fuels: normalize_fuels(list(params, keys::FUEL).iter().map(|v| fuel_item(v)).collect()),
            vat_deduction: flag(params, keys::VAT),
            discounted: flag(params, keys::DISCOUNTED),
            electric: flag(params, keys::ELECTRIC),
            hybrid_type: params.get_any(&[keys::HYBRID_TYPE]).map(str::to_string),
            power_from: number(params, &[keys::POWER_FROM]),
            power_to: number(params, &[keys::POWER_TO]),
            power_unit: params
                .get(keys::POWER_UNIT)
                .map(PowerUnit::parse)
                .unwrap_or_default(),
            body_types: list(params, keys::BODY_TYPE),
            colours: list(params, keys::COLOUR),
            features: list(params, keys::FEATURES),
            is_4x4: flag(params, keys::IS_4X4),
            make_models: make_models(params),
        }
    }

    /// Canonical query: non-default dimensions only, in a fixed key order.
    pub fn to_query(&self) -> QueryParams {
        let mut params = QueryParams::new();
        if self.tab != DEFAULT_TAB {
            params.append(keys::TAB, &self.tab);
        }
        if self.price_type != DEFAULT_PRICE_TYPE {
            params.append(keys::PRICE_TYPE, &self.price_type);
        }
        append_number(&mut params, keys::MIN_PRICE[0], self.price_from);
        append_number(&mut params, keys::MAX_PRICE[0], self.price_to);
        append_number(&mut params, keys::MIN_YEAR[0], self.year_from);
        append_number(&mut params, keys::MAX_YEAR[0], self.year_to);
        append_number(&mut params, keys::MIN_MILEAGE[0], self.mileage_from);
        append_number(&mut params, keys::MAX_MILEAGE[0], self.mileage_to);
        if let Some(transmission) = &self.transmission {
            params.append(keys::TRANSMISSION[0], transmission);
        }
        if self.vat_deduction {
            params.append(keys::VAT, "true");
        }
        if self.discounted {
            params.append(keys::DISCOUNTED, "true");
        }
        if !self.fuels.is_empty() {
            let values: Vec<&str> = self.fuels.iter().map(|f| f.value.as_str()).collect();
            params.append(keys::FUEL[0], values.join(","));
        }
        if self.electric {
            params.append(keys::ELECTRIC, "true");
        }
        if let Some(hybrid_type) = &self.hybrid_type {
            params.append(keys::HYBRID_TYPE, hybrid_type);
        }
        if self.power_unit != PowerUnit::Hp {
            params.append(keys::POWER_UNIT, self.power_unit.as_str());
        }
        append_number(&mut params, keys::POWER_FROM, self.power_from);
        append_number(&mut params, keys::POWER_TO, self.power_to);
        append_list(&mut params, keys::FEATURES[0], &self.features);
        append_list(&mut params, keys::BODY_TYPE[0], &self.body_types);
        append_list(&mut params, keys::COLOUR[0], &self.colours);
        if self.is_4x4 {
            params.append(keys::IS_4X4, "true");
        }
        for (key, value) in make_model_pairs(&self.make_models) {
            params.append(key, value);
        }
        params
    }
}

/// Repeated `brand`/`model` pairs, one per filter.
pub(crate) fn make_model_pairs(filters: &[MakeModelFilter]) -> Vec<(String, String)> {
    filters
        .iter()
        .flat_map(|f| {
            [
                (keys::BRAND.to_string(), f.brand.clone()),
                (keys::MODEL.to_string(), f.model_param().to_string()),
            ]
        })
        .collect()
}

/// Reads repeated `brand`/`model` pairs, then legacy `makeModel=brand-model` tokens.
pub(crate) fn make_models(params: &QueryParams) -> Vec<MakeModelFilter> {
    let brands = params.get_all(keys::BRAND);
    let models = params.get_all(keys::MODEL);
    let paired = brands
        .iter()
        .enumerate()
        .map(|(i, brand)| MakeModelFilter::new(brand, models.get(i).copied()));

    let legacy = params
        .get_all(keys::MAKE_MODEL)
        .into_iter()
        .flat_map(|raw| raw.split(','))
        .filter_map(|token| {
            let token = token.trim();
            if token.is_empty() {
                return None;
            }
            Some(match token.split_once('-') {
                Some((brand, model)) => MakeModelFilter::new(brand, Some(model)),
                None => MakeModelFilter::all_models(token),
            })
        });

    let mut state = FilterState::default();
    state.add_make_models(paired.chain(legacy));
    state.make_models
}

// --- Parsing helpers ---

fn number(params: &QueryParams, keys: &[&str]) -> Option<u32> {
    params.get_any(keys).and_then(|v| v.parse::<u32>().ok())
}

fn flag(params: &QueryParams, key: &str) -> bool {
    params.get(key).is_some_and(|v| v.trim() == "true")
}

// Comma lists; repeated keys (plain HTML forms) are concatenated
fn list(params: &QueryParams, keys: &[&str]) -> Vec<String> {
    let key = keys
        .iter()
        .find(|key| params.contains(**key))
        .copied()
        .unwrap_or(keys[0]);
    normalize_list(params.get_all(key).into_iter().map(str::to_string).collect())
}

// --- Normalization ---

/// Trims, splits on `,`, drops empties and duplicates (first occurrence wins).
pub fn normalize_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items.iter().flat_map(|i| i.split(',')).map(str::trim) {
        if !item.is_empty() && !out.iter().any(|o| o == item) {
            out.push(item.to_string());
        }
    }
    out
}

/// Fuel option for a raw URL value, labelled from the fuel table when known.
pub fn fuel_item(value: &str) -> OptionItem {
    match FUEL_TYPES
        .iter()
        .find(|f| f.value.eq_ignore_ascii_case(value) || f.id.eq_ignore_ascii_case(value))
    {
        Some(known) => OptionItem::new(&known.id, value, &known.label),
        None => OptionItem::new(&slugify(value), value, value),
    }
}

fn normalize_fuels(fuels: Vec<OptionItem>) -> Vec<OptionItem> {
    let mut out: Vec<OptionItem> = Vec::with_capacity(fuels.len());
    for fuel in fuels {
        for value in normalize_list(vec![fuel.value.clone()]) {
            if out.iter().any(|o| o.value == value) {
                continue;
            }
            let item = if value == fuel.value {
                fuel.clone()
            } else {
                fuel_item(&value)
            };
            out.push(item);
        }
    }
    out
}

fn toggle(items: &mut Vec<String>, id: &str) {
    let id = id.trim();
    if let Some(pos) = items.iter().position(|i| i == id) {
        items.remove(pos);
    } else {
        let mut next = std::mem::take(items);
        next.push(id.to_string());
        *items = normalize_list(next);
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn text_or(value: String, default: &str) -> String {
    non_blank(Some(value)).unwrap_or_else(|| default.to_string())
}

fn append_number(params: &mut QueryParams, key: &str, value: Option<u32>) {
    if let Some(v) = value {
        params.append(key, v.to_string());
    }
}

fn append_list(params: &mut QueryParams, key: &str, items: &[String]) {
    if !items.is_empty() {
        params.append(key, items.join(","));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fuel(value: &str) -> OptionItem {
        fuel_item(value)
    }

    fn full_state() -> FilterState {
        let mut state = FilterState::default();
        state.set(Dimension::Tab("history".into()));
        state.set(Dimension::PriceType("leasing".into()));
        state.set(Dimension::PriceFrom(Some(10000)));
        state.set(Dimension::PriceTo(Some(30000)));
        state.set(Dimension::YearFrom(Some(2015)));
        state.set(Dimension::YearTo(Some(2020)));
        state.set(Dimension::MileageFrom(Some(0)));
        state.set(Dimension::MileageTo(Some(150000)));
        state.set(Dimension::Transmission(Some("Automatic".into())));
        state.set(Dimension::Fuels(vec![fuel("petrol"), fuel("diesel")]));
        state.set(Dimension::VatDeduction(true));
        state.set(Dimension::Discounted(true));
        state.set(Dimension::Electric(true));
        state.set(Dimension::HybridType(Some("plug-in".into())));
        state.set(Dimension::PowerUnit(PowerUnit::Kw));
        state.set(Dimension::PowerFrom(Some(74)));
        state.set(Dimension::PowerTo(Some(147)));
        state.set(Dimension::BodyTypes(vec!["coupe".into(), "estate".into()]));
        state.set(Dimension::Colours(vec!["red".into()]));
        state.set(Dimension::Features(vec!["navigation".into(), "trailer".into()]));
        state.set(Dimension::Is4x4(true));
        state.set(Dimension::MakeModels(vec![
            MakeModelFilter::new("Audi", Some("A4")),
            MakeModelFilter::all_models("Mercedes-Benz"),
            MakeModelFilter::new("Alfa Romeo", Some("Giulia Quadrifoglio")),
        ]));
        state
    }

    #[test]
    fn every_dimension_round_trips() {
        let state = full_state();
        let query = state.to_query();
        let reparsed = FilterState::from_query(&QueryParams::parse(&query.to_string()));
        assert_eq!(reparsed, state);
    }

    #[test]
    fn keys_come_out_in_canonical_order() {
        let query = full_state().to_query();
        let order: Vec<&str> = query.pairs().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "tab", "priceType", "min_price", "max_price", "min_year", "max_year", "min_mileage",
                "max_mileage", "transmission", "vat", "discounted", "fuel", "electric", "hybridType",
                "powerUnit", "powerFrom", "powerTo", "features", "body_type", "colour", "is4x4", "brand",
                "model", "brand", "model", "brand", "model",
            ]
        );
    }

    #[test]
    fn default_state_serializes_to_nothing() {
        assert!(FilterState::default().to_query().is_empty());
        assert!(!FilterState::default().has_filters());
    }

    #[test]
    fn setting_defaults_drops_keys() {
        let mut state = full_state();
        state.set(Dimension::PriceType("cash".into()));
        state.set(Dimension::PowerUnit(PowerUnit::Hp));
        state.set(Dimension::Fuels(vec![]));
        state.set(Dimension::Transmission(Some("  ".into())));
        state.set(Dimension::VatDeduction(false));
        state.set(Dimension::Tab("all".into()));
        let query = state.to_query();
        for key in ["priceType", "powerUnit", "fuel", "transmission", "vat", "tab"] {
            assert!(!query.contains(key), "{key} should be omitted");
        }
    }

    #[test]
    fn fuels_keep_selection_order() {
        let mut state = FilterState::default();
        state.set(Dimension::PriceFrom(Some(10000)));
        state.set(Dimension::PriceTo(Some(30000)));
        state.toggle_fuel(fuel("diesel"));
        state.toggle_fuel(fuel("petrol"));
        assert_eq!(
            state.to_query().to_string(),
            "min_price=10000&max_price=30000&fuel=diesel,petrol"
        );
    }

    #[test]
    fn toggling_twice_removes() {
        let mut state = FilterState::default();
        state.toggle_colour("red");
        state.toggle_colour("blue");
        state.toggle_colour("red");
        assert_eq!(state.colours, vec!["blue".to_string()]);
        state.toggle_fuel(fuel("diesel"));
        state.toggle_fuel(fuel("diesel"));
        assert!(state.fuels.is_empty());
    }

    #[test]
    fn lists_are_normalized_on_set() {
        let mut state = FilterState::default();
        state.set(Dimension::Features(vec![
            " navigation ".into(),
            "trailer,navigation".into(),
            "".into(),
        ]));
        assert_eq!(state.features, vec!["navigation".to_string(), "trailer".to_string()]);
        state.set(Dimension::Fuels(vec![fuel("diesel,petrol")]));
        let values: Vec<_> = state.fuels.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(values, vec!["diesel", "petrol"]);
    }

    #[test]
    fn malformed_values_are_absent() {
        let params = QueryParams::parse(
            "min_price=abc&max_price=-5&min_year=&powerUnit=watts&vat=yes&fuel=,,&body_type=",
        );
        let state = FilterState::from_query(&params);
        assert_eq!(state, FilterState::default());
    }

    #[test]
    fn aliases_from_the_second_listing_are_understood() {
        let params = QueryParams::parse(
            "priceFrom=5000&regTo=2019&mileageFrom=1000&gear=Manual&vehicleTypes=coupe&colors=red,blue",
        );
        let state = FilterState::from_query(&params);
        assert_eq!(state.price_from, Some(5000));
        assert_eq!(state.year_to, Some(2019));
        assert_eq!(state.mileage_from, Some(1000));
        assert_eq!(state.transmission.as_deref(), Some("Manual"));
        assert_eq!(state.body_types, vec!["coupe".to_string()]);
        assert_eq!(state.colours, vec!["red".to_string(), "blue".to_string()]);
        assert_eq!(
            state.to_query().to_string(),
            "min_price=5000&max_year=2019&min_mileage=1000&transmission=Manual&body_type=coupe&colour=red,blue"
        );
    }

    #[test]
    fn fuel_labels_come_from_the_fuel_table() {
        let state = FilterState::from_query(&QueryParams::parse("fuel=diesel,Electric/Gasoline"));
        let labels: Vec<_> = state.fuels.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Diesel", "Electric/Gasoline"]);
        assert_eq!(state.fuels[0].value, "diesel");
        assert_eq!(state.fuels[1].id, "electric/gasoline");
    }

    #[test]
    fn repeated_form_fields_are_joined() {
        let params = QueryParams::parse("fuel=diesel&fuel=petrol&features=navigation");
        let state = FilterState::from_query(&params);
        assert_eq!(state.fuels.len(), 2);
        assert_eq!(state.to_query().to_string(), "fuel=diesel,petrol&features=navigation");
    }

    #[test]
    fn make_model_pairs_and_legacy_tokens() {
        let params = QueryParams::parse("brand=BMW&model=X5&brand=Audi&makeModel=audi-a3,bmw-all,toyota");
        let filters = FilterState::from_query(&params).make_models;
        let ids: Vec<_> = filters.iter().map(|f| f.id.as_str()).collect();
        // Audi has no paired model, so it means all models
        assert_eq!(ids, vec!["BMW-X5", "Audi-all", "audi-a3", "bmw-all", "toyota-all"]);
        assert!(filters[1].is_all_models());
    }

    #[test]
    fn make_models_are_deduplicated() {
        let mut state = FilterState::default();
        state.add_make_models(vec![MakeModelFilter::new("Audi", Some("A4"))]);
        state.add_make_models(vec![
            MakeModelFilter::new("Audi", Some("A4")),
            MakeModelFilter::new("Audi", Some("all")),
        ]);
        let ids: Vec<_> = state.make_models.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["Audi-A4", "Audi-all"]);
        state.remove_make_model("Audi-A4");
        assert_eq!(state.make_models.len(), 1);
    }

    #[test]
    fn power_unit_change_converts_bounds() {
        let mut state = FilterState::default();
        state.set(Dimension::PowerFrom(Some(100)));
        state.set(Dimension::PowerTo(Some(150)));
        state.change_power_unit(PowerUnit::Kw);
        assert_eq!((state.power_from, state.power_to), (Some(75), Some(112)));
        state.change_power_unit(PowerUnit::Kw);
        assert_eq!(state.power_from, Some(75));
        state.change_power_unit(PowerUnit::Hp);
        assert_eq!((state.power_from, state.power_to), (Some(101), Some(150)));
    }

    #[test]
    fn power_unit_change_without_bounds_only_switches_unit() {
        let mut state = FilterState::default();
        state.change_power_unit(PowerUnit::Kw);
        assert_eq!(state.power_unit, PowerUnit::Kw);
        assert_eq!(state.power_from, None);
        assert_eq!(state.to_query().to_string(), "powerUnit=kw");
    }

    #[test]
    fn tab_alone_is_not_a_filter() {
        let mut state = FilterState::default();
        state.set(Dimension::Tab("history".into()));
        assert!(!state.has_filters());
        state.set(Dimension::Is4x4(true));
        assert!(state.has_filters());
        state.reset();
        assert_eq!(state, FilterState::default());
    }

    #[test]
    fn dimension_wire_format() {
        let change: Dimension =
            serde_json::from_str(r#"{"dimension":"priceFrom","value":10000}"#).unwrap();
        assert_eq!(change, Dimension::PriceFrom(Some(10000)));
        let change: Dimension =
            serde_json::from_str(r#"{"dimension":"powerUnit","value":"kw"}"#).unwrap();
        assert_eq!(change, Dimension::PowerUnit(PowerUnit::Kw));
    }
}
