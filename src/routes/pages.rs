// Server-rendered listing page

use askama::Template;
use axum::{
    extract::{RawQuery, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde_json::Value;

use super::api::cached_lookups;
use crate::{
    AppState,
    error::AppError,
    filters::{
        chips::{derive_chips, remove_chip},
        options::{OptionItem, SelectOption, format_euros, group_thousands, power_options},
        query::QueryParams,
        state::{Dimension, FilterState, PowerUnit, keys, make_model_pairs},
        store::{FilterChange, FilterStore},
    },
};

// Unit the sidebar form was rendered with, so a unit switch can convert the bounds
const PREV_POWER_UNIT: &str = "prevPowerUnit";

// --- View models ---

pub struct ChipLink {
    pub label: String,
    pub href: String,
}

pub struct FormOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub struct FormSelect {
    pub name: &'static str,
    pub label: &'static str,
    pub options: Vec<FormOption>,
}

/// Collapsible checkbox group; `open` comes from the preference store.
pub struct FormChecks {
    pub title: &'static str,
    pub name: &'static str,
    pub open: bool,
    pub options: Vec<FormOption>,
}

pub struct HiddenField {
    pub name: String,
    pub value: String,
}

pub struct CarCard {
    pub title: String,
    pub price: String,
    pub details: String,
}

impl CarCard {
    // Listing items are loosely typed, missing fields render as blanks
    fn from_value(car: &Value) -> Self {
        let text = |key: &str| car.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        let number = |key: &str| car.get(key).and_then(Value::as_f64).map(|v| v.round() as u64);

        let title = format!("{} {}", text("brand"), text("model")).trim().to_string();
        let mut details = Vec::new();
        if let Some(year) = number("year") {
            details.push(year.to_string());
        }
        if let Some(mileage) = number("mileage") {
            details.push(format!("{} km", group_thousands(mileage)));
        }
        let fuel = text("fuel");
        if !fuel.is_empty() {
            details.push(fuel);
        }

        Self {
            title: if title.is_empty() { "Car".to_string() } else { title },
            price: number("price").map(format_euros).unwrap_or_default(),
            details: details.join(" · "),
        }
    }
}

#[derive(Template)]
#[template(path = "cars.html")]
pub struct CarsTemplate {
    pub listing_path: String,
    pub chips: Vec<ChipLink>,
    pub has_filters: bool,
    pub selects: Vec<FormSelect>,
    pub checks: Vec<FormChecks>,
    pub flags: Vec<FormOption>,
    pub hidden: Vec<HiddenField>,
    pub cars: Vec<CarCard>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
    pub notices: Vec<String>,
}

// --- Handlers ---

pub async fn root(State(app_state): State<AppState>) -> Redirect {
    Redirect::to(&app_state.settings.listing_path)
}

pub async fn cars_page(
    State(app_state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let listing_path = app_state.settings.listing_path.clone();
    let raw = query.unwrap_or_default();
    tracing::info!("[HANDLER] {} - Request received: {:?}", listing_path, raw);

    let params = QueryParams::parse(&raw);
    let requested = params.to_location(&listing_path);
    let page = params
        .get(keys::PAGE)
        .and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p > 1);

    let mut store = FilterStore::from_location(&listing_path, &requested);
    if let Some(previous) = params.get(PREV_POWER_UNIT).map(PowerUnit::parse) {
        let submitted = store.state().power_unit;
        if previous != submitted {
            store.set(Dimension::PowerUnit(previous));
            store.apply(FilterChange::ChangePowerUnit { unit: submitted });
        }
    }
    let canonical = with_page(store.canonical_location(), page);
    if canonical != format!("{}{}", listing_path, query_suffix(&raw)) {
        tracing::debug!("[HANDLER] {} - Redirecting to canonical {}", listing_path, canonical);
        return Ok(Redirect::to(&canonical).into_response());
    }

    let template = build_page(&app_state, store.state(), page.unwrap_or(1)).await;
    match template.render() {
        Ok(html) => Ok(Html(html).into_response()),
        Err(e) => {
            tracing::error!("Failed to render cars template: {}", e);
            Err(AppError::InternalServerError(anyhow::Error::new(e)))
        }
    }
}

fn query_suffix(raw: &str) -> String {
    if raw.is_empty() { String::new() } else { format!("?{}", raw) }
}

fn with_page(location: String, page: Option<u32>) -> String {
    match page {
        Some(page) if location.contains('?') => format!("{}&{}={}", location, keys::PAGE, page),
        Some(page) => format!("{}?{}={}", location, keys::PAGE, page),
        None => location,
    }
}

async fn build_page(app_state: &AppState, state: &FilterState, page: u32) -> CarsTemplate {
    let settings = &app_state.settings;
    let loaded = cached_lookups(app_state).await;
    let params = state.to_query();

    let chips = derive_chips(&params, &loaded.lookups)
        .into_iter()
        .map(|chip| {
            let mut remaining = params.clone();
            remove_chip(&mut remaining, &chip.id);
            ChipLink {
                label: chip.label,
                href: remaining.to_location(&settings.listing_path),
            }
        })
        .collect();

    let mut notices: Vec<String> = loaded
        .degraded
        .iter()
        .map(|source| format!("Could not load {} from the catalog, some filter options may be missing.", source))
        .collect();

    let (cars, total, pages): (Vec<CarCard>, u64, u32) = match app_state.catalog.cars(page, settings.page_size, state).await {
        Ok(result) => (
            result.data.iter().map(CarCard::from_value).collect(),
            result.total,
            result.pages.max(1),
        ),
        Err(e) => {
            tracing::warn!("[HANDLER] Listing request failed: {:#}", e);
            notices.push("Listings are unavailable right now, please try again shortly.".to_string());
            (Vec::new(), 0, 1)
        }
    };

    let page_href = |page: u32| with_page(params.to_location(&settings.listing_path), (page > 1).then_some(page));

    CarsTemplate {
        listing_path: settings.listing_path.clone(),
        chips,
        has_filters: state.has_filters(),
        selects: selects(state, &loaded.price_options, &loaded.mileage_options, &loaded.year_options, &loaded.lookups.transmissions),
        checks: vec![
            checks(app_state, "Fuel type", keys::FUEL[0], &loaded.lookups.fuels, |v| {
                state.fuels.iter().any(|f| f.value == v)
            }),
            checks(app_state, "Body type", keys::BODY_TYPE[0], &loaded.lookups.body_types, |v| {
                state.body_types.iter().any(|b| b == v)
            }),
            checks(app_state, "Colour", keys::COLOUR[0], &loaded.lookups.colours, |v| {
                state.colours.iter().any(|c| c == v)
            }),
            checks(app_state, "Features", keys::FEATURES[0], &loaded.lookups.features, |v| {
                state.features.iter().any(|f| f == v)
            }),
        ],
        flags: vec![
            flag(keys::VAT, "VAT deduction", state.vat_deduction),
            flag(keys::DISCOUNTED, "Discounted cars", state.discounted),
            flag(keys::ELECTRIC, "Electric Vehicle", state.electric),
            flag(keys::IS_4X4, "Drive type 4x4", state.is_4x4),
        ],
        hidden: hidden_fields(state),
        cars,
        total,
        page,
        pages,
        prev_href: (page > 1).then(|| page_href(page - 1)),
        next_href: (page < pages).then(|| page_href(page + 1)),
        notices,
    }
}

// --- Form builders ---

fn select(name: &'static str, label: &'static str, options: &[SelectOption], current: Option<String>) -> FormSelect {
    let mut rows = vec![FormOption {
        value: String::new(),
        label: "Any".to_string(),
        selected: current.is_none(),
    }];
    rows.extend(options.iter().map(|o| FormOption {
        selected: current.as_deref() == Some(o.value.as_str()),
        value: o.value.clone(),
        label: o.label.clone(),
    }));
    FormSelect { name, label, options: rows }
}

fn selects(
    state: &FilterState,
    prices: &[SelectOption],
    mileage: &[SelectOption],
    years: &[SelectOption],
    transmissions: &[OptionItem],
) -> Vec<FormSelect> {
    let as_text = |v: Option<u32>| v.map(|v| v.to_string());
    let gearboxes: Vec<SelectOption> = transmissions
        .iter()
        .map(|t| SelectOption {
            value: t.value.clone(),
            label: t.label.clone(),
        })
        .collect();
    let units = [PowerUnit::Hp, PowerUnit::Kw].map(|u| SelectOption {
        value: u.as_str().to_string(),
        label: u.as_str().to_uppercase(),
    });
    let powers = power_options(state.power_unit);

    let mut power_unit = select(keys::POWER_UNIT, "Power unit", &units, Some(state.power_unit.as_str().to_string()));
    // The unit always has a value
    power_unit.options.remove(0);

    vec![
        select(keys::MIN_PRICE[0], "Price from", prices, as_text(state.price_from)),
        select(keys::MAX_PRICE[0], "Price to", prices, as_text(state.price_to)),
        select(keys::MIN_YEAR[0], "Registration from", years, as_text(state.year_from)),
        select(keys::MAX_YEAR[0], "Registration to", years, as_text(state.year_to)),
        select(keys::MIN_MILEAGE[0], "Mileage from", mileage, as_text(state.mileage_from)),
        select(keys::MAX_MILEAGE[0], "Mileage to", mileage, as_text(state.mileage_to)),
        select(keys::TRANSMISSION[0], "Transmission", &gearboxes, state.transmission.clone()),
        power_unit,
        select(keys::POWER_FROM, "Power from", &powers, as_text(state.power_from)),
        select(keys::POWER_TO, "Power to", &powers, as_text(state.power_to)),
    ]
}

fn checks(
    app_state: &AppState,
    title: &'static str,
    name: &'static str,
    items: &[OptionItem],
    is_selected: impl Fn(&str) -> bool,
) -> FormChecks {
    // Fuels travel by value, everything else by id
    let by_value = name == keys::FUEL[0];
    let options: Vec<FormOption> = items
        .iter()
        .map(|item| {
            let value = if by_value { &item.value } else { &item.id };
            FormOption {
                selected: is_selected(value),
                value: value.clone(),
                label: item.label.clone(),
            }
        })
        .collect();
    let default_open = options.iter().any(|o| o.selected);
    FormChecks {
        title,
        name,
        open: app_state.preferences.is_category_open(title, default_open),
        options,
    }
}

fn flag(name: &'static str, label: &str, selected: bool) -> FormOption {
    FormOption {
        value: name.to_string(),
        label: label.to_string(),
        selected,
    }
}

// Dimensions the sidebar form has no control for
fn hidden_fields(state: &FilterState) -> Vec<HiddenField> {
    let mut fields: Vec<HiddenField> = make_model_pairs(&state.make_models)
        .into_iter()
        .map(|(name, value)| HiddenField { name, value })
        .collect();
    let params = state.to_query();
    for key in [keys::TAB, keys::PRICE_TYPE, keys::HYBRID_TYPE] {
        if let Some(value) = params.get(key) {
            fields.push(HiddenField {
                name: key.to_string(),
                value: value.to_string(),
            });
        }
    }
    fields.push(HiddenField {
        name: PREV_POWER_UNIT.to_string(),
        value: state.power_unit.as_str().to_string(),
    });
    fields
}
