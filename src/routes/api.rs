// Handlers for the JSON API

use axum::{
    extract::{Json as JsonExtract, Path, Query, RawQuery, State},
    http::StatusCode,
    response::Json,
};
use cached::Cached;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    AppState,
    catalog::{BestDealsQuery, LoadedLookups, Page, load_lookups},
    error::{AppError, AppResult},
    filters::{
        chips::{Chip, ChipId, derive_chips, remove_chip},
        picker::{MakeModelPicker, PickerEvent, PickerOption, PickerView},
        query::QueryParams,
        state::{FilterState, MakeModelFilter, keys},
        store::{FilterChange, FilterStore},
    },
};

const LOOKUPS_KEY: &str = "lookups";

/// Lookups from the TTL cache, loading them on a miss. Degraded results are
/// served but not cached so the next request retries the backend.
pub(crate) async fn cached_lookups(app_state: &AppState) -> LoadedLookups {
    if let Some(hit) = app_state.lookup_cache.lock().await.cache_get(&LOOKUPS_KEY) {
        return hit.clone();
    }
    // The lock is not held while the backend is queried
    let loaded = load_lookups(app_state.catalog.as_ref()).await;
    if !loaded.is_degraded() {
        app_state
            .lookup_cache
            .lock()
            .await
            .cache_set(LOOKUPS_KEY, loaded.clone());
    }
    loaded
}

// --- Response Wrappers ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltersResponse {
    state: FilterState,
    query: String,
    location: String,
    has_filters: bool,
    chips: Vec<Chip>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    location: String,
    changed: bool,
    state: FilterState,
    has_filters: bool,
    chips: Vec<Chip>,
}

#[derive(Debug, Serialize)]
pub struct ChipsResponse {
    location: String,
    chips: Vec<Chip>,
}

#[derive(Debug, Serialize)]
pub struct PickerResponse {
    picker: MakeModelPicker,
    options: Vec<PickerOption>,
    applied: Option<Vec<MakeModelFilter>>,
}

#[derive(Debug, Serialize)]
pub struct PreferenceResponse {
    key: String,
    value: Value,
}

// --- Request Structs ---

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    location: String,
    #[serde(default)]
    changes: Vec<FilterChange>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveChipRequest {
    location: String,
    chip: ChipId,
}

#[derive(Debug, Deserialize)]
pub struct PickerRequest {
    #[serde(default)]
    picker: MakeModelPicker,
    event: PickerEvent,
}

// --- Filter Handlers ---

pub async fn get_filters(
    State(app_state): State<AppState>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<FiltersResponse>> {
    let query = query.unwrap_or_default();
    tracing::info!("[HANDLER] /api/filters - Request received: {:?}", query);

    let store = FilterStore::from_location(&app_state.settings.listing_path, &format!("?{}", query));
    let location = store.canonical_location();
    let params = store.state().to_query();
    let lookups = cached_lookups(&app_state).await;

    Ok(Json(FiltersResponse {
        query: params.to_string(),
        chips: derive_chips(&params, &lookups.lookups),
        has_filters: store.has_filters(),
        state: store.state().clone(),
        location,
    }))
}

pub async fn apply_filters(
    State(app_state): State<AppState>,
    JsonExtract(request): JsonExtract<ApplyRequest>,
) -> AppResult<Json<ApplyResponse>> {
    tracing::info!(
        "[HANDLER] /api/filters/apply - {} change(s) against {}",
        request.changes.len(),
        request.location
    );

    let mut store = FilterStore::from_location(&app_state.settings.listing_path, &request.location);
    let pushed = store.apply_all(request.changes);
    let lookups = cached_lookups(&app_state).await;
    let chips = derive_chips(&QueryParams::from_location(store.location()), &lookups.lookups);

    if let Some(location) = &pushed {
        tracing::debug!("[HANDLER] /api/filters/apply - New location: {}", location);
    }

    Ok(Json(ApplyResponse {
        location: store.location().to_string(),
        changed: pushed.is_some(),
        has_filters: store.has_filters(),
        state: store.state().clone(),
        chips,
    }))
}

pub async fn remove_filter_chip(
    State(app_state): State<AppState>,
    JsonExtract(request): JsonExtract<RemoveChipRequest>,
) -> AppResult<Json<ChipsResponse>> {
    tracing::info!("[HANDLER] /api/filters/chips/remove - {:?}", request.chip);

    let mut params = QueryParams::from_location(&request.location);
    remove_chip(&mut params, &request.chip);
    // The result set changed, so pagination starts over
    params.delete(keys::PAGE);

    let lookups = cached_lookups(&app_state).await;
    Ok(Json(ChipsResponse {
        location: params.to_location(&app_state.settings.listing_path),
        chips: derive_chips(&params, &lookups.lookups),
    }))
}

// --- Catalog Handlers ---

pub async fn get_lookups(State(app_state): State<AppState>) -> AppResult<Json<LoadedLookups>> {
    tracing::info!("[HANDLER] /api/lookups - Request received.");
    let loaded = cached_lookups(&app_state).await;
    if loaded.is_degraded() {
        tracing::warn!("[HANDLER] /api/lookups - Serving degraded lookups: {:?}", loaded.degraded);
    }
    Ok(Json(loaded))
}

pub async fn get_makes(State(app_state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    tracing::info!("[HANDLER] /api/makes - Request received.");
    match app_state.catalog.brands().await {
        Ok(makes) => {
            tracing::info!("[HANDLER] /api/makes - Returning {} makes.", makes.len());
            Ok(Json(makes))
        }
        Err(e) => {
            tracing::error!("[HANDLER] /api/makes - Error fetching makes: {:?}", e);
            Err(AppError::InternalServerError(e.context("Failed to fetch makes in handler")))
        }
    }
}

pub async fn get_models(
    State(app_state): State<AppState>,
    Path(make): Path<String>,
) -> AppResult<Json<Vec<String>>> {
    tracing::info!("[HANDLER] /api/models/:make - Request received for make: {}", make);
    if make.trim().is_empty() {
        return Err(AppError::BadRequest("make must not be empty".to_string()));
    }
    let models = app_state.catalog.models(make.trim()).await.map_err(|e| {
        AppError::InternalServerError(e.context(format!("Failed to fetch models for make '{}' in handler", make)))
    })?;
    Ok(Json(models))
}

pub async fn get_best_deals(
    State(app_state): State<AppState>,
    Query(query): Query<BestDealsQuery>,
) -> AppResult<Json<Page<Value>>> {
    tracing::info!("[HANDLER] /api/best-deals - Request received: {:?}", query);
    let deals = app_state
        .catalog
        .best_deals(&query)
        .await
        .map_err(|e| AppError::InternalServerError(e.context("Failed to fetch best deals in handler")))?;
    Ok(Json(deals))
}

// --- Picker Handler ---

pub async fn picker_event(
    State(app_state): State<AppState>,
    JsonExtract(request): JsonExtract<PickerRequest>,
) -> AppResult<Json<PickerResponse>> {
    tracing::info!("[HANDLER] /api/picker - Event: {:?}", request.event);

    let mut picker = request.picker;
    let applied = picker.handle(request.event)?;

    let options = match (&picker.view, picker.open) {
        (_, false) => Vec::new(),
        (PickerView::BrowsingMakes, true) => {
            let lookups = cached_lookups(&app_state).await;
            picker.visible_makes(&lookups.brands)
        }
        (PickerView::BrowsingModels { make }, true) => {
            let models = app_state.catalog.models(make).await.unwrap_or_else(|e| {
                tracing::warn!("[HANDLER] /api/picker - Could not load models for {}: {:#}", make, e);
                Vec::new()
            });
            picker.visible_models(&models)
        }
    };

    Ok(Json(PickerResponse {
        picker,
        options,
        applied,
    }))
}

// --- Preference Handlers ---

pub async fn get_preference(
    State(app_state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<PreferenceResponse>> {
    match app_state.preferences.get(&key) {
        Some(value) => Ok(Json(PreferenceResponse { key, value })),
        None => Err(AppError::NotFound(format!("No preference stored under '{}'", key))),
    }
}

pub async fn put_preference(
    State(app_state): State<AppState>,
    Path(key): Path<String>,
    JsonExtract(value): JsonExtract<Value>,
) -> AppResult<Json<PreferenceResponse>> {
    tracing::info!("[HANDLER] /api/preferences/:key - Storing '{}'", key);
    app_state.preferences.set(&key, value.clone());
    Ok(Json(PreferenceResponse { key, value }))
}

pub async fn delete_preference(
    State(app_state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<StatusCode> {
    match app_state.preferences.remove(&key) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(AppError::NotFound(format!("No preference stored under '{}'", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{FailingCatalog, SlowPricesCatalog, StaticCatalog};
    use crate::config::Settings;
    use crate::filters::state::Dimension;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio::time::{Duration, Instant};

    fn state() -> AppState {
        AppState::new(Arc::new(Settings::default()), Arc::new(StaticCatalog))
    }

    fn labels(chips: &[Chip]) -> Vec<&str> {
        chips.iter().map(|c| c.label.as_str()).collect()
    }

    #[tokio::test]
    async fn filters_endpoint_canonicalizes() {
        let Json(response) = get_filters(
            State(state()),
            RawQuery(Some("priceFrom=10000&priceTo=30000&fuel=diesel,petrol&page=3".to_string())),
        )
        .await
        .unwrap();
        assert_eq!(response.query, "min_price=10000&max_price=30000&fuel=diesel,petrol");
        assert_eq!(response.location, "/cars?min_price=10000&max_price=30000&fuel=diesel,petrol");
        assert!(response.has_filters);
        assert_eq!(labels(&response.chips), vec!["€10,000 - €30,000", "Diesel", "Petrol"]);
    }

    #[tokio::test]
    async fn apply_reports_unchanged_locations() {
        let request = ApplyRequest {
            location: "/cars?vat=true".to_string(),
            changes: vec![FilterChange::Set(Dimension::VatDeduction(true))],
        };
        let Json(response) = apply_filters(State(state()), JsonExtract(request)).await.unwrap();
        assert!(!response.changed);
        assert_eq!(response.location, "/cars?vat=true");

        let request = ApplyRequest {
            location: "/cars?vat=true".to_string(),
            changes: vec![FilterChange::Reset],
        };
        let Json(response) = apply_filters(State(state()), JsonExtract(request)).await.unwrap();
        assert!(response.changed);
        assert_eq!(response.location, "/cars");
        assert!(!response.has_filters);
        assert!(response.chips.is_empty());
    }

    #[tokio::test]
    async fn removing_a_make_chip_keeps_the_rest() {
        let request = RemoveChipRequest {
            location: "/cars?min_price=1000&brand=Audi&model=A4&brand=BMW&model=all&colour=red&page=2"
                .to_string(),
            chip: ChipId::MakeModel {
                brand: "Audi".to_string(),
                model: Some("A4".to_string()),
            },
        };
        let Json(response) = remove_filter_chip(State(state()), JsonExtract(request)).await.unwrap();
        assert_eq!(response.location, "/cars?min_price=1000&brand=BMW&model=all&colour=red");
        assert_eq!(labels(&response.chips)[0], "BMW (All Models)");
    }

    #[tokio::test]
    async fn degraded_lookups_are_not_cached() {
        let app_state = AppState::new(Arc::new(Settings::default()), Arc::new(FailingCatalog));
        let Json(loaded) = get_lookups(State(app_state.clone())).await.unwrap();
        assert!(loaded.is_degraded());
        assert_eq!(app_state.lookup_cache.lock().await.cache_size(), 0);

        let app_state = state();
        get_lookups(State(app_state.clone())).await.unwrap();
        assert_eq!(app_state.lookup_cache.lock().await.cache_size(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_does_not_serialize_lookups() {
        let app_state = AppState::new(
            Arc::new(Settings::default()),
            Arc::new(SlowPricesCatalog {
                delay: Duration::from_millis(500),
            }),
        );
        let started = Instant::now();
        let (a, b, c, d) = tokio::join!(
            cached_lookups(&app_state),
            cached_lookups(&app_state),
            cached_lookups(&app_state),
            cached_lookups(&app_state),
        );
        assert!(started.elapsed() < Duration::from_millis(1000));
        for loaded in [a, b, c, d] {
            assert_eq!(loaded.degraded, vec!["prices"]);
        }
    }

    #[tokio::test]
    async fn makes_fail_loudly_when_backend_is_down() {
        let app_state = AppState::new(Arc::new(Settings::default()), Arc::new(FailingCatalog));
        let result = get_makes(State(app_state)).await;
        assert!(matches!(result, Err(AppError::InternalServerError(_))));
    }

    #[tokio::test]
    async fn picker_walks_makes_and_models() {
        let request = PickerRequest {
            picker: MakeModelPicker::default(),
            event: PickerEvent::Open,
        };
        let Json(response) = picker_event(State(state()), JsonExtract(request)).await.unwrap();
        assert_eq!(response.options.len(), 3);

        let request = PickerRequest {
            picker: response.picker,
            event: PickerEvent::SelectMake("Audi".to_string()),
        };
        let Json(response) = picker_event(State(state()), JsonExtract(request)).await.unwrap();
        let labels: Vec<_> = response.options.iter().map(|o| o.item.label.as_str()).collect();
        assert_eq!(labels, vec!["All Models", "A3", "A4", "Q5"]);

        let request = PickerRequest {
            picker: response.picker,
            event: PickerEvent::ToggleModel("A4".to_string()),
        };
        let Json(response) = picker_event(State(state()), JsonExtract(request)).await.unwrap();
        let request = PickerRequest {
            picker: response.picker,
            event: PickerEvent::Apply,
        };
        let Json(response) = picker_event(State(state()), JsonExtract(request)).await.unwrap();
        assert_eq!(response.applied, Some(vec![MakeModelFilter::new("Audi", Some("A4"))]));
        assert!(response.options.is_empty());
    }

    #[tokio::test]
    async fn picker_rejects_toggle_without_make() {
        let request = PickerRequest {
            picker: MakeModelPicker::default(),
            event: PickerEvent::ToggleModel("A4".to_string()),
        };
        let result = picker_event(State(state()), JsonExtract(request)).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn preferences_round_trip() {
        let app_state = state();
        let key = "category-fuel-type".to_string();
        assert!(matches!(
            get_preference(State(app_state.clone()), Path(key.clone())).await,
            Err(AppError::NotFound(_))
        ));
        put_preference(State(app_state.clone()), Path(key.clone()), JsonExtract(Value::Bool(false)))
            .await
            .unwrap();
        let Json(stored) = get_preference(State(app_state.clone()), Path(key.clone())).await.unwrap();
        assert_eq!(stored.value, Value::Bool(false));
        let status = delete_preference(State(app_state), Path(key)).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
