// Client for the car REST backend (filter ranges, option lists, brands, listings)

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::filters::options::{
    Lookups, SelectOption, fallback_year_options, mileage_options, price_options, year_options,
};
use crate::filters::state::{FilterState, keys};

// --- Response shapes ---

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PriceRange {
    pub min_price: f64,
    pub max_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MileageRange {
    pub min_mileage: f64,
    pub max_mileage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct YearRange {
    pub min_year: i32,
    pub max_year: i32,
}

/// One page of listing results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestDealsQuery {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<u32>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

// --- Catalog trait ---

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn price_range(&self) -> Result<PriceRange>;
    async fn mileage_range(&self) -> Result<MileageRange>;
    async fn year_range(&self) -> Result<YearRange>;
    async fn fuel_types(&self) -> Result<Vec<String>>;
    async fn transmission_types(&self) -> Result<Vec<String>>;
    async fn brands(&self) -> Result<Vec<String>>;
    async fn models(&self, brand: &str) -> Result<Vec<String>>;
    async fn body_types(&self) -> Result<Vec<String>>;
    async fn colours(&self) -> Result<Vec<String>>;
    async fn features(&self) -> Result<Vec<String>>;
    async fn best_deals(&self, query: &BestDealsQuery) -> Result<Page<Value>>;
    async fn cars(&self, page: u32, limit: u32, filters: &FilterState) -> Result<Page<Value>>;
}

// --- HTTP implementation ---

pub struct HttpCatalog {
    http: Arc<Client>,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(http: Arc<Client>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("[CATALOG] GET {} {:?}", url, query);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Backend returned an error status for {}", url))?;

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn get_list(&self, path: &str, query: &[(String, String)]) -> Result<Vec<String>> {
        let value: Value = self.get_json(path, query).await?;
        string_list(&value).with_context(|| format!("Unexpected list shape from {}", path))
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn price_range(&self) -> Result<PriceRange> {
        self.get_json("/filters/prices", &[]).await
    }

    async fn mileage_range(&self) -> Result<MileageRange> {
        self.get_json("/filters/mileage", &[]).await
    }

    async fn year_range(&self) -> Result<YearRange> {
        self.get_json("/filters/years", &[]).await
    }

    async fn fuel_types(&self) -> Result<Vec<String>> {
        self.get_list("/filters/fuel-types", &[]).await
    }

    async fn transmission_types(&self) -> Result<Vec<String>> {
        self.get_list("/filters/transmission-types", &[]).await
    }

    async fn brands(&self) -> Result<Vec<String>> {
        self.get_list("/cars/brands/", &[]).await
    }

    async fn models(&self, brand: &str) -> Result<Vec<String>> {
        let query = [("brand".to_string(), brand.to_string())];
        self.get_list("/cars/models/", &query).await
    }

    async fn body_types(&self) -> Result<Vec<String>> {
        self.get_list("/filters/body-types", &[]).await
    }

    async fn colours(&self) -> Result<Vec<String>> {
        self.get_list("/filters/colours", &[]).await
    }

    async fn features(&self) -> Result<Vec<String>> {
        self.get_list("/filters/features", &[]).await
    }

    async fn best_deals(&self, query: &BestDealsQuery) -> Result<Page<Value>> {
        let mut pairs = Vec::new();
        if let Some(brand) = &query.brand {
            pairs.push(("brand".to_string(), brand.clone()));
        }
        if let Some(model) = &query.model {
            pairs.push(("model".to_string(), model.clone()));
        }
        if let Some(year) = query.year {
            pairs.push(("year".to_string(), year.to_string()));
        }
        pairs.push(("limit".to_string(), query.limit.unwrap_or(10).to_string()));
        pairs.push(("page".to_string(), query.page.unwrap_or(1).to_string()));
        pairs.push(("remove_outliers".to_string(), "false".to_string()));
        self.get_json("/cars/best-deals", &pairs).await
    }

    async fn cars(&self, page: u32, limit: u32, filters: &FilterState) -> Result<Page<Value>> {
        self.get_json("/cars", &listing_query(page, limit, filters)).await
    }
}

/// Query sent to the listing endpoint: paging, the filter state, no outlier removal.
pub fn listing_query(page: u32, limit: u32, filters: &FilterState) -> Vec<(String, String)> {
    let mut pairs = vec![
        (keys::PAGE.to_string(), page.max(1).to_string()),
        ("limit".to_string(), limit.to_string()),
    ];
    for (key, value) in filters.to_query().pairs() {
        // The listing endpoint names the gearbox `gear`
        let key = if key == keys::TRANSMISSION[0] {
            keys::TRANSMISSION[1]
        } else {
            key.as_str()
        };
        pairs.push((key.to_string(), value.clone()));
    }
    pairs.push(("remove_outliers".to_string(), "false".to_string()));
    pairs
}

// Lists come back as plain strings, as `{name}`/`{value}` objects, or wrapped in `{data: [...]}`
fn string_list(value: &Value) -> Option<Vec<String>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => map.get("data")?.as_array()?,
        _ => return None,
    };
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(obj) => ["name", "value", "label"]
                    .iter()
                    .find_map(|k| obj.get(*k).and_then(Value::as_str))
                    .map(|s| s.trim().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

// --- Lookup loading ---

/// Everything the filter sidebar needs from the catalog, with the names of
/// the sources that could not be loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedLookups {
    pub lookups: Lookups,
    pub brands: Vec<String>,
    pub price_options: Vec<SelectOption>,
    pub mileage_options: Vec<SelectOption>,
    pub year_options: Vec<SelectOption>,
    pub degraded: Vec<&'static str>,
}

impl LoadedLookups {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

fn or_degraded<T: Default>(name: &'static str, result: Result<T>, degraded: &mut Vec<&'static str>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("[CATALOG] Failed to load {}: {:#}", name, e);
            degraded.push(name);
            T::default()
        }
    }
}

/// Fetches every lookup concurrently. Failed sources fall back to the static
/// tables or empty option lists instead of failing the page.
pub async fn load_lookups(catalog: &dyn Catalog) -> LoadedLookups {
    let (prices, mileage, years, fuels, transmissions, brands, body_types, colours, features) = futures::join!(
        catalog.price_range(),
        catalog.mileage_range(),
        catalog.year_range(),
        catalog.fuel_types(),
        catalog.transmission_types(),
        catalog.brands(),
        catalog.body_types(),
        catalog.colours(),
        catalog.features(),
    );

    let mut degraded = Vec::new();
    let price_options = or_degraded("prices", prices.map(|r| price_options(r.min_price, r.max_price)), &mut degraded);
    let mileage_options = or_degraded(
        "mileage",
        mileage.map(|r| mileage_options(r.min_mileage, r.max_mileage)),
        &mut degraded,
    );
    let year_options = match years {
        Ok(range) => year_options(range.min_year, range.max_year),
        Err(e) => {
            tracing::warn!("[CATALOG] Failed to load years: {:#}", e);
            degraded.push("years");
            fallback_year_options()
        }
    };
    let fuels = or_degraded("fuel-types", fuels, &mut degraded);
    let transmissions = or_degraded("transmission-types", transmissions, &mut degraded);
    let brands = or_degraded("brands", brands, &mut degraded);
    let body_types = or_degraded("body-types", body_types, &mut degraded);
    let colours = or_degraded("colours", colours, &mut degraded);
    let features = or_degraded("features", features, &mut degraded);

    if degraded.is_empty() {
        tracing::info!("[CATALOG] Lookups loaded ({} brands).", brands.len());
    }

    LoadedLookups {
        lookups: Lookups::merged(&fuels, &transmissions, &body_types, &colours, &features),
        brands,
        price_options,
        mileage_options,
        year_options,
        degraded,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FailingCatalog, StaticCatalog};
    use super::*;
    use crate::filters::options::FUEL_TYPES;
    use crate::filters::query::QueryParams;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpCatalog {
        HttpCatalog::new(Arc::new(Client::new()), &format!("{}/", server.uri()))
    }

    #[tokio::test]
    async fn reads_ranges_and_lists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/filters/prices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "min_price": 500, "max_price": 90000
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cars/models/"))
            .and(query_param("brand", "Alfa Romeo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Giulia"}, "Stelvio", {"name": ""}
            ])))
            .mount(&server)
            .await;

        let catalog = client(&server);
        let prices = catalog.price_range().await.unwrap();
        assert_eq!(prices.max_price, 90000.0);
        let models = catalog.models("Alfa Romeo").await.unwrap();
        assert_eq!(models, vec!["Giulia".to_string(), "Stelvio".to_string()]);
    }

    #[tokio::test]
    async fn error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cars/brands/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        assert!(client(&server).brands().await.is_err());
    }

    #[tokio::test]
    async fn listing_request_carries_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cars"))
            .and(query_param("page", "2"))
            .and(query_param("limit", "20"))
            .and(query_param("gear", "Manual"))
            .and(query_param("fuel", "diesel,petrol"))
            .and(query_param("remove_outliers", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": 1}], "total": 21, "page": 2, "pages": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let filters = FilterState::from_query(&QueryParams::parse("transmission=Manual&fuel=diesel,petrol"));
        let page = client(&server).cars(2, 20, &filters).await.unwrap();
        assert_eq!(page.total, 21);
        assert_eq!(page.data.len(), 1);
    }

    #[test]
    fn listing_query_starts_at_page_one() {
        let pairs = listing_query(0, 20, &FilterState::default());
        assert_eq!(pairs[0], ("page".to_string(), "1".to_string()));
        assert_eq!(pairs.last().map(|(k, _)| k.as_str()), Some("remove_outliers"));
    }

    #[test]
    fn list_shapes() {
        let wrapped = serde_json::json!({"data": ["Coupe", " SUV "]});
        assert_eq!(string_list(&wrapped), Some(vec!["Coupe".to_string(), "SUV".to_string()]));
        assert_eq!(string_list(&serde_json::json!(42)), None);
    }

    #[tokio::test]
    async fn lookups_from_a_healthy_catalog() {
        let loaded = load_lookups(&StaticCatalog).await;
        assert!(!loaded.is_degraded());
        assert_eq!(loaded.price_options.len(), 21);
        assert_eq!(loaded.year_options.first().map(|o| o.value.as_str()), Some("2020"));
        assert_eq!(loaded.lookups.transmissions.len(), 2);
        assert!(loaded.lookups.body_type("suv").is_some());
    }

    #[tokio::test]
    async fn lookups_degrade_instead_of_failing() {
        let loaded = load_lookups(&FailingCatalog).await;
        assert_eq!(loaded.degraded.len(), 9);
        assert!(loaded.price_options.is_empty());
        assert!(!loaded.year_options.is_empty());
        assert_eq!(loaded.lookups.fuels, *FUEL_TYPES);
        assert!(loaded.brands.is_empty());
    }
}
