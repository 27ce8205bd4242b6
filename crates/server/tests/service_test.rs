//! End-to-end tests for the recommendation service.
//!
//! Requests go through parameter validation, the engines and record
//! shaping, the same path the CLI takes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use catalog::{
    CatalogEvent, CatalogStore, InMemoryCatalog, Interaction, InteractionKind, Listing, ListingId,
    Location, PropertyType, UserId,
};
use engine::CandidateSource;
use server::{RecommendationService, ServiceConfig, ServiceError, Strategy};

fn listing(id: u32, price: f64, bedrooms: u32, bathrooms: u32, area: f64, year: u32) -> Listing {
    Listing {
        id,
        price,
        bedrooms,
        bathrooms,
        area,
        year_built: year,
        parking_spaces: if id == 1 { 1 } else { 2 },
        property_type: PropertyType::Residential,
        has_garage: false,
        has_pool: false,
        location: Location::new("Cape Town", "South Africa"),
        description: None,
    }
}

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn scenario_preferences() -> BTreeMap<String, String> {
    params(&[
        ("budget", "400000"),
        ("min_bedrooms", "2"),
        ("min_bathrooms", "1"),
        ("preferred_area", "1600"),
        ("min_year_built", "2000"),
        ("parking_spaces", "1"),
    ])
}

/// Two listings for the preference scenario, three more for the
/// collaborative one
fn build_test_store() -> Arc<InMemoryCatalog> {
    Arc::new(InMemoryCatalog::from_parts(
        vec![
            listing(1, 300_000.0, 3, 2, 1500.0, 2010),
            listing(2, 500_000.0, 4, 3, 2000.0, 2015),
            listing(10, 420_000.0, 3, 2, 1700.0, 2005),
            listing(11, 380_000.0, 2, 1, 1200.0, 1998),
            listing(12, 450_000.0, 4, 2, 1900.0, 2018),
        ],
        vec![
            Interaction::new(1, 10, InteractionKind::Like),
            Interaction::new(1, 11, InteractionKind::View),
            Interaction::new(2, 10, InteractionKind::Like),
            Interaction::new(2, 11, InteractionKind::View),
            Interaction::new(2, 12, InteractionKind::Save),
        ],
    ))
}

fn build_test_service() -> (Arc<InMemoryCatalog>, RecommendationService) {
    let store = build_test_store();
    let service = RecommendationService::new(store.clone(), ServiceConfig::default());
    store.subscribe(Arc::new(service.clone()));
    (store, service)
}

#[tokio::test]
async fn test_preference_scenario_returns_only_affordable_listing() {
    let store = Arc::new(InMemoryCatalog::from_parts(
        vec![
            listing(1, 300_000.0, 3, 2, 1500.0, 2010),
            listing(2, 500_000.0, 4, 3, 2000.0, 2015),
        ],
        Vec::new(),
    ));
    let service = RecommendationService::new(store, ServiceConfig::default());

    let records = service
        .recommend_async(Strategy::Preference, scenario_preferences())
        .await
        .unwrap();

    let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1]);
    assert_eq!(records[0].source, CandidateSource::Preference);
}

#[tokio::test]
async fn test_user_based_scenario_recommends_saved_listing() {
    let (_, service) = build_test_service();

    let records = service
        .recommend_async(Strategy::UserBased, params(&[("user_id", "1")]))
        .await
        .unwrap();

    assert_eq!(records.first().map(|r| r.id), Some(12));
    assert!(records.iter().all(|r| r.id != 10 && r.id != 11));
}

#[tokio::test]
async fn test_users_without_history_get_empty_lists() {
    let (_, service) = build_test_service();

    for strategy in [Strategy::Content, Strategy::UserBased, Strategy::ItemBased] {
        let records = service
            .recommend_async(strategy, params(&[("user_id", "404")]))
            .await
            .unwrap();
        assert!(records.is_empty(), "{} should be empty", strategy);
    }
}

#[tokio::test]
async fn test_invalid_preferences_name_the_field() {
    let (_, service) = build_test_service();
    let mut raw = scenario_preferences();
    raw.remove("budget");

    let err = service
        .recommend_async(Strategy::Preference, raw)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::InvalidPreferences {
            field: "budget".to_string(),
            reason: "is required".to_string()
        }
    );
}

#[tokio::test]
async fn test_empty_catalog_is_an_error_outcome() {
    let service =
        RecommendationService::new(Arc::new(InMemoryCatalog::new()), ServiceConfig::default());

    let err = service
        .recommend_async(Strategy::Preference, scenario_preferences())
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::EmptyCatalog);

    // Collaborative filtering has nothing to fit, so it just finds nothing
    let records = service
        .recommend_async(Strategy::ItemBased, params(&[("user_id", "1")]))
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_warm_up_initializes_all_engines() {
    let (_, service) = build_test_service();
    service.warm_up().await.unwrap();

    let records = service
        .recommend_async(Strategy::ItemBased, params(&[("user_id", "1"), ("top_n", "1")]))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 12);
}

#[tokio::test]
async fn test_notify_updates_engines_off_thread() {
    let store = build_test_store();
    let service = RecommendationService::new(store.clone(), ServiceConfig::default());
    service.warm_up().await.unwrap();

    // Not subscribed: the store changes, the engines learn about it via notify
    let new_listing = listing(13, 350_000.0, 3, 2, 1550.0, 2011);
    store.upsert_listing(new_listing.clone()).unwrap();
    service
        .notify(CatalogEvent::ListingCreated(new_listing))
        .await
        .unwrap();

    let records = service
        .recommend_async(Strategy::Preference, scenario_preferences())
        .await
        .unwrap();
    let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
    assert!(ids.contains(&13));
    assert!(ids.iter().all(|&id| store.get_listing(id).unwrap().price <= 400_000.0));
}

#[tokio::test]
async fn test_deleted_listing_disappears_from_results() {
    let (store, service) = build_test_service();
    service.warm_up().await.unwrap();

    store.delete_listing(12);

    for strategy in [Strategy::UserBased, Strategy::ItemBased] {
        let records = service
            .recommend_async(strategy, params(&[("user_id", "1")]))
            .await
            .unwrap();
        assert!(records.iter().all(|r| r.id != 12));
    }
    let records = service
        .recommend_async(Strategy::Preference, scenario_preferences())
        .await
        .unwrap();
    assert!(records.iter().all(|r| r.id != 12));
}

/// Catalog whose interaction feed takes longer than any request may wait
struct SlowStore {
    inner: Arc<InMemoryCatalog>,
    delay: Duration,
}

impl CatalogStore for SlowStore {
    fn list_all_listings(&self) -> Vec<Listing> {
        self.inner.list_all_listings()
    }

    fn get_listing(&self, id: ListingId) -> Option<Listing> {
        self.inner.get_listing(id)
    }

    fn list_interactions(&self, user_id: Option<UserId>) -> Vec<Interaction> {
        std::thread::sleep(self.delay);
        self.inner.list_interactions(user_id)
    }
}

#[tokio::test]
async fn test_slow_request_reports_timeout() {
    let store = Arc::new(SlowStore {
        inner: build_test_store(),
        delay: Duration::from_millis(500),
    });
    let config = ServiceConfig::default().with_request_timeout(Duration::from_millis(20));
    let service = RecommendationService::new(store, config);

    let err = service
        .recommend_async(Strategy::ItemBased, params(&[("user_id", "1")]))
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::Timeout(20));
}
