//! Integration tests for the geolocation resolver against mock providers.

use serde_json::json;
use std::time::Duration;
use ufw_report::{
    GeoResolver, GeoResult, ProviderError, ProviderOutcome, ProviderSpec, ResolverConfig,
    ResponseShape,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IP: &str = "203.0.113.7";

fn providers(server: &MockServer) -> Vec<ProviderSpec> {
    vec![
        ProviderSpec::new(
            "API1",
            format!("{}/ip-api/{{ip}}?fields=status,country,city", server.uri()),
            ResponseShape::StatusGated,
        ),
        ProviderSpec::new(
            "API2",
            format!("{}/ipinfo/{{ip}}/json", server.uri()),
            ResponseShape::Direct,
        ),
        ProviderSpec::new(
            "API3",
            format!("{}/ipapi-co/{{ip}}/json", server.uri()),
            ResponseShape::CountryName,
        ),
    ]
}

fn resolver(providers: Vec<ProviderSpec>, timeout: Duration) -> GeoResolver {
    let config = ResolverConfig::new(providers, timeout).unwrap();
    GeoResolver::new(&config).unwrap()
}

fn located(country: &str, city: &str) -> GeoResult {
    GeoResult::new(Some(country.to_string()), Some(city.to_string()))
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_all_healthy(server: &MockServer) {
    mount_json(
        server,
        "/ip-api/203.0.113.7",
        json!({"status": "success", "country": "Germany", "city": "Berlin"}),
    )
    .await;
    mount_json(
        server,
        "/ipinfo/203.0.113.7/json",
        json!({"ip": IP, "country": "DE", "city": "Berlin", "org": "AS3320"}),
    )
    .await;
    mount_json(
        server,
        "/ipapi-co/203.0.113.7/json",
        json!({"ip": IP, "country": "DE", "country_name": "Germany", "city": "Berlin"}),
    )
    .await;
}

/// Each response shape is normalized by its own rule
#[tokio::test]
async fn test_all_providers_succeed() {
    let server = MockServer::start().await;
    mount_all_healthy(&server).await;

    let resolver = resolver(providers(&server), Duration::from_secs(1));
    let results = resolver.resolve(IP).await;

    assert_eq!(
        results,
        vec![
            located("Germany", "Berlin"),
            located("DE", "Berlin"),
            located("Germany", "Berlin"),
        ]
    );
}

/// A slow provider only blanks its own columns
#[tokio::test]
async fn test_timeout_isolated_to_one_provider() {
    let server = MockServer::start().await;

    mount_json(
        &server,
        "/ip-api/203.0.113.7",
        json!({"status": "success", "country": "Japan", "city": "Tokyo"}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/ipinfo/203.0.113.7/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"country": "JP", "city": "Tokyo"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_json(
        &server,
        "/ipapi-co/203.0.113.7/json",
        json!({"country_name": "Japan", "city": "Osaka"}),
    )
    .await;

    let resolver = resolver(providers(&server), Duration::from_millis(200));
    let outcomes = resolver.lookup(IP).await;

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(
        outcomes[1],
        ProviderOutcome::Failed(ProviderError::Timeout)
    ));

    let results: Vec<_> = outcomes.into_iter().map(ProviderOutcome::into_geo).collect();
    assert_eq!(results[0], located("Japan", "Tokyo"));
    assert_eq!(results[1], GeoResult::default());
    assert_eq!(results[2], located("Japan", "Osaka"));
}

/// Status gate rejects anything but "success"
#[tokio::test]
async fn test_status_gated_rejection() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/ip-api/203.0.113.7",
        json!({"status": "fail", "message": "private range", "country": "ignored"}),
    )
    .await;

    let resolver = resolver(providers(&server)[..1].to_vec(), Duration::from_secs(1));
    let outcomes = resolver.lookup(IP).await;

    assert!(matches!(
        &outcomes[0],
        ProviderOutcome::Failed(ProviderError::Rejected(status)) if status == "fail"
    ));
}

/// Error statuses are not gated; the body alone decides
#[tokio::test]
async fn test_rate_limited_body_without_fields_is_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ipapi-co/203.0.113.7/json"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({"error": true, "reason": "RateLimited"})),
        )
        .mount(&server)
        .await;

    let resolver = resolver(providers(&server)[2..].to_vec(), Duration::from_secs(1));
    let outcomes = resolver.lookup(IP).await;

    assert!(matches!(outcomes[0], ProviderOutcome::NoData));
}

/// Undecodable or oddly shaped bodies become empty pairs
#[tokio::test]
async fn test_bad_bodies_fail_quietly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ip-api/203.0.113.7"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
        .mount(&server)
        .await;
    mount_json(&server, "/ipinfo/203.0.113.7/json", json!(["DE", "Berlin"])).await;
    // No mock for the third provider: wiremock answers 404 with an empty body

    let resolver = resolver(providers(&server), Duration::from_secs(1));
    let outcomes = resolver.lookup(IP).await;

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(
        outcomes[0],
        ProviderOutcome::Failed(ProviderError::Decode(_))
    ));
    assert!(matches!(
        outcomes[1],
        ProviderOutcome::Failed(ProviderError::UnexpectedShape)
    ));
    assert!(outcomes[2].is_failed());
    assert!(outcomes
        .into_iter()
        .map(ProviderOutcome::into_geo)
        .all(|geo| geo.is_empty()));
}

/// Partial data is kept as-is
#[tokio::test]
async fn test_partial_fields() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/ipinfo/203.0.113.7/json",
        json!({"country": "NL", "city": null, "bogon": false}),
    )
    .await;

    let resolver = resolver(providers(&server)[1..2].to_vec(), Duration::from_secs(1));
    let results = resolver.resolve(IP).await;

    assert_eq!(results, vec![GeoResult::new(Some("NL".into()), None)]);
}

/// Result count tracks the provider count, not a fixed three
#[tokio::test]
async fn test_any_number_of_providers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"country": "BR", "city": "Recife"})),
        )
        .expect(4)
        .mount(&server)
        .await;

    let specs = (0..4)
        .map(|i| {
            ProviderSpec::new(
                format!("P{i}"),
                format!("{}/p{i}/{{ip}}", server.uri()),
                ResponseShape::Direct,
            )
        })
        .collect();
    let resolver = resolver(specs, Duration::from_secs(1));

    let results = resolver.resolve(IP).await;
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|geo| *geo == located("BR", "Recife")));
}

/// Every provider is called once per lookup, even after another fails
#[tokio::test]
async fn test_no_short_circuit_after_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ip-api/203.0.113.7"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_json(&server, "/ipinfo/203.0.113.7/json", json!({"country": "US"})).await;
    mount_json(&server, "/ipapi-co/203.0.113.7/json", json!({"city": "Austin"})).await;

    let resolver = resolver(providers(&server), Duration::from_secs(1));
    let results = resolver.resolve(IP).await;

    assert_eq!(results[0], GeoResult::default());
    assert_eq!(results[1], GeoResult::new(Some("US".into()), None));
    assert_eq!(results[2], GeoResult::new(None, Some("Austin".into())));
}
