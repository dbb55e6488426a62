use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::{appointment_routes, doctor_routes, ClinicService};
use shared_database::ClinicStore;
use shared_utils::test_utils::{days_from_today, seeded_store, FaultyStore, TestConfig};

async fn test_service(store: Arc<dyn ClinicStore>) -> Arc<ClinicService> {
    Arc::new(ClinicService::from_config(&TestConfig::default().to_app_config(), store))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_book_appointment_returns_created() {
    let service = test_service(seeded_store().await).await;
    let day = days_from_today(10);

    let (status, body) = send(
        appointment_routes(Arc::clone(&service)),
        post_json("/", json!({ "patient_id": 1, "doctor_id": 5, "appointment_date": day })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].as_i64().unwrap() > 0);
    assert_eq!(body["patient_id"], 1);
    assert_eq!(body["doctor_id"], 5);
    assert_eq!(body["appointment_date"], day.to_string());

    service.shutdown().await;
}

#[tokio::test]
async fn test_double_booking_returns_conflict_with_date() {
    let service = test_service(seeded_store().await).await;
    let day = days_from_today(10);
    service.book(1, 5, day).await.unwrap();

    let (status, body) = send(
        appointment_routes(Arc::clone(&service)),
        post_json("/", json!({ "patient_id": 2, "doctor_id": 5, "appointment_date": day })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], format!("Doctor is not available on {}!", day));

    service.shutdown().await;
}

#[tokio::test]
async fn test_booking_errors_map_to_statuses() {
    let service = test_service(seeded_store().await).await;

    let cases = [
        (json!({ "patient_id": 99, "doctor_id": 5, "appointment_date": days_from_today(1) }), StatusCode::NOT_FOUND),
        (json!({ "patient_id": 1, "doctor_id": 99, "appointment_date": days_from_today(1) }), StatusCode::NOT_FOUND),
        (json!({ "patient_id": 1, "doctor_id": 5, "appointment_date": days_from_today(-1) }), StatusCode::BAD_REQUEST),
    ];

    for (request, expected) in cases {
        let (status, body) = send(appointment_routes(Arc::clone(&service)), post_json("/", request.clone())).await;
        assert_eq!(status, expected, "request {}", request);
        assert!(body["error"].is_string());
    }

    service.shutdown().await;
}

#[tokio::test]
async fn test_cancel_routes() {
    let service = test_service(seeded_store().await).await;
    let booked = service.book(1, 5, days_from_today(6)).await.unwrap();
    let uri = format!("/{}/cancel", booked.id);

    let (status, body) = send(
        appointment_routes(Arc::clone(&service)),
        post_json(&uri, json!({ "patient_id": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only cancel your own appointments!");

    let (status, body) = send(
        appointment_routes(Arc::clone(&service)),
        post_json(&uri, json!({ "patient_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);
    assert_eq!(body["appointment_id"], booked.id);

    let (status, _) = send(
        appointment_routes(Arc::clone(&service)),
        post_json(&uri, json!({ "patient_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    service.shutdown().await;
}

#[tokio::test]
async fn test_listings_and_availability() {
    let service = test_service(seeded_store().await).await;
    let day = days_from_today(8);
    service.book(1, 5, day).await.unwrap();

    let (status, body) = send(appointment_routes(Arc::clone(&service)), get("/doctors/5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["appointments"][0]["patient_name"], "Ama Owusu");

    let (_, body) = send(appointment_routes(Arc::clone(&service)), get("/patients/1")).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["appointments"][0]["doctor_name"], "Dr. Mensah");

    let (_, body) = send(appointment_routes(Arc::clone(&service)), get("/patients/1/history")).await;
    assert_eq!(body["total"], 0);

    let uri = format!("/availability?doctor_id=5&date={}", day);
    let (status, body) = send(appointment_routes(Arc::clone(&service)), get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], false);

    let uri = format!("/availability?doctor_id=6&date={}", day);
    let (_, body) = send(appointment_routes(Arc::clone(&service)), get(&uri)).await;
    assert_eq!(body["available"], true);

    service.shutdown().await;
}

#[tokio::test]
async fn test_batch_routes() {
    let service = test_service(seeded_store().await).await;
    let day = days_from_today(2);
    service.book(2, 6, day).await.unwrap();

    let (status, body) = send(
        appointment_routes(Arc::clone(&service)),
        post_json("/batch/availability", json!({ "doctor_ids": [5, 6, 6], "date": day })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availability"]["5"], true);
    assert_eq!(body["availability"]["6"], false);
    assert_eq!(body["availability"].as_object().unwrap().len(), 2);

    let (status, body) = send(
        appointment_routes(Arc::clone(&service)),
        post_json("/batch/prefetch", json!({ "patient_ids": [1, 2] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointments"]["2"].as_array().unwrap().len(), 1);
    assert!(body["appointments"]["1"].as_array().unwrap().is_empty());

    service.shutdown().await;

    let (status, _) = send(
        appointment_routes(Arc::clone(&service)),
        post_json("/batch/prefetch", json!({ "patient_ids": [1] })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_doctor_search() {
    let service = test_service(seeded_store().await).await;

    let (status, body) = send(doctor_routes(Arc::clone(&service)), get("/?specialization=derm")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["doctors"][0]["name"], "Dr. Asante");

    let (_, body) = send(doctor_routes(Arc::clone(&service)), get("/")).await;
    assert_eq!(body["total"], 3);

    service.shutdown().await;
}

#[tokio::test]
async fn test_store_failure_hides_details() {
    let faulty = Arc::new(FaultyStore::new(seeded_store().await).failing_patient(1));
    let service = test_service(faulty).await;

    let (status, body) = send(appointment_routes(Arc::clone(&service)), get("/patients/1")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let message = body["error"].as_str().unwrap();
    assert!(!message.contains("injected"));

    service.shutdown().await;
}
