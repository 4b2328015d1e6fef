//! API router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use super::common::ApiResponse;
use super::middleware::{caller_middleware, CALLER_ID_HEADER, CALLER_ROLE_HEADER};
use super::modules::health::{self, HealthState};
use super::modules::metrics::{self, http_metrics_middleware, MetricsState};
use super::modules::{handovers, payments, pickup_tokens, reservations, vehicles};
use crate::application::AppServices;

/// Everything the handlers need; each extracts its own slice via `FromRef`
#[derive(Clone)]
pub struct ApiState {
    pub services: AppServices,
    pub health: HealthState,
    pub metrics: MetricsState,
}

impl ApiState {
    pub fn new(
        services: AppServices,
        db: DatabaseConnection,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            services,
            health: HealthState {
                db,
                started_at: Arc::new(Instant::now()),
            },
            metrics: MetricsState {
                handle: metrics_handle,
            },
        }
    }
}

impl FromRef<ApiState> for AppServices {
    fn from_ref(s: &ApiState) -> Self {
        s.services.clone()
    }
}

impl FromRef<ApiState> for HealthState {
    fn from_ref(s: &ApiState) -> Self {
        s.health.clone()
    }
}

impl FromRef<ApiState> for MetricsState {
    fn from_ref(s: &ApiState) -> Self {
        s.metrics.clone()
    }
}

/// Gateway identity headers, documented as API-key style schemes
struct CallerHeaders;

impl Modify for CallerHeaders {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "caller_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(CALLER_ID_HEADER))),
            );
            components.add_security_scheme(
                "caller_role",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(CALLER_ROLE_HEADER))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        // Reservations
        reservations::create_reservation,
        reservations::get_reservation,
        reservations::list_user_reservations,
        reservations::cancel_reservation,
        reservations::retry_refund,
        // Pickup
        pickup_tokens::generate_token,
        pickup_tokens::redeem_token,
        // Handovers
        handovers::create_handover,
        handovers::get_handover,
        handovers::list_rental_handovers,
        // Vehicles
        vehicles::register_vehicle,
        vehicles::get_vehicle,
        vehicles::vehicle_history,
        vehicles::set_vehicle_status,
        // Payments
        payments::get_wallet,
        payments::top_up_wallet,
        payments::pay_with_wallet,
        payments::reservation_ledger,
        payments::settle_payment,
        payments::create_intent,
        payments::confirm_intent,
    ),
    components(
        schemas(
            ApiResponse<String>,
            health::HealthResponse,
            health::ComponentHealth,
            reservations::CreateReservationRequest,
            reservations::CreateReservationResponse,
            reservations::ReservationDto,
            reservations::CancelReservationRequest,
            reservations::CancelReservationResponse,
            reservations::RefundResponse,
            pickup_tokens::GenerateTokenRequest,
            pickup_tokens::PickupTokenResponse,
            pickup_tokens::RedeemTokenRequest,
            pickup_tokens::RedeemTokenResponse,
            handovers::CreateHandoverRequest,
            handovers::CreateHandoverResponse,
            handovers::HandoverDto,
            handovers::DamageDto,
            handovers::FeesDto,
            vehicles::RegisterVehicleRequest,
            vehicles::SetVehicleStatusRequest,
            vehicles::VehicleDto,
            vehicles::StatusChangeDto,
            payments::WalletDto,
            payments::LedgerEntryDto,
            payments::WalletReceiptDto,
            payments::TopUpRequest,
            payments::WalletPaymentRequest,
            payments::SettlePaymentRequest,
            payments::CreateIntentRequest,
            payments::PaymentIntentDto,
            payments::IntentConfirmationDto,
        )
    ),
    modifiers(&CallerHeaders),
    security(("caller_id" = [], "caller_role" = [])),
    tags(
        (name = "Health", description = "Liveness and database reachability"),
        (name = "Reservations", description = "Booking, cancellation and refunds"),
        (name = "Pickup", description = "Single-use pickup tokens"),
        (name = "Handovers", description = "Pickup, return and quality-check inspections"),
        (name = "Vehicles", description = "Vehicle status and audit trail"),
        (name = "Payments", description = "Wallets, ledger entries and payment intents"),
    ),
    info(
        title = "EV Rental Service API",
        version = "1.0.0",
        description = "Reservation, pickup, handover and ledger operations for EV rentals",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        // Reservations
        .route("/reservations", post(reservations::create_reservation))
        .route("/reservations/{id}", get(reservations::get_reservation))
        .route("/reservations/{id}/cancel", post(reservations::cancel_reservation))
        .route("/reservations/{id}/refund", post(reservations::retry_refund))
        .route("/reservations/{id}/pay", post(payments::pay_with_wallet))
        .route("/reservations/{id}/ledger", get(payments::reservation_ledger))
        .route("/users/{user_id}/reservations", get(reservations::list_user_reservations))
        // Pickup
        .route("/pickup-tokens", post(pickup_tokens::generate_token))
        .route("/pickup-tokens/redeem", post(pickup_tokens::redeem_token))
        // Handovers
        .route("/handovers", post(handovers::create_handover))
        .route("/handovers/{id}", get(handovers::get_handover))
        .route("/rentals/{id}/handovers", get(handovers::list_rental_handovers))
        // Vehicles
        .route("/vehicles", post(vehicles::register_vehicle))
        .route("/vehicles/{id}", get(vehicles::get_vehicle))
        .route("/vehicles/{id}/history", get(vehicles::vehicle_history))
        .route("/vehicles/{id}/status", put(vehicles::set_vehicle_status))
        // Payments
        .route("/wallets/{user_id}", get(payments::get_wallet))
        .route("/wallets/{user_id}/top-up", post(payments::top_up_wallet))
        .route("/payments/{id}/succeed", post(payments::settle_payment))
        .route("/payment-intents", post(payments::create_intent))
        .route("/payment-intents/{id}/confirm", post(payments::confirm_intent))
        .layer(middleware::from_fn(caller_middleware));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(http_metrics_middleware))
        .with_state(state)
        .merge(swagger_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::test_support::TestEnv;

    struct Api {
        router: Router,
    }

    impl Api {
        async fn new(env: &TestEnv) -> Self {
            let state = ApiState::new(env.services.clone(), env.db.clone(), None);
            Self {
                router: create_api_router(state),
            }
        }

        async fn call(
            &self,
            method: &str,
            uri: &str,
            caller: Option<(&str, &str)>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some((id, role)) = caller {
                builder = builder
                    .header(CALLER_ID_HEADER, id)
                    .header(CALLER_ROLE_HEADER, role);
            }
            let request = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, json)
        }
    }

    const ADMIN: Option<(&str, &str)> = Some(("admin-1", "admin"));
    const STAFF: Option<(&str, &str)> = Some(("staff-1", "staff"));
    const CUSTOMER: Option<(&str, &str)> = Some(("cust-1", "customer"));

    async fn register_vehicle(api: &Api) -> i64 {
        let (status, body) = api
            .call(
                "POST",
                "/api/v1/vehicles",
                ADMIN,
                Some(json!({"stationId": TestEnv::STATION_ID, "model": "EQ-3", "batteryLevel": 95})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }

    fn booking(vehicle_id: i64) -> Value {
        let start = chrono::Utc::now() + chrono::Duration::hours(1);
        json!({
            "vehicleId": vehicle_id,
            "stationId": TestEnv::STATION_ID,
            "startTime": start,
            "endTime": start + chrono::Duration::hours(4),
        })
    }

    #[tokio::test]
    async fn missing_caller_is_401() {
        let env = TestEnv::new().await;
        let api = Api::new(&env).await;

        let (status, body) = api.call("GET", "/api/v1/vehicles/1", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = api
            .call("GET", "/api/v1/vehicles/1", Some(("x", "superuser")), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_is_public() {
        let env = TestEnv::new().await;
        let api = Api::new(&env).await;
        let (status, body) = api.call("GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"]["status"], "ok");
    }

    #[tokio::test]
    async fn booking_pickup_and_damaged_return_over_http() {
        let env = TestEnv::new().await;
        let api = Api::new(&env).await;
        let vehicle_id = register_vehicle(&api).await;
        let other_vehicle = register_vehicle(&api).await;

        let (status, body) = api
            .call("POST", "/api/v1/reservations", CUSTOMER, Some(booking(vehicle_id)))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["status"], "pending");
        let reservation_id = body["data"]["reservationId"].as_i64().unwrap();

        let (status, body) = api
            .call("POST", "/api/v1/reservations", CUSTOMER, Some(booking(other_vehicle)))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert!(body["message"].is_string());

        let (status, body) = api
            .call(
                "POST",
                "/api/v1/pickup-tokens",
                CUSTOMER,
                Some(json!({"reservationId": reservation_id})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let payload = body["data"]["payload"].as_str().unwrap().to_string();

        let redeem = json!({"payload": payload});
        let (status, _) = api
            .call("POST", "/api/v1/pickup-tokens/redeem", CUSTOMER, Some(redeem.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = api
            .call("POST", "/api/v1/pickup-tokens/redeem", STAFF, Some(redeem.clone()))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["reservation"]["status"], "confirmed");
        assert_eq!(body["data"]["replayed"], false);

        let (_, body) = api
            .call("POST", "/api/v1/pickup-tokens/redeem", STAFF, Some(redeem))
            .await;
        assert_eq!(body["data"]["replayed"], true);

        let (status, body) = api
            .call(
                "POST",
                "/api/v1/handovers",
                STAFF,
                Some(json!({
                    "reservationId": reservation_id,
                    "type": "return",
                    "damageFee": 50000,
                    "lateFee": 0,
                    "vehicleStatus": "available",
                    "damages": [{"part": "bumper", "cost": 50000}],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["vehicleStatus"], "awaiting_processing");
        assert_eq!(body["data"]["fees"]["totalDue"], 50000);
        assert_eq!(body["data"]["feesCreated"], json!(["damage_fee"]));

        let (_, body) = api
            .call("GET", &format!("/api/v1/vehicles/{}", vehicle_id), CUSTOMER, None)
            .await;
        assert_eq!(body["data"]["status"], "awaiting_processing");
    }

    #[tokio::test]
    async fn cancel_reports_refund() {
        let env = TestEnv::new().await;
        let api = Api::new(&env).await;
        let vehicle_id = register_vehicle(&api).await;

        let (_, body) = api
            .call("POST", "/api/v1/reservations", CUSTOMER, Some(booking(vehicle_id)))
            .await;
        let reservation_id = body["data"]["reservationId"].as_i64().unwrap();

        let (status, _) = api
            .call(
                "POST",
                "/api/v1/wallets/cust-1/top-up",
                CUSTOMER,
                Some(json!({"amount": 150000, "methodType": "card"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = api
            .call(
                "POST",
                &format!("/api/v1/reservations/{}/pay", reservation_id),
                CUSTOMER,
                Some(json!({"amount": 150000})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = api
            .call(
                "POST",
                &format!("/api/v1/reservations/{}/cancel", reservation_id),
                STAFF,
                Some(json!({"reason": "vehicle fault", "cancelledBy": "staff-9"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["success"], true);
        assert_eq!(body["data"]["refundAmount"], 150000);
        assert_eq!(body["data"]["newBalance"], 150000);
        assert_eq!(body["data"]["reservation"]["cancelledBy"], "staff-9");

        let (_, body) = api.call("GET", "/api/v1/wallets/cust-1", CUSTOMER, None).await;
        assert_eq!(body["data"]["balance"], 150000);

        let (status, _) = api.call("GET", "/api/v1/wallets/cust-1", Some(("cust-2", "customer")), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn bad_input_maps_to_400_and_422() {
        let env = TestEnv::new().await;
        let api = Api::new(&env).await;
        let vehicle_id = register_vehicle(&api).await;

        let (status, _) = api
            .call(
                "POST",
                "/api/v1/handovers",
                STAFF,
                Some(json!({"vehicleId": vehicle_id, "type": "inspection"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = api
            .call(
                "PUT",
                &format!("/api/v1/vehicles/{}/status", vehicle_id),
                STAFF,
                Some(json!({"status": "parked", "reason": "lot B"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = api
            .call(
                "POST",
                "/api/v1/vehicles",
                ADMIN,
                Some(json!({"stationId": 1, "model": "", "batteryLevel": 150})),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn expired_intent_is_410() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let api = Api::new(&env).await;

        let (status, body) = api
            .call(
                "POST",
                "/api/v1/payment-intents",
                CUSTOMER,
                Some(json!({"reservationId": reservation.id, "amount": 30000})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let intent_id = body["data"]["id"].as_str().unwrap().to_string();

        env.services
            .intents
            .sweep(chrono::Utc::now() + chrono::Duration::days(1))
            .await
            .unwrap();

        let (status, _) = api
            .call(
                "POST",
                &format!("/api/v1/payment-intents/{}/confirm", intent_id),
                STAFF,
                Some(json!({"methodType": "card"})),
            )
            .await;
        assert_eq!(status, StatusCode::GONE);
    }
}
