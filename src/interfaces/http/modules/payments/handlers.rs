//! Wallet, ledger and payment intent HTTP handlers

use axum::extract::{Path, State};

use super::dto::*;
use crate::application::AppServices;
use crate::domain::ledger::MethodType;
use crate::domain::DomainError;
use crate::interfaces::http::common::{ok, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::CurrentCaller;

#[utoipa::path(
    get,
    path = "/api/v1/wallets/{user_id}",
    tag = "Payments",
    params(("user_id" = String, Path, description = "User ID")),
    responses((status = 200, description = "Wallet (zero balance if never used)", body = ApiResponse<WalletDto>))
)]
pub async fn get_wallet(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(user_id): Path<String>,
) -> ApiResult<WalletDto> {
    caller.require_self_or_staff(&user_id)?;
    ok(services.ledger.get_wallet(&user_id).await?.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/wallets/{user_id}/top-up",
    tag = "Payments",
    params(("user_id" = String, Path, description = "User ID")),
    request_body = TopUpRequest,
    responses(
        (status = 200, description = "Wallet credited", body = ApiResponse<WalletReceiptDto>),
        (status = 400, description = "Unknown or wallet method")
    )
)]
pub async fn top_up_wallet(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(user_id): Path<String>,
    ValidatedJson(body): ValidatedJson<TopUpRequest>,
) -> ApiResult<WalletReceiptDto> {
    caller.require_self_or_staff(&user_id)?;
    let method: MethodType = body.method_type.parse()?;
    ok(services.ledger.top_up(&user_id, body.amount, method).await?.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/pay",
    tag = "Payments",
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = WalletPaymentRequest,
    responses(
        (status = 200, description = "Paid from wallet", body = ApiResponse<WalletReceiptDto>),
        (status = 409, description = "Insufficient balance or reservation closed")
    )
)]
pub async fn pay_with_wallet(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<WalletPaymentRequest>,
) -> ApiResult<WalletReceiptDto> {
    let reservation = services.reservations.get(id).await?;
    caller.require_self_or_staff(&reservation.user_id)?;
    ok(services.ledger.pay_with_wallet(id, body.amount).await?.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/{id}/ledger",
    tag = "Payments",
    params(("id" = i32, Path, description = "Reservation ID")),
    responses((status = 200, description = "Ledger entries, oldest first", body = ApiResponse<Vec<LedgerEntryDto>>))
)]
pub async fn reservation_ledger(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<i32>,
) -> ApiResult<Vec<LedgerEntryDto>> {
    let reservation = services.reservations.get(id).await?;
    caller.require_self_or_staff(&reservation.user_id)?;
    let entries = services.ledger.ledger_for_reservation(id).await?;
    ok(entries.into_iter().map(Into::into).collect())
}

/// Customers may settle their own fees from the wallet; any other method
/// is confirmed by staff.
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/succeed",
    tag = "Payments",
    params(("id" = String, Path, description = "Payment ID")),
    request_body = SettlePaymentRequest,
    responses(
        (status = 200, description = "Payment settled", body = ApiResponse<LedgerEntryDto>),
        (status = 409, description = "Payment not pending")
    )
)]
pub async fn settle_payment(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<SettlePaymentRequest>,
) -> ApiResult<LedgerEntryDto> {
    let method: MethodType = body.method_type.parse()?;
    if !caller.is_staff() {
        if method != MethodType::Wallet {
            return Err(DomainError::Forbidden(
                "Only staff can confirm external payments".to_string(),
            )
            .into());
        }
        let entry = services.ledger.find_payment(&id).await?;
        caller.require_self_or_staff(&entry.user_id)?;
    }
    ok(services.ledger.mark_payment_succeeded(&id, method).await?.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/payment-intents",
    tag = "Payments",
    request_body = CreateIntentRequest,
    responses(
        (status = 200, description = "Intent opened", body = ApiResponse<PaymentIntentDto>),
        (status = 409, description = "Reservation closed")
    )
)]
pub async fn create_intent(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    ValidatedJson(body): ValidatedJson<CreateIntentRequest>,
) -> ApiResult<PaymentIntentDto> {
    let reservation = services.reservations.get(body.reservation_id).await?;
    caller.require_self_or_staff(&reservation.user_id)?;
    ok(services.intents.create(reservation.id, body.amount).await?.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/payment-intents/{id}/confirm",
    tag = "Payments",
    params(("id" = String, Path, description = "Intent ID")),
    request_body = SettlePaymentRequest,
    responses(
        (status = 200, description = "Confirmed (or already confirmed)", body = ApiResponse<IntentConfirmationDto>),
        (status = 404, description = "Unknown intent"),
        (status = 410, description = "Intent expired")
    )
)]
pub async fn confirm_intent(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<SettlePaymentRequest>,
) -> ApiResult<IntentConfirmationDto> {
    caller.require_staff()?;
    let method: MethodType = body.method_type.parse()?;
    ok(services.intents.confirm(&id, method).await?.into())
}
