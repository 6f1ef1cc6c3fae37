use crate::infra::{deserialize_date, AppState};
use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use condo_billing::slips::{slip_router, DateRange, SlipApi};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct BalanceQuery {
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) start: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) end: NaiveDate,
}

pub(crate) fn with_billing_routes(api: SlipApi) -> Router {
    slip_router(api)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/api/v1/ledger/accounts/:account_id/balance",
            get(balance_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn balance_endpoint(
    Extension(state): Extension<AppState>,
    Path(account_id): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> Response {
    if query.start > query.end {
        let payload = json!({
            "error": format!("range start {} is after end {}", query.start, query.end),
            "code": "invalid_range",
        });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    }

    let range = DateRange {
        start: query.start,
        end: query.end,
    };
    match state.balances.balance(&account_id, &range) {
        Ok(balance) => Json(json!({
            "account_id": account_id,
            "start": range.start,
            "end": range.end,
            "credits_cents": balance.credits_cents,
            "debits_cents": balance.debits_cents,
            "balance_cents": balance.balance_cents,
        }))
        .into_response(),
        Err(err) => {
            let payload = json!({ "error": err.to_string(), "code": "ledger_unavailable" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use condo_billing::ledger::{
        AccountBalanceProjection, InMemoryEventLog, LedgerEvent, LedgerEventKind,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, day).expect("valid date")
    }

    fn state(ready: bool, ledger: Arc<InMemoryEventLog>) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            balances: Arc::new(AccountBalanceProjection::new(ledger)),
        }
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_bound() {
        let response = readiness_endpoint(Extension(state(
            false,
            Arc::new(InMemoryEventLog::default()),
        )))
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = readiness_endpoint(Extension(state(
            true,
            Arc::new(InMemoryEventLog::default()),
        )))
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn balance_endpoint_projects_operating_account() {
        let ledger = Arc::new(InMemoryEventLog::default());
        for (kind, amount_cents, day) in [
            (LedgerEventKind::SlipPaid, 8_500, 5),
            (LedgerEventKind::SlipPaid, 10_000, 6),
            (LedgerEventKind::ExpenseRecorded, 4_000, 20),
        ] {
            ledger
                .append(LedgerEvent {
                    kind,
                    account_id: "operating".to_string(),
                    amount_cents,
                    occurred_on: date(day),
                })
                .expect("append");
        }

        let response = balance_endpoint(
            Extension(state(true, ledger)),
            Path("operating".to_string()),
            Query(BalanceQuery {
                start: date(1),
                end: date(31),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["balance_cents"], 14_500);
        assert_eq!(body["credits_cents"], 18_500);
    }

    #[tokio::test]
    async fn balance_endpoint_rejects_inverted_range() {
        let response = balance_endpoint(
            Extension(state(true, Arc::new(InMemoryEventLog::default()))),
            Path("operating".to_string()),
            Query(BalanceQuery {
                start: date(31),
                end: date(1),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "invalid_range");
    }
}
