use crate::cli::ServeArgs;
use crate::infra::{AppState, BillingData, LedgerPostingPublisher};
use crate::routes::with_billing_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use condo_billing::config::AppConfig;
use condo_billing::error::AppError;
use condo_billing::ledger::{AccountBalanceProjection, InMemoryEventLog};
use condo_billing::slips::{
    Clock, SlipApi, SlipGenerationService, SlipLifecycleService, SystemClock,
};
use condo_billing::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let data = BillingData::load(&config.billing)?;
    let ledger = Arc::new(InMemoryEventLog::default());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let events = Arc::new(LedgerPostingPublisher::new(data.slips.clone(), ledger.clone()));

    let api = SlipApi {
        generation: Arc::new(SlipGenerationService::new(
            data.stores(),
            events.clone(),
            clock.clone(),
        )),
        lifecycle: Arc::new(SlipLifecycleService::new(data.slips.clone(), events, clock)),
    };

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        balances: Arc::new(AccountBalanceProjection::new(ledger)),
    };

    let app = with_billing_routes(api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "condominium billing service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
