use crate::cli::ServeArgs;
use crate::infra::{load_store, AppState};
use crate::routes::{with_service_routes, ServiceSet};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use clinic_referrals::config::AppConfig;
use clinic_referrals::error::AppError;
use clinic_referrals::telemetry;
use clinic_referrals::workflows::commission::{CommissionService, SharedTierTable};
use clinic_referrals::workflows::intake::{ReportIntakeService, TtlDeduplicator};
use clinic_referrals::workflows::payout::PayoutService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;
    if let Some(error) = &config.commission.tiers_error {
        warn!(%error, "ignoring unreadable commission tier table");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(load_store(args.seed.as_deref())?);
    let tiers = Arc::new(SharedTierTable::new(config.commission.tiers.clone()));
    let dedup = Arc::new(TtlDeduplicator::new(config.intake.dedup_ttl()));

    let services = ServiceSet {
        commission: Arc::new(CommissionService::with_default_rate(
            store.clone(),
            tiers.clone(),
            config.commission.default_rate,
        )),
        intake: Arc::new(ReportIntakeService::new(store.clone(), dedup)),
        payout: Arc::new(PayoutService::new(store)),
        tiers,
    };

    let app = with_service_routes(services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        tiered = config.commission.tiers.is_some(),
        default_rate = config.commission.default_rate,
        "clinic referral service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
