use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{
    intake_config_from_env, seed_directory, AppState, InMemoryIntakeStore, InMemoryRoomRepository,
    LoggingNotifier,
};
use crate::routes::with_intake_routes;
use grantflow::config::AppConfig;
use grantflow::error::AppError;
use grantflow::telemetry;
use grantflow::workflows::intake::IntakeService;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryIntakeStore::default());
    let rooms = Arc::new(InMemoryRoomRepository::default());
    let directory = Arc::new(seed_directory());
    let notifier = Arc::new(LoggingNotifier::default());
    let intake_service = Arc::new(IntakeService::new(
        store,
        rooms,
        directory,
        notifier,
        intake_config_from_env(&config.intake),
    ));

    let app = with_intake_routes(intake_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "grant intake engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
