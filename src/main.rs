use accel_log_node::app::node::{Node, NodeParts, Startup};
use accel_log_node::app::simulation::{self, InterruptLine};
use accel_log_node::domain::settings::SettingsService;
use accel_log_node::infrastructure::bluetooth::advertising::AdvertisingPayload;
use accel_log_node::infrastructure::bluetooth::SimulatedBleStack;
use accel_log_node::infrastructure::log_backend::BleLogBackend;
use accel_log_node::infrastructure::logging::init_logger;
use accel_log_node::infrastructure::sensor::simulator::{AccelConfig, SimulatedAccelerometer};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Fatal: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();

    let (link_tx, link_rx) = mpsc::unbounded_channel();
    let log_backend = Arc::new(BleLogBackend::new(link_tx));

    let _logging_guard = init_logger(&settings.log_settings, Some(log_backend.layer()))
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting accelerometer log node");
    info!("Settings loaded from {}", settings_service.path().display());
    match settings_service.save_if_missing() {
        Ok(true) => info!("Wrote default settings"),
        Ok(false) => {}
        Err(e) => warn!("Failed to write default settings: {}", e),
    }

    let accel = Arc::new(SimulatedAccelerometer::new(AccelConfig {
        runtime_odr: settings.simulation.accel_runtime_odr,
        odr_hz: settings.simulation.compiled_odr_hz,
        ..AccelConfig::default()
    }));
    let ble = Arc::new(SimulatedBleStack::with_log_backend(log_backend.clone()));
    let payload = AdvertisingPayload::new(&settings.device_name)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async move {
        let node = Node::new(NodeParts {
            settings: settings.clone(),
            accel: accel.clone(),
            ble: ble.clone(),
            log_backend,
            payload,
        });

        let mut running = match node.start() {
            Ok(Startup::Running(running)) => running,
            Ok(Startup::Halted(e)) => {
                warn!("Startup stopped early: {}", e);
                return Ok(ExitCode::SUCCESS);
            }
            Err(e) => {
                error!("Startup aborted: {}", e);
                return Ok(ExitCode::FAILURE);
            }
        };

        tokio::spawn(async move {
            if let Err(e) = simulation::forward_link_output(link_rx, tokio::io::stderr()).await {
                eprintln!("Log link output closed: {}", e);
            }
        });
        tokio::spawn(simulation::run_peer_sessions(
            ble,
            accel.clone(),
            settings.simulation.clone(),
        ));
        let interrupt = InterruptLine::spawn(accel)?;

        running
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
            })
            .await;

        interrupt.stop();
        Ok::<_, anyhow::Error>(ExitCode::SUCCESS)
    })
}
