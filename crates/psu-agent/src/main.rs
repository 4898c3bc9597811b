use anyhow::Result;
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::DeviceSession;
use domain::driver::TransportFactory;
use domain::event::EventPublisher;
use infrastructure::{
    BroadcastEventPublisher, CompositeEventPublisher, LoggingEventPublisher,
    SerialTransportFactory, SimulatorFactory,
};
use psu_agent::config::AgentConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputArg {
    On,
    Off,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Override serial port
    #[arg(long)]
    port: Option<String>,

    /// Override baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Use the in-process simulated supply
    #[arg(long)]
    simulate: bool,

    /// Voltage setpoint to send once connected
    #[arg(long)]
    set_voltage: Option<f64>,

    /// Current limit to send once connected
    #[arg(long)]
    set_current: Option<f64>,

    /// Switch the output once connected
    #[arg(long, value_enum)]
    output: Option<OutputArg>,

    /// Print every device event to stdout as a JSON line
    #[arg(long)]
    watch: bool,
}

async fn run() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let mut config = AgentConfig::load(&args.config_dir)?;
    if let Some(port) = args.port {
        config.serial.port = port;
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
        config.session.baud_rate = baud;
    }
    if args.simulate {
        config.simulate = true;
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_filter.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("⚡ Bench PSU Agent Starting...");
    info!(config_dir = %args.config_dir, "📂 Config directory");

    let (factory, port): (Arc<dyn TransportFactory>, String) = if config.simulate {
        info!(load_ohms = config.simulator.load_ohms, "🧪 Using simulated supply");
        (
            Arc::new(SimulatorFactory::new(&config.simulator)),
            "simulator".to_string(),
        )
    } else {
        (
            Arc::new(SerialTransportFactory::new(config.serial.clone())),
            config.serial.port.clone(),
        )
    };

    let broadcast = Arc::new(BroadcastEventPublisher::new(
        config.session.delivery_queue_capacity,
    ));
    let publisher: Arc<dyn EventPublisher> = Arc::new(CompositeEventPublisher::new(vec![
        Arc::new(LoggingEventPublisher),
        broadcast.clone(),
    ]));

    let watcher = args.watch.then(|| {
        let events = broadcast.subscribe();
        tokio::spawn(async move {
            let mut stdout = std::io::stdout();
            if let Err(e) = psu_agent::watch::stream_events(events, &mut stdout).await {
                warn!(error = %e, "Event watcher stopped");
            }
        })
    });

    let session = DeviceSession::new(config.session.clone(), factory, publisher);
    session.connect(&port).await?;

    if let Some(volts) = args.set_voltage {
        session.set_voltage(volts).await?;
    }
    if let Some(amps) = args.set_current {
        session.set_current(amps).await?;
    }
    if let Some(output) = args.output {
        session.set_output(matches!(output, OutputArg::On)).await?;
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutting down..."),
        Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
    }

    session.disconnect().await?;
    let snapshot = session.snapshot();
    info!(
        output_enabled = snapshot.output_enabled,
        set_voltage = snapshot.set_voltage,
        set_current = snapshot.set_current,
        "Last known status"
    );

    if let Some(watcher) = watcher {
        watcher.abort();
    }

    info!("👋 Good bye!");
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run()) {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}
