use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info};

use stephub::config::{AppConfig, ConfigManager};
use stephub::logger;
use stephub::mqtt::run_mqtt_client;
use stephub::replay::replay_file;
use stephub::{SensorManager, StepApp};

#[derive(Parser)]
#[command(author, version, about = "Step counting from accelerometer streams", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count steps from the MQTT sensor feed
    Run {
        /// Stop after this many seconds
        #[arg(short, long)]
        duration_secs: Option<u64>,
    },
    /// Count steps from a recorded JSON-lines file
    Replay {
        file: PathBuf,
    },
    /// Write the default configuration to a file
    InitConfig {
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_file(path)?,
        None => ConfigManager::new(),
    };
    let config = manager.get_config().clone();

    logger::init_logger(&config.logging.level);
    info!("Application starting");
    if let Some(path) = manager.config_path() {
        info!("Loaded configuration from {}", path.display());
    }

    match cli.command {
        Commands::Run { duration_secs } => run_live(config, duration_secs),
        Commands::Replay { file } => run_replay(config, file),
        Commands::InitConfig { path } => {
            AppConfig::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}

fn run_live(config: AppConfig, duration_secs: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let sensors = Arc::new(SensorManager::from_config(&config.sensors));
    let shutdown_signal = Arc::new(AtomicBool::new(false));

    let mut app = StepApp::new(config.clone(), Arc::clone(&sensors));
    if !app.start() {
        return Err("no step detector could be registered".into());
    }

    let mqtt_sensors = Arc::clone(&sensors);
    let mqtt_shutdown = Arc::clone(&shutdown_signal);
    let mqtt_config = config.mqtt.clone();
    let mqtt_handle = thread::spawn(move || {
        match run_mqtt_client(&mqtt_config, mqtt_sensors, Arc::clone(&mqtt_shutdown)) {
            Ok(stats) => info!(
                "MQTT feed finished: {} samples, {} step events, {} invalid payloads",
                stats.accelerometer_events, stats.step_events, stats.invalid_payloads
            ),
            Err(e) => error!("MQTT thread failed: {}", e),
        }
        // 数据源结束后通知主循环退出
        mqtt_shutdown.store(true, Ordering::Relaxed);
    });

    if let Some(secs) = duration_secs {
        let timer_shutdown = Arc::clone(&shutdown_signal);
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            info!("Run duration elapsed, shutting down");
            timer_shutdown.store(true, Ordering::Relaxed);
        });
    }

    let tally = app.run(&shutdown_signal);
    app.stop();

    if mqtt_handle.join().is_err() {
        error!("MQTT thread panicked");
    } else {
        info!("MQTT thread shut down gracefully");
    }

    println!(
        "accelerometer steps: {}, step sensor steps: {}",
        tally.accelerometer_steps, tally.step_sensor_steps
    );
    Ok(())
}

fn run_replay(config: AppConfig, file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let sensors = Arc::new(SensorManager::from_config(&config.sensors));
    let shutdown_signal = Arc::new(AtomicBool::new(false));

    let mut app = StepApp::new(config, Arc::clone(&sensors));
    if !app.start() {
        return Err("no step detector could be registered".into());
    }

    let feeder_sensors = Arc::clone(&sensors);
    let feeder_shutdown = Arc::clone(&shutdown_signal);
    let feeder = thread::spawn(move || {
        let result = replay_file(&file, &feeder_sensors);
        feeder_shutdown.store(true, Ordering::Relaxed);
        result
    });

    let tally = app.run(&shutdown_signal);
    app.stop();

    match feeder.join() {
        Ok(Ok(summary)) => info!(
            "Replay finished: {} samples, {} step events, {} skipped lines",
            summary.samples, summary.step_events, summary.skipped_lines
        ),
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err("replay thread panicked".into()),
    }

    println!(
        "accelerometer steps: {}, step sensor steps: {}",
        tally.accelerometer_steps, tally.step_sensor_steps
    );
    Ok(())
}
