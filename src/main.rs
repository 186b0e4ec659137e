use r_voiceline::audio::{AlsaDevice, SilentDevice, SymphoniaClipDecoder};
use r_voiceline::config::Settings;
use r_voiceline::init_app_dirs;
use r_voiceline::scheduler::{spawn_scheduler, ChunkIngress, PlaybackScheduler, SpeechEvent};
use r_voiceline::session::{self, run_packet_pump, JsonLinesSource, PacketRouter, PacketSource};
use r_voiceline::ui::{Cli, ConsoleCommand};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn init_tracing(default_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::new();
    let args = &cli.args;

    init_app_dirs()?;

    // Load configuration from file or create default
    let config_path = args.config.clone().unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load(&config_path)?;

    // Command-line arguments (and their env fallbacks) override the file
    if let Some(character_id) = &args.character_id {
        settings.character_id = character_id.clone();
    }
    if let Some(tick_ms) = args.tick_ms {
        settings.tick_period_ms = tick_ms;
    }
    if let Some(poll_ms) = args.poll_ms {
        settings.poll_period_ms = poll_ms;
    }
    if let Some(alsa_device) = &args.alsa_device {
        settings.alsa_device = alsa_device.clone();
    }
    settings.validate()?;

    init_tracing(&settings.log_level, args.log_json);
    info!(config = %config_path.display(), character_id = %settings.character_id, "Starting r-voiceline.");

    // --- Scheduler ---
    let ingress = Arc::new(match settings.queue_capacity {
        Some(capacity) => ChunkIngress::with_capacity(capacity, settings.backpressure),
        None => ChunkIngress::new(),
    });
    let (event_tx, _) = broadcast::channel::<SpeechEvent>(settings.event_capacity);
    let mut scheduler = PlaybackScheduler::new(settings.character_id.clone(), ingress, Arc::new(event_tx.clone()))
        .with_decoder(Box::new(SymphoniaClipDecoder::new()))
        .with_poll_period(settings.poll_period());
    scheduler = if args.no_audio {
        scheduler.with_device(Box::new(SilentDevice::new()))
    } else {
        scheduler.with_device(Box::new(AlsaDevice::new(&settings.alsa_device)))
    };

    // Subscribe before anything can emit
    let mut display_rx = event_tx.subscribe();
    let display_task = tokio::spawn(async move {
        loop {
            match display_rx.recv().await {
                Ok(event) => {
                    if let Some(line) = Cli::format_event(&event) {
                        println!("{}", line);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => warn!("Display lagged, {} events missed.", missed),
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let (handle, scheduler_task) = spawn_scheduler(scheduler, settings.tick_period(), settings.command_buffer_size);

    // --- Packet source ---
    let mut console_enabled = true;
    let mut source: Box<dyn PacketSource> = if let Some(url) = &args.url {
        let (source, forwarder) = session::websocket::connect(url, &settings.character_id, Uuid::new_v4()).await?;
        tokio::spawn(forwarder.run(event_tx.subscribe()));
        Box::new(source)
    } else if let Some(path) = &args.packets {
        if path == Path::new("-") {
            // stdin carries packets, so it cannot also carry console commands
            console_enabled = false;
            Box::new(JsonLinesSource::new(BufReader::new(tokio::io::stdin())))
        } else {
            Box::new(JsonLinesSource::open(path).await?)
        }
    } else {
        return Err("No packet source: pass --url or --packets".into());
    };

    let router = PacketRouter::new(settings.character_id.clone(), handle.clone());
    let pump_task = tokio::spawn(async move {
        match run_packet_pump(source.as_mut(), &router).await {
            Ok(stats) => info!("Packet source finished: {:?}", stats),
            Err(e) => error!("Packet source failed: {}", e),
        }
    });

    // --- Console ---
    if console_enabled {
        cli.display_help();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else { break };
            let command = match ConsoleCommand::parse(&line) {
                Ok(command) => command,
                Err(message) => {
                    eprintln!("{}", message);
                    cli.display_help();
                    continue;
                }
            };
            let result = match command {
                ConsoleCommand::Cancel(interaction_id) => handle.cancel(interaction_id).await,
                ConsoleCommand::Interrupt => handle.interrupt().await,
                ConsoleCommand::Clear => handle.clear().await,
                ConsoleCommand::Status => handle.snapshot().await.map(|snapshot| cli.display_status(&snapshot)),
                ConsoleCommand::Quit => break,
            };
            if let Err(e) = result {
                cli.display_error(&e);
                break;
            }
        }
    } else {
        tokio::signal::ctrl_c().await?;
    }

    info!("Shutting down.");
    pump_task.abort();
    handle.shutdown().await?;
    scheduler_task.await?;
    drop(event_tx);
    let _ = display_task.await;
    Ok(())
}
