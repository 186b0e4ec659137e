//! Command-line interface implementation

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

use crate::scheduler::{SchedulerSnapshot, SpeechEvent};

/// Command-line arguments for r-voiceline
#[derive(Parser, Debug)]
#[command(author, version, about = "Plays an agent's streamed speech one utterance at a time", long_about = None)]
pub struct Args {
    /// Session WebSocket endpoint to receive packets from
    #[arg(short, long, env = "VOICELINE_URL", conflicts_with = "packets")]
    pub url: Option<String>,

    /// File of JSON packets, one per line ("-" for stdin)
    #[arg(short, long, env = "VOICELINE_PACKETS")]
    pub packets: Option<PathBuf>,

    /// Character whose speech is played
    #[arg(long = "character", env = "VOICELINE_CHARACTER")]
    pub character_id: Option<String>,

    /// Tick cadence in milliseconds
    #[arg(long = "tick-ms", env = "VOICELINE_TICK_MS")]
    pub tick_ms: Option<u64>,

    /// Queue poll cadence in milliseconds
    #[arg(long = "poll-ms", env = "VOICELINE_POLL_MS")]
    pub poll_ms: Option<u64>,

    /// ALSA device to use
    #[arg(short = 'd', long, env = "VOICELINE_ALSA_DEVICE")]
    pub alsa_device: Option<String>,

    /// Run without an output device (events and countdown only)
    #[arg(long)]
    pub no_audio: bool,

    /// Config file path
    #[arg(short, long, env = "VOICELINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

/// Commands typed on the console while the scheduler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Cancel(String),
    Interrupt,
    Clear,
    Status,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut parts = input.split_whitespace();
        let command = parts.next().unwrap_or_default().to_lowercase();
        match (command.as_str(), parts.next()) {
            ("cancel" | "c", Some(interaction_id)) => Ok(ConsoleCommand::Cancel(interaction_id.to_string())),
            ("cancel" | "c", None) => Err("Usage: cancel <interaction-id>".to_string()),
            ("interrupt" | "i", _) => Ok(ConsoleCommand::Interrupt),
            ("clear", _) => Ok(ConsoleCommand::Clear),
            ("status" | "s", _) => Ok(ConsoleCommand::Status),
            ("quit" | "q" | "exit", _) => Ok(ConsoleCommand::Quit),
            ("", _) => Err("Empty command".to_string()),
            (other, _) => Err(format!("Unknown command: {}", other)),
        }
    }
}

/// CLI user interface for interacting with the application
pub struct Cli {
    pub args: Args,
}

impl Cli {
    /// Create a new CLI instance
    pub fn new() -> Self {
        Cli { args: Args::parse() }
    }

    /// Formats a speech event for the console; `None` for events not worth showing.
    pub fn format_event(event: &SpeechEvent) -> Option<String> {
        match event {
            SpeechEvent::BeginSpeaking { packet_id } => Some(format!("> speaking    {}", packet_id)),
            SpeechEvent::FinishedSpeaking { packet_id } => Some(format!("< finished    {}", packet_id)),
            SpeechEvent::InteractionCompleted { interaction_id } => {
                Some(format!("= interaction {} complete", interaction_id))
            }
            SpeechEvent::InteractionCanceled { interaction_id } => {
                Some(format!("x interaction {} canceled", interaction_id))
            }
            SpeechEvent::ChunkDiscarded { packet_id, reason } => Some(format!("! discarded   {} ({})", packet_id, reason)),
            _ => None,
        }
    }

    pub fn display_status(&self, snapshot: &SchedulerSnapshot) {
        println!("\nState:         {:?}", snapshot.state);
        match &snapshot.current_utterance {
            Some(id) => println!("Playing:       {} ({:.1}s left)", id, snapshot.remaining.as_secs_f64()),
            None => println!("Playing:       -"),
        }
        println!("Device busy:   {}", snapshot.device_busy);
        println!("Queued chunks: {}", snapshot.queued_chunks);
        println!("Last interaction: {}", snapshot.last_interaction_id.as_deref().unwrap_or("-"));
        if !snapshot.canceled_interactions.is_empty() {
            println!("Canceled:      {}", snapshot.canceled_interactions.join(", "));
        }
        println!();
    }

    pub fn display_help(&self) {
        println!("Commands: cancel <interaction>, interrupt, clear, status, quit");
    }

    /// Display error messages
    pub fn display_error(&self, error: &dyn Error) {
        eprintln!("Error: {}", error);
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}
