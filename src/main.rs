//! Console front end: typed lines stand in for speech.
//!
//! With `--wake`, lines go to the wake listener until the wake phrase is
//! typed; the next line is captured as the command. Without it, each line
//! is interpreted directly. `:mic` simulates the microphone button,
//! `:wake` toggles wake detection, `:quit` exits.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use literal::command::{ActionRunner, BrowserOpener, DryRunOpener};
use literal::speech::{ConsoleRecognizer, ConsoleSynthesizer, ExclusiveRecognizer};
use literal::{Assistant, AssistantConfig, Control, Providers};

#[derive(Parser, Debug)]
#[command(name = "literal", version, about = "Wake-phrase voice assistant (console mode)")]
struct Args {
    /// JSON config file; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Require the wake phrase before each command
    #[arg(short, long)]
    wake: bool,

    /// Log URLs instead of opening them
    #[arg(long)]
    dry_run: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    literal::init_tracing(args.log_json);

    if let Err(e) = run(args).await {
        error!(error = %e, "literal exited with error");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> literal::Result<()> {
    let config = AssistantConfig::load_or_default(args.config.as_deref());
    info!(name = %config.assistant_name, wake = args.wake, dry_run = args.dry_run, "literal starting");

    let console = ConsoleRecognizer::new();
    let actions: Arc<dyn ActionRunner> = if args.dry_run {
        Arc::new(DryRunOpener)
    } else {
        Arc::new(BrowserOpener)
    };
    let providers = Providers {
        recognizer: Arc::new(ExclusiveRecognizer::new(console.clone())),
        synthesizer: Arc::new(ConsoleSynthesizer::new(config.assistant_name.clone())),
        actions,
    };

    if args.wake {
        println!("Say \"{}\" to wake me. :mic, :wake, :quit", config.wake.phrases.join("\" or \""));
    } else {
        println!("Type a command. :mic, :wake, :quit");
    }

    let mut assistant = Assistant::spawn(config, providers, args.wake).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = assistant.closed() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                match line {
                    "" => {}
                    ":quit" | ":q" => break,
                    ":mic" => assistant.send(Control::Activate)?,
                    ":wake" => assistant.send(Control::ToggleWake)?,
                    text => {
                        // Lines go to whichever session is listening; with
                        // none open they are typed commands.
                        if !console.feed(text) {
                            assistant.submit(text)?;
                        }
                    }
                }
            }
        }
    }

    assistant.shutdown().await;
    info!("literal stopped");
    Ok(())
}
