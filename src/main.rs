use std::{
    io::{self, IsTerminal as _, Read as _},
    process,
};

use clap::Parser as _;
use gardenguide::{
    advice::Advisor,
    cli::{Args, Command},
    config::{ConfigError, ConfigManager},
    repl::{self, ReplError, Session},
    services::{dummy::DummyService, gemini::GeminiService},
    topic::KeywordTable,
    ui::{self, Printer},
    CompletionService,
};
use rustyline::{error::ReadlineError, DefaultEditor};
use thiserror::Error;
use tokio::signal;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum AppError {
    #[error("Input/output error: {0}.")]
    Io(#[from] io::Error),
    #[error("{0}.")]
    Readline(#[from] ReadlineError),
    #[error("{0}")]
    Repl(#[from] ReplError),
    #[error("{0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy)]
enum Backend {
    Gemini,
    Dummy,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);
    debug!(?args, "parsed arguments");

    if let Err(err) = run(args).await {
        debug!(?err, "gardenguide failed");
        if let Err(print_err) = ui::print_error_message(&err.to_string()) {
            eprintln!("Error printing message: {print_err}");
        }
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .compact()
        .init();
}

async fn run(args: Args) -> Result<(), AppError> {
    let manager = match args.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };

    let color = !args.no_color && io::stdout().is_terminal();

    if matches!(args.command, Some(Command::Init)) {
        let mut printer = Printer::new(io::stdout(), false);
        if manager.init_default_config()? {
            printer.print_app_message(&format!(
                "Configuration initialized at: {:?}",
                manager.config_path
            ))?;
        } else {
            printer.print_app_message(&format!(
                "Configuration already exists at: {:?}",
                manager.config_path
            ))?;
        }
        return Ok(());
    }

    // Loaded after `init` so a broken file can still be replaced.
    dotenv::dotenv().ok();
    let config = manager.load()?;
    let color = color && config.color;
    let printer = Printer::new(io::stdout(), color);

    let (backend, model, question) = match args.command {
        Some(Command::Gemini { model, question }) => {
            (Backend::Gemini, model, question)
        }
        Some(Command::Dummy { question }) => (Backend::Dummy, None, question),
        _ => (Backend::Gemini, None, None),
    };

    let service: Box<dyn CompletionService> = match backend {
        Backend::Gemini => Box::new(GeminiService::from_env(
            config.api_key.clone(),
            Some(config.base_url.clone()),
        )),
        Backend::Dummy => Box::new(DummyService::new()),
    };

    let advisor = Advisor::new(
        service,
        KeywordTable::default(),
        Some(model.unwrap_or(config.model)),
    );
    info!(
        service = advisor.service_name(),
        model = advisor.model(),
        "starting"
    );
    tokio::spawn(farewell_on_interrupt(color));

    match question {
        Some(question) => answer_question(&advisor, printer, question).await,
        None => {
            let mut session =
                Session::new(DefaultEditor::new()?, printer, advisor);
            session.run().await?;
            Ok(())
        }
    }
}

// The main thread may be blocked in the line editor, so the signal is
// awaited on a worker thread and the process ends from there.
async fn farewell_on_interrupt(color: bool) {
    if let Err(err) = signal::ctrl_c().await {
        debug!(%err, "cannot listen for interrupts");
        return;
    }

    info!("interrupted");
    if let Err(err) = Printer::new(io::stdout(), color).print_interrupted_farewell() {
        eprintln!("Error printing message: {err}");
    }
    process::exit(0);
}

async fn answer_question<W: io::Write>(
    advisor: &Advisor,
    mut printer: Printer<W>,
    question: String,
) -> Result<(), AppError> {
    let question = if question == "-" {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        input.trim_end().to_owned()
    } else {
        question
    };

    repl::ask_once(advisor, &mut printer, &question).await?;
    Ok(())
}
