use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, Result, miette};
use spellmark_core::{
    AnnotatedDocument, Effect, EditingSurface, EngineConfig, HttpSpellChecker, Language,
    ResolutionAction, SessionEvent, SpellCheckService, SpellSession,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use web_time::Instant;

mod dispatch;
mod shell;

use dispatch::CheckDispatcher;
use shell::{Command, HELP, anchor_for, render_menu};

#[derive(Parser)]
#[command(version, about = "spellmark - interactive spell-check highlighting for a text buffer", long_about = None)]
struct Cli {
    /// Text file to load into the buffer
    file: Option<PathBuf>,

    /// Path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Language key to check against (defaults to the first configured language)
    #[arg(long)]
    lang: Option<String>,

    /// Override the checking service URL
    #[arg(long, env = "SPELLMARK_ENDPOINT")]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();
    // Logs go to stderr so they never interleave with the rendered buffer.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    let language = select_language(&config, cli.lang.as_deref())?;

    let text = match &cli.file {
        Some(path) => std::fs::read_to_string(path).into_diagnostic()?,
        None => String::new(),
    };

    tracing::info!(endpoint = %config.endpoint, lang = %language.key, "starting session");
    let checker = Arc::new(HttpSpellChecker::new(config.endpoint.clone()));
    let session = SpellSession::new(language, AnnotatedDocument::from_text(&text), &config);
    run(session, checker).await
}

/// The language to mount: `key` if given, else the first configured one.
fn select_language(config: &EngineConfig, key: Option<&str>) -> Result<Language> {
    match key {
        Some(key) => config
            .language(key)
            .cloned()
            .ok_or_else(|| miette!("language `{key}` is not configured")),
        None => Ok(config.default_language()),
    }
}

async fn run<C: SpellCheckService + 'static>(
    mut session: SpellSession<AnnotatedDocument>,
    checker: Arc<C>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut dispatcher = CheckDispatcher::new(checker, tx);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", session.surface().marked_text());
    let effects = session.handle(SessionEvent::TextChanged, Instant::now());
    perform(effects, &mut dispatcher);

    loop {
        let effects = tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.into_diagnostic()? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(command, &mut session),
                    Err(e) => {
                        eprintln!("{e}");
                        continue;
                    }
                }
            }
            Some(event) = rx.recv() => session.handle(event, Instant::now()),
            _ = wait_until(session.next_deadline()) => {
                session.handle(SessionEvent::Tick, Instant::now())
            }
        };
        if redraw(&effects) {
            println!("{}", session.surface().marked_text());
        }
        perform(effects, &mut dispatcher);
    }

    tracing::debug!(pending = dispatcher.in_flight(), "shutting down");
    Ok(())
}

fn execute(command: Command, session: &mut SpellSession<AnnotatedDocument>) -> Vec<Effect> {
    let now = Instant::now();
    match command {
        Command::Show => {
            println!("{}", session.surface().marked_text());
            if let Some(menu) = session.menu() {
                println!("{}", render_menu(&menu));
            }
            Vec::new()
        }
        Command::Help => {
            println!("{HELP}");
            Vec::new()
        }
        Command::Insert { at, text } => {
            let at = at.unwrap_or_else(|| session.surface().len_chars());
            edit(session, at..at, &text, now)
        }
        Command::Delete(range) => edit(session, range, "", now),
        Command::Click(at) => {
            let anchor = anchor_for(&session.surface().plain_text(), at);
            session.click_at(at, anchor, now)
        }
        Command::Escape => session.handle(SessionEvent::Escape, now),
        Command::Accept(n) => {
            let suggestion = session
                .menu()
                .and_then(|menu| n.checked_sub(1).and_then(|i| menu.suggestions.get(i).cloned()));
            match suggestion {
                Some(suggestion) => session.handle(
                    SessionEvent::Action(ResolutionAction::AcceptSuggestion(suggestion)),
                    now,
                ),
                None => {
                    eprintln!("no suggestion {n}");
                    Vec::new()
                }
            }
        }
        Command::Ignore => session.handle(SessionEvent::Action(ResolutionAction::Ignore), now),
        Command::Dict => session.handle(
            SessionEvent::Action(ResolutionAction::AddToDictionary),
            now,
        ),
        Command::Quit => Vec::new(),
    }
}

fn edit(
    session: &mut SpellSession<AnnotatedDocument>,
    range: std::ops::Range<usize>,
    text: &str,
    now: Instant,
) -> Vec<Effect> {
    match session.edit(range, text, now) {
        Ok(effects) => {
            println!("{}", session.surface().marked_text());
            effects
        }
        Err(e) => {
            eprintln!("{e}");
            Vec::new()
        }
    }
}

/// Carry out effects that need I/O, printing menu changes as they happen.
fn perform<C: SpellCheckService + 'static>(
    effects: Vec<Effect>,
    dispatcher: &mut CheckDispatcher<C>,
) {
    for effect in effects {
        match effect {
            Effect::IssueFetch(request) => dispatcher.issue(request),
            Effect::CancelFetch(ticket) => {
                dispatcher.cancel(ticket);
            }
            Effect::MenuChanged(Some(menu)) => println!("{}", render_menu(&menu)),
            Effect::MenuChanged(None) => println!("(menu closed)"),
            Effect::Reconciled(report) => {
                for token in &report.skipped_stale {
                    tracing::debug!(%token, "flagged token not in buffer");
                }
            }
            Effect::Resolved(outcome) => tracing::debug!(?outcome, "action resolved"),
        }
    }
}

/// Whether the buffer's text or highlights changed.
fn redraw(effects: &[Effect]) -> bool {
    effects.iter().any(|e| match e {
        Effect::Reconciled(report) => !report.is_noop(),
        Effect::Resolved(outcome) => !matches!(outcome, spellmark_core::ActionOutcome::Stale),
        _ => false,
    })
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
