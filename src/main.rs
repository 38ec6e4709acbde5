use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{info, warn};

use seker::audio;
use seker::config::{Cli, init_logging};
use seker::generate::CommandGenerator;
use seker::middle::Middle;
use seker::pipeline::persistence;
use seker::pipeline::store::SessionStore;
use seker::shared::InputEvent;
use seker::tui;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;

    let store = match cli.session.as_deref() {
        Some(link) => match persistence::session_from_link(link) {
            Some(session) => {
                info!(lanes = session.lanes.len(), "session restored from link");
                SessionStore::with_session(session)
            }
            None => {
                warn!("could not read the session link, starting empty");
                SessionStore::new()
            }
        },
        None => SessionStore::new(),
    };
    let playback = audio::start_playback(&cli.program_file, cli.engine_config(), cli.debounce());
    let generator = Arc::new(CommandGenerator::new(cli.generator.clone(), cli.generator_args.clone()));
    let mut middle = Middle::new(store, playback, generator, cli.base_url.clone());
    if let Some(path) = cli.share_file.clone() {
        middle = middle.with_share_file(path);
    }

    terminal::enable_raw_mode().context("failed to enter raw mode")?;
    let guard = RawModeGuard; // restores the terminal however we leave
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = Duration::from_millis(16); // ~60fps
    let blink_start = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    'run: loop {
        let blink_on = (blink_start.elapsed().as_millis() / 250) % 2 == 0;
        let ds = middle.display_state();
        tui_state.clamp_selection(ds.lanes.len());

        term.draw(|frame| {
            let area = frame.area();
            tui::view::render(frame, area, &ds, &tui_state, blink_on);
        })?;

        let events = tui::input::poll_input(tick_rate, &mut tui_state, &ds)?;
        for event in events {
            if event == InputEvent::Quit {
                break 'run;
            }
            middle.handle_input(event, Instant::now());
        }
        middle.tick(Instant::now());
    }

    middle.shutdown();
    term.clear()?;
    drop(term);
    drop(guard);
    println!("{}", middle.share_url());
    Ok(())
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
