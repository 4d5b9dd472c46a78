//! Terminal User Interface for pluqqy
//!
//! The single-threaded event loop consumes input events, applies state
//! transitions, and renders frames. Disk-heavy tag work runs on worker
//! threads that talk back over an mpsc channel; a notify watcher on the
//! project tree refreshes the view when files change under us (the
//! external `$EDITOR` included).

pub mod app;
pub mod builder;
pub mod editor;
pub mod events;
pub mod msg; // typed worker messages (started/progress/completed)
pub mod state; // pure state transformations (functional core)
pub mod ui;
pub mod views;
pub mod widgets;

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{poll, read, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::prelude::*;

use app::{editor_command, App};
use events::handle_event;

/// Run the TUI application
pub fn run(root: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app, ensuring cleanup happens even on error
    let result = run_app_inner(&mut terminal, root);

    // Restore terminal - this MUST run even if app fails
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    result
}

fn run_app_inner<B: Backend + std::io::Write>(
    terminal: &mut Terminal<B>,
    root: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(root)?;

    // Watch the project tree so edits made outside the TUI show up.
    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                    let _ = tx.send(());
                }
            }
        },
        Config::default(),
    )?;
    watcher.watch(app.store.root(), RecursiveMode::Recursive)?;

    run_event_loop(terminal, &mut app, rx)
}

fn run_event_loop<B: Backend + std::io::Write>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    file_change_rx: mpsc::Receiver<()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        // Suspend for the external editor when one was requested.
        if let Some(file) = app.take_pending_editor_file() {
            open_file_in_editor(terminal, &file)?;
            app.set_status(format!("Edited {}", file.display()));
            app.refresh();
        }

        // Handle input with timeout
        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if poll(timeout)? {
            match read()? {
                Event::Key(key) => {
                    if handle_event(app, key) {
                        return Ok(()); // Quit signal
                    }
                }
                Event::Resize(width, height) => {
                    app.resize(width, height);
                }
                _ => {}
            }
        }

        // Worker progress and completions (non-blocking)
        app.drain_workers();

        // Coalesce file-change notifications into one refresh
        let mut changed = false;
        while file_change_rx.try_recv().is_ok() {
            changed = true;
        }
        if changed {
            app.refresh();
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }
    }
}

/// Suspend the TUI, open the file in `$EDITOR`, then resume. The editor
/// command was validated against shell metacharacters before we get
/// here, and its pieces are passed as discrete argv tokens.
fn open_file_in_editor<B: Backend + std::io::Write>(
    terminal: &mut Terminal<B>,
    file: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let tokens = editor_command()?;

    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    disable_raw_mode()?;

    let status = Command::new(&tokens[0])
        .args(&tokens[1..])
        .arg(file)
        .status();

    enable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    terminal.clear()?;

    if let Err(e) = status {
        eprintln!("Failed to open {}: {}", file.display(), e);
    }

    Ok(())
}
