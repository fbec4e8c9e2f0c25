mod app;
mod generation;
mod ui;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event, KeyEventKind, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use slash_prompt_config::Config;
use slash_prompt_engine::{ContextLimits, EngineConfig, Generator, Platform};
use std::{
    env, fs,
    io::{Stdout, stdout},
    process,
    time::Duration,
};

use app::App;
use generation::{ConfigCredentials, OpenAiGenerator};

const TICK: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        None => {}
        Some("set-key") if args.len() == 3 => return set_key(&args[2]),
        Some(_) => {
            eprintln!("Usage: {} [set-key <API_KEY>]", args[0]);
            process::exit(1);
        }
    }

    init_logging();
    log::info!("slash-prompt starting up!");

    let config_path = Config::config_path();
    log::info!("Config path: {}", config_path.display());
    let config = match Config::load() {
        Ok(Some(config)) => config,
        Ok(None) => Config::default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    if config.resolved_api_key().is_none() {
        log::warn!("No API key configured; requests will fail until one is set");
    }

    // Terminals report Ctrl rather than Cmd, so use the non-Apple shortcut everywhere
    let engine_config = EngineConfig {
        platform: Platform::Other,
        include_context: config.capture.include_context,
        error_display: Duration::from_millis(config.capture.error_display_ms),
        context: ContextLimits::default(),
    };
    let generator = OpenAiGenerator::new(
        config.generation.clone(),
        ConfigCredentials::new(config),
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(engine_config, generator)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("{err:?}");
        println!("{err:?}");
    }

    Ok(())
}

/// Store the API key in the config file, keeping any other settings
fn set_key(key: &str) -> Result<()> {
    let mut config = Config::load()?.unwrap_or_default();
    config.api_key = Some(key.trim().to_string());
    config.save()?;
    println!("API key saved to {}", Config::config_path().display());
    Ok(())
}

/// Log to a file; the terminal belongs to the UI
fn init_logging() {
    let log_path = Config::log_path();
    if let Some(parent) = log_path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        eprintln!("Warning: cannot create {}: {e}", parent.display());
        return;
    }

    match fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
        Err(e) => eprintln!("Warning: cannot open log file {}: {e}", log_path.display()),
    }
}

fn run_app<G>(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App<G>) -> Result<()>
where
    G: Generator + Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(TICK)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
                    app.on_mouse_down(mouse.column, mouse.row)
                }
                Event::FocusLost => app.on_focus_lost(),
                _ => {}
            }
        }

        app.tick();

        if app.should_quit {
            return Ok(());
        }
    }
}
