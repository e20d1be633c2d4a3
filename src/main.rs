use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use fire_atlas::{
    config::AtlasConfig,
    presentation::{Pacing, PresentationEngine, TOUR},
    state::{AppState, Intent},
    ui,
};
use futures::StreamExt;
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    cell::RefCell,
    fs::OpenOptions,
    io::{self, Stdout},
    path::PathBuf,
    rc::Rc,
    time::Duration,
};
use tokio::{runtime::Builder as TokioBuilder, task::LocalSet, time::Instant};

type Tui = Terminal<CrosstermBackend<Stdout>>;

#[derive(Parser)]
#[command(author, version, about = "US wildfire atlas for the terminal")]
struct Args {
    /// Load settings from a TOML file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding boundaries and fire CSVs
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Tour speed multiplier
    #[arg(long)]
    tour_speed: Option<f64>,
    /// Start the guided tour right away
    #[arg(long, default_value_t = false)]
    autoplay: bool,
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn settings(args: &Args) -> anyhow::Result<AtlasConfig> {
    let mut config = match &args.config {
        Some(path) => AtlasConfig::load(path).with_context(|| format!("reading config {}", path.display()))?,
        None => AtlasConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(speed) = args.tour_speed {
        config.tour_speed = speed;
    }
    if let Some(log_file) = &args.log_file {
        config.log_file = log_file.clone();
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(config: &AtlasConfig) -> anyhow::Result<()> {
    // The terminal belongs to the UI, so records go to a file.
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("opening log file {}", config.log_file.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = settings(&args)?;
    init_logging(&config)?;

    let app = AppState::new(&config).context("failed to load national map data")?;
    let app = Rc::new(RefCell::new(app));
    let engine = PresentationEngine::new(TOUR, Pacing { speed: config.tour_speed });

    let runtime = TokioBuilder::new_current_thread().enable_time().build()?;
    let local = LocalSet::new();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let outcome = local.block_on(&runtime, async {
        if args.autoplay {
            engine.start(Rc::clone(&app));
        }
        run(&mut terminal, &app, &engine, config.tick()).await
    });

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = &outcome {
        error!("atlas stopped: {err:#}");
    }
    info!("bye");
    outcome
}

async fn run(terminal: &mut Tui, app: &Rc<RefCell<AppState>>, engine: &PresentationEngine, tick: Duration) -> anyhow::Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(tick);
    let mut dirty = true;
    let mut tour_state = engine.state();

    loop {
        if dirty {
            terminal.draw(|f| ui::draw(f, &mut app.borrow_mut(), engine))?;
            dirty = false;
        }

        tokio::select! {
            _ = ticker.tick() => {
                // Between events only the tour and the camera change the picture.
                let state = engine.state();
                dirty = engine.is_running() || state != tour_state || app.borrow().view.is_animating(Instant::now());
                tour_state = state;
            }
            event = events.next() => {
                dirty = true;
                match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                            engine.stop();
                            return Ok(());
                        }
                        let intent = app.borrow_mut().handle_input(key.code, engine.exploration_allowed());
                        match intent {
                            Intent::Quit => {
                                engine.stop();
                                return Ok(());
                            }
                            Intent::TogglePresentation => engine.toggle(Rc::clone(app)),
                            Intent::Continue => engine.resume(),
                            Intent::Nothing => {}
                        }
                    }
                    Some(Ok(Event::Mouse(mouse))) => {
                        app.borrow_mut().handle_mouse(mouse, engine.exploration_allowed());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err).context("reading terminal events"),
                    None => return Ok(()),
                }
            }
        }
    }
}
