use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use eyre::{Result, eyre};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{Stdout, stdout};
use tracing::info;

use dalometer::config::{Cli, Command, Config, STATS_ERROR_MESSAGE, TICK_RATE};
use dalometer::logging;
use dalometer::ui::{Action, Dashboard};
use dalometer::{DalClient, MetricsCollector, Poller};

type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => {
            let _guard = logging::init_file_logging(&cli.log_file);
            watch(&cli.config).await
        }
        Command::Snapshot { json } => {
            logging::init_stderr_logging();
            snapshot(&cli.config, json).await
        }
        Command::Cycle { cycle } => {
            logging::init_stderr_logging();
            cycle_entry(&cli.config, &cycle).await
        }
        Command::Baker { address } => {
            logging::init_stderr_logging();
            baker(&cli.config, &address).await
        }
    }
}

async fn watch(config: &Config) -> Result<()> {
    let collector = MetricsCollector::new(config)?;
    info!(
        stats_url = %config.stats_url,
        history_url = %config.history_url,
        refresh_secs = config.refresh_interval().as_secs(),
        "starting dashboard"
    );
    let poller = Poller::spawn(collector, config.refresh_interval());

    let mut terminal = setup_terminal()?;
    let outcome = run_dashboard(&mut terminal, &poller);
    cleanup_terminal(&mut terminal)?;
    poller.shutdown().await;
    outcome
}

fn run_dashboard(terminal: &mut CrosstermTerminal, poller: &Poller) -> Result<()> {
    let mut dashboard = Dashboard::new();
    let state = poller.subscribe();

    loop {
        let metrics = state.borrow().clone();
        terminal.draw(|frame| dashboard.render(frame, &metrics))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match dashboard.handle_key(key) {
                    Some(Action::Quit) => break,
                    Some(Action::Refresh) => poller.request_refresh(),
                    Some(Action::LookupBaker(address)) => {
                        if !poller.lookup_baker(address) {
                            tracing::warn!("baker lookup queue full, request dropped");
                        }
                    }
                    None => {}
                }
            }
        }

        if dashboard.should_quit {
            break;
        }
    }
    Ok(())
}

async fn snapshot(config: &Config, json: bool) -> Result<()> {
    let client = DalClient::new(config)?;
    if json {
        let value = client
            .fetch_snapshot_json()
            .await
            .map_err(|e| eyre!("{}: {}", STATS_ERROR_MESSAGE, e))?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let stats = client
        .fetch_stats()
        .await
        .map_err(|e| eyre!("{}: {}", STATS_ERROR_MESSAGE, e))?;
    let participation = stats.participation_percentage();
    let adoption = stats.adoption_percentage();
    println!("Cycle:              {}", stats.cycle);
    println!("Updated:            {}", stats.timestamp);
    println!(
        "Active DAL bakers:  {}/{}",
        stats.dal_active_bakers, stats.total_bakers
    );
    println!("Baking power:       {:.1}%", stats.dal_baking_power_percentage);
    println!("DAL participation:  {:.1}%", participation);
    println!("DAL adoption:       {:.1}%", adoption);
    Ok(())
}

async fn cycle_entry(config: &Config, raw: &str) -> Result<()> {
    let client = DalClient::new(config)?;
    let entry = client.fetch_cycle(raw).await?;
    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

async fn baker(config: &Config, address: &str) -> Result<()> {
    let client = DalClient::new(config)?;
    match client.fetch_baker_status(address).await {
        Ok(status) => {
            let word = if status.online { "online" } else { "offline" };
            println!("Baker {} is currently {} on the DAL network.", address.trim(), word);
            if let Some(checked) = status.last_checked {
                println!("Last checked: {}", checked);
            }
            Ok(())
        }
        Err(e) if e.is_not_found() => Err(eyre!("Not found: {}", e)),
        Err(e) => Err(eyre!("Could not retrieve the DAL status: {}", e)),
    }
}

fn setup_terminal() -> Result<CrosstermTerminal> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn cleanup_terminal(terminal: &mut CrosstermTerminal) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
