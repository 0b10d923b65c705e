//! Guest dashboard - attendance view for the event admin
//!
//! Fetches the guest list from the check-in API and displays:
//! - Attendance summary (total, arrived, pending)
//! - Guest table, filtered by status and sorted by serial number
//!
//! Keys: `f` filter, `s` sort direction, `r` refresh, `e` export report,
//! arrows/PgUp/PgDn scroll, `q` quit.

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use guest_kiosk::domain::guests::{AttendanceSummary, GuestQuery};
use guest_kiosk::domain::types::{GuestRecord, GuestStatus};
use guest_kiosk::infra::config::DEFAULT_CONFIG_PATH;
use guest_kiosk::infra::{logging, Config};
use guest_kiosk::io::{AttendanceReport, GuestDirectory, HttpGuestDirectory};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Row, Table},
    Frame, Terminal,
};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tracing::{info, warn};

const AUTO_REFRESH: Duration = Duration::from_secs(10);
const PAGE_SCROLL: usize = 10;
const REFRESHING: &str = "Refreshing...";

/// Guest attendance dashboard
#[derive(Parser, Debug)]
#[command(name = "guest-dashboard", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Admin username (prompted when omitted)
    #[arg(short, long)]
    username: Option<String>,

    /// Admin password (prompted when omitted)
    #[arg(short, long)]
    password: Option<String>,

    /// Dashboard log file
    #[arg(long, default_value = "guest-dashboard.log")]
    log_file: String,
}

struct DashboardState {
    guests: Vec<GuestRecord>,
    query: GuestQuery,
    scroll: usize,
    last_fetch: Option<Instant>,
    fetch_error: Option<String>,
    /// Last export or refresh outcome shown in the footer
    status_line: Option<String>,
}

impl DashboardState {
    fn new() -> Self {
        Self {
            guests: Vec::new(),
            query: GuestQuery::default(),
            scroll: 0,
            last_fetch: None,
            fetch_error: None,
            status_line: None,
        }
    }

    fn visible_len(&self) -> usize {
        self.query.apply(&self.guests).len()
    }

    fn scroll_by(&mut self, delta: isize) {
        let max = self.visible_len().saturating_sub(1);
        let next = self.scroll as isize + delta;
        self.scroll = next.clamp(0, max as isize) as usize;
    }
}

type SharedState = Arc<Mutex<DashboardState>>;

fn prompt(label: &str) -> io::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_file(Path::new(&args.log_file))?;
    info!(git_hash = %env!("GIT_HASH"), "guest-dashboard starting");

    let config = Config::load_from_path(&args.config);

    let Some(admin) = config.admin() else {
        anyhow::bail!("no [admin] credentials configured in {}", config.config_file());
    };
    let username = match args.username {
        Some(u) => u,
        None => prompt("Username")?,
    };
    let password = match args.password {
        Some(p) => p,
        None => prompt("Password")?,
    };
    if !admin.matches(&username, &password) {
        warn!(username = %username, "dashboard_login_rejected");
        anyhow::bail!("invalid username or password");
    }
    info!(username = %username, directory_url = %config.directory_url(), "dashboard_login_accepted");

    let directory: Arc<dyn GuestDirectory> =
        Arc::new(HttpGuestDirectory::new(config.directory_url(), config.directory_timeout())?);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let state = Arc::new(Mutex::new(DashboardState::new()));
    let refresh = Arc::new(Notify::new());

    let fetch_state = state.clone();
    let fetch_refresh = refresh.clone();
    let fetch_handle = tokio::spawn(async move {
        run_fetcher(directory, fetch_state, fetch_refresh).await;
    });

    let result = run_ui(&mut terminal, state, refresh, &config).await;

    fetch_handle.abort();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("guest-dashboard exiting");
    result
}

/// Fetch on start, on request and every `AUTO_REFRESH`
async fn run_fetcher(directory: Arc<dyn GuestDirectory>, state: SharedState, refresh: Arc<Notify>) {
    loop {
        let result = directory.fetch_guests().await;
        {
            let mut s = state.lock().await;
            match result {
                Ok(guests) => {
                    s.guests = guests;
                    s.fetch_error = None;
                    s.last_fetch = Some(Instant::now());
                    if s.status_line.as_deref() == Some(REFRESHING) {
                        s.status_line = None;
                    }
                    let max = s.visible_len().saturating_sub(1);
                    s.scroll = s.scroll.min(max);
                }
                Err(e) => {
                    warn!(error = %format!("{:#}", e), "guest_fetch_failed");
                    s.fetch_error = Some(format!("{:#}", e));
                }
            }
        }

        tokio::select! {
            _ = refresh.notified() => {}
            _ = tokio::time::sleep(AUTO_REFRESH) => {}
        }
    }
}

async fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: SharedState,
    refresh: Arc<Notify>,
    config: &Config,
) -> anyhow::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        let s = state.lock().await;
        terminal.draw(|f| draw_ui(f, &s))?;
        drop(s);

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let mut s = state.lock().await;
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('f') => {
                            s.query.filter = s.query.filter.next();
                            s.scroll = 0;
                        }
                        KeyCode::Char('s') => s.query.direction = s.query.direction.toggle(),
                        KeyCode::Char('r') => {
                            s.status_line = Some(REFRESHING.to_string());
                            refresh.notify_one();
                        }
                        KeyCode::Char('e') => {
                            let line = export_report(&s, config);
                            s.status_line = Some(line);
                        }
                        KeyCode::Down => s.scroll_by(1),
                        KeyCode::Up => s.scroll_by(-1),
                        KeyCode::PageDown => s.scroll_by(PAGE_SCROLL as isize),
                        KeyCode::PageUp => s.scroll_by(-(PAGE_SCROLL as isize)),
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}

/// Write the current view as a report, returning the footer text
fn export_report(state: &DashboardState, config: &Config) -> String {
    let report = AttendanceReport {
        rows: state.query.apply(&state.guests),
        filter: state.query.filter,
        generated_at: chrono::Local::now(),
    };
    let path = Path::new(config.report_output());
    match report.write_to(path, config.report_rows_per_page()) {
        Ok(rows) => format!("Exported {} guests to {}", rows, path.display()),
        Err(e) => {
            warn!(error = %format!("{:#}", e), "report_export_failed");
            format!("Export failed: {:#}", e)
        }
    }
}

fn draw_ui(f: &mut Frame, state: &DashboardState) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Attendance gauge
            Constraint::Min(0),    // Guest table
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    let summary = AttendanceSummary::from_guests(&state.guests);
    draw_header(f, main_chunks[0], state, &summary);
    draw_attendance(f, main_chunks[1], &summary);
    draw_guest_table(f, main_chunks[2], state);
    draw_footer(f, main_chunks[3], state);
}

fn draw_header(f: &mut Frame, area: Rect, state: &DashboardState, summary: &AttendanceSummary) {
    let (status_text, status_color) = match (&state.fetch_error, state.last_fetch) {
        (Some(_), _) => ("FETCH FAILED", Color::Red),
        (None, Some(_)) => ("CONNECTED", Color::Green),
        (None, None) => ("LOADING", Color::Yellow),
    };

    let last_fetch = state
        .last_fetch
        .map(|t| format!("{}s ago", t.elapsed().as_secs()))
        .unwrap_or_else(|| "never".to_string());

    let header = Paragraph::new(Line::from(vec![
        Span::styled("Guest Dashboard ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("| "),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw(" | Last fetch: "),
        Span::raw(last_fetch),
        Span::raw(" | Total: "),
        Span::styled(summary.total.to_string(), Style::default().fg(Color::White)),
        Span::raw(" Arrived: "),
        Span::styled(summary.arrived.to_string(), Style::default().fg(Color::Green)),
        Span::raw(" Pending: "),
        Span::styled(summary.pending.to_string(), Style::default().fg(Color::Yellow)),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(header, area);
}

fn draw_attendance(f: &mut Frame, area: Rect, summary: &AttendanceSummary) {
    let gauge = Gauge::default()
        .block(Block::default().title(" Attendance ").borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Green))
        .percent(summary.arrived_percent())
        .label(format!("{}/{} arrived ({}%)", summary.arrived, summary.total, summary.arrived_percent()));
    f.render_widget(gauge, area);
}

fn draw_guest_table(f: &mut Frame, area: Rect, state: &DashboardState) {
    let visible = state.query.apply(&state.guests);

    let rows: Vec<Row> = visible
        .iter()
        .skip(state.scroll)
        .map(|g| {
            let status_style = match g.status {
                GuestStatus::Arrived => Style::default().fg(Color::Green),
                GuestStatus::Pending => Style::default().fg(Color::Yellow),
            };
            Row::new(vec![
                g.serial_number.to_string(),
                g.name.clone(),
                g.organization.clone(),
                g.status.to_string(),
                g.arrival_time.clone(),
            ])
            .style(status_style)
        })
        .collect();

    let title = format!(
        " Guests | Filter: {} | Sr. No. {} | {} shown ",
        state.query.filter.as_str(),
        state.query.direction.arrow(),
        visible.len()
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),      // Sr. No.
            Constraint::Percentage(30), // Name
            Constraint::Percentage(30), // Organization
            Constraint::Length(9),      // Status
            Constraint::Length(20),     // Arrival
        ],
    )
    .header(
        Row::new(vec!["Sr. No.", "Name", "Organization", "Status", "Arrival Time"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );

    f.render_widget(table, area);
}

fn draw_footer(f: &mut Frame, area: Rect, state: &DashboardState) {
    let mut spans = vec![Span::styled(
        "f filter | s sort | r refresh | e export | q quit",
        Style::default().fg(Color::DarkGray),
    )];
    if let Some(ref err) = state.fetch_error {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(err.clone(), Style::default().fg(Color::Red)));
    } else if let Some(ref line) = state.status_line {
        spans.push(Span::raw(" | "));
        spans.push(Span::raw(line.clone()));
    }

    let footer = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}
