//! Ratatui-based terminal dashboard.
//!
//! A settings panel selects town, dataset and year; the dashboard shows the
//! aggregate statistics, a grade distribution chart, a location map and a
//! paginated table of the filtered records.
//!
//! Fetches run on worker threads and report back over a channel. Their
//! results go through the view reducer, which drops anything that does not
//! carry the current request token.

use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use chrono::{Datelike, Local};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, List, ListItem, Paragraph, Row, Table},
};
use tracing::{info, warn};

use crate::app::pipeline;
use crate::app::{bulk_export_name, view_export_name};
use crate::data::{AdemeClient, BulkReport};
use crate::domain::catalog::{self, DATASETS, TOWNS};
use crate::domain::{DashboardConfig, YearFilter};
use crate::error::{AppError, ExportError};
use crate::report::{clip, format_date_fr};
use crate::view::{FetchStatus, ViewEvent, ViewState, grade_distribution, update};

mod map_chart;

use map_chart::DpeMapChart;

const FIELD_COUNT: usize = 3;

/// Start the TUI.
pub fn run(config: DashboardConfig, client: AdemeClient) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(config, client);
    app.dispatch(ViewEvent::Refresh);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Messages from worker threads.
enum WorkerMsg {
    Settled(ViewEvent),
    BulkProgress { done: usize, total: usize },
    BulkDone(BulkReport),
}

struct App {
    config: DashboardConfig,
    state: ViewState,
    client: AdemeClient,
    tx: Sender<WorkerMsg>,
    rx: Receiver<WorkerMsg>,
    years: Vec<YearFilter>,
    selected_field: usize,
    status: String,
    bulk_progress: Option<(usize, usize)>,
    out_dir: PathBuf,
}

impl App {
    fn new(config: DashboardConfig, client: AdemeClient) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            state: ViewState::new(&config),
            config,
            client,
            tx,
            rx,
            years: catalog::year_options(),
            selected_field: 0,
            status: String::new(),
            bulk_progress: None,
            out_dir: PathBuf::from("."),
        }
    }

    /// Apply `event`; start a fetch if it opened a new request.
    fn dispatch(&mut self, event: ViewEvent) {
        let before = self.state.token();
        let state = std::mem::replace(&mut self.state, ViewState::new(&self.config));
        self.state = update(state, event);

        if self.state.token() != before {
            self.spawn_fetch();
        }
    }

    fn spawn_fetch(&mut self) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        let query = self.state.query();
        let token = self.state.token();
        self.status = format!("Récupération des données ADEME pour {}...", query.town);

        thread::spawn(move || {
            let event = pipeline::settle(&client, &query, token);
            let _ = tx.send(WorkerMsg::Settled(event));
        });
    }

    fn spawn_bulk(&mut self) {
        if self.bulk_progress.is_some() {
            self.status = "Export global déjà en cours.".to_string();
            return;
        }

        let client = self.client.clone();
        let tx = self.tx.clone();
        let config = DashboardConfig {
            dataset_id: self.state.dataset_id.clone(),
            ..self.config.clone()
        };
        self.bulk_progress = Some((0, TOWNS.len()));
        self.status = "Export global lancé...".to_string();

        thread::spawn(move || {
            let progress_tx = tx.clone();
            let report = pipeline::run_bulk(&client, &config, &TOWNS, |done, total| {
                let _ = progress_tx.send(WorkerMsg::BulkProgress { done, total });
            });
            let _ = tx.send(WorkerMsg::BulkDone(report));
        });
    }

    fn drain_workers(&mut self) -> bool {
        let mut changed = false;
        while let Ok(msg) = self.rx.try_recv() {
            changed = true;
            match msg {
                WorkerMsg::Settled(event) => {
                    self.dispatch(event);
                    self.status = match self.state.status {
                        FetchStatus::Success => format!(
                            "{} dossiers reçus ({} au total).",
                            self.state.records.len(),
                            self.state.total
                        ),
                        FetchStatus::Error => format!(
                            "Erreur: {}",
                            self.state.error.as_deref().unwrap_or("échec de la requête")
                        ),
                        _ => self.status.clone(),
                    };
                }
                WorkerMsg::BulkProgress { done, total } => {
                    self.bulk_progress = Some((done, total));
                    self.status = format!("Récupération {done}/{total}");
                }
                WorkerMsg::BulkDone(report) => {
                    self.bulk_progress = None;
                    let name = bulk_export_name(Local::now().year());
                    self.status = match crate::io::write_dpe_csv(&self.out_dir, &name, &report.records) {
                        Ok(path) => format!(
                            "Export global: {} dossiers -> {} ({} commune(s) ignorée(s))",
                            report.records.len(),
                            path.display(),
                            report.failed.len()
                        ),
                        Err(err) => export_failure(err),
                    };
                }
            }
        }
        changed
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if self.drain_workers() {
                needs_redraw = true;
            }

            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < FIELD_COUNT {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Char('n') | KeyCode::PageDown => self.dispatch(ViewEvent::NextPage),
            KeyCode::Char('p') | KeyCode::PageUp => self.dispatch(ViewEvent::PrevPage),
            KeyCode::Char('r') => self.dispatch(ViewEvent::Refresh),
            KeyCode::Char('e') => self.export_view(),
            KeyCode::Char('g') => self.spawn_bulk(),
            _ => {}
        }
        false
    }

    fn adjust_field(&mut self, delta: isize) {
        match self.selected_field {
            0 => {
                let idx = TOWNS.iter().position(|t| *t == self.state.town).unwrap_or(0);
                let town = TOWNS[cycle(idx, TOWNS.len(), delta)].to_string();
                self.dispatch(ViewEvent::SelectTown(town));
            }
            1 => {
                let idx = DATASETS
                    .iter()
                    .position(|d| d.id == self.state.dataset_id)
                    .unwrap_or(0);
                let dataset = DATASETS[cycle(idx, DATASETS.len(), delta)].id.to_string();
                self.dispatch(ViewEvent::SelectDataset(dataset));
            }
            2 => {
                let idx = self.years.iter().position(|y| *y == self.state.year).unwrap_or(0);
                let year = self.years[cycle(idx, self.years.len(), delta)];
                self.dispatch(ViewEvent::SelectYear(year));
                self.status = format!("Année: {year}");
            }
            _ => {}
        }
    }

    fn export_view(&mut self) {
        let filtered = self.state.filtered();
        let name = view_export_name(&self.state.town, self.state.year, Local::now().year());
        self.status = match crate::io::write_dpe_csv(&self.out_dir, &name, &filtered) {
            Ok(path) => {
                info!(file = %path.display(), "view exported");
                format!("Téléchargement lancé: {}", path.display())
            }
            Err(err) => export_failure(err),
        };
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("DPE", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled("Hub", Style::default().fg(Color::LightGreen)),
            Span::raw(" · diagnostics ADEME triés par date d'établissement"),
        ]));

        let filtered = self.state.filtered();
        lines.push(Line::from(Span::styled(
            format!(
                "commune: {} | base: {} | année: {} | {} dossiers ({} reçus / {} au total)",
                self.state.town,
                self.state.dataset_id,
                self.state.year,
                filtered.len(),
                self.state.records.len(),
                self.state.total,
            ),
            Style::default().fg(Color::Gray),
        )));

        let stats_line = match self.state.status {
            FetchStatus::Success if !filtered.is_empty() => {
                let stats = self.state.stats();
                Line::from(vec![
                    Span::raw(format!(
                        "{}: {:.0} {} | ",
                        stats.metric.label(),
                        stats.average.round(),
                        stats.metric.unit()
                    )),
                    Span::styled(
                        format!("Passoires F/G: {}", stats.passoires),
                        Style::default().fg(Color::LightRed),
                    ),
                    Span::raw(format!(" | Incidence thermique: {:.0}%", stats.passoires_pct.round())),
                ])
            }
            FetchStatus::Loading => Line::from(Span::styled(
                "Chargement...",
                Style::default().fg(Color::Yellow),
            )),
            FetchStatus::Error => Line::from(Span::styled(
                "Échec de la récupération des données.",
                Style::default().fg(Color::Red),
            )),
            _ => Line::from(""),
        };
        lines.push(stats_line);

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Length(12), Constraint::Min(0)])
            .split(columns[0]);

        self.draw_settings(frame, left[0]);
        self.draw_chart(frame, left[1]);
        self.draw_map(frame, left[2]);
        self.draw_table(frame, columns[1]);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let dataset_name = catalog::find_dataset(&self.state.dataset_id)
            .map(|d| d.name)
            .unwrap_or(self.state.dataset_id.as_str());
        let year_label = match self.state.year {
            YearFilter::All => "Historique (Tous)".to_string(),
            y => y.to_string(),
        };

        let items = vec![
            ListItem::new(format!("Ville: {}", self.state.town)),
            ListItem::new(format!("Base: {dataset_name}")),
            ListItem::new(format!("Année: {year_label}")),
        ];

        let list = List::new(items)
            .block(Block::default().title("Sélection").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title("Répartition des étiquettes DPE")
            .borders(Borders::ALL);

        let filtered = self.state.filtered();
        if filtered.is_empty() {
            let msg = Paragraph::new("En attente de données")
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(msg, area);
            return;
        }

        let bars: Vec<Bar> = grade_distribution(&filtered)
            .iter()
            .map(|&(grade, n)| {
                Bar::default()
                    .value(n as u64)
                    .label(Line::from(grade.to_string()))
                    .style(Style::default().fg(grade_color(grade)))
            })
            .collect();

        let chart = BarChart::default()
            .block(block)
            .data(BarGroup::default().bars(&bars))
            .bar_width(3)
            .bar_gap(1);
        frame.render_widget(chart, area);
    }

    fn draw_map(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Carte").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let points: Vec<(f64, f64, (u8, u8, u8))> = self
            .state
            .filtered()
            .iter()
            .filter_map(|r| {
                let (lat, lon) = r.coordinates()?;
                let grade = r.etiquette_dpe.chars().next().unwrap_or('?');
                Some((lon, lat, grade_rgb(grade)))
            })
            .collect();

        let (lat, lon) = catalog::town_center(&self.state.town).unwrap_or(catalog::DEFAULT_CENTER);
        frame.render_widget(DpeMapChart::new(&points, (lon, lat)), inner);
    }

    fn draw_table(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = format!(
            "Diagnostics les plus récents (page {}/{})",
            self.state.page,
            self.state.page_count()
        );
        let block = Block::default().title(title).borders(Borders::ALL);

        let page = self.state.current_page();
        if page.is_empty() {
            let msg = match self.state.status {
                FetchStatus::Loading => "Récupération des données ADEME...",
                _ => "Aucun résultat trouvé pour cette sélection.",
            };
            frame.render_widget(
                Paragraph::new(msg).style(Style::default().fg(Color::DarkGray)).block(block),
                area,
            );
            return;
        }

        let header = Row::new(vec!["Adresse", "Commune", "Date", "DPE", "Surface"])
            .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));

        let rows = page.iter().map(|r| {
            let grade = r.etiquette_dpe.chars().next().unwrap_or('?');
            Row::new(vec![
                Span::raw(clip(&r.adresse_brut, 40)),
                Span::raw(clip(&format!("{} {}", r.code_postal, r.commune_brut), 24)),
                Span::raw(format_date_fr(&r.date_etablissement_dpe)),
                Span::styled(
                    r.etiquette_dpe.clone(),
                    Style::default().fg(grade_color(grade)).add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("{} m²", r.surface_habitable)),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Min(20),
                Constraint::Length(24),
                Constraint::Length(10),
                Constraint::Length(3),
                Constraint::Length(9),
            ],
        )
        .header(header)
        .block(block);

        frame.render_widget(table, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  n/p page  r refresh  e export  g global export  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn export_failure(err: ExportError) -> String {
    match err {
        ExportError::Empty => ExportError::Empty.to_string(),
        other => {
            warn!(error = %other, "export failed");
            format!("Export impossible: {other}")
        }
    }
}

/// Step `idx` by `delta` within `0..len`, wrapping around.
fn cycle(idx: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    (idx as isize + delta).rem_euclid(len as isize) as usize
}

/// ADEME label palette.
fn grade_rgb(grade: char) -> (u8, u8, u8) {
    match grade {
        'A' => (0, 163, 116),
        'B' => (84, 180, 95),
        'C' => (167, 193, 74),
        'D' => (242, 198, 25),
        'E' => (235, 129, 19),
        'F' => (209, 56, 19),
        'G' => (177, 19, 19),
        _ => (204, 204, 204),
    }
}

fn grade_color(grade: char) -> Color {
    let (r, g, b) = grade_rgb(grade);
    Color::Rgb(r, g, b)
}
