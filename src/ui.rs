use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use inclusion_forecast::dashboard::{
    calculate_growth_rate, event_timeline, format_metric, year_bounds, DashboardData,
    DashboardSummary, RecordFilter, TimelineEntry, HEADLINE_INDICATOR,
};
use inclusion_forecast::record::{FinancialInclusionRecord, Pillar, RecordType};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const RECORD_TYPES: [RecordType; 3] = [
    RecordType::Observation,
    RecordType::Event,
    RecordType::ImpactLink,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    Records,
    Events,
    Forecast,
    Scenarios,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Overview => Page::Records,
            Page::Records => Page::Events,
            Page::Events => Page::Forecast,
            Page::Forecast => Page::Scenarios,
            Page::Scenarios => Page::Overview,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Overview => Page::Scenarios,
            Page::Records => Page::Overview,
            Page::Events => Page::Records,
            Page::Forecast => Page::Events,
            Page::Scenarios => Page::Forecast,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Overview => "Overview",
            Page::Records => "Records",
            Page::Events => "Events & Impacts",
            Page::Forecast => "Forecast",
            Page::Scenarios => "Scenarios",
        }
    }

    const ALL: [Page; 5] = [
        Page::Overview,
        Page::Records,
        Page::Events,
        Page::Forecast,
        Page::Scenarios,
    ];
}

pub struct App {
    pub data: DashboardData,
    pub summary: DashboardSummary,
    pub timeline: Vec<TimelineEntry>,
    /// Indexes into `data.dataset.records()` that pass the filter
    pub filtered: Vec<usize>,
    pub filter: RecordFilter,
    pub state: TableState,
    pub events_state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
}

impl App {
    pub fn new(data: DashboardData) -> Self {
        let summary = data.summary();
        let timeline = event_timeline(&data.dataset);

        let mut events_state = TableState::default();
        if !timeline.is_empty() {
            events_state.select(Some(0));
        }

        let mut app = Self {
            data,
            summary,
            timeline,
            filtered: Vec::new(),
            filter: RecordFilter::default(),
            state: TableState::default(),
            events_state,
            current_page: Page::Overview,
            show_detail: false,
        };
        app.apply_filter(RecordFilter::default());
        app
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_record(&self) -> Option<&FinancialInclusionRecord> {
        self.state
            .selected()
            .and_then(|i| self.filtered.get(i))
            .and_then(|&idx| self.data.dataset.records().get(idx))
    }

    pub fn apply_filter(&mut self, filter: RecordFilter) {
        self.filter = filter;
        self.filtered = self
            .data
            .dataset
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.matches(r))
            .map(|(i, _)| i)
            .collect();

        // Reset selection to first item
        if !self.filtered.is_empty() {
            self.state.select(Some(0));
        } else {
            self.state.select(None);
        }
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(RecordFilter::default());
    }

    /// None → ACCESS → USAGE → QUALITY → INFRASTRUCTURE → None
    pub fn cycle_pillar(&mut self) {
        let next = match self.filter.pillar {
            None => Pillar::ALL.first().copied(),
            Some(p) => Pillar::ALL
                .iter()
                .position(|x| *x == p)
                .and_then(|i| Pillar::ALL.get(i + 1))
                .copied(),
        };
        self.apply_filter(RecordFilter { pillar: next, ..self.filter });
    }

    pub fn cycle_record_type(&mut self) {
        let next = match self.filter.record_type {
            None => Some(RECORD_TYPES[0]),
            Some(t) => RECORD_TYPES
                .iter()
                .position(|x| *x == t)
                .and_then(|i| RECORD_TYPES.get(i + 1))
                .copied(),
        };
        self.apply_filter(RecordFilter { record_type: next, ..self.filter });
    }

    /// Toggle a filter on the last five observed years
    pub fn toggle_recent_years(&mut self) {
        let range = match (self.filter.year_range, year_bounds(&self.data.dataset)) {
            (None, Some((_, last))) => Some((last - 4, last)),
            _ => None,
        };
        self.apply_filter(RecordFilter { year_range: range, ..self.filter });
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    fn active_list(&mut self) -> (&mut TableState, usize) {
        match self.current_page {
            Page::Events => (&mut self.events_state, self.timeline.len()),
            _ => (&mut self.state, self.filtered.len()),
        }
    }

    pub fn next(&mut self) {
        let (state, len) = self.active_list();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (state, len) = self.active_list();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let (state, len) = self.active_list();
        if len == 0 {
            return;
        }
        let i = state.selected().map(|i| (i + 20).min(len - 1)).unwrap_or(0);
        state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let (state, _) = self.active_list();
        let i = state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        state.select(Some(i));
    }

    pub fn filter_label(&self) -> Option<String> {
        if self.filter.is_empty() {
            return None;
        }
        let mut parts = Vec::new();
        if let Some(p) = self.filter.pillar {
            parts.push(p.as_str().to_string());
        }
        if let Some(t) = self.filter.record_type {
            parts.push(t.as_str().to_string());
        }
        if let Some((from, to)) = self.filter.year_range {
            parts.push(format!("{}-{}", from, to));
        }
        Some(parts.join(" + "))
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char(c @ '1'..='5') => {
                    let idx = c as usize - '1' as usize;
                    if let Some(page) = Page::ALL.get(idx) {
                        app.current_page = *page;
                    }
                }
                KeyCode::Char('p') => {
                    app.cycle_pillar();
                    app.current_page = Page::Records;
                }
                KeyCode::Char('t') => {
                    app.cycle_record_type();
                    app.current_page = Page::Records;
                }
                KeyCode::Char('y') => {
                    app.toggle_recent_years();
                    app.current_page = Page::Records;
                }
                KeyCode::Char('c') => app.clear_filter(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.state.select(Some(0)),
                KeyCode::End => {
                    if !app.filtered.is_empty() {
                        app.state.select(Some(app.filtered.len() - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Records {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_records(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Overview => render_overview(f, chunks[1], app),
            Page::Records => render_records(f, chunks[1], app),
            Page::Events => render_events(f, chunks[1], app),
            Page::Forecast => render_forecast(f, chunks[1], app),
            Page::Scenarios => render_scenarios(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn header_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

fn label(text: impl Into<String>) -> Span<'static> {
    Span::styled(
        text.into(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )
}

fn table_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn pillar_color(pillar: Option<Pillar>) -> Color {
    match pillar {
        Some(Pillar::Access) => Color::Blue,
        Some(Pillar::Usage) => Color::Green,
        Some(Pillar::Quality) => Color::Magenta,
        Some(Pillar::Infrastructure) => Color::Yellow,
        None => Color::White,
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in Page::ALL.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Records: {}", app.summary.total_records),
        Style::default().fg(Color::White),
    ));
    if let Some(latest) = &app.summary.latest {
        tab_spans.push(Span::raw("  |  "));
        tab_spans.push(Span::styled(
            format!("Accounts {}", format_metric(latest.value, "%", 1)),
            Style::default().fg(Color::Green),
        ));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_overview(f: &mut Frame, area: Rect, app: &App) {
    let s = &app.summary;
    let mut content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Ethiopia Financial Inclusion",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    match &s.latest {
        Some(latest) => {
            let mut spans = vec![
                label("  Account Ownership Rate: "),
                Span::styled(format_metric(latest.value, "%", 1), Style::default().fg(Color::Green)),
                Span::raw(format!("  ({}, {}, {})", latest.date, latest.source, latest.confidence)),
            ];
            if let Some(change) = s.change_pp {
                let color = if change >= 0.0 { Color::Green } else { Color::Red };
                spans.push(Span::styled(
                    format!("  {}", format_metric(change, "pp", 1)),
                    Style::default().fg(color),
                ));
            }
            content.push(Line::from(spans));

            if let Some((year, value)) = s.final_forecast {
                content.push(Line::from(vec![
                    label(format!("  {} Forecast (Base): ", year)),
                    Span::styled(format_metric(value, "%", 1), Style::default().fg(Color::Yellow)),
                    Span::raw(format!(
                        "  {:+.1}pp, {} growth",
                        value - latest.value,
                        format_metric(calculate_growth_rate(value, latest.value), "%", 1)
                    )),
                ]));
            }
        }
        None => content.push(Line::from(format!(
            "  No {} observations in the dataset",
            HEADLINE_INDICATOR
        ))),
    }

    content.push(Line::from(""));
    content.push(Line::from(vec![
        label("  Records: "),
        Span::raw(format!(
            "{} total | {} observations | {} events | {} impact links",
            s.total_records, s.observations, s.events, s.impact_links
        )),
    ]));
    content.push(Line::from(""));
    content.push(Line::from(label("  Observations by pillar")));
    for (pillar, count) in &s.pillar_distribution {
        content.push(Line::from(format!(
            "    {:<16} {:>4} {}",
            pillar,
            count,
            "█".repeat((*count).min(40))
        )));
    }
    content.push(Line::from(""));
    content.push(Line::from(label("  Confidence")));
    for (level, count) in &s.confidence_distribution {
        content.push(Line::from(format!("    {:<16} {:>4}", level, count)));
    }

    if !s.missing.is_empty() {
        content.push(Line::from(""));
        for file in &s.missing {
            content.push(Line::from(Span::styled(
                format!("  ⚠ missing: {}", file),
                Style::default().fg(Color::Red),
            )));
        }
    }

    let paragraph = Paragraph::new(content).block(table_block(" Overview "));
    f.render_widget(paragraph, area);
}

fn render_records(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["ID", "Type", "Pillar", "Indicator", "Value", "Date", "Conf."]
        .iter()
        .map(|h| Cell::from(*h).style(header_style()));

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let records = app.data.dataset.records();
    let rows = app.filtered.iter().filter_map(|&i| records.get(i)).map(|r| {
        let color = pillar_color(r.pillar);
        let cells = vec![
            Cell::from(r.record_id.clone()),
            Cell::from(r.record_type.as_str()),
            Cell::from(r.pillar.map(|p| p.as_str()).unwrap_or("-")).style(Style::default().fg(color)),
            Cell::from(truncate(r.label(), 30)),
            Cell::from(
                r.value_numeric
                    .map(|v| format_metric(v, r.unit.as_deref().unwrap_or(""), 1))
                    .unwrap_or_default(),
            ),
            Cell::from(r.observation_date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::from(r.confidence.map(|c| c.as_str()).unwrap_or("")),
        ];
        Row::new(cells).height(1)
    });

    let title = match app.filter_label() {
        Some(label) => format!(" Records [{}] ", label),
        None => " Records ".to_string(),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Length(16),
            Constraint::Length(32),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(table_block(&title))
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_events(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Date", "Event", "Category", "Linked indicators"]
        .iter()
        .map(|h| Cell::from(*h).style(header_style()));
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.timeline.iter().map(|e| {
        let linked = if e.linked_indicators.is_empty() {
            Cell::from("none").style(Style::default().fg(Color::DarkGray))
        } else {
            Cell::from(e.linked_indicators.join(", ")).style(Style::default().fg(Color::Green))
        };
        Row::new(vec![
            Cell::from(e.date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::from(truncate(&e.name, 32)),
            Cell::from(e.category.clone().unwrap_or_default()),
            linked,
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(34),
            Constraint::Length(16),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(table_block(" Events & Impact Links "))
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.events_state);
}

fn missing_table(f: &mut Frame, area: Rect, title: &str, what: &str) {
    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {} file not found", what),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("  Run: inclusion-forecast run"),
    ];
    f.render_widget(Paragraph::new(content).block(table_block(title)), area);
}

fn render_forecast(f: &mut Frame, area: Rect, app: &App) {
    let rows_data = match &app.data.forecast {
        Some(rows) => rows,
        None => return missing_table(f, area, " Forecast ", "Forecast"),
    };

    let header_cells = ["Year", "Forecast", "80% band", "95% band"]
        .iter()
        .map(|h| Cell::from(*h).style(header_style()));
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = rows_data.iter().map(|r| {
        Row::new(vec![
            Cell::from(r.year.to_string()),
            Cell::from(format_metric(r.forecast, "%", 1)).style(Style::default().fg(Color::Green)),
            Cell::from(format!("{:.1} – {:.1}", r.lower_80, r.upper_80)),
            Cell::from(format!("{:.1} – {:.1}", r.lower_95, r.upper_95))
                .style(Style::default().fg(Color::DarkGray)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Length(18),
            Constraint::Length(18),
        ],
    )
    .header(header)
    .block(table_block(" Account Ownership Forecast "));

    f.render_widget(table, area);
}

fn render_scenarios(f: &mut Frame, area: Rect, app: &App) {
    let rows_data = match &app.data.scenarios {
        Some(rows) => rows,
        None => return missing_table(f, area, " Scenarios ", "Scenario"),
    };

    let header_cells = ["Year", "Base Case", "Accelerated", "Stagnation"]
        .iter()
        .map(|h| Cell::from(*h).style(header_style()));
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = rows_data.iter().map(|r| {
        Row::new(vec![
            Cell::from(r.year.to_string()),
            Cell::from(format_metric(r.base, "%", 1)),
            Cell::from(format_metric(r.accelerated, "%", 1)).style(Style::default().fg(Color::Green)),
            Cell::from(format_metric(r.stagnation, "%", 1)).style(Style::default().fg(Color::Red)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(table_block(" Scenarios "));

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.filtered.len();

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(filter) = app.filter_label() {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("Filter: {}", filter),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw(" ("));
        status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" clear)"));
    }

    for (key, what) in [
        ("Enter", " Details | "),
        ("Tab/1-5", " Page | "),
        ("p/t/y", " Pillar/Type/Recent | "),
        ("↑/↓", " Nav | "),
    ] {
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(what));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let record = match app.selected_record() {
        Some(r) => r,
        None => {
            let no_selection = Paragraph::new("No record selected").block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow))
                    .title(" Record Details "),
            );
            f.render_widget(no_selection, area);
            return;
        }
    };

    let field = |name: &str, value: Option<String>| -> Line<'static> {
        Line::from(vec![
            Span::styled(
                format!("  {}: ", name),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(value.unwrap_or_else(|| "-".to_string())),
        ])
    };
    let section = |title: &str| -> Line<'static> {
        Line::from(Span::styled(
            format!("  {}", title),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ))
    };

    let mut content = vec![
        Line::from(""),
        field("ID", Some(record.record_id.clone())),
        field("Type", Some(record.record_type.as_str().to_string())),
        field("Indicator", Some(record.label().to_string())),
        field("Code", record.indicator_code.clone()),
        field("Pillar", record.pillar.map(|p| p.as_str().to_string())),
        field(
            "Value",
            record
                .value_numeric
                .map(|v| format!("{}{}", v, record.unit.as_deref().unwrap_or(""))),
        ),
        field("Date", record.observation_date.map(|d| d.to_string())),
        field("Confidence", record.confidence.map(|c| c.as_str().to_string())),
        field("Source", record.source_name.clone()),
    ];

    if let Some(link) = &record.impact {
        content.push(Line::from(""));
        content.push(section("IMPACT LINK"));
        content.push(field("Event", link.parent_id.clone()));
        content.push(field("Target", link.related_indicator.clone()));
        content.push(field(
            "Effect",
            link.impact_estimate.map(|e| {
                let sign = link
                    .impact_direction
                    .map(|d| d.as_str())
                    .unwrap_or("?");
                format!("{} {}", sign, e.label())
            }),
        ));
        content.push(field("Lag", link.lag_months.map(|m| format!("{} months", m))));
        content.push(field("Evidence", link.evidence_basis.clone()));
    }

    content.push(Line::from(""));
    content.push(Line::from("  ─────────────────────────────────────"));
    content.push(section("PROVENANCE"));
    match &record.provenance {
        Some(p) => {
            content.push(field("Collected by", Some(p.collected_by.clone())));
            content.push(field("Collected on", Some(p.collection_date.to_string())));
            content.push(field("Batch", Some(truncate(&p.enrichment_batch, 36))));
        }
        None => content.push(Line::from(Span::styled(
            "  Original dataset",
            Style::default().fg(Color::Green),
        ))),
    }

    if let Some(text) = record.original_text.as_ref().or(record.notes.as_ref()) {
        content.push(Line::from(""));
        content.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(
                wrap_text(text, 35),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ),
        ]));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Press Enter to close",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let detail_panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Record Details "),
    );

    f.render_widget(detail_panel, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn wrap_text(text: &str, width: usize) -> String {
    if text.len() <= width {
        return text.to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current_line = String::new();
    for word in text.split_whitespace() {
        if !current_line.is_empty() && current_line.len() + word.len() + 1 > width {
            lines.push(std::mem::take(&mut current_line));
        }
        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }
    if !current_line.is_empty() {
        lines.push(current_line);
    }
    lines.join("\n  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use inclusion_forecast::Dataset;

    fn app() -> App {
        let mut ds = Dataset::new();
        for (id, pillar, year) in [
            ("REC_0001", Pillar::Access, 2014),
            ("REC_0002", Pillar::Access, 2021),
            ("REC_0003", Pillar::Usage, 2021),
        ] {
            ds.push(FinancialInclusionRecord::observation(
                id,
                pillar,
                "ACC_OWNERSHIP",
                40.0,
                NaiveDate::from_ymd_opt(year, 12, 31).unwrap(),
            ))
            .unwrap();
        }
        ds.push(FinancialInclusionRecord::event(
            "EVT_0001",
            "Telebirr Launch",
            NaiveDate::from_ymd_opt(2021, 5, 11).unwrap(),
        ))
        .unwrap();
        App::new(DashboardData::from_parts(ds, None, None))
    }

    #[test]
    fn test_pillar_filter_cycles_back_to_none() {
        let mut app = app();
        assert_eq!(app.filtered.len(), 4);

        app.cycle_pillar();
        assert_eq!(app.filter.pillar, Some(Pillar::Access));
        assert_eq!(app.filtered.len(), 2);

        for _ in 0..Pillar::ALL.len() {
            app.cycle_pillar();
        }
        assert_eq!(app.filter.pillar, None);
        assert_eq!(app.filtered.len(), 4);
    }

    #[test]
    fn test_type_and_year_filters_combine() {
        let mut app = app();
        app.cycle_record_type();
        app.toggle_recent_years();

        assert_eq!(app.filter.record_type, Some(RecordType::Observation));
        assert_eq!(app.filter.year_range, Some((2017, 2021)));
        assert_eq!(app.filtered.len(), 2);
        assert_eq!(app.filter_label().unwrap(), "observation + 2017-2021");

        app.clear_filter();
        assert!(app.filter_label().is_none());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();
        app.current_page = Page::Records;
        app.previous();
        assert_eq!(app.state.selected(), Some(3));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Telebirr", 20), "Telebirr");
        assert_eq!(truncate("ÉÉÉÉÉÉÉÉÉÉ", 6), "ÉÉÉ...");
    }
}
