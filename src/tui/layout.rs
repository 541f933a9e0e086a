//! TUI layout and widget rendering.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};

use super::runtime::App;
use super::style;
use crate::sim::clock::HOURS_PER_YEAR;

/// Renders the full TUI frame.
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // header
            Constraint::Length(3),  // year progress
            Constraint::Length(10), // grid + resources
            Constraint::Min(6),     // event log
            Constraint::Length(1),  // footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_progress(frame, app, chunks[1]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);
    render_grid(frame, app, middle[0]);
    render_resources(frame, app, middle[1]);

    render_log(frame, app, chunks[3]);
    render_footer(frame, app, chunks[4]);
}

/// Header bar: preset name, hour, speed, run state.
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let sim = app.sim();
    let (icon, label) = if sim.has_error() {
        ("✖", "ERROR")
    } else if sim.is_running() {
        ("▶", "RUNNING")
    } else if sim.hour() >= HOURS_PER_YEAR {
        ("■", "DONE")
    } else {
        ("‖", "STOPPED")
    };

    let header = Line::from(vec![
        Span::styled(
            " VPP-DR-SIM ",
            Style::default()
                .fg(style::HEADER_FG)
                .bg(style::HEADER_BG)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            &app.preset_name,
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " │ hour {}/{} │ x{} │ {icon} {label} ",
            sim.hour(),
            HOURS_PER_YEAR,
            app.speed(),
        )),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

fn render_progress(frame: &mut Frame, app: &App, area: Rect) {
    let progress = app.year_progress();
    let gauge = Gauge::default()
        .block(Block::default().title(" Year ").borders(Borders::ALL))
        .gauge_style(Style::default().fg(style::PROGRESS))
        .ratio(progress.clamp(0.0, 1.0))
        .label(format!("{:.1}%", progress * 100.0));
    frame.render_widget(gauge, area);
}

/// Transmission and distribution quantities.
fn render_grid(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.sim().state();
    let t = &state.transmission;
    let d = &state.distribution;

    let signal = Span::styled(
        format!("{:?}", t.dispatch_signal),
        Style::default()
            .fg(style::signal_color(t.dispatch_signal))
            .add_modifier(Modifier::BOLD),
    );

    let lines = vec![
        Line::from(format!(
            "  transmission  {:>6.2} kV  {:>6.3} Hz  {:>5.1} MW",
            t.voltage_kv, t.frequency_hz, t.load_flow_mw
        )),
        Line::from(vec![
            Span::raw("  dispatch      "),
            signal,
            Span::raw(format!("  requested {:>6.2} MW", t.requested_power_mw)),
        ]),
        Line::from(format!(
            "  distribution  {:>6.2} kV  load {:>5.1}%  {:>4.1} °C",
            d.voltage_kv, d.loading_pct, d.temperature_c
        )),
        Line::from(format!(
            "  power         {:>5.2} MW  {:>4.2} MVAr  quality {:>5.1}%",
            d.active_power_mw, d.reactive_power_mvar, d.power_quality_pct
        )),
        Line::from(format!(
            "  flexibility   {:>5.2} MWh",
            d.flexibility_available_mwh
        )),
        Line::from(format!(
            "  controller    {}  │ goal {}",
            state.vpp.controller.status, state.vpp.optimizer.optimization_goal
        )),
    ];

    let block = Block::default().title(" Grid ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_resources(frame: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .sim()
        .state()
        .resources
        .iter()
        .map(|(id, r)| {
            let reduction = r
                .reduction_mwh
                .map_or_else(String::new, |mwh| format!(" -{mwh:.2} MWh"));
            Line::from(Span::styled(
                format!(
                    "  {:<16} {:>7.0} kW  {:<10}{}",
                    id.display_name(),
                    r.power_draw_kw,
                    r.status,
                    reduction
                ),
                Style::default().fg(style::mode_color(r.mode)),
            ))
        })
        .collect();

    let block = Block::default().title(" Resources ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Newest log lines that fit the panel.
fn render_log(frame: &mut Frame, app: &App, area: Rect) {
    let rows = usize::from(area.height.saturating_sub(2));
    let lines: Vec<Line> = app
        .sim()
        .log()
        .latest(rows)
        .map(|e| {
            let color = if e.cascade.is_some() {
                style::NARRATIVE
            } else {
                style::HEADER_FG
            };
            Line::from(Span::styled(format!(" {e}"), Style::default().fg(color)))
        })
        .collect();

    let title = if app.sim().has_error() {
        Span::styled(
            " Event Log: simulation error, press x to recover ",
            Style::default().fg(style::ERROR),
        )
    } else {
        Span::raw(" Event Log ")
    };
    let block = Block::default().title(title).borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Footer with keybinding hints and the pending jump.
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let mut text =
        " q:Quit  Space:Start/Stop  +/-:Speed  r:Restart  x:Recover  s/w/b/h/e:Click  0-9+Enter:Jump"
            .to_string();
    if !app.jump_input.is_empty() {
        text.push_str(&format!("  │ jump to {}_", app.jump_input));
    }
    let footer = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(style::FOOTER_FG),
    )));
    frame.render_widget(footer, area);
}
