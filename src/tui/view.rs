use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::mode::TuiState;
use crate::audio::PlaybackState;
use crate::pipeline::session::ParamKey;
use crate::shared::{DisplayState, GenerationStatus, LaneRow, SCENE_KEYS};

const HELP: &str = "spc play  a add  p prompt  e edit  r rename  m/s mute/solo  x del  \
                    tab/h/l param  +/- bpm  [/] cutoff  c scene  1-9 recall  D# drop  u/y undo/redo  \
                    n new  w share  esc quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState, blink_on: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // transport header
            Constraint::Length(3), // scene bar
            Constraint::Min(6),    // lanes
            Constraint::Length(3), // prompt / status
            Constraint::Length(1), // key help
        ])
        .split(area);

    draw_header(frame, sections[0], state, blink_on);
    draw_scenes(frame, sections[1], state);
    draw_lanes(frame, sections[2], state, ts, blink_on);
    draw_prompt(frame, sections[3], state, ts);
    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
        sections[4],
    );
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let (dot, color) = match state.playback {
        PlaybackState::Playing => ("▶", Color::Green),
        PlaybackState::Initializing if blink_on => ("●", Color::Yellow),
        PlaybackState::Initializing => (" ", Color::Yellow),
        PlaybackState::Idle | PlaybackState::Stopped => ("■", Color::DarkGray),
    };
    let mut spans = vec![
        Span::styled(format!("{dot} {}", state.playback.label()), Style::default().fg(color)),
        Span::raw(format!("   {:.0} bpm   lpf {:.0} Hz", state.tempo, state.global_filter_cutoff)),
    ];
    if let Some(error) = &state.audio_error {
        spans.push(Span::styled(format!("   audio: {error}"), Style::default().fg(Color::Red)));
    }
    let block = Block::default().borders(Borders::ALL).title(" seker ");
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_scenes(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let line = if state.scenes.is_empty() {
        Line::from(Span::styled("no scenes yet, c saves one", Style::default().fg(Color::DarkGray)))
    } else {
        let spans: Vec<Span> = state
            .scenes
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let key = if i < SCENE_KEYS { format!("{}", i + 1) } else { "·".to_string() };
                Span::styled(format!("[{key}] {name}  "), Style::default().fg(Color::Cyan))
            })
            .collect();
        Line::from(spans)
    };
    let block = Block::default().borders(Borders::ALL).title(" scenes ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_lanes(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState, blink_on: bool) {
    let mut lines = Vec::new();
    for (i, row) in state.lanes.iter().enumerate() {
        lines.extend(lane_lines(row, i == ts.selected, ts.param));
    }
    for pending in &state.pending_lanes {
        lines.push(Line::from(vec![
            Span::raw("  … "),
            Span::styled(pending.description.clone(), Style::default().fg(Color::Gray)),
            Span::raw("  "),
            status_span(&pending.status, blink_on),
        ]));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "press a and describe a sound, a style, or a song",
            Style::default().fg(Color::DarkGray),
        )));
    }
    let block = Block::default().borders(Borders::ALL).title(" lanes ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn lane_lines(row: &LaneRow, selected: bool, param: ParamKey) -> Vec<Line<'static>> {
    let name_style = match (selected, row.audible) {
        (true, _) => Style::default().fg(Color::Black).bg(Color::Magenta),
        (false, true) => Style::default().fg(Color::White),
        (false, false) => Style::default().fg(Color::DarkGray),
    };
    let flag = |on: bool, c: &'static str, color: Color| {
        if on {
            Span::styled(c, Style::default().fg(color).add_modifier(Modifier::BOLD))
        } else {
            Span::styled("·", Style::default().fg(Color::DarkGray))
        }
    };

    let mut head = vec![
        Span::raw(format!("{} ", row.icon.glyph())),
        Span::styled(format!("{:<12}", row.name), name_style),
        Span::raw(" "),
        flag(row.muted, "M", Color::Red),
        flag(row.solo, "S", Color::Yellow),
        Span::styled(format!(" o{:<2} ", row.orbit), Style::default().fg(Color::DarkGray)),
    ];
    for key in ParamKey::ALL {
        let value = row.params.get(key);
        let text = match key {
            ParamKey::Lpf => format!("{} {:>4.0} ", key.label(), value),
            _ => format!("{} {:.2} ", key.label(), value),
        };
        let style = if selected && key == param {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        };
        head.push(Span::styled(text, style));
    }
    if let Some(status) = &row.generation {
        head.push(status_span(status, true));
    }

    vec![
        Line::from(head),
        Line::from(Span::styled(
            format!("     {}", row.program),
            Style::default().fg(if row.audible { Color::Green } else { Color::DarkGray }),
        )),
    ]
}

fn status_span(status: &GenerationStatus, blink_on: bool) -> Span<'static> {
    match status {
        GenerationStatus::Working(label) => Span::styled(
            label.to_string(),
            Style::default().fg(if blink_on { Color::Yellow } else { Color::DarkGray }),
        ),
        GenerationStatus::Failed(error) => {
            Span::styled(format!("failed: {error}"), Style::default().fg(Color::Red))
        }
    }
}

fn draw_prompt(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let (title, line) = match &ts.prompt {
        Some((prompt, buffer)) => (
            format!(" {} (enter to submit, esc to leave) ", prompt.label()),
            Line::from(vec![Span::raw(buffer.clone()), Span::styled("█", Style::default().fg(Color::White))]),
        ),
        None => {
            let mut spans = Vec::new();
            if let Some(link) = &state.share_link {
                spans.push(Span::styled(link.clone(), Style::default().fg(Color::Cyan)));
            }
            let history = match (state.can_undo, state.can_redo) {
                (true, true) => "  undo/redo",
                (true, false) => "  undo",
                (false, true) => "  redo",
                (false, false) => "",
            };
            spans.push(Span::styled(history, Style::default().fg(Color::DarkGray)));
            (" status ".to_string(), Line::from(spans))
        }
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    frame.render_widget(Paragraph::new(line).block(block), area);
}
