//! Outcome pane rendering

use crate::executor::{DiagnosticKind, ExecutionOutcome};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

/// Pane title and accent color for an outcome
pub(crate) fn outcome_label(outcome: &ExecutionOutcome) -> (&'static str, Color) {
    match outcome {
        ExecutionOutcome::Value(_) => (" Value ", DEFAULT_THEME.success),
        ExecutionOutcome::Output(_) => (" Output ", DEFAULT_THEME.primary),
        ExecutionOutcome::Error(diagnostic) => match diagnostic.kind {
            DiagnosticKind::Timeout => (" Timeout ", DEFAULT_THEME.warning),
            DiagnosticKind::Syntax => (" Syntax Error ", DEFAULT_THEME.error),
            DiagnosticKind::Runtime => (" Error ", DEFAULT_THEME.error),
            DiagnosticKind::Internal => (" Internal Error ", DEFAULT_THEME.error),
        },
    }
}

/// Render the outcome pane
pub fn render_outcome_pane(
    frame: &mut Frame,
    area: Rect,
    outcome: &ExecutionOutcome,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let (title, accent) = outcome_label(outcome);
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(title)
        .title_style(Style::default().fg(accent).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(border_style);

    let text = outcome.text();
    if text.is_empty() {
        let paragraph = Paragraph::new("(no output)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let content_style = if outcome.is_error() {
        Style::default().fg(accent)
    } else {
        Style::default().fg(DEFAULT_THEME.fg)
    };
    let lines: Vec<&str> = text.lines().collect();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    if lines.len() > visible_height {
        *scroll_offset = (*scroll_offset).min(lines.len() - visible_height);
    } else {
        *scroll_offset = 0;
    }

    let items: Vec<ListItem> = lines
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|line| ListItem::new(line.to_string()).style(content_style))
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}
