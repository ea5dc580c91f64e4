//! Source pane rendering with syntax highlighting
//!
//! Shows the snippet with line numbers and a light tokenizer for keywords,
//! strings, numbers and comments. The line a diagnostic is attributed to is
//! drawn on a red background with a marker in the gutter.

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "break", "class", "continue", "def", "del", "elif", "else", "except",
    "finally", "for", "from", "global", "if", "import", "in", "is", "lambda", "nonlocal", "not",
    "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

fn word_style(word: &str, is_call: bool) -> Style {
    if KEYWORDS.contains(&word) {
        Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD)
    } else if matches!(word, "True" | "False" | "None") {
        Style::default().fg(DEFAULT_THEME.constant)
    } else if word.starts_with(|c: char| c.is_ascii_digit()) {
        Style::default().fg(DEFAULT_THEME.number)
    } else if is_call {
        Style::default().fg(DEFAULT_THEME.function)
    } else {
        Style::default().fg(DEFAULT_THEME.fg)
    }
}

/// Split one source line into styled spans
pub(crate) fn highlight_line(line: &str) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut word = String::new();
    let mut chars = line.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '#' {
            flush_word(&mut spans, &mut word, false);
            spans.push(Span::styled(
                line[i..].to_string(),
                Style::default().fg(DEFAULT_THEME.comment),
            ));
            return spans;
        }

        if c == '\'' || c == '"' {
            flush_word(&mut spans, &mut word, false);
            let mut end = line.len();
            let mut escaped = false;
            for (j, next) in chars.by_ref() {
                if escaped {
                    escaped = false;
                } else if next == '\\' {
                    escaped = true;
                } else if next == c {
                    end = j + next.len_utf8();
                    break;
                }
            }
            spans.push(Span::styled(
                line[i..end].to_string(),
                Style::default().fg(DEFAULT_THEME.string),
            ));
            continue;
        }

        if c.is_alphanumeric() || c == '_' || (c == '.' && word.starts_with(|d: char| d.is_ascii_digit())) {
            word.push(c);
            continue;
        }

        flush_word(&mut spans, &mut word, c == '(');
        let style = match c {
            '(' | ')' | '[' | ']' | '{' | '}' => Style::default().fg(DEFAULT_THEME.primary),
            _ => Style::default().fg(DEFAULT_THEME.fg),
        };
        spans.push(Span::styled(c.to_string(), style));
    }

    flush_word(&mut spans, &mut word, false);
    spans
}

fn flush_word(spans: &mut Vec<Span<'static>>, word: &mut String, is_call: bool) {
    if !word.is_empty() {
        let style = word_style(word, is_call);
        spans.push(Span::styled(std::mem::take(word), style));
    }
}

/// Render the source pane. `error_line` is 1-based.
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    source: &str,
    error_line: Option<usize>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Snippet ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let lines: Vec<&str> = source.lines().collect();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    if lines.len() > visible_height {
        *scroll_offset = (*scroll_offset).min(lines.len() - visible_height);
    } else {
        *scroll_offset = 0;
    }

    let visible: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|(idx, text)| {
            let line_num = idx + 1;
            let mut spans = highlight_line(text);

            if error_line == Some(line_num) {
                for span in &mut spans {
                    span.style = span
                        .style
                        .bg(DEFAULT_THEME.error_line_bg)
                        .add_modifier(Modifier::BOLD);
                }
                spans.insert(
                    0,
                    Span::styled(
                        format!("{:>4} ▶ ", line_num),
                        Style::default()
                            .fg(DEFAULT_THEME.error)
                            .add_modifier(Modifier::BOLD),
                    ),
                );
            } else {
                spans.insert(
                    0,
                    Span::styled(
                        format!("{:>4}   ", line_num),
                        Style::default().fg(DEFAULT_THEME.comment),
                    ),
                );
            }
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(visible).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &str) -> Vec<String> {
        highlight_line(line)
            .into_iter()
            .map(|span| span.content.into_owned())
            .collect()
    }

    #[test]
    fn test_highlight_keeps_all_text() {
        let line = "for i in range(3): print('a # b')  # done";
        assert_eq!(texts(line).concat(), line);
    }

    #[test]
    fn test_highlight_splits_strings_and_comments() {
        let spans = texts("x = 'it\\'s'  # note");
        assert!(spans.contains(&"'it\\'s'".to_string()));
        assert_eq!(spans.last().map(String::as_str), Some("# note"));
    }

    #[test]
    fn test_unterminated_string_runs_to_end() {
        assert_eq!(texts("s = \"abc").last().map(String::as_str), Some("\"abc"));
    }

    #[test]
    fn test_float_literal_is_one_token() {
        assert!(texts("y = 3.25").contains(&"3.25".to_string()));
    }
}
