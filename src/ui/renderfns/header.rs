use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, server, signed-in user and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  user: Option<&str>,
  shortcuts: &[ShortcutInfo],
) {
  let user_span = match user {
    Some(name) => Span::styled(format!(" {} ", name), Style::default().fg(Color::Yellow).bold()),
    None => Span::styled(" anonymous ", Style::default().fg(Color::DarkGray)),
  };

  let mut spans = vec![
    Span::styled(" eventadmin ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    user_span,
    Span::raw(" "),
  ];

  let mut shortcuts: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  shortcuts.sort_by_key(|s| s.priority);
  for shortcut in shortcuts {
    // Keys and brackets highlighted, descriptions dimmed
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}
