use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::config::ColorConfig;
use crate::feed::FeedState;
use crate::tui::app::{ActivePane, TuiApp};

pub fn render(frame: &mut Frame, app: &mut TuiApp, colors: &ColorConfig) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Navigation bar
            Constraint::Min(8),    // Body
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_navbar(frame, app, chunks[0], colors);

    if app.session.is_loading {
        render_centered(frame, chunks[1], Text::from("Restoring session..."));
    } else if app.session.is_signed_in() {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[1]);

        render_form(frame, app, columns[0], colors);
        render_bookmarks_pane(frame, app, columns[1], colors);
    } else {
        render_landing(frame, app, chunks[1], colors);
    }

    render_status_bar(frame, app, chunks[2], colors);
}

fn render_navbar(frame: &mut Frame, app: &TuiApp, area: Rect, colors: &ColorConfig) {
    let brand = Span::styled(
        " SmartMarks ",
        Style::default()
            .fg(colors.brand)
            .add_modifier(Modifier::BOLD),
    );

    let account = match &app.session.identity {
        _ if app.session.is_loading => Span::raw(""),
        Some(identity) => Span::styled(
            format!("{}  ", identity.display_name()),
            Style::default().fg(colors.bookmark_host),
        ),
        None if app.is_signing_in => Span::styled(
            "Signing in...  ",
            Style::default().fg(colors.placeholder),
        ),
        None => Span::styled("[l] Sign in  ", Style::default().fg(colors.button)),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.inactive_border));
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(block.inner(area));
    frame.render_widget(block, area);

    frame.render_widget(Paragraph::new(Line::from(brand)), halves[0]);
    frame.render_widget(
        Paragraph::new(Line::from(account)).alignment(Alignment::Right),
        halves[1],
    );
}

fn render_landing(frame: &mut Frame, app: &TuiApp, area: Rect, colors: &ColorConfig) {
    let action = if app.is_signing_in {
        Line::from(Span::styled(
            "Finish signing in in your browser...",
            Style::default().fg(colors.placeholder),
        ))
    } else {
        Line::from(vec![
            Span::raw("Press "),
            Span::styled(
                "l",
                Style::default()
                    .fg(colors.button)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" to sign in"),
        ])
    };

    let text = Text::from(vec![
        Line::from(Span::styled(
            "Your bookmarks, everywhere.",
            Style::default()
                .fg(colors.brand)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Save links from any device and watch them appear"),
        Line::from("everywhere else you are signed in."),
        Line::from(""),
        action,
    ]);

    render_centered(frame, area, text);
}

fn render_centered(frame: &mut Frame, area: Rect, text: Text) {
    let height = text.height() as u16;
    let top = area.height.saturating_sub(height) / 2;
    let inner = Rect {
        y: area.y + top,
        height: height.min(area.height),
        ..area
    };

    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        inner,
    );
}

fn render_form(frame: &mut Frame, app: &TuiApp, area: Rect, colors: &ColorConfig) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // URL
            Constraint::Length(1), // Button
            Constraint::Min(0),
        ])
        .split(area);

    render_input(
        frame,
        rows[0],
        " Title ",
        &app.form.title,
        "My favourite docs",
        app.active_pane == ActivePane::Title,
        colors,
    );
    render_input(
        frame,
        rows[1],
        " URL ",
        &app.form.url,
        "https://example.com",
        app.active_pane == ActivePane::Url,
        colors,
    );

    let button = if app.form.is_submitting() {
        Span::styled(
            " Adding... ",
            Style::default().fg(colors.button_disabled),
        )
    } else {
        Span::styled(
            " [Enter] Add Bookmark ",
            Style::default()
                .fg(colors.selection_fg)
                .bg(colors.button)
                .add_modifier(Modifier::BOLD),
        )
    };
    frame.render_widget(
        Paragraph::new(Line::from(button)).alignment(Alignment::Center),
        rows[2],
    );
}

fn render_input(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    value: &str,
    placeholder: &str,
    is_active: bool,
    colors: &ColorConfig,
) {
    let border_style = if is_active {
        Style::default().fg(colors.active_border)
    } else {
        Style::default().fg(colors.inactive_border)
    };

    let content = if value.is_empty() {
        Span::styled(placeholder, Style::default().fg(colors.placeholder))
    } else {
        Span::raw(value)
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);
    let inner = block.inner(area);

    // Keep the end of long input visible
    let width = inner.width.saturating_sub(1) as usize;
    let chars = value.chars().count();
    let scroll = u16::try_from(chars.saturating_sub(width)).unwrap_or(u16::MAX);

    frame.render_widget(
        Paragraph::new(Line::from(content))
            .block(block)
            .scroll((0, scroll)),
        area,
    );

    if is_active {
        let offset = u16::try_from(chars)
            .unwrap_or(u16::MAX)
            .saturating_sub(scroll)
            .min(inner.width);
        frame.set_cursor_position((inner.x.saturating_add(offset), inner.y));
    }
}

fn render_bookmarks_pane(frame: &mut Frame, app: &mut TuiApp, area: Rect, colors: &ColorConfig) {
    let is_active = app.active_pane == ActivePane::Bookmarks;
    let border_style = if is_active {
        Style::default().fg(colors.active_border)
    } else {
        Style::default().fg(colors.inactive_border)
    };

    let count = app.bookmarks().len();
    let title = if count > 0 {
        format!(
            " Bookmarks ({}) [{}/{}] ",
            count,
            app.bookmark_index + 1,
            count
        )
    } else {
        " Bookmarks ".to_string()
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let message = match &app.feed {
        None | Some(FeedState::Loading) => Some(Text::from(Span::styled(
            "Loading bookmarks...",
            Style::default().fg(colors.placeholder),
        ))),
        Some(FeedState::Error(message)) => Some(Text::from(vec![
            Line::from(Span::styled(
                format!("Could not load bookmarks: {}", message),
                Style::default().fg(colors.error),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press R to try again",
                Style::default().fg(colors.placeholder),
            )),
        ])),
        Some(FeedState::Ready(list)) if list.is_empty() => Some(Text::from(Span::styled(
            "No bookmarks yet. Add your first one!",
            Style::default().fg(colors.placeholder),
        ))),
        Some(FeedState::Ready(_)) => None,
    };

    if let Some(message) = message {
        frame.render_widget(
            Paragraph::new(message)
                .block(block)
                .wrap(Wrap { trim: true }),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = app
        .bookmarks()
        .iter()
        .map(|bookmark| {
            ListItem::new(vec![
                Line::from(Span::styled(
                    bookmark.title.clone(),
                    Style::default()
                        .fg(colors.bookmark_title)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(vec![
                    Span::styled(
                        bookmark.hostname(),
                        Style::default().fg(colors.bookmark_host),
                    ),
                    Span::raw("  "),
                    Span::styled(
                        bookmark.created_at.format("%Y-%m-%d").to_string(),
                        Style::default().fg(colors.bookmark_date),
                    ),
                ]),
            ])
        })
        .collect();

    let highlight_style = if is_active {
        Style::default()
            .bg(colors.selection_bg)
            .fg(colors.selection_fg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style)
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.bookmark_list_state);
}

fn render_status_bar(frame: &mut Frame, app: &TuiApp, area: Rect, colors: &ColorConfig) {
    let mut style = Style::default().fg(colors.status_fg).bg(colors.status_bg);

    let status = if let Some(bookmark) = &app.pending_delete {
        format!("Delete \"{}\"? (y/n)", bookmark.title)
    } else if let Some(status) = &app.status {
        if status.is_error {
            style = style.fg(colors.error);
        }
        status.text.clone()
    } else if app.session.is_loading {
        "q:Quit".to_string()
    } else if !app.session.is_signed_in() {
        "l:Sign in  q:Quit".to_string()
    } else if app.active_pane.is_input() {
        "Type to edit  Tab:Next field  Enter:Add  Esc:List  Ctrl+c:Quit".to_string()
    } else {
        "j/k:Nav  n/p:Page  Tab:Pane  Enter/o:Open  d:Delete  R:Reload  L:Sign out  q:Quit"
            .to_string()
    };

    frame.render_widget(Paragraph::new(status).style(style), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Identity;
    use crate::session::SessionState;
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &mut TuiApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        let colors = ColorConfig::default();
        terminal.draw(|frame| render(frame, app, &colors)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn session(identity: Option<Identity>, is_loading: bool) -> SessionState {
        SessionState {
            identity,
            is_loading,
        }
    }

    #[test]
    fn test_loading_session_hides_views() {
        let mut app = TuiApp::new(session(None, true));
        let screen = draw(&mut app);
        assert!(screen.contains("Restoring session..."));
        assert!(!screen.contains("Sign in"));
    }

    #[test]
    fn test_landing_offers_sign_in() {
        let mut app = TuiApp::new(session(None, false));
        let screen = draw(&mut app);
        assert!(screen.contains("Your bookmarks, everywhere."));
        assert!(screen.contains("[l] Sign in"));
    }

    #[test]
    fn test_signed_in_view_shows_form_and_empty_feed() {
        let identity = Identity::new("u1").with_email("ada@example.com");
        let mut app = TuiApp::new(session(Some(identity), false));
        app.set_feed(Some(FeedState::Ready(Default::default())));
        let screen = draw(&mut app);
        assert!(screen.contains("ada@example.com"));
        assert!(screen.contains("Add Bookmark"));
        assert!(screen.contains("No bookmarks yet. Add your first one!"));
    }

    #[test]
    fn test_feed_error_is_shown() {
        let mut app = TuiApp::new(session(Some(Identity::new("u1")), false));
        app.set_feed(Some(FeedState::Error("offline".into())));
        let screen = draw(&mut app);
        assert!(screen.contains("Could not load bookmarks: offline"));
    }

    #[test]
    fn test_very_long_input_keeps_cursor_in_the_field() {
        let mut app = TuiApp::new(session(Some(Identity::new("u1")), false));
        app.set_feed(Some(FeedState::Ready(Default::default())));
        app.form.url = "x".repeat(70_000);
        app.active_pane = ActivePane::Url;

        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        let colors = ColorConfig::default();
        terminal.draw(|frame| render(frame, &mut app, &colors)).unwrap();

        let cursor = terminal.get_cursor_position().unwrap();
        // The form takes the left 40 columns.
        assert!(cursor.x < 40, "cursor escaped the field: {:?}", cursor);
    }
}
