use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use randuser_core::utils::{format_optional, truncate_string};
use randuser_core::{DetailState, User};

use crate::app::{App, AppState, FilterField};

use super::styles;

/// Placeholder for missing field values
const PLACEHOLDER: &str = "-";

/// Maximum name width in the list before truncating
const MAX_NAME_WIDTH: usize = 28;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::EditingFilter => render_filter_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  randuser";
    let filter = format!("filter: {}", app.filter().label());
    let help_hint = "[?] Help";

    let used = title.len() + filter.len() + help_hint.len() + 6;
    let gap = (area.width as usize).saturating_sub(used) / 2;

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(gap)),
        Span::styled(filter, styles::highlight_style()),
        Span::raw(" ".repeat(gap)),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_user_table(frame, app, chunks[0]);
    render_user_detail(frame, app, chunks[1]);
}

fn render_user_table(frame: &mut Frame, app: &App, area: Rect) {
    let users = &app.list_state.users;

    let header = Row::new([
        Cell::from("Name"),
        Cell::from("Gender"),
        Cell::from("Nat"),
        Cell::from("Born"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = users
        .iter()
        .map(|user| {
            let gender = user.gender.as_deref();
            Row::new(vec![
                Cell::from(truncate_string(user.display_name(), MAX_NAME_WIDTH)),
                Cell::from(format_optional(gender, PLACEHOLDER)).style(styles::gender_style(gender)),
                Cell::from(format_optional(user.nat.as_deref(), PLACEHOLDER)),
                Cell::from(user.dob.clone()),
            ])
            .style(styles::list_item_style())
        })
        .collect();

    let widths = [
        Constraint::Fill(3),   // Name
        Constraint::Length(7), // Gender
        Constraint::Length(4), // Nat
        Constraint::Length(11), // Born
    ];

    let title = if app.list_state.is_loading_more {
        format!(" Users ({}) - fetching... ", users.len())
    } else {
        format!(" Users ({}) - [a]dd [d]elete [r]eload ", users.len())
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    if !users.is_empty() {
        state.select(Some(app.selection));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_user_detail(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Details ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let lines = match &app.detail_state {
        None => empty_detail_lines(app),
        Some(DetailState::Loading) => vec![Line::from(Span::styled("Loading...", styles::muted_style()))],
        Some(DetailState::Found(user)) => detail_lines(user),
        Some(DetailState::NotFound) => vec![Line::from(Span::styled(
            "User no longer in the cache",
            styles::muted_style(),
        ))],
        Some(DetailState::Error(err)) => vec![Line::from(Span::styled(
            err.to_string(),
            styles::error_style(),
        ))],
    };

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn empty_detail_lines(app: &App) -> Vec<Line<'static>> {
    let hint = if app.is_offline() {
        "No cached users. Offline mode is on."
    } else {
        "No users yet. Press [a] to add one."
    };
    vec![Line::from(Span::styled(hint, styles::muted_style()))]
}

fn field(label: &'static str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(label, styles::muted_style()),
        Span::raw(value),
    ])
}

fn detail_lines(user: &User) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(user.display_name().to_string(), styles::title_style())),
        Line::from(""),
        Line::from(Span::styled("Basic Info", styles::highlight_style())),
    ];

    let born = match user.age.as_deref() {
        Some(age) => format!("{} (age {})", user.dob, age),
        None => user.dob.clone(),
    };
    lines.push(field("Born:     ", born));
    lines.push(field("Gender:   ", format_optional(user.gender.as_deref(), PLACEHOLDER)));
    lines.push(field("Nat:      ", format_optional(user.nat.as_deref(), PLACEHOLDER)));
    lines.push(field("Location: ", format_optional(user.location.as_deref(), PLACEHOLDER)));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Contact", styles::highlight_style())));
    lines.push(field("Email:    ", format_optional(user.email.as_deref(), PLACEHOLDER)));
    lines.push(field("Phone:    ", format_optional(user.phone.as_deref(), PLACEHOLDER)));

    if let Some(picture) = user.picture.as_deref() {
        lines.push(Line::from(""));
        lines.push(field("Picture:  ", picture.to_string()));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(user.uid.clone(), styles::muted_style())));
    lines
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = "[f]ilter | [q]uit";

    let (left_text, left_style) = if let Some(toast) = app.toast() {
        (format!(" {} ", toast), styles::error_style())
    } else if app.list_state.is_loading_more {
        (" Fetching users... ".to_string(), styles::highlight_style())
    } else if let Some(ref msg) = app.status_message {
        (format!(" {} ", msg), styles::success_style())
    } else {
        let updated = app.cache.age_display().unwrap_or_else(|| "never".to_string());
        (format!(" Updated {} ", updated), styles::muted_style())
    };

    let right_text = if app.is_offline() {
        format!(" OFFLINE | {} ", shortcuts)
    } else {
        format!(" {} ", shortcuts)
    };

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(key, styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(44, 18, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  randuser", styles::title_style())),
        Line::from(Span::styled(format!("  version {}", version), styles::muted_style())),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("  ↑/↓ j/k   ", "Move selection"),
        help_line("  PgUp/PgDn ", "Scroll a page"),
        help_line("  Home/End  ", "First / last user"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        help_line("  a         ", "Add a random user"),
        help_line("  d / Del   ", "Delete selected user"),
        help_line("  r         ", "Reload from cache"),
        help_line("  f         ", "Change filter (new list)"),
        help_line("  Esc       ", "Dismiss message"),
        help_line("  q         ", "Quit"),
        Line::from(""),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_filter_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(40, 10, frame.area());
    frame.render_widget(Clear, area);

    let form = &app.filter_form;
    let field_style = |f: FilterField| {
        if form.focus == f {
            styles::selected_style()
        } else {
            styles::list_item_style()
        }
    };
    let gender = form.gender.map(|g| g.as_str()).unwrap_or("any");
    let nationality = form.nationality_code().unwrap_or("any");

    let lines = vec![
        Line::from(Span::styled("  New list", styles::title_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Gender:      ", styles::muted_style()),
            Span::styled(format!("◀ {:^6} ▶", gender), field_style(FilterField::Gender)),
        ]),
        Line::from(vec![
            Span::styled("  Nationality: ", styles::muted_style()),
            Span::styled(format!("◀ {:^6} ▶", nationality), field_style(FilterField::Nationality)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Tab", styles::help_key_style()),
            Span::styled(" field  ", styles::muted_style()),
            Span::styled("←/→", styles::help_key_style()),
            Span::styled(" change", styles::muted_style()),
        ]),
        Line::from(vec![
            Span::styled("  Enter", styles::help_key_style()),
            Span::styled(" start  ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(40, 6, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
