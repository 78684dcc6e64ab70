use crate::modal::Modal;
use crate::styles;
use crate::transcript::MessageView;
use anyhow::Result;
use parlor_common::Role;
use parlor_markup::{Content, MarkupNode, MarkupTree, Tag};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Flex, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use std::io::Stdout;
use std::ops::Range;
use textwrap::wrap;

pub const GREETING: &str = "How can I assist you today?";
const ENTER_PROMPT: &str = "Press Enter to start";

type Styled = (String, Style);

pub enum Screen {
    Intro { slogan: String, ready: bool },
    Chat(ChatSnap),
}

pub struct ChatSnap {
    pub input: String,
    pub input_cursor: usize,
    pub messages: Vec<MessageView>,
    pub scroll: usize,
    pub sending: bool,
    pub typing: bool,
    pub spinner: &'static str,
    pub endpoint: String,
    pub modals: Vec<Modal>,
    pub notice: Option<String>,
}

/// Draw one frame. Returns the largest scroll offset the transcript can use
/// at the current size.
pub fn draw(term: &mut Terminal<CrosstermBackend<Stdout>>, screen: &Screen) -> Result<usize> {
    let mut max_scroll = 0;
    term.draw(|frame| match screen {
        Screen::Intro { slogan, ready } => draw_intro(frame, slogan, *ready),
        Screen::Chat(snap) => max_scroll = draw_chat(frame, snap),
    })?;
    Ok(max_scroll)
}

fn draw_intro(frame: &mut Frame, slogan: &str, ready: bool) {
    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(3),
        Constraint::Fill(1),
    ])
    .areas(frame.area());

    let mut lines = vec![
        Line::from(Span::styled(slogan.to_string(), styles::slogan())),
        Line::default(),
    ];
    if ready {
        lines.push(Line::from(Span::styled(ENTER_PROMPT, styles::dim())));
    }
    let body = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(body, middle);
}

fn draw_chat(frame: &mut Frame, snap: &ChatSnap) -> usize {
    let area = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    // Header
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " Parlor ",
            Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {}", snap.endpoint), styles::dim()),
    ]));
    frame.render_widget(header, layout[0]);

    // Transcript window
    let block = Block::default().borders(Borders::ALL).title(" Chat ");
    let mut max_scroll = 0;
    if snap.messages.is_empty() {
        let inner = block.inner(layout[1]);
        frame.render_widget(block, layout[1]);
        let [_, row, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Fill(1),
        ])
        .areas(inner);
        let greeting = Paragraph::new(Span::styled(GREETING, styles::greeting()))
            .alignment(Alignment::Center);
        frame.render_widget(greeting, row);
    } else {
        let visible_h = layout[1].height.saturating_sub(2) as usize;
        let content_width = layout[1].width.saturating_sub(2) as usize;
        let wrapped = transcript_lines(&snap.messages, content_width);
        max_scroll = wrapped.len().saturating_sub(visible_h);

        let items: Vec<ListItem> = wrapped[visible_rows(wrapped.len(), visible_h, snap.scroll)]
            .iter()
            .map(|spans| {
                let line = Line::from(
                    spans
                        .iter()
                        .map(|(text, style)| Span::styled(text.clone(), *style))
                        .collect::<Vec<_>>(),
                );
                ListItem::new(line)
            })
            .collect();
        frame.render_widget(List::new(items).block(block), layout[1]);
    }

    // Input box
    let input_box = Paragraph::new(snap.input.clone())
        .block(Block::default().borders(Borders::ALL).title(" Message "));
    frame.render_widget(Clear, layout[2]);
    frame.render_widget(input_box, layout[2]);

    if snap.modals.is_empty() {
        let caret_x = layout[2].x + 1 + visual_caret_col(&snap.input, snap.input_cursor);
        let caret_y = layout[2].y + 1;
        frame.set_cursor_position(Position {
            x: caret_x,
            y: caret_y,
        });
    }

    // Status bar
    let (label, color) = match (snap.sending, snap.typing) {
        (true, _) => ("Waiting for reply…", Color::Yellow),
        (false, true) => ("Typing…", Color::LightMagenta),
        (false, false) => ("Ready", Color::Green),
    };
    let mut status = vec![
        Span::raw(" "),
        Span::styled(snap.spinner, Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        Span::styled(label, Style::default().fg(color)),
        Span::styled("  •  /help for commands", styles::dim()),
    ];
    if let Some(notice) = &snap.notice {
        status.push(Span::raw("  •  "));
        status.push(Span::styled(notice.clone(), styles::error()));
    }
    let status = Paragraph::new(Line::from(status))
        .block(Block::default().borders(Borders::ALL).title(" Status "));
    frame.render_widget(status, layout[3]);

    for modal in &snap.modals {
        draw_modal(frame, *modal);
    }
    max_scroll
}

/// Rows of a bottom-anchored window `scroll` rows up from the newest line.
/// Offsets past the top hold at the first screenful.
fn visible_rows(total: usize, height: usize, scroll: usize) -> Range<usize> {
    let end = total - scroll.min(total.saturating_sub(height));
    end.saturating_sub(height)..end
}

fn draw_modal(frame: &mut Frame, modal: Modal) {
    let body = modal.body();
    let height = body.len() as u16 + 4;
    let area = centered(frame.area(), 56, height);

    let mut lines: Vec<Line> = body
        .iter()
        .map(|l| Line::from(Span::styled(*l, styles::value())))
        .collect();
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(modal.hint(), styles::dim())));

    let popup = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(styles::modal_border())
                .title(Span::styled(modal.title(), styles::label())),
        );
    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    cell
}

fn visual_caret_col(input: &str, cursor: usize) -> u16 {
    use unicode_width::UnicodeWidthStr;
    UnicodeWidthStr::width(&input[..cursor]) as u16
}

/// Every message as wrapped, styled rows, with a blank row after each.
pub fn transcript_lines(messages: &[MessageView], width: usize) -> Vec<Vec<Styled>> {
    let body_width = width.saturating_sub(2).max(1);
    let mut out = Vec::new();

    for message in messages {
        let header_style = match message.role {
            Role::User => styles::user_header(),
            Role::Bot => styles::bot_header(),
        };
        out.push(vec![
            (message.role.label().to_string(), header_style),
            (format!("  {}", message.rendered_at), styles::timestamp()),
        ]);

        let rows = match (&message.content, message.role) {
            (Content::Text(text), role) => text_rows(text, text_style(role)),
            (Content::Markup(tree), _) => markup_rows(tree),
        };
        for row in rows {
            if row.is_empty() {
                out.push(Vec::new());
                continue;
            }
            for wrapped in wrap_spans(&row, body_width) {
                let mut line = vec![("  ".to_string(), Style::default())];
                line.extend(wrapped);
                out.push(line);
            }
        }
        out.push(Vec::new());
    }
    out
}

fn text_style(role: Role) -> Style {
    match role {
        Role::User => styles::user_text(),
        Role::Bot => styles::bot_text(),
    }
}

fn text_rows(text: &str, style: Style) -> Vec<Vec<Styled>> {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                Vec::new()
            } else {
                vec![(line.to_string(), style)]
            }
        })
        .collect()
}

/// Lay a markup tree out as logical rows: `<br>` ends a row, each `<li>`
/// gets its own bulleted row, `<strong>` text is bold.
pub fn markup_rows(tree: &MarkupTree) -> Vec<Vec<Styled>> {
    let mut rows = vec![Vec::new()];
    for node in &tree.nodes {
        push_node(node, styles::bot_text(), &mut rows);
    }
    if rows.last().is_some_and(Vec::is_empty) && rows.len() > 1 {
        rows.pop();
    }
    rows
}

fn push_node(node: &MarkupNode, style: Style, rows: &mut Vec<Vec<Styled>>) {
    match node {
        MarkupNode::Text(text) => {
            if let Some(row) = rows.last_mut() {
                row.push((text.clone(), style));
            }
        }
        MarkupNode::Element { tag, children, .. } => match tag {
            Tag::Br => rows.push(Vec::new()),
            Tag::Strong => {
                let bold = style.add_modifier(Modifier::BOLD);
                for child in children {
                    push_node(child, bold, rows);
                }
            }
            Tag::Li => {
                start_row(rows);
                if let Some(row) = rows.last_mut() {
                    row.push(("• ".to_string(), styles::label()));
                }
                for child in children {
                    push_node(child, style, rows);
                }
            }
            Tag::Ul => {
                start_row(rows);
                for child in children {
                    push_node(child, style, rows);
                }
            }
            Tag::Div => {
                for child in children {
                    push_node(child, style, rows);
                }
            }
        },
    }
}

fn start_row(rows: &mut Vec<Vec<Styled>>) {
    if rows.last().is_some_and(|r| !r.is_empty()) {
        rows.push(Vec::new());
    }
}

/// Wrap a styled row to `width`, keeping each span's style on the pieces it
/// is split into.
pub fn wrap_spans(spans: &[Styled], width: usize) -> Vec<Vec<Styled>> {
    let joined: String = spans.iter().map(|(t, _)| t.as_str()).collect();
    if joined.is_empty() {
        return vec![Vec::new()];
    }

    let mut bounds = Vec::with_capacity(spans.len());
    let mut at = 0;
    for (text, style) in spans {
        bounds.push((at, at + text.len(), *style));
        at += text.len();
    }

    let mut cursor = 0;
    let mut out = Vec::new();
    for segment in wrap(&joined, width.max(1)) {
        let Some(found) = joined[cursor..].find(segment.as_ref()) else {
            out.push(vec![(segment.into_owned(), Style::default())]);
            continue;
        };
        let start = cursor + found;
        let end = start + segment.len();
        cursor = end;

        let line = bounds
            .iter()
            .filter_map(|&(s, e, style)| {
                let (a, b) = (s.max(start), e.min(end));
                (a < b).then(|| (joined[a..b].to_string(), style))
            })
            .collect();
        out.push(line);
    }
    out
}
