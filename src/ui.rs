use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{
        Block, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState,
        Table, TableState, Wrap,
    },
};

use crate::domain::CMDMode;
use crate::model::{LOGIN_TITLE, Model, UIData};

pub const TITLE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const CMDLINE_HEIGH: usize = 2; // Status line and command line
pub const SCROLLBAR_WIDTH: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 2;

const LOGIN_WIDTH: u16 = 48;
const LOGIN_HEIGHT: u16 = 8;
const USERNAME_LABEL: &str = "Username: ";
const PASSWORD_LABEL: &str = "Password: ";

#[derive(Default)]
pub struct TableUI {
    table_state: TableState,
}

impl TableUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [title_area, main_area, status_area, cmd_area] = Layout::vertical([
            Constraint::Length(TITLE_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length((CMDLINE_HEIGH - 1) as u16),
        ])
        .areas(frame.area());

        frame.render_widget(
            Paragraph::new(Line::from(format!(" {} ", uidata.name).bold())).centered(),
            title_area,
        );
        if uidata.login {
            self.render_login(uidata, main_area, frame);
        } else {
            self.render_table(uidata, main_area, frame);
        }
        self.render_statusline(uidata, status_area, frame);
        self.render_cmdline(uidata, cmd_area, frame);
        if uidata.show_popup {
            self.render_popup(uidata, frame);
        }
    }

    fn render_login(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let area = centered_rect(area, LOGIN_WIDTH, LOGIN_HEIGHT);
        let block = Block::bordered()
            .title(Line::from(format!(" {LOGIN_TITLE} ")).centered())
            .title_bottom(Line::from(" <Enter> next  <Tab> switch  <Esc> quit ").centered())
            .border_set(border::THICK);
        let inner = block.inner(area);

        let (username, password, row) = match uidata.cmd_mode {
            Some(CMDMode::Password) => (
                uidata.login_user.clone(),
                "*".repeat(uidata.cmdinput.input.chars().count()),
                2,
            ),
            _ => (uidata.cmdinput.input.clone(), String::new(), 1),
        };
        let text = vec![
            Line::default(),
            Line::from(vec![USERNAME_LABEL.into(), username.yellow()]),
            Line::from(vec![PASSWORD_LABEL.into(), password.yellow()]),
        ];

        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(text).block(block), area);
        frame.set_cursor_position((
            inner.x + (USERNAME_LABEL.len() + uidata.cmdinput.curser_pos) as u16,
            inner.y + row,
        ));
    }

    fn render_table(&mut self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let [table_area, scrollbar_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(SCROLLBAR_WIDTH as u16),
        ])
        .areas(area);

        let mut widths = Vec::new();
        let mut header = Vec::new();
        if uidata.show_index {
            widths.push(Constraint::Length(uidata.index.width as u16));
            header.push(Cell::from("#"));
        }
        for column in uidata.table.iter() {
            widths.push(Constraint::Length(column.width as u16));
            header.push(Cell::from(column.name.clone()));
        }

        let index_style = Style::new().fg(Color::DarkGray);
        let selected_style = Style::new().add_modifier(Modifier::REVERSED);
        let rows: Vec<Row> = (0..uidata.index.data.len())
            .map(|ridx| {
                let mut cells = Vec::with_capacity(widths.len());
                if uidata.show_index {
                    cells.push(Cell::from(uidata.index.data[ridx].clone()).style(index_style));
                }
                for (cidx, column) in uidata.table.iter().enumerate() {
                    let cell = Cell::from(column.data[ridx].clone());
                    if ridx == uidata.selected_row && cidx == uidata.selected_column {
                        cells.push(cell.style(selected_style));
                    } else {
                        cells.push(cell);
                    }
                }
                Row::new(cells)
            })
            .collect();

        let table = Table::new(rows, widths)
            .header(Row::new(header).style(Style::new().add_modifier(Modifier::BOLD).fg(Color::Cyan)))
            .column_spacing(1)
            .row_highlight_style(Style::new().bg(Color::DarkGray));

        if uidata.index.data.is_empty() {
            self.table_state.select(None);
        } else {
            self.table_state.select(Some(uidata.selected_row));
        }
        // Rows are already sliced by the model
        *self.table_state.offset_mut() = 0;
        frame.render_stateful_widget(table, table_area, &mut self.table_state);

        let mut scrollbar_state = ScrollbarState::new(uidata.nrows).position(uidata.abs_selected_row);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None),
            scrollbar_area,
            &mut scrollbar_state,
        );
    }

    fn render_statusline(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let [message_area, count_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(40),
        ])
        .areas(area);

        frame.render_widget(Paragraph::new(uidata.status_message.as_str()), message_area);
        if !uidata.login {
            let mut spans = vec![Span::from(format!(
                "{}/{} records",
                uidata.nrows, uidata.total_rows
            ))];
            if let Some(filter) = &uidata.filter {
                spans.push(Span::from(format!(" [{filter}]")).yellow());
            }
            frame.render_widget(Paragraph::new(Line::from(spans)).right_aligned(), count_area);
        }
    }

    fn render_cmdline(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        if uidata.active_cmdinput && uidata.cmd_mode == Some(CMDMode::Search) {
            let line = Line::from(vec!["/".blue().bold(), uidata.cmdinput.input.as_str().into()]);
            frame.render_widget(Paragraph::new(line), area);
            frame.set_cursor_position((area.x + 1 + uidata.cmdinput.curser_pos as u16, area.y));
        } else if !uidata.login {
            let line = Line::from(vec![
                " Search ".into(),
                "</>".blue().bold(),
                " Details ".into(),
                "<Enter>".blue().bold(),
                " Refresh ".into(),
                "<r>".blue().bold(),
                " Logout ".into(),
                "<L>".blue().bold(),
                " Help ".into(),
                "<?>".blue().bold(),
                " Quit ".into(),
                "<q>".blue().bold(),
            ]);
            frame.render_widget(Paragraph::new(line), area);
        }
    }

    fn render_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let [area] = Layout::vertical([Constraint::Percentage(60)])
            .flex(Flex::Center)
            .areas(frame.area());
        let [area] = Layout::horizontal([Constraint::Percentage(60)])
            .flex(Flex::Center)
            .areas(area);

        let block = Block::bordered()
            .title(Line::from(format!(" {} ", uidata.popup_title)).centered())
            .title_bottom(Line::from(" <Esc> close ").centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(uidata.popup_message.as_str())
                .block(block)
                .wrap(Wrap { trim: false }),
            area,
        );
    }
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    area
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::FixedCredentials;
    use crate::domain::{Message, TVConfig};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::path::Path;

    fn render(model: &Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let mut ui = TableUI::new();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn fixture_model() -> Model {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/crime_records.csv");
        let config = TVConfig::default().path(path);
        Model::init(&config, Box::new(FixedCredentials::demo()), 80, 24)
    }

    fn type_line(model: &mut Model, s: &str) {
        for c in s.chars() {
            model.update(Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)));
        }
        model.update(Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
    }

    #[test]
    fn renders_login_form() {
        let mut model = fixture_model();
        type_line(&mut model, "police");
        for c in "123".chars() {
            model.update(Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)));
        }
        let screen = render(&model);
        assert!(screen.contains(LOGIN_TITLE));
        assert!(screen.contains("Username: police"));
        assert!(screen.contains("Password: ***"));
        assert!(!screen.contains("123"));
    }

    #[test]
    fn renders_table_after_login() {
        let mut model = fixture_model();
        type_line(&mut model, "police");
        type_line(&mut model, "12345");
        let screen = render(&model);
        assert!(screen.contains("Logged in as: police"));
        assert!(screen.contains("Case_ID"));
        assert!(screen.contains("C001"));
    }

    #[test]
    fn renders_record_popup() {
        let mut model = fixture_model();
        type_line(&mut model, "police");
        type_line(&mut model, "12345");
        model.update(Message::Enter);
        let screen = render(&model);
        assert!(screen.contains("Record Details"));
        assert!(screen.contains("Case_ID: C001"));
    }
}
