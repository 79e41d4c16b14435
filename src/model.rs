use arboard::Clipboard;
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::auth::Authenticator;
use crate::domain::{CMDMode, HELP_TEXT, Message, TVConfig};
use crate::inputter::{InputResult, Inputter};
use crate::session::Session;
use crate::ui::{
    CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, SCROLLBAR_WIDTH, TABLE_HEADER_HEIGHT, TITLE_HEIGHT,
};

pub const LOGIN_TITLE: &str = "Login - Crime Records System";

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    LOGIN,
    TABLE,
    RECORD,
    POPUP,
    CMDINPUT,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

impl ColumnView {
    fn empty() -> Self {
        ColumnView {
            name: "".to_string(),
            width: 0,
            data: Vec::new(),
        }
    }
}

/// Everything the ui needs to render one frame.
pub struct UIData {
    pub name: String,
    pub login: bool,
    pub login_user: String,
    pub table: Vec<ColumnView>,
    pub index: ColumnView,
    pub show_index: bool,
    pub nrows: usize, // Rows passing the filter
    pub total_rows: usize,
    pub filter: Option<String>,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub show_popup: bool,
    pub popup_title: String,
    pub popup_message: String,
    pub layout: UILayout,
    pub last_update: Instant,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            login: false,
            login_user: String::new(),
            table: Vec::new(),
            index: ColumnView::empty(),
            show_index: false,
            nrows: 0,
            total_rows: 0,
            filter: None,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            show_popup: false,
            popup_title: String::new(),
            popup_message: String::new(),
            layout: UILayout::default(),
            last_update: Instant::now(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
    pub index_width: usize,
    pub statusline_width: usize,
    pub statusline_height: usize,
}

impl UILayout {
    pub fn from_values(index_width: usize, ui_width: usize, ui_height: usize) -> Self {
        let table_width = ui_width
            .saturating_sub(SCROLLBAR_WIDTH)
            .saturating_sub(index_width);
        let table_height = ui_height
            .saturating_sub(TITLE_HEIGHT)
            .saturating_sub(TABLE_HEADER_HEIGHT)
            .saturating_sub(CMDLINE_HEIGH);

        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width,
            table_height,
            index_width,
            statusline_width: ui_width,
            statusline_height: CMDLINE_HEIGH,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: TVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    authenticator: Box<dyn Authenticator>,
    user: Option<String>,
    login_user: String,
    session: Option<Session>,
    column_widths: Vec<usize>,
    visible_columns: Vec<usize>,
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    show_index: bool,
    record_idx: usize, // View row shown in the record popup
    popup_title: String,
    popup_message: String,
    uilayout: UILayout,
    uidata: UIData,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(
        config: &TVConfig,
        authenticator: Box<dyn Authenticator>,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::LOGIN,
            previous_modus: Modus::LOGIN,
            authenticator,
            user: None,
            login_user: String::new(),
            session: None,
            column_widths: Vec::new(),
            visible_columns: Vec::new(),
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            offset_column: 0,
            show_index: false,
            record_idx: 0,
            popup_title: String::new(),
            popup_message: String::new(),
            uilayout: UILayout::from_values(0, ui_width, ui_height),
            uidata: UIData::empty(),
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: "Please log in.".to_string(),
            last_status_message_update: Instant::now(),
        };
        model.enter_login();
        model.update_table_data();
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Message) {
        // Raw keys may be password characters, never log them
        if !matches!(message, Message::RawKey(_)) {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, message);
        }
        match self.modus {
            Modus::LOGIN | Modus::CMDINPUT => match message {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Quit => self.quit(),
                _ => (),
            },
            Modus::TABLE => match message {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_table_selection_up(1),
                Message::MoveDown => self.move_table_selection_down(1),
                Message::MoveLeft => self.move_table_selection_left(),
                Message::MoveRight => self.move_table_selection_right(),
                Message::MovePageUp => self.move_table_selection_up(self.uilayout.table_height),
                Message::MovePageDown => {
                    self.move_table_selection_down(self.uilayout.table_height)
                }
                Message::MoveBeginning => self.select_row(0),
                Message::MoveEnd => self.select_row(self.row_count().saturating_sub(1)),
                Message::Enter => self.show_record(self.selected_row()),
                Message::Exit => {
                    // Esc drops an active filter, there is no other way out of the table
                    if self.has_filter() {
                        self.apply_filter("");
                    }
                }
                Message::Search => self.enter_cmd_mode(CMDMode::Search),
                Message::ClearSearch => self.apply_filter(""),
                Message::Refresh => self.refresh(),
                Message::Logout => self.logout(),
                Message::CopyCell => self.copy_table_cell(),
                Message::CopyRow => self.copy_record(self.selected_row()),
                Message::ToggleIndex => self.toggle_table_index(),
                Message::Help => self.show_popup("Help", HELP_TEXT),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::RawKey(_) => (),
            },
            Modus::RECORD => match message {
                Message::Quit => self.quit(),
                Message::Exit | Message::Enter => self.close_popup(),
                Message::MoveLeft | Message::MoveUp => self.previous_record(),
                Message::MoveRight | Message::MoveDown => self.next_record(),
                Message::CopyRow => self.copy_record(self.record_idx),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::POPUP => match message {
                Message::Quit => self.quit(),
                Message::Exit | Message::Enter => self.close_popup(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        self.update_table_data();
    }

    // -------------------- Login handling ---------------------- //

    fn enter_login(&mut self) {
        self.modus = Modus::LOGIN;
        self.previous_modus = Modus::LOGIN;
        self.login_user.clear();
        self.start_input(CMDMode::Username);
    }

    fn start_input(&mut self, mode: CMDMode) {
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.clear();
        self.last_input = self.input.get();
    }

    fn stop_input(&mut self) {
        self.cmd_mode = None;
        self.active_cmdinput = false;
        self.input.clear();
        self.last_input = self.input.get();
    }

    fn switch_login_field(&mut self) {
        match self.cmd_mode {
            Some(CMDMode::Username) => {
                self.login_user = self.last_input.input.clone();
                self.start_input(CMDMode::Password);
            }
            Some(CMDMode::Password) => {
                self.start_input(CMDMode::Username);
                self.input.set(&self.login_user);
                self.last_input = self.input.get();
            }
            _ => (),
        }
    }

    fn login(&mut self, password: &str) {
        let username = self.login_user.trim().to_string();
        if !self.authenticator.authenticate(&username, password) {
            warn!("Failed login for user \"{username}\"");
            self.set_status_message("Invalid credentials! Try again.");
            self.start_input(CMDMode::Password);
            return;
        }

        info!("User \"{username}\" logged in");
        self.user = Some(username);
        self.stop_input();
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::LOGIN;

        // Every login starts with a fresh session
        let mut session = Session::new(self.config.path.clone(), self.config.parse_options());
        let result = session.refresh();
        self.session = Some(session);
        self.reset_table_state();
        match result {
            Ok(table) => {
                let message = format!(
                    "Loaded {} records from {}",
                    table.nrows(),
                    self.config.path.display()
                );
                self.set_status_message(message);
            }
            Err(e) => {
                self.set_status_message("No data loaded.");
                self.show_popup("File Error", &format!("Error loading CSV: {e}"));
            }
        }
    }

    fn logout(&mut self) {
        info!("User {:?} logged out", self.user);
        self.user = None;
        self.session = None;
        self.reset_table_state();
        self.enter_login();
        self.set_status_message("Logged out.");
    }

    // -------------------- Control handling functions ---------------------- //

    fn raw_input(&mut self, key: KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        if self.modus == Modus::LOGIN && key.code == KeyCode::Tab {
            self.switch_login_field();
            return;
        }
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.handle_cmd_input();
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.start_input(mode);
        if let Some(filter) = self.current_filter() {
            self.input.set(&filter);
            self.last_input = self.input.get();
        }
    }

    fn handle_cmd_input(&mut self) {
        let input = self.last_input.clone();
        trace!("Handle cmd input in {:?}", self.cmd_mode);

        match self.cmd_mode {
            Some(CMDMode::Username) => {
                if input.canceled {
                    self.quit();
                } else {
                    self.login_user = input.input;
                    self.start_input(CMDMode::Password);
                }
            }
            Some(CMDMode::Password) => {
                if input.canceled {
                    self.quit();
                } else {
                    self.login(&input.input);
                }
            }
            Some(CMDMode::Search) => {
                self.stop_input();
                self.modus = self.previous_modus;
                self.previous_modus = Modus::CMDINPUT;
                if !input.canceled {
                    self.apply_filter(&input.input);
                }
            }
            None => {
                info!("Cmd mode is none!")
            }
        }
    }

    fn apply_filter(&mut self, term: &str) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let start_time = Instant::now();
        session.set_filter(term);
        let nrows = session.row_count();
        debug!(
            "Filter {:?} matched {} rows in {}ms",
            term,
            nrows,
            start_time.elapsed().as_millis()
        );
        let message = match session.view().filter_text() {
            Some(text) => format!("Found {nrows} records matching \"{text}\""),
            None => format!("Showing all {nrows} records"),
        };
        self.set_status_message(message);
        self.select_row(0);
    }

    fn refresh(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.refresh() {
            Ok(table) => {
                let nrows = table.nrows();
                self.reset_table_state();
                self.set_status_message(format!("Reloaded {nrows} records"));
            }
            Err(e) => {
                error!("Refresh failed: {e}");
                self.show_popup("File Error", &format!("Error refreshing CSV: {e}"));
            }
        }
    }

    fn show_popup(&mut self, title: &str, message: &str) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup_title = title.to_string();
        self.popup_message = message.to_string();
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        let closing = self.modus;
        self.modus = match self.previous_modus {
            Modus::POPUP | Modus::RECORD => Modus::TABLE,
            m => m,
        };
        self.previous_modus = closing;
    }

    fn show_record(&mut self, view_row: usize) {
        let Some(session) = &self.session else {
            return;
        };
        match session.detail_of(view_row) {
            Ok(record) => {
                self.popup_title = format!(
                    "Record Details [{}/{}]",
                    view_row + 1,
                    session.row_count()
                );
                self.popup_message = record.to_string();
                self.record_idx = view_row;
                if self.modus != Modus::RECORD {
                    self.previous_modus = self.modus;
                    self.modus = Modus::RECORD;
                }
            }
            Err(e) => error!("No record to show: {e}"),
        }
    }

    fn previous_record(&mut self) {
        if self.record_idx > 0 {
            self.select_row(self.record_idx - 1);
            self.show_record(self.record_idx - 1);
        }
    }

    fn next_record(&mut self) {
        if self.record_idx + 1 < self.row_count() {
            self.select_row(self.record_idx + 1);
            self.show_record(self.record_idx + 1);
        }
    }

    fn copy_table_cell(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let column = self.offset_column + self.curser_column;
        let cell = match session.cell_at(self.selected_row(), column) {
            Ok(cell) => cell.to_string(),
            Err(e) => {
                error!("Cannot copy cell: {e}");
                return;
            }
        };
        trace!("Cell content: {}", cell);
        self.set_clipboard(cell);
    }

    fn copy_record(&mut self, view_row: usize) {
        let Some(session) = &self.session else {
            return;
        };
        match session.detail_of(view_row) {
            Ok(record) => self.set_clipboard(record.to_csv_line()),
            Err(e) => error!("Cannot copy record: {e}"),
        }
    }

    fn set_clipboard(&mut self, content: String) {
        match Clipboard::new().and_then(|mut c| c.set_text(content)) {
            Ok(_) => {
                trace!("Copied content to clipboard.");
                self.set_status_message("Copied to clipboard.");
            }
            Err(e) => {
                error!("Error copying to clipboard: {:?}", e);
                self.set_status_message(format!("Copying failed: {e}"));
            }
        }
    }

    fn toggle_table_index(&mut self) {
        self.show_index = !self.show_index;
        self.update_layout(self.uilayout.width, self.uilayout.height);
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.update_layout(width, height);
        self.select_row(self.selected_row());
    }

    // -------------------- Table state ---------------------- //

    fn row_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.row_count())
    }

    fn current_filter(&self) -> Option<String> {
        self.session
            .as_ref()
            .and_then(|s| s.view().filter_text())
            .map(str::to_string)
    }

    fn has_filter(&self) -> bool {
        self.current_filter().is_some()
    }

    fn selected_row(&self) -> usize {
        self.offset_row + self.curser_row
    }

    fn update_layout(&mut self, width: usize, height: usize) {
        let index_width = if self.show_index {
            // Widest row number plus a spacer
            let nrows = self.session.as_ref().map_or(0, |s| s.view().table().nrows());
            nrows.max(1).to_string().len() + 1
        } else {
            0
        };
        self.uilayout = UILayout::from_values(index_width, width, height);
    }

    fn reset_table_state(&mut self) {
        self.curser_row = 0;
        self.curser_column = 0;
        self.offset_row = 0;
        self.offset_column = 0;
        self.record_idx = 0;
        self.calculate_column_widths();
        self.update_layout(self.uilayout.width, self.uilayout.height);
    }

    fn calculate_column_widths(&mut self) {
        let max_column_width = self.config.max_column_width.max(1);
        self.column_widths = match &self.session {
            None => Vec::new(),
            Some(session) => {
                let table = session.view().table();
                table
                    .columns()
                    .iter()
                    .enumerate()
                    .map(|(cidx, name)| {
                        let longest = table
                            .rows()
                            .iter()
                            .map(|r| r[cidx].chars().count())
                            .max()
                            .unwrap_or(0);
                        let width = name.chars().count().max(longest) + COLUMN_WIDTH_MARGIN;
                        width.min(max_column_width)
                    })
                    .collect()
            }
        };
        debug!("Column widths: {:?}", self.column_widths);
    }

    /// Keeps `row` (a view row) inside the visible window.
    fn select_row(&mut self, row: usize) {
        let nrows = self.row_count();
        if nrows == 0 {
            self.offset_row = 0;
            self.curser_row = 0;
            return;
        }
        let row = row.min(nrows - 1);
        let height = self.uilayout.table_height.max(1);
        if row < self.offset_row {
            self.offset_row = row;
        } else if row >= self.offset_row + height {
            self.offset_row = row + 1 - height;
        }
        self.curser_row = row - self.offset_row;
    }

    fn move_table_selection_up(&mut self, size: usize) {
        self.select_row(self.selected_row().saturating_sub(size.max(1)));
    }

    fn move_table_selection_down(&mut self, size: usize) {
        self.select_row(self.selected_row() + size.max(1));
    }

    fn move_table_selection_left(&mut self) {
        if self.curser_column > 0 {
            self.curser_column -= 1;
        } else if self.offset_column > 0 {
            self.offset_column -= 1;
        }
    }

    fn move_table_selection_right(&mut self) {
        if self.offset_column + self.curser_column + 1 < self.column_widths.len() {
            if self.curser_column + 1 < self.visible_columns.len() {
                // In the middle
                self.curser_column += 1;
            } else {
                // At the end of the screen
                self.offset_column += 1;
            }
        }
    }

    fn get_visible_name(name: &str, width: usize) -> String {
        if width < 3 {
            return "".to_string();
        }
        if name.chars().count() > width {
            let mut reduced_name: String = name.chars().take(width - 3).collect();
            reduced_name.push_str("...");
            reduced_name
        } else {
            name.to_string()
        }
    }

    fn update_table_data(&mut self) {
        let mut table_data = Vec::new();
        let mut index = ColumnView::empty();
        self.visible_columns.clear();

        if let Some(session) = &self.session {
            let view = session.view();
            let table = view.table();

            // Create a list of columns that fit in the table, the last one may be cut
            let mut widths = Vec::new();
            let mut visible_width = 0;
            for (cidx, &width) in self.column_widths.iter().enumerate().skip(self.offset_column) {
                if visible_width + width + 1 <= self.uilayout.table_width {
                    widths.push(width);
                    self.visible_columns.push(cidx);
                    visible_width += width + 1;
                } else {
                    if visible_width < self.uilayout.table_width {
                        widths.push(self.uilayout.table_width - visible_width);
                        self.visible_columns.push(cidx);
                    }
                    break;
                }
            }
            self.curser_column = self
                .curser_column
                .min(self.visible_columns.len().saturating_sub(1));

            let rbegin = self.offset_row.min(view.row_count());
            let rend = (rbegin + self.uilayout.table_height).min(view.row_count());
            let rows = &view.indices()[rbegin..rend];

            for (&cidx, &width) in self.visible_columns.iter().zip(widths.iter()) {
                table_data.push(ColumnView {
                    name: Self::get_visible_name(&table.columns()[cidx], width),
                    width,
                    data: rows.iter().map(|&ridx| table.rows()[ridx][cidx].clone()).collect(),
                });
            }

            let data: Vec<String> = rows.iter().map(|idx| (idx + 1).to_string()).collect();
            index = ColumnView {
                name: "".to_string(),
                width: self.uilayout.index_width.saturating_sub(1),
                data,
            };
        }

        self.update_uidata(table_data, index);
    }

    fn update_uidata(&mut self, table: Vec<ColumnView>, index: ColumnView) {
        let (nrows, total_rows, filter) = match &self.session {
            Some(s) => (
                s.row_count(),
                s.view().table().nrows(),
                s.view().filter_text().map(str::to_string),
            ),
            None => (0, 0, None),
        };
        let name = match &self.user {
            Some(user) => format!("Crime Records Management - Logged in as: {user}"),
            None => LOGIN_TITLE.to_string(),
        };
        let show_popup = matches!(self.modus, Modus::POPUP | Modus::RECORD);

        self.uidata = UIData {
            name,
            login: self.modus == Modus::LOGIN,
            login_user: self.login_user.clone(),
            table,
            index,
            show_index: self.show_index,
            nrows,
            total_rows,
            filter,
            selected_row: self.curser_row,
            selected_column: self.curser_column,
            abs_selected_row: self.selected_row(),
            show_popup,
            popup_title: self.popup_title.clone(),
            popup_message: self.popup_message.clone(),
            layout: self.uilayout.clone(),
            last_update: Instant::now(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }
}
