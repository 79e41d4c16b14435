use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, TVConfig, TVError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TVError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    self.handle_key(key, model.raw_keyevents())
                }
                Event::Resize(width, height) => {
                    Some(Message::Resize(width as usize, height as usize))
                }
                _ => None,
            });
        }
        Ok(None)
    }

    fn handle_key(&self, key: KeyEvent, raw: bool) -> Option<Message> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Message::Quit);
        }
        // Text inputs get every key
        if raw {
            return Some(Message::RawKey(key));
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::Home | KeyCode::Char('g') => Some(Message::MoveBeginning),
            KeyCode::End | KeyCode::Char('G') => Some(Message::MoveEnd),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('c') => Some(Message::ClearSearch),
            KeyCode::Char('r') => Some(Message::Refresh),
            KeyCode::Char('L') => Some(Message::Logout),
            KeyCode::Char('y') => Some(Message::CopyCell),
            KeyCode::Char('Y') => Some(Message::CopyRow),
            KeyCode::Char('i') => Some(Message::ToggleIndex),
            KeyCode::Char('?') => Some(Message::Help),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn maps_table_keys() {
        let controller = Controller::new(&TVConfig::default());
        assert_eq!(controller.handle_key(key(KeyCode::Char('q')), false), Some(Message::Quit));
        assert_eq!(controller.handle_key(key(KeyCode::Char('/')), false), Some(Message::Search));
        assert_eq!(controller.handle_key(key(KeyCode::Enter), false), Some(Message::Enter));
        assert_eq!(controller.handle_key(key(KeyCode::Char('r')), false), Some(Message::Refresh));
        assert_eq!(controller.handle_key(key(KeyCode::Char('x')), false), None);
    }

    #[test]
    fn raw_mode_forwards_keys() {
        let controller = Controller::new(&TVConfig::default());
        let q = key(KeyCode::Char('q'));
        assert_eq!(controller.handle_key(q, true), Some(Message::RawKey(q)));
    }

    #[test]
    fn ctrl_c_always_quits() {
        let controller = Controller::new(&TVConfig::default());
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(controller.handle_key(ctrl_c, true), Some(Message::Quit));
        assert_eq!(controller.handle_key(ctrl_c, false), Some(Message::Quit));
    }
}
