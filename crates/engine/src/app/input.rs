use std::collections::VecDeque;

use tracing::warn;

use super::TickInfo;

pub const DEFAULT_MAX_INPUT_CHARS: usize = 256;
pub const DEFAULT_MAX_QUEUED_COMMANDS: usize = 64;

/// Line buffer fed by the host keystroke surface, plus a queue of scripted
/// lines that are released on the next tick.
#[derive(Debug)]
pub struct InputRouter {
    buffer: String,
    max_chars: usize,
    queued: VecDeque<String>,
    max_queued: usize,
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INPUT_CHARS, DEFAULT_MAX_QUEUED_COMMANDS)
    }
}

impl InputRouter {
    pub fn new(max_chars: usize, max_queued: usize) -> Self {
        Self {
            buffer: String::new(),
            max_chars: max_chars.max(1),
            queued: VecDeque::new(),
            max_queued: max_queued.max(1),
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// Appends a printable character. Control characters and overflow past
    /// the configured length are dropped.
    pub fn add_char(&mut self, ch: char) -> bool {
        if ch.is_control() || self.buffer.chars().count() >= self.max_chars {
            return false;
        }
        self.buffer.push(ch);
        true
    }

    pub fn remove_last_char(&mut self) {
        self.buffer.pop();
    }

    /// Empties the buffer and returns its trimmed content, if any.
    pub fn take_line(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    pub fn queue_command(&mut self, line: impl Into<String>) {
        let line = line.into();
        if line.trim().is_empty() {
            return;
        }
        if self.queued.len() == self.max_queued {
            if let Some(dropped) = self.queued.pop_front() {
                warn!(dropped = dropped.as_str(), "command_queue_full");
            }
        }
        self.queued.push_back(line);
    }

    /// Releases queued lines in submission order.
    pub fn on_tick(&mut self, _tick: TickInfo) -> Vec<String> {
        self.queued.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.queued.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_and_backspace_edit_the_buffer() {
        let mut input = InputRouter::default();
        for ch in "rest".chars() {
            assert!(input.add_char(ch));
        }
        input.remove_last_char();

        assert_eq!(input.buffer(), "res");
    }

    #[test]
    fn backspace_on_empty_buffer_is_a_no_op() {
        let mut input = InputRouter::default();
        input.remove_last_char();

        assert_eq!(input.buffer(), "");
    }

    #[test]
    fn control_characters_and_overflow_are_dropped() {
        let mut input = InputRouter::new(3, 4);

        assert!(!input.add_char('\n'));
        assert!(!input.add_char('\u{8}'));
        for ch in "abcd".chars() {
            input.add_char(ch);
        }

        assert_eq!(input.buffer(), "abc");
    }

    #[test]
    fn take_line_clears_even_when_blank() {
        let mut input = InputRouter::default();
        assert_eq!(input.take_line(), None);

        input.add_char(' ');
        assert_eq!(input.take_line(), None);
        assert_eq!(input.buffer(), "");

        for ch in " 2 ".chars() {
            input.add_char(ch);
        }
        assert_eq!(input.take_line(), Some("2".to_string()));
        assert_eq!(input.buffer(), "");
    }

    #[test]
    fn queued_commands_release_in_order_and_stay_bounded() {
        let mut input = InputRouter::new(16, 2);
        input.queue_command("1");
        input.queue_command("   ");
        input.queue_command("2");
        input.queue_command("3");

        assert_eq!(input.queued_len(), 2);
        assert_eq!(input.on_tick(TickInfo::default()), vec!["2", "3"]);
        assert!(input.on_tick(TickInfo::default()).is_empty());
    }
}
