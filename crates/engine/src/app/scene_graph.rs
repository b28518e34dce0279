use std::fmt;

use tracing::debug;

use super::input::InputRouter;
use super::window_manager::WindowManager;
use super::TickInfo;

const TICK_PHASES: [char; 4] = ['|', '/', '-', '\\'];

pub type FrameSubscriber = Box<dyn FnMut(&str)>;

/// Builds the full text frame each tick and notifies subscribers only when it
/// differs from the previous one.
pub struct SceneGraph {
    title: String,
    show_status_line: bool,
    last_frame: String,
    frames_emitted: u64,
    subscribers: Vec<FrameSubscriber>,
}

impl SceneGraph {
    pub fn new(title: impl Into<String>, show_status_line: bool) -> Self {
        Self {
            title: title.into(),
            show_status_line,
            last_frame: String::new(),
            frames_emitted: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&str) + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn last_frame(&self) -> &str {
        &self.last_frame
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Forgets the last frame so the next tick always notifies.
    pub fn invalidate(&mut self) {
        self.last_frame.clear();
    }

    /// Returns `true` when a new frame was published.
    pub fn on_tick(
        &mut self,
        tick: TickInfo,
        pre_render: &str,
        windows: &mut WindowManager,
        input: &InputRouter,
    ) -> bool {
        let frame = self.compose(tick, pre_render, windows, input);
        self.publish(frame)
    }

    pub(crate) fn compose(
        &self,
        tick: TickInfo,
        pre_render: &str,
        windows: &mut WindowManager,
        input: &InputRouter,
    ) -> String {
        let mut frame = String::new();
        if self.show_status_line {
            frame.push_str(&self.status_line(tick, windows));
            frame.push('\n');
        }
        push_block(&mut frame, pre_render);
        push_block(&mut frame, &windows.render_focused());

        if windows.accepting_input() {
            let prompt = windows.prompt_text().unwrap_or_default();
            if windows.input_fills_buffer() {
                frame.push_str(&format!("{prompt} {}", input.buffer()));
            } else {
                frame.push_str(&prompt);
            }
        }
        frame
    }

    fn status_line(&self, tick: TickInfo, windows: &WindowManager) -> String {
        let phase = TICK_PHASES[(tick.logic_tick % TICK_PHASES.len() as u64) as usize];
        let window = windows
            .focused()
            .map_or_else(|| "none".to_string(), |window| window.key().to_string());
        let form = windows
            .focused()
            .and_then(|window| window.current_form())
            .map_or_else(|| "none".to_string(), |form| form.to_string());
        format!("{} {phase} | window: {window} | form: {form}", self.title)
    }

    fn publish(&mut self, frame: String) -> bool {
        if frames_match(&self.last_frame, &frame) {
            return false;
        }
        self.last_frame = frame;
        self.frames_emitted = self.frames_emitted.saturating_add(1);
        debug!(
            frame_bytes = self.last_frame.len(),
            frames_emitted = self.frames_emitted,
            "frame_changed"
        );
        for subscriber in &mut self.subscribers {
            subscriber(&self.last_frame);
        }
        true
    }
}

impl fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneGraph")
            .field("title", &self.title)
            .field("show_status_line", &self.show_status_line)
            .field("frames_emitted", &self.frames_emitted)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

fn push_block(frame: &mut String, block: &str) {
    if block.is_empty() {
        return;
    }
    frame.push_str(block);
    if !block.ends_with('\n') {
        frame.push('\n');
    }
}

fn frames_match(previous: &str, next: &str) -> bool {
    previous.to_lowercase() == next.to_lowercase()
}
