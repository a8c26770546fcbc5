//! A scripted `Story` test double: chunks are pushed in and drained in
//! order, exactly the way a real interpreter would stream `Continue()`
//! output. Shared via `Arc<Mutex<_>>` so a test can keep feeding it chunks
//! after the runtime has already been handed a boxed clone.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use convo_core::ChatId;
use convo_state::{Choice, Chunk, Story};
use serde_json::Value;

#[derive(Default)]
struct ScriptedStoryState {
    queue: VecDeque<Chunk>,
    choices: Vec<Choice>,
    awaiting_data: bool,
    turn: u32,
}

#[derive(Clone, Default)]
pub struct ScriptedStory(Arc<Mutex<ScriptedStoryState>>);

impl ScriptedStory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_chunks(&self, chunks: impl IntoIterator<Item = Chunk>) {
        self.0.lock().unwrap().queue.extend(chunks);
    }

    pub fn set_choices(&self, choices: Vec<Choice>) {
        self.0.lock().unwrap().choices = choices;
    }

    pub fn mark_awaiting_data(&self) {
        self.0.lock().unwrap().awaiting_data = true;
    }
}

impl Story for ScriptedStory {
    fn can_continue(&self) -> bool {
        !self.0.lock().unwrap().queue.is_empty()
    }

    fn continue_chunk(&mut self) -> Result<Chunk, String> {
        let mut state = self.0.lock().unwrap();
        state.turn += 1;
        state.queue.pop_front().ok_or_else(|| "no chunk queued".to_string())
    }

    fn current_choices(&self) -> Vec<Choice> {
        let state = self.0.lock().unwrap();
        if state.queue.is_empty() {
            state.choices.clone()
        } else {
            Vec::new()
        }
    }

    fn choose_choice_index(&mut self, index: usize) -> Result<(), String> {
        let mut state = self.0.lock().unwrap();
        if index >= state.choices.len() {
            return Err(format!("no choice at index {index}"));
        }
        state.choices.clear();
        Ok(())
    }

    fn current_chat_variable(&self) -> Option<String> {
        None
    }

    fn is_awaiting_data(&self) -> bool {
        self.0.lock().unwrap().awaiting_data
    }

    fn clear_awaiting_data(&mut self) {
        self.0.lock().unwrap().awaiting_data = false;
    }

    fn current_path_string(&self) -> Option<String> {
        None
    }

    fn current_path_visit_count(&self) -> u32 {
        0
    }

    fn turn_index(&self) -> u32 {
        self.0.lock().unwrap().turn
    }

    fn is_ending_path(&self) -> bool {
        false
    }

    fn save_state(&self) -> Value {
        serde_json::json!({ "turn": self.0.lock().unwrap().turn })
    }

    fn load_state(&mut self, _state: Value) -> Result<(), String> {
        Ok(())
    }
}

pub fn chunk(text: &str, tags: &[&str]) -> Chunk {
    Chunk {
        text: text.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn choice(index: usize, text: &str, target_chat: &str) -> Choice {
    Choice {
        index,
        text: text.to_string(),
        target_chat: Some(ChatId::from(target_chat)),
    }
}
