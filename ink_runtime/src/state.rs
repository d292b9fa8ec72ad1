//! Mutable per-playthrough state.

use ink_model::{Address, ContainerFlags, ContainerId};
use std::collections::HashMap;

use crate::choice::Choice;
use crate::value::{Scope, Value};

/// Everything that changes while a story runs.
///
/// Visit counts record *prior* visits: a container's first entry stores `0`
/// and each later entry adds one. A container is "visited" once it has an
/// entry at all.
#[derive(Debug, Clone)]
pub struct StoryState {
    pub globals: HashMap<String, Value>,
    /// Temporary variables, one map per call frame. The first map belongs to
    /// the top level of the story and is never popped.
    pub temporaries: Vec<HashMap<String, Value>>,
    /// Choices generated since the last selection.
    pub choices: Vec<Choice>,
    pub visit_counts: HashMap<ContainerId, u32>,
    /// Turn index at which each container was last entered.
    pub last_turn: HashMap<ContainerId, u32>,
    pub turn: u32,
    /// Text flushed by the most recent step.
    pub text: String,
    /// Tags flushed by the most recent step.
    pub tags: Vec<String>,
    pub done: bool,
    pub finished: bool,
}

impl Default for StoryState {
    fn default() -> Self {
        Self {
            globals: HashMap::new(),
            temporaries: vec![HashMap::new()],
            choices: Vec::new(),
            visit_counts: HashMap::new(),
            last_turn: HashMap::new(),
            turn: 1,
            text: String::new(),
            tags: Vec::new(),
            done: false,
            finished: false,
        }
    }
}

impl StoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether another step may run.
    pub fn can_continue(&self) -> bool {
        !self.finished && !(self.done && !self.choices.is_empty())
    }

    /// Choices the player should see.
    ///
    /// Invisible defaults are hidden whenever a regular choice exists; when
    /// only defaults are pending they are all returned.
    pub fn visible_choices(&self) -> Vec<&Choice> {
        if self.choices.iter().all(|choice| choice.is_fallback) {
            return self.choices.iter().collect();
        }
        self.choices
            .iter()
            .filter(|choice| !choice.is_fallback)
            .collect()
    }

    /// Update visit and turn bookkeeping for entering a container.
    pub fn record_container(&mut self, address: Address, flags: ContainerFlags) {
        let container = address.container;
        if flags.record_visits() && (!flags.count_start_only() || address.index == 0) {
            self.visit_counts
                .entry(container)
                .and_modify(|count| *count += 1)
                .or_insert(0);
        }
        if flags.record_turns() {
            self.last_turn.insert(container, self.turn);
        }
    }

    pub fn visit_count(&self, container: ContainerId) -> u32 {
        self.visit_counts.get(&container).copied().unwrap_or(0)
    }

    pub fn has_visited(&self, container: ContainerId) -> bool {
        self.visit_counts.contains_key(&container)
    }

    /// Turns elapsed since the container was last entered, or `-1` if never.
    pub fn turns_since(&self, container: ContainerId) -> i64 {
        self.last_turn
            .get(&container)
            .map(|last| i64::from(self.turn) - i64::from(*last))
            .unwrap_or(-1)
    }

    /// Index of the innermost call frame's temporaries.
    pub fn current_frame(&self) -> usize {
        self.temporaries.len().saturating_sub(1)
    }

    pub fn temporary(&self, name: &str) -> Option<&Value> {
        self.temporaries.last().and_then(|frame| frame.get(name))
    }

    pub fn set_temporary(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.temporaries.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Look a variable up by name: temporaries shadow globals.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.temporary(name).or_else(|| self.globals.get(name))
    }

    /// Read the variable a pointer refers to.
    pub fn read_scoped(&self, name: &str, scope: Scope) -> Option<&Value> {
        match scope {
            Scope::Global => self.globals.get(name),
            Scope::Frame(frame) => self.temporaries.get(frame).and_then(|vars| vars.get(name)),
        }
    }

    /// Write through a pointer. Writes to a popped frame are dropped.
    pub fn write_scoped(&mut self, name: &str, scope: Scope, value: Value) {
        match scope {
            Scope::Global => {
                self.globals.insert(name.to_owned(), value);
            }
            Scope::Frame(frame) => match self.temporaries.get_mut(frame) {
                Some(vars) => {
                    vars.insert(name.to_owned(), value);
                }
                None => tracing::warn!(name, frame, "Pointer outlived its call frame"),
            },
        }
    }

    pub fn push_frame(&mut self) {
        self.temporaries.push(HashMap::new());
    }

    /// Drop the innermost frame's temporaries. The base frame stays.
    pub fn pop_frame(&mut self) {
        if self.temporaries.len() > 1 {
            self.temporaries.pop();
        }
    }
}
