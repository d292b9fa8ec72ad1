//! The story machine: loads a compiled story and steps through it.

mod visit;

use ink_model::{Address, Ink, ListCatalog, LoadError, Path, GLOBAL_DECLARATIONS};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::choice::Choice;
use crate::config::StoryConfig;
use crate::error::StoryError;
use crate::external::{ExternalFunctions, ExternalValue};
use crate::mode::Mode;
use crate::output::{clean_output, OutputBuffer};
use crate::stack::EvaluationStack;
use crate::state::StoryState;
use crate::value::Value;

/// Unique identifier for a running story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoryId(pub Uuid);

impl StoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Text and tags produced by a run of steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryOutput {
    pub text: String,
    pub tags: Vec<String>,
}

/// Why a call frame was pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Function,
    Tunnel,
}

/// Where to go back to when a function or tunnel returns.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallFrame {
    /// Function frames hold the item after the call; tunnel frames hold the
    /// tunnel divert itself.
    return_to: Address,
    mode: Mode,
    kind: FrameKind,
}

impl CallFrame {
    fn resume_address(&self) -> Address {
        match self.kind {
            FrameKind::Function => self.return_to,
            FrameKind::Tunnel => self.return_to.next(),
        }
    }
}

/// A playthrough of a compiled story.
///
/// The compiled tree is shared and never mutated; everything that changes
/// while playing lives in the story itself.
#[derive(Debug)]
pub struct Story {
    id: StoryId,
    ink: Arc<Ink>,
    lists: ListCatalog,
    config: StoryConfig,
    rng: StdRng,
    state: StoryState,
    stack: EvaluationStack,
    output: OutputBuffer,
    /// Tags captured since the last flush.
    pending_tags: Vec<String>,
    mode: Mode,
    /// Output length at each open string capture.
    string_marks: Vec<usize>,
    /// Mode to return to and output length at each open tag.
    tag_marks: Vec<(Mode, usize)>,
    call_stack: Vec<CallFrame>,
    address: Address,
    externals: ExternalFunctions,
}

impl Story {
    /// Create a story with the default configuration.
    pub fn new(ink: impl Into<Arc<Ink>>) -> Self {
        Self::with_config(ink, StoryConfig::default())
    }

    pub fn with_config(ink: impl Into<Arc<Ink>>, config: StoryConfig) -> Self {
        let ink = ink.into();
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let lists = ink.list_catalog();
        let address = Address::start_of(ink.tree.root());

        Self {
            id: StoryId::new(),
            ink,
            lists,
            config,
            rng,
            state: StoryState::new(),
            stack: EvaluationStack::new(),
            output: OutputBuffer::new(),
            pending_tags: Vec::new(),
            mode: Mode::None,
            string_marks: Vec::new(),
            tag_marks: Vec::new(),
            call_stack: Vec::new(),
            address,
            externals: ExternalFunctions::new(),
        }
    }

    /// Load compiled JSON and wrap it in a story.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Ok(Self::new(Ink::from_json_str(json)?))
    }

    pub fn id(&self) -> StoryId {
        self.id
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    pub fn ink(&self) -> &Ink {
        &self.ink
    }

    pub fn state(&self) -> &StoryState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Register a host function under the name the story calls it by.
    pub fn register_external_function<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[ExternalValue]) -> Option<ExternalValue> + Send + 'static,
    {
        self.externals.register(name, function);
    }

    /// Run global declarations, then position the story at its first
    /// content container.
    #[tracing::instrument(level = "debug", skip(self), fields(story = %self.id))]
    pub fn start(&mut self) -> Result<(), StoryError> {
        let ink = Arc::clone(&self.ink);
        let root = ink.tree.root();

        if let Some(globals) = ink.tree.named_child(root, GLOBAL_DECLARATIONS) {
            self.address = Address::start_of(globals);
            while self.state.can_continue() {
                self.step()?;
            }
            self.state.finished = false;
            self.state.done = false;
            self.state.text.clear();
            tracing::debug!(globals = self.state.globals.len(), "Declared globals");
        }

        let start = ink.tree.first_content_container().unwrap_or(root);
        self.enter_container(Address::start_of(start));
        Ok(())
    }

    /// Advance by exactly one content item.
    ///
    /// Text only reaches [`StoryState::text`] when the story stops for
    /// choices or ends. When the only pending choices are invisible defaults,
    /// the first is taken automatically.
    #[tracing::instrument(level = "trace", skip(self), fields(story = %self.id))]
    pub fn step(&mut self) -> Result<&StoryState, StoryError> {
        if !self.state.can_continue() {
            return Err(StoryError::CannotContinue);
        }
        self.state.text.clear();
        self.state.tags.clear();

        self.re_enter()?;

        if !self.state.finished && !self.state.can_continue() {
            match self.fallback_choice() {
                Some(choice) => {
                    tracing::debug!(destination = ?choice.destination, "Taking fallback choice");
                    self.take_choice(choice);
                    self.state.done = true;
                }
                None => self.flush(),
            }
        }
        Ok(&self.state)
    }

    /// Step until the story stops for choices or ends.
    #[tracing::instrument(level = "debug", skip(self), fields(story = %self.id))]
    pub fn run_continuous(&mut self) -> Result<StoryOutput, StoryError> {
        loop {
            self.step()?;
            if !self.state.can_continue() {
                break;
            }
        }
        Ok(StoryOutput {
            text: self.state.text.clone(),
            tags: self.state.tags.clone(),
        })
    }

    /// Take one of [`Story::current_choices`].
    #[tracing::instrument(level = "debug", skip(self), fields(story = %self.id))]
    pub fn choose_index(&mut self, index: usize) -> Result<(), StoryError> {
        let choice = {
            let visible = self.state.visible_choices();
            visible
                .get(index)
                .map(|choice| (*choice).clone())
                .ok_or(StoryError::InvalidChoice {
                    index,
                    available: visible.len(),
                })?
        };
        self.take_choice(choice);
        Ok(())
    }

    /// Choices the player can pick from.
    pub fn current_choices(&self) -> Vec<&Choice> {
        self.state.visible_choices()
    }

    pub fn can_continue(&self) -> bool {
        self.state.can_continue()
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Current turn index; starts at 1 and grows with every choice taken.
    pub fn turn(&self) -> u32 {
        self.state.turn
    }

    pub fn global_variable(&self, name: &str) -> Option<&Value> {
        self.state.globals.get(name)
    }

    /// Times the container at `path` has been re-entered, counted from zero.
    pub fn visit_count(&self, path: &str) -> Result<u32, StoryError> {
        let target = self
            .ink
            .tree
            .resolve(&Path::from(path), self.ink.tree.root())?;
        Ok(self.state.visit_count(target.container))
    }

    fn fallback_choice(&self) -> Option<Choice> {
        let visible = self.state.visible_choices();
        if visible.iter().all(|choice| choice.is_fallback) {
            visible.first().map(|choice| (*choice).clone())
        } else {
            None
        }
    }

    fn take_choice(&mut self, choice: Choice) {
        self.enter_container(choice.destination);
        self.state.turn += 1;
        self.state.choices.clear();
        self.state.done = false;
    }

    /// Move buffered output and tags into the visible state.
    fn flush(&mut self) {
        let text = self.output.take();
        self.state.text = if self.config.clean_output {
            clean_output(&text)
        } else {
            text
        };
        self.state.tags = std::mem::take(&mut self.pending_tags);
    }

    fn end_story(&mut self) {
        tracing::debug!(turn = self.state.turn, "Story ended");
        self.state.text.clear();
        self.flush();
        self.state.finished = true;
        self.state.done = true;
    }

    /// Record the visit and move to `address`.
    fn enter_container(&mut self, address: Address) {
        let container = &self.ink.tree[address.container];
        tracing::trace!(container = %container.label(), index = address.index, "Entering container");
        let flags = container.flags;
        self.state.record_container(address, flags);
        self.address = address;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::{BoundPointer, Scope};
    use ink_model::{
        Assignment, ChoiceFlags, ChoicePoint, ContainerFlags, ContainerId, Content, ContainerTree,
        ControlCommand, Divert, ListDefinitions, Operator, VariablePointer,
    };

    fn story_of(build: impl FnOnce(&mut ContainerTree)) -> Story {
        let mut tree = ContainerTree::new();
        build(&mut tree);
        let config = StoryConfig::default().with_seed(1);
        Story::with_config(Ink::new(tree, ListDefinitions::new()), config)
    }

    fn fill(tree: &mut ContainerTree, id: ContainerId, contents: Vec<Content>) {
        for content in contents {
            tree.push_content(id, content);
        }
    }

    fn command(command: ControlCommand) -> Content {
        Content::Command(command)
    }

    fn choice_texts(story: &Story) -> Vec<String> {
        story.current_choices().iter().map(|c| c.text()).collect()
    }

    #[test]
    fn test_story_ids_are_unique() {
        assert_ne!(StoryId::new(), StoryId::new());
    }

    #[test]
    fn test_text_is_flushed_at_end() {
        let mut story = story_of(|tree| {
            let main = tree.add_container(tree.root(), None);
            tree.push_content(main, Content::Text("Hello".into()));
            tree.push_content(main, Content::Text("\n".into()));
            tree.push_content(main, Content::Command(ControlCommand::End));
        });
        story.start().unwrap();

        let state = story.step().unwrap();
        assert_eq!(state.text, "");
        story.step().unwrap();
        let state = story.step().unwrap();
        assert!(state.finished);
        assert_eq!(state.text, "Hello\n");

        assert!(matches!(story.step(), Err(StoryError::CannotContinue)));
    }

    #[test]
    fn test_glue_joins_lines() {
        let mut story = story_of(|tree| {
            let main = tree.add_container(tree.root(), None);
            tree.push_content(main, Content::Text("Hello".into()));
            tree.push_content(main, Content::Text("\n".into()));
            tree.push_content(main, Content::Command(ControlCommand::Glue));
            tree.push_content(main, Content::Text(" world".into()));
            tree.push_content(main, Content::Command(ControlCommand::End));
        });
        story.start().unwrap();
        assert_eq!(story.run_continuous().unwrap().text, "Hello world");
    }

    #[test]
    fn test_invalid_mode_transition() {
        let mut story = story_of(|tree| {
            let main = tree.add_container(tree.root(), None);
            tree.push_content(main, Content::Command(ControlCommand::BeginString));
        });
        story.start().unwrap();
        assert!(matches!(
            story.step(),
            Err(StoryError::InvalidModeTransition {
                from: Mode::None,
                to: Mode::Str
            })
        ));
    }

    #[test]
    fn test_string_capture_in_order() {
        let mut story = story_of(|tree| {
            let main = tree.add_container(tree.root(), None);
            for content in [
                Content::Command(ControlCommand::BeginEval),
                Content::Command(ControlCommand::BeginString),
                Content::Text("a".into()),
                Content::Text("b".into()),
                Content::Command(ControlCommand::EndString),
                Content::GlobalAssign(ink_model::Assignment::new("s")),
                Content::Command(ControlCommand::EndEval),
                Content::Command(ControlCommand::End),
            ] {
                tree.push_content(main, content);
            }
        });
        story.start().unwrap();
        story.run_continuous().unwrap();
        assert_eq!(story.global_variable("s"), Some(&Value::from("ab")));
    }

    #[test]
    fn test_function_call_returns_value() {
        // main: ev, f(), out, /ev, end    fn: ev, 42, /ev, ~ret
        let mut story = story_of(|tree| {
            let root = tree.root();
            let main = tree.add_container(root, None);
            for content in [
                Content::Command(ControlCommand::BeginEval),
                Content::FunctionDivert(Divert::new("fn")),
                Content::Command(ControlCommand::PopOutput),
                Content::Command(ControlCommand::EndEval),
                Content::Command(ControlCommand::End),
            ] {
                tree.push_content(main, content);
            }
            let function = tree.add_named_child(root, "fn");
            for content in [
                Content::Command(ControlCommand::BeginEval),
                Content::Int(42),
                Content::Command(ControlCommand::EndEval),
                Content::Command(ControlCommand::ReturnFunction),
            ] {
                tree.push_content(function, content);
            }
        });
        story.start().unwrap();
        assert_eq!(story.run_continuous().unwrap().text, "42");
        assert!(story.is_finished());
    }

    #[test]
    fn test_implicit_return_pushes_void() {
        let mut story = story_of(|tree| {
            let root = tree.root();
            let main = tree.add_container(root, None);
            for content in [
                Content::Command(ControlCommand::BeginEval),
                Content::FunctionDivert(Divert::new("fn")),
                Content::GlobalAssign(ink_model::Assignment::new("result")),
                Content::Command(ControlCommand::EndEval),
                Content::Command(ControlCommand::End),
            ] {
                tree.push_content(main, content);
            }
            let function = tree.add_named_child(root, "fn");
            tree.push_content(function, Content::Text("inside".into()));
        });
        story.start().unwrap();
        let output = story.run_continuous().unwrap();
        assert_eq!(output.text, "inside");
        assert_eq!(story.global_variable("result"), Some(&Value::Void));
    }

    #[test]
    fn test_tunnel_returns_after_divert() {
        let mut story = story_of(|tree| {
            let root = tree.root();
            let main = tree.add_container(root, None);
            tree.push_content(main, Content::TunnelDivert(Divert::new("tunnel")));
            tree.push_content(main, Content::Text("after".into()));
            tree.push_content(main, Content::Command(ControlCommand::End));
            let tunnel = tree.add_named_child(root, "tunnel");
            tree.push_content(tunnel, Content::Text("inside ".into()));
            tree.push_content(tunnel, Content::Command(ControlCommand::ReturnTunnel));
        });
        story.start().unwrap();
        assert_eq!(story.run_continuous().unwrap().text, "inside after");
    }

    #[test]
    fn test_return_without_call() {
        let mut story = story_of(|tree| {
            let main = tree.add_container(tree.root(), None);
            tree.push_content(main, Content::Command(ControlCommand::ReturnFunction));
        });
        story.start().unwrap();
        assert!(matches!(story.step(), Err(StoryError::ReturnWithoutCall)));
    }

    #[test]
    fn test_call_depth_limit() {
        let mut story = story_of(|tree| {
            let root = tree.root();
            tree.add_container(root, None);
            let recurse = tree.add_named_child(root, "recurse");
            tree.push_content(recurse, Content::FunctionDivert(Divert::new("recurse")));
        });
        story.config.max_call_depth = 8;
        story.start().unwrap();
        story.divert_to(&"recurse".into()).unwrap();

        let err = story.run_continuous().unwrap_err();
        assert!(matches!(err, StoryError::CallDepthExceeded(8)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_sequence_bound() {
        let mut story = story_of(|tree| {
            let main = tree.add_container(tree.root(), None);
            for content in [
                Content::Command(ControlCommand::BeginEval),
                Content::Int(1),
                Content::Command(ControlCommand::Sequence),
            ] {
                tree.push_content(main, content);
            }
        });
        story.start().unwrap();
        story.step().unwrap();
        story.step().unwrap();
        assert!(matches!(story.step(), Err(StoryError::InvalidSequenceBound(1))));
    }

    #[test]
    fn test_sequence_picks_in_range() {
        let mut story = story_of(|tree| {
            let main = tree.add_container(tree.root(), None);
            tree.push_content(main, Content::Command(ControlCommand::BeginEval));
            for _ in 0..20 {
                tree.push_content(main, Content::Int(3));
                tree.push_content(main, Content::Command(ControlCommand::Sequence));
            }
        });
        story.start().unwrap();
        for _ in 0..41 {
            story.step().unwrap();
        }
        assert_eq!(story.stack.len(), 20);
        while let Ok(value) = story.stack.pop_int() {
            assert!((1..=2).contains(&value));
        }
    }

    #[test]
    fn test_implicit_return_while_gathering_choices() {
        // A function that falls off its end between two choice points must
        // not cut choice gathering short.
        let mut story = story_of(|tree| {
            let root = tree.root();
            let main = tree.add_container(root, None);
            let flags = ChoiceFlags::HAS_START_CONTENT;
            fill(
                tree,
                main,
                vec![
                    command(ControlCommand::BeginEval),
                    command(ControlCommand::BeginString),
                    Content::Text("A".into()),
                    command(ControlCommand::EndString),
                    command(ControlCommand::EndEval),
                    Content::ChoicePoint(ChoicePoint::new("a").with_flags(flags)),
                    Content::FunctionDivert(Divert::new("fn")),
                    command(ControlCommand::BeginEval),
                    command(ControlCommand::BeginString),
                    Content::Text("B".into()),
                    command(ControlCommand::EndString),
                    command(ControlCommand::EndEval),
                    Content::ChoicePoint(ChoicePoint::new("b").with_flags(flags)),
                    command(ControlCommand::Done),
                ],
            );
            let function = tree.add_named_child(root, "fn");
            tree.push_content(function, command(ControlCommand::NoOp));
            for name in ["a", "b"] {
                let body = tree.add_named_child(root, name);
                tree.push_content(body, Content::Text(format!("picked {name}")));
                tree.push_content(body, command(ControlCommand::End));
            }
        });
        story.start().unwrap();
        story.run_continuous().unwrap();

        assert_eq!(choice_texts(&story), vec!["A", "B"]);
        assert!(story.call_stack.is_empty());
        assert_eq!(story.state.current_frame(), 0);

        story.choose_index(1).unwrap();
        assert_eq!(story.run_continuous().unwrap().text, "picked b");
    }

    #[test]
    fn test_implicit_tunnel_return_pushes_void() {
        let mut story = story_of(|tree| {
            let root = tree.root();
            let main = tree.add_container(root, None);
            fill(
                tree,
                main,
                vec![
                    Content::TunnelDivert(Divert::new("tunnel")),
                    Content::Text("after".into()),
                    command(ControlCommand::End),
                ],
            );
            let tunnel = tree.add_named_child(root, "tunnel");
            tree.push_content(tunnel, Content::Text("inside ".into()));
        });
        story.start().unwrap();
        assert_eq!(story.run_continuous().unwrap().text, "inside after");
        assert_eq!(story.stack.len(), 1);
        assert_eq!(story.stack.peek(), Some(&Value::Void));
    }

    #[test]
    fn test_global_pointer_reads_and_writes_through() {
        let mut story = story_of(|tree| {
            let main = tree.add_container(tree.root(), None);
            fill(
                tree,
                main,
                vec![
                    command(ControlCommand::BeginEval),
                    Content::Int(1),
                    Content::GlobalAssign(Assignment::new("x")),
                    Content::VariablePointer(VariablePointer {
                        name: "x".into(),
                        context_index: 0,
                    }),
                    Content::GlobalAssign(Assignment::new("ref")),
                    // Unbound pointer to a pointer collapses onto `x`.
                    Content::VariablePointer(VariablePointer::new("ref")),
                    Content::GlobalAssign(Assignment::new("alias")),
                    Content::VariableRef("ref".into()),
                    Content::GlobalAssign(Assignment::new("seen")),
                    Content::Int(5),
                    Content::GlobalAssign(Assignment::new("alias").reassign()),
                    command(ControlCommand::EndEval),
                    command(ControlCommand::End),
                ],
            );
        });
        story.start().unwrap();
        story.run_continuous().unwrap();

        let to_x = Value::VariablePointer(BoundPointer {
            name: "x".into(),
            scope: Scope::Global,
        });
        assert_eq!(story.global_variable("x"), Some(&Value::Int(5)));
        assert_eq!(story.global_variable("seen"), Some(&Value::Int(1)));
        assert_eq!(story.global_variable("ref"), Some(&to_x));
        assert_eq!(story.global_variable("alias"), Some(&to_x));
    }

    #[test]
    fn test_temporary_pointer_into_function() {
        // main: t = 1; inc(ref t)    inc(p): p = p + 1
        let mut story = story_of(|tree| {
            let root = tree.root();
            let main = tree.add_container(root, None);
            fill(
                tree,
                main,
                vec![
                    command(ControlCommand::BeginEval),
                    Content::Int(1),
                    Content::TempAssign(Assignment::new("t")),
                    Content::VariablePointer(VariablePointer::new("t")),
                    Content::FunctionDivert(Divert::new("inc")),
                    Content::VariablePointer(VariablePointer {
                        name: "t".into(),
                        context_index: 1,
                    }),
                    Content::GlobalAssign(Assignment::new("direct")),
                    Content::VariableRef("t".into()),
                    Content::GlobalAssign(Assignment::new("result")),
                    command(ControlCommand::EndEval),
                    command(ControlCommand::End),
                ],
            );
            let inc = tree.add_named_child(root, "inc");
            fill(
                tree,
                inc,
                vec![
                    Content::TempAssign(Assignment::new("p")),
                    command(ControlCommand::BeginEval),
                    Content::VariableRef("p".into()),
                    Content::Int(1),
                    Content::Operator(Operator::Add),
                    Content::TempAssign(Assignment::new("p").reassign()),
                    command(ControlCommand::EndEval),
                    command(ControlCommand::ReturnFunction),
                ],
            );
        });
        story.start().unwrap();
        story.run_continuous().unwrap();

        assert_eq!(story.global_variable("result"), Some(&Value::Int(2)));
        assert_eq!(
            story.global_variable("direct"),
            Some(&Value::VariablePointer(BoundPointer {
                name: "t".into(),
                scope: Scope::Frame(0),
            }))
        );
    }

    #[test]
    fn test_turns_since() {
        let mut story = story_of(|tree| {
            let root = tree.root();
            let turns_since_hub = |name: &str| {
                vec![
                    command(ControlCommand::BeginEval),
                    Content::DivertTarget("hub".into()),
                    command(ControlCommand::TurnsSince),
                    Content::GlobalAssign(Assignment::new(name)),
                    command(ControlCommand::EndEval),
                ]
            };
            let main = tree.add_container(root, None);
            fill(tree, main, turns_since_hub("before"));
            tree.push_content(main, Content::Divert(Divert::new("hub")));

            let hub = tree.add_named_child(root, "hub");
            tree.set_flags(hub, ContainerFlags::RECORD_TURNS);
            tree.push_content(hub, Content::ChoicePoint(ChoicePoint::new("later")));
            tree.push_content(hub, command(ControlCommand::Done));

            let later = tree.add_named_child(root, "later");
            fill(tree, later, turns_since_hub("since"));
            tree.push_content(later, command(ControlCommand::End));
        });
        story.start().unwrap();
        story.run_continuous().unwrap();
        assert_eq!(story.global_variable("before"), Some(&Value::Int(-1)));

        story.choose_index(0).unwrap();
        story.run_continuous().unwrap();
        assert_eq!(story.global_variable("since"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_conditional_diverts() {
        let mut story = story_of(|tree| {
            let root = tree.root();
            let main = tree.add_container(root, None);
            fill(
                tree,
                main,
                vec![
                    command(ControlCommand::BeginEval),
                    Content::Bool(false),
                    command(ControlCommand::EndEval),
                    Content::Divert(Divert::new("skipped").conditional()),
                    Content::Text("kept ".into()),
                    command(ControlCommand::BeginEval),
                    Content::Int(1),
                    command(ControlCommand::EndEval),
                    Content::Divert(Divert::new("jumped").conditional()),
                    Content::Text("never".into()),
                    command(ControlCommand::End),
                ],
            );
            for name in ["skipped", "jumped"] {
                let knot = tree.add_named_child(root, name);
                tree.push_content(knot, Content::Text(name.into()));
                tree.push_content(knot, command(ControlCommand::End));
            }
        });
        story.start().unwrap();
        assert_eq!(story.run_continuous().unwrap().text, "kept jumped");
    }

    #[test]
    fn test_conditional_choices() {
        let mut story = story_of(|tree| {
            let root = tree.root();
            let main = tree.add_container(root, None);
            let flags = ChoiceFlags::HAS_CONDITION | ChoiceFlags::HAS_START_CONTENT;
            let mut contents = vec![command(ControlCommand::BeginEval)];
            for (text, shown) in [("Yes", true), ("No", false)] {
                contents.extend([
                    command(ControlCommand::BeginString),
                    Content::Text(text.into()),
                    command(ControlCommand::EndString),
                    Content::Bool(shown),
                    Content::ChoicePoint(ChoicePoint::new(text).with_flags(flags)),
                ]);
            }
            contents.extend([command(ControlCommand::EndEval), command(ControlCommand::Done)]);
            fill(tree, main, contents);
            for name in ["Yes", "No"] {
                let body = tree.add_named_child(root, name);
                tree.push_content(body, command(ControlCommand::End));
            }
        });
        story.start().unwrap();
        story.run_continuous().unwrap();

        assert_eq!(choice_texts(&story), vec!["Yes"]);
        assert!(story.stack.is_empty());
    }

    #[test]
    fn test_variable_divert() {
        let mut story = story_of(|tree| {
            let root = tree.root();
            let main = tree.add_container(root, None);
            fill(
                tree,
                main,
                vec![
                    command(ControlCommand::BeginEval),
                    Content::DivertTarget("knot".into()),
                    Content::GlobalAssign(Assignment::new("target")),
                    command(ControlCommand::EndEval),
                    Content::VariableDivert {
                        name: "target".into(),
                        conditional: false,
                    },
                ],
            );
            let knot = tree.add_named_child(root, "knot");
            tree.push_content(knot, Content::Text("arrived".into()));
            tree.push_content(knot, command(ControlCommand::End));
        });
        story.start().unwrap();
        assert_eq!(story.run_continuous().unwrap().text, "arrived");
    }

    #[test]
    fn test_variable_divert_needs_divert_target() {
        let mut story = story_of(|tree| {
            let main = tree.add_container(tree.root(), None);
            fill(
                tree,
                main,
                vec![
                    command(ControlCommand::BeginEval),
                    Content::Int(3),
                    Content::GlobalAssign(Assignment::new("count")),
                    command(ControlCommand::EndEval),
                    Content::VariableDivert {
                        name: "count".into(),
                        conditional: false,
                    },
                ],
            );
        });
        story.start().unwrap();
        let err = story.run_continuous().unwrap_err();
        assert!(matches!(&err, StoryError::NotADivertTarget(name) if name == "count"));
        assert_eq!(err.kind(), ErrorKind::MalformedStory);
    }

    #[test]
    fn test_unassigned_variable() {
        let mut story = story_of(|tree| {
            let main = tree.add_container(tree.root(), None);
            tree.push_content(main, command(ControlCommand::BeginEval));
            tree.push_content(main, Content::VariableRef("missing".into()));
        });
        story.start().unwrap();
        let err = story.run_continuous().unwrap_err();
        assert!(matches!(&err, StoryError::UnresolvedVariable(name) if name == "missing"));
        assert_eq!(err.kind(), ErrorKind::UnresolvedVariable);
    }
}
