//! Per-item handlers. Each handler leaves the address where the next step
//! should begin.

use ink_model::{
    Address, Assignment, ChoicePoint, Content, ControlCommand, Divert, ParentPosition, Path,
    VariablePointer,
};
use rand::Rng;
use std::sync::Arc;

use super::{CallFrame, FrameKind, Story};
use crate::choice::Choice;
use crate::error::StoryError;
use crate::external::ExternalValue;
use crate::mode::Mode;
use crate::operators;
use crate::value::{BoundPointer, Scope, Value};

impl Story {
    /// Resume at the current address, climbing out of finished containers
    /// until there is an item to visit.
    pub(super) fn re_enter(&mut self) -> Result<(), StoryError> {
        self.state.done = false;
        let ink = Arc::clone(&self.ink);

        loop {
            if !ink.tree.is_past_end(self.address) {
                return self.visit();
            }

            let container = &ink.tree[self.address.container];
            if let (ParentPosition::Index(index), Some(parent)) =
                (container.position_in_parent(), container.parent())
            {
                self.address = Address::new(parent, index + 1);
                continue;
            }

            // A named child or the root has no successor: return from the
            // innermost call, or stop.
            if let Some(frame) = self.call_stack.pop() {
                tracing::trace!(container = %container.label(), kind = ?frame.kind, "Implicit return");
                self.restore_frame(frame);
                self.stack.push(Value::Void);
                continue;
            }
            if self.state.choices.is_empty() {
                self.end_story();
            } else {
                self.state.done = true;
            }
            return Ok(());
        }
    }

    fn visit(&mut self) -> Result<(), StoryError> {
        let ink = Arc::clone(&self.ink);
        let Some(content) = ink.tree.content_at(self.address) else {
            return Ok(());
        };
        tracing::trace!(address = ?self.address, kind = content.kind(), mode = %self.mode, "Visit");

        match content {
            Content::Text(text) => {
                match self.mode {
                    Mode::Eval => self.stack.push(text.as_str()),
                    _ => self.output.push(text.as_str()),
                }
                self.address.advance();
            }
            Content::Int(value) => self.push_and_advance(*value),
            Content::Float(value) => self.push_and_advance(*value),
            Content::Bool(value) => self.push_and_advance(*value),
            Content::ListInit(init) => {
                let list = self.lists.realize(init)?;
                self.push_and_advance(list);
            }
            Content::Void => self.address.advance(),
            Content::Container(child) => self.enter_container(Address::start_of(*child)),
            Content::Command(command) => self.command(*command)?,
            Content::Operator(operator) => {
                operators::evaluate(*operator, &mut self.stack, &self.lists, &mut self.rng)?;
                self.address.advance();
            }
            Content::Divert(divert) => {
                if self.condition_holds(divert.conditional)? {
                    self.divert_to(&divert.path)?;
                }
            }
            Content::VariableDivert { name, conditional } => {
                if self.condition_holds(*conditional)? {
                    match self.read_variable(name)? {
                        Value::DivertTarget(path) => self.divert_to(&path)?,
                        _ => return Err(StoryError::NotADivertTarget(name.clone())),
                    }
                }
            }
            Content::FunctionDivert(divert) => self.call(divert, FrameKind::Function)?,
            Content::TunnelDivert(divert) => self.call(divert, FrameKind::Tunnel)?,
            Content::ExternalFunction { divert, args } => self.call_external(divert, *args)?,
            Content::ChoicePoint(point) => self.choice_point(point)?,
            Content::DivertTarget(path) => self.push_and_advance(Value::DivertTarget(path.clone())),
            Content::VariablePointer(pointer) => {
                let bound = self.bind_pointer(pointer);
                self.push_and_advance(Value::VariablePointer(bound));
            }
            Content::ReadCount(path) => {
                let target = ink.tree.resolve(path, self.address.container)?;
                let count = self.state.visit_count(target.container);
                self.push_and_advance(i64::from(count));
            }
            Content::VariableRef(name) => {
                let value = self.read_variable(name)?;
                self.push_and_advance(value);
            }
            Content::GlobalAssign(assignment) => {
                self.assign(assignment, Scope::Global)?;
                self.address.advance();
            }
            Content::TempAssign(assignment) => {
                self.assign(assignment, Scope::Frame(self.state.current_frame()))?;
                self.address.advance();
            }
        }
        Ok(())
    }

    fn push_and_advance(&mut self, value: impl Into<Value>) {
        self.stack.push(value);
        self.address.advance();
    }

    /// Pop the guard of a conditional item. A false guard skips the item.
    fn condition_holds(&mut self, conditional: bool) -> Result<bool, StoryError> {
        if conditional && !self.stack.pop_truthy()? {
            self.address.advance();
            return Ok(false);
        }
        Ok(true)
    }

    pub(super) fn divert_to(&mut self, path: &Path) -> Result<(), StoryError> {
        let target = self.ink.tree.resolve(path, self.address.container)?;
        tracing::debug!(%path, target = ?target, "Divert");
        self.enter_container(target);
        Ok(())
    }

    fn call(&mut self, divert: &Divert, kind: FrameKind) -> Result<(), StoryError> {
        if !self.condition_holds(divert.conditional)? {
            return Ok(());
        }
        self.push_frame(kind)?;
        self.divert_to(&divert.path)
    }

    fn push_frame(&mut self, kind: FrameKind) -> Result<(), StoryError> {
        if self.call_stack.len() >= self.config.max_call_depth {
            return Err(StoryError::CallDepthExceeded(self.config.max_call_depth));
        }
        let return_to = match kind {
            FrameKind::Function => self.address.next(),
            FrameKind::Tunnel => self.address,
        };
        self.call_stack.push(CallFrame {
            return_to,
            mode: self.mode,
            kind,
        });
        self.state.push_frame();
        self.mode = Mode::None;
        Ok(())
    }

    fn restore_frame(&mut self, frame: CallFrame) {
        self.state.pop_frame();
        self.mode = frame.mode;
        self.address = frame.resume_address();
    }

    fn return_from(&mut self, kind: FrameKind) -> Result<(), StoryError> {
        let frame = self.call_stack.pop().ok_or(StoryError::ReturnWithoutCall)?;
        if frame.kind != kind {
            tracing::warn!(expected = ?kind, found = ?frame.kind, "Return does not match its call");
        }
        self.restore_frame(frame);
        Ok(())
    }

    fn call_external(&mut self, divert: &Divert, args: usize) -> Result<(), StoryError> {
        if !self.condition_holds(divert.conditional)? {
            return Ok(());
        }
        let name = divert.path.as_str();
        let Some(function) = self.externals.get(name) else {
            tracing::warn!(function = name, "External function not registered, using fallback");
            self.push_frame(FrameKind::Function)?;
            return self.divert_to(&divert.path);
        };

        let arguments = self
            .stack
            .pop_many(args)?
            .into_iter()
            .map(ExternalValue::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(function = name, args, "Calling external function");

        let result = function(&arguments);
        self.stack.push(result.map(Value::from).unwrap_or(Value::Void));
        self.address.advance();
        Ok(())
    }

    fn choice_point(&mut self, point: &ChoicePoint) -> Result<(), StoryError> {
        let flags = point.flags;
        let destination = self.ink.tree.resolve(&point.path, self.address.container)?;

        let mut visible = true;
        if flags.has_condition() {
            visible = self.stack.pop_truthy()?;
        }
        let choice_only_text = if flags.has_choice_only_content() {
            self.stack.pop_string()?
        } else {
            String::new()
        };
        let start_text = if flags.has_start_content() {
            self.stack.pop_string()?
        } else {
            String::new()
        };
        if flags.once_only() && self.state.has_visited(destination.container) {
            visible = false;
        }

        if visible {
            tracing::debug!(
                text = %start_text,
                destination = ?destination,
                fallback = flags.is_invisible_default(),
                "Offering choice"
            );
            self.state.choices.push(Choice {
                start_text,
                choice_only_text,
                destination,
                is_fallback: flags.is_invisible_default(),
            });
        }
        self.address.advance();
        Ok(())
    }

    /// Bind a pointer to the scope its variable lives in.
    ///
    /// A pointer to a variable that itself holds a pointer collapses to the
    /// inner pointer.
    fn bind_pointer(&self, pointer: &VariablePointer) -> BoundPointer {
        let scope = match pointer.context_index {
            0 => Scope::Global,
            index if index > 0 => Scope::Frame(index as usize - 1),
            _ if self.state.temporary(&pointer.name).is_some() => {
                Scope::Frame(self.state.current_frame())
            }
            _ => Scope::Global,
        };
        match self.state.read_scoped(&pointer.name, scope) {
            Some(Value::VariablePointer(inner)) => inner.clone(),
            _ => BoundPointer {
                name: pointer.name.clone(),
                scope,
            },
        }
    }

    /// Read a variable, following a pointer to its target.
    fn read_variable(&self, name: &str) -> Result<Value, StoryError> {
        let value = self
            .state
            .variable(name)
            .ok_or_else(|| StoryError::UnresolvedVariable(name.to_owned()))?;
        match value {
            Value::VariablePointer(pointer) => self
                .state
                .read_scoped(&pointer.name, pointer.scope)
                .cloned()
                .ok_or_else(|| StoryError::UnresolvedVariable(pointer.name.clone())),
            other => Ok(other.clone()),
        }
    }

    /// Pop a value into a variable. Reassigning a variable that holds a
    /// pointer writes through to the pointer's target.
    fn assign(&mut self, assignment: &Assignment, scope: Scope) -> Result<(), StoryError> {
        let value = self.stack.pop()?;
        if assignment.reassign {
            if let Some(Value::VariablePointer(pointer)) =
                self.state.read_scoped(&assignment.name, scope)
            {
                let pointer = pointer.clone();
                self.state.write_scoped(&pointer.name, pointer.scope, value);
                return Ok(());
            }
        }
        self.state.write_scoped(&assignment.name, scope, value);
        Ok(())
    }

    fn transition(&mut self, from: Mode, to: Mode) -> Result<(), StoryError> {
        if self.mode != from {
            return Err(StoryError::InvalidModeTransition {
                from: self.mode,
                to,
            });
        }
        tracing::debug!(%from, %to, "Mode change");
        self.mode = to;
        Ok(())
    }

    fn command(&mut self, command: ControlCommand) -> Result<(), StoryError> {
        match command {
            ControlCommand::BeginEval => self.transition(Mode::None, Mode::Eval)?,
            ControlCommand::EndEval => self.transition(Mode::Eval, Mode::None)?,
            ControlCommand::BeginString => {
                self.transition(Mode::Eval, Mode::Str)?;
                self.string_marks.push(self.output.len());
            }
            ControlCommand::EndString => {
                self.transition(Mode::Str, Mode::Eval)?;
                let mark = self.string_marks.pop().unwrap_or(self.output.len());
                let captured = self.output.capture_since(mark);
                self.stack.push(captured);
            }
            ControlCommand::BeginTag => {
                if !matches!(self.mode, Mode::None | Mode::Eval) {
                    return Err(StoryError::InvalidModeTransition {
                        from: self.mode,
                        to: Mode::Tag,
                    });
                }
                self.tag_marks.push((self.mode, self.output.len()));
                self.mode = Mode::Tag;
            }
            ControlCommand::EndTag => {
                if self.mode != Mode::Tag {
                    return Err(StoryError::InvalidModeTransition {
                        from: self.mode,
                        to: Mode::None,
                    });
                }
                let (previous, mark) = self
                    .tag_marks
                    .pop()
                    .unwrap_or((Mode::None, self.output.len()));
                let tag = self.output.capture_since(mark);
                self.pending_tags.push(tag.trim().to_owned());
                self.mode = previous;
            }
            ControlCommand::PopOutput => {
                let value = self.stack.pop()?;
                self.output.push(value.to_string());
            }
            ControlCommand::Pop => {
                self.stack.pop()?;
            }
            ControlCommand::Duplicate => {
                let top = self.stack.peek().cloned().ok_or(StoryError::EmptyStack)?;
                self.stack.push(top);
            }
            ControlCommand::NoOp => {}
            ControlCommand::Glue => self.output.glue(),
            ControlCommand::PushVoid => self.stack.push(Value::Void),
            ControlCommand::ChoiceCount => self.stack.push(self.state.choices.len() as i64),
            ControlCommand::TurnCount => self.stack.push(i64::from(self.state.turn)),
            ControlCommand::TurnsSince => {
                let path = self.stack.pop_divert_target()?;
                let target = self.ink.tree.resolve(&path, self.address.container)?;
                self.stack.push(self.state.turns_since(target.container));
            }
            ControlCommand::VisitCount => {
                let count = self.state.visit_count(self.address.container);
                self.stack.push(i64::from(count));
            }
            ControlCommand::Sequence => {
                let bound = self.stack.pop_int()?;
                if bound < 2 {
                    return Err(StoryError::InvalidSequenceBound(bound));
                }
                let pick = self.rng.gen_range(1..bound);
                self.stack.push(pick);
            }
            ControlCommand::Thread => {
                tracing::warn!(address = ?self.address, "Threads are not supported, skipping");
            }
            ControlCommand::Done => self.state.done = true,
            ControlCommand::End => self.end_story(),
            ControlCommand::ReturnTunnel => return self.return_from(FrameKind::Tunnel),
            ControlCommand::ReturnFunction => return self.return_from(FrameKind::Function),
        }
        self.address.advance();
        Ok(())
    }
}
