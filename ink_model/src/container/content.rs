//! Content items - the closed set of instructions a container holds.

use serde::{Deserialize, Serialize};

use super::ContainerId;
use crate::path::Path;

/// A single positional item inside a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Content {
    /// Prose, or a string literal while evaluating.
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),

    /// A list literal realized against the list catalog at run time.
    ListInit(ListInit),

    /// Placeholder that does nothing when visited.
    Void,

    /// A nested container owned by the enclosing one.
    Container(ContainerId),

    Command(ControlCommand),
    Operator(Operator),

    /// Plain jump, optionally guarded by a popped condition.
    Divert(Divert),

    /// Jump to the divert target held in a variable.
    VariableDivert { name: String, conditional: bool },

    /// Divert that pushes a return address past itself.
    FunctionDivert(Divert),

    /// Divert that pushes a return address at itself.
    TunnelDivert(Divert),

    /// Call into a host function, falling back to the authored path when the
    /// host has not registered one.
    ExternalFunction { divert: Divert, args: usize },

    ChoicePoint(ChoicePoint),

    /// A path value pushed onto the evaluation stack.
    DivertTarget(Path),

    VariablePointer(VariablePointer),

    /// Pushes the visit count of the container the path resolves to.
    ReadCount(Path),

    /// Pushes the value of a named variable.
    VariableRef(String),

    GlobalAssign(Assignment),
    TempAssign(Assignment),
}

impl Content {
    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Text(_) => "text",
            Content::Int(_) => "int",
            Content::Float(_) => "float",
            Content::Bool(_) => "bool",
            Content::ListInit(_) => "list",
            Content::Void => "void",
            Content::Container(_) => "container",
            Content::Command(_) => "command",
            Content::Operator(_) => "operator",
            Content::Divert(_) => "divert",
            Content::VariableDivert { .. } => "variable divert",
            Content::FunctionDivert(_) => "function divert",
            Content::TunnelDivert(_) => "tunnel divert",
            Content::ExternalFunction { .. } => "external function",
            Content::ChoicePoint(_) => "choice point",
            Content::DivertTarget(_) => "divert target",
            Content::VariablePointer(_) => "variable pointer",
            Content::ReadCount(_) => "read count",
            Content::VariableRef(_) => "variable reference",
            Content::GlobalAssign(_) => "global assignment",
            Content::TempAssign(_) => "temporary assignment",
        }
    }
}

/// A jump to a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Divert {
    pub path: Path,
    pub conditional: bool,
}

impl Divert {
    /// Create an unconditional divert.
    pub fn new(path: impl Into<Path>) -> Self {
        Self {
            path: path.into(),
            conditional: false,
        }
    }

    /// Make the divert depend on a popped truthy value.
    pub fn conditional(mut self) -> Self {
        self.conditional = true;
        self
    }
}

/// Bitset carried by a choice point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChoiceFlags(pub u8);

impl ChoiceFlags {
    pub const HAS_CONDITION: u8 = 0x1;
    pub const HAS_START_CONTENT: u8 = 0x2;
    pub const HAS_CHOICE_ONLY_CONTENT: u8 = 0x4;
    pub const IS_INVISIBLE_DEFAULT: u8 = 0x8;
    pub const ONCE_ONLY: u8 = 0x10;

    pub fn has_condition(self) -> bool {
        self.0 & Self::HAS_CONDITION != 0
    }

    pub fn has_start_content(self) -> bool {
        self.0 & Self::HAS_START_CONTENT != 0
    }

    pub fn has_choice_only_content(self) -> bool {
        self.0 & Self::HAS_CHOICE_ONLY_CONTENT != 0
    }

    pub fn is_invisible_default(self) -> bool {
        self.0 & Self::IS_INVISIBLE_DEFAULT != 0
    }

    pub fn once_only(self) -> bool {
        self.0 & Self::ONCE_ONLY != 0
    }
}

/// A point where the story offers the player a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoicePoint {
    pub path: Path,
    pub flags: ChoiceFlags,
}

impl ChoicePoint {
    /// Create a choice point with no flags set.
    pub fn new(path: impl Into<Path>) -> Self {
        Self {
            path: path.into(),
            flags: ChoiceFlags::default(),
        }
    }

    /// Set the raw flag byte.
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = ChoiceFlags(flags);
        self
    }
}

/// Reference-by-name to a variable.
///
/// `context_index` is `-1` when the scope is decided when the pointer is
/// pushed, `0` for globals and `n >= 1` for the n-th call frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariablePointer {
    pub name: String,
    pub context_index: i64,
}

impl VariablePointer {
    /// Create a pointer whose scope is bound when it is pushed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context_index: -1,
        }
    }
}

/// Target of a `VAR=` or `temp=` assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    /// Set when the variable already exists and is being overwritten.
    pub reassign: bool,
}

impl Assignment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reassign: false,
        }
    }

    pub fn reassign(mut self) -> Self {
        self.reassign = true;
        self
    }
}

/// A list literal: whole origin lists plus individually qualified items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListInit {
    /// Items written as `Origin.Item`.
    pub items: Vec<String>,
    /// Names of list definitions included in full.
    pub origins: Vec<String>,
}

/// Engine control op-codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlCommand {
    // Mode changes
    BeginEval,
    EndEval,
    BeginString,
    EndString,
    BeginTag,
    EndTag,

    // Stack and output
    PopOutput,
    Pop,
    Duplicate,
    NoOp,
    Glue,
    PushVoid,

    // Counters
    ChoiceCount,
    TurnCount,
    TurnsSince,
    VisitCount,
    Sequence,

    // Flow
    Thread,
    Done,
    End,
    ReturnTunnel,
    ReturnFunction,
}

impl ControlCommand {
    /// Parse a command from its compiled token.
    pub fn from_token(token: &str) -> Option<Self> {
        let command = match token {
            "ev" => ControlCommand::BeginEval,
            "/ev" => ControlCommand::EndEval,
            "str" => ControlCommand::BeginString,
            "/str" => ControlCommand::EndString,
            "#" => ControlCommand::BeginTag,
            "/#" => ControlCommand::EndTag,
            "out" => ControlCommand::PopOutput,
            "pop" => ControlCommand::Pop,
            "du" => ControlCommand::Duplicate,
            "nop" => ControlCommand::NoOp,
            "<>" => ControlCommand::Glue,
            "void" => ControlCommand::PushVoid,
            "choiceCnt" => ControlCommand::ChoiceCount,
            "turn" => ControlCommand::TurnCount,
            "turns" => ControlCommand::TurnsSince,
            "visit" => ControlCommand::VisitCount,
            "seq" => ControlCommand::Sequence,
            "thread" => ControlCommand::Thread,
            "done" => ControlCommand::Done,
            "end" => ControlCommand::End,
            "->->" => ControlCommand::ReturnTunnel,
            "~ret" => ControlCommand::ReturnFunction,
            _ => return None,
        };
        Some(command)
    }

    /// The compiled token for this command.
    pub fn token(self) -> &'static str {
        match self {
            ControlCommand::BeginEval => "ev",
            ControlCommand::EndEval => "/ev",
            ControlCommand::BeginString => "str",
            ControlCommand::EndString => "/str",
            ControlCommand::BeginTag => "#",
            ControlCommand::EndTag => "/#",
            ControlCommand::PopOutput => "out",
            ControlCommand::Pop => "pop",
            ControlCommand::Duplicate => "du",
            ControlCommand::NoOp => "nop",
            ControlCommand::Glue => "<>",
            ControlCommand::PushVoid => "void",
            ControlCommand::ChoiceCount => "choiceCnt",
            ControlCommand::TurnCount => "turn",
            ControlCommand::TurnsSince => "turns",
            ControlCommand::VisitCount => "visit",
            ControlCommand::Sequence => "seq",
            ControlCommand::Thread => "thread",
            ControlCommand::Done => "done",
            ControlCommand::End => "end",
            ControlCommand::ReturnTunnel => "->->",
            ControlCommand::ReturnFunction => "~ret",
        }
    }
}

impl std::fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Number of operands an operator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Unary,
    Binary,
    Ternary,
}

/// Expression operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    // Arithmetic
    Add,
    Subtract,
    Divide,
    Multiply,
    Modulus,
    Negate,

    // Comparison
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,

    // Logic
    Not,
    And,
    Or,

    // Numeric functions
    Min,
    Max,
    Int,
    Floor,
    Float,
    Random,
    SeedRandom,

    // Lists
    ListValue,
    ListInt,
    ListMin,
    ListMax,
    ListCount,
    ListInvert,
    ListRandom,
    ListAll,
    ListRange,
    ListIntersect,
    Contains,
    NotContains,
}

impl Operator {
    /// Parse an operator from its compiled token.
    pub fn from_token(token: &str) -> Option<Self> {
        let operator = match token {
            "+" => Operator::Add,
            "-" => Operator::Subtract,
            "/" => Operator::Divide,
            "*" => Operator::Multiply,
            "%" => Operator::Modulus,
            "_" => Operator::Negate,
            "==" => Operator::Equal,
            "!=" => Operator::NotEqual,
            ">" => Operator::GreaterThan,
            "<" => Operator::LessThan,
            ">=" => Operator::GreaterThanOrEqual,
            "<=" => Operator::LessThanOrEqual,
            "!" => Operator::Not,
            "&&" => Operator::And,
            "||" => Operator::Or,
            "MIN" => Operator::Min,
            "MAX" => Operator::Max,
            "INT" => Operator::Int,
            "FLOOR" => Operator::Floor,
            "FLOAT" => Operator::Float,
            "rnd" => Operator::Random,
            "srnd" => Operator::SeedRandom,
            "LIST_VALUE" => Operator::ListValue,
            "listInt" => Operator::ListInt,
            "LIST_MIN" => Operator::ListMin,
            "LIST_MAX" => Operator::ListMax,
            "LIST_COUNT" => Operator::ListCount,
            "LIST_INVERT" => Operator::ListInvert,
            "lrnd" => Operator::ListRandom,
            "LIST_ALL" => Operator::ListAll,
            "range" => Operator::ListRange,
            "L^" => Operator::ListIntersect,
            "?" => Operator::Contains,
            "!?" => Operator::NotContains,
            _ => return None,
        };
        Some(operator)
    }

    /// The compiled token for this operator.
    pub fn token(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Divide => "/",
            Operator::Multiply => "*",
            Operator::Modulus => "%",
            Operator::Negate => "_",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThanOrEqual => "<=",
            Operator::Not => "!",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Min => "MIN",
            Operator::Max => "MAX",
            Operator::Int => "INT",
            Operator::Floor => "FLOOR",
            Operator::Float => "FLOAT",
            Operator::Random => "rnd",
            Operator::SeedRandom => "srnd",
            Operator::ListValue => "LIST_VALUE",
            Operator::ListInt => "listInt",
            Operator::ListMin => "LIST_MIN",
            Operator::ListMax => "LIST_MAX",
            Operator::ListCount => "LIST_COUNT",
            Operator::ListInvert => "LIST_INVERT",
            Operator::ListRandom => "lrnd",
            Operator::ListAll => "LIST_ALL",
            Operator::ListRange => "range",
            Operator::ListIntersect => "L^",
            Operator::Contains => "?",
            Operator::NotContains => "!?",
        }
    }

    /// How many stack values the operator consumes.
    pub fn arity(self) -> Arity {
        match self {
            Operator::Negate
            | Operator::Not
            | Operator::Int
            | Operator::Floor
            | Operator::Float
            | Operator::SeedRandom
            | Operator::ListValue
            | Operator::ListMin
            | Operator::ListMax
            | Operator::ListCount
            | Operator::ListInvert
            | Operator::ListRandom
            | Operator::ListAll => Arity::Unary,
            Operator::ListRange => Arity::Ternary,
            _ => Arity::Binary,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}
