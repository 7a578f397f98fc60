//! Stage errors and the accumulated diagnostic report.
//!
//! Each pipeline stage has its own error enum; [`PipelineError`] unifies them
//! so the batch driver can tag every failure with the stage it came from.
//! Optimization errors additionally carry the region that was compiling when
//! the rewriter failed, read from the optimizer context's current location.

use std::fmt;

/// The pipeline stage an error originated from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Stage {
    Parse,
    Optimize,
    Compile,
    Link,
    Runtime,
    Data,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parse => "parse",
            Stage::Optimize => "optimize",
            Stage::Compile => "compile",
            Stage::Link => "link",
            Stage::Runtime => "runtime",
            Stage::Data => "data",
        };
        f.write_str(name)
    }
}

/// A rewriter failure, tagged with the region that owned the rule.
#[derive(Clone, Debug)]
pub struct OptimizeError {
    /// Name of the region whose rule was compiling, when known.
    pub location: String,
    pub kind: OptimizeErrorKind,
}

impl OptimizeError {
    pub fn new(location: impl Into<String>, kind: OptimizeErrorKind) -> Self {
        OptimizeError {
            location: location.into(),
            kind,
        }
    }
}

#[derive(Clone, Debug)]
pub enum OptimizeErrorKind {
    /// A Setting identifier named something the settings surface does not know.
    UnknownSetting { name: String },
    /// A helper expanded into a call of itself, directly or through others.
    RecursiveHelper { name: String },
    /// A helper was declared but its body is not in the helper table.
    MissingHelper { name: String },
    /// A helper was called with the wrong number of arguments.
    HelperArity {
        name: String,
        expects: usize,
        got: usize,
    },
    /// A bare reference to a function that requires arguments.
    BareFunctionArgs { name: String, params: usize },
    /// A compiler function received an argument of the wrong kind.
    CompilerFnType {
        name: String,
        expected: &'static str,
    },
    /// A compiler function received the wrong number of arguments.
    CompilerFnArity { name: String, got: usize },
    /// An Invoke targeted a compiler-function symbol with no registered body.
    MissingCompilerFn { name: String },
    /// A rewrite needed a symbol that was never declared.
    MissingSymbol { name: String },
}

impl fmt::Display for OptimizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OptimizeErrorKind::UnknownSetting { name } => {
                write!(f, "unknown setting {name:?}")?
            }
            OptimizeErrorKind::RecursiveHelper { name } => {
                write!(f, "helper {name:?} expands into itself")?
            }
            OptimizeErrorKind::MissingHelper { name } => {
                write!(f, "helper {name:?} was declared but is not in the table")?
            }
            OptimizeErrorKind::HelperArity { name, expects, got } => {
                write!(f, "{name:?} expects {expects} arguments but received {got}")?
            }
            OptimizeErrorKind::BareFunctionArgs { name, params } => {
                write!(f, "expected 0-arg function, but {name:?} has {params} params")?
            }
            OptimizeErrorKind::CompilerFnType { name, expected } => {
                write!(f, "{name} expects {expected} as first argument")?
            }
            OptimizeErrorKind::CompilerFnArity { name, got } => {
                write!(f, "{name} cannot accept {got} arguments")?
            }
            OptimizeErrorKind::MissingCompilerFn { name } => {
                write!(f, "no compiler function registered for {name:?}")?
            }
            OptimizeErrorKind::MissingSymbol { name } => {
                write!(f, "rewrite requires undeclared symbol {name:?}")?
            }
        }
        if !self.location.is_empty() {
            write!(f, " (while compiling {})", self.location)?;
        }
        Ok(())
    }
}

impl std::error::Error for OptimizeError {}

/// A node produced during optimization was not compilable.
#[derive(Clone, Debug)]
pub enum CompileError {
    /// An identifier of a kind codegen has no encoding for.
    UncompilableIdentifier { name: String, kind: &'static str },
    /// An Invoke whose target is not an invocable function symbol.
    UncompilableCallee { name: String, kind: &'static str },
    /// A call with the wrong number of arguments for a fixed-arity function.
    ArityMismatch {
        name: String,
        expects: i8,
        got: usize,
    },
    /// An Invoke whose target is not an identifier at all.
    CalleeNotIdentifier,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UncompilableIdentifier { name, kind } => {
                write!(f, "uncompilable identifier: {name} ({kind})")
            }
            CompileError::UncompilableCallee { name, kind } => {
                write!(f, "can only invoke functions, not {name} ({kind})")
            }
            CompileError::ArityMismatch { name, expects, got } => {
                write!(f, "{name:?} expects {expects} arguments but received {got}")
            }
            CompileError::CalleeNotIdentifier => {
                write!(f, "invocation target is not an identifier")
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// A symbol or function referenced by bytecode has no runtime binding.
#[derive(Clone, Debug)]
pub enum LinkError {
    /// The symbol was never associated with an object handle.
    UnboundSymbol { name: String },
    /// A declared built-in has no function definition.
    MissingBuiltIn { name: String },
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::UnboundSymbol { name } => {
                write!(f, "symbol {name:?} has no object handle")
            }
            LinkError::MissingBuiltIn { name } => {
                write!(f, "built-in {name:?} has no function definition")
            }
        }
    }
}

impl std::error::Error for LinkError {}

/// An opcode decoded but failed to execute.
#[derive(Clone, Debug)]
pub enum RuntimeError {
    /// The ERR opcode was executed.
    Halted,
    /// A byte that is not an opcode.
    UnknownOp(u8),
    /// A built-in was called with the wrong number of arguments.
    Arity {
        name: String,
        expects: i8,
        got: usize,
    },
    /// CHK_QTY executed with no quantity-check function bound.
    FastOpUnbound,
    /// The comparison opcodes are compile-time only.
    Comparison,
    /// The evaluation stack exceeded its fixed capacity.
    StackOverflow,
    /// An opcode popped more values than the stack held.
    StackUnderflow,
    /// The tape ended in the middle of an instruction.
    TruncatedTape,
    /// An operand did not resolve or carried the wrong object type.
    Type(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Halted => write!(f, "execution halted"),
            RuntimeError::UnknownOp(op) => write!(f, "unknown op: 0x{op:02X}"),
            RuntimeError::Arity { name, expects, got } => {
                write!(f, "{name:?} expects {expects} arguments, got {got}")
            }
            RuntimeError::FastOpUnbound => write!(f, "fastop not configured"),
            RuntimeError::Comparison => write!(f, "runtime comparison not implemented"),
            RuntimeError::StackOverflow => write!(f, "evaluation stack overflow"),
            RuntimeError::StackUnderflow => write!(f, "evaluation stack underflow"),
            RuntimeError::TruncatedTape => write!(f, "tape ended mid-instruction"),
            RuntimeError::Type(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// An ingest or attribute-store contract violation.
#[derive(Clone, Debug)]
pub enum DataError {
    UnknownToken(String),
    UnknownRegion(String),
    /// A name was redeclared with an incompatible symbol kind.
    KindMismatch {
        name: String,
        have: &'static str,
        want: &'static str,
    },
    /// An alias would shadow a different symbol.
    AliasCollision { alias: String },
    /// A symbol was already bound to a different object handle.
    AlreadyBound { name: String },
    /// A persisted bytecode module failed to decode.
    Malformed(String),
    /// The world graph has no root regions.
    NoRoots,
    /// An edge reached exploration without a compiled rule.
    MissingRule { edge: String },
    /// A song lookup hit an entity with no note list.
    NotASong(String),
    /// A note glyph with no carrier token.
    UnknownNote(char),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::UnknownToken(name) => write!(f, "no token named {name:?}"),
            DataError::UnknownRegion(name) => write!(f, "no region named {name:?}"),
            DataError::KindMismatch { name, have, want } => {
                write!(f, "{name:?} is declared as {have}, cannot redeclare as {want}")
            }
            DataError::AliasCollision { alias } => {
                write!(f, "alias {alias:?} already resolves to a different symbol")
            }
            DataError::AlreadyBound { name } => {
                write!(f, "{name:?} is already bound to a different handle")
            }
            DataError::Malformed(detail) => write!(f, "malformed module: {detail}"),
            DataError::NoRoots => write!(f, "world graph has no roots"),
            DataError::MissingRule { edge } => {
                write!(f, "edge {edge} has no compiled rule")
            }
            DataError::NotASong(name) => write!(f, "{name:?} is not a song"),
            DataError::UnknownNote(glyph) => write!(f, "unknown note {glyph:?}"),
        }
    }
}

impl std::error::Error for DataError {}

/// Any stage error, tagged with its [`Stage`].
#[derive(Clone, Debug)]
pub enum PipelineError {
    Optimize(OptimizeError),
    Compile(CompileError),
    Link(LinkError),
    Runtime(RuntimeError),
    Data(DataError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Optimize(_) => Stage::Optimize,
            PipelineError::Compile(_) => Stage::Compile,
            PipelineError::Link(_) => Stage::Link,
            PipelineError::Runtime(_) => Stage::Runtime,
            PipelineError::Data(_) => Stage::Data,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Optimize(e) => e.fmt(f),
            PipelineError::Compile(e) => e.fmt(f),
            PipelineError::Link(e) => e.fmt(f),
            PipelineError::Runtime(e) => e.fmt(f),
            PipelineError::Data(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<OptimizeError> for PipelineError {
    fn from(e: OptimizeError) -> Self {
        PipelineError::Optimize(e)
    }
}

impl From<CompileError> for PipelineError {
    fn from(e: CompileError) -> Self {
        PipelineError::Compile(e)
    }
}

impl From<LinkError> for PipelineError {
    fn from(e: LinkError) -> Self {
        PipelineError::Link(e)
    }
}

impl From<RuntimeError> for PipelineError {
    fn from(e: RuntimeError) -> Self {
        PipelineError::Runtime(e)
    }
}

impl From<DataError> for PipelineError {
    fn from(e: DataError) -> Self {
        PipelineError::Data(e)
    }
}

/// One entry of the per-rule failure report.
///
/// Compilation of unrelated edges continues after a failure so the full
/// report can be produced; any non-empty report is terminal for the batch.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Name of the edge's origin.
    pub from: String,
    /// Name of the edge's destination.
    pub to: String,
    pub stage: Stage,
    pub message: String,
}

impl Diagnostic {
    pub fn new(from: impl Into<String>, to: impl Into<String>, error: &PipelineError) -> Self {
        Diagnostic {
            from: from.into(),
            to: to.into(),
            stage: error.stage(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: [{}] {}",
            self.from, self.to, self.stage, self.message
        )
    }
}
