pub mod sl {
    pub use crate::buffer::{Buffer, Line, LineEnding, Position};
    pub use crate::context::Context;
    pub use crate::contrib::patterns;
    pub use crate::cursor::Cursor;
    pub use crate::error::{Diagnostic, ParseError, Recoverable};
    pub use crate::event::{Channel, Event, Hub};
    pub use crate::expr::{Expr, FindIter, Leaf, Repetition, Sequence, Set};
    pub use crate::matching::{Flatten, Match, MatchKind, Origin};
    pub use crate::multiplicity::{CountRange, Multiplicity, Ranges};
    pub use crate::parser::{Parser, ParserConfig};
    pub use crate::registry::{Arg, Instruction, Mnemonic, Processor, Registry, Validator};
    pub use crate::rule::{Callback, PostCheck, PreCheck, Rule, Transform};
    pub use crate::scope::{always, rule, Grammar, GrammarBuilder, Pattern, RuleSpec, Scope};
    pub use crate::tree::{Element, NodeId, ScopeNode, ScopeTree, Value};
}
