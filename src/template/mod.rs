//! Template lexing, annotation parsing, and event-emitting template parsing.
//!
//! - [`lexer`] - classifies raw template text into ordered tokens
//! - [`annotation`] - `@import` / `@node` directives embedded in comments
//! - [`parser`] - turns one template's tokens into [`ParseEvent`]s

pub mod annotation;
pub mod lexer;
pub mod parser;


pub use annotation::{AnnotationBlock, AnnotationKind};
pub use lexer::{LexError, Token, TokenKind, lex};
pub use parser::{EventSink, ParseError, ParseEvent, TemplateParser, parse_str, parse_template};
