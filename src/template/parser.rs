//! Template parser: token stream → ordered parse events.
//!
//! The parser walks the tokens of one template and notifies an [`EventSink`]
//! of every field, include, and node annotation it discovers, in strict
//! source order, followed by exactly one terminal event ([`ParseEvent::Done`]
//! or [`ParseEvent::Failed`]).
//!
//! # Annotation adjacency
//!
//! An `@import` annotation applies to exactly the next include, section, or
//! variable token and is then discarded. A later annotation replaces an
//! earlier unconsumed one. `@node` annotations describe the enclosing node:
//! they are emitted immediately as [`ParseEvent::NodeInfo`] and clear any
//! pending annotation instead of becoming one.
//!
//! Variables inside a section belong to the iterated item rather than to the
//! node, so they are not emitted; they still consume a pending annotation.

use std::path::Path;
use thiserror::Error;

use super::annotation::{AnnotationBlock, AnnotationKind, CommentAnnotation, parse_comment};
use super::lexer::{LexError, Token, TokenKind, lex};
use crate::graph::Field;
use crate::resolver::source::TemplateSource;

/// One event produced while parsing a template.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent {
    /// A variable or section variable referenced at node level
    Field(Field),
    /// An include of another template
    Include {
        target: String,
        annotation: AnnotationBlock,
    },
    /// Metadata for the node being parsed
    NodeInfo(AnnotationBlock),
    /// A recognised annotation tag with an unusable payload
    Warning(String),
    /// All tokens processed (terminal)
    Done,
    /// The template could not be read or lexed (terminal)
    Failed(ParseError),
}

impl ParseEvent {
    /// Whether this is the last event of a parse.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// Why a template could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("failed to read {path}: {message}")]
    Read {
        path: String,
        kind: std::io::ErrorKind,
        message: String,
    },
    #[error("{0}")]
    Lex(#[from] LexError),
    /// The parse stopped before reaching a terminal event
    #[error("parse of {path} was interrupted")]
    Interrupted { path: String },
}

/// Receiver of parse events.
pub trait EventSink {
    fn emit(&mut self, event: ParseEvent);
}

impl EventSink for Vec<ParseEvent> {
    fn emit(&mut self, event: ParseEvent) {
        self.push(event);
    }
}

/// Per-template parser state.
#[derive(Debug, Default)]
pub struct TemplateParser {
    pending: Option<AnnotationBlock>,
    section_depth: usize,
}

impl TemplateParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a full token list, then emit [`ParseEvent::Done`].
    pub fn parse_tokens<S: EventSink + ?Sized>(mut self, tokens: &[Token], sink: &mut S) {
        for token in tokens {
            self.process(token, sink);
        }
        sink.emit(ParseEvent::Done);
    }

    fn process<S: EventSink + ?Sized>(&mut self, token: &Token, sink: &mut S) {
        match token.kind {
            TokenKind::Comment => match parse_comment(&token.value) {
                CommentAnnotation::Block(block) if block.kind == AnnotationKind::NodeMeta => {
                    self.pending = None;
                    sink.emit(ParseEvent::NodeInfo(block));
                }
                CommentAnnotation::Block(block) => self.pending = Some(block),
                CommentAnnotation::Invalid { tag, reason } => {
                    sink.emit(ParseEvent::Warning(format!(
                        "ignoring {tag} annotation at line {}: {reason}",
                        token.line
                    )));
                }
                CommentAnnotation::None => {}
            },
            TokenKind::Partial => {
                let mut annotation =
                    self.pending.take().unwrap_or_else(|| AnnotationBlock::import(&token.value));
                if annotation.display_name().is_none() {
                    annotation
                        .options
                        .insert("name".to_string(), serde_json::Value::String(token.value.clone()));
                }
                sink.emit(ParseEvent::Include {
                    target: token.value.clone(),
                    annotation,
                });
            }
            TokenKind::SectionOpen => {
                let pending = self.pending.take();
                if self.section_depth == 0 {
                    sink.emit(ParseEvent::Field(Self::field(&token.value, true, pending)));
                }
                self.section_depth += 1;
            }
            TokenKind::Variable => {
                let pending = self.pending.take();
                if self.section_depth == 0 {
                    sink.emit(ParseEvent::Field(Self::field(&token.value, false, pending)));
                }
            }
            TokenKind::InvertedOpen => self.section_depth += 1,
            TokenKind::SectionClose => self.section_depth = self.section_depth.saturating_sub(1),
            TokenKind::Text | TokenKind::SetDelimiters => {}
        }
    }

    fn field(name: &str, iterable: bool, annotation: Option<AnnotationBlock>) -> Field {
        Field {
            name: name.to_string(),
            iterable,
            annotations: annotation.map(|a| a.options).unwrap_or_default(),
        }
    }
}

/// Lex and parse template text, reporting lexer errors as [`ParseEvent::Failed`].
pub fn parse_str<S: EventSink + ?Sized>(text: &str, sink: &mut S) {
    match lex(text) {
        Ok(tokens) => TemplateParser::new().parse_tokens(&tokens, sink),
        Err(e) => sink.emit(ParseEvent::Failed(ParseError::Lex(e))),
    }
}

/// Read a template through `source` and parse it.
///
/// A read failure produces a single [`ParseEvent::Failed`] and no other events.
pub async fn parse_template<T, S>(source: &T, path: &Path, sink: &mut S)
where
    T: TemplateSource + ?Sized,
    S: EventSink + ?Sized,
{
    match source.read(path).await {
        Ok(text) => parse_str(&text, sink),
        Err(e) => {
            tracing::debug!("Failed to read template {}: {}", path.display(), e);
            sink.emit(ParseEvent::Failed(ParseError::Read {
                path: path.display().to_string(),
                kind: e.kind(),
                message: e.to_string(),
            }));
        }
    }
}
