//! Token lexer for mustache-style templates.
//!
//! The lexer classifies raw template text into a flat, ordered list of
//! [`Token`]s. It does not evaluate anything: it only recognises tags and the
//! sigil that follows the opening delimiter.
//!
//! | Source | Kind |
//! |---|---|
//! | `{{! text }}` | [`TokenKind::Comment`] |
//! | `{{name}}`, `{{{name}}}`, `{{& name}}` | [`TokenKind::Variable`] |
//! | `{{#name}}` | [`TokenKind::SectionOpen`] |
//! | `{{^name}}` | [`TokenKind::InvertedOpen`] |
//! | `{{/name}}` | [`TokenKind::SectionClose`] |
//! | `{{> name}}` | [`TokenKind::Partial`] |
//! | `{{=<% %>=}}` | [`TokenKind::SetDelimiters`] |
//!
//! Everything between tags becomes a [`TokenKind::Text`] token.

use serde::Serialize;
use thiserror::Error;

use crate::constants::{DEFAULT_CLOSE_DELIMITER, DEFAULT_OPEN_DELIMITER};

/// Kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    /// Literal text between tags
    Text,
    /// `{{! ... }}`
    Comment,
    /// `{{name}}` and its unescaped forms
    Variable,
    /// `{{#name}}`, the start of an iteration block
    SectionOpen,
    /// `{{^name}}`
    InvertedOpen,
    /// `{{/name}}`
    SectionClose,
    /// `{{> name}}`, an include of another template
    Partial,
    /// `{{=open close=}}`
    SetDelimiters,
}

/// A single token with its payload and 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Token classification
    pub kind: TokenKind,
    /// Referenced name, comment text, or literal text
    pub value: String,
    /// Line of the token start
    pub line: usize,
    /// Column of the token start
    pub column: usize,
}

/// Malformed template syntax.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// An opening delimiter without a matching closing delimiter
    #[error("unclosed tag at line {line}, column {column}")]
    UnclosedTag { line: usize, column: usize },

    /// A variable, section, or partial tag with no name
    #[error("empty tag at line {line}, column {column}")]
    EmptyTag { line: usize, column: usize },

    /// A set-delimiter tag that is not `{{=open close=}}`
    #[error("invalid delimiter tag '{tag}' at line {line}, column {column}")]
    InvalidDelimiters { tag: String, line: usize, column: usize },

    /// A section close with no open section
    #[error("unexpected section close '{name}' at line {line}, column {column}")]
    UnmatchedClose { name: String, line: usize, column: usize },

    /// A section close whose name differs from the innermost open section
    #[error("section '{expected}' closed by '{found}' at line {line}, column {column}")]
    MismatchedClose {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },

    /// A section still open at the end of input
    #[error("section '{name}' opened at line {line}, column {column} is never closed")]
    UnclosedSection { name: String, line: usize, column: usize },
}

/// Lex a template into an ordered token list.
///
/// Pure function of its input. Malformed syntax is reported as a [`LexError`]
/// carrying the position of the offending tag.
///
/// # Examples
///
/// ```rust
/// use tiergraph::template::lexer::{TokenKind, lex};
///
/// let tokens = lex("Hello {{name}}{{> small-footer}}").unwrap();
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(kinds, vec![TokenKind::Text, TokenKind::Variable, TokenKind::Partial]);
/// assert_eq!(tokens[2].value, "small-footer");
/// ```
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    open: String,
    close: String,
    sections: Vec<(String, usize, usize)>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            open: DEFAULT_OPEN_DELIMITER.to_string(),
            close: DEFAULT_CLOSE_DELIMITER.to_string(),
            sections: Vec::new(),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while self.pos < self.source.len() {
            let rest = &self.source[self.pos..];
            match rest.find(self.open.as_str()) {
                Some(offset) => {
                    if offset > 0 {
                        self.push(TokenKind::Text, rest[..offset].to_string(), self.pos);
                    }
                    self.pos += offset;
                    self.lex_tag()?;
                }
                None => {
                    self.push(TokenKind::Text, rest.to_string(), self.pos);
                    self.pos = self.source.len();
                }
            }
        }

        if let Some((name, line, column)) = self.sections.pop() {
            return Err(LexError::UnclosedSection {
                name,
                line,
                column,
            });
        }

        Ok(self.tokens)
    }

    /// Lex one tag starting at `self.pos` (which points at the open delimiter).
    fn lex_tag(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        let (line, column) = self.position(start);
        let body_start = start + self.open.len();
        let body = &self.source[body_start..];

        // Triple mustache only exists with the default delimiters
        if self.open == DEFAULT_OPEN_DELIMITER && body.starts_with('{') {
            let end = body.find("}}}").ok_or(LexError::UnclosedTag {
                line,
                column,
            })?;
            let name = body[1..end].trim().to_string();
            if name.is_empty() {
                return Err(LexError::EmptyTag {
                    line,
                    column,
                });
            }
            self.pos = body_start + end + 3;
            self.push(TokenKind::Variable, name, start);
            return Ok(());
        }

        let end = body.find(self.close.as_str()).ok_or(LexError::UnclosedTag {
            line,
            column,
        })?;
        let inner = &body[..end];
        self.pos = body_start + end + self.close.len();

        let mut chars = inner.chars();
        let sigil = chars.next();
        let rest = chars.as_str();

        match sigil {
            Some('!') => self.push(TokenKind::Comment, rest.trim().to_string(), start),
            Some('#') => {
                let name = Self::tag_name(rest, line, column)?;
                self.sections.push((name.clone(), line, column));
                self.push(TokenKind::SectionOpen, name, start);
            }
            Some('^') => {
                let name = Self::tag_name(rest, line, column)?;
                self.sections.push((name.clone(), line, column));
                self.push(TokenKind::InvertedOpen, name, start);
            }
            Some('/') => {
                let name = Self::tag_name(rest, line, column)?;
                match self.sections.pop() {
                    Some((open_name, _, _)) if open_name == name => {}
                    Some((open_name, _, _)) => {
                        return Err(LexError::MismatchedClose {
                            expected: open_name,
                            found: name,
                            line,
                            column,
                        });
                    }
                    None => {
                        return Err(LexError::UnmatchedClose {
                            name,
                            line,
                            column,
                        });
                    }
                }
                self.push(TokenKind::SectionClose, name, start);
            }
            Some('>') => {
                let name = Self::tag_name(rest, line, column)?;
                self.push(TokenKind::Partial, name, start);
            }
            Some('&') => {
                let name = Self::tag_name(rest, line, column)?;
                self.push(TokenKind::Variable, name, start);
            }
            Some('=') => {
                let (open, close) = Self::delimiters(inner, line, column)?;
                self.push(TokenKind::SetDelimiters, format!("{open} {close}"), start);
                self.open = open;
                self.close = close;
            }
            _ => {
                let name = Self::tag_name(inner, line, column)?;
                self.push(TokenKind::Variable, name, start);
            }
        }

        Ok(())
    }

    fn tag_name(raw: &str, line: usize, column: usize) -> Result<String, LexError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(LexError::EmptyTag {
                line,
                column,
            });
        }
        Ok(name.to_string())
    }

    /// Parse the body of `{{=open close=}}`.
    fn delimiters(inner: &str, line: usize, column: usize) -> Result<(String, String), LexError> {
        let invalid = || LexError::InvalidDelimiters {
            tag: inner.to_string(),
            line,
            column,
        };

        let body = inner
            .strip_prefix('=')
            .and_then(|s| s.strip_suffix('='))
            .ok_or_else(invalid)?;
        let mut parts = body.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(open), Some(close), None) if !open.contains('=') && !close.contains('=') => {
                Ok((open.to_string(), close.to_string()))
            }
            _ => Err(invalid()),
        }
    }

    fn push(&mut self, kind: TokenKind, value: String, offset: usize) {
        let (line, column) = self.position(offset);
        self.tokens.push(Token {
            kind,
            value,
            line,
            column,
        });
    }

    /// 1-based line and column (in characters) of a byte offset.
    fn position(&self, offset: usize) -> (usize, usize) {
        let before = &self.source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_all_tag_kinds_in_order() {
        let source = "{{! note }}<h1>{{title}}</h1>{{#items}}{{name}}{{/items}}{{^empty}}none{{/empty}}{{> small-footer}}";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Comment,
                TokenKind::Text,
                TokenKind::Variable,
                TokenKind::Text,
                TokenKind::SectionOpen,
                TokenKind::Variable,
                TokenKind::SectionClose,
                TokenKind::InvertedOpen,
                TokenKind::Text,
                TokenKind::SectionClose,
                TokenKind::Partial,
            ]
        );
    }

    #[test]
    fn test_lex_payloads_are_trimmed() {
        let tokens = lex("{{  title  }}{{>   medium-card }}{{!  @import {\"name\":\"x\"}  }}").unwrap();
        assert_eq!(tokens[0].value, "title");
        assert_eq!(tokens[1].value, "medium-card");
        assert_eq!(tokens[2].value, "@import {\"name\":\"x\"}");
    }

    #[test]
    fn test_lex_unescaped_variables() {
        let tokens = lex("{{{body}}} and {{& raw}}").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Variable);
        assert_eq!(tokens[0].value, "body");
        assert_eq!(tokens[2].kind, TokenKind::Variable);
        assert_eq!(tokens[2].value, "raw");
    }

    #[test]
    fn test_lex_plain_text() {
        let tokens = lex("no tags here").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Text);
        assert!(lex("").unwrap().is_empty());
    }

    #[test]
    fn test_lex_set_delimiters() {
        let tokens = lex("{{=<% %>=}}<% title %>{{not_a_tag}}<%> small-x %>").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::SetDelimiters);
        assert_eq!(tokens[0].value, "<% %>");
        assert_eq!(tokens[1].kind, TokenKind::Variable);
        assert_eq!(tokens[1].value, "title");
        assert_eq!(tokens[2].kind, TokenKind::Text);
        assert_eq!(tokens[2].value, "{{not_a_tag}}");
        assert_eq!(tokens[3].kind, TokenKind::Partial);
        assert_eq!(tokens[3].value, "small-x");
    }

    #[test]
    fn test_lex_positions() {
        let tokens = lex("line one\n  {{title}}").unwrap();
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 3);
    }

    #[test]
    fn test_lex_unclosed_tag() {
        let err = lex("ok\n{{title").unwrap_err();
        assert_eq!(
            err,
            LexError::UnclosedTag {
                line: 2,
                column: 1
            }
        );
    }

    #[test]
    fn test_lex_empty_tag() {
        assert!(matches!(lex("{{ }}"), Err(LexError::EmptyTag { .. })));
        assert!(matches!(lex("{{> }}"), Err(LexError::EmptyTag { .. })));
    }

    #[test]
    fn test_lex_section_mismatch() {
        assert!(matches!(lex("{{#a}}{{/b}}"), Err(LexError::MismatchedClose { .. })));
        assert!(matches!(lex("{{/a}}"), Err(LexError::UnmatchedClose { .. })));
        assert!(matches!(lex("{{#a}}text"), Err(LexError::UnclosedSection { .. })));
    }

    #[test]
    fn test_lex_invalid_delimiters() {
        assert!(matches!(lex("{{=<%=}}"), Err(LexError::InvalidDelimiters { .. })));
        assert!(matches!(lex("{{=<% %>}}"), Err(LexError::InvalidDelimiters { .. })));
    }
}
