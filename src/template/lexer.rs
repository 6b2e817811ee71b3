use std::fmt;

use crate::error::{Error, Result};

/// Token types for the template surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Raw text between tags
    Text(String),

    /// Output expression `{{ expr }}`
    Output(String),

    /// `{% extends "name" %}`
    Extends(String),

    /// `{% block name %}` or shortcut `{% block name expr %}`
    BlockStart {
        name: String,
        shortcut: Option<String>,
    },

    /// `{% endblock %}` or `{% endblock name %}`
    EndBlock(Option<String>),

    /// `{% if cond %}`
    If(String),
    Else,
    EndIf,

    /// `{% for item in collection %}`
    For { item: String, collection: String },
    EndFor,

    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at {}:{}", self.kind, self.line, self.column)
    }
}

/// Lexer for template source
pub struct Lexer<'a> {
    name: &'a str,
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(name: &'a str, input: &str) -> Self {
        Self {
            name,
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        if self.current() == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> Error {
        Error::Syntax {
            name: self.name.to_string(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Tokenize the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut text = String::new();
        let mut text_line = self.line;
        let mut text_column = self.column;

        while let Some(c) = self.current() {
            let tag = c == '{' && matches!(self.peek(), Some('{') | Some('%') | Some('#'));
            if tag {
                if !text.is_empty() {
                    tokens.push(Token::new(
                        TokenKind::Text(std::mem::take(&mut text)),
                        text_line,
                        text_column,
                    ));
                }
                match self.peek() {
                    Some('{') => tokens.push(self.lex_output()?),
                    Some('%') => tokens.push(self.lex_statement()?),
                    _ => self.skip_comment()?,
                }
                text_line = self.line;
                text_column = self.column;
            } else {
                if text.is_empty() {
                    text_line = self.line;
                    text_column = self.column;
                }
                text.push(c);
                self.advance();
            }
        }

        if !text.is_empty() {
            tokens.push(Token::new(TokenKind::Text(text), text_line, text_column));
        }
        tokens.push(Token::new(TokenKind::Eof, self.line, self.column));
        Ok(tokens)
    }

    /// Consume the body of a delimited tag, starting just past the opener,
    /// up to and including the two-character closer.
    fn tag_body(&mut self, closer: [char; 2], what: &str, line: usize, column: usize) -> Result<String> {
        let mut body = String::new();
        loop {
            match self.current() {
                None => return Err(self.error(line, column, format!("unterminated {}", what))),
                Some(c) if c == closer[0] && self.peek() == Some(closer[1]) => {
                    self.advance();
                    self.advance();
                    return Ok(body);
                }
                Some(c) => {
                    body.push(c);
                    self.advance();
                }
            }
        }
    }

    fn lex_output(&mut self) -> Result<Token> {
        let (line, column) = (self.line, self.column);
        self.advance();
        self.advance();
        let body = self.tag_body(['}', '}'], "expression", line, column)?;
        let expr = body.trim();
        if expr.is_empty() {
            return Err(self.error(line, column, "empty expression"));
        }
        Ok(Token::new(TokenKind::Output(expr.to_string()), line, column))
    }

    fn skip_comment(&mut self) -> Result<()> {
        let (line, column) = (self.line, self.column);
        self.advance();
        self.advance();
        self.tag_body(['#', '}'], "comment", line, column)?;
        Ok(())
    }

    fn lex_statement(&mut self) -> Result<Token> {
        let (line, column) = (self.line, self.column);
        self.advance();
        self.advance();
        let body = self.tag_body(['%', '}'], "statement", line, column)?;
        let body = body.trim();

        let keyword = body.split_whitespace().next().unwrap_or("");
        if keyword.is_empty() {
            return Err(self.error(line, column, "empty statement"));
        }
        let rest = body[keyword.len()..].trim();

        let kind = match keyword {
            "extends" => TokenKind::Extends(self.quoted_name(rest, line, column)?),
            "block" => {
                let name = rest.split_whitespace().next().unwrap_or("");
                if !is_identifier(name) {
                    return Err(self.error(line, column, "block requires a name"));
                }
                let shortcut = rest[name.len()..].trim();
                TokenKind::BlockStart {
                    name: name.to_string(),
                    shortcut: if shortcut.is_empty() {
                        None
                    } else {
                        Some(shortcut.to_string())
                    },
                }
            }
            "endblock" => {
                if rest.is_empty() {
                    TokenKind::EndBlock(None)
                } else if is_identifier(rest) {
                    TokenKind::EndBlock(Some(rest.to_string()))
                } else {
                    return Err(self.error(line, column, "malformed endblock"));
                }
            }
            "if" => {
                if rest.is_empty() {
                    return Err(self.error(line, column, "if requires a condition"));
                }
                TokenKind::If(rest.to_string())
            }
            "else" => self.bare(rest, TokenKind::Else, "else", line, column)?,
            "endif" => self.bare(rest, TokenKind::EndIf, "endif", line, column)?,
            "endfor" => self.bare(rest, TokenKind::EndFor, "endfor", line, column)?,
            "for" => match rest.split_once(" in ") {
                Some((item, collection))
                    if is_identifier(item.trim()) && !collection.trim().is_empty() =>
                {
                    TokenKind::For {
                        item: item.trim().to_string(),
                        collection: collection.trim().to_string(),
                    }
                }
                _ => {
                    return Err(self.error(
                        line,
                        column,
                        "for requires the form 'for <name> in <expr>'",
                    ));
                }
            },
            other => {
                return Err(self.error(line, column, format!("unknown statement '{}'", other)));
            }
        };
        Ok(Token::new(kind, line, column))
    }

    fn bare(
        &self,
        rest: &str,
        kind: TokenKind,
        what: &str,
        line: usize,
        column: usize,
    ) -> Result<TokenKind> {
        if rest.is_empty() {
            Ok(kind)
        } else {
            Err(self.error(line, column, format!("{} takes no arguments", what)))
        }
    }

    fn quoted_name(&self, raw: &str, line: usize, column: usize) -> Result<String> {
        let inner = raw
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
        match inner {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(self.error(
                line,
                column,
                "extends requires a quoted template name",
            )),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
