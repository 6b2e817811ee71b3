use super::ast::{Node, TemplateAst};
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{Error, Result};

/// What ended a body parse
#[derive(Debug, PartialEq, Eq)]
enum BodyEnd {
    EndBlock(Option<String>),
    Else,
    EndIf,
    EndFor,
    Eof,
}

/// Position of the token that ended a body parse
#[derive(Debug, Clone, Copy)]
struct Stop {
    line: usize,
    column: usize,
}

/// Statement parser: turns template source into a [`TemplateAst`].
///
/// The parser performs no structural legality checks; `extends` and `block`
/// nodes land wherever they appear and placement is enforced afterwards by
/// [`crate::template::validate::validate`].
pub struct Parser<'a> {
    name: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(name: &'a str, input: &str) -> Result<Self> {
        let tokens = Lexer::new(name, input).tokenize()?;
        Ok(Self {
            name,
            tokens,
            position: 0,
        })
    }

    fn next(&mut self) -> Token {
        let token = self.tokens[self.position.min(self.tokens.len() - 1)].clone();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn error_at(&self, line: usize, column: usize, message: impl Into<String>) -> Error {
        Error::Syntax {
            name: self.name.to_string(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Parse the whole template.
    pub fn parse(&mut self) -> Result<TemplateAst> {
        let (nodes, end, stop) = self.parse_body()?;
        let message = match end {
            BodyEnd::Eof => return Ok(TemplateAst::new(self.name, nodes)),
            BodyEnd::EndBlock(_) => "endblock without an open block",
            BodyEnd::Else => "else outside of if",
            BodyEnd::EndIf => "endif without an open if",
            BodyEnd::EndFor => "endfor without an open for",
        };
        Err(self.error_at(stop.line, stop.column, message))
    }

    /// Parse nodes until a body terminator or end of input. Returns the
    /// nodes together with what stopped the parse and where.
    fn parse_body(&mut self) -> Result<(Vec<Node>, BodyEnd, Stop)> {
        let mut nodes = Vec::new();
        loop {
            let Token { kind, line, column } = self.next();
            let stop = Stop { line, column };
            let node = match kind {
                TokenKind::Text(text) => Node::Text(text),
                TokenKind::Output(expr) => Node::Output { expr, line },
                TokenKind::Extends(parent) => Node::Extends { parent, line },
                TokenKind::BlockStart { name, shortcut } => {
                    self.parse_block(name, shortcut, stop)?
                }
                TokenKind::If(condition) => self.parse_if(condition, stop)?,
                TokenKind::For { item, collection } => {
                    self.parse_for(item, collection, stop)?
                }
                TokenKind::EndBlock(name) => return Ok((nodes, BodyEnd::EndBlock(name), stop)),
                TokenKind::Else => return Ok((nodes, BodyEnd::Else, stop)),
                TokenKind::EndIf => return Ok((nodes, BodyEnd::EndIf, stop)),
                TokenKind::EndFor => return Ok((nodes, BodyEnd::EndFor, stop)),
                TokenKind::Eof => return Ok((nodes, BodyEnd::Eof, stop)),
            };
            nodes.push(node);
        }
    }

    fn parse_block(&mut self, name: String, shortcut: Option<String>, open: Stop) -> Result<Node> {
        // Shortcut form: the body is the single expression, no endblock.
        if let Some(expr) = shortcut {
            return Ok(Node::Block {
                body: vec![Node::Output {
                    expr,
                    line: open.line,
                }],
                name,
                shortcut: true,
                line: open.line,
            });
        }

        let (body, end, stop) = self.parse_body()?;
        match end {
            BodyEnd::EndBlock(None) => {}
            BodyEnd::EndBlock(Some(closed)) if closed == name => {}
            BodyEnd::EndBlock(Some(closed)) => {
                return Err(self.error_at(
                    stop.line,
                    stop.column,
                    format!("endblock '{}' does not match block '{}'", closed, name),
                ));
            }
            _ => {
                return Err(self.error_at(
                    open.line,
                    open.column,
                    format!("block '{}' is never closed", name),
                ));
            }
        }
        Ok(Node::Block {
            name,
            body,
            shortcut: false,
            line: open.line,
        })
    }

    fn parse_if(&mut self, condition: String, open: Stop) -> Result<Node> {
        let (then_branch, end, _) = self.parse_body()?;
        let else_branch = match end {
            BodyEnd::EndIf => None,
            BodyEnd::Else => {
                let (nodes, end, stop) = self.parse_body()?;
                if end != BodyEnd::EndIf {
                    return Err(self.error_at(stop.line, stop.column, "else branch is never closed"));
                }
                Some(nodes)
            }
            _ => return Err(self.error_at(open.line, open.column, "if is never closed")),
        };
        Ok(Node::If {
            condition,
            then_branch,
            else_branch,
            line: open.line,
        })
    }

    fn parse_for(&mut self, item: String, collection: String, open: Stop) -> Result<Node> {
        let (body, end, _) = self.parse_body()?;
        if end != BodyEnd::EndFor {
            return Err(self.error_at(open.line, open.column, "for is never closed"));
        }
        Ok(Node::For {
            item,
            collection,
            body,
            line: open.line,
        })
    }
}
