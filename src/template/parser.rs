//! Page template parser.
//!
//! A page is scanned once into text runs and `{{...}}` tags, then folded into
//! a tree with an explicit stack of open blocks. Supported tags:
//!
//! - `{{path}}` variable
//! - `{{#if path}}` ... `{{else}}` ... `{{/if}}`
//! - `{{#each path}}` ... `{{/each}}`

use super::{Result, TemplateError};

/// A node in a parsed page.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal markup.
    Text(String),

    /// `{{path}}`
    Variable(String),

    /// `{{#if path}}...{{else}}...{{/if}}`
    If {
        condition: String,
        then_branch: Vec<Node>,
        else_branch: Vec<Node>,
    },

    /// `{{#each path}}...{{/each}}`, each item bound to `this`.
    Each { list: String, body: Vec<Node> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    If,
    Each,
}

impl Block {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "if" => Some(Block::If),
            "each" => Some(Block::Each),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Block::If => "if",
            Block::Each => "each",
        }
    }
}

/// One lexical piece of a page.
#[derive(Debug, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Variable(&'a str),
    Open(Block, &'a str),
    Else,
    Close(Block),
}

/// A block whose closing tag has not been seen yet.
struct OpenBlock {
    block: Block,
    path: String,
    body: Vec<Node>,
    /// Set once `{{else}}` is seen.
    otherwise: Option<Vec<Node>>,
}

impl OpenBlock {
    fn target(&mut self) -> &mut Vec<Node> {
        match &mut self.otherwise {
            Some(nodes) => nodes,
            None => &mut self.body,
        }
    }

    fn finish(self) -> Node {
        match self.block {
            Block::If => Node::If {
                condition: self.path,
                then_branch: self.body,
                else_branch: self.otherwise.unwrap_or_default(),
            },
            Block::Each => Node::Each {
                list: self.path,
                body: self.body,
            },
        }
    }
}

/// Parse a page into nodes.
pub fn parse(source: &str) -> Result<Vec<Node>> {
    let mut root = Vec::new();
    let mut open: Vec<OpenBlock> = Vec::new();

    for token in tokenize(source)? {
        let target = match open.last_mut() {
            Some(block) => block.target(),
            None => &mut root,
        };

        match token {
            Token::Text(text) => target.push(Node::Text(text.to_string())),
            Token::Variable(path) => target.push(Node::Variable(path.to_string())),
            Token::Open(block, path) => open.push(OpenBlock {
                block,
                path: path.to_string(),
                body: Vec::new(),
                otherwise: None,
            }),
            Token::Else => match open.last_mut() {
                Some(top) if top.block == Block::If && top.otherwise.is_none() => {
                    top.otherwise = Some(Vec::new());
                }
                _ => return Err(TemplateError::Parse("{{else}} outside an if block".into())),
            },
            Token::Close(block) => {
                let top = open.pop().ok_or_else(|| {
                    TemplateError::Parse(format!("{{{{/{}}}}} without an open block", block.keyword()))
                })?;
                if top.block != block {
                    return Err(TemplateError::Parse(format!(
                        "{{{{/{}}}}} closes {{{{#{} {}}}}}",
                        block.keyword(),
                        top.block.keyword(),
                        top.path
                    )));
                }
                let node = top.finish();
                match open.last_mut() {
                    Some(parent) => parent.target().push(node),
                    None => root.push(node),
                }
            }
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(TemplateError::Parse(format!(
            "unclosed {{{{#{} {}}}}}",
            unclosed.block.keyword(),
            unclosed.path
        )));
    }

    Ok(root)
}

/// Split a page into text runs and tags.
fn tokenize(source: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }

        let inner_start = start + 2;
        let len = rest[inner_start..].find("}}").ok_or_else(|| {
            TemplateError::Parse(format!("unterminated tag at offset {}", offset + start))
        })?;
        let tag = rest[inner_start..inner_start + len].trim();
        tokens.push(classify(tag).map_err(|e| match e {
            TemplateError::Parse(msg) => {
                TemplateError::Parse(format!("{msg} at offset {}", offset + start))
            }
            other => other,
        })?);

        let consumed = inner_start + len + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }

    Ok(tokens)
}

/// Classify the trimmed contents of a `{{...}}` tag.
fn classify(tag: &str) -> Result<Token<'_>> {
    if tag == "else" {
        return Ok(Token::Else);
    }

    if let Some(opening) = tag.strip_prefix('#') {
        let (keyword, path) = opening
            .split_once(char::is_whitespace)
            .ok_or_else(|| TemplateError::Parse(format!("block without a path: {{{{{tag}}}}}")))?;
        let block = Block::from_keyword(keyword)
            .ok_or_else(|| TemplateError::Parse(format!("unknown block: {keyword}")))?;
        return Ok(Token::Open(block, checked_path(path.trim())?));
    }

    if let Some(closing) = tag.strip_prefix('/') {
        let block = Block::from_keyword(closing.trim())
            .ok_or_else(|| TemplateError::Parse(format!("unknown block: {closing}")))?;
        return Ok(Token::Close(block));
    }

    Ok(Token::Variable(checked_path(tag)?))
}

/// A dotted lookup path such as `account.email`.
fn checked_path(path: &str) -> Result<&str> {
    let valid = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.');

    if valid {
        Ok(path)
    } else {
        Err(TemplateError::Parse(format!("invalid path: {path:?}")))
    }
}
