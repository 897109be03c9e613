//! Tokenizer and block tree for the MSTS bracketed text format
//!
//! ```text
//! name ( items... )          block
//! name label ( items... )    labelled block (matrix, anim_node, prim_state)
//! word | "quoted string"     scalar item
//! ```

use glam::{Vec2, Vec3};

use crate::error::{ConvertError, Result};

/// Block names that carry a label between the name and the bracket
const LABELLED_BLOCKS: &[&str] = &["matrix", "anim_node", "prim_state"];

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Open,
    Close,
    Word(String),
}

pub fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut word = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        // Only quotes are escaped; backslashes in paths stay as written
                        Some('\\') if chars.peek() == Some(&'"') => {
                            chars.next();
                            word.push('"');
                        }
                        Some(other) => word.push(other),
                        None => return Err(ConvertError::syntax("unterminated string")),
                    }
                }
                tokens.push(Token::Word(word));
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '"') {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Word(String),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub name: String,
    pub label: Option<String>,
    pub items: Vec<Item>,
}

/// Build the block tree. The returned root block is unnamed and holds the
/// top-level items.
pub fn parse_tree(tokens: &[Token]) -> Result<Block> {
    let mut stack = vec![Block::default()];
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Word(word) => {
                let next = tokens.get(i + 1);
                if next == Some(&Token::Open) {
                    stack.push(Block {
                        name: word.clone(),
                        ..Default::default()
                    });
                    i += 2;
                    continue;
                }
                if LABELLED_BLOCKS.contains(&word.as_str()) {
                    if let (Some(Token::Word(label)), Some(Token::Open)) = (next, tokens.get(i + 2)) {
                        stack.push(Block {
                            name: word.clone(),
                            label: Some(label.clone()),
                            items: Vec::new(),
                        });
                        i += 3;
                        continue;
                    }
                }
                push_item(&mut stack, Item::Word(word.clone()));
            }
            Token::Open => {
                return Err(ConvertError::syntax(format!(
                    "unnamed block inside '{}'",
                    stack.last().map_or("", |b| b.name.as_str())
                )));
            }
            Token::Close => {
                if stack.len() < 2 {
                    return Err(ConvertError::syntax("unbalanced ')'"));
                }
                if let Some(block) = stack.pop() {
                    push_item(&mut stack, Item::Block(block));
                }
            }
        }
        i += 1;
    }

    if stack.len() > 1 {
        let open = stack.last().map_or("", |b| b.name.as_str());
        return Err(ConvertError::syntax(format!("unclosed block '{open}'")));
    }
    stack
        .pop()
        .ok_or_else(|| ConvertError::syntax("empty block stack"))
}

fn push_item(stack: &mut [Block], item: Item) {
    if let Some(parent) = stack.last_mut() {
        parent.items.push(item);
    }
}

impl Block {
    pub fn fields(&self) -> Fields<'_> {
        Fields { block: self, pos: 0 }
    }

    /// Child blocks in order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.items.iter().filter_map(|item| match item {
            Item::Block(block) => Some(block),
            Item::Word(_) => None,
        })
    }

    pub fn children<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Block> + use<'a, 'n> {
        self.blocks().filter(move |b| b.name.eq_ignore_ascii_case(name))
    }

    pub fn child(&self, name: &str) -> Option<&Block> {
        self.children(name).next()
    }

    pub fn require(&self, name: &str) -> Result<&Block> {
        self.child(name).ok_or_else(|| {
            ConvertError::syntax(format!("'{}' is missing block '{name}'", self.name))
        })
    }

    pub fn require_label(&self) -> Result<&str> {
        self.label
            .as_deref()
            .ok_or_else(|| ConvertError::syntax(format!("'{}' has no name", self.name)))
    }
}

/// Positional reader over a block's items
pub struct Fields<'a> {
    block: &'a Block,
    pos: usize,
}

impl<'a> Fields<'a> {
    fn next_item(&mut self) -> Option<&'a Item> {
        let item = self.block.items.get(self.pos);
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn error(&self, message: impl std::fmt::Display) -> ConvertError {
        ConvertError::syntax(format!("'{}': {message}", self.block.name))
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.block.items.len()
    }

    /// Next item is a word (a number, a name or a quoted string)
    pub fn word(&mut self) -> Result<&'a str> {
        match self.next_item() {
            Some(Item::Word(word)) => Ok(word),
            Some(Item::Block(block)) => {
                Err(self.error(format!("expected a value, found block '{}'", block.name)))
            }
            None => Err(self.error("missing value")),
        }
    }

    /// Next item is a block with the given name
    pub fn block(&mut self, name: &str) -> Result<&'a Block> {
        match self.next_item() {
            Some(Item::Block(block)) if block.name.eq_ignore_ascii_case(name) => Ok(block),
            Some(Item::Block(block)) => {
                Err(self.error(format!("expected '{name}', found '{}'", block.name)))
            }
            Some(Item::Word(word)) => Err(self.error(format!("expected '{name}', found '{word}'"))),
            None => Err(self.error(format!("missing '{name}'"))),
        }
    }

    pub fn f32(&mut self) -> Result<f32> {
        let word = self.word()?;
        word.parse()
            .map_err(|_| self.error(format!("expected a number, found '{word}'")))
    }

    pub fn i32(&mut self) -> Result<i32> {
        let word = self.word()?;
        word.parse()
            .map_err(|_| self.error(format!("expected an integer, found '{word}'")))
    }

    pub fn u32(&mut self) -> Result<u32> {
        let word = self.word()?;
        word.parse()
            .map_err(|_| self.error(format!("expected an index, found '{word}'")))
    }

    /// Hexadecimal field (flags, colours)
    pub fn hex(&mut self) -> Result<u32> {
        let word = self.word()?;
        u32::from_str_radix(word, 16)
            .map_err(|_| self.error(format!("expected a hex value, found '{word}'")))
    }

    pub fn vec2(&mut self) -> Result<Vec2> {
        Ok(Vec2::new(self.f32()?, self.f32()?))
    }

    pub fn vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.f32()?, self.f32()?, self.f32()?))
    }

    /// `n v1 .. vn`: a count followed by exactly that many values
    pub fn counted<T>(&mut self, mut read: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let count = self.u32()?;
        let mut values = Vec::with_capacity((count as usize).min(4096));
        for _ in 0..count {
            values.push(read(self)?);
        }
        Ok(values)
    }
}
