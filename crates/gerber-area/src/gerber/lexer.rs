/// Tokens produced by the Gerber lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A literal `%`, marking entry to or exit from an extended command block.
    Delimiter,
    /// A command body. The `*` terminator is not retained.
    /// Example: `"FSLAX24Y24"`, `"X100Y200D01"`, `"G04 comment"`
    Command(String),
}

/// Split a Gerber program into tokens.
///
/// Line breaks are removed first, so a command may span lines. `%` is kept as
/// its own token; `*` ends a command and is dropped. Nothing else is validated.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut body = String::new();

    for ch in input.chars() {
        match ch {
            '\n' | '\r' => {}
            '%' => {
                flush(&mut body, &mut tokens);
                tokens.push(Token::Delimiter);
            }
            '*' => flush(&mut body, &mut tokens),
            c => body.push(c),
        }
    }
    // A trailing command without `*` is still a command.
    flush(&mut body, &mut tokens);

    tokens
}

fn flush(body: &mut String, tokens: &mut Vec<Token>) {
    if !body.is_empty() {
        tokens.push(Token::Command(std::mem::take(body)));
    }
}

/// A read position over a token slice.
///
/// Interpretation walks the stream through this cursor instead of sharing a
/// mutable index, so every consumer reports the exact token it failed on.
#[derive(Debug, Clone, Copy)]
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    /// Consume one token, returning it with its index.
    pub fn bump(&mut self) -> Option<(usize, &'a Token)> {
        let token = self.tokens.get(self.pos)?;
        let at = self.pos;
        self.pos += 1;
        Some((at, token))
    }

    /// Consume command tokens up to (not including) the next delimiter.
    pub fn take_until_delimiter(&mut self) -> Vec<(usize, &'a str)> {
        let mut taken = Vec::new();
        while let Some(Token::Command(body)) = self.peek() {
            taken.push((self.pos, body.as_str()));
            self.pos += 1;
        }
        taken
    }
}
