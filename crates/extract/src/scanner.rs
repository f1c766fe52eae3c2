//! String-aware byte scanner shared by every repair pass.
//!
//! All delimiters the parser cares about are ASCII, and UTF-8 continuation
//! bytes never collide with ASCII, so every offset reported for a structural
//! byte is also a valid `str` char boundary.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    OutsideString,
    InsideString,
    EscapePending,
}

/// What a single byte turned out to be once string context is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Byte outside any string literal
    Structural(u8),
    QuoteOpen,
    QuoteClose,
    /// Byte inside a string literal, including escapes
    Quoted,
}

#[derive(Debug, Clone, Default)]
pub struct Scanner {
    state: ScanState,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn step(&mut self, byte: u8) -> Token {
        match (self.state, byte) {
            (ScanState::OutsideString, b'"') => {
                self.state = ScanState::InsideString;
                Token::QuoteOpen
            }
            (ScanState::OutsideString, b) => Token::Structural(b),
            (ScanState::InsideString, b'\\') => {
                self.state = ScanState::EscapePending;
                Token::Quoted
            }
            (ScanState::InsideString, b'"') => {
                self.state = ScanState::OutsideString;
                Token::QuoteClose
            }
            (ScanState::InsideString, _) => Token::Quoted,
            (ScanState::EscapePending, _) => {
                self.state = ScanState::InsideString;
                Token::Quoted
            }
        }
    }
}

/// Tokenize `text`, yielding `(byte offset, token)` pairs
pub fn tokens(text: &str) -> impl Iterator<Item = (usize, Token)> + '_ {
    let mut scanner = Scanner::new();
    text.bytes()
        .enumerate()
        .map(move |(idx, byte)| (idx, scanner.step(byte)))
}

/// Return the span from `start` through its matching closing delimiter.
///
/// `text[start]` must be `open`. Only the `open`/`close` pair is counted.
/// Returns `None` when input ends before depth returns to zero.
pub fn balanced_span(text: &str, start: usize, open: u8, close: u8) -> Option<&str> {
    let mut depth = 0usize;

    for (idx, token) in tokens(&text[start..]) {
        match token {
            Token::Structural(b) if b == open => depth += 1,
            Token::Structural(b) if b == close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..=start + idx]);
                }
            }
            _ => {}
        }
    }

    None
}
