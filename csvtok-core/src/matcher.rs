use std::collections::VecDeque;
use std::fmt;

use memchr::memmem;

/// The outcome of probing a window of pending characters against a set of
/// tokens.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Probe {
    /// A complete token was found at the start of the window.
    ///
    /// `index` is the position of the token in declaration order and `len`
    /// is its length in characters.
    Match {
        /// The index of the matched token.
        index: usize,
        /// The number of characters spanned by the token.
        len: usize,
    },
    /// The window is a proper prefix of at least one token, so the outcome
    /// depends on characters that have not arrived yet.
    Incomplete,
    /// No token can match at this position.
    NoMatch,
}

#[derive(Clone, Eq, PartialEq)]
struct Token {
    text: String,
    chars: Box<[char]>,
}

/// An ordered set of candidate tokens.
///
/// Tokens are matched greedily: the longest token that fits wins, and when
/// two tokens of the same length fit, the one declared first wins.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct TokenSet {
    tokens: Vec<Token>,
}

impl TokenSet {
    /// Create a token set from the given tokens, in declaration order.
    ///
    /// Duplicate tokens are kept once, at their first position.
    pub fn new<I, S>(tokens: I) -> TokenSet
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = TokenSet::default();
        for tok in tokens {
            set.push(tok.into());
        }
        set
    }

    /// The union of several token sets, preserving the order in which tokens
    /// are first seen.
    pub fn union<'a, I>(sets: I) -> TokenSet
    where
        I: IntoIterator<Item = &'a TokenSet>,
    {
        let mut set = TokenSet::default();
        for other in sets {
            for tok in &other.tokens {
                set.push(tok.text.clone());
            }
        }
        set
    }

    fn push(&mut self, text: String) {
        if self.tokens.iter().any(|t| t.text == text) {
            return;
        }
        let chars = text.chars().collect::<Vec<char>>().into_boxed_slice();
        self.tokens.push(Token { text, chars });
    }

    /// Returns true if this set has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The number of tokens in this set.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Return the token at index `i`.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.tokens.get(i).map(|t| &*t.text)
    }

    /// The first declared token. This is the one written by the encoder.
    pub fn first(&self) -> Option<&str> {
        self.get(0)
    }

    /// Iterate over the tokens in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| &*t.text)
    }

    /// The length, in characters, of the longest token.
    pub fn max_len(&self) -> usize {
        self.tokens.iter().map(|t| t.chars.len()).max().unwrap_or(0)
    }

    /// Returns true if any token is the empty string.
    pub(crate) fn has_empty(&self) -> bool {
        self.tokens.iter().any(|t| t.text.is_empty())
    }

    /// Probe the characters in `window` starting at `at` against every
    /// token in this set.
    ///
    /// When `eof` is false, a window that could still grow into a longer
    /// token yields `Probe::Incomplete` even if a shorter token already
    /// matches. When `eof` is true, the best complete match is returned.
    pub fn probe(
        &self,
        window: &VecDeque<char>,
        at: usize,
        eof: bool,
    ) -> Probe {
        let mut best: Option<(usize, usize)> = None;
        for (index, tok) in self.tokens.iter().enumerate() {
            match fit(&tok.chars, window, at) {
                Fit::Full => {
                    let len = tok.chars.len();
                    if best.map_or(true, |(_, blen)| len > blen) {
                        best = Some((index, len));
                    }
                }
                Fit::Partial => {
                    if !eof {
                        return Probe::Incomplete;
                    }
                }
                Fit::None => {}
            }
        }
        match best {
            Some((index, len)) => Probe::Match { index, len },
            None => Probe::NoMatch,
        }
    }

    /// Like `probe`, but only considers the token at `index`.
    pub fn probe_token(
        &self,
        index: usize,
        window: &VecDeque<char>,
        at: usize,
        eof: bool,
    ) -> Probe {
        let tok = match self.tokens.get(index) {
            None => return Probe::NoMatch,
            Some(tok) => tok,
        };
        match fit(&tok.chars, window, at) {
            Fit::Full => Probe::Match { index, len: tok.chars.len() },
            Fit::Partial if !eof => Probe::Incomplete,
            Fit::Partial | Fit::None => Probe::NoMatch,
        }
    }

    /// Return the byte length of the longest token that `text[pos..]`
    /// starts with.
    pub fn match_at(&self, text: &str, pos: usize) -> Option<usize> {
        let rest = &text[pos..];
        let mut best: Option<usize> = None;
        for tok in &self.tokens {
            let len = tok.text.len();
            if len > 0
                && rest.starts_with(&*tok.text)
                && best.map_or(true, |b| len > b)
            {
                best = Some(len);
            }
        }
        best
    }

    /// Returns true if any token occurs somewhere in `text`.
    pub fn contains_any(&self, text: &str) -> bool {
        self.tokens.iter().any(|tok| {
            !tok.text.is_empty()
                && memmem::find(text.as_bytes(), tok.text.as_bytes()).is_some()
        })
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

enum Fit {
    Full,
    Partial,
    None,
}

fn fit(tok: &[char], window: &VecDeque<char>, at: usize) -> Fit {
    if tok.is_empty() {
        return Fit::None;
    }
    let avail = window.len().saturating_sub(at);
    let n = tok.len().min(avail);
    for i in 0..n {
        if window[at + i] != tok[i] {
            return Fit::None;
        }
    }
    if tok.len() <= avail {
        Fit::Full
    } else {
        Fit::Partial
    }
}
