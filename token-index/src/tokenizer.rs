//! Streaming lexical scanner that splits raw bytes into code-word tokens.
//!
//! A token is a run of word bytes (ASCII letters, digits and `_ - . * &`)
//! at least [`MIN_TOKEN_LEN`] bytes long. Everything else, including every
//! non-ASCII byte, splits runs apart. The scanner keeps its run state across
//! reads so the chunking of the underlying reader never changes the output.

use std::borrow::Borrow;
use std::fmt;
use std::io::{self, Read};
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_READ_BUFFER_SIZE;

/// Shortest run of word bytes that is emitted as a token.
pub const MIN_TOKEN_LEN: usize = 2;

/// A case-sensitive identifier-like word extracted from file content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Build a token from raw bytes, or `None` if they do not form a valid token.
    pub fn new(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < MIN_TOKEN_LEN || !bytes.iter().copied().all(is_word_byte) {
            return None;
        }
        Some(Self(bytes.iter().map(|&b| char::from(b)).collect()))
    }

    /// The token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Token {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether `byte` can be part of a token.
pub fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b'.' | b'*' | b'&')
}

/// Lazy sequence of tokens read from `R`.
///
/// Yields tokens in occurrence order, duplicates included. A read failure is
/// yielded once as `Err` after every token completed before it, and the
/// sequence ends there.
///
/// With a cancellation token attached, the token is checked before every
/// read. Once it fires the sequence ends without reading further, even in
/// the middle of a run or a stretch of bytes that holds no tokens.
pub struct Tokens<R> {
    reader: R,
    buf: Box<[u8]>,
    filled: usize,
    pos: usize,
    run: Vec<u8>,
    done: bool,
    cancel: Option<CancellationToken>,
    cancelled: bool,
}

impl<R: Read> Tokens<R> {
    /// Tokenize `reader` with the default chunk size.
    pub fn new(reader: R) -> Self {
        Self::with_buffer_size(reader, DEFAULT_READ_BUFFER_SIZE)
    }

    /// Tokenize `reader`, reading at most `size` bytes at a time.
    pub fn with_buffer_size(reader: R, size: usize) -> Self {
        Self {
            reader,
            buf: vec![0; size.max(1)].into_boxed_slice(),
            filled: 0,
            pos: 0,
            run: Vec::new(),
            done: false,
            cancel: None,
            cancelled: false,
        }
    }

    /// Stop reading once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Whether the sequence ended because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Close the current run, returning it if it is long enough.
    fn close_run(&mut self) -> Option<Token> {
        let token = if self.run.len() >= MIN_TOKEN_LEN {
            Some(Token(self.run.iter().map(|&b| char::from(b)).collect()))
        } else {
            None
        };
        self.run.clear();
        token
    }
}

impl<R: Read> Iterator for Tokens<R> {
    type Item = io::Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pos == self.filled {
                if self.done {
                    return None;
                }
                if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                    // An unfinished run is not a token.
                    self.done = true;
                    self.cancelled = true;
                    self.run.clear();
                    return None;
                }
                match self.reader.read(&mut self.buf) {
                    Ok(0) => {
                        self.done = true;
                        return self.close_run().map(Ok);
                    }
                    Ok(n) => {
                        self.filled = n;
                        self.pos = 0;
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        // The partial run at the failure point is not a complete token.
                        self.done = true;
                        self.run.clear();
                        return Some(Err(e));
                    }
                }
            }

            let byte = self.buf[self.pos];
            self.pos += 1;

            if is_word_byte(byte) {
                self.run.push(byte);
            } else if !self.run.is_empty() {
                if let Some(token) = self.close_run() {
                    return Some(Ok(token));
                }
            }
        }
    }
}

/// Tokenize an in-memory buffer.
pub fn tokenize_bytes(bytes: &[u8]) -> Vec<Token> {
    // Reading from a slice never fails.
    Tokens::new(bytes).filter_map(io::Result::ok).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(Token::as_str).collect()
    }

    /// Reader that hands out one byte per read call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((&byte, rest)) if !buf.is_empty() => {
                    buf[0] = byte;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    /// Reader that hands out its bytes and then fails.
    struct Failing<'a>(&'a [u8]);

    impl Read for Failing<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Err(io::Error::other("disk went away"));
            }
            let n = self.0.len().min(buf.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_splits_on_punctuation() {
        let tokens = tokenize_bytes(b"func main() {}\n");
        assert_eq!(texts(&tokens), vec!["func", "main"]);
    }

    #[test]
    fn test_keeps_word_punctuation_and_case() {
        let tokens = tokenize_bytes(b"self.path *mut &&x foo-bar Snake_Case");
        assert_eq!(
            texts(&tokens),
            vec!["self.path", "*mut", "&&x", "foo-bar", "Snake_Case"]
        );
    }

    #[test]
    fn test_discards_short_runs() {
        let tokens = tokenize_bytes(b"a b cd e\tfg h");
        assert_eq!(texts(&tokens), vec!["cd", "fg"]);
    }

    #[test]
    fn test_emits_run_at_end_of_stream() {
        assert_eq!(texts(&tokenize_bytes(b"let value")), vec!["let", "value"]);
        assert_eq!(texts(&tokenize_bytes(b"let x")), vec!["let"]);
        assert!(tokenize_bytes(b"").is_empty());
        assert!(tokenize_bytes(b"( ) { }").is_empty());
    }

    #[test]
    fn test_preserves_duplicates_in_order() {
        let tokens = tokenize_bytes(b"foo bar foo");
        assert_eq!(texts(&tokens), vec!["foo", "bar", "foo"]);
    }

    #[test]
    fn test_non_ascii_bytes_split() {
        let tokens = tokenize_bytes(b"caf\xc3\xa9s na\xc3\xafve\x00\xffab");
        assert_eq!(texts(&tokens), vec!["caf", "na", "ve", "ab"]);
        let binary = tokenize_bytes(&[0x7f, b'E', b'L', b'F', 0x02, 0x01, b'o', b'k']);
        assert_eq!(texts(&binary), vec!["ELF", "ok"]);
    }

    #[test]
    fn test_every_token_is_well_formed() {
        let input: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
        for token in tokenize_bytes(&input) {
            assert!(token.len() >= MIN_TOKEN_LEN);
            assert!(token.bytes().all(is_word_byte), "bad token {token:?}");
        }
    }

    #[test]
    fn test_chunk_boundaries_do_not_change_output() {
        let input = b"fn tokenize_file(path: &Path) -> io::Result<()> { a.b x_y *p }";
        let whole = tokenize_bytes(input);

        for split in 0..=input.len() {
            let (head, tail) = input.split_at(split);
            let pieces: Vec<Token> = Tokens::with_buffer_size(head.chain(tail), 7)
                .collect::<io::Result<_>>()
                .unwrap();
            assert_eq!(pieces, whole, "split at {split}");
        }

        let trickled: Vec<Token> = Tokens::new(Trickle(input))
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(trickled, whole);
    }

    #[test]
    fn test_read_error_after_collected_tokens() {
        let mut tokens = Tokens::with_buffer_size(Failing(b"alpha beta gam"), 4);
        assert_eq!(tokens.next().unwrap().unwrap().as_str(), "alpha");
        assert_eq!(tokens.next().unwrap().unwrap().as_str(), "beta");
        assert!(tokens.next().unwrap().is_err());
        assert!(tokens.next().is_none());
    }

    /// Reader of endless word bytes that fires `cancel` on its second read.
    struct CancelsMidRun {
        cancel: CancellationToken,
        reads: usize,
    }

    impl Read for CancelsMidRun {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            if self.reads == 2 {
                self.cancel.cancel();
            }
            buf.fill(b'a');
            Ok(buf.len())
        }
    }

    #[test]
    fn test_cancelled_before_first_read() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut tokens = Tokens::new(&b"never read"[..]).with_cancellation(cancel);
        assert!(tokens.next().is_none());
        assert!(tokens.is_cancelled());
    }

    #[test]
    fn test_cancellation_stops_long_run() {
        let cancel = CancellationToken::new();
        let reader = CancelsMidRun {
            cancel: cancel.clone(),
            reads: 0,
        };
        let mut tokens = Tokens::with_buffer_size(reader, 8).with_cancellation(cancel);

        assert!(tokens.next().is_none());
        assert!(tokens.is_cancelled());
        assert_eq!(tokens.reader.reads, 2);
        assert!(tokens.next().is_none());
    }

    #[test]
    fn test_uncancelled_sequence_is_not_marked() {
        let mut tokens =
            Tokens::new(&b"plain words"[..]).with_cancellation(CancellationToken::new());
        assert_eq!(tokens.by_ref().count(), 2);
        assert!(!tokens.is_cancelled());
    }

    #[test]
    fn test_token_new_validates() {
        assert_eq!(Token::new(b"ok").map(|t| t.to_string()), Some("ok".to_string()));
        assert!(Token::new(b"x").is_none());
        assert!(Token::new(b"no way").is_none());
    }
}
