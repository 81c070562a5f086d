//! Line framing of the emulator output stream.

use std::io::{self, BufRead};

/// Prefix of an informational line, never routed anywhere.
pub const COMMENT_MARKER: char = '*';
/// Prefix of an unsolicited event line.
pub const EVENT_MARKER: char = '!';

/// Whitespace separated fields of a single line.
pub type Tokens = Vec<String>;

/// Classified emulator output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Empty,
    Comment(String),
    Event { kind: String, args: Tokens },
    Reply(Tokens),
}

fn tokenize(text: &str) -> Tokens {
    text.split_whitespace().map(ToOwned::to_owned).collect()
}

impl Line {
    /// Classify a line without its terminator.
    pub fn classify(line: &str) -> Line {
        if line.trim().is_empty() {
            return Line::Empty;
        }

        if let Some(comment) = line.strip_prefix(COMMENT_MARKER) {
            return Line::Comment(comment.trim().to_string());
        }

        if let Some(event) = line.strip_prefix(EVENT_MARKER) {
            let mut tokens = tokenize(event);
            // `!` alone or `! foo` carries no event type, such line is an event with empty kind
            // and is dropped by the dispatcher
            let kind = if event.starts_with(char::is_whitespace) || tokens.is_empty() {
                String::new()
            } else {
                tokens.remove(0)
            };
            return Line::Event { kind, args: tokens };
        }

        Line::Reply(tokenize(line))
    }
}

/// Buffered reader that yields emulator output line by line.
pub struct LineReader<R: BufRead> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(256),
        }
    }

    /// Read next line without `\n` (and `\r`) terminator.
    /// Return `None` when the stream is closed.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        let read_n = self.inner.read_until(b'\n', &mut self.buf)?;
        if read_n == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }

        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_classify() {
        struct TestCase {
            line: &'static str,
            expected: Line,
        }
        let test_cases = vec![
            TestCase {
                line: "",
                expected: Line::Empty,
            },
            TestCase {
                line: "   ",
                expected: Line::Empty,
            },
            TestCase {
                line: "* loading image",
                expected: Line::Comment("loading image".to_string()),
            },
            TestCase {
                line: "!started main.asm 10",
                expected: Line::Event {
                    kind: "started".to_string(),
                    args: vec!["main.asm".to_string(), "10".to_string()],
                },
            },
            TestCase {
                line: "!breakpoint-hit",
                expected: Line::Event {
                    kind: "breakpoint-hit".to_string(),
                    args: vec![],
                },
            },
            TestCase {
                line: "breakpoint-set   7",
                expected: Line::Reply(vec!["breakpoint-set".to_string(), "7".to_string()]),
            },
            TestCase {
                line: "de ad\tbe ef",
                expected: Line::Reply(vec![
                    "de".to_string(),
                    "ad".to_string(),
                    "be".to_string(),
                    "ef".to_string(),
                ]),
            },
        ];

        for tc in test_cases {
            assert_eq!(Line::classify(tc.line), tc.expected, "line: {:?}", tc.line);
        }
    }

    #[test]
    fn test_event_marker_never_reply() {
        for line in ["!x", "!resume", "!breakpoint-set 7", "! 1 2"] {
            assert!(
                matches!(Line::classify(line), Line::Event { .. }),
                "line: {line:?}"
            );
        }
        for line in ["x !", "resume", "breakpoint-set !7", " !started a 1"] {
            assert!(matches!(Line::classify(line), Line::Reply(_)), "line: {line:?}");
        }
    }

    #[test]
    fn test_event_without_kind() {
        assert_eq!(
            Line::classify("! started a 1"),
            Line::Event {
                kind: String::new(),
                args: vec!["started".to_string(), "a".to_string(), "1".to_string()]
            }
        );
    }

    #[test]
    fn test_line_reader() {
        let input = "!started main.asm 10\r\n\nde ad\npartial";
        let mut reader = LineReader::new(Cursor::new(input));

        assert_eq!(
            reader.next_line().unwrap().as_deref(),
            Some("!started main.asm 10")
        );
        assert_eq!(reader.next_line().unwrap().as_deref(), Some(""));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("de ad"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("partial"));
        assert_eq!(reader.next_line().unwrap(), None);
    }
}
