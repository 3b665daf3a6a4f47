//! Shell-style name patterns, as Pebble evaluates them.
//!
//! Syntax:
//! - `*` matches any sequence of characters except `/`
//! - `?` matches any single character except `/`
//! - `[abc]`, `[a-z]` match one character from the class; `[^...]` or
//!   `[!...]` negate it
//! - `\c` matches `c` literally
//!
//! The whole pattern is checked up front, so a malformed class is an error
//! even if the text before it would already fail to match. Matching is done
//! by [`glob::Pattern`]; a checked pattern is rewritten into glob's syntax,
//! which has no backslash escapes or `[^...]` and gives `!`, `-` and `]`
//! positional meanings inside a class.

use std::fmt;

use glob::MatchOptions;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Characters glob treats specially inside a class, in ascending order.
const CLASS_SPECIALS: [u8; 3] = [b'!', b'-', b']'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadPattern;

impl fmt::Display for BadPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("syntax error in pattern")
    }
}

impl std::error::Error for BadPattern {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    Star,
    Class { negated: bool, ranges: Vec<(char, char)> },
}

/// A compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    compiled: glob::Pattern,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, BadPattern> {
        let tokens = tokenize(pattern)?;
        let compiled = glob::Pattern::new(&render(&tokens)).map_err(|_| BadPattern)?;
        Ok(Self { compiled })
    }

    /// True if the whole of `name` matches.
    pub fn matches(&self, name: &str) -> bool {
        self.compiled.matches_with(name, MATCH_OPTIONS)
    }
}

fn tokenize(pattern: &str) -> Result<Vec<Token>, BadPattern> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        let token = match c {
            '*' => {
                // Runs of stars are equivalent to one
                if tokens.last() == Some(&Token::Star) {
                    continue;
                }
                Token::Star
            }
            '?' => Token::AnyChar,
            '\\' => Token::Literal(chars.next().ok_or(BadPattern)?),
            '[' => {
                let negated = matches!(chars.peek(), Some('^') | Some('!'));
                if negated {
                    chars.next();
                }
                let mut ranges = Vec::new();
                loop {
                    if chars.peek() == Some(&']') && !ranges.is_empty() {
                        chars.next();
                        break;
                    }
                    let lo = class_char(&mut chars)?;
                    let hi = if chars.peek() == Some(&'-') {
                        chars.next();
                        class_char(&mut chars)?
                    } else {
                        lo
                    };
                    if lo > hi {
                        return Err(BadPattern);
                    }
                    ranges.push((lo, hi));
                }
                Token::Class { negated, ranges }
            }
            other => Token::Literal(other),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn class_char(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<char, BadPattern> {
    match chars.next() {
        None | Some('-') | Some(']') => Err(BadPattern),
        Some('\\') => chars.next().ok_or(BadPattern),
        Some(c) => Ok(c),
    }
}

/// Rewrite checked tokens as a glob pattern.
fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Literal(c @ ('*' | '?' | '[' | ']')) => {
                out.push('[');
                out.push(*c);
                out.push(']');
            }
            Token::Literal(c) => out.push(*c),
            Token::AnyChar => out.push('?'),
            Token::Star => out.push('*'),
            Token::Class { negated, ranges } => render_class(&mut out, *negated, ranges),
        }
    }
    out
}

/// glob reads a class as: optional `!`, then a `]` that is literal only in
/// first position, then `lo-hi` triples or single characters. Ranges are
/// split around `!`, `-` and `]`, which are then placed where glob reads
/// them literally.
fn render_class(out: &mut String, negated: bool, ranges: &[(char, char)]) {
    let mut spans = Vec::new();
    let mut specials = [false; 3];
    for &(lo, hi) in ranges {
        let mut lo = lo;
        for (seen, &special) in specials.iter_mut().zip(CLASS_SPECIALS.iter()) {
            let s = char::from(special);
            if lo <= s && s <= hi {
                *seen = true;
                if lo < s {
                    spans.push((lo, char::from(special - 1)));
                }
                lo = char::from(special + 1);
            }
        }
        if lo <= hi {
            spans.push((lo, hi));
        }
    }
    let [bang, mut dash, bracket] = specials;

    let mut body = String::new();
    if bracket {
        body.push(']');
    }
    for (lo, hi) in spans {
        body.push(lo);
        body.push('-');
        body.push(hi);
    }
    if bang {
        if body.is_empty() && !negated {
            // A leading `!` would negate
            if !dash {
                out.push('!');
                return;
            }
            body.push('-');
            dash = false;
        }
        body.push('!');
    }
    if dash {
        body.push('-');
    }

    out.push('[');
    if negated {
        out.push('!');
    }
    out.push_str(&body);
    out.push(']');
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn matches(pattern: &str, name: &str) -> Result<bool, BadPattern> {
        Ok(Pattern::new(pattern)?.matches(name))
    }

    #[test]
    fn test_literal_and_wildcards() {
        assert!(matches("foo.txt", "foo.txt").unwrap());
        assert!(!matches("foo.txt", "foo.txt2").unwrap());
        assert!(matches("*.txt", "foo.txt").unwrap());
        assert!(matches("*.txt", ".txt").unwrap());
        assert!(!matches("*.txt", "foo.bin").unwrap());
        assert!(matches("f?o*", "foo.bin").unwrap());
        assert!(!matches("f?o", "fo").unwrap());
        assert!(matches("**.txt", "a.txt").unwrap());
    }

    #[test]
    fn test_classes() {
        assert!(matches("[abc].txt", "b.txt").unwrap());
        assert!(!matches("[abc].txt", "d.txt").unwrap());
        assert!(matches("[a-c]x", "cx").unwrap());
        assert!(matches("[^a-c]x", "dx").unwrap());
        assert!(matches("[!a-c]x", "dx").unwrap());
        assert!(!matches("[!a-c]x", "ax").unwrap());
        assert!(matches("[]a]", "]").is_err());
        assert!(matches("[\\]]", "]").unwrap());
    }

    #[test]
    fn test_escapes() {
        assert!(matches("\\*", "*").unwrap());
        assert!(!matches("\\*", "a").unwrap());
        assert!(matches("\\?\\[\\]", "?[]").unwrap());
        assert!(!matches("\\?", "a").unwrap());
        assert!(matches("a\\", "a").is_err());
    }

    #[test]
    fn test_bad_patterns() {
        for bad in ["[", "[foo", "[a-", "[-a]", "[]", "[z-a]", "*[", "foo["] {
            assert_eq!(Pattern::new(bad), Err(BadPattern), "pattern {:?}", bad);
        }
    }

    #[test]
    fn test_star_stops_at_separator() {
        assert!(!matches("a*", "a/b").unwrap());
        assert!(matches("a*/b", "ax/b").unwrap());
    }

    #[test]
    fn test_many_stars_finish_quickly() {
        let pattern = Pattern::new("*a*a*a*a*a*a*a*a*a*a*a*b").unwrap();
        let name = "a".repeat(40);
        let started = Instant::now();
        assert!(!pattern.matches(&name));
        assert!(pattern.matches(&format!("{}b", name)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_class_members_glob_reads_positionally() {
        // `[ -~]` spans `!`, `-` and `]`
        for c in [" ", "!", "-", "]", "a", "~"] {
            assert!(matches("[ -~]", c).unwrap(), "{:?}", c);
        }
        assert!(!matches("[ -~]", "é").unwrap());

        assert!(matches("[\\!]", "!").unwrap());
        assert!(!matches("[\\!]", "a").unwrap());
        assert!(matches("[\\!\\-]", "-").unwrap());
        assert!(matches("[\\!\\-]", "!").unwrap());
        assert!(!matches("[\\!\\-]", "a").unwrap());
        assert!(matches("[^\\!]", "a").unwrap());
        assert!(!matches("[^\\!]", "!").unwrap());
        assert!(!matches("[^\\-]", "-").unwrap());
        assert!(matches("[^\\-]", "x").unwrap());
        assert!(matches("[\\]\\!\\-]", "]").unwrap());
        assert!(matches("[\\]\\!\\-]", "!").unwrap());
        assert!(!matches("[^\\]]", "]").unwrap());
        assert!(matches("[[]", "[").unwrap());
    }

    #[test]
    fn test_rendered_glob_syntax() {
        let glob = |p: &str| render(&tokenize(p).unwrap());
        assert_eq!(glob("\\*x"), "[*]x");
        assert_eq!(glob("[^b-d]"), "[!b-d]");
        assert_eq!(glob("[\\!]"), "!");
        assert_eq!(glob("[\\!\\-]"), "[-!]");
        assert_eq!(glob("[^\\!]"), "[!!]");
        assert_eq!(glob("[x\\]]"), "[]x-x]");
    }

    /// Cases from Go's `filepath.Match` tests, which Pebble's pattern
    /// handling follows. `None` marks a syntax error.
    #[test]
    fn test_go_filepath_match_table() {
        let cases: &[(&str, &str, Option<bool>)] = &[
            ("abc", "abc", Some(true)),
            ("*", "abc", Some(true)),
            ("*c", "abc", Some(true)),
            ("a*", "a", Some(true)),
            ("a*", "abc", Some(true)),
            ("a*", "ab/c", Some(false)),
            ("a*/b", "abc/b", Some(true)),
            ("a*/b", "a/c/b", Some(false)),
            ("a*b*c*d*e*/f", "axbxcxdxe/f", Some(true)),
            ("a*b*c*d*e*/f", "axbxcxdxexxx/f", Some(true)),
            ("a*b*c*d*e*/f", "axbxcxdxe/xxx/f", Some(false)),
            ("a*b*c*d*e*/f", "axbxcxdxexxx/fff", Some(false)),
            ("a*b?c*x", "abxbbxdbxebxczzx", Some(true)),
            ("a*b?c*x", "abxbbxdbxebxczzy", Some(false)),
            ("ab[c]", "abc", Some(true)),
            ("ab[b-d]", "abc", Some(true)),
            ("ab[e-g]", "abc", Some(false)),
            ("ab[^c]", "abc", Some(false)),
            ("ab[^b-d]", "abc", Some(false)),
            ("ab[^e-g]", "abc", Some(true)),
            ("a\\*b", "a*b", Some(true)),
            ("a\\*b", "ab", Some(false)),
            ("a?b", "a☺b", Some(true)),
            ("a[^a]b", "a☺b", Some(true)),
            ("a???b", "a☺b", Some(false)),
            ("a[^a][^a][^a]b", "a☺b", Some(false)),
            ("[a-ζ]*", "α", Some(true)),
            ("*[a-ζ]", "A", Some(false)),
            ("a?b", "a/b", Some(false)),
            ("a*b", "a/b", Some(false)),
            ("[\\]a]", "]", Some(true)),
            ("[\\-]", "-", Some(true)),
            ("[x\\-]", "x", Some(true)),
            ("[x\\-]", "-", Some(true)),
            ("[x\\-]", "z", Some(false)),
            ("[\\-x]", "x", Some(true)),
            ("[\\-x]", "-", Some(true)),
            ("[\\-x]", "a", Some(false)),
            ("*x", "xxx", Some(true)),
            ("[]a]", "]", None),
            ("[-]", "-", None),
            ("[x-]", "x", None),
            ("[-x]", "x", None),
            ("\\", "a", None),
            ("[a-b-c]", "a", None),
            ("[", "a", None),
            ("[^", "a", None),
            ("[^bc", "a", None),
            ("a[", "a", None),
        ];
        for &(pattern, name, expected) in cases {
            assert_eq!(
                matches(pattern, name).ok(),
                expected,
                "pattern {:?} against {:?}",
                pattern,
                name
            );
        }
    }
}
