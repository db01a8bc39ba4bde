//! Command-line tokenizer.
//!
//! Splits one text segment into words, quoted strings and options:
//!
//! ```text
//! /deploy "my app" --env=prod -lah --note="a b"
//! └─────┘ └──────┘ └────────┘ └──┘ └──────────┘
//!  Word    Quoted   LongOpt   3×Short  LongOpt
//! ```
//!
//! Tokenizing never fails: anything that is not a well-formed option or a
//! quoted string is a plain word.

/// A single token of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A bare word.
    Word(String),
    /// A double-quoted string with escapes resolved.
    Quoted(String),
    /// `--name` or `--name=value`.
    LongOption { name: String, value: Option<String> },
    /// One letter of `-x`, `-xyz` or `-x=value`.
    ShortOption { name: char, value: Option<String> },
}

impl Token {
    /// Returns the text of a word or quoted string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Token::Word(s) | Token::Quoted(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the text of a bare word; quoted strings never name commands.
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Token::Word(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(self, Token::LongOption { .. } | Token::ShortOption { .. })
    }
}

/// Tokenizes a command line.
pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).run()
}

struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
}

impl Tokenizer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        loop {
            self.skip_whitespace();
            let Some(ch) = self.peek(0) else {
                break;
            };
            if ch == '"' {
                let text = self.read_quoted();
                self.tokens.push(Token::Quoted(text));
            } else if ch == '-' && self.peek(1) == Some('-') && self.is_letter_at(2) {
                self.read_long_option();
            } else if ch == '-' && self.is_letter_at(1) {
                self.read_short_options();
            } else {
                let word = self.read_word();
                self.tokens.push(Token::Word(word));
            }
        }
        self.tokens
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn is_letter_at(&self, offset: usize) -> bool {
        self.peek(offset).is_some_and(char::is_alphabetic)
    }

    fn skip_whitespace(&mut self) {
        while self.peek(0).is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Reads until whitespace.
    fn read_word(&mut self) -> String {
        let start = self.pos;
        while self.peek(0).is_some_and(|c| !c.is_whitespace()) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Reads until whitespace or `=`.
    fn read_name(&mut self) -> String {
        let start = self.pos;
        while self.peek(0).is_some_and(|c| !c.is_whitespace() && c != '=') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Reads a quoted string starting at the opening quote. An unterminated
    /// quote runs to the end of the input.
    fn read_quoted(&mut self) -> String {
        self.pos += 1;
        let mut text = String::new();
        while let Some(ch) = self.peek(0) {
            self.pos += 1;
            match ch {
                '"' => return text,
                '\\' if matches!(self.peek(0), Some('"' | '\\')) => {
                    text.extend(self.peek(0));
                    self.pos += 1;
                }
                _ => text.push(ch),
            }
        }
        text
    }

    /// Reads the value after `=`, quoted or bare.
    fn read_value(&mut self) -> Option<String> {
        if self.peek(0) != Some('=') {
            return None;
        }
        self.pos += 1;
        if self.peek(0) == Some('"') {
            Some(self.read_quoted())
        } else {
            Some(self.read_word())
        }
    }

    fn read_long_option(&mut self) {
        self.pos += 2;
        let name = self.read_name();
        let value = self.read_value();
        self.tokens.push(Token::LongOption { name, value });
    }

    fn read_short_options(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let cluster = self.read_name();
        if !cluster.chars().all(char::is_alphabetic) {
            // `-v2` and friends are plain words.
            self.pos = start;
            let word = self.read_word();
            self.tokens.push(Token::Word(word));
            return;
        }

        let value = self.read_value();
        let letters: Vec<char> = cluster.chars().collect();
        let last = letters.len() - 1;
        for (i, name) in letters.into_iter().enumerate() {
            let value = if i == last { value.clone() } else { None };
            self.tokens.push(Token::ShortOption { name, value });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    fn long(name: &str, value: Option<&str>) -> Token {
        Token::LongOption {
            name: name.to_string(),
            value: value.map(str::to_string),
        }
    }

    fn short(name: char) -> Token {
        Token::ShortOption { name, value: None }
    }

    #[test]
    fn test_words() {
        assert_eq!(
            tokenize("/echo hello  world"),
            vec![word("/echo"), word("hello"), word("world")]
        );
        assert!(tokenize("   \t ").is_empty());
    }

    #[test]
    fn test_long_option_with_value() {
        assert_eq!(tokenize("--a=1"), vec![long("a", Some("1"))]);
        assert_eq!(tokenize("--a=1=2"), vec![long("a", Some("1=2"))]);
        assert_eq!(tokenize("--flag"), vec![long("flag", None)]);
        assert_eq!(
            tokenize(r#"--msg="hello world" x"#),
            vec![long("msg", Some("hello world")), word("x")]
        );
    }

    #[test]
    fn test_short_cluster() {
        assert_eq!(
            tokenize("-lah /home"),
            vec![short('l'), short('a'), short('h'), word("/home")]
        );
        assert_eq!(
            tokenize("-p=8080"),
            vec![Token::ShortOption {
                name: 'p',
                value: Some("8080".into())
            }]
        );
    }

    #[test]
    fn test_dashes_without_letter_are_text() {
        assert_eq!(
            tokenize("-= -1 --"),
            vec![word("-="), word("-1"), word("--")]
        );
        assert_eq!(
            tokenize("a = -1 --"),
            vec![word("a"), word("="), word("-1"), word("--")]
        );
        assert_eq!(tokenize("--=="), vec![word("--==")]);
        assert_eq!(tokenize("-v2"), vec![word("-v2")]);
    }

    #[test]
    fn test_quoted() {
        assert_eq!(
            tokenize(r#"/process "my file.txt" --force"#),
            vec![
                word("/process"),
                Token::Quoted("my file.txt".into()),
                long("force", None)
            ]
        );
        assert_eq!(
            tokenize(r#""say \"hi\" \\ \n""#),
            vec![Token::Quoted(r#"say "hi" \ \n"#.into())]
        );
        assert_eq!(tokenize(r#""--not-an-option""#), vec![Token::Quoted("--not-an-option".into())]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(tokenize("\"asdasd"), vec![Token::Quoted("asdasd".into())]);
        assert_eq!(
            tokenize("x \"a b c"),
            vec![word("x"), Token::Quoted("a b c".into())]
        );
    }

    #[test]
    fn test_quote_inside_word_is_literal() {
        assert_eq!(tokenize(r#"it"s ok"#), vec![word(r#"it"s"#), word("ok")]);
    }
}
