//! Minimal command tokenizer for assembly source text.
//!
//! Commands are separated by newlines or `;`. Words are separated by blanks;
//! `{...}` groups literally (with nesting), `"..."` groups with backslash
//! escapes, and `#` at the start of a command comments out the rest of the
//! line. A word that would need `$` or `[...]` substitution is kept as
//! [`Word::Substituted`] so the assembler can reject it.

use crate::error::{AssembleError, ErrorKind, Result};

/// One word of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
    Literal(String),
    /// A word whose value is only known at run time; holds the source text.
    Substituted(String),
}

impl Word {
    pub fn literal(text: impl Into<String>) -> Self {
        Word::Literal(text.into())
    }

    pub fn text(&self) -> &str {
        match self {
            Word::Literal(s) | Word::Substituted(s) => s,
        }
    }
}

/// A parsed command with the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub line: u32,
    pub words: Vec<Word>,
}

impl CommandLine {
    /// Build a command from plain literal words.
    pub fn new<I, S>(line: u32, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            line,
            words: words.into_iter().map(|w| Word::Literal(w.into())).collect(),
        }
    }
}

/// Split `text` into commands. `first_line` is the line number of the
/// first character.
pub fn parse(text: &str, first_line: u32) -> Result<Vec<CommandLine>> {
    let mut scanner = Scanner::new(text, first_line, Mode::Script);
    let mut commands = Vec::new();
    loop {
        scanner.skip_command_separators();
        if scanner.at_end() {
            break;
        }
        if scanner.peek() == Some('#') {
            scanner.skip_comment();
            continue;
        }
        let line = scanner.line;
        let mut words = Vec::new();
        while let Some(word) = scanner.next_word()? {
            words.push(word);
        }
        if !words.is_empty() {
            commands.push(CommandLine { line, words });
        }
    }
    Ok(commands)
}

/// Split a list value into its elements.
pub fn split_list(text: &str) -> std::result::Result<Vec<String>, ErrorKind> {
    let mut scanner = Scanner::new(text, 1, Mode::List);
    let mut elements = Vec::new();
    loop {
        match scanner.next_word() {
            Ok(Some(word)) => elements.push(word.text().to_owned()),
            Ok(None) => return Ok(elements),
            Err(err) => {
                let message = match err.kind {
                    ErrorKind::Syntax(msg) => msg,
                    other => return Err(other),
                };
                return Err(ErrorKind::BadList(format!("{message} in list")));
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Script,
    List,
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    mode: Mode,
}

impl Scanner {
    fn new(text: &str, first_line: u32, mode: Mode) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: first_line,
            mode,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, msg: &'static str) -> AssembleError {
        AssembleError::at(self.line, ErrorKind::Syntax(msg))
    }

    fn is_command_end(&self, c: char) -> bool {
        self.mode == Mode::Script && (c == '\n' || c == ';')
    }

    fn skip_command_separators(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == ';' {
                self.bump();
            } else if c == '\\' && self.peek_at(1) == Some('\n') {
                self.bump();
                self.bump();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\\' {
                self.bump();
            } else if c == '\n' {
                break;
            }
        }
    }

    /// Skip blanks between words. Returns false at the end of the command.
    fn skip_blanks(&mut self) -> bool {
        while let Some(c) = self.peek() {
            if self.is_command_end(c) {
                return false;
            }
            if c == '\\' && self.peek_at(1) == Some('\n') {
                self.bump();
                self.bump();
            } else if c.is_whitespace() {
                self.bump();
            } else {
                return true;
            }
        }
        false
    }

    fn next_word(&mut self) -> Result<Option<Word>> {
        if !self.skip_blanks() {
            return Ok(None);
        }
        let word = match self.peek() {
            Some('{') => self.braced()?,
            Some('"') => self.quoted()?,
            _ => self.bare(),
        };
        Ok(Some(word))
    }

    fn at_separator(&self) -> bool {
        match self.peek() {
            None => true,
            Some(c) => c.is_whitespace() || self.is_command_end(c),
        }
    }

    fn braced(&mut self) -> Result<Word> {
        self.bump();
        let mut depth = 1;
        let mut text = String::new();
        loop {
            let c = self.bump().ok_or_else(|| self.error("missing close-brace"))?;
            match c {
                '\\' => {
                    text.push(c);
                    if let Some(next) = self.bump() {
                        text.push(next);
                    }
                }
                '{' => {
                    depth += 1;
                    text.push(c);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    text.push(c);
                }
                _ => text.push(c),
            }
        }
        if !self.at_separator() {
            return Err(self.error("extra characters after close-brace"));
        }
        Ok(Word::Literal(text))
    }

    fn quoted(&mut self) -> Result<Word> {
        self.bump();
        let mut text = String::new();
        let mut substituted = false;
        loop {
            let c = self.bump().ok_or_else(|| self.error("missing \""))?;
            match c {
                '"' => break,
                '\\' => self.escape(&mut text),
                '$' | '[' if self.mode == Mode::Script => {
                    substituted = true;
                    text.push(c);
                }
                _ => text.push(c),
            }
        }
        if !self.at_separator() {
            return Err(self.error("extra characters after close-quote"));
        }
        Ok(if substituted {
            Word::Substituted(text)
        } else {
            Word::Literal(text)
        })
    }

    fn bare(&mut self) -> Word {
        let mut text = String::new();
        let mut substituted = false;
        while !self.at_separator() {
            let Some(c) = self.bump() else { break };
            match c {
                '\\' if self.peek() == Some('\n') => {
                    self.bump();
                    break;
                }
                '\\' => self.escape(&mut text),
                '$' | '[' if self.mode == Mode::Script => {
                    substituted = true;
                    text.push(c);
                }
                _ => text.push(c),
            }
        }
        if substituted {
            Word::Substituted(text)
        } else {
            Word::Literal(text)
        }
    }

    /// Decode the escape after a consumed backslash.
    fn escape(&mut self, text: &mut String) {
        match self.bump() {
            Some('n') => text.push('\n'),
            Some('t') => text.push('\t'),
            Some('r') => text.push('\r'),
            Some('\n') => text.push(' '),
            Some(other) => text.push(other),
            None => text.push('\\'),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(cmd: &CommandLine) -> Vec<&str> {
        cmd.words.iter().map(Word::text).collect()
    }

    #[test]
    fn splits_commands_and_tracks_lines() {
        let cmds = parse("push a; push b\n\n  add\n", 1).unwrap();
        assert_eq!(cmds.len(), 3);
        assert_eq!(words(&cmds[0]), ["push", "a"]);
        assert_eq!(cmds[1].line, 1);
        assert_eq!(cmds[2].line, 3);
        assert_eq!(words(&cmds[2]), ["add"]);
    }

    #[test]
    fn comments_and_grouping() {
        let text = "# comment; still comment\njumpTable {a L1 b {L 2}}\npush \"x y\\n\"";
        let cmds = parse(text, 10).unwrap();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].line, 11);
        assert_eq!(words(&cmds[0]), ["jumpTable", "a L1 b {L 2}"]);
        assert_eq!(words(&cmds[1]), ["push", "x y\n"]);
    }

    #[test]
    fn substitutions_are_flagged() {
        let cmds = parse("push $x\npush {$x}\npush \"[foo]\"", 1).unwrap();
        assert!(matches!(cmds[0].words[1], Word::Substituted(_)));
        assert_eq!(cmds[1].words[1], Word::literal("$x"));
        assert!(matches!(cmds[2].words[1], Word::Substituted(_)));
    }

    #[test]
    fn continuation_lines() {
        let cmds = parse("push \\\n  a\nadd", 1).unwrap();
        assert_eq!(words(&cmds[0]), ["push", "a"]);
        assert_eq!(cmds[1].line, 3);
    }

    #[test]
    fn unbalanced_groups() {
        let err = parse("push {abc\n", 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax("missing close-brace"));
        let err = parse("push {a}b", 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax("extra characters after close-brace"));
        assert!(parse("push \"abc", 1).is_err());
    }

    #[test]
    fn lists() {
        assert_eq!(
            split_list("a L1\n b {L 2} \"c d\"").unwrap(),
            ["a", "L1", "b", "L 2", "c d"]
        );
        assert_eq!(split_list("").unwrap(), Vec::<String>::new());
        assert!(matches!(split_list("{a"), Err(ErrorKind::BadList(_))));
    }
}
