use crate::report::Reporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kw {
    Int,
    Bool,
    Void,
    True,
    False,
    Struct,
    Cin,
    Cout,
    If,
    Else,
    While,
    Return,
    Repeat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    // literals
    Ident(String),
    IntLit(i32),
    // body without the quotes; escape sequences are kept in source form so
    // the back end can hand them to .asciiz unchanged
    StrLit(String),

    Kw(Kw),

    // punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    Semi,
    Comma,
    Dot,

    // operators
    Read,  // >>
    Write, // <<
    PlusPlus,
    MinusMinus,
    Plus,
    Minus,
    Star,
    Slash,
    Not,
    AndAnd,
    OrOr,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize, // 1-based
    pub col: usize,  // 1-based
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokKind,
    pub span: Span,
}

fn keyword(word: &str) -> Option<Kw> {
    Some(match word {
        "int" => Kw::Int,
        "bool" => Kw::Bool,
        "void" => Kw::Void,
        "true" => Kw::True,
        "false" => Kw::False,
        "struct" => Kw::Struct,
        "cin" => Kw::Cin,
        "cout" => Kw::Cout,
        "if" => Kw::If,
        "else" => Kw::Else,
        "while" => Kw::While,
        "return" => Kw::Return,
        "repeat" => Kw::Repeat,
        _ => return None,
    })
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Lexer<'a> {
        Lexer {
            chars: src.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn eat_if(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }
}

/// Scan a whole source file. Lexical errors are reported through the
/// Reporter and the offending input is skipped; the token stream always ends
/// with Eof.
pub fn lex(src: &str, reporter: &mut Reporter) -> Vec<Token> {
    let mut lx = Lexer::new(src);
    let mut tokens = Vec::new();

    loop {
        // skip whitespace and line comments (`//` and `#`)
        loop {
            match lx.peek() {
                Some(c) if c.is_whitespace() => {
                    lx.bump();
                }
                Some('#') => {
                    while let Some(c) = lx.peek() {
                        if c == '\n' {
                            break;
                        }
                        lx.bump();
                    }
                }
                Some('/') => {
                    // only a comment if followed by another slash
                    let mut probe = lx.chars.clone();
                    probe.next();
                    if probe.peek() == Some(&'/') {
                        while let Some(c) = lx.peek() {
                            if c == '\n' {
                                break;
                            }
                            lx.bump();
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }

        let span = lx.span();
        let c = match lx.bump() {
            Some(c) => c,
            None => {
                tokens.push(Token {
                    kind: TokKind::Eof,
                    span,
                });
                return tokens;
            }
        };

        let kind = match c {
            '{' => TokKind::LBrace,
            '}' => TokKind::RBrace,
            '(' => TokKind::LParen,
            ')' => TokKind::RParen,
            ';' => TokKind::Semi,
            ',' => TokKind::Comma,
            '.' => TokKind::Dot,
            '*' => TokKind::Star,
            '/' => TokKind::Slash,
            '+' => {
                if lx.eat_if('+') {
                    TokKind::PlusPlus
                } else {
                    TokKind::Plus
                }
            }
            '-' => {
                if lx.eat_if('-') {
                    TokKind::MinusMinus
                } else {
                    TokKind::Minus
                }
            }
            '<' => {
                if lx.eat_if('<') {
                    TokKind::Write
                } else if lx.eat_if('=') {
                    TokKind::LtEq
                } else {
                    TokKind::Lt
                }
            }
            '>' => {
                if lx.eat_if('>') {
                    TokKind::Read
                } else if lx.eat_if('=') {
                    TokKind::GtEq
                } else {
                    TokKind::Gt
                }
            }
            '=' => {
                if lx.eat_if('=') {
                    TokKind::EqEq
                } else {
                    TokKind::Assign
                }
            }
            '!' => {
                if lx.eat_if('=') {
                    TokKind::NotEq
                } else {
                    TokKind::Not
                }
            }
            '&' => {
                if lx.eat_if('&') {
                    TokKind::AndAnd
                } else {
                    reporter.fatal(span, "illegal character ignored: &");
                    continue;
                }
            }
            '|' => {
                if lx.eat_if('|') {
                    TokKind::OrOr
                } else {
                    reporter.fatal(span, "illegal character ignored: |");
                    continue;
                }
            }
            '"' => match scan_string(&mut lx) {
                Ok(body) => TokKind::StrLit(body),
                Err(msg) => {
                    reporter.fatal(span, msg);
                    continue;
                }
            },
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                digits.push(c);
                while let Some(d) = lx.peek() {
                    if d.is_ascii_digit() {
                        digits.push(d);
                        lx.bump();
                    } else {
                        break;
                    }
                }
                match digits.parse::<i32>() {
                    Ok(v) => TokKind::IntLit(v),
                    Err(_) => {
                        reporter.warn(span, "integer literal too large; using max value");
                        TokKind::IntLit(i32::MAX)
                    }
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                word.push(c);
                while let Some(d) = lx.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        word.push(d);
                        lx.bump();
                    } else {
                        break;
                    }
                }
                match keyword(&word) {
                    Some(kw) => TokKind::Kw(kw),
                    None => TokKind::Ident(word),
                }
            }
            other => {
                reporter.fatal(span, format!("illegal character ignored: {other}"));
                continue;
            }
        };

        tokens.push(Token { kind, span });
    }
}

/// Scan the body of a string literal; the opening quote has been consumed.
/// Escapes are validated but kept in their two-character source form.
fn scan_string(lx: &mut Lexer) -> Result<String, &'static str> {
    let mut body = String::new();
    let mut bad_escape = false;
    loop {
        match lx.peek() {
            None | Some('\n') => {
                return Err(if bad_escape {
                    "unterminated string literal with bad escaped character ignored"
                } else {
                    "unterminated string literal ignored"
                });
            }
            Some('"') => {
                lx.bump();
                if bad_escape {
                    return Err("string literal with bad escaped character ignored");
                }
                return Ok(body);
            }
            Some('\\') => {
                lx.bump();
                match lx.peek() {
                    Some(e @ ('n' | 't' | '\'' | '"' | '?' | '\\')) => {
                        body.push('\\');
                        body.push(e);
                        lx.bump();
                    }
                    Some('\n') | None => {
                        return Err("unterminated string literal with bad escaped character ignored");
                    }
                    Some(_) => {
                        bad_escape = true;
                        lx.bump();
                    }
                }
            }
            Some(c) => {
                body.push(c);
                lx.bump();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokKind> {
        let mut r = Reporter::new();
        let toks = lex(src, &mut r);
        assert!(!r.errored(), "unexpected lex errors: {:?}", r.diags());
        toks.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_keywords_and_identifiers() {
        let ks = kinds("int x; bool done; void f;");
        assert_eq!(ks[0], TokKind::Kw(Kw::Int));
        assert_eq!(ks[1], TokKind::Ident("x".into()));
        assert_eq!(ks[2], TokKind::Semi);
        assert_eq!(ks[3], TokKind::Kw(Kw::Bool));
        assert_eq!(ks[6], TokKind::Kw(Kw::Void));
        assert_eq!(*ks.last().unwrap(), TokKind::Eof);
    }

    #[test]
    fn scans_two_char_operators() {
        let ks = kinds("<< >> ++ -- == != <= >= && || = < >");
        assert_eq!(
            ks,
            vec![
                TokKind::Write,
                TokKind::Read,
                TokKind::PlusPlus,
                TokKind::MinusMinus,
                TokKind::EqEq,
                TokKind::NotEq,
                TokKind::LtEq,
                TokKind::GtEq,
                TokKind::AndAnd,
                TokKind::OrOr,
                TokKind::Assign,
                TokKind::Lt,
                TokKind::Gt,
                TokKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_line_and_char_numbers() {
        let mut r = Reporter::new();
        let toks = lex("int x;\n  x = 1;\n", &mut r);
        assert_eq!(toks[0].span, Span { line: 1, col: 1 });
        assert_eq!(toks[1].span, Span { line: 1, col: 5 });
        assert_eq!(toks[3].span, Span { line: 2, col: 3 });
    }

    #[test]
    fn string_literal_keeps_escapes_in_source_form() {
        let ks = kinds(r#"cout << "a\n\tb";"#);
        assert_eq!(ks[2], TokKind::StrLit("a\\n\\tb".into()));
    }

    #[test]
    fn unterminated_string_is_reported_and_skipped() {
        let mut r = Reporter::new();
        let toks = lex("\"oops\nint", &mut r);
        assert!(r.errored());
        assert_eq!(r.diags()[0].msg, "unterminated string literal ignored");
        assert_eq!(toks[0].kind, TokKind::Kw(Kw::Int));
    }

    #[test]
    fn bad_escape_is_reported_and_skipped() {
        let mut r = Reporter::new();
        let toks = lex(r#""a\qb" int"#, &mut r);
        assert!(r.errored());
        assert_eq!(
            r.diags()[0].msg,
            "string literal with bad escaped character ignored"
        );
        assert_eq!(toks[0].kind, TokKind::Kw(Kw::Int));
    }

    #[test]
    fn huge_int_literal_warns_and_saturates() {
        let mut r = Reporter::new();
        let toks = lex("99999999999999999999", &mut r);
        assert!(!r.errored());
        assert_eq!(r.diags().len(), 1);
        assert_eq!(toks[0].kind, TokKind::IntLit(i32::MAX));
    }

    #[test]
    fn comments_run_to_end_of_line() {
        let ks = kinds("int // trailing words < > !\n# whole line\nx");
        assert_eq!(
            ks,
            vec![
                TokKind::Kw(Kw::Int),
                TokKind::Ident("x".into()),
                TokKind::Eof
            ]
        );
    }
}
