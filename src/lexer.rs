use logos::Logos;
use std::fmt;

use crate::Span;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\n\r]+")] // Skip whitespace
pub enum TokenKind {
    // Produced by `Lexer`, never by the logos automaton itself
    Illegal,
    Eof,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident, // Reclassified through `lookup_ident`
    #[regex(r"[0-9]+")]
    Int,
    #[regex(r#""[^"]*"?"#)]
    String, // An unterminated literal runs to the end of input

    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("!")]
    Bang,
    #[token("*")]
    Asterisk,
    #[token("/")]
    Slash,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("==")]
    Eq,
    #[token("!=")]
    NotEq,

    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Keywords
    Function, // kriya
    Let,      // rama
    True,     // satya
    False,    // asatya
    If,       // yadi
    Else,     // anyatha
    Return,   // daan
    While,    // chakra
}

/// Keyword spellings, in the order they are offered for completion.
pub const KEYWORDS: [(&str, TokenKind); 8] = [
    ("kriya", TokenKind::Function),
    ("rama", TokenKind::Let),
    ("satya", TokenKind::True),
    ("asatya", TokenKind::False),
    ("yadi", TokenKind::If),
    ("anyatha", TokenKind::Else),
    ("daan", TokenKind::Return),
    ("chakra", TokenKind::While),
];

/// Classifies an identifier-shaped word as a keyword or a plain identifier.
pub fn lookup_ident(word: &str) -> TokenKind {
    KEYWORDS
        .iter()
        .find(|(spelling, _)| *spelling == word)
        .map(|(_, kind)| *kind)
        .unwrap_or(TokenKind::Ident)
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Illegal => "ILLEGAL",
            TokenKind::Eof => "EOF",
            TokenKind::Ident => "IDENT",
            TokenKind::Int => "INT",
            TokenKind::String => "STRING",
            TokenKind::Assign => "=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Bang => "!",
            TokenKind::Asterisk => "*",
            TokenKind::Slash => "/",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::LtEq => "<=",
            TokenKind::GtEq => ">=",
            TokenKind::Eq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Function => "kriya",
            TokenKind::Let => "rama",
            TokenKind::True => "satya",
            TokenKind::False => "asatya",
            TokenKind::If => "yadi",
            TokenKind::Else => "anyatha",
            TokenKind::Return => "daan",
            TokenKind::While => "chakra",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, span: Span) -> Self {
        Token {
            kind,
            literal: literal.into(),
            span,
        }
    }
}

/// Pull-based tokenizer. Once the input is exhausted every call to
/// [`Lexer::next_token`] returns an `Eof` token; lexing again requires a new `Lexer`.
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, TokenKind>,
    finished: bool,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Lexer {
            inner: TokenKind::lexer(source),
            finished: false,
        }
    }

    pub fn next_token(&mut self) -> Token {
        if self.finished {
            return self.eof_token();
        }
        let Some(result) = self.inner.next() else {
            self.finished = true;
            return self.eof_token();
        };

        let span = Span::from(self.inner.span());
        let slice = self.inner.slice();
        match result {
            Ok(TokenKind::Ident) => Token::new(lookup_ident(slice), slice, span),
            Ok(TokenKind::String) => Token::new(TokenKind::String, string_contents(slice), span),
            Ok(kind) => Token::new(kind, slice, span),
            // Unknown characters are reported by the parser, not here
            Err(()) => Token::new(TokenKind::Illegal, slice, span),
        }
    }

    fn eof_token(&self) -> Token {
        let end = self.inner.source().len();
        Token::new(TokenKind::Eof, "", Span::new(end, end))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}

// Strips the opening delimiter and, when present, the closing one.
fn string_contents(slice: &str) -> &str {
    let body = &slice[1..];
    body.strip_suffix('"').unwrap_or(body)
}

/// Tokenizes the whole input. The last token is always `Eof`.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to simplify testing (kind, literal) sequences; the trailing Eof is implied
    fn assert_tokens(input: &str, expected: Vec<(TokenKind, &str)>) {
        let tokens: Vec<(TokenKind, String)> = Lexer::new(input)
            .map(|token| (token.kind, token.literal))
            .collect();
        let expected: Vec<(TokenKind, String)> = expected
            .into_iter()
            .map(|(kind, literal)| (kind, literal.to_string()))
            .collect();
        assert_eq!(tokens, expected, "Input: '{}'", input);
    }

    fn assert_kinds(input: &str, expected: Vec<TokenKind>) {
        let kinds: Vec<TokenKind> = Lexer::new(input).map(|token| token.kind).collect();
        assert_eq!(kinds, expected, "Input: '{}'", input);
    }

    #[test]
    fn test_empty_input() {
        assert_tokens("", vec![]);
        assert_tokens("  \n\t ", vec![]);
    }

    #[test]
    fn test_eof_repeats_forever() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next_token().kind, TokenKind::Ident);
        for _ in 0..3 {
            let token = lexer.next_token();
            assert_eq!(token.kind, TokenKind::Eof);
            assert_eq!(token.literal, "");
            assert_eq!(token.span, Span::new(1, 1));
        }
    }

    #[test]
    fn test_single_char_operators() {
        assert_kinds(
            "=+-!*/<>,;:(){}[]",
            vec![
                TokenKind::Assign,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Bang,
                TokenKind::Asterisk,
                TokenKind::Slash,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Comma,
                TokenKind::Semicolon,
                TokenKind::Colon,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LBracket,
                TokenKind::RBracket,
            ],
        );
    }

    #[test]
    fn test_two_char_operators() {
        assert_tokens(
            "== != <= >= = ! < >",
            vec![
                (TokenKind::Eq, "=="),
                (TokenKind::NotEq, "!="),
                (TokenKind::LtEq, "<="),
                (TokenKind::GtEq, ">="),
                (TokenKind::Assign, "="),
                (TokenKind::Bang, "!"),
                (TokenKind::Lt, "<"),
                (TokenKind::Gt, ">"),
            ],
        );
        // Lookahead prefers the longer form without needing spaces
        assert_kinds(
            "a==!b",
            vec![
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::Bang,
                TokenKind::Ident,
            ],
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_tokens(
            "kriya rama satya asatya yadi anyatha daan chakra",
            vec![
                (TokenKind::Function, "kriya"),
                (TokenKind::Let, "rama"),
                (TokenKind::True, "satya"),
                (TokenKind::False, "asatya"),
                (TokenKind::If, "yadi"),
                (TokenKind::Else, "anyatha"),
                (TokenKind::Return, "daan"),
                (TokenKind::While, "chakra"),
            ],
        );
        assert_tokens(
            "Rama ramayana _tmp x1 snake_case",
            vec![
                (TokenKind::Ident, "Rama"),
                (TokenKind::Ident, "ramayana"),
                (TokenKind::Ident, "_tmp"),
                (TokenKind::Ident, "x1"),
                (TokenKind::Ident, "snake_case"),
            ],
        );
        assert_eq!(lookup_ident("daan"), TokenKind::Return);
        assert_eq!(lookup_ident("dairghya"), TokenKind::Ident);
    }

    #[test]
    fn test_integers_have_no_sign() {
        assert_tokens(
            "-42 007",
            vec![
                (TokenKind::Minus, "-"),
                (TokenKind::Int, "42"),
                (TokenKind::Int, "007"),
            ],
        );
        assert_tokens(
            "1abc",
            vec![(TokenKind::Int, "1"), (TokenKind::Ident, "abc")],
        );
    }

    #[test]
    fn test_strings() {
        assert_tokens(r#""hello""#, vec![(TokenKind::String, "hello")]);
        assert_tokens(r#""""#, vec![(TokenKind::String, "")]);
        assert_tokens(
            r#""siya rām" "a\n""#,
            vec![(TokenKind::String, "siya rām"), (TokenKind::String, "a\\n")],
        );
        // No escapes: the backslash is kept and the next quote closes the literal
        assert_tokens(
            r#""say \"hi""#,
            vec![
                (TokenKind::String, "say \\"),
                (TokenKind::Ident, "hi"),
                (TokenKind::String, ""),
            ],
        );
    }

    #[test]
    fn test_unterminated_string_runs_to_end() {
        assert_tokens(r#""abc def"#, vec![(TokenKind::String, "abc def")]);
        assert_tokens(r#"""#, vec![(TokenKind::String, "")]);
    }

    #[test]
    fn test_illegal_characters() {
        assert_tokens(
            "a @ b",
            vec![
                (TokenKind::Ident, "a"),
                (TokenKind::Illegal, "@"),
                (TokenKind::Ident, "b"),
            ],
        );
        assert_tokens("#", vec![(TokenKind::Illegal, "#")]);
    }

    #[test]
    fn test_tokenize_appends_eof() {
        let tokens = tokenize("rama x");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].kind, TokenKind::Eof);
        assert_eq!(tokenize("").len(), 1);
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("rama x = 10;");
        let spans: Vec<Span> = tokens.iter().map(|t| t.span).collect();
        assert_eq!(
            spans,
            vec![
                Span::new(0, 4),
                Span::new(5, 6),
                Span::new(7, 8),
                Span::new(9, 11),
                Span::new(11, 12),
                Span::new(12, 12),
            ]
        );
        // String spans include the delimiters
        assert_eq!(tokenize(r#" "ab" "#)[0].span, Span::new(1, 5));
    }

    #[test]
    fn test_full_program() {
        let input = r#"
rama five = 5;
rama ten = 10;
rama add = kriya(x, y) {
x + y;
};
rama result = add(five, ten);
!-/*5;
5 < 10 > 5;
yadi (5 < 10) {
daan satya;
} anyatha {
daan asatya;
}

10 == 10;
10 != 9;
"rām"
"siya rām"
[1, 2];
{"foo": "bar"}
rama i = 0;
chakra (i < 10) {
    i = i + 1;
}
"#;
        use TokenKind::*;
        let expected = vec![
            (Let, "rama"),
            (Ident, "five"),
            (Assign, "="),
            (Int, "5"),
            (Semicolon, ";"),
            (Let, "rama"),
            (Ident, "ten"),
            (Assign, "="),
            (Int, "10"),
            (Semicolon, ";"),
            (Let, "rama"),
            (Ident, "add"),
            (Assign, "="),
            (Function, "kriya"),
            (LParen, "("),
            (Ident, "x"),
            (Comma, ","),
            (Ident, "y"),
            (RParen, ")"),
            (LBrace, "{"),
            (Ident, "x"),
            (Plus, "+"),
            (Ident, "y"),
            (Semicolon, ";"),
            (RBrace, "}"),
            (Semicolon, ";"),
            (Let, "rama"),
            (Ident, "result"),
            (Assign, "="),
            (Ident, "add"),
            (LParen, "("),
            (Ident, "five"),
            (Comma, ","),
            (Ident, "ten"),
            (RParen, ")"),
            (Semicolon, ";"),
            (Bang, "!"),
            (Minus, "-"),
            (Slash, "/"),
            (Asterisk, "*"),
            (Int, "5"),
            (Semicolon, ";"),
            (Int, "5"),
            (Lt, "<"),
            (Int, "10"),
            (Gt, ">"),
            (Int, "5"),
            (Semicolon, ";"),
            (If, "yadi"),
            (LParen, "("),
            (Int, "5"),
            (Lt, "<"),
            (Int, "10"),
            (RParen, ")"),
            (LBrace, "{"),
            (Return, "daan"),
            (True, "satya"),
            (Semicolon, ";"),
            (RBrace, "}"),
            (Else, "anyatha"),
            (LBrace, "{"),
            (Return, "daan"),
            (False, "asatya"),
            (Semicolon, ";"),
            (RBrace, "}"),
            (Int, "10"),
            (Eq, "=="),
            (Int, "10"),
            (Semicolon, ";"),
            (Int, "10"),
            (NotEq, "!="),
            (Int, "9"),
            (Semicolon, ";"),
            (String, "rām"),
            (String, "siya rām"),
            (LBracket, "["),
            (Int, "1"),
            (Comma, ","),
            (Int, "2"),
            (RBracket, "]"),
            (Semicolon, ";"),
            (LBrace, "{"),
            (String, "foo"),
            (Colon, ":"),
            (String, "bar"),
            (RBrace, "}"),
            (Let, "rama"),
            (Ident, "i"),
            (Assign, "="),
            (Int, "0"),
            (Semicolon, ";"),
            (While, "chakra"),
            (LParen, "("),
            (Ident, "i"),
            (Lt, "<"),
            (Int, "10"),
            (RParen, ")"),
            (LBrace, "{"),
            (Ident, "i"),
            (Assign, "="),
            (Ident, "i"),
            (Plus, "+"),
            (Int, "1"),
            (Semicolon, ";"),
            (RBrace, "}"),
        ];
        assert_tokens(input, expected);
    }
}
