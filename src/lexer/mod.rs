use logos::Logos;

/// Tokens of one assembly line. Newlines never reach the lexer: the assembler
/// feeds it one line at a time.
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
pub enum Token {
    #[token(":")]
    Colon,

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r#""([^"\\\n]|\\[^\n])*""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len() - 1])
    })]
    Text(String),

    // Mnemonics, variable names and labels share one shape; the assembler decides.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl Token {
    /// How the token reads back in an error message.
    pub fn describe(&self) -> String {
        match self {
            Token::Colon => "':'".to_string(),
            Token::Int(n) => n.to_string(),
            Token::Text(s) => format!("\"{}\"", crate::program::escape(s)),
            Token::Ident(name) => name.clone(),
        }
    }
}

fn unescape(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            _ => return None,
        }
    }
    Some(out)
}

/// Lex one line into tokens with their column ranges.
pub fn lex_line(line: &str) -> Result<Vec<(Token, std::ops::Range<usize>)>, LexError> {
    let mut lexer = Token::lexer(line);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                let span = lexer.span();
                let snippet = line[span.clone()].to_string();
                return Err(LexError {
                    column: span.start,
                    reason: describe_failure(&snippet),
                    snippet,
                });
            }
        }
    }

    Ok(tokens)
}

fn describe_failure(bad: &str) -> String {
    let digits = bad.strip_prefix('-').unwrap_or(bad);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        "integer literal does not fit in 64 bits".to_string()
    } else if bad.starts_with('"') {
        if bad.len() > 1 && bad.ends_with('"') {
            "unknown escape sequence in string literal (use \\n, \\t, \\\\ or \\\")".to_string()
        } else {
            "unterminated string literal".to_string()
        }
    } else {
        format!("unexpected character(s) '{bad}'")
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{reason}")]
pub struct LexError {
    pub column: usize,
    pub snippet: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(line: &str) -> Vec<Token> {
        lex_line(line).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn lex_instruction_with_operand() {
        assert_eq!(tokens("PUSH -42"), vec![Token::Ident("PUSH".into()), Token::Int(-42)]);
    }

    #[test]
    fn lex_label_definition() {
        assert_eq!(tokens("start_loop:"), vec![Token::Ident("start_loop".into()), Token::Colon]);
    }

    #[test]
    fn lex_string_literal_strips_quotes() {
        assert_eq!(
            tokens(r#"NEWSTR "Hello, ""#),
            vec![Token::Ident("NEWSTR".into()), Token::Text("Hello, ".into())]
        );
    }

    #[test]
    fn lex_string_escapes() {
        assert_eq!(tokens(r#""a\nb\"c\\""#), vec![Token::Text("a\nb\"c\\".into())]);
    }

    #[test]
    fn comment_ignored() {
        assert_eq!(tokens("ADD   // 10 + 5"), vec![Token::Ident("ADD".into())]);
        assert!(tokens("// whole line").is_empty());
    }

    #[test]
    fn comment_marker_inside_string_is_text() {
        assert_eq!(tokens(r#"PRINTSTR "a//b""#)[1], Token::Text("a//b".into()));
    }

    #[test]
    fn spans_are_columns() {
        let toks = lex_line("  DUP").unwrap();
        assert_eq!(toks[0].1, 2..5);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = lex_line(r#"PRINTSTR "oops"#).unwrap_err();
        assert!(err.reason.contains("unterminated"), "{err}");
    }

    #[test]
    fn oversized_integer_is_an_error() {
        let err = lex_line("PUSH 99999999999999999999").unwrap_err();
        assert!(err.reason.contains("64 bits"), "{err}");
        assert_eq!(err.column, 5);
    }

    #[test]
    fn stray_character_is_an_error() {
        let err = lex_line("PUSH @").unwrap_err();
        assert_eq!(err.snippet, "@");
    }
}
