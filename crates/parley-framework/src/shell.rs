//! Shell-like tokenisation used for argument input and default values.
//!
//! Handles:
//! - Whitespace-separated tokens
//! - Single- and double-quoted strings (quotes are removed)
//! - Backslash escapes outside quotes and inside double quotes
//! - Empty quoted tokens (`''` yields an empty token)

/// Tokenisation error: a quote was opened but never closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unterminated {0} quote")]
pub struct UnterminatedQuote(pub char);

/// Splits `input` into tokens, failing on an unbalanced quote.
pub fn try_shell_split(input: &str) -> Result<Vec<String>, UnterminatedQuote> {
    let mut args = Vec::new();
    let mut current = String::new();
    // A quoted empty string still produces a token.
    let mut in_token = false;
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if !in_single_quote => {
                escape_next = true;
                in_token = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                in_token = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                in_token = true;
            }
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            _ => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if in_single_quote {
        return Err(UnterminatedQuote('\''));
    }
    if in_double_quote {
        return Err(UnterminatedQuote('"'));
    }
    if escape_next {
        current.push('\\');
    }
    if in_token {
        args.push(current);
    }

    Ok(args)
}

/// Splits `input` into tokens. An unterminated quote runs to the end of input.
pub fn shell_split(input: &str) -> Vec<String> {
    match try_shell_split(input) {
        Ok(args) => args,
        Err(UnterminatedQuote(quote)) => {
            let mut closed = input.to_string();
            closed.push(quote);
            try_shell_split(&closed).unwrap_or_default()
        }
    }
}

/// Quotes `token` so that [`shell_split`] yields it back unchanged.
pub fn quote(token: &str) -> String {
    let needs_quoting = token.is_empty()
        || token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\' | ':' | '='));

    if !needs_quoting {
        return token.to_string();
    }
    if !token.contains('\'') {
        return format!("'{token}'");
    }

    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('"');
    for ch in token.chars() {
        if matches!(ch, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_split_simple() {
        let args = shell_split("echo hello world");
        assert_eq!(args, vec!["echo", "hello", "world"]);
    }

    #[test]
    fn test_shell_split_quoted() {
        let args = shell_split(r#"echo "hello world" test"#);
        assert_eq!(args, vec!["echo", "hello world", "test"]);
    }

    #[test]
    fn test_shell_split_single_quoted() {
        let args = shell_split("echo 'hello world' test");
        assert_eq!(args, vec!["echo", "hello world", "test"]);
    }

    #[test]
    fn test_shell_split_mixed_quotes() {
        let args = shell_split(r#"cmd "double's quote" 'single"s quote'"#);
        assert_eq!(args, vec!["cmd", "double's quote", r#"single"s quote"#]);
    }

    #[test]
    fn test_shell_split_empty_quoted_token() {
        let args = shell_split(r#"a '' "" b"#);
        assert_eq!(args, vec!["a", "", "", "b"]);
    }

    #[test]
    fn test_shell_split_whitespace_only() {
        assert!(shell_split("   \t  \n").is_empty());
    }

    #[test]
    fn test_shell_split_escapes() {
        let args = shell_split(r#"one\ token "say \"hi\"""#);
        assert_eq!(args, vec!["one token", r#"say "hi""#]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(try_shell_split("'open"), Err(UnterminatedQuote('\'')));
        assert_eq!(shell_split("say 'open ended"), vec!["say", "open ended"]);
    }

    #[test]
    fn test_quote_survives_split() {
        for token in ["plain", "two words", "", "it's", r#"back\slash"#, "a:b", r#"mix "of' both"#] {
            let quoted = quote(token);
            assert_eq!(shell_split(&quoted), vec![token.to_string()], "{quoted}");
        }
    }
}
