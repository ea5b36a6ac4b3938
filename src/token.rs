// ### Token constants and lexing library. ###

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::error::{CtlSatError, Result};

pub const UNARY_KEYWORDS: [&str; 6] = ["EX", "AX", "EF", "AF", "EG", "AG"];
pub const BINARY_KEYWORDS: [&str; 4] = ["EU", "AU", "ER", "AR"];
pub const QUANTIFIER_KEYWORDS: [&str; 2] = ["E", "A"];

pub fn is_keyword(token: &str) -> bool {
    UNARY_KEYWORDS.contains(&token)
        || BINARY_KEYWORDS.contains(&token)
        || QUANTIFIER_KEYWORDS.contains(&token)
}

pub fn is_identifier(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn token_regex() -> Result<&'static Regex> {
    // One token, anchored at the start of the remaining input: an identifier
    // (atoms and keywords share a shape), `->`, or a single punctuation
    // character.
    static TOKEN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r"^\s*(?:([A-Za-z0-9_]+)|(->|[~&|(),]))"))
        .as_ref()
        .map_err(|err| CtlSatError::Parse(err.to_string()))
}

pub fn lex(input: &str) -> Result<Vec<String>> {
    let re = token_regex()?;
    let mut tokens = Vec::new();
    let mut position = 0;
    while !input[position..].trim_start().is_empty() {
        let rest = &input[position..];
        let captures = re.captures(rest).ok_or_else(|| {
            let offset = position + (rest.len() - rest.trim_start().len());
            let found = rest.trim_start().chars().next().unwrap_or(' ');
            CtlSatError::Parse(format!(
                "unrecognized character {found:?} at position {offset}"
            ))
        })?;
        let token = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str().to_owned())
            .unwrap_or_default();
        tokens.push(token);
        position += captures.get(0).map_or(rest.len(), |m| m.end());
    }
    debug!("lexed {input:?} into {tokens:?}");
    Ok(tokens)
}

#[cfg(test)]
mod lex_tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn simple_lex() {
        init();
        let result = lex("p & ~q").unwrap();
        let desired = vec!["p", "&", "~", "q"];
        assert_eq!(result, desired);
    }

    #[test]
    fn lex_temporal() {
        init();
        let result = lex("  EU(p_1,AX(q))->r ").unwrap();
        let desired = vec!["EU", "(", "p_1", ",", "AX", "(", "q", ")", ")", "->", "r"];
        assert_eq!(result, desired);
    }

    #[test]
    fn lex_no_spaces_needed() {
        let result = lex("~~p|q&TRUE").unwrap();
        let desired = vec!["~", "~", "p", "|", "q", "&", "TRUE"];
        assert_eq!(result, desired);
    }

    #[test]
    fn lex_empty() {
        assert!(lex("").unwrap().is_empty());
        assert!(lex("   ").unwrap().is_empty());
    }

    #[test]
    fn lex_rejects_unknown_characters() {
        let result = lex("p & $q");
        match result {
            Err(CtlSatError::Parse(message)) => {
                assert_eq!(message, "unrecognized character '$' at position 4")
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
        // A lone `-` is not an operator.
        assert!(lex("p - q").is_err());
    }

    #[test]
    fn keywords() {
        assert!(is_keyword("EX"));
        assert!(is_keyword("E"));
        assert!(!is_keyword("EXP"));
        assert!(is_identifier("p_1"));
        assert!(!is_identifier("->"));
    }
}
