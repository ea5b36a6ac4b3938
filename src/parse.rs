// Partial parsers over token slices, and the CTL grammar built from them.
//
// Grammar, loosest binding first:
//
//   formula     := disjunction [ "->" formula ]
//   disjunction := conjunction { "|" conjunction }
//   conjunction := unit { "&" unit }
//   unit        := "~" unit | "(" formula ")" | atom
//                | UNARY "(" formula ")" | BINARY "(" formula "," formula ")"
//                | QUANT "(" atom "," formula ")"

use std::str::FromStr;

use itertools::Itertools;
use log::debug;

use crate::error::{CtlSatError, Result};
use crate::formula::{BinaryOp, Formula, Quantifier, UnaryOp, TRUE_LITERAL};
use crate::token::{is_identifier, is_keyword, lex};

// Most parsing functions below take the form of parsing a piece
// off the front of a [String], returning the parsed piece and the
// remaining input.
pub type PartialParseResult<'a, AST> = Result<(AST, &'a [String])>;
pub type PartialParseListResult<'a, AST> = Result<(Vec<AST>, &'a [String])>;

pub type SubparserFuncType<'c, T> = &'c dyn for<'b> Fn(&'b [String]) -> PartialParseResult<'b, T>;

pub struct Subparser<'a, AST> {
    pub fun: SubparserFuncType<'a, AST>,
}
impl<'a, AST> Subparser<'a, AST> {
    fn call<'b>(&self, input: &'b [String]) -> PartialParseResult<'b, AST> {
        (self.fun)(input)
    }
}

// ### Abstract parser builders

pub fn parse_right_infix<'a, AST>(
    op_symbol: &str,
    op_constructor: fn(AST, AST) -> AST,
    subparser: &Subparser<AST>,
    input: &'a [String],
) -> PartialParseResult<'a, AST> {
    // Parser builder for handling right-associative infix operations.
    // `op_constructor` should build the AST node for `op_symbol`.
    let (ast1, rest1) = subparser.call(input)?;
    match rest1 {
        [head, rest2 @ ..] if head == op_symbol => {
            let (ast2, rest3) = parse_right_infix(op_symbol, op_constructor, subparser, rest2)?;
            Ok((op_constructor(ast1, ast2), rest3))
        }
        _ => Ok((ast1, rest1)),
    }
}

pub fn parse_left_infix<'a, AST>(
    op_symbol: &str,
    op_constructor: fn(AST, AST) -> AST,
    subparser: &Subparser<AST>,
    input: &'a [String],
) -> PartialParseResult<'a, AST> {
    // Parser builder for handling left-associative infix operations.
    let (mut ast, mut rest) = subparser.call(input)?;
    loop {
        match rest {
            [head, tail @ ..] if head == op_symbol => {
                let (next, after) = subparser.call(tail)?;
                ast = op_constructor(ast, next);
                rest = after;
            }
            _ => return Ok((ast, rest)),
        }
    }
}

pub fn parse_list<'a, AST>(
    op_symbol: &str,
    subparser: &Subparser<AST>,
    input: &'a [String],
) -> PartialParseListResult<'a, AST> {
    // One or more items separated by `op_symbol` (usually a comma).
    debug!("parse_list called on op_symbol {op_symbol:?}, input {input:?}");
    let (first, mut rest) = subparser.call(input)?;
    let mut items = vec![first];
    while let [head, tail @ ..] = rest {
        if head != op_symbol {
            break;
        }
        let (item, after) = subparser.call(tail)?;
        items.push(item);
        rest = after;
    }
    Ok((items, rest))
}

fn expect<'a>(symbol: &str, input: &'a [String]) -> Result<&'a [String]> {
    match input {
        [head, rest @ ..] if head == symbol => Ok(rest),
        [head, ..] => Err(CtlSatError::Parse(format!(
            "expected {symbol:?}, found {head:?}"
        ))),
        [] => Err(CtlSatError::Parse(format!(
            "expected {symbol:?}, found end of input"
        ))),
    }
}

pub fn parse_bracketed<'a, AST>(
    subparser: &Subparser<AST>,
    input: &'a [String],
) -> PartialParseResult<'a, AST> {
    // To be called after an opening bracket has been read.  The `subparser`
    // must parse all the way to the closing bracket.
    debug!("parse_bracketed called on input {input:?}");
    let (ast, rest) = subparser.call(input)?;
    Ok((ast, expect(")", rest)?))
}

pub fn parse_bracketed_list<'a, AST>(
    op_symbol: &str,
    subparser: &Subparser<AST>,
    input: &'a [String],
) -> PartialParseListResult<'a, AST> {
    // Same as `parse_bracketed` for a delimited list.
    debug!("parse_bracketed_list called on input {input:?}");
    let (items, rest) = parse_list(op_symbol, subparser, input)?;
    Ok((items, expect(")", rest)?))
}

pub fn generic_parser<AST>(
    inner: fn(&[String]) -> PartialParseResult<'_, AST>,
    input: &str,
) -> Result<AST> {
    // Tokenize and call parser on result.
    let lexed = lex(input)?;
    let (expr, rest) = inner(&lexed[..])?;
    if !rest.is_empty() {
        return Err(CtlSatError::Parse(format!("unparsed input {rest:?}")));
    }
    Ok(expr)
}

// ### CTL formulas

pub fn parse_formula(input: &[String]) -> PartialParseResult<'_, Formula> {
    parse_right_infix(
        "->",
        Formula::imp,
        &Subparser {
            fun: &parse_disjunction,
        },
        input,
    )
}

fn parse_disjunction(input: &[String]) -> PartialParseResult<'_, Formula> {
    parse_left_infix(
        "|",
        Formula::or,
        &Subparser {
            fun: &parse_conjunction,
        },
        input,
    )
}

fn parse_conjunction(input: &[String]) -> PartialParseResult<'_, Formula> {
    parse_left_infix("&", Formula::and, &Subparser { fun: &parse_unit }, input)
}

fn parse_unit(input: &[String]) -> PartialParseResult<'_, Formula> {
    match input {
        [] => Err(CtlSatError::Parse(String::from(
            "unexpected end of input",
        ))),
        [head, rest @ ..] if head == "~" => {
            let (formula, rest) = parse_unit(rest)?;
            Ok((Formula::not(formula), rest))
        }
        [head, rest @ ..] if head == "(" => parse_bracketed(
            &Subparser {
                fun: &parse_formula,
            },
            rest,
        ),
        [head, rest @ ..] if is_keyword(head) => parse_application(head, rest),
        [head, rest @ ..] if is_identifier(head) => Ok((Formula::atom(head), rest)),
        [head, ..] => Err(CtlSatError::Parse(format!("unexpected token {head:?}"))),
    }
}

fn unary_op(keyword: &str) -> Option<UnaryOp> {
    match keyword {
        "EX" => Some(UnaryOp::EX),
        "AX" => Some(UnaryOp::AX),
        "EF" => Some(UnaryOp::EF),
        "AF" => Some(UnaryOp::AF),
        "EG" => Some(UnaryOp::EG),
        "AG" => Some(UnaryOp::AG),
        _ => None,
    }
}

fn binary_op(keyword: &str) -> Option<BinaryOp> {
    match keyword {
        "EU" => Some(BinaryOp::EU),
        "AU" => Some(BinaryOp::AU),
        "ER" => Some(BinaryOp::ER),
        "AR" => Some(BinaryOp::AR),
        _ => None,
    }
}

fn quantifier(keyword: &str) -> Option<Quantifier> {
    match keyword {
        "E" => Some(Quantifier::Exists),
        "A" => Some(Quantifier::All),
        _ => None,
    }
}

fn parse_application<'a>(keyword: &str, input: &'a [String]) -> PartialParseResult<'a, Formula> {
    // `keyword` has been read; its bracketed arguments follow.
    let rest = expect("(", input)
        .map_err(|_| CtlSatError::Parse(format!("operator {keyword} must be followed by '('")))?;
    let (args, rest) = parse_bracketed_list(
        ",",
        &Subparser {
            fun: &parse_formula,
        },
        rest,
    )?;
    let formula = match args.as_slice() {
        [p] => unary_op(keyword).map(|op| Formula::unary(op, p.clone())),
        [p, q] => match (binary_op(keyword), quantifier(keyword), p) {
            (Some(op), _, _) => Some(Formula::binary(op, p.clone(), q.clone())),
            (_, Some(kind), Formula::Atom(name)) if name != TRUE_LITERAL => {
                Some(Formula::quantified(kind, name, q.clone()))
            }
            _ => None,
        },
        _ => None,
    };
    match formula {
        Some(formula) => Ok((formula, rest)),
        None => Err(CtlSatError::Parse(format!(
            "bad arguments to {keyword}: {}",
            args.iter().join(", ")
        ))),
    }
}

impl Formula {
    pub fn parse(input: &str) -> Result<Formula> {
        generic_parser(parse_formula, input)
    }
}

impl FromStr for Formula {
    type Err = CtlSatError;

    fn from_str(input: &str) -> Result<Formula> {
        Formula::parse(input)
    }
}

#[cfg(test)]
mod generic_parsing_tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn to_tokens(input: &[&str]) -> Vec<String> {
        input.iter().map(|x| x.to_string()).collect()
    }

    fn _parse_unit(input: &[String]) -> PartialParseResult<'_, Formula> {
        match input {
            [head, rest @ ..] if head == "(" => parse_bracketed(
                &Subparser {
                    fun: &_parse_conjunction,
                },
                rest,
            ),
            [head, rest @ ..] => Ok((Formula::atom(head), rest)),
            _ => Err(CtlSatError::Parse(String::from("got empty input"))),
        }
    }

    fn _parse_conjunction(input: &[String]) -> PartialParseResult<'_, Formula> {
        parse_right_infix("&", Formula::and, &Subparser { fun: &_parse_unit }, input)
    }

    #[test]
    fn test_parse_right_infix_three_conjuncts() {
        let input = to_tokens(&["P", "&", "Q", "&", "S"]);
        let (result, rest) =
            parse_right_infix("&", Formula::and, &Subparser { fun: &_parse_unit }, &input)
                .unwrap();
        let desired = Formula::and(
            Formula::atom("P"),
            Formula::and(Formula::atom("Q"), Formula::atom("S")),
        );
        assert_eq!(result, desired);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_left_infix_three_conjuncts() {
        let input = to_tokens(&["P", "&", "Q", "&", "S", ")"]);
        let (result, rest) =
            parse_left_infix("&", Formula::and, &Subparser { fun: &_parse_unit }, &input)
                .unwrap();
        let desired = Formula::and(
            Formula::and(Formula::atom("P"), Formula::atom("Q")),
            Formula::atom("S"),
        );
        assert_eq!(result, desired);
        assert_eq!(rest, &[String::from(")")][..]);
    }

    #[test]
    fn test_parse_bracketed() {
        init();
        let input = to_tokens(&["P", "&", "(", "Q", "&", "S", ")", ")", "REST"]);
        let (result, rest) = parse_bracketed(
            &Subparser {
                fun: &_parse_conjunction,
            },
            &input,
        )
        .unwrap();
        let desired = Formula::and(
            Formula::atom("P"),
            Formula::and(Formula::atom("Q"), Formula::atom("S")),
        );
        assert_eq!(result, desired);
        assert_eq!(rest, &[String::from("REST")][..]);
    }

    #[test]
    fn test_parse_bracketed_missing_close() {
        let input = to_tokens(&["P", "&", "Q"]);
        let result = parse_bracketed(
            &Subparser {
                fun: &_parse_conjunction,
            },
            &input,
        );
        assert!(matches!(result, Err(CtlSatError::Parse(_))));
    }

    #[test]
    fn test_parse_list() {
        init();
        let input = to_tokens(&["A", ",", "B", ",", "C", "REST"]);
        let (result, rest) = parse_list(",", &Subparser { fun: &_parse_unit }, &input).unwrap();
        let desired = vec![Formula::atom("A"), Formula::atom("B"), Formula::atom("C")];
        assert_eq!(result, desired);
        assert_eq!(rest, &[String::from("REST")][..]);
    }
}
