/*
Copyright 2021 Robin Marchart

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

//! Recursive-descent grammar for dice expressions.
//!
//! ```text
//! top       := deathSave | stats | commaList      (dnd5e forms gated)
//! commaList := labeled ("," " "* labeled)*
//! labeled   := sum (" " [^,()+*×/%-]+)?
//! sum       := prod ([+-] prod)*
//! prod      := value (("//" | [*×/÷]) value)*
//! value     := keepdropDice | advdisDice | simpleDice | oneDice
//!            | natural | "(" labeled ")"
//! ```
//!
//! There is no whitespace tolerance outside of labels and comma
//! separators.

use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case, take_while, take_while1};
use nom::character::complete::{char, digit0, one_of};
use nom::combinator::{all_consuming, map, opt, recognize};
use nom::multi::many0;
use nom::sequence::pair;
use nom::{Err, IResult};

use crate::config::Config;
use crate::expr::{Node, NodeKind, ProdOp, SumOp};

/// Largest allowed numeric literal (also the dice count and side bound).
const MAX_NATURAL: i64 = 1_000_000;
const MAX_NATURAL_DIGITS: usize = 7;

/// User-visible parse failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("number too large: {0}")]
    NumberTooLarge(String),
    #[error("invalid dice expression near \"{0}\"")]
    Syntax(String),
    #[error("invalid dice expression: unexpected end of input")]
    UnexpectedEnd,
}

// Internal nom error; carries the too-large token through the failure
// channel so it survives backtracking.
#[derive(Debug, PartialEq)]
pub(crate) struct RawError<'a> {
    input: &'a str,
    too_large: Option<String>,
}

impl<'a> nom::error::ParseError<&'a str> for RawError<'a> {
    fn from_error_kind(input: &'a str, _kind: nom::error::ErrorKind) -> Self {
        RawError {
            input,
            too_large: None,
        }
    }

    fn append(_input: &'a str, _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, T> = IResult<&'a str, T, RawError<'a>>;

/// Parse a complete expression. The whole input must be consumed.
pub fn parse(input: &str, config: &Config) -> Result<Node, ParseError> {
    let result = if config.enable_dnd5e {
        all_consuming(alt((|i| comma_list(i, true), stats, death_save)))(input)
    } else {
        all_consuming(|i| comma_list(i, false))(input)
    };
    match result {
        Ok((_, node)) => Ok(node),
        Err(Err::Error(e)) | Err(Err::Failure(e)) => Err(match e.too_large {
            Some(token) => ParseError::NumberTooLarge(token),
            None if e.input.is_empty() => ParseError::UnexpectedEnd,
            None => ParseError::Syntax(e.input.chars().take(24).collect()),
        }),
        Err(Err::Incomplete(_)) => Err(ParseError::UnexpectedEnd),
    }
}

fn natural(input: &str) -> PResult<'_, (i64, &str)> {
    let (rest, token) = recognize(pair(one_of("123456789"), digit0))(input)?;
    if token.len() > MAX_NATURAL_DIGITS {
        return Err(Err::Failure(RawError {
            input,
            too_large: Some(token.to_string()),
        }));
    }
    let n = token
        .bytes()
        .fold(0i64, |acc, b| acc * 10 + i64::from(b - b'0'));
    if n > MAX_NATURAL {
        return Err(Err::Failure(RawError {
            input,
            too_large: Some(n.to_string()),
        }));
    }
    Ok((rest, (n, token)))
}

fn natural_node(input: &str) -> PResult<'_, Node> {
    map(natural, |(n, token)| {
        Node::new(token.to_string(), Vec::new(), NodeKind::Natural(n))
    })(input)
}

fn dice_marker(input: &str) -> PResult<'_, &str> {
    recognize(one_of("Dd"))(input)
}

/// Number of sides: a natural, or `%` for 100.
fn dice_sides(input: &str) -> PResult<'_, (i64, &str)> {
    alt((natural, map(tag("%"), |t| (100, t))))(input)
}

fn dice_node(token: String, count: i64, sides: i64, keep_low: i64, keep_high: i64) -> Node {
    Node::new(
        token,
        Vec::new(),
        NodeKind::Dice {
            count,
            sides,
            keep_low,
            keep_high,
            rolls: Vec::new(),
        },
    )
}

fn one_dice(input: &str) -> PResult<'_, Node> {
    let (rest, d) = dice_marker(input)?;
    let (rest, (sides, sides_token)) = dice_sides(rest)?;
    let token = format!("{}{}", d, sides_token);
    Ok((rest, dice_node(token, 1, sides, 0, 1)))
}

fn simple_dice(input: &str) -> PResult<'_, Node> {
    let (rest, (count, count_token)) = natural(input)?;
    let (rest, d) = dice_marker(rest)?;
    let (rest, (sides, sides_token)) = dice_sides(rest)?;
    let token = format!("{}{}{}", count_token, d, sides_token);
    Ok((rest, dice_node(token, count, sides, 0, count)))
}

fn keepdrop_dice(input: &str) -> PResult<'_, Node> {
    let (rest, (count, count_token)) = natural(input)?;
    let (rest, d) = dice_marker(rest)?;
    let (rest, (sides, sides_token)) = dice_sides(rest)?;
    let (rest, mode) =
        recognize(pair(one_of("KkDd"), opt(one_of("HhLl"))))(rest)?;
    let (rest, (k, k_token)) = natural(rest)?;
    let (keep_low, keep_high) = match mode.to_lowercase().as_str() {
        "k" | "kh" => (count - k, count),
        "d" | "dl" => (k, count),
        "kl" => (0, k),
        "dh" => (0, count - k),
        _ => unreachable!("mode characters are constrained by the grammar"),
    };
    let token = format!("{}{}{}{}{}", count_token, d, sides_token, mode, k_token);
    Ok((rest, dice_node(token, count, sides, keep_low, keep_high)))
}

/// `d20a` rolls two dice and keeps the best, `d20d` the worst.
fn advdis_dice(input: &str) -> PResult<'_, Node> {
    let (rest, d) = dice_marker(input)?;
    let (rest, (sides, sides_token)) = dice_sides(rest)?;
    let (rest, mode) = one_of("AaDd")(rest)?;
    let (keep_low, keep_high) = match mode.to_ascii_lowercase() {
        'a' => (1, 2),
        'd' => (0, 1),
        _ => unreachable!("mode characters are constrained by the grammar"),
    };
    let token = format!("{}{}{}", d, sides_token, mode);
    Ok((rest, dice_node(token, 2, sides, keep_low, keep_high)))
}

fn stats(input: &str) -> PResult<'_, Node> {
    map(tag_no_case("stats"), |token: &str| {
        let one_stat = dice_node("4d6d1".to_string(), 4, 6, 1, 4);
        Node::new(token.to_string(), vec![one_stat; 6], NodeKind::Stats)
    })(input)
}

fn death_save(input: &str) -> PResult<'_, Node> {
    map(
        recognize(pair(
            tag_no_case("death"),
            pair(opt(one_of(" -")), tag_no_case("save")),
        )),
        |token: &str| {
            let d20 = dice_node("1d20".to_string(), 1, 20, 0, 1);
            Node::new(token.to_string(), vec![d20], NodeKind::DeathSave)
        },
    )(input)
}

fn value(input: &str, dnd: bool) -> PResult<'_, Node> {
    if dnd {
        alt((
            keepdrop_dice,
            advdis_dice,
            simple_dice,
            one_dice,
            natural_node,
            |i| group_expr(i, true),
        ))(input)
    } else {
        alt((
            keepdrop_dice,
            simple_dice,
            one_dice,
            natural_node,
            |i| group_expr(i, false),
        ))(input)
    }
}

fn group_expr(input: &str, dnd: bool) -> PResult<'_, Node> {
    let (rest, _) = char('(')(input)?;
    let (rest, inner) = maybe_labeled(rest, dnd)?;
    let (rest, _) = char(')')(rest)?;
    let token = format!("({})", inner.token());
    Ok((rest, Node::new(token, vec![inner], NodeKind::Group)))
}

fn prod_op(input: &str) -> PResult<'_, (ProdOp, &str)> {
    alt((
        map(tag("//"), |t| (ProdOp::ExactDiv, t)),
        map(recognize(one_of("*×/÷")), |t| {
            let op = match t {
                "*" | "×" => ProdOp::Mul,
                "/" => ProdOp::TruncDiv,
                _ => ProdOp::ExactDiv,
            };
            (op, t)
        }),
    ))(input)
}

fn prod(input: &str, dnd: bool) -> PResult<'_, Node> {
    let (rest, first) = value(input, dnd)?;
    let (rest, tail) = many0(pair(prod_op, |i| value(i, dnd)))(rest)?;
    let mut token = first.token().to_string();
    let mut children = vec![first];
    let mut ops = Vec::with_capacity(tail.len());
    for ((op, op_token), child) in tail {
        token.push_str(op_token);
        token.push_str(child.token());
        ops.push(op);
        children.push(child);
    }
    Ok((rest, Node::new(token, children, NodeKind::Prod { ops })))
}

fn sum(input: &str, dnd: bool) -> PResult<'_, Node> {
    let (rest, first) = prod(input, dnd)?;
    let (rest, tail) =
        many0(pair(one_of("+-"), |i| prod(i, dnd)))(rest)?;
    let mut token = first.token().to_string();
    let mut children = vec![first];
    let mut ops = Vec::with_capacity(tail.len());
    for (op_char, child) in tail {
        token.push(op_char);
        token.push_str(child.token());
        ops.push(if op_char == '+' { SumOp::Add } else { SumOp::Sub });
        children.push(child);
    }
    Ok((rest, Node::new(token, children, NodeKind::Sum { ops })))
}

/// A label is a space followed by free text, stopping at anything that
/// could continue the expression.
fn label_text(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        char(' '),
        take_while1(|c: char| {
            !matches!(c, ',' | '(' | ')' | '+' | '*' | '×' | '/' | '%' | '-')
        }),
    ))(input)
}

fn maybe_labeled(input: &str, dnd: bool) -> PResult<'_, Node> {
    let (rest, node) = sum(input, dnd)?;
    let (rest, label) = opt(label_text)(rest)?;
    match label {
        Some(text) => {
            let token = format!("{}{}", node.token(), text);
            let label = text.trim().to_string();
            Ok((
                rest,
                Node::new(token, vec![node], NodeKind::Labeled { label }),
            ))
        }
        None => Ok((rest, node)),
    }
}

fn comma_sep(input: &str) -> PResult<'_, &str> {
    recognize(pair(char(','), take_while(|c: char| c == ' ')))(input)
}

fn comma_list(input: &str, dnd: bool) -> PResult<'_, Node> {
    let (rest, first) = maybe_labeled(input, dnd)?;
    let (rest, tail) = many0(pair(comma_sep, |i| maybe_labeled(i, dnd)))(rest)?;
    let mut token = first.token().to_string();
    let mut children = vec![first];
    for (sep, child) in tail {
        token.push_str(sep);
        token.push_str(child.token());
        children.push(child);
    }
    Ok((rest, Node::new(token, children, NodeKind::CommaList)))
}
