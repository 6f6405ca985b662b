//! Expression parser
//!
//! Recursive descent over the raw text: each level scans for its operator
//! at parenthesis depth zero and splits there.
//! Precedence, lowest first: `+ -`, `* /`, unary `-`, `^`/`**` (right
//! associative), primaries.

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::key::is_identifier;
use kamodo_core::{KamodoError, Number};

/// Parse a right-hand-side expression
pub fn parse_expr(input: &str) -> Result<Expr, KamodoError> {
    let normalized = input.replace("**", "^");
    check_parens(&normalized)
        .and_then(|_| parse_additive(normalized.trim()))
        .map_err(|e| e.with_expression(input.trim()))
}

fn check_parens(input: &str) -> Result<(), KamodoError> {
    let mut depth = 0i32;
    for c in input.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(KamodoError::parse_error("unbalanced ')'"));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(KamodoError::parse_error("unbalanced '('"));
    }
    Ok(())
}

fn parse_additive(input: &str) -> Result<Expr, KamodoError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(KamodoError::parse_error("empty expression"));
    }

    let mut paren_depth = 0;
    let char_indices: Vec<(usize, char)> = input.char_indices().collect();

    for idx in (0..char_indices.len()).rev() {
        let (byte_pos, c) = char_indices[idx];
        match c {
            ')' => paren_depth += 1,
            '(' => paren_depth -= 1,
            '+' | '-' if paren_depth == 0 && is_binary_sign(input, &char_indices, idx) => {
                let left = input[..byte_pos].trim();
                let right = input[byte_pos + c.len_utf8()..].trim();
                if right.is_empty() {
                    return Err(KamodoError::parse_error(format!("missing operand after '{}'", c)));
                }
                let op = if c == '+' { BinOp::Add } else { BinOp::Sub };
                return Ok(Expr::BinaryOp(
                    Box::new(parse_additive(left)?),
                    op,
                    Box::new(parse_multiplicative(right)?),
                ));
            }
            _ => {}
        }
    }

    parse_multiplicative(input)
}

/// A `+`/`-` is binary when something other than an operator precedes it,
/// and it is not the sign of a scientific-notation exponent.
fn is_binary_sign(input: &str, chars: &[(usize, char)], idx: usize) -> bool {
    let prev = chars[..idx].iter().rev().find(|(_, c)| !c.is_whitespace());
    let Some(&(prev_pos, prev_char)) = prev else {
        return false;
    };
    if matches!(prev_char, '+' | '-' | '*' | '/' | '^' | '(' | ',') {
        return false;
    }
    if matches!(prev_char, 'e' | 'E') && prev_pos + 1 == chars[idx].0 {
        let token_start = input[..prev_pos]
            .rfind(|c: char| !(c.is_ascii_alphanumeric() || c == '.' || c == '_'))
            .map(|i| i + 1)
            .unwrap_or(0);
        let mantissa = &input[token_start..prev_pos];
        let is_numeric = !mantissa.is_empty()
            && mantissa.chars().all(|c| c.is_ascii_digit() || c == '.')
            && mantissa.chars().any(|c| c.is_ascii_digit());
        if is_numeric {
            return false;
        }
    }
    true
}

fn parse_multiplicative(input: &str) -> Result<Expr, KamodoError> {
    let mut paren_depth = 0;
    let char_indices: Vec<(usize, char)> = input.char_indices().collect();

    for idx in (0..char_indices.len()).rev() {
        let (byte_pos, c) = char_indices[idx];
        match c {
            ')' => paren_depth += 1,
            '(' => paren_depth -= 1,
            '*' | '/' if paren_depth == 0 => {
                let left = input[..byte_pos].trim();
                let right = input[byte_pos + c.len_utf8()..].trim();
                if left.is_empty() || right.is_empty() {
                    return Err(KamodoError::parse_error(format!("missing operand for '{}'", c)));
                }
                let op = if c == '*' { BinOp::Mul } else { BinOp::Div };
                return Ok(Expr::BinaryOp(
                    Box::new(parse_multiplicative(left)?),
                    op,
                    Box::new(parse_unary(right)?),
                ));
            }
            _ => {}
        }
    }

    parse_unary(input)
}

fn parse_unary(input: &str) -> Result<Expr, KamodoError> {
    let input = input.trim();
    if let Some(rest) = input.strip_prefix('-') {
        return Ok(Expr::UnaryOp(UnaryOp::Neg, Box::new(parse_unary(rest)?)));
    }
    if let Some(rest) = input.strip_prefix('+') {
        return parse_unary(rest);
    }
    parse_power(input)
}

fn parse_power(input: &str) -> Result<Expr, KamodoError> {
    let mut paren_depth = 0;

    for (byte_pos, c) in input.char_indices() {
        match c {
            '(' => paren_depth += 1,
            ')' => paren_depth -= 1,
            '^' if paren_depth == 0 => {
                let left = input[..byte_pos].trim();
                let right = input[byte_pos + c.len_utf8()..].trim();
                if left.is_empty() || right.is_empty() {
                    return Err(KamodoError::parse_error("missing operand for '**'"));
                }
                return Ok(Expr::BinaryOp(
                    Box::new(parse_primary(left)?),
                    BinOp::Pow,
                    Box::new(parse_unary(right)?),
                ));
            }
            _ => {}
        }
    }

    parse_primary(input)
}

fn parse_primary(input: &str) -> Result<Expr, KamodoError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(KamodoError::parse_error("empty operand"));
    }

    // Parenthesised group spanning the whole input
    if input.starts_with('(') && matching_close(input, 0) == Some(input.len() - 1) {
        return parse_additive(&input[1..input.len() - 1]);
    }

    // Function call
    if let Some(paren_pos) = input.find('(') {
        let func_name = input[..paren_pos].trim();
        if !is_identifier(func_name) {
            return Err(KamodoError::parse_error(format!("invalid call target '{}'", func_name)));
        }
        return match matching_close(input, paren_pos) {
            Some(close) if close == input.len() - 1 => {
                let args = parse_args(&input[paren_pos + 1..close])?;
                Ok(Expr::Call(func_name.to_string(), args))
            }
            _ => Err(KamodoError::parse_error(format!("unexpected text after call in '{}'", input))),
        };
    }

    // Number
    if input.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return Number::from_str(input)
            .map(Expr::Number)
            .map_err(|_| KamodoError::parse_error(format!("invalid number '{}'", input)));
    }

    if is_identifier(input) {
        return Ok(Expr::Symbol(input.to_string()));
    }

    Err(KamodoError::parse_error(format!("unexpected token '{}'", input)))
}

/// Byte offset of the ')' matching the '(' at `open`
fn matching_close(input: &str, open: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, c) in input[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_args(input: &str) -> Result<Vec<Expr>, KamodoError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut args = Vec::new();
    let mut paren_depth = 0;
    let mut current_start = 0;

    for (byte_pos, c) in input.char_indices() {
        match c {
            '(' => paren_depth += 1,
            ')' => paren_depth -= 1,
            ',' if paren_depth == 0 => {
                args.push(parse_additive(&input[current_start..byte_pos])?);
                current_start = byte_pos + c.len_utf8();
            }
            _ => {}
        }
    }

    args.push(parse_additive(&input[current_start..])?);
    Ok(args)
}
