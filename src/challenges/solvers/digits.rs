//! Digit-expression solver.
//!
//! Locates the longest arithmetic run in free-form challenge text and evaluates
//! it with a small recursive-descent parser. Only integers, whitespace,
//! parentheses and `+ - * / ^` are accepted; anything else is a parse failure.

use thiserror::Error;

use super::format_answer;

/// Candidates longer than this are rejected outright.
pub const MAX_EXPRESSION_LEN: usize = 200;

const OPERATORS: &[char] = &['+', '-', '*', '/', '^'];

fn is_expression_char(c: char) -> bool {
    c.is_ascii_digit() || c.is_whitespace() || OPERATORS.contains(&c) || c == '(' || c == ')'
}

/// Solve the digit path, returning the answer formatted with two decimals.
pub fn solve_digit_expression(text: &str) -> Option<String> {
    let candidate = find_expression(text)?;
    if candidate.chars().count() > MAX_EXPRESSION_LEN || !candidate.chars().all(is_expression_char)
    {
        return None;
    }
    evaluate(candidate).ok().and_then(format_answer)
}

/// Longest maximal run of expression characters that contains both a digit
/// and an operator. Ties keep the earliest run.
pub fn find_expression(text: &str) -> Option<&str> {
    let mut best: Option<&str> = None;
    let mut start: Option<usize> = None;

    for (idx, c) in text.char_indices() {
        match (is_expression_char(c), start) {
            (true, None) => start = Some(idx),
            (false, Some(begin)) => {
                keep_longest(&text[begin..idx], &mut best);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = start {
        keep_longest(&text[begin..], &mut best);
    }

    best
}

fn keep_longest<'a>(run: &'a str, best: &mut Option<&'a str>) {
    let run = run.trim();
    let has_digit = run.chars().any(|c| c.is_ascii_digit());
    let has_operator = run.chars().any(|c| OPERATORS.contains(&c));
    if !(has_digit && has_operator) {
        return;
    }
    if best.is_none_or(|current| run.len() > current.len()) {
        *best = Some(run);
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ExpressionError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token at position {0}")]
    UnexpectedToken(usize),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not finite")]
    NotFinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Op(char),
    Open,
    Close,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() {
            let mut value = 0f64;
            while let Some(&digit) = chars.peek() {
                let Some(d) = digit.to_digit(10) else {
                    break;
                };
                value = value * 10.0 + f64::from(d);
                chars.next();
            }
            tokens.push(Token::Number(value));
        } else if OPERATORS.contains(&c) {
            tokens.push(Token::Op(c));
            chars.next();
        } else if c == '(' {
            tokens.push(Token::Open);
            chars.next();
        } else if c == ')' {
            tokens.push(Token::Close);
            chars.next();
        } else {
            return Err(ExpressionError::UnexpectedChar(c));
        }
    }

    Ok(tokens)
}

/// Evaluate an arithmetic expression.
///
/// Precedence from loosest to tightest: `+ -`, `* /`, unary sign, `^`
/// (right associative).
pub fn evaluate(expr: &str) -> Result<f64, ExpressionError> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(ExpressionError::UnexpectedToken(parser.pos));
    }
    if !value.is_finite() {
        return Err(ExpressionError::NotFinite);
    }
    Ok(value)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expression(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = if op == '*' {
                value * rhs
            } else {
                if rhs == 0.0 {
                    return Err(ExpressionError::DivisionByZero);
                }
                value / rhs
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64, ExpressionError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, ExpressionError> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, ExpressionError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::Open) => {
                let value = self.expression()?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    Some(_) => Err(ExpressionError::UnexpectedToken(self.pos - 1)),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            Some(_) => Err(ExpressionError::UnexpectedToken(self.pos - 1)),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}
