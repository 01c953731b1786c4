//! Local arithmetic expression evaluator.
//!
//! Fallback used whenever the remote evaluation service is disabled or fails.
//! Implements standard operator precedence (`*` and `/` bind tighter than `+`
//! and `-`, all left-associative) with parentheses, so a generated expression
//! always evaluates to the same value the remote service would return.

use thiserror::Error;

/// Error raised when an expression cannot be evaluated locally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A character outside the supported grammar was encountered.
    #[error("unexpected character `{found}` at position {position}")]
    UnexpectedChar { found: char, position: usize },
    /// The expression ended where a number or parenthesis was expected.
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    /// A closing parenthesis was expected at the given position.
    #[error("unbalanced parenthesis at position {position}")]
    UnbalancedParen { position: usize },
    /// Input remained after a complete expression was parsed.
    #[error("trailing input at position {position}")]
    TrailingInput { position: usize },
    /// The expression produced an infinite or NaN result.
    #[error("expression did not evaluate to a finite number")]
    NonFinite,
}

/// Evaluate an arithmetic expression with standard precedence rules.
pub fn evaluate(expression: &str) -> Result<f64, EvalError> {
    let mut parser = Parser::new(expression);
    let value = parser.expression()?;
    parser.skip_whitespace();
    if let Some((position, _)) = parser.peek() {
        return Err(EvalError::TrailingInput { position });
    }
    if !value.is_finite() {
        return Err(EvalError::NonFinite);
    }
    Ok(value)
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        let chars: Vec<(usize, char)> = input.char_indices().collect();
        let len = chars.len();
        Self { chars, pos: 0, len }
    }

    fn peek(&self) -> Option<(usize, char)> {
        (self.pos < self.len).then(|| self.chars[self.pos])
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let current = self.peek();
        if current.is_some() {
            self.pos += 1;
        }
        current
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some((_, c)) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// additive := multiplicative (('+' | '-') multiplicative)*
    fn expression(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some((_, '+')) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some((_, '-')) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    /// multiplicative := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.factor()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some((_, '*')) => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Some((_, '/')) => {
                    self.pos += 1;
                    value /= self.factor()?;
                }
                _ => return Ok(value),
            }
        }
    }

    /// factor := '-' factor | '(' additive ')' | number
    fn factor(&mut self) -> Result<f64, EvalError> {
        self.skip_whitespace();
        match self.peek() {
            Some((_, '-')) => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some((_, '(')) => {
                self.pos += 1;
                let value = self.expression()?;
                self.skip_whitespace();
                match self.bump() {
                    Some((_, ')')) => Ok(value),
                    Some((position, _)) => Err(EvalError::UnbalancedParen { position }),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some((_, c)) if c.is_ascii_digit() => self.number(),
            Some((position, found)) => Err(EvalError::UnexpectedChar { found, position }),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn number(&mut self) -> Result<f64, EvalError> {
        let start = self.pos;
        while matches!(self.peek(), Some((_, c)) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if matches!(self.peek(), Some((_, '.'))) {
            self.pos += 1;
            while matches!(self.peek(), Some((_, c)) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let literal: String = self.chars[start..self.pos].iter().map(|(_, c)| c).collect();
        literal.parse::<f64>().map_err(|_| {
            let position = self.chars[start].0;
            EvalError::UnexpectedChar {
                found: '.',
                position,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_simple_addition_and_subtraction() {
        assert_eq!(evaluate("5 + 10").unwrap(), 15.0);
        assert_eq!(evaluate("12 - 7").unwrap(), 5.0);
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(evaluate("3 * 4 + 5").unwrap(), 17.0);
        assert_eq!(evaluate("5 + 3 * 4").unwrap(), 17.0);
        assert_eq!(evaluate("2 - 3 * 4").unwrap(), -10.0);
    }

    #[test]
    fn operators_are_left_associative() {
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("24 / 4 / 2").unwrap(), 3.0);
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(evaluate("(5 + 7) * 3").unwrap(), 36.0);
        assert_eq!(evaluate("2 * (3 + 4)").unwrap(), 14.0);
    }

    #[test]
    fn unary_minus_is_supported() {
        assert_eq!(evaluate("-5 + 8").unwrap(), 3.0);
        assert_eq!(evaluate("4 * -2").unwrap(), -8.0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            evaluate("2 + x"),
            Err(EvalError::UnexpectedChar { found: 'x', .. })
        ));
        assert!(matches!(evaluate("2 +"), Err(EvalError::UnexpectedEnd)));
        assert!(matches!(
            evaluate("(2 + 3"),
            Err(EvalError::UnexpectedEnd)
        ));
        assert!(matches!(
            evaluate("2 3"),
            Err(EvalError::TrailingInput { .. })
        ));
    }

    #[test]
    fn rejects_non_finite_results() {
        assert_eq!(evaluate("1 / 0"), Err(EvalError::NonFinite));
    }
}
