use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::parse::StatTable;

pub const SENTINEL: &str = "-";
const LITERAL_MARKER: char = '!';

static STAT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\^[^^$]+\.[^^$]+\$").expect("valid regex")
});

/// One row of a stat table: a formula over `^SubMode.Field$` tokens and its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSpec {
    pub formula: String,
    pub label: String,
}

impl RowSpec {
    pub fn new(formula: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            label: label.into(),
        }
    }

    /// Parses the `"<formula> #<label>"` shorthand.
    pub fn parse(raw: &str) -> Option<Self> {
        let (formula, label) = raw.split_once('#')?;
        Some(Self::new(formula.trim(), label.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("not an arithmetic expression")]
    Syntax,
}

/// Looks up `Sub.Field` in the table. Splits on the first dot only, so `Overall.K/D` works.
pub fn get_stat<'a>(table: &'a StatTable, path: &str) -> Option<&'a str> {
    let (sub_mode, field) = path.split_once('.')?;
    table.get(sub_mode)?.get(field).map(String::as_str)
}

/// Replaces every stat token with its value, thousands separators removed.
/// `None` when any token points at a missing sub-mode or field.
pub fn substitute(formula: &str, table: &StatTable) -> Option<String> {
    let mut missing = false;
    let out = STAT_TOKEN.replace_all(formula, |caps: &Captures| {
        let token = &caps[0];
        let path = &token[1..token.len() - 1];
        match get_stat(table, path) {
            Some(value) => value.replace(',', ""),
            None => {
                missing = true;
                String::new()
            }
        }
    });
    if missing {
        return None;
    }
    Some(out.into_owned())
}

pub fn evaluate_row(spec: &RowSpec, table: &StatTable) -> String {
    match substitute(&spec.formula, table) {
        Some(expr) => render(&expr),
        None => SENTINEL.to_string(),
    }
}

/// Evaluates an already-substituted formula into its display value.
pub fn render(expr: &str) -> String {
    match evaluate(expr) {
        Ok(value) => format_number(value),
        Err(EvalError::DivisionByZero) => SENTINEL.to_string(),
        Err(EvalError::Syntax) if expr.contains(LITERAL_MARKER) => {
            expr.replace(LITERAL_MARKER, "").trim().to_string()
        }
        Err(EvalError::Syntax) => SENTINEL.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        let token = match ch {
            c if c.is_whitespace() => continue,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start + c.len_utf8();
                while let Some(&(idx, next)) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        end = idx + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = expr[start..end]
                    .parse::<f64>()
                    .map_err(|_| EvalError::Syntax)?;
                Token::Num(value)
            }
            _ => return Err(EvalError::Syntax),
        };
        tokens.push(token);
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == Token::Star {
                value * rhs
            } else {
                if rhs == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                value / rhs
            };
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, EvalError> {
        match self.bump() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::Minus) => Ok(-self.factor()?),
            Some(Token::Plus) => self.factor(),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(EvalError::Syntax),
                }
            }
            _ => Err(EvalError::Syntax),
        }
    }
}

/// Numbers, `+ - * /`, unary sign and parentheses. Nothing else is accepted.
pub fn evaluate(expr: &str) -> Result<f64, EvalError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(EvalError::Syntax);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(EvalError::Syntax);
    }
    Ok(value)
}

/// `1234` -> `1,234`, `12.5` -> `12.50`.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return SENTINEL.to_string();
    }
    let rendered = if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    };
    let unsigned = rendered.trim_start_matches('-');
    // Rounding can leave "-0.00" behind.
    let sign = if rendered.starts_with('-') && unsigned.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };
    let grouped = group_thousands(int_part);
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn table(entries: &[(&str, &str, &str)]) -> StatTable {
        let mut out = StatTable::new();
        for (sub, field, value) in entries {
            out.entry(sub.to_string())
                .or_insert_with(BTreeMap::new)
                .insert(field.to_string(), value.to_string());
        }
        out
    }

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("10 / 4").unwrap(), 2.5);
        assert_eq!(evaluate("-3 + 5").unwrap(), 2.0);
        assert_eq!(evaluate("8 - 2 - 1").unwrap(), 5.0);
    }

    #[test]
    fn rejects_anything_but_arithmetic() {
        assert_eq!(evaluate(""), Err(EvalError::Syntax));
        assert_eq!(evaluate("1 2"), Err(EvalError::Syntax));
        assert_eq!(evaluate("(1 + 2"), Err(EvalError::Syntax));
        assert_eq!(evaluate("__import__('os')"), Err(EvalError::Syntax));
        assert_eq!(evaluate("2 ** 3"), Err(EvalError::Syntax));
    }

    #[test]
    fn division_by_zero_is_reported() {
        assert_eq!(evaluate("5 / (3 - 3)"), Err(EvalError::DivisionByZero));
        assert_eq!(render("0 / 0"), "-");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1234.0), "1,234");
        assert_eq!(format_number(12.5), "12.50");
        assert_eq!(format_number(1234567.891), "1,234,567.89");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(-1500.0), "-1,500");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.001), "0.00");
        assert_eq!(format_number(f64::INFINITY), "-");
    }

    #[test]
    fn literal_escape_strips_markers() {
        assert_eq!(render("!N/A "), "N/A");
        assert_eq!(render("N/A"), "-");
    }

    #[test]
    fn substitution_strips_thousands_separators() {
        let t = table(&[("Overall", "Wins", "1,200"), ("Overall", "Losses", "300")]);
        let spec = RowSpec::new("^Overall.Wins$ / (^Overall.Wins$ + ^Overall.Losses$)", "Win Rate");
        assert_eq!(
            substitute(&spec.formula, &t).unwrap(),
            "1200 / (1200 + 300)"
        );
        assert_eq!(evaluate_row(&spec, &t), "0.80");
    }

    #[test]
    fn field_names_with_slashes_and_spaces() {
        let t = table(&[("Overall", "Final K/D", "2.5")]);
        assert_eq!(get_stat(&t, "Overall.Final K/D"), Some("2.5"));
        assert_eq!(evaluate_row(&RowSpec::new("^Overall.Final K/D$", "FKDR"), &t), "2.50");
    }

    #[test]
    fn missing_stat_renders_sentinel() {
        let t = table(&[("Solo", "Wins", "3")]);
        assert_eq!(evaluate_row(&RowSpec::new("^Doubles.Wins$", "Doubles"), &t), "-");
    }

    #[test]
    fn row_spec_shorthand() {
        let spec = RowSpec::parse("^Solo.Wins$ #Solo Wins").unwrap();
        assert_eq!(spec.formula, "^Solo.Wins$");
        assert_eq!(spec.label, "Solo Wins");
        assert!(RowSpec::parse("no label").is_none());
    }
}
