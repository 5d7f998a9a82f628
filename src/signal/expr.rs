//! Text form of signal composition.
//!
//! ```text
//! expr   := path ( "." method "(" [ arg ( "," arg )* ] ")" )*
//! path   := ident ( "." ident )*
//! arg    := number | expr
//! ```
//!
//! The path is resolved against a [`Catalog`], e.g.
//! `adaptivedemux.position.deadline.diff(adaptivedemux.position.position)`.

use crate::catalog::Catalog;
use crate::error::SignalError;
use crate::signal::Signal;

/// Parse and resolve one signal expression
pub fn parse_signal(expr: &str, catalog: &Catalog) -> Result<Signal, SignalError> {
    let mut parser = Parser {
        text: expr,
        pos: 0,
        catalog,
    };
    let signal = parser.signal()?;
    parser.skip_ws();
    if parser.pos < expr.len() {
        return Err(parser.syntax("unexpected trailing input"));
    }
    Ok(signal)
}

enum Arg {
    Number(f64),
    Signal(Signal),
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    catalog: &'a Catalog,
}

impl<'a> Parser<'a> {
    fn signal(&mut self) -> Result<Signal, SignalError> {
        let mut path = vec![self.ident()?];
        let mut method = None;

        while self.eat('.') {
            let name = self.ident()?;
            if self.peek() == Some('(') {
                method = Some(name);
                break;
            }
            path.push(name);
        }

        let path = path.join(".");
        let mut signal = self.catalog.resolve(&path)?;

        while let Some(name) = method.take() {
            let args = self.args()?;
            signal = apply(signal, name, args)?;
            if self.eat('.') {
                method = Some(self.ident()?);
                if self.peek() != Some('(') {
                    return Err(self.syntax("expected '(' after transform name"));
                }
            }
        }
        Ok(signal)
    }

    fn args(&mut self) -> Result<Vec<Arg>, SignalError> {
        self.expect('(')?;
        let mut args = Vec::new();
        self.skip_ws();
        if self.eat(')') {
            return Ok(args);
        }
        loop {
            self.skip_ws();
            let arg = match self.peek() {
                Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                    Arg::Number(self.number()?)
                }
                _ => Arg::Signal(self.signal()?),
            };
            args.push(arg);
            self.skip_ws();
            if self.eat(')') {
                return Ok(args);
            }
            self.expect(',')?;
        }
    }

    fn ident(&mut self) -> Result<&'a str, SignalError> {
        self.skip_ws();
        let text = self.text;
        let rest = &text[self.pos..];
        let len = rest
            .char_indices()
            .find(|&(i, c)| {
                let word = c.is_ascii_alphanumeric() || c == '_';
                !word || (i == 0 && c.is_ascii_digit())
            })
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            return Err(self.syntax("expected a name"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn number(&mut self) -> Result<f64, SignalError> {
        let text = self.text;
        let rest = &text[self.pos..];
        let len = rest
            .char_indices()
            .find(|&(i, c)| {
                let sign_ok = (c == '-' || c == '+')
                    && (i == 0 || matches!(rest[..i].chars().last(), Some('e' | 'E')));
                !(c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || sign_ok)
            })
            .map_or(rest.len(), |(i, _)| i);
        let value = rest[..len]
            .parse::<f64>()
            .map_err(|_| self.syntax(format!("invalid number '{}'", &rest[..len])))?;
        self.pos += len;
        Ok(value)
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SignalError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.syntax(format!("expected '{}'", expected)))
        }
    }

    fn skip_ws(&mut self) {
        let rest = &self.text[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn syntax(&self, message: impl Into<String>) -> SignalError {
        SignalError::Syntax {
            expr: self.text.to_string(),
            position: self.pos,
            message: message.into(),
        }
    }
}

fn apply(signal: Signal, name: &str, args: Vec<Arg>) -> Result<Signal, SignalError> {
    let bad = |message: &str| SignalError::BadArguments {
        name: name.to_string(),
        message: message.to_string(),
    };

    let window =
        |w: f64| positive_window(w).ok_or_else(|| bad("window must be a positive integer"));

    let signal = match (name, args.as_slice()) {
        ("average", []) => signal.average(),
        ("running_average", [Arg::Number(w)]) => signal.running_average(window(*w)?),
        ("sliding_average", [Arg::Number(w)]) => signal.sliding_average(window(*w)?, 0.0),
        ("sliding_average", [Arg::Number(w), Arg::Number(margin)]) => {
            let w = window(*w)?;
            if !margin.is_finite() || *margin < 0.0 {
                return Err(bad("margin must be a non-negative number"));
            }
            signal.sliding_average(w, *margin)
        }
        ("derivative" | "derivate_time", []) => signal.derivative(),
        ("rate_over_time" | "diff_time", []) => signal.rate_over_time(),
        ("rate_over_time" | "diff_time", [Arg::Signal(timeline)]) => signal.rate_over(timeline),
        ("inverse_rate" | "wall_diff", []) => signal.inverse_rate(),
        ("cumulative", []) => signal.cumulative(),
        ("diff", [Arg::Signal(other)]) => signal.diff(other),
        (
            "average" | "running_average" | "sliding_average" | "derivative" | "derivate_time"
            | "rate_over_time" | "diff_time" | "inverse_rate" | "wall_diff" | "cumulative"
            | "diff",
            _,
        ) => return Err(bad(usage(name))),
        _ => return Err(SignalError::UnknownTransform(name.to_string())),
    };
    Ok(signal)
}

fn positive_window(w: f64) -> Option<usize> {
    if w >= 1.0 && w.fract() == 0.0 && w <= u32::MAX as f64 {
        Some(w as usize)
    } else {
        None
    }
}

fn usage(name: &str) -> &'static str {
    match name {
        "running_average" => "expected (window)",
        "sliding_average" => "expected (window) or (window, margin)",
        "rate_over_time" | "diff_time" => "expected () or (timeline signal)",
        "diff" => "expected (other signal)",
        _ => "takes no arguments",
    }
}
