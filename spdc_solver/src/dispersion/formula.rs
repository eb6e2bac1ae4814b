//! A small expression language for user supplied dispersion formulas.
//!
//! A formula text holds one definition per line
//!
//! ```text
//! # BBO, Eimerl et al.
//! no = sqrt(2.7405 + 0.0184 / (lambda^2 - 0.0179) - 0.0155 * lambda^2)
//! ne = sqrt(2.3730 + 0.0128 / (lambda^2 - 0.0156) - 0.0044 * lambda^2)
//! ```
//!
//! where `lambda` (or `l`) is the vacuum wavelength in µm, `T` the temperature in
//! kelvin and `T_c` the temperature in celsius. Each expression evaluates to the
//! refractive index itself.
//!
//! Expressions are parsed into an arena of nodes, so evaluation is a walk over a
//! flat `Vec` with no allocation. Nesting is capped at [`MAX_NESTING`] levels,
//! which bounds the recursion of both the parser and the evaluator.
//!
//! Error columns count characters, not bytes.

use crate::error::FormulaError;

/// Deepest nesting of parentheses, unary operators or operations accepted
pub const MAX_NESTING: usize = 256;

/// Index of a node within an [`Expression`]'s arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    /// Vacuum wavelength in µm
    Wavelength,
    /// Temperature in kelvin
    Temperature,
    /// Temperature in celsius
    TemperatureCelsius,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sqrt,
    Exp,
    Ln,
    Log10,
    Abs,
    Sin,
    Cos,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sqrt" => Some(Function::Sqrt),
            "exp" => Some(Function::Exp),
            "ln" => Some(Function::Ln),
            "log10" => Some(Function::Log10),
            "abs" => Some(Function::Abs),
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            _ => None,
        }
    }

    #[inline]
    fn apply(self, x: f64) -> f64 {
        match self {
            Function::Sqrt => x.sqrt(),
            Function::Exp => x.exp(),
            Function::Ln => x.ln(),
            Function::Log10 => x.log10(),
            Function::Abs => x.abs(),
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node {
    Constant(f64),
    Variable(Variable),
    Negate(NodeId),
    Binary(BinaryOp, NodeId, NodeId),
    /// `base ^ n` for an integer literal exponent
    PowInt(NodeId, i32),
    Call(Function, NodeId),
}

/// A parsed expression in `lambda` and `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Expression {
    /// Parse a single expression, reporting errors as if it were found at `line`.
    ///
    /// # Errors
    ///
    /// Returns a [`FormulaError`] naming the offending token if the text is not a
    /// well formed expression.
    pub fn parse(text: &str, line: usize) -> Result<Self, FormulaError> {
        let tokens = tokenize(text, line, 0)?;
        let mut parser = Parser::new(&tokens, line, text.chars().count());
        let root = parser.expression()?;
        parser.expect_end()?;
        Ok(Expression {
            nodes: parser.nodes,
            root,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Evaluate at wavelength `lambda_um` (µm) and temperature `temperature` (K).
    #[inline]
    #[must_use]
    pub fn evaluate(&self, lambda_um: f64, temperature: f64) -> f64 {
        self.evaluate_node(self.root, lambda_um, temperature)
    }

    fn evaluate_node(&self, id: NodeId, lambda_um: f64, temperature: f64) -> f64 {
        match self.nodes[id.0 as usize] {
            Node::Constant(c) => c,
            Node::Variable(Variable::Wavelength) => lambda_um,
            Node::Variable(Variable::Temperature) => temperature,
            Node::Variable(Variable::TemperatureCelsius) => {
                crate::units::kelvin_to_celsius(temperature)
            }
            Node::Negate(a) => -self.evaluate_node(a, lambda_um, temperature),
            Node::PowInt(a, n) => self.evaluate_node(a, lambda_um, temperature).powi(n),
            Node::Call(f, a) => f.apply(self.evaluate_node(a, lambda_um, temperature)),
            Node::Binary(op, a, b) => {
                let a = self.evaluate_node(a, lambda_um, temperature);
                let b = self.evaluate_node(b, lambda_um, temperature);
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Pow => a.powf(b),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Equals,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    text: String,
    /// 1-based column of the first character
    column: usize,
}

fn tokenize(text: &str, line: usize, column_offset: usize) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let chars = text.char_indices().collect::<Vec<_>>();
    let mut i = 0;
    while i < chars.len() {
        let (start, c) = chars[i];
        let column = column_offset + i + 1;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let single = match c {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '^' => Some(TokenKind::Caret),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '=' => Some(TokenKind::Equals),
            _ => None,
        };
        if let Some(kind) = single {
            tokens.push(Token {
                kind,
                text: c.to_string(),
                column,
            });
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let mut j = i;
            while j < chars.len() && (chars[j].1.is_ascii_digit() || chars[j].1 == '.') {
                j += 1;
            }
            // Exponent, only if followed by digits
            if j < chars.len() && matches!(chars[j].1, 'e' | 'E') {
                let mut k = j + 1;
                if k < chars.len() && matches!(chars[k].1, '+' | '-') {
                    k += 1;
                }
                if k < chars.len() && chars[k].1.is_ascii_digit() {
                    while k < chars.len() && chars[k].1.is_ascii_digit() {
                        k += 1;
                    }
                    j = k;
                }
            }
            let end = chars.get(j).map_or(text.len(), |(idx, _)| *idx);
            let literal = &text[start..end];
            let value = literal.parse::<f64>().map_err(|_| {
                FormulaError::new(line, column, literal, "malformed number")
            })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                text: literal.to_owned(),
                column,
            });
            i = j;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let mut j = i;
            while j < chars.len() && (chars[j].1.is_alphanumeric() || chars[j].1 == '_') {
                j += 1;
            }
            let end = chars.get(j).map_or(text.len(), |(idx, _)| *idx);
            let ident = &text[start..end];
            tokens.push(Token {
                kind: TokenKind::Ident(ident.to_owned()),
                text: ident.to_owned(),
                column,
            });
            i = j;
            continue;
        }

        return Err(FormulaError::new(
            line,
            column,
            &c.to_string(),
            "unexpected character",
        ));
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    line: usize,
    /// Column reported for errors at the end of input
    end_column: usize,
    /// Current recursion depth of [`Parser::unary`]
    depth: usize,
    nodes: Vec<Node>,
    /// Height of the subtree rooted at each node
    heights: Vec<usize>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], line: usize, text_chars: usize) -> Self {
        Parser {
            tokens,
            position: 0,
            line,
            end_column: text_chars + 1,
            depth: 0,
            nodes: Vec::new(),
            heights: Vec::new(),
        }
    }

    fn push(&mut self, node: Node) -> Result<NodeId, FormulaError> {
        let height = |id: NodeId| self.heights[id.0 as usize];
        let node_height = 1 + match node {
            Node::Constant(_) | Node::Variable(_) => 0,
            Node::Negate(a) | Node::PowInt(a, _) | Node::Call(_, a) => height(a),
            Node::Binary(_, a, b) => height(a).max(height(b)),
        };
        if node_height > MAX_NESTING {
            return Err(self.error_here("expression nested too deeply"));
        }
        #[allow(clippy::cast_possible_truncation)]
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.heights.push(node_height);
        Ok(id)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.position)
    }

    fn error_here(&self, message: &str) -> FormulaError {
        match self.peek() {
            Some(token) => FormulaError::new(self.line, token.column, &token.text, message),
            None => FormulaError::new(self.line, self.end_column, "", message),
        }
    }

    fn expect_end(&self) -> Result<(), FormulaError> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.error_here("unexpected trailing input")),
        }
    }

    fn expression(&mut self) -> Result<NodeId, FormulaError> {
        let mut lhs = self.term()?;
        while let Some(token) = self.peek() {
            let op = match token.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.position += 1;
            let rhs = self.term()?;
            lhs = self.push(Node::Binary(op, lhs, rhs))?;
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<NodeId, FormulaError> {
        let mut lhs = self.unary()?;
        while let Some(token) = self.peek() {
            let op = match token.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.position += 1;
            let rhs = self.unary()?;
            lhs = self.push(Node::Binary(op, lhs, rhs))?;
        }
        Ok(lhs)
    }

    /// Every recursive path of the grammar passes through here, so this is
    /// where the nesting depth is counted.
    fn unary(&mut self) -> Result<NodeId, FormulaError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here("expression nested too deeply"));
        }
        self.depth += 1;
        let result = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Minus) => {
                self.position += 1;
                self.unary()
                    .and_then(|inner| self.push(Node::Negate(inner)))
            }
            Some(TokenKind::Plus) => {
                self.position += 1;
                self.unary()
            }
            _ => self.power(),
        };
        self.depth -= 1;
        result
    }

    fn power(&mut self) -> Result<NodeId, FormulaError> {
        let base = self.atom()?;
        if !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Caret)) {
            return Ok(base);
        }
        self.position += 1;
        let exponent = self.unary()?;
        if let Node::Constant(c) = self.nodes[exponent.0 as usize] {
            if c.fract() == 0.0 && c.abs() <= 64.0 {
                #[allow(clippy::cast_possible_truncation)]
                return self.push(Node::PowInt(base, c as i32));
            }
        }
        self.push(Node::Binary(BinaryOp::Pow, base, exponent))
    }

    fn atom(&mut self) -> Result<NodeId, FormulaError> {
        let Some(token) = self.peek() else {
            return Err(self.error_here("unexpected end of expression"));
        };
        match &token.kind {
            TokenKind::Number(value) => {
                self.position += 1;
                self.push(Node::Constant(*value))
            }
            TokenKind::LParen => {
                self.position += 1;
                let inner = self.expression()?;
                self.expect_close_paren()?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                let variable = match name.as_str() {
                    "lambda" | "l" => Some(Variable::Wavelength),
                    "T" => Some(Variable::Temperature),
                    "T_c" => Some(Variable::TemperatureCelsius),
                    _ => None,
                };
                if let Some(variable) = variable {
                    self.position += 1;
                    return self.push(Node::Variable(variable));
                }
                let Some(function) = Function::from_name(name) else {
                    return Err(self.error_here("unknown identifier"));
                };
                self.position += 1;
                if !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
                    return Err(self.error_here("expected `(` after function name"));
                }
                self.position += 1;
                let argument = self.expression()?;
                self.expect_close_paren()?;
                self.push(Node::Call(function, argument))
            }
            _ => Err(self.error_here("unexpected token")),
        }
    }

    fn expect_close_paren(&mut self) -> Result<(), FormulaError> {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
            self.position += 1;
            Ok(())
        } else {
            Err(self.error_here("expected `)`"))
        }
    }
}

/// Wavelength (µm) and temperature (K) at which a freshly parsed formula is checked.
const REFERENCE_POINT: (f64, f64) = (0.8, 293.15);

/// An ordinary/extraordinary index pair given as formula text.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomFormula {
    no: Expression,
    ne: Expression,
    no_text: String,
    ne_text: String,
}

struct Definition {
    expression: Expression,
    text: String,
    line: usize,
    column: usize,
}

impl CustomFormula {
    /// Parse a formula text of `no = ...` and `ne = ...` lines.
    ///
    /// `#` starts a comment. Both indices must be defined exactly once, and each
    /// must evaluate to a finite, positive index at 0.8 µm and 20 °C.
    ///
    /// # Errors
    ///
    /// Returns a [`FormulaError`] for the first malformed line.
    pub fn parse(text: &str) -> Result<Self, FormulaError> {
        let mut no: Option<Definition> = None;
        let mut ne: Option<Definition> = None;
        let mut last_line = 1;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            last_line = line;
            let content = raw.split('#').next().unwrap_or_default();
            if content.trim().is_empty() {
                continue;
            }
            let tokens = tokenize(content, line, 0)?;
            let (name, equals) = match tokens.as_slice() {
                [Token {
                    kind: TokenKind::Ident(name),
                    ..
                }, Token {
                    kind: TokenKind::Equals,
                    column,
                    ..
                }, ..] => (name.clone(), *column),
                [first, ..] => {
                    return Err(FormulaError::new(
                        line,
                        first.column,
                        &first.text,
                        "expected `no = ...` or `ne = ...`",
                    ))
                }
                [] => continue,
            };
            let slot = match name.as_str() {
                "no" => &mut no,
                "ne" => &mut ne,
                _ => {
                    return Err(FormulaError::new(
                        line,
                        tokens[0].column,
                        &name,
                        "unknown index, expected `no` or `ne`",
                    ))
                }
            };
            if slot.is_some() {
                return Err(FormulaError::new(
                    line,
                    tokens[0].column,
                    &name,
                    "index defined more than once",
                ));
            }
            // `equals` is the column of `=`, so the body starts after that many characters
            let body = content.chars().skip(equals).collect::<String>();
            let expression = parse_offset(&body, line, equals)?;
            *slot = Some(Definition {
                expression,
                text: body.trim().to_owned(),
                line,
                column: equals + 1,
            });
        }

        let missing = |name: &str| {
            FormulaError::new(last_line, 1, "", format!("missing definition for `{name}`"))
        };
        let no = no.ok_or_else(|| missing("no"))?;
        let ne = ne.ok_or_else(|| missing("ne"))?;
        Self::from_definitions(no, ne)
    }

    /// Build a formula from the two expression bodies directly.
    ///
    /// # Errors
    ///
    /// Returns a [`FormulaError`] if either expression is malformed, reported as
    /// line 1 for `no` and line 2 for `ne`.
    pub fn from_expressions(no: &str, ne: &str) -> Result<Self, FormulaError> {
        let no = Definition {
            expression: Expression::parse(no, 1)?,
            text: no.trim().to_owned(),
            line: 1,
            column: 1,
        };
        let ne = Definition {
            expression: Expression::parse(ne, 2)?,
            text: ne.trim().to_owned(),
            line: 2,
            column: 1,
        };
        Self::from_definitions(no, ne)
    }

    fn from_definitions(no: Definition, ne: Definition) -> Result<Self, FormulaError> {
        for definition in [&no, &ne] {
            let value = definition.expression.evaluate(REFERENCE_POINT.0, REFERENCE_POINT.1);
            if !(value.is_finite() && value > 0.0) {
                return Err(FormulaError::new(
                    definition.line,
                    definition.column,
                    &definition.text,
                    format!(
                        "expression evaluates to {value} at {} µm, {} K",
                        REFERENCE_POINT.0, REFERENCE_POINT.1
                    ),
                ));
            }
        }
        Ok(CustomFormula {
            no: no.expression,
            ne: ne.expression,
            no_text: no.text,
            ne_text: ne.text,
        })
    }

    #[must_use]
    pub fn no_text(&self) -> &str {
        &self.no_text
    }

    #[must_use]
    pub fn ne_text(&self) -> &str {
        &self.ne_text
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        format!("no = {}\nne = {}\n", self.no_text, self.ne_text)
    }

    /// Ordinary and extraordinary index at `lambda_um` (µm) and `temperature` (K)
    #[inline]
    #[must_use]
    pub fn indices(&self, lambda_um: f64, temperature: f64) -> (f64, f64) {
        (
            self.no.evaluate(lambda_um, temperature),
            self.ne.evaluate(lambda_um, temperature),
        )
    }
}

/// Parse the right hand side of a definition, keeping columns relative to the line.
fn parse_offset(body: &str, line: usize, offset: usize) -> Result<Expression, FormulaError> {
    let tokens = tokenize(body, line, offset)?;
    let mut parser = Parser::new(&tokens, line, offset + body.chars().count());
    let root = parser.expression()?;
    parser.expect_end()?;
    Ok(Expression {
        nodes: parser.nodes,
        root,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const BBO_TEXT: &str = "# BBO, Eimerl et al.
no = sqrt(2.7405 + 0.0184 / (lambda^2 - 0.0179) - 0.0155 * lambda^2)
ne = sqrt(2.3730 + 0.0128 / (l^2 - 0.0156) - 0.0044 * l^2)
";

    #[test]
    fn test_precedence() {
        let e = Expression::parse("1 + 2 * 3 ^ 2 - -4 / 2", 1).unwrap();
        assert_relative_eq!(e.evaluate(0.0, 0.0), 1.0 + 18.0 + 2.0);

        let e = Expression::parse("-2^2", 1).unwrap();
        assert_relative_eq!(e.evaluate(0.0, 0.0), -4.0);

        let e = Expression::parse("2^3^2", 1).unwrap();
        assert_relative_eq!(e.evaluate(0.0, 0.0), 512.0);

        let e = Expression::parse("2 ^ -1 + 1.5e-1 + 2E1", 1).unwrap();
        assert_relative_eq!(e.evaluate(0.0, 0.0), 0.5 + 0.15 + 20.0);
    }

    #[test]
    fn test_variables_and_functions() {
        let e = Expression::parse("sqrt(lambda) * T - T_c + ln(exp(2)) + abs(-1)", 1).unwrap();
        assert_relative_eq!(
            e.evaluate(4.0, 300.0),
            2.0 * 300.0 - (300.0 - 273.15) + 2.0 + 1.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_parse_custom_formula() {
        let formula = CustomFormula::parse(BBO_TEXT).unwrap();
        let (no, ne) = formula.indices(1.55, 293.15);
        assert_relative_eq!(no, 1.646_504_609_411_725, max_relative = 1e-12);
        assert_relative_eq!(ne, 1.538_763_011_062_675_5, max_relative = 1e-12);

        let reparsed = CustomFormula::parse(&formula.to_text()).unwrap();
        assert_eq!(reparsed, formula);
    }

    #[test]
    fn test_unknown_identifier_is_located() {
        let err = CustomFormula::parse("no = 1.5\nne = 1.4 + foo * lambda\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 12);
        assert_eq!(err.token, "foo");
    }

    #[test]
    fn test_malformed_expressions() {
        let err = Expression::parse("1 + (2 * 3", 1).unwrap_err();
        assert_eq!(err.token, "");
        assert_eq!(err.column, 11);

        let err = Expression::parse("1 + * 2", 3).unwrap_err();
        assert_eq!((err.line, err.column, err.token.as_str()), (3, 5, "*"));

        let err = Expression::parse("2 3", 1).unwrap_err();
        assert_eq!(err.token, "3");

        let err = Expression::parse("1.2.3", 1).unwrap_err();
        assert_eq!(err.token, "1.2.3");

        let err = Expression::parse("sqrt 2", 1).unwrap_err();
        assert_eq!(err.token, "2");

        let err = Expression::parse("1 $ 2", 1).unwrap_err();
        assert_eq!(err.token, "$");
    }

    #[test]
    fn test_definition_errors() {
        let err = CustomFormula::parse("no = 1.5\n").unwrap_err();
        assert!(err.message.contains("`ne`"));

        let err = CustomFormula::parse("no = 1.5\nno = 1.6\nne = 1.4").unwrap_err();
        assert_eq!((err.line, err.token.as_str()), (2, "no"));

        let err = CustomFormula::parse("no = 1.5\nnz = 1.4").unwrap_err();
        assert_eq!((err.line, err.token.as_str()), (2, "nz"));

        let err = CustomFormula::parse("1.5\nne = 1.4").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_reference_point_rejects_non_physical_index() {
        let err = CustomFormula::parse("no = sqrt(-lambda)\nne = 1.4").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.token, "sqrt(-lambda)");

        let err = CustomFormula::from_expressions("1.5", "1 / (lambda - 0.8)").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let text = format!("no = {}", "(".repeat(200_000));
        let err = CustomFormula::parse(&text).unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.token, "(");
        // The first `(` sits at column 6
        assert_eq!(err.column, 6 + MAX_NESTING);

        let err = Expression::parse(&format!("1{}", "+1".repeat(100_000)), 1).unwrap_err();
        assert_eq!(err.token, "+");

        let err = Expression::parse(&format!("{}1", "-".repeat(100_000)), 1).unwrap_err();
        assert_eq!(err.token, "-");

        let err = Expression::parse(&format!("2{}", "^2".repeat(100_000)), 1).unwrap_err();
        assert!(err.message.contains("nested"));
    }

    #[test]
    fn test_moderate_nesting_is_accepted() {
        let nested = format!("{}lambda{}", "(".repeat(100), ")".repeat(100));
        let e = Expression::parse(&nested, 1).unwrap();
        assert_relative_eq!(e.evaluate(0.8, 300.0), 0.8);

        let negated = format!("{}1", "-".repeat(100));
        let e = Expression::parse(&negated, 1).unwrap();
        assert_relative_eq!(e.evaluate(0.0, 0.0), 1.0);

        let sum = format!("0{}", " + 1".repeat(200));
        let e = Expression::parse(&sum, 1).unwrap();
        assert_relative_eq!(e.evaluate(0.0, 0.0), 200.0);
    }

    #[test]
    fn test_columns_count_characters() {
        // U+00A0 is whitespace but two bytes long
        let err = Expression::parse("2\u{a0}*\u{a0}foo", 1).unwrap_err();
        assert_eq!((err.column, err.token.as_str()), (5, "foo"));

        let err = Expression::parse("(1\u{a0}+\u{a0}2", 1).unwrap_err();
        assert_eq!((err.column, err.token.as_str()), (7, ""));

        let err = CustomFormula::parse("no = 1.5\nne =\u{a0}\u{a0}1.4 + foo").unwrap_err();
        assert_eq!((err.line, err.column, err.token.as_str()), (2, 13, "foo"));

        let err = CustomFormula::parse("no = 1.5 # µm\nne = µ + 1").unwrap_err();
        assert_eq!((err.line, err.column, err.token.as_str()), (2, 6, "µ"));
    }
}
