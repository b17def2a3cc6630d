//! Recursive descent checker
//!
//! Walks the token stream with the usual precedence ladder and records
//! diagnostics as it goes. No tree is built. Recoverable problems are pushed
//! and parsing continues; anything else ends the walk with an
//! [`ExpressionError`].

use super::functions;
use super::lexer::{tokenize, Token, TokenKind};
use super::{ExpressionContext, ExpressionError};
use crate::validation::references::{
    resolve_node_reference, split_node_reference, strip_bracket_suffix, NodeReferenceError,
};

/// Recognized `sim.` variables
pub const SIM_VARIABLES: [&str; 5] = ["sim.year", "sim.month", "sim.day", "sim.day_of_year", "sim.step"];

pub const DIVISION_BY_ZERO: &str = "Warning: Division by zero constant";

/// Deepest nesting of parentheses, unary operators and calls that is walked
pub const MAX_NESTING: usize = 64;

/// Check a full expression, returning every diagnostic found
pub fn check(expression: &str, context: &ExpressionContext<'_>) -> Vec<String> {
    let tokens = match tokenize(expression) {
        Ok(tokens) => tokens,
        Err(err) => return vec![err.to_string()],
    };

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        context: *context,
        diagnostics: Vec::new(),
    };

    match parser.parse_expression() {
        Ok(()) => {
            let rest = parser.peek();
            if rest.kind != TokenKind::Eof {
                parser.diagnostics.push(format!(
                    "Unexpected tokens after expression: '{}'",
                    rest.text
                ));
            }
        }
        Err(err) => parser.diagnostics.push(err.to_string()),
    }

    parser.diagnostics
}

struct Parser<'t, 'c> {
    tokens: Vec<Token<'t>>,
    pos: usize,
    depth: usize,
    context: ExpressionContext<'c>,
    diagnostics: Vec<String>,
}

impl<'t> Parser<'t, '_> {
    fn peek(&self) -> Token<'t> {
        self.tokens[self.pos]
    }

    fn peek_next(&self) -> Option<Token<'t>> {
        self.tokens.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Current token text if it is one of `ops`
    fn operator(&self, ops: &[&str]) -> Option<&'t str> {
        let token = self.peek();
        (token.kind == TokenKind::Operator && ops.contains(&token.text)).then_some(token.text)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ExpressionError> {
        let token = self.peek();
        if token.kind != kind {
            return Err(ExpressionError::UnexpectedToken {
                expected: kind,
                found: token.kind,
                text: token.text.to_string(),
            });
        }
        self.advance();
        Ok(())
    }

    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING`]
    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<(), ExpressionError>,
    ) -> Result<(), ExpressionError> {
        if self.depth >= MAX_NESTING {
            return Err(ExpressionError::NestingTooDeep { limit: MAX_NESTING });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Whether the tokens at the cursor spell a literal zero, allowing a
    /// sign and one pair of parentheses around it
    fn divisor_is_zero(&self) -> bool {
        let mut idx = self.pos;
        let at = |idx: usize| self.tokens.get(idx).copied();
        let is_sign = |token: Option<Token<'_>>| {
            token.is_some_and(|t| t.kind == TokenKind::Operator && (t.text == "-" || t.text == "+"))
        };

        while is_sign(at(idx)) {
            idx += 1;
        }
        let parenthesized = at(idx).is_some_and(|t| t.kind == TokenKind::LParen);
        if parenthesized {
            idx += 1;
            while is_sign(at(idx)) {
                idx += 1;
            }
        }

        let zero = at(idx).is_some_and(|t| {
            t.kind == TokenKind::Number && t.text.parse::<f64>().is_ok_and(|v| v == 0.0)
        });
        zero && (!parenthesized || at(idx + 1).is_some_and(|t| t.kind == TokenKind::RParen))
    }

    fn parse_expression(&mut self) -> Result<(), ExpressionError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<(), ExpressionError> {
        self.parse_and()?;
        while let Some(op) = self.operator(&["|", "||"]) {
            if op == "||" {
                self.diagnostics
                    .push("Invalid operator '||' - use '|' for logical OR".to_string());
            }
            self.advance();
            self.parse_and()?;
        }
        Ok(())
    }

    fn parse_and(&mut self) -> Result<(), ExpressionError> {
        self.parse_comparison()?;
        while let Some(op) = self.operator(&["&", "&&"]) {
            if op == "&&" {
                self.diagnostics
                    .push("Invalid operator '&&' - use '&' for logical AND".to_string());
            }
            self.advance();
            self.parse_comparison()?;
        }
        Ok(())
    }

    fn parse_comparison(&mut self) -> Result<(), ExpressionError> {
        self.parse_additive()?;
        while let Some(op) = self.operator(&["==", "!=", "<", "<=", ">", ">=", "="]) {
            if op == "=" {
                self.diagnostics
                    .push("Invalid operator '=' - use '==' for equality comparison".to_string());
            }
            self.advance();
            self.parse_additive()?;
        }
        Ok(())
    }

    fn parse_additive(&mut self) -> Result<(), ExpressionError> {
        self.parse_multiplicative()?;
        while self.operator(&["+", "-"]).is_some() {
            self.advance();
            self.parse_multiplicative()?;
        }
        Ok(())
    }

    fn parse_multiplicative(&mut self) -> Result<(), ExpressionError> {
        self.parse_power()?;
        while let Some(op) = self.operator(&["*", "/", "%"]) {
            self.advance();

            if op == "/" && self.divisor_is_zero() {
                self.diagnostics.push(DIVISION_BY_ZERO.to_string());
            }

            self.parse_power()?;
        }
        Ok(())
    }

    fn parse_power(&mut self) -> Result<(), ExpressionError> {
        self.parse_unary()?;
        while self.operator(&["^", "**"]).is_some() {
            self.advance();
            self.parse_unary()?;
        }
        Ok(())
    }

    fn parse_unary(&mut self) -> Result<(), ExpressionError> {
        if self.operator(&["+", "-", "!"]).is_some() {
            self.advance();
            return self.nested(Self::parse_unary);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<(), ExpressionError> {
        let token = self.peek();
        let diagnostic = match token.kind {
            TokenKind::Number => None,
            TokenKind::DataRef => check_dotted_reference("data", "data", token.text),
            TokenKind::ConstRef => check_dotted_reference("constant", "c", token.text),
            TokenKind::NodeRef => check_node_reference(token.text, &self.context),
            TokenKind::ThisRef => check_this_reference(token.text, &self.context),
            TokenKind::SimRef => check_sim_reference(token.text),
            TokenKind::Ident => {
                if self.peek_next().is_some_and(|t| t.kind == TokenKind::LParen) {
                    return self.nested(Self::parse_function_call);
                }
                // Named variable
                None
            }
            TokenKind::LParen => {
                self.advance();
                self.nested(Self::parse_expression)?;
                return self.expect(TokenKind::RParen);
            }
            found => return Err(ExpressionError::ExpectedPrimary { found }),
        };

        self.diagnostics.extend(diagnostic);
        self.advance();
        Ok(())
    }

    fn parse_function_call(&mut self) -> Result<(), ExpressionError> {
        let name = self.peek().text.to_lowercase();
        let arity = functions::lookup(&name);
        if arity.is_none() {
            self.diagnostics
                .push(functions::unknown_function_message(&name));
        }

        self.advance();
        self.expect(TokenKind::LParen)?;

        let mut args = 0;
        if self.peek().kind != TokenKind::RParen {
            self.parse_expression()?;
            args += 1;
            while self.peek().kind == TokenKind::Comma {
                self.advance();
                self.parse_expression()?;
                args += 1;
            }
        }
        self.expect(TokenKind::RParen)?;

        if let Some(message) = arity.and_then(|a| a.check(&name, args)) {
            self.diagnostics.push(message);
        }
        Ok(())
    }
}

/// Shape check for `data.` and `c.` style references
///
/// At most one diagnostic is produced per reference.
pub fn check_dotted_reference(label: &str, prefix: &str, reference: &str) -> Option<String> {
    let body = strip_bracket_suffix(reference);
    let after_prefix = body.strip_prefix(prefix).unwrap_or(body);

    if after_prefix.is_empty() || after_prefix == "." {
        return Some(format!("Incomplete {} reference: '{}'", label, reference));
    }
    if body.contains("..") {
        return Some(format!(
            "Malformed {} reference: '{}' (consecutive dots)",
            label, reference
        ));
    }
    if body.ends_with('.') {
        return Some(format!(
            "Malformed {} reference: '{}' (trailing dot)",
            label, reference
        ));
    }
    None
}

pub fn check_node_reference(reference: &str, context: &ExpressionContext<'_>) -> Option<String> {
    if let Some(message) = check_dotted_reference("node", "node", reference) {
        return Some(message);
    }

    match (context.model(), context.schema()) {
        (Some(model), Some(schema)) => resolve_node_reference(reference, model, schema)
            .err()
            .map(|err| err.to_string()),
        _ => split_node_reference(strip_bracket_suffix(reference))
            .is_none()
            .then(|| NodeReferenceError::Malformed(reference.to_string()).to_string()),
    }
}

pub fn check_sim_reference(reference: &str) -> Option<String> {
    if SIM_VARIABLES.contains(&reference) {
        return None;
    }
    Some(format!(
        "Unknown sim variable: '{}'. Valid options are: {}",
        reference,
        SIM_VARIABLES.join(", ")
    ))
}

/// `this.<output>` needs a current node, and the output must be allowed for
/// that node's type when the schema lists outputs
pub fn check_this_reference(reference: &str, context: &ExpressionContext<'_>) -> Option<String> {
    let body = strip_bracket_suffix(reference);
    let output = body.strip_prefix("this.").unwrap_or("");
    if output.is_empty() {
        return Some(format!("Incomplete this reference: '{}'", reference));
    }

    let Some(node) = context.current_node() else {
        return Some(format!(
            "Cannot use 'this' reference outside of node context: '{}'",
            reference
        ));
    };

    let node_type = node.node_type()?;
    let def = context.schema()?.node_type(node_type)?;
    if def.allowed_outputs.is_empty() || def.allows_output(output) {
        return None;
    }

    Some(
        NodeReferenceError::OutputNotAllowed {
            output: output.to_string(),
            node_type: node_type.to_string(),
            allowed: def.allowed_outputs.join(", "),
        }
        .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_plain(expression: &str) -> Vec<String> {
        check(expression, &ExpressionContext::empty())
    }

    #[test]
    fn test_valid_expressions() {
        for expr in [
            "1 + 2 * 3",
            "-(data.rain - 1) ^ 2",
            "a | b & !c",
            "x ** 2 % 3 >= 1",
            "max(data.a, data.b, 0) / 2",
            "if(sim.month == 1, c.high, c.low)",
            "ABS(-3)",
        ] {
            assert!(check_plain(expr).is_empty(), "{} should be valid", expr);
        }
    }

    #[test]
    fn test_c_style_operators() {
        assert_eq!(
            check_plain("x || y"),
            vec!["Invalid operator '||' - use '|' for logical OR"]
        );
        assert_eq!(
            check_plain("x && y & z"),
            vec!["Invalid operator '&&' - use '&' for logical AND"]
        );
        assert_eq!(
            check_plain("a = b"),
            vec!["Invalid operator '=' - use '==' for equality comparison"]
        );
    }

    #[test]
    fn test_recoverable_diagnostics_accumulate() {
        let diagnostics = check_plain("maximum(1) = data.");
        assert_eq!(
            diagnostics,
            vec![
                "Unknown function: 'maximum' (did you mean 'max'?)",
                "Invalid operator '=' - use '==' for equality comparison",
                "Incomplete data reference: 'data.'",
            ]
        );
    }

    #[test]
    fn test_division_by_zero_literal() {
        assert_eq!(check_plain("x / 0"), vec![DIVISION_BY_ZERO]);
        assert_eq!(check_plain("x / 0.0"), vec![DIVISION_BY_ZERO]);
        assert!(check_plain("x / 0.5").is_empty());
        assert!(check_plain("x * 0").is_empty());
    }

    #[test]
    fn test_division_by_signed_or_parenthesized_zero() {
        assert_eq!(check_plain("x / -0"), vec![DIVISION_BY_ZERO]);
        assert_eq!(check_plain("x / (0)"), vec![DIVISION_BY_ZERO]);
        assert_eq!(check_plain("x / (-0.0)"), vec![DIVISION_BY_ZERO]);
        assert!(check_plain("x / (0 + y)").is_empty());
        assert!(check_plain("x / -2").is_empty());
    }

    #[test]
    fn test_deep_nesting_is_one_error() {
        let depth = 10_000;
        let expression = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(
            check_plain(&expression),
            vec![format!("Expression nests deeper than {} levels", MAX_NESTING)]
        );

        let unary = format!("{}1", "-".repeat(depth));
        assert_eq!(check_plain(&unary).len(), 1);

        let calls = format!("{}1{}", "abs(".repeat(depth), ")".repeat(depth));
        assert_eq!(check_plain(&calls).len(), 1);
    }

    #[test]
    fn test_nesting_below_limit_is_fine() {
        let depth = MAX_NESTING - 1;
        let expression = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert!(check_plain(&expression).is_empty());
    }

    #[test]
    fn test_missing_primary_aborts() {
        assert_eq!(
            check_plain("1 +"),
            vec!["Expected number, data reference, constant reference, node reference, this reference, sim reference, function, or '(' but got EOF"]
        );
    }

    #[test]
    fn test_unclosed_paren() {
        assert_eq!(
            check_plain("(1 + 2"),
            vec!["Expected RPAREN but got EOF ('')"]
        );
    }

    #[test]
    fn test_trailing_tokens() {
        assert_eq!(
            check_plain("1 2"),
            vec!["Unexpected tokens after expression: '2'"]
        );
    }

    #[test]
    fn test_dotted_reference_checks() {
        assert_eq!(
            check_dotted_reference("data", "data", "data..evap"),
            Some("Malformed data reference: 'data..evap' (consecutive dots)".to_string())
        );
        assert_eq!(
            check_dotted_reference("constant", "c", "c.k."),
            Some("Malformed constant reference: 'c.k.' (trailing dot)".to_string())
        );
        assert_eq!(
            check_dotted_reference("data", "data", "data.[0]"),
            Some("Incomplete data reference: 'data.[0]'".to_string())
        );
        assert_eq!(check_dotted_reference("data", "data", "data.a.b[3]"), None);
    }

    #[test]
    fn test_sim_reference() {
        assert!(check_sim_reference("sim.day_of_year").is_none());
        assert_eq!(
            check_sim_reference("sim.hour").unwrap(),
            "Unknown sim variable: 'sim.hour'. Valid options are: sim.year, sim.month, sim.day, sim.day_of_year, sim.step"
        );
    }

    #[test]
    fn test_node_reference_without_context() {
        assert!(check_plain("node.dam.dsflow * 2").is_empty());
        assert_eq!(
            check_plain("node.dam + 1"),
            vec!["Malformed node reference: 'node.dam'"]
        );
    }

    #[test]
    fn test_this_reference_needs_node() {
        assert_eq!(
            check_plain("this.dsflow + 1"),
            vec!["Cannot use 'this' reference outside of node context: 'this.dsflow'"]
        );
    }
}
