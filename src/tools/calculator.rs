use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Tool, ToolError};

/// Evaluates a basic arithmetic expression (`+ - * /`, parentheses).
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &'static str {
        "calculate"
    }

    fn description(&self) -> &'static str {
        "Evaluate an arithmetic expression, e.g. \"(3 + 4) * 2\"."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The expression to evaluate",
                },
            },
            "required": ["expression"],
        })
    }

    async fn invoke(&self, args: &Value) -> Result<String, ToolError> {
        let expression = args
            .get("expression")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("expression missing".to_string()))?;

        let value = evaluate(expression).map_err(ToolError::Failed)?;
        Ok(format_number(value))
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn evaluate(input: &str) -> Result<f64, String> {
    let tokens: Vec<char> = input.chars().filter(|c| !c.is_whitespace()).collect();
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("unexpected character at position {}", parser.pos));
    }
    if !value.is_finite() {
        return Err("expression did not evaluate to a finite number".to_string());
    }
    Ok(value)
}

struct Parser {
    tokens: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.tokens.get(self.pos).copied()
    }

    fn expression(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            if op == '+' {
                value += rhs;
            } else {
                value -= rhs;
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == '*' {
                value *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err("division by zero".to_string());
                }
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some('(') => {
                self.pos += 1;
                let value = self.expression()?;
                if self.peek() != Some(')') {
                    return Err("missing closing parenthesis".to_string());
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(format!("unexpected character '{}'", c)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let literal: String = self.tokens[start..self.pos].iter().collect();
        literal
            .parse()
            .map_err(|_| format!("invalid number '{}'", literal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn evaluates_precedence_and_parens() {
        let tool = CalculatorTool;
        let result = tool
            .invoke(&json!({"expression": "(3 + 4) * 2 - 6 / 3"}))
            .await
            .unwrap();
        assert_eq!(result, "12");
    }

    #[tokio::test]
    async fn handles_unary_minus_and_decimals() {
        let tool = CalculatorTool;
        let result = tool.invoke(&json!({"expression": "-1.5 + 2"})).await.unwrap();
        assert_eq!(result, "0.5");
    }

    #[tokio::test]
    async fn rejects_division_by_zero() {
        let tool = CalculatorTool;
        let err = tool.invoke(&json!({"expression": "1 / 0"})).await.unwrap_err();
        assert!(err.to_string().contains("division by zero"));
    }

    #[tokio::test]
    async fn rejects_missing_expression() {
        let tool = CalculatorTool;
        assert!(matches!(
            tool.invoke(&json!({})).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn rejects_trailing_garbage() {
        let tool = CalculatorTool;
        assert!(tool.invoke(&json!({"expression": "2 + 2 extra"})).await.is_err());
    }
}
