use std::cell::RefCell;

use crate::{
    ast::{Block, Expression, InfixOperator, PrefixOperator, Program, Statement},
    tokenizer::{tokens, Token, TokenType},
};

#[derive(Debug)]
pub struct ParseErrors(Vec<ParseErrorWithContext>);

impl ParseErrors {
    pub fn errors(&self) -> &[ParseErrorWithContext] {
        &self.0
    }
}

impl std::error::Error for ParseErrors {}

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Found {} errors during parsing", self.0.len())?;
        for error in &self.0 {
            writeln!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl From<ParseErrorWithContext> for ParseErrors {
    fn from(error: ParseErrorWithContext) -> Self {
        ParseErrors(vec![error])
    }
}

#[derive(Debug)]
pub struct ParseErrorWithContext {
    pub error: ParseError,
    context: ParseContext,
    pub token: Option<Token>,
}

impl std::fmt::Display for ParseErrorWithContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "While parsing {}",
            self.context.stack.borrow().join(" > ")
        )?;
        write!(f, "{}", self.error)?;
        if let Some(token) = &self.token {
            write!(
                f,
                " at {},{} but found \"{}\"",
                token.line, token.column, token.literal
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Expected \"{0}\"")]
    Expected(TokenType),
    #[error("Expected one of {0:?}")]
    ExpectedOneOf(Vec<TokenType>),
    #[error("Unexpected \"{0}\"")]
    Unexpected(TokenType),
    #[error("Illegal character '{0}'")]
    Illegal(String),
    #[error("\"{0}\" is not supported")]
    Unsupported(TokenType),
    #[error("Invalid integer literal: {0}")]
    InvalidInteger(#[from] std::num::ParseIntError),
}

#[derive(Debug, Clone)]
struct ParseContext {
    stack: RefCell<Vec<&'static str>>,
}

impl ParseContext {
    fn new() -> Self {
        Self {
            stack: RefCell::new(vec![""]),
        }
    }

    fn push(&self, name: &'static str) -> ParseContextGuard {
        self.stack.borrow_mut().push(name);
        ParseContextGuard::new(self)
    }

    fn pop(&self) {
        self.stack.borrow_mut().pop();
    }

    fn error(&self, error: ParseError, tokens: &[Token]) -> ParseErrorWithContext {
        ParseErrorWithContext {
            error,
            context: self.clone(),
            token: tokens.first().cloned(),
        }
    }
}

struct ParseContextGuard<'a> {
    context: &'a ParseContext,
}

impl<'a> ParseContextGuard<'a> {
    fn new(context: &'a ParseContext) -> Self {
        Self { context }
    }
}

impl<'a> Drop for ParseContextGuard<'a> {
    fn drop(&mut self) {
        self.context.pop();
    }
}

type ParseResult<'a, T> = Result<(T, &'a [Token]), ParseErrorWithContext>;

fn peek(tokens: &[Token]) -> Option<TokenType> {
    tokens.first().map(|token| token.token_type)
}

/// Tokenizes and parses `source` in one go.
pub fn parse(source: &str) -> Result<Program, ParseErrors> {
    program(&tokens(source))
}

pub fn program(tokens: &[Token]) -> Result<Program, ParseErrors> {
    let context = ParseContext::new();
    let mut statements = Vec::new();
    let mut tokens = tokens;
    let mut errors = Vec::new();

    let _guard = context.push("program");

    while !matches!(peek(tokens), None | Some(TokenType::Eof)) {
        match statement(&context, tokens) {
            Ok((stmt, rest)) => {
                statements.push(stmt);
                tokens = rest;
            }
            Err(mut err) => {
                errors.append(&mut err.0);
                let rest = synchronize(tokens);
                // a stray `}` has no block to close at the top level
                tokens = if rest.len() == tokens.len() {
                    &tokens[1..]
                } else {
                    rest
                };
            }
        }
    }

    if !errors.is_empty() {
        return Err(ParseErrors(errors));
    }

    Ok(Program(statements))
}

/// Skips the rest of a failed statement: past the next `;`, or past the
/// `}` closing a block opened inside the skipped tokens. Stops before a `}`
/// that closes an enclosing block, and before `Eof`.
fn synchronize(tokens: &[Token]) -> &[Token] {
    let mut tokens = tokens;
    let mut depth = 0usize;
    while let Some(token_type) = peek(tokens) {
        match token_type {
            TokenType::Eof => return tokens,
            TokenType::RightBrace if depth == 0 => return tokens,
            _ => {}
        }
        tokens = &tokens[1..];
        match token_type {
            TokenType::LeftBrace => depth += 1,
            TokenType::RightBrace => {
                depth -= 1;
                if depth == 0 {
                    return tokens;
                }
            }
            TokenType::Semicolon if depth == 0 => return tokens,
            _ => {}
        }
    }
    tokens
}

fn statement<'a>(
    context: &ParseContext,
    tokens: &'a [Token],
) -> Result<(Statement, &'a [Token]), ParseErrors> {
    let _guard = context.push("statement");
    match peek(tokens) {
        Some(TokenType::LeftBrace) => {
            let (block, rest) = block(context, &tokens[1..])?;
            Ok((Statement::Block(block), rest))
        }
        Some(t @ (TokenType::Let | TokenType::Return | TokenType::Function)) => {
            Err(context.error(ParseError::Unsupported(t), tokens).into())
        }
        _ => expression_statement(context, tokens),
    }
}

fn expression_statement<'a>(
    context: &ParseContext,
    tokens: &'a [Token],
) -> Result<(Statement, &'a [Token]), ParseErrors> {
    let _guard = context.push("expression_statement");
    let (expr, mut tokens) = expression(context, tokens)?;
    if peek(tokens) == Some(TokenType::Semicolon) {
        tokens = &tokens[1..];
    }
    Ok((Statement::Expression(expr), tokens))
}

/// Parses the statements of a block whose opening brace was already consumed.
fn block<'a>(context: &ParseContext, tokens: &'a [Token]) -> Result<(Block, &'a [Token]), ParseErrors> {
    let _guard = context.push("block");
    let mut statements = Vec::new();
    let mut tokens = tokens;
    let mut errors = Vec::new();

    while let Some(token_type) = peek(tokens) {
        match token_type {
            TokenType::RightBrace if errors.is_empty() => {
                return Ok((Block(statements), &tokens[1..]));
            }
            TokenType::RightBrace => return Err(ParseErrors(errors)),
            TokenType::Eof => break,
            _ => {}
        }

        match statement(context, tokens) {
            Ok((stmt, rest)) => {
                statements.push(stmt);
                tokens = rest;
            }
            Err(mut err) => {
                errors.append(&mut err.0);
                tokens = synchronize(tokens);
            }
        }
    }

    errors.push(context.error(ParseError::Expected(TokenType::RightBrace), tokens));

    Err(ParseErrors(errors))
}

fn expression<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("expression");
    equality(context, tokens)
}

fn binary<'a>(
    context: &ParseContext,
    precedence: impl Fn(&ParseContext, &'a [Token]) -> ParseResult<'a, Expression>,
    operator: impl Fn(TokenType) -> Option<InfixOperator>,
    tokens: &'a [Token],
) -> ParseResult<'a, Expression> {
    let (mut expr, mut tokens) = precedence(context, tokens)?;

    while let Some(token_type) = peek(tokens) {
        let op = match operator(token_type) {
            Some(op) => op,
            None => break,
        };
        let (right, rest) = precedence(context, &tokens[1..])?;
        expr = Expression::Infix(Box::new(expr), op, Box::new(right));
        tokens = rest;
    }

    Ok((expr, tokens))
}

fn equality<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("equality");
    binary(
        context,
        comparison,
        |token_type| match token_type {
            TokenType::EqualEqual => Some(InfixOperator::Equal),
            TokenType::BangEqual => Some(InfixOperator::NotEqual),
            _ => None,
        },
        tokens,
    )
}

fn comparison<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("comparison");
    binary(
        context,
        term,
        |token_type| match token_type {
            TokenType::Less => Some(InfixOperator::LessThan),
            TokenType::Greater => Some(InfixOperator::GreaterThan),
            _ => None,
        },
        tokens,
    )
}

fn term<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("term");
    binary(
        context,
        factor,
        |token_type| match token_type {
            TokenType::Plus => Some(InfixOperator::Plus),
            TokenType::Minus => Some(InfixOperator::Minus),
            _ => None,
        },
        tokens,
    )
}

fn factor<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("factor");
    binary(
        context,
        prefix,
        |token_type| match token_type {
            TokenType::Star => Some(InfixOperator::Multiply),
            TokenType::Slash => Some(InfixOperator::Divide),
            _ => None,
        },
        tokens,
    )
}

fn prefix<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("prefix");

    let operator = match peek(tokens) {
        Some(TokenType::Minus) => PrefixOperator::Negate,
        Some(TokenType::Bang) => PrefixOperator::Not,
        _ => return call(context, tokens),
    };

    let (right, rest) = prefix(context, &tokens[1..])?;
    Ok((Expression::Prefix(operator, Box::new(right)), rest))
}

fn call<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("call");
    let (mut expr, mut tokens) = primary(context, tokens)?;

    while peek(tokens) == Some(TokenType::LeftParen) {
        let mut args = Vec::new();
        tokens = &tokens[1..];

        loop {
            if peek(tokens) == Some(TokenType::RightParen) {
                tokens = &tokens[1..];
                break;
            }
            let (arg, rest) = expression(context, tokens)?;
            args.push(arg);
            tokens = rest;
            match peek(tokens) {
                Some(TokenType::Comma) => tokens = &tokens[1..],
                Some(TokenType::RightParen) => {
                    tokens = &tokens[1..];
                    break;
                }
                _ => {
                    return Err(context.error(
                        ParseError::ExpectedOneOf(vec![TokenType::Comma, TokenType::RightParen]),
                        tokens,
                    ))
                }
            }
        }

        expr = Expression::Call(Box::new(expr), args);
    }

    Ok((expr, tokens))
}

fn primary<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("primary");
    let Some(token) = tokens.first() else {
        return Err(context.error(ParseError::Unexpected(TokenType::Eof), tokens));
    };

    match token.token_type {
        TokenType::Integer => match token.literal.parse() {
            Ok(n) => Ok((Expression::Integer(n), &tokens[1..])),
            Err(e) => Err(context.error(ParseError::from(e), tokens)),
        },
        TokenType::True => Ok((Expression::Boolean(true), &tokens[1..])),
        TokenType::False => Ok((Expression::Boolean(false), &tokens[1..])),
        TokenType::Identifier => Ok((Expression::Identifier(token.literal.clone()), &tokens[1..])),
        TokenType::LeftParen => {
            let (expr, rest) = expression(context, &tokens[1..])?;
            let tokens = consume(context, rest, TokenType::RightParen)?;
            Ok((expr, tokens))
        }
        TokenType::If => if_expression(context, &tokens[1..]),
        TokenType::Illegal => Err(context.error(ParseError::Illegal(token.literal.clone()), tokens)),
        token_type => Err(context.error(ParseError::Unexpected(token_type), tokens)),
    }
}

fn if_expression<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.push("if_expression");
    let (condition, tokens) = expression(context, tokens)?;
    let (consequence, mut tokens) = braced_block(context, tokens)?;

    let mut alternative = None;
    if peek(tokens) == Some(TokenType::Else) {
        let (block, rest) = braced_block(context, &tokens[1..])?;
        alternative = Some(block);
        tokens = rest;
    }

    Ok((
        Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        },
        tokens,
    ))
}

/// Block inside an expression: only the first error is kept, since the
/// expression grammar reports a single error.
fn braced_block<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Block> {
    let tokens = consume(context, tokens, TokenType::LeftBrace)?;
    block(context, tokens).map_err(|errors| {
        errors
            .0
            .into_iter()
            .next()
            .unwrap_or_else(|| context.error(ParseError::Expected(TokenType::RightBrace), tokens))
    })
}

fn consume<'a>(
    context: &ParseContext,
    tokens: &'a [Token],
    token_type: TokenType,
) -> Result<&'a [Token], ParseErrorWithContext> {
    match peek(tokens) {
        Some(t) if t == token_type => Ok(&tokens[1..]),
        _ => Err(context.error(ParseError::Expected(token_type), tokens)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_expression(source: &str) -> Expression {
        let program = parse(source).expect("source should parse");
        assert_eq!(program.0.len(), 1, "expected a single statement");
        match program.0.into_iter().next() {
            Some(Statement::Expression(expr)) => expr,
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let cases = [
            ("5 + 5 * 2", "(5 + (5 * 2))"),
            ("(5 + 5) * 2", "((5 + 5) * 2)"),
            ("-a * b", "((-a) * b)"),
            ("!-a", "(!(-a))"),
            ("a + b - c", "((a + b) - c)"),
            ("a * b / c", "((a * b) / c)"),
            ("5 > 4 == 3 < 4", "((5 > 4) == (3 < 4))"),
            ("3 + 4 * 5 == 3 * 1 + 4 * 5", "((3 + (4 * 5)) == ((3 * 1) + (4 * 5)))"),
            ("!true != false", "((!true) != false)"),
            ("a + len(b * c) + d", "((a + len((b * c))) + d)"),
            ("print(1, 2 * 3)", "print(1, (2 * 3))"),
        ];

        for (source, expected) in cases {
            assert_eq!(parse_expression(source).to_string(), expected, "{source}");
        }
    }

    #[test]
    fn test_if_expression() {
        let expr = parse_expression("if (x < y) { x } else { y; 1 }");
        let Expression::If {
            condition,
            consequence,
            alternative,
        } = expr
        else {
            panic!("expected an if expression");
        };
        assert_eq!(condition.to_string(), "(x < y)");
        assert_eq!(consequence.0.len(), 1);
        assert_eq!(alternative.map(|block| block.0.len()), Some(2));
    }

    #[test]
    fn test_if_without_else() {
        let expr = parse_expression("if true { 10 }");
        assert!(matches!(
            expr,
            Expression::If {
                alternative: None,
                ..
            }
        ));
    }

    #[test]
    fn test_multiple_statements() {
        let program = parse("1; 2\n3;").unwrap();
        assert_eq!(program.0.len(), 3);
    }

    #[test]
    fn test_block_statement() {
        let program = parse("{ 1; 2 } 3").unwrap();
        assert_eq!(program.0.len(), 2);
        assert!(matches!(&program.0[0], Statement::Block(Block(s)) if s.len() == 2));
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(parse("").unwrap(), Program(vec![]));
        assert_eq!(parse("  \n\n ").unwrap(), Program(vec![]));
    }

    #[test]
    fn test_unsupported_keywords() {
        let errors = parse("let x = 5;").unwrap_err();
        assert!(matches!(
            errors.errors()[0].error,
            ParseError::Unsupported(TokenType::Let)
        ));
    }

    #[test]
    fn test_illegal_token() {
        let errors = parse("1 + @;").unwrap_err();
        assert_eq!(errors.errors().len(), 1);
        assert!(matches!(&errors.errors()[0].error, ParseError::Illegal(c) if c == "@"));
        let token = errors.errors()[0].token.as_ref().unwrap();
        assert_eq!((token.line, token.column), (0, 4));
    }

    #[test]
    fn test_collects_errors_across_statements() {
        let errors = parse("1 +;\n2;\n(3;").unwrap_err();
        assert_eq!(errors.errors().len(), 2);
    }

    #[test]
    fn test_recovers_after_failed_block() {
        let errors = parse("{ 1 +; } 2;").unwrap_err();
        assert_eq!(errors.errors().len(), 1);
        assert!(matches!(
            errors.errors()[0].error,
            ParseError::Unexpected(TokenType::Semicolon)
        ));

        // the statement after the block is still parsed
        let errors = parse("{ 1 +; } 2 +;").unwrap_err();
        assert_eq!(errors.errors().len(), 2);
        let token = errors.errors()[1].token.as_ref().unwrap();
        assert_eq!((token.column, token.literal.as_str()), (12, ";"));
    }

    #[test]
    fn test_recovers_inside_nested_blocks() {
        let errors = parse("{ { 1 +; } 2 } if true { 3 +; } 4; 5 +;").unwrap_err();
        assert_eq!(errors.errors().len(), 3);
    }

    #[test]
    fn test_stray_right_brace() {
        let errors = parse("1; } 2;").unwrap_err();
        assert_eq!(errors.errors().len(), 1);
        assert!(matches!(
            errors.errors()[0].error,
            ParseError::Unexpected(TokenType::RightBrace)
        ));
    }

    #[test]
    fn test_unclosed_block() {
        let errors = parse("if true { 1").unwrap_err();
        assert!(matches!(
            errors.errors()[0].error,
            ParseError::Expected(TokenType::RightBrace)
        ));
    }

    #[test]
    fn test_integer_out_of_range() {
        let errors = parse("99999999999999999999").unwrap_err();
        assert!(matches!(
            errors.errors()[0].error,
            ParseError::InvalidInteger(_)
        ));
    }

    #[test]
    fn test_error_message() {
        let errors = parse("(1").unwrap_err();
        let message = errors.to_string();
        assert!(message.contains("Expected \")\""), "{message}");
        assert!(message.contains("at 0,2"), "{message}");
    }
}
