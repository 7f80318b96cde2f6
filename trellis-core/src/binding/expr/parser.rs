//! Pratt parser for derived expressions.
//!
//! # Grammar
//!
//! ```text
//! expr     := ternary
//! ternary  := binary ('?' expr ':' expr)?
//! binary   := unary (op unary)*        precedence climbing, see `infix`
//! unary    := ('!' | '-' | '+') unary | postfix
//! postfix  := primary ('.' name | '[' expr ']')*
//! primary  := number | string | true | false | null | undefined
//!           | root | '(' expr ')' | '[' (expr (',' expr)*)? ']'
//! root     := props | state | workspace | app
//! ```
//!
//! There are no calls and no assignment, and the only free identifiers are
//! the four roots, so an expression can read state but never reach anything
//! else.

use serde_json::Value;

use super::lexer::{tokenize, Token, TokenKind};
use crate::error::ExprError;

/// Nesting limit of the parsed tree. Parentheses, unary operators, ternaries
/// and every link of an operator or member chain count one level.
pub const MAX_DEPTH: usize = 64;

/// The readable namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    Props,
    /// Local scope, falling back to workspace.
    State,
    Workspace,
    App,
}

impl Root {
    fn from_ident(name: &str) -> Option<Self> {
        match name {
            "props" => Some(Root::Props),
            "state" => Some(Root::State),
            "workspace" => Some(Root::Workspace),
            "app" => Some(Root::App),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Lt,
    Le,
    Gt,
    Ge,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,

    // Short-circuit
    And,
    Or,
    Coalesce,
}

/// Parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Array(Vec<Expr>),
    Root(Root),
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
}

impl Expr {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(token) => Err(unexpected(token)),
        }
    }
}

/// Binding power of an infix operator. Higher binds tighter.
fn infix(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
    let op = match kind {
        TokenKind::Coalesce => (BinaryOp::Coalesce, 1),
        TokenKind::Or => (BinaryOp::Or, 2),
        TokenKind::And => (BinaryOp::And, 3),
        TokenKind::LooseEq => (BinaryOp::LooseEq, 4),
        TokenKind::LooseNe => (BinaryOp::LooseNe, 4),
        TokenKind::StrictEq => (BinaryOp::StrictEq, 4),
        TokenKind::StrictNe => (BinaryOp::StrictNe, 4),
        TokenKind::Lt => (BinaryOp::Lt, 5),
        TokenKind::Le => (BinaryOp::Le, 5),
        TokenKind::Gt => (BinaryOp::Gt, 5),
        TokenKind::Ge => (BinaryOp::Ge, 5),
        TokenKind::Plus => (BinaryOp::Add, 6),
        TokenKind::Minus => (BinaryOp::Sub, 6),
        TokenKind::Star => (BinaryOp::Mul, 7),
        TokenKind::Slash => (BinaryOp::Div, 7),
        TokenKind::Percent => (BinaryOp::Mod, 7),
        _ => return None,
    };
    Some(op)
}

fn unexpected(token: &Token) -> ExprError {
    ExprError::UnexpectedToken {
        found: token.kind.to_string(),
        offset: token.offset,
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, ExprError> {
        let token = self.tokens.get(self.pos).cloned().ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| &t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ExprError> {
        let token = self.next()?;
        if &token.kind == kind {
            Ok(())
        } else {
            Err(unexpected(&token))
        }
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        self.descend()?;
        let test = self.binary(0)?;
        let result = if self.eat(&TokenKind::Question) {
            let consequent = self.expr()?;
            self.expect(&TokenKind::Colon)?;
            let alternate = self.expr()?;
            Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            }
        } else {
            test
        };
        self.depth -= 1;
        Ok(result)
    }

    fn binary(&mut self, min_power: u8) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        let mut links = 0;
        while let Some((op, power)) = self.peek().and_then(|t| infix(&t.kind)) {
            if power <= min_power {
                break;
            }
            self.pos += 1;
            self.descend()?;
            links += 1;
            let rhs = self.binary(power)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.depth -= links;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Bang) => UnaryOp::Not,
            Some(TokenKind::Minus) => UnaryOp::Neg,
            Some(TokenKind::Plus) => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.pos += 1;
        self.descend()?;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        let mut links = 0;
        loop {
            if matches!(
                self.peek().map(|t| &t.kind),
                Some(TokenKind::Dot | TokenKind::LBracket)
            ) {
                self.descend()?;
                links += 1;
            }
            if self.eat(&TokenKind::Dot) {
                let token = self.next()?;
                let name = match token.kind {
                    TokenKind::Ident(name) => Value::String(name),
                    TokenKind::Number(n) => Value::String(format_index(n)),
                    _ => return Err(unexpected(&token)),
                };
                expr = member(expr, Expr::Literal(name));
            } else if self.eat(&TokenKind::LBracket) {
                let property = self.expr()?;
                self.expect(&TokenKind::RBracket)?;
                expr = member(expr, property);
            } else {
                self.depth -= links;
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(super::eval::number(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" | "undefined" => Ok(Expr::Literal(Value::Null)),
                _ => Root::from_ident(&name)
                    .map(Expr::Root)
                    .ok_or(ExprError::UnknownIdentifier(name)),
            },
            TokenKind::LParen => {
                let inner = self.expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                let mut items = Vec::new();
                if !self.eat(&TokenKind::RBracket) {
                    loop {
                        items.push(self.expr()?);
                        if self.eat(&TokenKind::RBracket) {
                            break;
                        }
                        self.expect(&TokenKind::Comma)?;
                    }
                }
                Ok(Expr::Array(items))
            }
            _ => Err(unexpected(&token)),
        }
    }
}

fn member(object: Expr, property: Expr) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property: Box::new(property),
    }
}

fn format_index(n: f64) -> String {
    if n.fract() == 0.0 && n >= 0.0 {
        format!("{}", n as u64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root_path(root: Root, names: &[&str]) -> Expr {
        names.iter().fold(Expr::Root(root), |expr, name| {
            member(expr, Expr::Literal(json!(name)))
        })
    }

    #[test]
    fn precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let expr = Expr::parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(Expr::Literal(json!(1))),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: Box::new(Expr::Literal(json!(2))),
                    rhs: Box::new(Expr::Literal(json!(3))),
                }),
            }
        );
    }

    #[test]
    fn left_associative_subtraction() {
        let expr = Expr::parse("5 - 2 - 1").unwrap();
        let Expr::Binary { lhs, .. } = expr else {
            panic!("expected binary");
        };
        assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::Sub, .. }));
    }

    #[test]
    fn member_chains() {
        assert_eq!(
            Expr::parse("state.form.title").unwrap(),
            root_path(Root::State, &["form", "title"])
        );
        assert_eq!(
            Expr::parse("props.items.0").unwrap(),
            root_path(Root::Props, &["items", "0"])
        );
    }

    #[test]
    fn ternary_and_logic() {
        let expr = Expr::parse("app.user ? app.user.name : 'guest'").unwrap();
        assert!(matches!(expr, Expr::Conditional { .. }));

        let expr = Expr::parse("!props.done && props.count > 0").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn rejects_unknown_identifiers() {
        assert_eq!(
            Expr::parse("window.alert"),
            Err(ExprError::UnknownIdentifier("window".into()))
        );
    }

    #[test]
    fn rejects_calls_and_trailing_input() {
        assert!(matches!(
            Expr::parse("props.f(1)"),
            Err(ExprError::UnexpectedToken { .. })
        ));
        assert_eq!(Expr::parse("state.count +"), Err(ExprError::UnexpectedEnd));
    }

    #[test]
    fn depth_limit() {
        let source = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(Expr::parse(&source), Err(ExprError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn long_chains_hit_the_depth_limit() {
        let sum = format!("1{}", "+1".repeat(10_000));
        assert_eq!(Expr::parse(&sum), Err(ExprError::TooDeep(MAX_DEPTH)));

        let members = format!("props{}", ".a".repeat(10_000));
        assert_eq!(Expr::parse(&members), Err(ExprError::TooDeep(MAX_DEPTH)));

        let indexed = format!("props{}", "[0]".repeat(10_000));
        assert_eq!(Expr::parse(&indexed), Err(ExprError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn short_chains_still_parse() {
        assert!(Expr::parse(&format!("1{}", "+1".repeat(30))).is_ok());
        assert!(Expr::parse(&format!("props{}", ".a".repeat(30))).is_ok());
        // links are released once a chain ends
        let chains = vec!["props.a.b.c + 1"; 20].join(" + ");
        assert!(Expr::parse(&chains).is_ok());
    }
}
