//! PATH addressing: a path-query language.
//!
//! Covers location paths (absolute, relative and `//`), the common axes,
//! name/`*`/`node()`/`text()` tests, predicates with positions, comparisons,
//! `and`/`or`, a handful of core functions, parenthesised filter expressions
//! and `|` unions.
//!
//! Intermediate node sets are kept deduplicated and in document order after
//! every step, so the final result never depends on traversal order.

use std::collections::HashMap;

use pagelink_dom::{Document, NodeId, NodeKind};

use crate::SelectorError;

/// A compiled PATH pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pattern: String,
    expr: Expr,
}

impl PathExpr {
    pub fn parse(pattern: &str) -> Result<Self, SelectorError> {
        let tokens = tokenize(pattern)?;
        if tokens.is_empty() {
            return Err(SelectorError::path(pattern, "empty pattern"));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            pattern,
        };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(parser.error(format!("unexpected {token:?}")));
        }
        Ok(Self {
            pattern: pattern.to_string(),
            expr,
        })
    }

    /// Evaluate with `scope` as the context node. Returns the selected
    /// elements in document order, without duplicates.
    pub fn select(&self, doc: &Document, scope: NodeId) -> Result<Vec<NodeId>, SelectorError> {
        let evaluator = Evaluator::new(doc, scope);
        let ctx = Context {
            item: Item::Node(scope),
            position: 1,
            size: 1,
        };
        let value = evaluator
            .eval(&self.expr, &ctx)
            .map_err(|reason| SelectorError::path(&self.pattern, reason))?;
        match value {
            Value::Nodes(items) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Item::Node(node) if doc.is_element(node) => Some(node),
                    _ => None,
                })
                .collect()),
            _ => Err(SelectorError::NotANodeSet(self.pattern.clone())),
        }
    }
}

// ---- tokens ----

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Dot,
    DotDot,
    Star,
    Pipe,
    Comma,
    AxisSep,
    Cmp(CmpOp),
    Name(String),
    Literal(String),
    Number(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

fn tokenize(pattern: &str) -> Result<Vec<Token>, SelectorError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();
        let (token, len) = match ch {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '/' if next == Some('/') => (Token::DoubleSlash, 2),
            '/' => (Token::Slash, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '@' => (Token::At, 1),
            '*' => (Token::Star, 1),
            '|' => (Token::Pipe, 1),
            ',' => (Token::Comma, 1),
            ':' if next == Some(':') => (Token::AxisSep, 2),
            '=' => (Token::Cmp(CmpOp::Eq), 1),
            '!' if next == Some('=') => (Token::Cmp(CmpOp::NotEq), 2),
            '<' if next == Some('=') => (Token::Cmp(CmpOp::LtEq), 2),
            '<' => (Token::Cmp(CmpOp::Lt), 1),
            '>' if next == Some('=') => (Token::Cmp(CmpOp::GtEq), 2),
            '>' => (Token::Cmp(CmpOp::Gt), 1),
            '.' if next == Some('.') => (Token::DotDot, 2),
            '.' if !next.is_some_and(|c| c.is_ascii_digit()) => (Token::Dot, 1),
            '"' | '\'' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&c| c == ch)
                    .ok_or_else(|| SelectorError::path(pattern, "unterminated string"))?;
                let literal: String = chars[i + 1..i + 1 + close].iter().collect();
                (Token::Literal(literal), close + 2)
            }
            c if c.is_ascii_digit() || c == '.' => {
                let len = chars[i..]
                    .iter()
                    .take_while(|c| c.is_ascii_digit() || **c == '.')
                    .count();
                let text: String = chars[i..i + len].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| SelectorError::path(pattern, format!("bad number '{text}'")))?;
                (Token::Number(number), len)
            }
            c if c.is_alphabetic() || c == '_' => {
                let len = chars[i..]
                    .iter()
                    .take_while(|c| c.is_alphanumeric() || **c == '-' || **c == '_')
                    .count();
                (Token::Name(chars[i..i + len].iter().collect()), len)
            }
            other => {
                return Err(SelectorError::path(
                    pattern,
                    format!("unexpected character '{other}'"),
                ));
            }
        };
        tokens.push(token);
        i += len;
    }
    Ok(tokens)
}

// ---- syntax tree ----

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Union(Vec<Expr>),
    Path { absolute: bool, steps: Vec<Step> },
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
    Literal(String),
    Number(f64),
    Call(Function, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

impl Step {
    fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    SelfAxis,
    Attribute,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "parent" => Self::Parent,
            "ancestor" => Self::Ancestor,
            "ancestor-or-self" => Self::AncestorOrSelf,
            "following-sibling" => Self::FollowingSibling,
            "preceding-sibling" => Self::PrecedingSibling,
            "self" => Self::SelfAxis,
            "attribute" => Self::Attribute,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    /// Lower-cased element or attribute name.
    Name(String),
    Any,
    Node,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Last,
    Position,
    Count,
    Contains,
    StartsWith,
    NormalizeSpace,
    StringFn,
    StringLength,
    Not,
    True,
    False,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "last" => Self::Last,
            "position" => Self::Position,
            "count" => Self::Count,
            "contains" => Self::Contains,
            "starts-with" => Self::StartsWith,
            "normalize-space" => Self::NormalizeSpace,
            "string" => Self::StringFn,
            "string-length" => Self::StringLength,
            "not" => Self::Not,
            "true" => Self::True,
            "false" => Self::False,
            _ => return None,
        })
    }

    fn accepts(self, argc: usize) -> bool {
        match self {
            Self::Last | Self::Position | Self::True | Self::False => argc == 0,
            Self::Count | Self::Not => argc == 1,
            Self::Contains | Self::StartsWith => argc == 2,
            Self::NormalizeSpace | Self::StringFn | Self::StringLength => argc <= 1,
        }
    }
}

// ---- parser ----

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    pattern: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, reason: impl Into<String>) -> SelectorError {
        SelectorError::path(self.pattern, reason)
    }

    fn expect(&mut self, expected: Token) -> Result<(), SelectorError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(self.error(format!("expected {expected:?}, found {token:?}"))),
            None => Err(self.error(format!("expected {expected:?}, found end of pattern"))),
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == keyword)
    }

    fn parse_or(&mut self) -> Result<Expr, SelectorError> {
        let mut left = self.parse_and()?;
        while self.at_keyword("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SelectorError> {
        let mut left = self.parse_comparison()?;
        while self.at_keyword("and") {
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, SelectorError> {
        let mut left = self.parse_union()?;
        while let Some(Token::Cmp(op)) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_union()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_union(&mut self) -> Result<Expr, SelectorError> {
        let first = self.parse_path_expr()?;
        if self.peek() != Some(&Token::Pipe) {
            return Ok(first);
        }
        let mut parts = vec![first];
        while self.peek() == Some(&Token::Pipe) {
            self.advance();
            parts.push(self.parse_path_expr()?);
        }
        Ok(Expr::Union(parts))
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Star | Token::At | Token::Dot | Token::DotDot)
        )
    }

    fn starts_primary(&self) -> bool {
        match self.peek() {
            Some(Token::Literal(_) | Token::Number(_) | Token::LParen) => true,
            Some(Token::Name(name)) => {
                self.peek_at(1) == Some(&Token::LParen) && name != "node" && name != "text"
            }
            _ => false,
        }
    }

    fn parse_path_expr(&mut self) -> Result<Expr, SelectorError> {
        match self.peek() {
            Some(Token::Slash) => {
                self.advance();
                let mut steps = Vec::new();
                if self.starts_step() {
                    self.parse_relative(&mut steps)?;
                }
                Ok(Expr::Path {
                    absolute: true,
                    steps,
                })
            }
            Some(Token::DoubleSlash) => {
                self.advance();
                let mut steps = vec![Step::descendant_or_self()];
                self.parse_relative(&mut steps)?;
                Ok(Expr::Path {
                    absolute: true,
                    steps,
                })
            }
            _ if self.starts_primary() => {
                let primary = self.parse_primary()?;
                let predicates = self.parse_predicates()?;
                let mut steps = Vec::new();
                match self.peek() {
                    Some(Token::Slash) => {
                        self.advance();
                        self.parse_relative(&mut steps)?;
                    }
                    Some(Token::DoubleSlash) => {
                        self.advance();
                        steps.push(Step::descendant_or_self());
                        self.parse_relative(&mut steps)?;
                    }
                    _ => {}
                }
                if predicates.is_empty() && steps.is_empty() {
                    return Ok(primary);
                }
                Ok(Expr::Filter {
                    primary: Box::new(primary),
                    predicates,
                    steps,
                })
            }
            _ => {
                let mut steps = Vec::new();
                self.parse_relative(&mut steps)?;
                Ok(Expr::Path {
                    absolute: false,
                    steps,
                })
            }
        }
    }

    fn parse_relative(&mut self, steps: &mut Vec<Step>) -> Result<(), SelectorError> {
        steps.push(self.parse_step()?);
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.advance();
                }
                Some(Token::DoubleSlash) => {
                    self.advance();
                    steps.push(Step::descendant_or_self());
                }
                _ => return Ok(()),
            }
            steps.push(self.parse_step()?);
        }
    }

    fn parse_step(&mut self) -> Result<Step, SelectorError> {
        let (axis, test) = match self.peek() {
            Some(Token::Dot) => {
                self.advance();
                return Ok(Step {
                    axis: Axis::SelfAxis,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            Some(Token::DotDot) => {
                self.advance();
                return Ok(Step {
                    axis: Axis::Parent,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            Some(Token::At) => {
                self.advance();
                (Axis::Attribute, self.parse_node_test()?)
            }
            Some(Token::Name(name)) if self.peek_at(1) == Some(&Token::AxisSep) => {
                let axis = Axis::from_name(name)
                    .ok_or_else(|| self.error(format!("unknown axis '{name}'")))?;
                self.advance();
                self.advance();
                (axis, self.parse_node_test()?)
            }
            Some(_) => (Axis::Child, self.parse_node_test()?),
            None => return Err(self.error("expected a location step, found end of pattern")),
        };
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, SelectorError> {
        match self.advance() {
            Some(Token::Star) => Ok(NodeTest::Any),
            Some(Token::Name(name)) if self.peek() == Some(&Token::LParen) => {
                let test = match name.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    _ => return Err(self.error(format!("'{name}()' is not a node test"))),
                };
                self.advance();
                self.expect(Token::RParen)?;
                Ok(test)
            }
            Some(Token::Name(name)) => Ok(NodeTest::Name(name.to_ascii_lowercase())),
            Some(token) => Err(self.error(format!("expected a node test, found {token:?}"))),
            None => Err(self.error("expected a node test, found end of pattern")),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, SelectorError> {
        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.advance();
            predicates.push(self.parse_or()?);
            self.expect(Token::RBracket)?;
        }
        Ok(predicates)
    }

    fn parse_primary(&mut self) -> Result<Expr, SelectorError> {
        match self.advance() {
            Some(Token::Literal(s)) => Ok(Expr::Literal(s)),
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) => {
                let function = Function::from_name(&name)
                    .ok_or_else(|| self.error(format!("unknown function '{name}()'")))?;
                self.expect(Token::LParen)?;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    args.push(self.parse_or()?);
                    while self.peek() == Some(&Token::Comma) {
                        self.advance();
                        args.push(self.parse_or()?);
                    }
                }
                self.expect(Token::RParen)?;
                if !function.accepts(args.len()) {
                    return Err(self.error(format!(
                        "wrong number of arguments to '{name}()'"
                    )));
                }
                Ok(Expr::Call(function, args))
            }
            Some(token) => Err(self.error(format!("unexpected {token:?}"))),
            None => Err(self.error("unexpected end of pattern")),
        }
    }
}

// ---- evaluation ----

/// A node-set member: a tree node, or an attribute by owner and index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Item {
    Node(NodeId),
    Attr(NodeId, usize),
}

#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<Item>),
    Str(String),
    Num(f64),
    Bool(bool),
}

struct Context {
    item: Item,
    position: usize,
    size: usize,
}

type EvalResult = Result<Value, String>;

struct Evaluator<'a> {
    doc: &'a Document,
    root: NodeId,
    order: HashMap<NodeId, usize>,
}

impl<'a> Evaluator<'a> {
    fn new(doc: &'a Document, scope: NodeId) -> Self {
        let root = doc.ancestors(scope).last().copied().unwrap_or(scope);
        let order = std::iter::once(root)
            .chain(doc.descendants(root))
            .enumerate()
            .map(|(pos, node)| (node, pos))
            .collect();
        Self { doc, root, order }
    }

    fn eval(&self, expr: &Expr, ctx: &Context) -> EvalResult {
        match expr {
            Expr::Or(l, r) => Ok(Value::Bool(
                self.boolean(&self.eval(l, ctx)?) || self.boolean(&self.eval(r, ctx)?),
            )),
            Expr::And(l, r) => Ok(Value::Bool(
                self.boolean(&self.eval(l, ctx)?) && self.boolean(&self.eval(r, ctx)?),
            )),
            Expr::Compare(op, l, r) => {
                let left = self.eval(l, ctx)?;
                let right = self.eval(r, ctx)?;
                Ok(Value::Bool(self.compare(*op, &left, &right)))
            }
            Expr::Union(parts) => {
                let mut items = Vec::new();
                for part in parts {
                    match self.eval(part, ctx)? {
                        Value::Nodes(nodes) => items.extend(nodes),
                        _ => return Err("union of a non-node-set".to_string()),
                    }
                }
                Ok(Value::Nodes(self.normalize(items)))
            }
            Expr::Path { absolute, steps } => {
                let start = if *absolute {
                    Item::Node(self.root)
                } else {
                    ctx.item
                };
                Ok(Value::Nodes(self.apply_steps(vec![start], steps)?))
            }
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let Value::Nodes(items) = self.eval(primary, ctx)? else {
                    return Err("predicate applied to a non-node-set".to_string());
                };
                let mut items = self.normalize(items);
                for predicate in predicates {
                    items = self.filter(items, predicate)?;
                }
                Ok(Value::Nodes(self.apply_steps(items, steps)?))
            }
            Expr::Literal(s) => Ok(Value::Str(s.clone())),
            Expr::Number(n) => Ok(Value::Num(*n)),
            Expr::Call(function, args) => self.call(*function, args, ctx),
        }
    }

    fn apply_steps(&self, mut items: Vec<Item>, steps: &[Step]) -> Result<Vec<Item>, String> {
        for step in steps {
            let mut next = Vec::new();
            for item in &items {
                let mut candidates: Vec<Item> = self
                    .axis(*item, step.axis)
                    .into_iter()
                    .filter(|candidate| self.node_test(*candidate, step.axis, &step.test))
                    .collect();
                for predicate in &step.predicates {
                    candidates = self.filter(candidates, predicate)?;
                }
                next.extend(candidates);
            }
            items = self.normalize(next);
        }
        Ok(items)
    }

    /// Keep the items for which `predicate` holds; numeric predicates select
    /// by 1-based position.
    fn filter(&self, items: Vec<Item>, predicate: &Expr) -> Result<Vec<Item>, String> {
        let size = items.len();
        let mut kept = Vec::new();
        for (idx, item) in items.into_iter().enumerate() {
            let ctx = Context {
                item,
                position: idx + 1,
                size,
            };
            let keep = match self.eval(predicate, &ctx)? {
                Value::Num(n) => n == ctx.position as f64,
                other => self.boolean(&other),
            };
            if keep {
                kept.push(item);
            }
        }
        Ok(kept)
    }

    /// Items along `axis`, in proximity order.
    fn axis(&self, item: Item, axis: Axis) -> Vec<Item> {
        let doc = self.doc;
        let node = match item {
            Item::Node(node) => node,
            Item::Attr(owner, _) => {
                return match axis {
                    Axis::SelfAxis => vec![item],
                    Axis::Parent => vec![Item::Node(owner)],
                    Axis::Ancestor | Axis::AncestorOrSelf => {
                        let mut out = Vec::new();
                        if axis == Axis::AncestorOrSelf {
                            out.push(item);
                        }
                        out.push(Item::Node(owner));
                        out.extend(doc.ancestors(owner).into_iter().map(Item::Node));
                        out
                    }
                    _ => Vec::new(),
                };
            }
        };

        let nodes: Vec<NodeId> = match axis {
            Axis::Child => doc.children(node).to_vec(),
            Axis::Descendant => doc.descendants(node),
            Axis::DescendantOrSelf => std::iter::once(node).chain(doc.descendants(node)).collect(),
            Axis::Parent => doc.parent(node).into_iter().collect(),
            Axis::Ancestor => doc.ancestors(node),
            Axis::AncestorOrSelf => std::iter::once(node).chain(doc.ancestors(node)).collect(),
            Axis::FollowingSibling | Axis::PrecedingSibling => {
                let Some(parent) = doc.parent(node) else {
                    return Vec::new();
                };
                let siblings = doc.children(parent);
                let pos = siblings.iter().position(|&s| s == node).unwrap_or(0);
                if axis == Axis::FollowingSibling {
                    siblings[pos + 1..].to_vec()
                } else {
                    siblings[..pos].iter().rev().copied().collect()
                }
            }
            Axis::SelfAxis => vec![node],
            Axis::Attribute => {
                return (0..doc.attributes(node).len())
                    .map(|idx| Item::Attr(node, idx))
                    .collect();
            }
        };
        nodes.into_iter().map(Item::Node).collect()
    }

    fn node_test(&self, item: Item, axis: Axis, test: &NodeTest) -> bool {
        match item {
            Item::Attr(owner, idx) => match test {
                NodeTest::Any | NodeTest::Node => true,
                NodeTest::Name(name) => self
                    .doc
                    .attributes(owner)
                    .get(idx)
                    .is_some_and(|attr| attr.name.eq_ignore_ascii_case(name)),
                NodeTest::Text => false,
            },
            // The attribute axis only yields attributes.
            Item::Node(_) if axis == Axis::Attribute => false,
            Item::Node(node) => match test {
                NodeTest::Node => true,
                NodeTest::Any => self.doc.is_element(node),
                NodeTest::Name(name) => self.doc.tag_name(node) == Some(name.as_str()),
                NodeTest::Text => self
                    .doc
                    .node(node)
                    .is_some_and(|n| matches!(n.kind, NodeKind::Text(_))),
            },
        }
    }

    /// Deduplicate and sort into document order.
    fn normalize(&self, mut items: Vec<Item>) -> Vec<Item> {
        items.sort_by_key(|item| self.order_key(*item));
        items.dedup();
        items
    }

    fn order_key(&self, item: Item) -> (usize, usize) {
        match item {
            Item::Node(node) => (self.order.get(&node).copied().unwrap_or(usize::MAX), 0),
            Item::Attr(owner, idx) => (
                self.order.get(&owner).copied().unwrap_or(usize::MAX),
                idx + 1,
            ),
        }
    }

    fn string_value(&self, item: Item) -> String {
        match item {
            Item::Node(node) => self.doc.text_content(node),
            Item::Attr(owner, idx) => self
                .doc
                .attributes(owner)
                .get(idx)
                .map(|attr| attr.value.clone())
                .unwrap_or_default(),
        }
    }

    fn string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(items) => items
                .first()
                .map(|item| self.string_value(*item))
                .unwrap_or_default(),
            Value::Str(s) => s.clone(),
            Value::Num(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
        }
    }

    fn number(&self, value: &Value) -> f64 {
        match value {
            Value::Num(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            other => self.string(other).trim().parse().unwrap_or(f64::NAN),
        }
    }

    fn boolean(&self, value: &Value) -> bool {
        match value {
            Value::Nodes(items) => !items.is_empty(),
            Value::Str(s) => !s.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
        }
    }

    fn compare(&self, op: CmpOp, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Nodes(items), Value::Bool(_)) => {
                self.compare_atomic(op, &Value::Bool(!items.is_empty()), right)
            }
            (Value::Bool(_), Value::Nodes(items)) => {
                self.compare_atomic(op, left, &Value::Bool(!items.is_empty()))
            }
            (Value::Nodes(a), Value::Nodes(b)) => a.iter().any(|x| {
                let x = Value::Str(self.string_value(*x));
                b.iter()
                    .any(|y| self.compare_atomic(op, &x, &Value::Str(self.string_value(*y))))
            }),
            (Value::Nodes(items), other) => items
                .iter()
                .any(|x| self.compare_atomic(op, &Value::Str(self.string_value(*x)), other)),
            (other, Value::Nodes(items)) => items
                .iter()
                .any(|y| self.compare_atomic(op, other, &Value::Str(self.string_value(*y)))),
            _ => self.compare_atomic(op, left, right),
        }
    }

    fn compare_atomic(&self, op: CmpOp, left: &Value, right: &Value) -> bool {
        match op {
            CmpOp::Eq | CmpOp::NotEq => {
                let equal = match (left, right) {
                    (Value::Bool(_), _) | (_, Value::Bool(_)) => {
                        self.boolean(left) == self.boolean(right)
                    }
                    (Value::Num(_), _) | (_, Value::Num(_)) => {
                        self.number(left) == self.number(right)
                    }
                    _ => self.string(left) == self.string(right),
                };
                equal == (op == CmpOp::Eq)
            }
            CmpOp::Lt => self.number(left) < self.number(right),
            CmpOp::LtEq => self.number(left) <= self.number(right),
            CmpOp::Gt => self.number(left) > self.number(right),
            CmpOp::GtEq => self.number(left) >= self.number(right),
        }
    }

    fn call(&self, function: Function, args: &[Expr], ctx: &Context) -> EvalResult {
        let arg_string = |idx: usize| -> Result<String, String> {
            match args.get(idx) {
                Some(arg) => Ok(self.string(&self.eval(arg, ctx)?)),
                None => Ok(self.string_value(ctx.item)),
            }
        };
        Ok(match function {
            Function::Last => Value::Num(ctx.size as f64),
            Function::Position => Value::Num(ctx.position as f64),
            Function::Count => match args.first().map(|arg| self.eval(arg, ctx)).transpose()? {
                Some(Value::Nodes(items)) => Value::Num(items.len() as f64),
                _ => return Err("count() expects a node-set".to_string()),
            },
            Function::Contains => Value::Bool(arg_string(0)?.contains(&arg_string(1)?)),
            Function::StartsWith => Value::Bool(arg_string(0)?.starts_with(&arg_string(1)?)),
            Function::NormalizeSpace => Value::Str(
                arg_string(0)?
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Function::StringFn => Value::Str(arg_string(0)?),
            Function::StringLength => Value::Num(arg_string(0)?.chars().count() as f64),
            Function::Not => {
                let value = match args.first() {
                    Some(arg) => self.eval(arg, ctx)?,
                    None => return Err("not() expects one argument".to_string()),
                };
                Value::Bool(!self.boolean(&value))
            }
            Function::True => Value::Bool(true),
            Function::False => Value::Bool(false),
        })
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
