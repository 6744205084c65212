//! RULE addressing: structural, stylesheet-style selectors.
//!
//! Supports selector lists, the four combinators, type/universal/id/class
//! selectors, attribute selectors with every matching operator and the `i`
//! flag, and the structural and form pseudo-classes. Scoped selection has
//! `querySelectorAll` semantics: candidates are descendants of the scope,
//! but combinators may walk above it.

use pagelink_dom::{Document, NodeId, NodeKind};

use crate::SelectorError;

/// A compiled RULE pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSelector {
    groups: Vec<Vec<SelectorPart>>,
}

#[derive(Debug, Clone, PartialEq)]
struct SelectorPart {
    compound: Compound,
    // Relation to the part on the left; `None` for the first part.
    combinator: Option<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
    pseudos: Vec<PseudoClass>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && !self.universal
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.pseudos.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrCondition {
    name: String,
    op: AttrOp,
    value: String,
    case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum PseudoClass {
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(NthExpression),
    NthLastChild(NthExpression),
    NthOfType(NthExpression),
    NthLastOfType(NthExpression),
    Checked,
    Disabled,
    Enabled,
    Not(Vec<Vec<SelectorPart>>),
}

/// `An+B` expression for the `:nth-*` pseudo-classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NthExpression {
    a: i64,
    b: i64,
}

impl NthExpression {
    /// Parse `odd`, `even`, `3`, `2n+1`, `-n+3` and friends.
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase().replace(' ', "");
        match s.as_str() {
            "odd" => return Some(Self { a: 2, b: 1 }),
            "even" => return Some(Self { a: 2, b: 0 }),
            _ => {}
        }
        if let Ok(b) = s.parse::<i64>() {
            return Some(Self { a: 0, b });
        }
        let n_pos = s.find('n')?;
        let a = match &s[..n_pos] {
            "" | "+" => 1,
            "-" => -1,
            other => other.parse().ok()?,
        };
        let rest = &s[n_pos + 1..];
        let b = if rest.is_empty() { 0 } else { rest.parse().ok()? };
        Some(Self { a, b })
    }

    /// Whether the 1-based position `n` is selected.
    fn matches(&self, n: i64) -> bool {
        if self.a == 0 {
            return n == self.b;
        }
        let diff = n - self.b;
        diff % self.a == 0 && diff / self.a >= 0
    }
}

impl RuleSelector {
    /// Compile a RULE pattern.
    pub fn parse(pattern: &str) -> Result<Self, SelectorError> {
        let groups = parse_selector_list(pattern, pattern)?;
        Ok(Self { groups })
    }

    /// Whether `node` matches any selector in the list.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.groups.iter().any(|chain| matches_chain(doc, node, chain))
    }

    /// Matching descendants of `scope`, in document order.
    pub fn select(&self, doc: &Document, scope: NodeId) -> Vec<NodeId> {
        doc.descendant_elements(scope)
            .into_iter()
            .filter(|&node| self.matches(doc, node))
            .collect()
    }
}

// ---- parsing ----

fn parse_selector_list(list: &str, pattern: &str) -> Result<Vec<Vec<SelectorPart>>, SelectorError> {
    split_top_level(list, pattern, |ch| ch == ',')?
        .into_iter()
        .map(|group| {
            let group = group.trim();
            if group.is_empty() {
                return Err(SelectorError::rule(pattern, "empty selector in list"));
            }
            parse_chain(group, pattern)
        })
        .collect()
}

fn parse_chain(selector: &str, pattern: &str) -> Result<Vec<SelectorPart>, SelectorError> {
    let mut parts: Vec<SelectorPart> = Vec::new();
    let mut pending: Option<Combinator> = None;

    for token in tokenize(selector, pattern)? {
        let combinator = match token.as_str() {
            ">" => Some(Combinator::Child),
            "+" => Some(Combinator::AdjacentSibling),
            "~" => Some(Combinator::GeneralSibling),
            _ => None,
        };
        if let Some(combinator) = combinator {
            if pending.is_some() || parts.is_empty() {
                return Err(SelectorError::rule(pattern, "dangling combinator"));
            }
            pending = Some(combinator);
            continue;
        }

        let compound = parse_compound(&token, pattern)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(SelectorPart {
            compound,
            combinator,
        });
    }

    if parts.is_empty() || pending.is_some() {
        return Err(SelectorError::rule(pattern, "dangling combinator"));
    }
    Ok(parts)
}

/// Split on `is_sep` outside brackets, parentheses and quotes.
fn split_top_level(
    s: &str,
    pattern: &str,
    is_sep: impl Fn(char) -> bool,
) -> Result<Vec<String>, SelectorError> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in s.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' | '(' => {
                depth += 1;
                current.push(ch);
            }
            ']' | ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| SelectorError::rule(pattern, format!("unbalanced '{ch}'")))?;
                current.push(ch);
            }
            c if depth == 0 && is_sep(c) => out.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }

    if quote.is_some() {
        return Err(SelectorError::rule(pattern, "unterminated string"));
    }
    if depth != 0 {
        return Err(SelectorError::rule(pattern, "unclosed bracket"));
    }
    out.push(current);
    Ok(out)
}

/// Break a complex selector into compound tokens and combinator tokens.
fn tokenize(selector: &str, pattern: &str) -> Result<Vec<String>, SelectorError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    let flush = |current: &mut String, tokens: &mut Vec<String>| {
        if !current.trim().is_empty() {
            tokens.push(current.trim().to_string());
        }
        current.clear();
    };

    for ch in selector.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' | '(' => {
                depth += 1;
                current.push(ch);
            }
            ']' | ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| SelectorError::rule(pattern, format!("unbalanced '{ch}'")))?;
                current.push(ch);
            }
            '>' | '+' | '~' if depth == 0 => {
                flush(&mut current, &mut tokens);
                tokens.push(ch.to_string());
            }
            c if c.is_whitespace() && depth == 0 => flush(&mut current, &mut tokens),
            _ => current.push(ch),
        }
    }
    flush(&mut current, &mut tokens);
    Ok(tokens)
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii()
}

/// Read an identifier starting at byte `start`; backslash escapes one char.
fn parse_ident(s: &str, start: usize) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut chars = s[start..].char_indices().peekable();
    let mut end = start;
    while let Some(&(offset, ch)) = chars.peek() {
        if ch == '\\' {
            chars.next();
            let (esc_offset, escaped) = chars.next()?;
            out.push(escaped);
            end = start + esc_offset + escaped.len_utf8();
            continue;
        }
        if !is_ident_char(ch) {
            break;
        }
        out.push(ch);
        chars.next();
        end = start + offset + ch.len_utf8();
    }
    if out.is_empty() { None } else { Some((out, end)) }
}

/// Byte index of the delimiter closing the group opened at `open`.
fn find_closing(s: &str, open: usize, open_ch: char, close_ch: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (offset, ch) in s[open..].char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            c if c == open_ch => depth += 1,
            c if c == close_ch => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_compound(token: &str, pattern: &str) -> Result<Compound, SelectorError> {
    let mut compound = Compound::default();
    let bytes = token.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if compound.universal || compound.tag.is_some() || i != 0 {
                    return Err(SelectorError::rule(pattern, "misplaced '*'"));
                }
                compound.universal = true;
                i += 1;
            }
            b'#' => {
                let (id, next) = parse_ident(token, i + 1)
                    .ok_or_else(|| SelectorError::rule(pattern, "expected id after '#'"))?;
                if compound.id.replace(id).is_some() {
                    return Err(SelectorError::rule(pattern, "duplicate id selector"));
                }
                i = next;
            }
            b'.' => {
                let (class, next) = parse_ident(token, i + 1)
                    .ok_or_else(|| SelectorError::rule(pattern, "expected class after '.'"))?;
                compound.classes.push(class);
                i = next;
            }
            b'[' => {
                let close = find_closing(token, i, '[', ']')
                    .ok_or_else(|| SelectorError::rule(pattern, "unclosed attribute selector"))?;
                compound
                    .attrs
                    .push(parse_attr_condition(&token[i + 1..close], pattern)?);
                i = close + 1;
            }
            b':' => {
                let (pseudo, next) = parse_pseudo(token, i, pattern)?;
                compound.pseudos.push(pseudo);
                i = next;
            }
            _ => {
                if i != 0 {
                    return Err(SelectorError::rule(pattern, "type selector must come first"));
                }
                let (tag, next) = parse_ident(token, i)
                    .ok_or_else(|| SelectorError::rule(pattern, "unexpected character"))?;
                compound.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }

    if compound.is_empty() {
        return Err(SelectorError::rule(pattern, "empty compound selector"));
    }
    Ok(compound)
}

fn parse_attr_condition(body: &str, pattern: &str) -> Result<AttrCondition, SelectorError> {
    let body = body.trim();
    let (name, after) = parse_ident(body, 0)
        .ok_or_else(|| SelectorError::rule(pattern, "expected attribute name"))?;
    let name = name.to_ascii_lowercase();
    let rest = body[after..].trim_start();
    if rest.is_empty() {
        return Ok(AttrCondition {
            name,
            op: AttrOp::Exists,
            value: String::new(),
            case_insensitive: false,
        });
    }

    let (op, op_len) = [
        ("~=", AttrOp::Includes),
        ("|=", AttrOp::DashMatch),
        ("^=", AttrOp::Prefix),
        ("$=", AttrOp::Suffix),
        ("*=", AttrOp::Substring),
        ("=", AttrOp::Equals),
    ]
    .into_iter()
    .find(|(tok, _)| rest.starts_with(tok))
    .map(|(tok, op)| (op, tok.len()))
    .ok_or_else(|| SelectorError::rule(pattern, "unknown attribute operator"))?;

    let rest = rest[op_len..].trim_start();
    let (value, flags) = match rest.chars().next() {
        Some(q @ ('"' | '\'')) => {
            let close = rest[1..]
                .find(q)
                .ok_or_else(|| SelectorError::rule(pattern, "unterminated string"))?;
            (rest[1..1 + close].to_string(), rest[close + 2..].trim())
        }
        Some(_) => {
            let (value, next) = parse_ident(rest, 0)
                .ok_or_else(|| SelectorError::rule(pattern, "expected attribute value"))?;
            (value, rest[next..].trim())
        }
        None => return Err(SelectorError::rule(pattern, "expected attribute value")),
    };

    let case_insensitive = match flags {
        "" | "s" | "S" => false,
        "i" | "I" => true,
        _ => return Err(SelectorError::rule(pattern, "unknown attribute flag")),
    };

    Ok(AttrCondition {
        name,
        op,
        value,
        case_insensitive,
    })
}

fn parse_pseudo(token: &str, start: usize, pattern: &str) -> Result<(PseudoClass, usize), SelectorError> {
    if token[start + 1..].starts_with(':') {
        return Err(SelectorError::rule(pattern, "pseudo-elements are not supported"));
    }
    let (name, mut next) = parse_ident(token, start + 1)
        .ok_or_else(|| SelectorError::rule(pattern, "expected pseudo-class name"))?;
    let name = name.to_ascii_lowercase();

    let arg = if token[next..].starts_with('(') {
        let close = find_closing(token, next, '(', ')')
            .ok_or_else(|| SelectorError::rule(pattern, "unclosed '('"))?;
        let arg = &token[next + 1..close];
        next = close + 1;
        Some(arg)
    } else {
        None
    };

    let nth = |arg: Option<&str>| {
        arg.and_then(NthExpression::parse)
            .ok_or_else(|| SelectorError::rule(pattern, format!("invalid :{name}() argument")))
    };

    let pseudo = match (name.as_str(), arg) {
        ("root", None) => PseudoClass::Root,
        ("empty", None) => PseudoClass::Empty,
        ("first-child", None) => PseudoClass::FirstChild,
        ("last-child", None) => PseudoClass::LastChild,
        ("only-child", None) => PseudoClass::OnlyChild,
        ("first-of-type", None) => PseudoClass::FirstOfType,
        ("last-of-type", None) => PseudoClass::LastOfType,
        ("only-of-type", None) => PseudoClass::OnlyOfType,
        ("checked", None) => PseudoClass::Checked,
        ("disabled", None) => PseudoClass::Disabled,
        ("enabled", None) => PseudoClass::Enabled,
        ("nth-child", arg) => PseudoClass::NthChild(nth(arg)?),
        ("nth-last-child", arg) => PseudoClass::NthLastChild(nth(arg)?),
        ("nth-of-type", arg) => PseudoClass::NthOfType(nth(arg)?),
        ("nth-last-of-type", arg) => PseudoClass::NthLastOfType(nth(arg)?),
        ("not", Some(inner)) => PseudoClass::Not(parse_selector_list(inner, pattern)?),
        _ => {
            return Err(SelectorError::rule(
                pattern,
                format!("unsupported pseudo-class ':{name}'"),
            ));
        }
    };
    Ok((pseudo, next))
}

// ---- matching ----

fn matches_chain(doc: &Document, node: NodeId, chain: &[SelectorPart]) -> bool {
    match chain.len() {
        0 => false,
        n => matches_part(doc, node, chain, n - 1),
    }
}

/// Match `chain[..=idx]` with `chain[idx]` anchored at `node`, backtracking
/// over every candidate the combinator allows.
fn matches_part(doc: &Document, node: NodeId, chain: &[SelectorPart], idx: usize) -> bool {
    let part = &chain[idx];
    if !matches_compound(doc, node, &part.compound) {
        return false;
    }
    let Some(combinator) = part.combinator else {
        return true;
    };
    let prev = idx - 1;
    match combinator {
        Combinator::Child => doc
            .parent(node)
            .is_some_and(|parent| matches_part(doc, parent, chain, prev)),
        Combinator::Descendant => doc
            .ancestors(node)
            .into_iter()
            .any(|ancestor| matches_part(doc, ancestor, chain, prev)),
        Combinator::AdjacentSibling => {
            let (siblings, pos) = element_siblings(doc, node);
            pos > 0 && matches_part(doc, siblings[pos - 1], chain, prev)
        }
        Combinator::GeneralSibling => {
            let (siblings, pos) = element_siblings(doc, node);
            siblings[..pos]
                .iter()
                .rev()
                .any(|&sibling| matches_part(doc, sibling, chain, prev))
        }
    }
}

/// Element siblings of `node` (itself included) and its position among them.
fn element_siblings(doc: &Document, node: NodeId) -> (Vec<NodeId>, usize) {
    let siblings = match doc.parent(node) {
        Some(parent) => doc.element_children(parent),
        None => vec![node],
    };
    let pos = siblings.iter().position(|&s| s == node).unwrap_or(0);
    (siblings, pos)
}

fn matches_compound(doc: &Document, node: NodeId, compound: &Compound) -> bool {
    let Some(element) = doc.element(node) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if element.tag != *tag {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if element.get_attr("id") != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|class| element.has_class(class)) {
        return false;
    }
    compound.attrs.iter().all(|cond| matches_attr(doc, node, cond))
        && compound.pseudos.iter().all(|pseudo| matches_pseudo(doc, node, pseudo))
}

fn matches_attr(doc: &Document, node: NodeId, cond: &AttrCondition) -> bool {
    let Some(actual) = doc
        .attributes(node)
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case(&cond.name))
        .map(|a| a.value.as_str())
    else {
        return false;
    };

    let (actual, expected) = if cond.case_insensitive {
        (actual.to_lowercase(), cond.value.to_lowercase())
    } else {
        (actual.to_string(), cond.value.clone())
    };

    match cond.op {
        AttrOp::Exists => true,
        AttrOp::Equals => actual == expected,
        AttrOp::Includes => {
            !expected.is_empty()
                && !expected.contains(char::is_whitespace)
                && actual.split_whitespace().any(|word| word == expected)
        }
        AttrOp::DashMatch => {
            actual == expected || actual.starts_with(&format!("{expected}-"))
        }
        AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
        AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
        AttrOp::Substring => !expected.is_empty() && actual.contains(&expected),
    }
}

const FORM_CONTROLS: &[&str] = &[
    "button", "input", "select", "textarea", "option", "optgroup", "fieldset",
];

fn matches_pseudo(doc: &Document, node: NodeId, pseudo: &PseudoClass) -> bool {
    let tag = doc.tag_name(node).unwrap_or_default();
    match pseudo {
        PseudoClass::Root => doc.parent(node) == Some(doc.root()),
        PseudoClass::Empty => doc.children(node).iter().all(|&child| {
            doc.node(child)
                .is_some_and(|n| matches!(n.kind, NodeKind::Comment(_)))
        }),
        PseudoClass::FirstChild => nth_child(doc, node, false, false) == 1,
        PseudoClass::LastChild => nth_child(doc, node, true, false) == 1,
        PseudoClass::OnlyChild => {
            nth_child(doc, node, false, false) == 1 && nth_child(doc, node, true, false) == 1
        }
        PseudoClass::FirstOfType => nth_child(doc, node, false, true) == 1,
        PseudoClass::LastOfType => nth_child(doc, node, true, true) == 1,
        PseudoClass::OnlyOfType => {
            nth_child(doc, node, false, true) == 1 && nth_child(doc, node, true, true) == 1
        }
        PseudoClass::NthChild(expr) => expr.matches(nth_child(doc, node, false, false)),
        PseudoClass::NthLastChild(expr) => expr.matches(nth_child(doc, node, true, false)),
        PseudoClass::NthOfType(expr) => expr.matches(nth_child(doc, node, false, true)),
        PseudoClass::NthLastOfType(expr) => expr.matches(nth_child(doc, node, true, true)),
        PseudoClass::Checked => match tag {
            "input" => doc.has_attribute(node, "checked"),
            "option" => doc.has_attribute(node, "selected"),
            _ => false,
        },
        PseudoClass::Disabled => FORM_CONTROLS.contains(&tag) && doc.has_attribute(node, "disabled"),
        PseudoClass::Enabled => FORM_CONTROLS.contains(&tag) && !doc.has_attribute(node, "disabled"),
        PseudoClass::Not(groups) => !groups.iter().any(|chain| matches_chain(doc, node, chain)),
    }
}

/// 1-based position among element siblings, optionally counted from the end
/// and optionally restricted to siblings of the same type.
fn nth_child(doc: &Document, node: NodeId, from_end: bool, of_type: bool) -> i64 {
    let (siblings, _) = element_siblings(doc, node);
    let tag = doc.tag_name(node);
    let mut candidates: Vec<NodeId> = siblings
        .into_iter()
        .filter(|&s| !of_type || doc.tag_name(s) == tag)
        .collect();
    if from_end {
        candidates.reverse();
    }
    candidates
        .iter()
        .position(|&s| s == node)
        .map_or(0, |pos| pos as i64 + 1)
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
