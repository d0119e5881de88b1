use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;
use tracing::debug;

use crate::ast::{BinaryOp, ByIndex, Compound, GetAttr, Literal, Node, Program, Var, VarName};
use crate::parser::error::{ParseError, ParseErrorKind, convert_pest_error};
use crate::parser::syntax::Span;

/// Default maximum nesting depth.
///
/// Blocks, parentheses, arrays, calls and `else if` links each count one
/// level, as does every operator in a chain (`1 + 2 + 3` is two levels) and
/// every unary minus. The evaluator recurses once per level, so this also
/// bounds its stack use.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Parser)]
#[grammar = "parser/script.pest"]
pub struct ScriptParser;

/// Parse a script into a [`Program`].
pub fn parse(source: &str) -> Result<Program, ParseError> {
    parse_with_max_depth(source, DEFAULT_MAX_DEPTH)
}

/// Parse a script, failing with `MaxDepthExceeded` when nesting goes beyond
/// `max_depth` levels.
pub fn parse_with_max_depth(source: &str, max_depth: usize) -> Result<Program, ParseError> {
    check_nesting(source, max_depth)?;
    let mut pairs =
        ScriptParser::parse(Rule::program, source).map_err(|e| convert_pest_error(e, source))?;
    let Some(root) = pairs.next() else {
        return Err(ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected: "program".to_string(),
                found: "nothing".to_string(),
            },
            source,
            Span::new(0, 0),
        ));
    };

    let program = Builder::new(source, max_depth).program(root)?;
    debug!(statements = program.stmts.len(), "parsed script");
    Ok(program)
}

/// Rejects bracket nesting deeper than `max_depth` before pest sees the
/// source, since its recursive descent uses stack for every open bracket.
/// The builder charges at least one level per bracket, so this never
/// rejects a script the builder would accept.
fn check_nesting(source: &str, max_depth: usize) -> Result<(), ParseError> {
    let mut depth = 0usize;
    let mut quote = None;
    let mut chars = source.char_indices();
    while let Some((offset, c)) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '#' => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' | '[' | '{' => {
                depth += 1;
                if depth > max_depth {
                    return Err(ParseError::new(
                        ParseErrorKind::MaxDepthExceeded { max_depth },
                        source,
                        Span::new(offset, offset + 1),
                    ));
                }
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

/// Folds the pest parse tree into the AST.
struct Builder<'s> {
    source: &'s str,
    max_depth: usize,
    depth: usize,
}

impl<'s> Builder<'s> {
    fn new(source: &'s str, max_depth: usize) -> Self {
        Self {
            source,
            max_depth,
            depth: 0,
        }
    }

    fn error(&self, kind: ParseErrorKind, pair: &Pair<'_, Rule>) -> ParseError {
        ParseError::new(kind, self.source, pair.as_span().into())
    }

    fn missing(&self, span: pest::Span<'_>, expected: &str) -> ParseError {
        ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: "nothing".to_string(),
            },
            self.source,
            span.into(),
        )
    }

    fn program(&mut self, pair: Pair<'_, Rule>) -> Result<Program, ParseError> {
        let stmts = self.statements(pair.into_inner())?;
        Ok(Program { stmts })
    }

    fn statements(&mut self, pairs: Pairs<'_, Rule>) -> Result<Vec<Node>, ParseError> {
        pairs
            .filter(|p| p.as_rule() != Rule::EOI)
            .map(|p| self.statement(p))
            .collect()
    }

    fn statement(&mut self, pair: Pair<'_, Rule>) -> Result<Node, ParseError> {
        match pair.as_rule() {
            Rule::if_stmt => self.if_stmt(pair),
            Rule::while_stmt => {
                let span = pair.as_span();
                let mut inner = without_keywords(pair.into_inner());
                let cond = self.next_cond(span, &mut inner)?;
                let compound = self.next_compound(span, &mut inner)?;
                Ok(Node::While {
                    cond: Box::new(cond),
                    compound,
                })
            }
            Rule::assign => {
                let span = pair.as_span();
                let mut inner = pair.into_inner();
                let name = inner
                    .next()
                    .ok_or_else(|| self.missing(span, "identifier"))?
                    .as_str()
                    .to_string();
                let value = self.next_cond(span, &mut inner)?;
                Ok(Node::Assign {
                    variable: Var::ident(name),
                    value: Box::new(value),
                })
            }
            Rule::attr_assign => self.attr_assign(pair),
            _ => self.cond(pair),
        }
    }

    fn attr_assign(&mut self, pair: Pair<'_, Rule>) -> Result<Node, ParseError> {
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let target = inner
            .next()
            .ok_or_else(|| self.missing(span, "attribute path"))?;
        let path = ident_path(&target);
        let [parent, child] = <[String; 2]>::try_from(path).map_err(|_| {
            self.error(
                ParseErrorKind::NestedAttributeAssignment {
                    target: target.as_str().to_string(),
                },
                &target,
            )
        })?;
        let value = self.next_cond(span, &mut inner)?;
        Ok(Node::SetAttr {
            parent,
            child,
            value: Box::new(value),
        })
    }

    fn if_stmt(&mut self, pair: Pair<'_, Rule>) -> Result<Node, ParseError> {
        let span = pair.as_span();
        let mut inner = without_keywords(pair.into_inner());
        let cond = self.next_cond(span, &mut inner)?;
        let compound = self.next_compound(span, &mut inner)?;

        // Each `else if` nests its `If` inside the previous else block, one
        // level deeper than the link before it.
        let mut links = Vec::new();
        let mut else_ = None;
        let built = self.else_chain(inner, &mut links, &mut else_);
        self.depth -= links.len();
        built?;

        for (link_cond, link_compound) in links.into_iter().rev() {
            else_ = Some(Compound {
                stmts: vec![Node::If {
                    cond: Box::new(link_cond),
                    compound: link_compound,
                    else_,
                }],
            });
        }
        Ok(Node::If {
            cond: Box::new(cond),
            compound,
            else_,
        })
    }

    /// Builds the `else if` links and the trailing `else` block. Leaves
    /// `self.depth` raised by one per link pushed onto `links`.
    fn else_chain<'i>(
        &mut self,
        clauses: impl Iterator<Item = Pair<'i, Rule>>,
        links: &mut Vec<(Node, Compound)>,
        else_: &mut Option<Compound>,
    ) -> Result<(), ParseError> {
        for clause in clauses {
            let span = clause.as_span();
            if clause.as_rule() != Rule::else_if {
                let mut inner = without_keywords(clause.into_inner());
                *else_ = Some(self.next_compound(span, &mut inner)?);
                continue;
            }
            self.descend(&clause)?;
            let mut inner = without_keywords(clause.into_inner());
            let link = match self.next_cond(span, &mut inner) {
                Ok(cond) => self
                    .next_compound(span, &mut inner)
                    .map(|compound| (cond, compound)),
                Err(e) => Err(e),
            };
            match link {
                Ok(link) => links.push(link),
                Err(e) => {
                    self.depth -= 1;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn compound(&mut self, pair: Pair<'_, Rule>) -> Result<Compound, ParseError> {
        self.descend(&pair)?;
        let stmts = self.statements(pair.into_inner());
        self.depth -= 1;
        Ok(Compound { stmts: stmts? })
    }

    fn next_compound<'i>(
        &mut self,
        span: pest::Span<'i>,
        pairs: &mut impl Iterator<Item = Pair<'i, Rule>>,
    ) -> Result<Compound, ParseError> {
        let pair = pairs.next().ok_or_else(|| self.missing(span, "block"))?;
        self.compound(pair)
    }

    fn next_cond<'i>(
        &mut self,
        span: pest::Span<'i>,
        pairs: &mut impl Iterator<Item = Pair<'i, Rule>>,
    ) -> Result<Node, ParseError> {
        let pair = pairs.next().ok_or_else(|| self.missing(span, "expression"))?;
        self.cond(pair)
    }

    fn descend(&mut self, pair: &Pair<'_, Rule>) -> Result<(), ParseError> {
        self.descend_by(pair, 1)
    }

    fn descend_by(&mut self, pair: &Pair<'_, Rule>, levels: usize) -> Result<(), ParseError> {
        if self.depth + levels > self.max_depth {
            return Err(self.error(
                ParseErrorKind::MaxDepthExceeded {
                    max_depth: self.max_depth,
                },
                pair,
            ));
        }
        self.depth += levels;
        Ok(())
    }

    /// `cond`, `expr` and `term` share one shape: operands separated by
    /// operators, folded left-associatively.
    fn cond(&mut self, pair: Pair<'_, Rule>) -> Result<Node, ParseError> {
        self.descend(&pair)?;
        let node = self.binary(pair);
        self.depth -= 1;
        node
    }

    /// Every operator in the chain adds one level to the folded tree, so
    /// the whole chain is charged before any operand is built.
    fn binary(&mut self, pair: Pair<'_, Rule>) -> Result<Node, ParseError> {
        let folds = pair.clone().into_inner().count() / 2;
        self.descend_by(&pair, folds)?;
        let node = self.fold(pair);
        self.depth -= folds;
        node
    }

    fn fold(&mut self, pair: Pair<'_, Rule>) -> Result<Node, ParseError> {
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let first = inner.next().ok_or_else(|| self.missing(span, "expression"))?;
        let mut node = self.operand(first)?;
        while let (Some(sign), Some(right)) = (inner.next(), inner.next()) {
            let op = BinaryOp::from_sign(sign.as_str()).ok_or_else(|| {
                self.error(
                    ParseErrorKind::UnexpectedToken {
                        expected: "operator".to_string(),
                        found: format!("'{}'", sign.as_str()),
                    },
                    &sign,
                )
            })?;
            let right = self.operand(right)?;
            node = Node::op(node, op, right);
        }
        Ok(node)
    }

    fn operand(&mut self, pair: Pair<'_, Rule>) -> Result<Node, ParseError> {
        match pair.as_rule() {
            Rule::expr | Rule::term => self.binary(pair),
            Rule::factor => self.factor(pair),
            _ => self.atom(pair),
        }
    }

    fn factor(&mut self, pair: Pair<'_, Rule>) -> Result<Node, ParseError> {
        let span = pair.as_span();
        let mut inner = pair.clone().into_inner().peekable();
        let negated = inner.next_if(|p| p.as_rule() == Rule::neg).is_some();
        let atom = inner.next().ok_or_else(|| self.missing(span, "expression"))?;
        if !negated {
            return self.atom(atom);
        }
        self.descend(&pair)?;
        let atom = self.atom(atom);
        self.depth -= 1;
        Ok(Node::op(Node::int(-1), BinaryOp::Mul, atom?))
    }

    fn atom(&mut self, pair: Pair<'_, Rule>) -> Result<Node, ParseError> {
        match pair.as_rule() {
            Rule::integer => {
                let value = pair.as_str().parse().map_err(|_| {
                    self.error(
                        ParseErrorKind::InvalidNumber {
                            text: pair.as_str().to_string(),
                        },
                        &pair,
                    )
                })?;
                Ok(Node::Literal(Literal::Int(value)))
            }
            Rule::float => {
                let value = pair.as_str().parse().map_err(|_| {
                    self.error(
                        ParseErrorKind::InvalidNumber {
                            text: pair.as_str().to_string(),
                        },
                        &pair,
                    )
                })?;
                Ok(Node::Literal(Literal::Float(value)))
            }
            Rule::string => {
                let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
                Ok(Node::Literal(Literal::Str(unescape(raw))))
            }
            Rule::array => {
                self.descend(&pair)?;
                let items = pair
                    .into_inner()
                    .map(|p| self.cond(p))
                    .collect::<Result<Vec<_>, _>>();
                self.depth -= 1;
                Ok(Node::Array(items?))
            }
            Rule::call => {
                self.descend(&pair)?;
                let call = self.call(pair);
                self.depth -= 1;
                call
            }
            Rule::byindex => Ok(Node::ByIndex(self.byindex(pair)?)),
            Rule::attr => Ok(Node::GetAttr(GetAttr {
                path: ident_path(&pair),
            })),
            Rule::var => Ok(Node::var(pair.as_str())),
            Rule::cond => self.cond(pair),
            rule => Err(self.error(
                ParseErrorKind::UnexpectedToken {
                    expected: "expression".to_string(),
                    found: format!("{:?}", rule),
                },
                &pair,
            )),
        }
    }

    fn byindex(&mut self, pair: Pair<'_, Rule>) -> Result<ByIndex, ParseError> {
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let name = inner
            .next()
            .ok_or_else(|| self.missing(span, "identifier"))?
            .as_str()
            .to_string();
        let indices = inner.map(|p| self.cond(p)).collect::<Result<_, _>>()?;
        Ok(ByIndex { name, indices })
    }

    fn call(&mut self, pair: Pair<'_, Rule>) -> Result<Node, ParseError> {
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let target = inner
            .next()
            .and_then(|callee| callee.into_inner().next())
            .ok_or_else(|| self.missing(span, "function name"))?;
        let function = if target.as_rule() == Rule::attr {
            Var {
                name: VarName::Attr(GetAttr {
                    path: ident_path(&target),
                }),
            }
        } else {
            Var::ident(target.as_str())
        };

        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Node)> = Vec::new();
        for argument in inner {
            if argument.as_rule() == Rule::kwarg {
                let kw_span = argument.as_span();
                let mut parts = argument.clone().into_inner();
                let name = parts
                    .next()
                    .ok_or_else(|| self.missing(kw_span, "keyword"))?
                    .as_str()
                    .to_string();
                if kwargs.iter().any(|(existing, _)| *existing == name) {
                    return Err(self.error(ParseErrorKind::DuplicateKeyword { name }, &argument));
                }
                let value = self.next_cond(kw_span, &mut parts)?;
                kwargs.push((name, value));
            } else if !kwargs.is_empty() {
                return Err(self.error(ParseErrorKind::PositionalAfterKeyword, &argument));
            } else {
                args.push(self.cond(argument)?);
            }
        }

        Ok(Node::Call {
            function: Box::new(Node::Var(function)),
            args,
            kwargs,
        })
    }
}

fn without_keywords<'i>(pairs: Pairs<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    pairs.filter(|p| !matches!(p.as_rule(), Rule::kw_if | Rule::kw_else | Rule::kw_while))
}

fn ident_path(pair: &Pair<'_, Rule>) -> Vec<String> {
    pair.clone()
        .into_inner()
        .map(|p| p.as_str().to_string())
        .collect()
}

/// Decode backslash escapes in a string literal body.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r#"say \"hi\""#), "say \"hi\"");
        assert_eq!(unescape(r"it\'s"), "it's");
        assert_eq!(unescape(r"back\\slash"), "back\\slash");
        assert_eq!(unescape("plain"), "plain");
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(parse("").unwrap(), Program { stmts: vec![] });
        assert_eq!(parse("  # only a comment\n").unwrap(), Program { stmts: vec![] });
    }

    #[test]
    fn test_parse_is_idempotent() {
        let source = "i = 0 while i < 10 { i = i + 1 } say(str(i), sep=',')";
        assert_eq!(parse(source).unwrap(), parse(source).unwrap());
    }
}
