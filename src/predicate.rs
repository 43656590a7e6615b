use crate::Value;

/// Comparison operators usable in an atomic predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Like,
}

impl Operator {
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Like => "LIKE",
        }
    }
}

enum Node {
    Atom {
        column: String,
        operator: Operator,
        value: Value,
    },
    /// A sub clause folded in as a unit, keeping its own grouping.
    Group(Box<Node>),
    Binary {
        conjunction: &'static str,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
}

impl Node {
    fn render(&self, prefix: &str, out: &mut String) {
        match self {
            Node::Atom {
                column, operator, ..
            } => {
                out.push_str(prefix);
                out.push_str(column);
                out.push(' ');
                out.push_str(operator.sql());
                out.push_str(" ?");
            }
            Node::Group(inner) => {
                out.push('(');
                inner.render(prefix, out);
                out.push(')');
            }
            Node::Binary {
                conjunction,
                lhs,
                rhs,
            } => {
                out.push('(');
                lhs.render(prefix, out);
                out.push(' ');
                out.push_str(conjunction);
                out.push(' ');
                rhs.render(prefix, out);
                out.push(')');
            }
        }
    }

    fn collect<'a>(&'a self, params: &mut Vec<&'a Value>) {
        match self {
            Node::Atom { value, .. } => params.push(value),
            Node::Group(inner) => inner.collect(params),
            Node::Binary { lhs, rhs, .. } => {
                lhs.collect(params);
                rhs.collect(params);
            }
        }
    }
}

/// A boolean restriction over the rows of a select.
///
/// The tree renders to SQL text with positional placeholders and hands
/// out its literal values in the same left to right, depth first order
/// the text visits them, so text and parameters can never disagree.
///
/// ```
/// # use strata::{Operator, Where};
/// let clause = Where::new("x", Operator::Equal, 1i64)
///     .and("y", Operator::Equal, "s")
///     .or_where(Where::new("z", Operator::Equal, 2i64));
/// assert_eq!(clause.render("a."), "((a.x = ? AND a.y = ?) OR (a.z = ?))");
/// ```
pub struct Where {
    root: Option<Node>,
}

impl Where {
    /// A clause that matches everything and renders to nothing.
    pub fn empty() -> Self {
        Self { root: None }
    }

    pub fn new(column: &str, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            root: Some(Node::Atom {
                column: column.to_owned(),
                operator,
                value: value.into(),
            }),
        }
    }

    fn join(mut self, conjunction: &'static str, rhs: Node) -> Self {
        self.root = Some(match self.root {
            Some(lhs) => Node::Binary {
                conjunction,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            None => rhs,
        });
        self
    }

    pub fn and(self, column: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.join(
            "AND",
            Node::Atom {
                column: column.to_owned(),
                operator,
                value: value.into(),
            },
        )
    }

    pub fn or(self, column: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.join(
            "OR",
            Node::Atom {
                column: column.to_owned(),
                operator,
                value: value.into(),
            },
        )
    }

    /// Conjoin a whole sub clause, preserving its grouping.
    pub fn and_where(self, other: Where) -> Self {
        match other.root {
            Some(node) => self.join("AND", Node::Group(Box::new(node))),
            None => self,
        }
    }

    pub fn or_where(self, other: Where) -> Self {
        match other.root {
            Some(node) => self.join("OR", Node::Group(Box::new(node))),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The SQL text of this clause with every column qualified by the
    /// given prefix. The empty clause renders to an empty string.
    pub fn render(&self, prefix: &str) -> String {
        let mut out = String::new();
        if let Some(root) = &self.root {
            root.render(prefix, &mut out);
        }
        out
    }

    /// The literal values of the atoms, in rendering order.
    pub fn params(&self) -> Vec<Value> {
        let mut refs = Vec::new();
        if let Some(root) = &self.root {
            root.collect(&mut refs);
        }
        refs.into_iter().cloned().collect()
    }
}
