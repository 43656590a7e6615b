use super::lexer::{is_reserved, lex, Token};
use crate::Value;

#[derive(Debug, Clone, PartialEq)]
pub(super) struct ColumnRef {
    pub alias: Option<String>,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Operand {
    Column(ColumnRef),
    Literal(Value),
    /// A positional placeholder, numbered left to right over the whole
    /// statement.
    Param(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Expr {
    Compare {
        lhs: Operand,
        op: CmpOp,
        rhs: Operand,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct ProjCol {
    pub source: ColumnRef,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Projection {
    Columns(Vec<ProjCol>),
    Aggregate { function: String, column: String },
    NextVal { sequence: String },
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Join {
    pub table: String,
    pub alias: String,
    pub left: ColumnRef,
    pub right: ColumnRef,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Select {
    pub projection: Projection,
    pub table: String,
    pub alias: Option<String>,
    pub joins: Vec<Join>,
    pub cond: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Statement {
    Select(Select),
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Operand>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Operand)>,
        cond: Option<Expr>,
    },
    Delete {
        table: String,
        cond: Option<Expr>,
    },
}

const AGGREGATES: &[&str] = &["count", "sum", "min", "max", "avg"];

pub(super) fn parse(sql: &str) -> Result<Statement, String> {
    let tokens = lex(sql)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        params: 0,
    };
    let statement = parser.statement()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("trailing input at token {}", parser.pos));
    }
    Ok(statement)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    params: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, String> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| "unexpected end of statement".to_owned())?;
        self.pos += 1;
        Ok(token)
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), String> {
        match self.next()? {
            t if t.is_keyword(keyword) => Ok(()),
            other => Err(format!("expected {keyword}, found {other:?}")),
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<(), String> {
        match self.next()? {
            Token::Symbol(s) if s == symbol => Ok(()),
            other => Err(format!("expected {symbol}, found {other:?}")),
        }
    }

    fn take_symbol(&mut self, symbol: &str) -> bool {
        if matches!(self.peek(), Some(Token::Symbol(s)) if *s == symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn take_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(t) if t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        match self.next()? {
            Token::Ident(word) => Ok(word),
            other => Err(format!("expected an identifier, found {other:?}")),
        }
    }

    fn statement(&mut self) -> Result<Statement, String> {
        if self.take_keyword("select") {
            return Ok(Statement::Select(self.select()?));
        }
        if self.take_keyword("insert") {
            return self.insert();
        }
        if self.take_keyword("update") {
            return self.update();
        }
        if self.take_keyword("delete") {
            return self.delete();
        }
        Err("expected select, insert, update or delete".to_owned())
    }

    fn select(&mut self) -> Result<Select, String> {
        let projection = self.projection()?;
        if let Projection::NextVal { .. } = &projection {
            // Sequence queries have no FROM clause.
            return Ok(Select {
                projection,
                table: String::new(),
                alias: None,
                joins: Vec::new(),
                cond: None,
            });
        }
        self.expect_keyword("from")?;
        let table = self.ident()?;
        let alias = self.optional_alias();
        let mut joins = Vec::new();
        while self.take_keyword("left") {
            self.expect_keyword("join")?;
            let table = self.ident()?;
            let alias = self.ident()?;
            self.expect_keyword("on")?;
            let left = self.column_ref()?;
            self.expect_symbol("=")?;
            let right = self.column_ref()?;
            joins.push(Join {
                table,
                alias,
                left,
                right,
            });
        }
        let cond = if self.take_keyword("where") {
            Some(self.expr()?)
        } else {
            None
        };
        Ok(Select {
            projection,
            table,
            alias,
            joins,
            cond,
        })
    }

    fn optional_alias(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Ident(word)) if !is_reserved(word) => {
                let alias = word.clone();
                self.pos += 1;
                Some(alias)
            }
            _ => None,
        }
    }

    fn projection(&mut self) -> Result<Projection, String> {
        if let Some(Token::Ident(word)) = self.peek() {
            if word.eq_ignore_ascii_case("nextval") {
                self.pos += 1;
                self.expect_symbol("(")?;
                let sequence = match self.next()? {
                    Token::Str(name) => name,
                    other => return Err(format!("expected a sequence name, found {other:?}")),
                };
                self.expect_symbol(")")?;
                return Ok(Projection::NextVal { sequence });
            }
            let aggregate = AGGREGATES.iter().any(|a| word.eq_ignore_ascii_case(a));
            if aggregate && matches!(self.tokens.get(self.pos + 1), Some(Token::Symbol("("))) {
                let function = word.to_ascii_lowercase();
                self.pos += 1;
                self.expect_symbol("(")?;
                let column = self.ident()?;
                self.expect_symbol(")")?;
                return Ok(Projection::Aggregate { function, column });
            }
        }
        let mut columns = Vec::new();
        loop {
            let source = self.column_ref()?;
            let label = if self.take_keyword("as") {
                self.ident()?
            } else {
                source.column.clone()
            };
            columns.push(ProjCol { source, label });
            if !self.take_symbol(",") {
                break;
            }
        }
        Ok(Projection::Columns(columns))
    }

    fn column_ref(&mut self) -> Result<ColumnRef, String> {
        let first = self.ident()?;
        if self.take_symbol(".") {
            let column = self.ident()?;
            Ok(ColumnRef {
                alias: Some(first),
                column,
            })
        } else {
            Ok(ColumnRef {
                alias: None,
                column: first,
            })
        }
    }

    fn operand(&mut self) -> Result<Operand, String> {
        match self.peek().cloned() {
            Some(Token::Symbol("?")) => {
                self.pos += 1;
                let index = self.params;
                self.params += 1;
                Ok(Operand::Param(index))
            }
            Some(Token::Number(text)) => {
                self.pos += 1;
                if text.contains('.') {
                    let parsed: f64 = text
                        .parse()
                        .map_err(|_| format!("bad number literal {text}"))?;
                    Ok(Operand::Literal(Value::Float64(Some(parsed))))
                } else {
                    let parsed: i64 = text
                        .parse()
                        .map_err(|_| format!("bad number literal {text}"))?;
                    Ok(Operand::Literal(Value::Int64(Some(parsed))))
                }
            }
            Some(Token::Str(text)) => {
                self.pos += 1;
                Ok(Operand::Literal(Value::Varchar(Some(text))))
            }
            Some(Token::Ident(_)) => Ok(Operand::Column(self.column_ref()?)),
            other => Err(format!("expected an operand, found {other:?}")),
        }
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.and_expr()?;
        while self.take_keyword("or") {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.primary()?;
        while self.take_keyword("and") {
            let rhs = self.primary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        if self.take_symbol("(") {
            let inner = self.expr()?;
            self.expect_symbol(")")?;
            return Ok(inner);
        }
        let lhs = self.operand()?;
        let op = if self.take_keyword("like") {
            CmpOp::Like
        } else {
            match self.next()? {
                Token::Symbol("=") => CmpOp::Eq,
                Token::Symbol("<>") => CmpOp::Ne,
                Token::Symbol("<") => CmpOp::Lt,
                Token::Symbol("<=") => CmpOp::Le,
                Token::Symbol(">") => CmpOp::Gt,
                Token::Symbol(">=") => CmpOp::Ge,
                other => return Err(format!("expected a comparison, found {other:?}")),
            }
        };
        let rhs = self.operand()?;
        Ok(Expr::Compare { lhs, op, rhs })
    }

    fn insert(&mut self) -> Result<Statement, String> {
        self.expect_keyword("into")?;
        let table = self.ident()?;
        self.expect_symbol("(")?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.ident()?);
            if !self.take_symbol(",") {
                break;
            }
        }
        self.expect_symbol(")")?;
        self.expect_keyword("values")?;
        self.expect_symbol("(")?;
        let mut values = Vec::new();
        loop {
            values.push(self.operand()?);
            if !self.take_symbol(",") {
                break;
            }
        }
        self.expect_symbol(")")?;
        if columns.len() != values.len() {
            return Err(format!(
                "{} columns but {} values",
                columns.len(),
                values.len()
            ));
        }
        Ok(Statement::Insert {
            table,
            columns,
            values,
        })
    }

    fn update(&mut self) -> Result<Statement, String> {
        let table = self.ident()?;
        self.expect_keyword("set")?;
        let mut assignments = Vec::new();
        loop {
            let column = self.ident()?;
            self.expect_symbol("=")?;
            assignments.push((column, self.operand()?));
            if !self.take_symbol(",") {
                break;
            }
        }
        let cond = if self.take_keyword("where") {
            Some(self.expr()?)
        } else {
            None
        };
        Ok(Statement::Update {
            table,
            assignments,
            cond,
        })
    }

    fn delete(&mut self) -> Result<Statement, String> {
        self.expect_keyword("from")?;
        let table = self.ident()?;
        let cond = if self.take_keyword("where") {
            Some(self.expr()?)
        } else {
            None
        };
        Ok(Statement::Delete { table, cond })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_joined_select() {
        let statement = parse(
            "select a.id as aid, b.name as bname from pet a \
             LEFT JOIN person b ON a.owner=b.id where 1=1  AND a.id = ?",
        )
        .unwrap();
        let Statement::Select(select) = statement else {
            panic!("not a select");
        };
        assert_eq!(select.table, "pet");
        assert_eq!(select.alias.as_deref(), Some("a"));
        assert_eq!(select.joins.len(), 1);
        assert_eq!(select.joins[0].alias, "b");
        assert!(select.cond.is_some());
    }

    #[test]
    fn numbers_params_left_to_right() {
        let statement =
            parse("update t set x= ?, y = ?  where id = ?").unwrap();
        let Statement::Update {
            assignments, cond, ..
        } = statement
        else {
            panic!("not an update");
        };
        assert_eq!(assignments[0].1, Operand::Param(0));
        assert_eq!(assignments[1].1, Operand::Param(1));
        match cond {
            Some(Expr::Compare { rhs, .. }) => assert_eq!(rhs, Operand::Param(2)),
            other => panic!("unexpected condition {other:?}"),
        }
    }

    #[test]
    fn recognizes_aggregates_and_sequences() {
        assert!(matches!(
            parse("select COUNT ( id )  from t a").unwrap(),
            Statement::Select(Select {
                projection: Projection::Aggregate { .. },
                ..
            })
        ));
        assert!(matches!(
            parse("select nextval('t_seq')").unwrap(),
            Statement::Select(Select {
                projection: Projection::NextVal { .. },
                ..
            })
        ));
    }
}
