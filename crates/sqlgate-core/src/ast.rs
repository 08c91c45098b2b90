//! Statement-level AST model
//!
//! A closed view over the parser's tree. Statement kinds the rules reason
//! about get their own variant; every other statement lands in `Other`,
//! tagged with its leading keyword. Each variant declares its child slots
//! so the tree can be walked without probing fields.

use serde::{Deserialize, Serialize};

/// Type tags used for statement-level nodes
pub mod node_type {
    pub const USE: &str = "use";
    pub const SELECT: &str = "select";
    pub const REPLACE: &str = "replace";
    pub const INSERT: &str = "insert";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const ALTER: &str = "alter";

    /// Tags the extractor collects by default
    pub const KNOWN: [&str; 7] = [USE, SELECT, REPLACE, INSERT, UPDATE, DELETE, ALTER];
}

/// A statement-level AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Select(SelectNode),
    Insert(InsertNode),
    Replace(InsertNode),
    Update(UpdateNode),
    Delete(DeleteNode),
    Use(UseNode),
    Other(OtherNode),
}

impl Node {
    /// The node's type tag (`select`, `update`, `drop`, ...)
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Select(_) => node_type::SELECT,
            Self::Insert(_) => node_type::INSERT,
            Self::Replace(_) => node_type::REPLACE,
            Self::Update(_) => node_type::UPDATE,
            Self::Delete(_) => node_type::DELETE,
            Self::Use(_) => node_type::USE,
            Self::Other(other) => &other.keyword,
        }
    }

    /// Nested statement nodes held by this node's child slots, in document order
    pub fn children(&self) -> Vec<&Node> {
        let mut children = Vec::new();

        match self {
            Self::Select(select) => {
                children.extend(select.with.iter());
                for column in &select.columns {
                    children.extend(column.expr.subqueries.iter());
                }
                for relation in &select.from {
                    children.extend(relation.subqueries.iter());
                }
                push_expr(&mut children, select.where_clause.as_ref());
                for expr in select.group_by.iter().flatten() {
                    children.extend(expr.subqueries.iter());
                }
                push_expr(&mut children, select.having.as_ref());
                for expr in select.order_by.iter().flatten() {
                    children.extend(expr.subqueries.iter());
                }
                if let Some(limit) = &select.limit {
                    push_expr(&mut children, limit.offset.as_ref());
                    children.extend(limit.count.subqueries.iter());
                }
                if let Some(next) = &select.next {
                    children.push(next.as_ref());
                }
            }
            Self::Insert(insert) | Self::Replace(insert) => {
                children.extend(insert.source.iter());
            }
            Self::Update(update) => {
                for relation in &update.tables {
                    children.extend(relation.subqueries.iter());
                }
                for assignment in &update.assignments {
                    children.extend(assignment.value.subqueries.iter());
                }
                push_expr(&mut children, update.where_clause.as_ref());
            }
            Self::Delete(delete) => {
                for relation in &delete.from {
                    children.extend(relation.subqueries.iter());
                }
                push_expr(&mut children, delete.where_clause.as_ref());
            }
            Self::Use(_) => {}
            Self::Other(other) => {
                children.extend(other.statements.iter());
            }
        }

        children
    }

    /// WHERE clause, for node kinds that can carry one
    pub fn where_clause(&self) -> Option<&Expression> {
        match self {
            Self::Select(select) => select.where_clause.as_ref(),
            Self::Update(update) => update.where_clause.as_ref(),
            Self::Delete(delete) => delete.where_clause.as_ref(),
            _ => None,
        }
    }

    /// Selected column expressions (empty for non-select nodes)
    pub fn columns(&self) -> &[SelectColumn] {
        match self {
            Self::Select(select) => &select.columns,
            _ => &[],
        }
    }

    pub fn as_select(&self) -> Option<&SelectNode> {
        match self {
            Self::Select(select) => Some(select),
            _ => None,
        }
    }
}

fn push_expr<'a>(children: &mut Vec<&'a Node>, expr: Option<&'a Expression>) {
    if let Some(expr) = expr {
        children.extend(expr.subqueries.iter());
    }
}

/// SELECT query, including the clauses attached at query level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectNode {
    /// Common table expressions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub with: Vec<Node>,

    pub columns: Vec<SelectColumn>,

    #[serde(default)]
    pub from: Vec<Relation>,

    #[serde(rename = "where", default)]
    pub where_clause: Option<Expression>,

    /// `Some(vec![])` for `GROUP BY ALL`
    #[serde(rename = "groupby", default)]
    pub group_by: Option<Vec<Expression>>,

    #[serde(default)]
    pub having: Option<Expression>,

    #[serde(rename = "orderby", default)]
    pub order_by: Option<Vec<Expression>>,

    #[serde(default)]
    pub limit: Option<LimitClause>,

    /// Next query of a UNION / INTERSECT / EXCEPT chain
    #[serde(rename = "_next", default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<Node>>,
}

impl SelectNode {
    pub fn has_group_by(&self) -> bool {
        self.group_by.is_some()
    }

    pub fn has_order_by(&self) -> bool {
        self.order_by.is_some()
    }
}

/// LIMIT clause. For `LIMIT offset, count` the count lands in `count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitClause {
    pub count: Expression,

    #[serde(default)]
    pub offset: Option<Expression>,
}

impl LimitClause {
    /// Row count as an integer, when it is a plain numeric literal
    pub fn count_value(&self) -> Option<u64> {
        self.count.as_u64()
    }
}

/// One item of a SELECT list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectColumn {
    pub expr: Expression,

    #[serde(rename = "as", default)]
    pub alias: Option<String>,
}

/// A FROM item with its joins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Canonical SQL of the item
    pub sql: String,

    /// Plain tables referenced by the item
    #[serde(default)]
    pub tables: Vec<String>,

    /// Derived tables and subqueries in join conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subqueries: Vec<Node>,
}

/// INSERT or REPLACE statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertNode {
    pub table: String,

    #[serde(default)]
    pub columns: Vec<String>,

    /// Source SELECT and subqueries inside VALUES rows
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source: Vec<Node>,
}

/// UPDATE statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateNode {
    pub tables: Vec<Relation>,

    #[serde(rename = "set")]
    pub assignments: Vec<Assignment>,

    #[serde(rename = "where", default)]
    pub where_clause: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: String,
    pub value: Expression,
}

/// DELETE statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteNode {
    /// Explicit multi-table targets (`DELETE t1, t2 FROM ...`)
    #[serde(default)]
    pub tables: Vec<String>,

    pub from: Vec<Relation>,

    #[serde(rename = "where", default)]
    pub where_clause: Option<Expression>,
}

/// USE statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UseNode {
    pub db: String,
}

/// Any statement without a dedicated variant (DROP, ALTER, SHOW, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherNode {
    /// Lower-case leading keyword, used as the type tag
    pub keyword: String,

    pub sql: String,

    /// Statements nested inside (EXPLAIN target, CREATE ... AS SELECT)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statements: Vec<Node>,
}

/// An expression, reduced to what the rules look at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// Canonical SQL of the expression
    pub sql: String,

    pub kind: ExprKind,

    /// Statement nodes nested inside the expression
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subqueries: Vec<Node>,
}

impl Expression {
    pub fn new(sql: impl Into<String>, kind: ExprKind) -> Self {
        Self {
            sql: sql.into(),
            kind,
            subqueries: Vec::new(),
        }
    }

    pub fn with_subqueries(mut self, subqueries: Vec<Node>) -> Self {
        self.subqueries = subqueries;
        self
    }

    /// Function name, if this expression is a function call
    pub fn function_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Function { name } => Some(name),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match &self.kind {
            ExprKind::Number { value } => value.parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExprKind {
    Column {
        table: Option<String>,
        name: String,
    },
    Function {
        name: String,
    },
    Number {
        value: String,
    },
    Literal,
    Wildcard,
    /// Operators, CASE, subqueries and everything else
    Compound,
}
