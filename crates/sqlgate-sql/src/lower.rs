//! Lowering of sqlparser statements into the statement-node model
//!
//! Clauses the rules inspect are lowered explicitly. Everything else is
//! scanned with the sqlparser visitor, which yields the queries nested one
//! level down, the plain relations, and the column identifiers of a clause.

use std::ops::ControlFlow;

use sqlparser::ast::{
    Expr, FromTable, GroupByExpr, ObjectName, Query, Select, SelectItem, SetExpr,
    Statement as SqlStatement, TableWithJoins, Value, Visit, Visitor,
};
use sqlgate_core::{
    node_type, Assignment, DeleteNode, ExprKind, Expression, InsertNode, LimitClause, Node,
    OtherNode, Relation, SelectColumn, SelectNode, UpdateNode, UseNode,
};

const WILDCARD_COLUMN: &str = "(.*)";
const NO_QUALIFIER: &str = "null";
const INTROSPECTION_KEYWORDS: [&str; 2] = ["desc", "show"];

/// Lowers one statement and records its table and column references
#[derive(Debug, Default)]
pub(crate) struct Lowerer {
    tables: Vec<String>,
    columns: Vec<String>,
}

/// What a visitor scan found directly inside a clause
struct Scan {
    nodes: Vec<Node>,
    relations: Vec<String>,
}

/// ORDER BY and LIMIT live on the query, not on the SELECT body
struct QueryClauses {
    order_by: Option<Vec<Expression>>,
    limit: Option<LimitClause>,
}

impl Lowerer {
    /// Consume the lowerer, returning `(table_list, column_list)`
    pub(crate) fn finish(self) -> (Vec<String>, Vec<String>) {
        (self.tables, self.columns)
    }

    pub(crate) fn lower_statement(&mut self, statement: &SqlStatement) -> Node {
        match statement {
            SqlStatement::Query(query) => {
                let mut nodes = self.lower_query(query);
                if nodes.len() == 1 {
                    nodes.remove(0)
                } else {
                    // VALUES or TABLE bodies
                    self.other(statement, nodes)
                }
            }
            SqlStatement::Insert(insert) => {
                let tag = if insert.replace_into {
                    node_type::REPLACE
                } else {
                    node_type::INSERT
                };

                // The target is the only relation outside the source query
                let scan = self.scan(tag, statement);
                let table = scan.relations.first().cloned().unwrap_or_default();
                let columns: Vec<String> =
                    insert.columns.iter().map(|ident| ident.value.clone()).collect();
                for column in &columns {
                    self.record_column(tag, Some(table.as_str()), column);
                }

                let insert = InsertNode {
                    table,
                    columns,
                    source: scan.nodes,
                };

                if tag == node_type::REPLACE {
                    Node::Replace(insert)
                } else {
                    Node::Insert(insert)
                }
            }
            SqlStatement::Update {
                table,
                assignments,
                from,
                selection,
                ..
            } => {
                let mut tables = vec![self.lower_relation(node_type::UPDATE, table)];
                let target = tables[0].tables.first().cloned();
                tables.extend(
                    from.iter()
                        .map(|relation| self.lower_relation(node_type::UPDATE, relation)),
                );

                let assignments = assignments
                    .iter()
                    .map(|assignment| {
                        let column = assignment.target.to_string();
                        self.record_column_path(node_type::UPDATE, target.as_deref(), &column);

                        Assignment {
                            column,
                            value: self.lower_expr(node_type::UPDATE, &assignment.value),
                        }
                    })
                    .collect();

                Node::Update(UpdateNode {
                    tables,
                    assignments,
                    where_clause: selection
                        .as_ref()
                        .map(|expr| self.lower_expr(node_type::UPDATE, expr)),
                })
            }
            SqlStatement::Delete(delete) => {
                let from = match &delete.from {
                    FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
                };

                let tables: Vec<String> = delete.tables.iter().map(object_name).collect();
                for table in &tables {
                    self.record_table(node_type::DELETE, table);
                }

                // USING relations join into the FROM list
                let using = delete.using.iter().flatten();

                Node::Delete(DeleteNode {
                    tables,
                    from: from
                        .iter()
                        .chain(using)
                        .map(|relation| self.lower_relation(node_type::DELETE, relation))
                        .collect(),
                    where_clause: delete
                        .selection
                        .as_ref()
                        .map(|expr| self.lower_expr(node_type::DELETE, expr)),
                })
            }
            SqlStatement::Use { .. } => Node::Use(UseNode {
                db: strip_keyword(&statement.to_string(), "USE"),
            }),
            SqlStatement::Explain { statement: inner, .. } => {
                let nested = vec![self.lower_statement(inner)];
                self.other(statement, nested)
            }
            _ => {
                let keyword = leading_keyword(statement);
                // Introspection reads metadata only and references no tables
                if INTROSPECTION_KEYWORDS.contains(&keyword.as_str()) {
                    return self.other(statement, Vec::new());
                }

                let scan = self.scan(&keyword, statement);

                match statement {
                    SqlStatement::Drop { names, .. } => {
                        for name in names {
                            self.record_table(&keyword, &object_name(name));
                        }
                    }
                    SqlStatement::AlterTable { name, .. } => {
                        self.record_table(&keyword, &object_name(name));
                    }
                    SqlStatement::LockTables { tables } => {
                        for lock in tables {
                            self.record_table(&keyword, &lock.table.value);
                        }
                    }
                    _ => {}
                }

                // A statement naming no table still carries its kind
                let prefix = format!("{}::", keyword);
                if !self.tables.iter().any(|table| table.starts_with(&prefix)) {
                    push_unique(
                        &mut self.tables,
                        format!("{}::{}::{}", keyword, NO_QUALIFIER, NO_QUALIFIER),
                    );
                }

                self.other(statement, scan.nodes)
            }
        }
    }

    fn other(&mut self, statement: &SqlStatement, statements: Vec<Node>) -> Node {
        Node::Other(OtherNode {
            keyword: leading_keyword(statement),
            sql: statement.to_string(),
            statements,
        })
    }

    /// Lower a query. Usually yields one SELECT node; VALUES bodies yield
    /// the subqueries found in their rows.
    fn lower_query(&mut self, query: &Query) -> Vec<Node> {
        let with: Vec<Node> = query
            .with
            .iter()
            .flat_map(|with| with.cte_tables.iter())
            .flat_map(|cte| self.lower_query(&cte.query))
            .collect();

        let mut nodes = self.lower_set_expr(&query.body);

        let clauses = QueryClauses {
            order_by: query.order_by.as_ref().map(|order_by| {
                let scan = self.scan(node_type::SELECT, order_by);
                vec![Expression::new(order_by.to_string(), ExprKind::Compound)
                    .with_subqueries(scan.nodes)]
            }),
            limit: query.limit.as_ref().map(|count| LimitClause {
                count: self.lower_expr(node_type::SELECT, count),
                offset: query
                    .offset
                    .as_ref()
                    .map(|offset| self.lower_expr(node_type::SELECT, &offset.value)),
            }),
        };

        if !matches!(nodes.first(), Some(Node::Select(_))) {
            return with.into_iter().chain(nodes).collect();
        }

        if let Some(Node::Select(head)) = nodes.first_mut() {
            let mut ctes = with;
            ctes.append(&mut head.with);
            head.with = ctes;

            if head.order_by.is_none() {
                head.order_by = clauses.order_by;
            }
            if head.limit.is_none() {
                head.limit = clauses.limit;
            }
        }
        nodes
    }

    fn lower_set_expr(&mut self, body: &SetExpr) -> Vec<Node> {
        match body {
            SetExpr::Select(select) => vec![Node::Select(self.lower_select(select))],
            SetExpr::Query(query) => self.lower_query(query),
            SetExpr::SetOperation { left, right, .. } => {
                let mut nodes = self.lower_set_expr(left);
                let rest = self.lower_set_expr(right);

                for node in rest {
                    let unchained = match nodes.first_mut() {
                        Some(Node::Select(head)) => chain(head, node),
                        _ => Some(node),
                    };
                    nodes.extend(unchained);
                }
                nodes
            }
            SetExpr::Insert(statement) | SetExpr::Update(statement) => {
                vec![self.lower_statement(statement)]
            }
            other => self.scan(node_type::SELECT, other).nodes,
        }
    }

    fn lower_select(&mut self, select: &Select) -> SelectNode {
        let columns = select
            .projection
            .iter()
            .map(|item| self.lower_select_item(item))
            .collect();

        let from = select
            .from
            .iter()
            .map(|relation| self.lower_relation(node_type::SELECT, relation))
            .collect();

        let where_clause = select
            .selection
            .as_ref()
            .map(|expr| self.lower_expr(node_type::SELECT, expr));

        let group_by = match &select.group_by {
            GroupByExpr::All(_) => Some(Vec::new()),
            GroupByExpr::Expressions(exprs, _) if exprs.is_empty() => None,
            GroupByExpr::Expressions(exprs, _) => Some(
                exprs
                    .iter()
                    .map(|expr| self.lower_expr(node_type::SELECT, expr))
                    .collect(),
            ),
        };

        let having = select
            .having
            .as_ref()
            .map(|expr| self.lower_expr(node_type::SELECT, expr));

        SelectNode {
            with: Vec::new(),
            columns,
            from,
            where_clause,
            group_by,
            having,
            order_by: None,
            limit: None,
            next: None,
        }
    }

    fn lower_select_item(&mut self, item: &SelectItem) -> SelectColumn {
        match item {
            SelectItem::UnnamedExpr(expr) => SelectColumn {
                expr: self.lower_expr(node_type::SELECT, expr),
                alias: None,
            },
            SelectItem::ExprWithAlias { expr, alias } => SelectColumn {
                expr: self.lower_expr(node_type::SELECT, expr),
                alias: Some(alias.value.clone()),
            },
            SelectItem::Wildcard(_) => {
                self.record_column(node_type::SELECT, None, WILDCARD_COLUMN);
                SelectColumn {
                    expr: Expression::new("*", ExprKind::Wildcard),
                    alias: None,
                }
            }
            SelectItem::QualifiedWildcard(..) => {
                let sql = item.to_string();
                let qualifier = sql.split(".*").next().map(unquote);
                self.record_column(node_type::SELECT, qualifier.as_deref(), WILDCARD_COLUMN);
                SelectColumn {
                    expr: Expression::new(sql, ExprKind::Wildcard),
                    alias: None,
                }
            }
            #[allow(unreachable_patterns)]
            other => {
                let scan = self.scan(node_type::SELECT, other);
                SelectColumn {
                    expr: Expression::new(other.to_string(), ExprKind::Compound)
                        .with_subqueries(scan.nodes),
                    alias: None,
                }
            }
        }
    }

    fn lower_relation(&mut self, tag: &str, relation: &TableWithJoins) -> Relation {
        let scan = self.scan(tag, relation);

        Relation {
            sql: relation.to_string(),
            tables: scan.relations,
            subqueries: scan.nodes,
        }
    }

    fn lower_expr(&mut self, tag: &str, expr: &Expr) -> Expression {
        let scan = self.scan(tag, expr);
        Expression::new(expr.to_string(), expr_kind(expr)).with_subqueries(scan.nodes)
    }

    /// Visit `value`, lowering queries found one level down and recording
    /// relations and identifiers that are not inside those queries
    fn scan<T: Visit>(&mut self, tag: &str, value: &T) -> Scan {
        let mut scanner = Scanner {
            lowerer: self,
            tag,
            depth: 0,
            nodes: Vec::new(),
            relations: Vec::new(),
        };
        let _ = value.visit(&mut scanner);

        Scan {
            nodes: scanner.nodes,
            relations: scanner.relations,
        }
    }

    fn record_table(&mut self, tag: &str, name: &str) {
        let parts: Vec<String> = name.split('.').map(unquote).collect();
        let (schema, table) = match parts.as_slice() {
            [.., schema, table] => (schema.as_str(), table.as_str()),
            [table] => (NO_QUALIFIER, table.as_str()),
            [] => return,
        };
        push_unique(&mut self.tables, format!("{}::{}::{}", tag, schema, table));
    }

    fn record_column(&mut self, tag: &str, table: Option<&str>, column: &str) {
        let table = table.filter(|t| !t.is_empty()).unwrap_or(NO_QUALIFIER);
        push_unique(&mut self.columns, format!("{}::{}::{}", tag, table, column));
    }

    /// Record `column` or `table.column`
    fn record_column_path(&mut self, tag: &str, default_table: Option<&str>, path: &str) {
        let parts: Vec<String> = path.split('.').map(unquote).collect();
        match parts.as_slice() {
            [.., table, column] => self.record_column(tag, Some(table.as_str()), column),
            [column] => self.record_column(tag, default_table, column),
            [] => {}
        }
    }
}

/// Append `node` to the end of a set-operation chain. Hands the node back
/// when the chain ends in something other than a SELECT.
fn chain(head: &mut SelectNode, node: Node) -> Option<Node> {
    match head.next.as_deref_mut() {
        None => {
            head.next = Some(Box::new(node));
            None
        }
        Some(Node::Select(next)) => chain(next, node),
        Some(_) => Some(node),
    }
}

struct Scanner<'l, 't> {
    lowerer: &'l mut Lowerer,
    tag: &'t str,
    /// Number of queries entered below the scanned clause
    depth: usize,
    nodes: Vec<Node>,
    relations: Vec<String>,
}

impl Visitor for Scanner<'_, '_> {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if self.depth == 0 {
            let nodes = self.lowerer.lower_query(query);
            self.nodes.extend(nodes);
        }
        self.depth += 1;
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.depth -= 1;
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        if self.depth == 0 {
            let name = object_name(relation);
            self.lowerer.record_table(self.tag, &name);
            push_unique(&mut self.relations, name);
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if self.depth == 0 {
            match expr {
                Expr::Identifier(ident) => {
                    self.lowerer.record_column(self.tag, None, &ident.value);
                }
                Expr::CompoundIdentifier(idents) => {
                    if let [.., table, column] = idents.as_slice() {
                        self.lowerer
                            .record_column(self.tag, Some(table.value.as_str()), &column.value);
                    }
                }
                _ => {}
            }
        }
        ControlFlow::Continue(())
    }
}

fn expr_kind(expr: &Expr) -> ExprKind {
    match expr {
        Expr::Identifier(ident) => ExprKind::Column {
            table: None,
            name: ident.value.clone(),
        },
        Expr::CompoundIdentifier(idents) => match idents.as_slice() {
            [.., table, column] => ExprKind::Column {
                table: Some(table.value.clone()),
                name: column.value.clone(),
            },
            [column] => ExprKind::Column {
                table: None,
                name: column.value.clone(),
            },
            [] => ExprKind::Compound,
        },
        Expr::Function(function) => {
            let name = function.name.to_string();
            ExprKind::Function {
                name: name.rsplit('.').next().map(unquote).unwrap_or_default(),
            }
        }
        Expr::Value(Value::Number(value, _)) => ExprKind::Number {
            value: value.to_string(),
        },
        Expr::Value(_) => ExprKind::Literal,
        Expr::Nested(inner) => expr_kind(inner),
        _ => ExprKind::Compound,
    }
}

fn object_name(name: &ObjectName) -> String {
    name.to_string()
}

fn unquote(part: &str) -> String {
    part.trim()
        .trim_matches(|c| matches!(c, '`' | '"' | '[' | ']'))
        .to_string()
}

/// Lower-case first keyword of the rendered statement; `describe` folds into `desc`
fn leading_keyword(statement: &SqlStatement) -> String {
    let rendered = statement.to_string();
    let keyword = rendered
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    match keyword.as_str() {
        "describe" => "desc".to_string(),
        _ => keyword,
    }
}

fn strip_keyword(rendered: &str, keyword: &str) -> String {
    let trimmed = rendered.trim();
    match trimmed.get(..keyword.len()) {
        Some(head) if head.eq_ignore_ascii_case(keyword) => unquote(&trimmed[keyword.len()..]),
        _ => unquote(trimmed),
    }
}

fn push_unique(list: &mut Vec<String>, entry: String) {
    if !list.contains(&entry) {
        list.push(entry);
    }
}
