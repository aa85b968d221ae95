//! Tree traversal utilities for rules.
//!
//! Reusable visitor functions that walk the AST and invoke a callback on
//! each node of interest, so individual rules do not duplicate the traversal.
//! Every match carries a default arm that recurses into children (or ignores
//! leaves), so a new statement or expression kind never silently breaks an
//! existing rule. Accumulators are threaded through the callbacks; visitors
//! hold no hidden state.

use sqlparser::ast::*;

/// Visits every expression in a statement, including expressions inside
/// nested subqueries.
pub fn visit_expressions<F: FnMut(&Expr)>(stmt: &Statement, visitor: &mut F) {
    match stmt {
        Statement::Query(query) => visit_query_expressions(query, visitor),
        Statement::Insert(insert) => {
            if let Some(ref source) = insert.source {
                visit_query_expressions(source, visitor);
            }
            for assignment in &insert.assignments {
                visit_expr(&assignment.value, visitor);
            }
        }
        Statement::Update {
            table,
            assignments,
            from,
            selection,
            ..
        } => {
            visit_table_with_joins_expressions(table, visitor);
            for assignment in assignments {
                visit_expr(&assignment.value, visitor);
            }
            if let Some(from) = from {
                match from {
                    UpdateTableFromKind::BeforeSet(tables)
                    | UpdateTableFromKind::AfterSet(tables) => {
                        for table in tables {
                            visit_table_with_joins_expressions(table, visitor);
                        }
                    }
                }
            }
            if let Some(selection) = selection {
                visit_expr(selection, visitor);
            }
        }
        Statement::Delete(delete) => {
            match &delete.from {
                FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => {
                    for table in tables {
                        visit_table_with_joins_expressions(table, visitor);
                    }
                }
            }
            if let Some(using) = &delete.using {
                for table in using {
                    visit_table_with_joins_expressions(table, visitor);
                }
            }
            if let Some(selection) = &delete.selection {
                visit_expr(selection, visitor);
            }
        }
        Statement::CreateView { query, .. } => visit_query_expressions(query, visitor),
        Statement::CreateTable(create) => {
            if let Some(ref query) = create.query {
                visit_query_expressions(query, visitor);
            }
        }
        Statement::Declare { stmts } => {
            for declare in stmts {
                if let Some(expr) = declare.assignment.as_ref().and_then(declare_assignment_expr)
                {
                    visit_expr(expr, visitor);
                }
            }
        }
        Statement::Set(set) => {
            if let Set::SingleAssignment { values, .. } = set {
                for value in values {
                    visit_expr(value, visitor);
                }
            }
        }
        Statement::CreateProcedure { body, .. } => {
            for statement in body.statements() {
                visit_expressions(statement, visitor);
            }
        }
        _ => {}
    }
}

/// The initializer expression of a `DECLARE`, for any of the assignment
/// syntaxes the parser produces.
pub fn declare_assignment_expr(assignment: &DeclareAssignment) -> Option<&Expr> {
    match assignment {
        DeclareAssignment::Expr(expr)
        | DeclareAssignment::Default(expr)
        | DeclareAssignment::DuckAssignment(expr)
        | DeclareAssignment::MsSqlAssignment(expr) => Some(expr),
        _ => None,
    }
}

pub fn visit_query_expressions<F: FnMut(&Expr)>(query: &Query, visitor: &mut F) {
    if let Some(ref with) = query.with {
        for cte in &with.cte_tables {
            visit_query_expressions(&cte.query, visitor);
        }
    }
    visit_set_expr_expressions(&query.body, visitor);

    if let Some(ref order_by) = query.order_by {
        if let OrderByKind::Expressions(exprs) = &order_by.kind {
            for order_expr in exprs {
                visit_expr(&order_expr.expr, visitor);
            }
        }
    }
}

fn visit_set_expr_expressions<F: FnMut(&Expr)>(body: &SetExpr, visitor: &mut F) {
    match body {
        SetExpr::Select(select) => {
            for item in &select.projection {
                if let SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } =
                    item
                {
                    visit_expr(expr, visitor);
                }
            }
            if let Some(ref selection) = select.selection {
                visit_expr(selection, visitor);
            }
            if let Some(ref having) = select.having {
                visit_expr(having, visitor);
            }
            if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
                for expr in exprs {
                    visit_expr(expr, visitor);
                }
            }
            for table_with_joins in &select.from {
                visit_table_with_joins_expressions(table_with_joins, visitor);
            }
        }
        SetExpr::Query(query) => visit_query_expressions(query, visitor),
        SetExpr::SetOperation { left, right, .. } => {
            visit_set_expr_expressions(left, visitor);
            visit_set_expr_expressions(right, visitor);
        }
        SetExpr::Values(values) => {
            for row in &values.rows {
                for expr in row {
                    visit_expr(expr, visitor);
                }
            }
        }
        SetExpr::Insert(statement)
        | SetExpr::Update(statement)
        | SetExpr::Delete(statement)
        | SetExpr::Merge(statement) => visit_expressions(statement, visitor),
        _ => {}
    }
}

/// Recursively visits an expression and all its children, descending into
/// subquery expressions.
pub fn visit_expr<F: FnMut(&Expr)>(expr: &Expr, visitor: &mut F) {
    visitor(expr);
    match expr {
        Expr::BinaryOp { left, right, .. }
        | Expr::AnyOp { left, right, .. }
        | Expr::AllOp { left, right, .. } => {
            visit_expr(left, visitor);
            visit_expr(right, visitor);
        }
        Expr::UnaryOp { expr: inner, .. }
        | Expr::Nested(inner)
        | Expr::IsNull(inner)
        | Expr::IsNotNull(inner)
        | Expr::Cast { expr: inner, .. } => visit_expr(inner, visitor),
        Expr::Convert {
            expr: inner,
            styles,
            ..
        } => {
            visit_expr(inner, visitor);
            for style in styles {
                visit_expr(style, visitor);
            }
        }
        Expr::Like { expr, pattern, .. }
        | Expr::ILike { expr, pattern, .. }
        | Expr::SimilarTo { expr, pattern, .. } => {
            visit_expr(expr, visitor);
            visit_expr(pattern, visitor);
        }
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            if let Some(operand) = operand {
                visit_expr(operand, visitor);
            }
            for case_when in conditions {
                visit_expr(&case_when.condition, visitor);
                visit_expr(&case_when.result, visitor);
            }
            if let Some(else_result) = else_result {
                visit_expr(else_result, visitor);
            }
        }
        Expr::Function(function) => visit_function_expressions(function, visitor),
        Expr::InSubquery {
            expr: inner,
            subquery,
            ..
        } => {
            visit_expr(inner, visitor);
            visit_query_expressions(subquery, visitor);
        }
        Expr::Subquery(subquery) => visit_query_expressions(subquery, visitor),
        Expr::Exists { subquery, .. } => visit_query_expressions(subquery, visitor),
        Expr::Between {
            expr, low, high, ..
        } => {
            visit_expr(expr, visitor);
            visit_expr(low, visitor);
            visit_expr(high, visitor);
        }
        Expr::InList { expr, list, .. } => {
            visit_expr(expr, visitor);
            for item in list {
                visit_expr(item, visitor);
            }
        }
        _ => {}
    }
}

fn visit_table_with_joins_expressions<F: FnMut(&Expr)>(table: &TableWithJoins, visitor: &mut F) {
    visit_table_factor_expressions(&table.relation, visitor);
    for join in &table.joins {
        visit_table_factor_expressions(&join.relation, visitor);
        if let Some(on_expr) = join_on_expr(&join.join_operator) {
            visit_expr(on_expr, visitor);
        }
    }
}

fn visit_table_factor_expressions<F: FnMut(&Expr)>(table_factor: &TableFactor, visitor: &mut F) {
    match table_factor {
        TableFactor::Derived { subquery, .. } => visit_query_expressions(subquery, visitor),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => visit_table_with_joins_expressions(table_with_joins, visitor),
        TableFactor::Pivot { table, .. }
        | TableFactor::Unpivot { table, .. }
        | TableFactor::MatchRecognize { table, .. } => {
            visit_table_factor_expressions(table, visitor)
        }
        _ => {}
    }
}

fn visit_function_expressions<F: FnMut(&Expr)>(function: &Function, visitor: &mut F) {
    match &function.args {
        FunctionArguments::Subquery(query) => visit_query_expressions(query, visitor),
        FunctionArguments::List(arg_list) => {
            for arg in &arg_list.args {
                match arg {
                    FunctionArg::Unnamed(FunctionArgExpr::Expr(expr))
                    | FunctionArg::Named {
                        arg: FunctionArgExpr::Expr(expr),
                        ..
                    }
                    | FunctionArg::ExprNamed {
                        arg: FunctionArgExpr::Expr(expr),
                        ..
                    } => visit_expr(expr, visitor),
                    _ => {}
                }
            }
        }
        FunctionArguments::None => {}
    }
    if let Some(filter) = &function.filter {
        visit_expr(filter, visitor);
    }
    for order_expr in &function.within_group {
        visit_expr(&order_expr.expr, visitor);
    }
    if let Some(WindowType::WindowSpec(spec)) = &function.over {
        for expr in &spec.partition_by {
            visit_expr(expr, visitor);
        }
        for order_expr in &spec.order_by {
            visit_expr(&order_expr.expr, visitor);
        }
    }
}

/// Visits every `Query` node in a statement: top-level queries, CTEs,
/// derived tables, and subquery expressions.
pub fn visit_statement_queries<F: FnMut(&Query)>(stmt: &Statement, visitor: &mut F) {
    match stmt {
        Statement::Query(query) => visit_query(query, visitor),
        Statement::Insert(insert) => {
            if let Some(ref source) = insert.source {
                visit_query(source, visitor);
            }
        }
        Statement::Update {
            table,
            assignments,
            from,
            selection,
            ..
        } => {
            visit_table_with_joins_queries(table, visitor);
            for assignment in assignments {
                queries_in_expr(&assignment.value, visitor);
            }
            if let Some(from) = from {
                match from {
                    UpdateTableFromKind::BeforeSet(tables)
                    | UpdateTableFromKind::AfterSet(tables) => {
                        for table in tables {
                            visit_table_with_joins_queries(table, visitor);
                        }
                    }
                }
            }
            if let Some(selection) = selection {
                queries_in_expr(selection, visitor);
            }
        }
        Statement::Delete(delete) => {
            match &delete.from {
                FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => {
                    for table in tables {
                        visit_table_with_joins_queries(table, visitor);
                    }
                }
            }
            if let Some(using) = &delete.using {
                for table in using {
                    visit_table_with_joins_queries(table, visitor);
                }
            }
            if let Some(selection) = &delete.selection {
                queries_in_expr(selection, visitor);
            }
        }
        Statement::CreateView { query, .. } => visit_query(query, visitor),
        Statement::CreateTable(create) => {
            if let Some(ref query) = create.query {
                visit_query(query, visitor);
            }
        }
        Statement::CreateProcedure { body, .. } => {
            for statement in body.statements() {
                visit_statement_queries(statement, visitor);
            }
        }
        _ => {}
    }
}

pub fn visit_query<F: FnMut(&Query)>(query: &Query, visitor: &mut F) {
    visitor(query);
    if let Some(ref with) = query.with {
        for cte in &with.cte_tables {
            visit_query(&cte.query, visitor);
        }
    }
    visit_set_expr_queries(&query.body, visitor);
    if let Some(ref order_by) = query.order_by {
        if let OrderByKind::Expressions(exprs) = &order_by.kind {
            for order_expr in exprs {
                queries_in_expr(&order_expr.expr, visitor);
            }
        }
    }
}

fn visit_set_expr_queries<F: FnMut(&Query)>(body: &SetExpr, visitor: &mut F) {
    match body {
        SetExpr::Select(select) => {
            for item in &select.projection {
                if let SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } =
                    item
                {
                    queries_in_expr(expr, visitor);
                }
            }
            if let Some(ref selection) = select.selection {
                queries_in_expr(selection, visitor);
            }
            if let Some(ref having) = select.having {
                queries_in_expr(having, visitor);
            }
            for table_with_joins in &select.from {
                visit_table_with_joins_queries(table_with_joins, visitor);
            }
        }
        SetExpr::Query(query) => visit_query(query, visitor),
        SetExpr::SetOperation { left, right, .. } => {
            visit_set_expr_queries(left, visitor);
            visit_set_expr_queries(right, visitor);
        }
        SetExpr::Values(values) => {
            for row in &values.rows {
                for expr in row {
                    queries_in_expr(expr, visitor);
                }
            }
        }
        SetExpr::Insert(statement)
        | SetExpr::Update(statement)
        | SetExpr::Delete(statement)
        | SetExpr::Merge(statement) => visit_statement_queries(statement, visitor),
        _ => {}
    }
}

fn visit_table_with_joins_queries<F: FnMut(&Query)>(table: &TableWithJoins, visitor: &mut F) {
    visit_table_factor_queries(&table.relation, visitor);
    for join in &table.joins {
        visit_table_factor_queries(&join.relation, visitor);
        if let Some(on_expr) = join_on_expr(&join.join_operator) {
            queries_in_expr(on_expr, visitor);
        }
    }
}

fn visit_table_factor_queries<F: FnMut(&Query)>(table_factor: &TableFactor, visitor: &mut F) {
    match table_factor {
        TableFactor::Derived { subquery, .. } => visit_query(subquery, visitor),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => visit_table_with_joins_queries(table_with_joins, visitor),
        TableFactor::Pivot { table, .. }
        | TableFactor::Unpivot { table, .. }
        | TableFactor::MatchRecognize { table, .. } => {
            visit_table_factor_queries(table, visitor)
        }
        _ => {}
    }
}

/// Finds subquery expressions nested anywhere inside `expr` and visits their
/// queries.
pub fn queries_in_expr<F: FnMut(&Query)>(expr: &Expr, visitor: &mut F) {
    let mut relay = |candidate: &Expr| match candidate {
        Expr::Subquery(subquery) | Expr::Exists { subquery, .. } => visit_query(subquery, visitor),
        Expr::InSubquery { subquery, .. } => visit_query(subquery, visitor),
        _ => {}
    };
    shallow_visit_expr(expr, &mut relay);
}

/// Like [`visit_expr`] but stops at subquery boundaries: the callback sees
/// the subquery expression node itself and nothing inside it.
pub fn shallow_visit_expr<F: FnMut(&Expr)>(expr: &Expr, visitor: &mut F) {
    visitor(expr);
    match expr {
        Expr::BinaryOp { left, right, .. }
        | Expr::AnyOp { left, right, .. }
        | Expr::AllOp { left, right, .. } => {
            shallow_visit_expr(left, visitor);
            shallow_visit_expr(right, visitor);
        }
        Expr::UnaryOp { expr: inner, .. }
        | Expr::Nested(inner)
        | Expr::IsNull(inner)
        | Expr::IsNotNull(inner)
        | Expr::Cast { expr: inner, .. } => shallow_visit_expr(inner, visitor),
        Expr::Convert {
            expr: inner,
            styles,
            ..
        } => {
            shallow_visit_expr(inner, visitor);
            for style in styles {
                shallow_visit_expr(style, visitor);
            }
        }
        Expr::Like { expr, pattern, .. }
        | Expr::ILike { expr, pattern, .. }
        | Expr::SimilarTo { expr, pattern, .. } => {
            shallow_visit_expr(expr, visitor);
            shallow_visit_expr(pattern, visitor);
        }
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            if let Some(operand) = operand {
                shallow_visit_expr(operand, visitor);
            }
            for case_when in conditions {
                shallow_visit_expr(&case_when.condition, visitor);
                shallow_visit_expr(&case_when.result, visitor);
            }
            if let Some(else_result) = else_result {
                shallow_visit_expr(else_result, visitor);
            }
        }
        Expr::Function(function) => {
            if let FunctionArguments::List(arg_list) = &function.args {
                for arg in &arg_list.args {
                    match arg {
                        FunctionArg::Unnamed(FunctionArgExpr::Expr(inner))
                        | FunctionArg::Named {
                            arg: FunctionArgExpr::Expr(inner),
                            ..
                        }
                        | FunctionArg::ExprNamed {
                            arg: FunctionArgExpr::Expr(inner),
                            ..
                        } => shallow_visit_expr(inner, visitor),
                        _ => {}
                    }
                }
            }
        }
        Expr::InSubquery { expr: inner, .. } => shallow_visit_expr(inner, visitor),
        Expr::Between {
            expr, low, high, ..
        } => {
            shallow_visit_expr(expr, visitor);
            shallow_visit_expr(low, visitor);
            shallow_visit_expr(high, visitor);
        }
        Expr::InList { expr, list, .. } => {
            shallow_visit_expr(expr, visitor);
            for item in list {
                shallow_visit_expr(item, visitor);
            }
        }
        _ => {}
    }
}

/// The `SELECT` bodies directly under a query, walking through set
/// operations. A parenthesized subquery body is its own `Query` node (and is
/// visited as such by [`visit_query`]), so it is not flattened here.
pub fn selects_of(query: &Query) -> Vec<&Select> {
    let mut selects = Vec::new();
    collect_selects(&query.body, &mut selects);
    selects
}

fn collect_selects<'a>(body: &'a SetExpr, selects: &mut Vec<&'a Select>) {
    match body {
        SetExpr::Select(select) => selects.push(select),
        SetExpr::SetOperation { left, right, .. } => {
            collect_selects(left, selects);
            collect_selects(right, selects);
        }
        _ => {}
    }
}

/// The expression inside a JOIN's `ON` constraint, if any.
pub fn join_on_expr(op: &JoinOperator) -> Option<&Expr> {
    let constraint = match op {
        JoinOperator::Join(constraint)
        | JoinOperator::Inner(constraint)
        | JoinOperator::Left(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::Right(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint)
        | JoinOperator::CrossJoin(constraint)
        | JoinOperator::Semi(constraint)
        | JoinOperator::LeftSemi(constraint)
        | JoinOperator::RightSemi(constraint)
        | JoinOperator::Anti(constraint)
        | JoinOperator::LeftAnti(constraint)
        | JoinOperator::RightAnti(constraint)
        | JoinOperator::StraightJoin(constraint) => constraint,
        JoinOperator::AsOf { constraint, .. } => constraint,
        JoinOperator::CrossApply | JoinOperator::OuterApply => return None,
    };
    if let JoinConstraint::On(expr) = constraint {
        Some(expr)
    } else {
        None
    }
}
