//! Expression and predicate trees.
//!
//! Every constructor returns a new node; nothing is mutated in place. Field
//! names (not column names) are used everywhere: the builders translate them
//! through the entity's [`TableMeta`](crate::meta::TableMeta) while rendering.

use std::fmt;

use crate::value::{SqlValue, ToSqlValue};

/// Operators of binary, math and logical expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `+`
    Add,
    /// `*`
    Multi,
    /// `AND`
    And,
    /// `OR`
    Or,
    /// `NOT`
    Not,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
}

impl Op {
    /// Returns the text written between the operands.
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Add => "+",
            Self::Multi => "*",
            Self::And => " AND ",
            Self::Or => " OR ",
            Self::Not => "NOT ",
            Self::In => " IN ",
            Self::NotIn => " NOT IN ",
            Self::Like => " LIKE ",
            Self::NotLike => " NOT LIKE ",
        }
    }

    /// Returns the operator of the logical negation, for comparison and
    /// logical operators.
    #[must_use]
    pub const fn negate(self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::Neq),
            Self::Neq => Some(Self::Eq),
            Self::Lt => Some(Self::GtEq),
            Self::GtEq => Some(Self::Lt),
            Self::LtEq => Some(Self::Gt),
            Self::Gt => Some(Self::LtEq),
            Self::In => Some(Self::NotIn),
            Self::NotIn => Some(Self::In),
            Self::Like => Some(Self::NotLike),
            Self::NotLike => Some(Self::Like),
            Self::And => Some(Self::Or),
            Self::Or => Some(Self::And),
            Self::Add | Self::Multi | Self::Not => None,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Lt => "LT",
            Self::LtEq => "LTEQ",
            Self::Gt => "GT",
            Self::GtEq => "GTEQ",
            Self::Add => "ADD",
            Self::Multi => "MULTI",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        };
        f.write_str(name)
    }
}

/// A node of an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column, referenced by field name.
    Column(Column),
    /// A bound parameter.
    Value(SqlValue),
    /// A parenthesised list of bound parameters, for `IN`.
    Values(Vec<SqlValue>),
    /// A verbatim SQL fragment.
    Raw(RawExpr),
    /// An aggregate function call.
    Aggregate(Aggregate),
    /// Arithmetic.
    Math(Box<MathExpr>),
    /// A boolean expression.
    Predicate(Box<Predicate>),
}

/// Conversion into an expression node.
///
/// Plain values become [`Expr::Value`] parameters.
pub trait IntoExpr {
    /// Converts into an expression.
    fn into_expr(self) -> Expr;
}

impl<T: ToSqlValue> IntoExpr for T {
    fn into_expr(self) -> Expr {
        Expr::Value(self.to_sql_value())
    }
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for Column {
    fn into_expr(self) -> Expr {
        Expr::Column(self)
    }
}

impl IntoExpr for RawExpr {
    fn into_expr(self) -> Expr {
        Expr::Raw(self)
    }
}

impl IntoExpr for Aggregate {
    fn into_expr(self) -> Expr {
        Expr::Aggregate(self)
    }
}

impl IntoExpr for MathExpr {
    fn into_expr(self) -> Expr {
        Expr::Math(Box::new(self))
    }
}

impl IntoExpr for Predicate {
    fn into_expr(self) -> Expr {
        Expr::Predicate(Box::new(self))
    }
}

/// Creates a column reference from a field name.
#[must_use]
pub fn col(field: &str) -> Column {
    Column {
        table: None,
        name: String::from(field),
        alias: None,
    }
}

/// A column reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Optional table qualifier.
    pub(crate) table: Option<String>,
    /// Field name.
    pub(crate) name: String,
    /// Optional alias, used in projections.
    pub(crate) alias: Option<String>,
}

macro_rules! comparison_methods {
    ($target:expr) => {
        /// Creates an equality predicate.
        #[must_use]
        pub fn eq<V: IntoExpr>(self, value: V) -> Predicate {
            Predicate::binary($target(self), Op::Eq, value.into_expr())
        }

        /// Creates an inequality predicate.
        #[must_use]
        pub fn neq<V: IntoExpr>(self, value: V) -> Predicate {
            Predicate::binary($target(self), Op::Neq, value.into_expr())
        }

        /// Creates a less-than predicate.
        #[must_use]
        pub fn lt<V: IntoExpr>(self, value: V) -> Predicate {
            Predicate::binary($target(self), Op::Lt, value.into_expr())
        }

        /// Creates a less-than-or-equal predicate.
        #[must_use]
        pub fn lt_eq<V: IntoExpr>(self, value: V) -> Predicate {
            Predicate::binary($target(self), Op::LtEq, value.into_expr())
        }

        /// Creates a greater-than predicate.
        #[must_use]
        pub fn gt<V: IntoExpr>(self, value: V) -> Predicate {
            Predicate::binary($target(self), Op::Gt, value.into_expr())
        }

        /// Creates a greater-than-or-equal predicate.
        #[must_use]
        pub fn gt_eq<V: IntoExpr>(self, value: V) -> Predicate {
            Predicate::binary($target(self), Op::GtEq, value.into_expr())
        }
    };
}

impl Column {
    /// Creates a qualified column reference.
    #[must_use]
    pub fn qualified(table: &str, field: &str) -> Self {
        Self {
            table: Some(String::from(table)),
            name: String::from(field),
            alias: None,
        }
    }

    /// Sets the alias used when the column is projected.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(String::from(alias));
        self
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    comparison_methods!(Expr::Column);

    /// Creates an IN predicate.
    #[must_use]
    pub fn in_list<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        let values = values.into_iter().map(ToSqlValue::to_sql_value).collect();
        Predicate::binary(Expr::Column(self), Op::In, Expr::Values(values))
    }

    /// Creates a NOT IN predicate.
    #[must_use]
    pub fn not_in<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        let values = values.into_iter().map(ToSqlValue::to_sql_value).collect();
        Predicate::binary(Expr::Column(self), Op::NotIn, Expr::Values(values))
    }

    /// Creates a LIKE predicate.
    #[must_use]
    pub fn like<V: ToSqlValue>(self, pattern: V) -> Predicate {
        Predicate::binary(Expr::Column(self), Op::Like, Expr::Value(pattern.to_sql_value()))
    }

    /// Creates a NOT LIKE predicate.
    #[must_use]
    pub fn not_like<V: ToSqlValue>(self, pattern: V) -> Predicate {
        Predicate::binary(
            Expr::Column(self),
            Op::NotLike,
            Expr::Value(pattern.to_sql_value()),
        )
    }

    /// Creates an addition, e.g. `age + 1`.
    #[must_use]
    pub fn add<V: IntoExpr>(self, value: V) -> MathExpr {
        MathExpr::new(Expr::Column(self), Op::Add, value.into_expr())
    }

    /// Creates a multiplication.
    #[must_use]
    pub fn multi<V: IntoExpr>(self, value: V) -> MathExpr {
        MathExpr::new(Expr::Column(self), Op::Multi, value.into_expr())
    }
}

/// Several columns at once, for projections and SET clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Columns(pub(crate) Vec<String>);

/// Creates a column list from field names.
#[must_use]
pub fn columns(fields: &[&str]) -> Columns {
    Columns(fields.iter().map(|s| String::from(*s)).collect())
}

/// A verbatim SQL fragment with its own arguments.
///
/// **Warning**: the fragment is written as-is, never put user input in it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawExpr {
    pub(crate) sql: String,
    pub(crate) args: Vec<SqlValue>,
}

/// Creates a raw SQL fragment.
#[must_use]
pub fn raw(sql: &str) -> RawExpr {
    RawExpr {
        sql: String::from(sql),
        args: Vec::new(),
    }
}

impl RawExpr {
    /// Appends an argument for the next `?` of the fragment.
    #[must_use]
    pub fn arg<V: ToSqlValue>(mut self, value: V) -> Self {
        self.args.push(value.to_sql_value());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        self.args.extend(values.into_iter().map(ToSqlValue::to_sql_value));
        self
    }

    /// Uses the fragment as a predicate.
    #[must_use]
    pub fn as_predicate(self) -> Predicate {
        Predicate::Raw(self)
    }
}

/// Arithmetic between two expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct MathExpr {
    pub(crate) left: Expr,
    pub(crate) op: Op,
    pub(crate) right: Expr,
}

impl MathExpr {
    const fn new(left: Expr, op: Op, right: Expr) -> Self {
        Self { left, op, right }
    }

    /// Adds to the expression.
    #[must_use]
    pub fn add<V: IntoExpr>(self, value: V) -> Self {
        Self::new(Expr::Math(Box::new(self)), Op::Add, value.into_expr())
    }

    /// Multiplies the expression.
    #[must_use]
    pub fn multi<V: IntoExpr>(self, value: V) -> Self {
        Self::new(Expr::Math(Box::new(self)), Op::Multi, value.into_expr())
    }
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    /// `AVG`
    Avg,
    /// `MAX`
    Max,
    /// `MIN`
    Min,
    /// `COUNT`
    Count,
    /// `SUM`
    Sum,
}

impl AggregateFn {
    /// Returns the SQL function name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Avg => "AVG",
            Self::Max => "MAX",
            Self::Min => "MIN",
            Self::Count => "COUNT",
            Self::Sum => "SUM",
        }
    }
}

/// An aggregate over a column, or over `*` for `COUNT(*)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub(crate) func: AggregateFn,
    /// Field name; `None` stands for `*`.
    pub(crate) field: Option<String>,
    pub(crate) distinct: bool,
    pub(crate) alias: Option<String>,
}

impl Aggregate {
    fn of(func: AggregateFn, field: &str) -> Self {
        Self {
            func,
            field: Some(String::from(field)),
            distinct: false,
            alias: None,
        }
    }

    /// Sets the alias of the aggregate.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(String::from(alias));
        self
    }

    comparison_methods!(Expr::Aggregate);
}

/// Creates an `AVG(field)` aggregate.
#[must_use]
pub fn avg(field: &str) -> Aggregate {
    Aggregate::of(AggregateFn::Avg, field)
}

/// Creates a `MAX(field)` aggregate.
#[must_use]
pub fn max(field: &str) -> Aggregate {
    Aggregate::of(AggregateFn::Max, field)
}

/// Creates a `MIN(field)` aggregate.
#[must_use]
pub fn min(field: &str) -> Aggregate {
    Aggregate::of(AggregateFn::Min, field)
}

/// Creates a `SUM(field)` aggregate.
#[must_use]
pub fn sum(field: &str) -> Aggregate {
    Aggregate::of(AggregateFn::Sum, field)
}

/// Creates a `COUNT(field)` aggregate.
#[must_use]
pub fn count(field: &str) -> Aggregate {
    Aggregate::of(AggregateFn::Count, field)
}

/// Creates a `COUNT(DISTINCT field)` aggregate.
#[must_use]
pub fn count_distinct(field: &str) -> Aggregate {
    Aggregate {
        distinct: true,
        ..Aggregate::of(AggregateFn::Count, field)
    }
}

/// Creates a `COUNT(*)` aggregate.
#[must_use]
pub const fn count_all() -> Aggregate {
    Aggregate {
        func: AggregateFn::Count,
        field: None,
        distinct: false,
        alias: None,
    }
}

/// A boolean expression used in WHERE and HAVING.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Comparison or logical combination: `left op right`.
    Binary {
        /// Left operand.
        left: Expr,
        /// Operator.
        op: Op,
        /// Right operand.
        right: Expr,
    },
    /// Negation.
    Not(Box<Predicate>),
    /// A raw fragment lifted to predicate position.
    Raw(RawExpr),
}

impl Predicate {
    const fn binary(left: Expr, op: Op, right: Expr) -> Self {
        Self::Binary { left, op, right }
    }

    /// Combines with AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::binary(
            Expr::Predicate(Box::new(self)),
            Op::And,
            Expr::Predicate(Box::new(other)),
        )
    }

    /// Combines with OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::binary(
            Expr::Predicate(Box::new(self)),
            Op::Or,
            Expr::Predicate(Box::new(other)),
        )
    }

    /// Folds a list of predicates into one, left-associatively with AND.
    #[must_use]
    pub fn all(predicates: &[Self]) -> Option<Self> {
        let (first, rest) = predicates.split_first()?;
        Some(
            rest.iter()
                .cloned()
                .fold(first.clone(), |acc, p| acc.and(p)),
        )
    }
}

/// Negates a predicate.
#[must_use]
pub fn not(predicate: Predicate) -> Predicate {
    Predicate::Not(Box::new(predicate))
}

/// An assignment of an expression to a field, for SET clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub(crate) field: String,
    pub(crate) value: Expr,
}

/// Creates an assignment `field = value`.
#[must_use]
pub fn assign<V: IntoExpr>(field: &str, value: V) -> Assignment {
    Assignment {
        field: String::from(field),
        value: value.into_expr(),
    }
}

/// An item of a SET clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignable {
    /// Assign the field from the update target entity.
    Column(Column),
    /// Assign several fields from the update target entity.
    Columns(Columns),
    /// Assign an arbitrary expression.
    Assignment(Assignment),
}

impl From<Column> for Assignable {
    fn from(column: Column) -> Self {
        Self::Column(column)
    }
}

impl From<Columns> for Assignable {
    fn from(columns: Columns) -> Self {
        Self::Columns(columns)
    }
}

impl From<Assignment> for Assignable {
    fn from(assignment: Assignment) -> Self {
        Self::Assignment(assignment)
    }
}

impl Assignable {
    /// Returns the field names written by this item.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Column(c) => vec![c.name.as_str()],
            Self::Columns(cs) => cs.0.iter().map(String::as_str).collect(),
            Self::Assignment(a) => vec![a.field.as_str()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_builds_value() {
        let p = col("id").eq(18);
        assert_eq!(
            p,
            Predicate::Binary {
                left: Expr::Column(col("id")),
                op: Op::Eq,
                right: Expr::Value(SqlValue::Int(18)),
            }
        );
    }

    #[test]
    fn test_comparison_with_column_rhs() {
        let p = col("a").lt(col("b"));
        assert!(matches!(
            p,
            Predicate::Binary { right: Expr::Column(ref c), .. } if c.name == "b"
        ));
    }

    #[test]
    fn test_originals_are_not_mutated() {
        let base = col("id").eq(1);
        let combined = base.clone().and(col("age").gt(18));
        assert_eq!(base, col("id").eq(1));
        assert!(matches!(combined, Predicate::Binary { op: Op::And, .. }));
    }

    #[test]
    fn test_all_is_left_associative() {
        let p = Predicate::all(&[col("a").eq(1), col("b").eq(2), col("c").eq(3)]).unwrap();
        let expected = col("a").eq(1).and(col("b").eq(2)).and(col("c").eq(3));
        assert_eq!(p, expected);
        assert!(Predicate::all(&[]).is_none());
    }

    #[test]
    fn test_negate_ops() {
        assert_eq!(Op::Eq.negate(), Some(Op::Neq));
        assert_eq!(Op::Lt.negate(), Some(Op::GtEq));
        assert_eq!(Op::LtEq.negate(), Some(Op::Gt));
        assert_eq!(Op::And.negate(), Some(Op::Or));
        assert_eq!(Op::Add.negate(), None);
    }

    #[test]
    fn test_raw_args() {
        let r = raw("`id`<? AND `age`>?").arg(12).arg(18);
        assert_eq!(r.args, vec![SqlValue::Int(12), SqlValue::Int(18)]);
    }

    #[test]
    fn test_assignable_fields() {
        let a: Assignable = columns(&["name", "age"]).into();
        assert_eq!(a.fields(), vec!["name", "age"]);
        let b: Assignable = assign("age", col("age").add(1)).into();
        assert_eq!(b.fields(), vec!["age"]);
    }
}
