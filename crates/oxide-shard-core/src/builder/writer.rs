//! Shared SQL writer used by every builder.

use tracing::debug;

use super::OrderBy;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::expr::{Aggregate, Column, Expr, Op, Predicate, RawExpr};
use crate::meta::TableMeta;
use crate::pool::{self, PooledBuffer};
use crate::query::Query;
use crate::sharding::Destination;
use crate::value::SqlValue;

/// Renders clauses into a pooled buffer and collects arguments.
pub struct Writer<'a> {
    buf: PooledBuffer,
    args: Vec<SqlValue>,
    dialect: &'a dyn Dialect,
    meta: &'a TableMeta,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(dialect: &'a dyn Dialect, meta: &'a TableMeta) -> Self {
        Self {
            buf: pool::acquire(),
            args: Vec::new(),
            dialect,
            meta,
        }
    }

    pub(crate) fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    pub(crate) fn quote(&mut self, name: &str) {
        let q = self.dialect.identifier_quote();
        self.buf.push(q);
        self.buf.push_str(name);
        self.buf.push(q);
    }

    /// Writes the table, qualified by database when routed to a destination.
    pub(crate) fn table(&mut self, target: Option<&Destination>) {
        match target {
            Some(dst) if dst.database.is_empty() => self.quote(&dst.table),
            Some(dst) => {
                self.quote(&dst.database);
                self.buf.push('.');
                self.quote(&dst.table);
            }
            None => {
                let name = &self.meta.table_name;
                let q = self.dialect.identifier_quote();
                self.buf.push(q);
                self.buf.push_str(name);
                self.buf.push(q);
            }
        }
    }

    pub(crate) fn param(&mut self, value: SqlValue) {
        self.args.push(value);
        let placeholder = self.dialect.placeholder(self.args.len());
        self.buf.push_str(&placeholder);
    }

    /// Writes the quoted column name of a field.
    pub(crate) fn column_of(&mut self, field: &str) -> Result<()> {
        let column = self
            .meta
            .field(field)
            .ok_or_else(|| Error::InvalidColumn(String::from(field)))?;
        let q = self.dialect.identifier_quote();
        self.buf.push(q);
        self.buf.push_str(&column.column_name);
        self.buf.push(q);
        Ok(())
    }

    pub(crate) fn column(&mut self, column: &Column, with_alias: bool) -> Result<()> {
        if let Some(table) = &column.table {
            self.quote(table);
            self.buf.push('.');
        }
        self.column_of(&column.name)?;
        if with_alias {
            if let Some(alias) = &column.alias {
                self.write(" AS ");
                self.quote(alias);
            }
        }
        Ok(())
    }

    pub(crate) fn aggregate(&mut self, agg: &Aggregate, with_alias: bool) -> Result<()> {
        self.write(agg.func.name());
        self.buf.push('(');
        if agg.distinct {
            self.write("DISTINCT ");
        }
        match &agg.field {
            Some(field) => self.column_of(field)?,
            None => self.buf.push('*'),
        }
        self.buf.push(')');
        if with_alias {
            if let Some(alias) = &agg.alias {
                self.write(" AS ");
                self.quote(alias);
            }
        }
        Ok(())
    }

    /// Writes raw SQL, renumbering its `?` placeholders outside quotes for
    /// numbered dialects.
    pub(crate) fn raw(&mut self, raw: &RawExpr) {
        if !self.dialect.numbered_placeholders() {
            self.write(&raw.sql);
            self.args.extend(raw.args.iter().cloned());
            return;
        }
        let mut quote = None;
        let mut n = self.args.len();
        for c in raw.sql.chars() {
            match (quote, c) {
                (None, '?') => {
                    n += 1;
                    let placeholder = self.dialect.placeholder(n);
                    self.buf.push_str(&placeholder);
                    continue;
                }
                (None, '\'' | '"' | '`') => quote = Some(c),
                (Some(q), _) if q == c => quote = None,
                _ => {}
            }
            self.buf.push(c);
        }
        self.args.extend(raw.args.iter().cloned());
    }

    pub(crate) fn expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Column(c) => self.column(c, false),
            Expr::Value(v) => {
                self.param(v.clone());
                Ok(())
            }
            Expr::Values(values) => {
                self.buf.push('(');
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(',');
                    }
                    self.param(v.clone());
                }
                self.buf.push(')');
                Ok(())
            }
            Expr::Raw(raw) => {
                self.raw(raw);
                Ok(())
            }
            Expr::Aggregate(agg) => self.aggregate(agg, false),
            Expr::Math(math) => {
                self.operand(&math.left)?;
                self.write(math.op.text());
                self.operand(&math.right)
            }
            Expr::Predicate(p) => self.predicate(p),
        }
    }

    /// Writes a child of a binary expression, parenthesised when composite.
    pub(crate) fn operand(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Predicate(_) | Expr::Math(_) => {
                self.buf.push('(');
                self.expr(expr)?;
                self.buf.push(')');
                Ok(())
            }
            _ => self.expr(expr),
        }
    }

    pub(crate) fn predicate(&mut self, p: &Predicate) -> Result<()> {
        match p {
            Predicate::Binary { left, op, right } => {
                // an empty list matches nothing, or everything when negated
                if let (Op::In | Op::NotIn, Expr::Values(values)) = (op, right) {
                    if values.is_empty() {
                        self.write(if *op == Op::In { "FALSE" } else { "TRUE" });
                        return Ok(());
                    }
                }
                self.operand(left)?;
                self.write(op.text());
                self.operand(right)
            }
            Predicate::Not(inner) => {
                self.write(Op::Not.text());
                self.buf.push('(');
                self.predicate(inner)?;
                self.buf.push(')');
                Ok(())
            }
            Predicate::Raw(raw) => {
                self.raw(raw);
                Ok(())
            }
        }
    }

    /// Writes ` WHERE p1 AND p2 ...`, or nothing for an empty list.
    pub(crate) fn clause(&mut self, keyword: &str, predicates: &[Predicate]) -> Result<()> {
        if let Some(p) = Predicate::all(predicates) {
            self.buf.push(' ');
            self.write(keyword);
            self.buf.push(' ');
            self.predicate(&p)?;
        }
        Ok(())
    }

    pub(crate) fn order_by(&mut self, order_by: &[OrderBy]) -> Result<()> {
        if order_by.is_empty() {
            return Ok(());
        }
        self.write(" ORDER BY ");
        for (i, ob) in order_by.iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            for (j, field) in ob.fields.iter().enumerate() {
                if j > 0 {
                    self.buf.push(',');
                }
                self.column_of(field)?;
            }
            self.write(if ob.desc { " DESC" } else { " ASC" });
        }
        Ok(())
    }

    /// Terminates the statement and hands the buffer back to the pool.
    pub(crate) fn finish(mut self) -> Query {
        self.buf.push(';');
        let sql = self.buf.to_owned_string();
        debug!(sql = %sql, args = self.args.len(), "built query");
        Query::new(sql, self.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{GenericDialect, MySqlDialect, PostgresDialect};
    use crate::expr::{IntoExpr, col, count_distinct, not, raw, sum};
    use crate::meta::MetaRegistry;
    use crate::valuer::tests::Profile;

    fn render(p: &Predicate) -> Query {
        let meta = MetaRegistry::new().get::<Profile>().unwrap();
        let mut w = Writer::new(&MySqlDialect, &meta);
        w.predicate(p).unwrap();
        w.finish()
    }

    #[test]
    fn test_leaf_is_not_wrapped() {
        let q = render(&col("id").eq(1));
        assert_eq!(q.sql, "`id`=?;");
    }

    #[test]
    fn test_composite_children_are_wrapped() {
        let q = render(&col("id").eq(1).and(col("age").gt(2).or(col("age").lt(0))));
        assert_eq!(q.sql, "(`id`=?) AND ((`age`>?) OR (`age`<?));");
        assert_eq!(q.args, vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(0)]);
    }

    #[test]
    fn test_not_and_in() {
        let q = render(&not(col("id").in_list([1, 2, 3])));
        assert_eq!(q.sql, "NOT (`id` IN (?,?,?));");
        assert_eq!(q.args.len(), 3);
    }

    #[test]
    fn test_empty_in() {
        assert_eq!(render(&col("id").in_list(Vec::<i64>::new())).sql, "FALSE;");
        assert_eq!(render(&col("id").not_in(Vec::<i64>::new())).sql, "TRUE;");
    }

    #[test]
    fn test_like_and_column_operand() {
        let q = render(&col("first_name").like("T%").and(col("age").lt_eq(col("score"))));
        assert_eq!(q.sql, "(`first_name` LIKE ?) AND (`age`<=`score`);");
        assert_eq!(q.args, vec![SqlValue::Text(String::from("T%"))]);
    }

    #[test]
    fn test_nested_math() {
        let meta = MetaRegistry::new().get::<Profile>().unwrap();
        let mut w = Writer::new(&MySqlDialect, &meta);
        w.expr(&col("age").add(1).multi(2).into_expr()).unwrap();
        let q = w.finish();
        assert_eq!(q.sql, "(`age`+?)*?;");
        assert_eq!(q.args, vec![SqlValue::Int(1), SqlValue::Int(2)]);
    }

    #[test]
    fn test_raw_predicate_args() {
        let q = render(&raw("`id`<?").arg(12).as_predicate());
        assert_eq!(q.sql, "`id`<?;");
        assert_eq!(q.args, vec![SqlValue::Int(12)]);
    }

    #[test]
    fn test_numbered_placeholders_follow_arg_order() {
        let meta = MetaRegistry::new().get::<Profile>().unwrap();
        let mut w = Writer::new(&PostgresDialect, &meta);
        let p = col("id")
            .in_list([1, 2])
            .and(raw("\"first_name\" <> '?' AND \"age\"<?").arg(9).as_predicate())
            .and(col("score").gt(3));
        w.predicate(&p).unwrap();
        let q = w.finish();
        assert_eq!(
            q.sql,
            r#"(("id" IN ($1,$2)) AND ("first_name" <> '?' AND "age"<$3)) AND ("score">$4);"#
        );
        assert_eq!(
            q.args,
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(9), SqlValue::Int(3)]
        );
    }

    #[test]
    fn test_unknown_field_is_invalid_column() {
        let meta = MetaRegistry::new().get::<Profile>().unwrap();
        let mut w = Writer::new(&MySqlDialect, &meta);
        let err = w.predicate(&col("nope").eq(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidColumn(c) if c == "nope"));
    }

    #[test]
    fn test_aggregates_and_quote_char() {
        let meta = MetaRegistry::new().get::<Profile>().unwrap();
        let mut w = Writer::new(&GenericDialect, &meta);
        w.aggregate(&count_distinct("first_name").alias("n"), true).unwrap();
        w.write(",");
        w.aggregate(&sum("score"), true).unwrap();
        assert_eq!(w.finish().sql, r#"COUNT(DISTINCT "first_name") AS "n",SUM("score");"#);
    }

    #[test]
    fn test_destination_table() {
        let meta = MetaRegistry::new().get::<Profile>().unwrap();
        let mut w = Writer::new(&MySqlDialect, &meta);
        w.table(Some(&Destination::new("ds", "order_db_1", "order_tab_2")));
        w.write(" ");
        w.table(None);
        assert_eq!(w.finish().sql, "`order_db_1`.`order_tab_2` `profile`;");
    }
}
