//! Predicate tree to destination set.
//!
//! `AND` intersects, `OR` unions, `IN` is the union of one equality per value,
//! `NOT IN` the intersection of one inequality per value. `NOT` is pushed down
//! with De Morgan before evaluation. Leaves must compare a column with a
//! value; anything else is rejected.

use super::{Destination, Request, ShardingAlgorithm};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::expr::{Expr, Op, Predicate};

/// Resolves the destinations matched by the conjunction of `predicates`.
///
/// No predicate means every destination.
///
/// # Errors
///
/// [`Error::TooComplexQuery`] for leaves that are not `column op value`, and
/// any error of the algorithm.
pub fn route(
    algorithm: &dyn ShardingAlgorithm,
    ctx: &Context,
    predicates: &[Predicate],
) -> Result<Vec<Destination>> {
    Predicate::all(predicates).map_or_else(
        || Ok(algorithm.broadcast(ctx)),
        |p| find(algorithm, ctx, &p),
    )
}

fn find(algorithm: &dyn ShardingAlgorithm, ctx: &Context, p: &Predicate) -> Result<Vec<Destination>> {
    match p {
        Predicate::Binary { left, op, right } => match (left, op, right) {
            (Expr::Predicate(l), Op::And, Expr::Predicate(r)) => {
                let l = find(algorithm, ctx, l)?;
                let r = find(algorithm, ctx, r)?;
                Ok(intersect(l, &r))
            }
            (Expr::Predicate(l), Op::Or, Expr::Predicate(r)) => {
                let l = find(algorithm, ctx, l)?;
                let r = find(algorithm, ctx, r)?;
                Ok(union(l, r))
            }
            (Expr::Column(c), Op::In, Expr::Values(values)) => {
                let mut out = Vec::new();
                for v in values {
                    let resp = algorithm.sharding(ctx, &Request::new(Op::Eq, &c.name, v.clone()))?;
                    out = union(out, resp.destinations);
                }
                Ok(out)
            }
            (Expr::Column(c), Op::NotIn, Expr::Values(values)) => {
                let mut out: Option<Vec<Destination>> = None;
                for v in values {
                    let resp =
                        algorithm.sharding(ctx, &Request::new(Op::NotIn, &c.name, v.clone()))?;
                    out = Some(out.map_or_else(
                        || resp.destinations.clone(),
                        |acc| intersect(acc, &resp.destinations),
                    ));
                }
                Ok(out.unwrap_or_else(|| algorithm.broadcast(ctx)))
            }
            (Expr::Column(c), op, Expr::Value(v)) => {
                let resp = algorithm.sharding(ctx, &Request::new(*op, &c.name, v.clone()))?;
                Ok(dedup(resp.destinations))
            }
            _ => Err(Error::TooComplexQuery(format!("{op} over unsupported operands"))),
        },
        Predicate::Not(inner) => {
            let negated = negate(inner)?;
            find(algorithm, ctx, &negated)
        }
        Predicate::Raw(raw) => Err(Error::TooComplexQuery(format!(
            "raw predicate `{}`",
            raw.sql
        ))),
    }
}

/// Pushes a negation one level down.
fn negate(p: &Predicate) -> Result<Predicate> {
    match p {
        Predicate::Not(inner) => Ok((**inner).clone()),
        Predicate::Binary { left, op, right } => {
            let negated_op = op.negate().ok_or(Error::UnsupportedOperator(*op))?;
            match (left, right) {
                (Expr::Predicate(l), Expr::Predicate(r)) if matches!(op, Op::And | Op::Or) => {
                    Ok(Predicate::Binary {
                        left: Expr::Predicate(Box::new(Predicate::Not(l.clone()))),
                        op: negated_op,
                        right: Expr::Predicate(Box::new(Predicate::Not(r.clone()))),
                    })
                }
                _ => Ok(Predicate::Binary {
                    left: left.clone(),
                    op: negated_op,
                    right: right.clone(),
                }),
            }
        }
        Predicate::Raw(raw) => Err(Error::TooComplexQuery(format!(
            "negated raw predicate `{}`",
            raw.sql
        ))),
    }
}

fn intersect(left: Vec<Destination>, right: &[Destination]) -> Vec<Destination> {
    dedup(left.into_iter().filter(|d| right.contains(d)).collect())
}

fn union(mut left: Vec<Destination>, right: Vec<Destination>) -> Vec<Destination> {
    for d in right {
        if !left.contains(&d) {
            left.push(d);
        }
    }
    left
}

fn dedup(dsts: Vec<Destination>) -> Vec<Destination> {
    union(Vec::with_capacity(dsts.len()), dsts)
}
