//! Record predicates and sort orders for the local store

use rusqlite::types::Value;

use crate::models::{BookId, OwnerId};

/// SQL form of [`crate::models::RecordLifecycle::is_visible`]
///
/// Every read path that hides tombstones goes through [`RecordQuery`], which
/// is the only place this predicate is emitted.
pub(crate) const VISIBLE_PREDICATE: &str = "lifecycle = 'active'";

/// Sort key for record queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Newest first
    #[default]
    CreatedDesc,
    /// Oldest first
    CreatedAsc,
}

impl SortOrder {
    const fn sql(self) -> &'static str {
        match self {
            Self::CreatedDesc => "created_at DESC, id DESC",
            Self::CreatedAsc => "created_at ASC, id ASC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Equals(&'static str, Value),
    IsNull(&'static str),
}

/// Predicate plus sort order over one collection
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    include_hidden: bool,
    conditions: Vec<Condition>,
    order: SortOrder,
}

impl RecordQuery {
    /// Records visible to normal reads, newest first
    pub const fn visible() -> Self {
        Self {
            include_hidden: false,
            conditions: Vec::new(),
            order: SortOrder::CreatedDesc,
        }
    }

    /// Every physically present record, tombstones included
    pub const fn raw() -> Self {
        Self {
            include_hidden: true,
            conditions: Vec::new(),
            order: SortOrder::CreatedDesc,
        }
    }

    #[must_use]
    pub fn owned_by(mut self, owner_id: OwnerId) -> Self {
        self.conditions
            .push(Condition::Equals("owner_id", Value::Text(owner_id.as_str())));
        self
    }

    /// Words of one book, or global words when `book_id` is `None`
    #[must_use]
    pub fn in_book(mut self, book_id: Option<BookId>) -> Self {
        self.conditions.push(match book_id {
            Some(book_id) => Condition::Equals("book_id", Value::Text(book_id.as_str())),
            None => Condition::IsNull("book_id"),
        });
        self
    }

    #[must_use]
    pub fn needs_sync(mut self, needs_sync: bool) -> Self {
        self.conditions.push(Condition::Equals(
            "needs_sync",
            Value::Integer(i64::from(needs_sync)),
        ));
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// `WHERE` clause (possibly empty) and its bound values
    pub(crate) fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if !self.include_hidden {
            clauses.push(VISIBLE_PREDICATE.to_string());
        }
        for condition in &self.conditions {
            match condition {
                Condition::Equals(column, value) => {
                    clauses.push(format!("{column} = ?"));
                    values.push(value.clone());
                }
                Condition::IsNull(column) => clauses.push(format!("{column} IS NULL")),
            }
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), values)
        }
    }

    pub(crate) const fn order_clause(&self) -> &'static str {
        self.order.sql()
    }
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self::visible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_query_always_filters_tombstones() {
        let (clause, values) = RecordQuery::visible().where_clause();
        assert_eq!(clause, format!(" WHERE {VISIBLE_PREDICATE}"));
        assert!(values.is_empty());
    }

    #[test]
    fn raw_query_has_no_predicate() {
        let (clause, _) = RecordQuery::raw().where_clause();
        assert!(clause.is_empty());
    }

    #[test]
    fn global_words_filter_uses_is_null() {
        let (clause, values) = RecordQuery::visible().in_book(None).where_clause();
        assert!(clause.ends_with("book_id IS NULL"));
        assert!(values.is_empty());
    }

    #[test]
    fn conditions_bind_values_in_order() {
        let owner = OwnerId::new();
        let (clause, values) = RecordQuery::raw()
            .owned_by(owner)
            .needs_sync(true)
            .where_clause();
        assert_eq!(clause, " WHERE owner_id = ? AND needs_sync = ?");
        assert_eq!(
            values,
            vec![Value::Text(owner.as_str()), Value::Integer(1)]
        );
    }
}
