//! Ordered and filtered reads.
//!
//! A [`QueryBuilder`] collects an ordering and range/limit modifiers;
//! [`QueryBuilder::build`] validates them together and compiles a
//! [`Query`] whose parameters are appended to an ordinary read. Invalid
//! combinations never reach the network.

use rtdb_protocol::{params, WireCodec};
use rtdb_types::{OrderBy, Path, Value};
use serde::de::DeserializeOwned;

use crate::error::{DbError, DbResult};
use crate::reference::{read_value, Ref};

const RESERVED_SELECTORS: &[&str] = &["$key", "$value", "$priority"];

#[derive(Clone, Debug)]
enum Selector {
    Key,
    Value,
    Child(String),
}

/// Accumulates query settings. Selecting an ordering replaces any earlier
/// one.
#[derive(Clone, Debug)]
pub struct QueryBuilder {
    target: Ref,
    selector: Option<Selector>,
    limit_to_first: Option<u32>,
    limit_to_last: Option<u32>,
    start_at: Option<Value>,
    end_at: Option<Value>,
    equal_to: Option<Value>,
}

impl QueryBuilder {
    pub(crate) fn new(target: Ref) -> Self {
        Self {
            target,
            selector: None,
            limit_to_first: None,
            limit_to_last: None,
            start_at: None,
            end_at: None,
            equal_to: None,
        }
    }

    pub fn order_by_key(mut self) -> Self {
        self.selector = Some(Selector::Key);
        self
    }

    pub fn order_by_value(mut self) -> Self {
        self.selector = Some(Selector::Value);
        self
    }

    /// Order by the value at `child`, a relative path beneath each child.
    pub fn order_by_child(mut self, child: &str) -> Self {
        self.selector = Some(Selector::Child(child.to_string()));
        self
    }

    pub fn limit_to_first(mut self, n: u32) -> Self {
        self.limit_to_first = Some(n);
        self
    }

    pub fn limit_to_last(mut self, n: u32) -> Self {
        self.limit_to_last = Some(n);
        self
    }

    pub fn start_at(mut self, bound: impl Into<Value>) -> Self {
        self.start_at = Some(bound.into());
        self
    }

    pub fn end_at(mut self, bound: impl Into<Value>) -> Self {
        self.end_at = Some(bound.into());
        self
    }

    pub fn equal_to(mut self, bound: impl Into<Value>) -> Self {
        self.equal_to = Some(bound.into());
        self
    }

    /// Validate the settings and compile the query.
    pub fn build(self) -> DbResult<Query> {
        if self.limit_to_first.is_some() && self.limit_to_last.is_some() {
            return Err(invalid("limit_to_first and limit_to_last cannot both be set"));
        }
        if self.limit_to_first == Some(0) || self.limit_to_last == Some(0) {
            return Err(invalid("query limits must be positive"));
        }
        if self.equal_to.is_some() && (self.start_at.is_some() || self.end_at.is_some()) {
            return Err(invalid("equal_to cannot be combined with start_at or end_at"));
        }

        let has_modifiers = self.limit_to_first.is_some()
            || self.limit_to_last.is_some()
            || self.start_at.is_some()
            || self.end_at.is_some()
            || self.equal_to.is_some();
        let order = match self.selector {
            None if has_modifiers => {
                return Err(invalid("range bounds and limits require an ordering"));
            }
            None => None,
            Some(Selector::Key) => Some(OrderBy::Key),
            Some(Selector::Value) => Some(OrderBy::Value),
            Some(Selector::Child(child)) => Some(child_order(&child)?),
        };

        let bounds = [
            (params::START_AT, &self.start_at),
            (params::END_AT, &self.end_at),
            (params::EQUAL_TO, &self.equal_to),
        ];
        if order == Some(OrderBy::Key)
            && bounds.iter().any(|(_, b)| b.as_ref().is_some_and(|v| !v.is_string()))
        {
            return Err(invalid("order_by_key bounds must be strings"));
        }

        let mut compiled = Vec::new();
        if let Some(order) = &order {
            let selector = Value::String(order.selector()).to_string();
            compiled.push((params::ORDER_BY.to_string(), selector));
        }
        for (name, bound) in bounds {
            if let Some(bound) = bound {
                compiled.push((name.to_string(), bound.to_string()));
            }
        }
        if let Some(n) = self.limit_to_first {
            compiled.push((params::LIMIT_TO_FIRST.to_string(), n.to_string()));
        }
        if let Some(n) = self.limit_to_last {
            compiled.push((params::LIMIT_TO_LAST.to_string(), n.to_string()));
        }

        Ok(Query {
            target: self.target,
            order,
            params: compiled,
        })
    }
}

fn invalid(msg: &str) -> DbError {
    DbError::InvalidArgument(msg.to_string())
}

fn child_order(child: &str) -> DbResult<OrderBy> {
    if RESERVED_SELECTORS.contains(&child) {
        return Err(DbError::InvalidArgument(format!(
            "{child} is reserved; use the dedicated ordering instead of order_by_child"
        )));
    }
    let path = Path::relative(child)
        .map_err(|e| DbError::InvalidArgument(format!("invalid order_by_child path: {e}")))?;
    Ok(OrderBy::Child(path))
}

/// One child of an ordered query result.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryNode {
    pub key: String,
    pub value: Value,
}

/// A validated query, ready to run any number of times.
#[derive(Clone, Debug)]
pub struct Query {
    target: Ref,
    order: Option<OrderBy>,
    params: Vec<(String, String)>,
}

impl Query {
    pub fn target(&self) -> &Ref {
        &self.target
    }

    pub fn order(&self) -> Option<&OrderBy> {
        self.order.as_ref()
    }

    /// Query-string parameters appended to the read.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Run the query and decode the filtered result.
    pub async fn get<T: DeserializeOwned>(&self) -> DbResult<T> {
        let request = self
            .params
            .iter()
            .fold(WireCodec::get(self.target.path()), |req, (name, value)| {
                req.with_query(name, value.as_str())
            });
        let response = self.target.client().send(request).await?;
        let (body, _) = read_value(WireCodec::read_outcome(response)?)?;
        Ok(WireCodec::decode(&body)?)
    }

    /// Run the query and return its children in the query's order.
    ///
    /// JSON objects carry no order, so the result is sorted here using the
    /// same canonical order the server applies. Without an ordering,
    /// children come back in key order.
    pub async fn get_ordered(&self) -> DbResult<Vec<QueryNode>> {
        let mut entries: Vec<(String, Value)> = match self.get::<Value>().await? {
            Value::Null => Vec::new(),
            Value::Object(map) => map.into_iter().collect(),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            scalar => {
                return Err(DbError::Decode(format!(
                    "query result at {} is not a collection: {scalar}",
                    self.target.path()
                )))
            }
        };
        self.order.as_ref().unwrap_or(&OrderBy::Key).sort(&mut entries);
        Ok(entries
            .into_iter()
            .map(|(key, value)| QueryNode { key, value })
            .collect())
    }
}
