use crate::{Error, Result};
use rust_decimal::Decimal;
use time::OffsetDateTime;

/// A typed cell travelling between an entity and the database.
///
/// Every variant carries an `Option` so column nullability does not need a
/// parallel type, a null integer is simply `Int64(None)`. The bare `Null`
/// variant is what a backend reports when it has no type information at
/// all, for example an aggregate over an empty set.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int64(Option<i64>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
    Timestamp(Option<OffsetDateTime>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Decimal(v) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(..) => "boolean",
            Value::Int64(..) => "int64",
            Value::Float64(..) => "float64",
            Value::Decimal(..) => "decimal",
            Value::Varchar(..) => "varchar",
            Value::Timestamp(..) => "timestamp",
        }
    }
}

/// Conversion from plain Rust values into [`Value`], the direction used
/// when binding parameters.
pub trait AsValue {
    fn as_value(self) -> Value;
}

impl AsValue for bool {
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
}

impl AsValue for i64 {
    fn as_value(self) -> Value {
        Value::Int64(Some(self))
    }
}

impl AsValue for f64 {
    fn as_value(self) -> Value {
        Value::Float64(Some(self))
    }
}

impl AsValue for Decimal {
    fn as_value(self) -> Value {
        Value::Decimal(Some(self))
    }
}

impl AsValue for String {
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
}

impl AsValue for &str {
    fn as_value(self) -> Value {
        Value::Varchar(Some(self.to_owned()))
    }
}

impl AsValue for OffsetDateTime {
    fn as_value(self) -> Value {
        Value::Timestamp(Some(self))
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => Value::Null,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty),* $(,)?) => {$(
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                v.as_value()
            }
        }

        impl From<Option<$ty>> for Value {
            fn from(v: Option<$ty>) -> Self {
                v.as_value()
            }
        }
    )*};
}

value_from!(bool, i64, f64, Decimal, String, &str, OffsetDateTime);

/// Conversion out of a [`Value`], the direction used when populating an
/// entity from a fetched row. Implementations accept `Null` as `None`
/// and report a [`Error::Conversion`] on a genuine type mismatch, with
/// the column name filled in by the caller.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: &'static str, found: &Value) -> Error {
    Error::Conversion {
        column: String::new(),
        expected,
        found: found.type_name(),
    }
}

impl FromValue for Option<bool> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            Value::Boolean(v) => Ok(v),
            other => Err(mismatch("boolean", &other)),
        }
    }
}

impl FromValue for Option<i64> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            Value::Int64(v) => Ok(v),
            other => Err(mismatch("int64", &other)),
        }
    }
}

impl FromValue for Option<f64> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            Value::Float64(v) => Ok(v),
            other => Err(mismatch("float64", &other)),
        }
    }
}

impl FromValue for Option<Decimal> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            Value::Decimal(v) => Ok(v),
            // Sequence driven backends may hand decimals back as integers.
            Value::Int64(v) => Ok(v.map(Decimal::from)),
            other => Err(mismatch("decimal", &other)),
        }
    }
}

impl FromValue for Option<String> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            Value::Varchar(v) => Ok(v),
            other => Err(mismatch("varchar", &other)),
        }
    }
}

impl FromValue for Option<OffsetDateTime> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            Value::Timestamp(v) => Ok(v),
            other => Err(mismatch("timestamp", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_binds_to_null() {
        let none: Option<i64> = None;
        assert_eq!(none.as_value(), Value::Null);
        assert_eq!(Some(7i64).as_value(), Value::Int64(Some(7)));
    }

    #[test]
    fn null_reads_as_none() {
        let got: Option<String> = FromValue::from_value(Value::Null).unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn mismatch_reports_both_types() {
        let err = <Option<i64> as FromValue>::from_value(Value::Varchar(Some("x".into())))
            .unwrap_err();
        match err {
            Error::Conversion { expected, found, .. } => {
                assert_eq!(expected, "int64");
                assert_eq!(found, "varchar");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn decimal_accepts_integer_payload() {
        let got: Option<Decimal> = FromValue::from_value(Value::Int64(Some(40))).unwrap();
        assert_eq!(got, Some(Decimal::from(40)));
    }
}
