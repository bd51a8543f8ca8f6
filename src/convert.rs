// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Conversion of raw step arguments into the parameter types declared by
//! bindings.

use std::{collections::HashMap, fmt};

use derive_more::with_trait::{Display, Error};
use sealed::sealed;

/// Parameter type a binding declares for one of its arguments.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ParamType {
    /// Arbitrary text.
    String,

    /// Signed 64-bit integer.
    Int,

    /// 64-bit float.
    Float,

    /// `true`/`false`, `yes`/`no`.
    Bool,

    /// Multiline text argument.
    DocString,

    /// [`Table`] argument.
    Table,
}

/// Argument of a step before conversion.
#[derive(Clone, Debug, PartialEq)]
pub enum RawArgument {
    /// Capturing group of the step pattern.
    Capture(String),

    /// Multiline text argument of the step.
    DocString(String),

    /// Table argument of the step.
    Table(Table),
}

impl RawArgument {
    /// Returns the [`ParamType`] this argument is passed as when its binding
    /// declares no parameter types.
    #[must_use]
    pub const fn natural_type(&self) -> ParamType {
        match self {
            Self::Capture(_) => ParamType::String,
            Self::DocString(_) => ParamType::DocString,
            Self::Table(_) => ParamType::Table,
        }
    }
}

/// Argument of a step after conversion.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// [`ParamType::String`] value.
    String(String),

    /// [`ParamType::Int`] value.
    Int(i64),

    /// [`ParamType::Float`] value.
    Float(f64),

    /// [`ParamType::Bool`] value.
    Bool(bool),

    /// [`ParamType::DocString`] value.
    DocString(String),

    /// [`ParamType::Table`] value.
    Table(Table),
}

impl Value {
    /// Returns the [`ParamType`] of this [`Value`].
    #[must_use]
    pub const fn ty(&self) -> ParamType {
        match self {
            Self::String(_) => ParamType::String,
            Self::Int(_) => ParamType::Int,
            Self::Float(_) => ParamType::Float,
            Self::Bool(_) => ParamType::Bool,
            Self::DocString(_) => ParamType::DocString,
            Self::Table(_) => ParamType::Table,
        }
    }
}

/// Error of converting a [`RawArgument`] into a [`ParamType`].
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
#[display("cannot convert `{raw}` into {target}: {reason}")]
pub struct ConversionError {
    /// Raw value being converted.
    pub raw: String,

    /// Requested type.
    pub target: ParamType,

    /// Why the conversion failed.
    pub reason: String,
}

/// Strategy of converting step arguments, pluggable per configuration.
pub trait ValueConverter: fmt::Debug + Send + Sync {
    /// Converts the `raw` argument into the `target` type.
    ///
    /// # Errors
    ///
    /// If the `raw` value cannot represent the `target` type.
    fn convert(
        &self,
        raw: RawArgument,
        target: ParamType,
    ) -> Result<Value, ConversionError>;
}

/// [`ValueConverter`] parsing captures with [`str::parse()`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConverter;

impl ValueConverter for DefaultConverter {
    fn convert(
        &self,
        raw: RawArgument,
        target: ParamType,
    ) -> Result<Value, ConversionError> {
        let fail = |raw: &str, reason: &dyn fmt::Display| ConversionError {
            raw: raw.to_owned(),
            target,
            reason: reason.to_string(),
        };

        match (raw, target) {
            (RawArgument::Capture(s), ParamType::String) => Ok(Value::String(s)),
            (
                RawArgument::Capture(s) | RawArgument::DocString(s),
                ParamType::DocString,
            ) => Ok(Value::DocString(s)),
            (RawArgument::DocString(s), ParamType::String) => Ok(Value::String(s)),
            (RawArgument::Capture(s), ParamType::Int) => s
                .trim()
                .parse()
                .map(Value::Int)
                .map_err(|e| fail(&s, &e)),
            (RawArgument::Capture(s), ParamType::Float) => s
                .trim()
                .parse()
                .map(Value::Float)
                .map_err(|e| fail(&s, &e)),
            (RawArgument::Capture(s), ParamType::Bool) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" => Ok(Value::Bool(true)),
                    "false" | "no" => Ok(Value::Bool(false)),
                    _ => Err(fail(&s, &"not a boolean")),
                }
            }
            (RawArgument::Table(t), ParamType::Table) => Ok(Value::Table(t)),
            (RawArgument::Table(t), _) => {
                Err(fail(&format!("{t}"), &"table arguments convert only into tables"))
            }
            (RawArgument::Capture(s) | RawArgument::DocString(s), _) => {
                Err(fail(&s, &"unsupported conversion"))
            }
        }
    }
}

/// Table argument of a step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates a new [`Table`] out of its rows, the first being the header.
    #[must_use]
    pub fn new<R, C>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Returns all the rows, header included.
    #[must_use]
    pub fn raw(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns the header row, if any.
    #[must_use]
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Returns the rows below the header.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or_default()
    }

    /// Returns every row below the header keyed by the header cells.
    #[must_use]
    pub fn hashes(&self) -> Vec<HashMap<String, String>> {
        let Some(header) = self.header() else {
            return Vec::new();
        };
        self.rows()
            .iter()
            .map(|row| header.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "| {} |", row.join(" | "))?;
        }
        Ok(())
    }
}

impl From<&gherkin::Table> for Table {
    fn from(table: &gherkin::Table) -> Self {
        Self { rows: table.rows.clone() }
    }
}

/// Error of accessing an [`Arguments`] item.
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
pub enum ArgumentError {
    /// No argument at the index.
    #[display("no argument at index {_0}")]
    Missing(#[error(not(source))] usize),

    /// Argument has another type.
    #[display("argument {index} is {found}, not {expected}")]
    Mismatch {
        /// Index of the argument.
        index: usize,

        /// Requested type.
        expected: ParamType,

        /// Actual type.
        found: ParamType,
    },
}

/// Converted arguments passed to a step [`fn`], in pattern order, followed
/// by the multiline text and table arguments, if any.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments(Vec<Value>);

impl Arguments {
    /// Creates new [`Arguments`] out of converted [`Value`]s.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indicates whether there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw [`Value`] at the `index`.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Returns the argument at the `index` as the requested type.
    ///
    /// # Errors
    ///
    /// If there is no argument at the `index`, or it has another type.
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T, ArgumentError> {
        let value = self.0.get(index).ok_or(ArgumentError::Missing(index))?;
        T::from_value(value).ok_or(ArgumentError::Mismatch {
            index,
            expected: T::TYPE,
            found: value.ty(),
        })
    }
}

/// Rust type an [`Arguments`] item can be extracted as.
#[sealed]
pub trait FromValue: Sized {
    /// [`ParamType`] this type is extracted from.
    const TYPE: ParamType;

    /// Extracts this type out of the `value`, if it has the right type.
    fn from_value(value: &Value) -> Option<Self>;
}

#[sealed]
impl FromValue for String {
    const TYPE: ParamType = ParamType::String;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) | Value::DocString(s) => Some(s.clone()),
            _ => None,
        }
    }
}

#[sealed]
impl FromValue for i64 {
    const TYPE: ParamType = ParamType::Int;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

#[sealed]
impl FromValue for f64 {
    const TYPE: ParamType = ParamType::Float;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

#[sealed]
impl FromValue for bool {
    const TYPE: ParamType = ParamType::Bool;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

#[sealed]
impl FromValue for Table {
    const TYPE: ParamType = ParamType::Table;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Table(t) => Some(t.clone()),
            _ => None,
        }
    }
}
