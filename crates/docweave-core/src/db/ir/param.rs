use crate::{db::compile::CompileError, model::FieldKind, value::Value};
use std::collections::BTreeMap;

///
/// ParamDirection
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ParamDirection {
    #[default]
    In,
    Out,
    InOut,
}

///
/// Parameter
///
/// Declared named parameter. The value slot is not here: values live in a
/// per-call `ParamSet` so a shared builder never holds call state.
///

#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    pub direction: ParamDirection,
    pub size: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub db_type: Option<String>,
    /// Set at normalization when a condition references the parameter.
    pub used: bool,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            direction: ParamDirection::In,
            size: None,
            precision: None,
            scale: None,
            db_type: None,
            used: false,
        }
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub const fn direction(mut self, direction: ParamDirection) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub const fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub const fn precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    #[must_use]
    pub fn db_type(mut self, db_type: impl Into<String>) -> Self {
        self.db_type = Some(db_type.into());
        self
    }
}

///
/// ParamSet
///
/// Per-call snapshot of parameter declarations plus their values.
/// Obtained from `Builder::params()`; never shared between calls.
///

#[derive(Clone, Debug, Default)]
pub struct ParamSet {
    declared: Vec<Parameter>,
    values: BTreeMap<String, Value>,
}

impl ParamSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, param: Parameter) -> &mut Self {
        self.declared.push(param);
        self
    }

    /// Set a declared parameter's value for this call.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self, CompileError> {
        let param = self
            .declaration(name)
            .ok_or_else(|| CompileError::UnknownParameter {
                name: name.to_string(),
            })?;

        let value = value.into();
        if value.is_null() && !param.nullable {
            return Err(CompileError::NullParameter {
                name: name.to_string(),
            });
        }

        self.values.insert(name.to_string(), value);

        Ok(self)
    }

    #[must_use]
    pub fn declaration(&self, name: &str) -> Option<&Parameter> {
        self.declared.iter().find(|param| param.name == name)
    }

    #[must_use]
    pub fn declarations(&self) -> &[Parameter] {
        &self.declared
    }

    /// Current value, `None` when never set.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
