//! Named-operation registry.
//!
//! Non-native callers (LabVIEW, MATLAB, shell harnesses) drive the session by
//! operation name with string-typed arguments. Instead of reflecting method
//! names onto an object at call time, operations are registered up front
//! against explicit closures, and argument strings are parsed into typed
//! values at the boundary. Unknown names and malformed enum references come
//! back as typed errors, never as a panic.

use std::collections::HashMap;

use log::debug;

use crate::types::{DevInterface, Error, Mode, Result};

/// A typed argument or return value crossing the registry boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum OpValue {
    /// No value (operation completed with nothing to report).
    None,
    /// Integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Plain string.
    Str(String),
    /// A parsed `DevInterface.X` reference.
    Interface(DevInterface),
    /// A parsed `Mode.X` reference.
    Mode(Mode),
}

impl OpValue {
    /// Parses one caller-supplied argument string.
    ///
    /// Numbers parse to `Int` or `Float`. A dotted `Type.Variant` string must
    /// name a known enum type and variant, mirroring how foreign callers
    /// spell `DevInterface.LAN`; anything else is passed through as `Str`.
    pub fn parse(raw: &str) -> Result<Self> {
        if let Ok(i) = raw.parse::<i64>() {
            return Ok(OpValue::Int(i));
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Ok(OpValue::Float(f));
        }
        if let Some((type_name, variant)) = raw.split_once('.') {
            return match type_name {
                "DevInterface" => DevInterface::from_name(variant)
                    .or_else(|| (variant == "ALL").then_some(DevInterface::ALL))
                    .map(OpValue::Interface)
                    .ok_or_else(|| Error::EnumParse(raw.into())),
                "Mode" => match variant {
                    "Idle" => Ok(OpValue::Mode(Mode::Idle)),
                    "Sweeping" => Ok(OpValue::Mode(Mode::Sweeping)),
                    _ => Err(Error::EnumParse(raw.into())),
                },
                _ => Err(Error::EnumParse(raw.into())),
            };
        }
        Ok(OpValue::Str(raw.into()))
    }
}

type OpFn<C> = Box<dyn Fn(&mut C, &[OpValue]) -> Result<OpValue>>;

/// Maps operation names to typed closures over a context `C`.
pub struct OpRegistry<C> {
    ops: HashMap<String, OpFn<C>>,
}

impl<C> Default for OpRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> OpRegistry<C> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            ops: HashMap::new(),
        }
    }

    /// Registers `op` under `name`. Duplicate names are rejected.
    pub fn register<F>(&mut self, name: &str, op: F) -> Result<()>
    where
        F: Fn(&mut C, &[OpValue]) -> Result<OpValue> + 'static,
    {
        if self.ops.contains_key(name) {
            return Err(Error::Argument("operation name already registered"));
        }
        self.ops.insert(name.to_owned(), Box::new(op));
        Ok(())
    }

    /// Invokes the operation registered under `name`.
    pub fn dispatch(&self, name: &str, ctx: &mut C, args: &[OpValue]) -> Result<OpValue> {
        let op = self
            .ops
            .get(name)
            .ok_or_else(|| Error::UnknownOperation(name.to_owned()))?;
        debug!("Dispatching {name}() with {args:?}");
        op(ctx, args)
    }

    /// Parses raw argument strings and invokes `name` in one step.
    pub fn dispatch_raw(&self, name: &str, ctx: &mut C, raw_args: &[&str]) -> Result<OpValue> {
        let args = raw_args
            .iter()
            .map(|raw| OpValue::parse(raw))
            .collect::<Result<Vec<_>>>()?;
        self.dispatch(name, ctx, &args)
    }
}
