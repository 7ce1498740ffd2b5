//! Compact argument-type descriptors for host-implemented functions.
//!
//! A descriptor packs a return type and up to [`ArgSpec::MAX_PARAMS`]
//! parameter types into a single `u32`, three bits per slot, so it fits in
//! the payload of a native function record. The evaluator's call protocol
//! reads it to marshal script values into host types and back.

use std::fmt;

/// Marshalling type of a single argument or return value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArgType {
    /// No value (only meaningful as a return type).
    Void = 0,
    /// A locked value reference (possibly undefined).
    Var = 1,
    /// Boolean.
    Bool = 2,
    /// 32-bit integer.
    Int32 = 3,
    /// 64-bit float.
    Float = 4,
    /// Pin/handle number (an integer with host meaning).
    Pin = 5,
    /// All remaining arguments, reified as an array.
    ArgArray = 6,
}

impl ArgType {
    fn from_bits(bits: u32) -> Self {
        match bits & 0b111 {
            1 => ArgType::Var,
            2 => ArgType::Bool,
            3 => ArgType::Int32,
            4 => ArgType::Float,
            5 => ArgType::Pin,
            6 => ArgType::ArgArray,
            _ => ArgType::Void,
        }
    }
}

/// Packed native call descriptor.
///
/// Layout: bits 0..3 return type, then three bits per parameter, and the top
/// bit flags that the function receives `this`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgSpec(u32);

impl ArgSpec {
    /// Maximum number of described parameters.
    pub const MAX_PARAMS: usize = 9;

    const THIS_BIT: u32 = 1 << 31;

    /// Descriptor with the given return type and no parameters.
    pub const fn returns(ret: ArgType) -> Self {
        ArgSpec(ret as u32)
    }

    /// Append a parameter. Parameters past [`Self::MAX_PARAMS`] are ignored.
    #[must_use]
    pub const fn param(self, ty: ArgType) -> Self {
        let count = self.param_count();
        if count >= Self::MAX_PARAMS {
            return self;
        }
        let shift = 3 * (count + 1);
        ArgSpec(self.0 | ((ty as u32) << shift))
    }

    /// Mark the function as receiving `this`.
    #[must_use]
    pub const fn with_this(self) -> Self {
        ArgSpec(self.0 | Self::THIS_BIT)
    }

    /// Return type.
    pub fn ret(self) -> ArgType {
        ArgType::from_bits(self.0)
    }

    /// Whether `this` is passed to the host function.
    pub fn takes_this(self) -> bool {
        self.0 & Self::THIS_BIT != 0
    }

    /// Number of described parameters.
    pub const fn param_count(self) -> usize {
        let mut count = 0;
        while count < Self::MAX_PARAMS {
            if (self.0 >> (3 * (count + 1))) & 0b111 == 0 {
                break;
            }
            count += 1;
        }
        count
    }

    /// Type of parameter `index`.
    pub fn param_type(self, index: usize) -> Option<ArgType> {
        if index >= self.param_count() {
            return None;
        }
        Some(ArgType::from_bits(self.0 >> (3 * (index + 1))))
    }

    /// Iterate over the parameter types.
    pub fn params(self) -> impl Iterator<Item = ArgType> {
        (0..self.param_count()).filter_map(move |i| self.param_type(i))
    }

    /// The packed representation.
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_struct("ArgSpec");
        list.field("ret", &self.ret());
        list.field("params", &self.params().collect::<Vec<_>>());
        list.field("this", &self.takes_this());
        list.finish()
    }
}

/// Identifier of a registered native function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeId(pub u16);
