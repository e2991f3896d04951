//! Fixed-width scalar values.
//!
//! Values read out of a dump carry the width of the field they came from. A
//! `U16` built from `0x1_2345` keeps only `0x2345`; an `I8` built from `0xff`
//! is `-1`. Construction never fails: out-of-range input is masked (unsigned)
//! or truncated and sign-extended (signed), exactly like a load of that width.
//!
//! ```rust
//! use jcdump_core::types::scalar::{I8, I32, U16};
//!
//! assert_eq!(U16::new(0x1_2345).value(), 0x2345);
//! assert_eq!(I8::new(0xff).value(), -1);
//! assert_eq!(I32::from(I8::new(-5)).value(), -5);
//! ```

use std::fmt;

macro_rules! unsigned_scalar {
    ($(#[$meta:meta])* $name:ident, $native:ty, $bits:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name($native);

        impl $name
        {
            /// Width of the value in bits.
            pub const BITS: u32 = $bits;

            /// Build from any unsigned input, keeping the low bits.
            #[allow(clippy::cast_possible_truncation)]
            pub const fn new(raw: u64) -> Self
            {
                Self(raw as $native)
            }

            /// The value at its native width.
            pub const fn value(self) -> $native
            {
                self.0
            }

            /// Lossless widening for comparisons across widths.
            pub const fn widen(self) -> i128
            {
                self.0 as i128
            }
        }

        impl fmt::Display for $name
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
            {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::LowerHex for $name
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
            {
                fmt::LowerHex::fmt(&self.0, f)
            }
        }
    };
}

macro_rules! signed_scalar {
    ($(#[$meta:meta])* $name:ident, $native:ty, $bits:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name($native);

        impl $name
        {
            /// Width of the value in bits.
            pub const BITS: u32 = $bits;

            /// Build from any input, truncating to the width and sign-extending.
            #[allow(clippy::cast_possible_truncation)]
            pub const fn new(raw: i64) -> Self
            {
                Self(raw as $native)
            }

            /// The value at its native width.
            pub const fn value(self) -> $native
            {
                self.0
            }

            /// Lossless widening for comparisons across widths.
            pub const fn widen(self) -> i128
            {
                self.0 as i128
            }
        }

        impl fmt::Display for $name
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
            {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! widening {
    ($($narrow:ident => $wide:ident),* $(,)?) => {
        $(
            impl From<$narrow> for $wide
            {
                fn from(value: $narrow) -> Self
                {
                    Self(value.value().into())
                }
            }
        )*
    };
}

unsigned_scalar!(
    /// Unsigned 8-bit dump value.
    U8, u8, 8
);
unsigned_scalar!(
    /// Unsigned 16-bit dump value.
    U16, u16, 16
);
unsigned_scalar!(
    /// Unsigned 32-bit dump value.
    U32, u32, 32
);
unsigned_scalar!(
    /// Unsigned 64-bit dump value.
    U64, u64, 64
);
unsigned_scalar!(
    /// Unsigned pointer-width value (`UDATA`).
    UData, u64, 64
);
signed_scalar!(
    /// Signed 8-bit dump value.
    I8, i8, 8
);
signed_scalar!(
    /// Signed 16-bit dump value.
    I16, i16, 16
);
signed_scalar!(
    /// Signed 32-bit dump value.
    I32, i32, 32
);
signed_scalar!(
    /// Signed 64-bit dump value.
    I64, i64, 64
);
signed_scalar!(
    /// Signed pointer-width value (`IDATA`).
    IData, i64, 64
);

widening!(
    U8 => U16, U8 => U32, U8 => U64, U8 => UData,
    U16 => U32, U16 => U64, U16 => UData,
    U32 => U64, U32 => UData,
    I8 => I16, I8 => I32, I8 => I64, I8 => IData,
    I16 => I32, I16 => I64, I16 => IData,
    I32 => I64, I32 => IData,
);

impl From<UData> for crate::types::Address
{
    fn from(value: UData) -> Self
    {
        Self::new(value.value())
    }
}
