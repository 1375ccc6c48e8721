/// Generates the shared API of a fixed-size byte buffer newtype.
///
/// The type must be declared as `struct Foo([u8; N])` and derive the borsh
/// traits itself.  This provides constructors, accessors, conversions, hex
/// formatting and hex-string serde.
macro_rules! impl_buf_common {
    ($name:ident, $len:expr) => {
        impl $name {
            pub const LEN: usize = $len;

            pub const fn new(data: [u8; $len]) -> Self {
                Self(data)
            }

            pub const fn zero() -> Self {
                Self([0; $len])
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn as_slice(&self) -> &[u8] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self::zero()
            }
        }

        impl ::std::convert::From<[u8; $len]> for $name {
            fn from(value: [u8; $len]) -> Self {
                Self(value)
            }
        }

        impl ::std::convert::AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl ::std::convert::TryFrom<&[u8]> for $name {
            type Error = $crate::errors::BufLenError;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; $len] =
                    value
                        .try_into()
                        .map_err(|_| $crate::errors::BufLenError {
                            expected: $len,
                            got: value.len(),
                        })?;
                Ok(Self(arr))
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(&::hex::encode(self.0))
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                // first and last bytes only, ids get noisy in logs
                f.write_str(&::hex::encode(&self.0[..3]))?;
                f.write_str("..")?;
                f.write_str(&::hex::encode(&self.0[$len - 3..]))
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: ::serde::Serializer,
            {
                serializer.serialize_str(&::hex::encode(self.0))
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let s = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                let hex_str = s
                    .strip_prefix("0x")
                    .or_else(|| s.strip_prefix("0X"))
                    .unwrap_or(&s);
                let bytes = ::hex::decode(hex_str).map_err(::serde::de::Error::custom)?;
                Self::try_from(bytes.as_slice()).map_err(::serde::de::Error::custom)
            }
        }
    };
}

/// Generates conversions for a newtype over one of the buffer types.
macro_rules! impl_buf_wrapper {
    ($wrapper:ident, $name:ident) => {
        impl $wrapper {
            pub const fn new(buf: $name) -> Self {
                Self(buf)
            }

            pub fn inner(&self) -> &$name {
                &self.0
            }

            pub fn as_slice(&self) -> &[u8] {
                self.0.as_slice()
            }
        }

        impl ::std::convert::From<$name> for $wrapper {
            fn from(value: $name) -> Self {
                Self(value)
            }
        }

        impl ::std::convert::From<$wrapper> for $name {
            fn from(value: $wrapper) -> Self {
                value.0
            }
        }

        impl ::std::fmt::Debug for $wrapper {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Debug::fmt(&self.0, f)
            }
        }

        impl ::std::fmt::Display for $wrapper {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

/// Generates the usual impls for a numeric id newtype like `struct Foo(u32);`.
macro_rules! impl_numeric_id {
    ($name:ident, $inner:ty) => {
        impl $name {
            pub const fn new(v: $inner) -> Self {
                Self(v)
            }

            pub const fn inner(&self) -> $inner {
                self.0
            }
        }

        impl ::std::convert::From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

pub(crate) use impl_buf_common;
pub(crate) use impl_buf_wrapper;
pub(crate) use impl_numeric_id;
