//! Fixed-length array (de)serialization beyond serde's 32-element derives.
//!
//! The on-disk records embed arrays of 64, 100 and 128 elements (names,
//! child indices, file slots), which serde does not derive implementations
//! for. The helpers below encode an `[T; N]` as a tuple: element after
//! element, with no length prefix. Combined with `bincode`'s little-endian
//! fixed-integer encoding, this reproduces a raw C struct layout byte for
//! byte, which is what keeps the image format stable across sessions.
//!
//! Use on a field as `#[serde(with = "fatsim_api::serde_fixed")]`.

use serde::de::{Error, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Serialize a fixed-length array as a tuple of its elements.
pub fn serialize<S, T, const N: usize>(arr: &[T; N], ser: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let mut tup = ser.serialize_tuple(N)?;
    for el in arr.iter() {
        tup.serialize_element(el)?;
    }
    tup.end()
}

struct ArrayVisitor<T, const N: usize>(PhantomData<T>);

impl<'de, T, const N: usize> Visitor<'de> for ArrayVisitor<T, N>
where
    T: Deserialize<'de> + Copy + Default,
{
    type Value = [T; N];

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "an array of {} elements", N)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut arr = [T::default(); N];
        for (i, slot) in arr.iter_mut().enumerate() {
            *slot = seq
                .next_element()?
                .ok_or_else(|| A::Error::invalid_length(i, &self))?;
        }
        Ok(arr)
    }
}

/// Deserialize a fixed-length array previously written by [`serialize`].
pub fn deserialize<'de, D, T, const N: usize>(de: D) -> Result<[T; N], D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Copy + Default,
{
    de.deserialize_tuple(N, ArrayVisitor::<T, N>(PhantomData))
}
