use super::RowSource;
use crate::core::{DbError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::marker::PhantomData;

/// Lazy sequence of decoded rows.
///
/// Owns its source, so it can be traversed once. The source is closed as
/// soon as it is exhausted or yields an error, and in any case when the
/// iterator is dropped.
pub struct Decoded<S: RowSource, T> {
    source: S,
    done: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<S: RowSource, T: DeserializeOwned> Decoded<S, T> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            done: false,
            _marker: PhantomData,
        }
    }

    fn finish(&mut self) {
        self.done = true;
        if !self.source.is_closed() {
            self.source.close();
        }
    }
}

impl<S: RowSource, T: DeserializeOwned> Iterator for Decoded<S, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let step = match self.source.advance() {
            Ok(true) => self.source.row().and_then(|row| row.decode::<T>()),
            Ok(false) => {
                self.finish();
                return None;
            }
            Err(e) => Err(e),
        };

        if step.is_err() {
            self.finish();
        }
        Some(step)
    }
}

impl<S: RowSource, T: DeserializeOwned> FusedIterator for Decoded<S, T> {}

impl<S: RowSource, T> Drop for Decoded<S, T> {
    fn drop(&mut self) {
        if !self.source.is_closed() {
            self.source.close();
        }
    }
}

/// A caller-owned, growable, ordered container that rows decode into.
pub trait Destination {
    type Item: DeserializeOwned;

    /// Reject containers that cannot take decoded rows.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store `item` at `index`: overwrite the slot if it exists, else append.
    fn put(&mut self, index: usize, item: Self::Item);

    fn truncate(&mut self, len: usize);
}

impl<T: DeserializeOwned> Destination for Vec<T> {
    type Item = T;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn put(&mut self, index: usize, item: T) {
        if index < Vec::len(self) {
            self[index] = item;
        } else {
            self.push(item);
        }
    }

    fn truncate(&mut self, len: usize) {
        Vec::truncate(self, len);
    }
}

impl<T: DeserializeOwned> Destination for VecDeque<T> {
    type Item = T;

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn put(&mut self, index: usize, item: T) {
        if index < VecDeque::len(self) {
            self[index] = item;
        } else {
            self.push_back(item);
        }
    }

    fn truncate(&mut self, len: usize) {
        VecDeque::truncate(self, len);
    }
}

/// Untyped destination; only a JSON array qualifies.
impl Destination for Value {
    type Item = Value;

    fn check(&self) -> Result<()> {
        match self {
            Value::Array(_) => Ok(()),
            other => Err(DbError::InvalidDestination(format!(
                "expected a JSON array, got {}",
                match other {
                    Value::Null => "null",
                    Value::Bool(_) => "a boolean",
                    Value::Number(_) => "a number",
                    Value::String(_) => "a string",
                    Value::Object(_) => "an object",
                    Value::Array(_) => unreachable!(),
                }
            ))),
        }
    }

    fn len(&self) -> usize {
        self.as_array().map_or(0, Vec::len)
    }

    fn put(&mut self, index: usize, item: Value) {
        if let Some(array) = self.as_array_mut() {
            array.put(index, item);
        }
    }

    fn truncate(&mut self, len: usize) {
        if let Some(array) = self.as_array_mut() {
            array.truncate(len);
        }
    }
}

/// Decode every row of `source` into `destination`, in source order.
///
/// Existing slots are reused, new ones appended, and the container is then
/// truncated to exactly the number of rows decoded, which is returned.
/// The source is released on every path. On error the destination is
/// emptied, so partial results are never visible to the caller.
pub fn decode_rows<S, D>(source: S, destination: &mut D) -> Result<usize>
where
    S: RowSource,
    D: Destination + ?Sized,
{
    let rows = Decoded::<S, D::Item>::new(source);
    destination.check()?;

    let mut index = 0;
    for item in rows {
        match item {
            Ok(item) => {
                destination.put(index, item);
                index += 1;
            }
            Err(e) => {
                destination.truncate(0);
                return Err(e);
            }
        }
    }

    destination.truncate(index);
    tracing::trace!(rows = index, "materialized rows");
    Ok(index)
}

/// Decode every row into a fresh `Vec`.
pub fn collect_rows<S, T>(source: S) -> Result<Vec<T>>
where
    S: RowSource,
    T: DeserializeOwned,
{
    let mut out = Vec::new();
    decode_rows(source, &mut out)?;
    Ok(out)
}
