//! Reusable left-fold specifications
//!
//! A [`Fold`] packages an initial accumulator, a step, and a final
//! extraction so that chunking combinators like [`Direct::groups_of`] can
//! restart it once per group.
//!
//! [`Direct::groups_of`]: crate::stream::Direct::groups_of

use std::marker::PhantomData;
use std::ops::Add;

use braid_common::Result;

/// A restartable left fold.
pub trait Fold: Send {
    /// Element type consumed.
    type Item;
    /// Accumulator threaded through the fold.
    type Acc: Send;
    /// Final result extracted from the accumulator.
    type Output: Send;

    /// Fresh accumulator for a new run.
    fn initial(&mut self) -> Self::Acc;

    /// Absorb one element.
    fn step(&mut self, acc: Self::Acc, x: Self::Item) -> Result<Self::Acc>;

    /// Extract the result.
    fn done(&mut self, acc: Self::Acc) -> Result<Self::Output>;
}

/// Sum of the elements.
pub struct Sum<T>(PhantomData<fn() -> T>);

impl<T> Sum<T> {
    pub fn new() -> Self {
        Sum(PhantomData)
    }
}

impl<T> Default for Sum<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Fold for Sum<T>
where
    T: Default + Add<Output = T> + Send,
{
    type Item = T;
    type Acc = T;
    type Output = T;

    fn initial(&mut self) -> T {
        T::default()
    }

    fn step(&mut self, acc: T, x: T) -> Result<T> {
        Ok(acc + x)
    }

    fn done(&mut self, acc: T) -> Result<T> {
        Ok(acc)
    }
}

/// Number of elements.
pub struct Count<T>(PhantomData<fn() -> T>);

impl<T> Count<T> {
    pub fn new() -> Self {
        Count(PhantomData)
    }
}

impl<T> Default for Count<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Fold for Count<T> {
    type Item = T;
    type Acc = usize;
    type Output = usize;

    fn initial(&mut self) -> usize {
        0
    }

    fn step(&mut self, acc: usize, _x: T) -> Result<usize> {
        Ok(acc + 1)
    }

    fn done(&mut self, acc: usize) -> Result<usize> {
        Ok(acc)
    }
}

/// The elements, collected in order.
pub struct Collect<T>(PhantomData<fn() -> T>);

impl<T> Collect<T> {
    pub fn new() -> Self {
        Collect(PhantomData)
    }
}

impl<T> Default for Collect<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Fold for Collect<T> {
    type Item = T;
    type Acc = Vec<T>;
    type Output = Vec<T>;

    fn initial(&mut self) -> Vec<T> {
        Vec::new()
    }

    fn step(&mut self, mut acc: Vec<T>, x: T) -> Result<Vec<T>> {
        acc.push(x);
        Ok(acc)
    }

    fn done(&mut self, acc: Vec<T>) -> Result<Vec<T>> {
        Ok(acc)
    }
}
