pub mod frames;
use std::{
    marker::PhantomData,
    ops::{Deref, DerefMut, Mul},
};

pub use frames::*;

/// A value tagged with the frame it is expressed in.
///
/// Transforms are tagged `fn(From) -> To`, so that applying one to a value in
/// the wrong frame does not compile.
pub struct Framed<T, F> {
    inner: T,
    frame: PhantomData<F>,
}

impl<T: Clone, F> Clone for Framed<T, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            frame: PhantomData,
        }
    }
}

impl<T: std::fmt::Debug, F> std::fmt::Debug for Framed<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

impl<T: Default, F> Default for Framed<T, F> {
    fn default() -> Self {
        Self {
            inner: Default::default(),
            frame: PhantomData,
        }
    }
}

impl<T, F> Framed<T, F> {
    pub const fn new(inner: T) -> Self {
        Self {
            inner,
            frame: PhantomData,
        }
    }
    pub fn new_with_frame(inner: T, frame: F) -> Self {
        let _ = frame;
        Self::new(inner)
    }
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T, F1, F2> Framed<T, fn(F1) -> F2> {
    pub fn new_transform(inner: T, from: F1, to: F2) -> Self {
        let _ = (from, to);
        Self {
            inner,
            frame: PhantomData,
        }
    }
}

impl<T, F> Deref for Framed<T, F> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T, F> DerefMut for Framed<T, F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<T1, T2, F1, F2> Mul<Framed<T2, fn(F1) -> F2>> for Framed<T1, F1>
where
    T2: Mul<T1>,
{
    type Output = Framed<<T2 as Mul<T1>>::Output, F2>;
    fn mul(self, transform: Framed<T2, fn(F1) -> F2>) -> Self::Output {
        Framed {
            inner: transform.inner * self.inner,
            frame: PhantomData,
        }
    }
}

impl<'a, T1, T2, F1, F2> Mul<&'a Framed<T2, fn(F1) -> F2>> for &'a Framed<T1, F1>
where
    &'a T2: Mul<&'a T1>,
{
    type Output = Framed<<&'a T2 as Mul<&'a T1>>::Output, F2>;
    fn mul(self, transform: &'a Framed<T2, fn(F1) -> F2>) -> Self::Output {
        Framed {
            inner: transform.deref() * self.deref(),
            frame: PhantomData,
        }
    }
}
