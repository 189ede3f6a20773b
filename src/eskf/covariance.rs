use crate::eskf::state::{KFState, SubStateOf};
use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use nalgebra::{
    CStride, DefaultAllocator, DimName, MatrixView, MatrixViewMut, OMatrix, RStride,
    allocator::Allocator,
};
use num_traits::{One, Zero};

type OwnedStateMatrix<T, R, C> = OMatrix<T, R, C>;
type StateMatrixViewMut<'a, T, RV, CV, R, C> =
    MatrixViewMut<'a, T, RV, CV, RStride<T, R, C>, CStride<T, R, C>>;
type StateMatrixView<'a, T, RV, CV, R, C> =
    MatrixView<'a, T, RV, CV, RStride<T, R, C>, CStride<T, R, C>>;

/// A matrix whose rows are indexed by the state `R` and columns by the state `C`.
///
/// # Overview
/// ```text
///     ├──────────  C  ─────────┤
///      ├──x──┤ ├──y──┤ ├──z──┤
/// ┬   ╭────────────────────────╮
/// │ ┬ │                        │
/// │ u │   ux      uy      uz   │
/// │ ┴ │                        │
///   ┬ │                        │
/// R v │   vx      vy      vz   │
///   ┴ │                        │
/// ┴   ╰────────────────────────╯
/// ```
pub struct StateMatrix<R, C = R>(pub OwnedStateMatrix<R::Element, R::Dim, C::Dim>)
where
    R: KFState,
    C: KFState<Element = R::Element>,
    DefaultAllocator: Allocator<R::Dim, C::Dim>;

/// Uncertainty of the state `S`.
pub type Covariance<S> = StateMatrix<S, S>;

/// Maps an error of the state `S` at one instant onto the error at a later one.
pub type Transition<S> = StateMatrix<S, S>;

impl<R, C> Deref for StateMatrix<R, C>
where
    R: KFState,
    C: KFState<Element = R::Element>,
    DefaultAllocator: Allocator<R::Dim, C::Dim>,
{
    type Target = OwnedStateMatrix<R::Element, R::Dim, C::Dim>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<R, C> DerefMut for StateMatrix<R, C>
where
    R: KFState,
    C: KFState<Element = R::Element>,
    DefaultAllocator: Allocator<R::Dim, C::Dim>,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<R, C> Clone for StateMatrix<R, C>
where
    R: KFState,
    C: KFState<Element = R::Element>,
    DefaultAllocator: Allocator<R::Dim, C::Dim>,
{
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<R, C> fmt::Debug for StateMatrix<R, C>
where
    R: KFState,
    C: KFState<Element = R::Element>,
    DefaultAllocator: Allocator<R::Dim, C::Dim>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateMatrix").field(&self.0).finish()
    }
}

impl<R, C> StateMatrix<R, C>
where
    R: KFState,
    C: KFState<Element = R::Element>,
    DefaultAllocator: Allocator<R::Dim, C::Dim>,
{
    /// The block that tells how the `Dst` rows respond to the `Src` columns.
    #[inline]
    pub fn sensitivity_mut<Src, Dst>(
        &mut self,
    ) -> StateMatrixViewMut<'_, R::Element, Dst::Dim, Src::Dim, R::Dim, C::Dim>
    where
        Src: SubStateOf<C> + ?Sized,
        Dst: SubStateOf<R> + ?Sized,
    {
        self.generic_view_mut(
            (Dst::Offset::DIM, Src::Offset::DIM),
            (Dst::Dim::name(), Src::Dim::name()),
        )
    }

    #[inline]
    pub fn sensitivity<Src, Dst>(
        &self,
    ) -> StateMatrixView<'_, R::Element, Dst::Dim, Src::Dim, R::Dim, C::Dim>
    where
        Src: SubStateOf<C> + ?Sized,
        Dst: SubStateOf<R> + ?Sized,
    {
        self.generic_view(
            (Dst::Offset::DIM, Src::Offset::DIM),
            (Dst::Dim::name(), Src::Dim::name()),
        )
    }
}

impl<S> StateMatrix<S, S>
where
    S: KFState,
    DefaultAllocator: Allocator<S::Dim, S::Dim>,
{
    #[inline]
    pub fn identity() -> Self
    where
        S::Element: Zero + One,
    {
        Self(OMatrix::identity())
    }

    #[inline]
    pub fn sub_covariance<Sub>(
        &self,
    ) -> StateMatrixView<'_, S::Element, Sub::Dim, Sub::Dim, S::Dim, S::Dim>
    where
        Sub: SubStateOf<S> + ?Sized,
    {
        self.sensitivity::<Sub, Sub>()
    }

    #[inline]
    pub fn sub_covariance_mut<Sub>(
        &mut self,
    ) -> StateMatrixViewMut<'_, S::Element, Sub::Dim, Sub::Dim, S::Dim, S::Dim>
    where
        Sub: SubStateOf<S> + ?Sized,
    {
        self.sensitivity_mut::<Sub, Sub>()
    }
}

impl<R, C> Default for StateMatrix<R, C>
where
    R: KFState<Element: Zero>,
    C: KFState<Element = R::Element>,
    DefaultAllocator: Allocator<R::Dim, C::Dim>,
{
    #[inline]
    fn default() -> Self {
        Self(OMatrix::zeros())
    }
}
