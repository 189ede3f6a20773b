pub(crate) mod kf_state;
pub(crate) mod utils;
use proc_macro::TokenStream;
use quote::ToTokens;

/// Derive macro for `KFState`, also implements `SubStateOf<this struct>` for every field.
///
/// Fields are laid out in declaration order, the first one at offset zero.
/// The struct needs an `#[element(T)]` attribute naming its scalar type.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(KFState)]
/// #[element(T)]
/// pub struct ErrorState<T: Scalar> {
///     pub position: PositionState<T>,   // offset 0
///     pub velocity: VelocityState<T>,   // offset 3
/// }
/// ```
#[proc_macro_derive(KFState, attributes(element))]
pub fn derive_kf_state(ts: TokenStream) -> TokenStream {
    syn::parse_macro_input!(ts as kf_state::Input)
        .to_token_stream()
        .into()
}
