use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{ToTokens, quote};
use syn::{
    Error, FieldsNamed, Generics, Ident, Result, Type,
    parse::{Parse, ParseStream},
};

use crate::utils::StructNamed;

pub struct Input {
    pub ident: Ident,
    pub generics: Generics,
    pub fields: FieldsNamed,
    pub element_ty: Type,
}

impl Parse for Input {
    fn parse(input: ParseStream) -> Result<Self> {
        let StructNamed {
            attrs,
            ident,
            generics,
            fields,
        } = input.parse()?;

        let attr_element = attrs
            .iter()
            .find(|attr| attr.path().is_ident("element"))
            .ok_or_else(|| Error::new(Span::call_site(), "expect #[element(T)]"))?;

        let element_ty: Type = attr_element.parse_args()?;

        if fields.named.is_empty() {
            return Err(Error::new(
                ident.span(),
                "a KFState needs at least one sub-state field",
            ));
        }

        Ok(Self {
            ident,
            generics,
            fields,
            element_ty,
        })
    }
}

impl ToTokens for Input {
    fn to_tokens(&self, tokens: &mut TokenStream2) {
        let Self {
            ident,
            generics,
            fields,
            element_ty,
        } = self;
        let fields_tys = fields.named.iter().map(|field| &field.ty);

        let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

        let struct_ty = quote! { #ident #ty_generics };

        let sub_states_impls = fields_tys.clone().sub_states_impl(ident, generics);

        let kf_state_impl = fields_tys.clone().last().map(|last_ty| {
            quote! {
                impl #impl_generics KFState for #struct_ty
                #where_clause
                {
                    type Element = #element_ty;
                    type Dim = SubStateEndOffset<#last_ty, #struct_ty>;
                }
            }
        });

        tokens.extend(quote! {
            #(#sub_states_impls)*
            #kf_state_impl
        });
    }
}

trait IntoSubStateIter {
    fn sub_states_impl(
        self,
        ident_super: &Ident,
        generics: &Generics,
    ) -> impl Iterator<Item = TokenStream2>;
}

impl<'a, I> IntoSubStateIter for I
where
    I: Iterator<Item = &'a Type>,
{
    fn sub_states_impl(
        self,
        ident_super: &Ident,
        generics: &Generics,
    ) -> impl Iterator<Item = TokenStream2> {
        let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
        self.scan(None::<&Type>, move |previous_ty, ty| {
            let offset = previous_ty
                .replace(ty)
                .map(|previous_ty| {
                    quote! {
                        SubStateEndOffset<#previous_ty, #ident_super #ty_generics>
                    }
                })
                .unwrap_or(quote! { nalgebra::U0 });
            Some(quote! {
                impl #impl_generics SubStateOf<#ident_super #ty_generics> for #ty
                #where_clause
                {
                    type Offset = #offset;
                }
            })
        })
    }
}
