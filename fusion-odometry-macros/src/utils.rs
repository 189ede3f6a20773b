use syn::{
    Attribute, Data, DeriveInput, Fields, FieldsNamed, Generics, Ident, Result,
    parse::{Parse, ParseStream},
};

/// A struct with named fields, the only shape a state layout can take.
pub struct StructNamed {
    pub attrs: Vec<Attribute>,
    pub ident: Ident,
    pub generics: Generics,
    pub fields: FieldsNamed,
}

impl Parse for StructNamed {
    fn parse(input: ParseStream) -> Result<Self> {
        let DeriveInput {
            attrs,
            ident,
            generics,
            data,
            ..
        } = input.parse()?;

        let Data::Struct(data) = data else {
            return Err(input.error("Expected a struct"));
        };
        let Fields::Named(fields) = data.fields else {
            return Err(input.error("Expected named fields"));
        };

        Ok(StructNamed {
            attrs,
            ident,
            generics,
            fields,
        })
    }
}
