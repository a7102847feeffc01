//! FromRow derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

use crate::attrs::{DEFAULT_TAG, named_fields};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = named_fields(&input, "FromRow")?;

    let field_extracts: Vec<_> = fields
        .iter()
        .map(|field| {
            let ident = &field.ident;
            match field.column(DEFAULT_TAG) {
                Some(column) => quote! { #ident: row.try_get(#column)? },
                None => quote! { #ident: ::core::default::Default::default() },
            }
        })
        .collect();

    Ok(quote! {
        impl #impl_generics ::sqlgen::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &::sqlgen::Row) -> ::sqlgen::SqlResult<Self> {
                ::core::result::Result::Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}
