//! Record derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

use crate::attrs::{known_tags, named_fields};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = named_fields(&input, "Record")?;

    let mut column_arms = Vec::new();
    let mut field_arms = Vec::new();
    for tag in known_tags(&fields) {
        let mapped: Vec<_> = fields
            .iter()
            .filter_map(|f| f.column(&tag).map(|column| (&f.ident, column)))
            .collect();
        if mapped.is_empty() {
            continue;
        }
        let columns = mapped.iter().map(|(_, column)| column);
        let pairs = mapped.iter().map(|(ident, column)| {
            quote! {
                (
                    ::std::string::String::from(#column),
                    ::sqlgen::Value::from(::core::clone::Clone::clone(&self.#ident)),
                )
            }
        });
        column_arms.push(quote! {
            #tag => ::core::option::Option::Some(::std::vec![
                #(::std::string::String::from(#columns)),*
            ]),
        });
        field_arms.push(quote! {
            #tag => ::core::option::Option::Some(::std::vec![#(#pairs),*]),
        });
    }

    Ok(quote! {
        impl #impl_generics ::sqlgen::Schema for #name #ty_generics #where_clause {
            fn columns(tag: &str) -> ::core::option::Option<::std::vec::Vec<::std::string::String>> {
                match tag {
                    #(#column_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl #impl_generics ::sqlgen::Record for #name #ty_generics #where_clause {
            fn fields(
                &self,
                tag: &str,
            ) -> ::core::option::Option<::std::vec::Vec<(::std::string::String, ::sqlgen::Value)>> {
                match tag {
                    #(#field_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}
