//! Attribute parsing shared by the derives.
//!
//! Field-level `#[sqlgen(...)]` attributes:
//!
//! - `skip` excludes the field from every tag
//! - `<tag> = "column"` maps the field to `column` under `<tag>`
//! - `<tag> = "-"` excludes the field under `<tag>` only

use syn::{Data, DeriveInput, Fields, Result};

/// Tag that is always mapped, with field names as the default columns.
pub const DEFAULT_TAG: &str = "db";

/// Parsed field attributes.
#[derive(Default)]
pub struct FieldAttr {
    pub skip: bool,
    pub tags: Vec<(String, String)>,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        // Comma-separated `key = "value"` pairs or the bare `skip` marker
        loop {
            if input.is_empty() {
                break;
            }

            let ident: syn::Ident = input.parse()?;
            if ident == "skip" {
                attr.skip = true;
            } else {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                if value.value().is_empty() {
                    return Err(syn::Error::new_spanned(
                        &value,
                        "column name cannot be empty; use \"-\" to exclude the field",
                    ));
                }
                attr.tags.push((ident.to_string(), value.value()));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

impl FieldAttr {
    /// Fold another `#[sqlgen(...)]` attribute of the same field into this one.
    fn merge(&mut self, other: FieldAttr) {
        self.skip |= other.skip;
        self.tags.extend(other.tags);
    }

    /// Reject a tag named twice, or `skip` next to a tag mapping.
    fn check(&self) -> std::result::Result<(), String> {
        for (i, (tag, _)) in self.tags.iter().enumerate() {
            if self.tags[..i].iter().any(|(seen, _)| seen == tag) {
                return Err(format!("duplicate mapping for tag `{tag}`"));
            }
        }
        if self.skip {
            if let Some((tag, _)) = self.tags.first() {
                return Err(format!(
                    "`skip` cannot be combined with a mapping for tag `{tag}`; use `{tag} = \"-\"` to exclude under one tag"
                ));
            }
        }
        Ok(())
    }
}

/// A named field with its parsed attributes.
pub struct FieldInfo {
    pub ident: syn::Ident,
    pub attr: FieldAttr,
}

impl FieldInfo {
    /// Column under `tag`, or `None` when the field is excluded.
    pub fn column(&self, tag: &str) -> Option<String> {
        if self.attr.skip {
            return None;
        }
        match self.attr.tags.iter().find(|(t, _)| t == tag) {
            Some((_, column)) if column == "-" => None,
            Some((_, column)) => Some(column.clone()),
            None => Some(self.ident.to_string()),
        }
    }
}

/// Collect the named fields of a struct, or fail with a spanned error.
pub fn named_fields(input: &DeriveInput, derive: &str) -> Result<Vec<FieldInfo>> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    format!("{derive} can only be derived for structs with named fields"),
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs"),
            ));
        }
    };

    fields
        .iter()
        .map(|field| {
            let mut attr = FieldAttr::default();
            for a in &field.attrs {
                if a.path().is_ident("sqlgen") {
                    attr.merge(a.parse_args()?);
                    attr.check().map_err(|msg| syn::Error::new_spanned(a, msg))?;
                }
            }
            let ident = field
                .ident
                .clone()
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
            Ok(FieldInfo { ident, attr })
        })
        .collect()
}

/// Every tag the struct maps: the default tag plus any tag a field names.
pub fn known_tags(fields: &[FieldInfo]) -> Vec<String> {
    let mut tags = vec![DEFAULT_TAG.to_string()];
    for field in fields {
        for (tag, _) in &field.attr.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;
    use syn::parse_quote;

    fn parse(tokens: proc_macro2::TokenStream) -> Result<FieldAttr> {
        syn::parse2(tokens)
    }

    #[test]
    fn test_parse_tags_and_skip() {
        let attr = parse(quote!(db = "user_name", json = "-")).unwrap();
        assert!(!attr.skip);
        assert_eq!(
            attr.tags,
            vec![
                ("db".to_string(), "user_name".to_string()),
                ("json".to_string(), "-".to_string()),
            ]
        );

        let attr = parse(quote!(skip)).unwrap();
        assert!(attr.skip);
        assert!(attr.tags.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(quote!(db = "")).is_err());
        assert!(parse(quote!(db)).is_err());
        assert!(parse(quote!(db = 1)).is_err());
        assert!(parse(quote!("db" = "x")).is_err());
        assert!(parse(quote!(skip = "x")).is_err());
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let input: DeriveInput = parse_quote! {
            struct User {
                #[sqlgen(db = "a", db = "b")]
                name: String,
            }
        };
        let err = named_fields(&input, "Record").err().unwrap();
        assert!(err.to_string().contains("duplicate mapping for tag `db`"));

        let input: DeriveInput = parse_quote! {
            struct User {
                #[sqlgen(db = "a")]
                #[sqlgen(db = "b")]
                name: String,
            }
        };
        assert!(named_fields(&input, "Record").is_err());
    }

    #[test]
    fn test_skip_with_mapping_rejected() {
        let input: DeriveInput = parse_quote! {
            struct User {
                #[sqlgen(skip, json = "name")]
                name: String,
            }
        };
        let err = named_fields(&input, "Record").err().unwrap();
        assert!(err.to_string().contains("`skip` cannot be combined"));
    }

    #[test]
    fn test_field_columns() {
        let input: DeriveInput = parse_quote! {
            struct User {
                id: i64,
                #[sqlgen(db = "user_name", json = "-")]
                name: String,
                #[sqlgen(skip)]
                cache: Vec<u8>,
            }
        };
        let fields = named_fields(&input, "Record").unwrap();
        let columns = |tag: &str| -> Vec<Option<String>> {
            fields.iter().map(|f| f.column(tag)).collect()
        };
        assert_eq!(
            columns("db"),
            vec![Some("id".into()), Some("user_name".into()), None]
        );
        assert_eq!(columns("json"), vec![Some("id".into()), None, None]);
        assert_eq!(known_tags(&fields), vec!["db", "json"]);
    }

    #[test]
    fn test_rejects_non_struct() {
        let input: DeriveInput = parse_quote! {
            enum Kind { A, B }
        };
        assert!(named_fields(&input, "Record").is_err());

        let input: DeriveInput = parse_quote! {
            struct Pair(i64, i64);
        };
        assert!(named_fields(&input, "FromRow").is_err());
    }
}
