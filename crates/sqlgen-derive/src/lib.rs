//! Derive macros for sqlgen
//!
//! Provides `#[derive(Record)]` and `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod from_row;
mod record;

/// Derive the `Schema` and `Record` traits for a struct.
///
/// # Example
///
/// ```ignore
/// use sqlgen::Record;
///
/// #[derive(Record)]
/// struct User {
///     id: i64,
///     #[sqlgen(db = "user_name", json = "name")]
///     username: String,
///     #[sqlgen(json = "-")]
///     email: Option<String>,
///     #[sqlgen(skip)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[sqlgen(<tag> = "column")]` - Map the field to `column` under `<tag>`;
///   fields without an entry use their own name
/// - `#[sqlgen(<tag> = "-")]` - Leave the field out under `<tag>`
/// - `#[sqlgen(skip)]` - Leave the field out entirely
///
/// The `db` tag is always mapped; any other tag is mapped once a field
/// names it.
#[proc_macro_derive(Record, attributes(sqlgen))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `FromRow` for a struct, reading columns by their `db` name.
///
/// Skipped fields are filled with `Default::default()`.
///
/// # Example
///
/// ```ignore
/// use sqlgen::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     id: i64,
///     #[sqlgen(db = "user_name")]
///     username: String,
/// }
/// ```
#[proc_macro_derive(FromRow, attributes(sqlgen))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
