//! Derive macros for Spanner models.
//!
//! This crate provides the `#[derive(Table)]` macro. It reflects a struct into
//! the metadata DDL generation walks and implements the row mapping the ORM
//! uses to read and write it.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::meta::ParseNestedMeta;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, LitInt, LitStr, Type};

/// Derives model reflection for a struct.
///
/// # Attributes
///
/// - `#[table(name = "table_name")]` - SQL table name (defaults to the
///   snake_case plural of the struct name)
/// - `#[table(interleave_in = "Parent", on_delete = "cascade")]` - interleaves
///   the table in the table of the `Parent` model
///
/// # Field Attributes
///
/// - `#[column(name = "column_name")]` - SQL column name
/// - `#[column(primary_key)]` - part of the primary key (otherwise a field
///   named `id` is the key)
/// - `#[column(auto_increment = false)]` - the key is assigned by the application
/// - `#[column(not_null)]`, `#[column(unique)]`
/// - `#[column(index)]`, `#[column(index = "name")]`, `#[column(unique_index)]`,
///   `#[column(unique_index = "name")]` - fields sharing a name form one index
/// - `#[column(size = 200)]` - STRING/BYTES length
/// - `#[column(type = "STRING(MAX) AS (...) STORED")]` - column type verbatim
/// - `#[column(default = "expr")]` - default value
/// - `#[column(read_only)]`, `#[column(commit_timestamp)]`
/// - `#[column(embed)]` - splices the columns of another model here
/// - `#[column(belongs_to = "Singer", references = "id", on_delete = "cascade")]`
///   - foreign key to the table of the `Singer` model
/// - `#[column(skip)]` - not mapped; takes its `Default` when loaded
///
/// # Generated Items
///
/// For a struct `Singer`, this macro generates:
///
/// - `SingerTable` - a type implementing `Table`
/// - `SingerColumns` - a module with one type per column (`Id`, `FirstName`, ...)
/// - `Reflect` and `Record` implementations for `Singer`
#[proc_macro_derive(Table, attributes(table, column))]
pub fn derive_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_table_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_table_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let table_attrs = parse_table_attrs(&input.attrs)?;
    let table_name = table_attrs
        .name
        .clone()
        .unwrap_or_else(|| pluralize(&to_snake_case(&struct_name.to_string())));

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Table derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Table derive only supports structs",
            ));
        }
    };

    let mut infos: Vec<FieldInfo> = Vec::new();
    for field in fields {
        let Some(field_name) = field.ident.clone() else {
            continue;
        };
        let attrs = parse_column_attrs(&field.attrs)?;
        if attrs.references.is_some() && attrs.belongs_to.is_none() {
            return Err(syn::Error::new_spanned(
                field,
                "`references` requires `belongs_to`",
            ));
        }
        if attrs.embed && attrs.skip {
            return Err(syn::Error::new_spanned(
                field,
                "a field cannot be both `embed` and `skip`",
            ));
        }
        infos.push(FieldInfo {
            column_name: attrs.name.clone().unwrap_or_else(|| to_snake_case(&field_name.to_string())),
            field_name,
            field_type: field.ty.clone(),
            attrs,
        });
    }

    let columns: Vec<&FieldInfo> = infos.iter().filter(|i| i.is_column()).collect();
    let has_flagged_key = columns.iter().any(|c| c.attrs.primary_key);

    let table_struct_name = format_ident!("{}Table", struct_name);
    let columns_mod_name = format_ident!("{}Columns", struct_name);
    let column_type_names: Vec<Ident> = columns
        .iter()
        .map(|c| format_ident!("{}", to_pascal_case(&c.field_name.to_string())))
        .collect();

    // The column types live in their own module, but their trait impls are
    // emitted next to the struct so field types and the table type resolve
    // in the scope the model was declared in, including function bodies.
    let column_structs = column_type_names.iter().map(|type_name| {
        quote! {
            /// Column type for compile-time checked queries.
            #[derive(Debug, Clone, Copy)]
            pub struct #type_name;
        }
    });
    let column_impls = columns.iter().zip(&column_type_names).map(|(info, type_name)| {
        let column_name = &info.column_name;
        let field_type = &info.field_type;
        let is_nullable = is_option(field_type);
        let is_primary_key = info.attrs.primary_key || (!has_flagged_key && column_name == "id");
        quote! {
            impl ::spanner_sql_core::schema::Column for #columns_mod_name::#type_name {
                type Table = #table_struct_name;
                type Type = #field_type;

                const NAME: &'static str = #column_name;
                const NULLABLE: bool = #is_nullable;
                const PRIMARY_KEY: bool = #is_primary_key;
            }

            impl ::spanner_sql_core::schema::TypedColumn<#field_type> for #columns_mod_name::#type_name {}
        }
    });

    let column_accessors: Vec<TokenStream2> = columns
        .iter()
        .zip(&column_type_names)
        .map(|(info, type_name)| {
            let method_name = &info.field_name;
            quote! {
                /// Returns the column type for type-safe queries.
                #[inline]
                pub const fn #method_name() -> #columns_mod_name::#type_name {
                    #columns_mod_name::#type_name
                }
            }
        })
        .collect();

    let schema_steps = infos
        .iter()
        .filter(|i| !i.attrs.skip)
        .map(schema_step)
        .collect::<syn::Result<Vec<_>>>()?;
    let struct_name_str = struct_name.to_string();
    let interleave_step = match &table_attrs.interleave_in {
        Some(parent) => {
            let parent: Type = parent.parse()?;
            let on_delete = on_delete_tokens(table_attrs.on_delete.as_ref())?;
            quote! {
                let builder = builder.interleave_in(
                    <#parent as ::spanner_sql_core::schema::Reflect>::TABLE,
                    #on_delete,
                );
            }
        }
        None => quote! {},
    };

    let value_steps = infos.iter().filter(|i| !i.attrs.skip).map(|info| {
        let field_name = &info.field_name;
        if info.attrs.embed {
            quote! {
                values.extend(::spanner_sql_core::schema::Record::values(&self.#field_name));
            }
        } else {
            let column_name = &info.column_name;
            quote! {
                values.push((
                    #column_name,
                    ::spanner_sql_core::builder::ToSqlValue::to_sql_value(
                        ::std::clone::Clone::clone(&self.#field_name),
                    ),
                ));
            }
        }
    });

    let from_row_fields = infos.iter().map(|info| {
        let field_name = &info.field_name;
        let field_type = &info.field_type;
        if info.attrs.skip {
            quote! { #field_name: ::std::default::Default::default() }
        } else if info.attrs.embed {
            quote! {
                #field_name: <#field_type as ::spanner_sql_core::schema::Record>::from_row(row)?
            }
        } else {
            let column_name = &info.column_name;
            quote! { #field_name: row.try_get_or_default(#column_name)? }
        }
    });

    let set_arms = columns.iter().map(|info| {
        let field_name = &info.field_name;
        let column_name = &info.column_name;
        quote! {
            #column_name => {
                self.#field_name = ::spanner_sql_core::builder::FromSqlValue::from_sql_value(value)
                    .map_err(|e| e.in_column(column))?;
                Ok(true)
            }
        }
    });
    let embed_sets = infos.iter().filter(|i| i.attrs.embed).map(|info| {
        let field_name = &info.field_name;
        quote! {
            if ::spanner_sql_core::schema::Record::set_value(
                &mut self.#field_name,
                column,
                ::std::clone::Clone::clone(&value),
            )? {
                return Ok(true);
            }
        }
    });

    let expanded = quote! {
        /// Column types for the table.
        #[allow(non_snake_case)]
        pub mod #columns_mod_name {
            #(#column_structs)*
        }

        #(#column_impls)*

        /// Table metadata.
        #[derive(Debug, Clone, Copy)]
        pub struct #table_struct_name;

        impl ::spanner_sql_core::schema::Table for #table_struct_name {
            type Row = #struct_name;

            const NAME: &'static str = #table_name;
        }

        impl #table_struct_name {
            /// Returns the table name.
            #[inline]
            pub const fn table_name() -> &'static str {
                #table_name
            }

            #(#column_accessors)*
        }

        impl #struct_name {
            /// Returns the table metadata type.
            pub const fn table() -> #table_struct_name {
                #table_struct_name
            }

            #(#column_accessors)*
        }

        impl ::spanner_sql_core::schema::Reflect for #struct_name {
            type Table = #table_struct_name;

            const TABLE: &'static str = #table_name;

            fn schema() -> ::std::result::Result<
                ::spanner_sql_core::schema::ModelSchema,
                ::spanner_sql_core::SchemaError,
            > {
                let builder = ::spanner_sql_core::schema::ModelSchema::builder(#struct_name_str)
                    .table(#table_name);
                #(#schema_steps)*
                #interleave_step
                builder.build()
            }
        }

        impl ::spanner_sql_core::schema::Record for #struct_name {
            fn values(&self) -> ::std::vec::Vec<(&'static str, ::spanner_sql_core::builder::SqlValue)> {
                let mut values = ::std::vec::Vec::new();
                #(#value_steps)*
                values
            }

            fn from_row(
                row: &::spanner_sql_core::schema::Row,
            ) -> ::std::result::Result<Self, ::spanner_sql_core::schema::RowError> {
                Ok(Self {
                    #(#from_row_fields),*
                })
            }

            #[allow(unused_variables)]
            fn set_value(
                &mut self,
                column: &str,
                value: ::spanner_sql_core::builder::SqlValue,
            ) -> ::std::result::Result<bool, ::spanner_sql_core::schema::RowError> {
                match column {
                    #(#set_arms)*
                    _ => {
                        #(#embed_sets)*
                        Ok(false)
                    }
                }
            }
        }
    };

    Ok(expanded)
}

/// Emits the builder statement adding one field (or embedded model).
fn schema_step(info: &FieldInfo) -> syn::Result<TokenStream2> {
    let field_type = &info.field_type;
    if info.attrs.embed {
        return Ok(quote! {
            let builder = builder.embed(
                &<#field_type as ::spanner_sql_core::schema::Reflect>::schema()?,
            );
        });
    }

    let attrs = &info.attrs;
    let column_name = &info.column_name;
    let rust_type = quote!(#field_type).to_string().replace(' ', "");
    let mut calls: Vec<TokenStream2> = Vec::new();
    if attrs.primary_key {
        calls.push(quote! { .primary_key() });
    }
    if let Some(enabled) = attrs.auto_increment {
        calls.push(quote! { .auto_increment(#enabled) });
    }
    if attrs.not_null {
        calls.push(quote! { .not_null() });
    }
    if attrs.unique {
        calls.push(quote! { .unique() });
    }
    if let Some(size) = attrs.size {
        calls.push(quote! { .size(#size) });
    }
    if let Some(sql_type) = &attrs.sql_type {
        calls.push(quote! { .type_override(#sql_type) });
    }
    if let Some(default) = &attrs.default {
        calls.push(quote! { .default_value(#default) });
    }
    if attrs.read_only {
        calls.push(quote! { .read_only() });
    }
    if attrs.commit_timestamp {
        calls.push(quote! { .commit_timestamp() });
    }
    for index in &attrs.indexes {
        let name = match &index.name {
            Some(name) => quote! { ::std::option::Option::Some(#name) },
            None => quote! { ::std::option::Option::None },
        };
        if index.unique {
            calls.push(quote! { .unique_index(#name) });
        } else {
            calls.push(quote! { .index(#name) });
        }
    }
    if let Some(parent) = &attrs.belongs_to {
        let parent: Type = parent.parse()?;
        let references = attrs.references.clone().unwrap_or_else(|| String::from("id"));
        calls.push(quote! {
            .references(<#parent as ::spanner_sql_core::schema::Reflect>::TABLE, #references)
        });
        if attrs.on_delete.is_some() {
            let on_delete = on_delete_tokens(attrs.on_delete.as_ref())?;
            calls.push(quote! { .on_delete(#on_delete) });
        }
    }

    Ok(quote! {
        let builder = builder.field(
            ::spanner_sql_core::schema::FieldSchema::new(#column_name, #rust_type) #(#calls)*
        );
    })
}

fn on_delete_tokens(value: Option<&LitStr>) -> syn::Result<TokenStream2> {
    let Some(lit) = value else {
        return Ok(quote! { ::spanner_sql_core::schema::OnDelete::NoAction });
    };
    match lit.value().trim().to_ascii_lowercase().replace('_', " ").as_str() {
        "cascade" => Ok(quote! { ::spanner_sql_core::schema::OnDelete::Cascade }),
        "no action" => Ok(quote! { ::spanner_sql_core::schema::OnDelete::NoAction }),
        _ => Err(syn::Error::new_spanned(
            lit,
            "on_delete must be \"cascade\" or \"no action\"",
        )),
    }
}

struct FieldInfo {
    field_name: Ident,
    field_type: Type,
    column_name: String,
    attrs: ColumnAttrs,
}

impl FieldInfo {
    const fn is_column(&self) -> bool {
        !self.attrs.embed && !self.attrs.skip
    }
}

struct IndexAttr {
    name: Option<String>,
    unique: bool,
}

#[derive(Default)]
struct TableAttrs {
    name: Option<String>,
    interleave_in: Option<LitStr>,
    on_delete: Option<LitStr>,
}

#[derive(Default)]
struct ColumnAttrs {
    name: Option<String>,
    primary_key: bool,
    auto_increment: Option<bool>,
    not_null: bool,
    unique: bool,
    indexes: Vec<IndexAttr>,
    size: Option<u32>,
    sql_type: Option<String>,
    default: Option<String>,
    read_only: bool,
    commit_timestamp: bool,
    embed: bool,
    belongs_to: Option<LitStr>,
    references: Option<String>,
    on_delete: Option<LitStr>,
    skip: bool,
}

fn string_value(meta: &ParseNestedMeta<'_>) -> syn::Result<String> {
    Ok(meta.value()?.parse::<LitStr>()?.value())
}

fn optional_string_value(meta: &ParseNestedMeta<'_>) -> syn::Result<Option<String>> {
    if meta.input.peek(syn::Token![=]) {
        string_value(meta).map(Some)
    } else {
        Ok(None)
    }
}

fn parse_table_attrs(attrs: &[Attribute]) -> syn::Result<TableAttrs> {
    let mut result = TableAttrs::default();
    for attr in attrs {
        if attr.path().is_ident("table") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    result.name = Some(string_value(&meta)?);
                } else if meta.path.is_ident("interleave_in") {
                    result.interleave_in = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("on_delete") {
                    result.on_delete = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("unknown table attribute"));
                }
                Ok(())
            })?;
        }
    }
    Ok(result)
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut result = ColumnAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("column") {
            continue;
        }
        // Bare `#[column]`
        if matches!(attr.meta, syn::Meta::Path(_)) {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                result.name = Some(string_value(&meta)?);
            } else if meta.path.is_ident("primary_key") {
                result.primary_key = true;
            } else if meta.path.is_ident("auto_increment") {
                let enabled = if meta.input.peek(syn::Token![=]) {
                    meta.value()?.parse::<syn::LitBool>()?.value
                } else {
                    true
                };
                result.auto_increment = Some(enabled);
            } else if meta.path.is_ident("not_null") {
                result.not_null = true;
            } else if meta.path.is_ident("unique") {
                result.unique = true;
            } else if meta.path.is_ident("index") {
                result.indexes.push(IndexAttr {
                    name: optional_string_value(&meta)?,
                    unique: false,
                });
            } else if meta.path.is_ident("unique_index") {
                result.indexes.push(IndexAttr {
                    name: optional_string_value(&meta)?,
                    unique: true,
                });
            } else if meta.path.is_ident("size") {
                result.size = Some(meta.value()?.parse::<LitInt>()?.base10_parse()?);
            } else if meta.path.is_ident("type") {
                result.sql_type = Some(string_value(&meta)?);
            } else if meta.path.is_ident("default") {
                result.default = Some(string_value(&meta)?);
            } else if meta.path.is_ident("read_only") {
                result.read_only = true;
            } else if meta.path.is_ident("commit_timestamp") {
                result.commit_timestamp = true;
            } else if meta.path.is_ident("embed") {
                result.embed = true;
            } else if meta.path.is_ident("belongs_to") {
                result.belongs_to = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("references") {
                result.references = Some(string_value(&meta)?);
            } else if meta.path.is_ident("on_delete") {
                result.on_delete = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("skip") {
                result.skip = true;
            } else {
                return Err(meta.error("unknown column attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}

// Must agree with `spanner_sql_core::schema::to_snake_case`.
fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_is_lower)
                {
                    result.push('_');
                }
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

// Must agree with `spanner_sql_core::schema::pluralize`.
fn pluralize(word: &str) -> String {
    if word.ends_with("ss")
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{word}es");
    }
    if word.ends_with('s') {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        let before_vowel = stem
            .chars()
            .last()
            .is_some_and(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'));
        if !before_vowel && !stem.is_empty() {
            return format!("{stem}ies");
        }
    }
    format!("{word}s")
}

fn to_pascal_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = true;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}
