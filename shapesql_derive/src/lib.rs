use std::collections::HashMap;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, parse_macro_input, spanned::Spanned};

/// Derives `shapesql::Entity` and `shapesql::FromRow` for a struct.
///
/// Property names are the field names as written. The key is found by
/// `{TypeName}Id` (case-insensitive), so a snake_case `widget_id` on
/// `Widget` is only recognised with `rename_all = "PascalCase"` or an
/// explicit `key = "..."`; without either, key derivation fails at runtime
/// with a configuration error.
///
/// Two fields may not end up with the same property name or storage column.
///
/// Container options: `#[entity(table = "...", key = "...", rename_all = "PascalCase")]`.
/// Field options: `#[sql(column = "...")]`, `#[sql(rename = "...")]`, `#[sql(skip)]`.
#[proc_macro_derive(Entity, attributes(entity, sql))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_entity(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "Entity does not support generic structs",
        ));
    }

    let options = parse_entity_options(&input.attrs)?;

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Entity can only be derived for structs",
            ));
        }
    };

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields.named.into_iter().collect::<Vec<_>>(),
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Entity requires named fields",
            ));
        }
    };

    let mut descriptor_calls = Vec::<TokenStream2>::new();
    let mut row_initializers = Vec::<TokenStream2>::new();
    let mut param_binds = Vec::<TokenStream2>::new();
    let mut properties = HashMap::<String, Ident>::new();
    let mut columns = HashMap::<String, Ident>::new();

    for field in &named_fields {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Entity requires named fields"))?;
        let sql = parse_sql_field_options(&field.attrs)?;

        if sql.skip {
            row_initializers.push(quote! {
                #ident: ::core::default::Default::default()
            });
            continue;
        }

        let property = property_name(&ident, sql.rename.as_deref(), options.rename_all);

        if let Some(first) = properties.insert(property.clone(), ident.clone()) {
            return Err(syn::Error::new(
                field.span(),
                format!(
                    "Duplicate property '{}': already used by field `{}`",
                    property, first
                ),
            ));
        }

        let storage = match &sql.column {
            Some(column) if !column.trim().is_empty() => column.clone(),
            _ => property.clone(),
        };
        if let Some(first) = columns.insert(storage.clone(), ident.clone()) {
            return Err(syn::Error::new(
                field.span(),
                format!(
                    "Duplicate column '{}': already used by field `{}`",
                    storage, first
                ),
            ));
        }

        descriptor_calls.push(match &sql.column {
            Some(column) => quote! { .column(#property, #column) },
            None => quote! { .field(#property) },
        });
        row_initializers.push(quote! {
            #ident: row.get(#property)?
        });
        param_binds.push(quote! {
            params.bind(#property, &self.#ident);
        });
    }

    let type_name = struct_name.to_string();
    let table_call = options.table.map(|table| quote! { .table(#table) });
    let key_call = options.key.map(|key| quote! { .key(#key) });
    let bind_count = param_binds.len();

    let construct = if named_fields.is_empty() {
        quote! { Self {} }
    } else {
        quote! { Self { #(#row_initializers),* } }
    };

    Ok(quote! {
        impl ::shapesql::FromRow for #struct_name {
            fn from_row(row: ::shapesql::RowRef<'_>) -> ::shapesql::Result<Self> {
                let _ = &row;
                ::core::result::Result::Ok(#construct)
            }
        }

        impl ::shapesql::Entity for #struct_name {
            fn descriptor() -> &'static ::shapesql::EntityDescriptor {
                static DESCRIPTOR: ::std::sync::OnceLock<::shapesql::EntityDescriptor> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    ::shapesql::EntityDescriptor::builder(#type_name)
                        #(#descriptor_calls)*
                        #table_call
                        #key_call
                        .build()
                })
            }

            fn to_params(&self) -> ::shapesql::Params {
                let mut params = ::shapesql::Params::with_capacity(#bind_count);
                #(#param_binds)*
                params
            }
        }
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RenameRule {
    None,
    PascalCase,
}

struct EntityOptions {
    table: Option<String>,
    key: Option<String>,
    rename_all: RenameRule,
}

#[derive(Default)]
struct SqlFieldOptions {
    skip: bool,
    column: Option<String>,
    rename: Option<String>,
}

fn property_name(ident: &Ident, rename: Option<&str>, rule: RenameRule) -> String {
    if let Some(rename) = rename {
        return rename.to_string();
    }

    let declared = ident.to_string();
    let declared = declared.trim_start_matches("r#");
    match rule {
        RenameRule::None => declared.to_string(),
        RenameRule::PascalCase => to_pascal_case(declared),
    }
}

fn to_pascal_case(value: &str) -> String {
    let mut out = String::new();
    for chunk in value.split('_').filter(|part| !part.is_empty()) {
        let mut chars = chunk.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    if out.is_empty() {
        value.to_string()
    } else {
        out
    }
}

fn parse_sql_field_options(attrs: &[syn::Attribute]) -> syn::Result<SqlFieldOptions> {
    let mut options = SqlFieldOptions::default();
    let mut seen = false;

    for attr in attrs {
        if !attr.path().is_ident("sql") {
            continue;
        }

        if seen {
            return Err(syn::Error::new(
                attr.span(),
                "Duplicate #[sql(...)] attribute on field",
            ));
        }
        seen = true;

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
                return Ok(());
            }

            if meta.path.is_ident("column") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.column = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("rename") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.rename = Some(lit.value());
                return Ok(());
            }

            Err(meta.error(
                "Unsupported #[sql(...)] option. Supported: skip, column = \"...\", rename = \"...\"",
            ))
        })?;

        if options.skip && (options.column.is_some() || options.rename.is_some()) {
            return Err(syn::Error::new(
                attr.span(),
                "#[sql(skip)] cannot be combined with column or rename",
            ));
        }
    }

    Ok(options)
}

fn parse_entity_options(attrs: &[syn::Attribute]) -> syn::Result<EntityOptions> {
    let mut options = EntityOptions {
        table: None,
        key: None,
        rename_all: RenameRule::None,
    };

    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.table = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("key") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.key = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("rename_all") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.rename_all = match lit.value().as_str() {
                    "PascalCase" => RenameRule::PascalCase,
                    "none" => RenameRule::None,
                    other => {
                        return Err(meta.error(format!(
                            "Unsupported rename_all rule '{}'. Supported: \"PascalCase\", \"none\"",
                            other
                        )));
                    }
                };
                return Ok(());
            }

            Err(meta.error(
                "Unsupported entity attribute. Supported: table = \"...\", key = \"...\", rename_all = \"...\"",
            ))
        })?;
    }

    Ok(options)
}
