//! Derive macro for oxide-shard entities.
//!
//! `#[derive(Entity)]` implements `oxide_shard_core::Entity` for a struct with
//! named fields: a static descriptor for the metadata registry plus generated
//! field accessors, both by name and by index path.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Expr, Fields, Ident, Lit, Meta, Type, parse_macro_input};

/// Derives the `Entity` trait for a struct.
///
/// # Attributes
///
/// - `#[table(name = "table_name")]` - Overrides the table name (defaults to
///   the snake_case of the struct name)
///
/// # Field Attributes
///
/// - `#[column(primary_key)]` - Marks the field as primary key
/// - `#[column(auto_increment)]` - Marks the column as auto increment
/// - `#[column(name = "column_name")]` - Overrides the column name
/// - `#[column(embed)]` - Flattens the fields of an embedded entity
/// - `#[column(-)]` or `#[column(ignore)]` - Leaves the field out of the table
///
/// Unrecognized directives are kept in the descriptor and ignored by the
/// registry.
///
/// # Example
///
/// ```ignore
/// use oxide_shard_core::Entity;
///
/// #[derive(Default, Entity)]
/// #[table(name = "user")]
/// struct User {
///     #[column(primary_key, auto_increment)]
///     id: i64,
///     first_name: String,
///     #[column(-)]
///     cache: Vec<String>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(table, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_entity_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_entity_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity derive does not support generic structs",
        ));
    }
    let type_name = struct_name.to_string();
    let table_name = match get_table_name(&input.attrs)? {
        Some(name) => quote! { Some(#name) },
        None => quote! { None },
    };

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity derive only supports structs",
            ));
        }
    };

    let mut infos: Vec<FieldInfo> = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let attrs = parse_column_attrs(&field.attrs)?;
        infos.push(FieldInfo {
            ident,
            ty: field.ty.clone(),
            attrs,
        });
    }

    let field_defs: Vec<TokenStream2> = infos.iter().map(field_def).collect();

    let get_arms: Vec<TokenStream2> = infos
        .iter()
        .filter(|f| f.is_plain())
        .map(|f| {
            let ident = &f.ident;
            let name = ident.to_string();
            quote! {
                #name => Some(::oxide_shard_core::FieldValue::of(&self.#ident)),
            }
        })
        .collect();

    let set_arms: Vec<TokenStream2> = infos
        .iter()
        .filter(|f| f.is_plain())
        .map(|f| {
            let ident = &f.ident;
            let name = ident.to_string();
            quote! {
                #name => {
                    self.#ident = ::oxide_shard_core::SqlType::from_value(value)?;
                    Ok(None)
                }
            }
        })
        .collect();

    let embedded: Vec<&Ident> = infos
        .iter()
        .filter(|f| f.attrs.embed && !f.attrs.ignore)
        .map(|f| &f.ident)
        .collect();

    let get_indexed_arms: Vec<TokenStream2> = infos
        .iter()
        .enumerate()
        .filter(|(_, f)| !f.attrs.ignore)
        .map(|(i, f)| {
            let ident = &f.ident;
            if f.attrs.embed {
                quote! { [#i, rest @ ..] => self.#ident.get_indexed(rest), }
            } else {
                quote! { [#i] => Some(::oxide_shard_core::FieldValue::of(&self.#ident)), }
            }
        })
        .collect();

    let set_indexed_arms: Vec<TokenStream2> = infos
        .iter()
        .enumerate()
        .filter(|(_, f)| !f.attrs.ignore)
        .map(|(i, f)| {
            let ident = &f.ident;
            if f.attrs.embed {
                quote! { [#i, rest @ ..] => self.#ident.set_indexed(rest, value), }
            } else {
                quote! {
                    [#i] => {
                        self.#ident = ::oxide_shard_core::SqlType::from_value(value)?;
                        Ok(None)
                    }
                }
            }
        })
        .collect();

    let expanded = quote! {
        impl ::oxide_shard_core::Entity for #struct_name {
            fn descriptor() -> ::oxide_shard_core::EntityDescriptor {
                ::oxide_shard_core::EntityDescriptor::record(
                    #type_name,
                    #table_name,
                    vec![#(#field_defs),*],
                )
            }

            fn get_field(&self, name: &str) -> Option<::oxide_shard_core::FieldValue> {
                match name {
                    #(#get_arms)*
                    _ => {
                        #(
                            if let Some(v) = ::oxide_shard_core::Entity::get_field(&self.#embedded, name) {
                                return Some(v);
                            }
                        )*
                        None
                    }
                }
            }

            fn set_field(
                &mut self,
                name: &str,
                value: ::oxide_shard_core::SqlValue,
            ) -> ::oxide_shard_core::Result<Option<::oxide_shard_core::SqlValue>> {
                match name {
                    #(#set_arms)*
                    _ => {
                        #(
                            let value = match ::oxide_shard_core::Entity::set_field(&mut self.#embedded, name, value)? {
                                Some(v) => v,
                                None => return Ok(None),
                            };
                        )*
                        Ok(Some(value))
                    }
                }
            }

            fn get_indexed(&self, path: &[usize]) -> Option<::oxide_shard_core::FieldValue> {
                #[allow(unused_imports)]
                use ::oxide_shard_core::Entity as _;
                match path {
                    #(#get_indexed_arms)*
                    _ => None,
                }
            }

            fn set_indexed(
                &mut self,
                path: &[usize],
                value: ::oxide_shard_core::SqlValue,
            ) -> ::oxide_shard_core::Result<Option<::oxide_shard_core::SqlValue>> {
                #[allow(unused_imports)]
                use ::oxide_shard_core::Entity as _;
                match path {
                    #(#set_indexed_arms)*
                    _ => Ok(Some(value)),
                }
            }
        }
    };

    Ok(expanded)
}

fn field_def(info: &FieldInfo) -> TokenStream2 {
    let ident = &info.ident;
    let ty = &info.ty;
    let name = ident.to_string();
    let column = match &info.attrs.name {
        Some(c) => quote! { Some(#c) },
        None => quote! { None },
    };
    let directives = &info.attrs.directives;
    let (kind, nullable, embedded) = if info.attrs.ignore {
        (
            quote! { ::oxide_shard_core::TypeKind::Ignored },
            quote! { false },
            quote! { None },
        )
    } else if info.attrs.embed {
        (
            quote! { ::oxide_shard_core::TypeKind::Record },
            quote! { false },
            quote! { Some(<#ty as ::oxide_shard_core::Entity>::descriptor) },
        )
    } else {
        (
            quote! { <#ty as ::oxide_shard_core::SqlType>::KIND },
            quote! { <#ty as ::oxide_shard_core::SqlType>::NULLABLE },
            quote! { None },
        )
    };

    quote! {
        ::oxide_shard_core::FieldDef {
            name: #name,
            column: #column,
            kind: #kind,
            nullable: #nullable,
            directives: &[#(#directives),*],
            offset: ::core::mem::offset_of!(Self, #ident),
            embedded: #embedded,
        }
    }
}

struct FieldInfo {
    ident: Ident,
    ty: Type,
    attrs: ColumnAttrs,
}

impl FieldInfo {
    /// A field stored in its own column.
    const fn is_plain(&self) -> bool {
        !self.attrs.ignore && !self.attrs.embed
    }
}

#[derive(Default)]
struct ColumnAttrs {
    name: Option<String>,
    embed: bool,
    ignore: bool,
    /// Raw directive list handed to the registry.
    directives: Vec<String>,
}

fn get_table_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    for attr in attrs {
        if attr.path().is_ident("table") {
            let mut table_name = None;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: Expr = meta.value()?.parse()?;
                    if let Expr::Lit(lit) = value {
                        if let Lit::Str(s) = lit.lit {
                            table_name = Some(s.value());
                        }
                    }
                }
                Ok(())
            })?;
            if table_name.is_some() {
                return Ok(table_name);
            }
        }
    }
    Ok(None)
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut result = ColumnAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("column") {
            continue;
        }
        let list = match &attr.meta {
            Meta::Path(_) => continue,
            Meta::List(list) => list,
            Meta::NameValue(_) => {
                return Err(syn::Error::new_spanned(
                    attr,
                    "expected #[column(...)] with a directive list",
                ));
            }
        };
        // `-` is not a valid nested meta, handle it before parsing
        if list.tokens.to_string().trim() == "-" {
            result.ignore = true;
            result.directives.push(String::from("-"));
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: Expr = meta.value()?.parse()?;
                if let Expr::Lit(lit) = value {
                    if let Lit::Str(s) = lit.lit {
                        result.name = Some(s.value());
                    }
                }
                return Ok(());
            }
            if meta.path.is_ident("embed") {
                result.embed = true;
                return Ok(());
            }
            if meta.path.is_ident("ignore") {
                result.ignore = true;
                result.directives.push(String::from("-"));
                return Ok(());
            }
            if meta.path.is_ident("autoincrement") {
                result.directives.push(String::from("auto_increment"));
                return Ok(());
            }
            if let Some(ident) = meta.path.get_ident() {
                result.directives.push(ident.to_string());
            }
            if meta.input.peek(syn::Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            }
            Ok(())
        })?;
    }

    Ok(result)
}
