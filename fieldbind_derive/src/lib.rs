use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{Data, DeriveInput, Fields, LitStr, Token, Type, parse_macro_input, spanned::Spanned};

/// Generates a `fieldbind::Record` impl from field attributes.
///
/// Field options:
/// - `#[bind(json = "name,omitempty")]` external-name tag
/// - `#[bind(column = "'user_name'")]` storage-column tag (`"-"` excludes)
/// - `#[bind(validate = "required,min=2")]` rule tag
/// - `#[bind(readonly)]` field cannot be targeted by clients
///
/// `#[serde(rename = "...")]` supplies the external name when `bind(json)` is
/// absent, `#[serde(skip)]` / `#[serde(skip_deserializing)]` make the field
/// read-only and `#[serde(flatten)]` embeds another `Record`.
///
/// `bind(json)` must equal the key serde decodes, including any container
/// `rename_all`. `#[serde(alias)]` is rejected on fields with an external
/// name: aliased keys would decode without being reported as present.
///
/// Every field with an external name must implement `Serialize`; its value
/// is encoded on its own for `Record::field_values`.
#[proc_macro_derive(Record, attributes(bind))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_record(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct BindFieldOptions {
    json: Option<LitStr>,
    column: Option<LitStr>,
    validate: Option<LitStr>,
    readonly: bool,
}

impl BindFieldOptions {
    fn is_empty(&self) -> bool {
        self.json.is_none() && self.column.is_none() && self.validate.is_none() && !self.readonly
    }
}

#[derive(Default)]
struct SerdeFieldOptions {
    rename: Option<String>,
    alias: Option<LitStr>,
    skip_deserializing: bool,
    flatten: bool,
}

/// serde's `rename_all` rules as applied to snake_case field names.
#[derive(Clone, Copy)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(lit: &LitStr) -> syn::Result<Self> {
        let rule = match lit.value().as_str() {
            "lowercase" => RenameRule::Lower,
            "UPPERCASE" => RenameRule::Upper,
            "PascalCase" => RenameRule::Pascal,
            "camelCase" => RenameRule::Camel,
            "snake_case" => RenameRule::Snake,
            "SCREAMING_SNAKE_CASE" => RenameRule::ScreamingSnake,
            "kebab-case" => RenameRule::Kebab,
            "SCREAMING-KEBAB-CASE" => RenameRule::ScreamingKebab,
            other => {
                return Err(syn::Error::new(
                    lit.span(),
                    format!("Unsupported rename_all rule \"{}\"", other),
                ));
            }
        };
        Ok(rule)
    }

    fn apply(self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Pascal => {
                let mut out = String::with_capacity(field.len());
                let mut capitalize = true;
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        out.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
            RenameRule::Camel => {
                let pascal = RenameRule::Pascal.apply(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
        }
    }
}

fn expand_record(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "Record does not support generic structs yet",
        ));
    }

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Record can only be derived for structs",
            ));
        }
    };

    let rename_all = parse_serde_rename_all(&input.attrs)?;

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        Fields::Unit => return Ok(expand_impl(&struct_name, Vec::new(), Vec::new())),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Record requires named fields",
            ));
        }
    };

    let mut field_entries = Vec::<TokenStream2>::new();
    let mut value_entries = Vec::<TokenStream2>::new();
    for field in named_fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Record requires named fields"))?;
        let field_name = ident.to_string().trim_start_matches("r#").to_string();
        let bind = parse_bind_field_options(&field.attrs)?;
        let serde = parse_serde_field_options(&field.attrs)?;

        if serde.flatten {
            if !bind.is_empty() {
                return Err(syn::Error::new(
                    field.span(),
                    "#[bind(...)] has no effect on #[serde(flatten)] fields; tag the embedded record's fields instead",
                ));
            }
            let ty = &field.ty;
            field_entries.push(embedded_entry(&field_name, ty));
            value_entries.push(quote! {
                values.extend(::fieldbind::Record::field_values(&self.#ident)?);
            });
            continue;
        }

        let json_tag = match (&bind.json, &serde.rename) {
            (Some(json), _) => {
                let wire_name = serde.rename.clone().unwrap_or_else(|| match rename_all {
                    Some(rule) => rule.apply(&field_name),
                    None => field_name.clone(),
                });
                check_json_tag(json, &wire_name)?;
                json.value()
            }
            (None, Some(rename)) => rename.clone(),
            (None, None) => String::new(),
        };
        let column_tag = bind.column.as_ref().map(LitStr::value).unwrap_or_default();
        let validate_tag = bind.validate.as_ref().map(LitStr::value).unwrap_or_default();
        let settable = !(bind.readonly || serde.skip_deserializing);

        let external = json_tag.split(',').next().unwrap_or_default().to_string();
        if !external.is_empty() && external != "-" {
            if let Some(alias) = &serde.alias {
                return Err(syn::Error::new(
                    alias.span(),
                    "#[serde(alias)] is not supported on bound fields; only the primary key is reported as present",
                ));
            }
            value_entries.push(quote! {
                values.insert(
                    #external.to_string(),
                    ::fieldbind::mapping::field_value(#external, &self.#ident)?,
                );
            });
        }

        field_entries.push(quote! {
            ::fieldbind::FieldDescriptor::new(#field_name)
                .json_tag(#json_tag)
                .column_tag(#column_tag)
                .validate_tag(#validate_tag)
                .settable(#settable)
        });
    }

    Ok(expand_impl(&struct_name, field_entries, value_entries))
}

fn expand_impl(
    struct_name: &syn::Ident,
    field_entries: Vec<TokenStream2>,
    value_entries: Vec<TokenStream2>,
) -> TokenStream2 {
    let record_name = struct_name.to_string();
    quote! {
        impl ::fieldbind::Record for #struct_name {
            fn descriptor() -> &'static ::fieldbind::RecordDescriptor {
                static DESCRIPTOR: ::std::sync::OnceLock<::fieldbind::RecordDescriptor> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    ::fieldbind::RecordDescriptor::builder(#record_name)
                        #( .field(#field_entries) )*
                        .build()
                })
            }

            #[allow(unused_mut)]
            fn field_values(&self) -> ::fieldbind::BindResult<::fieldbind::FieldValues> {
                let mut values = ::fieldbind::FieldValues::new();
                #( #value_entries )*
                Ok(values)
            }
        }
    }
}

fn embedded_entry(field_name: &str, ty: &Type) -> TokenStream2 {
    quote! {
        ::fieldbind::FieldDescriptor::embedded::<#ty>(#field_name)
    }
}

/// The external name in `bind(json)` must be the key serde actually decodes.
fn check_json_tag(json: &LitStr, wire_name: &str) -> syn::Result<()> {
    let value = json.value();
    let external = value.split(',').next().unwrap_or_default();
    if external.is_empty() || external == "-" || external == wire_name {
        return Ok(());
    }
    Err(syn::Error::new(
        json.span(),
        format!(
            "#[bind(json = \"{}\")] does not match the serde wire name \"{}\"; add #[serde(rename = \"{}\")]",
            value, wire_name, external
        ),
    ))
}

fn parse_bind_field_options(attrs: &[syn::Attribute]) -> syn::Result<BindFieldOptions> {
    let mut options = BindFieldOptions::default();
    let mut seen = false;

    for attr in attrs {
        if !path_ends_with_ident(attr.path(), "bind") {
            continue;
        }

        if seen {
            return Err(syn::Error::new(
                attr.span(),
                "Duplicate #[bind(...)] attribute on field",
            ));
        }
        seen = true;

        match &attr.meta {
            syn::Meta::List(list) => {
                list.parse_nested_meta(|meta| {
                    if meta.path.is_ident("json") {
                        options.json = Some(meta.value()?.parse()?);
                        return Ok(());
                    }

                    if meta.path.is_ident("column") {
                        options.column = Some(meta.value()?.parse()?);
                        return Ok(());
                    }

                    if meta.path.is_ident("validate") {
                        options.validate = Some(meta.value()?.parse()?);
                        return Ok(());
                    }

                    if meta.path.is_ident("readonly") {
                        options.readonly = true;
                        return Ok(());
                    }

                    Err(meta.error(
                        "Unsupported #[bind(...)] option. Supported: json = \"...\", column = \"...\", validate = \"...\", readonly",
                    ))
                })?;
            }
            _ => {
                return Err(syn::Error::new(
                    attr.span(),
                    "Unsupported #[bind] syntax. Use #[bind(json = \"...\", column = \"...\", validate = \"...\", readonly)]",
                ));
            }
        }
    }

    Ok(options)
}

/// Reads the serde field attributes that affect binding. Everything else is
/// skipped and left to serde's own derive.
fn parse_serde_field_options(attrs: &[syn::Attribute]) -> syn::Result<SerdeFieldOptions> {
    let mut options = SerdeFieldOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                let lit: LitStr = meta.value()?.parse()?;
                options.rename = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("rename") {
                meta.parse_nested_meta(|nested| {
                    if nested.path.is_ident("deserialize") {
                        let lit: LitStr = nested.value()?.parse()?;
                        options.rename = Some(lit.value());
                        return Ok(());
                    }
                    skip_meta(&nested)
                })?;
                return Ok(());
            }

            if meta.path.is_ident("alias") {
                options.alias = Some(meta.value()?.parse()?);
                return Ok(());
            }

            if meta.path.is_ident("skip") || meta.path.is_ident("skip_deserializing") {
                options.skip_deserializing = true;
                return Ok(());
            }

            if meta.path.is_ident("flatten") {
                options.flatten = true;
                return Ok(());
            }

            skip_meta(&meta)
        })?;
    }

    Ok(options)
}

/// Container `rename_all` (or `rename_all(deserialize = ...)`).
fn parse_serde_rename_all(attrs: &[syn::Attribute]) -> syn::Result<Option<RenameRule>> {
    let mut rule = None;

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") && meta.input.peek(Token![=]) {
                let lit: LitStr = meta.value()?.parse()?;
                rule = Some(RenameRule::parse(&lit)?);
                return Ok(());
            }

            if meta.path.is_ident("rename_all") {
                meta.parse_nested_meta(|nested| {
                    if nested.path.is_ident("deserialize") {
                        let lit: LitStr = nested.value()?.parse()?;
                        rule = Some(RenameRule::parse(&lit)?);
                        return Ok(());
                    }
                    skip_meta(&nested)
                })?;
                return Ok(());
            }

            skip_meta(&meta)
        })?;
    }

    Ok(rule)
}

fn skip_meta(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|nested| skip_meta(&nested))?;
    }
    Ok(())
}

fn path_ends_with_ident(path: &syn::Path, ident: &str) -> bool {
    path.segments
        .last()
        .map(|segment| segment.ident == ident)
        .unwrap_or(false)
}
