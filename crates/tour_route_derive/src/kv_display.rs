use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, LitStr, spanned::Spanned};

/// How a field value is rendered after `key = `.
enum ValueFormat {
    /// `Display` of the field itself.
    Plain,
    /// Comma-joined items of an iterable field.
    List,
    /// `Display` of the inner value, or `-` for `None`.
    Opt,
}

impl ValueFormat {
    fn parse(lit: &LitStr) -> syn::Result<Self> {
        match lit.value().as_str() {
            "display" => Ok(Self::Plain),
            "list" => Ok(Self::List),
            "opt" => Ok(Self::Opt),
            other => Err(syn::Error::new(
                lit.span(),
                format!("unsupported kv fmt mode: {other} (expected display|list|opt)"),
            )),
        }
    }

    fn render(&self, ident: &Ident) -> TokenStream2 {
        match self {
            Self::Plain => quote! { self.#ident.to_string() },
            Self::List => quote! {
                self.#ident.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
            },
            Self::Opt => quote! {
                self.#ident.as_ref().map_or_else(|| String::from("-"), ToString::to_string)
            },
        }
    }
}

/// `(key, rendered value)` for one named field.
fn field_entry(field: &Field) -> syn::Result<Option<(String, TokenStream2)>> {
    let Some(ident) = &field.ident else {
        return Ok(None);
    };
    let mut key = ident.to_string();
    let mut format = ValueFormat::Plain;
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("kv")) {
        attr.parse_nested_meta(|meta| {
            let lit: LitStr = meta.value()?.parse()?;
            if meta.path.is_ident("name") {
                key = lit.value();
            } else if meta.path.is_ident("fmt") {
                format = ValueFormat::parse(&lit)?;
            } else {
                return Err(meta.error("unsupported kv attribute; expected name/fmt"));
            }
            Ok(())
        })?;
    }
    Ok(Some((key, format.render(ident))))
}

pub fn derive_kv_display_inner(item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "KvDisplay can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new(input.span(), "KvDisplay requires named fields"));
    };

    let mut entries = Vec::new();
    for field in &fields.named {
        entries.extend(field_entry(field)?);
    }

    // Keys are padded to a common width so values line up in the log.
    let width = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let lines = entries.iter().map(|(key, value)| {
        let padded = format!("{key:<width$}");
        quote! { write!(f, "\n\t{} = {}", #padded, #value)?; }
    });

    let ident = &input.ident;
    Ok(quote! {
        impl std::fmt::Display for #ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                #(#lines)*
                Ok(())
            }
        }
    })
}
