use proc_macro::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::{parse_macro_input, ItemFn, LitBool, LitStr};

#[derive(Clone, Copy)]
enum Format {
    Table,
    Json,
    JsonPretty,
}

impl Format {
    fn to_tokens(self) -> proc_macro2::TokenStream {
        match self {
            Format::Table => quote!(malloc_hooks::Format::Table),
            Format::Json => quote!(malloc_hooks::Format::Json),
            Format::JsonPretty => quote!(malloc_hooks::Format::JsonPretty),
        }
    }
}

/// Installs the malloc hooks for the duration of the annotated function and
/// reports the allocations still outstanding when it returns.
///
/// The process has to route its allocations through
/// `malloc_hooks::HookedAllocator` (for example with the `global` feature of
/// `malloc-hooks`), otherwise the report is always empty.
///
/// # Parameters
///
/// * `format` - Output format as a string: `"table"` (default), `"json"`, or `"json-pretty"`
/// * `reset` - Whether to zero the statistics when the guard is created. Default: `true`
///
/// # Examples
///
/// ```rust,ignore
/// #[malloc_hooks::main]
/// fn main() {
///     // Your code here
/// }
/// ```
///
/// JSON output format:
///
/// ```rust,ignore
/// #[malloc_hooks::main(format = "json")]
/// fn main() {
///     // Your code here
/// }
/// ```
///
/// With tokio, place `#[tokio::main]` before `#[malloc_hooks::main]`:
///
/// ```rust,ignore
/// #[tokio::main]
/// #[malloc_hooks::main]
/// async fn main() {
///     // Your code here
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    // Defaults
    let mut format = Format::Table;
    let mut reset = true;

    if !attr.is_empty() {
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("format") {
                meta.input.parse::<syn::Token![=]>()?;
                let lit: LitStr = meta.input.parse()?;
                format = match lit.value().as_str() {
                    "table" => Format::Table,
                    "json" => Format::Json,
                    "json-pretty" => Format::JsonPretty,
                    other => {
                        return Err(meta.error(format!(
                            "Unknown format {:?}. Expected one of: \"table\", \"json\", \"json-pretty\"",
                            other
                        )))
                    }
                };
                return Ok(());
            }

            if meta.path.is_ident("reset") {
                meta.input.parse::<syn::Token![=]>()?;
                let lit: LitBool = meta.input.parse()?;
                reset = lit.value;
                return Ok(());
            }

            Err(meta.error("Unknown parameter. Supported: format=\"..\", reset=true|false"))
        });

        if let Err(e) = parser.parse2(proc_macro2::TokenStream::from(attr)) {
            return e.to_compile_error().into();
        }
    }

    let format_token = format.to_tokens();
    let asyncness = sig.asyncness.is_some();
    let fn_name = &sig.ident;

    let body = quote! {
        let _malloc_hooks = {
            let caller_name: &'static str =
                concat!(module_path!(), "::", stringify!(#fn_name));

            malloc_hooks::GuardBuilder::new(caller_name)
                .format(#format_token)
                .reset_on_start(#reset)
                .build()
        };
        #block
    };

    let wrapped_body = if asyncness {
        quote! { async { #body }.await }
    } else {
        body
    };

    let output = quote! {
        #(#attrs)*
        #vis #sig {
            #wrapped_body
        }
    };

    output.into()
}
