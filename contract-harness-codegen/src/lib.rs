use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;

/// Turns `async fn name(config: HarnessConfiguration)` into a live contract
/// test.
///
/// The configuration is loaded from the environment and optionally passed to
/// a configuration function (`#[contract_test(configure)]`) taking
/// `&mut HarnessConfiguration`. Without any base URL the test is skipped.
#[proc_macro_attribute]
pub fn contract_test(attrs: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    let args = syn::parse_macro_input!(attrs as syn::AttributeArgs);

    if input.sig.asyncness.is_none() {
        return compile_error(
            input.sig.fn_token.span(),
            "A contract test should be an async function!",
        )
        .into();
    }

    if input.sig.inputs.len() != 1 {
        return compile_error(
            input.sig.inputs.span(),
            "A contract test should take exactly one HarnessConfiguration argument",
        )
        .into();
    }

    if args.len() > 1 {
        return compile_error(
            Span::call_site(),
            "Only a configuration function can be passed to the macro",
        )
        .into();
    }

    let configure = match args.first() {
        None => quote! {},
        Some(syn::NestedMeta::Meta(syn::Meta::Path(function_path))) => quote! {
            #function_path(&mut __contract_configuration);
        },
        Some(other) => {
            return compile_error(other.span(), "The argument should be a configuration function!")
                .into();
        }
    };

    let attributes = &input.attrs;
    let visibility = &input.vis;
    let name = &input.sig.ident;
    let mut inner_signature = input.sig.clone();
    inner_signature.ident = syn::Ident::new("__contract_test_body", name.span());
    let block = &input.block;
    let test_name = name.to_string();

    let output = quote! {
        #[test]
        #(#attributes)*
        #visibility fn #name() {
            #inner_signature #block

            contract_harness::logging::init_test_logging();

            #[allow(unused_mut)]
            let mut __contract_configuration =
                match contract_harness::HarnessConfiguration::from_env() {
                    Ok(configuration) => configuration,
                    Err(e) => panic!("Contract harness configuration error: {}", e),
                };
            #configure

            if !__contract_configuration.is_live() {
                contract_harness::__private::tracing::warn!(
                    test = #test_name,
                    "no base URL configured, skipping live contract test"
                );
                return;
            }

            contract_harness::__private::tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Couldn't build the tokio runtime")
                .block_on(__contract_test_body(__contract_configuration));
        }
    };

    TokenStream::from(output)
}

fn compile_error(span: Span, message: &str) -> proc_macro2::TokenStream {
    quote_spanned! {span=>
        compile_error!(#message);
    }
}
