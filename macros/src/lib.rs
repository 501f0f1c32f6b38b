use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, Ident, ItemFn, LitStr};

const USAGE: &str = "rxcore_macro::test only accepts: #[rxcore_macro::test], \
                     #[rxcore_macro::test(local)], #[rxcore_macro::test(shared)], or string \
                     equivalents";

/// Test attribute used across rxcore.
///
/// Sync functions become plain `#[test]`s. Async functions run on a tokio
/// runtime: `local` (the default) uses a current-thread runtime, `shared`
/// uses a multi-thread runtime so that schedulers and locks are exercised
/// from several worker threads.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);
  let is_async = input.sig.asyncness.is_some();
  let raw_args = TokenStream2::from(attr);

  if !raw_args.is_empty() && !is_async {
    return syn::Error::new(
      raw_args.span(),
      "rxcore_macro::test flavor args are only supported for async tests. Use \
       #[rxcore_macro::test] for sync tests, or make the function async.",
    )
    .to_compile_error()
    .into();
  }

  let expanded = if is_async {
    match runtime_args(raw_args) {
      Ok(args) => quote! {
        #[tokio::test(#args)]
        #input
      },
      Err(err) => return err.to_compile_error().into(),
    }
  } else {
    quote! {
      #[test]
      #input
    }
  };

  TokenStream::from(expanded)
}

fn runtime_args(raw_args: TokenStream2) -> syn::Result<TokenStream2> {
  if raw_args.is_empty() {
    return Ok(TokenStream2::new());
  }

  let (flavor, span) = if let Ok(ident) = syn::parse2::<Ident>(raw_args.clone()) {
    (ident.to_string(), ident.span())
  } else if let Ok(lit) = syn::parse2::<LitStr>(raw_args.clone()) {
    (lit.value(), lit.span())
  } else {
    return Err(syn::Error::new(raw_args.span(), USAGE));
  };

  match flavor.as_str() {
    "local" => Ok(quote!(flavor = "current_thread")),
    "shared" => Ok(quote!(flavor = "multi_thread", worker_threads = 4)),
    _ => Err(syn::Error::new(span, USAGE)),
  }
}
