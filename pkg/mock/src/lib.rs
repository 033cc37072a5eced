//! Procedural macros for generating mock implementations.
//!
//! # client
//!
//! Generates a mock implementation for an async collaborator trait
//! (token exchangers, remote clients).
//!
//! Gate it behind a feature so downstream crates can use the mock in
//! their own tests:
//!
//! ```ignore
//! use async_trait::async_trait;
//!
//! #[cfg_attr(feature = "mock", mock::client)]
//! #[async_trait]
//! pub trait TokenExchanger: Send + Sync + 'static {
//!     async fn exchange(&self, request: ExchangeRequest) -> Result<TokenResponse, ExchangeError>;
//! }
//!
//! // Generates:
//! // pub struct MockTokenExchanger {
//! //     pub exchange: Mutex<Option<Result<TokenResponse, ExchangeError>>>,
//! //     pub exchange_call_count: AtomicUsize,
//! //     pub exchange_args: Mutex<Vec<ExchangeRequest>>,
//! // }
//! // impl Default for MockTokenExchanger { ... }
//! // #[async_trait] impl TokenExchanger for MockTokenExchanger { ... }
//! ```
//!
//! Arguments are only recorded when every argument of the method is owned.
//! A single argument is recorded as is, several as a tuple.
//!
//! ## Checking Call Counts in Tests
//!
//! ```ignore
//! assert_eq!(mock.exchange_calls(), 1);
//! let requests = mock.exchange_args.lock().await;
//! ```

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{FnArg, ItemTrait, ReturnType, TraitItem, Type, parse_macro_input};

/// Generates a mock implementation for an async trait.
#[proc_macro_attribute]
pub fn client(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemTrait);
    let trait_name = &input.ident;
    let mock_name = format_ident!("Mock{}", trait_name);
    let vis = &input.vis;

    let mut field_definitions = Vec::new();
    let mut default_fields = Vec::new();
    let mut impl_methods = Vec::new();
    let mut call_count_methods = Vec::new();

    for item in &input.items {
        let TraitItem::Fn(method) = item else {
            continue;
        };

        let method_name = &method.sig.ident;
        let call_count_field = format_ident!("{}_call_count", method_name);
        let call_count_method = format_ident!("{}_calls", method_name);
        let args_field = format_ident!("{}_args", method_name);

        let return_type = match &method.sig.output {
            ReturnType::Default => quote! { () },
            ReturnType::Type(_, ty) => quote! { #ty },
        };

        let typed_args: Vec<_> = method
            .sig
            .inputs
            .iter()
            .filter_map(|arg| match arg {
                FnArg::Typed(pat_type) => Some(pat_type),
                FnArg::Receiver(_) => None,
            })
            .collect();

        let arg_names: Vec<_> = (0..typed_args.len())
            .map(|i| format_ident!("arg{}", i))
            .collect();
        let arg_types: Vec<_> = typed_args.iter().map(|pat| &pat.ty).collect();

        let records_args = !arg_types.is_empty()
            && arg_types
                .iter()
                .all(|ty| !matches!(ty.as_ref(), Type::Reference(_)));

        field_definitions.push(quote! {
            pub #method_name: ::tokio::sync::Mutex<::std::option::Option<#return_type>>
        });
        field_definitions.push(quote! {
            pub #call_count_field: ::std::sync::atomic::AtomicUsize
        });

        default_fields.push(quote! {
            #method_name: ::tokio::sync::Mutex::new(::std::option::Option::None)
        });
        default_fields.push(quote! {
            #call_count_field: ::std::sync::atomic::AtomicUsize::new(0)
        });

        call_count_methods.push(quote! {
            pub fn #call_count_method(&self) -> usize {
                self.#call_count_field.load(::std::sync::atomic::Ordering::SeqCst)
            }
        });

        let record = if records_args {
            let (recorded_type, recorded_value) = if arg_types.len() == 1 {
                let ty = arg_types[0];
                let name = &arg_names[0];
                (quote! { #ty }, quote! { #name })
            } else {
                (quote! { (#(#arg_types),*) }, quote! { (#(#arg_names),*) })
            };

            field_definitions.push(quote! {
                pub #args_field: ::tokio::sync::Mutex<::std::vec::Vec<#recorded_type>>
            });
            default_fields.push(quote! {
                #args_field: ::tokio::sync::Mutex::new(::std::vec::Vec::new())
            });

            quote! { self.#args_field.lock().await.push(#recorded_value); }
        } else {
            quote! {}
        };

        let params: Vec<_> = if records_args {
            arg_names
                .iter()
                .zip(&arg_types)
                .map(|(name, ty)| quote! { #name: #ty })
                .collect()
        } else {
            arg_names
                .iter()
                .zip(&arg_types)
                .map(|(name, ty)| {
                    let ignored = format_ident!("_{}", name);
                    quote! { #ignored: #ty }
                })
                .collect()
        };

        impl_methods.push(quote! {
            async fn #method_name(&self, #(#params),*) -> #return_type {
                self.#call_count_field.fetch_add(1, ::std::sync::atomic::Ordering::SeqCst);
                #record
                self.#method_name.lock().await.take().unwrap()
            }
        });
    }

    let expanded = quote! {
        #input

        #vis struct #mock_name {
            #(#field_definitions),*
        }

        impl ::std::default::Default for #mock_name {
            fn default() -> Self {
                Self {
                    #(#default_fields),*
                }
            }
        }

        impl #mock_name {
            #(#call_count_methods)*
        }

        #[::async_trait::async_trait]
        impl #trait_name for #mock_name {
            #(#impl_methods)*
        }
    };

    TokenStream::from(expanded)
}
