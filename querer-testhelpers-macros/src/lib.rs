#![doc = include_str!("../README.md")]

use unsynn::*;

keyword! {
    KFn = "fn";
}

unsynn! {
    struct UntilFn {
        items: Any<Cons<Except<KFn>, TokenTree>>,
    }

    struct UntilBody {
        items: Any<Cons<Except<BraceGroup>, TokenTree>>,
    }

    struct Body {
        items: BraceGroup,
    }

    struct TestFn {
        until_fn: UntilFn, _fn: KFn, name: Ident,
        until_body: UntilBody, body: Body
    }
}

impl quote::ToTokens for UntilFn {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.items.to_tokens(tokens)
    }
}

impl quote::ToTokens for UntilBody {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.items.to_tokens(tokens)
    }
}

impl quote::ToTokens for Body {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        tokens.extend(self.items.0.stream())
    }
}

/// Mark a querer test, calling `querer_testhelpers::setup()` before the body.
///
/// `setup()` installs the subscriber filtered by `QUERER_LOG`, so when the
/// `tracing` feature of `querer-core` is on, the walker's events show up in
/// the test's captured output: one per field written or skipped, and one per
/// embedded record allocated or conversion failed. Test bodies usually return
/// `Result<(), IPanic>`, so a failing `unmarshal_query(..)?` panics at that
/// line with the error, which names the offending key.
///
/// ```ignore
/// use querer_testhelpers::{IPanic, test};
///
/// #[test]
/// fn reads_limit() -> Result<(), IPanic> {
///     let query: QueryValues = [("limit", "10")].into_iter().collect();
///     let page: Page = from_query(&query)?;
///     assert_eq!(page.limit, 10);
///     Ok(())
/// }
/// ```
///
/// Any other test attribute can be named as an argument:
/// `#[querer_testhelpers::test(tokio::test)]`.
#[proc_macro_attribute]
pub fn test(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let item = TokenStream::from(item);
    let mut i = item.to_token_iter();
    let test_fn = match i.parse::<TestFn>() {
        Ok(test_fn) => test_fn,
        Err(err) => {
            let msg = err.to_string();
            return quote::quote! { ::core::compile_error!(#msg); }.into();
        }
    };

    let TestFn {
        until_fn,
        _fn,
        name,
        until_body,
        body,
    } = test_fn;

    let test_attr = if attr.is_empty() {
        quote::quote! { #[::core::prelude::rust_2024::test] }
    } else {
        let attr = TokenStream::from(attr);
        quote::quote! { #[#attr] }
    };

    quote::quote! {
        #test_attr
        #until_fn fn #name #until_body {
            ::querer_testhelpers::setup();

            #body
        }
    }
    .into()
}
