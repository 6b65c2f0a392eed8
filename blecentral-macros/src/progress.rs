use proc_macro::TokenStream;
use proc_macro2::{Delimiter, Group, TokenStream as TokenStream2, TokenTree};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Expr, ItemFn, MetaNameValue, Token};

struct ProgressArgs {
    message: Expr,
    finished: Option<Expr>,
}

impl Parse for ProgressArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let pairs = Punctuated::<MetaNameValue, Token![,]>::parse_terminated(input)?;
        let mut message = None;
        let mut finished = None;

        for pair in pairs {
            let Some(ident) = pair.path.get_ident() else {
                return Err(syn::Error::new_spanned(pair.path, "expected an identifier"));
            };
            match ident.to_string().as_str() {
                "message" => message = Some(pair.value),
                "finished" => finished = Some(pair.value),
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown progress argument `{other}`"),
                    ));
                }
            }
        }

        let message = message.ok_or_else(|| input.error("missing `message` argument"))?;
        Ok(Self { message, finished })
    }
}

pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match syn::parse::<ProgressArgs>(attr) {
        Ok(args) => args,
        Err(error) => return error.to_compile_error().into(),
    };
    let mut function = match syn::parse::<ItemFn>(item) {
        Ok(function) => function,
        Err(error) => return error.to_compile_error().into(),
    };

    mark_instrumented(&mut function);

    let message = &args.message;
    let set_finished = args.finished.as_ref().map(|finished| {
        quote!(__progress_span.pb_set_finish_message(&#finished);)
    });
    let body = std::mem::take(&mut function.block.stmts);
    function.block = syn::parse_quote!({
        {
            use tracing_indicatif::span_ext::IndicatifSpanExt as _;
            let __progress_span = tracing::Span::current();
            __progress_span.pb_set_message(&#message);
            #set_finished
        }
        #(#body)*
    });

    quote!(#function).into()
}

fn mark_instrumented(function: &mut ItemFn) {
    let existing = function
        .attrs
        .iter_mut()
        .find(|attr| attr.path().is_ident("instrument"));

    let Some(attr) = existing else {
        function
            .attrs
            .push(syn::parse_quote!(#[tracing::instrument(fields(progress = true))]));
        return;
    };

    let tokens = match &attr.meta {
        syn::Meta::List(list) => with_progress_field(list.tokens.clone()),
        _ => quote!(fields(progress = true)),
    };
    *attr = syn::parse_quote!(#[instrument(#tokens)]);
}

fn with_progress_field(tokens: TokenStream2) -> TokenStream2 {
    let mut output = Vec::new();
    let mut injected = false;
    let mut trees = tokens.into_iter().peekable();

    while let Some(tree) = trees.next() {
        let is_fields = matches!(&tree, TokenTree::Ident(ident) if ident == "fields");
        let next_is_group = matches!(
            trees.peek(),
            Some(TokenTree::Group(group)) if group.delimiter() == Delimiter::Parenthesis
        );
        output.push(tree);
        if !(is_fields && next_is_group) {
            continue;
        }

        if let Some(TokenTree::Group(group)) = trees.next() {
            let inner = group.stream();
            let merged = if inner.is_empty() {
                quote!(progress = true)
            } else {
                quote!(#inner, progress = true)
            };
            output.push(TokenTree::Group(Group::new(Delimiter::Parenthesis, merged)));
            injected = true;
        }
    }

    let stream: TokenStream2 = output.into_iter().collect();
    match (injected, stream.is_empty()) {
        (true, _) => stream,
        (false, true) => quote!(fields(progress = true)),
        (false, false) => quote!(#stream, fields(progress = true)),
    }
}
