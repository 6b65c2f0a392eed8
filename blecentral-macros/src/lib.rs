use proc_macro::TokenStream;

mod progress;

/// Marks an async operation as a progress step.
///
/// `message` is shown on the span's spinner while the function runs and
/// `finished` replaces it once the span closes. If the function already
/// carries `#[instrument]`, `progress = true` is injected into its fields;
/// otherwise an `#[instrument(fields(progress = true))]` is added.
#[proc_macro_attribute]
pub fn progress(attr: TokenStream, item: TokenStream) -> TokenStream {
    progress::expand(attr, item)
}
