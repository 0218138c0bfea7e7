use proc_macro::TokenStream;

mod tools;

/// Expose methods of an impl block as tools.
///
/// Each `method = "description"` pair produces a newtype wrapper named
/// `{Type}{Method}` (method name in PascalCase) that implements
/// `threadgraph_core::tool::ToolFunction`.
#[proc_macro_attribute]
pub fn tools(attr: TokenStream, item: TokenStream) -> TokenStream {
    tools::tools_impl(attr, item)
}
