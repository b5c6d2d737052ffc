//! Build-time template macros
//!
//! Each macro compiles its templates while the crate is being built, so a
//! template that doesn't compile is reported as a compile error pointing at
//! the literal that named it. The expansion is an accessor function returning
//! a lazily built `&'static stache::Template`.

use proc_macro::TokenStream;
use proc_macro2::{Ident, Span};
use quote::quote;
use std::fs;
use std::path::Path;
use syn::{LitStr, Token, parse::Parse, parse::ParseStream, parse_macro_input};
use walkdir::WalkDir;

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            for lc in c.to_lowercase() {
                result.push(lc);
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn accessor_name(name: &str, span: Span) -> syn::Result<Ident> {
    let snake = to_snake_case(&name.replace('-', "_"));
    syn::parse_str::<Ident>(&snake)
        .map(|ident| Ident::new(&ident.to_string(), span))
        .map_err(|_| syn::Error::new(span, format!("`{name}` is not a valid template name")))
}

/// Checks the template compiles and emits its accessor
///
/// `source` is the expression the accessor compiles at run time, either the
/// literal itself or an `include_str!` of the template file.
fn generate_accessor(
    name: &str,
    content: &str,
    source: proc_macro2::TokenStream,
    span: Span,
) -> syn::Result<proc_macro2::TokenStream> {
    let accessor = accessor_name(name, span)?;
    stache_compiler::compile(content)
        .map_err(|e| syn::Error::new(span, format!("template `{name}`: {e}")))?;

    Ok(quote! {
        pub fn #accessor() -> &'static ::stache::Template {
            static TEMPLATE: ::std::sync::LazyLock<::stache::Template> =
                ::std::sync::LazyLock::new(|| {
                    ::stache::Template::compile(#source)
                        .expect("template was validated at build time")
                });
            &TEMPLATE
        }
    })
}

fn generate_accessor_for_file(path: &Path, span: Span) -> syn::Result<proc_macro2::TokenStream> {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| syn::Error::new(span, format!("Not a file: {path:?}")))?;
    let content = fs::read_to_string(path)
        .map_err(|e| syn::Error::new(span, format!("Failed to read {path:?}: {e}")))?;
    let path_str = path.to_string_lossy();
    // include_str! links the output to the source so that any changes to the
    // hbs file will trigger a recompilation
    generate_accessor(&name, &content, quote!(include_str!(#path_str)), span)
}

fn manifest_path(relative: &str, span: Span) -> syn::Result<std::path::PathBuf> {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")
        .map_err(|_| syn::Error::new(span, "CARGO_MANIFEST_DIR not set"))?;
    Ok(Path::new(&manifest_dir).join(relative))
}

struct StrInput {
    name: LitStr,
    content: LitStr,
}

impl Parse for StrInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let name: LitStr = input.parse()?;
        input.parse::<Token![,]>()?;
        let content: LitStr = input.parse()?;
        input.parse::<Option<Token![,]>>()?;
        Ok(StrInput { name, content })
    }
}

fn expand_directory(dir_lit: &LitStr) -> syn::Result<proc_macro2::TokenStream> {
    let root_path = manifest_path(&dir_lit.value(), dir_lit.span())?;
    if !root_path.is_dir() {
        return Err(syn::Error::new(
            dir_lit.span(),
            format!("Directory not found: {root_path:?}"),
        ));
    }

    let mut accessors = Vec::new();
    for entry in WalkDir::new(&root_path).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "hbs") {
            accessors.push(generate_accessor_for_file(path, dir_lit.span())?);
        }
    }

    Ok(quote! {
        #(#accessors)*
    })
}

fn expand_file(file_lit: &LitStr) -> syn::Result<proc_macro2::TokenStream> {
    let path = manifest_path(&file_lit.value(), file_lit.span())?;
    if !path.is_file() {
        return Err(syn::Error::new(
            file_lit.span(),
            format!("File not found: {path:?}"),
        ));
    }
    generate_accessor_for_file(&path, file_lit.span())
}

/// One accessor per `.hbs` file under a directory relative to the crate
/// manifest, named after the file stem in snake case
#[proc_macro]
pub fn stache_directory(input: TokenStream) -> TokenStream {
    let dir_lit = parse_macro_input!(input as LitStr);
    expand_directory(&dir_lit)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// An accessor for a single template file relative to the crate manifest
#[proc_macro]
pub fn stache_file(input: TokenStream) -> TokenStream {
    let file_lit = parse_macro_input!(input as LitStr);
    expand_file(&file_lit)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// An accessor for an inline template: `str!("name", "template")`
#[proc_macro]
pub fn stache_str(input: TokenStream) -> TokenStream {
    let StrInput { name, content } = parse_macro_input!(input as StrInput);
    let source = quote!(#content);
    generate_accessor(&name.value(), &content.value(), source, content.span())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_names() {
        assert_eq!(to_snake_case("TodoItem"), "todo_item");
        assert_eq!(to_snake_case("button"), "button");
        assert_eq!(
            accessor_name("todo-list", Span::call_site()).unwrap().to_string(),
            "todo_list"
        );
        assert!(accessor_name("2fast", Span::call_site()).is_err());
    }

    #[test]
    fn invalid_templates_are_rejected() {
        let err = generate_accessor("broken", "{{#if x}}", quote!("{{#if x}}"), Span::call_site())
            .unwrap_err();
        assert!(err.to_string().starts_with("template `broken`: "));
    }

    #[test]
    fn accessor_shape() {
        let tokens = generate_accessor("hello", "Hi {{name}}", quote!("Hi {{name}}"), Span::call_site())
            .unwrap()
            .to_string();
        assert!(tokens.starts_with("pub fn hello () -> & 'static :: stache :: Template"));
    }
}
