//! The record model the derive works from, and how it is read out of the
//! token stream.

use proc_macro2::{Delimiter, Ident, Literal, Span, TokenStream, TokenTree};
use quote::{quote, quote_spanned};
use unsynn::*;

use core::result::Result;

use crate::grammar::{
    AdtHead, AdtKind, Attribute, NamedField, QueryArg, QueryAttr, QueryAttrArgs, TupleField,
};

const QUERY_ATTR_USAGE: &str = "expected #[query(\"key\")], #[query(key = \"key\")], #[query = \"key\"] or #[query(flatten)]";

/// An error found while reading the derive input, reported as a
/// `compile_error!` at `span`.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// The error message
    pub message: String,
    /// Where the error points
    pub span: Span,
}

impl ParseError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        ParseError {
            message: message.into(),
            span,
        }
    }

    /// Render the error as a `compile_error!` invocation.
    pub fn to_compile_error(&self) -> TokenStream {
        let message = &self.message;
        quote_spanned! { self.span =>
            ::core::compile_error!(#message);
        }
    }
}

/// How a struct field is accessed: `self.name` or `self.0`.
#[derive(Debug, Clone)]
pub enum Member {
    /// Named field
    Named(Ident),
    /// Tuple field index
    Index(usize),
}

impl quote::ToTokens for Member {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        match self {
            Member::Named(ident) => tokens.extend(quote! { #ident }),
            Member::Index(index) => {
                let unsuffixed = Literal::usize_unsuffixed(*index);
                tokens.extend(quote! { #unsuffixed })
            }
        }
    }
}

impl std::fmt::Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Member::Named(ident) => {
                let name = ident.to_string();
                f.write_str(name.strip_prefix("r#").unwrap_or(&name))
            }
            Member::Index(index) => write!(f, "{index}"),
        }
    }
}

/// What `#[query]` asked for on a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRole {
    /// Read the field from a mapping key
    Leaf {
        /// The mapping key
        key: String,
    },
    /// Recurse into the field as an embedded record
    Flatten,
}

/// A struct field.
#[derive(Debug, Clone)]
pub struct PField {
    /// How the field is accessed
    pub member: Member,
    /// The field's declared type
    pub ty: TokenStream,
    /// Span of the field's type, used for trait errors
    pub ty_span: Span,
    /// `None` for fields without `#[query]`, which are never touched
    pub role: Option<FieldRole>,
}

/// One generic parameter, split into the form that goes after `impl` and
/// the form that goes after the type name.
#[derive(Debug, Clone)]
pub struct PGenericParam {
    /// The parameter with any default stripped: `T: Clone`, `'a`, `const N: usize`
    pub decl: TokenStream,
    /// The parameter as an argument: `T`, `'a`, `N`
    pub arg: TokenStream,
    /// Whether this is a type parameter
    pub is_type: bool,
}

/// A struct deriving `Query`.
#[derive(Debug, Clone)]
pub struct PRecord {
    /// The struct's name
    pub name: Ident,
    /// Generic parameters, in declaration order
    pub generics: Vec<PGenericParam>,
    /// Where predicates without the `where` keyword or a trailing comma
    pub where_predicates: Option<TokenStream>,
    /// All fields, annotated or not, in declaration order
    pub fields: Vec<PField>,
}

impl PRecord {
    /// Read a record from derive input.
    pub fn parse(input: TokenStream) -> Result<Self, ParseError> {
        let mut iter = input.to_token_iter();
        let head: AdtHead = iter
            .parse()
            .map_err(|err| ParseError::new(err.to_string(), Span::call_site()))?;

        if !matches!(head.kind, AdtKind::Struct(_)) {
            return Err(ParseError::new(
                "#[derive(Query)] only supports structs",
                head.name.span(),
            ));
        }

        if let Some(attr) = head.attrs.iter().find(|attr| is_query_attr(attr)) {
            return Err(ParseError::new(
                "#[query] belongs on fields, not on the record itself",
                attr_span(attr),
            ));
        }

        let (generics, rest) = split_generics(head.rest)?;
        let (body, where_predicates) = split_body(&head.name, rest)?;

        let fields = match body {
            Body::Named(stream) => split_top_level_commas(stream)
                .into_iter()
                .map(parse_named_field)
                .collect::<Result<Vec<_>, _>>()?,
            Body::Tuple(stream) => split_top_level_commas(stream)
                .into_iter()
                .enumerate()
                .map(|(index, chunk)| parse_tuple_field(index, chunk))
                .collect::<Result<Vec<_>, _>>()?,
            Body::Unit => Vec::new(),
        };

        Ok(PRecord {
            name: head.name,
            generics,
            where_predicates,
            fields,
        })
    }

    /// Whether a field type can mention a parameter of the record.
    pub fn has_type_params(&self) -> bool {
        self.generics.iter().any(|g| g.is_type)
    }
}

enum Body {
    Named(TokenStream),
    Tuple(TokenStream),
    Unit,
}

fn is_punct(tt: &TokenTree, ch: char) -> bool {
    matches!(tt, TokenTree::Punct(p) if p.as_char() == ch)
}

/// Tracks `<`/`>` nesting over a flat token list, so commas and `=` inside
/// type arguments can be told apart from the ones that separate items.
#[derive(Default)]
struct AngleDepth {
    depth: usize,
    after_dash: bool,
}

impl AngleDepth {
    fn step(&mut self, tt: &TokenTree) {
        if is_punct(tt, '<') {
            self.depth += 1;
        } else if is_punct(tt, '>') && !self.after_dash {
            self.depth = self.depth.saturating_sub(1);
        }
        // `->` is a joint `-` then `>`
        self.after_dash = is_punct(tt, '-');
    }

    fn at_top(&self) -> bool {
        self.depth == 0
    }
}

fn split_top_level_commas(stream: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    let mut depth = AngleDepth::default();

    for tt in stream {
        if depth.at_top() && is_punct(&tt, ',') {
            chunks.push(core::mem::take(&mut current));
            continue;
        }
        depth.step(&tt);
        current.push(tt);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks.retain(|chunk| !chunk.is_empty());
    chunks
}

fn split_generics(rest: Vec<TokenTree>) -> Result<(Vec<PGenericParam>, Vec<TokenTree>), ParseError> {
    if !rest.first().is_some_and(|tt| is_punct(tt, '<')) {
        return Ok((Vec::new(), rest));
    }

    let open_span = rest[0].span();
    let mut depth = AngleDepth::default();
    let mut inner = Vec::new();
    let mut close = None;

    for (index, tt) in rest.iter().enumerate() {
        depth.step(tt);
        if index == 0 {
            continue;
        }
        if depth.at_top() {
            close = Some(index);
            break;
        }
        inner.push(tt.clone());
    }

    let Some(close) = close else {
        return Err(ParseError::new("unclosed generic parameter list", open_span));
    };

    let params = split_top_level_commas(inner.into_iter().collect())
        .into_iter()
        .map(generic_param)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((params, rest.into_iter().skip(close + 1).collect()))
}

fn generic_param(tokens: Vec<TokenTree>) -> Result<PGenericParam, ParseError> {
    let mut depth = AngleDepth::default();
    let decl: Vec<TokenTree> = tokens
        .iter()
        .take_while(|tt| {
            let stop = depth.at_top() && is_punct(tt, '=');
            depth.step(tt);
            !stop
        })
        .cloned()
        .collect();

    let span = tokens[0].span();
    match (&tokens[0], tokens.get(1)) {
        (TokenTree::Punct(p), Some(TokenTree::Ident(_))) if p.as_char() == '\'' => Ok(PGenericParam {
            arg: tokens[..2].iter().cloned().collect(),
            decl: decl.into_iter().collect(),
            is_type: false,
        }),
        (TokenTree::Ident(kw), Some(TokenTree::Ident(name))) if kw == "const" => Ok(PGenericParam {
            arg: quote! { #name },
            decl: decl.into_iter().collect(),
            is_type: false,
        }),
        (TokenTree::Ident(name), _) => Ok(PGenericParam {
            arg: quote! { #name },
            decl: decl.into_iter().collect(),
            is_type: true,
        }),
        _ => Err(ParseError::new("unsupported generic parameter", span)),
    }
}

fn where_predicates(tokens: &[TokenTree]) -> Result<Option<TokenStream>, ParseError> {
    let Some((first, predicates)) = tokens.split_first() else {
        return Ok(None);
    };
    if !matches!(first, TokenTree::Ident(kw) if kw == "where") {
        return Err(ParseError::new("expected `where` or a struct body", first.span()));
    }
    let predicates = match predicates.split_last() {
        Some((last, init)) if is_punct(last, ',') => init,
        _ => predicates,
    };
    if predicates.is_empty() {
        return Ok(None);
    }
    Ok(Some(predicates.iter().cloned().collect()))
}

fn split_body(name: &Ident, rest: Vec<TokenTree>) -> Result<(Body, Option<TokenStream>), ParseError> {
    match rest.first() {
        Some(TokenTree::Group(group)) if group.delimiter() == Delimiter::Parenthesis => {
            // struct Foo(A, B) where ...;
            let tail = match rest[1..].split_last() {
                Some((last, init)) if is_punct(last, ';') => init,
                _ => &rest[1..],
            };
            Ok((Body::Tuple(group.stream()), where_predicates(tail)?))
        }
        _ => match rest.split_last() {
            Some((TokenTree::Group(group), init)) if group.delimiter() == Delimiter::Brace => {
                Ok((Body::Named(group.stream()), where_predicates(init)?))
            }
            Some((last, init)) if is_punct(last, ';') => Ok((Body::Unit, where_predicates(init)?)),
            _ => Err(ParseError::new("expected a struct body", name.span())),
        },
    }
}

fn parse_named_field(chunk: Vec<TokenTree>) -> Result<PField, ParseError> {
    let span = chunk[0].span();
    let stream: TokenStream = chunk.into_iter().collect();
    let field: NamedField = stream
        .to_token_iter()
        .parse()
        .map_err(|_| ParseError::new("expected `name: Type`", span))?;

    let role = field_role(&field.attrs)?;
    let (ty, ty_span) = field_type(field.ty, field.name.span())?;
    Ok(PField {
        member: Member::Named(field.name),
        ty,
        ty_span,
        role,
    })
}

fn parse_tuple_field(index: usize, chunk: Vec<TokenTree>) -> Result<PField, ParseError> {
    let span = chunk[0].span();
    let stream: TokenStream = chunk.into_iter().collect();
    let field: TupleField = stream
        .to_token_iter()
        .parse()
        .map_err(|_| ParseError::new("expected a field type", span))?;

    let role = field_role(&field.attrs)?;
    let (ty, ty_span) = field_type(field.ty, span)?;
    Ok(PField {
        member: Member::Index(index),
        ty,
        ty_span,
        role,
    })
}

fn field_type(tokens: Vec<TokenTree>, fallback: Span) -> Result<(TokenStream, Span), ParseError> {
    let Some(first) = tokens.first() else {
        return Err(ParseError::new("expected a field type", fallback));
    };
    let span = first.span();
    Ok((tokens.into_iter().collect(), span))
}

fn is_query_attr(attr: &Attribute) -> bool {
    matches!(
        attr.content.0.stream().into_iter().next(),
        Some(TokenTree::Ident(ident)) if ident == "query"
    )
}

fn attr_span(attr: &Attribute) -> Span {
    attr.content
        .0
        .stream()
        .into_iter()
        .next()
        .map_or_else(|| attr.content.0.span(), |tt| tt.span())
}

fn field_role(attrs: &[Attribute]) -> Result<Option<FieldRole>, ParseError> {
    let mut query_attrs = attrs.iter().filter(|attr| is_query_attr(attr));
    let Some(attr) = query_attrs.next() else {
        return Ok(None);
    };
    if let Some(dup) = query_attrs.next() {
        return Err(ParseError::new(
            "a field takes a single #[query] attribute",
            attr_span(dup),
        ));
    }

    let span = attr_span(attr);
    let parsed = attr
        .content
        .0
        .stream()
        .to_token_iter()
        .parse::<Cons<QueryAttr, EndOfStream>>()
        .map_err(|_| ParseError::new(QUERY_ATTR_USAGE, span))?;

    let mut key = None;
    let mut flatten = false;
    match &parsed.first.args {
        QueryAttrArgs::Assign(assign) => key = Some(assign.second.value()),
        QueryAttrArgs::List(list) => {
            for arg in list.content.first.iter() {
                let next_key = match &arg.value {
                    QueryArg::Flatten(_) => {
                        flatten = true;
                        continue;
                    }
                    QueryArg::Key(kv) => kv.second.second.value(),
                    QueryArg::Bare(lit) => lit.value(),
                };
                if key.replace(next_key).is_some() {
                    return Err(ParseError::new("the query key is given more than once", span));
                }
            }
        }
    }

    match (key, flatten) {
        (Some(_), true) => Err(ParseError::new(
            "a field is either read from a key or flattened, not both",
            span,
        )),
        (Some(key), false) if key.is_empty() => {
            Err(ParseError::new("the query key must not be empty", span))
        }
        (Some(key), false) => Ok(Some(FieldRole::Leaf { key: key.to_string() })),
        (None, true) => Ok(Some(FieldRole::Flatten)),
        (None, false) => Err(ParseError::new(QUERY_ATTR_USAGE, span)),
    }
}

/// Render a generic parameter list as `<A, B>`, or nothing.
pub(crate) fn angle_list(items: impl IntoIterator<Item = TokenStream>) -> TokenStream {
    let items: Vec<_> = items.into_iter().collect();
    if items.is_empty() {
        TokenStream::new()
    } else {
        quote! { < #(#items),* > }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: TokenStream) -> PRecord {
        PRecord::parse(input).unwrap()
    }

    fn parse_err(input: TokenStream) -> String {
        PRecord::parse(input).unwrap_err().message
    }

    fn roles(record: &PRecord) -> Vec<Option<FieldRole>> {
        record.fields.iter().map(|f| f.role.clone()).collect()
    }

    fn leaf(key: &str) -> Option<FieldRole> {
        Some(FieldRole::Leaf { key: key.to_string() })
    }

    #[test]
    fn named_fields_and_attribute_forms() {
        let record = parse(quote! {
            /// Listing options
            #[derive(Default)]
            pub struct Listing {
                #[query("limit")]
                pub limit: u32,
                #[query(key = "offset")]
                pub(crate) offset: u32,
                #[query = "sort"]
                sort: String,
                #[query(flatten)]
                filter: Option<Box<Filter>>,
                /// untouched
                cache: std::collections::HashMap<String, u32>,
            }
        });

        assert_eq!(record.name, "Listing");
        assert!(!record.has_type_params());
        assert_eq!(
            roles(&record),
            [leaf("limit"), leaf("offset"), leaf("sort"), Some(FieldRole::Flatten), None]
        );
        let members: Vec<_> = record.fields.iter().map(|f| f.member.to_string()).collect();
        assert_eq!(members, ["limit", "offset", "sort", "filter", "cache"]);
        assert_eq!(
            record.fields[4].ty.to_string(),
            quote! { std::collections::HashMap<String, u32> }.to_string()
        );
    }

    #[test]
    fn tuple_and_unit_structs() {
        let record = parse(quote! {
            struct Pair(#[query("a")] pub i64, #[query("b")] bool);
        });
        let members: Vec<_> = record.fields.iter().map(|f| f.member.to_string()).collect();
        assert_eq!(members, ["0", "1"]);
        assert_eq!(roles(&record), [leaf("a"), leaf("b")]);

        let record = parse(quote! { struct Nothing; });
        assert!(record.fields.is_empty());

        let record = parse(quote! { struct Empty {} });
        assert!(record.fields.is_empty());
    }

    #[test]
    fn raw_identifiers_lose_their_prefix() {
        let record = parse(quote! {
            struct Search { #[query("type")] r#type: String }
        });
        assert_eq!(record.fields[0].member.to_string(), "type");
    }

    #[test]
    fn generics_and_where_clause() {
        let record = parse(quote! {
            struct Page<'a, T: Default = u32, const N: usize = 3>
            where
                T: Clone,
            {
                #[query("n")]
                n: T,
                marker: core::marker::PhantomData<&'a [u8; N]>,
            }
        });

        assert!(record.has_type_params());
        let args: Vec<_> = record.generics.iter().map(|g| g.arg.to_string()).collect();
        assert_eq!(args, ["'a", "T", "N"]);
        let decls: Vec<_> = record.generics.iter().map(|g| g.decl.to_string()).collect();
        assert_eq!(
            decls,
            [
                quote!('a).to_string(),
                quote!(T: Default).to_string(),
                quote!(const N: usize).to_string()
            ]
        );
        assert_eq!(
            record.where_predicates.unwrap().to_string(),
            quote!(T: Clone).to_string()
        );
    }

    #[test]
    fn lifetimes_and_consts_are_not_type_params() {
        let record = parse(quote! {
            struct Window<'a, const N: usize> {
                #[query("on")]
                on: bool,
                buf: &'a [u8; N],
            }
        });
        assert_eq!(record.generics.len(), 2);
        assert!(!record.has_type_params());
    }

    #[test]
    fn bounds_with_associated_types_keep_their_equals() {
        let record = parse(quote! {
            struct Wrap<I: Iterator<Item = u8>>(#[query("x")] u8, I) where I: Clone;
        });
        assert_eq!(
            record.generics[0].decl.to_string(),
            quote!(I: Iterator<Item = u8>).to_string()
        );
        assert_eq!(
            record.where_predicates.unwrap().to_string(),
            quote!(I: Clone).to_string()
        );
        assert_eq!(record.fields.len(), 2);
    }

    #[test]
    fn function_types_do_not_confuse_field_splitting() {
        let record = parse(quote! {
            struct Hooks {
                on_page: fn(u32, u32) -> Option<u32>,
                #[query("page")]
                page: u32,
            }
        });
        assert_eq!(roles(&record), [None, leaf("page")]);
    }

    #[test]
    fn rejects_non_structs() {
        assert_eq!(
            parse_err(quote! { enum Sort { Asc, Desc } }),
            "#[derive(Query)] only supports structs"
        );
        assert_eq!(
            parse_err(quote! { union Bits { a: u32, b: f32 } }),
            "#[derive(Query)] only supports structs"
        );
    }

    #[test]
    fn rejects_malformed_attributes() {
        assert_eq!(
            parse_err(quote! { struct A { #[query("a", flatten)] a: B } }),
            "a field is either read from a key or flattened, not both"
        );
        assert_eq!(
            parse_err(quote! { struct A { #[query("")] a: u32 } }),
            "the query key must not be empty"
        );
        assert_eq!(
            parse_err(quote! { struct A { #[query("a")] #[query("b")] a: u32 } }),
            "a field takes a single #[query] attribute"
        );
        assert_eq!(
            parse_err(quote! { struct A { #[query("a", key = "b")] a: u32 } }),
            "the query key is given more than once"
        );
        assert_eq!(parse_err(quote! { struct A { #[query] a: u32 } }), QUERY_ATTR_USAGE);
        assert_eq!(parse_err(quote! { struct A { #[query(a)] a: u32 } }), QUERY_ATTR_USAGE);
        assert_eq!(
            parse_err(quote! { #[query("x")] struct A { a: u32 } }),
            "#[query] belongs on fields, not on the record itself"
        );
    }

    #[test]
    fn compile_error_output() {
        let err = PRecord::parse(quote! { enum E {} }).unwrap_err();
        assert_eq!(
            err.to_compile_error().to_string(),
            quote! { ::core::compile_error!("#[derive(Query)] only supports structs"); }.to_string()
        );
    }
}
