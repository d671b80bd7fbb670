//! Token grammar for `#[derive(Query)]` input.
//!
//! Only the pieces that unsynn can match unambiguously live here. Generic
//! parameter lists and field lists are split by hand in `parsed.rs`, since a
//! comma inside `Option<Foo<A, B>>` must not end a field.

use unsynn::*;

keyword! {
    pub KStruct = "struct";
    pub KEnum = "enum";
    pub KUnion = "union";
    pub KPub = "pub";
    pub KQuery = "query";
    pub KKey = "key";
    pub KFlatten = "flatten";
}

operator! {
    pub Equals = "=";
}

unsynn! {
    /// `pub` or `pub(...)`
    pub enum Vis {
        PubIn(Cons<KPub, ParenthesisGroup>),
        Pub(KPub),
    }

    /// An outer attribute: `#[...]`
    pub struct Attribute {
        pub _pound: Pound,
        pub content: BracketGroup,
    }

    /// `struct`, `enum` or `union`
    pub enum AdtKind {
        Struct(KStruct),
        Enum(KEnum),
        Union(KUnion),
    }

    /// Everything up to and including the type name; the generics, where
    /// clause and body are left in `rest`.
    pub struct AdtHead {
        pub attrs: Vec<Attribute>,
        pub vis: Option<Vis>,
        pub kind: AdtKind,
        pub name: Ident,
        pub rest: Vec<TokenTree>,
    }

    /// One `name: Type` entry of a braced struct body
    pub struct NamedField {
        pub attrs: Vec<Attribute>,
        pub vis: Option<Vis>,
        pub name: Ident,
        pub _colon: Colon,
        pub ty: Vec<TokenTree>,
    }

    /// One entry of a tuple struct body
    pub struct TupleField {
        pub attrs: Vec<Attribute>,
        pub vis: Option<Vis>,
        pub ty: Vec<TokenTree>,
    }

    /// The inside of a `#[query ...]` attribute
    pub struct QueryAttr {
        pub _query: KQuery,
        pub args: QueryAttrArgs,
    }

    /// `("key")`, `(key = "key")`, `(flatten)` or `= "key"`
    pub enum QueryAttrArgs {
        List(ParenthesisGroupContaining<Cons<CommaDelimitedVec<QueryArg>, EndOfStream>>),
        Assign(Cons<Equals, LiteralString>),
    }

    pub enum QueryArg {
        Key(Cons<KKey, Cons<Equals, LiteralString>>),
        Flatten(KFlatten),
        Bare(LiteralString),
    }
}
