use proc_macro2::TokenStream;
use quote::{quote, quote_spanned};

use crate::parsed::{FieldRole, PRecord, angle_list};

/// Generate the `Record` impl for a parsed record.
pub fn emit_record(record: &PRecord) -> TokenStream {
    let name = &record.name;
    let impl_generics = angle_list(record.generics.iter().map(|g| g.decl.clone()));
    let type_args = angle_list(record.generics.iter().map(|g| g.arg.clone()));

    let mut populate_calls = Vec::new();
    let mut wants = Vec::new();
    let mut describe = Vec::new();
    let mut bounds = Vec::new();

    for field in &record.fields {
        let Some(role) = &field.role else { continue };
        let member = &field.member;
        let ty = &field.ty;
        let span = field.ty_span;

        match role {
            FieldRole::Leaf { key } => {
                let field_name = member.to_string();
                let populate_field = quote_spanned! { span => ::querer::populate_field };
                populate_calls.push(quote! {
                    #populate_field(&mut self.#member, #key, query)?;
                });
                wants.push(quote! { query.supplied(#key).is_some() });
                describe.push(quote! {
                    fields.push(::querer::FieldInfo::new::<#ty>(#key, #field_name));
                });
                bounds.push(quote! { #ty: ::querer::Scalar });
            }
            FieldRole::Flatten => {
                let populate = quote_spanned! { span => ::querer::Record::populate };
                populate_calls.push(quote! {
                    #populate(&mut self.#member, query)?;
                });
                wants.push(quote! { <#ty as ::querer::Record>::wants(query) });
                describe.push(quote! {
                    <#ty as ::querer::Record>::describe(fields);
                });
                bounds.push(quote! { #ty: ::querer::Record });
            }
        }
    }

    let mut predicates: Vec<TokenStream> = record.where_predicates.iter().cloned().collect();
    if record.has_type_params() {
        predicates.extend(bounds);
    }
    let where_clause = if predicates.is_empty() {
        TokenStream::new()
    } else {
        quote! { where #(#predicates),* }
    };

    quote! {
        #[automatically_derived]
        impl #impl_generics ::querer::Record for #name #type_args #where_clause {
            #[allow(unused_variables)]
            fn populate(&mut self, query: &::querer::QueryValues) -> ::core::result::Result<(), ::querer::QueryError> {
                #(#populate_calls)*
                ::core::result::Result::Ok(())
            }

            #[allow(unused_variables)]
            fn wants(query: &::querer::QueryValues) -> bool {
                false #(|| #wants)*
            }

            #[allow(unused_variables)]
            fn describe(fields: &mut ::std::vec::Vec<::querer::FieldInfo>) {
                #(#describe)*
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(input: TokenStream) -> String {
        emit_record(&PRecord::parse(input).unwrap()).to_string()
    }

    #[test]
    fn leaf_and_flatten_fields() {
        let out = emit(quote! {
            struct Listing {
                #[query("limit")]
                limit: u32,
                #[query(flatten)]
                filter: Option<Box<Filter>>,
                skipped: u8,
            }
        });

        let expected = quote! {
            #[automatically_derived]
            impl ::querer::Record for Listing {
                #[allow(unused_variables)]
                fn populate(&mut self, query: &::querer::QueryValues) -> ::core::result::Result<(), ::querer::QueryError> {
                    ::querer::populate_field(&mut self.limit, "limit", query)?;
                    ::querer::Record::populate(&mut self.filter, query)?;
                    ::core::result::Result::Ok(())
                }

                #[allow(unused_variables)]
                fn wants(query: &::querer::QueryValues) -> bool {
                    false
                        || query.supplied("limit").is_some()
                        || <Option<Box<Filter>> as ::querer::Record>::wants(query)
                }

                #[allow(unused_variables)]
                fn describe(fields: &mut ::std::vec::Vec<::querer::FieldInfo>) {
                    fields.push(::querer::FieldInfo::new::<u32>("limit", "limit"));
                    <Option<Box<Filter>> as ::querer::Record>::describe(fields);
                }
            }
        };
        assert_eq!(out, expected.to_string());
    }

    #[test]
    fn tuple_members_are_unsuffixed() {
        let out = emit(quote! { struct Pair(#[query("a")] i64); });
        assert!(out.contains("& mut self . 0 , \"a\""), "{out}");
        assert!(out.contains("FieldInfo :: new :: < i64 > (\"a\" , \"0\")"), "{out}");
    }

    #[test]
    fn generic_records_bound_their_field_types() {
        let out = emit(quote! {
            struct Page<T = u32, P> where P: Default {
                #[query("n")]
                n: T,
                #[query(flatten)]
                inner: P,
            }
        });
        let header = quote! {
            impl<T, P> ::querer::Record for Page<T, P>
            where P: Default, T: ::querer::Scalar, P: ::querer::Record
        };
        assert!(out.starts_with(&format!("# [automatically_derived] {header}")), "{out}");
    }

    #[test]
    fn concrete_records_get_no_extra_bounds() {
        let out = emit(quote! { struct Flags { #[query("on")] on: bool } });
        assert!(!out.contains("where"), "{out}");
    }

    #[test]
    fn lifetime_only_records_get_no_extra_bounds() {
        let out = emit(quote! {
            struct Borrowed<'a> {
                #[query("on")]
                on: bool,
                name: &'a str,
            }
        });
        let header = quote! { impl<'a> ::querer::Record for Borrowed<'a> };
        assert!(out.starts_with(&format!("# [automatically_derived] {header} {{")), "{out}");
    }
}
