//! Bridges the layout model to C declarations: turns a [`BpfType`] into the
//! [`Statement`] that declares it in generated eBPF source.
//!
//! Only named aggregate types produce a declaration. Scalars and strings map
//! onto builtin C spellings, and references from one aggregate to another use
//! `struct`/`union`/`enum` tag references, so each declaration stands alone
//! as long as its dependencies were emitted earlier.


use crate::layout::BpfType;
use bpfgen_cast::{Declarator, Enumerator, Expr, Statement, StructMember, Variable};
use tracing::debug;

/// The declaration statement for a struct, union, enum, or typedef. Returns
/// `None` for types that need no declaration of their own.
pub fn type_declaration(ty: &BpfType) -> Option<Statement> {
    let statement = match ty {
        BpfType::Struct(st) => {
            debug!(type_name = st.name(), "emitting struct declaration");
            Declarator::Struct {
                name: Some(Variable::new(st.name())),
                members: st
                    .members()
                    .iter()
                    .map(|m| StructMember::new(member_declarator(&m.ty), Variable::new(&m.name)))
                    .collect(),
            }
            .into_statement()
        }
        BpfType::Union(un) => {
            debug!(type_name = un.name(), "emitting union declaration");
            Declarator::Union {
                name: Some(Variable::new(un.name())),
                members: un
                    .members()
                    .iter()
                    .map(|m| StructMember::new(member_declarator(&m.ty), Variable::new(&m.name)))
                    .collect(),
            }
            .into_statement()
        }
        BpfType::Enum(en) => {
            debug!(type_name = en.name(), "emitting enum declaration");
            Declarator::Enum {
                name: Some(Variable::new(en.name())),
                enumerators: en
                    .enumerators()
                    .iter()
                    .map(|(name, value)| Enumerator::new(name, *value))
                    .collect(),
            }
            .into_statement()
        }
        BpfType::Typedef(td) => Statement::Typedef {
            decl: member_declarator(td.inner()),
            name: Variable::new(td.name()),
        },
        BpfType::Int(_) | BpfType::Str(_) | BpfType::Array(_) => return None,
    };
    Some(statement)
}

/// The declarator used when a type appears as a member or typedef target.
fn member_declarator(ty: &BpfType) -> Declarator {
    match ty {
        BpfType::Int(int) => Declarator::identifier(int.name()),
        BpfType::Str(s) => Declarator::array(
            Declarator::identifier("char"),
            Some(Expr::uconst(s.capacity() as u64)),
        ),
        BpfType::Array(arr) => Declarator::array(
            member_declarator(arr.elem()),
            Some(Expr::uconst(arr.len() as u64)),
        ),
        BpfType::Struct(st) => Declarator::struct_ref(st.name()),
        BpfType::Union(un) => Declarator::union_ref(un.name()),
        BpfType::Enum(en) => Declarator::enum_ref(en.name()),
        BpfType::Typedef(td) => Declarator::identifier(td.name()),
    }
}
