//! Type representation for the Ard type system.
//!
//! Defines the closed [`Type`] universe: primitives, the container types,
//! nominal types (enums, structs, unions, traits), function types, generic
//! type variables, and the opaque `Fiber` handle. Every variant displays the
//! way it is written in source, supports structural equality, and exposes
//! member lookup through [`Type::property`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::registry::TypeRegistry;

/// A unification key for a generic type variable (`$T`).
///
/// Keys index into the checker's union-find table; the `ena` crate handles
/// the union-find mechanics. Variables bind to the first concrete type they
/// meet and must match that binding forever after.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeVar(pub u32);

/// An Ard type.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Str,
    Int,
    Float,
    Bool,
    Void,
    /// `[T]`
    List(Box<Type>),
    /// `[K:V]`
    Map(Box<Type>, Box<Type>),
    /// `T?`
    Maybe(Box<Type>),
    /// `V!E`
    Result(Box<Type>, Box<Type>),
    Enum(Rc<EnumType>),
    Struct(Rc<StructType>),
    Function(Rc<FunctionType>),
    Union(Rc<UnionType>),
    Trait(Rc<TraitType>),
    /// A generic type variable, e.g. `$T`. The name is for display; the key
    /// indexes the unification table.
    Var { name: String, var: TypeVar },
    /// Erased type for data arriving from external decoders. Compatible with
    /// anything; the checker never infers it on its own.
    Dynamic,
    /// A join-able fiber handle carrying the wrapped function's return type.
    Fiber(Box<Type>),
}

impl Eq for Type {}

/// An enum definition: a name and its ordered variants.
#[derive(Debug)]
pub struct EnumType {
    pub name: String,
    pub variants: Vec<String>,
    pub public: bool,
}

impl EnumType {
    /// The ordered index of a variant, if it exists.
    pub fn variant_index(&self, name: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == name)
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.variants == other.variants
    }
}

/// A struct definition.
///
/// Fields are filled in exactly once, after every top-level type name is
/// known, so self-referential fields (`struct Node { next: Node? }`) resolve.
/// Instance methods are not stored here; they live in the module's
/// [`TypeRegistry`] and are attached by the impl pass.
#[derive(Debug)]
pub struct StructType {
    pub name: String,
    pub public: bool,
    pub fields: RefCell<Vec<StructField>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
}

impl StructType {
    pub fn field(&self, name: &str) -> Option<StructField> {
        self.fields.borrow().iter().find(|f| f.name == name).cloned()
    }
}

impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        // Struct types are nominal: one definition per name per module.
        self.name == other.name
    }
}

/// A function signature.
#[derive(Debug)]
pub struct FunctionType {
    /// Generic parameter names (`$`-prefixed), in declaration order. Type
    /// variables in the signature are local to it; every call site
    /// instantiates them fresh.
    pub type_params: Vec<String>,
    pub params: Vec<FnParam>,
    pub ret: Type,
    /// Whether calling this function mutates its receiver. Only meaningful
    /// for methods and mutating built-in members (`push`, `set`, `drop`).
    pub mutates_receiver: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FnParam {
    pub name: String,
    pub ty: Type,
    pub mutable: bool,
}

impl FunctionType {
    /// A plain signature: no generics, no receiver mutation.
    pub fn simple(params: Vec<(&str, Type)>, ret: Type) -> Self {
        FunctionType {
            type_params: Vec::new(),
            params: params
                .into_iter()
                .map(|(name, ty)| FnParam { name: name.into(), ty, mutable: false })
                .collect(),
            ret,
            mutates_receiver: false,
        }
    }

    /// Like [`FunctionType::simple`] but marked as mutating its receiver.
    pub fn mutating(params: Vec<(&str, Type)>, ret: Type) -> Self {
        FunctionType { mutates_receiver: true, ..Self::simple(params, ret) }
    }
}

impl PartialEq for FunctionType {
    fn eq(&self, other: &Self) -> bool {
        // Parameter names do not participate in signature equality.
        self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty && a.mutable == b.mutable)
            && self.ret == other.ret
            && self.mutates_receiver == other.mutates_receiver
    }
}

/// A named sum of otherwise-unrelated types, matched by member type.
#[derive(Debug)]
pub struct UnionType {
    pub name: String,
    pub members: RefCell<Vec<Type>>,
}

impl PartialEq for UnionType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A trait: a named set of required method signatures. Conformance is
/// structural, by method presence.
#[derive(Debug)]
pub struct TraitType {
    pub name: String,
    pub methods: RefCell<Vec<TraitMethodSig>>,
}

#[derive(Clone, Debug)]
pub struct TraitMethodSig {
    pub name: String,
    pub signature: Rc<FunctionType>,
}

impl PartialEq for TraitType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

// ── Constructors ───────────────────────────────────────────────────────

impl Type {
    pub fn list(element: Type) -> Type {
        Type::List(Box::new(element))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn maybe(inner: Type) -> Type {
        Type::Maybe(Box::new(inner))
    }

    pub fn result(value: Type, error: Type) -> Type {
        Type::Result(Box::new(value), Box::new(error))
    }

    pub fn function(f: FunctionType) -> Type {
        Type::Function(Rc::new(f))
    }

    pub fn fiber(ret: Type) -> Type {
        Type::Fiber(Box::new(ret))
    }

    /// A detached type variable for predeclared generic signatures. The key
    /// is local to the signature and remapped at every instantiation.
    pub fn var(name: &str, key: u32) -> Type {
        Type::Var { name: name.to_string(), var: TypeVar(key) }
    }

    /// Structural equality. Exposed under the contract name; identical to
    /// `==`. Generic variables compare by key -- unification-aware
    /// comparison goes through [`crate::unify::Unifier`].
    pub fn equal(&self, other: &Type) -> bool {
        self == other
    }

    /// Whether this type (or one nested in it) is an unresolved variable.
    pub fn contains_var(&self) -> bool {
        match self {
            Type::Var { .. } => true,
            Type::List(t) | Type::Maybe(t) | Type::Fiber(t) => t.contains_var(),
            Type::Map(k, v) | Type::Result(k, v) => k.contains_var() || v.contains_var(),
            Type::Function(f) => {
                f.params.iter().any(|p| p.ty.contains_var()) || f.ret.contains_var()
            }
            _ => false,
        }
    }

    // ── Member lookup ──────────────────────────────────────────────────

    /// Look up a member for `subject.name` syntax.
    ///
    /// Returns the member's type: a plain property (`Str.size: Int`) or a
    /// function property (`Int.to_str: fn() Str`). Struct fields win over
    /// methods; methods come from the registry's impl tables. `None` means
    /// the checker reports an `Undefined` diagnostic.
    pub fn property(&self, name: &str, registry: &TypeRegistry) -> Option<Type> {
        match self {
            Type::Str => match name {
                "size" => Some(Type::Int),
                "contains" | "starts_with" | "ends_with" => Some(Type::function(
                    FunctionType::simple(vec![("other", Type::Str)], Type::Bool),
                )),
                "split" => Some(Type::function(FunctionType::simple(
                    vec![("separator", Type::Str)],
                    Type::list(Type::Str),
                ))),
                "trim" | "to_upper" | "to_lower" => {
                    Some(Type::function(FunctionType::simple(vec![], Type::Str)))
                }
                "to_str" => Some(Type::function(FunctionType::simple(vec![], Type::Str))),
                _ => None,
            },
            Type::Int => match name {
                "to_str" => Some(Type::function(FunctionType::simple(vec![], Type::Str))),
                "to_float" => Some(Type::function(FunctionType::simple(vec![], Type::Float))),
                "abs" => Some(Type::function(FunctionType::simple(vec![], Type::Int))),
                _ => None,
            },
            Type::Float => match name {
                "to_str" => Some(Type::function(FunctionType::simple(vec![], Type::Str))),
                "round" | "floor" | "ceil" => {
                    Some(Type::function(FunctionType::simple(vec![], Type::Int)))
                }
                _ => None,
            },
            Type::Bool => match name {
                "to_str" => Some(Type::function(FunctionType::simple(vec![], Type::Str))),
                _ => None,
            },
            Type::List(element) => {
                let t = element.as_ref().clone();
                match name {
                    "size" => Some(Type::Int),
                    "push" => Some(Type::function(FunctionType::mutating(
                        vec![("value", t)],
                        Type::Void,
                    ))),
                    "pop" => Some(Type::function(FunctionType::mutating(
                        vec![],
                        Type::maybe(t),
                    ))),
                    "at" => Some(Type::function(FunctionType::simple(
                        vec![("index", Type::Int)],
                        Type::maybe(t),
                    ))),
                    "set" => Some(Type::function(FunctionType::mutating(
                        vec![("index", Type::Int), ("value", t)],
                        Type::Void,
                    ))),
                    "contains" => Some(Type::function(FunctionType::simple(
                        vec![("value", t)],
                        Type::Bool,
                    ))),
                    "map" => {
                        let out = Type::var("$Out", 0);
                        Some(Type::Function(Rc::new(FunctionType {
                            type_params: vec!["$Out".into()],
                            params: vec![FnParam {
                                name: "transform".into(),
                                ty: Type::function(FunctionType::simple(
                                    vec![("value", t)],
                                    out.clone(),
                                )),
                                mutable: false,
                            }],
                            ret: Type::list(out),
                            mutates_receiver: false,
                        })))
                    }
                    "keep" => Some(Type::function(FunctionType::simple(
                        vec![(
                            "predicate",
                            Type::function(FunctionType::simple(
                                vec![("value", t.clone())],
                                Type::Bool,
                            )),
                        )],
                        Type::list(t),
                    ))),
                    "find" => Some(Type::function(FunctionType::simple(
                        vec![(
                            "predicate",
                            Type::function(FunctionType::simple(
                                vec![("value", t.clone())],
                                Type::Bool,
                            )),
                        )],
                        Type::maybe(t),
                    ))),
                    _ => None,
                }
            }
            Type::Map(key, value) => {
                let k = key.as_ref().clone();
                let v = value.as_ref().clone();
                match name {
                    "size" => Some(Type::Int),
                    "get" => Some(Type::function(FunctionType::simple(
                        vec![("key", k)],
                        Type::maybe(v),
                    ))),
                    "set" => Some(Type::function(FunctionType::mutating(
                        vec![("key", k), ("value", v)],
                        Type::Void,
                    ))),
                    "drop" => Some(Type::function(FunctionType::mutating(
                        vec![("key", k)],
                        Type::Void,
                    ))),
                    "has" => Some(Type::function(FunctionType::simple(
                        vec![("key", k)],
                        Type::Bool,
                    ))),
                    "keys" => Some(Type::function(FunctionType::simple(vec![], Type::list(k)))),
                    "values" => Some(Type::function(FunctionType::simple(vec![], Type::list(v)))),
                    _ => None,
                }
            }
            Type::Maybe(inner) => {
                let t = inner.as_ref().clone();
                match name {
                    "or" => Some(Type::function(FunctionType::simple(
                        vec![("default", t.clone())],
                        t,
                    ))),
                    "is_some" | "is_none" => {
                        Some(Type::function(FunctionType::simple(vec![], Type::Bool)))
                    }
                    _ => None,
                }
            }
            Type::Result(value, _) => {
                let v = value.as_ref().clone();
                match name {
                    "or" => Some(Type::function(FunctionType::simple(
                        vec![("default", v.clone())],
                        v,
                    ))),
                    "expect" => Some(Type::function(FunctionType::simple(
                        vec![("message", Type::Str)],
                        v,
                    ))),
                    "is_ok" | "is_err" => {
                        Some(Type::function(FunctionType::simple(vec![], Type::Bool)))
                    }
                    _ => None,
                }
            }
            Type::Struct(s) => {
                if let Some(field) = s.field(name) {
                    return Some(field.ty);
                }
                registry
                    .method(&s.name, name)
                    .map(|m| Type::Function(m.signature))
            }
            Type::Fiber(ret) => match name {
                "join" => Some(Type::function(FunctionType::simple(
                    vec![],
                    ret.as_ref().clone(),
                ))),
                _ => None,
            },
            _ => None,
        }
    }

    /// Trait-membership query. Conformance is structural: a struct has a
    /// trait when every required method is present with an equal signature;
    /// a union has a trait when every member does.
    pub fn has_trait(&self, tr: &TraitType, registry: &TypeRegistry) -> bool {
        match self {
            Type::Union(u) => u
                .members
                .borrow()
                .iter()
                .all(|member| member.has_trait(tr, registry)),
            _ => tr.methods.borrow().iter().all(|required| {
                match self.property(&required.name, registry) {
                    Some(Type::Function(found)) => *found == *required.signature,
                    _ => false,
                }
            }),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Str => write!(f, "Str"),
            Type::Int => write!(f, "Int"),
            Type::Float => write!(f, "Float"),
            Type::Bool => write!(f, "Bool"),
            Type::Void => write!(f, "Void"),
            Type::List(t) => write!(f, "[{t}]"),
            Type::Map(k, v) => write!(f, "[{k}:{v}]"),
            Type::Maybe(t) => write!(f, "{t}?"),
            Type::Result(v, e) => write!(f, "{v}!{e}"),
            Type::Enum(e) => write!(f, "{}", e.name),
            Type::Struct(s) => write!(f, "{}", s.name),
            Type::Union(u) => write!(f, "{}", u.name),
            Type::Trait(t) => write!(f, "{}", t.name),
            Type::Function(func) => {
                write!(f, "fn(")?;
                for (i, p) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p.ty)?;
                }
                write!(f, ")")?;
                if func.ret != Type::Void {
                    write!(f, " {}", func.ret)?;
                }
                Ok(())
            }
            Type::Var { name, .. } => write!(f, "{name}"),
            Type::Dynamic => write!(f, "Dynamic"),
            Type::Fiber(_) => write!(f, "Fiber"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_source_syntax() {
        assert_eq!(Type::list(Type::Int).to_string(), "[Int]");
        assert_eq!(Type::map(Type::Str, Type::Int).to_string(), "[Str:Int]");
        assert_eq!(Type::maybe(Type::Str).to_string(), "Str?");
        assert_eq!(Type::result(Type::Int, Type::Str).to_string(), "Int!Str");
        assert_eq!(Type::var("$T", 0).to_string(), "$T");
        assert_eq!(
            Type::function(FunctionType::simple(vec![("a", Type::Int)], Type::Str)).to_string(),
            "fn(Int) Str"
        );
        assert_eq!(
            Type::function(FunctionType::simple(vec![], Type::Void)).to_string(),
            "fn()"
        );
    }

    #[test]
    fn maybe_is_not_its_inner_type() {
        assert_ne!(Type::maybe(Type::Int), Type::Int);
    }

    #[test]
    fn result_equality_needs_both_sides() {
        assert_eq!(
            Type::result(Type::Int, Type::Str),
            Type::result(Type::Int, Type::Str)
        );
        assert_ne!(
            Type::result(Type::Int, Type::Str),
            Type::result(Type::Int, Type::Int)
        );
    }

    #[test]
    fn function_equality_ignores_param_names() {
        let a = FunctionType::simple(vec![("a", Type::Int)], Type::Str);
        let b = FunctionType::simple(vec![("b", Type::Int)], Type::Str);
        assert_eq!(a, b);
        let c = FunctionType::mutating(vec![("a", Type::Int)], Type::Str);
        assert_ne!(a, c);
    }

    #[test]
    fn str_size_is_a_plain_property() {
        let registry = TypeRegistry::new();
        assert_eq!(Type::Str.property("size", &registry), Some(Type::Int));
        assert_eq!(Type::Str.property("length", &registry), None);
    }

    #[test]
    fn list_members_are_typed_by_element() {
        let registry = TypeRegistry::new();
        let list = Type::list(Type::Int);
        match list.property("at", &registry) {
            Some(Type::Function(f)) => {
                assert_eq!(f.params[0].ty, Type::Int);
                assert_eq!(f.ret, Type::maybe(Type::Int));
            }
            other => panic!("expected function property, got {other:?}"),
        }
        match list.property("push", &registry) {
            Some(Type::Function(f)) => assert!(f.mutates_receiver),
            other => panic!("expected function property, got {other:?}"),
        }
    }

    #[test]
    fn maybe_or_returns_inner_type() {
        let registry = TypeRegistry::new();
        match Type::maybe(Type::Str).property("or", &registry) {
            Some(Type::Function(f)) => {
                assert_eq!(f.params[0].ty, Type::Str);
                assert_eq!(f.ret, Type::Str);
            }
            other => panic!("expected function property, got {other:?}"),
        }
    }
}
