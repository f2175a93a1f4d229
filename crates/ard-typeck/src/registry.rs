//! Per-module type registry.
//!
//! Assigns a monotonically increasing [`TypeId`] handle to every type the
//! checker produces, so hot-path comparisons of the five primitives are a
//! single handle equality instead of a structural walk. The registry is also
//! the home of everything attached to a struct after its definition: instance
//! methods (the impl pass), trait memberships, and static functions.
//!
//! Registration is deliberately permissive: equal-by-structure types may
//! receive distinct handles, and comparison falls back to structural
//! equality. All registration goes through [`TypeRegistry::intern`].

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ty::{FunctionType, Type};

/// An opaque handle into a [`TypeRegistry`]. Handle 0 is reserved invalid.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

impl TypeId {
    /// The reserved invalid handle.
    pub const INVALID: TypeId = TypeId(0);
}

/// An instance method registered on a struct by an impl block.
#[derive(Clone, Debug)]
pub struct Method {
    pub name: String,
    /// The signature; `mutates_receiver` records whether the impl block (or
    /// the method itself) was marked `mut`.
    pub signature: Rc<FunctionType>,
}

/// The per-module type table.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// All registered types; slot `i` holds the type with handle `i + 1`.
    types: Vec<Type>,
    int_id: TypeId,
    float_id: TypeId,
    str_id: TypeId,
    bool_id: TypeId,
    void_id: TypeId,
    /// Instance methods, keyed by struct name.
    methods: FxHashMap<String, Vec<Method>>,
    /// Trait names recorded for a struct, keyed by struct name.
    traits: FxHashMap<String, Vec<String>>,
    /// Static associated functions, keyed by type name then function name.
    statics: FxHashMap<String, FxHashMap<String, Rc<FunctionType>>>,
}

impl TypeRegistry {
    /// Create a registry with the canonical primitive handles pre-assigned.
    pub fn new() -> Self {
        let mut registry = TypeRegistry::default();
        registry.int_id = registry.push(Type::Int);
        registry.float_id = registry.push(Type::Float);
        registry.str_id = registry.push(Type::Str);
        registry.bool_id = registry.push(Type::Bool);
        registry.void_id = registry.push(Type::Void);
        registry
    }

    fn push(&mut self, ty: Type) -> TypeId {
        self.types.push(ty);
        TypeId(self.types.len() as u32)
    }

    /// Register a type and return its handle.
    ///
    /// Primitives always map to their canonical cached handle; everything
    /// else receives a fresh handle per call.
    pub fn intern(&mut self, ty: &Type) -> TypeId {
        match ty {
            Type::Int => self.int_id,
            Type::Float => self.float_id,
            Type::Str => self.str_id,
            Type::Bool => self.bool_id,
            Type::Void => self.void_id,
            other => self.push(other.clone()),
        }
    }

    /// Look a handle back up. Returns `None` for [`TypeId::INVALID`] and
    /// out-of-range handles.
    pub fn lookup(&self, id: TypeId) -> Option<&Type> {
        if id.0 == 0 {
            return None;
        }
        self.types.get(id.0 as usize - 1)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn int(&self) -> TypeId {
        self.int_id
    }

    pub fn float(&self) -> TypeId {
        self.float_id
    }

    pub fn str_(&self) -> TypeId {
        self.str_id
    }

    pub fn bool_(&self) -> TypeId {
        self.bool_id
    }

    pub fn void(&self) -> TypeId {
        self.void_id
    }

    // ── Impl tables ────────────────────────────────────────────────────

    /// Attach an instance method to a struct. Returns `false` when a method
    /// of the same name is already registered.
    pub fn add_method(&mut self, struct_name: &str, method: Method) -> bool {
        let methods = self.methods.entry(struct_name.to_string()).or_default();
        if methods.iter().any(|m| m.name == method.name) {
            return false;
        }
        methods.push(method);
        true
    }

    /// Look up an instance method on a struct.
    pub fn method(&self, struct_name: &str, name: &str) -> Option<Method> {
        self.methods
            .get(struct_name)?
            .iter()
            .find(|m| m.name == name)
            .cloned()
    }

    /// All methods registered for a struct, in registration order.
    pub fn methods_of(&self, struct_name: &str) -> &[Method] {
        self.methods.get(struct_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Record that a struct carries a trait.
    pub fn add_trait(&mut self, struct_name: &str, trait_name: &str) {
        let traits = self.traits.entry(struct_name.to_string()).or_default();
        if !traits.iter().any(|t| t == trait_name) {
            traits.push(trait_name.to_string());
        }
    }

    pub fn traits_of(&self, struct_name: &str) -> &[String] {
        self.traits.get(struct_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Register a static associated function on a type name.
    pub fn add_static(&mut self, type_name: &str, fn_name: &str, signature: Rc<FunctionType>) {
        self.statics
            .entry(type_name.to_string())
            .or_default()
            .insert(fn_name.to_string(), signature);
    }

    pub fn static_fn(&self, type_name: &str, fn_name: &str) -> Option<Rc<FunctionType>> {
        self.statics.get(type_name)?.get(fn_name).cloned()
    }

    /// Merge another registry's impl tables into this one. Used when an
    /// import brings a module's structs into scope: their methods, traits,
    /// and statics must travel with them. Existing entries win.
    pub fn absorb(&mut self, other: &TypeRegistry) {
        for (struct_name, methods) in &other.methods {
            for method in methods {
                self.add_method(struct_name, method.clone());
            }
        }
        for (struct_name, traits) in &other.traits {
            for trait_name in traits {
                self.add_trait(struct_name, trait_name);
            }
        }
        for (type_name, statics) in &other.statics {
            for (fn_name, signature) in statics {
                self.statics
                    .entry(type_name.clone())
                    .or_default()
                    .entry(fn_name.clone())
                    .or_insert_with(|| signature.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_handles_are_canonical() {
        let mut registry = TypeRegistry::new();
        let a = registry.intern(&Type::Int);
        let b = registry.intern(&Type::Int);
        assert_eq!(a, b);
        assert_eq!(registry.int(), a);
        assert_ne!(registry.int(), registry.float());
    }

    #[test]
    fn zero_is_invalid() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.lookup(TypeId::INVALID), None);
        assert!(TypeId::INVALID.0 == 0);
    }

    #[test]
    fn lookup_round_trips() {
        let mut registry = TypeRegistry::new();
        let ty = Type::list(Type::Str);
        let id = registry.intern(&ty);
        assert_eq!(registry.lookup(id), Some(&ty));
    }

    #[test]
    fn structurally_equal_types_may_get_distinct_handles() {
        let mut registry = TypeRegistry::new();
        let a = registry.intern(&Type::list(Type::Int));
        let b = registry.intern(&Type::list(Type::Int));
        assert_ne!(a, b);
        // Comparison falls back to structural equality.
        assert_eq!(registry.lookup(a), registry.lookup(b));
    }

    #[test]
    fn methods_attach_post_hoc() {
        let mut registry = TypeRegistry::new();
        let sig = Rc::new(FunctionType::simple(vec![], Type::Int));
        assert!(registry.add_method("Point", Method { name: "norm".into(), signature: sig.clone() }));
        assert!(!registry.add_method("Point", Method { name: "norm".into(), signature: sig }));
        assert!(registry.method("Point", "norm").is_some());
        assert!(registry.method("Point", "other").is_none());
    }

    #[test]
    fn absorb_merges_impl_tables() {
        let mut a = TypeRegistry::new();
        let mut b = TypeRegistry::new();
        let sig = Rc::new(FunctionType::simple(vec![], Type::Void));
        b.add_method("Database", Method { name: "close".into(), signature: sig });
        b.add_trait("Database", "Closeable");
        a.absorb(&b);
        assert!(a.method("Database", "close").is_some());
        assert_eq!(a.traits_of("Database"), ["Closeable".to_string()]);
    }
}
