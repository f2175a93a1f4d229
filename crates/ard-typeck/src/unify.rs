//! Unification for generic type variables.
//!
//! A `$T` binds to the first concrete type it meets; every later use must
//! match that binding. That rule is exactly union-find with equality values,
//! so the table is `ena`'s `InPlaceUnificationTable`. There is no
//! generalization or let-polymorphism: a signature's variables are local to
//! it and instantiated fresh at every call site.

use ena::unify::InPlaceUnificationTable;
use rustc_hash::FxHashMap;

use crate::ty::{FnParam, FunctionType, Type, TypeVar};

impl ena::unify::UnifyKey for TypeVar {
    type Value = Option<Type>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TypeVar(u)
    }

    fn tag() -> &'static str {
        "TypeVar"
    }
}

impl ena::unify::EqUnifyValue for Type {}

/// The checker's unification state.
pub struct Unifier {
    table: InPlaceUnificationTable<TypeVar>,
}

impl Unifier {
    pub fn new() -> Self {
        Unifier { table: InPlaceUnificationTable::new() }
    }

    /// Create a fresh, unbound variable with a display name.
    pub fn fresh(&mut self, name: &str) -> Type {
        let var = self.table.new_key(None);
        Type::Var { name: name.to_string(), var }
    }

    /// Unify two types.
    ///
    /// Either side may contain variables; a variable binds to whatever it is
    /// unified with, and a bound variable behaves as its binding. `Dynamic`
    /// unifies with everything (erased decoder data is exempt from
    /// checking). Returns `Err(())` on a structural mismatch; the caller
    /// reports the diagnostic with [`Unifier::resolve`]d operands.
    pub fn unify(&mut self, a: &Type, b: &Type) -> Result<(), ()> {
        match (a, b) {
            (Type::Var { var: va, .. }, Type::Var { var: vb, .. }) => {
                let bound_a = self.table.probe_value(*va);
                let bound_b = self.table.probe_value(*vb);
                match (bound_a, bound_b) {
                    (Some(ta), Some(tb)) => self.unify(&ta, &tb),
                    _ => self.table.unify_var_var(*va, *vb).map_err(|_| ()),
                }
            }
            (Type::Var { var, .. }, other) | (other, Type::Var { var, .. }) => {
                match self.table.probe_value(*var) {
                    Some(bound) => self.unify(&bound, other),
                    None => {
                        let value = self.resolve(other);
                        self.table.unify_var_value(*var, Some(value)).map_err(|_| ())
                    }
                }
            }
            (Type::Dynamic, _) | (_, Type::Dynamic) => Ok(()),
            (Type::List(ea), Type::List(eb)) => self.unify(ea, eb),
            (Type::Maybe(ia), Type::Maybe(ib)) => self.unify(ia, ib),
            (Type::Fiber(ra), Type::Fiber(rb)) => self.unify(ra, rb),
            (Type::Map(ka, va), Type::Map(kb, vb)) => {
                self.unify(ka, kb)?;
                self.unify(va, vb)
            }
            (Type::Result(va, ea), Type::Result(vb, eb)) => {
                self.unify(va, vb)?;
                self.unify(ea, eb)
            }
            (Type::Function(fa), Type::Function(fb)) => {
                if fa.params.len() != fb.params.len()
                    || fa.mutates_receiver != fb.mutates_receiver
                {
                    return Err(());
                }
                for (pa, pb) in fa.params.iter().zip(&fb.params) {
                    if pa.mutable != pb.mutable {
                        return Err(());
                    }
                    self.unify(&pa.ty, &pb.ty)?;
                }
                self.unify(&fa.ret, &fb.ret)
            }
            (left, right) => {
                if left == right {
                    Ok(())
                } else {
                    Err(())
                }
            }
        }
    }

    /// Replace every bound variable in a type with its binding. Unbound
    /// variables stay as they are.
    pub fn resolve(&mut self, ty: &Type) -> Type {
        match ty {
            Type::Var { name, var } => match self.table.probe_value(*var) {
                Some(bound) => self.resolve(&bound),
                None => Type::Var { name: name.clone(), var: self.table.find(*var) },
            },
            Type::List(e) => Type::list(self.resolve(e)),
            Type::Maybe(i) => Type::maybe(self.resolve(i)),
            Type::Fiber(r) => Type::fiber(self.resolve(r)),
            Type::Map(k, v) => {
                let k = self.resolve(k);
                let v = self.resolve(v);
                Type::map(k, v)
            }
            Type::Result(v, e) => {
                let v = self.resolve(v);
                let e = self.resolve(e);
                Type::result(v, e)
            }
            Type::Function(f) => {
                let params = f
                    .params
                    .iter()
                    .map(|p| FnParam {
                        name: p.name.clone(),
                        ty: self.resolve(&p.ty),
                        mutable: p.mutable,
                    })
                    .collect();
                let ret = self.resolve(&f.ret);
                Type::Function(std::rc::Rc::new(FunctionType {
                    type_params: f.type_params.clone(),
                    params,
                    ret,
                    mutates_receiver: f.mutates_receiver,
                }))
            }
            other => other.clone(),
        }
    }

    /// Instantiate a generic signature for one call site.
    ///
    /// Every type parameter maps to a fresh variable -- or to its entry in
    /// `pre_bound` when the caller wrote explicit type arguments. Variables
    /// from two instantiations of the same signature are independent.
    pub fn instantiate(
        &mut self,
        signature: &FunctionType,
        pre_bound: &FxHashMap<String, Type>,
    ) -> FunctionType {
        let mut mapping: FxHashMap<String, Type> = FxHashMap::default();
        for name in &signature.type_params {
            let ty = match pre_bound.get(name) {
                Some(bound) => bound.clone(),
                None => self.fresh(name),
            };
            mapping.insert(name.clone(), ty);
        }
        // Signatures may carry variables that are not listed in
        // type_params (predeclared stdlib generics); they get fresh
        // variables by name as well.
        let params = signature
            .params
            .iter()
            .map(|p| FnParam {
                name: p.name.clone(),
                ty: self.substitute(&p.ty, &mut mapping),
                mutable: p.mutable,
            })
            .collect();
        let ret = self.substitute(&signature.ret, &mut mapping);
        FunctionType {
            type_params: Vec::new(),
            params,
            ret,
            mutates_receiver: signature.mutates_receiver,
        }
    }

    /// Replace named variables per `mapping`, inventing a fresh variable for
    /// any name not yet mapped.
    fn substitute(&mut self, ty: &Type, mapping: &mut FxHashMap<String, Type>) -> Type {
        match ty {
            Type::Var { name, .. } => match mapping.get(name) {
                Some(mapped) => mapped.clone(),
                None => {
                    let fresh = self.fresh(name);
                    mapping.insert(name.clone(), fresh.clone());
                    fresh
                }
            },
            Type::List(e) => Type::list(self.substitute(e, mapping)),
            Type::Maybe(i) => Type::maybe(self.substitute(i, mapping)),
            Type::Fiber(r) => Type::fiber(self.substitute(r, mapping)),
            Type::Map(k, v) => {
                let k = self.substitute(k, mapping);
                let v = self.substitute(v, mapping);
                Type::map(k, v)
            }
            Type::Result(v, e) => {
                let v = self.substitute(v, mapping);
                let e = self.substitute(e, mapping);
                Type::result(v, e)
            }
            Type::Function(f) => {
                let params = f
                    .params
                    .iter()
                    .map(|p| FnParam {
                        name: p.name.clone(),
                        ty: self.substitute(&p.ty, mapping),
                        mutable: p.mutable,
                    })
                    .collect();
                let ret = self.substitute(&f.ret, mapping);
                Type::Function(std::rc::Rc::new(FunctionType {
                    type_params: f.type_params.clone(),
                    params,
                    ret,
                    mutates_receiver: f.mutates_receiver,
                }))
            }
            other => other.clone(),
        }
    }
}

impl Default for Unifier {
    fn default() -> Self {
        Self::new()
    }
}
