//! Whole-graph validation run by `AppDefBuilder::build`
//!
//! Phases, each collecting into one `ValidationErrors`:
//! 1. inheritance: ancestors exist and match kind, graphs are acyclic,
//!    inherited fields / containers / uniques are copied into descendants
//! 2. constraint resolution for data types and fields
//! 3. per-type closure checks in name order

use std::collections::{BTreeMap, BTreeSet, HashMap};

use appstruct_core::{QName, QNAME_ANY};

use crate::constraint::{Constraint, ConstraintKind};
use crate::error::{ErrorKind, ValidationErrors};
use crate::function::{Command, Query};
use crate::projector::{Projector, ProjectorEventKind};
use crate::structure::Structure;
use crate::type_kind::TypeKind;
use crate::types::Type;
use crate::view::View;
use crate::workspace::Workspace;

type Types = BTreeMap<QName, Type>;

pub(crate) fn validate(types: &mut Types) -> ValidationErrors {
    let mut errs = ValidationErrors::default();

    let cyclic = check_inheritance(types, &mut errs);
    materialize_structures(types, &cyclic, &mut errs);
    resolve_constraints(types);
    default_projector_kinds(types);

    for t in types.values() {
        match t {
            Type::Structure(s) => validate_structure(types, s, &mut errs),
            Type::Command(c) => validate_command(types, c, &mut errs),
            Type::Query(q) => validate_query(types, q, &mut errs),
            Type::Projector(p) => validate_projector(types, p, &mut errs),
            Type::View(v) => validate_view(v, &mut errs),
            Type::Workspace(w) => validate_workspace(types, w, &mut errs),
            Type::Data(_) | Type::Role(_) | Type::Tag(_) => {}
        }
    }
    errs.sort();
    errs
}

fn ancestors_of(t: &Type) -> Vec<QName> {
    match t {
        Type::Structure(s) if !s.ancestor.is_null() => vec![s.ancestor.clone()],
        Type::Workspace(w) => w.ancestors.clone(),
        _ => Vec::new(),
    }
}

/// Check ancestor references and report cycles. Returns names on cycles.
fn check_inheritance(types: &Types, errs: &mut ValidationErrors) -> BTreeSet<QName> {
    let mut graph: BTreeMap<QName, Vec<QName>> = BTreeMap::new();
    for t in types.values() {
        let ancestors = ancestors_of(t);
        if ancestors.is_empty() {
            continue;
        }
        for a in &ancestors {
            match (t, types.get(a)) {
                (_, None) => errs.add(
                    ErrorKind::NameNotFound,
                    format!("{} ancestor «{}» not found", t, a),
                ),
                (Type::Structure(s), Some(Type::Structure(anc))) if s.kind() == anc.kind() => {}
                (Type::Workspace(_), Some(Type::Workspace(_))) => {}
                (_, Some(other)) => errs.add(
                    ErrorKind::InvalidTypeKind,
                    format!("{} can not inherit from {}", t, other),
                ),
            }
        }
        graph.insert(t.name().clone(), ancestors);
    }

    let mut on_cycle = BTreeSet::new();
    for cycle in find_cycles(&graph) {
        for (i, node) in cycle.iter().enumerate() {
            if !on_cycle.insert(node.clone()) {
                continue;
            }
            let path: Vec<String> = cycle[i..]
                .iter()
                .chain(cycle[..=i].iter())
                .map(|n| format!("«{}»", n))
                .collect();
            errs.add(
                ErrorKind::CircularReference,
                format!("«{}» inherits from itself: {}", node, path.join(" → ")),
            );
        }
    }
    on_cycle
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first search with a visiting marker. Each cycle is returned once,
/// as the list of its nodes in edge order.
pub(crate) fn find_cycles(graph: &BTreeMap<QName, Vec<QName>>) -> Vec<Vec<QName>> {
    fn visit(
        node: &QName,
        graph: &BTreeMap<QName, Vec<QName>>,
        marks: &mut HashMap<QName, Mark>,
        stack: &mut Vec<QName>,
        cycles: &mut Vec<Vec<QName>>,
    ) {
        match marks.get(node) {
            Some(Mark::Done) => return,
            Some(Mark::Visiting) => {
                if let Some(pos) = stack.iter().position(|n| n == node) {
                    cycles.push(stack[pos..].to_vec());
                }
                return;
            }
            None => {}
        }
        marks.insert(node.clone(), Mark::Visiting);
        stack.push(node.clone());
        if let Some(next) = graph.get(node) {
            for n in next {
                visit(n, graph, marks, stack, cycles);
            }
        }
        stack.pop();
        marks.insert(node.clone(), Mark::Done);
    }

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    let mut cycles = Vec::new();
    for node in graph.keys() {
        visit(node, graph, &mut marks, &mut stack, &mut cycles);
    }
    cycles
}

/// Copy inherited members into descendants, ancestors first.
fn materialize_structures(types: &mut Types, cyclic: &BTreeSet<QName>, errs: &mut ValidationErrors) {
    let mut order = Vec::new();
    let mut seen = BTreeSet::new();
    for name in types.keys() {
        push_ancestors_first(types, name, cyclic, &mut seen, &mut order);
    }

    for name in order {
        let ancestor = match types.get(&name) {
            Some(Type::Structure(s)) if !s.ancestor.is_null() => s.ancestor.clone(),
            _ => continue,
        };
        let anc = match types.get(&ancestor) {
            Some(Type::Structure(a)) => a.clone(),
            _ => continue,
        };
        if let Some(Type::Structure(s)) = types.get_mut(&name) {
            if s.kind() == anc.kind() {
                inherit(s, &anc, errs);
            }
        }
    }
}

fn push_ancestors_first(
    types: &Types,
    name: &QName,
    cyclic: &BTreeSet<QName>,
    seen: &mut BTreeSet<QName>,
    order: &mut Vec<QName>,
) {
    if cyclic.contains(name) || !seen.insert(name.clone()) {
        return;
    }
    if let Some(Type::Structure(s)) = types.get(name) {
        if !s.ancestor.is_null() {
            push_ancestors_first(types, &s.ancestor, cyclic, seen, order);
        }
        order.push(name.clone());
    }
}

fn inherit(s: &mut Structure, anc: &Structure, errs: &mut ValidationErrors) {
    let own_fields: Vec<_> = s.fields.user_fields().cloned().collect();
    let own_containers: Vec<_> = s.containers.iter().cloned().collect();
    let own_uniques: Vec<_> = s.uniques.iter().cloned().collect();

    let mut fields = crate::field::Fields::with_sys(s.kind().system_fields());
    for f in anc.fields.user_fields() {
        fields.push(f.clone());
    }
    for f in own_fields {
        if anc.fields.field(f.name()).is_some() || anc.containers.container(f.name()).is_some() {
            errs.add(
                ErrorKind::Redefinition,
                format!("redefinition of field «{}» in {}, inherited from {}", f.name(), s, anc),
            );
            continue;
        }
        fields.push(f);
    }

    let mut containers = crate::container::Containers::default();
    for c in anc.containers.iter() {
        containers.push(c.clone());
    }
    for c in own_containers {
        if anc.containers.container(c.name()).is_some() || anc.fields.field(c.name()).is_some() {
            errs.add(
                ErrorKind::Redefinition,
                format!("redefinition of container «{}» in {}, inherited from {}", c.name(), s, anc),
            );
            continue;
        }
        containers.push(c);
    }

    let mut uniques = crate::unique::Uniques::default();
    for u in anc.uniques.iter() {
        uniques.push(u.clone());
    }
    for u in own_uniques {
        if anc.uniques.unique(u.name()).is_some() {
            errs.add(
                ErrorKind::Redefinition,
                format!("redefinition of unique «{}» in {}, inherited from {}", u.name(), s, anc),
            );
            continue;
        }
        uniques.push(u);
    }
    let unique_field = s
        .uniques
        .unique_field()
        .or_else(|| anc.uniques.unique_field())
        .map(str::to_string);
    uniques.set_unique_field(unique_field);

    s.fields = fields;
    s.containers = containers;
    s.uniques = uniques;
}

fn resolve_constraints(types: &mut Types) {
    let mut resolved: BTreeMap<QName, BTreeMap<ConstraintKind, Constraint>> = BTreeMap::new();
    for (name, t) in types.iter() {
        if let Type::Data(_) = t {
            resolved.insert(name.clone(), data_chain_constraints(types, name));
        }
    }

    let empty = BTreeMap::new();
    for t in types.values_mut() {
        match t {
            Type::Data(d) => {
                if let Some(r) = resolved.get(d.name()) {
                    d.set_resolved(r.clone());
                }
            }
            Type::Structure(s) => {
                for f in s.fields.iter_mut() {
                    let inherited = resolved.get(f.data()).unwrap_or(&empty);
                    f.resolve(inherited);
                }
            }
            Type::View(v) => {
                for part in [&mut v.partition_key, &mut v.clust_cols, &mut v.value] {
                    for f in part.iter_mut() {
                        let inherited = resolved.get(f.data()).unwrap_or(&empty);
                        f.resolve(inherited);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Constraints of a data type with its ancestors, nearest declaration wins
fn data_chain_constraints(types: &Types, name: &QName) -> BTreeMap<ConstraintKind, Constraint> {
    let mut chain = Vec::new();
    let mut current = name.clone();
    while let Some(Type::Data(d)) = types.get(&current) {
        chain.push(d);
        if d.ancestor().is_null() || chain.len() > types.len() {
            break;
        }
        current = d.ancestor().clone();
    }
    let mut all = BTreeMap::new();
    for d in chain.iter().rev() {
        for (k, c) in d.constraints(false) {
            all.insert(*k, c.clone());
        }
    }
    all
}

fn default_projector_kinds(types: &mut Types) {
    let kinds: HashMap<QName, TypeKind> = types
        .iter()
        .map(|(n, t)| (n.clone(), t.kind()))
        .collect();
    for t in types.values_mut() {
        if let Type::Projector(p) = t {
            for e in p.events.iter_mut() {
                if e.kinds.is_empty() {
                    if let Some(kind) = kinds.get(&e.on) {
                        e.kinds = ProjectorEventKind::defaults_for(*kind).into_iter().collect();
                    }
                }
            }
        }
    }
}

fn validate_structure(types: &Types, s: &Structure, errs: &mut ValidationErrors) {
    for c in s.containers.iter() {
        match types.get(c.qname()) {
            None => errs.add(
                ErrorKind::NameNotFound,
                format!("{} container «{}» has unknown type «{}»", s, c.name(), c.qname()),
            ),
            Some(Type::Structure(target)) => {
                if !s.kind().container_allowed(target.kind()) {
                    errs.add(
                        ErrorKind::InvalidTypeKind,
                        format!(
                            "{} container «{}»: «{}» can not contain «{}»",
                            s,
                            c.name(),
                            s.kind(),
                            target.kind()
                        ),
                    );
                }
                if target.is_abstract() {
                    errs.add(
                        ErrorKind::AbstractType,
                        format!("{} container «{}» type {} is abstract", s, c.name(), target),
                    );
                }
            }
            Some(other) => errs.add(
                ErrorKind::InvalidTypeKind,
                format!(
                    "{} container «{}»: «{}» can not contain «{}»",
                    s,
                    c.name(),
                    s.kind(),
                    other.kind()
                ),
            ),
        }
    }

    for f in s.fields.ref_fields() {
        for r in f.refs() {
            match types.get(r) {
                None => errs.add(
                    ErrorKind::NameNotFound,
                    format!("{} reference field «{}» refers to unknown type «{}»", s, f.name(), r),
                ),
                Some(t) if !t.kind().is_record() => errs.add(
                    ErrorKind::InvalidTypeKind,
                    format!(
                        "{} reference field «{}» refers to not a record type {}",
                        s,
                        f.name(),
                        t
                    ),
                ),
                Some(t) if t.is_abstract() => errs.add(
                    ErrorKind::AbstractType,
                    format!("{} reference field «{}» refers to abstract {}", s, f.name(), t),
                ),
                Some(_) => {}
            }
        }
    }

    let uniques: Vec<_> = s.uniques.iter().collect();
    for (i, u) in uniques.iter().enumerate() {
        for f in u.fields() {
            if s.fields.field(f).is_none() {
                errs.add(
                    ErrorKind::NameNotFound,
                    format!("{} {} field «{}» not found", s, u, f),
                );
            }
        }
        for other in &uniques[i + 1..] {
            if u.overlaps(other) {
                errs.add(
                    ErrorKind::UniqueOverlaps,
                    format!("{} {} overlaps {}", s, u, other),
                );
            }
        }
    }
    if let Some(name) = s.uniques.unique_field() {
        if s.fields.field(name).is_none() {
            errs.add(
                ErrorKind::NameNotFound,
                format!("{} unique field «{}» not found", s, name),
            );
        }
    }
}

/// Check a function parameter or result type
fn check_arg(
    types: &Types,
    owner: &dyn std::fmt::Display,
    what: &str,
    name: &QName,
    allowed: fn(TypeKind) -> bool,
    expected: &str,
    errs: &mut ValidationErrors,
) {
    if name.is_null() || name == &QNAME_ANY {
        return;
    }
    match types.get(name) {
        None => errs.add(
            ErrorKind::NameNotFound,
            format!("{} {} type «{}» not found", owner, what, name),
        ),
        Some(t) if !allowed(t.kind()) => errs.add(
            ErrorKind::InvalidTypeKind,
            format!("{} {} type is {}, must be {}", owner, what, t, expected),
        ),
        Some(t) if t.is_abstract() => errs.add(
            ErrorKind::AbstractType,
            format!("{} {} type {} is abstract", owner, what, t),
        ),
        Some(_) => {}
    }
}

fn param_kind(k: TypeKind) -> bool {
    matches!(k, TypeKind::Data | TypeKind::ODoc | TypeKind::Object)
}

fn result_kind(k: TypeKind) -> bool {
    k == TypeKind::Data || k.is_structure()
}

const PARAM_KINDS: &str = "ODoc, Object or Data";
const RESULT_KINDS: &str = "Data, a document, a record or Object";

fn validate_command(types: &Types, c: &Command, errs: &mut ValidationErrors) {
    check_arg(types, c, "parameter", &c.param, param_kind, PARAM_KINDS, errs);
    check_arg(
        types,
        c,
        "unlogged parameter",
        &c.unlogged_param,
        param_kind,
        PARAM_KINDS,
        errs,
    );
    check_arg(types, c, "result", &c.result, result_kind, RESULT_KINDS, errs);
}

fn validate_query(types: &Types, q: &Query, errs: &mut ValidationErrors) {
    check_arg(types, q, "parameter", &q.param, param_kind, PARAM_KINDS, errs);
    check_arg(types, q, "result", &q.result, result_kind, RESULT_KINDS, errs);
}

fn validate_projector(types: &Types, p: &Projector, errs: &mut ValidationErrors) {
    for e in &p.events {
        let target = match types.get(&e.on) {
            None => {
                errs.add(
                    ErrorKind::NameNotFound,
                    format!("{} event type «{}» not found", p, e.on),
                );
                continue;
            }
            Some(t) => t,
        };
        if target.is_abstract() {
            errs.add(
                ErrorKind::AbstractType,
                format!("{} is triggered by abstract {}", p, target),
            );
        }
        if e.kinds.is_empty() {
            errs.add(
                ErrorKind::InvalidTypeKind,
                format!("{} can not be triggered by {}", p, target),
            );
        }
        for k in &e.kinds {
            if !k.applies_to(target.kind()) {
                errs.add(
                    ErrorKind::InvalidTypeKind,
                    format!("{} event {} is not applicable to {}", p, k, target),
                );
            }
        }
    }
}

fn validate_view(v: &View, errs: &mut ValidationErrors) {
    if v.partition_key.is_empty() {
        errs.add(ErrorKind::InvalidViewKey, format!("{} partition key is empty", v));
    }
    if v.clust_cols.is_empty() {
        errs.add(ErrorKind::InvalidViewKey, format!("{} clustering columns are empty", v));
    }
    for f in v.partition_key.iter() {
        if !f.is_fixed_width() {
            errs.add(
                ErrorKind::InvalidViewKey,
                format!("{} partition key field «{}» has variable width", v, f.name()),
            );
        }
    }
    let last = v.clust_cols.len().saturating_sub(1);
    for (i, f) in v.clust_cols.iter().enumerate() {
        if i < last && !f.is_fixed_width() {
            errs.add(
                ErrorKind::InvalidViewKey,
                format!(
                    "{} clustering column «{}» has variable width and is not last",
                    v,
                    f.name()
                ),
            );
        }
    }
}

fn validate_workspace(types: &Types, w: &Workspace, errs: &mut ValidationErrors) {
    if !w.descriptor.is_null() {
        match types.get(&w.descriptor) {
            None => errs.add(
                ErrorKind::NameNotFound,
                format!("{} descriptor «{}» not found", w, w.descriptor),
            ),
            Some(t) if t.kind() != TypeKind::CDoc => errs.add(
                ErrorKind::InvalidTypeKind,
                format!("{} descriptor {} is not a CDoc", w, t),
            ),
            Some(_) => {}
        }
    }
    for name in &w.types {
        if !types.contains_key(name) {
            errs.add(
                ErrorKind::NameNotFound,
                format!("{} type «{}» not found", w, name),
            );
        }
    }
}
