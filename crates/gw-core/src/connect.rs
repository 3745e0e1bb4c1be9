//! Connection-legality grammar and edge verification.
//!
//! The DSL is a whitespace-separated list of role statements:
//!
//! ```text
//! out -> in
//! sink <- src
//! peer <-> peer
//! ```
//!
//! Roles match `[a-zA-Z0-9_-]+`. Parsing fails closed: one bad token
//! aborts the whole parse, logs an error, and yields an empty rule-set
//! (no connections implicitly legal through a typo).

use crate::config::GraphConfig;
use crate::id::Id;
use crate::model::{GraphStore, HandleBinding};
use std::collections::{HashMap, HashSet};
use winnow::combinator::alt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;

// ─── Rule set ────────────────────────────────────────────────────────────

/// Parsed connection rules: source role → legal target roles, plus the
/// sets of roles ever declared on each side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionRules {
    allowed: HashMap<Id, Vec<Id>>,
    sources: HashSet<Id>,
    targets: HashSet<Id>,
}

impl ConnectionRules {
    /// Parse a DSL string. Any syntax error logs once and returns the
    /// empty (fail-closed) rule set.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut rules = Self::default();
        let mut rest = input;

        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                return rules;
            }
            match statement.parse_next(&mut rest) {
                Ok((left, dir, right)) => {
                    match dir {
                        Direction::Forward => rules.insert(left, right),
                        Direction::Backward => rules.insert(right, left),
                        Direction::Both => {
                            rules.insert(left, right);
                            rules.insert(right, left);
                        }
                    }
                }
                Err(_) => {
                    let shown: String = rest.chars().take(24).collect();
                    log::error!("invalid connection rule near {shown:?}, ignoring all rules");
                    return Self::default();
                }
            }
        }
    }

    fn insert(&mut self, source: Id, target: Id) {
        let list = self.allowed.entry(source).or_default();
        if !list.contains(&target) {
            list.push(target);
        }
        self.sources.insert(source);
        self.targets.insert(target);
    }

    /// No statements parsed — every connection is legal.
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Whether the explicit pair `source → target` was declared.
    pub fn allows(&self, source: Id, target: Id) -> bool {
        self.allowed
            .get(&source)
            .is_some_and(|targets| targets.contains(&target))
    }

    /// Legal target roles for a source role, in declaration order.
    pub fn targets_of(&self, source: Id) -> &[Id] {
        self.allowed.get(&source).map_or(&[], Vec::as_slice)
    }

    /// All roles ever declared on the source side.
    pub fn sources(&self) -> &HashSet<Id> {
        &self.sources
    }

    /// All roles ever declared on the target side.
    pub fn targets(&self) -> &HashSet<Id> {
        &self.targets
    }
}

// ─── DSL parsing ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
    Both,
}

/// One `role <arrow> role` statement.
fn statement(input: &mut &str) -> ModalResult<(Id, Direction, Id)> {
    let left = role.parse_next(input)?;
    skip_inline_space(input);
    let dir = alt((
        "<->".map(|_| Direction::Both),
        "->".map(|_| Direction::Forward),
        "<-".map(|_| Direction::Backward),
    ))
    .parse_next(input)?;
    skip_inline_space(input);
    let right = role.parse_next(input)?;
    Ok((left, dir, right))
}

/// A role name: `[a-zA-Z0-9_-]+`, where a `-` that starts an `->` arrow
/// terminates the role instead.
fn role(input: &mut &str) -> ModalResult<Id> {
    let bytes = input.as_bytes();
    let mut len = 0;
    while len < bytes.len() {
        let c = bytes[len];
        if c.is_ascii_alphanumeric() || c == b'_' {
            len += 1;
        } else if c == b'-' && bytes.get(len + 1) != Some(&b'>') {
            len += 1;
        } else {
            break;
        }
    }
    if len == 0 {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    let matched = &input[..len];
    *input = &input[len..];
    Ok(Id::intern(matched))
}

fn skip_inline_space(input: &mut &str) {
    *input = input.trim_start_matches([' ', '\t']);
}

// ─── Edge verification ───────────────────────────────────────────────────

/// Role view of one endpoint: the handle's declared roles, no roles for a
/// floating endpoint, or a wildcard for a still-unresolved `Auto` side
/// (compatible with anything that is legal for *some* counterpart).
#[derive(Debug, Clone, Default)]
struct SideRoles {
    roles: Vec<Id>,
    any: bool,
}

impl SideRoles {
    fn floating() -> Self {
        Self::default()
    }

    fn wildcard() -> Self {
        Self {
            roles: Vec::new(),
            any: true,
        }
    }

    /// An endpoint with no declared role connects to anything — if free
    /// connections are allowed at all.
    fn unrestricted(&self, declared: &HashSet<Id>) -> bool {
        self.roles.is_empty() || self.roles.iter().all(|r| !declared.contains(r))
    }
}

/// Pairwise legality of two endpoints.
fn compatible(
    rules: &ConnectionRules,
    config: &GraphConfig,
    source: &SideRoles,
    target: &SideRoles,
) -> bool {
    if rules.is_empty() {
        return true;
    }
    if source.any && target.any {
        return true;
    }
    // A wildcard side accepts anything its counterpart could legally pair
    // with.
    if source.any {
        return target.roles.iter().any(|t| rules.targets().contains(t))
            || (config.allow_free_connections && target.unrestricted(rules.targets()));
    }
    if target.any {
        return source.roles.iter().any(|s| rules.sources().contains(s))
            || (config.allow_free_connections && source.unrestricted(rules.sources()));
    }

    let explicit = source
        .roles
        .iter()
        .any(|s| target.roles.iter().any(|t| rules.allows(*s, *t)));
    if explicit {
        return true;
    }
    config.allow_free_connections
        && (source.unrestricted(rules.sources()) || target.unrestricted(rules.targets()))
}

/// What `verify_edge` decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Legal,
    /// Kept only when `allow_illegal_edges` is set.
    Illegal,
}

/// Check one edge's handle pairing against the rules, resolving `Auto`
/// bindings to the first compatible handle (concrete handles win over a
/// floating fallback). Marks the edge verified; returns the verdict.
pub fn verify_edge(
    store: &mut GraphStore,
    rules: &ConnectionRules,
    config: &GraphConfig,
    edge_id: Id,
) -> Option<Verdict> {
    let edge = store.edge(edge_id)?;
    let (source_node, target_node) = (edge.source, edge.target);
    let (mut source_binding, mut target_binding) = (edge.source_handle, edge.target_handle);

    // A named handle that no longer exists degrades to floating.
    source_binding = existing_or_floating(store, source_node, source_binding, edge_id);
    target_binding = existing_or_floating(store, target_node, target_binding, edge_id);

    // Resolve autos: the side with a known binding constrains first.
    if source_binding == HandleBinding::Auto {
        let against = side_roles(store, target_node, target_binding);
        source_binding =
            pick_handle(store, rules, config, source_node, ResolveSide::Source, &against);
    }
    if target_binding == HandleBinding::Auto {
        let against = side_roles(store, source_node, source_binding);
        target_binding =
            pick_handle(store, rules, config, target_node, ResolveSide::Target, &against);
    }

    let source_roles = side_roles(store, source_node, source_binding);
    let target_roles = side_roles(store, target_node, target_binding);
    let verdict = if compatible(rules, config, &source_roles, &target_roles) {
        Verdict::Legal
    } else {
        Verdict::Illegal
    };

    let edge = store.edge_mut(edge_id)?;
    edge.source_handle = source_binding;
    edge.target_handle = target_binding;
    edge.verified = true;
    Some(verdict)
}

/// Verify every unverified edge, dropping illegal ones unless the config
/// keeps them.
pub fn verify_edges(store: &mut GraphStore, rules: &ConnectionRules, config: &GraphConfig) {
    let pending: Vec<Id> = store
        .edges()
        .iter()
        .filter(|e| !e.verified)
        .map(|e| e.id)
        .collect();

    for id in pending {
        if verify_edge(store, rules, config, id) == Some(Verdict::Illegal) {
            if config.allow_illegal_edges {
                log::warn!("edge {id:?} violates connection rules, kept by config");
            } else {
                log::warn!("edge {id:?} violates connection rules, dropped");
                store.remove_edge(id);
            }
        }
    }
}

fn existing_or_floating(
    store: &GraphStore,
    node: Id,
    binding: HandleBinding,
    edge_id: Id,
) -> HandleBinding {
    if let HandleBinding::Named(name) = binding
        && store.node(node).is_none_or(|n| n.handle(name).is_none())
    {
        log::warn!("edge {edge_id:?} names missing handle {name:?} on {node:?}, treating as floating");
        return HandleBinding::Floating;
    }
    binding
}

fn side_roles(store: &GraphStore, node: Id, binding: HandleBinding) -> SideRoles {
    match binding {
        HandleBinding::Named(name) => store
            .node(node)
            .and_then(|n| n.handle(name))
            .map(|h| SideRoles {
                roles: h.roles.to_vec(),
                any: false,
            })
            .unwrap_or_else(SideRoles::floating),
        HandleBinding::Auto => SideRoles::wildcard(),
        HandleBinding::Floating => SideRoles::floating(),
    }
}

/// Which endpoint of the pair a handle search resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolveSide {
    Source,
    Target,
}

/// First handle (declaration order) compatible with the other side;
/// floating only as a last resort, and only if a role-free connection is
/// itself legal.
fn pick_handle(
    store: &GraphStore,
    rules: &ConnectionRules,
    config: &GraphConfig,
    node: Id,
    side: ResolveSide,
    against: &SideRoles,
) -> HandleBinding {
    if let Some(n) = store.node(node) {
        for handle in &n.handles {
            let own = SideRoles {
                roles: handle.roles.to_vec(),
                any: false,
            };
            let legal = match side {
                ResolveSide::Source => compatible(rules, config, &own, against),
                ResolveSide::Target => compatible(rules, config, against, &own),
            };
            if legal {
                return HandleBinding::Named(handle.name);
            }
        }
    }
    HandleBinding::Floating
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(names: &[&str]) -> HashSet<Id> {
        names.iter().map(|n| Id::intern(n)).collect()
    }

    #[test]
    fn statements_build_the_mapping() {
        let rules = ConnectionRules::parse("a->b\nc<->d\nX<-Y");

        assert_eq!(rules.targets_of(Id::intern("a")), &[Id::intern("b")]);
        assert_eq!(rules.targets_of(Id::intern("c")), &[Id::intern("d")]);
        assert_eq!(rules.targets_of(Id::intern("d")), &[Id::intern("c")]);
        assert_eq!(rules.targets_of(Id::intern("Y")), &[Id::intern("X")]);

        assert_eq!(*rules.sources(), ids(&["a", "c", "d", "Y"]));
        assert_eq!(*rules.targets(), ids(&["b", "c", "d", "X"]));
    }

    #[test]
    fn spaced_arrows_parse_too() {
        let rules = ConnectionRules::parse("out -> in\n  peer <-> peer");
        assert!(rules.allows(Id::intern("out"), Id::intern("in")));
        assert!(rules.allows(Id::intern("peer"), Id::intern("peer")));
    }

    #[test]
    fn hyphenated_roles_survive_next_to_arrows() {
        let rules = ConnectionRules::parse("multi-out->multi-in");
        assert!(rules.allows(Id::intern("multi-out"), Id::intern("multi-in")));
    }

    #[test]
    fn one_bad_statement_empties_everything() {
        let rules = ConnectionRules::parse("a->b\nhello - there\nc->d");
        assert!(rules.is_empty());
        assert!(rules.sources().is_empty());
        assert!(rules.targets().is_empty());
    }

    #[test]
    fn empty_input_is_fine() {
        let rules = ConnectionRules::parse("   \n\t ");
        assert!(rules.is_empty());
    }

    #[test]
    fn duplicate_statements_collapse() {
        let rules = ConnectionRules::parse("a->b a->b");
        assert_eq!(rules.targets_of(Id::intern("a")).len(), 1);
    }
}
