//! Deciding whether two declaration nodes, possibly from different parses, denote the same
//! program entity.
//!
//! Both nodes are first reduced to their canonical declaration. Then an ordered chain of
//! [`Strategy`]s is consulted; the first one that reaches a verdict wins. When every strategy
//! abstains the nodes are treated as different, which narrows the guarantee to what the
//! redeclaration chain of a single translation unit can prove.

use std::collections::HashMap;

use refract_frontend::{DeclarationNode, SourceLocation, TranslationUnitId};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Verdict {
    Same,
    Different,
    /// The strategy has no information to decide with.
    Undecided,
}

/// One tier of the identity fallback chain. Inputs are canonical declarations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Equality of universal symbol references, when both sides have one.
    UniversalReference,
    /// Qualified name equality, when neither side has a universal reference and both have
    /// external linkage.
    QualifiedNameLinkage,
    /// Membership in the redeclaration chain. Only decides within one translation unit.
    RedeclarationChain,
}

impl Strategy {
    pub const CHAIN: [Strategy; 3] = [
        Strategy::UniversalReference,
        Strategy::QualifiedNameLinkage,
        Strategy::RedeclarationChain,
    ];

    pub fn decide<D: DeclarationNode>(self, a: &D, b: &D) -> Verdict {
        match self {
            Strategy::UniversalReference => match (a.usr(), b.usr()) {
                (Some(a), Some(b)) if a == b => Verdict::Same,
                (Some(_), Some(_)) => Verdict::Different,
                _ => Verdict::Undecided,
            },
            Strategy::QualifiedNameLinkage => {
                if a.usr().is_some() || b.usr().is_some() {
                    return Verdict::Undecided;
                }
                if !(a.linkage().is_external() && b.linkage().is_external()) {
                    return Verdict::Undecided;
                }
                if a.qualified_name() == b.qualified_name() {
                    Verdict::Same
                } else {
                    Verdict::Different
                }
            }
            Strategy::RedeclarationChain => {
                if a.translation_unit() != b.translation_unit() {
                    return Verdict::Undecided;
                }
                let location = a.location();
                if b.location() == location
                    || b.redeclarations().iter().any(|r| r.location() == location)
                {
                    Verdict::Same
                } else {
                    Verdict::Different
                }
            }
        }
    }
}

/// Runs the fallback chain on two already-canonical declarations.
fn decide_canonical<D: DeclarationNode>(a: &D, b: &D) -> bool {
    for strategy in Strategy::CHAIN {
        match strategy.decide(a, b) {
            Verdict::Same => return true,
            Verdict::Different => return false,
            Verdict::Undecided => {}
        }
    }
    tracing::debug!(
        target: "refract.refactor",
        a = %a.location(),
        b = %b.location(),
        "declaration identity undecided by every strategy; treating as different"
    );
    false
}

/// Uncached equivalence of two declaration nodes.
pub fn equivalent<D: DeclarationNode>(a: &D, b: &D) -> bool {
    decide_canonical(&a.canonical_declaration(), &b.canonical_declaration())
}

/// Memo key of a canonical declaration.
///
/// A header parsed by two translation units yields a node at the same location in each, and
/// those nodes are not interchangeable: a `static` function in the header is a different entity
/// per unit.
type NodeKey = (TranslationUnitId, SourceLocation);

fn node_key<D: DeclarationNode>(canonical: &D) -> NodeKey {
    (canonical.translation_unit(), canonical.location())
}

/// Matches a stream of candidate nodes against one fixed target.
///
/// Results are memoized per translation unit by the lexical location of each candidate's
/// canonical declaration, so the answer does not depend on the order units are visited in.
#[derive(Debug)]
pub struct IdentityResolver<D> {
    target: D,
    memo: HashMap<NodeKey, bool>,
    evaluations: usize,
}

impl<D: DeclarationNode> IdentityResolver<D> {
    pub fn new(target: &D) -> Self {
        Self {
            target: target.canonical_declaration(),
            memo: HashMap::new(),
            evaluations: 0,
        }
    }

    /// Canonical declaration of the target.
    pub fn target(&self) -> &D {
        &self.target
    }

    pub fn equivalent_to(&mut self, other: &D) -> bool {
        let canonical = other.canonical_declaration();
        let key = node_key(&canonical);
        if let Some(&known) = self.memo.get(&key) {
            return known;
        }
        self.evaluations += 1;
        let same = decide_canonical(&self.target, &canonical);
        self.memo.insert(key, same);
        same
    }

    /// How many candidates went through the strategy chain (memo misses).
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}

/// Symmetric, memoized pairwise equivalence.
#[derive(Debug, Default)]
pub struct IdentityCache {
    memo: HashMap<(NodeKey, NodeKey), bool>,
    evaluations: usize,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equivalent<D: DeclarationNode>(&mut self, a: &D, b: &D) -> bool {
        let (a, b) = (a.canonical_declaration(), b.canonical_declaration());
        let (la, lb) = (node_key(&a), node_key(&b));
        let key = if la <= lb { (la, lb) } else { (lb, la) };
        if let Some(&known) = self.memo.get(&key) {
            return known;
        }
        self.evaluations += 1;
        let same = decide_canonical(&a, &b);
        self.memo.insert(key, same);
        same
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}

#[cfg(test)]
mod tests {
    use refract_core::{FileIdentity, TextRange, TextSize};
    use refract_frontend::{DeclKind, Linkage, SourceRange, TranslationUnitId, Usr};

    use super::*;

    #[derive(Debug, Clone)]
    struct Stub {
        tu: u32,
        offset: u32,
        /// Offsets of every redeclaration; the first is canonical.
        chain: Vec<u32>,
        usr: Option<&'static str>,
        linkage: Linkage,
        name: &'static str,
    }

    fn stub(tu: u32, offset: u32) -> Stub {
        Stub {
            tu,
            offset,
            chain: vec![offset],
            usr: None,
            linkage: Linkage::External,
            name: "ns::value",
        }
    }

    impl Stub {
        fn at(&self, offset: u32) -> Stub {
            Stub {
                offset,
                ..self.clone()
            }
        }
    }

    impl DeclarationNode for Stub {
        fn translation_unit(&self) -> TranslationUnitId {
            TranslationUnitId(self.tu)
        }

        fn kind(&self) -> DeclKind {
            DeclKind::Variable
        }

        fn location(&self) -> SourceLocation {
            SourceLocation::new(FileIdentity::from_canonical("/t/value.h"), self.offset)
        }

        fn name(&self) -> String {
            "value".to_owned()
        }

        fn name_range(&self) -> SourceRange {
            let start = TextSize::from(self.offset);
            SourceRange::new(
                FileIdentity::from_canonical("/t/value.h"),
                TextRange::at(start, TextSize::from(5)),
            )
        }

        fn extent(&self) -> SourceRange {
            self.name_range()
        }

        fn canonical_declaration(&self) -> Self {
            self.at(self.chain[0])
        }

        fn redeclarations(&self) -> Vec<Self> {
            self.chain.iter().map(|&offset| self.at(offset)).collect()
        }

        fn linkage(&self) -> Linkage {
            self.linkage
        }

        fn usr(&self) -> Option<Usr> {
            self.usr.map(Usr::new)
        }

        fn qualified_name(&self) -> String {
            self.name.to_owned()
        }

        fn is_definition(&self) -> bool {
            false
        }
    }

    #[test]
    fn universal_reference_decides_across_translation_units() {
        let a = Stub {
            usr: Some("c:@N@ns@value"),
            ..stub(0, 10)
        };
        let b = Stub {
            usr: Some("c:@N@ns@value"),
            ..stub(1, 40)
        };
        let c = Stub {
            usr: Some("c:@N@ns@other"),
            ..stub(1, 80)
        };
        assert!(equivalent(&a, &b));
        assert!(!equivalent(&a, &c));
    }

    #[test]
    fn qualified_name_needs_external_linkage_on_both_sides() {
        let a = stub(0, 10);
        let b = stub(1, 40);
        assert_eq!(Strategy::QualifiedNameLinkage.decide(&a, &b), Verdict::Same);

        let internal = Stub {
            linkage: Linkage::Internal,
            ..stub(1, 40)
        };
        assert_eq!(
            Strategy::QualifiedNameLinkage.decide(&a, &internal),
            Verdict::Undecided
        );
        assert!(!equivalent(&a, &internal));
    }

    #[test]
    fn redeclaration_chain_only_decides_within_one_translation_unit() {
        let local = Stub {
            linkage: Linkage::None,
            chain: vec![10, 30],
            ..stub(0, 30)
        };
        let first = local.at(10);
        assert_eq!(
            Strategy::RedeclarationChain.decide(&first, &local),
            Verdict::Same
        );
        assert!(equivalent(&first, &local));

        let elsewhere = Stub {
            linkage: Linkage::None,
            ..stub(1, 10)
        };
        assert_eq!(
            Strategy::RedeclarationChain.decide(&first, &elsewhere),
            Verdict::Undecided
        );
        assert!(!equivalent(&first, &elsewhere));
    }

    #[test]
    fn resolver_memoizes_by_canonical_location() {
        let target = Stub {
            linkage: Linkage::None,
            chain: vec![10, 30, 50],
            ..stub(0, 50)
        };
        let mut resolver = IdentityResolver::new(&target);
        assert_eq!(resolver.target().location(), target.at(10).location());

        for offset in [10, 30, 50, 30] {
            assert!(resolver.equivalent_to(&target.at(offset)));
        }
        assert_eq!(resolver.evaluations(), 1);

        let unrelated = Stub {
            linkage: Linkage::None,
            ..stub(0, 90)
        };
        assert!(!resolver.equivalent_to(&unrelated));
        assert!(!resolver.equivalent_to(&unrelated));
        assert_eq!(resolver.evaluations(), 2);
    }

    #[test]
    fn memo_does_not_leak_between_translation_units() {
        // `static int helper()` in a header included by two units: same location, two entities.
        let in_second = Stub {
            linkage: Linkage::Internal,
            ..stub(1, 10)
        };
        let in_first = Stub {
            linkage: Linkage::Internal,
            ..stub(0, 10)
        };

        let mut resolver = IdentityResolver::new(&in_second);
        assert!(!resolver.equivalent_to(&in_first));
        assert!(resolver.equivalent_to(&in_second));
        assert!(!resolver.equivalent_to(&in_first));
        assert_eq!(resolver.evaluations(), 2);

        let mut reversed = IdentityResolver::new(&in_second);
        assert!(reversed.equivalent_to(&in_second));
        assert!(!reversed.equivalent_to(&in_first));

        let mut cache = IdentityCache::new();
        assert!(!cache.equivalent(&in_first, &in_second));
        assert!(cache.equivalent(&in_second, &in_second));
        assert_eq!(cache.evaluations(), 2);
    }

    #[test]
    fn pairwise_cache_is_symmetric() {
        let a = Stub {
            usr: Some("c:@F@f"),
            ..stub(0, 10)
        };
        let b = Stub {
            usr: Some("c:@F@f"),
            ..stub(1, 20)
        };
        let mut cache = IdentityCache::new();
        assert!(cache.equivalent(&a, &b));
        assert!(cache.equivalent(&b, &a));
        assert!(cache.equivalent(&a, &b));
        assert_eq!(cache.evaluations(), 1);
    }
}
