//! Lattice contract of abstract values.

use serde::Serialize;
use std::fmt;

/// Join operation over the abstract values of an analysis.
///
/// Implementations must form a join-semilattice of finite height:
/// `join` is associative, commutative and idempotent, `lower_bound()` is
/// its identity, and every strictly increasing chain is finite. The solver
/// terminates only under these conditions.
pub trait Joiner {
    type Value: Clone + Eq + fmt::Debug;

    /// Least upper bound of `values`; `lower_bound()` when empty.
    fn join(&self, values: &[Self::Value]) -> Self::Value;

    /// The least element. Also used for expressions the analysis knows
    /// nothing about.
    fn lower_bound(&self) -> Self::Value;

    /// Value of a variable declared without initializer.
    fn default_initialization(&self) -> Self::Value;

    /// Value of a variable a state does not bind, such as a parameter or a
    /// field. Reads of such a variable and joins with a state missing it
    /// both see this value.
    fn unbound(&self) -> Self::Value {
        self.lower_bound()
    }

    fn join_pair(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        self.join(&[a.clone(), b.clone()])
    }

    /// Lattice order, derived from the join.
    fn leq(&self, a: &Self::Value, b: &Self::Value) -> bool {
        &self.join_pair(a, b) == b
    }
}

/// A boolean answer enriched with "no information" and "both".
///
/// The order is `Bottom < True, False < Conflict < NoIdea`: `Conflict`
/// means that paths disagree, `NoIdea` that the value cannot be known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModalBoolean {
    Bottom,
    True,
    False,
    Conflict,
    NoIdea,
}

impl ModalBoolean {
    #[must_use]
    pub const fn from_bool(b: bool) -> Self {
        if b {
            Self::True
        } else {
            Self::False
        }
    }

    #[must_use]
    pub const fn join(self, other: Self) -> Self {
        match (self, other) {
            (Self::NoIdea, _) | (_, Self::NoIdea) => Self::NoIdea,
            (Self::Bottom, x) | (x, Self::Bottom) => x,
            (Self::True, Self::True) => Self::True,
            (Self::False, Self::False) => Self::False,
            _ => Self::Conflict,
        }
    }

    /// Swaps `True` and `False`.
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            other => other,
        }
    }
}

impl fmt::Display for ModalBoolean {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bottom => write!(f, "⊥"),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Conflict => write!(f, "conflict"),
            Self::NoIdea => write!(f, "no-idea"),
        }
    }
}

/// Joiner of [`ModalBoolean`] values.
#[derive(Debug, Clone, Copy)]
pub struct ModalJoiner {
    default_initialization: ModalBoolean,
}

impl ModalJoiner {
    #[must_use]
    pub const fn new(default_initialization: ModalBoolean) -> Self {
        Self {
            default_initialization,
        }
    }
}

impl Default for ModalJoiner {
    fn default() -> Self {
        Self::new(ModalBoolean::Bottom)
    }
}

impl Joiner for ModalJoiner {
    type Value = ModalBoolean;

    fn join(&self, values: &[ModalBoolean]) -> ModalBoolean {
        values
            .iter()
            .fold(ModalBoolean::Bottom, |acc, value| acc.join(*value))
    }

    fn lower_bound(&self) -> ModalBoolean {
        ModalBoolean::Bottom
    }

    fn default_initialization(&self) -> ModalBoolean {
        self.default_initialization
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Subsets of a universe of at most 16 elements, ordered by inclusion.
    struct PowersetJoiner {
        universe: u16,
    }

    impl Joiner for PowersetJoiner {
        type Value = u16;

        fn join(&self, values: &[u16]) -> u16 {
            values.iter().fold(0, |acc, v| (acc | v) & self.universe)
        }

        fn lower_bound(&self) -> u16 {
            0
        }

        fn default_initialization(&self) -> u16 {
            0
        }
    }

    fn modal() -> impl Strategy<Value = ModalBoolean> {
        prop_oneof![
            Just(ModalBoolean::Bottom),
            Just(ModalBoolean::True),
            Just(ModalBoolean::False),
            Just(ModalBoolean::Conflict),
            Just(ModalBoolean::NoIdea),
        ]
    }

    prop_compose! {
        fn powerset_case()(universe in any::<u16>())
            (a in 0..=universe, b in 0..=universe, c in 0..=universe, universe in Just(universe))
            -> (u16, u16, u16, u16) {
            (universe, a & universe, b & universe, c & universe)
        }
    }

    proptest! {
        #[test]
        fn modal_boolean_is_a_semilattice(a in modal(), b in modal(), c in modal()) {
            laws::check(&ModalJoiner::default(), &a, &b, &c)?;
        }

        #[test]
        fn random_powersets_are_semilattices((universe, a, b, c) in powerset_case()) {
            laws::check(&PowersetJoiner { universe }, &a, &b, &c)?;
        }
    }

    #[test]
    fn modal_order() {
        let joiner = ModalJoiner::default();
        assert!(joiner.leq(&ModalBoolean::Bottom, &ModalBoolean::True));
        assert!(joiner.leq(&ModalBoolean::True, &ModalBoolean::Conflict));
        assert!(joiner.leq(&ModalBoolean::Conflict, &ModalBoolean::NoIdea));
        assert!(!joiner.leq(&ModalBoolean::True, &ModalBoolean::False));
        assert_eq!(
            ModalBoolean::True.join(ModalBoolean::False),
            ModalBoolean::Conflict
        );
        assert_eq!(ModalBoolean::Conflict.negate(), ModalBoolean::Conflict);
        assert_eq!(ModalBoolean::from_bool(false).negate(), ModalBoolean::True);
    }
}
