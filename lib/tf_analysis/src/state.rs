//! Abstract program states.
//!
//! A [`ProgramState`] is an immutable snapshot made of an expression stack
//! and a map from variables to abstract values. Every update returns a new
//! state; unchanged parts are shared between snapshots through reference
//! counting, so states are cheap to clone and to keep per program point.

use crate::errors::{StateError, StateResult};
use crate::lattice::Joiner;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tf_tree::Variable;

#[derive(Debug)]
struct Frame<T> {
    value: T,
    below: Option<Arc<Frame<T>>>,
}

/// Top-first iterator over an expression stack.
pub struct StackIter<'s, T> {
    next: Option<&'s Frame<T>>,
}

impl<'s, T> Iterator for StackIter<'s, T> {
    type Item = &'s T;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.next?;
        self.next = frame.below.as_deref();
        Some(&frame.value)
    }
}

pub struct ProgramState<T> {
    stack: Option<Arc<Frame<T>>>,
    depth: usize,
    variables: Arc<BTreeMap<Variable, T>>,
}

impl<T> Clone for ProgramState<T> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            depth: self.depth,
            variables: Arc::clone(&self.variables),
        }
    }
}

impl<T> Default for ProgramState<T> {
    fn default() -> Self {
        Self {
            stack: None,
            depth: 0,
            variables: Arc::new(BTreeMap::new()),
        }
    }
}

impl<T> ProgramState<T> {
    /// Empty stack, no variable: the bottom state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value on top of the stack.
    ///
    /// # Errors
    ///
    /// [`StateError::EmptyStack`] if there is none.
    pub fn expr(&self) -> StateResult<&T> {
        self.expr_at(0)
    }

    /// Value `depth` slots below the top of the stack.
    ///
    /// # Errors
    ///
    /// [`StateError::EmptyStack`] if the stack is not deep enough.
    pub fn expr_at(&self, depth: usize) -> StateResult<&T> {
        self.stack().nth(depth).ok_or(StateError::EmptyStack)
    }

    #[must_use]
    pub fn push(mut self, value: T) -> Self {
        let below = self.stack.take();
        self.stack = Some(Arc::new(Frame { value, below }));
        self.depth += 1;
        self
    }

    /// # Errors
    ///
    /// [`StateError::EmptyStack`] if the stack is empty.
    pub fn pop(mut self) -> StateResult<Self> {
        let frame = self.stack.take().ok_or(StateError::EmptyStack)?;
        self.stack = frame.below.clone();
        self.depth -= 1;
        Ok(self)
    }

    /// # Errors
    ///
    /// [`StateError::EmptyStack`] if the stack holds less than `n` values.
    pub fn pop_n(self, n: usize) -> StateResult<Self> {
        if n > self.depth {
            return Err(StateError::EmptyStack);
        }
        (0..n).try_fold(self, |state, _| state.pop())
    }

    #[inline]
    #[must_use]
    pub fn stack_len(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn stack(&self) -> StackIter<'_, T> {
        StackIter {
            next: self.stack.as_deref(),
        }
    }

    #[must_use]
    pub fn get(&self, variable: &Variable) -> Option<&T> {
        self.variables.get(variable)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&Variable, &T)> {
        self.variables.iter()
    }

    fn same_stack(&self, other: &Self) -> bool {
        match (&self.stack, &other.stack) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn same_variables(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.variables, &other.variables)
    }
}

impl<T: Clone> ProgramState<T> {
    /// Binds `variable` to `value`. The variable map is copied only if
    /// another state shares it.
    #[must_use]
    pub fn set(mut self, variable: Variable, value: T) -> Self {
        Arc::make_mut(&mut self.variables).insert(variable, value);
        self
    }

    /// Joins the states reaching a program point.
    ///
    /// Stacks are joined slot by slot and must have the same height.
    /// Variable maps are united; a variable bound in several states gets
    /// the join of its values, and a state missing it contributes
    /// [`Joiner::unbound`]. Joining no state gives the empty state.
    ///
    /// # Errors
    ///
    /// [`StateError::StackMismatch`] on stacks of different heights.
    pub fn join<J>(joiner: &J, states: &[Self]) -> StateResult<Self>
    where
        J: Joiner<Value = T>,
    {
        let Some((first, rest)) = states.split_first() else {
            return Ok(Self::new());
        };
        if let Some(other) = rest.iter().find(|state| state.depth != first.depth) {
            return Err(StateError::StackMismatch {
                expected: first.depth,
                found: other.depth,
            });
        }

        let (stack, depth) = if rest.iter().all(|state| state.same_stack(first)) {
            (first.stack.clone(), first.depth)
        } else {
            let mut iters: Vec<_> = states.iter().map(ProgramState::stack).collect();
            let mut slots = Vec::with_capacity(first.depth);
            for _ in 0..first.depth {
                let values: Vec<T> = iters.iter_mut().filter_map(|it| it.next()).cloned().collect();
                slots.push(joiner.join(&values));
            }
            let joined = slots
                .into_iter()
                .rev()
                .fold(Self::new(), ProgramState::push);
            (joined.stack, joined.depth)
        };

        let variables = if rest.iter().all(|state| state.same_variables(first)) {
            Arc::clone(&first.variables)
        } else {
            let mut bound: BTreeMap<&Variable, Vec<T>> = BTreeMap::new();
            for state in states {
                for (variable, value) in state.variables.iter() {
                    bound.entry(variable).or_default().push(value.clone());
                }
            }
            let joined = bound
                .into_iter()
                .map(|(variable, mut values)| {
                    if values.len() < states.len() {
                        values.push(joiner.unbound());
                    }
                    let value = if values.len() == 1 {
                        values.swap_remove(0)
                    } else {
                        joiner.join(&values)
                    };
                    (variable.clone(), value)
                })
                .collect();
            Arc::new(joined)
        };

        Ok(Self {
            stack,
            depth,
            variables,
        })
    }
}

impl<T: PartialEq> PartialEq for ProgramState<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.depth != other.depth {
            return false;
        }
        let stacks_equal = self.same_stack(other) || self.stack().eq(other.stack());
        stacks_equal && (self.same_variables(other) || self.variables == other.variables)
    }
}

impl<T: Eq> Eq for ProgramState<T> {}

impl<T: fmt::Debug> fmt::Debug for ProgramState<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ProgramState")
            .field("stack", &self.stack().collect::<Vec<_>>())
            .field("variables", &self.variables)
            .finish()
    }
}

impl<T: fmt::Display> fmt::Display for ProgramState<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for value in self.stack() {
            write!(f, " {value}")?;
        }
        write!(f, " |")?;
        for (i, (variable, value)) in self.variables.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {variable} -> {value}")?;
        }
        write!(f, " }}")
    }
}

impl<T: Serialize> Serialize for ProgramState<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ProgramState", 2)?;
        state.serialize_field("stack", &self.stack().collect::<Vec<_>>())?;
        state.serialize_field("variables", &*self.variables)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{ModalBoolean, ModalJoiner};

    fn var(name: &str) -> Variable {
        Variable::new(name)
    }

    #[test]
    fn stack_discipline() {
        let state = ProgramState::new().push(1).push(2).push(3);
        assert_eq!(state.stack_len(), 3);
        assert_eq!(state.expr(), Ok(&3));
        assert_eq!(state.expr_at(2), Ok(&1));
        assert_eq!(state.expr_at(3), Err(StateError::EmptyStack));

        let state = state.pop_n(2).unwrap();
        assert_eq!(state.stack().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(state.clone().pop_n(2).unwrap_err(), StateError::EmptyStack);
        let state = state.pop().unwrap();
        assert_eq!(state.expr(), Err(StateError::EmptyStack));
        assert_eq!(state.pop().unwrap_err(), StateError::EmptyStack);
    }

    #[test]
    fn updates_leave_snapshots_untouched() {
        let before = ProgramState::new().set(var("s"), 1).push(10);
        let after = before.clone().set(var("s"), 2).set(var("t"), 3).pop().unwrap();

        assert_eq!(before.get(&var("s")), Some(&1));
        assert_eq!(before.get(&var("t")), None);
        assert_eq!(before.expr(), Ok(&10));
        assert_eq!(after.get(&var("s")), Some(&2));
        assert_eq!(after.stack_len(), 0);
    }

    #[test]
    fn join_unites_variables() {
        let joiner = ModalJoiner::default();
        let base = ProgramState::new().push(ModalBoolean::True);
        let a = base
            .clone()
            .set(var("s"), ModalBoolean::True)
            .set(var("t"), ModalBoolean::False);
        let b = base.clone().set(var("s"), ModalBoolean::False);

        let joined = ProgramState::join(&joiner, &[a, b]).unwrap();
        assert_eq!(joined.get(&var("s")), Some(&ModalBoolean::Conflict));
        assert_eq!(joined.get(&var("t")), Some(&ModalBoolean::False));
        assert_eq!(joined.expr(), Ok(&ModalBoolean::True));
    }

    #[test]
    fn join_of_stacks_is_slotwise() {
        let joiner = ModalJoiner::default();
        let a = ProgramState::new()
            .push(ModalBoolean::True)
            .push(ModalBoolean::Bottom);
        let b = ProgramState::new()
            .push(ModalBoolean::False)
            .push(ModalBoolean::True);
        let joined = ProgramState::join(&joiner, &[a, b]).unwrap();
        assert_eq!(
            joined.stack().copied().collect::<Vec<_>>(),
            vec![ModalBoolean::True, ModalBoolean::Conflict]
        );
    }

    #[test]
    fn join_rejects_uneven_stacks() {
        let joiner = ModalJoiner::default();
        let a = ProgramState::new().push(ModalBoolean::True);
        let b = ProgramState::new();
        assert_eq!(
            ProgramState::join(&joiner, &[a, b]).unwrap_err(),
            StateError::StackMismatch {
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn join_of_nothing_is_empty() {
        let joiner = ModalJoiner::default();
        let joined = ProgramState::join(&joiner, &[]).unwrap();
        assert_eq!(joined, ProgramState::new());
    }

    #[test]
    fn equality_is_structural() {
        let a = ProgramState::new().push(1).set(var("x"), 4);
        let b = ProgramState::new().push(1).set(var("x"), 4);
        assert_eq!(a, b);
        assert_ne!(a, b.clone().set(var("x"), 5));
        assert_ne!(a, b.push(1));
    }

    #[test]
    fn display_and_serialize() {
        let state = ProgramState::new()
            .push(ModalBoolean::True)
            .set(var("s"), ModalBoolean::Conflict);
        assert_eq!(state.to_string(), "{ true | s -> conflict }");
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"stack":["True"],"variables":{"s":"Conflict"}}"#
        );
    }
}
