//! Zip slip detection.
//!
//! Archive entry names may contain `..` segments. A file built from a
//! directory and an entry name must be checked to stay under that
//! directory, with `file.toPath().startsWith(dir.toPath())`, before it is
//! written to.

use super::{condition, holds};
use crate::dataflow::Engine;
use crate::errors::AnalysisResult;
use crate::flowgraph::Branch;
use crate::lattice::Joiner;
use crate::matcher::MethodMatcher;
use crate::value::{invocation_operands, ValueAnalysis, ValueState};
use lazy_static::lazy_static;
use serde::Serialize;
use std::fmt;
use tf_tree::*;

lazy_static! {
    static ref ENTRY_NAME: MethodMatcher =
        MethodMatcher::new("java.util.zip.ZipEntry getName()").expect("entry name pattern");
    static ref FILE_CONSTRUCTOR: MethodMatcher =
        MethodMatcher::new("java.io.File <constructor>(.., java.lang.String)")
            .expect("file constructor pattern");
}

/// `Bottom < Safe < ZipEntryName, NewFileFromZipEntry(_) < Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ZipSlipValue {
    Bottom,
    Safe,
    /// Name of an archive entry.
    ZipEntryName,
    /// File built under the given directory from an entry name.
    NewFileFromZipEntry(Variable),
    Unknown,
}

impl ZipSlipValue {
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (Self::Safe, x) | (x, Self::Safe) => x.clone(),
            (a, b) if a == b => a.clone(),
            _ => Self::Unknown,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Bottom | Self::Safe)
    }

    /// Whether a file with this value may be written outside its
    /// directory.
    #[inline]
    #[must_use]
    pub fn is_vulnerable(&self) -> bool {
        matches!(self, Self::NewFileFromZipEntry(_))
    }
}

impl fmt::Display for ZipSlipValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bottom => write!(f, "⊥"),
            Self::Safe => write!(f, "safe"),
            Self::ZipEntryName => write!(f, "zip-entry-name"),
            Self::NewFileFromZipEntry(dir) => write!(f, "new-file({dir}, zip-entry-name)"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZipSlipJoiner;

impl Joiner for ZipSlipJoiner {
    type Value = ZipSlipValue;

    fn join(&self, values: &[ZipSlipValue]) -> ZipSlipValue {
        values
            .iter()
            .fold(ZipSlipValue::Bottom, |acc, value| acc.join(value))
    }

    fn lower_bound(&self) -> ZipSlipValue {
        ZipSlipValue::Bottom
    }

    fn default_initialization(&self) -> ZipSlipValue {
        ZipSlipValue::Bottom
    }
}

// values computed from clean values are safe
fn derived<'s, I>(operands: I) -> ZipSlipValue
where
    I: IntoIterator<Item = &'s ZipSlipValue>,
{
    if operands.into_iter().all(ZipSlipValue::is_clean) {
        ZipSlipValue::Safe
    } else {
        ZipSlipValue::Unknown
    }
}

fn replace_operands(
    state: ValueState<PathSafety>,
    n: usize,
) -> AnalysisResult<ValueState<PathSafety>> {
    let value = derived(state.stack().take(n));
    Ok(state.pop_n(n)?.push(value))
}

// `x.toPath()`, or a bare `x`
fn path_of(cursor: Cursor) -> Option<&Variable> {
    match cursor.kind() {
        NodeKind::Identifier(ident) => Some(&ident.name),
        NodeKind::MethodInvocation(call) if call.name == "toPath" && call.args.is_empty() => {
            match cursor.at(call.select?)?.kind() {
                NodeKind::Identifier(ident) => Some(&ident.name),
                _ => None,
            }
        }
        _ => None,
    }
}

/// `file.toPath().startsWith(dir.toPath())`, as `(file, dir)`.
fn starts_with_guard(cursor: Cursor) -> Option<(&Variable, &Variable)> {
    let NodeKind::MethodInvocation(call) = cursor.kind() else {
        return None;
    };
    match call.args.as_slice() {
        [arg] if call.name == "startsWith" => {
            let file = path_of(cursor.at(call.select?)?)?;
            let dir = path_of(cursor.at(*arg)?)?;
            Some((file, dir))
        }
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct PathSafety {
    joiner: ZipSlipJoiner,
}

impl PathSafety {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ValueAnalysis for PathSafety {
    type Value = ZipSlipValue;
    type Joiner = ZipSlipJoiner;

    fn joiner(&self) -> &ZipSlipJoiner {
        &self.joiner
    }

    fn transfer_literal(
        &self,
        _point: Cursor,
        _node: &Literal,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state.push(ZipSlipValue::Safe))
    }

    fn transfer_binary(
        &self,
        _point: Cursor,
        _node: &Binary,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        replace_operands(state, 2)
    }

    fn transfer_unary(
        &self,
        _point: Cursor,
        _node: &Unary,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        replace_operands(state, 1)
    }

    fn transfer_field_access(
        &self,
        _point: Cursor,
        _node: &FieldAccess,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        replace_operands(state, 1)
    }

    fn transfer_method_invocation(
        &self,
        _point: Cursor,
        node: &MethodInvocation,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        if ENTRY_NAME.matches_invocation(node) {
            let operands = invocation_operands(node);
            return Ok(state.pop_n(operands)?.push(ZipSlipValue::ZipEntryName));
        }
        replace_operands(state, invocation_operands(node))
    }

    fn transfer_new_class(
        &self,
        point: Cursor,
        node: &NewClass,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        let dir = match node.args.as_slice() {
            [dir, _] if FILE_CONSTRUCTOR.matches_constructor(node) => *dir,
            _ => return replace_operands(state, node.args.len()),
        };
        let value = match state.expr()? {
            ZipSlipValue::ZipEntryName => match point.at(dir).map(|c| c.kind()) {
                Some(NodeKind::Identifier(ident)) => {
                    ZipSlipValue::NewFileFromZipEntry(ident.name.clone())
                }
                _ => ZipSlipValue::Unknown,
            },
            name => derived([name]),
        };
        Ok(state.pop_n(2)?.push(value))
    }

    fn narrow_on_branch(
        &self,
        construct: Cursor,
        state: ValueState<Self>,
        branch: Branch,
    ) -> AnalysisResult<ValueState<Self>> {
        let Some((cond, negated)) = condition(construct) else {
            return Ok(state);
        };
        let Some((file, dir)) = starts_with_guard(cond) else {
            return Ok(state);
        };
        let checked = matches!(
            state.get(file),
            Some(ZipSlipValue::NewFileFromZipEntry(base)) if base == dir
        );
        if checked && holds(branch, negated) {
            Ok(state.set(file.clone(), ZipSlipValue::Safe))
        } else {
            Ok(state)
        }
    }
}

/// Value of the expression `expr` as computed by the last run of `engine`.
#[must_use]
pub fn value_of(engine: &Engine<'_, PathSafety>, expr: NodeId) -> ZipSlipValue {
    engine
        .result_at(expr)
        .expr()
        .map_or(ZipSlipValue::Bottom, Clone::clone)
}
