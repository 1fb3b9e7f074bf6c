//! Axis selectors and slice evaluation
//!
//! Each dimension of a displayed variable carries one [`Token`]: keep the
//! whole dimension, pick one index, or reduce it with a named statistic.
//! [`evaluate_slice`] reads only the selected hyperslab and folds the tokens
//! into a rank-reduced array.

use crate::data_source::{DatasetHandle, VariableInfo};
use crate::errors::{NcSliceError, Result};
use crate::missing::{substitute, MissingValue};
use crate::statistics::{ReduceOp, StatisticalReduction};
use ndarray::{ArrayD, Axis, IxDyn};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use tracing::debug;

/// Selection on one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Keep the whole dimension
    All,
    /// Select one position; the dimension is dropped
    Index(usize),
    /// Reduce the dimension; it is dropped
    Reduce(ReduceOp),
}

impl FromStr for Token {
    type Err = NcSliceError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "all" {
            return Ok(Token::All);
        }
        if let Ok(index) = s.parse::<usize>() {
            return Ok(Token::Index(index));
        }
        s.parse::<ReduceOp>()
            .map(Token::Reduce)
            .map_err(|_| NcSliceError::invalid(format!("invalid selector token '{s}'")))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::All => f.write_str("all"),
            Token::Index(i) => write!(f, "{i}"),
            Token::Reduce(op) => write!(f, "{op}"),
        }
    }
}

impl Token {
    /// Whether the token may be used on a dimension of length `len`
    pub fn is_valid_for(self, len: usize) -> bool {
        match self {
            Token::Index(i) => i < len.max(1),
            Token::All | Token::Reduce(_) => len > 1,
        }
    }
}

/// Every token a dimension of length `len` accepts
///
/// `all`, the indices `0..len` and the eight reductions; only `0` for a
/// dimension of length one.
pub fn valid_tokens(len: usize) -> Vec<Token> {
    if len <= 1 {
        return vec![Token::Index(0)];
    }
    std::iter::once(Token::All)
        .chain((0..len).map(Token::Index))
        .chain(ReduceOp::ALL.into_iter().map(Token::Reduce))
        .collect()
}

/// Tooltip text describing the tokens of a dimension
pub fn token_hint(len: usize) -> String {
    if len > 1 {
        let ops: Vec<&str> = ReduceOp::ALL.iter().map(|op| op.as_str()).collect();
        format!(
            "Specific dimension value: 0-{}\nor arithmetic operation on axis:\n  {}",
            len - 1,
            ops.join(", ")
        )
    } else {
        "Single dimension: 0".to_string()
    }
}

/// Parse a comma separated token list such as `"all,mean,2"`
///
/// # Errors
///
/// Returns an error for any token that does not parse.
pub fn parse_tokens(text: &str) -> Result<Vec<Token>> {
    text.split(',').map(str::parse).collect()
}

/// Initial token policy applied when a selector is rebuilt
///
/// Preferred dimensions get `all`; further dimensions longer than one get
/// `all` until `max_all` dimensions are selected; excluded and remaining
/// dimensions start at index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorDefaults {
    preferred: Vec<String>,
    excluded: Vec<String>,
    max_all: usize,
}

fn non_empty(names: &[&str]) -> Vec<String> {
    names
        .iter()
        .filter(|n| !n.is_empty())
        .map(|n| (*n).to_string())
        .collect()
}

impl SelectorDefaults {
    /// Line plots: the unlimited dimension, else the first dimension longer
    /// than one
    pub fn line(unlimited: &str) -> Self {
        Self {
            preferred: non_empty(&[unlimited]),
            excluded: Vec::new(),
            max_all: 1,
        }
    }

    /// Surface plots: the unlimited dimension plus one more
    pub fn surface(unlimited: &str) -> Self {
        Self {
            max_all: 2,
            ..Self::line(unlimited)
        }
    }

    /// Maps: latitude and longitude dimensions, never the unlimited one
    pub fn map(lat_dim: &str, lon_dim: &str, unlimited: &str) -> Self {
        Self {
            preferred: non_empty(&[lat_dim, lon_dim]),
            excluded: non_empty(&[unlimited]),
            max_all: 2,
        }
    }

    /// Coordinate variables: every dimension longer than one
    pub fn coordinate() -> Self {
        Self {
            preferred: Vec::new(),
            excluded: Vec::new(),
            max_all: usize::MAX,
        }
    }

    /// Initial tokens for a variable with the given dimensions
    pub fn initial_tokens(&self, dims: &[(String, usize)]) -> Vec<Token> {
        let mut tokens = vec![Token::Index(0); dims.len()];
        let mut n_all = 0;
        for (token, (name, _)) in tokens.iter_mut().zip(dims) {
            if self.preferred.contains(name) {
                *token = Token::All;
                n_all += 1;
            }
        }
        for (token, (name, len)) in tokens.iter_mut().zip(dims) {
            if self.preferred.contains(name) || self.excluded.contains(name) {
                continue;
            }
            if n_all < self.max_all && *len > 1 {
                *token = Token::All;
                n_all += 1;
            }
        }
        tokens
    }
}

/// Token state of one display axis
///
/// Holds one token per dimension of the bound variable and is rebuilt
/// whenever the variable changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisSelector {
    label: Option<String>,
    dims: Vec<(String, usize)>,
    tokens: Vec<Token>,
}

impl AxisSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the selector to a variable and reset its tokens
    pub fn rebuild(&mut self, label: &str, var: &VariableInfo, defaults: &SelectorDefaults) {
        self.label = Some(label.to_string());
        self.dims = var.dim_pairs();
        self.tokens = defaults.initial_tokens(&self.dims);
        debug!(label, tokens = ?self.tokens, "selector rebuilt");
    }

    /// Unbind the selector
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Set the token of one dimension
    ///
    /// # Errors
    ///
    /// Returns [`NcSliceError::InvalidArgument`] if the dimension does not
    /// exist or the token is not valid for its length.
    pub fn set(&mut self, axis: usize, token: Token) -> Result<()> {
        let (name, len) = self.dims.get(axis).ok_or_else(|| {
            NcSliceError::invalid(format!(
                "selector has {} dimensions, cannot set dimension {axis}",
                self.dims.len()
            ))
        })?;
        if !token.is_valid_for(*len) {
            return Err(NcSliceError::invalid(format!(
                "token '{token}' not valid for dimension '{name}' of length {len}"
            )));
        }
        self.tokens[axis] = token;
        Ok(())
    }

    /// Set all tokens at once
    ///
    /// # Errors
    ///
    /// Returns an error if the count differs from the rank or a token is not
    /// valid for its dimension.
    pub fn set_all(&mut self, tokens: &[Token]) -> Result<()> {
        if tokens.len() != self.dims.len() {
            return Err(NcSliceError::invalid(format!(
                "{} tokens given for {} dimensions",
                tokens.len(),
                self.dims.len()
            )));
        }
        for (axis, token) in tokens.iter().enumerate() {
            self.set(axis, *token)?;
        }
        Ok(())
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn dims(&self) -> &[(String, usize)] {
        &self.dims
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// One tooltip per dimension
    pub fn hints(&self) -> Vec<String> {
        self.dims.iter().map(|(_, len)| token_hint(*len)).collect()
    }
}

/// Hyperslab ranges selected by `tokens` on a variable of the given shape
fn selection_ranges(shape: &[usize], tokens: &[Token]) -> Result<Vec<Range<usize>>> {
    if tokens.len() != shape.len() {
        return Err(NcSliceError::invalid(format!(
            "{} selector tokens given for a variable of rank {}",
            tokens.len(),
            shape.len()
        )));
    }
    shape
        .iter()
        .zip(tokens)
        .enumerate()
        .map(|(axis, (&len, token))| match *token {
            Token::All | Token::Reduce(_) => Ok(0..len),
            Token::Index(i) if i < len => Ok(i..i + 1),
            Token::Index(i) => Err(NcSliceError::invalid(format!(
                "index {i} out of range for dimension {axis} of length {len}"
            ))),
        })
        .collect()
}

/// Fold tokens into an array that was read with [`Token::Index`] dimensions
/// already narrowed to length one
///
/// Reductions are applied from the rightmost dimension to the left, then the
/// index dimensions are dropped.
///
/// # Errors
///
/// Returns an error if the token count differs from the array rank.
pub fn collapse(data: ArrayD<f64>, tokens: &[Token]) -> Result<ArrayD<f64>> {
    if tokens.len() != data.ndim() {
        return Err(NcSliceError::invalid(format!(
            "{} selector tokens given for an array of rank {}",
            tokens.len(),
            data.ndim()
        )));
    }
    let mut out = data;
    for (axis, token) in tokens.iter().enumerate().rev() {
        if let Token::Reduce(op) = token {
            out = out.reduce_along_axis(axis, *op)?;
        }
    }
    let kept: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(t, Token::Reduce(_)))
        .collect();
    for (axis, token) in kept.iter().enumerate().rev() {
        if let Token::Index(_) = token {
            out = out.index_axis_move(Axis(axis), 0);
        }
    }
    Ok(out)
}

/// Select from an in-memory array
///
/// # Errors
///
/// Returns an error if the tokens do not fit the array.
pub fn select(data: &ArrayD<f64>, tokens: &[Token]) -> Result<ArrayD<f64>> {
    let ranges = selection_ranges(data.shape(), tokens)?;
    let narrowed = data
        .slice_each_axis(|ax| ndarray::Slice::from(ranges[ax.axis.index()].clone()))
        .to_owned();
    collapse(narrowed, tokens)
}

/// Evaluate selector tokens on a variable
///
/// The result is squeezed for display: length-1 dimensions are dropped
/// from multi-dimensional results and a fully indexed selection yields `[NaN]`.
///
/// # Errors
///
/// Returns [`NcSliceError::InvalidArgument`] if the token count differs from
/// the variable's rank or an index is out of range, and any read error of
/// the handle.
pub fn evaluate_slice(handle: &dyn DatasetHandle, name: &str, tokens: &[Token]) -> Result<ArrayD<f64>> {
    evaluate_slice_with(handle, name, tokens, &[])
}

/// Evaluate selector tokens, replacing missing values before any reduction
///
/// # Errors
///
/// See [`evaluate_slice`].
pub fn evaluate_slice_with(
    handle: &dyn DatasetHandle,
    name: &str,
    tokens: &[Token],
    missing: &[MissingValue],
) -> Result<ArrayD<f64>> {
    let var = handle
        .variable(name)
        .ok_or_else(|| NcSliceError::VariableNotFound {
            var: name.to_string(),
        })?;
    if var.rank() == 0 {
        if !tokens.is_empty() {
            return Err(NcSliceError::invalid(format!(
                "{} selector tokens given for scalar variable '{name}'",
                tokens.len()
            )));
        }
        return Ok(ArrayD::zeros(IxDyn(&[0])));
    }
    let ranges = selection_ranges(&var.shape(), tokens)?;
    let raw = handle.read(name, &ranges)?;
    let collapsed = collapse(substitute(raw, missing), tokens)?;
    Ok(squeeze_for_display(collapsed, f64::NAN))
}

/// Squeeze an evaluated slice for display
///
/// Arrays of rank above one lose all dimensions of length one; a result
/// without any dimension becomes `[NaN]`.
pub fn squeeze_for_display<T: Clone>(data: ArrayD<T>, invalid: T) -> ArrayD<T> {
    let mut out = data;
    if out.ndim() > 1 {
        for axis in (0..out.ndim()).rev() {
            if out.len_of(Axis(axis)) == 1 {
                out = out.index_axis_move(Axis(axis), 0);
            }
        }
    }
    if out.ndim() == 0 {
        return ArrayD::from_elem(IxDyn(&[1]), invalid);
    }
    out
}
