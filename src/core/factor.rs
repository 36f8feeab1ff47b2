use ndarray::{ArrayD, IxDyn};
use std::fmt::Debug;

use crate::core::factor_graph_builder::{FGBuilderError, FGBuilderResult};

pub trait Factor: Debug + Send + Sync {
    /// Returns a degree of a factor (number of adjoint variables)
    fn degree(&self) -> usize;

    /// Evaluates a factor
    ///
    /// # Arguments
    ///
    /// * `args` - Values of adjoint variables
    ///
    /// # Notes
    ///
    /// args[0] corresponds to the value of the first variable,
    /// args[1] corresponds to the value of the second variable,
    /// etc. The method returns None if the factor has no entry for
    /// the given combination of values
    fn eval(&self, args: &[bool]) -> Option<f64>;
}

impl Factor for Box<dyn Factor> {
    #[inline(always)]
    fn degree(&self) -> usize {
        (**self).degree()
    }

    #[inline(always)]
    fn eval(&self, args: &[bool]) -> Option<f64> {
        (**self).eval(args)
    }
}

// ------------------------------------------------------------------------------------------

/// A factor given by a table of shape [2, 2, ..., 2], where index 0
/// along an axis stands for `true` and index 1 stands for `false`
#[derive(Debug, Clone)]
pub struct TableFactor(ArrayD<f64>);

impl TableFactor {
    /// Creates a new table factor
    ///
    /// # Arguments
    ///
    /// * `table` - A table of non-negative finite numbers, each axis must be of size 2
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::core::{Factor, TableFactor};
    /// use ndarray::array;
    ///
    /// let factor = TableFactor::new(array![[0.9, 0.1], [0.2, 0.8]].into_dyn()).unwrap();
    /// assert_eq!(factor.degree(), 2);
    /// assert_eq!(factor.eval(&[false, true]), Some(0.2));
    /// ```
    pub fn new(table: ArrayD<f64>) -> FGBuilderResult<Self> {
        if table.shape().iter().any(|&size| size != 2) {
            return Err(FGBuilderError::InvalidTable(format!(
                "every axis must be of size 2, got shape {:?}",
                table.shape()
            )));
        }
        if let Some(value) = table.iter().find(|x| !x.is_finite() || **x < 0f64) {
            return Err(FGBuilderError::InvalidTable(format!(
                "entries must be finite and non-negative, got {}",
                value
            )));
        }
        Ok(TableFactor(table))
    }

    /// Returns the underlying table
    #[inline]
    pub fn table(&self) -> &ArrayD<f64> {
        &self.0
    }
}

impl Factor for TableFactor {
    #[inline(always)]
    fn degree(&self) -> usize {
        self.0.ndim()
    }

    #[inline]
    fn eval(&self, args: &[bool]) -> Option<f64> {
        if args.len() != self.0.ndim() {
            return None;
        }
        let index: Vec<usize> = args.iter().map(|x| usize::from(!*x)).collect();
        self.0.get(IxDyn(&index)).copied()
    }
}

// ------------------------------------------------------------------------------------------

/// A factor given by an arbitrary function of its arguments
pub struct FnFactor<G>
where
    G: Fn(&[bool]) -> Option<f64> + Send + Sync,
{
    degree: usize,
    func: G,
}

impl<G> FnFactor<G>
where
    G: Fn(&[bool]) -> Option<f64> + Send + Sync,
{
    /// Wraps a function into a factor
    ///
    /// # Arguments
    ///
    /// * `degree` - A number of arguments the function takes
    /// * `func` - A function of arguments' values
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::core::{Factor, FnFactor};
    ///
    /// let prior = FnFactor::new(1, |args: &[bool]| Some(if args[0] { 0.3 } else { 0.7 }));
    /// assert_eq!(prior.eval(&[true]), Some(0.3));
    /// ```
    #[inline]
    pub fn new(degree: usize, func: G) -> Self {
        FnFactor { degree, func }
    }
}

impl<G> Debug for FnFactor<G>
where
    G: Fn(&[bool]) -> Option<f64> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFactor")
            .field("degree", &self.degree)
            .finish_non_exhaustive()
    }
}

impl<G> Factor for FnFactor<G>
where
    G: Fn(&[bool]) -> Option<f64> + Send + Sync,
{
    #[inline(always)]
    fn degree(&self) -> usize {
        self.degree
    }

    #[inline(always)]
    fn eval(&self, args: &[bool]) -> Option<f64> {
        (self.func)(args)
    }
}
