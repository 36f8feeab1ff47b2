use ndarray::{ArrayD, IxDyn};

use crate::core::{FGBuilderError, FGBuilderResult, Factor, MAX_FACTOR_DEGREE};

/// A conditional probability table p(node | parents) of a boolean node.
/// Arguments of the factor are the parents followed by the node itself
#[derive(Debug, Clone, PartialEq)]
pub struct Cpt {
    parents_number: usize,
    p_true: Vec<f64>,
}

impl Cpt {
    /// Creates a prior p(node) of a node without parents
    ///
    /// # Arguments
    ///
    /// * `p_true` - Probability of the node being true
    #[inline]
    pub fn prior(p_true: f64) -> FGBuilderResult<Self> {
        Cpt::new(0, vec![p_true])
    }

    /// Creates a conditional probability table
    ///
    /// # Arguments
    ///
    /// * `parents_number` - A number of parents
    /// * `p_true` - Probabilities of the node being true, one per configuration of parents.
    ///     Configurations are ordered with the first parent as the most significant one and
    ///     `true` before `false`, i.e. `tt`, `tf`, `ft`, `ff` for two parents
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::bayes::Cpt;
    /// use fgsp::core::Factor;
    ///
    /// // p(cancer | pollution, smoker)
    /// let cancer = Cpt::new(2, vec![0.05, 0.02, 0.03, 0.001]).unwrap();
    /// assert_eq!(cancer.degree(), 3);
    /// assert_eq!(cancer.eval(&[false, true, true]), Some(0.03));
    /// assert!((cancer.eval(&[false, false, false]).unwrap() - 0.999).abs() < 1e-12);
    /// ```
    pub fn new(parents_number: usize, p_true: Vec<f64>) -> FGBuilderResult<Self> {
        if parents_number >= MAX_FACTOR_DEGREE {
            return Err(FGBuilderError::InvalidTable(format!(
                "{} parents exceed the maximal factor degree",
                parents_number
            )));
        }
        if p_true.len() != 1 << parents_number {
            return Err(FGBuilderError::InvalidTable(format!(
                "{} parents require {} probabilities, got {}",
                parents_number,
                1usize << parents_number,
                p_true.len()
            )));
        }
        if let Some(p) = p_true.iter().find(|p| !(0f64..=1f64).contains(*p)) {
            return Err(FGBuilderError::InvalidTable(format!(
                "probabilities must lie in [0, 1], got {}",
                p
            )));
        }
        Ok(Cpt {
            parents_number,
            p_true,
        })
    }

    /// Returns a number of parents
    #[inline]
    pub fn parents_number(&self) -> usize {
        self.parents_number
    }

    /// Returns the table of the factor, index 0 along an axis stands for `true`
    pub fn table(&self) -> ArrayD<f64> {
        ArrayD::from_shape_fn(IxDyn(&vec![2; self.parents_number + 1]), |index| {
            let args: Vec<bool> = (0..=self.parents_number).map(|i| index[i] == 0).collect();
            self.probability(&args)
        })
    }

    #[inline(always)]
    fn probability(&self, args: &[bool]) -> f64 {
        let (node, parents) = (args[self.parents_number], &args[..self.parents_number]);
        let configuration = parents
            .iter()
            .fold(0usize, |acc, parent| (acc << 1) | usize::from(!*parent));
        let p_true = self.p_true[configuration];
        if node {
            p_true
        } else {
            1f64 - p_true
        }
    }
}

impl Factor for Cpt {
    #[inline(always)]
    fn degree(&self) -> usize {
        self.parents_number + 1
    }

    #[inline]
    fn eval(&self, args: &[bool]) -> Option<f64> {
        if args.len() == self.degree() {
            Some(self.probability(args))
        } else {
            None
        }
    }
}
