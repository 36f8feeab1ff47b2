use log::debug;

use crate::bayes::cpt::Cpt;
use crate::core::{FGBuilderError, FGBuilderResult, Factor, FactorGraph, FactorGraphBuilder};

/// Returns the name of the factor holding p(node | parents), e.g. `p(C|P,S)`
#[inline]
pub fn factor_name(node: &str, parents: &[&str]) -> String {
    if parents.is_empty() {
        format!("p({})", node)
    } else {
        format!("p({}|{})", node, parents.join(","))
    }
}

/// A builder of the factor graph of a Bayesian network. Every node
/// becomes a variable and its conditional probability table becomes
/// a factor over the node and its parents
#[derive(Debug, Default)]
pub struct BayesNetBuilder {
    fgb: FactorGraphBuilder<Cpt>,
}

impl BayesNetBuilder {
    /// Creates an empty network
    #[inline]
    pub fn new() -> Self {
        BayesNetBuilder {
            fgb: FactorGraphBuilder::new(),
        }
    }

    /// Adds a node to a network
    ///
    /// # Arguments
    ///
    /// * `name` - A unique name of a node
    /// * `parents` - Names of previously added nodes the node depends on
    /// * `cpt` - A table p(node | parents)
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::bayes::{BayesNetBuilder, Cpt};
    ///
    /// let mut bnb = BayesNetBuilder::new();
    /// bnb.add_node("P", &[], Cpt::prior(0.1).unwrap()).unwrap();
    /// bnb.add_node("S", &[], Cpt::prior(0.3).unwrap()).unwrap();
    /// bnb.add_node("C", &["P", "S"], Cpt::new(2, vec![0.05, 0.02, 0.03, 0.001]).unwrap()).unwrap();
    /// let fg = bnb.build().unwrap();
    /// assert_eq!(fg.factor_names(), vec!["p(P)", "p(S)", "p(C|P,S)"]);
    ///
    /// let result = fg.propagate().unwrap();
    /// let p_c = result.marginal("C", true).unwrap();
    /// assert!((p_c - 0.01163).abs() < 1e-12);
    /// ```
    pub fn add_node(&mut self, name: &str, parents: &[&str], cpt: Cpt) -> FGBuilderResult<()> {
        let factor = factor_name(name, parents);
        let mut args: Vec<&str> = parents.to_vec();
        args.push(name);
        if cpt.parents_number() != parents.len() {
            return Err(FGBuilderError::DegreeError(
                cpt.degree(),
                args.iter().map(|x| x.to_string()).collect(),
            ));
        }
        for (i, parent) in parents.iter().enumerate() {
            if !self.fgb.has_variable(parent) {
                return Err(FGBuilderError::UnknownVariable(factor, parent.to_string()));
            }
            if parents[..i].contains(parent) {
                return Err(FGBuilderError::RepeatedArgument(factor, parent.to_string()));
            }
        }
        self.fgb.add_variable(name)?;
        self.fgb.add_factor(&factor, cpt, &args)?;
        debug!("Added node {} with the factor {}", name, factor);
        Ok(())
    }

    /// Validates and returns the factor graph of a network.
    /// A network must be a polytree, otherwise its factor graph has cycles
    #[inline]
    pub fn build(self) -> FGBuilderResult<FactorGraph<Cpt>> {
        self.fgb.build()
    }
}
