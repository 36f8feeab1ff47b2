/// A module containing general logic of tree factor graphs and the sum-product algorithm
pub mod core;
/// A module converting Bayesian networks over boolean variables into factor graphs
pub mod bayes;

#[cfg(test)]
mod tests;
