use std::{collections::HashMap, error::Error, fmt::Display};

use log::debug;

use crate::core::{
    factor::Factor,
    factor_graph::{FactorGraph, NodeId},
    factor_node::FactorNode,
    variable_node::VariableNode,
};

// ------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
/// Errors that could appear in factor graph builder's methods
pub enum FGBuilderError {
    /// A variable or a factor with this name has already been added
    DuplicateName(String),

    /// A factor (first) refers to a variable (second) that has not been added
    UnknownVariable(String, String),

    /// Degree of a factor does not match a number of adjacent variables
    DegreeError(usize, Vec<String>),

    /// Degree of a factor exceeds `MAX_FACTOR_DEGREE`
    DegreeTooLarge(String, usize),

    /// A factor does not depend on any variable
    EmptyFactor(String),

    /// A factor (first) mentions the same variable (second) more than once
    RepeatedArgument(String, String),

    /// A table does not define a valid factor
    InvalidTable(String),

    /// A node reachable from itself through a cycle
    CyclicGraph(String),

    /// Number of connected components of a graph that is not connected
    DisconnectedGraph(usize),
}

impl Display for FGBuilderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FGBuilderError::DuplicateName(name) => {
                write!(f, "Node with name {} has already been added", name)
            }
            FGBuilderError::UnknownVariable(factor, variable) => write!(
                f,
                "Factor {} refers to the variable {} that has not been added",
                factor, variable,
            ),
            FGBuilderError::DegreeError(deg, vars) => write!(
                f,
                "Degree of a factor does not match the number of variables. The factor's degree: {}, the variables list {:?}",
                deg,
                vars,
            ),
            FGBuilderError::DegreeTooLarge(factor, deg) => write!(
                f,
                "Factor {} has degree {}, but the maximal supported degree is {}",
                factor, deg, MAX_FACTOR_DEGREE,
            ),
            FGBuilderError::EmptyFactor(factor) => {
                write!(f, "Factor {} must depend on at least one variable", factor)
            }
            FGBuilderError::RepeatedArgument(factor, variable) => write!(
                f,
                "Factor {} mentions the variable {} more than once",
                factor, variable,
            ),
            FGBuilderError::InvalidTable(reason) => write!(f, "Invalid factor table: {}", reason),
            FGBuilderError::CyclicGraph(name) => write!(
                f,
                "Factor graph contains a cycle passing through the node {}",
                name,
            ),
            FGBuilderError::DisconnectedGraph(components) => write!(
                f,
                "Factor graph must be connected, but it has {} connected components",
                components,
            ),
        }
    }
}

impl Error for FGBuilderError {}

/// Maximal number of variables a factor can depend on
pub const MAX_FACTOR_DEGREE: usize = 32;

/// Factor graph builder's methods result type
pub type FGBuilderResult<T> = Result<T, FGBuilderError>;

// public methods ---------------------------------------------------------------------------

#[derive(Debug)]
/// A factor graph builder
pub struct FactorGraphBuilder<F: Factor> {
    factors: Vec<FactorNode<F>>,
    variables: Vec<VariableNode>,
    variable_indices: HashMap<String, usize>,
    factor_indices: HashMap<String, usize>,
}

impl<F: Factor> Default for FactorGraphBuilder<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Factor> FactorGraphBuilder<F> {
    /// Creates an empty factor graph
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::core::{FactorGraphBuilder, TableFactor};
    ///
    /// let fgb = FactorGraphBuilder::<TableFactor>::new();
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Creates an empty factor graph with preallocated memory
    ///
    /// # Arguments
    ///
    /// * `variables_capacity` - A number of variables we need to preallocate memory for
    /// * `factors_capacity` - A number of factors we need to preallocate memory for
    #[inline]
    pub fn with_capacity(variables_capacity: usize, factors_capacity: usize) -> Self {
        FactorGraphBuilder {
            factors: Vec::with_capacity(factors_capacity),
            variables: Vec::with_capacity(variables_capacity),
            variable_indices: HashMap::with_capacity(variables_capacity),
            factor_indices: HashMap::with_capacity(factors_capacity),
        }
    }

    /// Adds a variable to a factor graph and returns its index
    ///
    /// # Arguments
    ///
    /// * `name` - A unique name of a variable
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::core::{FactorGraphBuilder, TableFactor};
    ///
    /// let mut fgb = FactorGraphBuilder::<TableFactor>::new();
    /// assert_eq!(fgb.add_variable("x1").unwrap(), 0);
    /// assert_eq!(fgb.add_variable("x2").unwrap(), 1);
    /// assert!(fgb.add_variable("x1").is_err());
    /// ```
    pub fn add_variable(&mut self, name: &str) -> FGBuilderResult<usize> {
        if self.variable_indices.contains_key(name) {
            return Err(FGBuilderError::DuplicateName(name.to_owned()));
        }
        let index = self.variables.len();
        self.variables
            .push(VariableNode::new_disconnected(name.to_owned()));
        self.variable_indices.insert(name.to_owned(), index);
        Ok(index)
    }

    /// Adds a factor to a factor graph and returns its index
    ///
    /// # Arguments
    ///
    /// * `name` - A unique name of a factor
    /// * `factor` - A new factor
    /// * `arg_names` - Names of adjoint variables in the order the factor takes them
    ///
    /// # Notes
    ///
    /// A factor of degree zero is rejected. If number of `arg_names` does not
    /// match a factor degree, the method returns an error. If a name from `arg_names` does not belong to
    /// a previously added variable, the method returns an error
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::core::{FactorGraphBuilder, TableFactor};
    /// use ndarray::array;
    ///
    /// let mut fgb = FactorGraphBuilder::<TableFactor>::new();
    /// fgb.add_variable("c").unwrap();
    /// fgb.add_variable("x").unwrap();
    /// let xray = TableFactor::new(array![[0.9, 0.1], [0.2, 0.8]].into_dyn()).unwrap();
    /// assert_eq!(fgb.add_factor("fx", xray.clone(), &["c", "x"]).unwrap(), 0);
    /// assert!(fgb.add_factor("fy", xray, &["c", "y"]).is_err());
    /// ```
    pub fn add_factor(&mut self, name: &str, factor: F, arg_names: &[&str]) -> FGBuilderResult<usize> {
        if self.factor_indices.contains_key(name) {
            return Err(FGBuilderError::DuplicateName(name.to_owned()));
        }
        if factor.degree() == 0 {
            return Err(FGBuilderError::EmptyFactor(name.to_owned()));
        }
        if factor.degree() != arg_names.len() {
            return Err(FGBuilderError::DegreeError(
                factor.degree(),
                arg_names.iter().map(|x| x.to_string()).collect(),
            ));
        }
        if factor.degree() > MAX_FACTOR_DEGREE {
            return Err(FGBuilderError::DegreeTooLarge(name.to_owned(), factor.degree()));
        }
        let mut var_indices = Vec::with_capacity(arg_names.len());
        for arg_name in arg_names {
            let index = if let Some(index) = self.variable_indices.get(*arg_name) {
                *index
            } else {
                return Err(FGBuilderError::UnknownVariable(
                    name.to_owned(),
                    arg_name.to_string(),
                ));
            };
            if var_indices.contains(&index) {
                return Err(FGBuilderError::RepeatedArgument(
                    name.to_owned(),
                    arg_name.to_string(),
                ));
            }
            var_indices.push(index);
        }
        let factor_index = self.factors.len();
        let mut factor_node = FactorNode::new_disconnected(name.to_owned(), factor);
        for (position, var_index) in var_indices.into_iter().enumerate() {
            let variable = &mut self.variables[var_index];
            factor_node.var_node_indices.push(var_index);
            factor_node
                .var_node_receiver_indices
                .push(variable.fac_node_indices.len());
            variable.fac_node_indices.push(factor_index);
            variable.fac_node_receiver_indices.push(position);
        }
        self.factors.push(factor_node);
        self.factor_indices.insert(name.to_owned(), factor_index);
        Ok(factor_index)
    }

    /// Checks that a factor graph is a tree
    ///
    /// # Notes
    ///
    /// Returns an error if a depth-first traversal revisits a node through an
    /// edge other than the one it came from, or if the graph consists of more
    /// than one connected component. An empty graph is a valid one
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::core::{FactorGraphBuilder, FGBuilderError, FnFactor};
    ///
    /// let uniform = |_: &[bool]| Some(1.);
    /// let mut fgb = FactorGraphBuilder::new();
    /// fgb.add_variable("a").unwrap();
    /// fgb.add_variable("b").unwrap();
    /// fgb.add_factor("f1", FnFactor::new(2, uniform), &["a", "b"]).unwrap();
    /// assert!(fgb.validate().is_ok());
    /// fgb.add_factor("f2", FnFactor::new(2, uniform), &["b", "a"]).unwrap();
    /// assert!(matches!(fgb.validate(), Err(FGBuilderError::CyclicGraph(_))));
    /// ```
    pub fn validate(&self) -> FGBuilderResult<()> {
        let mut visited_variables = vec![false; self.variables.len()];
        let mut visited_factors = vec![false; self.factors.len()];
        let mut components = 0;
        let mut stack = Vec::new();
        let starts = (0..self.variables.len())
            .map(NodeId::Variable)
            .chain((0..self.factors.len()).map(NodeId::Factor));
        for start in starts {
            if is_visited(&visited_variables, &visited_factors, start) {
                continue;
            }
            components += 1;
            mark_visited(&mut visited_variables, &mut visited_factors, start);
            stack.push((start, None));
            while let Some((node, parent)) = stack.pop() {
                for neighbor in neighbor_ids(&self.variables, &self.factors, node) {
                    if Some(neighbor) == parent {
                        continue;
                    }
                    if is_visited(&visited_variables, &visited_factors, neighbor) {
                        return Err(FGBuilderError::CyclicGraph(self.node_name(neighbor).to_owned()));
                    }
                    mark_visited(&mut visited_variables, &mut visited_factors, neighbor);
                    stack.push((neighbor, Some(node)));
                }
            }
        }
        if components > 1 {
            return Err(FGBuilderError::DisconnectedGraph(components));
        }
        Ok(())
    }

    /// Checks whether a variable with this name has been added
    #[inline]
    pub fn has_variable(&self, name: &str) -> bool {
        self.variable_indices.contains_key(name)
    }

    /// Validates and returns a factor graph
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::core::{FactorGraphBuilder, FnFactor};
    ///
    /// let coupling = |args: &[bool]| Some(if args[0] == args[1] { 0.8 } else { 0.2 });
    /// let mut fgb = FactorGraphBuilder::new();
    /// for name in ["x1", "x2", "x3"] {
    ///     fgb.add_variable(name).unwrap();
    /// }
    /// fgb.add_factor("f12", FnFactor::new(2, coupling), &["x1", "x2"]).unwrap();
    /// fgb.add_factor("f23", FnFactor::new(2, coupling), &["x2", "x3"]).unwrap();
    /// let fg = fgb.build().unwrap();
    /// assert_eq!(fg.get_variable_degrees(), vec![1, 2, 1]);
    /// ```
    pub fn build(self) -> FGBuilderResult<FactorGraph<F>> {
        self.validate()?;
        debug!(
            "Built a factor graph with {} variables and {} factors",
            self.variables.len(),
            self.factors.len(),
        );
        Ok(FactorGraph {
            factors: self.factors,
            variables: self.variables,
            variable_indices: self.variable_indices,
            factor_indices: self.factor_indices,
        })
    }
}

// private methods --------------------------------------------------------------------------

impl<F: Factor> FactorGraphBuilder<F> {
    #[inline(always)]
    fn node_name(&self, node: NodeId) -> &str {
        match node {
            NodeId::Variable(index) => &self.variables[index].name,
            NodeId::Factor(index) => &self.factors[index].name,
        }
    }
}

#[inline(always)]
fn is_visited(visited_variables: &[bool], visited_factors: &[bool], node: NodeId) -> bool {
    match node {
        NodeId::Variable(index) => visited_variables[index],
        NodeId::Factor(index) => visited_factors[index],
    }
}

#[inline(always)]
fn mark_visited(visited_variables: &mut [bool], visited_factors: &mut [bool], node: NodeId) {
    match node {
        NodeId::Variable(index) => visited_variables[index] = true,
        NodeId::Factor(index) => visited_factors[index] = true,
    }
}

/// Neighbors of a node in edge insertion order
#[inline]
pub(crate) fn neighbor_ids<F: Factor>(
    variables: &[VariableNode],
    factors: &[FactorNode<F>],
    node: NodeId,
) -> Vec<NodeId> {
    match node {
        NodeId::Variable(index) => variables[index]
            .fac_node_indices
            .iter()
            .map(|x| NodeId::Factor(*x))
            .collect(),
        NodeId::Factor(index) => factors[index]
            .var_node_indices
            .iter()
            .map(|x| NodeId::Variable(*x))
            .collect(),
    }
}
