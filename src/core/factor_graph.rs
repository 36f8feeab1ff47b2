use std::{collections::HashMap, error::Error, fmt::Display};

use log::info;
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::core::{
    evaluator::{new_memo, Evaluator},
    factor::Factor,
    factor_graph_builder::neighbor_ids,
    factor_node::FactorNode,
    message::MessageStore,
    propagation::PropagationResult,
    scheduler::two_pass_schedule,
    variable_node::VariableNode,
};

// ------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Errors that could appear in factor graph's methods
pub enum FGError {
    /// There is no variable with this name
    UnknownVariable(String),

    /// There is no node with this identifier
    UnknownNode(String),

    /// A node attempted to send a message before it received all the messages it depends on
    NotReady {
        /// Sender of a message
        source: String,

        /// Receiver of a message
        destination: String,

        /// Neighbor of a sender whose message has not arrived yet
        missing: String,
    },

    /// A message along the same directed edge has already been sent during this run
    MessageAlreadySent {
        /// Sender of a message
        source: String,

        /// Receiver of a message
        destination: String,
    },

    /// A factor has no value for a combination of its arguments
    UndefinedFactorEntry {
        /// Name of a factor
        factor: String,

        /// Values of the factor's arguments
        args: Vec<bool>,
    },

    /// A factor returned a negative or non-finite value
    InvalidFactorValue {
        /// Name of a factor
        factor: String,

        /// Returned value
        value: f64,
    },

    /// A variable is observed with two different values
    ConflictingEvidence(String),

    /// Unnormalized marginal of a variable is zero for both values
    ZeroMarginal(String),

    /// Unnormalized marginal of a variable exceeds the range of `f64`
    OverflowedMarginal(String),
}

impl Display for FGError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FGError::UnknownVariable(name) => write!(f, "There is no variable with name {}", name),
            FGError::UnknownNode(node) => write!(f, "There is no node {}", node),
            FGError::NotReady {
                source,
                destination,
                missing,
            } => write!(
                f,
                "Node {} can not send a message to {} before it receives a message from {}. This is a scheduling bug",
                source, destination, missing,
            ),
            FGError::MessageAlreadySent { source, destination } => write!(
                f,
                "Message {} -> {} has already been sent. This is a scheduling bug",
                source, destination,
            ),
            FGError::UndefinedFactorEntry { factor, args } => write!(
                f,
                "Factor {} is undefined for arguments {:?}",
                factor, args,
            ),
            FGError::InvalidFactorValue { factor, value } => write!(
                f,
                "Factor {} returned {}, but factor values must be finite and non-negative",
                factor, value,
            ),
            FGError::ConflictingEvidence(name) => write!(
                f,
                "Variable {} is observed with two different values",
                name,
            ),
            FGError::ZeroMarginal(name) => write!(
                f,
                "Marginal of the variable {} can not be normalized, evidence has zero probability",
                name,
            ),
            FGError::OverflowedMarginal(name) => write!(
                f,
                "Marginal of the variable {} is not finite, rescale factors of the graph",
                name,
            ),
        }
    }
}

impl Error for FGError {}

/// Factor graph's methods result type
pub type FGResult<T> = Result<T, FGError>;

/// Information returned after a successful propagation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationInfo {
    /// Name of a node the schedule was rooted at
    pub root: Option<String>,

    /// Number of messages sent, two per edge
    pub messages_number: usize,

    /// Number of schedule steps, messages within one step are independent
    pub steps_number: usize,

    /// Whether messages were evaluated in parallel
    pub parallel: bool,
}

impl Display for PropagationInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Propagation from {} has sent {} messages in {} steps",
            self.root.as_deref().unwrap_or("<empty graph>"),
            self.messages_number,
            self.steps_number,
        )
    }
}

// ------------------------------------------------------------------------------------------

/// Identifier of a node of a factor graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeId {
    Variable(usize),
    Factor(usize),
}

/// A factor graph that is a tree
#[derive(Debug, Clone)]
pub struct FactorGraph<F: Factor> {
    pub(crate) factors: Vec<FactorNode<F>>,
    pub(crate) variables: Vec<VariableNode>,
    pub(crate) variable_indices: HashMap<String, usize>,
    pub(crate) factor_indices: HashMap<String, usize>,
}

impl<F: Factor> FactorGraph<F> {
    /// Returns degree (number of adjoint factors) of each variable
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::core::{FactorGraphBuilder, FnFactor};
    ///
    /// let mut fgb = FactorGraphBuilder::new();
    /// fgb.add_variable("x1").unwrap();
    /// fgb.add_variable("x2").unwrap();
    /// fgb.add_factor("f", FnFactor::new(2, |_: &[bool]| Some(1.)), &["x1", "x2"]).unwrap();
    /// let fg = fgb.build().unwrap();
    /// assert_eq!(fg.get_variable_degrees(), vec![1, 1]);
    /// assert_eq!(fg.get_factor_degrees(), vec![2]);
    /// ```
    #[inline]
    pub fn get_variable_degrees(&self) -> Vec<usize> {
        self.variables.iter().map(|x| x.degree()).collect()
    }

    /// Returns degree (number of adjoint variables) of each factor
    /// in order they were added to a factor graph
    #[inline]
    pub fn get_factor_degrees(&self) -> Vec<usize> {
        self.factors.iter().map(|x| x.degree()).collect()
    }

    /// Returns names of variables in order they were added
    #[inline]
    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|x| x.name.as_str()).collect()
    }

    /// Returns names of factors in order they were added
    #[inline]
    pub fn factor_names(&self) -> Vec<&str> {
        self.factors.iter().map(|x| x.name.as_str()).collect()
    }

    /// Returns an identifier of a variable node
    #[inline]
    pub fn variable_id(&self, name: &str) -> Option<NodeId> {
        self.variable_indices.get(name).map(|x| NodeId::Variable(*x))
    }

    /// Returns an identifier of a factor node
    #[inline]
    pub fn factor_id(&self, name: &str) -> Option<NodeId> {
        self.factor_indices.get(name).map(|x| NodeId::Factor(*x))
    }

    /// Returns a name of a node
    #[inline]
    pub fn node_name(&self, node: NodeId) -> FGResult<&str> {
        self.check_node(node)?;
        Ok(self.name_unchecked(node))
    }

    /// Returns neighbors of a node in the order edges were added
    #[inline]
    pub fn neighbors(&self, node: NodeId) -> FGResult<Vec<NodeId>> {
        self.check_node(node)?;
        Ok(neighbor_ids(&self.variables, &self.factors, node))
    }

    /// Checks whether a node has exactly one neighbor
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::core::{FactorGraphBuilder, FnFactor};
    ///
    /// let mut fgb = FactorGraphBuilder::new();
    /// fgb.add_variable("x1").unwrap();
    /// fgb.add_variable("x2").unwrap();
    /// fgb.add_factor("f", FnFactor::new(2, |_: &[bool]| Some(1.)), &["x1", "x2"]).unwrap();
    /// let fg = fgb.build().unwrap();
    /// assert!(fg.is_leaf(fg.variable_id("x1").unwrap()).unwrap());
    /// assert!(!fg.is_leaf(fg.factor_id("f").unwrap()).unwrap());
    /// ```
    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> FGResult<bool> {
        self.check_node(node)?;
        Ok(self.degree_unchecked(node) == 1)
    }

    /// Runs the sum-product algorithm without evidence.
    /// The schedule is rooted at the first variable.
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::core::{FactorGraphBuilder, FnFactor};
    ///
    /// let prior = |args: &[bool]| Some(if args[0] { 0.3 } else { 0.7 });
    /// let mut fgb = FactorGraphBuilder::new();
    /// fgb.add_variable("s").unwrap();
    /// fgb.add_factor("p(s)", FnFactor::new(1, prior), &["s"]).unwrap();
    /// let fg = fgb.build().unwrap();
    /// let result = fg.propagate().unwrap();
    /// assert_eq!(result.marginal("s", true).unwrap(), 0.3);
    /// assert_eq!(result.info().messages_number, 2);
    /// ```
    #[inline]
    pub fn propagate(&self) -> FGResult<PropagationResult<'_, F>> {
        self.run(None, &[], false)
    }

    /// Runs the sum-product algorithm with observed variables
    ///
    /// # Arguments
    ///
    /// * `evidence` - Names of observed variables and their values
    ///
    /// # Notes
    ///
    /// Marginals computed from the result are unnormalized, they are proportional to
    /// the joint probability of a variable value and the evidence
    #[inline]
    pub fn propagate_with_evidence(&self, evidence: &[(&str, bool)]) -> FGResult<PropagationResult<'_, F>> {
        self.run(None, evidence, false)
    }

    /// Runs the sum-product algorithm with a schedule rooted at the given node
    ///
    /// # Arguments
    ///
    /// * `root` - A root of the two-pass schedule
    /// * `evidence` - Names of observed variables and their values
    #[inline]
    pub fn propagate_from(&self, root: NodeId, evidence: &[(&str, bool)]) -> FGResult<PropagationResult<'_, F>> {
        self.check_node(root)?;
        self.run(Some(root), evidence, false)
    }

    /// Runs the sum-product algorithm evaluating independent messages in parallel.
    /// Results are bit-identical to those of `propagate_with_evidence`.
    ///
    /// # Arguments
    ///
    /// * `evidence` - Names of observed variables and their values
    #[inline]
    pub fn propagate_parallel(&self, evidence: &[(&str, bool)]) -> FGResult<PropagationResult<'_, F>> {
        self.run(None, evidence, true)
    }
}

// private methods --------------------------------------------------------------------------

impl<F: Factor> FactorGraph<F> {
    #[inline(always)]
    pub(crate) fn check_node(&self, node: NodeId) -> FGResult<()> {
        let exists = match node {
            NodeId::Variable(index) => index < self.variables.len(),
            NodeId::Factor(index) => index < self.factors.len(),
        };
        if exists {
            Ok(())
        } else {
            Err(FGError::UnknownNode(format!("{:?}", node)))
        }
    }

    #[inline(always)]
    pub(crate) fn name_unchecked(&self, node: NodeId) -> &str {
        match node {
            NodeId::Variable(index) => &self.variables[index].name,
            NodeId::Factor(index) => &self.factors[index].name,
        }
    }

    #[inline(always)]
    pub(crate) fn degree_unchecked(&self, node: NodeId) -> usize {
        match node {
            NodeId::Variable(index) => self.variables[index].degree(),
            NodeId::Factor(index) => self.factors[index].degree(),
        }
    }

    /// Returns a neighbor behind the given slot of a node and the slot
    /// the node occupies at that neighbor
    #[inline(always)]
    pub(crate) fn edge_unchecked(&self, node: NodeId, slot: usize) -> (NodeId, usize) {
        match node {
            NodeId::Variable(index) => {
                let variable = &self.variables[index];
                (
                    NodeId::Factor(variable.fac_node_indices[slot]),
                    variable.fac_node_receiver_indices[slot],
                )
            }
            NodeId::Factor(index) => {
                let factor = &self.factors[index];
                (
                    NodeId::Variable(factor.var_node_indices[slot]),
                    factor.var_node_receiver_indices[slot],
                )
            }
        }
    }

    #[inline(always)]
    pub(crate) fn variable_index(&self, name: &str) -> FGResult<usize> {
        self.variable_indices
            .get(name)
            .copied()
            .ok_or_else(|| FGError::UnknownVariable(name.to_owned()))
    }

    fn default_root(&self) -> Option<NodeId> {
        if !self.variables.is_empty() {
            Some(NodeId::Variable(0))
        } else if !self.factors.is_empty() {
            Some(NodeId::Factor(0))
        } else {
            None
        }
    }

    fn clamp(&self, evidence: &[(&str, bool)]) -> FGResult<Vec<Option<bool>>> {
        let mut clamped = vec![None; self.variables.len()];
        for (name, value) in evidence {
            let index = self.variable_index(name)?;
            match clamped[index] {
                Some(other) if other != *value => {
                    return Err(FGError::ConflictingEvidence(name.to_string()))
                }
                _ => clamped[index] = Some(*value),
            }
        }
        Ok(clamped)
    }

    fn run(
        &self,
        root: Option<NodeId>,
        evidence: &[(&str, bool)],
        parallel: bool,
    ) -> FGResult<PropagationResult<'_, F>> {
        let evidence = self.clamp(evidence)?;
        let root = root.or_else(|| self.default_root());
        let steps = match root {
            Some(root) => two_pass_schedule(self, root).steps,
            None => Vec::new(),
        };
        // symbolic pass, messages are only constructed here
        let mut store = MessageStore::new(self);
        let mut step_messages = Vec::with_capacity(steps.len());
        for step in &steps {
            let ids = step
                .iter()
                .map(|send| store.send(self, *send))
                .collect::<FGResult<Vec<_>>>()?;
            step_messages.push(ids);
        }
        // numeric pass, every message depends only on messages of previous steps
        let memo = new_memo(store.messages.len());
        let evaluator = Evaluator::new(self, &store.messages, &evidence, &memo);
        for ids in &step_messages {
            if parallel {
                // the first error in step order wins, as in a sequential run
                ids.par_iter()
                    .map(|id| evaluator.materialize(*id))
                    .collect::<Vec<_>>()
                    .into_iter()
                    .collect::<FGResult<()>>()?;
            } else {
                for id in ids {
                    evaluator.materialize(*id)?;
                }
            }
        }
        let info = PropagationInfo {
            root: root.map(|x| self.name_unchecked(x).to_owned()),
            messages_number: store.messages.len(),
            steps_number: steps.len(),
            parallel,
        };
        info!("{}", info);
        Ok(PropagationResult::new(self, store, evidence, memo, info))
    }
}
