use std::fmt::Display;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::core::{
    evaluator::{indicator, Evaluator, Memo},
    factor::Factor,
    factor_graph::{FGError, FGResult, FactorGraph, NodeId, PropagationInfo},
    message::{Constituent, Message, MessageBody, MessageStore},
    scheduler::{node_state, NodeState},
};

/// Summary of a message held by a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReport {
    /// Sender of a message
    pub source: String,

    /// Receiver of a message
    pub destination: String,

    /// Variable the message is a function of
    pub free: String,

    /// Names of factors and messages the product is made of
    pub constituents: Vec<String>,

    /// Variables the product is summed over
    pub summed: Vec<String>,

    /// Values of the message at `true` and at `false`
    pub values: [f64; 2],
}

impl Display for MessageReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<Message {} -> {}: ~({}) {} factors [{}] summed over [{}], values {:?}>",
            self.source,
            self.destination,
            self.free,
            self.constituents.len(),
            self.constituents.join(" * "),
            self.summed.join(", "),
            self.values,
        )
    }
}

// ------------------------------------------------------------------------------------------

/// Messages of a completed propagation run. Every edge of a graph
/// carries a message in both directions
#[derive(Debug)]
pub struct PropagationResult<'a, F: Factor> {
    graph: &'a FactorGraph<F>,
    store: MessageStore,
    evidence: Vec<Option<bool>>,
    memo: Memo,
    info: PropagationInfo,
}

impl<'a, F: Factor> PropagationResult<'a, F> {
    #[inline]
    pub(crate) fn new(
        graph: &'a FactorGraph<F>,
        store: MessageStore,
        evidence: Vec<Option<bool>>,
        memo: Memo,
        info: PropagationInfo,
    ) -> Self {
        PropagationResult {
            graph,
            store,
            evidence,
            memo,
            info,
        }
    }

    /// Returns information about the run
    #[inline]
    pub fn info(&self) -> &PropagationInfo {
        &self.info
    }

    /// Returns a factor graph the run was performed on
    #[inline]
    pub fn graph(&self) -> &'a FactorGraph<F> {
        self.graph
    }

    /// Computes an unnormalized marginal of a variable, i.e. the product of
    /// all the messages the variable holds evaluated at `value`
    ///
    /// # Arguments
    ///
    /// * `name` - A name of a variable
    /// * `value` - A value of a variable
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::core::{FactorGraphBuilder, TableFactor};
    /// use ndarray::array;
    ///
    /// let mut fgb = FactorGraphBuilder::new();
    /// fgb.add_variable("c").unwrap();
    /// fgb.add_variable("x").unwrap();
    /// let prior = TableFactor::new(array![0.25, 0.75].into_dyn()).unwrap();
    /// let xray = TableFactor::new(array![[0.9, 0.1], [0.2, 0.8]].into_dyn()).unwrap();
    /// fgb.add_factor("p(c)", prior, &["c"]).unwrap();
    /// fgb.add_factor("p(x|c)", xray, &["c", "x"]).unwrap();
    /// let fg = fgb.build().unwrap();
    ///
    /// let result = fg.propagate().unwrap();
    /// let p_x = result.marginal("x", true).unwrap();
    /// assert!((p_x - (0.25 * 0.9 + 0.75 * 0.2)).abs() < 1e-12);
    ///
    /// let result = fg.propagate_with_evidence(&[("x", true)]).unwrap();
    /// assert_eq!(result.marginal("x", false).unwrap(), 0.);
    /// ```
    pub fn marginal(&self, name: &str, value: bool) -> FGResult<f64> {
        let index = self.graph.variable_index(name)?;
        self.unnormalized_marginal(index, value)
    }

    /// Computes a marginal distribution of a variable `[p(true), p(false)]`
    /// conditioned on the evidence of the run
    pub fn normalized_marginal(&self, name: &str) -> FGResult<Array1<f64>> {
        let index = self.graph.variable_index(name)?;
        self.normalized(index)
    }

    /// Computes marginal distributions of all variables in order they were added
    pub fn variable_marginals(&self) -> FGResult<Vec<Array1<f64>>> {
        (0..self.graph.variables.len())
            .map(|index| self.normalized(index))
            .collect()
    }

    /// Computes the sum of the product of all factors over all assignments
    /// consistent with the evidence
    ///
    /// # Notes
    ///
    /// Every variable gives the same value up to rounding, the first one is used.
    /// The value is 1 for an empty graph. Returns `OverflowedMarginal` if the sum
    /// is not finite
    pub fn partition_function(&self) -> FGResult<f64> {
        if self.graph.variables.is_empty() {
            return Ok(1f64);
        }
        let z = self.unnormalized_marginal(0, true)? + self.unnormalized_marginal(0, false)?;
        if !z.is_finite() {
            return Err(FGError::OverflowedMarginal(self.graph.variables[0].name.clone()));
        }
        Ok(z)
    }

    /// Returns messages a node holds, one per neighbor
    pub fn inbound_messages(&self, node: NodeId) -> FGResult<Vec<&Message>> {
        self.graph.check_node(node)?;
        Ok(self
            .store
            .inbox(node)
            .iter()
            .flatten()
            .map(|id| &self.store.messages[*id])
            .collect())
    }

    /// Lists messages a node holds
    ///
    /// # Example
    ///
    /// ```
    /// use fgsp::core::{FactorGraphBuilder, FnFactor};
    ///
    /// let coupling = |args: &[bool]| Some(if args[0] == args[1] { 0.9 } else { 0.1 });
    /// let mut fgb = FactorGraphBuilder::new();
    /// fgb.add_variable("a").unwrap();
    /// fgb.add_variable("b").unwrap();
    /// fgb.add_factor("f", FnFactor::new(2, coupling), &["a", "b"]).unwrap();
    /// let fg = fgb.build().unwrap();
    /// let result = fg.propagate().unwrap();
    /// let report = result.message_report(fg.variable_id("b").unwrap()).unwrap();
    /// assert_eq!(report.len(), 1);
    /// assert_eq!(report[0].source, "f");
    /// assert_eq!(report[0].summed, vec!["a".to_string()]);
    /// assert!((report[0].values[0] - 1.).abs() < 1e-12);
    /// ```
    pub fn message_report(&self, node: NodeId) -> FGResult<Vec<MessageReport>> {
        self.graph.check_node(node)?;
        let evaluator = self.evaluator();
        let mut report = Vec::new();
        for id in self.store.inbox(node).iter().flatten() {
            let message = &self.store.messages[*id];
            let constituents = match &message.body {
                MessageBody::Unity => Vec::new(),
                MessageBody::Leaf { factor } => vec![self.graph.factors[*factor].name.clone()],
                MessageBody::Composite { constituents, .. } => constituents
                    .iter()
                    .map(|x| self.constituent_name(x.constituent))
                    .collect(),
            };
            report.push(MessageReport {
                source: self.graph.name_unchecked(message.source).to_owned(),
                destination: self.graph.name_unchecked(message.destination).to_owned(),
                free: self.graph.variables[message.free].name.clone(),
                constituents,
                summed: message
                    .body
                    .summed()
                    .iter()
                    .map(|x| self.graph.variables[*x].name.clone())
                    .collect(),
                values: [evaluator.evaluate(*id, true)?, evaluator.evaluate(*id, false)?],
            });
        }
        Ok(report)
    }

    /// Returns a scheduling state of a node
    #[inline]
    pub fn node_state(&self, node: NodeId) -> FGResult<NodeState> {
        self.graph.check_node(node)?;
        Ok(node_state(self.graph, &self.store, node))
    }
}

// private methods --------------------------------------------------------------------------

impl<'a, F: Factor> PropagationResult<'a, F> {
    #[inline(always)]
    fn evaluator(&self) -> Evaluator<'_, F> {
        Evaluator::new(self.graph, &self.store.messages, &self.evidence, &self.memo)
    }

    fn unnormalized_marginal(&self, index: usize, value: bool) -> FGResult<f64> {
        let evaluator = self.evaluator();
        let node = NodeId::Variable(index);
        let mut product = indicator(self.evidence[index], value);
        for (slot, message) in self.store.inbox(node).iter().enumerate() {
            match message {
                Some(id) => product *= evaluator.evaluate(*id, value)?,
                None => {
                    let name = self.graph.name_unchecked(node).to_owned();
                    return Err(FGError::NotReady {
                        source: name.clone(),
                        destination: name,
                        missing: self
                            .graph
                            .name_unchecked(self.graph.edge_unchecked(node, slot).0)
                            .to_owned(),
                    });
                }
            }
        }
        Ok(product)
    }

    fn normalized(&self, index: usize) -> FGResult<Array1<f64>> {
        let mut marginal = Array1::from_vec(vec![
            self.unnormalized_marginal(index, true)?,
            self.unnormalized_marginal(index, false)?,
        ]);
        let sum = marginal.sum();
        if !sum.is_finite() {
            return Err(FGError::OverflowedMarginal(self.graph.variables[index].name.clone()));
        }
        if sum <= 0f64 {
            return Err(FGError::ZeroMarginal(self.graph.variables[index].name.clone()));
        }
        marginal /= sum;
        Ok(marginal)
    }

    fn constituent_name(&self, constituent: Constituent) -> String {
        match constituent {
            Constituent::Factor(index) => self.graph.factors[index].name.clone(),
            Constituent::Message(id) => {
                let message = &self.store.messages[id];
                format!(
                    "m({}->{})",
                    self.graph.name_unchecked(message.source),
                    self.graph.name_unchecked(message.destination),
                )
            }
        }
    }
}
