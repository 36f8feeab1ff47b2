use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::{
    factor::Factor,
    factor_graph::{FGError, FGResult, FactorGraph, NodeId},
    scheduler::DirectedEdge,
};

/// Index of a message within one propagation run
pub type MessageId = usize;

/// An item of a product a composite message is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constituent {
    /// A factor with the given index
    Factor(usize),

    /// A message received earlier, a function of its own free variable
    Message(MessageId),
}

/// A constituent together with positions of its arguments in the scope
/// of a composite message. The scope is `[free, summed[0], summed[1], ...]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstituentRef {
    pub constituent: Constituent,
    pub slots: Vec<usize>,
}

/// A not yet evaluated function of a message's free variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageBody {
    /// Constant one, sent by a leaf variable
    Unity,

    /// A factor of degree one, sent by a leaf factor
    Leaf { factor: usize },

    /// Product of constituents summed over every variable from `summed`
    Composite {
        constituents: Vec<ConstituentRef>,
        summed: Vec<usize>,
    },
}

impl MessageBody {
    /// Returns a number of items in the product
    #[inline]
    pub fn constituents_number(&self) -> usize {
        match self {
            MessageBody::Unity => 0,
            MessageBody::Leaf { .. } => 1,
            MessageBody::Composite { constituents, .. } => constituents.len(),
        }
    }

    /// Returns indices of variables the product is summed over
    #[inline]
    pub fn summed(&self) -> &[usize] {
        match self {
            MessageBody::Composite { summed, .. } => summed,
            _ => &[],
        }
    }
}

/// A directed message, `free` is the index of the variable it is a function of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub source: NodeId,
    pub destination: NodeId,
    pub free: usize,
    pub body: MessageBody,
}

// ------------------------------------------------------------------------------------------

/// Messages of one propagation run and, for each node, the messages it received.
/// Inboxes are edge-indexed: slot `k` of a node holds the message from its `k`-th neighbor
#[derive(Debug, Clone)]
pub(crate) struct MessageStore {
    pub(crate) messages: Vec<Message>,
    pub(crate) variable_inbox: Vec<Vec<Option<MessageId>>>,
    pub(crate) factor_inbox: Vec<Vec<Option<MessageId>>>,
}

impl MessageStore {
    pub(crate) fn new<F: Factor>(graph: &FactorGraph<F>) -> Self {
        MessageStore {
            messages: Vec::with_capacity(2 * graph.variables.iter().map(|x| x.degree()).sum::<usize>()),
            variable_inbox: graph.variables.iter().map(|x| vec![None; x.degree()]).collect(),
            factor_inbox: graph.factors.iter().map(|x| vec![None; x.degree()]).collect(),
        }
    }

    #[inline(always)]
    pub(crate) fn inbox(&self, node: NodeId) -> &[Option<MessageId>] {
        match node {
            NodeId::Variable(index) => &self.variable_inbox[index],
            NodeId::Factor(index) => &self.factor_inbox[index],
        }
    }

    #[inline(always)]
    fn inbox_mut(&mut self, node: NodeId) -> &mut [Option<MessageId>] {
        match node {
            NodeId::Variable(index) => &mut self.variable_inbox[index],
            NodeId::Factor(index) => &mut self.factor_inbox[index],
        }
    }

    /// Constructs a message along a directed edge and delivers it to the receiver
    pub(crate) fn send<F: Factor>(&mut self, graph: &FactorGraph<F>, edge: DirectedEdge) -> FGResult<MessageId> {
        let (destination, receiver_slot) = graph.edge_unchecked(edge.source, edge.slot);
        if self.inbox(destination)[receiver_slot].is_some() {
            return Err(FGError::MessageAlreadySent {
                source: graph.name_unchecked(edge.source).to_owned(),
                destination: graph.name_unchecked(destination).to_owned(),
            });
        }
        let message = match edge.source {
            NodeId::Factor(index) => self.make_factor_node_message(graph, index, edge.slot)?,
            NodeId::Variable(index) => self.make_variable_node_message(graph, index, edge.slot)?,
        };
        debug!(
            "{} ---> {}: {} constituents, {} summed variables",
            graph.name_unchecked(edge.source),
            graph.name_unchecked(destination),
            message.body.constituents_number(),
            message.body.summed().len(),
        );
        let id = self.messages.len();
        self.messages.push(message);
        self.inbox_mut(destination)[receiver_slot] = Some(id);
        Ok(id)
    }

    /// Factor to variable rule: product of the factor and the messages from
    /// all the other neighbors, summed over everything except the target variable
    fn make_factor_node_message<F: Factor>(
        &self,
        graph: &FactorGraph<F>,
        factor: usize,
        slot: usize,
    ) -> FGResult<Message> {
        let source = NodeId::Factor(factor);
        let free = graph.factors[factor].var_node_indices[slot];
        let body = if graph.degree_unchecked(source) == 1 {
            MessageBody::Leaf { factor }
        } else {
            let mut items = vec![Constituent::Factor(factor)];
            items.extend(
                self.received_except(graph, source, slot)?
                    .into_iter()
                    .map(Constituent::Message),
            );
            self.composite(graph, free, items)
        };
        Ok(Message {
            source,
            destination: NodeId::Variable(free),
            free,
            body,
        })
    }

    /// Variable to factor rule: product of the messages from all the other
    /// neighbors, nothing is summed
    fn make_variable_node_message<F: Factor>(
        &self,
        graph: &FactorGraph<F>,
        variable: usize,
        slot: usize,
    ) -> FGResult<Message> {
        let source = NodeId::Variable(variable);
        let body = if graph.degree_unchecked(source) == 1 {
            MessageBody::Unity
        } else {
            let items = self
                .received_except(graph, source, slot)?
                .into_iter()
                .map(Constituent::Message)
                .collect();
            self.composite(graph, variable, items)
        };
        Ok(Message {
            source,
            destination: NodeId::Factor(graph.variables[variable].fac_node_indices[slot]),
            free: variable,
            body,
        })
    }

    /// Messages a node received from every neighbor but the one behind `slot`
    fn received_except<F: Factor>(
        &self,
        graph: &FactorGraph<F>,
        node: NodeId,
        slot: usize,
    ) -> FGResult<Vec<MessageId>> {
        let inbox = self.inbox(node);
        let mut received = Vec::with_capacity(inbox.len().saturating_sub(1));
        for (k, message) in inbox.iter().enumerate() {
            if k == slot {
                continue;
            }
            match message {
                Some(id) => received.push(*id),
                None => {
                    return Err(FGError::NotReady {
                        source: graph.name_unchecked(node).to_owned(),
                        destination: graph.name_unchecked(graph.edge_unchecked(node, slot).0).to_owned(),
                        missing: graph.name_unchecked(graph.edge_unchecked(node, k).0).to_owned(),
                    })
                }
            }
        }
        Ok(received)
    }

    fn scope<F: Factor>(&self, graph: &FactorGraph<F>, constituent: Constituent) -> Vec<usize> {
        match constituent {
            Constituent::Factor(index) => graph.factors[index].var_node_indices.clone(),
            Constituent::Message(id) => vec![self.messages[id].free],
        }
    }

    fn composite<F: Factor>(&self, graph: &FactorGraph<F>, free: usize, items: Vec<Constituent>) -> MessageBody {
        let scopes: Vec<_> = items.iter().map(|x| self.scope(graph, *x)).collect();
        let mut summed = Vec::new();
        for var in scopes.iter().flatten() {
            if *var != free && !summed.contains(var) {
                summed.push(*var);
            }
        }
        let constituents = items
            .into_iter()
            .zip(scopes)
            .map(|(constituent, scope)| ConstituentRef {
                constituent,
                slots: scope
                    .iter()
                    .map(|var| summed.iter().position(|x| x == var).map_or(0, |x| x + 1))
                    .collect(),
            })
            .collect();
        MessageBody::Composite {
            constituents,
            summed,
        }
    }
}
