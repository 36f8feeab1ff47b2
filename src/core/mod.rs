mod evaluator;
mod factor;
mod factor_graph;
mod factor_graph_builder;
mod factor_node;
mod message;
mod propagation;
mod scheduler;
mod variable_node;

pub use factor::{FnFactor, Factor, TableFactor};
pub use factor_graph::{FGError, FGResult, FactorGraph, NodeId, PropagationInfo};
pub use factor_graph_builder::{FGBuilderError, FGBuilderResult, FactorGraphBuilder, MAX_FACTOR_DEGREE};
pub use message::{Constituent, ConstituentRef, Message, MessageBody, MessageId};
pub use propagation::{MessageReport, PropagationResult};
pub use scheduler::NodeState;

#[cfg(test)]
pub(crate) use message::MessageStore;
#[cfg(test)]
pub(crate) use scheduler::{node_state, two_pass_schedule, DirectedEdge};
