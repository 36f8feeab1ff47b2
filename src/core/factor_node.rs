use crate::core::factor::Factor;

#[derive(Debug, Clone)]
pub struct FactorNode<F: Factor> {
    pub(crate) name: String,
    pub(crate) factor: F,
    pub(crate) var_node_indices: Vec<usize>,
    pub(crate) var_node_receiver_indices: Vec<usize>,
}

impl<F: Factor> FactorNode<F> {
    #[inline(always)]
    pub(super) fn new_disconnected(name: String, factor: F) -> Self {
        FactorNode {
            name,
            factor,
            var_node_indices: Vec::new(),
            var_node_receiver_indices: Vec::new(),
        }
    }

    #[inline(always)]
    pub(super) fn degree(&self) -> usize {
        self.var_node_indices.len()
    }
}
