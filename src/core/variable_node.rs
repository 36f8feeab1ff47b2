#[derive(Debug, Clone)]
pub struct VariableNode {
    pub(crate) name: String,
    pub(crate) fac_node_indices: Vec<usize>,
    pub(crate) fac_node_receiver_indices: Vec<usize>,
}

impl VariableNode {
    #[inline(always)]
    pub(super) fn new_disconnected(name: String) -> Self {
        VariableNode {
            name,
            fac_node_indices: Vec::new(),
            fac_node_receiver_indices: Vec::new(),
        }
    }

    #[inline(always)]
    pub(super) fn degree(&self) -> usize {
        self.fac_node_indices.len()
    }
}
