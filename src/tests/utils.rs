use crate::core::{Factor, FactorGraph, FactorGraphBuilder, TableFactor};
use ndarray::{array, ArrayD};

/// Marginals `[p(true), p(false)]` of every variable computed by summing
/// the product of all factors over every assignment consistent with the evidence
pub(super) fn brute_force_marginals<F: Factor>(fg: &FactorGraph<F>, evidence: &[(&str, bool)]) -> Vec<[f64; 2]> {
    let variables_number = fg.variables.len();
    let clamped: Vec<_> = evidence
        .iter()
        .map(|(name, value)| (fg.variable_indices[*name], *value))
        .collect();
    let mut marginals = vec![[0f64; 2]; variables_number];
    let mut assignment = vec![false; variables_number];
    for pattern in 0..(1usize << variables_number) {
        for (i, value) in assignment.iter_mut().enumerate() {
            *value = (pattern >> i) & 1 == 1;
        }
        if clamped.iter().any(|(index, value)| assignment[*index] != *value) {
            continue;
        }
        let mut product = 1f64;
        for factor_node in &fg.factors {
            let args: Vec<bool> = factor_node
                .var_node_indices
                .iter()
                .map(|x| assignment[*x])
                .collect();
            product *= factor_node.factor.eval(&args).unwrap();
        }
        for (marginal, value) in marginals.iter_mut().zip(&assignment) {
            marginal[usize::from(!*value)] += product;
        }
    }
    marginals
}

#[inline]
pub(super) fn normalize(marginal: [f64; 2]) -> [f64; 2] {
    let sum = marginal[0] + marginal[1];
    [marginal[0] / sum, marginal[1] / sum]
}

#[inline]
pub(super) fn relative_error(lhs: f64, rhs: f64) -> f64 {
    (lhs - rhs).abs() / lhs.abs().max(rhs.abs()).max(f64::MIN_POSITIVE)
}

/// Pollution (P) and smoking (S) cause cancer (C) that shows up
/// on an X-ray (X) and causes dyspnoea (D)
pub(super) fn cancer_tables() -> Vec<(&'static str, Vec<&'static str>, ArrayD<f64>)> {
    vec![
        ("fP", vec!["P"], array![0.1, 0.9].into_dyn()),
        ("fS", vec!["S"], array![0.3, 0.7].into_dyn()),
        (
            "fC",
            vec!["P", "S", "C"],
            array![[[0.05, 0.95], [0.02, 0.98]], [[0.03, 0.97], [0.001, 0.999]]].into_dyn(),
        ),
        ("fX", vec!["C", "X"], array![[0.9, 0.1], [0.2, 0.8]].into_dyn()),
        ("fD", vec!["C", "D"], array![[0.65, 0.35], [0.3, 0.7]].into_dyn()),
    ]
}

pub(super) fn cancer_network() -> FactorGraph<TableFactor> {
    let mut fgb = FactorGraphBuilder::with_capacity(5, 5);
    for name in ["P", "S", "C", "X", "D"] {
        fgb.add_variable(name).unwrap();
    }
    for (name, args, table) in cancer_tables() {
        fgb.add_factor(name, TableFactor::new(table).unwrap(), &args)
            .unwrap();
    }
    fgb.build().unwrap()
}
