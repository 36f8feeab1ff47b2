use super::utils::{brute_force_marginals, normalize, relative_error};
use crate::core::{FactorGraph, FactorGraphBuilder, NodeId, TableFactor};
use ndarray::{ArrayD, IxDyn};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use rand_distr::Uniform;

struct RandomTreeData {
    variables_number: usize,
    factors: Vec<(String, Vec<usize>, ArrayD<f64>)>,
}

#[inline]
fn variable_name(index: usize) -> String {
    format!("x{}", index)
}

#[inline]
fn random_table(rng: &mut impl Rng, degree: usize) -> ArrayD<f64> {
    let distr = Uniform::new(0.1, 2.);
    ArrayD::from_shape_fn(IxDyn(&vec![2; degree]), |_| rng.sample(distr))
}

// Every non-unary factor attaches one or two fresh variables to a variable
// of the already built tree, so the result is always a tree
fn gen_random_factor_tree(rng: &mut impl Rng, variables_number: usize) -> RandomTreeData {
    let mut factors = Vec::new();
    let mut attached = 1;
    while attached < variables_number {
        let fresh_number = std::cmp::min(rng.gen_range(1..=2), variables_number - attached);
        let mut args = vec![rng.gen_range(0..attached)];
        args.extend(attached..(attached + fresh_number));
        args.shuffle(rng);
        attached += fresh_number;
        let table = random_table(rng, args.len());
        factors.push((format!("f{}", factors.len()), args, table));
    }
    for index in 0..variables_number {
        if rng.gen_bool(0.4) {
            let table = random_table(rng, 1);
            factors.push((format!("f{}", factors.len()), vec![index], table));
        }
    }
    RandomTreeData {
        variables_number,
        factors,
    }
}

fn build_graph(
    data: &RandomTreeData,
    variables_order: &[usize],
    factors_order: &[usize],
    axes_orders: &[Vec<usize>],
) -> FactorGraph<TableFactor> {
    let mut fgb = FactorGraphBuilder::with_capacity(data.variables_number, data.factors.len());
    for index in variables_order {
        fgb.add_variable(&variable_name(*index)).unwrap();
    }
    for index in factors_order {
        let (name, args, table) = &data.factors[*index];
        let perm = &axes_orders[*index];
        let names: Vec<String> = perm.iter().map(|x| variable_name(args[*x])).collect();
        let names: Vec<&str> = names.iter().map(|x| x.as_str()).collect();
        let table = table.clone().permuted_axes(IxDyn(perm));
        fgb.add_factor(name, TableFactor::new(table).unwrap(), &names)
            .unwrap();
    }
    fgb.build().unwrap()
}

fn build_canonical_graph(data: &RandomTreeData) -> FactorGraph<TableFactor> {
    let variables_order: Vec<_> = (0..data.variables_number).collect();
    let factors_order: Vec<_> = (0..data.factors.len()).collect();
    let axes_orders: Vec<Vec<_>> = data
        .factors
        .iter()
        .map(|(_, args, _)| (0..args.len()).collect())
        .collect();
    build_graph(data, &variables_order, &factors_order, &axes_orders)
}

fn normalized_marginals_by_name(fg: &FactorGraph<TableFactor>, root: Option<NodeId>, evidence: &[(&str, bool)]) -> Vec<[f64; 2]> {
    let result = match root {
        Some(root) => fg.propagate_from(root, evidence).unwrap(),
        None => fg.propagate_with_evidence(evidence).unwrap(),
    };
    let mut names = fg.variable_names();
    names.sort_by_key(|x| x[1..].parse::<usize>().unwrap());
    names
        .into_iter()
        .map(|name| {
            let marginal = result.normalized_marginal(name).unwrap();
            [marginal[0], marginal[1]]
        })
        .collect()
}

#[inline]
fn assert_close(lhs: &[[f64; 2]], rhs: &[[f64; 2]]) {
    assert_eq!(lhs.len(), rhs.len());
    for (l, r) in lhs.iter().zip(rhs) {
        assert!(relative_error(l[0], r[0]) < 1e-9, "{:?} != {:?}", l, r);
        assert!(relative_error(l[1], r[1]) < 1e-9, "{:?} != {:?}", l, r);
    }
}

#[test]
fn random_tree_matches_enumeration() {
    let mut rng = thread_rng();
    for _ in 0..20 {
        let variables_number = rng.gen_range(1..=10);
        let data = gen_random_factor_tree(&mut rng, variables_number);
        let fg = build_canonical_graph(&data);
        let result = fg.propagate().unwrap();
        let exact = brute_force_marginals(&fg, &[]);
        let z = result.partition_function().unwrap();
        for (index, exact_marginal) in exact.iter().enumerate() {
            let name = variable_name(index);
            let marginal = [
                result.marginal(&name, true).unwrap(),
                result.marginal(&name, false).unwrap(),
            ];
            assert!(relative_error(marginal[0], exact_marginal[0]) < 1e-9);
            assert!(relative_error(marginal[1], exact_marginal[1]) < 1e-9);
            assert!(relative_error(marginal[0] + marginal[1], z) < 1e-9);
        }
        assert_eq!(
            result.info().messages_number,
            2 * fg.get_factor_degrees().iter().sum::<usize>()
        );
    }
}

#[test]
fn random_tree_is_order_independent() {
    let mut rng = thread_rng();
    for _ in 0..20 {
        let variables_number = rng.gen_range(2..=10);
        let data = gen_random_factor_tree(&mut rng, variables_number);
        let expected = normalized_marginals_by_name(&build_canonical_graph(&data), None, &[]);
        let mut variables_order: Vec<_> = (0..data.variables_number).collect();
        variables_order.shuffle(&mut rng);
        let mut factors_order: Vec<_> = (0..data.factors.len()).collect();
        factors_order.shuffle(&mut rng);
        let axes_orders: Vec<Vec<_>> = data
            .factors
            .iter()
            .map(|(_, args, _)| {
                let mut perm: Vec<_> = (0..args.len()).collect();
                perm.shuffle(&mut rng);
                perm
            })
            .collect();
        let fg = build_graph(&data, &variables_order, &factors_order, &axes_orders);
        let shuffled = normalized_marginals_by_name(&fg, None, &[]);
        assert_close(&expected, &shuffled);
    }
}

#[test]
fn random_tree_root_independence() {
    let mut rng = thread_rng();
    for _ in 0..10 {
        let variables_number = rng.gen_range(1..=8);
        let data = gen_random_factor_tree(&mut rng, variables_number);
        let fg = build_canonical_graph(&data);
        let expected = normalized_marginals_by_name(&fg, None, &[]);
        let roots = (0..fg.variables.len())
            .map(NodeId::Variable)
            .chain((0..fg.factors.len()).map(NodeId::Factor));
        for root in roots {
            let marginals = normalized_marginals_by_name(&fg, Some(root), &[]);
            assert_close(&expected, &marginals);
        }
    }
}

#[test]
fn random_tree_with_evidence() {
    let mut rng = thread_rng();
    for _ in 0..20 {
        let variables_number = rng.gen_range(2..=10);
        let data = gen_random_factor_tree(&mut rng, variables_number);
        let fg = build_canonical_graph(&data);
        let mut observed: Vec<_> = (0..variables_number).collect();
        observed.shuffle(&mut rng);
        observed.truncate(rng.gen_range(1..variables_number));
        let names: Vec<(String, bool)> = observed
            .iter()
            .map(|x| (variable_name(*x), rng.gen_bool(0.5)))
            .collect();
        let evidence: Vec<(&str, bool)> = names.iter().map(|(name, value)| (name.as_str(), *value)).collect();
        let exact: Vec<_> = brute_force_marginals(&fg, &evidence)
            .into_iter()
            .map(normalize)
            .collect();
        let sequential = normalized_marginals_by_name(&fg, None, &evidence);
        assert_close(&exact, &sequential);
        let parallel = fg.propagate_parallel(&evidence).unwrap();
        for (index, marginal) in sequential.iter().enumerate() {
            let parallel_marginal = parallel.normalized_marginal(&variable_name(index)).unwrap();
            assert_eq!(marginal[0].to_bits(), parallel_marginal[0].to_bits());
        }
        for (name, value) in &evidence {
            let result = fg.propagate_with_evidence(&evidence).unwrap();
            assert_eq!(result.marginal(name, !*value).unwrap(), 0.);
        }
    }
}
