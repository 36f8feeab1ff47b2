use ndarray::{array, ArrayD, IxDyn};

use crate::bayes::{BayesNetBuilder, Cpt};
use crate::core::{FGBuilderError, FGError, Factor, FactorGraphBuilder, FnFactor, NodeId, TableFactor, MAX_FACTOR_DEGREE};

// The simplest fake factor. Note, that it is nonsense for all the
// applications apart usage for validating builder. -----------------------------------------

#[derive(Debug)]
struct FakeFactor(usize);

impl Factor for FakeFactor {
    #[inline(always)]
    fn degree(&self) -> usize {
        self.0
    }

    #[inline(always)]
    fn eval(&self, _: &[bool]) -> Option<f64> {
        unimplemented!()
    }
}

fn fake_builder(variables: &[&str]) -> FactorGraphBuilder<FakeFactor> {
    let mut fgb = FactorGraphBuilder::with_capacity(variables.len(), 0);
    for name in variables {
        fgb.add_variable(name).unwrap();
    }
    fgb
}

// ------------------------------------------------------------------------------------------

#[test]
fn small_factor_graph_builder_logic() {
    let mut fgb = fake_builder(&["x0", "x1", "x2", "x3"]);
    fgb.add_factor("f0", FakeFactor(3), &["x0", "x1", "x3"])
        .unwrap();
    fgb.add_factor("f1", FakeFactor(2), &["x1", "x2"]).unwrap();
    fgb.add_factor("f2", FakeFactor(1), &["x3"]).unwrap();
    let fg = fgb.build().unwrap();
    let fac0 = &fg.factors[0];
    let fac1 = &fg.factors[1];
    let fac2 = &fg.factors[2];
    assert_eq!(3, fg.factors.len());
    let var0 = &fg.variables[0];
    let var1 = &fg.variables[1];
    let var2 = &fg.variables[2];
    let var3 = &fg.variables[3];
    assert_eq!(4, fg.variables.len());
    // --------------------------------------------------------------------------------------
    assert_eq!(fg.get_factor_degrees(), [3, 2, 1]);
    assert_eq!(fg.get_variable_degrees(), [1, 2, 1, 2]);
    // --------------------------------------------------------------------------------------
    assert_eq!(fac0.var_node_indices, [0, 1, 3]);
    assert_eq!(fac1.var_node_indices, [1, 2]);
    assert_eq!(fac2.var_node_indices, [3]);
    // --------------------------------------------------------------------------------------
    assert_eq!(var0.fac_node_indices, [0]);
    assert_eq!(var1.fac_node_indices, [0, 1]);
    assert_eq!(var2.fac_node_indices, [1]);
    assert_eq!(var3.fac_node_indices, [0, 2]);
    // --------------------------------------------------------------------------------------
    assert_eq!(fac0.var_node_receiver_indices, [0, 0, 0]);
    assert_eq!(fac1.var_node_receiver_indices, [1, 0]);
    assert_eq!(fac2.var_node_receiver_indices, [1]);
    // --------------------------------------------------------------------------------------
    assert_eq!(var0.fac_node_receiver_indices, [0]);
    assert_eq!(var1.fac_node_receiver_indices, [1, 0]);
    assert_eq!(var2.fac_node_receiver_indices, [1]);
    assert_eq!(var3.fac_node_receiver_indices, [2, 0]);
    // --------------------------------------------------------------------------------------
    assert_eq!(
        fg.neighbors(NodeId::Variable(1)).unwrap(),
        [NodeId::Factor(0), NodeId::Factor(1)]
    );
    assert!(fg.is_leaf(NodeId::Factor(2)).unwrap());
    assert!(!fg.is_leaf(NodeId::Factor(0)).unwrap());
    assert!(fg.is_leaf(NodeId::Variable(4)).is_err());
    assert_eq!(fg.variable_id("x2"), Some(NodeId::Variable(2)));
    assert_eq!(fg.factor_id("f1"), Some(NodeId::Factor(1)));
    assert_eq!(fg.node_name(NodeId::Factor(1)).unwrap(), "f1");
}

#[test]
fn builder_rejects_invalid_nodes() {
    let mut fgb = fake_builder(&["a", "b"]);
    assert_eq!(
        fgb.add_variable("a"),
        Err(FGBuilderError::DuplicateName("a".to_string()))
    );
    assert_eq!(
        fgb.add_factor("f", FakeFactor(2), &["a", "c"]),
        Err(FGBuilderError::UnknownVariable("f".to_string(), "c".to_string()))
    );
    assert_eq!(
        fgb.add_factor("f", FakeFactor(3), &["a", "b"]),
        Err(FGBuilderError::DegreeError(3, vec!["a".to_string(), "b".to_string()]))
    );
    assert_eq!(
        fgb.add_factor("f", FakeFactor(2), &["a", "a"]),
        Err(FGBuilderError::RepeatedArgument("f".to_string(), "a".to_string()))
    );
    fgb.add_factor("f", FakeFactor(2), &["a", "b"]).unwrap();
    assert_eq!(
        fgb.add_factor("f", FakeFactor(1), &["a"]),
        Err(FGBuilderError::DuplicateName("f".to_string()))
    );
    // a factor and a variable may share a name
    fgb.add_factor("a", FakeFactor(1), &["a"]).unwrap();
    assert!(fgb.build().is_ok());
}

#[test]
fn builder_rejects_huge_factors() {
    let names: Vec<String> = (0..=MAX_FACTOR_DEGREE).map(|i| format!("x{}", i)).collect();
    let names: Vec<&str> = names.iter().map(|x| x.as_str()).collect();
    let mut fgb = fake_builder(&names);
    assert_eq!(
        fgb.add_factor("f", FakeFactor(MAX_FACTOR_DEGREE + 1), &names),
        Err(FGBuilderError::DegreeTooLarge("f".to_string(), MAX_FACTOR_DEGREE + 1))
    );
}

#[test]
fn cycle_is_rejected() {
    let mut fgb = fake_builder(&["A", "B"]);
    fgb.add_factor("F1", FakeFactor(2), &["A", "B"]).unwrap();
    fgb.add_factor("F2", FakeFactor(2), &["B", "A"]).unwrap();
    assert!(matches!(fgb.validate(), Err(FGBuilderError::CyclicGraph(_))));
    assert!(matches!(fgb.build(), Err(FGBuilderError::CyclicGraph(_))));
}

#[test]
fn long_cycle_is_rejected() {
    let mut fgb = fake_builder(&["a", "b", "c", "d"]);
    fgb.add_factor("fa", FakeFactor(1), &["a"]).unwrap();
    fgb.add_factor("fab", FakeFactor(2), &["a", "b"]).unwrap();
    fgb.add_factor("fbc", FakeFactor(2), &["b", "c"]).unwrap();
    fgb.add_factor("fcd", FakeFactor(2), &["c", "d"]).unwrap();
    assert!(fgb.validate().is_ok());
    fgb.add_factor("fdab", FakeFactor(3), &["d", "a", "b"])
        .unwrap();
    assert!(matches!(fgb.validate(), Err(FGBuilderError::CyclicGraph(_))));
}

#[test]
fn disconnected_graph_is_rejected() {
    let mut fgb = fake_builder(&["a", "b", "c", "d"]);
    fgb.add_factor("fab", FakeFactor(2), &["a", "b"]).unwrap();
    fgb.add_factor("fcd", FakeFactor(2), &["c", "d"]).unwrap();
    assert_eq!(fgb.validate(), Err(FGBuilderError::DisconnectedGraph(2)));
    let mut fgb = fake_builder(&["a", "b"]);
    fgb.add_factor("fa", FakeFactor(1), &["a"]).unwrap();
    assert_eq!(fgb.validate(), Err(FGBuilderError::DisconnectedGraph(2)));
}

#[test]
fn trivial_graphs() {
    let fg = FactorGraphBuilder::<FakeFactor>::new().build().unwrap();
    let result = fg.propagate().unwrap();
    assert_eq!(result.info().root, None);
    assert_eq!(result.info().messages_number, 0);
    assert_eq!(result.partition_function().unwrap(), 1.);
    let fg = fake_builder(&["lonely"]).build().unwrap();
    let result = fg.propagate().unwrap();
    assert_eq!(result.info().root.as_deref(), Some("lonely"));
    assert_eq!(result.marginal("lonely", true).unwrap(), 1.);
    assert_eq!(result.marginal("lonely", false).unwrap(), 1.);
    assert_eq!(result.normalized_marginal("lonely").unwrap(), array![0.5, 0.5]);
    assert_eq!(
        fg.propagate_from(NodeId::Factor(3), &[]).unwrap_err(),
        FGError::UnknownNode("Factor(3)".to_string())
    );
    assert!(fg.propagate_from(NodeId::Variable(0), &[]).is_ok());
}

#[test]
fn empty_factor_is_rejected() {
    let mut fgb = FactorGraphBuilder::new();
    fgb.add_variable("a").unwrap();
    let scalar = TableFactor::new(ArrayD::from_elem(IxDyn(&[]), 5.)).unwrap();
    assert_eq!(scalar.degree(), 0);
    assert_eq!(
        fgb.add_factor("c", scalar, &[]),
        Err(FGBuilderError::EmptyFactor("c".to_string()))
    );
    assert!(fgb.build().is_ok());
}

#[test]
fn table_factor_validation() {
    assert!(matches!(
        TableFactor::new(ArrayD::zeros(IxDyn(&[2, 3]))),
        Err(FGBuilderError::InvalidTable(_))
    ));
    assert!(matches!(
        TableFactor::new(array![0.5, -0.5].into_dyn()),
        Err(FGBuilderError::InvalidTable(_))
    ));
    assert!(matches!(
        TableFactor::new(array![f64::NAN, 0.5].into_dyn()),
        Err(FGBuilderError::InvalidTable(_))
    ));
    let factor = TableFactor::new(array![[1., 2.], [3., 4.]].into_dyn()).unwrap();
    assert_eq!(factor.eval(&[true, false]), Some(2.));
    assert_eq!(factor.eval(&[true]), None);
    let fn_factor = FnFactor::new(2, |args: &[bool]| Some(if args[0] { 1. } else { 2. }));
    assert_eq!(fn_factor.degree(), 2);
    assert_eq!(fn_factor.eval(&[false, true]), Some(2.));
}

#[test]
fn cpt_validation() {
    assert!(Cpt::new(1, vec![0.5]).is_err());
    assert!(Cpt::new(1, vec![0.5, 1.5]).is_err());
    assert!(Cpt::prior(-0.1).is_err());
    let cpt = Cpt::new(1, vec![0.9, 0.2]).unwrap();
    assert_eq!(cpt.table(), array![[0.9, 1. - 0.9], [0.2, 1. - 0.2]].into_dyn());
    assert_eq!(cpt.eval(&[true]), None);
}

#[test]
fn bayes_net_builder_errors() {
    let mut bnb = BayesNetBuilder::new();
    bnb.add_node("P", &[], Cpt::prior(0.1).unwrap()).unwrap();
    assert_eq!(
        bnb.add_node("C", &["Q"], Cpt::new(1, vec![0.1, 0.2]).unwrap()),
        Err(FGBuilderError::UnknownVariable("p(C|Q)".to_string(), "Q".to_string()))
    );
    assert!(matches!(
        bnb.add_node("C", &["P"], Cpt::prior(0.1).unwrap()),
        Err(FGBuilderError::DegreeError(1, _))
    ));
    assert!(matches!(
        bnb.add_node("C", &["P", "P"], Cpt::new(2, vec![0.1; 4]).unwrap()),
        Err(FGBuilderError::RepeatedArgument(_, _))
    ));
    assert_eq!(
        bnb.add_node("P", &[], Cpt::prior(0.5).unwrap()),
        Err(FGBuilderError::DuplicateName("P".to_string()))
    );
    bnb.add_node("C", &["P"], Cpt::new(1, vec![0.1, 0.2]).unwrap())
        .unwrap();
    let fg = bnb.build().unwrap();
    assert_eq!(fg.variable_names(), ["P", "C"]);
    assert_eq!(fg.factor_names(), ["p(P)", "p(C|P)"]);
}
