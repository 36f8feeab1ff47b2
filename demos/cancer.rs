use std::error::Error;

use clap::Parser;
use fgsp::bayes::{BayesNetBuilder, Cpt};
use fgsp::core::{MessageReport, PropagationInfo};
use serde::Serialize;

/// Queries the pollution-smoking-cancer network
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Variables to print marginals of, all by default
    #[arg(short, long)]
    variable: Vec<String>,

    /// Observed variables, e.g. `--evidence X=true`
    #[arg(short, long, value_parser = parse_evidence)]
    evidence: Vec<(String, bool)>,

    /// Evaluate independent messages in parallel
    #[arg(short, long)]
    parallel: bool,

    /// Nodes to print held messages of
    #[arg(short, long)]
    report: Vec<String>,
}

#[derive(Serialize)]
struct Marginal {
    variable: String,
    p_true: f64,
    p_false: f64,
}

#[derive(Serialize)]
struct Output {
    info: PropagationInfo,
    marginals: Vec<Marginal>,
    reports: Vec<MessageReport>,
}

fn parse_evidence(s: &str) -> Result<(String, bool), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {}", s))?;
    let value = value
        .parse::<bool>()
        .map_err(|_| format!("expected true or false, got {}", value))?;
    Ok((name.to_string(), value))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    // network -----------------------------------------------------------------------------
    let mut bnb = BayesNetBuilder::new();
    // pollution
    bnb.add_node("P", &[], Cpt::prior(0.1)?)?;
    // smoking
    bnb.add_node("S", &[], Cpt::prior(0.3)?)?;
    // cancer given (P, S) in order tt, tf, ft, ff
    bnb.add_node("C", &["P", "S"], Cpt::new(2, vec![0.05, 0.02, 0.03, 0.001])?)?;
    // x-ray
    bnb.add_node("X", &["C"], Cpt::new(1, vec![0.9, 0.2])?)?;
    // dyspnoea
    bnb.add_node("D", &["C"], Cpt::new(1, vec![0.65, 0.3])?)?;
    let fg = bnb.build()?;
    // -------------------------------------------------------------------------------------
    let evidence: Vec<(&str, bool)> = args
        .evidence
        .iter()
        .map(|(name, value)| (name.as_str(), *value))
        .collect();
    let result = if args.parallel {
        fg.propagate_parallel(&evidence)?
    } else {
        fg.propagate_with_evidence(&evidence)?
    };
    let graph = result.graph();
    let variables: Vec<&str> = if args.variable.is_empty() {
        graph.variable_names()
    } else {
        args.variable.iter().map(|x| x.as_str()).collect()
    };
    let mut marginals = Vec::with_capacity(variables.len());
    for name in variables {
        let marginal = result.normalized_marginal(name)?;
        marginals.push(Marginal {
            variable: name.to_string(),
            p_true: marginal[0],
            p_false: marginal[1],
        });
    }
    let mut reports = Vec::new();
    for name in &args.report {
        let node = graph
            .variable_id(name)
            .or_else(|| graph.factor_id(name))
            .ok_or_else(|| format!("unknown node {}", name))?;
        reports.extend(result.message_report(node)?);
    }
    let output = Output {
        info: result.info().clone(),
        marginals,
        reports,
    };
    print!("{}", serde_yaml::to_string(&output)?);
    Ok(())
}
