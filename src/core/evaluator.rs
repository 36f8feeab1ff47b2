use std::sync::OnceLock;

use log::trace;

use crate::core::{
    factor::Factor,
    factor_graph::{FGError, FGResult, FactorGraph, NodeId},
    message::{Constituent, ConstituentRef, Message, MessageBody, MessageId},
};

/// Cached values of messages, `memo[id][0]` holds the value at `true`,
/// `memo[id][1]` holds the value at `false`
pub(crate) type Memo = Vec<[OnceLock<f64>; 2]>;

#[inline]
pub(crate) fn new_memo(messages_number: usize) -> Memo {
    (0..messages_number)
        .map(|_| [OnceLock::new(), OnceLock::new()])
        .collect()
}

#[inline(always)]
pub(crate) fn value_index(value: bool) -> usize {
    usize::from(!value)
}

#[inline(always)]
pub(crate) fn indicator(observed: Option<bool>, value: bool) -> f64 {
    match observed {
        Some(observed) if observed != value => 0f64,
        _ => 1f64,
    }
}

/// Turns symbolic messages into numbers
#[derive(Debug)]
pub(crate) struct Evaluator<'a, F: Factor> {
    graph: &'a FactorGraph<F>,
    messages: &'a [Message],
    evidence: &'a [Option<bool>],
    memo: &'a [[OnceLock<f64>; 2]],
}

impl<'a, F: Factor> Evaluator<'a, F> {
    #[inline]
    pub(crate) fn new(
        graph: &'a FactorGraph<F>,
        messages: &'a [Message],
        evidence: &'a [Option<bool>],
        memo: &'a [[OnceLock<f64>; 2]],
    ) -> Self {
        Evaluator {
            graph,
            messages,
            evidence,
            memo,
        }
    }

    /// Evaluates a message at both values of its free variable
    #[inline]
    pub(crate) fn materialize(&self, id: MessageId) -> FGResult<()> {
        self.evaluate(id, true)?;
        self.evaluate(id, false)?;
        Ok(())
    }

    /// Evaluates a message at the given value of its free variable
    pub(crate) fn evaluate(&self, id: MessageId, value: bool) -> FGResult<f64> {
        let cell = &self.memo[id][value_index(value)];
        if let Some(result) = cell.get() {
            return Ok(*result);
        }
        let message = &self.messages[id];
        let mut result = match &message.body {
            MessageBody::Unity => 1f64,
            MessageBody::Leaf { factor } => self.eval_factor(*factor, &[value])?,
            MessageBody::Composite {
                constituents,
                summed,
            } => self.exclusion_sum(constituents, summed, value)?,
        };
        if let NodeId::Variable(index) = message.source {
            result *= indicator(self.evidence[index], value);
        }
        Ok(*cell.get_or_init(|| result))
    }

    /// Sums a product of constituents over all assignments of `summed` variables,
    /// the free variable is fixed to `value`. Bit `j` of an assignment pattern
    /// is the value of `summed[j]`
    fn exclusion_sum(&self, constituents: &[ConstituentRef], summed: &[usize], value: bool) -> FGResult<f64> {
        let patterns_number = 1usize << summed.len();
        trace!(
            "Summing {} constituents over {} assignments",
            constituents.len(),
            patterns_number,
        );
        let mut values = vec![value; summed.len() + 1];
        let mut args = Vec::new();
        let mut total = 0f64;
        for pattern in 0..patterns_number {
            for (j, slot_value) in values.iter_mut().skip(1).enumerate() {
                *slot_value = (pattern >> j) & 1 == 1;
            }
            let mut product = 1f64;
            for constituent_ref in constituents {
                product *= match constituent_ref.constituent {
                    Constituent::Factor(index) => {
                        args.clear();
                        args.extend(constituent_ref.slots.iter().map(|x| values[*x]));
                        self.eval_factor(index, &args)?
                    }
                    Constituent::Message(id) => self.evaluate(id, values[constituent_ref.slots[0]])?,
                };
            }
            total += product;
        }
        Ok(total)
    }

    fn eval_factor(&self, index: usize, args: &[bool]) -> FGResult<f64> {
        let factor_node = &self.graph.factors[index];
        match factor_node.factor.eval(args) {
            Some(value) if value.is_finite() && value >= 0f64 => Ok(value),
            Some(value) => Err(FGError::InvalidFactorValue {
                factor: factor_node.name.clone(),
                value,
            }),
            None => Err(FGError::UndefinedFactorEntry {
                factor: factor_node.name.clone(),
                args: args.to_vec(),
            }),
        }
    }
}
