mod cpt;
mod network;

pub use cpt::Cpt;
pub use network::{factor_name, BayesNetBuilder};
