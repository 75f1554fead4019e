//! Cost-based node selection and decision explanations

mod explanation;
mod optimizer;

pub use explanation::ExplanationGenerator;
pub use optimizer::{normalize, Optimization, RoutingOptimizer, MISSING_COST};
