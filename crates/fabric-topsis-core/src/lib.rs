pub mod assemble;
pub mod diagnostics;
pub mod distance;
pub mod engine;
pub mod error;
pub mod ideal;
pub mod model;
pub mod normalize;
pub mod rank;
pub mod run;
pub mod stats;
pub mod weight;

pub use assemble::*;
pub use diagnostics::*;
pub use distance::*;
pub use engine::*;
pub use error::*;
pub use ideal::*;
pub use model::*;
pub use normalize::*;
pub use rank::*;
pub use run::*;
pub use stats::*;
pub use weight::*;
