pub mod collection_ops;
pub mod model_ops;

pub use model_ops::SetOptions;
