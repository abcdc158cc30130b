//! docqa-vector
//!
//! Dense side of the hybrid index (`DenseIndex`) and LanceDB persistence of whole
//! generation snapshots (`table`).

pub mod dense;
pub mod schema;
pub mod table;

pub use dense::{DenseEntry, DenseIndex};
pub use table::{load_generation, open_db, save_generation, write_chunks, StoredGeneration};
