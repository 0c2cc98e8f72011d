// LanceDB vector database module
// Persistent similarity store for chunk embeddings

pub mod vector_store;

pub use vector_store::LanceVectorIndex;
