// Public operations - one file per domain, called by the hosting HTTP layer
pub mod analysis;
pub mod patients;
pub mod retrieval;
