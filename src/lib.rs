//! Batch consolidation of e-commerce extracts.
//!
//! Five tabular sources (customers, products, categories and two yearly
//! sales files) are loaded into Arrow batches, cleaned, joined and written
//! back as one consolidated table. One run, one path: load → consolidate →
//! persist, any stage error aborts the rest.

pub mod config;
pub mod consolidate;
pub mod error;
pub mod load;
pub mod persist;
