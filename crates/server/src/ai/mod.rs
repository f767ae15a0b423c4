//! Prescription generation backed by a causal language model

pub mod client;
pub mod prescriber;

pub use client::{GenerationError, TextGenerationClient, TextGenerator};
pub use prescriber::{Prescription, PrescriptionSource, compose_prescription};
