pub mod dummy;
pub mod gemini;
